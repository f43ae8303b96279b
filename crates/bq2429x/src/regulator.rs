//! VSYS and OTG outputs as [`platform::Regulator`]s.
//!
//! Both are thin views over [`Bq2429x`]; every call goes through the
//! charger lock.

use embassy_sync::blocking_mutex::raw::RawMutex;
use platform::{RegisterBus, Regulator, RegulatorDescriptor, RegulatorState};

use crate::codec::{
    decode_otg_current_limit, decode_otg_voltage, decode_vsys_voltage, select_otg_current_limit,
    select_otg_voltage, OTG_TABLE_UV, VSYS_TABLE_UV,
};
use crate::device::{Bq2429x, Result};
use crate::error::Error;
use crate::registers::{ChargeMode, VbusStatus, BOOSTV, BOOST_LIM, SYS_MIN};

/// System rail descriptor
pub static VSYS_DESCRIPTOR: RegulatorDescriptor = RegulatorDescriptor {
    name: "bq2429x-vsys",
    voltages_uv: &VSYS_TABLE_UV,
};

/// OTG boost descriptor
pub static OTG_DESCRIPTOR: RegulatorDescriptor = RegulatorDescriptor {
    name: "bq2429x-otg",
    voltages_uv: &OTG_TABLE_UV,
};

/// System rail (SYS_MIN). Always on; the setpoint is fixed by board
/// strapping and firmware, so writes are refused.
pub struct VsysRegulator<'a, B, M: RawMutex> {
    charger: &'a Bq2429x<B, M>,
}

impl<'a, B: RegisterBus, M: RawMutex> VsysRegulator<'a, B, M> {
    pub(crate) fn new(charger: &'a Bq2429x<B, M>) -> Self {
        Self { charger }
    }

    /// Read back enable state and setpoint
    pub async fn state(&self) -> Result<RegulatorState, B> {
        Ok(RegulatorState {
            enabled: true,
            current_limit_ua: None,
            voltage_uv: self.voltage_uv().await?,
        })
    }
}

impl<B: RegisterBus, M: RawMutex> Regulator for VsysRegulator<'_, B, M> {
    type Error = Error<B::Error>;

    fn descriptor(&self) -> &RegulatorDescriptor {
        &VSYS_DESCRIPTOR
    }

    fn unsupported(&self) -> Self::Error {
        Error::Unsupported
    }

    async fn voltage_uv(&self) -> Result<u32, B> {
        let code = self.charger.inner.lock().await.read_field(SYS_MIN).await?;
        Ok(decode_vsys_voltage(code))
    }

    async fn set_voltage_uv(&self, _min_uv: u32, _max_uv: u32) -> Result<(), B> {
        #[cfg(feature = "defmt")]
        defmt::warn!("bq2429x-vsys: setpoint is not programmable");
        Err(Error::Unsupported)
    }

    async fn enable(&self) -> Result<(), B> {
        Ok(())
    }

    async fn is_enabled(&self) -> Result<bool, B> {
        Ok(true)
    }
}

/// OTG boost converter (BOOSTV, BOOST_LIM, CHG_CONFIG).
pub struct OtgRegulator<'a, B, M: RawMutex> {
    charger: &'a Bq2429x<B, M>,
}

impl<'a, B: RegisterBus, M: RawMutex> OtgRegulator<'a, B, M> {
    pub(crate) fn new(charger: &'a Bq2429x<B, M>) -> Self {
        Self { charger }
    }

    /// Whether the last detection pass saw VBUS_STAT = OTG.
    ///
    /// This follows the converter's live status rather than the requested
    /// mode, so it lags [`Regulator::is_enabled`] by up to one pass and
    /// reads false while the boost is faulted.
    pub async fn is_boosting(&self) -> bool {
        self.charger
            .snapshot()
            .await
            .is_some_and(|s| s.system.vbus() == VbusStatus::Otg)
    }

    /// Read back enable state, current limit and setpoint
    pub async fn state(&self) -> Result<RegulatorState, B> {
        Ok(RegulatorState {
            enabled: self.is_enabled().await?,
            current_limit_ua: Some(self.current_limit_ua().await?),
            voltage_uv: self.voltage_uv().await?,
        })
    }
}

impl<B: RegisterBus, M: RawMutex> Regulator for OtgRegulator<'_, B, M> {
    type Error = Error<B::Error>;

    fn descriptor(&self) -> &RegulatorDescriptor {
        &OTG_DESCRIPTOR
    }

    fn unsupported(&self) -> Self::Error {
        Error::Unsupported
    }

    async fn voltage_uv(&self) -> Result<u32, B> {
        let code = self.charger.inner.lock().await.read_field(BOOSTV).await?;
        Ok(decode_otg_voltage(code))
    }

    async fn set_voltage_uv(&self, min_uv: u32, max_uv: u32) -> Result<(), B> {
        let code = select_otg_voltage(min_uv, max_uv).ok_or(Error::InvalidValue)?;
        self.charger
            .inner
            .lock()
            .await
            .update_field(BOOSTV, code)
            .await
    }

    async fn current_limit_ua(&self) -> Result<u32, B> {
        let bit = self.charger.inner.lock().await.read_field(BOOST_LIM).await?;
        Ok(decode_otg_current_limit(bit))
    }

    async fn set_current_limit_ua(&self, min_ua: u32, max_ua: u32) -> Result<(), B> {
        let bit = select_otg_current_limit(min_ua, max_ua).ok_or(Error::InvalidValue)?;
        self.charger
            .inner
            .lock()
            .await
            .update_field(BOOST_LIM, bit)
            .await
    }

    /// Leave Hi-Z, settle, then switch CHG_CONFIG to OTG.
    ///
    /// Refused with [`crate::Precondition::BatteryAbsent`] (and no register
    /// access) unless the last pass saw a battery.
    async fn enable(&self) -> Result<(), B> {
        self.charger.inner.lock().await.enable_otg().await
    }

    async fn disable(&self) -> Result<(), B> {
        self.charger.inner.lock().await.disable_otg().await
    }

    /// CHG_CONFIG readback (`0b10` or `0b11`)
    async fn is_enabled(&self) -> Result<bool, B> {
        Ok(self.charger.inner.lock().await.charge_mode().await? == ChargeMode::Otg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform::mocks::MockRegisterBus;

    use crate::config::ChargerConfig;
    use crate::error::Precondition;
    use crate::registers::{Register, CHG_CONFIG, EN_HIZ, VENDOR_ID};

    async fn attached(mock: &MockRegisterBus) -> Bq2429x<&MockRegisterBus, NoopRawMutex> {
        mock.set_register(Register::VendorStatus.addr(), VENDOR_ID);
        Bq2429x::attach(mock, ChargerConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn vsys_reads_table_and_refuses_writes() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        mock.set_register(Register::PowerOnConfig.addr(), SYS_MIN.place(0b101));
        mock.clear_log();

        let vsys = charger.vsys();
        assert_eq!(vsys.voltage_uv().await.unwrap(), 3_500_000);
        assert_eq!(
            vsys.set_voltage_uv(3_000_000, 3_700_000).await,
            Err(Error::Unsupported)
        );
        assert_eq!(vsys.disable().await, Err(Error::Unsupported));
        assert_eq!(vsys.current_limit_ua().await, Err(Error::Unsupported));
        assert!(vsys.is_enabled().await.unwrap());
        assert!(mock.writes().is_empty());
        assert_eq!(vsys.descriptor().n_voltages(), 8);
    }

    #[tokio::test]
    async fn otg_enable_requires_battery() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        mock.clear_log();

        // no detection pass yet: battery unknown
        let otg = charger.otg();
        assert_eq!(
            otg.enable().await,
            Err(Error::Precondition(Precondition::BatteryAbsent))
        );
        assert!(mock.writes().is_empty());
        assert_eq!(mock.read_count(), 0);
    }

    #[tokio::test]
    async fn otg_enable_sequence() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        mock.set_register(Register::InputSourceControl.addr(), EN_HIZ.place(1) | 0x07);
        charger.detect().await.unwrap();
        mock.clear_log();

        let otg = charger.otg();
        otg.enable().await.unwrap();
        assert_eq!(
            mock.writes().as_slice(),
            &[
                (Register::InputSourceControl.addr(), 0x07),
                (Register::PowerOnConfig.addr(), CHG_CONFIG.place(0b10)),
            ]
        );
        assert!(otg.is_enabled().await.unwrap());

        otg.disable().await.unwrap();
        assert!(!otg.is_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn otg_voltage_and_current() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        let otg = charger.otg();

        otg.set_voltage_uv(4_900_000, 5_100_000).await.unwrap();
        assert_eq!(otg.voltage_uv().await.unwrap(), 5_062_000);
        otg.set_voltage_uv(5_500_000, 6_000_000).await.unwrap();
        assert_eq!(otg.voltage_uv().await.unwrap(), 5_510_000);
        assert_eq!(
            otg.set_voltage_uv(5_600_000, 6_000_000).await,
            Err(Error::InvalidValue)
        );
        assert_eq!(
            otg.set_voltage_uv(4_000_000, 4_500_000).await,
            Err(Error::InvalidValue)
        );
        assert_eq!(otg.voltage_uv().await.unwrap(), 5_510_000);

        otg.set_current_limit_ua(0, 1_500_000).await.unwrap();
        assert_eq!(otg.current_limit_ua().await.unwrap(), 1_500_000);
        otg.set_current_limit_ua(0, 1_000_000).await.unwrap();
        assert_eq!(otg.current_limit_ua().await.unwrap(), 1_000_000);
    }

    #[tokio::test]
    async fn otg_current_outside_window_is_rejected() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        let otg = charger.otg();

        // 1.5 A would exceed the ceiling, 1.0 A is the best fit
        otg.set_current_limit_ua(0, 1_300_000).await.unwrap();
        assert_eq!(otg.current_limit_ua().await.unwrap(), 1_000_000);

        otg.set_current_limit_ua(1_000_000, 2_000_000).await.unwrap();
        mock.clear_log();
        assert_eq!(
            otg.set_current_limit_ua(1_600_000, 2_000_000).await,
            Err(Error::InvalidValue)
        );
        assert_eq!(
            otg.set_current_limit_ua(0, 500_000).await,
            Err(Error::InvalidValue)
        );
        assert!(mock.writes().is_empty());
        assert_eq!(otg.current_limit_ua().await.unwrap(), 1_500_000);
    }

    #[tokio::test]
    async fn otg_state_and_live_status() {
        let mock = MockRegisterBus::new();
        let charger = attached(&mock).await;
        let otg = charger.otg();
        assert!(!otg.is_boosting().await);

        mock.set_register(Register::SystemStatus.addr(), 0xC0); // VBUS_STAT = OTG
        mock.set_register(Register::PowerOnConfig.addr(), CHG_CONFIG.place(0b11) | 0x01);
        mock.set_register(Register::BoostThermalControl.addr(), BOOSTV.place(7));
        charger.detect().await.unwrap();

        assert!(otg.is_boosting().await);
        assert_eq!(
            otg.state().await.unwrap(),
            RegulatorState {
                enabled: true,
                current_limit_ua: Some(1_500_000),
                voltage_uv: 4_998_000,
            }
        );
    }
}
