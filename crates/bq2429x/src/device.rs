//! Charger core: register access, detection pass and charger controls.
//!
//! [`Bq2429x`] owns the register bus and the [`ChargerTracker`] behind one
//! async mutex. Every public operation takes the lock for its whole
//! duration, so the detection loop, regulator calls and property reads are
//! serialised against each other.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Timer;
use platform::{RegisterBus, SupplyEvent};

use crate::codec::{
    decode_input_current_limit, encode_charge_current, encode_input_current_limit,
    encode_max_voltage, IinlimSetting,
};
use crate::config::{ChargerConfig, OTG_SETTLE_DELAY};
use crate::error::{Error, Precondition};
use crate::registers::{
    is_supported_vendor, ChargeMode, Field, Register, RegisterSnapshot, CHG_CONFIG, EN_HIZ, ICHG,
    IPRECHG, ITERM, REGISTER_COUNT, VREG,
};
use crate::regulator::{OtgRegulator, VsysRegulator};
use crate::tracker::{Action, ChargerTracker, DetectionPlan, MAX_TRANSITIONS};

/// Result alias for operations on a bus `B`
pub type Result<T, B> = core::result::Result<T, Error<<B as RegisterBus>::Error>>;

/// Which input source the charger should budget for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputSource {
    /// USB port: configured USB input limit
    Usb,
    /// Dedicated adapter: configured adapter input limit
    Adapter,
}

/// What a detection pass saw and did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionReport {
    /// REG08/REG09 as read in this pass
    pub snapshot: RegisterSnapshot,
    /// Snapshot differs from the last reported one
    pub changed: bool,
    /// Supply transitions, in order; deliver after the call returns
    pub transitions: heapless::Vec<SupplyEvent, MAX_TRANSITIONS>,
}

pub(crate) struct Inner<B> {
    pub(crate) bus: B,
    pub(crate) tracker: ChargerTracker,
}

impl<B: RegisterBus> Inner<B> {
    pub(crate) async fn read(&mut self, register: Register) -> Result<u8, B> {
        self.bus
            .read_register(register.addr())
            .await
            .map_err(Error::Transport)
    }

    /// Read-modify-write; no bus write when the masked bits already match.
    pub(crate) async fn update_bits(
        &mut self,
        register: Register,
        bits: u8,
        mask: u8,
    ) -> Result<(), B> {
        let current = self.read(register).await?;
        if current & mask == bits & mask {
            return Ok(());
        }
        let next = (current & !mask) | (bits & mask);
        self.bus
            .write_register(register.addr(), next)
            .await
            .map_err(Error::Transport)
    }

    pub(crate) async fn update_field(&mut self, field: Field, value: u8) -> Result<(), B> {
        self.update_bits(field.register, field.place(value), field.shifted_mask())
            .await
    }

    pub(crate) async fn read_field(&mut self, field: Field) -> Result<u8, B> {
        Ok(field.get(self.read(field.register).await?))
    }

    async fn read_snapshot(&mut self) -> Result<RegisterSnapshot, B> {
        let mut raw = [0u8; 2];
        self.bus
            .read_registers(Register::SystemStatus.addr(), &mut raw)
            .await
            .map_err(Error::Transport)?;
        let [system, fault] = raw;
        Ok(RegisterSnapshot::new(system, fault))
    }

    async fn set_input_limit(&mut self, setting: IinlimSetting) -> Result<(), B> {
        self.update_bits(
            Register::InputSourceControl,
            setting.bits(),
            IinlimSetting::mask(),
        )
        .await
    }

    pub(crate) async fn charge_mode(&mut self) -> Result<ChargeMode, B> {
        Ok(ChargeMode::from_bits(self.read_field(CHG_CONFIG).await?))
    }

    pub(crate) async fn set_charge_mode(&mut self, mode: ChargeMode) -> Result<(), B> {
        self.update_field(CHG_CONFIG, mode.bits()).await
    }

    async fn apply(&mut self, action: Action) -> Result<(), B> {
        match action {
            Action::SetInputCurrentLimit(setting) => self.set_input_limit(setting).await,
            Action::SetChargeMode(mode) => self.set_charge_mode(mode).await,
        }
    }

    pub(crate) async fn enable_otg(&mut self) -> Result<(), B> {
        if !self.tracker.battery_present() {
            #[cfg(feature = "defmt")]
            defmt::warn!("bq2429x: OTG needs an installed battery within temperature limits");
            return Err(Precondition::BatteryAbsent.into());
        }
        self.update_field(EN_HIZ, 0).await?;
        Timer::after(OTG_SETTLE_DELAY).await;
        self.set_charge_mode(ChargeMode::Otg).await
    }

    pub(crate) async fn disable_otg(&mut self) -> Result<(), B> {
        self.set_charge_mode(ChargeMode::Disabled).await
    }
}

/// BQ24296/BQ24297/MP2624 charger.
///
/// `M` picks the lock flavour: `CriticalSectionRawMutex` when the
/// detection loop and callers run on different executors or interrupt
/// priorities, `NoopRawMutex` on a single executor.
pub struct Bq2429x<B, M: RawMutex> {
    pub(crate) inner: Mutex<M, Inner<B>>,
    config: ChargerConfig,
}

impl<B: RegisterBus, M: RawMutex> Bq2429x<B, M> {
    /// Identify the part and program the static charge parameters.
    ///
    /// - config rejected: [`Error::Config`]
    /// - REG0A unreadable: [`Error::Deferred`] (device may not be powered
    ///   yet; retry later)
    /// - REG0A not a BQ24296 family part: [`Error::UnsupportedDevice`]
    ///
    /// Register reset, the I2C watchdog and ICHG are left alone: the charger
    /// may be powering the host.
    pub async fn attach(bus: B, config: ChargerConfig) -> Result<Self, B> {
        config.validate()?;

        let mut inner = Inner {
            bus,
            tracker: ChargerTracker::new(),
        };

        let vendor = match inner.read(Register::VendorStatus).await {
            Ok(v) => v,
            Err(_) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bq2429x: vendor register unreadable, deferring");
                return Err(Error::Deferred);
            }
        };
        if !is_supported_vendor(vendor) {
            #[cfg(feature = "defmt")]
            defmt::error!("bq2429x: not a bq24296/97: {=u8:#x}", vendor);
            return Err(Error::UnsupportedDevice(vendor));
        }

        init_registers(&mut inner, &config).await?;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "bq2429x: {} attached, VREG code {}",
            config.variant.name(),
            encode_max_voltage(&config)
        );

        Ok(Self {
            inner: Mutex::new(inner),
            config,
        })
    }

    /// Static configuration
    pub fn config(&self) -> &ChargerConfig {
        &self.config
    }

    /// One detection pass.
    ///
    /// Reads REG08/REG09, logs the decoded flags when they changed, and
    /// reconciles VBUS presence. On any bus failure the tracker is left
    /// exactly as it was and the error is returned.
    pub async fn detect(&self) -> Result<DetectionReport, B> {
        let mut inner = self.inner.lock().await;
        let snapshot = inner.read_snapshot().await?;
        let plan: DetectionPlan = inner.tracker.plan(snapshot, &self.config);

        if plan.changed {
            #[cfg(feature = "defmt")]
            defmt::info!("bq2429x: {}", defmt::Display2Format(&snapshot));
        }

        for action in plan.actions.iter() {
            if let Err(e) = inner.apply(*action).await {
                #[cfg(feature = "defmt")]
                defmt::error!("bq2429x: {} failed", action);
                return Err(e);
            }
        }

        inner.tracker.commit(&plan);

        #[cfg(feature = "defmt")]
        for transition in plan.transitions.iter() {
            match transition {
                SupplyEvent::InputAttached => defmt::info!("bq2429x: VBUS became available"),
                SupplyEvent::InputRemoved => defmt::info!("bq2429x: VBUS became unavailable"),
            }
        }

        Ok(DetectionReport {
            snapshot,
            changed: plan.changed,
            transitions: plan.transitions,
        })
    }

    /// Snapshot of the last successful detection pass
    pub async fn snapshot(&self) -> Option<RegisterSnapshot> {
        self.inner.lock().await.tracker.last()
    }

    /// Battery presence from the last pass (false before the first one)
    pub async fn battery_present(&self) -> bool {
        self.inner.lock().await.tracker.battery_present()
    }

    /// VBUS presence as tracked across passes
    pub async fn input_present(&self) -> bool {
        self.inner.lock().await.tracker.input_present()
    }

    /// Effective input current limit (µA, 0 in Hi-Z)
    pub async fn input_current_limit(&self) -> Result<u32, B> {
        let reg00 = self
            .inner
            .lock()
            .await
            .read(Register::InputSourceControl)
            .await?;
        Ok(decode_input_current_limit(reg00))
    }

    /// Program the input current limit; below 80 mA the input goes Hi-Z.
    pub async fn set_input_current_limit(&self, ua: u32) -> Result<(), B> {
        let setting = encode_input_current_limit(ua);
        self.inner.lock().await.set_input_limit(setting).await
    }

    /// Program the configured input limit for `source`
    pub async fn set_input_source(&self, source: InputSource) -> Result<(), B> {
        let ua = match source {
            InputSource::Usb => self.config.usb_input_current_limit_ua,
            InputSource::Adapter => self.config.adapter_input_current_limit_ua,
        };
        self.set_input_current_limit(ua).await
    }

    /// Program ICHG from a current in µA (64 mA steps, see
    /// [`encode_charge_current`])
    pub async fn set_charge_current(&self, ua: u32) -> Result<(), B> {
        let code = encode_charge_current(ua);
        self.inner.lock().await.update_field(ICHG, code).await
    }

    /// CHG_CONFIG as read from hardware
    pub async fn charge_mode(&self) -> Result<ChargeMode, B> {
        self.inner.lock().await.charge_mode().await
    }

    /// All eleven registers, REG00 first
    pub async fn dump_registers(&self) -> Result<[u8; REGISTER_COUNT], B> {
        let mut regs = [0u8; REGISTER_COUNT];
        self.inner
            .lock()
            .await
            .bus
            .read_registers(Register::InputSourceControl.addr(), &mut regs)
            .await
            .map_err(Error::Transport)?;
        Ok(regs)
    }

    /// Make sure the boost converter is off before power goes away.
    ///
    /// Reads CHG_CONFIG itself, so it does not depend on what any regulator
    /// consumer believes the OTG state to be.
    pub async fn shutdown(&self) -> Result<(), B> {
        let mut inner = self.inner.lock().await;
        if inner.charge_mode().await? == ChargeMode::Otg {
            #[cfg(feature = "defmt")]
            defmt::info!("bq2429x: disabling OTG for shutdown");
            inner.disable_otg().await?;
        }
        Ok(())
    }

    /// System rail regulator
    pub fn vsys(&self) -> VsysRegulator<'_, B, M> {
        VsysRegulator::new(self)
    }

    /// OTG boost regulator
    pub fn otg(&self) -> OtgRegulator<'_, B, M> {
        OtgRegulator::new(self)
    }

    /// Give the bus back
    pub fn release(self) -> B {
        self.inner.into_inner().bus
    }
}

async fn init_registers<B: RegisterBus>(
    inner: &mut Inner<B>,
    config: &ChargerConfig,
) -> Result<(), B> {
    // 128 mA pre-charge and termination
    inner.update_field(IPRECHG, 0).await?;
    inner.update_field(ITERM, 0).await?;
    inner.update_field(VREG, encode_max_voltage(config)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use platform::mocks::{MockBusError, MockRegisterBus};

    use crate::registers::{IINLIM, VENDOR_ID};

    type Charger<'a> = Bq2429x<&'a MockRegisterBus, NoopRawMutex>;

    fn mock() -> MockRegisterBus {
        let mock = MockRegisterBus::new();
        mock.set_register(Register::VendorStatus.addr(), VENDOR_ID);
        mock
    }

    #[tokio::test]
    async fn attach_programs_static_parameters() {
        let mock = mock();
        mock.set_register(Register::PreChargeTerminationControl.addr(), 0x11);
        let _charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();

        assert_eq!(mock.register(Register::PreChargeTerminationControl.addr()), 0x00);
        assert_eq!(VREG.get(mock.register(Register::ChargeVoltageControl.addr())), 43);
        assert_eq!(mock.writes_to(Register::PowerOnConfig.addr()), 0);
        assert_eq!(mock.writes_to(Register::TerminationTimerControl.addr()), 0);
        // charge current is advisory, ICHG keeps its power-on value
        assert_eq!(mock.writes_to(Register::ChargeCurrentControl.addr()), 0);
    }

    #[tokio::test]
    async fn attach_skips_writes_when_already_programmed() {
        let mock = mock();
        mock.set_register(Register::ChargeVoltageControl.addr(), VREG.place(43));
        let _charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn attach_defers_when_unreadable() {
        let mock = mock();
        mock.fail_reads(true);
        let result: Result<Charger<'_>, &MockRegisterBus> =
            Bq2429x::attach(&mock, ChargerConfig::default()).await;
        assert!(matches!(result, Err(Error::Deferred)));
    }

    #[tokio::test]
    async fn attach_rejects_foreign_part() {
        let mock = mock();
        mock.set_register(Register::VendorStatus.addr(), 0xC1);
        let result: Result<Charger<'_>, &MockRegisterBus> =
            Bq2429x::attach(&mock, ChargerConfig::default()).await;
        assert!(matches!(result, Err(Error::UnsupportedDevice(0xC1))));
        assert!(mock.writes().is_empty());
    }

    #[tokio::test]
    async fn attach_rejects_invalid_config() {
        let mock = mock();
        let config = ChargerConfig {
            charge_current_ua: 0,
            ..ChargerConfig::default()
        };
        let result: Result<Charger<'_>, &MockRegisterBus> = Bq2429x::attach(&mock, config).await;
        assert!(matches!(result, Err(Error::Config(_))));
        assert_eq!(mock.read_count(), 0);
    }

    #[tokio::test]
    async fn failed_action_leaves_tracker_untouched() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        mock.set_register(Register::SystemStatus.addr(), 0xA4);
        mock.fail_writes(true);

        let err = charger.detect().await.unwrap_err();
        assert_eq!(err, Error::Transport(MockBusError::WriteFailed));
        assert!(!charger.input_present().await);
        assert_eq!(charger.snapshot().await, None);

        mock.fail_writes(false);
        let report = charger.detect().await.unwrap();
        assert_eq!(report.transitions.as_slice(), &[SupplyEvent::InputAttached]);
        assert!(charger.input_present().await);
    }

    #[tokio::test]
    async fn input_limit_roundtrip_and_hiz() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        mock.set_register(Register::InputSourceControl.addr(), 0b0011_0000); // VINDPM bits

        charger.set_input_current_limit(1_500_000).await.unwrap();
        assert_eq!(charger.input_current_limit().await.unwrap(), 1_500_000);
        let reg00 = mock.register(Register::InputSourceControl.addr());
        assert_eq!(reg00 & 0x78, 0b0011_0000, "VINDPM preserved");

        charger.set_input_current_limit(10_000).await.unwrap();
        assert_eq!(charger.input_current_limit().await.unwrap(), 0);
        let reg00 = mock.register(Register::InputSourceControl.addr());
        assert_eq!(EN_HIZ.get(reg00), 1);
        assert_eq!(IINLIM.get(reg00), 7);
    }

    #[tokio::test]
    async fn input_source_selects_configured_limit() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        charger.set_input_source(InputSource::Adapter).await.unwrap();
        assert_eq!(charger.input_current_limit().await.unwrap(), 2_000_000);
        charger.set_input_source(InputSource::Usb).await.unwrap();
        assert_eq!(charger.input_current_limit().await.unwrap(), 500_000);
    }

    #[tokio::test]
    async fn charge_current_writes_ichg() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        charger.set_charge_current(2_048_000).await.unwrap();
        assert_eq!(ICHG.get(mock.register(Register::ChargeCurrentControl.addr())), 32);
    }

    #[tokio::test]
    async fn dump_reads_all_registers() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();
        mock.set_register(Register::SystemStatus.addr(), 0xA4);
        let regs = charger.dump_registers().await.unwrap();
        assert_eq!(regs.get(8), Some(&0xA4));
        assert_eq!(regs.get(10), Some(&VENDOR_ID));
    }

    #[tokio::test]
    async fn shutdown_turns_off_active_otg_only() {
        let mock = mock();
        let charger: Charger<'_> = Bq2429x::attach(&mock, ChargerConfig::default())
            .await
            .unwrap();

        mock.set_register(Register::PowerOnConfig.addr(), CHG_CONFIG.place(0b01));
        mock.clear_log();
        charger.shutdown().await.unwrap();
        assert!(mock.writes().is_empty());

        mock.set_register(Register::PowerOnConfig.addr(), CHG_CONFIG.place(0b11) | 0x01);
        charger.shutdown().await.unwrap();
        assert_eq!(charger.charge_mode().await.unwrap(), ChargeMode::Disabled);
        assert_eq!(mock.register(Register::PowerOnConfig.addr()), 0x01);
    }
}
