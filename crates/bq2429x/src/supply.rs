//! Charger as a [`platform::PowerSupply`].
//!
//! Status-derived properties come from the last detection pass; limits and
//! currents are read from the chip on demand.

use embassy_sync::blocking_mutex::raw::RawMutex;
use platform::{ChargeType, ChargingStatus, PowerSupply, RegisterBus, SupplyProperty, SupplyValue};

use crate::codec::{
    decode_fast_charge_current, decode_input_current_limit, decode_precharge_current,
    decode_vindpm,
};
use crate::device::{Bq2429x, Result};
use crate::error::Error;
use crate::registers::{ChargeStatus, Register, RegisterSnapshot};

/// Properties published by the charger
pub static PROPERTIES: [SupplyProperty; 9] = [
    SupplyProperty::Status,
    SupplyProperty::ChargeType,
    SupplyProperty::VoltageNow,
    SupplyProperty::CurrentMax,
    SupplyProperty::InputCurrentLimit,
    SupplyProperty::CurrentNow,
    SupplyProperty::Temperature,
    SupplyProperty::Online,
    SupplyProperty::Present,
];

/// VBUS assumed when power is good and input DPM is inactive (µV)
const NOMINAL_VBUS_UV: u32 = 5_000_000;

/// Temperature reported for an NTC cold fault (0.1 °C)
pub const TEMP_COLD_DECI_C: i16 = -100;
/// Temperature reported for an NTC hot fault (0.1 °C)
pub const TEMP_HOT_DECI_C: i16 = 600;
/// Temperature reported without an NTC fault (0.1 °C)
pub const TEMP_NORMAL_DECI_C: i16 = 225;

/// Power-supply status for a snapshot
pub fn charging_status(snapshot: &RegisterSnapshot) -> ChargingStatus {
    match snapshot.system.charge() {
        ChargeStatus::NotCharging => ChargingStatus::NotCharging,
        ChargeStatus::PreCharge | ChargeStatus::FastCharge => ChargingStatus::Charging,
        ChargeStatus::Done => ChargingStatus::Full,
    }
}

/// Power-supply charge type for a snapshot. A terminated charge still
/// reports fast: the charger stays in CV top-off.
pub fn charge_type(snapshot: &RegisterSnapshot) -> ChargeType {
    match snapshot.system.charge() {
        ChargeStatus::NotCharging => ChargeType::None,
        ChargeStatus::PreCharge => ChargeType::Trickle,
        ChargeStatus::FastCharge | ChargeStatus::Done => ChargeType::Fast,
    }
}

/// Coarse battery temperature from the NTC fault bits
pub fn temperature(snapshot: &RegisterSnapshot) -> i16 {
    if snapshot.fault.too_cold() {
        TEMP_COLD_DECI_C
    } else if snapshot.fault.too_hot() {
        TEMP_HOT_DECI_C
    } else {
        TEMP_NORMAL_DECI_C
    }
}

impl<B: RegisterBus, M: RawMutex> PowerSupply for Bq2429x<B, M> {
    type Error = Error<B::Error>;

    fn properties(&self) -> &'static [SupplyProperty] {
        &PROPERTIES
    }

    fn property_is_writeable(&self, property: SupplyProperty) -> bool {
        property == SupplyProperty::InputCurrentLimit
    }

    async fn get_property(&self, property: SupplyProperty) -> Result<SupplyValue, B> {
        let mut inner = self.inner.lock().await;
        let battery_present = inner.tracker.battery_present();
        let snapshot = inner.tracker.last().unwrap_or_default();

        let value = match property {
            SupplyProperty::Status => SupplyValue::Status(charging_status(&snapshot)),
            SupplyProperty::ChargeType => SupplyValue::ChargeType(charge_type(&snapshot)),
            SupplyProperty::VoltageNow => {
                let uv = if !snapshot.input_present() {
                    0
                } else if snapshot.system.in_dpm() {
                    decode_vindpm(inner.read(Register::InputSourceControl).await?)
                } else {
                    NOMINAL_VBUS_UV
                };
                SupplyValue::Microvolts(uv)
            }
            SupplyProperty::CurrentMax | SupplyProperty::InputCurrentLimit => {
                let reg00 = inner.read(Register::InputSourceControl).await?;
                SupplyValue::Microamps(decode_input_current_limit(reg00))
            }
            SupplyProperty::CurrentNow => {
                let limit = match snapshot.system.charge() {
                    ChargeStatus::NotCharging | ChargeStatus::Done => None,
                    ChargeStatus::PreCharge => Some(decode_precharge_current(
                        inner.read(Register::PreChargeTerminationControl).await?,
                    )),
                    ChargeStatus::FastCharge => Some(decode_fast_charge_current(
                        inner.read(Register::ChargeCurrentControl).await?,
                    )),
                };
                let ua = match limit {
                    Some(charge_ua) => {
                        let input_ua = decode_input_current_limit(
                            inner.read(Register::InputSourceControl).await?,
                        );
                        charge_ua.min(input_ua)
                    }
                    None => 0,
                };
                SupplyValue::Microamps(ua)
            }
            SupplyProperty::Temperature => SupplyValue::DeciCelsius(temperature(&snapshot)),
            SupplyProperty::Online => SupplyValue::Flag(snapshot.input_present()),
            SupplyProperty::Present => SupplyValue::Flag(battery_present),
        };
        Ok(value)
    }

    async fn set_property(&self, property: SupplyProperty, value: SupplyValue) -> Result<(), B> {
        match (property, value) {
            (SupplyProperty::InputCurrentLimit, SupplyValue::Microamps(ua)) => {
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "bq2429x: input current limit {} uA -> {}",
                    ua,
                    crate::codec::encode_input_current_limit(ua)
                );
                self.set_input_current_limit(ua).await
            }
            (SupplyProperty::InputCurrentLimit, _) => Err(Error::InvalidValue),
            _ => Err(Error::ReadOnly),
        }
    }
}
