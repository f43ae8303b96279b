//! Charger configuration and crate constants.
//!
//! [`ChargerConfig`] is built once before [`crate::Bq2429x::attach`] and is
//! read-only afterwards. [`MonitorConfig`] carries the scheduler timings.

use embassy_time::Duration;

pub use crate::registers::I2C_ADDRESS;

/// Settle time between leaving Hi-Z and switching to OTG.
pub const OTG_SETTLE_DELAY: Duration = Duration::from_millis(5);

/// Default poll period of the detection loop.
pub const POLL_PERIOD: Duration = Duration::from_secs(1);

/// Delay before the first pass after resume.
pub const RESUME_DELAY: Duration = Duration::from_millis(50);

/// Charge current used when no (or an incomplete) current triple is given.
pub const DEFAULT_CHARGE_CURRENT_MA: u32 = 1000;
/// USB input limit used when no (or an incomplete) current triple is given.
pub const DEFAULT_USB_INPUT_CURRENT_MA: u32 = 500;
/// Adapter input limit used when no (or an incomplete) current triple is given.
pub const DEFAULT_ADAPTER_INPUT_CURRENT_MA: u32 = 2000;

/// Largest current accepted by [`ChargerConfig::validate`] (µA).
const MAX_CURRENT_UA: u32 = 5_000_000;

/// Supported charger parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChipVariant {
    /// TI BQ24296
    #[default]
    Bq24296,
    /// TI BQ24297 (no DC detect / PSEL pins)
    Bq24297,
    /// MPS MP2624 (tighter VSYS-over-VBAT headroom)
    Mp2624,
}

impl ChipVariant {
    /// Map a device-tree style compatible string (`"ti,bq24296"`,
    /// `"ti,bq24297"`, `"mps,mp2624"`).
    pub fn from_compatible(compatible: &str) -> Option<Self> {
        match compatible {
            "ti,bq24296" => Some(Self::Bq24296),
            "ti,bq24297" => Some(Self::Bq24297),
            "mps,mp2624" => Some(Self::Mp2624),
            _ => None,
        }
    }

    /// How far VSYS may sit above the fully charged battery (µV)
    pub const fn voltage_margin_uv(self) -> u32 {
        match self {
            Self::Mp2624 => 100_000,
            Self::Bq24296 | Self::Bq24297 => 150_000,
        }
    }

    /// Power-supply name the part is published under
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bq24296 => "bq24296",
            Self::Bq24297 => "bq24297",
            Self::Mp2624 => "mp2624",
        }
    }
}

/// Configuration rejected at attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A current setting is zero
    #[error("current setting must be non-zero")]
    ZeroCurrent,
    /// A current setting exceeds what the part can regulate
    #[error("current setting out of range")]
    CurrentOutOfRange,
    /// Battery ceiling is zero
    #[error("battery max voltage must be non-zero")]
    ZeroBatteryVoltage,
    /// System ceiling does not leave room for the variant's margin
    #[error("system max voltage below variant margin")]
    SystemVoltageBelowMargin,
}

/// Static charger policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerConfig {
    /// Fast-charge current (µA).
    ///
    /// Advisory: [`crate::Bq2429x::attach`] leaves ICHG at its power-on
    /// value. Apply it with [`crate::Bq2429x::set_charge_current`] when the
    /// board wants it; the 64 mA encoding plus the 512 mA ICHG offset means
    /// the programmed current is not the requested one.
    pub charge_current_ua: u32,
    /// Input limit programmed when VBUS appears (µA)
    pub usb_input_current_limit_ua: u32,
    /// Input limit used for a dedicated adapter (µA)
    pub adapter_input_current_limit_ua: u32,
    /// Battery design ceiling (µV)
    pub battery_max_voltage_uv: u32,
    /// System rail ceiling (µV)
    pub system_max_voltage_uv: u32,
    /// Part in use
    pub variant: ChipVariant,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            charge_current_ua: ma_to_ua(DEFAULT_CHARGE_CURRENT_MA),
            usb_input_current_limit_ua: ma_to_ua(DEFAULT_USB_INPUT_CURRENT_MA),
            adapter_input_current_limit_ua: ma_to_ua(DEFAULT_ADAPTER_INPUT_CURRENT_MA),
            battery_max_voltage_uv: 4_200_000,
            system_max_voltage_uv: 5_000_000,
            variant: ChipVariant::Bq24296,
        }
    }
}

impl ChargerConfig {
    /// Build from a `[charge, usb_input, adapter_input]` triple in mA.
    ///
    /// All three must be non-zero; otherwise the defaults
    /// (1000 / 500 / 2000 mA) are used for all three.
    pub fn from_charge_currents_ma(currents: [u32; 3]) -> Self {
        let [charge, usb, adapter] = currents;
        if charge == 0 || usb == 0 || adapter == 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("charge current triple incomplete, using defaults");
            return Self::default();
        }
        Self {
            charge_current_ua: ma_to_ua(charge),
            usb_input_current_limit_ua: ma_to_ua(usb),
            adapter_input_current_limit_ua: ma_to_ua(adapter),
            ..Self::default()
        }
    }

    /// Same ceilings, different part
    #[must_use]
    pub fn with_variant(self, variant: ChipVariant) -> Self {
        Self { variant, ..self }
    }

    /// Check the configuration before it reaches hardware.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for ua in [
            self.charge_current_ua,
            self.usb_input_current_limit_ua,
            self.adapter_input_current_limit_ua,
        ] {
            if ua == 0 {
                return Err(ConfigError::ZeroCurrent);
            }
            if ua > MAX_CURRENT_UA {
                return Err(ConfigError::CurrentOutOfRange);
            }
        }
        if self.battery_max_voltage_uv == 0 {
            return Err(ConfigError::ZeroBatteryVoltage);
        }
        if self.system_max_voltage_uv <= self.variant.voltage_margin_uv() {
            return Err(ConfigError::SystemVoltageBelowMargin);
        }
        Ok(())
    }
}

/// Detection loop timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Time between periodic detection passes
    pub poll_period: Duration,
    /// Delay before the first pass after [`crate::ChargerMonitor::resume`]
    pub resume_delay: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_period: POLL_PERIOD,
            resume_delay: RESUME_DELAY,
        }
    }
}

const fn ma_to_ua(ma: u32) -> u32 {
    ma.saturating_mul(1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fallback_triple() {
        let config = ChargerConfig::default();
        assert_eq!(config.charge_current_ua, 1_000_000);
        assert_eq!(config.usb_input_current_limit_ua, 500_000);
        assert_eq!(config.adapter_input_current_limit_ua, 2_000_000);
        assert_eq!(config.variant, ChipVariant::Bq24296);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn incomplete_triple_falls_back_to_defaults() {
        assert_eq!(
            ChargerConfig::from_charge_currents_ma([1500, 0, 2000]),
            ChargerConfig::default()
        );
        let config = ChargerConfig::from_charge_currents_ma([1500, 900, 1800]);
        assert_eq!(config.charge_current_ua, 1_500_000);
        assert_eq!(config.usb_input_current_limit_ua, 900_000);
        assert_eq!(config.adapter_input_current_limit_ua, 1_800_000);
    }

    #[test]
    fn compatible_strings() {
        assert_eq!(
            ChipVariant::from_compatible("mps,mp2624"),
            Some(ChipVariant::Mp2624)
        );
        assert_eq!(
            ChipVariant::from_compatible("ti,bq24297"),
            Some(ChipVariant::Bq24297)
        );
        assert_eq!(ChipVariant::from_compatible("ti,bq25895"), None);
        assert_eq!(ChipVariant::Mp2624.voltage_margin_uv(), 100_000);
        assert_eq!(ChipVariant::Bq24297.voltage_margin_uv(), 150_000);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let base = ChargerConfig::default();
        let zero = ChargerConfig {
            usb_input_current_limit_ua: 0,
            ..base
        };
        assert_eq!(zero.validate(), Err(ConfigError::ZeroCurrent));
        let huge = ChargerConfig {
            charge_current_ua: 6_000_000,
            ..base
        };
        assert_eq!(huge.validate(), Err(ConfigError::CurrentOutOfRange));
        let no_battery = ChargerConfig {
            battery_max_voltage_uv: 0,
            ..base
        };
        assert_eq!(no_battery.validate(), Err(ConfigError::ZeroBatteryVoltage));
        let low_sys = ChargerConfig {
            system_max_voltage_uv: 100_000,
            ..base
        };
        assert_eq!(
            low_sys.validate(),
            Err(ConfigError::SystemVoltageBelowMargin)
        );
    }

    #[test]
    fn monitor_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_period, Duration::from_secs(1));
        assert_eq!(config.resume_delay, Duration::from_millis(50));
    }
}
