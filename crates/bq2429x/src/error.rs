//! Charger error type.

use crate::config::ConfigError;

/// Operation rejected because the hardware is not in a state that allows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Precondition {
    /// OTG boost needs a battery (NTC reports none, or over/under temperature)
    #[error("battery absent or outside temperature window")]
    BatteryAbsent,
}

/// Errors returned by the charger core.
///
/// `E` is the [`platform::RegisterBus`] error. Transport errors inside the
/// detection loop are logged and retried on the next tick; everything else
/// is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Register read or write failed
    #[error("register transfer failed: {0:?}")]
    Transport(E),
    /// Hardware precondition not met; nothing was written
    #[error("precondition not met: {0}")]
    Precondition(Precondition),
    /// Configuration rejected at attach
    #[error("invalid configuration: {0}")]
    Config(ConfigError),
    /// Device not reachable yet; attach may be retried later
    #[error("device not ready, retry attach")]
    Deferred,
    /// REG0A does not identify a supported part (raw value attached)
    #[error("unsupported device id {0:#04x}")]
    UnsupportedDevice(u8),
    /// Capability not provided by this output
    #[error("operation not supported")]
    Unsupported,
    /// Requested value not representable by the hardware
    #[error("value out of range")]
    InvalidValue,
    /// Property is not writable
    #[error("property is read-only")]
    ReadOnly,
}

impl<E> Error<E> {
    /// Whether this is a bus failure (worth retrying)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl<E> From<ConfigError> for Error<E> {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl<E> From<Precondition> for Error<E> {
    fn from(precondition: Precondition) -> Self {
        Self::Precondition(precondition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let e: Error<()> = Error::UnsupportedDevice(0x8B);
        assert_eq!(std::format!("{e}"), "unsupported device id 0x8b");
        let e: Error<()> = Precondition::BatteryAbsent.into();
        assert_eq!(
            std::format!("{e}"),
            "precondition not met: battery absent or outside temperature window"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(Error::Transport(3u8).is_transport());
        assert!(!Error::<u8>::Deferred.is_transport());
        let e: Error<u8> = ConfigError::ZeroCurrent.into();
        assert_eq!(e, Error::Config(ConfigError::ZeroCurrent));
    }
}
