//! Power framework abstraction
//!
//! Capability sets a charger driver offers to the host's regulator and
//! power-supply frameworks. Drivers implement the traits; the framework
//! adapter holds them and never reaches into driver internals.

/// Voltage/current regulator capability set.
///
/// Voltages are in microvolts, currents in microamps. Optional capabilities
/// (current limiting, switching) default to [`Regulator::unsupported`].
pub trait Regulator {
    /// Error type
    type Error: core::fmt::Debug;

    /// Static description of this output
    fn descriptor(&self) -> &RegulatorDescriptor;

    /// Error returned by capabilities this regulator does not have
    fn unsupported(&self) -> Self::Error;

    /// Current output voltage setpoint
    async fn voltage_uv(&self) -> Result<u32, Self::Error>;

    /// Program a setpoint inside `[min_uv, max_uv]`
    async fn set_voltage_uv(&self, min_uv: u32, max_uv: u32) -> Result<(), Self::Error>;

    /// Output current limit
    async fn current_limit_ua(&self) -> Result<u32, Self::Error> {
        Err(self.unsupported())
    }

    /// Program a current limit inside `[min_ua, max_ua]`
    async fn set_current_limit_ua(&self, _min_ua: u32, _max_ua: u32) -> Result<(), Self::Error> {
        Err(self.unsupported())
    }

    /// Switch the output on
    async fn enable(&self) -> Result<(), Self::Error> {
        Err(self.unsupported())
    }

    /// Switch the output off
    async fn disable(&self) -> Result<(), Self::Error> {
        Err(self.unsupported())
    }

    /// Whether the output is currently switched on
    async fn is_enabled(&self) -> Result<bool, Self::Error>;
}

/// Static regulator description (name and selectable voltages)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegulatorDescriptor {
    /// Framework-visible name, e.g. `"bq2429x-otg"`
    pub name: &'static str,
    /// Selectable output voltages in ascending order (µV)
    pub voltages_uv: &'static [u32],
}

impl RegulatorDescriptor {
    /// Number of selectable voltages
    pub fn n_voltages(&self) -> usize {
        self.voltages_uv.len()
    }
}

/// Snapshot of a regulator as read back from hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegulatorState {
    /// Output switched on
    pub enabled: bool,
    /// Current limit in µA, `None` when the output has no limit control
    pub current_limit_ua: Option<u32>,
    /// Voltage setpoint in µV
    pub voltage_uv: u32,
}

/// Properties a charger publishes to the power-supply framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyProperty {
    /// Charging status
    Status,
    /// Charge phase
    ChargeType,
    /// Input voltage estimate (µV)
    VoltageNow,
    /// Maximum input current (µA)
    CurrentMax,
    /// Programmed input current limit (µA), writable
    InputCurrentLimit,
    /// Charge current estimate (µA)
    CurrentNow,
    /// Battery temperature estimate (0.1 °C)
    Temperature,
    /// External power present
    Online,
    /// Battery present
    Present,
}

/// Typed property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyValue {
    /// [`SupplyProperty::Status`]
    Status(ChargingStatus),
    /// [`SupplyProperty::ChargeType`]
    ChargeType(ChargeType),
    /// Microvolts
    Microvolts(u32),
    /// Microamps
    Microamps(u32),
    /// Tenths of a degree Celsius
    DeciCelsius(i16),
    /// Boolean flag (online / present)
    Flag(bool),
}

/// Charging status as seen by the power-supply framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargingStatus {
    /// Not charging
    NotCharging,
    /// Charging (pre-charge or fast charge)
    Charging,
    /// Charge terminated
    Full,
}

/// Charge phase as seen by the power-supply framework
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeType {
    /// No charge current
    None,
    /// Pre-charge (trickle)
    Trickle,
    /// Fast charge
    Fast,
}

/// Power-supply capability set
pub trait PowerSupply {
    /// Error type
    type Error: core::fmt::Debug;

    /// Properties this supply publishes
    fn properties(&self) -> &'static [SupplyProperty];

    /// Whether `property` accepts writes
    fn property_is_writeable(&self, property: SupplyProperty) -> bool;

    /// Read a property
    async fn get_property(&self, property: SupplyProperty) -> Result<SupplyValue, Self::Error>;

    /// Write a property
    async fn set_property(
        &self,
        property: SupplyProperty,
        value: SupplyValue,
    ) -> Result<(), Self::Error>;
}

/// External power input transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyEvent {
    /// Input power became available
    InputAttached,
    /// Input power went away
    InputRemoved,
}

/// Receiver of [`SupplyEvent`]s (the framework's "supply changed" hook)
pub trait SupplyEventSink {
    /// Called once per transition, outside any driver lock
    fn supply_changed(&mut self, event: SupplyEvent);
}

/// Sink that drops every event
impl SupplyEventSink for () {
    fn supply_changed(&mut self, _event: SupplyEvent) {}
}
