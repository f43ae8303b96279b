//! BQ24296/BQ24297/MP2624 register map.
//!
//! Eleven one-byte registers, `REG00`..`REG0A`. Multi-bit settings are
//! described as [`Field`]s (offset + unshifted mask) so the codec and the
//! read-modify-write helper share one source of truth.
//!
//! Reference: Texas Instruments BQ24296 datasheet (SLUSBV7), section 8.5.

/// Default 7-bit I2C device address (fixed in silicon).
pub const I2C_ADDRESS: u8 = 0x6B;

/// Number of registers in the map.
pub const REGISTER_COUNT: usize = 11;

/// Register addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Register {
    /// REG00: Input source control (EN_HIZ, VINDPM, IINLIM)
    InputSourceControl = 0x00,
    /// REG01: Power-on configuration (REG_RST, WD_RST, CHG_CONFIG, SYS_MIN, BOOST_LIM)
    PowerOnConfig = 0x01,
    /// REG02: Charge current control (ICHG)
    ChargeCurrentControl = 0x02,
    /// REG03: Pre-charge / termination current control (IPRECHG, ITERM)
    PreChargeTerminationControl = 0x03,
    /// REG04: Charge voltage control (VREG, BATLOWV, VRECHG)
    ChargeVoltageControl = 0x04,
    /// REG05: Charge termination / timer control (EN_TERM, WATCHDOG, EN_TIMER)
    TerminationTimerControl = 0x05,
    /// REG06: Boost voltage / thermal regulation control (BOOSTV, BHOT, TREG)
    BoostThermalControl = 0x06,
    /// REG07: Misc operation control (DPDM_EN, TMR2X_EN, BATFET_Disable, INT_MASK)
    MiscOperationControl = 0x07,
    /// REG08: System status (VBUS_STAT, CHRG_STAT, DPM_STAT, PG_STAT, THERM_STAT, VSYS_STAT)
    SystemStatus = 0x08,
    /// REG09: Fault (WATCHDOG_FAULT, OTG_FAULT, CHRG_FAULT, BAT_FAULT, NTC_FAULT)
    Fault = 0x09,
    /// REG0A: Vendor / part / revision status
    VendorStatus = 0x0A,
}

impl Register {
    /// All registers in address order
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::InputSourceControl,
        Register::PowerOnConfig,
        Register::ChargeCurrentControl,
        Register::PreChargeTerminationControl,
        Register::ChargeVoltageControl,
        Register::TerminationTimerControl,
        Register::BoostThermalControl,
        Register::MiscOperationControl,
        Register::SystemStatus,
        Register::Fault,
        Register::VendorStatus,
    ];

    /// Bus address of this register
    #[inline]
    pub const fn addr(self) -> u8 {
        self as u8
    }
}

/// A bit field inside one register: value = `(byte >> offset) & mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Register holding the field
    pub register: Register,
    /// Bit position of the field's LSB
    pub offset: u8,
    /// Unshifted mask
    pub mask: u8,
}

#[allow(clippy::arithmetic_side_effects)] // Safety: offset < 8 for every field below
impl Field {
    const fn new(register: Register, offset: u8, mask: u8) -> Self {
        Self {
            register,
            offset,
            mask,
        }
    }

    /// Extract the field from a raw register byte
    #[inline]
    pub const fn get(self, byte: u8) -> u8 {
        (byte >> self.offset) & self.mask
    }

    /// Shift `value` into position (excess bits are masked off)
    #[inline]
    pub const fn place(self, value: u8) -> u8 {
        (value & self.mask) << self.offset
    }

    /// In-position mask
    #[inline]
    pub const fn shifted_mask(self) -> u8 {
        self.mask << self.offset
    }

    /// Replace the field inside `byte`, leaving other bits untouched
    #[inline]
    pub const fn replace(self, byte: u8, value: u8) -> u8 {
        (byte & !self.shifted_mask()) | self.place(value)
    }
}

// ── REG00 ────────────────────────────────────────────────────────────────────

/// EN_HIZ: 1 = input high-impedance, no current drawn from VBUS
pub const EN_HIZ: Field = Field::new(Register::InputSourceControl, 7, 0x01);
/// VINDPM: input voltage limit, 3.88 V + 80 mV/LSB
pub const VINDPM: Field = Field::new(Register::InputSourceControl, 3, 0x0F);
/// IINLIM: input current limit table index
pub const IINLIM: Field = Field::new(Register::InputSourceControl, 0, 0x07);

// ── REG01 ────────────────────────────────────────────────────────────────────

/// REG_RST: register reset (self-clearing)
pub const REGISTER_RESET: Field = Field::new(Register::PowerOnConfig, 7, 0x01);
/// CHG_CONFIG: charge disabled / charge battery / OTG
pub const CHG_CONFIG: Field = Field::new(Register::PowerOnConfig, 4, 0x03);
/// SYS_MIN: minimum system voltage, 3.0 V + 100 mV/LSB
pub const SYS_MIN: Field = Field::new(Register::PowerOnConfig, 1, 0x07);
/// BOOST_LIM: OTG current limit, 0 = 1.0 A, 1 = 1.5 A
pub const BOOST_LIM: Field = Field::new(Register::PowerOnConfig, 0, 0x01);

// ── REG02..REG06 ─────────────────────────────────────────────────────────────

/// ICHG: fast charge current, 512 mA + 64 mA/LSB
pub const ICHG: Field = Field::new(Register::ChargeCurrentControl, 2, 0x3F);
/// IPRECHG: pre-charge current, 128 mA + 128 mA/LSB
pub const IPRECHG: Field = Field::new(Register::PreChargeTerminationControl, 4, 0x0F);
/// ITERM: termination current, 128 mA + 128 mA/LSB
pub const ITERM: Field = Field::new(Register::PreChargeTerminationControl, 0, 0x0F);
/// VREG: charge voltage, 3.504 V + 16 mV/LSB
pub const VREG: Field = Field::new(Register::ChargeVoltageControl, 2, 0x3F);
/// WATCHDOG: I2C watchdog timer setting
pub const WATCHDOG: Field = Field::new(Register::TerminationTimerControl, 4, 0x03);
/// BOOSTV: OTG boost voltage, 4.55 V + 64 mV/LSB
pub const BOOSTV: Field = Field::new(Register::BoostThermalControl, 4, 0x0F);

// ── REG08 ────────────────────────────────────────────────────────────────────

/// VBUS_STAT: input source type
pub const VBUS_STAT: Field = Field::new(Register::SystemStatus, 6, 0x03);
/// CHRG_STAT: charge phase
pub const CHRG_STAT: Field = Field::new(Register::SystemStatus, 4, 0x03);
/// DPM_STAT: input voltage/current dynamic power management active
pub const DPM_STAT: u8 = 1 << 3;
/// PG_STAT: power good (VBUS present and valid)
pub const PG_STAT: u8 = 1 << 2;
/// THERM_STAT: thermal regulation active
pub const THERM_STAT: u8 = 1 << 1;
/// VSYS_STAT: battery below VSYSMIN, system in regulation
pub const VSYS_STAT: u8 = 1 << 0;

// ── REG09 ────────────────────────────────────────────────────────────────────

/// WATCHDOG_FAULT: watchdog timer expired
pub const WATCHDOG_FAULT: u8 = 1 << 7;
/// OTG_FAULT: VBUS overloaded in OTG or VBUS OVP
pub const OTG_FAULT: u8 = 1 << 6;
/// CHRG_FAULT: input fault / thermal shutdown / safety timer expired
pub const CHRG_FAULT: Field = Field::new(Register::Fault, 4, 0x03);
/// BAT_FAULT: battery over-voltage
pub const BAT_FAULT: u8 = 1 << 3;
/// Reserved bit of REG09 (reads 0 on healthy parts)
pub const FAULT_RESERVED: u8 = 1 << 2;
/// NTC_FAULT: thermistor cold (bit 1) / hot (bit 0)
pub const NTC_FAULT: Field = Field::new(Register::Fault, 0, 0x03);
/// NTC cold bit inside REG09
pub const NTC_COLD: u8 = 1 << 1;
/// NTC hot bit inside REG09
pub const NTC_HOT: u8 = 1 << 0;

// ── REG0A ────────────────────────────────────────────────────────────────────

/// Bits of REG0A that identify the part family (PN + reserved)
pub const VENDOR_ID_MASK: u8 = 0xA7;
/// Expected value of `REG0A & VENDOR_ID_MASK` for BQ24296/BQ24297/MP2624
pub const VENDOR_ID: u8 = 0x20;

/// True if a raw REG0A value identifies a supported part.
#[inline]
pub const fn is_supported_vendor(reg0a: u8) -> bool {
    reg0a & VENDOR_ID_MASK == VENDOR_ID
}

// ── Decoded field values ─────────────────────────────────────────────────────

/// VBUS_STAT values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VbusStatus {
    /// No input or unknown source
    Unknown,
    /// USB host port
    UsbHost,
    /// Dedicated adapter port
    Adapter,
    /// Boost (OTG) output active
    Otg,
}

impl VbusStatus {
    /// Decode the two VBUS_STAT bits
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Unknown,
            1 => Self::UsbHost,
            2 => Self::Adapter,
            _ => Self::Otg,
        }
    }
}

/// CHRG_STAT values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeStatus {
    /// Not charging
    NotCharging,
    /// Pre-charge (battery below BATLOWV)
    PreCharge,
    /// Fast charging (constant current / constant voltage)
    FastCharge,
    /// Charge terminated
    Done,
}

impl ChargeStatus {
    /// Decode the two CHRG_STAT bits
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::NotCharging,
            1 => Self::PreCharge,
            2 => Self::FastCharge,
            _ => Self::Done,
        }
    }
}

/// CHRG_FAULT values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeFault {
    /// No fault
    Normal,
    /// Input fault (VBUS OVP or VBUS dropped / unplugged)
    Input,
    /// Thermal shutdown
    Thermal,
    /// Charge safety timer expired
    SafetyTimer,
}

impl ChargeFault {
    /// Decode the two CHRG_FAULT bits
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Normal,
            1 => Self::Input,
            2 => Self::Thermal,
            _ => Self::SafetyTimer,
        }
    }
}

/// CHG_CONFIG values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChargeMode {
    /// Charger off, boost off
    Disabled,
    /// Charge the battery from VBUS
    ChargeBattery,
    /// Boost the battery out onto VBUS
    Otg,
}

impl ChargeMode {
    /// Encoding written to CHG_CONFIG
    pub const fn bits(self) -> u8 {
        match self {
            Self::Disabled => 0b00,
            Self::ChargeBattery => 0b01,
            Self::Otg => 0b10,
        }
    }

    /// Decode CHG_CONFIG; both `0b10` and `0b11` select OTG
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0b00 => Self::Disabled,
            0b01 => Self::ChargeBattery,
            _ => Self::Otg,
        }
    }
}

/// REG08 (system status) wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemStatus(pub u8);

impl SystemStatus {
    /// Input source type
    pub const fn vbus(self) -> VbusStatus {
        VbusStatus::from_bits(VBUS_STAT.get(self.0))
    }

    /// Charge phase
    pub const fn charge(self) -> ChargeStatus {
        ChargeStatus::from_bits(CHRG_STAT.get(self.0))
    }

    /// Input DPM active
    pub const fn in_dpm(self) -> bool {
        self.0 & DPM_STAT != 0
    }

    /// VBUS present and good
    pub const fn power_good(self) -> bool {
        self.0 & PG_STAT != 0
    }

    /// Thermal regulation active
    pub const fn in_thermal_regulation(self) -> bool {
        self.0 & THERM_STAT != 0
    }

    /// System voltage held at VSYSMIN
    pub const fn in_vsys_regulation(self) -> bool {
        self.0 & VSYS_STAT != 0
    }
}

/// REG09 (fault) wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FaultStatus(pub u8);

impl FaultStatus {
    /// Watchdog expired
    pub const fn watchdog(self) -> bool {
        self.0 & WATCHDOG_FAULT != 0
    }

    /// OTG overload / VBUS OVP
    pub const fn otg(self) -> bool {
        self.0 & OTG_FAULT != 0
    }

    /// Charge fault sub-field
    pub const fn charge(self) -> ChargeFault {
        ChargeFault::from_bits(CHRG_FAULT.get(self.0))
    }

    /// Battery over-voltage
    pub const fn battery(self) -> bool {
        self.0 & BAT_FAULT != 0
    }

    /// Raw NTC fault code (0 = none)
    pub const fn ntc(self) -> u8 {
        NTC_FAULT.get(self.0)
    }

    /// Thermistor reports cold
    pub const fn too_cold(self) -> bool {
        self.0 & NTC_COLD != 0
    }

    /// Thermistor reports hot
    pub const fn too_hot(self) -> bool {
        self.0 & NTC_HOT != 0
    }
}

/// REG08 + REG09 sampled in the same detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterSnapshot {
    /// REG08
    pub system: SystemStatus,
    /// REG09
    pub fault: FaultStatus,
}

impl RegisterSnapshot {
    /// Build from raw REG08/REG09 bytes
    pub const fn new(system: u8, fault: u8) -> Self {
        Self {
            system: SystemStatus(system),
            fault: FaultStatus(fault),
        }
    }

    /// Value no real pass can produce; seeds edge detection so the first
    /// sample is always reported.
    pub const UNSEEN: Self = Self::new(0xFF, 0xFF);

    /// Battery presence heuristic: a thermistor fault is taken to mean the
    /// pack (and its NTC) is missing.
    pub const fn battery_present(&self) -> bool {
        self.fault.ntc() == 0
    }

    /// VBUS available
    pub const fn input_present(&self) -> bool {
        self.system.power_good()
    }
}

impl core::fmt::Display for RegisterSnapshot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.system;
        write!(f, "r8={:02x}", s.0)?;
        match s.vbus() {
            VbusStatus::Unknown => {}
            VbusStatus::UsbHost => f.write_str(" HOST")?,
            VbusStatus::Adapter => f.write_str(" ADAP")?,
            VbusStatus::Otg => f.write_str(" OTG")?,
        }
        match s.charge() {
            ChargeStatus::NotCharging => {}
            ChargeStatus::PreCharge => f.write_str(" PRECHG")?,
            ChargeStatus::FastCharge => f.write_str(" FCHG")?,
            ChargeStatus::Done => f.write_str(" CHGTERM")?,
        }
        if s.in_dpm() {
            f.write_str(" INDPM")?;
        }
        if s.power_good() {
            f.write_str(" PWRGOOD")?;
        }
        if s.in_thermal_regulation() {
            f.write_str(" THERMREG")?;
        }
        if s.in_vsys_regulation() {
            f.write_str(" VSYSMIN")?;
        }

        let r = self.fault;
        write!(f, " r9={:02x}", r.0)?;
        if r.watchdog() {
            f.write_str(" WDOG")?;
        }
        if r.otg() {
            f.write_str(" OTGFAULT")?;
        }
        match r.charge() {
            ChargeFault::Normal => {}
            ChargeFault::Input => f.write_str(" UNPLUG")?,
            ChargeFault::Thermal => f.write_str(" THERMAL")?,
            ChargeFault::SafetyTimer => f.write_str(" CHGTIME")?,
        }
        if r.battery() {
            f.write_str(" BATFAULT")?;
        }
        if r.0 & FAULT_RESERVED != 0 {
            f.write_str(" RESERVED")?;
        }
        if r.too_cold() {
            f.write_str(" COLD")?;
        }
        if r.too_hot() {
            f.write_str(" HOT")?;
        }
        Ok(())
    }
}
