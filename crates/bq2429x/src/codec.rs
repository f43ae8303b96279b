//! Register codec: physical units (µA, µV) to register bits and back.
//!
//! Pure functions, no I/O. Table-backed fields use the ascending tables
//! below; linear fields follow the datasheet's `offset + step * code`.

use crate::config::ChargerConfig;
use crate::registers::{EN_HIZ, IINLIM, ICHG, IPRECHG, VINDPM};

/// Input current limit table, indexed by IINLIM (µA)
pub const IINLIM_TABLE_UA: [u32; 8] = [
    100_000, 150_000, 500_000, 900_000, 1_000_000, 1_500_000, 2_000_000, 3_000_000,
];

/// Request thresholds selecting IINLIM indices 0..=6; anything at or above
/// the last one selects index 7.
const IINLIM_THRESHOLDS_UA: [u32; 7] = [
    120_000, 400_000, 700_000, 1_000_000, 1_200_000, 1_800_000, 2_200_000,
];

/// Requests below this put the input into high-impedance mode.
pub const HIZ_THRESHOLD_UA: u32 = 80_000;

/// SYS_MIN table (µV): 3.0 V to 3.7 V in 100 mV steps
pub static VSYS_TABLE_UV: [u32; 8] = [
    3_000_000, 3_100_000, 3_200_000, 3_300_000, 3_400_000, 3_500_000, 3_600_000, 3_700_000,
];

/// BOOSTV table (µV): 4.550 V to 5.510 V in 64 mV steps
pub static OTG_TABLE_UV: [u32; 16] = [
    4_550_000, 4_614_000, 4_678_000, 4_742_000, 4_806_000, 4_870_000, 4_934_000, 4_998_000,
    5_062_000, 5_126_000, 5_190_000, 5_254_000, 5_318_000, 5_382_000, 5_446_000, 5_510_000,
];

/// OTG current limits selectable by BOOST_LIM (µA)
pub const OTG_CURRENT_LIMITS_UA: [u32; 2] = [1_000_000, 1_500_000];

const ICHG_STEP_UA: u32 = 64_000;
const ICHG_OFFSET_UA: u32 = 512_000;
const IPRECHG_STEP_UA: u32 = 128_000;
const VINDPM_OFFSET_UV: u32 = 3_880_000;
const VINDPM_STEP_UV: u32 = 80_000;
const VREG_OFFSET_UV: i64 = 3_504_000;
const VREG_STEP_UV: i64 = 16_000;
const VREG_MAX_CODE: i64 = 0x3F;

/// Encoded REG00 input-limit setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IinlimSetting {
    /// IINLIM index (7 when high-impedance)
    pub index: u8,
    /// EN_HIZ
    pub high_impedance: bool,
}

impl IinlimSetting {
    /// EN_HIZ + IINLIM bits, suitable for a masked REG00 update
    pub const fn bits(self) -> u8 {
        EN_HIZ.place(self.high_impedance as u8) | IINLIM.place(self.index)
    }

    /// Mask covering EN_HIZ + IINLIM
    pub const fn mask() -> u8 {
        EN_HIZ.shifted_mask() | IINLIM.shifted_mask()
    }
}

/// Encode an input current request.
///
/// Below [`HIZ_THRESHOLD_UA`] the input goes high-impedance (IINLIM is set
/// to 7 alongside EN_HIZ). Otherwise the highest bracket whose threshold is
/// `<= ua` wins. Monotonic in `ua`.
pub fn encode_input_current_limit(ua: u32) -> IinlimSetting {
    if ua < HIZ_THRESHOLD_UA {
        return IinlimSetting {
            index: 7,
            high_impedance: true,
        };
    }
    let below = IINLIM_THRESHOLDS_UA
        .iter()
        .position(|&threshold| ua < threshold)
        .unwrap_or(IINLIM_THRESHOLDS_UA.len());
    IinlimSetting {
        index: u8::try_from(below).unwrap_or(7),
        high_impedance: false,
    }
}

/// Decode REG00 into the effective input current limit (0 when Hi-Z).
pub fn decode_input_current_limit(reg00: u8) -> u32 {
    if EN_HIZ.get(reg00) != 0 {
        return 0;
    }
    IINLIM_TABLE_UA
        .get(usize::from(IINLIM.get(reg00)))
        .copied()
        .unwrap_or(0)
}

/// Encode a fast-charge current as an ICHG code: `ua / 64 mA`, truncated
/// and clamped to 6 bits.
///
/// Lossy: the 64 mA quantisation does not survive a decode, and decoding
/// adds the 512 mA ICHG offset. Callers wanting a specific register value
/// must account for both.
#[allow(clippy::arithmetic_side_effects)] // Safety: constant non-zero divisor
pub fn encode_charge_current(ua: u32) -> u8 {
    let code = (ua / ICHG_STEP_UA).min(u32::from(ICHG.mask));
    u8::try_from(code).unwrap_or(ICHG.mask)
}

/// Decode REG02 into the fast-charge current (µA)
pub fn decode_fast_charge_current(reg02: u8) -> u32 {
    ICHG_OFFSET_UA.saturating_add(ICHG_STEP_UA.saturating_mul(u32::from(ICHG.get(reg02))))
}

/// Decode REG03 into the pre-charge current (µA)
pub fn decode_precharge_current(reg03: u8) -> u32 {
    IPRECHG_STEP_UA.saturating_add(IPRECHG_STEP_UA.saturating_mul(u32::from(IPRECHG.get(reg03))))
}

/// Decode REG00 into the input voltage DPM threshold (µV)
pub fn decode_vindpm(reg00: u8) -> u32 {
    VINDPM_OFFSET_UV.saturating_add(VINDPM_STEP_UV.saturating_mul(u32::from(VINDPM.get(reg00))))
}

/// VREG code for a system/battery ceiling pair.
///
/// `min(system_max - margin, battery_max)`, then `(v - 3.504 V) / 16 mV`
/// clamped to `0..=63`. Takes signed inputs so any combination clamps
/// instead of wrapping.
pub fn vreg_bits(system_max_uv: i64, battery_max_uv: i64, margin_uv: i64) -> u8 {
    let max_uv = system_max_uv
        .saturating_sub(margin_uv)
        .min(battery_max_uv);
    let code = max_uv
        .saturating_sub(VREG_OFFSET_UV)
        .checked_div(VREG_STEP_UV)
        .unwrap_or(0)
        .clamp(0, VREG_MAX_CODE);
    u8::try_from(code).unwrap_or(0)
}

/// VREG code for `config`. Must be recomputed whenever either ceiling or
/// the chip variant changes.
pub fn encode_max_voltage(config: &ChargerConfig) -> u8 {
    vreg_bits(
        i64::from(config.system_max_voltage_uv),
        i64::from(config.battery_max_voltage_uv),
        i64::from(config.variant.voltage_margin_uv()),
    )
}

/// Decode a SYS_MIN code (µV)
pub fn decode_vsys_voltage(code: u8) -> u32 {
    VSYS_TABLE_UV
        .get(usize::from(code & 0x07))
        .copied()
        .unwrap_or(0)
}

/// Decode a BOOSTV code (µV)
pub fn decode_otg_voltage(code: u8) -> u32 {
    OTG_TABLE_UV
        .get(usize::from(code & 0x0F))
        .copied()
        .unwrap_or(0)
}

/// Pick the BOOSTV code for a `[min_uv, max_uv]` request: the highest table
/// entry not above `max_uv`, provided it is not below `min_uv`.
pub fn select_otg_voltage(min_uv: u32, max_uv: u32) -> Option<u8> {
    let index = OTG_TABLE_UV.iter().rposition(|&uv| uv <= max_uv)?;
    let uv = OTG_TABLE_UV.get(index).copied()?;
    if uv < min_uv {
        return None;
    }
    u8::try_from(index).ok()
}

/// Pick the BOOST_LIM bit for a `[min_ua, max_ua]` request: the highest
/// limit not above `max_ua`, provided it is not below `min_ua`.
pub fn select_otg_current_limit(min_ua: u32, max_ua: u32) -> Option<u8> {
    let index = OTG_CURRENT_LIMITS_UA
        .iter()
        .rposition(|&ua| ua <= max_ua)?;
    let ua = OTG_CURRENT_LIMITS_UA.get(index).copied()?;
    if ua < min_ua {
        return None;
    }
    u8::try_from(index).ok()
}

/// Decode BOOST_LIM (µA)
pub fn decode_otg_current_limit(bit: u8) -> u32 {
    if bit & 0x01 == 0 {
        OTG_CURRENT_LIMITS_UA[0]
    } else {
        OTG_CURRENT_LIMITS_UA[1]
    }
}
