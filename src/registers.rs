//! MAX77665 charger block register map.
//!
//! Addresses, field masks, detail codes and the value→register lookup
//! tables. Everything here is data; the bus traffic lives in the modules
//! that use it.

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Register addresses
// ---------------------------------------------------------------------------

pub const CHG_INT: u8 = 0xB0;
pub const CHG_INT_MASK: u8 = 0xB1;
pub const CHG_INT_OK: u8 = 0xB2;
pub const CHG_DTLS_00: u8 = 0xB3;
pub const CHG_DTLS_01: u8 = 0xB4;
pub const CHG_DTLS_02: u8 = 0xB5;
pub const CHG_CNFG_00: u8 = 0xB7;
pub const CHG_CNFG_01: u8 = 0xB8;
pub const CHG_CNFG_02: u8 = 0xB9;
pub const CHG_CNFG_04: u8 = 0xBB;
pub const CHG_CNFG_06: u8 = 0xBD;
pub const CHG_CNFG_09: u8 = 0xC0;
pub const CHG_CNFG_12: u8 = 0xC3;
pub const SAFEOUT_CTRL: u8 = 0xC6;

// ---------------------------------------------------------------------------
// Status bits (CHG_INT / CHG_INT_OK / CHG_INT_MASK share the layout)
// ---------------------------------------------------------------------------

pub const BYP_BIT: u8 = 0x01;
pub const DETBAT_BIT: u8 = 0x04;
pub const BAT_BIT: u8 = 0x08;
pub const CHG_BIT: u8 = 0x10;
pub const CHGIN_BIT: u8 = 0x40;

// ---------------------------------------------------------------------------
// Detail fields
// ---------------------------------------------------------------------------

/// CHG_DTLS_00: charging-input detail, bits 5..6. 0b11 = VCHGIN valid.
pub const CHGIN_DTLS_MASK: u8 = 0x60;
pub const CHGIN_DTLS_VALID: u8 = 0x60;

/// CHG_DTLS_01: charger detail, bits 0..3.
pub const CHG_DTLS_MASK: u8 = 0x0F;

/// CHG_DTLS_01: battery detail, bits 4..6.
pub const BAT_DTLS_MASK: u8 = 0x70;
pub const BAT_DTLS_SHIFT: u8 = 4;
/// Battery detail code: battery-to-system overcurrent.
pub const BAT_DTLS_OVERCURRENT: u8 = 0x06;

/// CHG_DTLS_02: bypass detail, bits 0..3. 0x0 = regulation loop nominal.
pub const BYP_DTLS_MASK: u8 = 0x0F;
pub const BYP_DTLS_VALID: u8 = 0x00;

/// Charger detail codes 0x0..=0x3 are the active charge phases
/// (prequalification, fast-charge CC, fast-charge CV, top-off).
pub fn charging_active(dtls_01: u8) -> bool {
    (dtls_01 & CHG_DTLS_MASK) <= 0x03
}

/// Extract the battery detail code from CHG_DTLS_01.
pub fn battery_detail(dtls_01: u8) -> u8 {
    (dtls_01 & BAT_DTLS_MASK) >> BAT_DTLS_SHIFT
}

// ---------------------------------------------------------------------------
// CHG_CNFG_00: operating mode
// ---------------------------------------------------------------------------

/// Charger off, OTG off, buck on, boost off.
pub const MODE_BUCK_ONLY: u8 = 0x04;
/// Charger on, OTG off, buck on, boost off.
pub const MODE_CHARGER_BUCK: u8 = 0x05;
/// Charger off, OTG on, buck off, boost on.
pub const MODE_OTG_BOOST: u8 = 0x0A;
/// Hardware charging watchdog enable.
pub const WDTEN: u8 = 0x10;

// ---------------------------------------------------------------------------
// CHG_CNFG_01: charge profile
// ---------------------------------------------------------------------------

pub const FAST_CHARGE_DURATION_4HR: u8 = 0x01;
pub const CHARGER_RESTART_THRESHOLD_150MV: u8 = 0x10;
pub const LOW_BATTERY_PREQUAL_ENABLE: u8 = 0x80;

// ---------------------------------------------------------------------------
// CHG_CNFG_06: write protection and watchdog clear
// ---------------------------------------------------------------------------

pub const CHGPROT_UNLOCK: u8 = 0x0C;
pub const CHGPROT_LOCK: u8 = 0x00;
pub const WDTCLR: u8 = 0x01;

// ---------------------------------------------------------------------------
// CHG_CNFG_09: input-current ceiling
// ---------------------------------------------------------------------------

/// Current-register granularity, mA per LSB.
pub const CURRENT_STEP_MA: u32 = 20;
/// The chip never draws less than this regardless of the register value.
pub const MIN_CURRENT_LIMIT_MA: u32 = 100;
/// Valid bits of the ceiling field.
pub const CHGIN_ILIM_MASK: u8 = 0x7F;

// ---------------------------------------------------------------------------
// CHG_CNFG_12: input regulation + overcurrent threshold
// ---------------------------------------------------------------------------

/// VCHGIN regulation-loop threshold of 4.3 V. Keeps VBUS above the USB
/// charging spec's undershoot tolerance during cable transients.
pub const VCHGIN_REGULATION_4V3: u8 = 0x08;
/// Battery-to-system overcurrent threshold select, bits 0..2.
pub const B2SOVRC_MASK: u8 = 0x07;

// ---------------------------------------------------------------------------
// SAFEOUT_CTRL
// ---------------------------------------------------------------------------

pub const ENSAFEOUT1: u8 = 0x40;
pub const ENSAFEOUT2: u8 = 0x80;

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Fast-charge current in mA, indexed by CHG_CNFG_02 code.
pub const CHG_CC_MA: [u32; 64] = [
    0, 33, 66, 99, 133, 166, 199, 233, 266, 299, //
    333, 366, 399, 432, 466, 499, 532, 566, 599, 632, //
    666, 699, 732, 765, 799, 832, 865, 899, 932, 965, //
    999, 1032, 1065, 1098, 1132, 1165, 1198, 1232, 1265, 1298, //
    1332, 1365, 1398, 1421, 1465, 1498, 1531, 1565, 1598, 1631, //
    1665, 1698, 1731, 1764, 1798, 1831, 1864, 1898, 1931, 1964, //
    1998, 2031, 2064, 2097,
];

/// Primary charge termination voltage in mV, indexed by CHG_CNFG_04 code.
pub const CHG_CV_PRM_MV: [u32; 32] = [
    3650, 3675, 3700, 3725, 3750, 3775, 3800, 3825, 3850, 3875, //
    3900, 3925, 3950, 3975, 4000, 4025, 4050, 4075, 4100, 4125, //
    4150, 4175, 4200, 4225, 4250, 4275, 4300, 4325, 4340, 4350, //
    4375, 4400,
];

/// Battery-to-system overcurrent thresholds in mA, indexed by the
/// B2SOVRC field of CHG_CNFG_12.
pub const BAT_TO_SYS_OC_THRESHOLD_MA: [u32; 8] =
    [0, 3000, 3250, 3500, 3750, 4000, 4250, 4500];

/// Default overcurrent threshold programmed at initialization (3250 mA).
pub const BAT_TO_SYS_OC_DEFAULT: u8 = 0x02;

/// Convert a physical value to its register index via a lookup table.
///
/// The tables are sorted ascending; the returned index is the largest
/// entry not exceeding `value`. Values outside the table range are
/// rejected before any register write is attempted.
pub fn lookup_register_index(table: &'static str, tbl: &[u32], value: u32) -> Result<u8> {
    if value < tbl[0] || value > tbl[tbl.len() - 1] {
        return Err(Error::UnsupportedValue { table, value });
    }
    let mut idx = tbl.len() - 1;
    for i in 0..tbl.len() - 1 {
        if tbl[i] <= value && value < tbl[i + 1] {
            idx = i;
            break;
        }
    }
    Ok(idx as u8)
}

/// Select the overcurrent threshold index: the first table entry at or
/// above the requested current, clamped to the maximum threshold.
pub fn oc_threshold_index(ma: u32) -> u8 {
    for (i, thr) in BAT_TO_SYS_OC_THRESHOLD_MA.iter().enumerate() {
        if ma <= *thr {
            return i as u8;
        }
    }
    (BAT_TO_SYS_OC_THRESHOLD_MA.len() - 1) as u8
}
