// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! `tdata3` (`textra32`/`textra64`): extra match conditions on the hart's
//! software and hypervisor context.

use bilge::prelude::*;

use crate::hart::{HartState, Xlen};

/// `textra64` layout.
#[bitsize(64)]
#[derive(Copy, Clone, PartialEq, Eq, FromBits, DebugBits)]
pub struct Textra64 {
    pub sselect: u2,
    pub svalue: u34,
    pub sbytemask: u5,
    _reserved: u7,
    pub mhselect: u3,
    pub mhvalue: u13,
}

/// `textra32` layout.
#[bitsize(32)]
#[derive(Copy, Clone, PartialEq, Eq, FromBits, DebugBits)]
pub struct Textra32 {
    pub sselect: u2,
    pub svalue: u16,
    pub sbytemask: u2,
    _reserved: u3,
    pub mhselect: u3,
    pub mhvalue: u6,
}

/// Source compared against `svalue`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Sselect {
    #[default]
    Ignore = 0,
    Scontext = 1,
    Asid = 2,
}

impl Sselect {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Scontext,
            2 => Self::Asid,
            _ => Self::Ignore,
        }
    }
}

/// Source compared against `mhvalue`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MhselectMode {
    Ignore,
    Mcontext,
    Vmid,
}

/// Meaning of a legal `mhselect` code.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MhselectInterpretation {
    pub mhselect: u8,
    pub mode: MhselectMode,
    /// Whether `mhselect[2]` is appended below `mhvalue`. `None` when ignored.
    pub shift_mhvalue: Option<bool>,
}

impl MhselectInterpretation {
    const fn new(mhselect: u8, mode: MhselectMode, shift_mhvalue: Option<bool>) -> Self {
        Self {
            mhselect,
            mode,
            shift_mhvalue,
        }
    }

    /// Value the live context is compared against.
    pub fn compare_val(&self, mhvalue: u64) -> Option<u64> {
        self.shift_mhvalue.map(|shift| {
            if shift {
                mhvalue << 1 | u64::from(self.mhselect >> 2)
            } else {
                mhvalue
            }
        })
    }
}

/// Legal `mhselect` for each raw code when the hypervisor extension is on.
pub const MHSELECT_LEGAL_H: [u8; 8] = [0, 1, 2, 0, 4, 5, 6, 4];

/// Legal `mhselect` for each raw code without the hypervisor extension.
pub const MHSELECT_LEGAL_NO_H: [u8; 8] = [0, 0, 0, 0, 4, 4, 4, 4];

/// Interpretation of each legal `mhselect` code.
pub const MHSELECT_TABLE: [Option<MhselectInterpretation>; 8] = [
    Some(MhselectInterpretation::new(0, MhselectMode::Ignore, None)),
    Some(MhselectInterpretation::new(1, MhselectMode::Mcontext, Some(true))),
    Some(MhselectInterpretation::new(2, MhselectMode::Vmid, Some(true))),
    None,
    Some(MhselectInterpretation::new(4, MhselectMode::Mcontext, Some(false))),
    Some(MhselectInterpretation::new(5, MhselectMode::Mcontext, Some(true))),
    Some(MhselectInterpretation::new(6, MhselectMode::Vmid, Some(true))),
    None,
];

const fn svalue_bits(xlen: Xlen) -> u32 {
    match xlen {
        Xlen::Rv32 => 16,
        Xlen::Rv64 => 34,
    }
}

const fn sbytemask_bits(xlen: Xlen) -> u32 {
    match xlen {
        Xlen::Rv32 => 2,
        Xlen::Rv64 => 5,
    }
}

const fn mhvalue_bits(xlen: Xlen) -> u32 {
    match xlen {
        Xlen::Rv32 => 6,
        Xlen::Rv64 => 13,
    }
}

const fn asid_mask(xlen: Xlen) -> u64 {
    match xlen {
        Xlen::Rv32 => 0x1ff,
        Xlen::Rv64 => 0xffff,
    }
}

#[inline]
const fn low_mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

/// Decoded `tdata3`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Textra {
    pub sselect: Sselect,
    pub svalue: u64,
    pub sbytemask: u8,
    /// Raw code as written, legalized when read or used.
    pub mhselect: u8,
    pub mhvalue: u64,
}

impl Textra {
    pub const fn new() -> Self {
        Self {
            sselect: Sselect::Ignore,
            svalue: 0,
            sbytemask: 0,
            mhselect: 0,
            mhvalue: 0,
        }
    }

    pub fn write(&mut self, hart: &HartState, value: u64) {
        let (sselect, svalue, sbytemask, mhselect, mhvalue) = match hart.xlen {
            Xlen::Rv32 => {
                let bits = Textra32::from(value as u32);
                (
                    bits.sselect().value(),
                    u64::from(bits.svalue()),
                    bits.sbytemask().value(),
                    bits.mhselect().value(),
                    u64::from(bits.mhvalue().value()),
                )
            }
            Xlen::Rv64 => {
                let bits = Textra64::from(value);
                (
                    bits.sselect().value(),
                    bits.svalue().value(),
                    bits.sbytemask().value(),
                    bits.mhselect().value(),
                    u64::from(bits.mhvalue().value()),
                )
            }
        };
        let s_enabled = hart.supervisor_enabled();
        self.sselect = if s_enabled {
            Sselect::from_raw(sselect)
        } else {
            Sselect::Ignore
        };
        self.svalue = if s_enabled { svalue } else { 0 };
        self.sbytemask = sbytemask;
        self.mhselect = mhselect;
        self.mhvalue = mhvalue;
        log::trace!(target: "textra", "{value:#x} => {self:?}");
    }

    pub fn read(&self, hart: &HartState) -> u64 {
        let xlen = hart.xlen;
        let mhselect = self.interpret_mhselect(hart.hypervisor_enabled()).mhselect;
        let svalue = self.svalue & low_mask(svalue_bits(xlen));
        let sbytemask = self.sbytemask & low_mask(sbytemask_bits(xlen)) as u8;
        let mhvalue = self.mhvalue & low_mask(mhvalue_bits(xlen));
        match xlen {
            Xlen::Rv32 => {
                let mut bits = Textra32::from(0_u32);
                bits.set_sselect(u2::new(self.sselect as u8));
                bits.set_svalue(svalue as u16);
                bits.set_sbytemask(u2::new(sbytemask));
                bits.set_mhselect(u3::new(mhselect));
                bits.set_mhvalue(u6::new(mhvalue as u8));
                u64::from(u32::from(bits))
            }
            Xlen::Rv64 => {
                let mut bits = Textra64::from(0_u64);
                bits.set_sselect(u2::new(self.sselect as u8));
                bits.set_svalue(u34::new(svalue));
                bits.set_sbytemask(u5::new(sbytemask));
                bits.set_mhselect(u3::new(mhselect));
                bits.set_mhvalue(u13::new(mhvalue as u16));
                u64::from(bits)
            }
        }
    }

    pub fn interpret_mhselect(&self, h_enabled: bool) -> MhselectInterpretation {
        let raw = usize::from(self.mhselect & 0b111);
        let legal = if h_enabled {
            MHSELECT_LEGAL_H[raw]
        } else {
            MHSELECT_LEGAL_NO_H[raw]
        };
        let Some(interpretation) = MHSELECT_TABLE[usize::from(legal)] else {
            unreachable!("mhselect {raw} legalized to reserved code {legal}");
        };
        assert_eq!(interpretation.mhselect, legal);
        interpretation
    }

    /// Whether the hart's live context satisfies every enabled condition.
    pub fn matches(&self, hart: &HartState) -> bool {
        let xlen = hart.xlen;
        match self.sselect {
            Sselect::Ignore => {}
            Sselect::Scontext => {
                let mut mask = low_mask(svalue_bits(xlen));
                for byte in 0..sbytemask_bits(xlen) {
                    if self.sbytemask & (1 << byte) != 0 {
                        mask &= !(0xff << (byte * 8));
                    }
                }
                if hart.scontext & mask != self.svalue & mask {
                    return false;
                }
            }
            Sselect::Asid => {
                let mask = asid_mask(xlen);
                if hart.asid & mask != self.svalue & mask {
                    return false;
                }
            }
        }

        let interpretation = self.interpret_mhselect(hart.hypervisor_enabled());
        let mhvalue = self.mhvalue & low_mask(mhvalue_bits(xlen));
        match (interpretation.mode, interpretation.compare_val(mhvalue)) {
            (MhselectMode::Mcontext, Some(compare)) => {
                let mask = low_mask(mhvalue_bits(xlen) + 1);
                hart.mcontext & mask == compare & mask
            }
            (MhselectMode::Vmid, Some(compare)) => hart.vmid == compare,
            _ => true,
        }
    }
}
