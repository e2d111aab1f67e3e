// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Trigger CSRs as seen by the simulator's CSR instructions.

use std::str::FromStr;

use crate::{
    hart::HartState,
    module::{ConfigError, ModuleConfig, TriggerModule},
    trigger::Tdata,
};

pub const TSELECT: u16 = 0x7a0;
pub const TDATA1: u16 = 0x7a1;
pub const TDATA2: u16 = 0x7a2;
pub const TDATA3: u16 = 0x7a3;
pub const TINFO: u16 = 0x7a4;

/// A trigger CSR.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TriggerCsr {
    Tselect,
    Tdata(Tdata),
    Tinfo,
}

impl TriggerCsr {
    pub const fn number(self) -> u16 {
        match self {
            Self::Tselect => TSELECT,
            Self::Tdata(Tdata::Tdata1) => TDATA1,
            Self::Tdata(Tdata::Tdata2) => TDATA2,
            Self::Tdata(Tdata::Tdata3) => TDATA3,
            Self::Tinfo => TINFO,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Tselect => "tselect",
            Self::Tdata(Tdata::Tdata1) => "tdata1",
            Self::Tdata(Tdata::Tdata2) => "tdata2",
            Self::Tdata(Tdata::Tdata3) => "tdata3",
            Self::Tinfo => "tinfo",
        }
    }
}

impl std::fmt::Display for TriggerCsr {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{}", self.name())
    }
}

impl TryFrom<u16> for TriggerCsr {
    type Error = CsrError;

    fn try_from(number: u16) -> Result<Self, Self::Error> {
        Ok(match number {
            TSELECT => Self::Tselect,
            TDATA1 => Self::Tdata(Tdata::Tdata1),
            TDATA2 => Self::Tdata(Tdata::Tdata2),
            TDATA3 => Self::Tdata(Tdata::Tdata3),
            TINFO => Self::Tinfo,
            other => return Err(CsrError::UnknownCsr(other)),
        })
    }
}

impl FromStr for TriggerCsr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "tselect" => Self::Tselect,
            "tdata1" => Self::Tdata(Tdata::Tdata1),
            "tdata2" => Self::Tdata(Tdata::Tdata2),
            "tdata3" => Self::Tdata(Tdata::Tdata3),
            "tinfo" => Self::Tinfo,
            other => return Err(format!("Unknown trigger CSR {other:?}")),
        })
    }
}

/// CSR accesses the simulator must turn into an illegal instruction trap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrError {
    UnknownCsr(u16),
    ReadOnly(u16),
}

impl std::fmt::Display for CsrError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for CsrError {}

/// `tselect` and the trigger array behind it.
#[derive(Clone, Debug)]
pub struct TriggerCsrs {
    tselect: usize,
    module: TriggerModule,
}

impl TriggerCsrs {
    pub fn new(module: TriggerModule) -> Self {
        Self { tselect: 0, module }
    }

    pub fn with_config(config: &ModuleConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(TriggerModule::with_config(config)?))
    }

    #[inline]
    pub fn tselect(&self) -> usize {
        self.tselect
    }

    #[inline]
    pub fn module(&self) -> &TriggerModule {
        &self.module
    }

    #[inline]
    pub fn module_mut(&mut self) -> &mut TriggerModule {
        &mut self.module
    }

    pub fn read_csr(&self, hart: &HartState, number: u16) -> Result<u64, CsrError> {
        Ok(match TriggerCsr::try_from(number)? {
            TriggerCsr::Tselect => self.tselect as u64,
            TriggerCsr::Tdata(register) => self
                .module
                .read(hart, self.tselect, register)
                .unwrap_or_default(),
            TriggerCsr::Tinfo => self.module.tinfo(self.tselect),
        })
    }

    /// Returns whether the write took effect.
    ///
    /// A `tselect` value that names no trigger is ignored, as is a data
    /// register write refused by the selected trigger's `dmode`.
    pub fn write_csr(
        &mut self,
        hart: &HartState,
        number: u16,
        value: u64,
    ) -> Result<bool, CsrError> {
        Ok(match TriggerCsr::try_from(number)? {
            TriggerCsr::Tselect => match usize::try_from(value) {
                Ok(index) if index < self.module.count() => {
                    self.tselect = index;
                    true
                }
                _ => {
                    log::debug!(
                        target: "csr",
                        "tselect {value:#x} out of range, keeping {}",
                        self.tselect
                    );
                    false
                }
            },
            TriggerCsr::Tdata(register) => self.module.write(hart, self.tselect, register, value),
            TriggerCsr::Tinfo => return Err(CsrError::ReadOnly(number)),
        })
    }
}
