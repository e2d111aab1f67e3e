// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Scripted driving of a trigger array.
//!
//! A script is a JSON document:
//!
//! ```json
//! {
//!   "config": { "count": 2 },
//!   "hart": { "xlen": 64, "privilege": "machine" },
//!   "steps": [
//!     { "csr_write": { "csr": "tdata1", "value": "0x6000000000000044" } },
//!     { "csr_write": { "csr": "tdata2", "value": "0x80000004" } },
//!     { "access": { "operation": "execute", "address": "0x80000004" } },
//!     { "hart": { "privilege": "user" } },
//!     { "trap": { "cause": 3 } },
//!     { "csr_read": { "csr": "tdata1" } }
//!   ]
//! }
//! ```
//!
//! Numbers may be JSON integers or decimal/hexadecimal strings. CSRs may be
//! given by name or number.

use std::{borrow::Cow, path::Path};

use serde_derive::{Deserialize, Serialize};

use crate::{
    csr::{CsrError, TriggerCsr, TriggerCsrs},
    hart::{HartState, PrivilegeMode},
    module::{ConfigError, ModuleConfig},
    trigger::{MatchResult, Operation, Trap},
};

/// Parses a decimal value or a `0x`-prefixed hexadecimal one. Underscores are
/// allowed as digit separators.
pub fn maybe_hex(s: &str) -> Result<u64, Cow<'static, str>> {
    const HEX_PREFIX: &str = "0x";
    const HEX_PREFIX_UPPER: &str = "0X";
    const HEX_PREFIX_LEN: usize = HEX_PREFIX.len();

    let s = s.trim().replace('_', "");
    let result = if s.starts_with(HEX_PREFIX) || s.starts_with(HEX_PREFIX_UPPER) {
        u64::from_str_radix(&s[HEX_PREFIX_LEN..], 16)
    } else {
        s.parse::<u64>()
    };

    result.map_err(|err| Cow::Owned(format!("{s:?}: {err}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

fn number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match <Number as serde::Deserialize>::deserialize(deserializer)? {
        Number::Int(value) => Ok(value),
        Number::Text(text) => maybe_hex(&text).map_err(serde::de::Error::custom),
    }
}

fn optional_number<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    number(deserializer).map(Some)
}

fn csr_number<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = match <Number as serde::Deserialize>::deserialize(deserializer)? {
        Number::Int(value) => value,
        Number::Text(text) => match text.parse::<TriggerCsr>() {
            Ok(csr) => return Ok(csr.number()),
            Err(_) => maybe_hex(&text).map_err(serde::de::Error::custom)?,
        },
    };
    u16::try_from(value).map_err(serde::de::Error::custom)
}

/// Partial update of the hart state. Absent fields keep their value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HartUpdate {
    pub privilege: Option<PrivilegeMode>,
    pub virt: Option<bool>,
    pub debug_mode: Option<bool>,
    #[serde(deserialize_with = "optional_number")]
    pub scontext: Option<u64>,
    #[serde(deserialize_with = "optional_number")]
    pub mcontext: Option<u64>,
    #[serde(deserialize_with = "optional_number")]
    pub asid: Option<u64>,
    #[serde(deserialize_with = "optional_number")]
    pub vmid: Option<u64>,
}

impl HartUpdate {
    pub fn apply(&self, hart: &mut HartState) {
        if let Some(privilege) = self.privilege {
            hart.privilege = privilege;
        }
        if let Some(virt) = self.virt {
            hart.virt = virt;
        }
        if let Some(debug_mode) = self.debug_mode {
            hart.debug_mode = debug_mode;
        }
        if let Some(scontext) = self.scontext {
            hart.scontext = scontext;
        }
        if let Some(mcontext) = self.mcontext {
            hart.mcontext = mcontext;
        }
        if let Some(asid) = self.asid {
            hart.asid = asid;
        }
        if let Some(vmid) = self.vmid {
            hart.vmid = vmid;
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Hart(HartUpdate),
    CsrWrite {
        #[serde(deserialize_with = "csr_number")]
        csr: u16,
        #[serde(deserialize_with = "number")]
        value: u64,
    },
    CsrRead {
        #[serde(deserialize_with = "csr_number")]
        csr: u16,
    },
    Access {
        operation: Operation,
        #[serde(deserialize_with = "number")]
        address: u64,
        #[serde(default, deserialize_with = "optional_number")]
        data: Option<u64>,
    },
    Trap {
        #[serde(default, deserialize_with = "number")]
        cause: u64,
        #[serde(default)]
        interrupt: bool,
        #[serde(default)]
        nmi: bool,
    },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Script {
    pub config: ModuleConfig,
    pub hart: HartState,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn parse(input: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}

/// Observable output of a step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    CsrRead {
        step: usize,
        csr: u16,
        value: u64,
    },
    /// A write that did not take effect.
    CsrWriteIgnored {
        step: usize,
        csr: u16,
        value: u64,
    },
    Fired {
        step: usize,
        #[serde(flatten)]
        result: MatchResult,
    },
}

#[derive(Debug)]
pub enum ReplayError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Config(ConfigError),
    Csr { step: usize, error: CsrError },
}

impl std::fmt::Display for ReplayError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for ReplayError {}

impl From<std::io::Error> for ReplayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

impl From<ConfigError> for ReplayError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Executes every step of `script` in order.
pub fn run(script: &Script) -> Result<Vec<Event>, ReplayError> {
    let mut csrs = TriggerCsrs::with_config(&script.config)?;
    let mut hart = script.hart;
    let mut events = vec![];
    log::debug!(
        target: "replay",
        "{} triggers, {}, {} steps",
        csrs.module().count(),
        hart.xlen,
        script.steps.len()
    );

    for (step, action) in script.steps.iter().enumerate() {
        log::trace!(target: "replay", "step {step}: {action:?}");
        match *action {
            Step::Hart(ref update) => update.apply(&mut hart),
            Step::CsrWrite { csr, value } => {
                let accepted = csrs
                    .write_csr(&hart, csr, value)
                    .map_err(|error| ReplayError::Csr { step, error })?;
                if !accepted {
                    events.push(Event::CsrWriteIgnored { step, csr, value });
                }
            }
            Step::CsrRead { csr } => {
                let value = csrs
                    .read_csr(&hart, csr)
                    .map_err(|error| ReplayError::Csr { step, error })?;
                events.push(Event::CsrRead { step, csr, value });
            }
            Step::Access {
                operation,
                address,
                data,
            } => {
                if !csrs.module().is_armed(operation) {
                    continue;
                }
                if let Some(result) = csrs
                    .module_mut()
                    .detect_memory_access_match(&hart, operation, address, data)
                {
                    events.push(Event::Fired { step, result });
                }
            }
            Step::Trap {
                cause,
                interrupt,
                nmi,
            } => {
                let trap = Trap {
                    cause,
                    interrupt: interrupt || nmi,
                    nmi,
                };
                if let Some(result) = csrs.module_mut().detect_trap_match(&hart, &trap) {
                    events.push(Event::Fired { step, result });
                }
            }
        }
    }
    Ok(events)
}
