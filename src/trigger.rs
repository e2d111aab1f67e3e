// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! A single trigger slot and the types shared by all trigger kinds.
//!
//! Each slot holds one of the kinds enumerated by [`TriggerType`]. The kind is
//! only ever changed by a `tdata1` write, which decodes the `type` field and
//! replaces the slot's [`Variant`] while `tdata2` and `tdata3` carry over.
//!
//! | `type` | Kind                                      | Matches             |
//! | ------ | ----------------------------------------- | ------------------- |
//! | 2      | `mcontrol`, address/data match            | loads/stores/fetch  |
//! | 4      | `itrigger`, interrupt trigger             | interrupts and NMIs |
//! | 5      | `etrigger`, exception trigger             | exceptions          |
//! | 6      | `mcontrol6`, address/data match           | loads/stores/fetch  |
//! | 15     | disabled                                  | nothing             |

pub mod codec;
pub mod mcontrol;
pub mod textra;
pub mod trap;

use serde_derive::{Deserialize, Serialize};

pub use self::{mcontrol::*, textra::*, trap::*};
use crate::hart::{HartState, PrivilegeMode};

/// Kind of memory access being checked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Instruction fetch.
    Execute = 0,
    Store = 1,
    Load = 2,
}

impl Operation {
    pub const ALL: [Self; 3] = [Self::Execute, Self::Store, Self::Load];
}

/// What the hart does when a trigger fires.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    /// Raise a breakpoint exception.
    DebugException = 0,
    /// Enter Debug Mode. Only legal when `dmode` is set.
    DebugMode = 1,
    TraceStart = 2,
    TraceStop = 3,
    TraceEmit = 4,
}

/// Whether the action happens before or after the matching access.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    #[default]
    Before = 0,
    After = 1,
}

impl Timing {
    #[inline]
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::After
        } else {
            Self::Before
        }
    }
}

/// Outcome of a scan that fired.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchResult {
    pub timing: Timing,
    pub action: Action,
}

impl MatchResult {
    #[inline]
    pub const fn new(timing: Timing, action: Action) -> Self {
        Self { timing, action }
    }
}

/// A trap about to be delivered.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Trap {
    /// Cause number, without the interrupt bit.
    pub cause: u64,
    pub interrupt: bool,
    /// Non-maskable interrupt. `cause` is ignored for these.
    pub nmi: bool,
}

impl Trap {
    pub const fn exception(cause: u64) -> Self {
        Self {
            cause,
            interrupt: false,
            nmi: false,
        }
    }

    pub const fn interrupt(cause: u64) -> Self {
        Self {
            cause,
            interrupt: true,
            nmi: false,
        }
    }

    pub const fn nmi() -> Self {
        Self {
            cause: 0,
            interrupt: true,
            nmi: true,
        }
    }
}

/// One of the three per-trigger data registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tdata {
    Tdata1,
    Tdata2,
    Tdata3,
}

/// Values of the `tdata1.type` field.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TriggerType {
    /// Address/data match, legacy layout.
    Mcontrol = 2,
    /// Interrupt trigger.
    Itrigger = 4,
    /// Exception trigger.
    Etrigger = 5,
    /// Address/data match, current layout.
    Mcontrol6 = 6,
    Disabled = 15,
}

impl TriggerType {
    /// Every type a slot can hold.
    pub const SUPPORTED: [Self; 5] = [
        Self::Mcontrol,
        Self::Itrigger,
        Self::Etrigger,
        Self::Mcontrol6,
        Self::Disabled,
    ];

    /// Decodes a raw 4-bit `type`; unsupported values select [`Self::Disabled`].
    pub fn from_code(code: u64) -> Self {
        Self::SUPPORTED
            .into_iter()
            .find(|ty| *ty as u64 == code)
            .unwrap_or(Self::Disabled)
    }

    /// `tinfo.info` value advertising every supported type.
    pub fn tinfo() -> u64 {
        Self::SUPPORTED
            .iter()
            .fold(0, |acc, ty| acc | (1 << *ty as u64))
    }
}

bitflags::bitflags! {
    /// Privilege modes a trigger is enabled in.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ScopeFlags: u8 {
        const M = 1 << 0;
        const S = 1 << 1;
        const U = 1 << 2;
        const VS = 1 << 3;
        const VU = 1 << 4;
    }
}

impl ScopeFlags {
    /// Whether the hart's current mode is one of the enabled ones.
    pub fn matches(self, hart: &HartState) -> bool {
        let mode = match (hart.privilege, hart.virtualized()) {
            (PrivilegeMode::Machine, _) => Self::M,
            (PrivilegeMode::Supervisor, false) => Self::S,
            (PrivilegeMode::Supervisor, true) => Self::VS,
            (PrivilegeMode::User, false) => Self::U,
            (PrivilegeMode::User, true) => Self::VU,
        };
        self.contains(mode)
    }

    /// Drops the modes the hart does not implement.
    pub fn legalize(mut self, hart: &HartState) -> Self {
        if !hart.supervisor_enabled() {
            self.remove(Self::S);
        }
        if !hart.user_enabled() {
            self.remove(Self::U);
        }
        if !hart.hypervisor_enabled() {
            self.remove(Self::VS | Self::VU);
        }
        self
    }
}

/// Kind-specific state of a trigger slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Variant {
    Disabled { dmode: bool },
    Mcontrol(MatchControl),
    Mcontrol6(MatchControl),
    Itrigger(TrapControl),
    Etrigger(TrapControl),
}

impl Variant {
    pub fn trigger_type(&self) -> TriggerType {
        match self {
            Self::Disabled { .. } => TriggerType::Disabled,
            Self::Mcontrol(_) => TriggerType::Mcontrol,
            Self::Mcontrol6(_) => TriggerType::Mcontrol6,
            Self::Itrigger(_) => TriggerType::Itrigger,
            Self::Etrigger(_) => TriggerType::Etrigger,
        }
    }

    /// Decodes a `tdata1` value into the kind it names.
    pub fn decode(hart: &HartState, value: u64, allow_chain: bool) -> Self {
        match TriggerType::from_code(codec::type_field(hart.xlen, value)) {
            TriggerType::Mcontrol => {
                Self::Mcontrol(codec::decode_mcontrol(hart, value, allow_chain))
            }
            TriggerType::Mcontrol6 => {
                Self::Mcontrol6(codec::decode_mcontrol6(hart, value, allow_chain))
            }
            TriggerType::Itrigger => Self::Itrigger(codec::decode_itrigger(hart, value)),
            TriggerType::Etrigger => Self::Etrigger(codec::decode_etrigger(hart, value)),
            TriggerType::Disabled => Self::Disabled {
                dmode: codec::dmode_field(hart.xlen, value),
            },
        }
    }

    /// Encodes the current state as a `tdata1` value.
    pub fn encode(&self, hart: &HartState) -> u64 {
        match self {
            Self::Disabled { dmode } => codec::header(hart.xlen, TriggerType::Disabled, *dmode),
            Self::Mcontrol(control) => codec::encode_mcontrol(hart, control),
            Self::Mcontrol6(control) => codec::encode_mcontrol6(hart, control),
            Self::Itrigger(control) => codec::encode_itrigger(hart, control),
            Self::Etrigger(control) => codec::encode_etrigger(hart, control),
        }
    }
}

/// One trigger slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Trigger {
    tdata2: u64,
    textra: Textra,
    variant: Variant,
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl Trigger {
    /// A disabled trigger with all data registers zero.
    pub const fn new() -> Self {
        Self {
            tdata2: 0,
            textra: Textra::new(),
            variant: Variant::Disabled { dmode: false },
        }
    }

    #[inline]
    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    #[inline]
    pub fn trigger_type(&self) -> TriggerType {
        self.variant.trigger_type()
    }

    #[inline]
    pub fn textra(&self) -> &Textra {
        &self.textra
    }

    pub fn dmode(&self) -> bool {
        match &self.variant {
            Variant::Disabled { dmode } => *dmode,
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => control.dmode,
            Variant::Itrigger(control) | Variant::Etrigger(control) => control.dmode,
        }
    }

    /// Only address/data match triggers can chain.
    pub fn chain(&self) -> bool {
        match &self.variant {
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => control.chain,
            _ => false,
        }
    }

    pub fn hit(&self) -> bool {
        match &self.variant {
            Variant::Disabled { .. } => false,
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => control.hit,
            Variant::Itrigger(control) | Variant::Etrigger(control) => control.hit,
        }
    }

    pub fn action(&self) -> Action {
        match &self.variant {
            Variant::Disabled { .. } => Action::DebugException,
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => control.action,
            Variant::Itrigger(control) | Variant::Etrigger(control) => control.action,
        }
    }

    /// Whether this trigger can fire at all for accesses of kind `operation`.
    pub fn watches(&self, operation: Operation) -> bool {
        match &self.variant {
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => {
                control.enabled_for(operation)
            }
            _ => false,
        }
    }

    pub fn read(&self, hart: &HartState, register: Tdata) -> u64 {
        match register {
            Tdata::Tdata1 => self.variant.encode(hart),
            Tdata::Tdata2 => self.tdata2,
            Tdata::Tdata3 => self.textra.read(hart),
        }
    }

    /// Stores a legalized `value`. `allow_chain` is only used for `tdata1`.
    pub fn write(&mut self, hart: &HartState, register: Tdata, value: u64, allow_chain: bool) {
        match register {
            Tdata::Tdata1 => {
                self.variant = Variant::decode(hart, value, allow_chain);
                // Re-legalize the carried over context against the new kind.
                let tdata3 = self.textra.read(hart);
                self.textra.write(hart, tdata3);
            }
            Tdata::Tdata2 => self.tdata2 = value,
            Tdata::Tdata3 => self.textra.write(hart, value),
        }
    }

    pub fn detect_memory_access_match(
        &mut self,
        hart: &HartState,
        operation: Operation,
        address: u64,
        data: Option<u64>,
    ) -> Option<MatchResult> {
        match &mut self.variant {
            Variant::Mcontrol(control) | Variant::Mcontrol6(control) => {
                control.detect_memory_access_match(hart, self.tdata2, operation, address, data)
            }
            _ => None,
        }
    }

    pub fn detect_trap_match(&mut self, hart: &HartState, trap: &Trap) -> Option<MatchResult> {
        match &mut self.variant {
            Variant::Itrigger(control) => {
                control.detect_interrupt_match(hart, self.tdata2, &self.textra, trap)
            }
            Variant::Etrigger(control) => {
                control.detect_exception_match(hart, self.tdata2, &self.textra, trap)
            }
            _ => None,
        }
    }
}
