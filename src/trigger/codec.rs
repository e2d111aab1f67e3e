// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Bit-exact `tdata1` layouts and their WARL legalization.
//!
//! Every trigger kind shares the same header:
//!
//! ```text
//!  XLEN-1   XLEN-4  XLEN-5    XLEN-6 .. 0
//! +--------+-------+--------------------+
//! |  type  | dmode |  kind specific     |
//! +--------+-------+--------------------+
//! ```
//!
//! The kind-specific low bits do not depend on XLEN and are described with
//! `bilge` bitfields. Fields above them (`maskmax`, `sizehi`, the trap trigger
//! `hit` bit) are handled by hand.
//!
//! Decoding never fails. Unsupported encodings are mapped to a legal value
//! through the tables in this module and reserved bits are dropped.

use bilge::prelude::*;

use super::{Action, MatchControl, MatchKind, ScopeFlags, Timing, TrapControl, TriggerType};
use crate::hart::{HartState, Xlen};

/// `mcontrol` (type 2) bits `[20:0]`.
#[bitsize(21)]
#[derive(Copy, Clone, PartialEq, Eq, FromBits, DebugBits)]
pub struct McontrolBits {
    pub load: bool,
    pub store: bool,
    pub execute: bool,
    pub u: bool,
    pub s: bool,
    _reserved: u1,
    pub m: bool,
    pub match_kind: u4,
    pub chain: bool,
    pub action: u4,
    /// Read-only zero, only "any size" is supported.
    pub sizelo: u2,
    pub timing: bool,
    pub select: bool,
    pub hit: bool,
}

/// `mcontrol6` (type 6) bits `[24:0]`.
#[bitsize(25)]
#[derive(Copy, Clone, PartialEq, Eq, FromBits, DebugBits)]
pub struct Mcontrol6Bits {
    pub load: bool,
    pub store: bool,
    pub execute: bool,
    pub u: bool,
    pub s: bool,
    _reserved: u1,
    pub m: bool,
    pub match_kind: u4,
    pub chain: bool,
    pub action: u4,
    /// Read-only zero, only "any size" is supported.
    pub size: u4,
    pub timing: bool,
    pub select: bool,
    pub hit: bool,
    pub vu: bool,
    pub vs: bool,
}

/// `itrigger` (type 4) and `etrigger` (type 5) bits `[12:0]`.
///
/// `nmi` is reserved for `etrigger`.
#[bitsize(13)]
#[derive(Copy, Clone, PartialEq, Eq, FromBits, DebugBits)]
pub struct TrapBits {
    pub action: u6,
    pub u: bool,
    pub s: bool,
    _reserved: u1,
    pub m: bool,
    pub nmi: bool,
    pub vu: bool,
    pub vs: bool,
}

const MCONTROL_MASK: u64 = (1 << 21) - 1;
const MCONTROL6_MASK: u64 = (1 << 25) - 1;
const TRAP_MASK: u64 = (1 << 13) - 1;

/// Legal `match` values, indexed by the raw 4-bit field.
pub const MATCH_TABLE: [MatchKind; 16] = [
    MatchKind::Equal,
    MatchKind::Napot,
    MatchKind::Ge,
    MatchKind::Lt,
    MatchKind::MaskLow,
    MatchKind::MaskHigh,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
    MatchKind::Equal,
];

/// Implemented actions, indexed by their encoding.
pub const ACTION_TABLE: [Action; 5] = [
    Action::DebugException,
    Action::DebugMode,
    Action::TraceStart,
    Action::TraceStop,
    Action::TraceEmit,
];

#[inline]
pub fn legalize_match(raw: u8) -> MatchKind {
    MATCH_TABLE[usize::from(raw & 0xf)]
}

/// Unknown actions, and entering Debug Mode from a trigger that M-mode could
/// also write, fall back to a breakpoint exception.
pub fn legalize_action(raw: u8, dmode: bool) -> Action {
    match ACTION_TABLE.get(usize::from(raw)).copied() {
        Some(Action::DebugMode) if !dmode => Action::DebugException,
        Some(action) => action,
        None => Action::DebugException,
    }
}

/// Execute triggers always fire before the instruction; load data triggers
/// can only fire once the data is known.
pub fn legalize_timing(timing: bool, select: bool, execute: bool, load: bool) -> Timing {
    if select && load {
        Timing::After
    } else if execute {
        Timing::Before
    } else {
        Timing::from_bit(timing)
    }
}

#[inline]
fn type_shift(xlen: Xlen) -> u32 {
    xlen.bits() - 4
}

#[inline]
fn dmode_shift(xlen: Xlen) -> u32 {
    xlen.bits() - 5
}

#[inline]
fn trap_hit_shift(xlen: Xlen) -> u32 {
    xlen.bits() - 6
}

/// Raw `tdata1.type`.
#[inline]
pub fn type_field(xlen: Xlen, value: u64) -> u64 {
    ((value & xlen.mask()) >> type_shift(xlen)) & 0xf
}

/// Raw `tdata1.dmode`.
#[inline]
pub fn dmode_field(xlen: Xlen, value: u64) -> bool {
    (value >> dmode_shift(xlen)) & 1 == 1
}

/// `value` with `tdata1.dmode` cleared.
#[inline]
pub fn clear_dmode(xlen: Xlen, value: u64) -> u64 {
    value & !(1 << dmode_shift(xlen))
}

/// The `type` and `dmode` bits of a `tdata1` value.
#[inline]
pub fn header(xlen: Xlen, ty: TriggerType, dmode: bool) -> u64 {
    (ty as u64) << type_shift(xlen) | u64::from(dmode) << dmode_shift(xlen)
}

fn decode_scope(hart: &HartState, m: bool, s: bool, u: bool, vs: bool, vu: bool) -> ScopeFlags {
    let mut scope = ScopeFlags::empty();
    scope.set(ScopeFlags::M, m);
    scope.set(ScopeFlags::S, s);
    scope.set(ScopeFlags::U, u);
    scope.set(ScopeFlags::VS, vs);
    scope.set(ScopeFlags::VU, vu);
    scope.legalize(hart)
}

pub fn decode_mcontrol(hart: &HartState, value: u64, allow_chain: bool) -> MatchControl {
    let bits = McontrolBits::from(u21::new((value & MCONTROL_MASK) as u32));
    let dmode = dmode_field(hart.xlen, value);
    let control = MatchControl {
        dmode,
        action: legalize_action(bits.action().value(), dmode),
        hit: bits.hit(),
        select: bits.select(),
        timing: legalize_timing(bits.timing(), bits.select(), bits.execute(), bits.load()),
        chain: allow_chain && bits.chain(),
        match_kind: legalize_match(bits.match_kind().value()),
        // The legacy layout has no virtualized mode bits.
        scope: decode_scope(hart, bits.m(), bits.s(), bits.u(), false, false),
        execute: bits.execute(),
        store: bits.store(),
        load: bits.load(),
    };
    log::trace!(target: "codec", "mcontrol {value:#x} => {control:?}");
    control
}

pub fn encode_mcontrol(hart: &HartState, control: &MatchControl) -> u64 {
    let mut bits = McontrolBits::from(u21::new(0));
    bits.set_load(control.load);
    bits.set_store(control.store);
    bits.set_execute(control.execute);
    bits.set_u(control.scope.contains(ScopeFlags::U));
    bits.set_s(control.scope.contains(ScopeFlags::S));
    bits.set_m(control.scope.contains(ScopeFlags::M));
    bits.set_match_kind(u4::new(control.match_kind as u8));
    bits.set_chain(control.chain);
    bits.set_action(u4::new(control.action as u8));
    bits.set_timing(control.timing == Timing::After);
    bits.set_select(control.select);
    bits.set_hit(control.hit);
    // `maskmax` and `sizehi` read as zero.
    header(hart.xlen, TriggerType::Mcontrol, control.dmode) | u64::from(u21::from(bits).value())
}

pub fn decode_mcontrol6(hart: &HartState, value: u64, allow_chain: bool) -> MatchControl {
    let bits = Mcontrol6Bits::from(u25::new((value & MCONTROL6_MASK) as u32));
    let dmode = dmode_field(hart.xlen, value);
    let control = MatchControl {
        dmode,
        action: legalize_action(bits.action().value(), dmode),
        hit: bits.hit(),
        select: bits.select(),
        timing: legalize_timing(bits.timing(), bits.select(), bits.execute(), bits.load()),
        chain: allow_chain && bits.chain(),
        match_kind: legalize_match(bits.match_kind().value()),
        scope: decode_scope(hart, bits.m(), bits.s(), bits.u(), bits.vs(), bits.vu()),
        execute: bits.execute(),
        store: bits.store(),
        load: bits.load(),
    };
    log::trace!(target: "codec", "mcontrol6 {value:#x} => {control:?}");
    control
}

pub fn encode_mcontrol6(hart: &HartState, control: &MatchControl) -> u64 {
    let mut bits = Mcontrol6Bits::from(u25::new(0));
    bits.set_load(control.load);
    bits.set_store(control.store);
    bits.set_execute(control.execute);
    bits.set_u(control.scope.contains(ScopeFlags::U));
    bits.set_s(control.scope.contains(ScopeFlags::S));
    bits.set_m(control.scope.contains(ScopeFlags::M));
    bits.set_match_kind(u4::new(control.match_kind as u8));
    bits.set_chain(control.chain);
    bits.set_action(u4::new(control.action as u8));
    bits.set_timing(control.timing == Timing::After);
    bits.set_select(control.select);
    bits.set_hit(control.hit);
    bits.set_vu(control.scope.contains(ScopeFlags::VU));
    bits.set_vs(control.scope.contains(ScopeFlags::VS));
    header(hart.xlen, TriggerType::Mcontrol6, control.dmode) | u64::from(u25::from(bits).value())
}

fn decode_trap(hart: &HartState, value: u64, nmi_allowed: bool) -> TrapControl {
    let bits = TrapBits::from(u13::new((value & TRAP_MASK) as u16));
    let dmode = dmode_field(hart.xlen, value);
    TrapControl {
        dmode,
        hit: (value >> trap_hit_shift(hart.xlen)) & 1 == 1,
        scope: decode_scope(hart, bits.m(), bits.s(), bits.u(), bits.vs(), bits.vu()),
        nmi: nmi_allowed && bits.nmi(),
        action: legalize_action(bits.action().value(), dmode),
    }
}

fn encode_trap(hart: &HartState, ty: TriggerType, control: &TrapControl) -> u64 {
    let mut bits = TrapBits::from(u13::new(0));
    bits.set_action(u6::new(control.action as u8));
    bits.set_u(control.scope.contains(ScopeFlags::U));
    bits.set_s(control.scope.contains(ScopeFlags::S));
    bits.set_m(control.scope.contains(ScopeFlags::M));
    bits.set_nmi(control.nmi);
    bits.set_vu(control.scope.contains(ScopeFlags::VU));
    bits.set_vs(control.scope.contains(ScopeFlags::VS));
    header(hart.xlen, ty, control.dmode)
        | u64::from(control.hit) << trap_hit_shift(hart.xlen)
        | u64::from(u13::from(bits).value())
}

pub fn decode_itrigger(hart: &HartState, value: u64) -> TrapControl {
    let control = decode_trap(hart, value, true);
    log::trace!(target: "codec", "itrigger {value:#x} => {control:?}");
    control
}

pub fn encode_itrigger(hart: &HartState, control: &TrapControl) -> u64 {
    encode_trap(hart, TriggerType::Itrigger, control)
}

pub fn decode_etrigger(hart: &HartState, value: u64) -> TrapControl {
    let control = decode_trap(hart, value, false);
    log::trace!(target: "codec", "etrigger {value:#x} => {control:?}");
    control
}

pub fn encode_etrigger(hart: &HartState, control: &TrapControl) -> u64 {
    encode_trap(hart, TriggerType::Etrigger, control)
}
