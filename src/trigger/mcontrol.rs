// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Address/data match triggers (`mcontrol` and `mcontrol6`).

use super::{Action, MatchResult, Operation, ScopeFlags, Timing};
use crate::hart::{HartState, Xlen};

/// Compare operator of an address/data match trigger.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MatchKind {
    #[default]
    /// Value equals `tdata2`.
    Equal = 0,
    /// Value lies in the naturally aligned power-of-two range encoded by
    /// `tdata2`.
    Napot = 1,
    /// Value is greater than or equal to `tdata2` (unsigned).
    Ge = 2,
    /// Value is less than `tdata2` (unsigned).
    Lt = 3,
    /// Low half of the value, masked by the high half of `tdata2`, equals
    /// the low half of `tdata2`.
    MaskLow = 4,
    /// High half of the value, masked by the high half of `tdata2`, equals
    /// the low half of `tdata2`.
    MaskHigh = 5,
}

/// Decoded state shared by both address/data match layouts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchControl {
    pub dmode: bool,
    pub action: Action,
    /// Sticky, set whenever this trigger matches.
    pub hit: bool,
    /// Compare the data instead of the address.
    pub select: bool,
    pub timing: Timing,
    pub chain: bool,
    pub match_kind: MatchKind,
    pub scope: ScopeFlags,
    pub execute: bool,
    pub store: bool,
    pub load: bool,
}

impl MatchControl {
    #[inline]
    pub fn enabled_for(&self, operation: Operation) -> bool {
        match operation {
            Operation::Execute => self.execute,
            Operation::Store => self.store,
            Operation::Load => self.load,
        }
    }

    /// Checks a single access against this trigger, ignoring chaining.
    ///
    /// Sets [`Self::hit`] on a match.
    pub fn detect_memory_access_match(
        &mut self,
        hart: &HartState,
        tdata2: u64,
        operation: Operation,
        address: u64,
        data: Option<u64>,
    ) -> Option<MatchResult> {
        if !self.enabled_for(operation) || !self.scope.matches(hart) {
            return None;
        }
        let value = if self.select { data? } else { address };
        // PC and data values may arrive sign-extended from a 32-bit hart.
        let value = value & hart.xlen.mask();

        if !self.simple_match(hart.xlen, tdata2, value) {
            return None;
        }
        self.hit = true;
        Some(MatchResult::new(self.timing, self.action))
    }

    fn simple_match(&self, xlen: Xlen, tdata2: u64, value: u64) -> bool {
        let tdata2 = tdata2 & xlen.mask();
        let half = xlen.bits() / 2;
        let half_mask = xlen.mask() >> half;
        match self.match_kind {
            MatchKind::Equal => value == tdata2,
            MatchKind::Napot => {
                let mask = napot_mask(xlen, tdata2);
                value & mask == tdata2 & mask
            }
            MatchKind::Ge => value >= tdata2,
            MatchKind::Lt => value < tdata2,
            MatchKind::MaskLow => {
                let mask = (tdata2 >> half) & half_mask;
                value & mask == tdata2 & mask
            }
            MatchKind::MaskHigh => {
                let mask = (tdata2 >> half) & half_mask;
                (value >> half) & mask == tdata2 & mask
            }
        }
    }
}

/// Bits that take part in a NAPOT compare: the trailing ones of `tdata2`
/// are don't-care.
pub fn napot_mask(xlen: Xlen, tdata2: u64) -> u64 {
    let trailing_ones = tdata2.trailing_ones();
    u64::MAX.checked_shl(trailing_ones).unwrap_or(0) & xlen.mask()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::PrivilegeMode;

    fn control(match_kind: MatchKind) -> MatchControl {
        MatchControl {
            match_kind,
            scope: ScopeFlags::all(),
            execute: true,
            store: true,
            load: true,
            ..MatchControl::default()
        }
    }

    fn fires(control: &mut MatchControl, hart: &HartState, tdata2: u64, address: u64) -> bool {
        control
            .detect_memory_access_match(hart, tdata2, Operation::Load, address, None)
            .is_some()
    }

    #[test]
    fn test_equal() {
        let hart = HartState::default();
        let mut c = control(MatchKind::Equal);
        assert!(fires(&mut c, &hart, 0x8000_0004, 0x8000_0004));
        assert!(!fires(&mut c, &hart, 0x8000_0004, 0x8000_0008));
    }

    #[test]
    fn test_napot() {
        let hart = HartState::new(Xlen::Rv32);
        let mut c = control(MatchKind::Napot);
        for address in [0x1000_0000, 0x1000_0800, 0x1000_0fff] {
            assert!(fires(&mut c, &hart, 0x1000_0fff, address), "{address:#x}");
        }
        assert!(!fires(&mut c, &hart, 0x1000_0fff, 0x1000_1000));
        assert!(!fires(&mut c, &hart, 0x1000_0fff, 0x0fff_ffff));
        assert_eq!(napot_mask(Xlen::Rv32, 0x1000_0fff), 0xffff_f000);
        // All ones covers the whole address space.
        assert_eq!(napot_mask(Xlen::Rv64, u64::MAX), 0);
    }

    #[test]
    fn test_ge_lt() {
        let hart = HartState::default();
        let mut ge = control(MatchKind::Ge);
        assert!(fires(&mut ge, &hart, 0x1000, 0x1000));
        assert!(fires(&mut ge, &hart, 0x1000, u64::MAX));
        assert!(!fires(&mut ge, &hart, 0x1000, 0xfff));
        let mut lt = control(MatchKind::Lt);
        assert!(fires(&mut lt, &hart, 0x1000, 0xfff));
        assert!(!fires(&mut lt, &hart, 0x1000, 0x1000));
    }

    #[test]
    fn test_mask_low_and_high() {
        let hart = HartState::default();
        let mut low = control(MatchKind::MaskLow);
        // Mask 0xff00 over the low half, expected value 0x1200.
        let tdata2 = 0x0000_ff00_0000_1234;
        assert!(fires(&mut low, &hart, tdata2, 0x1299));
        assert!(fires(&mut low, &hart, tdata2, 0xffff_0000_0000_1200));
        assert!(!fires(&mut low, &hart, tdata2, 0x1399));

        let mut high = control(MatchKind::MaskHigh);
        assert!(fires(&mut high, &hart, tdata2, 0x0000_1234_ffff_ffff));
        assert!(!fires(&mut high, &hart, tdata2, 0x0000_1334_0000_0000));

        let hart = HartState::new(Xlen::Rv32);
        let mut high = control(MatchKind::MaskHigh);
        assert!(fires(&mut high, &hart, 0xff00_1200, 0x12ab_0000));
        assert!(!fires(&mut high, &hart, 0xff00_1200, 0x0012_0000));
    }

    #[test]
    fn test_rv32_truncates_value() {
        let hart = HartState::new(Xlen::Rv32);
        let mut c = control(MatchKind::Equal);
        assert!(fires(&mut c, &hart, 0x8000_0000, 0xffff_ffff_8000_0000));
    }

    #[test]
    fn test_enable_and_scope_gates() {
        let hart = HartState::default().with_privilege(PrivilegeMode::User, false);
        let mut c = control(MatchKind::Equal);
        c.load = false;
        c.scope = ScopeFlags::S;
        assert!(c
            .detect_memory_access_match(&hart, 0x40, Operation::Store, 0x40, Some(0))
            .is_none());
        c.scope = ScopeFlags::U;
        assert!(c
            .detect_memory_access_match(&hart, 0x40, Operation::Store, 0x40, Some(0))
            .is_some());
        assert!(c
            .detect_memory_access_match(&hart, 0x40, Operation::Load, 0x40, None)
            .is_none());
    }

    #[test]
    fn test_data_select_needs_data() {
        let hart = HartState::default();
        let mut c = control(MatchKind::Equal);
        c.select = true;
        assert!(c
            .detect_memory_access_match(&hart, 0x55, Operation::Execute, 0x55, None)
            .is_none());
        assert!(!c.hit);
        let result =
            c.detect_memory_access_match(&hart, 0x55, Operation::Store, 0x1000, Some(0x55));
        assert_eq!(
            result,
            Some(MatchResult::new(Timing::Before, Action::DebugException))
        );
        assert!(c.hit);
    }
}
