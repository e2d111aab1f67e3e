// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Interrupt (`itrigger`) and exception (`etrigger`) triggers.
//!
//! For both kinds `tdata2` is a bitmask indexed by cause number.

use super::{Action, MatchResult, ScopeFlags, Textra, Timing, Trap};
use crate::hart::HartState;

/// Decoded state of a trap trigger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrapControl {
    pub dmode: bool,
    pub hit: bool,
    pub scope: ScopeFlags,
    /// Fire on non-maskable interrupts. Always clear for `etrigger`.
    pub nmi: bool,
    pub action: Action,
}

impl TrapControl {
    fn gate(&self, hart: &HartState, textra: &Textra) -> bool {
        self.scope.matches(hart) && textra.matches(hart)
    }

    fn cause_selected(hart: &HartState, tdata2: u64, cause: u64) -> bool {
        cause < u64::from(hart.xlen.bits()) && (tdata2 >> cause) & 1 == 1
    }

    fn fire(&mut self) -> MatchResult {
        self.hit = true;
        MatchResult::new(Timing::Before, self.action)
    }

    pub fn detect_interrupt_match(
        &mut self,
        hart: &HartState,
        tdata2: u64,
        textra: &Textra,
        trap: &Trap,
    ) -> Option<MatchResult> {
        if !trap.interrupt || !self.gate(hart, textra) {
            return None;
        }
        let selected = if trap.nmi {
            self.nmi
        } else {
            Self::cause_selected(hart, tdata2, trap.cause)
        };
        selected.then(|| self.fire())
    }

    pub fn detect_exception_match(
        &mut self,
        hart: &HartState,
        tdata2: u64,
        textra: &Textra,
        trap: &Trap,
    ) -> Option<MatchResult> {
        if trap.interrupt || trap.nmi || !self.gate(hart, textra) {
            return None;
        }
        Self::cause_selected(hart, tdata2, trap.cause).then(|| self.fire())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hart::{PrivilegeMode, Xlen};

    fn control() -> TrapControl {
        TrapControl {
            scope: ScopeFlags::M | ScopeFlags::S | ScopeFlags::U,
            action: Action::TraceEmit,
            ..TrapControl::default()
        }
    }

    #[test]
    fn test_interrupt_cause_bitmask() {
        let hart = HartState::default();
        let textra = Textra::new();
        let mut c = control();
        let tdata2 = 1 << 7 | 1 << 11;
        assert_eq!(
            c.detect_interrupt_match(&hart, tdata2, &textra, &Trap::interrupt(7)),
            Some(MatchResult::new(Timing::Before, Action::TraceEmit))
        );
        assert!(c.hit);
        c.hit = false;
        assert!(c
            .detect_interrupt_match(&hart, tdata2, &textra, &Trap::interrupt(3))
            .is_none());
        // Exceptions with the same cause are not interrupts.
        assert!(c
            .detect_interrupt_match(&hart, tdata2, &textra, &Trap::exception(7))
            .is_none());
        assert!(!c.hit);
    }

    #[test]
    fn test_nmi() {
        let hart = HartState::default();
        let textra = Textra::new();
        let mut c = control();
        assert!(c
            .detect_interrupt_match(&hart, u64::MAX, &textra, &Trap::nmi())
            .is_none());
        c.nmi = true;
        assert!(c
            .detect_interrupt_match(&hart, 0, &textra, &Trap::nmi())
            .is_some());
        assert!(c
            .detect_exception_match(&hart, u64::MAX, &textra, &Trap::nmi())
            .is_none());
    }

    #[test]
    fn test_exception_cause_bitmask() {
        let hart = HartState::default().with_privilege(PrivilegeMode::User, false);
        let textra = Textra::new();
        let mut c = control();
        let tdata2 = 1 << 8;
        assert!(c
            .detect_exception_match(&hart, tdata2, &textra, &Trap::exception(8))
            .is_some());
        assert!(c
            .detect_exception_match(&hart, tdata2, &textra, &Trap::interrupt(8))
            .is_none());
        c.scope = ScopeFlags::M;
        assert!(c
            .detect_exception_match(&hart, tdata2, &textra, &Trap::exception(8))
            .is_none());
    }

    #[test]
    fn test_cause_beyond_xlen() {
        let hart = HartState::new(Xlen::Rv32);
        let textra = Textra::new();
        let mut c = control();
        assert!(c
            .detect_exception_match(&hart, u64::MAX, &textra, &Trap::exception(32))
            .is_none());
        assert!(c
            .detect_exception_match(&hart, u64::MAX, &textra, &Trap::exception(31))
            .is_some());
        let hart = HartState::default();
        assert!(c
            .detect_exception_match(&hart, u64::MAX, &textra, &Trap::exception(64))
            .is_none());
    }

    #[test]
    fn test_textra_gate() {
        let mut hart = HartState::default();
        let mut textra = Textra::new();
        // sselect = ASID, svalue = 5
        textra.write(&hart, 5 << 2 | 2);
        let mut c = control();
        hart.asid = 4;
        assert!(c
            .detect_exception_match(&hart, 1 << 2, &textra, &Trap::exception(2))
            .is_none());
        hart.asid = 5;
        assert!(c
            .detect_exception_match(&hart, 1 << 2, &textra, &Trap::exception(2))
            .is_some());
    }
}
