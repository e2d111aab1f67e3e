// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! The trigger array of one hart.
//!
//! [`TriggerModule`] owns a fixed number of [`Trigger`] slots. The simulator
//! drives it through indexed register accesses and asks it, for every memory
//! access and every trap, whether a trigger fires.
//!
//! Chaining is positional: a slot with `chain` set forms a group with the
//! slot that follows it. A group fires only when every member matches the
//! same access, and the result is then the one of its last member.

use std::ops::Range;

use serde_derive::{Deserialize, Serialize};

use crate::{
    hart::HartState,
    trigger::{codec, MatchResult, Operation, Tdata, Trap, Trigger, TriggerType},
};

/// Number of slots when nothing else is configured.
pub const DEFAULT_TRIGGER_COUNT: usize = 4;

/// `tinfo` value of an index that has no trigger.
pub const TINFO_NO_TRIGGER: u64 = 1;

/// Construction parameters of a [`TriggerModule`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Number of trigger slots.
    pub count: usize,
    /// Longest chain the hardware evaluates as a unit. Defaults to `count`.
    pub max_chain_len: Option<usize>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_TRIGGER_COUNT,
            max_chain_len: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ZeroChainLength,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for ConfigError {}

impl ModuleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chain_len == Some(0) {
            return Err(ConfigError::ZeroChainLength);
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct TriggerModule {
    triggers: Vec<Trigger>,
    max_chain_len: usize,
    /// Per [`Operation`]: whether any slot watches that kind of access.
    armed: [bool; 3],
}

impl TriggerModule {
    /// A module with `count` disabled slots and no chain length limit.
    pub fn new(count: usize) -> Self {
        Self {
            triggers: vec![Trigger::new(); count],
            max_chain_len: count.max(1),
            armed: [false; 3],
        }
    }

    pub fn with_config(config: &ModuleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut module = Self::new(config.count);
        if let Some(max_chain_len) = config.max_chain_len {
            module.max_chain_len = max_chain_len;
        }
        Ok(module)
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.triggers.len()
    }

    #[inline]
    pub fn max_chain_len(&self) -> usize {
        self.max_chain_len
    }

    #[inline]
    pub fn trigger(&self, index: usize) -> Option<&Trigger> {
        self.triggers.get(index)
    }

    #[inline]
    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Reads a data register of slot `index`, or `None` if there is no such
    /// slot.
    pub fn read(&self, hart: &HartState, index: usize, register: Tdata) -> Option<u64> {
        Some(self.triggers.get(index)?.read(hart, register))
    }

    /// Writes a data register of slot `index`.
    ///
    /// Returns `false` if there is no such slot or if the slot belongs to the
    /// debugger (`dmode`) and the hart is not in Debug Mode. The register is
    /// left untouched in both cases.
    pub fn write(&mut self, hart: &HartState, index: usize, register: Tdata, value: u64) -> bool {
        let Some(trigger) = self.triggers.get(index) else {
            log::debug!(target: "trigger", "write to missing trigger {index} ignored");
            return false;
        };
        if trigger.dmode() && !hart.debug_mode {
            log::debug!(
                target: "trigger",
                "{register:?} write to trigger {index} refused: dmode set outside Debug Mode"
            );
            return false;
        }

        let mut allow_chain = true;
        let value = match register {
            Tdata::Tdata1 => {
                let mut value = if hart.debug_mode {
                    value
                } else {
                    codec::clear_dmode(hart.xlen, value)
                };
                // An M-mode slot chained into this one keeps it out of the
                // debugger's hands.
                if let Some(prev) = index.checked_sub(1).and_then(|i| self.triggers.get(i)) {
                    if prev.chain() && !prev.dmode() {
                        value = codec::clear_dmode(hart.xlen, value);
                    }
                }
                let dmode = codec::dmode_field(hart.xlen, value);
                // A chain must not run from an M-mode slot into a debugger slot.
                allow_chain = match self.triggers.get(index + 1) {
                    Some(next) => !(next.dmode() && !dmode),
                    None => false,
                };
                value
            }
            Tdata::Tdata2 | Tdata::Tdata3 => value,
        };

        let trigger = &mut self.triggers[index];
        trigger.write(hart, register, value, allow_chain);
        log::debug!(
            target: "trigger",
            "trigger {index} {register:?} <= {value:#x}, reads back {:#x}",
            trigger.read(hart, register)
        );
        self.update_armed();
        true
    }

    /// `tinfo` for slot `index`.
    pub fn tinfo(&self, index: usize) -> u64 {
        if index < self.count() {
            TriggerType::tinfo()
        } else {
            TINFO_NO_TRIGGER
        }
    }

    /// Whether any slot could fire for accesses of kind `operation`.
    #[inline]
    pub fn is_armed(&self, operation: Operation) -> bool {
        self.armed[operation as usize]
    }

    fn update_armed(&mut self) {
        for operation in Operation::ALL {
            self.armed[operation as usize] =
                self.triggers.iter().any(|trigger| trigger.watches(operation));
        }
    }

    /// Contiguous index ranges evaluated as one chain.
    ///
    /// Every slot belongs to exactly one group. A group ends at the first
    /// member without `chain`, at the end of the array, or once it reaches
    /// the configured maximum chain length.
    pub fn chain_groups(&self) -> Vec<Range<usize>> {
        let mut groups = Vec::new();
        let mut start = 0;
        for (index, trigger) in self.triggers.iter().enumerate() {
            let end = index + 1;
            if !trigger.chain() || end - start >= self.max_chain_len || end == self.count() {
                groups.push(start..end);
                start = end;
            }
        }
        groups
    }

    /// Checks a load, store or instruction fetch against every trigger.
    ///
    /// Members of a chain are evaluated in order until one does not match, so
    /// leading members of a chain that did not fire may still have `hit` set.
    /// The scan stops at the first group that fires.
    pub fn detect_memory_access_match(
        &mut self,
        hart: &HartState,
        operation: Operation,
        address: u64,
        data: Option<u64>,
    ) -> Option<MatchResult> {
        if hart.debug_mode {
            return None;
        }
        for group in self.chain_groups() {
            let mut result = None;
            for index in group.clone() {
                result = self.triggers[index]
                    .detect_memory_access_match(hart, operation, address, data);
                if result.is_none() {
                    break;
                }
            }
            if let Some(result) = result {
                log::debug!(
                    target: "trigger",
                    "{operation:?} at {address:#x} fired triggers {group:?}: {result:?}"
                );
                return Some(result);
            }
        }
        None
    }

    /// Checks a trap about to be delivered against every trigger.
    pub fn detect_trap_match(&mut self, hart: &HartState, trap: &Trap) -> Option<MatchResult> {
        if hart.debug_mode {
            return None;
        }
        for (index, trigger) in self.triggers.iter_mut().enumerate() {
            if let Some(result) = trigger.detect_trap_match(hart, trap) {
                log::debug!(target: "trigger", "{trap:?} fired trigger {index}: {result:?}");
                return Some(result);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{Action, Timing};

    const MC6: u64 = 6 << 60;
    const DMODE: u64 = 1 << 59;
    const CHAIN: u64 = 1 << 11;
    const M: u64 = 1 << 6;
    const EXECUTE: u64 = 1 << 2;
    const LOAD: u64 = 1;

    #[test]
    fn test_config() {
        let config: ModuleConfig = serde_json::from_str(r#"{ "max_chain_len": 2 }"#).unwrap();
        assert_eq!(config.count, DEFAULT_TRIGGER_COUNT);
        let module = TriggerModule::with_config(&config).unwrap();
        assert_eq!(module.count(), 4);
        assert_eq!(module.max_chain_len(), 2);
        assert!(TriggerModule::with_config(&ModuleConfig {
            count: 2,
            max_chain_len: Some(0),
        })
        .is_err());
        assert_eq!(TriggerModule::new(3).max_chain_len(), 3);
    }

    #[test]
    fn test_tinfo() {
        let module = TriggerModule::new(2);
        assert_eq!(module.tinfo(0), 0x8074);
        assert_eq!(module.tinfo(1), 0x8074);
        assert_eq!(module.tinfo(2), TINFO_NO_TRIGGER);
    }

    #[test]
    fn test_chain_groups() {
        let hart = HartState::default();
        let mut module = TriggerModule::new(5);
        assert_eq!(module.chain_groups(), vec![0..1, 1..2, 2..3, 3..4, 4..5]);
        for index in [0, 1, 3] {
            assert!(module.write(&hart, index, Tdata::Tdata1, MC6 | CHAIN | M | LOAD));
        }
        assert_eq!(module.chain_groups(), vec![0..3, 3..5]);
    }

    #[test]
    fn test_last_slot_cannot_chain() {
        let hart = HartState::default();
        let mut module = TriggerModule::new(2);
        assert!(module.write(&hart, 1, Tdata::Tdata1, MC6 | CHAIN | M | LOAD));
        assert!(!module.trigger(1).unwrap().chain());
        assert_eq!(module.read(&hart, 1, Tdata::Tdata1), Some(MC6 | M | LOAD));
    }

    #[test]
    fn test_max_chain_len_splits_groups() {
        let hart = HartState::default();
        let mut module = TriggerModule::with_config(&ModuleConfig {
            count: 4,
            max_chain_len: Some(2),
        })
        .unwrap();
        for index in 0..3 {
            assert!(module.write(&hart, index, Tdata::Tdata1, MC6 | CHAIN | M | LOAD));
        }
        assert_eq!(module.chain_groups(), vec![0..2, 2..4]);

        // Implementation-defined: a chain longer than `max_chain_len` is cut
        // into consecutive groups, each firing on its own.
        module.write(&hart, 1, Tdata::Tdata1, MC6 | CHAIN | 4 << 12 | M | LOAD);
        module.write(&hart, 0, Tdata::Tdata2, 0x100);
        module.write(&hart, 1, Tdata::Tdata2, 0x100);
        module.write(&hart, 2, Tdata::Tdata2, 0x200);
        module.write(&hart, 3, Tdata::Tdata2, 0x200);
        assert_eq!(
            module.detect_memory_access_match(&hart, Operation::Load, 0x100, None),
            Some(MatchResult::new(Timing::Before, Action::TraceEmit))
        );
        assert!(module.trigger(1).unwrap().hit());
        assert!(!module.trigger(2).unwrap().hit());
    }

    #[test]
    fn test_dmode_only_from_debug_mode() {
        let mut hart = HartState::default();
        let mut module = TriggerModule::new(2);
        // Outside Debug Mode the bit is dropped.
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | DMODE | M | EXECUTE));
        assert!(!module.trigger(0).unwrap().dmode());

        hart.debug_mode = true;
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | DMODE | M | EXECUTE));
        assert!(module.trigger(0).unwrap().dmode());

        hart.debug_mode = false;
        for register in [Tdata::Tdata1, Tdata::Tdata2, Tdata::Tdata3] {
            assert!(!module.write(&hart, 0, register, 0));
        }
        assert_eq!(
            module.read(&hart, 0, Tdata::Tdata1),
            Some(MC6 | DMODE | M | EXECUTE)
        );
    }

    #[test]
    fn test_no_chain_into_debugger_slot() {
        let mut hart = HartState::default();
        hart.debug_mode = true;
        let mut module = TriggerModule::new(3);
        assert!(module.write(&hart, 1, Tdata::Tdata1, MC6 | DMODE | M | LOAD));
        // Debug Mode write without dmode: chain dropped.
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | CHAIN | M | LOAD));
        assert!(!module.trigger(0).unwrap().chain());
        // Both owned by the debugger: chain kept.
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | DMODE | CHAIN | M | LOAD));
        assert!(module.trigger(0).unwrap().chain());
    }

    #[test]
    fn test_no_debugger_slot_behind_m_mode_chain() {
        let mut hart = HartState::default();
        let mut module = TriggerModule::new(2);
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | CHAIN | M | LOAD));
        assert!(module.trigger(0).unwrap().chain());

        hart.debug_mode = true;
        assert!(module.write(&hart, 1, Tdata::Tdata1, MC6 | DMODE | M | LOAD));
        assert!(!module.trigger(1).unwrap().dmode());
        assert_eq!(module.read(&hart, 1, Tdata::Tdata1), Some(MC6 | M | LOAD));

        // Once slot 0 belongs to the debugger too, slot 1 may follow.
        assert!(module.write(&hart, 0, Tdata::Tdata1, MC6 | DMODE | CHAIN | M | LOAD));
        assert!(module.write(&hart, 1, Tdata::Tdata1, MC6 | DMODE | M | LOAD));
        assert!(module.trigger(1).unwrap().dmode());
        assert!(module.trigger(0).unwrap().chain());
    }

    #[test]
    fn test_is_armed() {
        let hart = HartState::default();
        let mut module = TriggerModule::new(2);
        assert!(Operation::ALL.iter().all(|op| !module.is_armed(*op)));
        module.write(&hart, 1, Tdata::Tdata1, MC6 | M | LOAD);
        assert!(module.is_armed(Operation::Load));
        assert!(!module.is_armed(Operation::Store));
        assert!(!module.is_armed(Operation::Execute));
        module.write(&hart, 1, Tdata::Tdata1, 0);
        assert!(!module.is_armed(Operation::Load));
    }

    #[test]
    fn test_first_firing_group_wins() {
        let hart = HartState::default();
        let mut module = TriggerModule::new(2);
        // action = trace emit
        module.write(&hart, 0, Tdata::Tdata1, MC6 | 4 << 12 | M | LOAD);
        module.write(&hart, 0, Tdata::Tdata2, 0x100);
        module.write(&hart, 1, Tdata::Tdata1, MC6 | M | LOAD);
        module.write(&hart, 1, Tdata::Tdata2, 0x100);
        assert_eq!(
            module.detect_memory_access_match(&hart, Operation::Load, 0x100, None),
            Some(MatchResult::new(Timing::Before, Action::TraceEmit))
        );
        // The scan stopped before reaching slot 1.
        assert!(module.trigger(0).unwrap().hit());
        assert!(!module.trigger(1).unwrap().hit());
    }

    #[test]
    fn test_no_match_in_debug_mode() {
        let mut hart = HartState::default();
        let mut module = TriggerModule::new(1);
        module.write(&hart, 0, Tdata::Tdata1, MC6 | M | LOAD);
        module.write(&hart, 0, Tdata::Tdata1, 5 << 60 | 1 << 9);
        module.write(&hart, 0, Tdata::Tdata2, u64::MAX);
        hart.debug_mode = true;
        assert!(module
            .detect_trap_match(&hart, &Trap::exception(3))
            .is_none());
        hart.debug_mode = false;
        assert!(module
            .detect_trap_match(&hart, &Trap::exception(3))
            .is_some());
    }
}
