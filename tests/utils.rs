// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

use sdtrig::{
    hart::{HartState, Xlen},
    module::TriggerModule,
    trigger::Tdata,
};

#[macro_export]
macro_rules! assert_hex_eq {
    ($left: expr, $right: expr$(,)?) => {{
        let left: u64 = $left;
        let right: u64 = $right;
        assert_eq!(
            left,
            right,
            "Comparing {left_s} with {right_s} failed:\n0x{left:016x} {left_s}\n0x{right:016x} \
             {right_s}\n0b{left:064b} {left_s}\n0b{right:064b} {right_s}",
            left_s = stringify!($left),
            right_s = stringify!($right),
            left = left,
            right = right,
        );
    }};
}

pub const M: u64 = 1 << 6;
pub const S: u64 = 1 << 4;
pub const U: u64 = 1 << 3;
pub const EXECUTE: u64 = 1 << 2;
pub const STORE: u64 = 1 << 1;
pub const LOAD: u64 = 1 << 0;
pub const CHAIN: u64 = 1 << 11;

/// `mcontrol6` field helpers, on top of the header for `xlen`.
pub fn mcontrol6(xlen: Xlen, low_bits: u64) -> u64 {
    6 << (xlen.bits() - 4) | low_bits
}

#[allow(dead_code)]
pub fn mcontrol6_hit(low_bits: u64) -> u64 {
    low_bits | 1 << 22
}

#[allow(dead_code)]
pub fn mcontrol6_action(action: u64) -> u64 {
    action << 12
}

#[allow(dead_code)]
pub fn mcontrol6_match(kind: u64) -> u64 {
    kind << 7
}

#[allow(dead_code)]
pub fn mcontrol6_select() -> u64 {
    1 << 21
}

#[allow(dead_code)]
pub fn etrigger(xlen: Xlen, low_bits: u64) -> u64 {
    5 << (xlen.bits() - 4) | low_bits
}

/// Programs slot `index` with a `tdata1` and `tdata2` pair, asserting that
/// both writes are accepted.
#[allow(dead_code)]
pub fn program(
    module: &mut TriggerModule,
    hart: &HartState,
    index: usize,
    tdata1: u64,
    tdata2: u64,
) {
    assert!(module.write(hart, index, Tdata::Tdata1, tdata1));
    assert!(module.write(hart, index, Tdata::Tdata2, tdata2));
}
