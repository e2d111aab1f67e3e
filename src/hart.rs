// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later
// Copyright Contributors to the sdtrig project.

//! Processor state consumed by the trigger module.
//!
//! The trigger module never owns any of this: the simulator hands a
//! [`HartState`] snapshot to every register access and every scan.

use serde_derive::{Deserialize, Serialize};

/// RISC-V privilege level.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeMode {
    /// `U`
    User = 0b00,
    /// `S`, or `HS` when the hypervisor extension is enabled.
    Supervisor = 0b01,
    #[default]
    /// `M`
    Machine = 0b11,
}

/// Native register width of the hart.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Xlen {
    /// `RV32`
    Rv32,
    #[default]
    /// `RV64`
    Rv64,
}

impl Xlen {
    /// Width in bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }

    /// All-ones value of this width.
    #[inline]
    pub const fn mask(self) -> u64 {
        match self {
            Self::Rv32 => 0xffff_ffff,
            Self::Rv64 => u64::MAX,
        }
    }
}

impl TryFrom<u32> for Xlen {
    type Error = String;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        match bits {
            32 => Ok(Self::Rv32),
            64 => Ok(Self::Rv64),
            other => Err(format!("Unsupported XLEN {other}, expected 32 or 64")),
        }
    }
}

impl From<Xlen> for u32 {
    fn from(xlen: Xlen) -> Self {
        xlen.bits()
    }
}

impl std::fmt::Display for Xlen {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(fmt, "RV{}", self.bits())
    }
}

bitflags::bitflags! {
    /// `misa` extensions that change trigger legalization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct Extensions: u32 {
        /// Hypervisor extension.
        const H = 1 << 7;
        /// Supervisor mode.
        const S = 1 << 18;
        /// User mode.
        const U = 1 << 20;
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::S | Self::U
    }
}

/// Snapshot of the hart state the trigger module depends on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HartState {
    /// Current privilege level.
    pub privilege: PrivilegeMode,
    /// Virtualization mode (`V` bit). Ignored in M-mode.
    pub virt: bool,
    /// Whether the hart is halted in Debug Mode.
    pub debug_mode: bool,
    pub xlen: Xlen,
    pub extensions: Extensions,
    /// Live `scontext` CSR value.
    pub scontext: u64,
    /// Live `mcontext` (`hcontext`) CSR value.
    pub mcontext: u64,
    /// Address space identifier from `satp`.
    pub asid: u64,
    /// Virtual machine identifier from `hgatp`.
    pub vmid: u64,
}

impl Default for HartState {
    fn default() -> Self {
        Self::new(Xlen::default())
    }
}

impl HartState {
    /// A hart in M-mode with S and U implemented and all context CSRs zero.
    pub const fn new(xlen: Xlen) -> Self {
        Self {
            privilege: PrivilegeMode::Machine,
            virt: false,
            debug_mode: false,
            xlen,
            extensions: Extensions::S.union(Extensions::U),
            scontext: 0,
            mcontext: 0,
            asid: 0,
            vmid: 0,
        }
    }

    /// Returns a copy running at `privilege` with the given `V` bit.
    pub const fn with_privilege(mut self, privilege: PrivilegeMode, virt: bool) -> Self {
        self.privilege = privilege;
        self.virt = virt;
        self
    }

    #[inline]
    pub const fn supervisor_enabled(&self) -> bool {
        self.extensions.contains(Extensions::S)
    }

    #[inline]
    pub const fn user_enabled(&self) -> bool {
        self.extensions.contains(Extensions::U)
    }

    #[inline]
    pub const fn hypervisor_enabled(&self) -> bool {
        self.extensions.contains(Extensions::H)
    }

    /// `V` as it applies to the current mode: M-mode is never virtualized.
    #[inline]
    pub const fn virtualized(&self) -> bool {
        self.virt && !matches!(self.privilege, PrivilegeMode::Machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xlen_serde() {
        let xlen: Xlen = serde_json::from_str("32").unwrap();
        assert_eq!(xlen, Xlen::Rv32);
        assert!(serde_json::from_str::<Xlen>("128").is_err());
        assert_eq!(serde_json::to_string(&Xlen::Rv64).unwrap(), "64");
    }

    #[test]
    fn test_hart_state_defaults() {
        let hart: HartState = serde_json::from_str(r#"{ "privilege": "user" }"#).unwrap();
        assert_eq!(hart.privilege, PrivilegeMode::User);
        assert_eq!(hart.xlen, Xlen::Rv64);
        assert!(hart.supervisor_enabled());
        assert!(!hart.hypervisor_enabled());
    }

    #[test]
    fn test_machine_mode_is_never_virtualized() {
        let hart = HartState::default().with_privilege(PrivilegeMode::Machine, true);
        assert!(!hart.virtualized());
        let hart = hart.with_privilege(PrivilegeMode::User, true);
        assert!(hart.virtualized());
    }
}
