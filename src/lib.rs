//
// sdtrig
//
// Copyright 2025- Manos Pitsidianakis
//
// This file is part of sdtrig.
//
// sdtrig is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// sdtrig is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with sdtrig. If not, see <http://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: EUPL-1.2 OR GPL-3.0-or-later

//! Emulation of the RISC-V debug trigger module (`Sdtrig`).
//!
//! The simulator owns one [`TriggerCsrs`] per hart, forwards the trigger CSR
//! accesses to it and, before every load, store, instruction fetch and trap,
//! asks its [`TriggerModule`] whether a trigger fires:
//!
//! ```rust
//! use sdtrig::{
//!     csr::{TDATA1, TDATA2},
//!     hart::HartState,
//!     module::TriggerModule,
//!     trigger::{Action, MatchResult, Operation, Timing},
//!     TriggerCsrs,
//! };
//!
//! let hart = HartState::default();
//! let mut csrs = TriggerCsrs::new(TriggerModule::new(2));
//! // mcontrol6, M-mode, execute, match == tdata2
//! csrs.write_csr(&hart, TDATA1, 6 << 60 | 1 << 6 | 1 << 2).unwrap();
//! csrs.write_csr(&hart, TDATA2, 0x8000_0004).unwrap();
//!
//! let module = csrs.module_mut();
//! assert!(module.is_armed(Operation::Execute));
//! assert_eq!(
//!     module.detect_memory_access_match(&hart, Operation::Execute, 0x8000_0004, None),
//!     Some(MatchResult::new(Timing::Before, Action::DebugException))
//! );
//! assert_eq!(
//!     module.detect_memory_access_match(&hart, Operation::Execute, 0x8000_0008, None),
//!     None
//! );
//! ```

pub mod csr;
pub mod hart;
pub mod module;
pub mod replay;
pub mod trigger;

pub use csr::TriggerCsrs;
pub use hart::HartState;
pub use module::{ModuleConfig, TriggerModule};
