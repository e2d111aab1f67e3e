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

use std::{borrow::Cow, path::PathBuf};

use clap::Parser;
use sdtrig::{hart::Xlen, replay::maybe_hex};

fn trigger_count(s: &str) -> Result<usize, Cow<'static, str>> {
    let count = maybe_hex(s)?;
    usize::try_from(count).map_err(|err| Cow::Owned(format!("Trigger count {count}: {err}")))
}

fn xlen(s: &str) -> Result<Xlen, Cow<'static, str>> {
    let bits = s
        .trim_start_matches(|c: char| c == 'r' || c == 'R' || c == 'v' || c == 'V')
        .parse::<u32>()
        .map_err(|err| Cow::Owned(format!("{s:?}: {err}")))?;
    Xlen::try_from(bits).map_err(Cow::Owned)
}

/// Replays a RISC-V debug trigger script and prints what fired.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, default_value_t = 0, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Hexadecimal or decimal number of trigger slots. Overrides the script's
    /// `config.count`.
    #[arg(long, value_parser = trigger_count)]
    pub count: Option<usize>,
    /// Register width of the hart, `32` or `64`. Overrides the script's
    /// `hart.xlen`.
    #[arg(long, value_parser = xlen)]
    pub xlen: Option<Xlen>,

    /// Path to a JSON replay script.
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,
}

impl Args {
    /// Parse command-line arguments from the process environment.
    pub fn parse() -> Result<Self, String> {
        let retval = <Self as clap::Parser>::parse();
        if retval.count == Some(0) {
            return Err("Invalid arguments: trigger count must be non-zero.".to_string());
        }
        Ok(retval)
    }
}
