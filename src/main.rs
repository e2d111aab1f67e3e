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

use sdtrig::replay::{self, Script};

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::Args::parse()?;
    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let mut script = Script::load(&args.script)?;
    if let Some(count) = args.count {
        script.config.count = count;
    }
    if let Some(xlen) = args.xlen {
        script.hart.xlen = xlen;
    }
    log::info!("Replaying {}", args.script.display());

    for event in replay::run(&script)? {
        println!("{}", serde_json::to_string(&event)?);
    }
    Ok(())
}
