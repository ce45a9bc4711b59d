/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::env;
use std::io;
use std::path::Path;

use clap::Parser;
use log::error;

use mmv::args::Args;
use mmv::engine::Mmv;
use mmv::logging;
use mmv::options::{OpKind, Options};
use mmv::pairs;
use mmv::sys::SysInfo;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            error!("{:?}", err);
            eprintln!("{:#}", err);
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<i32> {
    let mut raw = env::args();
    let progname = raw
        .next()
        .and_then(|p| {
            Path::new(&p)
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let argv: Vec<String> = raw.collect();

    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return Ok(0);
        }
        Err(err) => {
            let _ = err.print();
            return Ok(1);
        }
    };

    logging::init(args.debug)?;
    let sys = SysInfo::probe()?;
    let opts = Options::resolve(&args, &progname, &argv);
    if opts.op != OpKind::Dirmove {
        sys.drop_privileges()?;
    }
    let mut mmv = Mmv::new(opts, sys);

    match (&args.from, &args.to) {
        (Some(from), Some(to)) => mmv.add_pair(from, to, false)?,
        (None, None) => pairs::read_pairs(&mut mmv, io::stdin().lock())?,
        _ => {
            eprintln!(
                "Usage: {} [-m|x|r|c|o|a|l|s] [-h] [-d|p] [-g|t] [-v|n] [from to]",
                progname
            );
            return Ok(1);
        }
    }

    mmv.run()
}
