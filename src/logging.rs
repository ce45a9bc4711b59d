/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::env;

use anyhow::Context;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Initialize the logger. `-D` turns debug dumps on; `MMV_DEBUG` does the
/// same from the environment and, when its value names a path, sends the
/// dumps to that file instead of stderr.
pub fn init(debug_flag: bool) -> anyhow::Result<()> {
    let env_value = env::var("MMV_DEBUG").ok().filter(|v| !v.is_empty());
    let debug = debug_flag || env_value.is_some();
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    let file_target = env_value.filter(|v| !matches!(v.as_str(), "1" | "true" | "yes" | "stderr" | "-"));

    let encoder = Box::new(PatternEncoder::new("{m}{n}"));
    let config = match file_target {
        Some(path) => {
            let appender = FileAppender::builder()
                .encoder(encoder)
                .build(&path)
                .with_context(|| format!("failed to open debug file '{}'", path))?;
            Config::builder()
                .appender(Appender::builder().build("dump", Box::new(appender)))
                .build(Root::builder().appender("dump").build(level))
        }
        None => {
            let appender = ConsoleAppender::builder()
                .target(Target::Stderr)
                .encoder(encoder)
                .build();
            Config::builder()
                .appender(Appender::builder().build("dump", Box::new(appender)))
                .build(Root::builder().appender("dump").build(level))
        }
    }
    .with_context(|| "failed to build logger configuration")?;

    log4rs::init_config(config).with_context(|| "failed to init logger")?;
    Ok(())
}
