/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod args;
pub mod debug;
pub mod engine;
pub mod exec;
pub mod logging;
pub mod options;
pub mod pairs;
pub mod pattern;
pub mod plan;
pub mod prompt;
pub mod report;
pub mod scan;
pub mod sys;

/// Upper bound (exclusive) on any composed path or pattern, in bytes.
pub const PATH_MAX: usize = 4096;

/// Prefix of the temporary basenames used to displace cycle targets.
pub const TEMP_PREFIX: &str = "$$mmvtmp.";
