/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use clap::Parser;

/// The classic single-letter switch set; switches merge after one `-`.
/// Built-in help and version stay long-only so `-h` can mean match-all and
/// `-v` verbose.
#[derive(Parser, Debug, Default)]
#[command(
    version,
    about = "Move, copy, append or link multiple files by wildcard patterns",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Report each successful operation
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Analyze and report only; execute nothing
    #[arg(short = 'n')]
    pub no_execute: bool,

    /// Do not exclude dot-files from matching
    #[arg(short = 'h')]
    pub match_all: bool,

    /// Delete or overwrite colliding targets without asking
    #[arg(short = 'd')]
    pub delete_all: bool,

    /// Never delete or overwrite a target
    #[arg(short = 'p')]
    pub delete_none: bool,

    /// On bad replacements, proceed with the rest
    #[arg(short = 'g')]
    pub skip_bad: bool,

    /// On bad replacements, abort without doing anything
    #[arg(short = 't')]
    pub abort_bad: bool,

    /// Move by rename only; reject cross-device pairs
    #[arg(short = 'm')]
    pub op_move: bool,

    /// Move, copying across devices when rename cannot (default)
    #[arg(short = 'x')]
    pub op_xmove: bool,

    /// Rename within the source directory
    #[arg(short = 'r')]
    pub op_dirmove: bool,

    /// Copy
    #[arg(short = 'c')]
    pub op_copy: bool,

    /// Copy onto existing targets
    #[arg(short = 'o')]
    pub op_overwrite: bool,

    /// Append to targets
    #[arg(short = 'a')]
    pub op_append: bool,

    /// Hard-link
    #[arg(short = 'l')]
    pub op_hardlink: bool,

    /// Symbolic-link
    #[arg(short = 's')]
    pub op_symlink: bool,

    /// Dump pattern and plan structures to stderr
    #[arg(short = 'D')]
    pub debug: bool,

    /// Accepted for mv finger memory; no effect
    #[arg(short = 'i')]
    pub interactive: bool,

    /// Read NUL-terminated literal pairs from stdin
    #[arg(short = 'Z')]
    pub nul: bool,

    /// Read quoted-printable literal pairs from stdin
    #[arg(short = 'Q')]
    pub qp: bool,

    /// Read vis-encoded literal pairs from stdin
    #[arg(short = 'V')]
    pub vis: bool,

    /// Read \xNN-escaped literal pairs from stdin
    #[arg(short = 'X')]
    pub xnn: bool,

    #[arg(long, action = clap::ArgAction::Help, help = "Print help")]
    help: Option<bool>,

    #[arg(long, action = clap::ArgAction::Version, help = "Print version")]
    version: Option<bool>,

    /// Source pattern; quote it so the shell does not expand wildcards
    pub from: Option<String>,

    /// Replacement pattern; #N refers to the N'th wildcard of `from`
    pub to: Option<String>,
}
