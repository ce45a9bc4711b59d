/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::Serialize;

use crate::args::Args;

/// The requested action for every matched pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OpKind {
    /// rename(2) only; cross-device pairs are rejected.
    Move,
    /// rename(2), falling back to copy-then-unlink across devices.
    Xmove,
    /// Rename within the source directory; the target is a bare name.
    Dirmove,
    Copy,
    Overwrite,
    Append,
    Hardlink,
    Symlink,
}

impl OpKind {
    pub fn is_move(self) -> bool {
        matches!(self, OpKind::Move | OpKind::Xmove | OpKind::Dirmove)
    }
    pub fn is_copy(self) -> bool {
        matches!(self, OpKind::Copy | OpKind::Overwrite)
    }
    pub fn is_link(self) -> bool {
        matches!(self, OpKind::Hardlink | OpKind::Symlink)
    }
    /// Ops whose target is opened for writing rather than replaced.
    pub fn writes_target(self) -> bool {
        matches!(self, OpKind::Append | OpKind::Overwrite)
    }
}

/// What to do when parts of the plan are invalid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BadPolicy {
    Ask,
    Skip,
    Abort,
}

/// What to do when a target would have to be deleted or overwritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DelPolicy {
    Ask,
    All,
    None,
}

/// How `from`/`to` pairs are encoded on the input stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Encoding {
    /// Wildcard patterns with back-references (command line and the classic
    /// whitespace-token stream).
    Pattern,
    /// NUL-terminated literal pairs.
    Nul,
    /// Quoted-printable lines, one name per line.
    Qp,
    /// BSD vis-encoded lines.
    Vis,
    /// `\xNN`-escaped lines.
    Xnn,
}

impl Encoding {
    /// Literal encodings bypass wildcard compilation entirely.
    pub fn is_literal(self) -> bool {
        self != Encoding::Pattern
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    pub op: OpKind,
    pub verbose: bool,
    pub no_execute: bool,
    pub match_all: bool,
    pub delstyle: DelPolicy,
    pub badstyle: BadPolicy,
    pub encoding: Encoding,
    pub debug: bool,
}

impl Options {
    /// Resolve the switch set the way the classic option parser did: within
    /// each group (op, delete-style, bad-style) the switch seen first on the
    /// command line wins, and the program name supplies the op when no
    /// switch names one. The flat clap flags lose argv order, so the raw
    /// arguments are scanned again here for the grouped switches.
    pub fn resolve(args: &Args, progname: &str, argv: &[String]) -> Options {
        let op = match first_switch(argv, "mxrcoals") {
            Some('m') => OpKind::Move,
            Some('x') => OpKind::Xmove,
            Some('r') => OpKind::Dirmove,
            Some('c') => OpKind::Copy,
            Some('o') => OpKind::Overwrite,
            Some('a') => OpKind::Append,
            Some('l') => OpKind::Hardlink,
            Some('s') => OpKind::Symlink,
            _ => match progname {
                "mcp" => OpKind::Copy,
                "mad" => OpKind::Append,
                "mln" => OpKind::Hardlink,
                _ => OpKind::Xmove,
            },
        };

        let mut delstyle = match first_switch(argv, "dp") {
            Some('d') => DelPolicy::All,
            Some('p') => DelPolicy::None,
            _ => DelPolicy::Ask,
        };

        let badstyle = match first_switch(argv, "gt") {
            Some('g') => BadPolicy::Skip,
            Some('t') => BadPolicy::Abort,
            _ => BadPolicy::Ask,
        };

        // With a non-interactive bad policy there is nobody to ask about
        // deletions either.
        if badstyle != BadPolicy::Ask && delstyle == DelPolicy::Ask {
            delstyle = DelPolicy::None;
        }

        let encoding = if args.nul {
            Encoding::Nul
        } else if args.qp {
            Encoding::Qp
        } else if args.vis {
            Encoding::Vis
        } else if args.xnn {
            Encoding::Xnn
        } else {
            Encoding::Pattern
        };

        Options {
            op,
            verbose: args.verbose,
            no_execute: args.no_execute,
            match_all: args.match_all,
            delstyle,
            badstyle,
            encoding,
            debug: args.debug,
        }
    }
}

/// First occurrence, in command-line order, of any switch character from
/// `set`. Merged clusters are scanned left to right; long options are not
/// switch clusters, and `--` ends the switches. clap has already validated
/// the arguments, so anything found here was an accepted flag.
fn first_switch(argv: &[String], set: &str) -> Option<char> {
    for arg in argv {
        if arg == "--" {
            break;
        }
        if !arg.starts_with('-') || arg.starts_with("--") {
            continue;
        }
        if let Some(c) = arg.chars().skip(1).find(|c| set.contains(*c)) {
            return Some(c);
        }
    }
    None
}
