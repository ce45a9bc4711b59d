/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use log::debug;

use crate::debug::dump_plan;
use crate::options::{DelPolicy, OpKind, Options};
use crate::pattern::compile::{
    parse_from, parse_from_literal, parse_to, tilde_expand, PatternError,
};
use crate::plan::analyze::DelScan;
use crate::plan::rep::{Plan, RepId};
use crate::report::{explain_pattern_too_long, Report};
use crate::scan::{FileId, HandleId, Snapshot};
use crate::sys::SysInfo;
use crate::PATH_MAX;

/// All state of one run: configuration, the filesystem snapshot, the plan
/// under construction, diagnostic counters and the working buffers shared
/// by matching and execution.
pub struct Mmv {
    pub opts: Options,
    pub sys: SysInfo,
    pub report: Report,
    pub snapshot: Snapshot,
    pub plan: Plan,

    /// Current pair, tilde-expanded.
    pub from: String,
    pub to: String,
    /// Search-side path buffer.
    pub path: String,
    /// Synthesized full target path.
    pub fullrep: String,
    /// The last target synthesis produced an unusable name.
    pub rep_bad: bool,
    /// `(*)` was given with the current pair.
    pub pair_del_ok: bool,

    pub paterr: usize,
    pub badreps: usize,
    pub failed: bool,
    /// Runtime no-execute switch; starts from the option and is also set
    /// when a failure snapshots the rest of the plan.
    pub noex: bool,
}

impl Mmv {
    pub fn new(opts: Options, sys: SysInfo) -> Self {
        let noex = opts.no_execute;
        Mmv {
            opts,
            sys,
            report: Report::new(),
            snapshot: Snapshot::new(),
            plan: Plan::new(),
            from: String::new(),
            to: String::new(),
            path: String::new(),
            fullrep: String::new(),
            rep_bad: false,
            pair_del_ok: false,
            paterr: 0,
            badreps: 0,
            failed: false,
            noex,
        }
    }

    /// Add one `from`/`to` pair: compile, match, and append every valid
    /// replacement to the plan. Pattern and matching problems are reported
    /// and counted; they do not abort the run.
    pub fn add_pair(&mut self, from: &str, to: &str, del_ok: bool) -> anyhow::Result<()> {
        self.pair_del_ok = del_ok;

        let mut too_long = false;
        for s in [from, to] {
            if s.len() >= PATH_MAX {
                explain_pattern_too_long(s);
                too_long = true;
            }
        }
        if too_long {
            self.paterr += 1;
            return Ok(());
        }

        let from_x = tilde_expand(from, &self.sys.home);
        let to_x = tilde_expand(to, &self.sys.home);
        if from_x.len() >= PATH_MAX || to_x.len() >= PATH_MAX {
            explain_pattern_too_long(if from_x.len() >= PATH_MAX { &from_x } else { &to_x });
            self.paterr += 1;
            return Ok(());
        }
        self.from = from_x;
        self.to = to_x;

        let literal = self.opts.encoding.is_literal();
        let pat = if literal {
            parse_from_literal(self.from.clone())
        } else {
            match parse_from(self.from.clone()) {
                Ok(p) => p,
                Err(err) => return Ok(self.pair_error(&err)),
            }
        };
        if let Err(err) = parse_to(
            &self.to,
            pat.wild_count,
            self.opts.op == OpKind::Dirmove,
            literal,
        ) {
            return Ok(self.pair_error(&err));
        }

        debug!(
            "pair '{}' -> '{}': {} stage(s), {} wildcard(s)",
            self.from,
            self.to,
            pat.stages.len(),
            pat.wild_count
        );

        let mut caps = vec![String::new(); pat.wild_count];
        self.path.clear();
        let nothing = self.descend(&pat, &mut caps, 0, 0, 0, 0, None)?;
        if nothing {
            self.pair_msg("no match.");
            self.paterr += 1;
        }
        Ok(())
    }

    /// Analyze the collected plan and execute it. Returns the process exit
    /// code: 2 if an operation failed, 1 if there were errors and nothing
    /// live remained (or the operator refused to continue), else 0.
    pub fn run(&mut self) -> anyhow::Result<i32> {
        if log::log_enabled!(log::Level::Debug) {
            dump_plan(self);
        }

        if self.opts.op != OpKind::Append {
            self.check_collisions();
        }
        self.find_order();
        if self.opts.op.is_copy() || self.opts.op.is_link() {
            self.forbid_chains();
        }
        self.scan_deletes(DelScan::Bad)?;
        if !self.policy_gate() {
            return Ok(1);
        }
        if self.opts.op != OpKind::Append && self.opts.delstyle == DelPolicy::Ask {
            self.scan_deletes(DelScan::Ask)?;
        }
        self.do_reps()?;

        Ok(if self.failed {
            2
        } else if self.plan.live == 0 && (self.paterr > 0 || self.badreps > 0) {
            1
        } else {
            0
        })
    }

    pub(crate) fn pair_msg(&mut self, text: &str) {
        let line = format!("{} -> {} : {}", self.from, self.to, text);
        self.report.writeln(&line);
    }

    pub(crate) fn pair_error(&mut self, err: &PatternError) {
        self.pair_msg(&err.to_string());
        self.paterr += 1;
    }

    /// Diagnostic prefixed with the actual source and target paths rather
    /// than the patterns.
    pub(crate) fn path_msg(&mut self, text: &str) {
        let line = format!("{} -> {} : {}", self.path, self.fullrep, text);
        self.report.writeln(&line);
    }

    pub(crate) fn fname(&self, id: FileId) -> String {
        self.snapshot.dirs.file(id).name.clone()
    }

    pub(crate) fn prefix(&self, id: HandleId) -> String {
        self.snapshot.handle(id).prefix.clone()
    }

    /// Full source path of a plan node.
    pub(crate) fn src_of(&self, id: RepId) -> String {
        let rep = self.plan.rep(id);
        format!("{}{}", self.prefix(rep.hfrom), self.fname(rep.ffrom))
    }

    /// Full target path of a plan node.
    pub(crate) fn dst_of(&self, id: RepId) -> String {
        let rep = self.plan.rep(id);
        format!("{}{}", self.prefix(rep.hto), rep.nto)
    }
}
