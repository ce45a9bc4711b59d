/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Plan analysis: collision detection, derivation of a feasible execution
//! order (with cycle flagging), op-specific chain rejection, and the
//! delete-permission scans.

use crate::engine::Mmv;
use crate::options::{BadPolicy, DelPolicy, OpKind};
use crate::plan::rep::RepId;
use crate::prompt::{ask_yesno, OnFail};
use crate::scan::{Claim, FileId};

/// Which delete scan is running: the unconditional validity scan, or the
/// interactive one that only exists under ask-delete policy.
pub enum DelScan {
    Bad,
    Ask,
}

impl Mmv {
    /// Find groups of non-skipped nodes sharing a `(listing, basename)`
    /// target. Each group is reported once, naming every source, and every
    /// member is skipped.
    pub(crate) fn check_collisions(&mut self) {
        if self.plan.live == 0 {
            return;
        }
        let mut rd: Vec<(usize, String, usize, RepId)> = Vec::new();
        for (order, id) in self.plan.roots().enumerate() {
            let rep = self.plan.rep(id);
            let dir = self.snapshot.listing_of(rep.hto);
            rd.push((dir.0, rep.nto.clone(), order, id));
        }
        rd.sort_by(|a, b| (a.0, &a.1, a.2).cmp(&(b.0, &b.1, b.2)));

        let mut in_group = false;
        for i in 0..rd.len() {
            let same_as_next =
                i + 1 < rd.len() && rd[i].0 == rd[i + 1].0 && rd[i].1 == rd[i + 1].1;
            if same_as_next {
                if in_group {
                    self.report.write(" , ");
                } else {
                    in_group = true;
                }
                let src = self.src_of(rd[i].3);
                self.report.write(&src);
                self.mark_collision(rd[i].3);
            } else if in_group {
                let src = self.src_of(rd[i].3);
                let dst = self.dst_of(rd[i].3);
                let line = format!(" , {} -> {} : collision.\n", src, dst);
                self.report.write(&line);
                self.mark_collision(rd[i].3);
                in_group = false;
            }
        }
    }

    fn mark_collision(&mut self, id: RepId) {
        self.plan.rep_mut(id).skip = true;
        let ffrom = self.plan.rep(id).ffrom;
        self.snapshot.dirs.file_mut(ffrom).claim = Claim::Mistake;
        self.plan.live -= 1;
        self.badreps += 1;
    }

    /// Link nodes into then-chains: a node whose target displaces another
    /// node's source runs after it. A dependency that reaches back to the
    /// head of its own chain closes a cycle, which the executor breaks by
    /// aliasing. Skipped nodes are dropped from the top-level list here.
    pub(crate) fn find_order(&mut self) {
        let is_move = self.opts.op.is_move();
        let mut prev: Option<RepId> = None;
        let mut cur = self.plan.head;
        while let Some(p) = cur {
            let next = self.plan.rep(p).next;
            if self.plan.rep(p).skip {
                self.plan.set_next(prev, next);
                cur = next;
                continue;
            }
            let pred = self
                .plan
                .rep(p)
                .fdel
                .and_then(|fi| match self.snapshot.dirs.file(fi).claim {
                    Claim::Rep(r) => Some(r),
                    _ => None,
                });
            let pred = match pred {
                None => {
                    prev = Some(p);
                    cur = next;
                    continue;
                }
                Some(pr) => pr,
            };
            let first = self.plan.rep(pred).first;
            if first == p {
                // the displaced file is moved by this chain's own head:
                // a cycle, broken at execution time by a temporary alias
                self.plan.rep_mut(p).cycle = true;
                self.plan.rep_mut(pred).aliased = true;
                if is_move {
                    // the aliasing rename displaces the target already
                    self.plan.rep_mut(p).fdel = None;
                }
                prev = Some(p);
                cur = next;
            } else {
                if is_move {
                    self.plan.rep_mut(p).fdel = None;
                }
                let mut tail = pred;
                while let Some(t) = self.plan.rep(tail).thendo {
                    tail = t;
                }
                self.plan.rep_mut(tail).thendo = Some(p);
                let mut t = Some(p);
                while let Some(ti) = t {
                    self.plan.rep_mut(ti).first = first;
                    t = self.plan.rep(ti).thendo;
                }
                self.plan.rep_mut(p).next = None;
                self.plan.set_next(prev, next);
                cur = next;
            }
        }
    }

    /// Copies and links cannot run through chains: the source must still
    /// be in place when the operation happens. Reject every chain and
    /// cycle wholesale.
    pub(crate) fn forbid_chains(&mut self) {
        let mut prev: Option<RepId> = None;
        let mut cur = self.plan.head;
        while let Some(p) = cur {
            let next = self.plan.rep(p).next;
            let offending = {
                let rep = self.plan.rep(p);
                rep.cycle || rep.thendo.is_some()
            };
            if !offending {
                prev = Some(p);
                cur = next;
                continue;
            }
            let mut chain = Vec::new();
            let mut t = Some(p);
            while let Some(ti) = t {
                chain.push(ti);
                t = self.plan.rep(ti).thendo;
            }
            for &id in chain.iter().rev() {
                let src = self.src_of(id);
                self.report.write(&format!("{} -> ", src));
                self.badreps += 1;
                self.plan.live -= 1;
                let ffrom = self.plan.rep(id).ffrom;
                self.snapshot.dirs.file_mut(ffrom).claim = Claim::Mistake;
            }
            let dst = self.dst_of(p);
            self.report
                .write(&format!("{} : no chain copies allowed.\n", dst));
            self.plan.set_next(prev, next);
            cur = next;
        }
    }

    /// Walk every node that displaces a target and kill the ones the
    /// delete predicate refuses. A killed node's chain successor is
    /// re-hooked in its place; for moves it inherits the killed node's
    /// source as the file it now displaces.
    pub(crate) fn scan_deletes(&mut self, kind: DelScan) -> anyhow::Result<()> {
        let is_move = self.opts.op.is_move();
        let mut prev: Option<RepId> = None;
        let mut cur = self.plan.head;
        while let Some(mut p) = cur {
            let mut removed = false;
            while self.plan.rep(p).fdel.is_some() && self.kill_delete(&kind, p) {
                self.plan.live -= 1;
                let ffrom = self.plan.rep(p).ffrom;
                self.snapshot.dirs.file_mut(ffrom).claim = Claim::Mistake;
                if let Some(n) = self.plan.rep(p).thendo {
                    if is_move {
                        self.plan.rep_mut(n).fdel = Some(ffrom);
                    }
                    let pnext = self.plan.rep(p).next;
                    self.plan.rep_mut(n).next = pnext;
                    self.plan.set_next(prev, Some(n));
                    p = n;
                } else {
                    let pnext = self.plan.rep(p).next;
                    self.plan.set_next(prev, pnext);
                    cur = pnext;
                    removed = true;
                    break;
                }
            }
            if !removed {
                prev = Some(p);
                cur = self.plan.rep(p).next;
            }
        }
        Ok(())
    }

    fn kill_delete(&mut self, kind: &DelScan, p: RepId) -> bool {
        match kind {
            DelScan::Bad => self.bad_delete(p),
            DelScan::Ask => self.skip_delete(p),
        }
    }

    fn bad_delete(&mut self, p: RepId) -> bool {
        let op = self.opts.op;
        let (fdel, del_ok, hto) = {
            let rep = self.plan.rep(p);
            (rep.fdel.unwrap(), rep.del_ok, rep.hto)
        };
        let target = format!("{}{}", self.prefix(hto), self.fname(fdel));
        let (fto_claim, fto_is_dir, fto_no_delete) = {
            let f = self.snapshot.dirs.file(fdel);
            (f.claim, f.is_dir, f.no_delete)
        };

        let msg = if self.opts.delstyle == DelPolicy::None && !del_ok && op != OpKind::Append {
            format!(
                "old {} would have to be {}.",
                target,
                if op == OpKind::Overwrite {
                    "overwritten"
                } else {
                    "deleted"
                }
            )
        } else if fto_claim == Claim::Mistake {
            format!("old {} was to be done first.", target)
        } else if fto_is_dir {
            format!(
                "{}{} is a directory.",
                if op == OpKind::Append { "" } else { "old " },
                target
            )
        } else if fto_no_delete && !op.writes_target() {
            format!("old {} lacks delete permission.", target)
        } else if op.writes_target() && !self.target_writable(p, fdel) {
            format!("{} lacks write permission.", target)
        } else {
            return false;
        };

        let src = self.src_of(p);
        self.report
            .writeln(&format!("{} -> {} : {}", src, target, msg));
        self.badreps += 1;
        true
    }

    fn skip_delete(&mut self, p: RepId) -> bool {
        if self.plan.rep(p).del_ok {
            return false;
        }
        let fdel = self.plan.rep(p).fdel.unwrap();
        let src = self.src_of(p);
        let dst = self.dst_of(p);
        eprint!("{} -> {} : ", src, dst);
        if !self.target_writable(p, fdel) {
            eprint!("old {} lacks write permission. delete it", dst);
        } else {
            eprint!(
                "{} old {}",
                if self.opts.op == OpKind::Overwrite {
                    "overwrite"
                } else {
                    "delete"
                },
                dst
            );
        }
        !ask_yesno("? ", OnFail::Quit)
    }

    fn target_writable(&mut self, p: RepId, fdel: FileId) -> bool {
        let full = format!("{}{}", self.prefix(self.plan.rep(p).hto), self.fname(fdel));
        self.snapshot.dirs.file_writable(&full, fdel)
    }

    /// The bad-style gate: with errors on the books and live work left,
    /// decide whether to go on.
    pub(crate) fn policy_gate(&mut self) -> bool {
        if (self.paterr > 0 || self.badreps > 0) && self.plan.live > 0 {
            eprint!("Not everything specified can be done.");
            match self.opts.badstyle {
                BadPolicy::Abort => {
                    eprintln!(" Aborting.");
                    return false;
                }
                BadPolicy::Skip => eprintln!(" Proceeding with the rest."),
                BadPolicy::Ask => {
                    if !ask_yesno(" Proceed with the rest? ", OnFail::Quit) {
                        return false;
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BadPolicy, Encoding, Options};
    use crate::report::Report;
    use crate::sys::SysInfo;
    use std::fs::File;
    use tempfile::TempDir;

    fn engine(op: OpKind) -> Mmv {
        let opts = Options {
            op,
            verbose: false,
            no_execute: true,
            match_all: false,
            delstyle: DelPolicy::All,
            badstyle: BadPolicy::Skip,
            encoding: Encoding::Nul,
            debug: false,
        };
        let mut mmv = Mmv::new(opts, SysInfo::probe().unwrap());
        mmv.report = Report::to_writer(Box::new(std::io::sink()));
        mmv
    }

    fn touch(dir: &TempDir, name: &str) {
        File::create(dir.path().join(name)).unwrap();
    }

    fn p(dir: &TempDir, name: &str) -> String {
        format!("{}/{}", dir.path().display(), name)
    }

    #[test]
    fn test_collision_group_skips_all_members() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "x");
        touch(&tmp, "y");
        touch(&tmp, "w");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&p(&tmp, "x"), &p(&tmp, "z"), false).unwrap();
        mmv.add_pair(&p(&tmp, "y"), &p(&tmp, "z"), false).unwrap();
        mmv.add_pair(&p(&tmp, "w"), &p(&tmp, "ok"), false).unwrap();
        assert_eq!(3, mmv.plan.live);
        mmv.check_collisions();
        assert_eq!(1, mmv.plan.live);
        assert_eq!(2, mmv.badreps);
        let skipped: Vec<bool> = (0..3).map(|i| mmv.plan.rep(RepId(i)).skip).collect();
        assert_eq!(vec![true, true, false], skipped);
    }

    #[test]
    fn test_two_node_chain_orders_tail_first() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        touch(&tmp, "b");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&p(&tmp, "a"), &p(&tmp, "b"), false).unwrap();
        mmv.add_pair(&p(&tmp, "b"), &p(&tmp, "c"), false).unwrap();
        let a_to_b = RepId(0);
        let b_to_c = RepId(1);
        mmv.find_order();
        // one root: b->c, which must run before a->b
        assert_eq!(vec![b_to_c], mmv.plan.roots().collect::<Vec<_>>());
        assert_eq!(Some(a_to_b), mmv.plan.rep(b_to_c).thendo);
        assert!(!mmv.plan.rep(b_to_c).cycle);
        assert!(!mmv.plan.rep(a_to_b).aliased);
        // the displaced `b` is handled by the chain, not deleted
        assert_eq!(None, mmv.plan.rep(a_to_b).fdel);
    }

    #[test]
    fn test_swap_is_a_cycle() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        touch(&tmp, "b");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&p(&tmp, "a"), &p(&tmp, "b"), false).unwrap();
        mmv.add_pair(&p(&tmp, "b"), &p(&tmp, "a"), false).unwrap();
        mmv.find_order();
        let roots: Vec<RepId> = mmv.plan.roots().collect();
        assert_eq!(1, roots.len());
        let root = roots[0];
        assert!(mmv.plan.rep(root).cycle);
        let tail = mmv.plan.rep(root).thendo.unwrap();
        assert!(mmv.plan.rep(tail).aliased);
        assert_eq!(None, mmv.plan.rep(tail).thendo);
    }

    #[test]
    fn test_three_cycle_single_alias() {
        let tmp = TempDir::new().unwrap();
        for n in ["a", "b", "c"] {
            touch(&tmp, n);
        }
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&p(&tmp, "a"), &p(&tmp, "b"), false).unwrap();
        mmv.add_pair(&p(&tmp, "b"), &p(&tmp, "c"), false).unwrap();
        mmv.add_pair(&p(&tmp, "c"), &p(&tmp, "a"), false).unwrap();
        mmv.find_order();
        let roots: Vec<RepId> = mmv.plan.roots().collect();
        assert_eq!(1, roots.len());
        let mut chain = Vec::new();
        let mut t = Some(roots[0]);
        while let Some(id) = t {
            chain.push(id);
            t = mmv.plan.rep(id).thendo;
        }
        assert_eq!(3, chain.len());
        // exactly one cycle flag and one alias flag in the chain
        assert_eq!(1, chain.iter().filter(|&&id| mmv.plan.rep(id).cycle).count());
        assert_eq!(
            1,
            chain.iter().filter(|&&id| mmv.plan.rep(id).aliased).count()
        );
        assert!(mmv.plan.rep(chain[0]).cycle);
        assert!(mmv.plan.rep(*chain.last().unwrap()).aliased);
    }

    #[test]
    fn test_chains_rejected_for_copy() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        touch(&tmp, "b");
        let mut mmv = engine(OpKind::Copy);
        mmv.opts.delstyle = DelPolicy::All;
        mmv.add_pair(&p(&tmp, "a"), &p(&tmp, "b"), false).unwrap();
        mmv.add_pair(&p(&tmp, "b"), &p(&tmp, "c"), false).unwrap();
        mmv.find_order();
        mmv.forbid_chains();
        assert_eq!(0, mmv.plan.live);
        assert!(mmv.plan.roots().next().is_none());
        assert_eq!(2, mmv.badreps);
    }

    #[test]
    fn test_no_delete_policy_kills_displacing_moves() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "src");
        touch(&tmp, "dst");
        let mut mmv = engine(OpKind::Xmove);
        mmv.opts.delstyle = DelPolicy::None;
        mmv.add_pair(&p(&tmp, "src"), &p(&tmp, "dst"), false).unwrap();
        mmv.find_order();
        mmv.scan_deletes(DelScan::Bad).unwrap();
        assert_eq!(0, mmv.plan.live);
        assert_eq!(1, mmv.badreps);
        assert!(mmv.plan.roots().next().is_none());
    }

    #[test]
    fn test_delete_ok_flag_survives_no_delete_policy() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "src");
        touch(&tmp, "dst");
        let mut mmv = engine(OpKind::Xmove);
        mmv.opts.delstyle = DelPolicy::None;
        mmv.add_pair(&p(&tmp, "src"), &p(&tmp, "dst"), true).unwrap();
        mmv.find_order();
        mmv.scan_deletes(DelScan::Bad).unwrap();
        assert_eq!(1, mmv.plan.live);
        assert_eq!(0, mmv.badreps);
    }

    #[test]
    fn test_killing_a_chain_head_cascades_down_the_chain() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        touch(&tmp, "b");
        touch(&tmp, "c");
        let mut mmv = engine(OpKind::Xmove);
        mmv.opts.delstyle = DelPolicy::None;
        // b -> c displaces c and dies under no-delete; a -> b depended on
        // b being moved away first, so it dies with it
        mmv.add_pair(&p(&tmp, "a"), &p(&tmp, "b"), true).unwrap();
        mmv.add_pair(&p(&tmp, "b"), &p(&tmp, "c"), false).unwrap();
        let a_to_b = RepId(0);
        let b_to_c = RepId(1);
        mmv.find_order();
        assert_eq!(Some(a_to_b), mmv.plan.rep(b_to_c).thendo);
        mmv.scan_deletes(DelScan::Bad).unwrap();
        assert_eq!(0, mmv.plan.live);
        assert_eq!(2, mmv.badreps);
        assert!(mmv.plan.roots().next().is_none());
        // the successor inherited the killed head's source before it was
        // itself rejected
        assert_eq!("b", mmv.fname(mmv.plan.rep(a_to_b).fdel.unwrap()));
    }
}
