/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::scan::{FileId, HandleId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepId(pub usize);

/// One intended operation: move/copy/link `hfrom`+`ffrom` to `hto`+`nto`,
/// displacing `fdel` if set. Created by the plan builder, rewired by the
/// analyzer, consumed by the executor.
#[derive(Debug)]
pub struct Rep {
    pub hfrom: HandleId,
    pub ffrom: FileId,
    pub hto: HandleId,
    /// Basename portion of the destination.
    pub nto: String,
    /// Existing target being displaced, if any.
    pub fdel: Option<FileId>,

    pub cross_device: bool,
    pub skip: bool,
    pub del_ok: bool,
    /// Source gets read back under its temporary alias name.
    pub aliased: bool,
    /// Closing node of a dependency cycle; its target is aliased first.
    pub cycle: bool,
    /// Symlink whose source and target live in the same directory; the
    /// link content is then the bare basename.
    pub one_dir_link: bool,

    /// Root of the chain this node belongs to.
    pub first: RepId,
    /// Next operation of the same chain.
    pub thendo: Option<RepId>,
    /// Top-level successor in insertion order.
    pub next: Option<RepId>,
}

/// The whole plan: an arena of nodes threaded into a top-level list of
/// chain roots. `live` counts nodes that are still meant to execute.
pub struct Plan {
    reps: Vec<Rep>,
    pub head: Option<RepId>,
    tail: Option<RepId>,
    pub live: usize,
}

impl Plan {
    pub fn new() -> Self {
        Plan {
            reps: Vec::new(),
            head: None,
            tail: None,
            live: 0,
        }
    }

    pub fn rep(&self, id: RepId) -> &Rep {
        &self.reps[id.0]
    }

    pub fn rep_mut(&mut self, id: RepId) -> &mut Rep {
        &mut self.reps[id.0]
    }

    /// Append a node to the top-level list.
    pub fn push(&mut self, mut rep: Rep) -> RepId {
        let id = RepId(self.reps.len());
        rep.first = id;
        rep.thendo = None;
        rep.next = None;
        self.reps.push(rep);
        match self.tail {
            Some(t) => self.reps[t.0].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.live += 1;
        id
    }

    /// Point `prev`'s top-level successor (or the list head) at `next`.
    pub fn set_next(&mut self, prev: Option<RepId>, next: Option<RepId>) {
        match prev {
            Some(p) => self.reps[p.0].next = next,
            None => self.head = next,
        }
    }

    /// Iterate the top-level list (chain roots in insertion order).
    pub fn roots(&self) -> RootIter<'_> {
        RootIter {
            plan: self,
            cur: self.head,
        }
    }
}

impl Default for Plan {
    fn default() -> Self {
        Plan::new()
    }
}

pub struct RootIter<'a> {
    plan: &'a Plan,
    cur: Option<RepId>,
}

impl Iterator for RootIter<'_> {
    type Item = RepId;

    fn next(&mut self) -> Option<RepId> {
        let id = self.cur?;
        self.cur = self.plan.rep(id).next;
        Some(id)
    }
}
