/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod cache;
pub mod handle;

pub use cache::{Claim, DirCache, DirId, FileId, FileRecord};
pub use handle::{DirDenied, Handle, HandleCache, HandleId, Side};

use crate::sys::SysInfo;

/// The interned filesystem view of one run: directory listings shared by
/// identity plus the prefix-string handles that reach them.
pub struct Snapshot {
    pub dirs: DirCache,
    pub handles: HandleCache,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot {
            dirs: DirCache::new(),
            handles: HandleCache::new(),
        }
    }

    pub fn lookup_handle(
        &mut self,
        sys: &SysInfo,
        prefix: &str,
        side: Side,
    ) -> anyhow::Result<HandleId> {
        self.handles.lookup(&mut self.dirs, sys, prefix, side)
    }

    pub fn handle(&self, id: HandleId) -> &Handle {
        self.handles.handle(id)
    }

    /// The listing a handle resolved to; panics if resolution failed (the
    /// caller must have checked).
    pub fn listing_of(&self, id: HandleId) -> DirId {
        self.handles
            .handle(id)
            .state
            .expect("handle was not resolved to a directory")
    }

    /// Writability of the directory behind a resolved handle, cached on
    /// the listing.
    pub fn handle_writable(&mut self, id: HandleId, uid: u32) -> bool {
        let (dir, prefix) = {
            let h = self.handles.handle(id);
            match h.state {
                Ok(d) => (d, h.prefix.clone()),
                Err(_) => return false,
            }
        };
        self.dirs.dir_writable(dir, physical(&prefix), uid)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot::new()
    }
}

/// The path to hand to the kernel for a prefix: the current directory for
/// an empty prefix, the root for `/`, otherwise the prefix without its
/// trailing slash.
pub fn physical(prefix: &str) -> &str {
    if prefix.is_empty() {
        "."
    } else if prefix == "/" {
        "/"
    } else {
        prefix.strip_suffix('/').unwrap_or(prefix)
    }
}
