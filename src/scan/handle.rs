/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::MetadataExt;

use nix::unistd::AccessFlags;

use super::cache::{DirCache, DirId};
use super::physical;
use crate::sys::SysInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandleId(pub usize);

/// Why a prefix could not be resolved to a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DirDenied {
    /// Does not exist or is not a directory.
    Missing,
    /// Exists but refuses read or search.
    NoReadSearch,
}

/// An interned path prefix (ending in `/`, or empty for the current
/// directory) bound to its listing or to the error that resolution hit.
#[derive(Debug)]
pub struct Handle {
    pub prefix: String,
    pub state: Result<DirId, DirDenied>,
}

/// Which side of a pair a lookup serves; each side keeps its own last-used
/// memo since from- and to-prefixes alternate on the hot path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    From = 0,
    To = 1,
}

pub struct HandleCache {
    handles: Vec<Handle>,
    by_name: HashMap<String, HandleId>,
    last: [Option<HandleId>; 2],
}

impl HandleCache {
    pub fn new() -> Self {
        HandleCache {
            handles: Vec::new(),
            by_name: HashMap::new(),
            last: [None, None],
        }
    }

    pub fn handle(&self, id: HandleId) -> &Handle {
        &self.handles[id.0]
    }

    /// Resolve `prefix` to a handle, scanning the directory on a cache
    /// miss. Resolution failures are cached too; they only surface in plan
    /// messages when a pair actually needs the directory.
    pub fn lookup(
        &mut self,
        dirs: &mut DirCache,
        sys: &SysInfo,
        prefix: &str,
        side: Side,
    ) -> anyhow::Result<HandleId> {
        if let Some(id) = self.last[side as usize] {
            if self.handles[id.0].prefix == prefix {
                return Ok(id);
            }
        }
        if let Some(&id) = self.by_name.get(prefix) {
            self.last[side as usize] = Some(id);
            return Ok(id);
        }

        let state = self.resolve(dirs, sys, prefix)?;
        let id = HandleId(self.handles.len());
        self.handles.push(Handle {
            prefix: prefix.to_string(),
            state,
        });
        self.by_name.insert(prefix.to_string(), id);
        self.last[side as usize] = Some(id);
        Ok(id)
    }

    fn resolve(
        &mut self,
        dirs: &mut DirCache,
        sys: &SysInfo,
        prefix: &str,
    ) -> anyhow::Result<Result<DirId, DirDenied>> {
        let phys = physical(prefix);
        let meta = match fs::metadata(phys) {
            Ok(m) if m.is_dir() => m,
            _ => return Ok(Err(DirDenied::Missing)),
        };
        if nix::unistd::access(phys, AccessFlags::R_OK | AccessFlags::X_OK).is_err() {
            return Ok(Err(DirDenied::NoReadSearch));
        }
        let sticky = meta.mode() & 0o1000 != 0 && sys.uid != 0 && sys.uid != meta.uid();
        let (dev, ino) = (meta.dev(), meta.ino());
        let dir = match dirs.lookup_ident(dev, ino) {
            Some(d) => d,
            None => dirs.scan_dir(phys, dev, ino, sticky)?,
        };
        Ok(Ok(dir))
    }
}

impl Default for HandleCache {
    fn default() -> Self {
        HandleCache::new()
    }
}
