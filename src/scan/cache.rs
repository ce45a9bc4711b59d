/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::os::unix::fs::MetadataExt;

use anyhow::{bail, Context};
use nix::unistd::AccessFlags;

use crate::plan::rep::RepId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DirId(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileId(pub usize);

/// Who consumes a file record as the source of a planned operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Claim {
    Unclaimed,
    /// The record matched but its replacement was rejected.
    Mistake,
    Rep(RepId),
}

/// One directory entry. Stat information is filled lazily on first use.
#[derive(Debug)]
pub struct FileRecord {
    pub name: String,
    pub claim: Claim,
    pub in_sticky: bool,
    pub statted: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
    /// lstat succeeded but stat did not (dangling symlink).
    pub link_err: bool,
    /// Sticky directory and not ours; rename/unlink will be refused.
    pub no_delete: bool,
    pub mode: u32,
    pub write_ok: Option<bool>,
}

impl FileRecord {
    fn new(name: String, in_sticky: bool) -> Self {
        FileRecord {
            name,
            claim: Claim::Unclaimed,
            in_sticky,
            statted: false,
            is_dir: false,
            is_symlink: false,
            link_err: false,
            no_delete: false,
            mode: 0,
            write_ok: None,
        }
    }
}

/// A scanned directory, shared by every path prefix that resolves to the
/// same `(device, inode)`. Entries are sorted byte-wise by name, which the
/// binary searches below rely on.
#[derive(Debug)]
pub struct DirListing {
    pub dev: u64,
    pub ino: u64,
    pub files: Vec<FileId>,
    pub write_ok: Option<bool>,
}

pub struct DirCache {
    dirs: Vec<DirListing>,
    files: Vec<FileRecord>,
    by_ident: HashMap<(u64, u64), DirId>,
}

impl DirCache {
    pub fn new() -> Self {
        DirCache {
            dirs: Vec::new(),
            files: Vec::new(),
            by_ident: HashMap::new(),
        }
    }

    pub fn dir(&self, id: DirId) -> &DirListing {
        &self.dirs[id.0]
    }

    pub fn dir_mut(&mut self, id: DirId) -> &mut DirListing {
        &mut self.dirs[id.0]
    }

    pub fn file(&self, id: FileId) -> &FileRecord {
        &self.files[id.0]
    }

    pub fn file_mut(&mut self, id: FileId) -> &mut FileRecord {
        &mut self.files[id.0]
    }

    pub fn lookup_ident(&self, dev: u64, ino: u64) -> Option<DirId> {
        self.by_ident.get(&(dev, ino)).copied()
    }

    /// Enumerate `physical` and intern the listing under `(dev, ino)`.
    /// `sticky` marks every record as living in a sticky directory that the
    /// caller does not own.
    pub fn scan_dir(
        &mut self,
        physical: &str,
        dev: u64,
        ino: u64,
        sticky: bool,
    ) -> anyhow::Result<DirId> {
        let entries = fs::read_dir(physical)
            .with_context(|| format!("Strange, can't scan {}.", physical))?;
        let mut ids: Vec<FileId> = Vec::new();
        for name in [".", ".."] {
            ids.push(self.push_file(FileRecord::new(name.to_string(), sticky)));
        }
        for entry in entries {
            let entry = entry.with_context(|| format!("Strange, can't scan {}.", physical))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            ids.push(self.push_file(FileRecord::new(name, sticky)));
        }
        ids.sort_by(|a, b| self.files[a.0].name.as_bytes().cmp(self.files[b.0].name.as_bytes()));
        let id = DirId(self.dirs.len());
        self.dirs.push(DirListing {
            dev,
            ino,
            files: ids,
            write_ok: None,
        });
        self.by_ident.insert((dev, ino), id);
        Ok(id)
    }

    fn push_file(&mut self, rec: FileRecord) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(rec);
        id
    }

    /// Binary-search a listing for an exact name.
    pub fn search(&self, dir: DirId, name: &str) -> Option<FileId> {
        let fils = &self.dirs[dir.0].files;
        fils.binary_search_by(|id| self.files[id.0].name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|k| fils[k])
    }

    /// Index of the first entry whose name starts with `prefix`, or the
    /// listing length when no entry does.
    pub fn first_with_prefix(&self, dir: DirId, prefix: &[u8]) -> usize {
        let fils = &self.dirs[dir.0].files;
        let nfils = fils.len();
        if nfils == 0 || prefix.is_empty() {
            return 0;
        }
        let mut first = 0usize;
        let mut last = nfils - 1;
        loop {
            let k = (first + last) / 2;
            let name = self.files[fils[k].0].name.as_bytes();
            let res = cmp_prefix(prefix, name);
            if first == last {
                return if res == Ordering::Equal { k } else { nfils };
            }
            if res == Ordering::Greater {
                first = k + 1;
            } else {
                last = k;
            }
        }
    }

    /// Does the entry at index `k` of `dir` carry `prefix`?
    pub fn has_prefix(&self, dir: DirId, k: usize, prefix: &[u8]) -> bool {
        let fils = &self.dirs[dir.0].files;
        match fils.get(k) {
            Some(id) => cmp_prefix(prefix, self.files[id.0].name.as_bytes()) == Ordering::Equal,
            None => false,
        }
    }

    /// Fill the stat-derived fields of a record from its full path.
    pub fn stat_file(&mut self, full: &str, id: FileId, uid: u32) -> anyhow::Result<()> {
        if self.files[id.0].statted {
            return Ok(());
        }
        let lstat = match fs::symlink_metadata(full) {
            Ok(m) => m,
            Err(_) => bail!("Strange, couldn't stat {}.", full),
        };
        let rec = &mut self.files[id.0];
        rec.statted = true;
        rec.is_symlink = lstat.file_type().is_symlink();
        match fs::metadata(full) {
            Ok(m) => {
                rec.is_dir = m.is_dir();
                rec.mode = m.mode();
                if rec.in_sticky && uid != 0 && m.uid() != uid {
                    rec.no_delete = true;
                }
            }
            Err(_) => {
                // dangling symlink; keep the link's own identity
                rec.link_err = true;
                rec.mode = lstat.mode();
                if rec.in_sticky && uid != 0 && lstat.uid() != uid {
                    rec.no_delete = true;
                }
            }
        }
        Ok(())
    }

    /// access(W_OK) on a file, cached on its record.
    pub fn file_writable(&mut self, full: &str, id: FileId) -> bool {
        if let Some(w) = self.files[id.0].write_ok {
            return w;
        }
        let w = nix::unistd::access(full, AccessFlags::W_OK).is_ok();
        self.files[id.0].write_ok = Some(w);
        w
    }

    /// access(W_OK) on a directory, cached on the listing so every handle
    /// resolving here shares the answer. Root can always write.
    pub fn dir_writable(&mut self, id: DirId, physical: &str, uid: u32) -> bool {
        if uid == 0 {
            return true;
        }
        if let Some(w) = self.dirs[id.0].write_ok {
            return w;
        }
        let w = nix::unistd::access(physical, AccessFlags::W_OK).is_ok();
        self.dirs[id.0].write_ok = Some(w);
        w
    }
}

impl Default for DirCache {
    fn default() -> Self {
        DirCache::new()
    }
}

/// strncmp-style comparison of `prefix` against the head of `name`.
fn cmp_prefix(prefix: &[u8], name: &[u8]) -> Ordering {
    for (i, &pb) in prefix.iter().enumerate() {
        match name.get(i) {
            None => return Ordering::Greater,
            Some(&nb) => match pb.cmp(&nb) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
    Ordering::Equal
}
