/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Stage descent and plan construction: walk the directory tree along the
//! compiled `from` pattern, glob-match candidates per stage, synthesize
//! target names and admit valid replacements into the plan.

use nix::unistd::AccessFlags;

use crate::engine::Mmv;
use crate::options::OpKind;
use crate::pattern::glob::match_glob;
use crate::pattern::{FromPattern, BACKREF, DESCEND, ESC};
use crate::plan::rep::{Rep, RepId};
use crate::scan::{Claim, DirDenied, FileId, HandleId, Side};
use crate::PATH_MAX;

#[derive(Clone, Copy, PartialEq, Eq)]
enum TryMatch {
    /// Already claimed, or excluded by the dot-file policy.
    Skip,
    /// `.` or `..` matched literally; no glob needed.
    Exact,
    /// Run the glob matcher.
    Glob,
}

impl Mmv {
    /// Recursively walk one stage of the pattern. `lastend` is the offset
    /// of the first unconsumed pattern byte, `path_len` the valid length of
    /// the path buffer, `cap_base` the first capture slot of this stage.
    /// `anylev` carries the path offset where a `;` descent began.
    /// Returns true when nothing matched anywhere below this point.
    pub(crate) fn descend(
        &mut self,
        pat: &FromPattern,
        caps: &mut Vec<String>,
        lastend: usize,
        path_len: usize,
        cap_base: usize,
        stage: usize,
        anylev: Option<usize>,
    ) -> anyhow::Result<bool> {
        let mut lastend = lastend;
        let mut path_len = path_len;
        let nstages = pat.stages.len();
        let laststage = stage + 1 == nstages;
        let wantdirs = !laststage
            || matches!(self.opts.op, OpKind::Dirmove | OpKind::Symlink)
            || pat.stages[nstages - 1].wilds == 0;
        let st = pat.stages[stage];

        self.path.truncate(path_len);
        if anylev.is_none() {
            let prelen = st.start - lastend;
            if path_len + prelen >= PATH_MAX {
                let msg = format!("search path after '{}' too long.", self.path);
                self.pair_msg(&msg);
                self.paterr += 1;
                return Ok(true);
            }
            self.path.push_str(&pat.text[lastend..st.start]);
            path_len += prelen;
            lastend = st.start;
        }

        let prefix = self.path[..path_len].to_string();
        let hid = self.snapshot.lookup_handle(&self.sys, &prefix, Side::From)?;
        let dir = match self.snapshot.handle(hid).state {
            Err(err) => {
                if stage == 0 || err == DirDenied::NoReadSearch {
                    let what = if stage == 0 {
                        "does not exist"
                    } else {
                        "does not allow reads/searches"
                    };
                    let msg = format!("directory '{}' {}.", prefix, what);
                    self.pair_msg(&msg);
                    self.paterr += 1;
                }
                return Ok(stage != 0);
            }
            Ok(d) => d,
        };

        let literal = self.opts.encoding.is_literal();
        let mut anylev = anylev;
        if !literal && pat.text.as_bytes().get(lastend) == Some(&DESCEND) {
            anylev = Some(path_len);
            caps[cap_base] = String::new();
            lastend += 1;
        }

        let mut writable_ok = true;
        if self.opts.op.is_move() && !self.snapshot.handle_writable(hid, self.sys.uid) {
            let msg = format!("directory {} does not allow writes.", prefix);
            self.pair_msg(&msg);
            self.paterr += 1;
            writable_ok = false;
        }

        let mut ret = true;
        if writable_ok {
            let bytes = pat.text.as_bytes();
            let litend = if literal {
                st.end
            } else {
                let first_esc = bytes[lastend..st.end]
                    .iter()
                    .position(|&b| b == ESC)
                    .map(|o| lastend + o)
                    .unwrap_or(st.end);
                first_esc.min(st.first_wild.max(lastend))
            };
            let litlen = litend - lastend;
            let prefix_bytes = bytes[lastend..litend].to_vec();
            let cap_off = usize::from(anylev.is_some());

            let nfils = self.snapshot.dirs.dir(dir).files.len();
            let mut i = self.snapshot.dirs.first_with_prefix(dir, &prefix_bytes);
            while i < nfils {
                let fid = self.snapshot.dirs.dir(dir).files[i];
                let tm = self.try_match(fid, pat, lastend);
                let matched = match tm {
                    TryMatch::Skip => false,
                    TryMatch::Exact => true,
                    TryMatch::Glob => {
                        if literal {
                            self.snapshot.dirs.file(fid).name.len() == litlen
                        } else {
                            let name = self.fname(fid);
                            match_glob(
                                &bytes[litend..],
                                &name.as_bytes()[litlen..],
                                &mut caps[cap_base + cap_off..],
                            )
                        }
                    }
                };
                if matched {
                    if let Some(k) = self.keep_match(fid, path_len, false, wantdirs, laststage)? {
                        if !laststage {
                            ret &= self.descend(
                                pat,
                                caps,
                                st.end,
                                path_len + k,
                                cap_base + st.wilds,
                                stage + 1,
                                None,
                            )?;
                        } else {
                            ret = false;
                            self.make_rep(&caps[..], literal);
                            self.admit(hid, fid)?;
                        }
                    }
                }
                i += 1;
                if i >= nfils || !self.snapshot.dirs.has_prefix(dir, i, &prefix_bytes) {
                    break;
                }
            }
        }

        if let Some(start) = anylev {
            let nfils = self.snapshot.dirs.dir(dir).files.len();
            for idx in 0..nfils {
                let fid = self.snapshot.dirs.dir(dir).files[idx];
                if self.snapshot.dirs.file(fid).name.starts_with('.') {
                    continue;
                }
                if let Some(k) = self.keep_match(fid, path_len, true, true, false)? {
                    caps[cap_base] = self.path[start..path_len + k].to_string();
                    ret &= self.descend(
                        pat,
                        caps,
                        lastend,
                        path_len + k,
                        cap_base,
                        stage,
                        Some(start),
                    )?;
                }
            }
        }

        Ok(ret)
    }

    /// Pre-glob screening: skip claimed records, apply the dot-file
    /// policy, and special-case `.`/`..`, which only a literal `.`/`..`
    /// remainder may name.
    fn try_match(&self, fid: FileId, pat: &FromPattern, lastend: usize) -> TryMatch {
        let f = self.snapshot.dirs.file(fid);
        if f.claim != Claim::Unclaimed {
            return TryMatch::Skip;
        }
        let name = f.name.as_bytes();
        if name.first() == Some(&b'.') {
            if name == b"." || name == b".." {
                return if &pat.text.as_bytes()[lastend..] == name {
                    TryMatch::Exact
                } else {
                    TryMatch::Skip
                };
            }
            if !self.opts.match_all && pat.text.as_bytes().get(lastend) != Some(&b'.') {
                return TryMatch::Skip;
            }
        }
        TryMatch::Glob
    }

    /// Append the candidate's name to the path buffer, stat it lazily,
    /// and decide whether its kind is wanted here. Returns the number of
    /// path bytes appended.
    fn keep_match(
        &mut self,
        fid: FileId,
        path_len: usize,
        needslash: bool,
        dirs: bool,
        fils: bool,
    ) -> anyhow::Result<Option<usize>> {
        let name = self.fname(fid);
        let k = name.len();
        if path_len + k + usize::from(needslash) >= PATH_MAX {
            self.path.truncate(path_len);
            let msg = format!("search path {}{} too long.", self.path, name);
            self.pair_msg(&msg);
            self.paterr += 1;
            return Ok(None);
        }
        self.path.truncate(path_len);
        self.path.push_str(&name);
        self.snapshot.dirs.stat_file(&self.path, fid, self.sys.uid)?;
        let is_dir = self.snapshot.dirs.file(fid).is_dir;
        if is_dir && !dirs || !is_dir && !fils {
            return Ok(None);
        }
        if needslash {
            self.path.push('/');
            return Ok(Some(k + 1));
        }
        Ok(Some(k))
    }

    /// Stream the `to` pattern into the full-target buffer, substituting
    /// back-references. Flags empty or over-long results instead of
    /// producing them.
    pub(crate) fn make_rep(&mut self, caps: &[String], literal: bool) {
        self.rep_bad = false;
        let to = self.to.clone();
        let b = to.as_bytes();
        let mut out: Vec<u8> = Vec::new();

        if literal {
            if b.len() >= PATH_MAX {
                return self.too_long_rep();
            }
            out.extend_from_slice(b);
        } else {
            let mut i = 0usize;
            while i < b.len() {
                if b[i] == BACKREF {
                    i += 1;
                    let mut cnv = b'=';
                    if matches!(b.get(i), Some(&b'l') | Some(&b'u')) {
                        cnv = b[i];
                        i += 1;
                    }
                    let mut n = 0usize;
                    while let Some(d) = b.get(i).copied().filter(u8::is_ascii_digit) {
                        n = n * 10 + (d - b'0') as usize;
                        i += 1;
                    }
                    let piece: &str = if n == 0 { &self.from } else { &caps[n - 1] };
                    if out.len() + piece.len() >= PATH_MAX {
                        return self.too_long_rep();
                    }
                    match cnv {
                        b'l' => out.extend(piece.bytes().map(|x| x.to_ascii_lowercase())),
                        b'u' => out.extend(piece.bytes().map(|x| x.to_ascii_uppercase())),
                        _ => out.extend_from_slice(piece.as_bytes()),
                    }
                    continue;
                }
                let pat_pos = i;
                let mut c = b[i];
                if c == ESC {
                    i += 1;
                    c = b[i];
                }
                if out.len() >= PATH_MAX {
                    return self.too_long_rep();
                }
                if c == b'/' {
                    // a slash out of nowhere means an empty expansion
                    // produced an empty path component
                    let bogus = if out.is_empty() {
                        pat_pos != 0
                    } else {
                        *out.last().unwrap() == b'/' && b[pat_pos - 1] != b'/'
                    };
                    if bogus {
                        self.rep_bad = true;
                        if out.len() + b"(empty)".len() >= PATH_MAX {
                            return self.too_long_rep();
                        }
                        out.extend_from_slice(b"(empty)");
                    }
                }
                out.push(c);
                i += 1;
            }
        }

        if out.is_empty() {
            out.extend_from_slice(b"(empty)");
            self.rep_bad = true;
        }
        self.fullrep = String::from_utf8_lossy(&out).into_owned();
    }

    fn too_long_rep(&mut self) {
        self.fullrep = "(too long)".to_string();
        self.rep_bad = true;
    }

    /// Resolve where the synthesized target lands: its directory handle,
    /// the basename, and any existing file it displaces. Returns None when
    /// composing the full path overruns the bound.
    fn resolve_target(
        &mut self,
        hfrom: HandleId,
        fname: &str,
    ) -> anyhow::Result<Option<(HandleId, String, Option<FileId>)>> {
        if self.opts.op == OpKind::Dirmove {
            // the target is a sibling: same handle, bare basename; a slash
            // smuggled in by an expansion cannot name one
            let prefix = self.prefix(hfrom);
            let base = std::mem::take(&mut self.fullrep);
            if base.contains('/') {
                self.fullrep = base;
                return Ok(None);
            }
            self.fullrep = format!("{}{}", prefix, base);
            let dir = self.snapshot.listing_of(hfrom);
            let fdel = self.snapshot.dirs.search(dir, &base);
            let nto = match fdel {
                Some(fd) => {
                    let full = self.fullrep.clone();
                    self.snapshot.dirs.stat_file(&full, fd, self.sys.uid)?;
                    self.fname(fd)
                }
                None => base,
            };
            return Ok(Some((hfrom, nto, fdel)));
        }

        let full = self.fullrep.clone();
        let cut = full.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (tpath, tail) = full.split_at(cut);
        let mut base = tail.to_string();
        let mut hto = self.snapshot.lookup_handle(&self.sys, tpath, Side::To)?;
        let mut fdel: Option<FileId> = None;

        if let Ok(dir) = self.snapshot.handle(hto).state {
            if !base.is_empty() {
                if let Some(fd) = self.snapshot.dirs.search(dir, &base) {
                    self.snapshot.dirs.stat_file(&full, fd, self.sys.uid)?;
                    if self.snapshot.dirs.file(fd).is_dir {
                        // the target names an existing directory; the
                        // source keeps its basename one level deeper
                        let deeper = format!("{}{}/", tpath, base);
                        hto = self.snapshot.lookup_handle(&self.sys, &deeper, Side::To)?;
                        self.fullrep = deeper;
                        base.clear();
                    } else {
                        fdel = Some(fd);
                    }
                }
            }
        }

        if base.is_empty() {
            if self.fullrep.len() + fname.len() >= PATH_MAX {
                self.fullrep = "(too long)".to_string();
                return Ok(None);
            }
            self.fullrep.push_str(fname);
            if let Ok(dir) = self.snapshot.handle(hto).state {
                fdel = self.snapshot.dirs.search(dir, fname);
                if let Some(fd) = fdel {
                    let full = self.fullrep.clone();
                    self.snapshot.dirs.stat_file(&full, fd, self.sys.uid)?;
                }
            }
            return Ok(Some((hto, fname.to_string(), fdel)));
        }

        let nto = match fdel {
            Some(fd) => self.fname(fd),
            None => base,
        };
        Ok(Some((hto, nto, fdel)))
    }

    /// Validate one matched candidate against the admission rules and
    /// either append a plan node or mark the source as a mistake.
    pub(crate) fn admit(&mut self, hfrom: HandleId, ffrom: FileId) -> anyhow::Result<()> {
        let op = self.opts.op;
        let fname = self.fname(ffrom);
        let (src_is_dir, src_is_symlink) = {
            let f = self.snapshot.dirs.file(ffrom);
            (f.is_dir, f.is_symlink)
        };

        if src_is_dir && !matches!(op, OpKind::Dirmove | OpKind::Symlink) {
            return self.reject(ffrom, "source file is a directory.");
        }
        if (op.is_copy() || op == OpKind::Append)
            && nix::unistd::access(self.path.as_str(), AccessFlags::R_OK).is_err()
        {
            return self.reject(ffrom, "no read permission for source file.");
        }
        if (fname == "." || fname == "..") && op != OpKind::Symlink {
            return self.reject(ffrom, ". and .. can't be renamed.");
        }

        let resolved = if self.rep_bad {
            None
        } else {
            self.resolve_target(hfrom, &fname)?
        };
        let (hto, nto, fdel) = match resolved {
            Some(t) if !bad_name(&t.1, self.sys.name_max) => t,
            _ => return self.reject(ffrom, "bad new name."),
        };

        if let Err(err) = self.snapshot.handle(hto).state {
            let msg = match err {
                DirDenied::NoReadSearch => "no read or search permission for target directory.",
                DirDenied::Missing => "target directory does not exist.",
            };
            return self.reject(ffrom, msg);
        }
        if !self.snapshot.handle_writable(hto, self.sys.uid) {
            return self.reject(ffrom, "no write permission for target directory.");
        }

        let from_dev = self.snapshot.dirs.dir(self.snapshot.listing_of(hfrom)).dev;
        let to_dev = self.snapshot.dirs.dir(self.snapshot.listing_of(hto)).dev;
        let cross_device = from_dev != to_dev;
        if cross_device && matches!(op, OpKind::Move | OpKind::Hardlink) {
            return self.reject(ffrom, "cross-device move.");
        }
        if cross_device
            && op.is_move()
            && !src_is_symlink
            && nix::unistd::access(self.path.as_str(), AccessFlags::R_OK).is_err()
        {
            return self.reject(ffrom, "no read permission for source file.");
        }

        let one_dir_link = op == OpKind::Symlink && hto == hfrom;
        let id = self.plan.push(Rep {
            hfrom,
            ffrom,
            hto,
            nto,
            fdel,
            cross_device,
            skip: false,
            del_ok: self.pair_del_ok,
            aliased: false,
            cycle: false,
            one_dir_link,
            first: RepId(0),
            thendo: None,
            next: None,
        });
        self.snapshot.dirs.file_mut(ffrom).claim = Claim::Rep(id);
        Ok(())
    }

    fn reject(&mut self, ffrom: FileId, msg: &str) -> anyhow::Result<()> {
        self.path_msg(msg);
        self.badreps += 1;
        self.snapshot.dirs.file_mut(ffrom).claim = Claim::Mistake;
        Ok(())
    }
}

fn bad_name(s: &str, name_max: usize) -> bool {
    s == "." || s == ".." || s.len() > name_max
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BadPolicy, DelPolicy, Encoding, Options};
    use crate::sys::SysInfo;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn options(op: OpKind) -> Options {
        Options {
            op,
            verbose: false,
            no_execute: true,
            match_all: false,
            delstyle: DelPolicy::None,
            badstyle: BadPolicy::Skip,
            encoding: Encoding::Pattern,
            debug: false,
        }
    }

    fn engine(op: OpKind) -> Mmv {
        let mut mmv = Mmv::new(options(op), SysInfo::probe().unwrap());
        mmv.report = crate::report::Report::to_writer(Box::new(std::io::sink()));
        mmv
    }

    fn touch(dir: &TempDir, name: &str) {
        File::create(dir.path().join(name)).unwrap();
    }

    fn pat(dir: &TempDir, tail: &str) -> String {
        format!("{}/{}", dir.path().display(), tail)
    }

    #[test]
    fn test_simple_pattern_builds_plan() {
        let tmp = TempDir::new().unwrap();
        for name in ["one.txt", "two.txt", "note.md"] {
            touch(&tmp, name);
        }
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "*.txt"), &pat(&tmp, "#1.bak"), false)
            .unwrap();
        assert_eq!(0, mmv.paterr);
        assert_eq!(0, mmv.badreps);
        assert_eq!(2, mmv.plan.live);
        let targets: Vec<String> = mmv.plan.roots().map(|id| mmv.plan.rep(id).nto.clone()).collect();
        assert!(targets.contains(&"one.bak".to_string()));
        assert!(targets.contains(&"two.bak".to_string()));
    }

    #[test]
    fn test_no_match_counts_pattern_error() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "only.md");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "*.txt"), &pat(&tmp, "#1.bak"), false)
            .unwrap();
        assert_eq!(1, mmv.paterr);
        assert_eq!(0, mmv.plan.live);
    }

    #[test]
    fn test_dotfiles_excluded_unless_pattern_is_dotted() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, ".hidden");
        touch(&tmp, "plain");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "*"), &pat(&tmp, "#1.x"), false)
            .unwrap();
        assert_eq!(1, mmv.plan.live);
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, ".*"), &pat(&tmp, "#1.x"), false)
            .unwrap();
        assert_eq!(1, mmv.plan.live);
        assert_eq!("hidden.x", mmv.plan.rep(mmv.plan.head.unwrap()).nto);
    }

    #[test]
    fn test_match_all_includes_dotfiles() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, ".hidden");
        touch(&tmp, "plain");
        let mut mmv = engine(OpKind::Xmove);
        mmv.opts.match_all = true;
        mmv.add_pair(&pat(&tmp, "*"), &pat(&tmp, "#1.x"), false)
            .unwrap();
        assert_eq!(2, mmv.plan.live);
    }

    #[test]
    fn test_source_directory_rejected_for_plain_move() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("subdir")).unwrap();
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "subdi*"), &pat(&tmp, "#1x"), false)
            .unwrap();
        assert_eq!(1, mmv.badreps);
        assert_eq!(0, mmv.plan.live);
    }

    #[test]
    fn test_existing_target_directory_receives_source_basename() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "file.txt");
        fs::create_dir(tmp.path().join("dest")).unwrap();
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "file.txt"), &pat(&tmp, "dest"), false)
            .unwrap();
        assert_eq!(1, mmv.plan.live);
        let rep = mmv.plan.rep(mmv.plan.head.unwrap());
        assert_eq!("file.txt", rep.nto);
        assert!(mmv.snapshot.handle(rep.hto).prefix.ends_with("/dest/"));
    }

    #[test]
    fn test_target_name_over_name_max_is_bad() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        let mut mmv = engine(OpKind::Xmove);
        let long = "x".repeat(300);
        mmv.add_pair(&pat(&tmp, "a"), &pat(&tmp, &long), false)
            .unwrap();
        assert_eq!(1, mmv.badreps);
        assert_eq!(0, mmv.plan.live);
    }

    #[test]
    fn test_empty_expansion_is_bad() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "abc");
        let mut mmv = engine(OpKind::Dirmove);
        // target reduces to the empty capture
        mmv.add_pair(&pat(&tmp, "abc*"), "#1", false).unwrap();
        assert_eq!(1, mmv.badreps);
    }

    #[test]
    fn test_backref_case_modifiers() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "apple");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "[aeiou]*"), &pat(&tmp, "#u1-#2"), false)
            .unwrap();
        assert_eq!(1, mmv.plan.live);
        assert_eq!("A-pple", mmv.plan.rep(mmv.plan.head.unwrap()).nto);
    }

    #[test]
    fn test_backref_zero_is_whole_from_text() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "f");
        let mut mmv = engine(OpKind::Dirmove);
        mmv.add_pair(&pat(&tmp, "f"), "#0-x", false).unwrap();
        // dirmove target may not contain '/', and #0 expands the full
        // pattern text which does; the result is a bad name
        assert_eq!(1, mmv.badreps);
    }

    #[test]
    fn test_descent_marker_matches_nested_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        touch(&tmp, "top.c");
        File::create(tmp.path().join("a/mid.c")).unwrap();
        File::create(tmp.path().join("a/b/deep.c")).unwrap();
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, ";*.c"), &pat(&tmp, "#1#2.o"), false)
            .unwrap();
        assert_eq!(3, mmv.plan.live);
        let mut targets: Vec<String> = mmv
            .plan
            .roots()
            .map(|id| {
                let rep = mmv.plan.rep(id);
                format!("{}{}", mmv.snapshot.handle(rep.hto).prefix, rep.nto)
            })
            .collect();
        targets.sort();
        let base = format!("{}/", tmp.path().display());
        assert_eq!(
            vec![
                format!("{}a/b/deep.o", base),
                format!("{}a/mid.o", base),
                format!("{}top.o", base),
            ],
            targets
        );
    }

    #[test]
    fn test_claimed_source_not_rematched() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "one");
        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(&pat(&tmp, "one"), &pat(&tmp, "first"), false)
            .unwrap();
        mmv.add_pair(&pat(&tmp, "on*"), &pat(&tmp, "second"), false)
            .unwrap();
        // the second pair finds nothing left to match
        assert_eq!(1, mmv.plan.live);
        assert_eq!(1, mmv.paterr);
    }

    #[test]
    fn test_cross_device_strict_move_rejected() {
        // /dev/shm and /tmp are distinct filesystems on typical Linux;
        // skip quietly when they are not
        let shm = std::path::Path::new("/dev/shm");
        if !shm.is_dir() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let shm_tmp = TempDir::new_in(shm).unwrap();
        let same_dev = {
            use std::os::unix::fs::MetadataExt;
            fs::metadata(tmp.path()).unwrap().dev() == fs::metadata(shm_tmp.path()).unwrap().dev()
        };
        if same_dev {
            return;
        }
        touch(&tmp, "f");
        let mut mmv = engine(OpKind::Move);
        mmv.add_pair(
            &pat(&tmp, "f"),
            &format!("{}/f", shm_tmp.path().display()),
            false,
        )
        .unwrap();
        assert_eq!(1, mmv.badreps);

        let mut mmv = engine(OpKind::Xmove);
        mmv.add_pair(
            &pat(&tmp, "f"),
            &format!("{}/f", shm_tmp.path().display()),
            false,
        )
        .unwrap();
        assert_eq!(1, mmv.plan.live);
        assert!(mmv.plan.rep(mmv.plan.head.unwrap()).cross_device);
    }
}
