/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Ordered execution of the analyzed plan: chain roots in insertion order,
//! each chain walked through its `thendo` links, cycles broken by renaming
//! the displaced target to a temporary alias first. A failing operation
//! snapshots what is left and switches the rest of the walk to dry-run.

pub mod copy;

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::os::unix::fs as unixfs;

use copy::copy_file;

use crate::engine::Mmv;
use crate::options::{BadPolicy, OpKind};
use crate::plan::rep::RepId;
use crate::prompt::{ask_filename, ask_yesno, OnFail};
use crate::report::{explain_err, fname_display};
use crate::scan::FileId;
use crate::TEMP_PREFIX;

impl Mmv {
    pub(crate) fn do_reps(&mut self) -> anyhow::Result<()> {
        let op = self.opts.op;
        let mut done = 0usize;
        let mut first_opt = self.plan.head;
        while let Some(first) = first_opt {
            let mut printaliased = false;
            let mut alias_seq = 0usize;
            let mut alias_len: Option<u64> = None;
            let mut p_opt = Some(first);
            while let Some(p) = p_opt {
                if self.sys.take_interrupt() {
                    self.report.flush();
                    let _ = io::stdout().flush();
                    eprintln!("User break.");
                    printaliased = self.snap(first, p);
                }

                let (hto, hfrom, ffrom, nto, cycle, aliased, fdel, cross, one_dir_link) = {
                    let rep = self.plan.rep(p);
                    (
                        rep.hto,
                        rep.hfrom,
                        rep.ffrom,
                        rep.nto.clone(),
                        rep.cycle,
                        rep.aliased,
                        rep.fdel,
                        rep.cross_device,
                        rep.one_dir_link,
                    )
                };
                let ffrom_name = self.fname(ffrom);
                let hfrom_prefix = self.prefix(hfrom);
                self.fullrep = format!("{}{}", self.prefix(hto), nto);

                if !self.noex && cycle {
                    if op == OpKind::Append {
                        alias_len = self.append_alias(first, p, &mut printaliased);
                    } else {
                        alias_seq = self.move_alias(first, p, &mut printaliased);
                    }
                }

                self.path = hfrom_prefix.clone();
                if aliased && op != OpKind::Append {
                    self.path.push_str(&format!("{}{:03}", TEMP_PREFIX, alias_seq));
                } else {
                    self.path.push_str(&ffrom_name);
                }

                if !self.noex {
                    if fdel.is_some() && !op.writes_target() {
                        let dst = self.fullrep.clone();
                        self.unlink_reporting(&dst);
                    }
                    let src_mode = self.snapshot.dirs.file(ffrom).mode;
                    let (op_str, result): (&str, io::Result<()>) = match op {
                        OpKind::Copy | OpKind::Overwrite | OpKind::Append => {
                            let limit = if aliased { alias_len } else { None };
                            (
                                "copy",
                                copy_file(
                                    &self.path,
                                    &self.fullrep,
                                    op == OpKind::Append,
                                    op == OpKind::Overwrite,
                                    limit,
                                    src_mode,
                                    self.sys.old_umask.bits(),
                                ),
                            )
                        }
                        OpKind::Hardlink => ("link", fs::hard_link(&self.path, &self.fullrep)),
                        OpKind::Symlink => {
                            let content = if one_dir_link {
                                ffrom_name.clone()
                            } else {
                                self.path.clone()
                            };
                            ("symlink", unixfs::symlink(&content, &self.fullrep))
                        }
                        _ if cross => ("copymove", self.copy_move(ffrom)),
                        _ => ("rename", fs::rename(&self.path, &self.fullrep)),
                    };
                    if let Err(err) = result {
                        eprintln!(
                            "{} -> {} {} has failed.",
                            fname_display(&self.path),
                            fname_display(&self.fullrep),
                            op_str
                        );
                        explain_err(&err);
                        printaliased = self.snap(first, p);
                    }
                }

                if self.opts.verbose || self.noex {
                    if aliased && !printaliased {
                        self.path = format!("{}{}", hfrom_prefix, ffrom_name);
                    }
                    let line = format!(
                        "{} {}{} {}{}{}",
                        self.path,
                        if aliased { '=' } else { '-' },
                        if cycle { '^' } else { '>' },
                        self.fullrep,
                        if fdel.is_some() && op != OpKind::Append {
                            " (*)"
                        } else {
                            ""
                        },
                        if self.noex { "" } else { " : done" },
                    );
                    self.report.writeln(&line);
                }

                done += 1;
                p_opt = self.plan.rep(p).thendo;
            }
            first_opt = self.plan.rep(first).next;
        }

        if done != self.plan.live {
            eprintln!("Strange, did {} reps; {} were expected.", done, self.plan.live);
        }
        if done == 0 {
            eprintln!("Nothing done.");
        }
        Ok(())
    }

    /// Rename the file occupying the cycle target to a fresh temporary
    /// basename in the same directory, returning its sequence number.
    fn move_alias(&mut self, first: RepId, p: RepId, printaliased: &mut bool) -> usize {
        let hto = self.plan.rep(p).hto;
        let dir = self.snapshot.listing_of(hto);
        self.path = self.prefix(hto);
        let base_len = self.path.len();
        let mut seq = 0usize;
        loop {
            let name = format!("{}{:03}", TEMP_PREFIX, seq);
            if self.snapshot.dirs.search(dir, &name).is_none() {
                self.path.truncate(base_len);
                self.path.push_str(&name);
                break;
            }
            seq += 1;
        }
        if let Err(err) = fs::rename(&self.fullrep, &self.path) {
            eprintln!(
                "{} -> {} has failed.",
                fname_display(&self.fullrep),
                fname_display(&self.path)
            );
            explain_err(&err);
            *printaliased = self.snap(first, p);
        }
        seq
    }

    /// For an append cycle no rename is needed, but the target's size now
    /// bounds the later read-back so the append cannot consume its own
    /// output.
    fn append_alias(&mut self, first: RepId, p: RepId, printaliased: &mut bool) -> Option<u64> {
        match fs::metadata(&self.fullrep) {
            Ok(m) => Some(m.len()),
            Err(_) => {
                eprintln!(
                    "append cycle stat on '{}' has failed.",
                    fname_display(&self.fullrep)
                );
                *printaliased = self.snap(first, p);
                None
            }
        }
    }

    fn copy_move(&mut self, ffrom: FileId) -> io::Result<()> {
        let src_mode = self.snapshot.dirs.file(ffrom).mode;
        copy_file(
            &self.path,
            &self.fullrep,
            false,
            false,
            None,
            src_mode,
            self.sys.old_umask.bits(),
        )?;
        fs::remove_file(&self.path)
    }

    fn unlink_reporting(&mut self, path: &str) {
        if let Err(err) = fs::remove_file(path) {
            eprintln!("unlink('{}') failed.", fname_display(path));
            explain_err(&err);
        }
    }

    /// A failing operation: record the failure, optionally redirect output,
    /// list what already ran, and put the rest of the walk into dry-run so
    /// the operator gets a complete "left undone" listing.
    pub(crate) fn snap(&mut self, first: RepId, p: RepId) -> bool {
        if self.noex {
            std::process::exit(1);
        }
        self.failed = true;
        let mut redirected = false;
        if self.opts.badstyle == BadPolicy::Ask
            && io::stdout().is_terminal()
            && ask_yesno("Redirect standard output to file? ", OnFail::Answer(false))
        {
            nix::sys::stat::umask(self.sys.old_umask);
            loop {
                let (name, file) = ask_filename("File name> ");
                match file {
                    Ok(f) => {
                        self.report.redirect(f);
                        redirected = true;
                        break;
                    }
                    Err(err) => {
                        eprintln!("open('{}') failed.", fname_display(&name));
                        explain_err(&err);
                    }
                }
            }
        }
        if redirected || !self.opts.verbose {
            self.show_done(p);
        }
        self.report.writeln("The following left undone:");
        self.noex = true;
        first != p
    }

    /// Replay the listing of everything that completed before `fin`.
    fn show_done(&mut self, fin: RepId) {
        let roots: Vec<RepId> = self.plan.roots().collect();
        'outer: for root in roots {
            let mut cur = Some(root);
            while let Some(id) = cur {
                if id == fin {
                    break 'outer;
                }
                self.show_done_rep(id);
                cur = self.plan.rep(id).thendo;
            }
        }
    }

    fn show_done_rep(&mut self, id: RepId) {
        let (aliased, cycle, fdel) = {
            let rep = self.plan.rep(id);
            (rep.aliased, rep.cycle, rep.fdel)
        };
        let src = self.src_of(id);
        let dst = self.dst_of(id);
        let line = format!(
            "{} {}{} {} : done{}",
            fname_display(&src),
            if aliased { '=' } else { '-' },
            if cycle { '^' } else { '>' },
            fname_display(&dst),
            if fdel.is_some() && self.opts.op != OpKind::Append {
                " (*)"
            } else {
                ""
            },
        );
        self.report.writeln(&line);
    }
}
