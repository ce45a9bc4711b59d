/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use nix::sys::stat::{umask, Mode};
use nix::unistd::{setgid, setuid, Gid, Uid};

/// Process-wide facts probed once per invocation and carried by the engine.
pub struct SysInfo {
    pub uid: u32,
    pub euid: u32,
    /// Home directory used for `~/` expansion; may be empty.
    pub home: String,
    /// Longest basename the target filesystem accepts.
    pub name_max: usize,
    /// The umask in effect before it was cleared for the run.
    pub old_umask: Mode,
    interrupt: Arc<AtomicBool>,
}

impl SysInfo {
    pub fn probe() -> anyhow::Result<Self> {
        let home = match env::var("HOME") {
            Ok(h) if h != "/" => h,
            _ => String::new(),
        };
        // Created files carry the modes the plan asks for; the saved mask
        // is restored when output gets redirected after a failure.
        let old_umask = umask(Mode::empty());
        let interrupt = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupt))
            .with_context(|| "failed to install SIGINT handler")?;
        Ok(SysInfo {
            uid: Uid::current().as_raw(),
            euid: Uid::effective().as_raw(),
            home,
            name_max: 255,
            old_umask,
            interrupt,
        })
    }

    /// Peek at the interrupt flag without clearing it.
    pub fn interrupt_pending(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Consume a pending interrupt, if any.
    pub fn take_interrupt(&self) -> bool {
        self.interrupt.swap(false, Ordering::Relaxed)
    }

    /// Give up set-uid privileges before touching the filesystem.
    pub fn drop_privileges(&self) -> anyhow::Result<()> {
        if self.euid == self.uid {
            return Ok(());
        }
        setuid(Uid::from_raw(self.uid))
            .with_context(|| format!("setuid({}) failed", self.uid))?;
        let gid = Gid::current();
        setgid(gid).with_context(|| format!("setgid({}) failed", gid))?;
        Ok(())
    }
}
