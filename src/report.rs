/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs::File;
use std::io::{self, Write};

/// Diagnostic sink. Plan messages and the executed-operation listing go
/// here; it starts as stdout and may be redirected to a file when a failing
/// run snapshots the remaining work.
pub struct Report {
    out: Box<dyn Write>,
    pub redirected: bool,
}

impl Report {
    pub fn new() -> Self {
        Report {
            out: Box::new(io::stdout()),
            redirected: false,
        }
    }

    pub fn to_writer(out: Box<dyn Write>) -> Self {
        Report {
            out,
            redirected: false,
        }
    }

    pub fn redirect(&mut self, file: File) {
        let _ = self.out.flush();
        self.out = Box::new(file);
        self.redirected = true;
    }

    pub fn write(&mut self, s: &str) {
        let _ = self.out.write_all(s.as_bytes());
    }

    pub fn writeln(&mut self, s: &str) {
        let _ = self.out.write_all(s.as_bytes());
        let _ = self.out.write_all(b"\n");
    }

    pub fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

impl Default for Report {
    fn default() -> Self {
        Report::new()
    }
}

/// Render a filename using safe graphic characters only; anything else is
/// shown as %XX.
pub fn fname_display(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for &b in name.as_bytes() {
        if (0x20..0x7f).contains(&b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02x}", b));
        }
    }
    out
}

/// Complain about a pattern or name that overruns the path bound.
pub fn explain_pattern_too_long(s: &str) {
    let shown: String = fname_display(s).chars().take(60).collect();
    eprintln!(
        "{}... (too long) : pattern exceeds {} bytes.",
        shown,
        crate::PATH_MAX
    );
}

/// Like perror, but with the symbolic errno name as well.
pub fn explain_err(err: &io::Error) {
    let n = err.raw_os_error().unwrap_or(0);
    let e = nix::errno::Errno::from_raw(n);
    eprintln!("    {}={:?}='{}'", n, e, e.desc());
}
