/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;

use filetime::FileTime;

const BUF_SIZE: usize = 64 * 1024;
const RW_ALL: u32 = 0o666;

/// Copy `src` to `dst` through a fixed-size buffer. `limit` caps the bytes
/// read (used when an append cycle must not re-read what it just wrote).
/// Plain copies stamp the target with the source's atime/mtime; failed
/// non-append copies remove the partial target.
pub fn copy_file(
    src: &str,
    dst: &str,
    append: bool,
    overwrite: bool,
    limit: Option<u64>,
    src_mode: u32,
    old_umask: u32,
) -> io::Result<()> {
    let perm = if append || overwrite {
        (!old_umask & RW_ALL) | (src_mode & !RW_ALL)
    } else {
        src_mode
    };
    let perm = perm & 0o7777;

    let result = transfer(src, dst, append, perm, limit).and_then(|_| {
        if !append && !overwrite {
            let meta = fs::metadata(src)?;
            filetime::set_file_times(
                dst,
                FileTime::from_last_access_time(&meta),
                FileTime::from_last_modification_time(&meta),
            )?;
        }
        Ok(())
    });

    if result.is_err() && !append {
        let _ = fs::remove_file(dst);
    }
    result
}

fn transfer(
    src: &str,
    dst: &str,
    append: bool,
    perm: u32,
    limit: Option<u64>,
) -> io::Result<()> {
    let mut srcf = File::open(src)?;
    let mut opts = OpenOptions::new();
    opts.write(true).create(true).mode(perm);
    if !append {
        opts.truncate(true);
    }
    let mut dstf = opts.open(dst)?;
    if append {
        dstf.seek(SeekFrom::End(0))?;
    }

    let mut buf = vec![0u8; BUF_SIZE];
    let mut remaining = limit;
    loop {
        let want = match remaining {
            Some(0) => break,
            Some(r) => (r.min(BUF_SIZE as u64)) as usize,
            None => BUF_SIZE,
        };
        let got = srcf.read(&mut buf[..want])?;
        if got == 0 {
            break;
        }
        dstf.write_all(&buf[..got])?;
        if let Some(r) = remaining {
            remaining = Some(r - got as u64);
        }
    }
    Ok(())
}
