/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Readers for the pair-stream formats: classic whitespace tokens, and the
//! NUL / quoted-printable / vis / \xNN literal encodings. Each reader
//! feeds decoded pairs straight into the engine.

use std::io::{BufRead, Read};

use anyhow::{bail, Context};

use crate::engine::Mmv;
use crate::options::Encoding;
use crate::pattern::ESC;
use crate::prompt;
use crate::PATH_MAX;

pub fn read_pairs<R: BufRead>(mmv: &mut Mmv, input: R) -> anyhow::Result<()> {
    match mmv.opts.encoding {
        Encoding::Pattern => read_classic(mmv, input),
        Encoding::Nul => read_nul(mmv, input),
        Encoding::Qp => read_qp(mmv, input),
        Encoding::Vis => read_vis(mmv, input),
        Encoding::Xnn => read_xnn(mmv, input),
    }
}

fn lossy(bytes: Vec<u8>) -> String {
    String::from_utf8_lossy(&bytes).into_owned()
}

fn check_interrupt(mmv: &Mmv) {
    if mmv.sys.interrupt_pending() {
        prompt::quit();
    }
}

struct ByteStream<R: Read> {
    inner: std::io::Bytes<R>,
    pushback: Option<u8>,
    eof: bool,
}

impl<R: Read> ByteStream<R> {
    fn new(input: R) -> Self {
        ByteStream {
            inner: input.bytes(),
            pushback: None,
            eof: false,
        }
    }

    /// Next byte, with sticky EOF and one byte of pushback.
    fn next_byte(&mut self) -> anyhow::Result<Option<u8>> {
        if let Some(b) = self.pushback.take() {
            return Ok(Some(b));
        }
        if self.eof {
            return Ok(None);
        }
        match self.inner.next() {
            None => {
                self.eof = true;
                Ok(None)
            }
            Some(Ok(b)) => Ok(Some(b)),
            Some(Err(e)) => Err(e).with_context(|| "read error on pair stream"),
        }
    }

    fn unread(&mut self, b: u8) {
        self.pushback = Some(b);
    }
}

/// One whitespace-delimited word; the escape character lets whitespace
/// into a word. An empty word means end of line (or stream).
fn get_word<R: Read>(s: &mut ByteStream<R>) -> anyhow::Result<(Vec<u8>, bool)> {
    let mut word = Vec::new();
    let mut overflow = false;
    let mut prevc = b' ';
    let mut c_opt = s.next_byte()?;
    while let Some(c) = c_opt {
        if prevc != ESC && c.is_ascii_whitespace() {
            break;
        }
        if word.len() < PATH_MAX - 1 {
            word.push(c);
        } else {
            overflow = true;
        }
        prevc = c;
        c_opt = s.next_byte()?;
    }
    // swallow the whitespace run but leave the newline for the caller
    while let Some(c) = c_opt {
        if !c.is_ascii_whitespace() || c == b'\n' {
            break;
        }
        c_opt = s.next_byte()?;
    }
    if let Some(c) = c_opt {
        s.unread(c);
    }
    Ok((word, overflow))
}

/// Output of a previous run can be fed back in; the arrow marks it prints
/// between the names are skipped.
fn is_rescan(word: &[u8]) -> bool {
    word.len() == 2 && (word[0] == b'-' || word[0] == b'=') && (word[1] == b'>' || word[1] == b'^')
}

/// Classic token stream: `from to` per line, optional `(*)` granting
/// delete permission for that pair.
fn read_classic<R: BufRead>(mmv: &mut Mmv, input: R) -> anyhow::Result<()> {
    let mut s = ByteStream::new(input);
    loop {
        check_interrupt(mmv);
        let mut del_ok = false;
        let mut pair: Option<(String, String)> = None;

        let (from, from_ovf) = get_word(&mut s)?;
        if from_ovf {
            crate::report::explain_pattern_too_long(&lossy(from));
            mmv.paterr += 1;
        } else if !from.is_empty() {
            let from_s = lossy(from);
            loop {
                let (to, to_ovf) = get_word(&mut s)?;
                if to.is_empty() {
                    let line = format!("{} -> ? : missing replacement pattern.", from_s);
                    mmv.report.writeln(&line);
                    break;
                }
                if to_ovf {
                    crate::report::explain_pattern_too_long(&lossy(to));
                    mmv.paterr += 1;
                    break;
                }
                if is_rescan(&to) {
                    continue;
                }
                let to_s = lossy(to);
                let (extra, _) = get_word(&mut s)?;
                if extra.is_empty() {
                    pair = Some((from_s, to_s));
                } else if extra == b"(*)" {
                    del_ok = true;
                    let (extra2, _) = get_word(&mut s)?;
                    if extra2.is_empty() {
                        pair = Some((from_s, to_s));
                    }
                }
                break;
            }
        }

        // consume the rest of the line
        let mut at_eof = false;
        loop {
            match s.next_byte()? {
                None => {
                    at_eof = true;
                    break;
                }
                Some(b'\n') => break,
                Some(_) => {}
            }
        }
        if let Some((f, t)) = pair {
            mmv.add_pair(&f, &t, del_ok)?;
        }
        if at_eof {
            return Ok(());
        }
    }
}

/// `from\0to\0` records; EOF between the names truncates without error.
fn read_nul<R: BufRead>(mmv: &mut Mmv, input: R) -> anyhow::Result<()> {
    let mut s = ByteStream::new(input);
    loop {
        check_interrupt(mmv);
        let from = match read_until_nul(&mut s)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let to = match read_until_nul(&mut s)? {
            None => return Ok(()),
            Some(v) => v,
        };
        mmv.add_pair(&lossy(from), &lossy(to), false)?;
    }
}

fn read_until_nul<R: Read>(s: &mut ByteStream<R>) -> anyhow::Result<Option<Vec<u8>>> {
    let mut v = Vec::new();
    loop {
        match s.next_byte()? {
            None => return Ok(None),
            Some(0) => return Ok(Some(v)),
            Some(b) => v.push(b),
        }
    }
}

/// One name per LF-terminated line, `=XX` escapes, `=` soft wrap joining
/// the next line.
fn read_qp<R: BufRead>(mmv: &mut Mmv, mut input: R) -> anyhow::Result<()> {
    loop {
        check_interrupt(mmv);
        let from = match read_qp_name(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let to = match read_qp_name(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        mmv.add_pair(&lossy(from), &lossy(to), false)?;
    }
}

fn read_qp_name<R: BufRead>(input: &mut R) -> anyhow::Result<Option<Vec<u8>>> {
    let mut out = Vec::new();
    let mut got_any = false;
    loop {
        let mut line = Vec::new();
        if input.read_until(b'\n', &mut line)? == 0 {
            return Ok(if got_any { Some(out) } else { None });
        }
        got_any = true;
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        let mut i = 0usize;
        let mut soft_wrap = false;
        while i < line.len() {
            let b = line[i];
            if b != b'=' {
                out.push(b);
                i += 1;
                continue;
            }
            if i + 1 == line.len() {
                // soft wrap: the name continues on the next line
                soft_wrap = true;
                break;
            }
            let hi = hex_val(line[i + 1]);
            let lo = line.get(i + 2).copied().and_then(hex_val);
            match (hi, lo) {
                (Some(h), Some(l)) => {
                    out.push(h << 4 | l);
                    i += 3;
                }
                _ => bail!("invalid quoted-printable escape in pair stream"),
            }
        }
        if !soft_wrap {
            return Ok(Some(out));
        }
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// One name per line in BSD vis encoding.
fn read_vis<R: BufRead>(mmv: &mut Mmv, mut input: R) -> anyhow::Result<()> {
    loop {
        check_interrupt(mmv);
        let from = match read_line(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let to = match read_line(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let from = unvis(&from)?;
        let to = unvis(&to)?;
        mmv.add_pair(&lossy(from), &lossy(to), false)?;
    }
}

/// One name per line with `\xNN` escapes for non-graphic bytes.
fn read_xnn<R: BufRead>(mmv: &mut Mmv, mut input: R) -> anyhow::Result<()> {
    loop {
        check_interrupt(mmv);
        let from = match read_line(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let to = match read_line(&mut input)? {
            None => return Ok(()),
            Some(v) => v,
        };
        let from = decode_xnn(&from);
        let to = decode_xnn(&to);
        mmv.add_pair(&lossy(from), &lossy(to), false)?;
    }
}

fn read_line<R: BufRead>(input: &mut R) -> anyhow::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    if input.read_until(b'\n', &mut line)? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
    }
    Ok(Some(line))
}

/// Decode BSD strunvis sequences: C-style escapes, up to three octal
/// digits, `\^C` control, `\M-C` meta and `\M^C` meta-control.
fn unvis(input: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < input.len() {
        let b = input[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let c = match input.get(i) {
            None => bail!("truncated vis escape in pair stream"),
            Some(&c) => c,
        };
        match c {
            b'\\' => {
                out.push(b'\\');
                i += 1;
            }
            b'n' => {
                out.push(b'\n');
                i += 1;
            }
            b't' => {
                out.push(b'\t');
                i += 1;
            }
            b'r' => {
                out.push(b'\r');
                i += 1;
            }
            b'b' => {
                out.push(0x08);
                i += 1;
            }
            b'a' => {
                out.push(0x07);
                i += 1;
            }
            b'v' => {
                out.push(0x0b);
                i += 1;
            }
            b'f' => {
                out.push(0x0c);
                i += 1;
            }
            b's' => {
                out.push(b' ');
                i += 1;
            }
            b'0'..=b'7' => {
                let mut val = 0u32;
                let mut digits = 0;
                while digits < 3 {
                    match input.get(i) {
                        Some(&d) if (b'0'..=b'7').contains(&d) => {
                            val = val * 8 + u32::from(d - b'0');
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push(val as u8);
            }
            b'^' => {
                i += 1;
                match input.get(i) {
                    None => bail!("truncated vis escape in pair stream"),
                    Some(&c) => {
                        out.push(c & 0x1f);
                        i += 1;
                    }
                }
            }
            b'M' => {
                i += 1;
                match input.get(i) {
                    Some(&b'-') => {
                        i += 1;
                        match input.get(i) {
                            None => bail!("truncated vis escape in pair stream"),
                            Some(&c) => {
                                out.push(c | 0x80);
                                i += 1;
                            }
                        }
                    }
                    Some(&b'^') => {
                        i += 1;
                        match input.get(i) {
                            None => bail!("truncated vis escape in pair stream"),
                            Some(&c) => {
                                out.push((c & 0x1f) | 0x80);
                                i += 1;
                            }
                        }
                    }
                    _ => bail!("malformed vis meta escape in pair stream"),
                }
            }
            other => bail!("unknown vis escape '\\{}' in pair stream", other as char),
        }
    }
    Ok(out)
}

/// `\xNN` pairs become bytes; a lone backslash stays literal.
fn decode_xnn(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < input.len() {
        if input[i] == b'\\' {
            if input.get(i + 1) == Some(&b'\\') {
                out.push(b'\\');
                i += 2;
                continue;
            }
            if input.get(i + 1) == Some(&b'x') {
                if let (Some(h), Some(l)) = (
                    input.get(i + 2).copied().and_then(hex_val),
                    input.get(i + 3).copied().and_then(hex_val),
                ) {
                    out.push(h << 4 | l);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(input[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{BadPolicy, DelPolicy, OpKind, Options};
    use crate::report::Report;
    use crate::sys::SysInfo;
    use std::fs::File;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn engine(encoding: Encoding) -> Mmv {
        let opts = Options {
            op: OpKind::Xmove,
            verbose: false,
            no_execute: true,
            match_all: false,
            delstyle: DelPolicy::All,
            badstyle: BadPolicy::Skip,
            encoding,
            debug: false,
        };
        let mut mmv = Mmv::new(opts, SysInfo::probe().unwrap());
        mmv.report = Report::to_writer(Box::new(std::io::sink()));
        mmv
    }

    fn touch(dir: &TempDir, name: &str) {
        File::create(dir.path().join(name)).unwrap();
    }

    fn targets(mmv: &Mmv) -> Vec<String> {
        mmv.plan
            .roots()
            .map(|id| mmv.plan.rep(id).nto.clone())
            .collect()
    }

    #[test]
    fn test_classic_pairs_with_markers_and_delok() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        touch(&tmp, "b");
        let base = tmp.path().display();
        let stream = format!("{0}/a -> {0}/x\n{0}/b {0}/y (*)\n", base);
        let mut mmv = engine(Encoding::Pattern);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["x".to_string(), "y".to_string()], targets(&mmv));
        let ids: Vec<_> = mmv.plan.roots().collect();
        assert!(!mmv.plan.rep(ids[0]).del_ok);
        assert!(mmv.plan.rep(ids[1]).del_ok);
    }

    #[test]
    fn test_classic_missing_replacement_skips_line() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a");
        let base = tmp.path().display();
        let stream = format!("lonely\n{0}/a {0}/ok\n", base);
        let mut mmv = engine(Encoding::Pattern);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["ok".to_string()], targets(&mmv));
    }

    #[test]
    fn test_classic_escaped_space_in_word() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "with space");
        let base = tmp.path().display();
        let stream = format!("{0}/with\\ space {0}/plain\n", base);
        let mut mmv = engine(Encoding::Pattern);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["plain".to_string()], targets(&mmv));
    }

    #[test]
    fn test_nul_records() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "n1");
        let base = tmp.path().display();
        let stream = format!("{0}/n1\0{0}/n2\0", base);
        let mut mmv = engine(Encoding::Nul);
        read_pairs(&mut mmv, Cursor::new(stream.into_bytes())).unwrap();
        assert_eq!(vec!["n2".to_string()], targets(&mmv));
    }

    #[test]
    fn test_nul_eof_between_names_truncates_silently() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "n1");
        let base = tmp.path().display();
        let stream = format!("{0}/n1\0{0}/partial", base);
        let mut mmv = engine(Encoding::Nul);
        read_pairs(&mut mmv, Cursor::new(stream.into_bytes())).unwrap();
        assert!(targets(&mmv).is_empty());
        assert_eq!(0, mmv.paterr);
    }

    #[test]
    fn test_qp_decodes_escapes() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "a b");
        let base = tmp.path().display();
        let stream = format!("{0}/a=20b\n{0}/plain\n", base);
        let mut mmv = engine(Encoding::Qp);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["plain".to_string()], targets(&mmv));
    }

    #[test]
    fn test_qp_soft_wrap_joins_lines() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "joined");
        let base = tmp.path().display();
        let stream = format!("{0}/joi=\nned\n{0}/out\n", base);
        let mut mmv = engine(Encoding::Qp);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["out".to_string()], targets(&mmv));
    }

    #[test]
    fn test_vis_decoding() {
        assert_eq!(b"a b".to_vec(), unvis(b"a\\sb").unwrap());
        assert_eq!(b"a\nb".to_vec(), unvis(b"a\\nb").unwrap());
        assert_eq!(vec![0o101u8], unvis(b"\\101").unwrap());
        assert_eq!(vec![0x81u8], unvis(b"\\M^A").unwrap());
        assert_eq!(vec![0xc1u8], unvis(b"\\M-A").unwrap());
        assert_eq!(vec![1u8], unvis(b"\\^A").unwrap());
        assert!(unvis(b"trailing\\").is_err());
    }

    #[test]
    fn test_vis_pairs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "v 1");
        let base = tmp.path().display();
        let stream = format!("{0}/v\\s1\n{0}/v1\n", base);
        let mut mmv = engine(Encoding::Vis);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["v1".to_string()], targets(&mmv));
    }

    #[test]
    fn test_xnn_decoding() {
        assert_eq!(b"a b".to_vec(), decode_xnn(b"a\\x20b"));
        assert_eq!(b"\\".to_vec(), decode_xnn(b"\\\\"));
        assert_eq!(b"\\xZZ".to_vec(), decode_xnn(b"\\xZZ"));
        assert_eq!(vec![0xffu8], decode_xnn(b"\\xff"));
    }

    #[test]
    fn test_xnn_pairs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp, "x y");
        let base = tmp.path().display();
        let stream = format!("{0}/x\\x20y\n{0}/xy\n", base);
        let mut mmv = engine(Encoding::Xnn);
        read_pairs(&mut mmv, Cursor::new(stream)).unwrap();
        assert_eq!(vec!["xy".to_string()], targets(&mmv));
    }
}
