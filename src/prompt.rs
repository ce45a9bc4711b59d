/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};

const TTY: &str = "/dev/tty";

/// What to do when no answer can be obtained from the terminal.
#[derive(Clone, Copy)]
pub enum OnFail {
    /// Abort the program with "Aborting, nothing done.".
    Quit,
    /// Pretend the given answer was typed.
    Answer(bool),
}

pub fn quit() -> ! {
    let _ = io::stdout().flush();
    eprintln!("Aborting, nothing done.");
    std::process::exit(1);
}

/// Prompt on stderr, then read a strict yes-or-no answer from the terminal.
pub fn ask_yesno(prompt: &str, on_fail: OnFail) -> bool {
    eprint!("{}", prompt);
    let _ = io::stderr().flush();
    let tty = match File::open(TTY) {
        Ok(f) => f,
        Err(_) => {
            eprintln!("Cannot open '{}' to get reply.", TTY);
            match on_fail {
                OnFail::Quit => quit(),
                OnFail::Answer(a) => return a,
            }
        }
    };
    let mut reader = BufReader::new(tty);
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => {
                eprintln!("Can not get reply.");
                match on_fail {
                    OnFail::Quit => quit(),
                    OnFail::Answer(a) => return a,
                }
            }
            Ok(_) => match line.trim_start().chars().next() {
                Some('y') | Some('Y') => return true,
                Some('n') | Some('N') => return false,
                _ => {
                    eprint!("Yes or No? ");
                    let _ = io::stderr().flush();
                }
            },
        }
    }
}

/// Prompt for a filename on the terminal and open it for writing.
/// Returns the typed name alongside the open result so failures can be
/// reported with the name the operator gave.
pub fn ask_filename(prompt: &str) -> (String, io::Result<File>) {
    eprint!("{}", prompt);
    let _ = io::stderr().flush();
    let mut line = String::new();
    let read = File::open(TTY)
        .map(|tty| BufReader::new(tty).read_line(&mut line).map(|_| ()))
        .and_then(|r| r);
    if let Err(err) = read {
        return (String::new(), Err(err));
    }
    let name = line.trim_end_matches('\n').to_string();
    if name.is_empty() {
        return (
            name,
            Err(io::Error::new(io::ErrorKind::InvalidInput, "empty file name")),
        );
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&name);
    (name, file)
}
