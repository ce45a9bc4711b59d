/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use thiserror::Error;

use super::{BACKREF, DESCEND, ESC};

/// Errors raised while compiling a pattern pair. The caller prefixes the
/// offending pair, so the messages carry only the complaint itself.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PatternError {
    #[error("missing ].")]
    UnterminatedClass,
    #[error("'/' can not be part of [].")]
    SlashInClass,
    #[error("trailing \\ is superfluous.")]
    TrailingEscape,
    #[error("badly placed ;.")]
    MisplacedDescent,
    #[error("expected digit (not '{0}') after '#'.")]
    BackrefDigitExpected(char),
    #[error("wildcard #{0} does not exist.")]
    NoSuchWildcard(usize),
    #[error("no path allowed in target under -r.")]
    PathInDirmoveTarget,
}

/// One path segment of a `from` pattern that has to be matched against
/// directory entries. `start..end` slice the pattern text; `first_wild` is
/// the offset of the first wildcard usable for literal-prefix
/// fast-forwarding (== `end` when the stage is wholly literal).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub start: usize,
    pub end: usize,
    pub wilds: usize,
    pub first_wild: usize,
}

/// A compiled `from` pattern: the (tilde-expanded) text, the stages that
/// contain wildcards plus the final segment, and the total wildcard count
/// shared by all stages for back-reference numbering.
#[derive(Clone, Debug)]
pub struct FromPattern {
    pub text: String,
    pub stages: Vec<Stage>,
    pub wild_count: usize,
}

/// Expand a leading `~/` in place. The home string may be empty.
pub fn tilde_expand(s: &str, home: &str) -> String {
    if let Some(rest) = s.strip_prefix("~/") {
        let mut out = String::with_capacity(home.len() + rest.len() + 1);
        out.push_str(home);
        out.push('/');
        out.push_str(rest);
        out
    } else {
        s.to_string()
    }
}

/// Compile a wildcard `from` pattern: find the stages and count wildcards.
/// `* ? [ !` each open or extend a stage; `;` does too but is only legal at
/// the start of a path segment; a class body allows `^` negation, ranges
/// and escapes but no `/`.
pub fn parse_from(text: String) -> Result<FromPattern, PatternError> {
    const UNSET: usize = usize::MAX;
    let b = text.as_bytes();
    let mut stages: Vec<Stage> = Vec::new();
    let mut wild_count = 0usize;
    let mut instage = false;
    let mut cur = Stage {
        start: 0,
        end: 0,
        wilds: 0,
        first_wild: UNSET,
    };
    let mut lastname = 0usize;
    let mut i = 0usize;
    while i < b.len() {
        match b[i] {
            b'/' => {
                lastname = i + 1;
                if instage {
                    if cur.first_wild == UNSET {
                        cur.first_wild = i;
                    }
                    cur.end = i;
                    stages.push(cur);
                    instage = false;
                }
            }
            c @ (DESCEND | b'!' | b'*' | b'?' | b'[') => {
                if c == DESCEND && lastname != i {
                    return Err(PatternError::MisplacedDescent);
                }
                wild_count += 1;
                if instage {
                    cur.wilds += 1;
                    if cur.first_wild == UNSET {
                        cur.first_wild = i;
                    }
                } else {
                    cur = Stage {
                        start: lastname,
                        end: 0,
                        wilds: 1,
                        first_wild: if c == DESCEND { UNSET } else { i },
                    };
                    instage = true;
                }
                if c == b'[' {
                    loop {
                        i += 1;
                        match b.get(i) {
                            None => return Err(PatternError::UnterminatedClass),
                            Some(&b']') => break,
                            Some(&b'/') => return Err(PatternError::SlashInClass),
                            Some(&ESC) => {
                                i += 1;
                                if i >= b.len() {
                                    return Err(PatternError::TrailingEscape);
                                }
                            }
                            Some(_) => {}
                        }
                    }
                }
            }
            ESC => {
                i += 1;
                if i >= b.len() {
                    return Err(PatternError::TrailingEscape);
                }
            }
            _ => {}
        }
        i += 1;
    }

    if instage {
        if cur.first_wild == UNSET {
            cur.first_wild = b.len();
        }
        cur.end = b.len();
        stages.push(cur);
    } else {
        stages.push(Stage {
            start: lastname,
            end: b.len(),
            wilds: 0,
            first_wild: b.len(),
        });
    }

    Ok(FromPattern {
        text,
        stages,
        wild_count,
    })
}

/// Compile a literal `from` name: no wildcards exist, so the whole leading
/// path is walked as a prelude and only the final segment is a stage.
pub fn parse_from_literal(text: String) -> FromPattern {
    let start = text.rfind('/').map(|i| i + 1).unwrap_or(0);
    let end = text.len();
    FromPattern {
        stages: vec![Stage {
            start,
            end,
            wilds: 0,
            first_wild: end,
        }],
        wild_count: 0,
        text,
    }
}

/// Validate a `to` pattern against the wildcard count of its `from`.
/// Back-references are `#`, an optional case modifier `l`/`u`, and decimal
/// digits; `#0` names the whole `from` path. Under dirmove no `/` may
/// survive tilde expansion.
pub fn parse_to(
    text: &str,
    wild_count: usize,
    dirmove: bool,
    literal: bool,
) -> Result<(), PatternError> {
    let b = text.as_bytes();
    let mut i = 0usize;
    while i < b.len() {
        match b[i] {
            b'/' if dirmove => return Err(PatternError::PathInDirmoveTarget),
            BACKREF if !literal => {
                i += 1;
                let mut c = b.get(i).copied();
                if matches!(c, Some(b'l') | Some(b'u')) {
                    i += 1;
                    c = b.get(i).copied();
                }
                match c {
                    Some(d) if d.is_ascii_digit() => {
                        let mut n = 0usize;
                        while let Some(d) = b.get(i).copied().filter(u8::is_ascii_digit) {
                            n = n * 10 + (d - b'0') as usize;
                            i += 1;
                        }
                        i -= 1;
                        if n > wild_count {
                            return Err(PatternError::NoSuchWildcard(n));
                        }
                    }
                    other => {
                        return Err(PatternError::BackrefDigitExpected(
                            other.map(|c| c as char).unwrap_or('\0'),
                        ))
                    }
                }
            }
            ESC if !literal => {
                i += 1;
                if i >= b.len() {
                    return Err(PatternError::TrailingEscape);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}
