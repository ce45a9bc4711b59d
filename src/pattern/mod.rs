/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

pub mod compile;
pub mod glob;

pub use compile::{FromPattern, PatternError, Stage};

/// The escape character; the byte after it is always literal.
pub const ESC: u8 = b'\\';

/// Introduces a back-reference in a `to` pattern.
pub const BACKREF: u8 = b'#';

/// Marks any-depth descent when it opens a path segment of a `from` pattern.
pub const DESCEND: u8 = b';';
