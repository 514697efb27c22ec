use crate::{Error, Result};

pub(crate) mod ascii {
    pub const CR: u8 = b'\r';
    pub const LF: u8 = b'\n';
    pub const SP: u8 = b' ';
    pub const COLON: u8 = b':';
}

use ascii::{CR, LF};

pub(crate) fn find(b: &[u8], c: u8) -> Option<usize> {
    b.iter().position(|x| *x == c)
}

/// Length of the line terminator at the start of `b`, `LF` or `CRLF`.
pub(crate) fn line_end(b: &[u8]) -> Result<usize> {
    match b {
        [LF, ..] => Ok(1),
        [CR, LF, ..] => Ok(2),
        _ => Err(Error::InvalidParameters),
    }
}

/// Position of the next `LF` and the line before it without a trailing `CR`.
pub(crate) fn split_line(b: &[u8]) -> Option<(&[u8], usize)> {
    let lf = find(b, LF)?;
    let line = match &b[..lf] {
        [line @ .., CR] => line,
        line => line,
    };
    Some((line, lf + 1))
}
