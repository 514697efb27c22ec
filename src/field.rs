use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str;

use crate::error::INVALID;
use crate::Result;

/// A single header field.
///
/// The key is kept exactly as given, no case normalization happens. Two
/// fields are the same field if their keys are byte-for-byte equal.
#[derive(Clone, PartialEq, Eq)]
pub struct Field {
    key: String,
    value: Vec<u8>,
}

impl Field {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Field {
            key: key.into(),
            value: value.into().into_bytes(),
        }
    }

    /// Field with a value that is not necessarily utf-8.
    pub fn new_bytes(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Field {
            key: key.into(),
            value: value.into(),
        }
    }

    #[inline(always)]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline(always)]
    pub fn try_value(&self) -> Option<&str> {
        str::from_utf8(&self.value).ok()
    }

    #[inline(always)]
    pub fn value_raw(&self) -> &[u8] {
        &self.value
    }

    /// Fold a repeated occurrence of this field into its value.
    pub(crate) fn merge(&mut self, value: &[u8]) {
        self.value.reserve(2 + value.len());
        self.value.extend_from_slice(b", ");
        self.value.extend_from_slice(value);
    }

    /// Check a caller supplied field can be written as a header line.
    ///
    /// The line is written to a scratch buffer and read back with httparse.
    /// Anything that does not come back as exactly one header with the same
    /// key is refused.
    pub(crate) fn check(&self) -> Result<()> {
        if self.key.is_empty() {
            return INVALID;
        }

        let mut line = Vec::with_capacity(self.key.len() + self.value.len() + 6);
        line.extend_from_slice(self.key.as_bytes());
        line.extend_from_slice(b": ");
        line.extend_from_slice(&self.value);
        line.extend_from_slice(b"\r\n\r\n");

        let mut parsed = [httparse::EMPTY_HEADER; 2];

        match httparse::parse_headers(&line, &mut parsed) {
            Ok(httparse::Status::Complete((_, [h]))) if h.name == self.key => Ok(()),
            Ok(_) => INVALID,
            Err(e) => {
                debug!("Refused field {:?}: {}", self.key, e);
                INVALID
            }
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Field");
        f.field("key", &self.key);
        if let Some(value) = self.try_value() {
            f.field("value", &value);
        } else {
            f.field("value", &self.value);
        }
        f.finish()
    }
}
