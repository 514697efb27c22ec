use core::fmt::{self, Write};

use crate::error::INVALID;
use crate::util::ascii::{COLON, CR, LF, SP};
use crate::{Error, Field, HttpVersion, Method, Result, StatusCode};

/// Serializer sink.
///
/// Without a buffer it only counts, which is how the exact output length is
/// found before anything is written. With a buffer every write must fit.
pub(crate) struct Out<'a> {
    buf: Option<&'a mut [u8]>,
    pos: usize,
}

impl<'a> Out<'a> {
    pub fn measure() -> Self {
        Out { buf: None, pos: 0 }
    }

    pub fn wrap(buf: &'a mut [u8]) -> Self {
        Out {
            buf: Some(buf),
            pos: 0,
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let end = self.pos + bytes.len();

        if let Some(buf) = self.buf.as_deref_mut() {
            if end > buf.len() {
                return Err(Error::InvalidParameters);
            }
            buf[self.pos..end].copy_from_slice(bytes);
        }

        self.pos = end;

        Ok(bytes.len())
    }

    pub fn len(&self) -> usize {
        self.pos
    }

    pub fn write_eol(&mut self, compat: bool) -> Result<()> {
        if compat {
            self.write(&[CR, LF])?;
        } else {
            self.write(&[LF])?;
        }
        Ok(())
    }

    pub fn write_request_line(
        &mut self,
        method: Method,
        path: &[u8],
        version: HttpVersion,
        compat: bool,
    ) -> Result<()> {
        write!(self, "{} ", method).or(INVALID)?;
        self.write(path)?;
        write!(self, " {}", version).or(INVALID)?;
        self.write_eol(compat)
    }

    pub fn write_status_line(
        &mut self,
        version: HttpVersion,
        code: StatusCode,
        keep_desc: bool,
        compat: bool,
    ) -> Result<()> {
        write!(self, "{} {}", version, code).or(INVALID)?;
        if keep_desc {
            // An unknown code still gets the separator, the phrase is just empty.
            write!(self, " {}", code.description()).or(INVALID)?;
        }
        self.write_eol(compat)
    }

    pub fn write_field(&mut self, field: &Field, compat: bool) -> Result<()> {
        let value = field.value_raw();

        self.write(field.key().as_bytes())?;
        // The parser drops one space after the colon, so a value that
        // starts with a space needs the separator even in compact form.
        if compat || value.first() == Some(&SP) {
            self.write(&[COLON, SP])?;
        } else {
            self.write(&[COLON])?;
        }
        self.write(value)?;
        self.write_eol(compat)
    }
}

impl<'a> fmt::Write for Out<'a> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes()).and(Ok(())).or(Err(fmt::Error))
    }
}
