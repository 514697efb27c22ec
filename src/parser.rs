use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::str;

use crate::message::{Inner, StartLine};
use crate::util::ascii::{COLON, CR, LF, SP};
use crate::util::{find, line_end, split_line};
use crate::{Error, Field, HttpVersion, Method, Result, StatusCode};

const HTTP_PREFIX: &[u8] = b"HTTP/";

/// `"HTTP/" + 3 byte version`
const VERSION_LEN: usize = HTTP_PREFIX.len() + 3;

/// Parse a complete request. Nothing is returned unless every stage succeeds.
pub(crate) fn parse_request(input: &[u8], body_len: usize) -> Result<Inner> {
    let (line, consumed) = request_line(input)?;
    let (fields, header_len) = parse_fields(&input[consumed..])?;
    let body = take_body(&input[consumed + header_len..], body_len);

    Ok(Inner::new(line, fields, body))
}

pub(crate) fn parse_response(input: &[u8], body_len: usize) -> Result<Inner> {
    let (line, consumed) = status_line(input)?;
    let (fields, header_len) = parse_fields(&input[consumed..])?;
    let body = take_body(&input[consumed + header_len..], body_len);

    Ok(Inner::new(line, fields, body))
}

fn request_line(input: &[u8]) -> Result<(StartLine, usize)> {
    // The method is read up to the first space, but never more than MAX_LEN bytes.
    let limit = input.len().min(Method::MAX_LEN);
    let method_end = find(&input[..limit], SP);
    let method = Method::from_bytes(&input[..method_end.unwrap_or(limit)])?;
    let method_end = method_end.ok_or(Error::InvalidParameters)?;

    let rest = &input[method_end + 1..];
    let path_end = rest
        .iter()
        .position(|c| matches!(*c, SP | CR | LF))
        .ok_or(Error::InvalidParameters)?;
    if path_end == 0 || rest[path_end] != SP {
        return Err(Error::InvalidParameters);
    }
    let path = &rest[..path_end];

    let rest = &rest[path_end + 1..];
    let version = version(rest)?;
    let eol = line_end(&rest[VERSION_LEN..])?;

    let consumed = method_end + 1 + path_end + 1 + VERSION_LEN + eol;

    let line = StartLine::Request {
        method,
        path: path.to_vec(),
        version,
    };

    Ok((line, consumed))
}

fn status_line(input: &[u8]) -> Result<(StartLine, usize)> {
    let version = version(input)?;

    if input.get(VERSION_LEN) != Some(&SP) {
        return Err(Error::InvalidParameters);
    }

    let code_start = VERSION_LEN + 1;
    let code_end = code_start + 3;
    let digits = input
        .get(code_start..code_end)
        .ok_or(Error::InvalidParameters)?;
    let code = StatusCode::from_digits(digits)?;

    let rest = &input[code_end..];
    let eol = if rest.first() == Some(&SP) {
        // Reason phrase is not kept, the serializer derives it from the code.
        let (_, n) = split_line(rest).ok_or(Error::InvalidParameters)?;
        n
    } else {
        line_end(rest)?
    };

    Ok((StartLine::Response { code, version }, code_end + eol))
}

/// `HTTP/x.y` at the start of `b`.
fn version(b: &[u8]) -> Result<HttpVersion> {
    if !b.starts_with(HTTP_PREFIX) {
        return Err(Error::InvalidParameters);
    }
    let token = b
        .get(HTTP_PREFIX.len()..VERSION_LEN)
        .ok_or(Error::InvalidVersion)?;
    HttpVersion::from_bytes(token)
}

/// Parse the header block up to and including the blank line.
///
/// The first pass validates every line and assigns each distinct key the
/// index of its first occurrence. The second pass fills a vec of exactly
/// that many fields, folding repeats into the field at their key's index.
fn parse_fields(src: &[u8]) -> Result<(Vec<Field>, usize)> {
    let mut lines = FieldLines::new(src);
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for line in lines.by_ref() {
        let (key, _) = line?;
        let next = index.len();
        index.entry(key).or_insert(next);
    }

    let consumed = lines.pos;
    let count = index.len();

    let mut fields: Vec<Field> = Vec::with_capacity(count);

    for line in FieldLines::new(src) {
        let (key, value) = line?;

        match index.get(key) {
            Some(i) if *i < fields.len() => fields[*i].merge(value),
            _ => fields.push(Field::new_bytes(key, value)),
        }
    }

    debug_assert_eq!(fields.len(), count);

    Ok((fields, consumed))
}

fn take_body(rest: &[u8], body_len: usize) -> Option<Vec<u8>> {
    if body_len == 0 {
        return None;
    }
    let len = body_len.min(rest.len());
    Some(rest[..len].to_vec())
}

/// Iterates the `key: value` lines of a header block.
///
/// Ends after the blank line, at which point `pos` is the number of bytes
/// the block occupied. Input that ends before the blank line yields an error.
struct FieldLines<'a> {
    src: &'a [u8],
    pos: usize,
    done: bool,
}

impl<'a> FieldLines<'a> {
    fn new(src: &'a [u8]) -> Self {
        FieldLines {
            src,
            pos: 0,
            done: false,
        }
    }

    fn read_line(&mut self) -> Result<Option<(&'a str, &'a [u8])>> {
        let src: &'a [u8] = self.src;
        let (line, n) = split_line(&src[self.pos..]).ok_or(Error::InvalidParameters)?;
        self.pos += n;

        if line.is_empty() {
            return Ok(None);
        }

        // Bare CR is neither a terminator nor allowed inside a field.
        if find(line, CR).is_some() {
            return Err(Error::InvalidParameters);
        }

        let colon = find(line, COLON).ok_or(Error::InvalidParameters)?;
        let key = &line[..colon];
        if key.is_empty() {
            return Err(Error::InvalidParameters);
        }
        let key = str::from_utf8(key).map_err(|_| Error::InvalidParameters)?;

        let value = match &line[colon + 1..] {
            [SP, value @ ..] => value,
            value => value,
        };

        Ok(Some((key, value)))
    }
}

impl<'a> Iterator for FieldLines<'a> {
    type Item = Result<(&'a str, &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let line = self.read_line();

        match line {
            Ok(Some(v)) => Some(Ok(v)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
