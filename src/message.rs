use alloc::vec;
use alloc::vec::Vec;
use core::str;

use crate::out::Out;
use crate::parser;
use crate::util::ascii::{CR, LF, SP};
use crate::{Error, Field, HttpVersion, Kind, Method, Result, StatusCode};

/// An http request or response.
///
/// A new message is empty. It becomes a request or a response exactly once,
/// either by one of the `create_*` constructors or by parsing. After that
/// fields and attributes can be changed in place, and [`Message::clear`]
/// turns it back into an empty message ready for reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    inner: Option<Inner>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Inner {
    pub line: StartLine,
    pub fields: Vec<Field>,
    pub body: Option<Vec<u8>>,
}

/// First line of the message. The variant is the message kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StartLine {
    Request {
        method: Method,
        path: Vec<u8>,
        version: HttpVersion,
    },
    Response {
        code: StatusCode,
        version: HttpVersion,
    },
}

impl Inner {
    pub fn new(line: StartLine, fields: Vec<Field>, body: Option<Vec<u8>>) -> Self {
        Inner { line, fields, body }
    }

    fn kind(&self) -> Kind {
        match self.line {
            StartLine::Request { .. } => Kind::Request,
            StartLine::Response { .. } => Kind::Response,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key() == key)
    }

    fn write_fields_and_body(&self, out: &mut Out, compat: bool) -> Result<()> {
        for field in &self.fields {
            out.write_field(field, compat)?;
        }

        out.write_eol(compat)?;

        if let Some(body) = &self.body {
            out.write(body)?;
        }

        Ok(())
    }
}

impl Message {
    pub fn new() -> Self {
        Message { inner: None }
    }

    /// Release path, fields and body and return to [`Kind::Empty`].
    pub fn clear(&mut self) {
        if self.inner.take().is_some() {
            trace!("Cleared message");
        }
    }

    pub fn kind(&self) -> Kind {
        self.inner.as_ref().map(Inner::kind).unwrap_or(Kind::Empty)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner.as_ref().ok_or(Error::InvalidInstance)
    }

    fn inner_mut(&mut self) -> Result<&mut Inner> {
        self.inner.as_mut().ok_or(Error::InvalidInstance)
    }

    fn ensure_empty(&self) -> Result<()> {
        if self.inner.is_some() {
            return Err(Error::InvalidInstance);
        }
        Ok(())
    }

    fn commit(&mut self, inner: Inner) {
        trace!(
            "Initialized {:?} with {} fields, body: {:?}",
            inner.kind(),
            inner.fields.len(),
            inner.body.as_ref().map(|b| b.len())
        );
        self.inner = Some(inner);
    }

    // ************* CONSTRUCTION *****************

    /// Initialize an empty message as a request.
    ///
    /// Every field is validated and must have a unique key. An empty `body`
    /// means no body; use [`Message::set_body`] for an explicit empty one.
    pub fn create_request(
        &mut self,
        method: Method,
        path: impl AsRef<[u8]>,
        version: HttpVersion,
        fields: impl IntoIterator<Item = Field>,
        body: &[u8],
    ) -> Result<()> {
        self.ensure_empty()?;

        let path = path.as_ref();
        check_path(path)?;

        let line = StartLine::Request {
            method,
            path: path.to_vec(),
            version,
        };

        let inner = Inner::new(line, collect_fields(fields)?, initial_body(body));
        self.commit(inner);

        Ok(())
    }

    /// Initialize an empty message as a response. `code` must be within `100..=599`.
    pub fn create_response(
        &mut self,
        code: u16,
        version: HttpVersion,
        fields: impl IntoIterator<Item = Field>,
        body: &[u8],
    ) -> Result<()> {
        self.ensure_empty()?;

        let line = StartLine::Response {
            code: StatusCode::new(code)?,
            version,
        };

        let inner = Inner::new(line, collect_fields(fields)?, initial_body(body));
        self.commit(inner);

        Ok(())
    }

    // ************* PARSING *****************

    /// Parse `input` as a request.
    ///
    /// At most `body_len` bytes following the header block become the body.
    /// With `body_len == 0` no body is captured. `Content-Length` is not
    /// consulted.
    pub fn parse_request(&mut self, input: &[u8], body_len: usize) -> Result<()> {
        self.ensure_empty()?;

        let inner = match parser::parse_request(input, body_len) {
            Ok(v) => v,
            Err(e) => {
                debug!("Parse request failed: {}", e);
                return Err(e);
            }
        };

        self.commit(inner);
        Ok(())
    }

    pub fn parse_response(&mut self, input: &[u8], body_len: usize) -> Result<()> {
        self.ensure_empty()?;

        let inner = match parser::parse_response(input, body_len) {
            Ok(v) => v,
            Err(e) => {
                debug!("Parse response failed: {}", e);
                return Err(e);
            }
        };

        self.commit(inner);
        Ok(())
    }

    // ************* OUTPUT *****************

    /// Serialize a request.
    ///
    /// With `dst` set to `None` only the exact output length is returned.
    /// Otherwise `dst` must be exactly that long and receives the bytes.
    ///
    /// `compat` selects `CRLF` line endings and `": "` between key and value.
    /// Without it lines end in a bare `LF` and fields are written `key:value`,
    /// unless the value starts with a space.
    pub fn output_request(&self, dst: Option<&mut [u8]>, compat: bool) -> Result<usize> {
        let inner = self.inner()?;

        let StartLine::Request {
            method,
            path,
            version,
        } = &inner.line
        else {
            return Err(Error::InvalidInstance);
        };

        output(dst, |out| {
            out.write_request_line(*method, path, *version, compat)?;
            inner.write_fields_and_body(out, compat)
        })
    }

    /// Serialize a response. `keep_desc` appends the reason phrase of the code.
    ///
    /// See [`Message::output_request`] for `dst` and `compat`.
    pub fn output_response(
        &self,
        dst: Option<&mut [u8]>,
        keep_desc: bool,
        compat: bool,
    ) -> Result<usize> {
        let inner = self.inner()?;

        let StartLine::Response { code, version } = &inner.line else {
            return Err(Error::InvalidInstance);
        };

        output(dst, |out| {
            out.write_status_line(*version, *code, keep_desc, compat)?;
            inner.write_fields_and_body(out, compat)
        })
    }

    pub fn to_request_bytes(&self, compat: bool) -> Result<Vec<u8>> {
        let len = self.output_request(None, compat)?;
        let mut buf = vec![0; len];
        self.output_request(Some(&mut buf), compat)?;
        Ok(buf)
    }

    pub fn to_response_bytes(&self, keep_desc: bool, compat: bool) -> Result<Vec<u8>> {
        let len = self.output_response(None, keep_desc, compat)?;
        let mut buf = vec![0; len];
        self.output_response(Some(&mut buf), keep_desc, compat)?;
        Ok(buf)
    }

    // ************* FIELDS *****************

    /// Append a field. Fails with [`Error::AlreadyPresent`] if the key exists.
    pub fn add_field(&mut self, field: Field) -> Result<()> {
        let inner = self.inner_mut()?;

        field.check()?;

        if inner.position(field.key()).is_some() {
            return Err(Error::AlreadyPresent);
        }

        inner.fields.push(field);
        Ok(())
    }

    /// Remove and return the field with `key`, keeping the order of the rest.
    pub fn remove_field(&mut self, key: &str) -> Result<Field> {
        let inner = self.inner_mut()?;
        let index = inner.position(key).ok_or(Error::NotFound)?;
        Ok(inner.fields.remove(index))
    }

    pub fn field(&self, key: &str) -> Result<&Field> {
        let inner = self.inner()?;
        let index = inner.position(key).ok_or(Error::NotFound)?;
        Ok(&inner.fields[index])
    }

    pub fn field_count(&self) -> Result<usize> {
        Ok(self.inner()?.fields.len())
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> Result<&[Field]> {
        Ok(&self.inner()?.fields)
    }

    // ************* ATTRIBUTES *****************

    pub fn method(&self) -> Result<Method> {
        match &self.inner()?.line {
            StartLine::Request { method, .. } => Ok(*method),
            StartLine::Response { .. } => Err(Error::InvalidInstance),
        }
    }

    pub fn path(&self) -> Result<&[u8]> {
        match &self.inner()?.line {
            StartLine::Request { path, .. } => Ok(path),
            StartLine::Response { .. } => Err(Error::InvalidInstance),
        }
    }

    /// The path as `&str`. [`Error::InvalidParameters`] if it is not utf-8.
    pub fn path_str(&self) -> Result<&str> {
        str::from_utf8(self.path()?).map_err(|_| Error::InvalidParameters)
    }

    pub fn version(&self) -> Result<HttpVersion> {
        match &self.inner()?.line {
            StartLine::Request { version, .. } | StartLine::Response { version, .. } => {
                Ok(*version)
            }
        }
    }

    pub fn code(&self) -> Result<StatusCode> {
        match &self.inner()?.line {
            StartLine::Response { code, .. } => Ok(*code),
            StartLine::Request { .. } => Err(Error::InvalidInstance),
        }
    }

    /// The body, [`Error::NoBody`] if none was ever set. A body set to zero
    /// length is returned as an empty slice.
    pub fn body(&self) -> Result<&[u8]> {
        self.inner()?.body.as_deref().ok_or(Error::NoBody)
    }

    pub fn set_method(&mut self, m: Method) -> Result<()> {
        match &mut self.inner_mut()?.line {
            StartLine::Request { method, .. } => *method = m,
            StartLine::Response { .. } => return Err(Error::InvalidInstance),
        }
        Ok(())
    }

    pub fn set_path(&mut self, p: impl AsRef<[u8]>) -> Result<()> {
        let StartLine::Request { path, .. } = &mut self.inner_mut()?.line else {
            return Err(Error::InvalidInstance);
        };

        let p = p.as_ref();
        check_path(p)?;

        path.clear();
        path.extend_from_slice(p);
        Ok(())
    }

    pub fn set_code(&mut self, c: u16) -> Result<()> {
        let StartLine::Response { code, .. } = &mut self.inner_mut()?.line else {
            return Err(Error::InvalidInstance);
        };
        *code = StatusCode::new(c)?;
        Ok(())
    }

    pub fn set_version(&mut self, v: HttpVersion) -> Result<()> {
        match &mut self.inner_mut()?.line {
            StartLine::Request { version, .. } | StartLine::Response { version, .. } => {
                *version = v
            }
        }
        Ok(())
    }

    /// Replace the body. Unlike the constructors an empty `body` is kept as a
    /// present, zero length body.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> Result<()> {
        self.inner_mut()?.body = Some(body.into());
        Ok(())
    }

    /// Remove the body, leaving the message without one.
    pub fn take_body(&mut self) -> Result<Vec<u8>> {
        self.inner_mut()?.body.take().ok_or(Error::NoBody)
    }
}

/// Measure, then write into `dst` when given.
fn output(dst: Option<&mut [u8]>, write: impl Fn(&mut Out) -> Result<()>) -> Result<usize> {
    let mut measure = Out::measure();
    write(&mut measure)?;
    let len = measure.len();

    let Some(dst) = dst else {
        return Ok(len);
    };

    if dst.len() != len {
        debug!("Output buffer is {} bytes, need exactly {}", dst.len(), len);
        return Err(Error::InvalidParameters);
    }

    let mut out = Out::wrap(dst);
    write(&mut out)?;
    debug_assert_eq!(out.len(), len);

    trace!("Output {} bytes", len);

    Ok(len)
}

/// A path must be a single non-empty request-line token.
fn check_path(path: &[u8]) -> Result<()> {
    if path.is_empty() || path.iter().any(|c| matches!(*c, SP | CR | LF)) {
        return Err(Error::InvalidParameters);
    }
    Ok(())
}

fn collect_fields(fields: impl IntoIterator<Item = Field>) -> Result<Vec<Field>> {
    let fields = fields.into_iter();
    let mut collected: Vec<Field> = Vec::with_capacity(fields.size_hint().0);

    for field in fields {
        field.check()?;

        if collected.iter().any(|f| f.key() == field.key()) {
            return Err(Error::AlreadyPresent);
        }

        collected.push(field);
    }

    Ok(collected)
}

fn initial_body(body: &[u8]) -> Option<Vec<u8>> {
    (!body.is_empty()).then(|| body.to_vec())
}

#[cfg(test)]
mod test {
    use super::*;

    fn request() -> Result<Message> {
        let mut m = Message::new();
        m.create_request(
            Method::Get,
            "/index.html",
            HttpVersion::Http11,
            [
                Field::new("Host", "example.org"),
                Field::new("User-Agent", "hypertext-Example"),
            ],
            b"",
        )?;
        Ok(m)
    }

    fn response() -> Result<Message> {
        let mut m = Message::new();
        m.create_response(
            200,
            HttpVersion::Http11,
            [
                Field::new("Content-Type", "text"),
                Field::new("Content-Length", "3"),
                Field::new("Connection", "close"),
            ],
            b"Hi!",
        )?;
        Ok(m)
    }

    #[test]
    fn new_is_empty() {
        let m = Message::new();
        assert_eq!(m.kind(), Kind::Empty);
        assert!(m.is_empty());
        assert_eq!(m.field_count(), Err(Error::InvalidInstance));
        assert_eq!(m.version(), Err(Error::InvalidInstance));
        assert_eq!(m.body(), Err(Error::InvalidInstance));
        assert_eq!(m, Message::default());
    }

    #[test]
    fn clear_is_idempotent() -> Result<()> {
        let mut m = Message::new();
        m.clear();
        assert_eq!(m, Message::new());

        let mut m = request()?;
        m.clear();
        assert_eq!(m.kind(), Kind::Empty);
        m.clear();
        assert_eq!(m, Message::new());

        // Reusable after clear.
        m.parse_response(b"HTTP/1.0 204\r\n\r\n", 0)?;
        assert_eq!(m.kind(), Kind::Response);
        Ok(())
    }

    #[test]
    fn create_request_scenario() -> Result<()> {
        let m = request()?;
        assert_eq!(m.kind(), Kind::Request);
        assert_eq!(m.method()?, Method::Get);
        assert_eq!(m.path()?, b"/index.html");
        assert_eq!(m.path_str()?, "/index.html");
        assert_eq!(m.version()?, HttpVersion::Http11);
        assert_eq!(m.field_count()?, 2);
        assert_eq!(m.body(), Err(Error::NoBody));
        assert_eq!(m.code(), Err(Error::InvalidInstance));

        let out = m.to_request_bytes(true)?;
        assert_eq!(
            out,
            b"GET /index.html HTTP/1.1\r\nHost: example.org\r\nUser-Agent: hypertext-Example\r\n\r\n"
        );
        Ok(())
    }

    #[test]
    fn create_response_scenario() -> Result<()> {
        let m = response()?;
        assert_eq!(m.kind(), Kind::Response);
        assert_eq!(m.code()?, StatusCode::OK);
        assert_eq!(m.method(), Err(Error::InvalidInstance));
        assert_eq!(m.path(), Err(Error::InvalidInstance));
        assert_eq!(m.body()?, b"Hi!");

        let out = m.to_response_bytes(true, true)?;
        assert_eq!(
            out,
            b"HTTP/1.1 200 OK\r\nContent-Type: text\r\nContent-Length: 3\r\nConnection: close\r\n\r\nHi!"
        );
        Ok(())
    }

    #[test]
    fn compact_output() -> Result<()> {
        let m = response()?;
        let out = m.to_response_bytes(false, false)?;
        assert_eq!(
            out,
            b"HTTP/1.1 200\nContent-Type:text\nContent-Length:3\nConnection:close\n\nHi!"
        );

        let m = request()?;
        let out = m.to_request_bytes(false)?;
        assert_eq!(
            out,
            b"GET /index.html HTTP/1.1\nHost:example.org\nUser-Agent:hypertext-Example\n\n"
        );
        Ok(())
    }

    #[test]
    fn second_initialization_fails_unchanged() -> Result<()> {
        let mut m = request()?;
        let before = m.clone();

        assert_eq!(
            m.create_response(200, HttpVersion::Http11, Vec::new(), b""),
            Err(Error::InvalidInstance)
        );
        assert_eq!(
            m.parse_request(b"GET / HTTP/1.1\r\n\r\n", 0),
            Err(Error::InvalidInstance)
        );
        assert_eq!(
            m.create_request(Method::Put, "/", HttpVersion::Http10, Vec::new(), b""),
            Err(Error::InvalidInstance)
        );

        assert_eq!(m, before);
        Ok(())
    }

    #[test]
    fn create_rejects_bad_parameters() {
        let mut m = Message::new();

        let r = m.create_request(Method::Get, "", HttpVersion::Http11, Vec::new(), b"");
        assert_eq!(r, Err(Error::InvalidParameters));

        let r = m.create_request(Method::Get, "/a b", HttpVersion::Http11, Vec::new(), b"");
        assert_eq!(r, Err(Error::InvalidParameters));

        let r = m.create_response(99, HttpVersion::Http11, Vec::new(), b"");
        assert_eq!(r, Err(Error::InvalidParameters));

        let r = m.create_response(600, HttpVersion::Http11, Vec::new(), b"");
        assert_eq!(r, Err(Error::InvalidParameters));

        let r = m.create_response(
            200,
            HttpVersion::Http11,
            [Field::new("Bad Key", "x")],
            b"",
        );
        assert_eq!(r, Err(Error::InvalidParameters));

        let r = m.create_response(
            200,
            HttpVersion::Http11,
            [Field::new("Dup", "1"), Field::new("Dup", "2")],
            b"",
        );
        assert_eq!(r, Err(Error::AlreadyPresent));

        assert_eq!(m.kind(), Kind::Empty);
    }

    #[test]
    fn failed_parse_leaves_message_empty() {
        let mut m = Message::new();

        // Start line is fine, header block is not.
        let r = m.parse_request(b"GET / HTTP/1.1\r\nHost example\r\n\r\n", 0);
        assert_eq!(r, Err(Error::InvalidParameters));
        assert_eq!(m.kind(), Kind::Empty);

        let r = m.parse_response(b"HTTP/1.1 200 OK\r\nA: b\r\n", 10);
        assert_eq!(r, Err(Error::InvalidParameters));
        assert_eq!(m, Message::new());
    }

    #[test]
    fn parse_folds_and_captures_body() -> Result<()> {
        let input = b"GET /index.html HTTP/1.0\r\nHost: www.example.org\r\n\
            User-Agent: hypertext-Example\r\nExample: test\r\nExample: test 2\r\n\r\n\
            This is an example body used to test the parser.";

        let mut m = Message::new();
        m.parse_request(input, 48)?;

        assert_eq!(m.version()?, HttpVersion::Http10);
        assert_eq!(m.field_count()?, 3);
        assert_eq!(m.field("Example")?.value_raw(), b"test, test 2");
        assert_eq!(
            m.body()?,
            &b"This is an example body used to test the parser."[..]
        );
        Ok(())
    }

    #[test]
    fn add_field_keeps_keys_unique() -> Result<()> {
        let mut m = request()?;

        m.add_field(Field::new("Accept", "*/*"))?;
        assert_eq!(m.field_count()?, 3);

        let before = m.clone();
        assert_eq!(
            m.add_field(Field::new("Accept", "text/html")),
            Err(Error::AlreadyPresent)
        );
        assert_eq!(
            m.add_field(Field::new("X-Bad", "a\r\nb")),
            Err(Error::InvalidParameters)
        );
        assert_eq!(m, before);

        // Keys are case sensitive.
        m.add_field(Field::new("accept", "text/html"))?;

        let keys: Vec<&str> = m.fields()?.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["Host", "User-Agent", "Accept", "accept"]);
        Ok(())
    }

    #[test]
    fn add_field_on_empty() {
        let mut m = Message::new();
        assert_eq!(
            m.add_field(Field::new("Host", "x")),
            Err(Error::InvalidInstance)
        );
        assert_eq!(m.remove_field("Host"), Err(Error::InvalidInstance));
    }

    #[test]
    fn remove_field_keeps_order() -> Result<()> {
        let mut m = response()?;

        let removed = m.remove_field("Content-Length")?;
        assert_eq!(removed.try_value(), Some("3"));

        assert_eq!(m.remove_field("Content-Length"), Err(Error::NotFound));
        assert_eq!(m.field("Content-Length"), Err(Error::NotFound));

        let keys: Vec<&str> = m.fields()?.iter().map(|f| f.key()).collect();
        assert_eq!(keys, ["Content-Type", "Connection"]);
        Ok(())
    }

    #[test]
    fn setters_check_kind_and_range() -> Result<()> {
        let mut req = request()?;
        let mut res = response()?;

        req.set_method(Method::Post)?;
        req.set_path("/upload")?;
        req.set_version(HttpVersion::Http10)?;
        assert_eq!(req.set_code(404), Err(Error::InvalidInstance));
        assert_eq!(req.set_path(""), Err(Error::InvalidParameters));
        assert_eq!(req.path()?, b"/upload");

        res.set_code(404)?;
        res.set_version(HttpVersion::Http10)?;
        assert_eq!(res.set_method(Method::Get), Err(Error::InvalidInstance));
        assert_eq!(res.set_path("/"), Err(Error::InvalidInstance));
        assert_eq!(res.set_code(700), Err(Error::InvalidParameters));
        assert_eq!(res.code()?.as_u16(), 404);

        let mut empty = Message::new();
        assert_eq!(empty.set_version(HttpVersion::Http11), Err(Error::InvalidInstance));
        assert_eq!(empty.set_body("x"), Err(Error::InvalidInstance));

        assert_eq!(
            req.to_request_bytes(true)?,
            b"POST /upload HTTP/1.0\r\nHost: example.org\r\nUser-Agent: hypertext-Example\r\n\r\n"
        );
        assert_eq!(
            res.to_response_bytes(true, true)?,
            b"HTTP/1.0 404 Not Found\r\nContent-Type: text\r\nContent-Length: 3\r\nConnection: close\r\n\r\nHi!"
        );
        Ok(())
    }

    #[test]
    fn empty_body_is_not_no_body() -> Result<()> {
        let mut m = request()?;
        assert_eq!(m.body(), Err(Error::NoBody));

        m.set_body(Vec::new())?;
        assert_eq!(m.body()?, b"");

        assert_eq!(m.take_body()?, b"");
        assert_eq!(m.body(), Err(Error::NoBody));
        assert_eq!(m.take_body(), Err(Error::NoBody));
        Ok(())
    }

    #[test]
    fn output_kind_mismatch() -> Result<()> {
        let req = request()?;
        let res = response()?;

        assert_eq!(req.output_response(None, true, true), Err(Error::InvalidInstance));
        assert_eq!(res.output_request(None, true), Err(Error::InvalidInstance));
        assert_eq!(Message::new().output_request(None, true), Err(Error::InvalidInstance));
        Ok(())
    }

    #[test]
    fn output_length_is_exact() -> Result<()> {
        let m = response()?;

        let len = m.output_response(None, true, true)?;
        let mut buf = vec![0; len];
        assert_eq!(m.output_response(Some(&mut buf), true, true)?, len);
        assert!(buf.ends_with(b"\r\n\r\nHi!"));

        let mut short = vec![0; len - 1];
        assert_eq!(
            m.output_response(Some(&mut short), true, true),
            Err(Error::InvalidParameters)
        );

        let mut long = vec![0; len + 1];
        assert_eq!(
            m.output_response(Some(&mut long), true, true),
            Err(Error::InvalidParameters)
        );
        Ok(())
    }

    #[test]
    fn request_round_trip_both_modes() -> Result<()> {
        let mut m = Message::new();
        m.create_request(
            Method::Put,
            "/items/7?x=1",
            HttpVersion::Http10,
            [
                Field::new("Host", "example.org"),
                Field::new("X-Padded", " padded"),
                Field::new("X-Empty", ""),
                Field::new("Content-Length", "4"),
            ],
            b"data",
        )?;

        for compat in [true, false] {
            let bytes = m.to_request_bytes(compat)?;

            let mut back = Message::new();
            back.parse_request(&bytes, 4)?;

            assert_eq!(back, m, "compat: {}", compat);
            assert_eq!(back.field("X-Padded")?.value_raw(), b" padded");
        }
        Ok(())
    }
}
