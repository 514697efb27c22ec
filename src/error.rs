use thiserror::Error;

/// Outcome of a failed operation on a [`Message`][crate::Message].
///
/// A failed call never leaves the message half-modified.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The message kind does not fit the operation, or the message was
    /// already initialized by a previous create/parse.
    #[error("message kind does not allow this operation")]
    InvalidInstance,

    /// Malformed wire input, an empty or out of range argument, or an
    /// output buffer that is not exactly the required length.
    #[error("invalid parameters or malformed input")]
    InvalidParameters,

    /// The method token is not one of the known methods.
    #[error("unsupported http method")]
    InvalidMethod,

    /// The version token is neither `1.0` nor `1.1`.
    #[error("unsupported http version")]
    InvalidVersion,

    /// No field has the requested key.
    #[error("header field not found")]
    NotFound,

    /// A field with the same key is already in the message.
    #[error("header field already present")]
    AlreadyPresent,

    /// The message was never given a body.
    #[error("message has no body")]
    NoBody,
}

pub type Result<T, E = Error> = core::result::Result<T, E>;

pub(crate) static INVALID: Result<()> = Err(Error::InvalidParameters);
