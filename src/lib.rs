//! no_std http 1.x message model, parser and serializer.
//!
//! A [`Message`] starts out empty and becomes either a request or a response,
//! by construction or by parsing bytes. Fields and attributes can then be read
//! and changed, and the message written back out as bytes.
//!
//! Parsing is all or nothing. A failed parse leaves the message empty.

// For tests we use std.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

mod out;
mod util;

mod error;
pub use error::{Error, Result};

mod types;
pub use types::{HttpVersion, Kind, Method};

mod status;
pub use status::StatusCode;

mod field;
pub use field::Field;

mod parser;

mod message;
pub use message::Message;
