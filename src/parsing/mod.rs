//! Free-text extraction.
//!
//! [`dates`] resolves date expressions and imposes per-category time
//! templates; [`request`] pulls the student identifier, category and window
//! out of a guardian's message.

pub mod dates;
pub mod request;

pub use dates::{expand_range, expand_window, resolve, resolve_absolute, resolve_relative};
pub use request::{ParsedRequest, parse};
