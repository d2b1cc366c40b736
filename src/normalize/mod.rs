//! Normalization of raw backend values.
//!
//! The bridge hands back loosely-typed values on both channels: a response may be a
//! JSON-encoded string or an already structured value, and a thrown error may be a
//! string or an object of any shape. These two normalizers turn both into stable forms
//! before anything else looks at them.

pub mod error;
pub mod response;

pub use error::normalize_error;
pub use response::normalize_response;
