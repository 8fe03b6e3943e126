//! Sest field codec
//!
//! Every channel slot declares an encoding. Values arrive as text, are stored
//! as text, and are only turned into typed values when somebody reads them:
//!
//! - `parse` validates and normalizes a submitted value at write time
//! - `store_raw` keeps a value verbatim when it could not be validated
//! - `decode` turns stored text back into a `TypedValue` at read time
//!
//! An encoding name outside the known set is carried as `Encoding::Unknown`
//! and can never be decoded.

pub mod codec;
pub mod encoding;
pub mod error;

pub use codec::{StoredValue, TypedValue, decode, parse, store_raw};
pub use encoding::Encoding;
pub use error::{DecodeError, ParseError};
