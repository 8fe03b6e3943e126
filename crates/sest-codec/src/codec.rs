use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;
use crate::error::{DecodeError, ParseError};

const TRUE_SPELLINGS: [&str; 6] = ["true", "t", "yes", "y", "on", "1"];
const FALSE_SPELLINGS: [&str; 6] = ["false", "f", "no", "n", "off", "0"];

/// Text representation of a field as it sits in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredValue(String);

impl StoredValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for StoredValue {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StoredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A decoded field value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    Boolean(bool),
    Int(i64),
    Float(f64),
}

/// Keep a value exactly as submitted. Never fails.
pub fn store_raw(raw: &str) -> StoredValue {
    StoredValue(raw.to_string())
}

/// Validate `raw` against `encoding` and return its normalized stored form.
///
/// Numbers keep their literal text (trimmed) so no precision is lost.
/// Booleans are normalized to `true`/`false`. An `Unknown` encoding cannot
/// be checked here, so the value is stored verbatim; the failure surfaces
/// from `decode` instead.
pub fn parse(encoding: &Encoding, raw: &str) -> Result<StoredValue, ParseError> {
    let trimmed = raw.trim();
    match encoding {
        Encoding::Float => {
            parse_float(trimmed)?;
            Ok(StoredValue(trimmed.to_string()))
        }
        Encoding::Int => {
            parse_int(trimmed)?;
            Ok(StoredValue(trimmed.to_string()))
        }
        Encoding::Boolean => {
            let value = parse_bool(trimmed)?;
            Ok(StoredValue(value.to_string()))
        }
        Encoding::Unknown(_) => Ok(store_raw(raw)),
    }
}

/// Interpret a stored value under `encoding`.
pub fn decode(encoding: &Encoding, stored: &StoredValue) -> Result<TypedValue, DecodeError> {
    let text = stored.as_str().trim();
    let value = match encoding {
        Encoding::Float => TypedValue::Float(parse_float(text)?),
        Encoding::Int => TypedValue::Int(parse_int(text)?),
        Encoding::Boolean => TypedValue::Boolean(parse_bool(text)?),
        Encoding::Unknown(name) => {
            return Err(DecodeError::UnsupportedEncoding {
                encoding: name.clone(),
            });
        }
    };
    Ok(value)
}

fn parse_float(text: &str) -> Result<f64, ParseError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::NotNumeric {
            value: text.to_string(),
        })
}

fn parse_int(text: &str) -> Result<i64, ParseError> {
    text.parse::<i64>().map_err(|_| ParseError::NotInteger {
        value: text.to_string(),
    })
}

fn parse_bool(text: &str) -> Result<bool, ParseError> {
    let lower = text.to_ascii_lowercase();
    if TRUE_SPELLINGS.contains(&lower.as_str()) {
        Ok(true)
    } else if FALSE_SPELLINGS.contains(&lower.as_str()) {
        Ok(false)
    } else {
        Err(ParseError::NotBoolean {
            value: text.to_string(),
        })
    }
}
