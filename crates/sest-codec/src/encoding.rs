use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Declared encoding of a channel slot.
///
/// Names outside the known set are kept verbatim in `Unknown` so that a bad
/// row in the schema table stays visible instead of being coerced into a
/// default. Decoding an `Unknown` slot always fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Encoding {
    Boolean,
    Int,
    Float,
    Unknown(String),
}

impl Encoding {
    /// The encodings a channel owner may pick from.
    pub const KNOWN: [Encoding; 3] = [Encoding::Boolean, Encoding::Int, Encoding::Float];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Float => "float",
            Self::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl FromStr for Encoding {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for Encoding {
    fn from(s: String) -> Self {
        match s.as_str() {
            "boolean" => Self::Boolean,
            "int" => Self::Int,
            "float" => Self::Float,
            _ => Self::Unknown(s),
        }
    }
}

impl From<&str> for Encoding {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        match encoding {
            Encoding::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
