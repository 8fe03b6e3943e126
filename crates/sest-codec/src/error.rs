use thiserror::Error;

/// A submitted value does not fit its slot's encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("'{value}' is not a number")]
    NotNumeric { value: String },

    #[error("'{value}' is not an integer")]
    NotInteger { value: String },

    #[error("'{value}' is not a boolean")]
    NotBoolean { value: String },
}

/// A stored value cannot be turned into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The slot's encoding is not one the codec knows. This points at a bad
    /// schema row, not at bad user input.
    #[error("unsupported encoding '{encoding}'")]
    UnsupportedEncoding { encoding: String },

    /// The slot has no encoding row at all.
    #[error("no encoding declared for field {field_no}")]
    MissingEncoding { field_no: u32 },

    #[error("stored value is invalid: {0}")]
    InvalidValue(#[from] ParseError),
}

impl DecodeError {
    /// Short machine-readable tag, used in API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedEncoding { .. } => "unsupported_encoding",
            Self::MissingEncoding { .. } => "missing_encoding",
            Self::InvalidValue(_) => "invalid_value",
        }
    }

    /// True when the failure comes from the channel schema rather than from
    /// the stored value itself.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedEncoding { .. } | Self::MissingEncoding { .. }
        )
    }
}
