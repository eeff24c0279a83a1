use std::{error::Error, fmt};

/// Why a received datagram could not be decoded into a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DecodeError {
    TooShort { len: usize },
    Malformed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            DecodeError::TooShort { len } => write!(f, "too short: {len} bytes"),
            DecodeError::Malformed(message) => write!(f, "malformed: {message}"),
        }
    }
}

impl Error for DecodeError {}
