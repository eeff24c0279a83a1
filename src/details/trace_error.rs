use std::{error::Error, fmt};

#[derive(Debug)]
pub struct TraceError {
    pub message: String,
}

impl TraceError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        TraceError { message: message.into() }
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "TraceError")?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl Error for TraceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl From<std::io::Error> for TraceError {
    fn from(error: std::io::Error) -> TraceError {
        TraceError { message: error.to_string() }
    }
}
