use crate::details::GenericError;

pub type TraceResult<T> = std::result::Result<T, GenericError>;
