#![warn(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub use details::{GenericError, TraceError, TraceResult};
pub use hop_summary::HopSummary;
pub use host_name_resolver::*;
pub use trace_event::*;
pub use trace_fox::*;

mod details;
mod hop_summary;
mod host_name_resolver;
mod trace_event;
mod trace_fox;
