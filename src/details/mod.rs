pub use generic_error::GenericError;
pub use trace_error::TraceError;
pub use trace_result::TraceResult;
pub(crate) use trace_orchestrator::{TraceOrchestrator, TraceSettings, MAX_TIMEOUT};

mod correlator;
mod decode_error;
mod generic_error;
mod hop_registry;
pub(crate) mod icmp;
pub(crate) mod records;
mod stats;
mod trace_error;
mod trace_orchestrator;
mod trace_result;
