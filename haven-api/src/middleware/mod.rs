pub mod trace;

pub use trace::{trace_context_middleware, Caller, InboundTrace, TRACE_ID_HEADER};
