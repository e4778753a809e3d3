//! CAO and LIST order processing.

pub mod context;
pub mod processor;
pub mod progress;
pub mod result;

pub use context::OrderContext;
pub use processor::OrderProcessor;
pub use progress::{LogProgress, NoopProgress, OrderPhase, ProgressEvent, ProgressReporter};
pub use result::OrderResult;
