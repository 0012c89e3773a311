pub mod document;
pub mod event;
pub mod frame;
pub mod report;
pub mod value;

// Re-export commonly used types
pub use document::{DocumentKind, IndexRequest, TraceDocument};
pub use event::{EventKind, TraceEvent};
pub use frame::FrameId;
pub use report::ExecutionReport;
pub use value::TraceValue;
