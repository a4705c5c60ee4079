//! Built-in stage implementations.

pub mod passthrough;
pub mod stride;
pub mod synthetic;
pub mod writer;

pub use passthrough::Passthrough;
pub use stride::Stride;
pub use synthetic::SyntheticReader;
pub use writer::{NullWriter, TraceWriter};
