pub mod duckdb;
pub mod memory;
pub mod stdout;
pub mod traits;

pub use memory::MemoryStorage;
pub use stdout::StdoutSink;
pub use traits::{Sink, StorageError, WatermarkStore};
