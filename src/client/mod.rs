pub mod error;
pub mod fetch;
pub mod traits;
pub mod types;

pub use error::ClientError;
pub use fetch::{ClientConfig, FetchClient};
pub use traits::{Backoff, PageSource, TokioBackoff};
pub use types::{Cursor, Page, PageRequest, TimeWindow};
