pub mod chunker;
pub mod config;
pub mod corpus;
pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use chunker::generate_all_chunks;
pub use error::{Error, Result};
