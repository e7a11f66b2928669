//! Checkpoint module
//!
//! Remembers, per exchange/pair, the close time of the last candle that was
//! emitted so collection resumes where it left off across restarts.

mod key;
mod store;

pub use key::CollectionKey;
pub use store::{CheckpointError, CheckpointStore};
