pub mod address;
pub mod classify;
pub mod dedup;
pub mod engine;
pub mod extract;
pub mod io;
pub mod mongo;
pub mod report;
pub mod stats;
pub mod store;

pub mod prelude {
    pub use crate::address::Address;
    pub use crate::classify::{Classification, classify};
    pub use crate::engine::{ScanEngine, ScanError, ScanOutcome};
    pub use crate::store::{InsertOutcome, MemoryStore, StoreError, StoreGateway};
}
