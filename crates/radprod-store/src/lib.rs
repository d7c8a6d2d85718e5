pub mod error;
pub mod json;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use json::JsonStore;
pub use memory::{MemoryStore, StoreState};
pub use store::Store;
