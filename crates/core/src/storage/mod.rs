//! Object store clients.

pub mod firebase;
pub mod memory;

pub use firebase::FirebaseStorageClient;
pub use memory::{MemoryObjectStore, StorageOp};
