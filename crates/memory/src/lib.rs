//! Memory collaborator implementations for Wayfarer.

pub mod file_backend;
pub mod in_memory;
pub mod noop;
mod rank;

pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use noop::NoopStore;
pub use rank::rank;
