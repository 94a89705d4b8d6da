// siteauth-memory: in-memory storage adapter.
//
// Data lives only as long as the adapter. Suitable for development and tests,
// not for production.

pub mod adapter;
pub mod store;

pub use adapter::MemoryAdapter;
pub use store::MemoryStore;
