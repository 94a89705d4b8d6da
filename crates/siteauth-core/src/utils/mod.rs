// Utility functions.

pub mod id;

pub use id::generate_id;
