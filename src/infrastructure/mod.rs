pub mod dto;
pub mod http_backend;
pub mod session_file;

pub use http_backend::HttpBackend;
pub use session_file::{FileSessionStore, MemorySessionStore};
