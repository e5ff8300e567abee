// nurture-api: Async Rust clients for the nurture hosted backend and AI service

pub mod ai;
pub mod backend;
pub mod error;
pub mod transport;

pub use ai::{Completion, GenerativeClient, TokenUsage};
pub use backend::BackendClient;
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
