//! Portal identity adapter.

mod static_tokens;

pub use static_tokens::StaticTokenIdentity;
