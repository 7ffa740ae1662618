//! Credential Persistence Adapters
//!
//! Two `CredentialStore` backends: an in-memory map for tests and
//! single-node ephemeral deployments, and a Turso (SQLite) database for
//! durable records. Both seal sensitive fields through the same codec, so
//! a record never touches either backend in plaintext.

mod memory;
mod turso;

pub use memory::InMemoryCredentialStore;
pub use turso::TursoCredentialStore;
