//! Purpose: Library crate behind the `chirp` CLI and HTTP server.
//! Exports: `core` (collection store, records, errors) and `api` (store facade, auth, validation).
//! Role: Binaries and tests go through `api`; `core` stays usable on its own for isolated collections.
//! Invariants: Every collection mutation is a locked read-modify-write with an atomic file replace.
//! Invariants: Public results carry `AccountProfile`, never a password.
pub mod api;
pub mod core;
mod data_paths;
