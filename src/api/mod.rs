//! Purpose: Define the public Rust API boundary for chirp.
//! Exports: Store facade, authentication outcome, validation helpers, and core types.
//! Role: Surface used by the CLI, the HTTP server, and integration tests.
//! Invariants: Request-level operations go through `Store`; raw `Collection` access stays available for tools.

mod auth;
mod store;
mod validation;

pub use crate::core::collection::Collection;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::record::{Account, AccountProfile, Post, Record};
pub use auth::{AuthOutcome, authenticate};
pub use store::{AccountUpdate, ApiResult, CollectionReport, NewAccount, NewPost, Store};
pub use validation::{
    CONTENT_MAX_CHARS, NAME_MAX_CHARS, PASSWORD_MAX_CHARS, PASSWORD_MIN_CHARS, ValidationIssue,
    account_issues, content_issues, ensure_valid, login_issues, post_issues, profile_update_issues,
};
