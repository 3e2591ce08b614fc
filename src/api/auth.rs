//! Purpose: Classify a login attempt against the accounts collection.
//! Exports: `AuthOutcome`, `authenticate`.
//! Role: Pure composition over `Collection::find_by_field`; not a store operation.
//! Invariants: Exactly three outcomes; wrong password and unknown email stay distinct.
//! Invariants: Storage failures propagate as `Err`, never as `NoSuchAccount`.

use crate::core::collection::Collection;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Account, AccountProfile};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(Account),
    WrongPassword,
    NoSuchAccount,
}

impl AuthOutcome {
    /// Public result of the attempt: the profile, or an error whose kind tells the two failures apart.
    pub fn into_profile(self) -> Result<AccountProfile, Error> {
        match self {
            AuthOutcome::Authenticated(account) => Ok(account.profile()),
            AuthOutcome::WrongPassword => {
                Err(Error::new(ErrorKind::WrongPassword).with_message("the password is incorrect"))
            }
            AuthOutcome::NoSuchAccount => {
                Err(Error::new(ErrorKind::NotFound).with_message("this user does not exist"))
            }
        }
    }
}

pub fn authenticate(
    accounts: &Collection<Account>,
    email: &str,
    password: &str,
) -> Result<AuthOutcome, Error> {
    let account = match accounts.find_by_field("email", email) {
        Ok(account) => account,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(AuthOutcome::NoSuchAccount),
        Err(err) => return Err(err),
    };
    if account.password_matches(password) {
        tracing::debug!(user_id = %account.user_id, "login accepted");
        Ok(AuthOutcome::Authenticated(account))
    } else {
        tracing::debug!(user_id = %account.user_id, "login rejected: wrong password");
        Ok(AuthOutcome::WrongPassword)
    }
}
