//! Purpose: Field-level checks for values entering the store from requests.
//! Exports: `ValidationIssue`, per-request issue collectors, and `ensure_valid`.
//! Role: Request-layer concern; `core::collection` itself never validates fields.
//! Invariants: Length limits count characters, not bytes.
//! Invariants: Every offending field is reported, not just the first.

use crate::core::error::{Error, ErrorKind};
use crate::core::record::Account;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const NAME_MAX_CHARS: usize = 50;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 15;
pub const CONTENT_MAX_CHARS: usize = 256;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Turns collected issues into a single `Usage` error naming each field.
pub fn ensure_valid(issues: Vec<ValidationIssue>) -> Result<(), Error> {
    if issues.is_empty() {
        return Ok(());
    }
    let detail = issues
        .iter()
        .map(|issue| format!("{}: {}", issue.field, issue.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(Error::new(ErrorKind::Usage)
        .with_message(format!("invalid request: {detail}"))
        .with_hint("Fix the listed fields and retry."))
}

pub fn account_issues(account: &Account) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_identifier(&mut issues, "user_id", &account.user_id);
    check_email(&mut issues, "email", &account.email);
    check_length(&mut issues, "first_name", &account.first_name, 1, NAME_MAX_CHARS);
    check_length(&mut issues, "last_name", &account.last_name, 1, NAME_MAX_CHARS);
    check_length(
        &mut issues,
        "password",
        &account.password,
        PASSWORD_MIN_CHARS,
        PASSWORD_MAX_CHARS,
    );
    if let Some(birth_date) = &account.birth_date {
        check_date(&mut issues, "birth_date", birth_date);
    }
    issues
}

pub fn profile_update_issues(first_name: &str, last_name: &str, email: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_length(&mut issues, "first_name", first_name, 1, NAME_MAX_CHARS);
    check_length(&mut issues, "last_name", last_name, 1, NAME_MAX_CHARS);
    check_email(&mut issues, "email", email);
    issues
}

pub fn post_issues(tweet_id: &str, content: &str, created_at: Option<&str>) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_identifier(&mut issues, "tweet_id", tweet_id);
    issues.extend(content_issues(content));
    if let Some(created_at) = created_at {
        check_timestamp(&mut issues, "created_at", created_at);
    }
    issues
}

pub fn login_issues(email: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_email(&mut issues, "login_email", email);
    issues
}

pub fn content_issues(content: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_length(&mut issues, "content", content, 1, CONTENT_MAX_CHARS);
    issues
}

fn check_identifier(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if uuid::Uuid::parse_str(value).is_err() {
        issues.push(ValidationIssue::new(field, "must be a UUID"));
    }
}

fn check_length(
    issues: &mut Vec<ValidationIssue>,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let count = value.chars().count();
    if count < min || count > max {
        issues.push(ValidationIssue::new(
            field,
            format!("must be {min} to {max} characters (got {count})"),
        ));
    }
}

fn check_email(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if !is_plausible_email(value) {
        issues.push(ValidationIssue::new(field, "must be an email address"));
    }
}

fn check_date(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if Date::parse(value, format_description!("[year]-[month]-[day]")).is_err() {
        issues.push(ValidationIssue::new(field, "must be a YYYY-MM-DD date"));
    }
}

fn check_timestamp(issues: &mut Vec<ValidationIssue>, field: &str, value: &str) {
    if OffsetDateTime::parse(value, &Rfc3339).is_err() {
        issues.push(ValidationIssue::new(field, "must be an RFC 3339 timestamp"));
    }
}

fn is_plausible_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
