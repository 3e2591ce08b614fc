//! Purpose: Long-lived owner of the accounts and posts collections under one data directory.
//! Exports: `Store`, request value types, and `CollectionReport`.
//! Role: The operations the HTTP server and CLI call; validates input, then delegates to `Collection`.
//! Invariants: The two collections are never locked together; no cross-collection transaction.
//! Invariants: Posts embed an owned author snapshot taken at publish time.
//! Invariants: Results expose `AccountProfile`, never `Account`.
#![allow(clippy::result_large_err)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::auth::{AuthOutcome, authenticate};
use super::validation::{
    account_issues, content_issues, ensure_valid, login_issues, post_issues,
    profile_update_issues,
};
use crate::core::collection::Collection;
use crate::core::error::{Error, ErrorKind};
use crate::core::record::{Account, AccountProfile, Post, Record};
use crate::data_paths::{accounts_path, default_data_dir, posts_path};

pub type ApiResult<T> = Result<T, Error>;

/// Signup request; `user_id` is generated when absent.
#[derive(Clone, Debug, Deserialize)]
pub struct NewAccount {
    #[serde(default)]
    pub user_id: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<String>,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct NewPost {
    pub tweet_id: Option<String>,
    pub content: String,
    pub created_at: Option<String>,
    pub author_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CollectionReport {
    pub kind: &'static str,
    pub path: PathBuf,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Store {
    data_dir: PathBuf,
    accounts: Collection<Account>,
    posts: Collection<Post>,
}

impl Store {
    /// Creates the data directory and any missing collection files, then opens them.
    pub fn init(data_dir: impl Into<PathBuf>) -> ApiResult<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to create data directory")
                .with_path(&data_dir)
                .with_source(err)
        })?;
        let accounts = Collection::create(accounts_path(&data_dir))?;
        let posts = Collection::create(posts_path(&data_dir))?;
        Ok(Self {
            data_dir,
            accounts,
            posts,
        })
    }

    pub fn open(data_dir: impl Into<PathBuf>) -> ApiResult<Self> {
        let data_dir = data_dir.into();
        let accounts = Collection::open(accounts_path(&data_dir))?;
        let posts = Collection::open(posts_path(&data_dir))?;
        Ok(Self {
            data_dir,
            accounts,
            posts,
        })
    }

    pub fn default_data_dir() -> PathBuf {
        default_data_dir()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn account_collection(&self) -> &Collection<Account> {
        &self.accounts
    }

    pub fn post_collection(&self) -> &Collection<Post> {
        &self.posts
    }

    pub fn signup(&self, request: NewAccount) -> ApiResult<AccountProfile> {
        let account = Account {
            user_id: request.user_id.unwrap_or_else(new_identifier),
            email: request.email,
            first_name: request.first_name,
            last_name: request.last_name,
            birth_date: request.birth_date,
            password: request.password,
        };
        ensure_valid(account_issues(&account))?;
        let stored = self.accounts.append(account)?;
        tracing::info!(user_id = %stored.user_id, "account registered");
        Ok(stored.profile())
    }

    pub fn login(&self, email: &str, password: &str) -> ApiResult<AuthOutcome> {
        ensure_valid(login_issues(email))?;
        authenticate(&self.accounts, email, password)
    }

    pub fn accounts(&self) -> ApiResult<Vec<AccountProfile>> {
        Ok(self
            .accounts
            .list()?
            .iter()
            .map(Account::profile)
            .collect())
    }

    pub fn account(&self, user_id: &str) -> ApiResult<AccountProfile> {
        Ok(self.accounts.find(user_id)?.profile())
    }

    pub fn update_account(&self, user_id: &str, update: AccountUpdate) -> ApiResult<AccountProfile> {
        ensure_valid(profile_update_issues(
            &update.first_name,
            &update.last_name,
            &update.email,
        ))?;
        let updated = self.accounts.replace(user_id, |account| {
            account.first_name = update.first_name;
            account.last_name = update.last_name;
            account.email = update.email;
        })?;
        Ok(updated.profile())
    }

    pub fn delete_account(&self, user_id: &str) -> ApiResult<AccountProfile> {
        let removed = self.accounts.remove(user_id)?;
        tracing::info!(user_id = %removed.user_id, "account deleted");
        Ok(removed.profile())
    }

    pub fn posts(&self) -> ApiResult<Vec<Post>> {
        self.posts.list()
    }

    pub fn post(&self, tweet_id: &str) -> ApiResult<Post> {
        self.posts.find(tweet_id)
    }

    /// Appends a post authored by `request.author_id`, embedding the author's current profile.
    pub fn publish(&self, request: NewPost) -> ApiResult<Post> {
        let tweet_id = request.tweet_id.unwrap_or_else(new_identifier);
        ensure_valid(post_issues(
            &tweet_id,
            &request.content,
            request.created_at.as_deref(),
        ))?;
        let author = self.accounts.find(&request.author_id)?.profile();
        let created_at = match request.created_at {
            Some(created_at) => created_at,
            None => now_timestamp()?,
        };
        self.posts.append(Post {
            tweet_id,
            content: request.content,
            created_at,
            updated_at: None,
            by: author,
        })
    }

    pub fn edit_post(&self, tweet_id: &str, content: String) -> ApiResult<Post> {
        ensure_valid(content_issues(&content))?;
        let updated_at = now_timestamp()?;
        self.posts.replace(tweet_id, |post| {
            post.content = content;
            post.updated_at = Some(updated_at);
        })
    }

    pub fn delete_post(&self, tweet_id: &str) -> ApiResult<Post> {
        self.posts.remove(tweet_id)
    }

    /// Checks that both collection files are readable and parse.
    pub fn doctor(data_dir: &Path) -> Vec<CollectionReport> {
        vec![
            collection_report::<Account>(accounts_path(data_dir)),
            collection_report::<Post>(posts_path(data_dir)),
        ]
    }
}

fn collection_report<R: Record>(path: PathBuf) -> CollectionReport {
    let result = Collection::<R>::open(&path).and_then(|collection| collection.list());
    match result {
        Ok(records) => CollectionReport {
            kind: R::KIND,
            path,
            ok: true,
            records: Some(records.len()),
            error: None,
        },
        Err(err) => CollectionReport {
            kind: R::KIND,
            path,
            ok: false,
            records: None,
            error: Some(err.to_string()),
        },
    }
}

fn new_identifier() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now_timestamp() -> ApiResult<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to format timestamp")
            .with_source(err)
    })
}
