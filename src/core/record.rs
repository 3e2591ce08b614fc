// Account and post record types plus the `Record` contract the collection store relies on.
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Text written for absent optional values by older collection files.
const LEGACY_NONE: &str = "None";

/// A record kind that can live in a [`Collection`](crate::core::collection::Collection).
///
/// Identifiers and lookup fields are exposed as text so the store can compare
/// them without knowing the concrete type.
pub trait Record: Serialize + DeserializeOwned + Clone + Send {
    /// Collection label used in logs and error messages.
    const KIND: &'static str;
    /// JSON field holding the identifier.
    const ID_FIELD: &'static str;

    fn id(&self) -> &str;

    /// Text value of a named field, or `None` when the field is unknown or absent.
    fn field(&self, name: &str) -> Option<&str>;

    /// Fields besides the identifier whose values must be unique within the collection.
    fn unique_fields(&self) -> Vec<(&'static str, &str)> {
        Vec::new()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "legacy_optional")]
    pub birth_date: Option<String>,
    pub password: String,
}

impl Account {
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            birth_date: self.birth_date.clone(),
        }
    }

    // Plaintext, byte-for-byte comparison. See DESIGN.md on credential hashing.
    pub fn password_matches(&self, candidate: &str) -> bool {
        self.password.as_bytes() == candidate.as_bytes()
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("birth_date", &self.birth_date)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Record for Account {
    const KIND: &'static str = "accounts";
    const ID_FIELD: &'static str = "user_id";

    fn id(&self) -> &str {
        &self.user_id
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "user_id" => Some(&self.user_id),
            "email" => Some(&self.email),
            "first_name" => Some(&self.first_name),
            "last_name" => Some(&self.last_name),
            "birth_date" => self.birth_date.as_deref(),
            _ => None,
        }
    }

    fn unique_fields(&self) -> Vec<(&'static str, &str)> {
        vec![("email", self.email.as_str())]
    }
}

/// Public projection of an [`Account`]; never carries the password.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, deserialize_with = "legacy_optional")]
    pub birth_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub tweet_id: String,
    pub content: String,
    pub created_at: String,
    #[serde(default, deserialize_with = "legacy_optional")]
    pub updated_at: Option<String>,
    /// Author as they were when the post was created.
    pub by: AccountProfile,
}

impl Record for Post {
    const KIND: &'static str = "posts";
    const ID_FIELD: &'static str = "tweet_id";

    fn id(&self) -> &str {
        &self.tweet_id
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "tweet_id" => Some(&self.tweet_id),
            "content" => Some(&self.content),
            "created_at" => Some(&self.created_at),
            "updated_at" => self.updated_at.as_deref(),
            "by.user_id" => Some(&self.by.user_id),
            "by.email" => Some(&self.by.email),
            _ => None,
        }
    }
}

fn legacy_optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|text| text != LEGACY_NONE))
}
