use serde::{Deserialize, Serialize};

use crate::wire::{self, Timestamp};

// Schema version 1: author is the principal's text form.
pub type Id = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(with = "wire::nat")]
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(with = "wire::nat")]
    pub id: Id,
    #[serde(with = "wire::nat")]
    pub category_id: Id,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(with = "wire::nat")]
    pub id: Id,
    #[serde(with = "wire::nat")]
    pub topic_id: Id,
    pub content: String,
    pub author: String,
    #[serde(default, with = "wire::opt_nat")]
    pub parent_id: Option<Id>, // threading is carried but never composed
    pub created_at: Timestamp,
}

/// Outcome of a mutation: the new record's id or the service's message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationResult {
    Ok(#[serde(with = "wire::nat")] Id),
    Err(String),
}
