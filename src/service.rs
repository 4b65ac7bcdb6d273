use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::models::*;
use crate::session::Session;

/// Handle to the remote forum service.
///
/// Reads are anonymous queries; mutations run as the given session.
#[async_trait]
pub trait ForumService: Send + Sync {
    async fn get_categories(&self) -> ServiceResult<Vec<Category>>;
    async fn get_topics(&self, category_id: Id) -> ServiceResult<Vec<Topic>>;
    async fn get_topic(&self, topic_id: Id) -> ServiceResult<Option<Topic>>;
    async fn get_replies(&self, topic_id: Id) -> ServiceResult<Vec<Reply>>;
    async fn create_category(&self, session: &Session, name: &str, icon: &str) -> ServiceResult<MutationResult>;
    async fn create_topic(&self, session: &Session, category_id: Id, title: &str, content: &str) -> ServiceResult<MutationResult>;
    async fn create_reply(&self, session: &Session, topic_id: Id, content: &str, parent_id: Option<Id>) -> ServiceResult<MutationResult>;
}

pub mod http {
    use super::*;
    use serde::de::DeserializeOwned;
    use serde_json::{json, Value};

    use crate::error::ServiceError;
    use crate::wire::{self, SCHEMA_HEADER, SCHEMA_VERSION};

    #[derive(Clone, Copy)]
    enum CallKind {
        Query,
        Update,
    }

    impl CallKind {
        fn path(self) -> &'static str {
            match self {
                CallKind::Query => "query",
                CallKind::Update => "update",
            }
        }
    }

    /// JSON gateway client: `POST {base}/{query|update}/{method}` with
    /// `{"args": [...]}`.
    #[derive(Clone)]
    pub struct HttpForumService {
        client: reqwest::Client,
        base: String,
    }

    impl HttpForumService {
        pub fn new(base: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                base: base.into().trim_end_matches('/').to_string(),
            }
        }

        async fn call(&self, kind: CallKind, method: &'static str, args: Value, bearer: Option<&str>) -> ServiceResult<Value> {
            let mut req = self
                .client
                .post(format!("{}/{}/{}", self.base, kind.path(), method))
                .header(SCHEMA_HEADER, SCHEMA_VERSION)
                .json(&json!({ "args": args }));
            if let Some(token) = bearer {
                req = req.bearer_auth(token);
            }
            let result = async {
                let resp = req.send().await?.error_for_status()?;
                Ok::<_, ServiceError>(resp.json::<Value>().await?)
            }
            .await;
            let outcome = match &result {
                Ok(_) => "ok",
                Err(e) => {
                    log::warn!("{method} failed: {e}");
                    "error"
                }
            };
            metrics::increment_counter!("forum_remote_calls_total", "method" => method, "outcome" => outcome);
            result
        }

        async fn query<T: DeserializeOwned>(&self, method: &'static str, args: Value) -> ServiceResult<T> {
            let v = self.call(CallKind::Query, method, args, None).await?;
            Ok(serde_json::from_value(v)?)
        }

        async fn update(&self, session: &Session, method: &'static str, args: Value) -> ServiceResult<MutationResult> {
            let v = self.call(CallKind::Update, method, args, session.bearer()).await?;
            Ok(serde_json::from_value(v)?)
        }
    }

    #[async_trait]
    impl ForumService for HttpForumService {
        async fn get_categories(&self) -> ServiceResult<Vec<Category>> {
            self.query("getCategories", json!([])).await
        }

        async fn get_topics(&self, category_id: Id) -> ServiceResult<Vec<Topic>> {
            self.query("getTopics", json!([category_id])).await
        }

        async fn get_topic(&self, topic_id: Id) -> ServiceResult<Option<Topic>> {
            let v = self.call(CallKind::Query, "getTopic", json!([topic_id]), None).await?;
            Ok(wire::decode_opt(v)?)
        }

        async fn get_replies(&self, topic_id: Id) -> ServiceResult<Vec<Reply>> {
            self.query("getReplies", json!([topic_id])).await
        }

        async fn create_category(&self, session: &Session, name: &str, icon: &str) -> ServiceResult<MutationResult> {
            self.update(session, "createCategory", json!([name, icon])).await
        }

        async fn create_topic(&self, session: &Session, category_id: Id, title: &str, content: &str) -> ServiceResult<MutationResult> {
            self.update(session, "createTopic", json!([category_id, title, content])).await
        }

        async fn create_reply(&self, session: &Session, topic_id: Id, content: &str, parent_id: Option<Id>) -> ServiceResult<MutationResult> {
            self.update(session, "createReply", json!([topic_id, content, wire::opt_arg(parent_id)])).await
        }
    }
}

/// In-process service honouring the same contract, for local runs and tests.
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

    use chrono::Utc;

    use crate::wire::Timestamp;

    const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
        ("General", "chat"),
        ("Exploits", "bug"),
        ("Tooling", "terminal"),
    ];

    #[derive(Default)]
    struct State {
        categories: BTreeMap<Id, Category>,
        topics: BTreeMap<Id, Topic>,
        replies: BTreeMap<Id, Reply>,
        last_category: Id,
        last_topic: Id,
        last_reply: Id,
    }

    #[derive(Clone, Default)]
    pub struct MemoryForum {
        state: Arc<RwLock<State>>,
    }

    impl MemoryForum {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_default_categories() -> Self {
            let forum = Self::new();
            {
                let mut s = forum.write();
                for (name, icon) in DEFAULT_CATEGORIES {
                    s.last_category += 1;
                    let id = s.last_category;
                    s.categories.insert(id, Category { id, name: name.to_string(), icon: icon.to_string() });
                }
            }
            forum
        }

        fn read(&self) -> RwLockReadGuard<'_, State> {
            self.state.read().unwrap_or_else(PoisonError::into_inner)
        }

        fn write(&self) -> RwLockWriteGuard<'_, State> {
            self.state.write().unwrap_or_else(PoisonError::into_inner)
        }

        fn now() -> Timestamp {
            Utc::now()
                .timestamp_nanos_opt()
                .map(|n| Timestamp::from_nanos(n.into()))
                .unwrap_or_else(Timestamp::invalid)
        }
    }

    fn rejected(msg: &str) -> ServiceResult<MutationResult> {
        Ok(MutationResult::Err(msg.to_string()))
    }

    #[async_trait]
    impl ForumService for MemoryForum {
        async fn get_categories(&self) -> ServiceResult<Vec<Category>> {
            Ok(self.read().categories.values().cloned().collect())
        }

        async fn get_topics(&self, category_id: Id) -> ServiceResult<Vec<Topic>> {
            let s = self.read();
            Ok(s.topics.values().filter(|t| t.category_id == category_id).cloned().collect())
        }

        async fn get_topic(&self, topic_id: Id) -> ServiceResult<Option<Topic>> {
            Ok(self.read().topics.get(&topic_id).cloned())
        }

        async fn get_replies(&self, topic_id: Id) -> ServiceResult<Vec<Reply>> {
            let s = self.read();
            Ok(s.replies.values().filter(|r| r.topic_id == topic_id).cloned().collect())
        }

        async fn create_category(&self, _session: &Session, name: &str, icon: &str) -> ServiceResult<MutationResult> {
            if name.trim().is_empty() {
                return rejected("Category name cannot be empty");
            }
            let mut s = self.write();
            s.last_category += 1;
            let id = s.last_category;
            s.categories.insert(id, Category { id, name: name.to_string(), icon: icon.to_string() });
            Ok(MutationResult::Ok(id))
        }

        async fn create_topic(&self, session: &Session, category_id: Id, title: &str, content: &str) -> ServiceResult<MutationResult> {
            if title.trim().is_empty() || content.trim().is_empty() {
                return rejected("Title and content are required");
            }
            let mut s = self.write();
            if !s.categories.contains_key(&category_id) {
                return rejected("Category not found");
            }
            s.last_topic += 1;
            let id = s.last_topic;
            s.topics.insert(id, Topic {
                id,
                category_id,
                title: title.to_string(),
                content: content.to_string(),
                author: session.principal().to_string(),
                created_at: Self::now(),
            });
            Ok(MutationResult::Ok(id))
        }

        async fn create_reply(&self, session: &Session, topic_id: Id, content: &str, parent_id: Option<Id>) -> ServiceResult<MutationResult> {
            if content.trim().is_empty() {
                return rejected("Reply cannot be empty");
            }
            let mut s = self.write();
            if !s.topics.contains_key(&topic_id) {
                return rejected("Topic not found");
            }
            if let Some(parent) = parent_id {
                if !s.replies.get(&parent).is_some_and(|p| p.topic_id == topic_id) {
                    return rejected("Parent reply not found in this topic");
                }
            }
            s.last_reply += 1;
            let id = s.last_reply;
            s.replies.insert(id, Reply {
                id,
                topic_id,
                content: content.to_string(),
                author: session.principal().to_string(),
                parent_id,
                created_at: Self::now(),
            });
            Ok(MutationResult::Ok(id))
        }
    }
}
