#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use forum_client::error::{ServiceError, ServiceResult};
use forum_client::models::*;
use forum_client::service::{memory::MemoryForum, ForumService};
use forum_client::session::{DisabledIdentityProvider, IdentityProvider, Session};
use forum_client::ForumClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetCategories,
    GetTopics(Id),
    GetTopic(Id),
    GetReplies(Id),
    CreateCategory(String, String),
    CreateTopic(Id, String, String),
    CreateReply(Id, String, Option<Id>),
}

/// Memory service that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingForum {
    pub inner: MemoryForum,
    calls: Mutex<Vec<Call>>,
    pub fail_reads: AtomicBool,
    pub fail_mutations: AtomicBool,
}

impl RecordingForum {
    pub async fn with_category(name: &str) -> Arc<Self> {
        let forum = Arc::new(Self::default());
        forum.inner.create_category(&Session::Anonymous, name, "chat").await.unwrap();
        forum
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn read_guard(&self) -> ServiceResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) { Err(ServiceError::Status(503)) } else { Ok(()) }
    }

    fn mutation_guard(&self) -> ServiceResult<()> {
        if self.fail_mutations.load(Ordering::SeqCst) { Err(ServiceError::Transport("connection refused".into())) } else { Ok(()) }
    }
}

#[async_trait]
impl ForumService for RecordingForum {
    async fn get_categories(&self) -> ServiceResult<Vec<Category>> {
        self.record(Call::GetCategories);
        self.read_guard()?;
        self.inner.get_categories().await
    }
    async fn get_topics(&self, category_id: Id) -> ServiceResult<Vec<Topic>> {
        self.record(Call::GetTopics(category_id));
        self.read_guard()?;
        self.inner.get_topics(category_id).await
    }
    async fn get_topic(&self, topic_id: Id) -> ServiceResult<Option<Topic>> {
        self.record(Call::GetTopic(topic_id));
        self.read_guard()?;
        self.inner.get_topic(topic_id).await
    }
    async fn get_replies(&self, topic_id: Id) -> ServiceResult<Vec<Reply>> {
        self.record(Call::GetReplies(topic_id));
        self.read_guard()?;
        self.inner.get_replies(topic_id).await
    }
    async fn create_category(&self, session: &Session, name: &str, icon: &str) -> ServiceResult<MutationResult> {
        self.record(Call::CreateCategory(name.into(), icon.into()));
        self.mutation_guard()?;
        self.inner.create_category(session, name, icon).await
    }
    async fn create_topic(&self, session: &Session, category_id: Id, title: &str, content: &str) -> ServiceResult<MutationResult> {
        self.record(Call::CreateTopic(category_id, title.into(), content.into()));
        self.mutation_guard()?;
        self.inner.create_topic(session, category_id, title, content).await
    }
    async fn create_reply(&self, session: &Session, topic_id: Id, content: &str, parent_id: Option<Id>) -> ServiceResult<MutationResult> {
        self.record(Call::CreateReply(topic_id, content.into(), parent_id));
        self.mutation_guard()?;
        self.inner.create_reply(session, topic_id, content, parent_id).await
    }
}

pub fn client_with(service: Arc<dyn ForumService>, identity: Arc<dyn IdentityProvider>) -> ForumClient {
    ForumClient::new(service, identity, "http://127.0.0.1:8080", Duration::from_secs(5))
}

pub fn anonymous_client(service: Arc<dyn ForumService>) -> ForumClient {
    client_with(service, Arc::new(DisabledIdentityProvider))
}
