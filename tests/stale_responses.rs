mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::anonymous_client;
use forum_client::error::ServiceResult;
use forum_client::models::*;
use forum_client::service::{memory::MemoryForum, ForumService};
use forum_client::session::Session;
use forum_client::views::TopicDraft;
use tokio::sync::Notify;

/// While armed, holds the next read for `slow_id` until the gate opens.
struct GatedForum {
    inner: MemoryForum,
    slow_id: Id,
    armed: AtomicBool,
    gate: Notify,
}

impl GatedForum {
    async fn hold(&self, id: Id) {
        if id == self.slow_id && self.armed.swap(false, Ordering::SeqCst) {
            self.gate.notified().await;
        }
    }
}

#[async_trait]
impl ForumService for GatedForum {
    async fn get_categories(&self) -> ServiceResult<Vec<Category>> { self.inner.get_categories().await }
    async fn get_topics(&self, category_id: Id) -> ServiceResult<Vec<Topic>> {
        self.hold(category_id).await;
        self.inner.get_topics(category_id).await
    }
    async fn get_topic(&self, topic_id: Id) -> ServiceResult<Option<Topic>> {
        self.hold(topic_id).await;
        self.inner.get_topic(topic_id).await
    }
    async fn get_replies(&self, topic_id: Id) -> ServiceResult<Vec<Reply>> { self.inner.get_replies(topic_id).await }
    async fn create_category(&self, s: &Session, name: &str, icon: &str) -> ServiceResult<MutationResult> { self.inner.create_category(s, name, icon).await }
    async fn create_topic(&self, s: &Session, c: Id, title: &str, content: &str) -> ServiceResult<MutationResult> { self.inner.create_topic(s, c, title, content).await }
    async fn create_reply(&self, s: &Session, t: Id, content: &str, p: Option<Id>) -> ServiceResult<MutationResult> { self.inner.create_reply(s, t, content, p).await }
}

async fn gated_forum() -> Arc<GatedForum> {
    let forum = Arc::new(GatedForum {
        inner: MemoryForum::new(),
        slow_id: 1,
        armed: AtomicBool::new(true),
        gate: Notify::new(),
    });
    let anon = Session::Anonymous;
    forum.inner.create_category(&anon, "General", "chat").await.unwrap();
    forum.inner.create_category(&anon, "Exploits", "bug").await.unwrap();
    forum.inner.create_topic(&anon, 1, "old", "from category one").await.unwrap();
    forum.inner.create_topic(&anon, 2, "new", "from category two").await.unwrap();
    forum
}

#[tokio::test]
async fn late_topics_for_previous_category_do_not_overwrite_current() {
    let forum = gated_forum().await;
    let client = anonymous_client(forum.clone());

    let slow = client.show_topics(1);
    let fast = async {
        let v = client.show_topics(2).await;
        forum.gate.notify_one();
        v
    };
    let (slow_view, fast_view) = tokio::join!(slow, fast);

    // the stale request still answers with its own data
    assert_eq!(slow_view.category_id(), Some(1));
    assert_eq!(slow_view.topics.ready().unwrap()[0].title, "old");
    assert_eq!(fast_view.topics.ready().unwrap()[0].title, "new");

    let shared = client.topic_list();
    assert_eq!(shared.category_id(), Some(2));
    let titles: Vec<_> = shared.topics.ready().unwrap().iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec!["new".to_string()]);
}

#[tokio::test]
async fn late_topic_detail_does_not_overwrite_current() {
    let forum = gated_forum().await;
    let client = anonymous_client(forum.clone());

    let slow = client.show_topic(1);
    let fast = async {
        let v = client.show_topic(2).await;
        forum.gate.notify_one();
        v
    };
    let (slow_view, _) = tokio::join!(slow, fast);

    assert_eq!(slow_view.topic.ready().unwrap().title, "old");
    let shared = client.topic_detail();
    assert_eq!(shared.topic_id(), Some(2));
    assert_eq!(shared.topic.ready().unwrap().title, "new");
}

#[tokio::test]
async fn overtaken_topic_refetch_still_renders_its_result() {
    let forum = gated_forum().await;
    forum.armed.store(false, Ordering::SeqCst);
    let client = anonymous_client(forum.clone());
    client.show_topics(1).await;

    // the refetch after the create is held; a page load for the same
    // category overtakes it
    forum.armed.store(true, Ordering::SeqCst);
    let submit = client.submit_topic(1, TopicDraft { title: "Hello".into(), content: "World".into() });
    let reload = async {
        let v = client.show_topics(1).await;
        forum.gate.notify_one();
        v
    };
    let (submitted, reloaded) = tokio::join!(submit, reload);

    let titles: Vec<_> = submitted.topics.ready().unwrap().iter().map(|t| t.title.clone()).collect();
    assert_eq!(titles, vec!["old".to_string(), "Hello".to_string()]);
    assert!(submitted.draft.title.is_empty());
    assert_eq!(reloaded.topics.ready().unwrap().len(), 2);
}

#[tokio::test]
async fn overtaken_reply_refetch_still_renders_its_result() {
    let forum = gated_forum().await;
    forum.armed.store(false, Ordering::SeqCst);
    let client = anonymous_client(forum.clone());
    client.show_topic(1).await;

    forum.armed.store(true, Ordering::SeqCst);
    let submit = client.submit_reply(1, "first!".into());
    let reload = async {
        let v = client.show_topic(1).await;
        forum.gate.notify_one();
        v
    };
    let (submitted, _) = tokio::join!(submit, reload);

    assert_eq!(submitted.topic.ready().unwrap().title, "old");
    assert_eq!(submitted.replies.ready().unwrap().len(), 1);
    assert!(submitted.draft.is_empty());
}
