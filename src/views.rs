//! Per-view state for the three pages.
//!
//! Every view is a plain state machine split into synchronous steps
//! (`mount` / `finish_*`, `begin_submit` / `finish_submit`) so the caller can
//! run the remote call with no lock held. Each fetch is tagged with a
//! [`Ticket`]; a result whose ticket is no longer current is dropped.

use tracing::warn;

use crate::error::ServiceResult;
use crate::models::*;

pub const CATEGORIES_FAILED: &str = "Could not load categories. Please try again later.";
pub const TOPICS_FAILED: &str = "Could not load topics. Please try again later.";
pub const TOPIC_FAILED: &str = "Could not load this topic. Please try again later.";
pub const REPLIES_FAILED: &str = "Could not load replies.";
pub const CREATE_TOPIC_FAILED: &str = "Could not create topic.";
pub const CREATE_REPLY_FAILED: &str = "Could not post reply.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Load<T> {
    Idle,
    Loading,
    Ready(T),
    NotFound,
    Failed(&'static str),
}

impl<T> Default for Load<T> {
    fn default() -> Self {
        Load::Idle
    }
}

impl<T> Load<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Load::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Load::Loading)
    }
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket<P> {
    param: P,
    generation: u64,
}

impl<P: Copy> Ticket<P> {
    pub fn param(&self) -> P {
        self.param
    }
}

/// Generation counter keyed by the route parameter a view is showing.
#[derive(Debug, Clone)]
pub struct FetchGuard<P> {
    current: Option<P>,
    generation: u64,
}

impl<P> Default for FetchGuard<P> {
    fn default() -> Self {
        Self { current: None, generation: 0 }
    }
}

impl<P: Copy + PartialEq> FetchGuard<P> {
    /// Supersedes every ticket issued before.
    pub fn issue(&mut self, param: P) -> Ticket<P> {
        self.generation += 1;
        self.current = Some(param);
        Ticket { param, generation: self.generation }
    }

    pub fn is_current(&self, ticket: &Ticket<P>) -> bool {
        self.generation == ticket.generation && self.current == Some(ticket.param)
    }

    pub fn current(&self) -> Option<P> {
        self.current
    }
}

/// What became of a submission once its result came back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Accepted; the form is cleared and `refetch` must be run.
    Created { id: Id, refetch: Ticket<Id> },
    /// Rejected or unreachable; the draft is kept for another try.
    Failed,
    /// The view moved on while the call was in flight.
    Superseded,
}

fn mutation_error(prefix: &str, result: ServiceResult<MutationResult>) -> Result<Id, String> {
    match result {
        Ok(MutationResult::Ok(id)) => Ok(id),
        Ok(MutationResult::Err(msg)) => Err(format!("{prefix} {msg}")),
        Err(e) => {
            warn!("mutation failed: {e}");
            Err(format!("{prefix} Please try again."))
        }
    }
}

// ---------------- category list -----------------------------------

#[derive(Debug, Clone, Default)]
pub struct CategoryListView {
    guard: FetchGuard<()>,
    pub categories: Load<Vec<Category>>,
}

impl CategoryListView {
    pub fn is_current(&self, ticket: &Ticket<()>) -> bool {
        self.guard.is_current(ticket)
    }

    pub fn mount(&mut self) -> Ticket<()> {
        self.categories = Load::Loading;
        self.guard.issue(())
    }

    pub fn finish(&mut self, ticket: Ticket<()>, result: ServiceResult<Vec<Category>>) -> bool {
        if !self.guard.is_current(&ticket) {
            return false;
        }
        self.categories = match result {
            Ok(categories) => Load::Ready(categories),
            Err(e) => {
                warn!("getCategories failed: {e}");
                Load::Failed(CATEGORIES_FAILED)
            }
        };
        true
    }
}

// ---------------- topic list --------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicDraft {
    pub title: String,
    pub content: String,
}

impl TopicDraft {
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTopic {
    seq: u64,
    pub category_id: Id,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TopicListView {
    guard: FetchGuard<Id>,
    pub topics: Load<Vec<Topic>>,
    pub draft: TopicDraft,
    pub submit_error: Option<String>,
    pending: Option<PendingTopic>,
    seq: u64,
}

impl TopicListView {
    pub fn category_id(&self) -> Option<Id> {
        self.guard.current()
    }

    pub fn is_current(&self, ticket: &Ticket<Id>) -> bool {
        self.guard.is_current(ticket)
    }

    /// Start showing `category_id`. Switching category drops the form and
    /// any submission still in flight for the old one.
    pub fn mount(&mut self, category_id: Id) -> Ticket<Id> {
        if self.guard.current() != Some(category_id) {
            self.draft = TopicDraft::default();
            self.submit_error = None;
            self.pending = None;
        }
        self.topics = Load::Loading;
        self.guard.issue(category_id)
    }

    pub fn finish(&mut self, ticket: Ticket<Id>, result: ServiceResult<Vec<Topic>>) -> bool {
        if !self.guard.is_current(&ticket) {
            return false;
        }
        self.topics = match result {
            Ok(topics) => Load::Ready(topics),
            Err(e) => {
                warn!(category_id = ticket.param, "getTopics failed: {e}");
                Load::Failed(TOPICS_FAILED)
            }
        };
        true
    }

    pub fn set_draft(&mut self, draft: TopicDraft) {
        self.draft = draft;
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.pending.is_none() && self.category_id().is_some() && self.draft.is_complete()
    }

    /// Returns the call to make, or `None` when the form may not be sent.
    pub fn begin_submit(&mut self) -> Option<PendingTopic> {
        if !self.can_submit() {
            return None;
        }
        let category_id = self.category_id()?;
        self.seq += 1;
        let pending = PendingTopic {
            seq: self.seq,
            category_id,
            title: self.draft.title.clone(),
            content: self.draft.content.clone(),
        };
        self.submit_error = None;
        self.pending = Some(pending.clone());
        Some(pending)
    }

    pub fn finish_submit(&mut self, pending: &PendingTopic, result: ServiceResult<MutationResult>) -> SubmitOutcome {
        if self.pending.as_ref() != Some(pending) {
            return SubmitOutcome::Superseded;
        }
        self.pending = None;
        match mutation_error(CREATE_TOPIC_FAILED, result) {
            Ok(id) => {
                self.draft = TopicDraft::default();
                SubmitOutcome::Created { id, refetch: self.guard.issue(pending.category_id) }
            }
            Err(msg) => {
                self.submit_error = Some(msg);
                SubmitOutcome::Failed
            }
        }
    }
}

// ---------------- topic detail ------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    seq: u64,
    pub topic_id: Id,
    pub content: String,
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone, Default)]
pub struct TopicDetailView {
    guard: FetchGuard<Id>,
    pub topic: Load<Topic>,
    pub replies: Load<Vec<Reply>>,
    pub draft: String,
    pub submit_error: Option<String>,
    pending: Option<PendingReply>,
    seq: u64,
}

impl TopicDetailView {
    pub fn topic_id(&self) -> Option<Id> {
        self.guard.current()
    }

    pub fn is_current(&self, ticket: &Ticket<Id>) -> bool {
        self.guard.is_current(ticket)
    }

    /// Both the topic and its replies are fetched under the returned ticket.
    pub fn mount(&mut self, topic_id: Id) -> Ticket<Id> {
        if self.guard.current() != Some(topic_id) {
            self.draft.clear();
            self.submit_error = None;
            self.pending = None;
        }
        self.topic = Load::Loading;
        self.replies = Load::Loading;
        self.guard.issue(topic_id)
    }

    pub fn finish_topic(&mut self, ticket: &Ticket<Id>, result: ServiceResult<Option<Topic>>) -> bool {
        if !self.guard.is_current(ticket) {
            return false;
        }
        self.topic = match result {
            Ok(Some(topic)) => Load::Ready(topic),
            Ok(None) => Load::NotFound,
            Err(e) => {
                warn!(topic_id = ticket.param, "getTopic failed: {e}");
                Load::Failed(TOPIC_FAILED)
            }
        };
        true
    }

    pub fn finish_replies(&mut self, ticket: &Ticket<Id>, result: ServiceResult<Vec<Reply>>) -> bool {
        if !self.guard.is_current(ticket) {
            return false;
        }
        self.replies = match result {
            Ok(replies) => Load::Ready(replies),
            Err(e) => {
                warn!(topic_id = ticket.param, "getReplies failed: {e}");
                Load::Failed(REPLIES_FAILED)
            }
        };
        true
    }

    pub fn set_draft(&mut self, content: String) {
        self.draft = content;
    }

    pub fn is_submitting(&self) -> bool {
        self.pending.is_some()
    }

    /// Replying needs a loaded topic; a missing one offers no reply form.
    pub fn can_submit(&self) -> bool {
        self.pending.is_none() && self.topic.ready().is_some() && !self.draft.trim().is_empty()
    }

    pub fn begin_submit(&mut self) -> Option<PendingReply> {
        if !self.can_submit() {
            return None;
        }
        let topic_id = self.topic_id()?;
        self.seq += 1;
        // top-level replies only; composing under a parent is not offered
        let pending = PendingReply { seq: self.seq, topic_id, content: self.draft.clone(), parent_id: None };
        self.submit_error = None;
        self.pending = Some(pending.clone());
        Some(pending)
    }

    pub fn finish_submit(&mut self, pending: &PendingReply, result: ServiceResult<MutationResult>) -> SubmitOutcome {
        if self.pending.as_ref() != Some(pending) {
            return SubmitOutcome::Superseded;
        }
        self.pending = None;
        match mutation_error(CREATE_REPLY_FAILED, result) {
            Ok(id) => {
                self.draft.clear();
                SubmitOutcome::Created { id, refetch: self.guard.issue(pending.topic_id) }
            }
            Err(msg) => {
                self.submit_error = Some(msg);
                SubmitOutcome::Failed
            }
        }
    }
}
