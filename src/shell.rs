use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use futures_util::future::join;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ServiceResult, SessionError};
use crate::models::{Id, Reply, Topic};
use crate::service::ForumService;
use crate::session::{IdentityProvider, Notice, Notifications, Session};
use crate::views::{CategoryListView, SubmitOutcome, Ticket, TopicDetailView, TopicDraft, TopicListView};

pub const RESTORE_FAILED: &str = "Could not restore your session. You are browsing anonymously.";
pub const LOGIN_FAILED: &str = "Login failed. You are still browsing anonymously.";
pub const LOGIN_UNAVAILABLE: &str = "Login is not available right now.";

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Query string of the identity provider's return leg.
#[derive(Debug, Default, Deserialize)]
pub struct LoginCallback {
    pub token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// The client shell: session, notifications and one instance of each view.
///
/// Locks are held only around the synchronous view steps, never across a
/// remote call, so a navigation can overtake a slow fetch.
pub struct ForumClient {
    service: Arc<dyn ForumService>,
    identity: Arc<dyn IdentityProvider>,
    public_url: String,
    session: RwLock<Session>,
    login_state: Mutex<Option<String>>,
    notices: Mutex<Notifications>,
    categories: Mutex<CategoryListView>,
    topics: Mutex<TopicListView>,
    detail: Mutex<TopicDetailView>,
}

impl ForumClient {
    pub fn new(
        service: Arc<dyn ForumService>,
        identity: Arc<dyn IdentityProvider>,
        public_url: impl Into<String>,
        notification_ttl: Duration,
    ) -> Self {
        Self {
            service,
            identity,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            session: RwLock::new(Session::Anonymous),
            login_state: Mutex::new(None),
            notices: Mutex::new(Notifications::new(notification_ttl)),
            categories: Mutex::default(),
            topics: Mutex::default(),
            detail: Mutex::default(),
        }
    }

    pub fn session(&self) -> Session {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_session(&self, session: Session) -> Session {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, session)
    }

    pub fn notify(&self, message: &str) {
        lock(&self.notices).push(message);
    }

    pub fn notices(&self) -> Vec<Notice> {
        lock(&self.notices).active()
    }

    /// Current state of the shared topic list.
    pub fn topic_list(&self) -> TopicListView {
        lock(&self.topics).clone()
    }

    pub fn topic_detail(&self) -> TopicDetailView {
        lock(&self.detail).clone()
    }

    // ---------------- session ---------------------------------------

    /// Try to pick up an existing session. Failure leaves the client
    /// anonymous and raises a notice.
    pub async fn init_session(&self) {
        match self.identity.restore().await {
            Ok(Some(identity)) => {
                let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
                // a login that finished first wins
                if !guard.is_authenticated() {
                    info!(principal = %identity.principal, "session restored");
                    *guard = Session::Authenticated(identity);
                }
            }
            Ok(None) => debug!("no session to restore"),
            Err(e) => {
                warn!("session restore failed: {e}");
                self.notify(RESTORE_FAILED);
            }
        }
    }

    /// Authorize URL to redirect to, or `None` after raising a notice.
    pub fn begin_login(&self) -> Option<String> {
        let state = Uuid::new_v4().to_string();
        let return_to = format!("{}/auth/callback", self.public_url);
        match self.identity.authorize_url(&return_to, &state) {
            Ok(url) => {
                *lock(&self.login_state) = Some(state);
                Some(url)
            }
            Err(e) => {
                warn!("login unavailable: {e}");
                self.notify(LOGIN_UNAVAILABLE);
                None
            }
        }
    }

    pub async fn complete_login(&self, callback: LoginCallback) -> bool {
        let expected = lock(&self.login_state).take();
        let result = match (callback.error, callback.token) {
            (Some(err), _) => Err(SessionError::Rejected(err)),
            (None, None) => Err(SessionError::Rejected("no token returned".into())),
            (None, Some(token)) => {
                if expected.is_some() && callback.state == expected {
                    self.identity.complete_login(&token).await
                } else {
                    Err(SessionError::StateMismatch)
                }
            }
        };
        match result {
            Ok(identity) => {
                info!(principal = %identity.principal, "logged in");
                self.set_session(Session::Authenticated(identity));
                true
            }
            Err(e) => {
                warn!("login failed: {e}");
                self.notify(LOGIN_FAILED);
                false
            }
        }
    }

    /// Clears the local session at once; the provider is told in the
    /// background and its answer is only logged.
    pub fn logout(&self) {
        lock(&self.login_state).take();
        if let Session::Authenticated(identity) = self.set_session(Session::Anonymous) {
            info!(principal = %identity.principal, "logged out");
            let provider = self.identity.clone();
            actix_web::rt::spawn(async move {
                if let Err(e) = provider.logout(&identity).await {
                    warn!("provider logout failed: {e}");
                }
            });
        }
    }

    // ---------------- pages -----------------------------------------

    pub async fn show_categories(&self) -> CategoryListView {
        let ticket = lock(&self.categories).mount();
        let result = self.service.get_categories().await;
        let mut view = lock(&self.categories);
        if view.is_current(&ticket) {
            view.finish(ticket, result);
            return view.clone();
        }
        drop(view);
        debug!("category fetch superseded");
        let mut detached = CategoryListView::default();
        let t = detached.mount();
        detached.finish(t, result);
        detached
    }

    pub async fn show_topics(&self, category_id: Id) -> TopicListView {
        let ticket = lock(&self.topics).mount(category_id);
        let result = self.service.get_topics(category_id).await;
        self.settle_topics(ticket, result)
    }

    /// Applies a topic fetch to the shared view while its ticket is current.
    /// A superseded fetch still answers its own request, through a detached
    /// view, without touching the shared one.
    fn settle_topics(&self, ticket: Ticket<Id>, result: ServiceResult<Vec<Topic>>) -> TopicListView {
        let mut view = lock(&self.topics);
        if view.is_current(&ticket) {
            view.finish(ticket, result);
            return view.clone();
        }
        drop(view);
        debug!(category_id = ticket.param(), "topic fetch superseded");
        let mut detached = TopicListView::default();
        let t = detached.mount(ticket.param());
        detached.finish(t, result);
        detached
    }

    pub async fn show_topic(&self, topic_id: Id) -> TopicDetailView {
        let ticket = lock(&self.detail).mount(topic_id);
        let (topic, replies) = join(self.service.get_topic(topic_id), self.service.get_replies(topic_id)).await;
        self.settle_detail(ticket, topic, replies)
    }

    fn settle_detail(
        &self,
        ticket: Ticket<Id>,
        topic: ServiceResult<Option<Topic>>,
        replies: ServiceResult<Vec<Reply>>,
    ) -> TopicDetailView {
        let mut view = lock(&self.detail);
        if view.is_current(&ticket) {
            view.finish_topic(&ticket, topic);
            view.finish_replies(&ticket, replies);
            return view.clone();
        }
        drop(view);
        debug!(topic_id = ticket.param(), "topic detail fetch superseded");
        let mut detached = TopicDetailView::default();
        let t = detached.mount(ticket.param());
        detached.finish_topic(&t, topic);
        detached.finish_replies(&t, replies);
        detached
    }

    /// Submit the topic form. The returned view may belong to another
    /// category if the user navigated away meanwhile. An incomplete draft
    /// for a category that is not shown returns the shared view untouched.
    pub async fn submit_topic(&self, category_id: Id, draft: TopicDraft) -> TopicListView {
        let shown = lock(&self.topics).category_id();
        if shown != Some(category_id) {
            if !draft.is_complete() {
                return lock(&self.topics).clone();
            }
            self.show_topics(category_id).await;
        }
        let pending = {
            let mut view = lock(&self.topics);
            if view.category_id() == Some(category_id) && !view.is_submitting() {
                view.set_draft(draft);
            }
            view.begin_submit()
        };
        let Some(pending) = pending else {
            return lock(&self.topics).clone();
        };

        let session = self.session();
        let result = self
            .service
            .create_topic(&session, pending.category_id, &pending.title, &pending.content)
            .await;
        let outcome = lock(&self.topics).finish_submit(&pending, result);
        if let SubmitOutcome::Created { id, refetch } = outcome {
            info!(topic_id = id, category_id, "topic created");
            let result = self.service.get_topics(refetch.param()).await;
            return self.settle_topics(refetch, result);
        }
        lock(&self.topics).clone()
    }

    pub async fn submit_reply(&self, topic_id: Id, content: String) -> TopicDetailView {
        let shown = lock(&self.detail).topic_id();
        if shown != Some(topic_id) {
            if content.trim().is_empty() {
                return lock(&self.detail).clone();
            }
            self.show_topic(topic_id).await;
        }
        let pending = {
            let mut view = lock(&self.detail);
            if view.topic_id() == Some(topic_id) && !view.is_submitting() {
                view.set_draft(content);
            }
            view.begin_submit()
        };
        let Some(pending) = pending else {
            return lock(&self.detail).clone();
        };

        let session = self.session();
        let result = self
            .service
            .create_reply(&session, pending.topic_id, &pending.content, pending.parent_id)
            .await;
        let outcome = lock(&self.detail).finish_submit(&pending, result);
        if let SubmitOutcome::Created { id, refetch } = outcome {
            info!(reply_id = id, topic_id, "reply created");
            let tid = refetch.param();
            let (topic, replies) = join(self.service.get_topic(tid), self.service.get_replies(tid)).await;
            return self.settle_detail(refetch, topic, replies);
        }
        lock(&self.detail).clone()
    }
}
