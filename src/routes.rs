use std::sync::Arc;

use actix_web::{http::header, web, HttpResponse};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;

use crate::error::PageError;
use crate::models::Id;
use crate::render::{self, Chrome};
use crate::shell::{ForumClient, LoginCallback};
use crate::views::TopicDraft;

pub fn config(cfg: &mut web::ServiceConfig) {
    // a non-numeric id is just a page that does not exist
    cfg.app_data(web::PathConfig::default().error_handler(|_, _| PageError::NotFound.into()))
        .service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/category/{id}").route(web::get().to(category_page)))
        .service(web::resource("/category/{id}/topics").route(web::post().to(create_topic)))
        .service(web::resource("/topic/{id}").route(web::get().to(topic_page)))
        .service(web::resource("/topic/{id}/replies").route(web::post().to(create_reply)))
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/auth/callback").route(web::get().to(auth_callback)))
        .service(web::resource("/logout").route(web::post().to(logout)))
        .service(web::resource("/healthz").route(web::get().to(healthz)))
        .default_service(web::to(not_found));
}

/// Prometheus exposition at `/metrics`, served from the installed recorder.
pub fn metrics(cfg: &mut web::ServiceConfig, handle: PrometheusHandle) {
    cfg.app_data(web::Data::new(handle))
        .service(web::resource("/metrics").route(web::get().to(metrics_endpoint)));
}

#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ForumClient>,
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.to_string()))
        .finish()
}

fn render_page(client: &ForumClient, title: &str, body: &str) -> HttpResponse {
    let session = client.session();
    let notices = client.notices();
    let chrome = Chrome { session: &session, notices: &notices };
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render::page(title, &chrome, body))
}

pub async fn index(data: web::Data<AppState>) -> HttpResponse {
    let view = data.client.show_categories().await;
    render_page(&data.client, "Categories", &render::category_list(&view))
}

pub async fn category_page(data: web::Data<AppState>, path: web::Path<Id>) -> HttpResponse {
    let view = data.client.show_topics(path.into_inner()).await;
    render_page(&data.client, "Topics", &render::topic_list(&view))
}

#[derive(Deserialize)]
pub struct TopicForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub async fn create_topic(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: web::Form<TopicForm>,
) -> HttpResponse {
    let category_id = path.into_inner();
    let TopicForm { title, content } = form.into_inner();
    let draft = TopicDraft { title, content };
    let complete = draft.is_complete();
    let view = data.client.submit_topic(category_id, draft).await;
    if view.category_id() != Some(category_id) {
        if !complete {
            return see_other(&format!("/category/{category_id}"));
        }
        // navigated elsewhere while the call was in flight
        let current = view.category_id().map(|id| format!("/category/{id}"));
        return see_other(current.as_deref().unwrap_or("/"));
    }
    render_page(&data.client, "Topics", &render::topic_list(&view))
}

pub async fn topic_page(data: web::Data<AppState>, path: web::Path<Id>) -> HttpResponse {
    let view = data.client.show_topic(path.into_inner()).await;
    let title = view.topic.ready().map(|t| t.title.clone()).unwrap_or_else(|| "Topic".to_string());
    render_page(&data.client, &title, &render::topic_detail(&view))
}

#[derive(Deserialize)]
pub struct ReplyForm {
    #[serde(default)]
    content: String,
}

pub async fn create_reply(
    data: web::Data<AppState>,
    path: web::Path<Id>,
    form: web::Form<ReplyForm>,
) -> HttpResponse {
    let topic_id = path.into_inner();
    let content = form.into_inner().content;
    let empty = content.trim().is_empty();
    let view = data.client.submit_reply(topic_id, content).await;
    if view.topic_id() != Some(topic_id) {
        if empty {
            return see_other(&format!("/topic/{topic_id}"));
        }
        let current = view.topic_id().map(|id| format!("/topic/{id}"));
        return see_other(current.as_deref().unwrap_or("/"));
    }
    let title = view.topic.ready().map(|t| t.title.clone()).unwrap_or_else(|| "Topic".to_string());
    render_page(&data.client, &title, &render::topic_detail(&view))
}

pub async fn login(data: web::Data<AppState>) -> HttpResponse {
    match data.client.begin_login() {
        Some(url) => HttpResponse::Found().insert_header((header::LOCATION, url)).finish(),
        None => see_other("/"),
    }
}

pub async fn auth_callback(data: web::Data<AppState>, query: web::Query<LoginCallback>) -> HttpResponse {
    data.client.complete_login(query.into_inner()).await;
    see_other("/")
}

pub async fn logout(data: web::Data<AppState>) -> HttpResponse {
    data.client.logout();
    see_other("/")
}

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain").body("ok")
}

pub async fn metrics_endpoint(handle: web::Data<PrometheusHandle>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(handle.render())
}

pub async fn not_found() -> Result<HttpResponse, PageError> {
    Err(PageError::NotFound)
}
