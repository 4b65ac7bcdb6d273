//! Server-side HTML for the forum pages.

use std::fmt::{Display, Write as _};

use chrono::{Local, TimeZone};

use crate::session::{Notice, Session};
use crate::views::{CategoryListView, Load, TopicDetailView, TopicListView};
use crate::wire::Timestamp;

pub const FORUM_TITLE: &str = "Hacker Forum";
pub const DATE_PLACEHOLDER: &str = "unknown date";

pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Local date and time of a service timestamp.
pub fn format_timestamp(ts: Timestamp) -> String {
    format_timestamp_in(ts, &Local)
}

pub fn format_timestamp_in<Tz>(ts: Timestamp, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    ts.millis()
        .and_then(|ms| tz.timestamp_millis_opt(ms).earliest())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| DATE_PLACEHOLDER.to_string())
}

/// Everything the navigation bar needs.
pub struct Chrome<'a> {
    pub session: &'a Session,
    pub notices: &'a [Notice],
}

pub fn page(title: &str, chrome: &Chrome<'_>, body: &str) -> String {
    let mut nav = String::new();
    let _ = write!(nav, r#"<a class="brand" href="/">{}</a>"#, escape(FORUM_TITLE));
    if chrome.session.is_authenticated() {
        let _ = write!(
            nav,
            r#"<span class="who">{}</span><form class="logout" method="post" action="/logout"><button type="submit">Logout</button></form>"#,
            escape(chrome.session.principal())
        );
    } else {
        nav.push_str(r#"<span class="who">anonymous</span><a class="login" href="/login">Login</a>"#);
    }

    let mut notices = String::new();
    if !chrome.notices.is_empty() {
        notices.push_str(r#"<ul class="notices">"#);
        for n in chrome.notices {
            let _ = write!(notices, r#"<li class="notice" id="notice-{}">{}</li>"#, n.id, escape(&n.message));
        }
        notices.push_str("</ul>");
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{} · {}</title></head>\
         <body><header><nav>{}</nav>{}</header><main>{}</main></body></html>",
        escape(title),
        escape(FORUM_TITLE),
        nav,
        notices,
        body
    )
}

pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body><main><p class=\"error\">{}</p><a href=\"/\">Back to categories</a></main></body></html>",
        escape(FORUM_TITLE),
        escape(message)
    )
}

fn status<T>(out: &mut String, load: &Load<T>, not_found: &str) {
    match load {
        Load::Idle | Load::Loading => out.push_str(r#"<p class="loading">Loading…</p>"#),
        Load::NotFound => {
            let _ = write!(out, r#"<p class="not-found">{}</p>"#, escape(not_found));
        }
        Load::Failed(msg) => {
            let _ = write!(out, r#"<p class="error">{}</p>"#, escape(msg));
        }
        Load::Ready(_) => {}
    }
}

fn submit_error(out: &mut String, err: &Option<String>) {
    if let Some(msg) = err {
        let _ = write!(out, r#"<p class="error submit-error">{}</p>"#, escape(msg));
    }
}

pub fn category_list(view: &CategoryListView) -> String {
    let mut out = String::from("<h1>Categories</h1>");
    status(&mut out, &view.categories, "No categories.");
    if let Some(categories) = view.categories.ready() {
        out.push_str(r#"<ul class="categories">"#);
        for c in categories {
            let _ = write!(
                out,
                r#"<li><a class="category-card" href="/category/{}"><span class="icon">{}</span> <span class="name">{}</span></a></li>"#,
                c.id,
                escape(&c.icon),
                escape(&c.name)
            );
        }
        out.push_str("</ul>");
    }
    out
}

pub fn topic_list(view: &TopicListView) -> String {
    let mut out = String::from("<h1>Topics</h1>");
    status(&mut out, &view.topics, "No topics.");
    if let Some(topics) = view.topics.ready() {
        out.push_str(r#"<ul class="topics">"#);
        for t in topics {
            let _ = write!(
                out,
                r#"<li><a class="topic-row" href="/topic/{}">{}</a> <span class="author">by {}</span></li>"#,
                t.id,
                escape(&t.title),
                escape(&t.author)
            );
        }
        out.push_str("</ul>");
    }

    submit_error(&mut out, &view.submit_error);
    let action = view.category_id().map(|id| format!("/category/{id}/topics")).unwrap_or_default();
    let disabled = if view.category_id().is_none() || view.is_submitting() { " disabled" } else { "" };
    let _ = write!(
        out,
        r#"<form class="new-topic" method="post" action="{}"><input name="title" placeholder="New topic title" required value="{}"><textarea name="content" placeholder="New topic content" rows="4" required>{}</textarea><button type="submit"{}>Create Topic</button></form>"#,
        escape(&action),
        escape(&view.draft.title),
        escape(&view.draft.content),
        disabled
    );
    out
}

pub fn topic_detail(view: &TopicDetailView) -> String {
    let mut out = String::new();
    status(&mut out, &view.topic, "Topic not found.");
    let Some(topic) = view.topic.ready() else {
        return out;
    };
    let _ = write!(
        out,
        r#"<article class="topic"><h1>{}</h1><p class="content">{}</p><p class="byline">by {} on {}</p></article>"#,
        escape(&topic.title),
        escape(&topic.content),
        escape(&topic.author),
        escape(&format_timestamp(topic.created_at))
    );

    out.push_str("<h2>Replies</h2>");
    status(&mut out, &view.replies, "No replies.");
    if let Some(replies) = view.replies.ready() {
        out.push_str(r#"<ul class="replies">"#);
        for r in replies {
            let _ = write!(
                out,
                r#"<li class="reply" id="reply-{}"><p class="content">{}</p><p class="byline">by {} on {}</p></li>"#,
                r.id,
                escape(&r.content),
                escape(&r.author),
                escape(&format_timestamp(r.created_at))
            );
        }
        out.push_str("</ul>");
    }

    submit_error(&mut out, &view.submit_error);
    let disabled = if view.is_submitting() { " disabled" } else { "" };
    let _ = write!(
        out,
        r#"<form class="new-reply" method="post" action="/topic/{}/replies"><textarea name="content" placeholder="Your reply" rows="4" required>{}</textarea><button type="submit"{}>Post Reply</button></form>"#,
        topic.id,
        escape(&view.draft),
        disabled
    );
    out
}
