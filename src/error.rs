use actix_web::{http::StatusCode, HttpResponse, ResponseError};

/// Failure talking to the remote forum service.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("transport: {0}")] Transport(String),
    #[error("service responded with status {0}")] Status(u16),
    #[error("undecodable response: {0}")] Decode(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ServiceError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ServiceError::Status(status.as_u16())
        } else {
            ServiceError::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Decode(e.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure establishing or validating a session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("login is not configured")] Unavailable,
    #[error("identity provider unreachable: {0}")] Provider(String),
    #[error("invalid identity token: {0}")] InvalidToken(String),
    #[error("login state mismatch")] StateMismatch,
    #[error("login rejected: {0}")] Rejected(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(e: reqwest::Error) -> Self {
        SessionError::Provider(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        SessionError::InvalidToken(e.to_string())
    }
}

/// Errors that end a page request outright. Remote failures never get here;
/// views turn those into on-page messages.
#[derive(thiserror::Error, Debug)]
pub enum PageError {
    #[error("page not found")] NotFound,
}

impl ResponseError for PageError {
    fn status_code(&self) -> StatusCode {
        match self {
            PageError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/html; charset=utf-8")
            .body(crate::render::error_page(&self.to_string()))
    }
}
