pub mod config;
pub mod error;
pub mod models;
pub mod render;
pub mod routes;
pub mod security;
pub mod service;
pub mod session;
pub mod shell; // the ForumClient shell
pub mod views;
pub mod wire;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
pub use shell::ForumClient;
