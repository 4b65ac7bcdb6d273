use actix_web::{middleware::Compress, web, App, HttpServer};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

use forum_client::config::ClientConfig;
use forum_client::routes;
use forum_client::service::{http::HttpForumService, memory::MemoryForum, ForumService};
use forum_client::session::{DisabledIdentityProvider, HttpIdentityProvider, IdentityProvider};
use forum_client::{config, AppState, ForumClient, SecurityHeaders};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env automatically only in debug builds to reduce manual setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cfg = match ClientConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            eprintln!("Set FORUM_SERVICE_URL (or copy .env.example to .env)");
            std::process::exit(1);
        }
    };

    info!("Bootstrapping forum client");

    let service: Arc<dyn ForumService> = if cfg.uses_memory_service() {
        info!("Using in-memory forum service");
        Arc::new(MemoryForum::with_default_categories())
    } else {
        info!("Forum service: {}", cfg.service_url);
        Arc::new(HttpForumService::new(cfg.service_url.clone()))
    };

    let identity: Arc<dyn IdentityProvider> = match &cfg.identity_provider_url {
        Some(url) => {
            info!("Identity provider: {url}");
            if cfg.identity_jwt_secret.is_none() {
                warn!("IDENTITY_JWT_SECRET not set; identity tokens are checked for expiry only");
            }
            Arc::new(HttpIdentityProvider::new(url.clone(), cfg.identity_jwt_secret.clone()))
        }
        None => {
            warn!("IDENTITY_PROVIDER_URL not set; login disabled, browsing stays anonymous");
            Arc::new(DisabledIdentityProvider)
        }
    };

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("metrics recorder not installed: {e}");
            None
        }
    };

    let client = Arc::new(ForumClient::new(service, identity, cfg.public_url.clone(), cfg.notification_ttl));

    // session restore runs in the background; pages are served meanwhile
    let restoring = client.clone();
    actix_web::rt::spawn(async move { restoring.init_session().await });

    let security = SecurityHeaders::from_config(&cfg);
    let state = AppState { client };
    let server = HttpServer::new(move || {
        let handle = metrics.clone();
        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(security.clone())
            .app_data(web::Data::new(state.clone()))
            .configure(move |cfg| {
                if let Some(handle) = handle {
                    routes::metrics(cfg, handle);
                }
            })
            .configure(config)
    })
    .bind((cfg.bind.0.as_str(), cfg.bind.1))?;

    info!("Listening on {}", cfg.public_url);

    server.run().await
}
