use std::time::Duration;

use anyhow::{anyhow, bail};

/// Sentinel for `FORUM_SERVICE_URL` selecting the in-process service.
pub const MEMORY_SERVICE: &str = "memory";

/// Runtime configuration read from the environment.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub service_url: String,
    pub identity_provider_url: Option<String>,
    pub identity_jwt_secret: Option<String>,
    pub public_url: String,
    pub bind: (String, u16),
    pub notification_ttl: Duration,
    pub enable_hsts: bool,
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        fn opt_env(name: &str) -> Option<String> {
            std::env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
        }

        let service_url = opt_env("FORUM_SERVICE_URL")
            .ok_or_else(|| anyhow!("FORUM_SERVICE_URL must be set (gateway URL or \"{MEMORY_SERVICE}\")"))?;

        let identity_jwt_secret = opt_env("IDENTITY_JWT_SECRET");
        if let Some(secret) = &identity_jwt_secret {
            if secret.len() < 32 {
                bail!("IDENTITY_JWT_SECRET must be at least 32 characters long");
            }
        }

        let bind = parse_bind(opt_env("FORUM_BIND").as_deref().unwrap_or("127.0.0.1:8080"))?;
        let public_url = opt_env("FORUM_PUBLIC_URL")
            .unwrap_or_else(|| format!("http://{}:{}", bind.0, bind.1));

        let ttl_secs = match opt_env("NOTIFICATION_TTL_SECS") {
            Some(v) => v.parse::<u64>().map_err(|_| anyhow!("NOTIFICATION_TTL_SECS must be a whole number of seconds"))?,
            None => 5,
        };

        let enable_hsts = opt_env("ENABLE_HSTS")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            identity_provider_url: opt_env("IDENTITY_PROVIDER_URL").map(|u| u.trim_end_matches('/').to_string()),
            identity_jwt_secret,
            public_url: public_url.trim_end_matches('/').to_string(),
            bind,
            notification_ttl: Duration::from_secs(ttl_secs),
            enable_hsts,
        })
    }

    pub fn uses_memory_service(&self) -> bool {
        self.service_url == MEMORY_SERVICE
    }
}

fn parse_bind(raw: &str) -> anyhow::Result<(String, u16)> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("FORUM_BIND must look like host:port, got {raw:?}"))?;
    let port = port.parse::<u16>().map_err(|_| anyhow!("FORUM_BIND has an invalid port: {raw:?}"))?;
    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_parsing() {
        assert_eq!(parse_bind("0.0.0.0:9000").unwrap(), ("0.0.0.0".to_string(), 9000));
        assert!(parse_bind("localhost").is_err());
        assert!(parse_bind("localhost:http").is_err());
    }
}
