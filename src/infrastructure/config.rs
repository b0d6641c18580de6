use std::env;
use std::time::Duration;

/// Credentials and endpoint for the ToyyibPay gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub secret_key: String,
    pub category_code: String,
    pub sandbox: bool,
    /// Overrides the sandbox/live default (used by tests and staging proxies)
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl GatewayConfig {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if self.sandbox => "https://dev.toyyibpay.com".to_string(),
            None => "https://toyyibpay.com".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub jwt_secret: String,
    /// Public origin of the site, used for gateway return/callback URLs
    pub public_base_url: String,
    /// `None` when the gateway credentials are not provided
    pub gateway: Option<GatewayConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8000);

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://kasih.db?mode=rwc".to_string()),
            port,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            jwt_secret: jwt_secret_from_env(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            gateway: gateway_from_env(),
        }
    }

    /// Minimal configuration for tests and tools: no gateway, fixed secret
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
            jwt_secret: "test-secret".to_string(),
            public_base_url: "http://localhost:8000".to_string(),
            gateway: None,
        }
    }
}

fn jwt_secret_from_env() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
}

fn gateway_from_env() -> Option<GatewayConfig> {
    let secret_key = env::var("TOYYIBPAY_SECRET_KEY").ok().filter(|s| !s.is_empty());
    let category_code = env::var("TOYYIBPAY_CATEGORY_CODE")
        .ok()
        .filter(|s| !s.is_empty());

    let (Some(secret_key), Some(category_code)) = (secret_key, category_code) else {
        tracing::warn!("ToyyibPay credentials missing, payment gateway disabled");
        return None;
    };

    Some(GatewayConfig {
        secret_key,
        category_code,
        sandbox: env::var("TOYYIBPAY_SANDBOX")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true),
        base_url: env::var("TOYYIBPAY_BASE_URL").ok().filter(|s| !s.is_empty()),
        timeout: Duration::from_secs(
            env::var("TOYYIBPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        ),
    })
}
