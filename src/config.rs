use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// HS256 secret shared with the identity provider that signs bearer tokens.
    pub jwt_secret: String,
    /// Sales tax applied to `price_plus_tax`, in whole percent.
    pub tax_percent: i64,
    pub concurrency_limit: usize,
    pub body_limit_bytes: usize,
    /// Root directory for uploaded files, served under `/media`.
    pub media_dir: String,
    pub max_image_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000);
        let tax_percent = parse_or("APP_TAX_PERCENT", 10);
        let concurrency_limit = parse_or("APP_CONCURRENCY_LIMIT", 100);
        let body_limit_bytes = parse_or("APP_BODY_LIMIT_BYTES", 1024 * 1024);
        let media_dir = env::var("APP_MEDIA_DIR").unwrap_or_else(|_| "media".to_string());
        let max_image_bytes = parse_or("APP_MAX_IMAGE_KB", 1024usize) * 1024;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            tax_percent,
            concurrency_limit,
            body_limit_bytes,
            media_dir,
            max_image_bytes,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
