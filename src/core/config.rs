use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub storage: StorageConfig,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
    /// Claim holding the user's roles (string or array of strings)
    pub roles_claim: String,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// Object storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageProvider {
    /// AWS S3 or any S3-compatible endpoint (MinIO in development)
    S3,
    /// Google Cloud Storage through its S3-interoperable XML API (HMAC keys)
    Gcs,
}

/// Document storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Endpoint URL. Empty for AWS S3 proper, which resolves from the region
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub region: String,
    /// Presigned URL expiry time in seconds
    pub presigned_url_expiry_secs: u32,
}

/// Payment backend
#[derive(Debug, Clone)]
pub enum PaymentConfig {
    Stripe(StripeConfig),
    /// Payments are confirmed by an operator; no third-party calls
    Manual,
}

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    /// Accepted clock skew for webhook signatures, in seconds
    pub webhook_tolerance_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            payment: PaymentConfig::from_env()?,
        })
    }
}

impl AppConfig {
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 20 * 1024 * 1024; // 20MB

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_env("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_env("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_env(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_env("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_env("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let issuer = env::var("AUTH_ISSUER")
            .map_err(|_| "AUTH_ISSUER environment variable is required".to_string())?;

        let audience = env::var("AUTH_AUDIENCE")
            .map_err(|_| "AUTH_AUDIENCE environment variable is required".to_string())?;

        let jwks_url = env::var("AUTH_JWKS_URL").unwrap_or_else(|_| {
            format!("{}/.well-known/jwks.json", issuer.trim_end_matches('/'))
        });

        let roles_claim = env::var("AUTH_ROLES_CLAIM").unwrap_or_else(|_| "roles".to_string());

        let jwks_cache_ttl_secs = parse_env("JWKS_CACHE_TTL", Self::DEFAULT_JWKS_CACHE_TTL_SECS)?;
        let jwt_leeway_secs = parse_env("JWT_LEEWAY", Self::DEFAULT_JWT_LEEWAY_SECS)?;

        Ok(Self {
            issuer,
            audience,
            jwks_url,
            roles_claim,
            jwks_cache_ttl: Duration::from_secs(jwks_cache_ttl_secs),
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = env::var("SWAGGER_USERNAME").ok().filter(|s| !s.is_empty());
        let password = env::var("SWAGGER_PASSWORD").ok().filter(|s| !s.is_empty());
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Servicedesk API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "1.0.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Back-office API for service requests, payments and appointments".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl StorageProvider {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "s3" | "minio" => Ok(StorageProvider::S3),
            "gcs" => Ok(StorageProvider::Gcs),
            other => Err(format!(
                "STORAGE_PROVIDER must be 's3' or 'gcs', got '{}'",
                other
            )),
        }
    }
}

impl StorageConfig {
    const DEFAULT_PRESIGNED_URL_EXPIRY_SECS: u32 = 900; // 15 minutes
    const GCS_ENDPOINT: &'static str = "https://storage.googleapis.com";

    pub fn from_env() -> Result<Self, String> {
        let provider = StorageProvider::parse(
            &env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "s3".to_string()),
        )?;

        let endpoint = env::var("STORAGE_ENDPOINT")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| match provider {
                StorageProvider::Gcs => Some(Self::GCS_ENDPOINT.to_string()),
                StorageProvider::S3 => None,
            });

        let access_key = env::var("STORAGE_ACCESS_KEY")
            .map_err(|_| "STORAGE_ACCESS_KEY environment variable is required".to_string())?;
        let secret_key = env::var("STORAGE_SECRET_KEY")
            .map_err(|_| "STORAGE_SECRET_KEY environment variable is required".to_string())?;

        let bucket =
            env::var("STORAGE_BUCKET").unwrap_or_else(|_| "servicedesk-documents".to_string());

        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| match provider {
            StorageProvider::Gcs => "auto".to_string(),
            StorageProvider::S3 => "us-east-1".to_string(),
        });

        let presigned_url_expiry_secs = parse_env(
            "STORAGE_PRESIGNED_URL_EXPIRY_SECS",
            Self::DEFAULT_PRESIGNED_URL_EXPIRY_SECS,
        )?;

        Ok(Self {
            provider,
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
            presigned_url_expiry_secs,
        })
    }
}

impl PaymentConfig {
    pub fn from_env() -> Result<Self, String> {
        let provider = env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "stripe".to_string());

        match provider.to_lowercase().as_str() {
            "stripe" => Ok(PaymentConfig::Stripe(StripeConfig::from_env()?)),
            "manual" => PaymentConfig::manual(parse_env("PAYMENT_ALLOW_UNSIGNED_WEBHOOKS", false)?),
            other => Err(format!(
                "PAYMENT_PROVIDER must be 'stripe' or 'manual', got '{}'",
                other
            )),
        }
    }

    /// The manual provider trusts unsigned webhook bodies, so it has to be
    /// switched on explicitly.
    fn manual(allow_unsigned_webhooks: bool) -> Result<Self, String> {
        if allow_unsigned_webhooks {
            Ok(PaymentConfig::Manual)
        } else {
            Err("PAYMENT_PROVIDER=manual accepts unsigned webhooks; \
                 set PAYMENT_ALLOW_UNSIGNED_WEBHOOKS=true to use it (development only)"
                .to_string())
        }
    }
}

impl StripeConfig {
    const DEFAULT_API_BASE: &'static str = "https://api.stripe.com";
    const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

    pub fn from_env() -> Result<Self, String> {
        let secret_key = env::var("STRIPE_SECRET_KEY")
            .map_err(|_| "STRIPE_SECRET_KEY environment variable is required".to_string())?;
        let webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| "STRIPE_WEBHOOK_SECRET environment variable is required".to_string())?;
        let api_base =
            env::var("STRIPE_API_BASE").unwrap_or_else(|_| Self::DEFAULT_API_BASE.to_string());

        Ok(Self {
            secret_key,
            webhook_secret,
            api_base,
            webhook_tolerance_secs: parse_env(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                Self::DEFAULT_WEBHOOK_TOLERANCE_SECS,
            )?,
        })
    }
}

/// Read an optional variable, falling back to `default`
fn parse_env<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr + ToString,
{
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| format!("{} must be a valid number", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_provider_parse() {
        assert_eq!(StorageProvider::parse("s3"), Ok(StorageProvider::S3));
        assert_eq!(StorageProvider::parse("MinIO"), Ok(StorageProvider::S3));
        assert_eq!(StorageProvider::parse("GCS"), Ok(StorageProvider::Gcs));
        assert!(StorageProvider::parse("azure").is_err());
    }

    #[test]
    fn test_swagger_credentials() {
        let mut swagger = SwaggerConfig {
            username: Some("docs".to_string()),
            password: None,
            title: String::new(),
            version: String::new(),
            description: String::new(),
        };
        assert_eq!(swagger.credentials(), None);

        swagger.password = Some("secret".to_string());
        assert_eq!(swagger.credentials().as_deref(), Some("docs:secret"));
    }

    #[test]
    fn test_manual_payments_need_explicit_opt_in() {
        let err = PaymentConfig::manual(false).unwrap_err();
        assert!(err.contains("PAYMENT_ALLOW_UNSIGNED_WEBHOOKS"));
        assert!(matches!(PaymentConfig::manual(true), Ok(PaymentConfig::Manual)));
    }
}
