use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub smtp: Option<SmtpConfig>,
}

/// SMTP settings for OTP and password-reset mail. Optional: without them the
/// mailer logs that dispatch was skipped instead of sending.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let smtp = SmtpConfig::from_env()?;
        Ok(Self {
            port,
            database_url,
            host,
            smtp,
        })
    }
}

impl SmtpConfig {
    fn from_env() -> anyhow::Result<Option<Self>> {
        let host = match env::var("SMTP_HOST") {
            Ok(h) => h,
            Err(_) => return Ok(None),
        };
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let username = env::var("SMTP_USERNAME")?;
        let password = env::var("SMTP_PASSWORD")?;
        let from_address =
            env::var("SMTP_FROM").unwrap_or_else(|_| "no-reply@ecofinds.example".to_string());
        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from_address,
        }))
    }
}
