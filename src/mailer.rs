use anyhow::Context;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
};

use crate::config::SmtpConfig;

/// Outbound mail collaborator for OTP codes and password-reset links.
///
/// Without SMTP configuration every send becomes a log line, so local
/// development and tests run without a mail server.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: Option<&SmtpConfig>) -> anyhow::Result<Self> {
        let Some(config) = config else {
            return Ok(Self::disabled());
        };

        let credentials =
            Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .context("invalid SMTP host")?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport: Some(transport),
            from_address: config.from_address.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            from_address: "no-reply@ecofinds.example".to_string(),
        }
    }

    pub async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let body = format!(
            "Your EcoFinds verification code is {code}. It expires in 10 minutes."
        );
        self.send(to, "Your EcoFinds verification code", body).await
    }

    pub async fn send_password_reset(&self, to: &str, token: &str) -> anyhow::Result<()> {
        let body = format!(
            "A password reset was requested for your EcoFinds account.\n\
             Use this token to set a new password: {token}\n\
             The token expires in 1 hour. If you did not request this, ignore this message."
        );
        self.send(to, "Reset your EcoFinds password", body).await
    }

    async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        let Some(transport) = &self.transport else {
            tracing::info!(%to, %subject, "SMTP not configured, skipping mail dispatch");
            return Ok(());
        };

        let message = Message::builder()
            .from(self.from_address.parse().context("invalid from address")?)
            .to(to.parse().context("invalid recipient address")?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .context("failed to build message")?;

        transport.send(message).await.context("smtp send failed")?;
        tracing::debug!(%to, %subject, "mail dispatched");
        Ok(())
    }
}
