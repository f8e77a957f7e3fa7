//! Alert notifications and where they are delivered

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    Message, Transport, transport::smtp::SmtpTransport,
    transport::smtp::authentication::Credentials,
};
use serde::Serialize;
use tracing::info;

use crate::alerts::AlertResult;

pub const WIND_ALERT_TITLE: &str = "Strong wind alert";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Identical keys describe the same event; sinks may collapse them
    pub dedup_key: String,
}

impl Notification {
    /// The notification for a fired alert, `None` when it did not fire
    #[must_use]
    pub fn wind_alert(alert_id: &str, result: &AlertResult, unit: &str) -> Option<Self> {
        let trigger = result.trigger_time.filter(|_| result.should_alert)?;
        let value = result
            .measured_value
            .map_or_else(|| "—".to_string(), |v| format!("{v:.1}"));

        Some(Self {
            title: WIND_ALERT_TITLE.to_string(),
            body: format!(
                "Wind or gusts: {value} {unit} at {} for {} hours",
                trigger.format("%d-%m-%Y %H:%M"),
                result.hours_above_threshold
            ),
            dedup_key: format!("{alert_id}:{}", trigger.format("%Y-%m-%dT%H")),
        })
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            key = %notification.dedup_key,
            "{}: {}", notification.title, notification.body
        );
        Ok(())
    }
}

/// Mails notifications through Gmail SMTP
pub struct EmailNotifier {
    mailer: SmtpTransport,
    from: String,
    to: String,
}

impl EmailNotifier {
    /// Configure from `GMAIL_ADDRESS`, `GMAIL_APP_PASSWORD` and `NOTIFICATION_EMAIL`
    pub fn from_env() -> Result<Self> {
        let gmail_address = env::var("GMAIL_ADDRESS").context("Missing GMAIL_ADDRESS env var")?;
        let gmail_app_password =
            env::var("GMAIL_APP_PASSWORD").context("Missing GMAIL_APP_PASSWORD env var")?;
        let to = env::var("NOTIFICATION_EMAIL").context("Missing NOTIFICATION_EMAIL env var")?;

        let mailer = SmtpTransport::relay("smtp.gmail.com")?
            .credentials(Credentials::new(gmail_address.clone(), gmail_app_password))
            .build();

        Ok(Self {
            mailer,
            from: format!("WindRadar <{gmail_address}>"),
            to,
        })
    }

    fn message(&self, notification: &Notification) -> Result<Message> {
        Ok(Message::builder()
            .from(self.from.parse().context("Failed to parse from address")?)
            .to(self.to.parse().context("Failed to parse to address")?)
            .subject(&notification.title)
            .body(notification.body.clone())?)
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let email = self.message(notification)?;
        let mailer = self.mailer.clone();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await?
            .context("Failed to send email")?;

        info!("Sent alert email to {}", self.to);
        Ok(())
    }
}

/// Delivers to every sink, failing if any of them fails
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let results = futures::future::join_all(self.sinks.iter().map(|s| s.notify(notification))).await;
        results.into_iter().collect()
    }
}
