use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use crate::config::EmailConfig;
use crate::render::Newsletter;

const SENDGRID_API_URL: &str = "https://api.sendgrid.com";

/// Delivers a rendered newsletter to its readers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, newsletter: &Newsletter) -> anyhow::Result<()>;
}

/// Used when email delivery is not configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send(&self, _newsletter: &Newsletter) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Sends HTML mail through the SendGrid v3 mail API.
pub struct SendGridNotifier {
    http: Client,
    api_key: String,
    base_url: String,
    from: String,
    from_name: String,
    to: Vec<String>,
}

impl SendGridNotifier {
    pub fn new(http: Client, api_key: &str, email: &EmailConfig, app_name: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: SENDGRID_API_URL.to_string(),
            from: email.from.clone(),
            from_name: email
                .from_name
                .clone()
                .unwrap_or_else(|| app_name.to_string()),
            to: email.to.clone(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl Notifier for SendGridNotifier {
    async fn send(&self, newsletter: &Newsletter) -> anyhow::Result<()> {
        if self.to.is_empty() {
            anyhow::bail!("no email recipients configured");
        }

        let recipients: Vec<_> = self.to.iter().map(|email| json!({ "email": email })).collect();
        let request = json!({
            "personalizations": [{ "to": recipients }],
            "from": { "email": self.from, "name": self.from_name },
            "subject": newsletter.subject,
            "content": [{ "type": "text/html", "value": newsletter.html }],
        });

        let response = self
            .http
            .post(format!("{}/v3/mail/send", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("SendGrid error ({}): {}", status, error_text);
        }

        info!(recipients = self.to.len(), subject = %newsletter.subject, "Newsletter sent");
        Ok(())
    }
}
