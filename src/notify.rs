//! Outbound notifications.
//!
//! A mock carrying a notify spec fires a fire-and-forget HTTP call after its
//! response has been resolved; the webhook body is templated like any other
//! field and arrives already filled.

use crate::definition::NotifySpec;
use async_trait::async_trait;
use tracing::{debug, warn};

/// Notifies the interested parties after a mock has been served.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver the notification. Returns whether delivery succeeded.
    async fn notify(&self, spec: &NotifySpec) -> bool;
}

/// Webhook-based notifier.
pub struct HttpNotifier {
    client: reqwest::Client,
}

impl HttpNotifier {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, spec: &NotifySpec) -> bool {
        let Some(webhook) = &spec.webhook else {
            return false;
        };

        let method = reqwest::Method::from_bytes(webhook.method.as_bytes())
            .unwrap_or(reqwest::Method::POST);
        let mut request = self
            .client
            .request(method, &webhook.url)
            .body(webhook.body.clone());
        for (name, value) in &webhook.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        match request.send().await {
            Ok(response) => {
                debug!(url = %webhook.url, status = %response.status(), "notification delivered");
                response.status().is_success()
            }
            Err(e) => {
                warn!(url = %webhook.url, error = %e, "notification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_spec_is_a_no_op() {
        let notifier = HttpNotifier::new();
        assert!(!notifier.notify(&NotifySpec::default()).await);
    }
}
