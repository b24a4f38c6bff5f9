//! Webhook delivery transport.
//!
//! POSTs every notice as JSON to a configured sink URL — the deployment's
//! bridge to whatever chat or messaging system actually reaches recipients.
//! The sink's HTTP status is mapped onto the engine's delivery taxonomy:
//! 2xx delivered, 404/410 recipient gone (blocked), everything else
//! transient.

use std::{future::Future, time::Duration};

use anyhow::Context as _;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use herald_core::{
  subscriber::SubscriberId,
  transport::{DeliveryResult, Notice, Transport},
};

/// [`Transport`] implementation over an HTTP webhook.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct WebhookTransport {
  client: Client,
  url:    String,
}

impl WebhookTransport {
  pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, url: url.into() })
  }
}

#[derive(Serialize)]
struct DeliveryPayload<'a> {
  recipient_id: &'a str,
  notice:       &'a Notice,
}

impl Transport for WebhookTransport {
  fn deliver<'a>(
    &'a self,
    recipient: &'a SubscriberId,
    notice: &'a Notice,
  ) -> impl Future<Output = DeliveryResult> + Send + 'a {
    async move {
      let payload = DeliveryPayload {
        recipient_id: recipient.as_str(),
        notice,
      };

      match self.client.post(&self.url).json(&payload).send().await {
        Ok(resp) if resp.status().is_success() => DeliveryResult::Delivered,
        Ok(resp)
          if resp.status() == StatusCode::NOT_FOUND
            || resp.status() == StatusCode::GONE =>
        {
          DeliveryResult::Blocked
        }
        Ok(resp) => DeliveryResult::Transient(format!(
          "delivery sink returned {}",
          resp.status()
        )),
        Err(e) if e.is_timeout() => {
          DeliveryResult::Transient("delivery request timed out".into())
        }
        Err(e) => DeliveryResult::Transient(e.to_string()),
      }
    }
  }
}
