//! HTTP webhook delivery: status-check-then-body-read pattern follows
//! `rootsignal-scout-supervisor::notify::slack::SlackWebhook::post`,
//! generalized with the retry/circuit-breaker policy from spec §4.5.

use contex_core::types::UpdateMessage;
use uuid::Uuid;

use crate::circuit::CircuitBreaker;
use crate::retry::{backoff_delay, is_retryable_status, RetryConfig};
use crate::signing::sign_body;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Delivered,
    CircuitOpen,
    Failed,
}

/// Sends `message` to `url`, signing the body with `hmac_secret` when
/// present, retrying per `config` and respecting `breaker`.
pub async fn deliver(
    http: &reqwest::Client,
    url: &str,
    hmac_secret: Option<&str>,
    message: &UpdateMessage,
    breaker: &CircuitBreaker,
    config: &RetryConfig,
) -> WebhookOutcome {
    if !breaker.allow_request() {
        metrics::counter!("webhook_dropped_circuit_open_total").increment(1);
        return WebhookOutcome::CircuitOpen;
    }

    let body = match serde_json::to_vec(message) {
        Ok(body) => body,
        Err(_) => return WebhookOutcome::Failed,
    };
    let delivery_id = Uuid::new_v4();

    for attempt in 0..config.max_attempts {
        if attempt > 0 && !breaker.allow_request() {
            // The breaker tripped mid-retry (this delivery's own failures
            // reached the threshold); stop spending attempts on it.
            metrics::counter!("webhook_dropped_circuit_open_total").increment(1);
            return WebhookOutcome::CircuitOpen;
        }

        let mut request = http
            .post(url)
            .header("Content-Type", "application/json")
            .header("X-Contex-Event", "data_update")
            .header("X-Contex-Delivery", delivery_id.to_string());

        if let Some(secret) = hmac_secret {
            request = request.header("X-Contex-Signature", sign_body(secret, &body));
        }

        let result = request.body(body.clone()).send().await;

        match result {
            Ok(response) if response.status().is_success() => {
                breaker.record_success();
                return WebhookOutcome::Delivered;
            }
            Ok(response) => {
                let status = response.status().as_u16();
                breaker.record_failure();
                if !is_retryable_status(status) {
                    return WebhookOutcome::Failed;
                }
            }
            Err(_) => {
                // transport error: retryable, but still a failure for the breaker.
                breaker.record_failure();
            }
        }

        if attempt + 1 < config.max_attempts {
            tokio::time::sleep(backoff_delay(config, attempt)).await;
        }
    }

    WebhookOutcome::Failed
}
