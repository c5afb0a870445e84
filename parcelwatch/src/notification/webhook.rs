//! Generic webhook notification channel.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{NotificationChannel, NotificationError, build_client, check_response};

const CHANNEL: &str = "webhook";

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    destination: &'a str,
    message: &'a str,
    timestamp: DateTime<Utc>,
}

/// POSTs each notification as JSON to a fixed URL.
pub struct WebhookChannel {
    url: String,
    client: Client,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Result<Self, NotificationError> {
        Ok(Self {
            url: url.into(),
            client: build_client(CHANNEL)?,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn channel_type(&self) -> &'static str {
        CHANNEL
    }

    async fn send(&self, destination: &str, message: &str) -> Result<(), NotificationError> {
        let payload = WebhookPayload {
            destination,
            message,
            timestamp: Utc::now(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|source| NotificationError::Request {
                channel: CHANNEL,
                source,
            })?;

        check_response(CHANNEL, response).await?;
        debug!(url = %self.url, "Webhook notification sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn receive(
        State(received): State<Received>,
        axum::Json(body): axum::Json<serde_json::Value>,
    ) -> StatusCode {
        received.lock().await.push(body);
        StatusCode::NO_CONTENT
    }

    async fn start_receiver(received: Received) -> String {
        let app = Router::new()
            .route("/hook", post(receive))
            .route("/broken", post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
            .with_state(received);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let received = Received::default();
        let base = start_receiver(Arc::clone(&received)).await;
        let channel = WebhookChannel::new(format!("{base}/hook")).unwrap();

        channel
            .send("+447700900123", "3 new parcels delivered")
            .await
            .unwrap();

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["destination"], "+447700900123");
        assert_eq!(received[0]["message"], "3 new parcels delivered");
        assert!(received[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_non_success_is_rejected() {
        let base = start_receiver(Received::default()).await;
        let channel = WebhookChannel::new(format!("{base}/broken")).unwrap();

        let err = channel.send("me", "hello").await.unwrap_err();
        assert!(matches!(
            err,
            NotificationError::Rejected { status, ref body, .. }
                if status == reqwest::StatusCode::BAD_GATEWAY && body == "upstream down"
        ));
    }

    #[tokio::test]
    async fn test_unreachable_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let channel = WebhookChannel::new(format!("http://{addr}/hook")).unwrap();
        let err = channel.send("me", "hello").await.unwrap_err();
        assert!(matches!(err, NotificationError::Request { channel: "webhook", .. }));
    }
}
