use reqwest::{Client, Url};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::NotifierConfig;
use crate::risk::types::RiskLevel;

use super::payload::{DeliveryStrategy, PushPayload};

/// Push notification dispatcher for a Bark server.
///
/// Every alert is written to the log first. Delivery walks the strategy
/// cascade under one time budget and never returns an error: the result is
/// only whether some strategy was accepted.
pub struct Notifier {
    client: Client,
    server: Url,
    config: NotifierConfig,
    budget: Duration,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> eyre::Result<Self> {
        let server = Url::parse(&config.server)
            .map_err(|e| eyre::eyre!("Invalid push server URL '{}': {}", config.server, e))?;
        let budget = Duration::from_secs(config.timeout_secs);
        // Whole requests are bounded by the dispatch deadline
        let client = Client::builder()
            .connect_timeout(budget)
            .build()
            .map_err(|e| eyre::eyre!("Failed to create HTTP client: {}", e))?;

        if config.key.is_none() {
            tracing::warn!("No push key configured, alerts will only be logged");
        }

        Ok(Self {
            client,
            server,
            config,
            budget,
        })
    }

    /// Whether a device key is configured.
    pub fn is_enabled(&self) -> bool {
        self.config.key.is_some()
    }

    pub async fn send(&self, message: &str, risk: RiskLevel, voice: bool) -> bool {
        tracing::warn!(risk = risk.as_str(), voice, "Alert: {}", message);

        let Some(key) = self.config.key.as_deref() else {
            return false;
        };
        let payload = PushPayload::alert(&self.config, key, message, risk, voice);
        self.dispatch(&payload).await
    }

    pub async fn send_heartbeat(&self, message: &str) -> bool {
        tracing::info!("Heartbeat: {}", message);

        let Some(key) = self.config.key.as_deref() else {
            return false;
        };
        let payload = PushPayload::heartbeat(&self.config, key, message);
        self.dispatch(&payload).await
    }

    /// Try each strategy in order until one is accepted or the budget runs out.
    pub async fn dispatch(&self, payload: &PushPayload) -> bool {
        let deadline = Instant::now() + self.budget;

        for strategy in DeliveryStrategy::CASCADE {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    strategy = strategy.as_str(),
                    "Push budget exhausted before trying strategy"
                );
                break;
            }

            match tokio::time::timeout(remaining, self.attempt(strategy, payload)).await {
                Ok(Ok(())) => {
                    tracing::info!(strategy = strategy.as_str(), "Push notification delivered");
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        strategy = strategy.as_str(),
                        error = %e,
                        "Push delivery failed, trying next strategy"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        strategy = strategy.as_str(),
                        budget_secs = self.budget.as_secs(),
                        "Push delivery timed out"
                    );
                }
            }
        }

        tracing::error!(title = %payload.title, "All push delivery strategies failed");
        false
    }

    async fn attempt(&self, strategy: DeliveryStrategy, payload: &PushPayload) -> eyre::Result<()> {
        let response = strategy
            .request(&self.client, &self.server, payload)?
            .send()
            .await
            .map_err(|e| eyre::eyre!("Request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(eyre::eyre!("Push server returned {}: {}", status, body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MockPush {
        failing: HashSet<&'static str>,
        slow: bool,
        hits: Mutex<Vec<String>>,
    }

    impl MockPush {
        fn status(&self, route: &'static str) -> StatusCode {
            if self.failing.contains(route) {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            }
        }
    }

    async fn push(
        State(mock): State<Arc<MockPush>>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        if mock.slow {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        mock.hits.lock().unwrap().push(format!(
            "post {} {} {}",
            body["title"].as_str().unwrap_or(""),
            body["level"].as_str().unwrap_or(""),
            body["call"].as_str().unwrap_or("")
        ));
        mock.status("post")
    }

    async fn path_get(
        State(mock): State<Arc<MockPush>>,
        Path((key, title, body)): Path<(String, String, String)>,
        Query(query): Query<HashMap<String, String>>,
    ) -> StatusCode {
        mock.hits.lock().unwrap().push(format!(
            "path {} {} {} {}",
            key,
            title,
            body,
            query.get("sound").map(String::as_str).unwrap_or("")
        ));
        mock.status("path")
    }

    async fn minimal_get(
        State(mock): State<Arc<MockPush>>,
        Path((key, body)): Path<(String, String)>,
    ) -> StatusCode {
        mock.hits.lock().unwrap().push(format!("minimal {} {}", key, body));
        mock.status("minimal")
    }

    async fn serve(mock: Arc<MockPush>) -> String {
        let app = Router::new()
            .route("/push", post(push))
            .route("/{key}/{title}/{body}", get(path_get))
            .route("/{key}/{body}", get(minimal_get))
            .with_state(mock);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn notifier(server: String, key: Option<&str>, timeout_secs: u64) -> Notifier {
        Notifier::new(NotifierConfig {
            server,
            key: key.map(str::to_string),
            title: "Monitor".to_string(),
            group: "pool".to_string(),
            timeout_secs,
        })
        .unwrap()
    }

    fn hits(mock: &MockPush) -> Vec<String> {
        mock.hits.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_primary_strategy_delivers() {
        let mock = Arc::new(MockPush::default());
        let notifier = notifier(serve(mock.clone()).await, Some("devkey"), 5);

        assert!(notifier.send("liquidation", RiskLevel::High, true).await);
        assert_eq!(hits(&mock), vec!["post Monitor - HIGH RISK critical 1"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_path_get() {
        let mock = Arc::new(MockPush {
            failing: HashSet::from(["post"]),
            ..MockPush::default()
        });
        let notifier = notifier(serve(mock.clone()).await, Some("devkey"), 5);

        assert!(notifier.send("a/b c", RiskLevel::Standard, false).await);
        assert_eq!(
            hits(&mock),
            vec!["post Monitor active 0", "path devkey Monitor a/b c minuet"]
        );
    }

    #[tokio::test]
    async fn test_fallback_preserves_multiline_body() {
        let mock = Arc::new(MockPush {
            failing: HashSet::from(["post", "path"]),
            ..MockPush::default()
        });
        let notifier = notifier(serve(mock.clone()).await, Some("devkey"), 5);

        let message = "📤 Withdraw\nAsset: USDC\nAmount: 60.00K USDC";
        assert!(notifier.send(message, RiskLevel::Standard, false).await);

        let seen = hits(&mock);
        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen[1],
            format!("path devkey Monitor {} minuet", message)
        );
        assert_eq!(seen[2], format!("minimal devkey {}", message));
    }

    #[tokio::test]
    async fn test_all_strategies_fail() {
        let mock = Arc::new(MockPush {
            failing: HashSet::from(["post", "path", "minimal"]),
            ..MockPush::default()
        });
        let notifier = notifier(serve(mock.clone()).await, Some("devkey"), 5);

        assert!(!notifier.send("msg", RiskLevel::Standard, false).await);
        let seen = hits(&mock);
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2], "minimal devkey msg");
    }

    #[tokio::test]
    async fn test_no_key_only_logs() {
        let mock = Arc::new(MockPush::default());
        let notifier = notifier(serve(mock.clone()).await, None, 5);

        assert!(!notifier.is_enabled());
        assert!(!notifier.send("msg", RiskLevel::High, true).await);
        assert!(!notifier.send_heartbeat("alive").await);
        assert!(hits(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_budget_is_shared_across_strategies() {
        let mock = Arc::new(MockPush {
            slow: true,
            ..MockPush::default()
        });
        let notifier = notifier(serve(mock.clone()).await, Some("devkey"), 1);

        let started = std::time::Instant::now();
        assert!(!notifier.send("msg", RiskLevel::Standard, false).await);
        assert!(started.elapsed() < Duration::from_secs(3));
        // The slow POST used the whole budget, nothing else was attempted
        assert!(hits(&mock).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_quietly() {
        let notifier = notifier("http://127.0.0.1:9".to_string(), Some("devkey"), 2);
        assert!(!notifier.send("msg", RiskLevel::Standard, false).await);
    }

    #[test]
    fn test_invalid_server_url() {
        let result = Notifier::new(NotifierConfig {
            server: "not a url".to_string(),
            ..NotifierConfig::default()
        });
        assert!(result.is_err());
    }
}
