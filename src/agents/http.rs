//! HTTP-backed agent
//!
//! Each remote agent service exposes `GET /health` plus one POST endpoint
//! per capability (see `Capability::path`).

use super::{Agent, AgentRole, Capability};
use crate::error::OrchestrationError;
use crate::Result;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HttpAgent {
    role: AgentRole,
    client: Client,
    base_url: String,
}

impl HttpAgent {
    pub fn new(role: AgentRole, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            role,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| OrchestrationError::AgentCall {
                role: self.role,
                reason: format!("request to {} failed: {}", path, e),
            })?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: format!("{} returned {}: {}", path, status, text),
            });
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| OrchestrationError::InvalidAgentResponse {
                role: self.role,
                reason: format!("invalid JSON from {}: {}", path, e),
            })?;

        unwrap_service_envelope(self.role, body)
    }
}

/// Agent services may wrap results as `{status, data, error}`.
fn unwrap_service_envelope(role: AgentRole, body: Value) -> Result<Value> {
    let status = body.get("status").and_then(Value::as_str);

    match status {
        Some("error") => {
            let reason = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("agent reported an error")
                .to_string();
            Err(OrchestrationError::AgentCall { role, reason })
        }
        Some("success") | Some("ok") if body.get("data").is_some() => {
            Ok(body.get("data").cloned().unwrap_or(Value::Null))
        }
        _ => {
            if let Some(reason) = body.get("error").and_then(Value::as_str) {
                return Err(OrchestrationError::AgentCall {
                    role,
                    reason: reason.to_string(),
                });
            }
            if body.is_object() {
                Ok(body)
            } else {
                Err(OrchestrationError::InvalidAgentResponse {
                    role,
                    reason: "expected a JSON object".to_string(),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl Agent for HttpAgent {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn initialize(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(role = %self.role, url = %url, "Agent healthy");
                Ok(true)
            }
            Ok(response) => {
                warn!(role = %self.role, status = %response.status(), "Agent health check failed");
                Ok(false)
            }
            Err(e) => {
                warn!(role = %self.role, error = %e, "Agent unreachable");
                Ok(false)
            }
        }
    }

    async fn call(&self, capability: Capability, payload: Value) -> Result<Value> {
        if capability.role() != self.role {
            return Err(OrchestrationError::AgentCall {
                role: self.role,
                reason: format!("capability {} not supported", capability),
            });
        }

        self.post_json(capability.path(), &payload).await
    }
}
