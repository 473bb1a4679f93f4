//! Agent registry and lifecycle manager
//!
//! Holds one handle per role, runs initialization and teardown across all
//! agents concurrently, and owns the process-wide readiness flag.

use super::{Agent, AgentRole, Capability, HttpAgent, MockAgent};
use crate::config::OrchestratorConfig;
use crate::error::OrchestrationError;
use crate::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

struct AgentHandle {
    agent: Arc<dyn Agent>,
    ready: AtomicBool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentStatus {
    pub role: AgentRole,
    pub ready: bool,
}

pub struct AgentRegistry {
    handles: HashMap<AgentRole, AgentHandle>,
    ready: AtomicBool,
    init_lock: Mutex<()>,
    call_timeout: Duration,
}

impl AgentRegistry {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            handles: HashMap::new(),
            ready: AtomicBool::new(false),
            init_lock: Mutex::new(()),
            call_timeout,
        }
    }

    /// Register (or replace) the agent serving its role
    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        let role = agent.role();
        self.handles.insert(
            role,
            AgentHandle {
                agent,
                ready: AtomicBool::new(false),
            },
        );
    }

    pub fn get(&self, role: AgentRole) -> Option<Arc<dyn Agent>> {
        self.handles.get(&role).map(|h| h.agent.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Initialize every agent concurrently; true only if all succeed.
    ///
    /// Readiness is set once and never cleared. A failed attempt leaves it
    /// unset and is not retried automatically. Each agent gets at most
    /// `call_timeout`; concurrent callers wait on one another.
    pub async fn initialize(&self) -> bool {
        let _guard = self.init_lock.lock().await;

        if self.is_ready() {
            debug!("Registry already initialized");
            return true;
        }

        let missing: Vec<AgentRole> = AgentRole::ALL
            .iter()
            .filter(|role| !self.handles.contains_key(*role))
            .copied()
            .collect();

        if !missing.is_empty() {
            warn!(?missing, "Agents missing for required roles");
        }

        let results = join_all(self.handles.iter().map(|(role, handle)| async move {
            let ok = match timeout(self.call_timeout, handle.agent.initialize()).await {
                Ok(Ok(true)) => true,
                Ok(Ok(false)) => {
                    warn!(role = %role, "Agent initialization returned failure");
                    false
                }
                Ok(Err(e)) => {
                    error!(role = %role, error = %e, "Agent initialization error");
                    false
                }
                Err(_) => {
                    error!(
                        role = %role,
                        timeout_ms = self.call_timeout.as_millis() as u64,
                        "Agent initialization timed out"
                    );
                    false
                }
            };
            handle.ready.store(ok, Ordering::Release);
            ok
        }))
        .await;

        let all_ok = missing.is_empty() && results.iter().all(|ok| *ok);

        if all_ok {
            self.ready.store(true, Ordering::Release);
            info!(agent_count = self.handles.len(), "All agents initialized");
        } else {
            error!(
                failed = results.iter().filter(|ok| !**ok).count(),
                missing = missing.len(),
                "Agent initialization incomplete"
            );
        }

        all_ok
    }

    /// Tear down every agent concurrently; errors are logged, never raised.
    pub async fn cleanup(&self) {
        join_all(self.handles.iter().map(|(role, handle)| async move {
            match timeout(self.call_timeout, handle.agent.cleanup()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(role = %role, error = %e, "Agent cleanup failed"),
                Err(_) => warn!(
                    role = %role,
                    timeout_ms = self.call_timeout.as_millis() as u64,
                    "Agent cleanup timed out"
                ),
            }
        }))
        .await;

        info!(agent_count = self.handles.len(), "Agent cleanup complete");
    }

    /// Invoke one capability on the agent owning it, bounded by the call timeout
    pub async fn call(&self, capability: Capability, payload: Value) -> Result<Value> {
        let role = capability.role();
        let agent = self
            .get(role)
            .ok_or(OrchestrationError::AgentNotRegistered(role))?;

        let start = Instant::now();
        let outcome = timeout(self.call_timeout, agent.call(capability, payload)).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                debug!(
                    role = %role,
                    capability = %capability,
                    elapsed_ms,
                    ok = result.is_ok(),
                    "Agent call settled"
                );
                result
            }
            Err(_) => Err(OrchestrationError::AgentTimeout {
                role,
                timeout_ms: self.call_timeout.as_millis() as u64,
            }),
        }
    }

    pub fn statuses(&self) -> Vec<AgentStatus> {
        let mut statuses: Vec<AgentStatus> = self
            .handles
            .iter()
            .map(|(role, handle)| AgentStatus {
                role: *role,
                ready: handle.ready.load(Ordering::Acquire),
            })
            .collect();
        statuses.sort_by_key(|s| s.role);
        statuses
    }
}

/// Registry of HTTP agents pointed at the configured services
pub fn create_http_registry(config: &OrchestratorConfig) -> Result<AgentRegistry> {
    let mut registry = AgentRegistry::new(config.agent_timeout);

    for role in AgentRole::ALL {
        let url = config.endpoint(role);
        registry.register(Arc::new(HttpAgent::new(role, url, config.agent_timeout)?));
    }

    Ok(registry)
}

/// Registry of scripted agents answering with canned data
pub fn create_mock_registry(call_timeout: Duration) -> AgentRegistry {
    let mut registry = AgentRegistry::new(call_timeout);

    for role in AgentRole::ALL {
        registry.register(Arc::new(MockAgent::new(role)));
    }

    registry
}
