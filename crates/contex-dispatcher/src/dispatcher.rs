//! Notification Dispatcher (spec §4.5): fan-out on publish, per-agent
//! ordered delivery, and the webhook/pub-sub split. Main-loop shape
//! generalizes `rootsignal-engine::engine::Engine`'s persist→reduce→route
//! loop: here there is no accumulated reducer state beyond each
//! registration's `last_seen_sequence`, so the loop is just "drain a queue
//! of pending deliveries until settled".

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sqlx::PgPool;
use tracing::warn;

use contex_core::types::{AgentRegistration, DeliveryTarget, Match, UpdateMessage, UpdateMessageType};
use contex_core::ContexResult;
use contex_matcher::SemanticMatcher;
use contex_registry::Registry;

use crate::circuit::CircuitBreakerManager;
use crate::circuit_store;
use crate::error::DispatcherResult;
use crate::pubsub::PubSubHub;
use crate::queue::AgentQueue;
use crate::retry::RetryConfig;
use crate::webhook::{self, WebhookOutcome};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub queue_capacity: usize,
    pub retry: RetryConfig,
    pub circuit_failure_threshold: u32,
    pub circuit_cooldown: Duration,
}

pub struct Dispatcher {
    registry: Registry,
    matcher: Arc<SemanticMatcher>,
    pool: PgPool,
    http: reqwest::Client,
    pubsub: Arc<PubSubHub>,
    circuits: Arc<CircuitBreakerManager>,
    queues: DashMap<String, Arc<AgentQueue>>,
    consumers: DashMap<String, tokio::task::JoinHandle<()>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub async fn new(pool: PgPool, registry: Registry, matcher: Arc<SemanticMatcher>, config: DispatcherConfig) -> DispatcherResult<Self> {
        let circuits = Arc::new(CircuitBreakerManager::new(config.circuit_failure_threshold, config.circuit_cooldown));
        circuit_store::load(&pool, &circuits).await?;

        Ok(Self {
            registry,
            matcher,
            pool,
            http: reqwest::Client::new(),
            pubsub: Arc::new(PubSubHub::new()),
            circuits,
            queues: DashMap::new(),
            consumers: DashMap::new(),
            config,
        })
    }

    pub fn pubsub(&self) -> &PubSubHub {
        &self.pubsub
    }

    pub fn circuit_snapshot(&self) -> Vec<(String, crate::circuit::CircuitState, u32)> {
        self.circuits.snapshot()
    }

    /// Fan-out for a single published node (spec §4.5 steps 1-3): every
    /// registration in `project_id` is checked against `node_embedding`
    /// restricted to the single node just published.
    pub async fn dispatch_node(
        &self,
        project_id: &str,
        sequence: i64,
        data_key: &str,
        node_key: &str,
        node_embedding: &[f32],
        data: &serde_json::Value,
        threshold: f32,
    ) -> ContexResult<()> {
        let registrations = self.registry.list(Some(project_id)).await?;

        for reg in registrations {
            let mut matched_need = None;
            for need in &reg.needs {
                if self.matcher.interested(need, node_embedding, threshold).await? {
                    matched_need = Some(need.clone());
                    break;
                }
            }
            let Some(matched_need) = matched_need else { continue };

            let message = UpdateMessage {
                message_type: UpdateMessageType::DataUpdate,
                project_id: project_id.to_string(),
                agent_id: reg.agent_id.clone(),
                sequence,
                data_key: data_key.to_string(),
                node_key: node_key.to_string(),
                data: data.clone(),
                matched_need,
            };
            self.enqueue(&reg, message);
        }
        Ok(())
    }

    /// Initial snapshot on registration (spec §4.5): top matches per need
    /// against the project's current ContextNodes.
    pub async fn initial_snapshot(
        &self,
        project_id: &str,
        needs: &[String],
        max_matches: usize,
        threshold: f32,
        hybrid: bool,
        matcher_config: &contex_matcher::MatcherConfig,
    ) -> ContexResult<Vec<Vec<Match>>> {
        let result = self.matcher.query(project_id, needs, max_matches, threshold, hybrid, matcher_config).await?;
        Ok(result.per_query)
    }

    /// Stops the per-agent consumer task and drops its queue (called on
    /// `unregister`). A no-op if the agent never had a live queue.
    pub fn remove_agent(&self, agent_id: &str) {
        if let Some((_, handle)) = self.consumers.remove(agent_id) {
            handle.abort();
        }
        self.queues.remove(agent_id);
        self.pubsub.unsubscribe(agent_id);
    }

    fn enqueue(&self, reg: &AgentRegistration, message: UpdateMessage) {
        let queue = self
            .queues
            .entry(reg.agent_id.clone())
            .or_insert_with(|| {
                let queue = Arc::new(AgentQueue::new(self.config.queue_capacity));
                let handle = self.spawn_consumer(reg.clone(), queue.clone());
                self.consumers.insert(reg.agent_id.clone(), handle);
                queue
            })
            .clone();

        if queue.push(message) {
            metrics::counter!("dispatch_queue_overflow_total").increment(1);
        }
    }

    fn spawn_consumer(&self, reg: AgentRegistration, queue: Arc<AgentQueue>) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        let pubsub = self.pubsub.clone();
        let circuits = self.circuits.clone();
        let pool = self.pool.clone();
        let http = self.http.clone();
        let retry = self.config.retry;
        let agent_id = reg.agent_id;

        tokio::spawn(async move {
            loop {
                let message = queue.pop().await;

                let delivery = match registry.get(&agent_id).await {
                    Ok(reg) => reg.delivery,
                    Err(_) => return, // unregistered: stop delivering
                };

                let delivered = deliver_one(&delivery, &message, &pubsub, &circuits, &pool, &http, &retry).await;

                if delivered {
                    if let Err(err) = registry.advance_last_seen(&agent_id, message.sequence).await {
                        warn!(%agent_id, error = %err, "failed to advance last_seen_sequence after delivery");
                    }
                }
            }
        })
    }
}

async fn deliver_one(
    delivery: &DeliveryTarget,
    message: &UpdateMessage,
    pubsub: &PubSubHub,
    circuits: &CircuitBreakerManager,
    pool: &PgPool,
    http: &reqwest::Client,
    retry: &RetryConfig,
) -> bool {
    match delivery {
        DeliveryTarget::Pubsub { .. } => {
            // Best-effort: a missed delivery still counts as handled, the
            // agent reconciles via read(since) on reconnect.
            pubsub.publish(&message.agent_id, message.clone());
            true
        }
        DeliveryTarget::Webhook { url, hmac_secret } => {
            let breaker = circuits.get_or_create(url);
            let outcome = webhook::deliver(http, url, hmac_secret.as_deref(), message, &breaker, retry).await;
            if let Err(err) = circuit_store::persist(pool, url, breaker.current_state(), breaker.consecutive_failures()).await {
                warn!(%url, error = %err, "failed to persist circuit breaker state");
            }
            matches!(outcome, WebhookOutcome::Delivered)
        }
    }
}
