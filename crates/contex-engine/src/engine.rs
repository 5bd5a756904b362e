//! Context Engine façade (spec §4.7): sequences publish → log → index →
//! dispatch, and register → snapshot → subscribe. Grounded on
//! `rootsignal-core::deps::ServerDeps` for the explicit-context shape; the
//! façade itself has no teacher precedent (the teacher has no equivalent
//! single-entry-point orchestrator) and is written directly from spec.md
//! §4.7, in the same "thin, no business logic of its own" register as
//! `rootsignal-engine::engine::Engine`'s top-level `run` method.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use contex_core::hash::hex_sha256_json;
use contex_core::types::{
    AgentRegistration, AppendEvent, ContextNode, DataPublishedPayload, DeliveryTarget, EventType, Match, StoredEvent,
};
use contex_degradation::DegradationMode;
use contex_matcher::MatcherConfig;

use crate::decompose::decompose;
use crate::deps::EngineDeps;
use crate::description::{default_description, text_summary};
use crate::error::{EngineError, EngineResult};
use crate::normalize::{normalize, DataFormat};
use crate::outbox::OutboxEntry;

pub struct PublishRequest {
    pub project_id: String,
    pub data_key: String,
    pub raw_data: String,
    pub data_format: DataFormat,
    pub description: Option<String>,
    /// Caller-supplied cancellation (spec §5): checked before each
    /// suspension point the façade owns. A completed log append is never
    /// rolled back; cancellation only stops work that hasn't happened yet.
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub sequence: i64,
    pub node_keys: Vec<String>,
    /// `true` when this publish's content hash matched the previous
    /// version of every node it touched (spec §8 invariant 5, opt-in
    /// idempotence: the event is still appended, but no additional
    /// dispatch was triggered for unchanged nodes).
    pub deduplicated: bool,
}

pub struct RegisterRequest {
    pub agent_id: String,
    pub project_id: String,
    pub needs: Vec<String>,
    pub delivery: DeliveryTarget,
    pub since: Option<i64>,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub registration: AgentRegistration,
    pub matched_needs_count: usize,
    pub initial_matches: Vec<Vec<Match>>,
}

pub struct ContexEngine {
    deps: EngineDeps,
}

impl ContexEngine {
    pub fn new(deps: EngineDeps) -> Self {
        Self { deps }
    }

    pub fn deps(&self) -> &EngineDeps {
        &self.deps
    }

    /// Publish a record (spec §4.7): normalize, decompose, embed, append to
    /// the log, project into the vector index, fan out to interested
    /// agents. The log append is the durability boundary — on
    /// `DegradationMode::Unavailable` we fail before touching it; once it
    /// succeeds, the event is durable even if the index/dispatch step that
    /// follows is deferred into the outbox.
    #[instrument(skip(self, req), fields(project_id = %req.project_id, data_key = %req.data_key))]
    pub async fn publish(&self, req: PublishRequest) -> EngineResult<PublishOutcome> {
        if self.deps.degradation.mode() == DegradationMode::Unavailable {
            return Err(EngineError::Unavailable);
        }
        check_cancelled(&req.cancel)?;

        let normalized = normalize(&req.raw_data, req.data_format)?;
        let decomposed = decompose(&req.data_key, &normalized, self.deps.config.max_context_size);

        let mut nodes = Vec::with_capacity(decomposed.len());
        let mut node_keys = Vec::with_capacity(decomposed.len());

        for node in decomposed {
            check_cancelled(&req.cancel)?;
            let description = match &req.description {
                Some(d) if decomposed_is_singleton(&node.pointer) => d.clone(),
                _ => default_description(&node.node_key, &text_summary(&node.value)),
            };
            let content_hash = hex_sha256_json(&node.value);

            let embedding = self.deps.embedding.encode(&description).await?;

            node_keys.push(node.node_key.clone());
            nodes.push(ContextNode {
                project_id: req.project_id.clone(),
                data_key: req.data_key.clone(),
                node_key: node.node_key,
                description,
                payload: node.value,
                embedding,
                content_hash,
                created_at: Utc::now(),
            });
        }

        check_cancelled(&req.cancel)?;

        let payload = DataPublishedPayload {
            data_key: req.data_key.clone(),
            node_keys: node_keys.clone(),
            data: normalized.clone(),
        };
        // Past this point the event is durable (spec §5); cancellation no
        // longer stops the publish, only the `Ok` it returns.
        let sequence = self
            .deps
            .event_log
            .append(AppendEvent::new(&req.project_id, EventType::DataPublished, serde_json::to_value(&payload).unwrap()))
            .await?;

        let threshold = self.deps.config.similarity_threshold;

        // The dedup check (spec §8 invariant 5) reads the vector index, the
        // same dependency the `Degraded` mode tracks as unhealthy — so it is
        // skipped outright while `Degraded` (the outbox path below doesn't
        // use `any_changed` anyway) and its failure, should the index flip
        // unhealthy between the mode check above and this read, is treated
        // as "couldn't confirm, so don't skip the dispatch" rather than
        // failing the whole publish: the log append above is already
        // durable (spec §4.8 "publishes still succeed, log is
        // authoritative") and must not be undone by a read-only lookup on
        // a dependency that isn't even on the append's critical path.
        let degraded = self.deps.degradation.mode() == DegradationMode::Degraded;
        let any_changed = if degraded {
            true
        } else {
            match self.existing_hashes(&req.project_id).await {
                Ok(existing) => nodes.iter().any(|n| existing.get(&n.node_key).map(|h| h != &n.content_hash).unwrap_or(true)),
                Err(err) => {
                    warn!(sequence, error = %err, "existing-hash lookup failed, dispatching without dedup");
                    true
                }
            }
        };

        if degraded {
            info!(sequence, "index/dispatch deferred to outbox: index unhealthy");
            self.deps.outbox.push(OutboxEntry {
                project_id: req.project_id.clone(),
                sequence,
                data_key: req.data_key.clone(),
                data: normalized,
                nodes,
                threshold,
            });
        } else if any_changed {
            self.project_and_dispatch(&req.project_id, sequence, &req.data_key, &normalized, &nodes, threshold).await?;
        }
        // else: byte-identical republish (invariant 5) — event appended, no
        // re-embedding happened (hashes matched), no additional dispatch.

        Ok(PublishOutcome { sequence, node_keys, deduplicated: !degraded && !any_changed })
    }

    async fn existing_hashes(&self, project_id: &str) -> EngineResult<std::collections::HashMap<String, String>> {
        let nodes = self.deps.vector_index.list(project_id).await?;
        Ok(nodes.into_iter().map(|n| (n.node_key, n.content_hash)).collect())
    }

    async fn project_and_dispatch(
        &self,
        project_id: &str,
        sequence: i64,
        data_key: &str,
        data: &serde_json::Value,
        nodes: &[ContextNode],
        threshold: f32,
    ) -> EngineResult<()> {
        for node in nodes {
            self.deps.vector_index.upsert(node).await?;
        }
        for node in nodes {
            self.deps
                .dispatcher
                .dispatch_node(project_id, sequence, data_key, &node.node_key, &node.embedding, data, threshold)
                .await
                .map_err(EngineError::Core)?;
        }
        Ok(())
    }

    /// Retries every deferred publish once the degradation controller has
    /// recovered to `Normal`. Call from a background task watching
    /// `DegradationController::mode()`.
    pub async fn drain_outbox(&self) -> EngineResult<usize> {
        let entries = self.deps.outbox.drain();
        let count = entries.len();
        for entry in entries {
            if let Err(err) = self
                .project_and_dispatch(&entry.project_id, entry.sequence, &entry.data_key, &entry.data, &entry.nodes, entry.threshold)
                .await
            {
                warn!(project_id = %entry.project_id, sequence = entry.sequence, error = %err, "outbox replay failed, re-queuing");
                self.deps.outbox.push(entry);
            }
        }
        Ok(count)
    }

    /// Ad-hoc semantic query (spec §4.7): delegates to the matcher, no
    /// mutation. Rejected with `Degraded`/`Unavailable` per spec §4.8.
    pub async fn query(
        &self,
        project_id: &str,
        queries: &[String],
        top_k: usize,
        threshold: f32,
        hybrid: bool,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<Vec<Match>>> {
        self.reject_unless_normal()?;
        check_cancelled(cancel)?;

        let config = MatcherConfig { w_sem: self.deps.config.knn_weight as f64, w_kw: self.deps.config.bm25_weight as f64 };
        let result = self.deps.matcher.query(project_id, queries, top_k, threshold, hybrid, &config).await?;
        Ok(result.per_query)
    }

    /// Register an agent (spec §4.5, §4.6): persist, compute the initial
    /// snapshot, return. Rejected under `Degraded`/`Unavailable`.
    #[instrument(skip(self, req), fields(agent_id = %req.agent_id, project_id = %req.project_id))]
    pub async fn register(&self, req: RegisterRequest) -> EngineResult<RegisterOutcome> {
        self.reject_unless_normal()?;
        check_cancelled(&req.cancel)?;

        let current_length = self.deps.event_log.length(&req.project_id).await?;

        let registration = self
            .deps
            .registry
            .register(
                contex_registry::RegisterRequest {
                    agent_id: req.agent_id,
                    project_id: req.project_id.clone(),
                    needs: req.needs.clone(),
                    delivery: req.delivery,
                    since: req.since,
                },
                current_length,
            )
            .await?;

        let config = MatcherConfig { w_sem: self.deps.config.knn_weight as f64, w_kw: self.deps.config.bm25_weight as f64 };
        let initial_matches = self
            .deps
            .dispatcher
            .initial_snapshot(
                &req.project_id,
                &req.needs,
                self.deps.config.max_matches,
                self.deps.config.similarity_threshold,
                self.deps.config.hybrid_search_enabled,
                &config,
            )
            .await
            .map_err(EngineError::Core)?;

        let matched_needs_count = initial_matches.iter().filter(|m| !m.is_empty()).count();

        Ok(RegisterOutcome { registration, matched_needs_count, initial_matches })
    }

    pub async fn unregister(&self, agent_id: &str) -> EngineResult<()> {
        self.deps.registry.unregister(agent_id).await?;
        self.deps.dispatcher.remove_agent(agent_id);
        Ok(())
    }

    /// Delegates to the Event Log (spec §4.7 `events`).
    pub async fn events(&self, project_id: &str, since: i64, count: i64, cancel: &CancellationToken) -> EngineResult<Vec<StoredEvent>> {
        check_cancelled(cancel)?;
        Ok(self.deps.event_log.read(project_id, since, count).await?)
    }

    /// A live pub/sub receiver for `agent_id` (spec §4.5 pub/sub delivery
    /// mode). The caller (the out-of-scope HTTP/WebSocket layer) owns
    /// forwarding received messages to the actual client connection.
    pub fn pubsub_receiver(&self, agent_id: &str) -> tokio::sync::mpsc::Receiver<contex_core::types::UpdateMessage> {
        self.deps.dispatcher.pubsub().subscribe(agent_id)
    }

    fn reject_unless_normal(&self) -> EngineResult<()> {
        match self.deps.degradation.mode() {
            DegradationMode::Normal => Ok(()),
            DegradationMode::Degraded => Err(EngineError::Degraded { retry_after_seconds: self.deps.degradation.retry_after_seconds() }),
            DegradationMode::Unavailable => Err(EngineError::Unavailable),
        }
    }
}

/// Checked at every suspension point a public façade operation owns (spec
/// §5). A token cancelled mid-publish stops before the log append, which is
/// the durability boundary; nothing after that point is rolled back.
fn check_cancelled(cancel: &CancellationToken) -> EngineResult<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Core(contex_core::ContexError::Cancelled));
    }
    Ok(())
}

/// Whether a decomposed node is the sole node for its publish (root
/// pointer, nothing split off) — the caller-supplied `description`
/// applies only to this case; split-off children always get a generated
/// per-node description, since one caller-supplied description can't
/// meaningfully describe every fragment.
fn decomposed_is_singleton(pointer: &str) -> bool {
    pointer.is_empty()
}
