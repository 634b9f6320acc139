// src/fanout/mod.rs
//! Publish fan-out: candidates → seen-set filter → limiter → render → sign →
//! every destination, collecting per-(candidate, endpoint) results.
//!
//! A candidate is marked seen right before its fan-out starts. If the process
//! dies mid fan-out, some endpoints miss that announcement for good; a
//! duplicate announcement is the worse outcome.

pub mod report;

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::event::{NostrSigner, OutboundMessage};
use crate::identity::RepositoryIdentity;
use crate::limiter::RateLimiter;
use crate::notify::{Destination, PublishError};
use crate::render::Renderer;
use crate::seen::{SeenStore, StoreError};
use crate::source::{Candidate, CandidateSource, SourceQuery};

pub use report::{Delivery, Disposition, ItemError, Outcome, RunError, RunReport};

/// The caller swaps in the partial report before returning.
fn store_down(
    operation: &'static str,
    identity: &RepositoryIdentity,
    source: StoreError,
) -> RunError {
    RunError::DedupStoreUnavailable {
        operation,
        identity: identity.clone(),
        source,
        report: Box::default(),
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "publish_candidates_total",
            "Candidates considered after the batch cap."
        );
        describe_counter!(
            "publish_skipped_seen_total",
            "Candidates skipped because the seen-set already has them."
        );
        describe_counter!(
            "publish_attempts_total",
            "Candidates marked seen and handed to the destinations."
        );
        describe_counter!(
            "publish_deliveries_total",
            "Per-destination publish results."
        );
        describe_counter!("publish_item_errors_total", "Per-item failures by kind.");
        describe_histogram!(
            "publish_limiter_wait_ms",
            "Time spent waiting on the rate limiter, in milliseconds."
        );
        describe_gauge!("publish_run_last_ts", "Unix ts when a publish run last finished.");
    });
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    /// At most this many candidates per run.
    pub batch_cap: usize,
    pub seen_ttl: Duration,
    /// Upper bound for a single destination publish.
    pub publish_timeout: Duration,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            batch_cap: 10,
            seen_ttl: Duration::from_secs(36 * 3600),
            publish_timeout: Duration::from_secs(10),
        }
    }
}

/// Collaborators the engine drives. All shared, all injected.
#[derive(Clone)]
pub struct PublisherDeps {
    pub seen: Arc<dyn SeenStore>,
    pub limiter: Arc<RateLimiter>,
    pub renderer: Arc<dyn Renderer>,
    pub destinations: Vec<Arc<dyn Destination>>,
    pub signer: Option<Arc<NostrSigner>>,
}

pub struct Publisher {
    deps: PublisherDeps,
    settings: PublishSettings,
}

impl Publisher {
    pub fn new(deps: PublisherDeps, settings: PublishSettings) -> Self {
        Self { deps, settings }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    pub fn destination_names(&self) -> Vec<String> {
        self.deps
            .destinations
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    /// Fetch from `source`, then [`Publisher::run`]. A source failure aborts
    /// before anything else happens.
    pub async fn run_from_source(
        &self,
        source: &dyn CandidateSource,
        query: &SourceQuery,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        let candidates = source
            .fetch_trending(query)
            .await
            .map_err(RunError::SourceUnavailable)?;
        info!(
            target: "fanout",
            source = source.name(),
            window = %query.window,
            language = %query.language,
            fetched = candidates.len(),
            "candidates fetched"
        );
        self.run(candidates, cancel).await
    }

    /// Process `candidates` in order.
    ///
    /// Returns `Err` when there is nowhere to publish, when the seen-set cannot
    /// be trusted, or when nothing eligible reached any endpoint; per-item and
    /// per-endpoint failures are recorded in the report.
    pub async fn run(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, RunError> {
        ensure_metrics_described();

        // Marking seen with no endpoint would burn the batch for a whole TTL.
        if self.deps.destinations.is_empty() {
            error!(target: "fanout", "no destinations configured, refusing to run");
            return Err(RunError::NoDestinations);
        }

        let batch: Vec<Candidate> = candidates.into_iter().take(self.settings.batch_cap).collect();
        let mut report = RunReport::new(batch.len());

        for candidate in batch {
            if cancel.is_cancelled() {
                info!(target: "fanout", remaining_from = %candidate.identity, "run cancelled");
                report.cancelled = true;
                break;
            }
            counter!("publish_candidates_total").increment(1);

            let outcome = match self.process(candidate, cancel).await {
                Ok(outcome) => outcome,
                Err(RunError::DedupStoreUnavailable { operation, identity, source, .. }) => {
                    error!(target: "fanout", operation, identity = %identity, error = %source, "seen-set store unavailable, aborting run");
                    return Err(RunError::DedupStoreUnavailable {
                        operation,
                        identity,
                        source,
                        report: Box::new(report),
                    });
                }
                Err(other) => return Err(other),
            };
            report.outcomes.push(outcome);
        }

        gauge!("publish_run_last_ts").set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "fanout",
            considered = report.considered,
            submitted = report.count(Disposition::Submitted),
            seen = report.count(Disposition::AlreadySeen),
            deliveries_ok = report.deliveries_ok(),
            deliveries_failed = report.deliveries_failed(),
            cancelled = report.cancelled,
            "publish run finished"
        );

        if report.nothing_delivered() {
            return Err(RunError::NothingDelivered(Box::new(report)));
        }
        Ok(report)
    }

    async fn process(
        &self,
        candidate: Candidate,
        cancel: &CancellationToken,
    ) -> Result<Outcome, RunError> {
        let id = candidate.identity.clone();

        if self
            .deps
            .seen
            .is_seen(&id)
            .await
            .map_err(|e| store_down("lookup", &id, e))?
        {
            debug!(target: "fanout", identity = %id, "already announced, skipping");
            counter!("publish_skipped_seen_total").increment(1);
            return Ok(Outcome::skipped(id, Disposition::AlreadySeen));
        }

        let waited = Instant::now();
        if self.deps.limiter.wait(cancel).await.is_err() {
            warn!(target: "fanout", identity = %id, "limiter wait cancelled, skipping");
            counter!("publish_item_errors_total", "kind" => "cancelled").increment(1);
            return Ok(Outcome::failed(id, Disposition::Cancelled, ItemError::Cancelled));
        }
        histogram!("publish_limiter_wait_ms").record(waited.elapsed().as_secs_f64() * 1_000.0);

        let content = match self.deps.renderer.render(&candidate) {
            Ok(c) => c,
            Err(e) => {
                warn!(target: "fanout", identity = %id, error = %e, "render failed, skipping");
                counter!("publish_item_errors_total", "kind" => "render").increment(1);
                return Ok(Outcome::failed(id, Disposition::RenderFailed, e.into()));
            }
        };

        let msg = OutboundMessage::build(
            &candidate,
            content,
            self.deps.signer.as_deref(),
            chrono::Utc::now().timestamp(),
        );

        self.deps
            .seen
            .mark_seen(&id, &candidate.url, self.settings.seen_ttl)
            .await
            .map_err(|e| store_down("mark", &id, e))?;
        counter!("publish_attempts_total").increment(1);
        info!(target: "fanout", identity = %id, "publishing");

        let deliveries = self.fan_out(msg).await;
        Ok(Outcome::submitted(id, deliveries))
    }

    /// Publish to every destination concurrently and wait for all of them.
    /// One endpoint failing, timing out or panicking does not affect the others.
    async fn fan_out(&self, msg: OutboundMessage) -> Vec<Delivery> {
        let msg = Arc::new(msg);
        let timeout = self.settings.publish_timeout;

        // Pre-filled so a panicked task still leaves a failure record behind.
        let mut deliveries: Vec<Delivery> = self
            .deps
            .destinations
            .iter()
            .map(|d| Delivery {
                destination: d.name().to_string(),
                result: Err(PublishError::Transport("publish task aborted".into())),
            })
            .collect();

        let mut set = JoinSet::new();
        for (idx, dest) in self.deps.destinations.iter().enumerate() {
            let dest = Arc::clone(dest);
            let msg = Arc::clone(&msg);
            set.spawn(async move {
                let result = match tokio::time::timeout(timeout, dest.publish(&msg)).await {
                    Ok(res) => res,
                    Err(_) => Err(PublishError::Timeout(timeout)),
                };
                (idx, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, result)) => deliveries[idx].result = result,
                Err(e) => warn!(target: "fanout", error = %e, "publish task failed"),
            }
        }

        for d in &deliveries {
            match &d.result {
                Ok(_) => {
                    info!(target: "notify", identity = %msg.identity, destination = %d.destination, "published");
                    counter!("publish_deliveries_total", "destination" => d.destination.clone(), "result" => "ok")
                        .increment(1);
                }
                Err(e) => {
                    warn!(target: "notify", identity = %msg.identity, destination = %d.destination, error = %e, "publish failed");
                    counter!("publish_deliveries_total", "destination" => d.destination.clone(), "result" => "error")
                        .increment(1);
                    counter!("publish_item_errors_total", "kind" => "publish").increment(1);
                }
            }
        }
        deliveries
    }
}
