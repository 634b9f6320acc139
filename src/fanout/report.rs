// src/fanout/report.rs
//! Per-run accounting: what happened to every candidate and every endpoint.

use thiserror::Error;

use crate::identity::RepositoryIdentity;
use crate::notify::{Ack, PublishError};
use crate::render::RenderError;
use crate::seen::StoreError;
use crate::source::SourceError;

/// How far a candidate got through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Present and unexpired in the seen-set; skipped silently.
    AlreadySeen,
    /// Limiter wait was cancelled; nothing published.
    Cancelled,
    /// Renderer refused the record; nothing published, not marked seen.
    RenderFailed,
    /// Marked seen and handed to every destination.
    Submitted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("cancelled before publishing")]
    Cancelled,
    #[error("publish to {destination} failed: {error}")]
    Publish {
        destination: String,
        error: PublishError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub destination: String,
    pub result: Result<Ack, PublishError>,
}

impl Delivery {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub identity: RepositoryIdentity,
    pub disposition: Disposition,
    /// One entry per configured destination, in configuration order.
    pub deliveries: Vec<Delivery>,
    pub errors: Vec<ItemError>,
}

impl Outcome {
    pub(crate) fn skipped(identity: RepositoryIdentity, disposition: Disposition) -> Self {
        Self {
            identity,
            disposition,
            deliveries: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(identity: RepositoryIdentity, disposition: Disposition, err: ItemError) -> Self {
        Self {
            identity,
            disposition,
            deliveries: Vec::new(),
            errors: vec![err],
        }
    }

    pub(crate) fn submitted(identity: RepositoryIdentity, deliveries: Vec<Delivery>) -> Self {
        let errors = deliveries
            .iter()
            .filter_map(|d| match &d.result {
                Ok(_) => None,
                Err(e) => Some(ItemError::Publish {
                    destination: d.destination.clone(),
                    error: e.clone(),
                }),
            })
            .collect();
        Self {
            identity,
            disposition: Disposition::Submitted,
            deliveries,
            errors,
        }
    }

    /// At least one destination acknowledged.
    pub fn published(&self) -> bool {
        self.deliveries.iter().any(Delivery::is_ok)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Candidates left after applying the batch cap.
    pub considered: usize,
    pub outcomes: Vec<Outcome>,
    /// The run stopped early because its cancellation token fired.
    pub cancelled: bool,
}

impl RunReport {
    pub(crate) fn new(considered: usize) -> Self {
        Self {
            considered,
            ..Self::default()
        }
    }

    /// Identities handed to the destinations, in processing order.
    pub fn submitted(&self) -> Vec<&RepositoryIdentity> {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == Disposition::Submitted)
            .map(|o| &o.identity)
            .collect()
    }

    /// Identities at least one destination acknowledged.
    pub fn published(&self) -> Vec<&RepositoryIdentity> {
        self.outcomes
            .iter()
            .filter(|o| o.published())
            .map(|o| &o.identity)
            .collect()
    }

    pub fn count(&self, disposition: Disposition) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.disposition == disposition)
            .count()
    }

    pub fn deliveries_ok(&self) -> usize {
        self.outcomes
            .iter()
            .flat_map(|o| &o.deliveries)
            .filter(|d| d.is_ok())
            .count()
    }

    pub fn deliveries_failed(&self) -> usize {
        self.outcomes
            .iter()
            .flat_map(|o| &o.deliveries)
            .filter(|d| !d.is_ok())
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = (&RepositoryIdentity, &ItemError)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.errors.iter().map(move |e| (&o.identity, e)))
    }

    /// Something was eligible for publishing, yet no endpoint took anything.
    pub fn nothing_delivered(&self) -> bool {
        let eligible = self.outcomes.iter().any(|o| {
            matches!(
                o.disposition,
                Disposition::Submitted | Disposition::RenderFailed
            )
        });
        eligible && self.deliveries_ok() == 0
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("candidate source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),
    #[error("seen-set store unavailable ({operation} {identity}): {source}")]
    DedupStoreUnavailable {
        /// `"lookup"` or `"mark"`.
        operation: &'static str,
        identity: RepositoryIdentity,
        #[source]
        source: StoreError,
        /// Work completed before the abort.
        report: Box<RunReport>,
    },
    #[error("no candidate reached any destination")]
    NothingDelivered(Box<RunReport>),
    /// Refused before touching the seen-set.
    #[error("no destinations to publish to")]
    NoDestinations,
}

impl RunError {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunError::SourceUnavailable(_) | RunError::NoDestinations => None,
            RunError::DedupStoreUnavailable { report, .. } | RunError::NothingDelivered(report) => {
                Some(report)
            }
        }
    }
}
