// tests/common/mod.rs
//
// Shared fakes for the fan-out integration tests: scripted destinations and
// seen-set stores, plus a small builder around `Publisher`.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use trending_relay::event::{NostrSigner, OutboundMessage};
use trending_relay::fanout::{PublishSettings, Publisher, PublisherDeps};
use trending_relay::identity::RepositoryIdentity;
use trending_relay::limiter::RateLimiter;
use trending_relay::notify::{Ack, Destination, PublishError};
use trending_relay::render::TextRenderer;
use trending_relay::seen::{MemorySeenStore, SeenStore, StoreError};
use trending_relay::source::Candidate;

pub const SK_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";

pub fn id(s: &str) -> RepositoryIdentity {
    RepositoryIdentity::parse(s).expect("valid identity")
}

pub fn candidate(name: &str) -> Candidate {
    let mut c = Candidate::new(id(name), format!("https://github.com/{name}"));
    c.description = Some(format!("{name} does things"));
    c.language = Some("Rust".into());
    c.stars = 1234;
    c
}

pub fn candidates(names: &[&str]) -> Vec<Candidate> {
    names.iter().map(|n| candidate(n)).collect()
}

#[derive(Clone, Copy)]
pub enum Behavior {
    Accept,
    Reject,
    /// Sleeps this long before accepting.
    Slow(Duration),
    Panic,
}

/// Destination that records every call it receives.
pub struct ScriptedDestination {
    name: String,
    behavior: Behavior,
    calls: Mutex<Vec<(OutboundMessage, Instant)>>,
    /// Fired after the first call, to simulate an interrupt mid-run.
    cancel_after_first: Option<CancellationToken>,
}

impl ScriptedDestination {
    pub fn new(name: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior,
            calls: Mutex::new(Vec::new()),
            cancel_after_first: None,
        })
    }

    pub fn cancelling(name: &str, token: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            behavior: Behavior::Accept,
            calls: Mutex::new(Vec::new()),
            cancel_after_first: Some(token),
        })
    }

    pub fn published(&self) -> Vec<RepositoryIdentity> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.identity.clone())
            .collect()
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl Destination for ScriptedDestination {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, msg: &OutboundMessage) -> Result<Ack, PublishError> {
        self.calls
            .lock()
            .unwrap()
            .push((msg.clone(), Instant::now()));
        if let Some(token) = &self.cancel_after_first {
            token.cancel();
        }
        match self.behavior {
            Behavior::Accept => Ok(Ack::default()),
            Behavior::Reject => Err(PublishError::Rejected("blocked: spam".into())),
            Behavior::Slow(d) => {
                tokio::time::sleep(d).await;
                Ok(Ack::default())
            }
            Behavior::Panic => panic!("destination blew up"),
        }
    }
}

/// Store whose lookups and/or writes fail.
pub struct BrokenStore {
    pub fail_lookup: bool,
    pub fail_write: bool,
    inner: MemorySeenStore,
}

impl BrokenStore {
    pub fn lookups() -> Arc<Self> {
        Arc::new(Self {
            fail_lookup: true,
            fail_write: false,
            inner: MemorySeenStore::new(),
        })
    }

    pub fn writes() -> Arc<Self> {
        Arc::new(Self {
            fail_lookup: false,
            fail_write: true,
            inner: MemorySeenStore::new(),
        })
    }
}

#[async_trait]
impl SeenStore for BrokenStore {
    async fn is_seen(&self, key: &RepositoryIdentity) -> Result<bool, StoreError> {
        if self.fail_lookup {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.is_seen(key).await
    }

    async fn mark_seen(
        &self,
        key: &RepositoryIdentity,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        if self.fail_write {
            return Err(StoreError::Timeout(Duration::from_secs(3)));
        }
        self.inner.mark_seen(key, value, ttl).await
    }

    fn name(&self) -> &'static str {
        "broken"
    }
}

pub struct Harness {
    pub seen: Arc<dyn SeenStore>,
    pub interval: Duration,
    pub destinations: Vec<Arc<dyn Destination>>,
    pub signer: Option<Arc<NostrSigner>>,
    pub settings: PublishSettings,
}

impl Harness {
    pub fn new(seen: Arc<dyn SeenStore>) -> Self {
        Self {
            seen,
            interval: Duration::ZERO,
            destinations: Vec::new(),
            signer: None,
            settings: PublishSettings::default(),
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn destination(mut self, d: Arc<dyn Destination>) -> Self {
        self.destinations.push(d);
        self
    }

    pub fn signed(mut self) -> Self {
        self.signer = Some(Arc::new(NostrSigner::from_hex(SK_ONE).expect("valid key")));
        self
    }

    pub fn settings(mut self, f: impl FnOnce(&mut PublishSettings)) -> Self {
        f(&mut self.settings);
        self
    }

    pub fn build(self) -> Publisher {
        Publisher::new(
            PublisherDeps {
                seen: self.seen,
                limiter: Arc::new(RateLimiter::new(self.interval)),
                renderer: Arc::new(TextRenderer::default()),
                destinations: self.destinations,
                signer: self.signer,
            },
            self.settings,
        )
    }
}
