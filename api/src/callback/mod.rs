//! Inbound half of the wallet round trip.
//!
//! The wallet answers by loading one of our callback routes in a brand-new
//! page. Nothing from the outbound half is in memory any more; everything the
//! handlers need comes from the query string and the [`ResumptionStore`].
//! Every handler runs the same single pass:
//!
//! 1. bail out if the replay guard is younger than the TTL,
//! 2. stamp the guard,
//! 3. parse, decrypt and commit (handler specific),
//! 4. clear the pending redirect and navigate to the resume path,
//! 5. release the guard after a delay.
//!
//! Failures in step 3 never escape: they are logged and still end in a
//! navigation.

mod connect;
mod query;
mod sign;

pub use query::CallbackQuery;
pub use sign::SignResponse;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;

use crate::consts::{DEFAULT_ROUTE, GUARD_RELEASE_DELAY_MS, REPLAY_GUARD_TTL_MS};
use crate::error::CallbackError;
use crate::state::ConnectSession;
use crate::store::{DurableStore, ResumptionStore};

use query::in_app_path;

/// Wall clock in unix milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct HandlerConfig {
    /// A guard younger than this marks the invocation as a duplicate.
    pub replay_ttl: Duration,
    /// How long after completion the guard is released.
    pub guard_release_delay: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            replay_ttl: Duration::from_millis(REPLAY_GUARD_TTL_MS),
            guard_release_delay: Duration::from_millis(GUARD_RELEASE_DELAY_MS),
        }
    }
}

/// State a successful callback committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Commit {
    Connected(ConnectSession),
    Confirmed { signature: String },
    Disconnected,
}

/// Result of one callback invocation.
#[derive(Debug)]
pub enum CallbackOutcome {
    /// Another invocation handled this callback moments ago. Nothing was
    /// committed and no navigation should happen.
    Duplicate,
    Navigate(Navigation),
}

impl CallbackOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CallbackOutcome::Duplicate)
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        match self {
            CallbackOutcome::Navigate(navigation) => Some(navigation),
            CallbackOutcome::Duplicate => None,
        }
    }
}

/// A full page replace to `path`, plus what (if anything) was committed.
#[derive(Debug)]
pub struct Navigation {
    pub path: String,
    pub result: Result<Commit, CallbackError>,
    guard_release: JoinHandle<()>,
}

impl Navigation {
    pub fn is_committed(&self) -> bool {
        self.result.is_ok()
    }

    /// Waits for the delayed guard release. A short-lived process must call
    /// this before exiting or the guard stays stamped until the TTL lapses.
    pub async fn settle(self) -> (String, Result<Commit, CallbackError>) {
        if let Err(e) = self.guard_release.await {
            tracing::warn!("guard release task failed: {}", e);
        }
        (self.path, self.result)
    }
}

/// Runs the connect, sign and disconnect callbacks against a store.
///
/// The `handle_*` methods must be polled inside a tokio runtime: the delayed
/// guard release is spawned with `tokio::spawn`.
pub struct CallbackHandler<S, C = SystemClock> {
    store: ResumptionStore<S>,
    clock: C,
    config: HandlerConfig,
}

impl<S, C> CallbackHandler<S, C>
where
    S: DurableStore + 'static,
    C: Clock,
{
    pub fn with_clock(store: ResumptionStore<S>, clock: C, config: HandlerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn store(&self) -> &ResumptionStore<S> {
        &self.store
    }

    /// Steps 1 and 2. Returns false when this invocation is a duplicate.
    fn enter(&self, route: &'static str) -> bool {
        let now = self.clock.now_millis();
        match self.store.replay_guard() {
            Ok(Some(stamped)) if now.saturating_sub(stamped) < self.config.replay_ttl.as_millis() as u64 => {
                tracing::debug!(route, stamped, "callback already handled, skipping");
                return false;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(route, "ignoring unreadable replay guard: {}", e),
        }
        if let Err(e) = self.store.set_replay_guard(now) {
            tracing::warn!(route, "failed to stamp replay guard: {}", e);
        }
        true
    }

    /// `state` from the callback, else the stored pending redirect, else `/`.
    fn resume_path(&self, query: &CallbackQuery) -> String {
        if let Some(path) = query.state.as_deref().and_then(in_app_path) {
            return path.to_string();
        }
        match self.store.pending_redirect() {
            Ok(Some(stored)) => in_app_path(&stored).unwrap_or(DEFAULT_ROUTE).to_string(),
            Ok(None) => DEFAULT_ROUTE.to_string(),
            Err(e) => {
                tracing::warn!("failed to read pending redirect: {}", e);
                DEFAULT_ROUTE.to_string()
            }
        }
    }

    /// Steps 4 and 5.
    fn finish(
        &self,
        route: &'static str,
        path: String,
        result: Result<Commit, CallbackError>,
    ) -> CallbackOutcome {
        if let Err(e) = self.store.clear_pending_redirect() {
            tracing::warn!(route, "failed to clear pending redirect: {}", e);
        }

        match &result {
            Ok(commit) => tracing::info!(route, %path, ?commit, "callback committed"),
            Err(e) => tracing::warn!(route, %path, "callback failed: {}", e),
        }

        let store = self.store.clone();
        let delay = self.config.guard_release_delay;
        let guard_release = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = store.clear_replay_guard() {
                tracing::warn!(route, "failed to release replay guard: {}", e);
            }
        });

        CallbackOutcome::Navigate(Navigation {
            path,
            result,
            guard_release,
        })
    }

    /// Callback for the wallet's disconnect acknowledgement. The session was
    /// already dropped locally when the disconnect link was built.
    pub async fn handle_disconnect(&self, url: &url::Url) -> CallbackOutcome {
        const ROUTE: &str = "disconnect";
        if !self.enter(ROUTE) {
            return CallbackOutcome::Duplicate;
        }
        let query = CallbackQuery::parse(url);
        let path = self.resume_path(&query);
        let result = match query.wallet_error() {
            Some(e) => Err(e),
            None => self
                .store
                .clear_session()
                .map(|_| Commit::Disconnected)
                .map_err(CallbackError::from),
        };
        self.finish(ROUTE, path, result)
    }
}
