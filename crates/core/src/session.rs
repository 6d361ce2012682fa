//! Session credentials and UI-scope liveness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Supplies the bearer credential for outgoing calls and forgets it when the collaborator
/// refuses it.
pub trait CredentialsProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    /// Called once a collaborator has answered "unauthorised". Implementations clear any
    /// stored credential and send the user back to sign-in.
    fn invalidate(&self);
}

/// Credentials held in memory for the life of the process.
#[derive(Debug, Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
}

impl InMemorySession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.bearer_token().is_some()
    }
}

impl CredentialsProvider for InMemorySession {
    fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn invalidate(&self) {
        tracing::info!("session invalidated");
        *self
            .token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}

impl<T: CredentialsProvider + ?Sized> CredentialsProvider for Arc<T> {
    fn bearer_token(&self) -> Option<String> {
        (**self).bearer_token()
    }

    fn invalidate(&self) {
        (**self).invalidate()
    }
}

/// Lives as long as a UI region. Dropping it marks every [`ScopeToken`] it issued as dead.
#[derive(Debug)]
pub struct ScopeLifetime {
    alive: Arc<AtomicBool>,
}

impl Default for ScopeLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeLifetime {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn token(&self) -> ScopeToken {
        ScopeToken {
            alive: Arc::clone(&self.alive),
        }
    }
}

impl Drop for ScopeLifetime {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
    }
}

/// Handed to an in-flight request so its response can check the scope is still there.
#[derive(Debug, Clone)]
pub struct ScopeToken {
    alive: Arc<AtomicBool>,
}

impl ScopeToken {
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// Runs `apply` with `response` if the scope is alive; otherwise drops the response.
    ///
    /// Returns whether the response was applied.
    pub fn deliver<T>(&self, response: T, apply: impl FnOnce(T)) -> bool {
        if self.is_alive() {
            apply(response);
            true
        } else {
            tracing::debug!("scope torn down; dropping response");
            false
        }
    }
}

/// Advisory guard against a control submitting twice while a request is in flight.
#[derive(Debug, Default)]
pub struct SubmitGuard {
    in_flight: AtomicBool,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the control. `None` while another submission holds it.
    pub fn try_begin(&self) -> Option<SubmitPermit<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmitPermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases its [`SubmitGuard`] when dropped.
#[derive(Debug)]
pub struct SubmitPermit<'a> {
    guard: &'a SubmitGuard,
}

impl Drop for SubmitPermit<'_> {
    fn drop(&mut self) {
        self.guard.in_flight.store(false, Ordering::Release);
    }
}
