//! Door-side ticket verification.
//!
//! For each scanned secret the verifier decides whether to admit the bearer
//! and, for a first admission, detaches a claim that consumes one use of the
//! ticket on the ledger:
//!
//! ```text
//! UNSEEN --(matches event, in window, uses >= 2)--> VERIFIED_PENDING_CLAIM
//! VERIFIED_PENDING_CLAIM --(claim ok)--> CLAIMED
//! VERIFIED_PENDING_CLAIM --(claim fails)--> unchanged, operator notified
//! UNSEEN --(uses < 2)--> CLAIMED ("already verified")
//! seen this session --> "already verified", no ledger reads
//! ```
//!
//! Rejections (wrong event, outside window) are recomputed from ledger state
//! on every scan and never remembered.

use std::fmt;
use std::sync::{Arc, PoisonError};

use dashmap::DashSet;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::claim::{claim_ticket, ClaimTarget};
use crate::keys::SecretKey;
use crate::keystore::KeyStore;
use crate::ledger::{fetch_ticket_details, Ledger};
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::window::{Clock, SystemClock, WindowCheck, WindowVerdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// First admission; a claim has been detached.
    Admitted,
    AlreadyVerified,
    NoCode,
    Unreadable,
    WrongEvent,
    OutsideWindow(WindowVerdict),
    LoadFailed,
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Admitted | Verification::AlreadyVerified)
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            Verification::Admitted => None,
            Verification::AlreadyVerified => Some("Ticket has already been verified"),
            Verification::NoCode => Some("No value returned from QR code"),
            Verification::Unreadable => Some("Scanned code is not a ticket key"),
            Verification::WrongEvent => Some("Ticket is not associated with current event"),
            Verification::OutsideWindow(_) => {
                Some("Current date and time is outside of valid window for ticket")
            }
            Verification::LoadFailed => Some("Failed to load ticket information"),
        }
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.message()) {
            (Verification::OutsideWindow(verdict), Some(message)) => write!(f, "{message} ({verdict})"),
            (_, Some(message)) => write!(f, "{message}"),
            (_, None) => write!(f, "Ticket verified"),
        }
    }
}

pub struct TicketVerifier<L: Ledger> {
    ledger: Arc<L>,
    key_store: Arc<dyn KeyStore>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    target: Arc<ClaimTarget>,
    /// Secrets admitted during this session.
    verified: DashSet<String>,
    claims: std::sync::Mutex<JoinSet<()>>,
}

impl<L: Ledger> TicketVerifier<L> {
    pub fn new(ledger: Arc<L>, key_store: Arc<dyn KeyStore>, target: ClaimTarget) -> Self {
        Self {
            ledger,
            key_store,
            notifier: Arc::new(TracingNotifier),
            clock: Arc::new(SystemClock),
            target: Arc::new(target),
            verified: DashSet::new(),
            claims: std::sync::Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn is_verified(&self, secret: &str) -> bool {
        self.verified.contains(secret.trim())
    }

    pub fn verified_count(&self) -> usize {
        self.verified.len()
    }

    pub async fn verify(&self, secret: &str, event_id: &str) -> Verification {
        let secret = secret.trim();
        if secret.is_empty() {
            return Verification::NoCode;
        }

        // Operators hold a badge in front of the camera for many frames.
        if self.verified.contains(secret) {
            debug!("Secret already verified this session");
            return Verification::AlreadyVerified;
        }

        let key = match SecretKey::parse(secret) {
            Ok(key) => key,
            Err(e) => {
                warn!("Unreadable ticket code: {}", e);
                return Verification::Unreadable;
            }
        };

        let details = match fetch_ticket_details(self.ledger.as_ref(), &key).await {
            Ok(details) => details,
            Err(e) => {
                warn!("Failed to load ticket {}: {}", key.public_key(), e);
                return Verification::LoadFailed;
            }
        };

        if details.key.has_been_used() {
            return Verification::AlreadyVerified;
        }

        if details.extra.event_id != event_id {
            info!(
                "Ticket {} belongs to event {}, not {}",
                details.public_key, details.extra.event_id, event_id
            );
            return Verification::WrongEvent;
        }

        if let Some(window) = &details.extra.pass_valid_through {
            let verdict = window.evaluate(self.clock.now(), WindowCheck::Admission);
            if !verdict.is_open() {
                info!("Ticket {} outside pass window: {}", details.public_key, verdict);
                return Verification::OutsideWindow(verdict);
            }
        }

        // Only the scan that inserts the secret gets to claim it.
        if !self.verified.insert(secret.to_string()) {
            return Verification::AlreadyVerified;
        }

        info!("Ticket {} admitted", details.public_key);
        self.spawn_claim(key);
        Verification::Admitted
    }

    fn spawn_claim(&self, key: SecretKey) {
        let ledger = Arc::clone(&self.ledger);
        let key_store = Arc::clone(&self.key_store);
        let notifier = Arc::clone(&self.notifier);
        let target = Arc::clone(&self.target);

        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
        while claims.try_join_next().is_some() {}
        claims.spawn(async move {
            if let Err(e) = claim_ticket(ledger.as_ref(), key_store, &target, &key).await {
                error!("Ticket claim failed {}: {}", key.public_key(), e);
                notifier.notify(Notification::claim_failed());
            }
        });
    }

    pub fn pending_claims(&self) -> usize {
        self.claims.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Waits for every detached claim spawned so far.
    pub async fn wait_for_claims(&self) {
        let mut pending = {
            let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *claims)
        };
        if !pending.is_empty() {
            info!("Waiting for {} pending claim(s)", pending.len());
        }
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                error!("Claim task aborted: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admissions_count_as_verified() {
        assert!(Verification::Admitted.is_verified());
        assert!(Verification::AlreadyVerified.is_verified());
        assert!(!Verification::WrongEvent.is_verified());
        assert!(!Verification::OutsideWindow(WindowVerdict::Closed).is_verified());
        assert!(!Verification::LoadFailed.is_verified());
        assert_eq!(Verification::Admitted.message(), None);
    }

    #[test]
    fn outside_window_display_carries_verdict() {
        let text = Verification::OutsideWindow(WindowVerdict::Closed).to_string();
        assert_eq!(
            text,
            "Current date and time is outside of valid window for ticket (closed)"
        );
    }
}
