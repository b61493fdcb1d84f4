//! Scanning session: decoded QR payloads in, verdicts and toasts out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::error::SessionError;
use crate::ledger::Ledger;
use crate::metadata::EventRef;
use crate::notify::{Level, Notification, Notifier};
use crate::verifier::{TicketVerifier, Verification};

// ============== DEBOUNCE ==============

/// Leading-edge debounce of camera reads.
///
/// The camera reports the same code several times a second while it stays in
/// frame. The first read is emitted; repeats are dropped until the code has
/// been out of frame for `window`. A different code is emitted immediately.
#[derive(Debug)]
pub struct ScanDebouncer {
    window: Duration,
    last: Option<(String, Instant)>,
}

impl ScanDebouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn accept(&mut self, payload: &str, now: Instant) -> bool {
        let emit = match &self.last {
            Some((last, seen)) if last == payload => now.duration_since(*seen) >= self.window,
            _ => true,
        };
        self.last = Some((payload.to_string(), now));
        emit
    }
}

// ============== SESSION ==============

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub admitted: u64,
    pub rejected: u64,
    pub debounced: u64,
}

pub struct ScanSession<L: Ledger> {
    verifier: TicketVerifier<L>,
    event: EventRef,
    notifier: Arc<dyn Notifier>,
    debouncer: ScanDebouncer,
    summary: ScanSummary,
}

impl<L: Ledger> ScanSession<L> {
    /// Binds a session to one event. Fails fast if the ledger is unreachable.
    pub async fn connect(
        verifier: TicketVerifier<L>,
        event: EventRef,
        notifier: Arc<dyn Notifier>,
        debounce: Duration,
    ) -> Result<Self, SessionError> {
        let status = verifier
            .ledger()
            .status()
            .await
            .map_err(SessionError::Unavailable)?;
        info!(
            "Connected to {} at height {}, scanning for event {}",
            status.chain_id, status.latest_block_height, event.event_id
        );

        Ok(Self {
            verifier,
            event,
            notifier,
            debouncer: ScanDebouncer::new(debounce),
            summary: ScanSummary::default(),
        })
    }

    pub fn verifier(&self) -> &TicketVerifier<L> {
        &self.verifier
    }

    pub fn summary(&self) -> ScanSummary {
        self.summary
    }

    /// Handles one decoded payload read at `now`. `None` when debounced.
    pub async fn handle(&mut self, payload: &str, now: Instant) -> Option<Verification> {
        if !self.debouncer.accept(payload, now) {
            self.summary.debounced += 1;
            return None;
        }

        let verification = self.verifier.verify(payload, &self.event.event_id).await;
        let description = verification.to_string();
        if verification.is_verified() {
            self.summary.admitted += 1;
            self.notifier
                .notify(Notification::new(Level::Success, "Ticket Verified", description));
        } else {
            self.summary.rejected += 1;
            self.notifier
                .notify(Notification::new(Level::Error, "Invalid Ticket", description));
        }
        Some(verification)
    }

    /// Reads one payload per line until end of input or Ctrl-C, then waits
    /// for the claims still in flight.
    pub async fn run<R>(&mut self, input: R) -> ScanSummary
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        self.handle(line.trim(), Instant::now()).await;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Scanner input failed: {}", e);
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.verifier.wait_for_claims().await;
        info!("Scan session ended: {:?}", self.summary);
        self.summary
    }
}
