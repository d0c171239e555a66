//! Pairing flow for devices without a stored identity.
//!
//! The backend exposes a stream of [`PairingEvent`]s per pairing attempt.
//! [`PairingFlow`] drains it on its own task:
//!
//! ```text
//! Idle ──code──▶ WaitingForScan ──code──▶ WaitingForScan
//!   │                  │
//!   │                  ├──success──▶ Success
//!   ├──timeout─────────┼──timeout──▶ Timeout
//!   └──error───────────┴──error────▶ Error
//! ```
//!
//! Each code is rendered before the next event is polled, so every rendered
//! code is visible before the attempt's terminal event is observed.

use std::fmt;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use qrcode::QrCode;
use qrcode::render::unicode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events emitted by the backend during one pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A new code to scan. Codes rotate until one is scanned.
    Code {
        /// Payload to encode as a QR code.
        code: String,
        /// How long this code stays valid.
        timeout: Duration,
    },
    /// The code was scanned and the identity persisted.
    Success,
    /// Every code expired without being scanned.
    Timeout,
    /// The backend aborted the attempt.
    Error {
        /// Backend-provided reason.
        message: String,
    },
}

impl PairingEvent {
    /// Returns true for `Success`, `Timeout` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Code { .. })
    }
}

/// A lazily produced pairing event stream.
pub type PairingEvents = Pin<Box<dyn Stream<Item = PairingEvent> + Send>>;

/// States of the pairing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// No code shown yet.
    Idle,
    /// At least one code is on screen.
    WaitingForScan,
    /// Pairing completed.
    Success,
    /// Codes expired.
    Timeout,
    /// Pairing failed.
    Error,
    /// The cancellation scope fired first.
    Cancelled,
}

impl PairingState {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Idle | Self::WaitingForScan)
    }
}

impl fmt::Display for PairingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::WaitingForScan => "waiting_for_scan",
            Self::Success => "success",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// How a pairing attempt resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingOutcome {
    /// The device is paired.
    Success,
    /// No code was scanned in time.
    Timeout,
    /// The attempt failed.
    Error(String),
    /// Startup was cancelled while waiting.
    Cancelled,
}

/// Summary of a finished pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingReport {
    /// Terminal outcome.
    pub outcome: PairingOutcome,
    /// Number of codes rendered before the outcome.
    pub codes_shown: usize,
}

/// Shows pairing codes to the operator.
///
/// `render` runs synchronously on the pairing task, inside the async
/// runtime. It must return quickly: a few buffered writes to a local stream
/// are fine, but slow sinks (network, prompts) belong on their own thread.
pub trait CodeRenderer: Send + Sync {
    /// Renders one code. Returns once the code is visible.
    fn render(&self, code: &str, valid_for: Duration) -> io::Result<()>;
}

/// Renders codes as half-block QR codes on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// Builds the text drawn for one code.
    pub fn draw(code: &str) -> String {
        match QrCode::new(code.as_bytes()) {
            Ok(qr) => qr
                .render::<unicode::Dense1x2>()
                .dark_color(unicode::Dense1x2::Light)
                .light_color(unicode::Dense1x2::Dark)
                .build(),
            Err(e) => {
                warn!(error = %e, "Pairing code does not fit in a QR code, printing it raw");
                code.to_string()
            }
        }
    }

    /// Builds the full text block shown for one code.
    pub fn frame(code: &str, valid_for: Duration) -> String {
        format!(
            "Scan this code from an already-linked device:\n{}\n(valid for {}s)\n",
            Self::draw(code),
            valid_for.as_secs()
        )
    }
}

impl CodeRenderer for TerminalRenderer {
    fn render(&self, code: &str, valid_for: Duration) -> io::Result<()> {
        // One write per code keeps the time spent holding stdout short.
        let frame = Self::frame(code, valid_for);
        let mut out = io::stdout().lock();
        out.write_all(frame.as_bytes())?;
        out.flush()
    }
}

/// Drains one pairing attempt.
pub struct PairingFlow {
    renderer: Arc<dyn CodeRenderer>,
    state: PairingState,
    codes_shown: usize,
}

impl PairingFlow {
    /// Creates a flow in the `Idle` state.
    pub fn new(renderer: Arc<dyn CodeRenderer>) -> Self {
        Self {
            renderer,
            state: PairingState::Idle,
            codes_shown: 0,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> PairingState {
        self.state
    }

    /// Consumes events until a terminal event, the end of the stream, or
    /// cancellation.
    pub async fn run(
        mut self,
        mut events: PairingEvents,
        cancel: CancellationToken,
    ) -> PairingReport {
        info!("Waiting for pairing events");
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return self.finish(PairingOutcome::Cancelled);
                }
                next = events.next() => next,
            };

            let Some(event) = next else {
                return self.finish(PairingOutcome::Error(
                    "pairing event stream ended before the attempt resolved".to_string(),
                ));
            };

            if let Some(outcome) = self.handle(event) {
                return self.finish(outcome);
            }
        }
    }

    /// Applies one event; returns the outcome once the attempt is resolved.
    fn handle(&mut self, event: PairingEvent) -> Option<PairingOutcome> {
        match event {
            PairingEvent::Code { code, timeout } => {
                debug!(valid_for_secs = timeout.as_secs(), "Rendering pairing code");
                if let Err(e) = self.renderer.render(&code, timeout) {
                    error!(error = %e, "Failed to render pairing code");
                }
                self.codes_shown += 1;
                self.transition(PairingState::WaitingForScan);
                None
            }
            PairingEvent::Success if self.codes_shown == 0 => Some(PairingOutcome::Error(
                "pairing reported success before any code was shown".to_string(),
            )),
            PairingEvent::Success => Some(PairingOutcome::Success),
            PairingEvent::Timeout => Some(PairingOutcome::Timeout),
            PairingEvent::Error { message } => Some(PairingOutcome::Error(message)),
        }
    }

    fn transition(&mut self, next: PairingState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Pairing state changed");
            self.state = next;
        }
    }

    fn finish(mut self, outcome: PairingOutcome) -> PairingReport {
        let terminal = match &outcome {
            PairingOutcome::Success => PairingState::Success,
            PairingOutcome::Timeout => PairingState::Timeout,
            PairingOutcome::Error(_) => PairingState::Error,
            PairingOutcome::Cancelled => PairingState::Cancelled,
        };
        self.transition(terminal);

        match &outcome {
            PairingOutcome::Success => info!("Login successful"),
            PairingOutcome::Timeout => warn!("Pairing code timed out, restart to try again"),
            PairingOutcome::Error(message) => error!(%message, "Pairing failed"),
            PairingOutcome::Cancelled => info!("Pairing cancelled"),
        }

        PairingReport {
            outcome,
            codes_shown: self.codes_shown,
        }
    }
}
