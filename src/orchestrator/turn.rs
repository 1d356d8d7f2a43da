//! Turn execution
//!
//! A turn admits one call against the usage ledger, asks the provider for the
//! active persona's reply and commits it to the session. Every turn ends in
//! exactly one chat event.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::ledger::{Admission, Reservation, UsageLedger};
use crate::persona::{Persona, PersonaRotation};
use crate::provider::CompletionProvider;
use crate::types::TurnMessage;

use super::events::ChatEvent;
use super::session::SessionState;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The persona replied; the event carries its name and text.
    Produced(ChatEvent),
    /// Budget spent for today; nothing changed.
    LimitReached(ChatEvent),
    /// The provider call failed and its charge was refunded.
    Failed(ChatEvent),
}

impl TurnOutcome {
    pub fn event(&self) -> &ChatEvent {
        match self {
            TurnOutcome::Produced(e) | TurnOutcome::LimitReached(e) | TurnOutcome::Failed(e) => e,
        }
    }

    pub fn into_event(self) -> ChatEvent {
        match self {
            TurnOutcome::Produced(e) | TurnOutcome::LimitReached(e) | TurnOutcome::Failed(e) => e,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, TurnOutcome::Produced(_))
    }
}

/// Runs turns for any session against the shared ledger and provider.
pub struct TurnOrchestrator {
    ledger: Arc<UsageLedger>,
    rotation: PersonaRotation,
    provider: Arc<dyn CompletionProvider>,
}

impl TurnOrchestrator {
    pub fn new(
        ledger: Arc<UsageLedger>,
        rotation: PersonaRotation,
        provider: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            ledger,
            rotation,
            provider,
        }
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn rotation(&self) -> &PersonaRotation {
        &self.rotation
    }

    /// Read-only "calls today" notice.
    pub fn status_notice(&self) -> ChatEvent {
        let record = self.ledger.read();
        ChatEvent::status(record.count, self.ledger.daily_limit())
    }

    /// Run one turn on `state`.
    ///
    /// Transcript and turn index change only when the provider succeeds.
    pub async fn advance_turn(&self, state: &mut SessionState) -> TurnOutcome {
        let admission = match self.admit().await {
            Ok(admission) => admission,
            Err(e) => {
                error!(error = %e.format_for_log(), "Usage ledger unavailable, turn skipped");
                return TurnOutcome::Failed(ChatEvent::provider_failure());
            }
        };

        let reservation = match admission {
            Admission::Admitted(reservation) => reservation,
            Admission::LimitReached(record) => {
                info!(
                    count = record.count,
                    limit = self.ledger.daily_limit(),
                    "Daily limit reached, turn skipped"
                );
                return TurnOutcome::LimitReached(ChatEvent::limit_reached(self.ledger.daily_limit()));
            }
        };

        let persona = self.rotation.persona_for_turn(state.turn_index);
        let context = state.context_for(persona);

        match self.request_reply(persona, &context).await {
            Ok(text) => {
                state.record_reply(text.clone());
                info!(
                    speaker = %persona.display_name,
                    turn = state.turn_index,
                    calls_today = reservation.count_after(),
                    "Turn produced"
                );
                TurnOutcome::Produced(ChatEvent::new(persona.display_name.clone(), text))
            }
            Err(e) => {
                warn!(
                    speaker = %persona.display_name,
                    error = %e.format_for_log(),
                    "Provider call failed, refunding charge"
                );
                self.refund(reservation).await;
                TurnOutcome::Failed(ChatEvent::provider_failure())
            }
        }
    }

    /// Ledger calls do blocking file I/O, so they run on the blocking pool.
    async fn admit(&self) -> Result<Admission> {
        let ledger = Arc::clone(&self.ledger);
        tokio::task::spawn_blocking(move || ledger.check_and_increment())
            .await
            .map_err(|e| Error::Internal(format!("Usage ledger task failed: {}", e)))
    }

    async fn refund(&self, reservation: Reservation) {
        let ledger = Arc::clone(&self.ledger);
        if let Err(e) = tokio::task::spawn_blocking(move || ledger.release(reservation)).await {
            error!(error = %e, "Usage ledger task failed, charge kept");
        }
    }

    /// One provider attempt, trimmed. Blank replies count as failures.
    async fn request_reply(&self, persona: &Persona, context: &[TurnMessage]) -> Result<String> {
        let start = Instant::now();
        let raw = self.provider.complete(&persona.model_id, context).await?;
        let text = raw.trim();

        debug!(
            provider = self.provider.name(),
            model = %persona.model_id,
            context_len = context.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Provider replied"
        );

        if text.is_empty() {
            return Err(Error::ProviderEmpty {
                model_id: persona.model_id.clone(),
            });
        }
        Ok(text.to_string())
    }
}
