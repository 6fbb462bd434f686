//! Deposit Handler
//!
//! Validates a deposit or withdrawal request and publishes it.

use crate::codec::DepositCodec;
use crate::domain::{Amount, Deposit, Direction, DomainError, OperationContext};
use crate::emitter::Emitter;
use crate::error::AppError;
use crate::event_log::LogPosition;

use super::DepositCommand;

/// Handler for the write stream a service is bound to
#[derive(Clone)]
pub struct DepositHandler {
    emitter: Emitter<DepositCodec>,
    direction: Direction,
}

impl DepositHandler {
    pub fn new(emitter: Emitter<DepositCodec>, direction: Direction) -> Self {
        Self { emitter, direction }
    }

    /// Execute the command. Nothing is emitted unless validation passes.
    pub async fn execute(
        &self,
        command: DepositCommand,
        context: &OperationContext,
    ) -> Result<LogPosition, AppError> {
        let amount = Amount::new(command.amount).map_err(DomainError::from)?;

        let deposit = Deposit::new(command.wallet_id, self.direction.signed(amount.value()));

        let position = self
            .emitter
            .send(&deposit.wallet_id, &deposit)
            .await
            .map_err(|e| {
                tracing::error!(
                    wallet_id = %deposit.wallet_id,
                    direction = %self.direction,
                    correlation_id = ?context.correlation_id,
                    error = %e,
                    "Failed to emit deposit"
                );
                AppError::Emit(e)
            })?;

        tracing::debug!(
            wallet_id = %deposit.wallet_id,
            amount = deposit.amount,
            position = %position,
            correlation_id = ?context.correlation_id,
            "Deposit emitted"
        );

        Ok(position)
    }
}
