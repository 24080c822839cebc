//! Change resolution: return leftover value, or burn it when returning costs too much

use crate::TxBuilder;
use caravel_common::{Address, Lovelace, TxError, TxOutput};
use tracing::{info, warn};

/// Change always leads the output list
const CHANGE_INDEX: usize = 0;

/// What [`TxBuilder::add_change_if_needed`] did with the leftover value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Inputs exactly cover outputs plus the minimum fee
    Exact,

    /// Leftover too small to return; `amount` above the minimum fee was added to the fee
    Burned { amount: Lovelace },

    /// Change output placed at `index`, ahead of the caller's outputs
    Added { index: usize, amount: Lovelace },
}

impl TxBuilder<'_> {
    /// Balance the draft, sending any worthwhile leftover to `change_address`.
    /// Sets the fee in every successful case.
    pub fn add_change_if_needed(
        &mut self,
        change_address: &Address,
    ) -> Result<ChangeOutcome, TxError> {
        self.ensure_mutable()?;
        if self.signers.is_empty() {
            warn!("Estimating fee without any signing key attached");
        }

        let total_in = self.total_input()?;
        let total_out = self.total_output()?;
        let fee_without_change = self.solve_fee(&self.outputs)?;

        let required = total_out.saturating_add(fee_without_change);
        if total_in < required {
            return Err(TxError::InsufficientInput {
                available: total_in,
                required,
            });
        }
        let leftover = total_in - required;
        if leftover == 0 {
            self.fee = fee_without_change;
            return Ok(ChangeOutcome::Exact);
        }

        // The placeholder amount is at least as wide as the final change
        let mut with_change = self.outputs.clone();
        with_change.insert(CHANGE_INDEX, TxOutput::new(*change_address, leftover));
        let fee_with_change = self.solve_fee(&with_change)?;

        let minimum = self.min_utxo(&with_change[CHANGE_INDEX]);
        let change = total_in - total_out;
        match change.checked_sub(fee_with_change) {
            Some(change) if change >= minimum => {
                self.outputs.insert(CHANGE_INDEX, TxOutput::new(*change_address, change));
                self.fee = fee_with_change;
                info!(index = CHANGE_INDEX, change, fee = self.fee, "Added change output");
                Ok(ChangeOutcome::Added {
                    index: CHANGE_INDEX,
                    amount: change,
                })
            }
            _ => {
                self.fee = total_in - total_out;
                info!(
                    burned = leftover,
                    fee = self.fee,
                    minimum,
                    "Change below minimum output value, adding it to the fee"
                );
                Ok(ChangeOutcome::Burned { amount: leftover })
            }
        }
    }
}
