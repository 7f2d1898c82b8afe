//! Settlement of a finished match: fee computation and exactly-once
//! payout distribution from the escrowed pot.
//!
//! The engine never holds funds. It computes amounts with checked
//! integer arithmetic and hands transfer instructions to the host's
//! [`Ledger`]; any transfer failure aborts settlement with the match
//! left unsettled, so the host can retry the whole call.

use crate::session::{BPS_DENOMINATOR, ChessMatch, MatchPhase, Outcome};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Identifier of a ledger account. Player ids double as their account
/// ids; escrow and platform accounts are host-defined.
pub type AccountId = String;

/// Failure reported by the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, Serialize, Deserialize)]
#[display("ledger transfer failed: {message}")]
pub struct LedgerError {
    /// What went wrong, in the ledger's own words.
    pub message: String,
}

impl LedgerError {
    /// Creates a new ledger error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The external ledger that actually moves funds.
///
/// The engine calls this once per payout recipient and treats any
/// failure as the whole settlement failing.
pub trait Ledger {
    /// Moves `amount` from one account to another.
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), LedgerError>;
}

/// One payout leg of a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Receiving account.
    pub account: AccountId,
    /// Amount transferred.
    pub amount: u64,
}

/// Summary of a completed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// The match outcome that was settled.
    pub outcome: Outcome,
    /// The pot that was distributed.
    pub pot: u64,
    /// Platform fee, truncated from pot x bps / 10000.
    pub fee: u64,
    /// Amount actually sent to the platform account: the fee plus, on an
    /// odd drawn pot, the one-unit halving remainder.
    pub platform_amount: u64,
    /// Player payouts, in seat order.
    pub payouts: Vec<Payout>,
}

/// Why a settlement request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SettlementError {
    /// The match has not reached a terminal state.
    #[display("match has not concluded")]
    GameNotConcluded,
    /// This match was already paid out.
    #[display("payout already processed")]
    PayoutAlreadyProcessed,
    /// The terminal state is internally inconsistent, e.g. a winner with
    /// no seated opponent.
    #[display("match state is invalid for payout")]
    InvalidStateForPayout,
    /// Fee or payout arithmetic overflowed.
    #[display("arithmetic overflow")]
    MathOverflow,
    /// The ledger refused a transfer.
    #[display("{_0}")]
    Ledger(LedgerError),
}

impl std::error::Error for SettlementError {}

impl From<LedgerError> for SettlementError {
    fn from(err: LedgerError) -> Self {
        SettlementError::Ledger(err)
    }
}

impl ChessMatch {
    /// The escrow account holding this match's pot.
    pub fn escrow_account(&self) -> AccountId {
        format!("escrow:{}", self.match_id)
    }

    /// Pays out a finished match, exactly once.
    ///
    /// A decisive result sends pot minus fee to the winner. A draw sends
    /// each player half the pot after the fee, floored; the one-unit
    /// remainder of an odd pot rides along with the fee to the platform
    /// account, so the transfers always drain the escrow to zero.
    #[instrument(skip(self, ledger), fields(match_id = %self.match_id))]
    pub fn settle<L: Ledger>(
        &mut self,
        platform_account: &AccountId,
        ledger: &mut L,
    ) -> Result<Settlement, SettlementError> {
        let MatchPhase::Finished { outcome, .. } = self.phase else {
            return Err(SettlementError::GameNotConcluded);
        };
        if self.payout_processed {
            return Err(SettlementError::PayoutAlreadyProcessed);
        }

        let fee = self
            .pot
            .checked_mul(u64::from(self.fee_bps))
            .ok_or(SettlementError::MathOverflow)?
            .checked_div(BPS_DENOMINATOR)
            .ok_or(SettlementError::MathOverflow)?;
        let after_fee = self
            .pot
            .checked_sub(fee)
            .ok_or(SettlementError::MathOverflow)?;

        let mut payouts = Vec::new();
        let platform_amount = match outcome {
            Outcome::WhiteWins | Outcome::BlackWins => {
                let winner = match outcome {
                    Outcome::WhiteWins => self.player_one.clone(),
                    _ => self
                        .player_two
                        .clone()
                        .ok_or(SettlementError::InvalidStateForPayout)?,
                };
                if after_fee > 0 {
                    payouts.push(Payout {
                        account: winner,
                        amount: after_fee,
                    });
                }
                fee
            }
            Outcome::Draw => {
                let player_two = self
                    .player_two
                    .clone()
                    .ok_or(SettlementError::InvalidStateForPayout)?;
                let share = after_fee / 2;
                let remainder = after_fee - share * 2;
                if share > 0 {
                    payouts.push(Payout {
                        account: self.player_one.clone(),
                        amount: share,
                    });
                    payouts.push(Payout {
                        account: player_two,
                        amount: share,
                    });
                }
                fee.checked_add(remainder)
                    .ok_or(SettlementError::MathOverflow)?
            }
        };

        let escrow = self.escrow_account();
        if platform_amount > 0 {
            ledger.transfer(&escrow, platform_account, platform_amount)?;
        }
        for payout in &payouts {
            ledger.transfer(&escrow, &payout.account, payout.amount)?;
        }

        self.payout_processed = true;
        info!(
            ?outcome,
            pot = self.pot,
            fee,
            platform_amount,
            recipients = payouts.len(),
            "settlement processed"
        );
        Ok(Settlement {
            outcome,
            pot: self.pot,
            fee,
            platform_amount,
            payouts,
        })
    }
}

/// Balance-map ledger for tests and single-process hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: HashMap<AccountId, u64>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits an account, e.g. to fund an escrow.
    pub fn credit(&mut self, account: &str, amount: u64) {
        let balance = self.balances.entry(account.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    /// Current balance of an account; unknown accounts hold zero.
    pub fn balance(&self, account: &str) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }
}

impl Ledger for InMemoryLedger {
    fn transfer(
        &mut self,
        from: &AccountId,
        to: &AccountId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let available = self.balance(from);
        if available < amount {
            return Err(LedgerError::new(format!(
                "insufficient funds in {from}: {available} < {amount}"
            )));
        }
        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| LedgerError::new(format!("balance overflow in {to}")))?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished_match(outcome: Outcome) -> ChessMatch {
        let mut m = ChessMatch::initialize("m1", "alice", "SEND", 50, 0, 250, 0).unwrap();
        m.join("bob", 50, 1).unwrap();
        m.phase = MatchPhase::Finished {
            outcome,
            reason: crate::session::EndReason::Resignation,
        };
        m
    }

    #[test]
    fn decisive_payout_conserves_the_pot() {
        let mut m = finished_match(Outcome::WhiteWins);
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&m.escrow_account(), 100);

        let settlement = m.settle(&"platform".to_string(), &mut ledger).unwrap();
        // 100 * 250 / 10000 = 2.
        assert_eq!(settlement.fee, 2);
        assert_eq!(settlement.payouts.len(), 1);
        assert_eq!(settlement.payouts[0].amount, 98);
        assert_eq!(settlement.fee + settlement.payouts[0].amount, 100);
        assert_eq!(ledger.balance("alice"), 98);
        assert_eq!(ledger.balance("platform"), 2);
        assert_eq!(ledger.balance(&m.escrow_account()), 0);
    }

    #[test]
    fn odd_draw_remainder_goes_to_the_platform() {
        let mut m = finished_match(Outcome::Draw);
        // 100 - 2 = 98, splits evenly; force an odd remainder instead.
        m.fee_bps = 300; // fee = 3, after_fee = 97
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&m.escrow_account(), 100);

        let settlement = m.settle(&"platform".to_string(), &mut ledger).unwrap();
        assert_eq!(settlement.fee, 3);
        assert_eq!(settlement.platform_amount, 4);
        assert_eq!(settlement.payouts[0].amount, 48);
        assert_eq!(settlement.payouts[1].amount, 48);
        assert_eq!(ledger.balance(&m.escrow_account()), 0);
        assert_eq!(ledger.balance("platform"), 4);
    }

    #[test]
    fn settle_requires_a_terminal_match() {
        let mut m = ChessMatch::initialize("m1", "alice", "SEND", 50, 0, 250, 0).unwrap();
        let mut ledger = InMemoryLedger::new();
        assert_eq!(
            m.settle(&"platform".to_string(), &mut ledger).unwrap_err(),
            SettlementError::GameNotConcluded
        );
    }

    #[test]
    fn full_fee_leaves_nothing_for_the_winner() {
        let mut m = finished_match(Outcome::BlackWins);
        m.fee_bps = 10_000;
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&m.escrow_account(), 100);

        let settlement = m.settle(&"platform".to_string(), &mut ledger).unwrap();
        assert_eq!(settlement.fee, 100);
        assert!(settlement.payouts.is_empty());
        assert_eq!(ledger.balance("platform"), 100);
        assert_eq!(ledger.balance("bob"), 0);
    }

    #[test]
    fn zero_fee_skips_the_platform_transfer() {
        let mut m = finished_match(Outcome::BlackWins);
        m.fee_bps = 0;
        let mut ledger = InMemoryLedger::new();
        ledger.credit(&m.escrow_account(), 100);

        let settlement = m.settle(&"platform".to_string(), &mut ledger).unwrap();
        assert_eq!(settlement.platform_amount, 0);
        assert_eq!(ledger.balance("platform"), 0);
        assert_eq!(ledger.balance("bob"), 100);
    }
}
