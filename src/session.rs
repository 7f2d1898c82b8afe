//! Match lifecycle management: creation, joining, moves, resignation,
//! and timeout forfeiture for a wagered two-player match.
//!
//! Every operation is a single atomic transition: all guards are checked
//! before any field is written, so a rejected call leaves the match
//! exactly as it found it. Time never comes from the system clock; the
//! host supplies `now` on every call.

use crate::chess::{CandidateMove, Color, MoveError, Position, Verdict, in_check, verdict};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Unique identifier for a player. Opaque to the engine, compared only
/// for equality; the host authenticates it.
pub type PlayerId = String;

/// Identifier of the token a match's wagers are denominated in.
pub type TokenId = String;

/// Longest accepted match id, in bytes.
pub const MAX_MATCH_ID_LEN: usize = 32;

/// Basis-point denominator: 10000 bps = 100%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decisive or drawn result of a finished match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum Outcome {
    /// White took the match.
    WhiteWins,
    /// Black took the match.
    BlackWins,
    /// Neither side won.
    Draw,
}

impl Outcome {
    /// The winning outcome for the given color.
    pub fn win_for(color: Color) -> Self {
        match color {
            Color::White => Outcome::WhiteWins,
            Color::Black => Outcome::BlackWins,
        }
    }

    /// The winning color, if the outcome is decisive.
    pub fn winner(&self) -> Option<Color> {
        match self {
            Outcome::WhiteWins => Some(Color::White),
            Outcome::BlackWins => Some(Color::Black),
            Outcome::Draw => None,
        }
    }
}

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum EndReason {
    /// A king was mated.
    Checkmate,
    /// The side to move had no legal move and was not in check.
    Stalemate,
    /// A player resigned.
    Resignation,
    /// A player overran the move clock.
    Timeout,
    /// One hundred quiet halfmoves passed.
    FiftyMoveRule,
}

/// Where a match stands in its lifecycle.
///
/// Transitions only flow forward: waiting to active to finished. A
/// finished phase always carries its outcome and reason, so an active
/// match with an end reason cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Created; the second player has not joined yet.
    WaitingForOpponent,
    /// Both players seated, game underway.
    Active,
    /// Terminal: no transition leaves this phase.
    Finished {
        /// Who won, or a draw.
        outcome: Outcome,
        /// Why the match ended.
        reason: EndReason,
    },
}

impl MatchPhase {
    /// Whether the match is waiting for its second player.
    pub fn is_waiting(&self) -> bool {
        matches!(self, MatchPhase::WaitingForOpponent)
    }

    /// Whether moves may be played.
    pub fn is_active(&self) -> bool {
        matches!(self, MatchPhase::Active)
    }

    /// Whether the match has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchPhase::Finished { .. })
    }
}

/// What a successful move did to the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveReport {
    /// Coordinate text of the move, e.g. "g1f3" or "e7e8q".
    pub algebraic: String,
    /// Whether a piece was captured.
    pub capture: bool,
    /// Whether the opponent now stands in check.
    pub check: bool,
    /// The match phase after the move.
    pub phase: MatchPhase,
}

/// Why a lifecycle operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum MatchError {
    /// The match id is empty or too long.
    #[display("match id must be 1-{MAX_MATCH_ID_LEN} bytes")]
    InvalidMatchId,
    /// The wager must be positive.
    #[display("bet amount must be positive")]
    InvalidBetAmount,
    /// The platform fee exceeds 10000 basis points.
    #[display("platform fee exceeds 10000 basis points")]
    InvalidPlatformFee,
    /// The operation requires a match waiting for an opponent.
    #[display("match is not waiting for an opponent")]
    MatchNotWaiting,
    /// The operation requires an active match.
    #[display("match is not active")]
    MatchNotActive,
    /// The creator cannot join their own match.
    #[display("cannot join your own match")]
    CannotJoinOwnMatch,
    /// The joining wager must equal the creator's.
    #[display("bet amount does not match the creator's bet")]
    BetAmountMismatch,
    /// The caller is not a player in this match.
    #[display("caller is not a player in this match")]
    NotAPlayer,
    /// It is the other player's turn.
    #[display("it is not your turn")]
    NotYourTurn,
    /// No move timeout was configured for this match.
    #[display("move timeout is not configured")]
    TimeoutNotConfigured,
    /// A timeout win cannot be claimed while it is your own turn.
    #[display("cannot claim a timeout win on your own turn")]
    CannotClaimOnYourTurn,
    /// The opponent still has time on the clock.
    #[display("opponent has not timed out")]
    OpponentNotTimedOut,
    /// Pot arithmetic overflowed.
    #[display("arithmetic overflow")]
    MathOverflow,
    /// The move itself was illegal.
    #[display("illegal move: {_0}")]
    Move(MoveError),
}

impl std::error::Error for MatchError {}

impl From<MoveError> for MatchError {
    fn from(err: MoveError) -> Self {
        MatchError::Move(err)
    }
}

/// A wagered chess match between two players.
///
/// Player one is the creator and always plays white. The second seat
/// stays empty until someone joins. The wager sits in an external escrow
/// account; the match only tracks the amounts.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ChessMatch {
    /// Immutable match identifier.
    pub(crate) match_id: String,
    /// The creator, playing white.
    pub(crate) player_one: PlayerId,
    /// The joiner, playing black. Empty until the match fills.
    pub(crate) player_two: Option<PlayerId>,
    /// Lifecycle phase.
    pub(crate) phase: MatchPhase,
    /// Board state plus rule counters.
    pub(crate) position: Position,
    /// Timestamp of the last state-changing action, in seconds.
    pub(crate) last_move_at: i64,
    /// Seconds a player may sit on the move; zero or negative disables
    /// timeout claims.
    pub(crate) move_timeout: i64,
    /// Token the wagers are denominated in.
    pub(crate) betting_token: TokenId,
    /// Player one's wager.
    pub(crate) bet_one: u64,
    /// Player two's wager, zero until joined.
    pub(crate) bet_two: u64,
    /// Total escrowed amount.
    pub(crate) pot: u64,
    /// Platform fee in basis points.
    pub(crate) fee_bps: u16,
    /// Whether settlement has already paid this match out.
    pub(crate) payout_processed: bool,
}

impl ChessMatch {
    /// Creates a match in the waiting phase with the creator seated as
    /// white and the pot holding their wager.
    #[instrument]
    pub fn initialize(
        match_id: &str,
        creator: &str,
        betting_token: &str,
        bet_amount: u64,
        move_timeout: i64,
        fee_bps: u16,
        now: i64,
    ) -> Result<Self, MatchError> {
        if match_id.is_empty() || match_id.len() > MAX_MATCH_ID_LEN {
            return Err(MatchError::InvalidMatchId);
        }
        if bet_amount == 0 {
            return Err(MatchError::InvalidBetAmount);
        }
        if u64::from(fee_bps) > BPS_DENOMINATOR {
            return Err(MatchError::InvalidPlatformFee);
        }

        info!(match_id, creator, bet_amount, fee_bps, "match created");
        Ok(Self {
            match_id: match_id.to_string(),
            player_one: creator.to_string(),
            player_two: None,
            phase: MatchPhase::WaitingForOpponent,
            position: Position::start(),
            last_move_at: now,
            move_timeout,
            betting_token: betting_token.to_string(),
            bet_one: bet_amount,
            bet_two: 0,
            pot: bet_amount,
            fee_bps,
            payout_processed: false,
        })
    }

    /// Seats the second player as black and activates the match.
    #[instrument(skip(self), fields(match_id = %self.match_id))]
    pub fn join(&mut self, caller: &str, bet_amount: u64, now: i64) -> Result<(), MatchError> {
        if !self.phase.is_waiting() {
            return Err(MatchError::MatchNotWaiting);
        }
        if caller == self.player_one {
            warn!(caller, "creator tried to join their own match");
            return Err(MatchError::CannotJoinOwnMatch);
        }
        if bet_amount != self.bet_one {
            return Err(MatchError::BetAmountMismatch);
        }
        let pot = self
            .pot
            .checked_add(bet_amount)
            .ok_or(MatchError::MathOverflow)?;

        self.player_two = Some(caller.to_string());
        self.bet_two = bet_amount;
        self.pot = pot;
        self.phase = MatchPhase::Active;
        self.last_move_at = now;
        info!(caller, pot, "opponent joined, match active");
        Ok(())
    }

    /// Plays a move for `caller`.
    ///
    /// If a move timeout is configured and the caller's own clock has
    /// already run out, the submission forfeits the match to the
    /// opponent instead of moving.
    #[instrument(skip(self), fields(match_id = %self.match_id, mv = %mv))]
    pub fn make_move(
        &mut self,
        caller: &str,
        mv: CandidateMove,
        now: i64,
    ) -> Result<MoveReport, MatchError> {
        if !self.phase.is_active() {
            return Err(MatchError::MatchNotActive);
        }
        let color = self.player_color(caller).ok_or(MatchError::NotAPlayer)?;
        if color != self.position.turn() {
            return Err(MatchError::NotYourTurn);
        }

        if self.move_timeout > 0 && now.saturating_sub(self.last_move_at) > self.move_timeout {
            let phase = MatchPhase::Finished {
                outcome: Outcome::win_for(color.opponent()),
                reason: EndReason::Timeout,
            };
            self.phase = phase;
            self.last_move_at = now;
            warn!(caller, "move arrived after the clock expired, match forfeited");
            return Ok(MoveReport {
                algebraic: mv.algebraic(),
                capture: false,
                check: false,
                phase,
            });
        }

        let applied = self.position.apply(mv)?;
        let verdict = verdict(&applied.position)?;
        let check = in_check(applied.position.board(), applied.position.turn())?;
        let phase = match verdict {
            Verdict::Ongoing => MatchPhase::Active,
            Verdict::Checkmate => MatchPhase::Finished {
                outcome: Outcome::win_for(color),
                reason: EndReason::Checkmate,
            },
            Verdict::Stalemate => MatchPhase::Finished {
                outcome: Outcome::Draw,
                reason: EndReason::Stalemate,
            },
            Verdict::FiftyMoveRule => MatchPhase::Finished {
                outcome: Outcome::Draw,
                reason: EndReason::FiftyMoveRule,
            },
        };

        self.position = applied.position;
        self.last_move_at = now;
        self.phase = phase;

        let report = MoveReport {
            algebraic: mv.algebraic(),
            capture: applied.captured.is_some(),
            check,
            phase,
        };
        info!(
            mv = %report.algebraic,
            capture = report.capture,
            check = report.check,
            terminal = phase.is_terminal(),
            "move applied"
        );
        Ok(report)
    }

    /// Resigns the match; the opponent wins.
    #[instrument(skip(self), fields(match_id = %self.match_id))]
    pub fn resign(&mut self, caller: &str, now: i64) -> Result<(), MatchError> {
        if !self.phase.is_active() {
            return Err(MatchError::MatchNotActive);
        }
        let color = self.player_color(caller).ok_or(MatchError::NotAPlayer)?;

        self.phase = MatchPhase::Finished {
            outcome: Outcome::win_for(color.opponent()),
            reason: EndReason::Resignation,
        };
        self.last_move_at = now;
        info!(caller, winner = ?color.opponent(), "resignation");
        Ok(())
    }

    /// Claims the win because the player on turn overran the move clock.
    ///
    /// Only the player waiting on their opponent may claim, and only
    /// strictly after the configured timeout has elapsed.
    #[instrument(skip(self), fields(match_id = %self.match_id))]
    pub fn claim_timeout_win(&mut self, caller: &str, now: i64) -> Result<(), MatchError> {
        if !self.phase.is_active() {
            return Err(MatchError::MatchNotActive);
        }
        let color = self.player_color(caller).ok_or(MatchError::NotAPlayer)?;
        if self.move_timeout <= 0 {
            return Err(MatchError::TimeoutNotConfigured);
        }
        if self.position.turn() == color {
            return Err(MatchError::CannotClaimOnYourTurn);
        }
        if now.saturating_sub(self.last_move_at) <= self.move_timeout {
            return Err(MatchError::OpponentNotTimedOut);
        }

        self.phase = MatchPhase::Finished {
            outcome: Outcome::win_for(color),
            reason: EndReason::Timeout,
        };
        self.last_move_at = now;
        info!(caller, "timeout win claimed");
        Ok(())
    }

    /// The color `caller` plays, if they are seated in this match.
    pub fn player_color(&self, caller: &str) -> Option<Color> {
        if caller == self.player_one {
            Some(Color::White)
        } else if self.player_two.as_deref() == Some(caller) {
            Some(Color::Black)
        } else {
            None
        }
    }

    /// Index of the player on turn: 0 for white, 1 for black.
    pub fn current_player_index(&self) -> u8 {
        match self.position.turn() {
            Color::White => 0,
            Color::Black => 1,
        }
    }

    /// The winning player's id, if the match finished decisively.
    pub fn winner(&self) -> Option<&PlayerId> {
        let MatchPhase::Finished { outcome, .. } = self.phase else {
            return None;
        };
        match outcome.winner()? {
            Color::White => Some(&self.player_one),
            Color::Black => self.player_two.as_ref(),
        }
    }
}
