//! Strictly Chess - deterministic speed-chess match engine with
//! escrowed wagers.
//!
//! # Architecture
//!
//! - **Chess**: pure rules engine (board, move validation, check and
//!   terminal detection)
//! - **Session**: match lifecycle state machine (create, join, move,
//!   resign, timeout forfeiture)
//! - **Settlement**: fee computation and exactly-once payout through an
//!   abstract ledger
//!
//! The engine is a pure, synchronous state transformer: no clock reads,
//! no I/O, no internal retries. The host supplies the current time on
//! every call, serializes access per match id, and owns persistence
//! through the serde derives on every state type.
//!
//! # Example
//!
//! ```
//! use strictly_chess::{CandidateMove, ChessMatch, Square};
//!
//! # fn example() -> Result<(), strictly_chess::MatchError> {
//! let mut m = ChessMatch::initialize("match-1", "alice", "SEND", 100, 300, 250, 0)?;
//! m.join("bob", 100, 10)?;
//!
//! let e2 = Square::from_algebraic("e2").unwrap();
//! let e4 = Square::from_algebraic("e4").unwrap();
//! m.make_move("alice", CandidateMove::plain(e2, e4), 20)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod chess;
mod session;
mod settlement;

// Crate-level exports - rules engine
pub use chess::{
    AppliedMove, Board, CandidateMove, CastlingRights, Color, FIFTY_MOVE_HALFMOVES, MoveError,
    Piece, PieceKind, Position, Square, Verdict, in_check, verdict,
};

// Crate-level exports - match lifecycle
pub use session::{
    BPS_DENOMINATOR, ChessMatch, EndReason, MAX_MATCH_ID_LEN, MatchError, MatchPhase, MoveReport,
    Outcome, PlayerId, TokenId,
};

// Crate-level exports - settlement
pub use settlement::{
    AccountId, InMemoryLedger, Ledger, LedgerError, Payout, Settlement, SettlementError,
};
