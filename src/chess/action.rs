//! First-class move types for chess.
//!
//! Candidate moves are domain events: the mover's intent, independent of
//! whether the position accepts it.

use super::types::{PieceKind, Square};
use derive_new::new;
use serde::{Deserialize, Serialize};

/// A candidate move: source and destination squares plus an optional
/// promotion kind, required exactly when a pawn reaches the last rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
pub struct CandidateMove {
    /// Square the piece moves from.
    pub from: Square,
    /// Square the piece moves to.
    pub to: Square,
    /// Promotion kind for a pawn reaching the last rank.
    pub promotion: Option<PieceKind>,
}

impl CandidateMove {
    /// A move with no promotion.
    pub fn plain(from: Square, to: Square) -> Self {
        Self::new(from, to, None)
    }

    /// Coordinate text such as "e2e4" or "e7e8q".
    pub fn algebraic(&self) -> String {
        let promo = match self.promotion {
            Some(PieceKind::Queen) => "q",
            Some(PieceKind::Rook) => "r",
            Some(PieceKind::Bishop) => "b",
            Some(PieceKind::Knight) => "n",
            _ => "",
        };
        format!("{}{}{}", self.from.algebraic(), self.to.algebraic(), promo)
    }
}

impl std::fmt::Display for CandidateMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.algebraic())
    }
}

/// Why a candidate move was rejected.
///
/// Checks run in a fixed order, so the reported reason is always the
/// first guard the move failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
pub enum MoveError {
    /// A coordinate lies outside the board.
    #[display("coordinates out of bounds")]
    OutOfBounds,
    /// The source square is empty.
    #[display("source square is empty")]
    EmptySource,
    /// The piece on the source square belongs to the opponent.
    #[display("not your piece to move")]
    NotYourPiece,
    /// The destination holds a piece of the mover's own color.
    #[display("cannot capture your own piece")]
    OwnPieceCapture,
    /// The movement pattern is illegal for this piece kind.
    #[display("illegal movement for this piece")]
    IllegalPieceMovement,
    /// A sliding piece's path is obstructed.
    #[display("path is blocked")]
    PathBlocked,
    /// The move would leave the mover's own king in check.
    #[display("move leaves king in check")]
    LeavesKingInCheck,
    /// The supplied promotion kind is not allowed.
    #[display("piece kind is not allowed for promotion")]
    InvalidPromotionPiece,
    /// A pawn reached the last rank without a promotion kind.
    #[display("promotion required on the last rank")]
    MissingPromotion,
    /// A promotion was supplied for a pawn not on the last rank.
    #[display("pawn is not on the last rank")]
    PromotionNotOnLastRank,
    /// A promotion was supplied for a piece that is not a pawn.
    #[display("only pawns can be promoted")]
    PromotionNotAPawn,
    /// The mover's king is missing from the board.
    #[display("internal error: king not found")]
    KingNotFound,
}

impl std::error::Error for MoveError {}
