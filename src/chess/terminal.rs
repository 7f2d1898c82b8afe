//! Check and terminal-state detection.

use super::action::MoveError;
use super::movement;
use super::rules::Position;
use super::types::{Board, Color};
use serde::{Deserialize, Serialize};

/// How a position stands for the side to move.
///
/// Checkmate and stalemate outrank the fifty-move rule: a mating move
/// that also reaches one hundred quiet halfmoves still mates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Play continues.
    Ongoing,
    /// The side to move is in check with no legal reply.
    Checkmate,
    /// The side to move is not in check but has no legal move.
    Stalemate,
    /// One hundred halfmoves have passed without a pawn move or capture.
    FiftyMoveRule,
}

/// Halfmove-clock threshold for the fifty-move rule.
pub const FIFTY_MOVE_HALFMOVES: u8 = 100;

/// Whether the given color's king is attacked.
///
/// A missing king is an internal-consistency failure, reported rather
/// than panicked on.
pub fn in_check(board: &Board, color: Color) -> Result<bool, MoveError> {
    let king = board.king_square(color).ok_or(MoveError::KingNotFound)?;
    Ok(movement::square_attacked(board, king, color.opponent()))
}

/// Classifies a position for the side to move.
pub fn verdict(position: &Position) -> Result<Verdict, MoveError> {
    if !position.has_legal_move() {
        return if in_check(position.board(), position.turn())? {
            Ok(Verdict::Checkmate)
        } else {
            Ok(Verdict::Stalemate)
        };
    }
    if position.halfmove_clock() >= FIFTY_MOVE_HALFMOVES {
        return Ok(Verdict::FiftyMoveRule);
    }
    Ok(Verdict::Ongoing)
}
