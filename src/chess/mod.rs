//! Chess rules engine: board model, move validation, and terminal
//! detection. Knows nothing about players, wagers, or clocks.

mod action;
mod movement;
mod rules;
mod terminal;
mod types;

pub use action::{CandidateMove, MoveError};
pub use rules::{AppliedMove, Position};
pub use terminal::{FIFTY_MOVE_HALFMOVES, Verdict, in_check, verdict};
pub use types::{Board, CastlingRights, Color, Piece, PieceKind, Square};
