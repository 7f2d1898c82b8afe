//! Move validation and application.
//!
//! A [`Position`] is an owned value: applying a move builds the successor
//! position on a scratch copy and never touches the original, so a
//! rejected move provably changes nothing.

use super::action::{CandidateMove, MoveError};
use super::movement::{self, PatternError};
use super::types::{Board, CastlingRights, Color, Piece, PieceKind, Square};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::instrument;

/// A full game position: board plus every rule-relevant counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    board: Board,
    turn: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u8,
    fullmove_number: u16,
}

/// A successfully applied move: the successor position and what the move
/// did on the way.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    /// The position after the move, side to move flipped.
    pub position: Position,
    /// The captured piece, if any (the passed pawn for en passant).
    pub captured: Option<Piece>,
    /// Whether the move was a castle.
    pub castled: bool,
    /// The promotion kind, if the move promoted.
    pub promoted: Option<PieceKind>,
}

impl Position {
    /// The standard start position, white to move.
    pub fn start() -> Self {
        Self {
            board: Board::standard(),
            turn: Color::White,
            castling: CastlingRights::default(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Assembles a position from explicit parts, for hosts rehydrating
    /// state or setting up an arbitrary board.
    pub fn from_parts(
        board: Board,
        turn: Color,
        castling: CastlingRights,
        en_passant: Option<Square>,
        halfmove_clock: u8,
        fullmove_number: u16,
    ) -> Self {
        Self {
            board,
            turn,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        }
    }

    /// Returns the board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Returns the side to move.
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Returns the castling rights.
    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    /// Returns the en passant target square, if one is live.
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Halfmoves since the last pawn move or capture.
    pub fn halfmove_clock(&self) -> u8 {
        self.halfmove_clock
    }

    /// Move pair counter, incremented after each of black's moves.
    pub fn fullmove_number(&self) -> u16 {
        self.fullmove_number
    }

    /// Validates `mv` against this position and, if legal, returns the
    /// successor position.
    ///
    /// Guards run in a fixed order and the first failure wins: bounds,
    /// source occupancy, ownership, friendly destination, movement
    /// pattern, promotion shape, king safety.
    #[instrument(skip(self), level = "debug", fields(mv = %mv))]
    pub fn apply(&self, mv: CandidateMove) -> Result<AppliedMove, MoveError> {
        if !mv.from.in_bounds() || !mv.to.in_bounds() {
            return Err(MoveError::OutOfBounds);
        }
        let piece = self.board.piece_at(mv.from).ok_or(MoveError::EmptySource)?;
        if piece.color != self.turn {
            return Err(MoveError::NotYourPiece);
        }
        if let Some(target) = self.board.piece_at(mv.to)
            && target.color == self.turn
        {
            return Err(MoveError::OwnPieceCapture);
        }

        let castled = piece.kind == PieceKind::King
            && (mv.to.col as i8 - mv.from.col as i8).abs() == 2;
        if castled {
            if !movement::castling_allowed(&self.board, self.turn, mv.from, mv.to, &self.castling)
            {
                return Err(MoveError::IllegalPieceMovement);
            }
        } else {
            movement::move_pattern(&self.board, piece, mv.from, mv.to, self.en_passant).map_err(
                |e| match e {
                    PatternError::Blocked => MoveError::PathBlocked,
                    PatternError::Illegal => MoveError::IllegalPieceMovement,
                },
            )?;
        }

        let promoting =
            piece.kind == PieceKind::Pawn && mv.to.row == self.turn.promotion_row();
        match (promoting, mv.promotion) {
            (true, None) => return Err(MoveError::MissingPromotion),
            (true, Some(kind)) if !kind.is_promotion_target() => {
                return Err(MoveError::InvalidPromotionPiece);
            }
            (false, Some(_)) if piece.kind == PieceKind::Pawn => {
                return Err(MoveError::PromotionNotOnLastRank);
            }
            (false, Some(_)) => return Err(MoveError::PromotionNotAPawn),
            _ => {}
        }

        // Carry out the move on a scratch board.
        let mut board = self.board;
        let mut captured = board.take(mv.to);
        let en_passant_capture = piece.kind == PieceKind::Pawn
            && self.en_passant == Some(mv.to)
            && mv.from.col != mv.to.col;
        if en_passant_capture {
            let passed = Square::new(
                (mv.to.row as i8 - self.turn.pawn_direction()) as u8,
                mv.to.col,
            );
            captured = board.take(passed);
        }
        if castled {
            let home = self.turn.home_row();
            let (rook_from, rook_to) = if mv.to.col == 6 { (7, 5) } else { (0, 3) };
            match board.take(Square::new(home, rook_from)) {
                Some(rook) => board.put(Square::new(home, rook_to), Some(rook)),
                None => return Err(MoveError::IllegalPieceMovement),
            }
        }
        board.put(mv.from, None);
        let placed = match (promoting, mv.promotion) {
            (true, Some(kind)) => Piece::new(kind, piece.color),
            _ => piece,
        };
        board.put(mv.to, Some(placed));

        // The mover's own king must be safe afterward.
        let king = board.king_square(self.turn).ok_or(MoveError::KingNotFound)?;
        if movement::square_attacked(&board, king, self.turn.opponent()) {
            return Err(MoveError::LeavesKingInCheck);
        }

        // Bookkeeping for the successor position.
        let mut castling = self.castling;
        castling.revoke_for_move(piece, mv.from);
        if let Some(victim) = captured
            && victim.kind == PieceKind::Rook
        {
            castling.revoke_rook_home(victim.color, mv.to);
        }

        let en_passant = if piece.kind == PieceKind::Pawn
            && (mv.to.row as i8 - mv.from.row as i8).abs() == 2
        {
            Some(Square::new(
                ((mv.from.row as i8 + mv.to.row as i8) / 2) as u8,
                mv.from.col,
            ))
        } else {
            None
        };

        let halfmove_clock = if piece.kind == PieceKind::Pawn || captured.is_some() {
            0
        } else {
            self.halfmove_clock.saturating_add(1)
        };
        let fullmove_number = if self.turn == Color::Black {
            self.fullmove_number.saturating_add(1)
        } else {
            self.fullmove_number
        };

        Ok(AppliedMove {
            position: Position {
                board,
                turn: self.turn.opponent(),
                castling,
                en_passant,
                halfmove_clock,
                fullmove_number,
            },
            captured,
            castled,
            promoted: if promoting { mv.promotion } else { None },
        })
    }

    /// Every legal move for the side to move, promotions enumerated.
    pub fn legal_moves(&self) -> Vec<CandidateMove> {
        self.raw_candidates()
            .into_iter()
            .filter(|mv| self.apply(*mv).is_ok())
            .collect()
    }

    /// Whether the side to move has at least one legal move.
    pub(crate) fn has_legal_move(&self) -> bool {
        self.raw_candidates()
            .into_iter()
            .any(|mv| self.apply(mv).is_ok())
    }

    /// All geometrically conceivable candidates for the side to move,
    /// before any legality filtering.
    fn raw_candidates(&self) -> Vec<CandidateMove> {
        let mut out = Vec::new();
        for from_row in 0..8u8 {
            for from_col in 0..8u8 {
                let from = Square::new(from_row, from_col);
                let Some(piece) = self.board.piece_at(from) else {
                    continue;
                };
                if piece.color != self.turn {
                    continue;
                }
                for to_row in 0..8u8 {
                    for to_col in 0..8u8 {
                        let to = Square::new(to_row, to_col);
                        if from == to {
                            continue;
                        }
                        if piece.kind == PieceKind::Pawn
                            && to_row == self.turn.promotion_row()
                        {
                            for kind in PieceKind::iter().filter(|k| k.is_promotion_target()) {
                                out.push(CandidateMove::new(from, to, Some(kind)));
                            }
                        } else {
                            out.push(CandidateMove::plain(from, to));
                        }
                    }
                }
            }
        }
        out
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(text: &str) -> Square {
        Square::from_algebraic(text).expect("valid square")
    }

    fn play(position: Position, moves: &[(&str, &str)]) -> Position {
        let mut position = position;
        for (from, to) in moves {
            position = position
                .apply(CandidateMove::plain(sq(from), sq(to)))
                .unwrap_or_else(|e| panic!("{from}{to} rejected: {e}"))
                .position;
        }
        position
    }

    #[test]
    fn rejection_order_is_stable() {
        let position = Position::start();
        assert_eq!(
            position
                .apply(CandidateMove::plain(Square::new(8, 0), Square::new(0, 0)))
                .unwrap_err(),
            MoveError::OutOfBounds
        );
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("e4"), sq("e5")))
                .unwrap_err(),
            MoveError::EmptySource
        );
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("e7"), sq("e5")))
                .unwrap_err(),
            MoveError::NotYourPiece
        );
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("d1"), sq("d2")))
                .unwrap_err(),
            MoveError::OwnPieceCapture
        );
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("a1"), sq("a5")))
                .unwrap_err(),
            MoveError::PathBlocked
        );
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("b1"), sq("b3")))
                .unwrap_err(),
            MoveError::IllegalPieceMovement
        );
    }

    #[test]
    fn en_passant_removes_the_passed_pawn() {
        // 1. e4 a6 2. e5 d5 and the white e-pawn may take on d6.
        let position = play(
            Position::start(),
            &[("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")],
        );
        assert_eq!(position.en_passant(), Some(sq("d6")));

        let applied = position
            .apply(CandidateMove::plain(sq("e5"), sq("d6")))
            .expect("en passant capture");
        assert_eq!(
            applied.captured,
            Some(Piece::new(PieceKind::Pawn, Color::Black))
        );
        assert!(applied.position.board().piece_at(sq("d5")).is_none());
        assert!(applied.position.board().piece_at(sq("d6")).is_some());
        // The target is single-use.
        assert_eq!(applied.position.en_passant(), None);
    }

    #[test]
    fn en_passant_target_expires_after_one_move() {
        let position = play(
            Position::start(),
            &[("e2", "e4"), ("a7", "a6"), ("e4", "e5"), ("d7", "d5")],
        );
        // White declines; the capture is gone next turn.
        let position = play(position, &[("b1", "c3"), ("a6", "a5")]);
        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("e5"), sq("d6")))
                .unwrap_err(),
            MoveError::IllegalPieceMovement
        );
    }

    #[test]
    fn promotion_is_mandatory_and_restricted() {
        let mut board = Board::empty();
        board.put(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)));
        board.put(sq("a8"), Some(Piece::new(PieceKind::King, Color::Black)));
        board.put(sq("g7"), Some(Piece::new(PieceKind::Pawn, Color::White)));
        let position = Position::from_parts(
            board,
            Color::White,
            CastlingRights::default(),
            None,
            0,
            40,
        );

        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("g7"), sq("g8")))
                .unwrap_err(),
            MoveError::MissingPromotion
        );
        assert_eq!(
            position
                .apply(CandidateMove::new(sq("g7"), sq("g8"), Some(PieceKind::King)))
                .unwrap_err(),
            MoveError::InvalidPromotionPiece
        );

        let applied = position
            .apply(CandidateMove::new(sq("g7"), sq("g8"), Some(PieceKind::Queen)))
            .expect("promotion");
        assert_eq!(applied.promoted, Some(PieceKind::Queen));
        assert_eq!(
            applied.position.board().piece_at(sq("g8")),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
    }

    #[test]
    fn promotion_outside_last_rank_is_rejected() {
        let position = Position::start();
        assert_eq!(
            position
                .apply(CandidateMove::new(sq("e2"), sq("e4"), Some(PieceKind::Queen)))
                .unwrap_err(),
            MoveError::PromotionNotOnLastRank
        );
        assert_eq!(
            position
                .apply(CandidateMove::new(sq("b1"), sq("c3"), Some(PieceKind::Queen)))
                .unwrap_err(),
            MoveError::PromotionNotAPawn
        );
    }

    #[test]
    fn castling_moves_the_rook_too() {
        // Clear the kingside, then castle.
        let position = play(
            Position::start(),
            &[
                ("e2", "e4"),
                ("e7", "e5"),
                ("g1", "f3"),
                ("b8", "c6"),
                ("f1", "c4"),
                ("g8", "f6"),
            ],
        );
        let applied = position
            .apply(CandidateMove::plain(sq("e1"), sq("g1")))
            .expect("castle kingside");
        assert!(applied.castled);
        assert_eq!(
            applied.position.board().piece_at(sq("f1")),
            Some(Piece::new(PieceKind::Rook, Color::White))
        );
        assert!(applied.position.board().piece_at(sq("h1")).is_none());
        assert!(!applied.position.castling().allows(Color::White, true));
        assert!(!applied.position.castling().allows(Color::White, false));
    }

    #[test]
    fn pinned_piece_cannot_expose_king() {
        let mut board = Board::empty();
        board.put(sq("e1"), Some(Piece::new(PieceKind::King, Color::White)));
        board.put(sq("e2"), Some(Piece::new(PieceKind::Rook, Color::White)));
        board.put(sq("e8"), Some(Piece::new(PieceKind::Rook, Color::Black)));
        board.put(sq("a8"), Some(Piece::new(PieceKind::King, Color::Black)));
        let position = Position::from_parts(
            board,
            Color::White,
            CastlingRights::default(),
            None,
            0,
            1,
        );

        assert_eq!(
            position
                .apply(CandidateMove::plain(sq("e2"), sq("d2")))
                .unwrap_err(),
            MoveError::LeavesKingInCheck
        );
        // Sliding along the pin is fine.
        assert!(position
            .apply(CandidateMove::plain(sq("e2"), sq("e5")))
            .is_ok());
    }

    #[test]
    fn clocks_update_per_move() {
        let position = Position::start();
        let after = position
            .apply(CandidateMove::plain(sq("b1"), sq("c3")))
            .expect("knight move")
            .position;
        assert_eq!(after.halfmove_clock(), 1);
        assert_eq!(after.fullmove_number(), 1);

        let after = after
            .apply(CandidateMove::plain(sq("g8"), sq("f6")))
            .expect("knight move")
            .position;
        assert_eq!(after.halfmove_clock(), 2);
        assert_eq!(after.fullmove_number(), 2);

        let after = after
            .apply(CandidateMove::plain(sq("e2"), sq("e4")))
            .expect("pawn move")
            .position;
        assert_eq!(after.halfmove_clock(), 0);
    }
}
