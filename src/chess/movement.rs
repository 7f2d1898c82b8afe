//! Per-piece movement patterns and attack detection.
//!
//! Everything here is pseudo-legal: patterns ignore whether the mover's
//! king would be left in check. King safety is layered on top by the
//! validator, which keeps attack generation free of recursion.

use super::types::{Board, CastlingRights, Color, Piece, PieceKind, Square};

/// How a pattern check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PatternError {
    /// Geometry is wrong for the piece kind.
    Illegal,
    /// Geometry is fine but an intermediate square is occupied.
    Blocked,
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

fn delta(from: Square, to: Square) -> (i8, i8) {
    (
        to.row as i8 - from.row as i8,
        to.col as i8 - from.col as i8,
    )
}

/// Checks the movement pattern for a non-castling move.
///
/// The caller has already verified bounds, ownership, and that the
/// destination holds no friendly piece.
pub(crate) fn move_pattern(
    board: &Board,
    piece: Piece,
    from: Square,
    to: Square,
    en_passant: Option<Square>,
) -> Result<(), PatternError> {
    match piece.kind {
        PieceKind::Pawn => pawn_pattern(board, piece.color, from, to, en_passant),
        PieceKind::Knight => {
            if KNIGHT_OFFSETS.contains(&delta(from, to)) {
                Ok(())
            } else {
                Err(PatternError::Illegal)
            }
        }
        PieceKind::Bishop => slider_pattern(board, from, to, false, true),
        PieceKind::Rook => slider_pattern(board, from, to, true, false),
        PieceKind::Queen => slider_pattern(board, from, to, true, true),
        PieceKind::King => {
            let (dr, dc) = delta(from, to);
            if dr.abs() <= 1 && dc.abs() <= 1 && (dr, dc) != (0, 0) {
                Ok(())
            } else {
                Err(PatternError::Illegal)
            }
        }
    }
}

fn pawn_pattern(
    board: &Board,
    color: Color,
    from: Square,
    to: Square,
    en_passant: Option<Square>,
) -> Result<(), PatternError> {
    let dir = color.pawn_direction();
    let (dr, dc) = delta(from, to);

    // Single advance onto an empty square.
    if dc == 0 && dr == dir && board.piece_at(to).is_none() {
        return Ok(());
    }

    // Double advance from the start rank through two empty squares.
    if dc == 0 && dr == 2 * dir && from.row == color.pawn_start_row() {
        let mid = Square::new((from.row as i8 + dir) as u8, from.col);
        if board.piece_at(to).is_none() && board.piece_at(mid).is_none() {
            return Ok(());
        }
    }

    // Diagonal capture, including onto the en passant target.
    if dc.abs() == 1 && dr == dir {
        if let Some(target) = board.piece_at(to)
            && target.color != color
        {
            return Ok(());
        }
        if en_passant == Some(to) {
            return Ok(());
        }
    }

    Err(PatternError::Illegal)
}

fn slider_pattern(
    board: &Board,
    from: Square,
    to: Square,
    straight: bool,
    diagonal: bool,
) -> Result<(), PatternError> {
    let (dr, dc) = delta(from, to);
    let is_straight = dr == 0 || dc == 0;
    let is_diagonal = dr.abs() == dc.abs() && dr != 0;

    if (straight && is_straight) || (diagonal && is_diagonal) {
        if path_clear(board, from, to) {
            Ok(())
        } else {
            Err(PatternError::Blocked)
        }
    } else {
        Err(PatternError::Illegal)
    }
}

/// Whether every square strictly between `from` and `to` is empty.
/// `from` and `to` must share a rank, file, or diagonal.
fn path_clear(board: &Board, from: Square, to: Square) -> bool {
    let (dr, dc) = delta(from, to);
    let (step_r, step_c) = (dr.signum(), dc.signum());
    let mut row = from.row as i8 + step_r;
    let mut col = from.col as i8 + step_c;
    while (row, col) != (to.row as i8, to.col as i8) {
        if board.piece_at(Square::new(row as u8, col as u8)).is_some() {
            return false;
        }
        row += step_r;
        col += step_c;
    }
    true
}

/// Whether any piece of `by` attacks `target`.
pub(crate) fn square_attacked(board: &Board, target: Square, by: Color) -> bool {
    for row in 0..8u8 {
        for col in 0..8u8 {
            let from = Square::new(row, col);
            if let Some(piece) = board.piece_at(from)
                && piece.color == by
                && attacks(board, piece, from, target)
            {
                return true;
            }
        }
    }
    false
}

fn attacks(board: &Board, piece: Piece, from: Square, target: Square) -> bool {
    let (dr, dc) = delta(from, target);
    match piece.kind {
        // Pawns attack diagonally only; their advances threaten nothing.
        PieceKind::Pawn => dr == piece.color.pawn_direction() && dc.abs() == 1,
        PieceKind::Knight => KNIGHT_OFFSETS.contains(&(dr, dc)),
        PieceKind::King => dr.abs() <= 1 && dc.abs() <= 1 && (dr, dc) != (0, 0),
        PieceKind::Rook => (dr == 0 || dc == 0) && path_clear(board, from, target),
        PieceKind::Bishop => dr.abs() == dc.abs() && dr != 0 && path_clear(board, from, target),
        PieceKind::Queen => {
            let aligned = dr == 0 || dc == 0 || dr.abs() == dc.abs();
            aligned && (dr, dc) != (0, 0) && path_clear(board, from, target)
        }
    }
}

/// Validates a castling move: the king standing on its home square moves
/// two columns toward a rook that has never moved, through empty squares,
/// with neither the king's start, passage, nor destination under attack.
pub(crate) fn castling_allowed(
    board: &Board,
    color: Color,
    from: Square,
    to: Square,
    rights: &CastlingRights,
) -> bool {
    let home = color.home_row();
    if from.row != home || to.row != home || from.col != 4 {
        return false;
    }
    let kingside = match to.col {
        6 => true,
        2 => false,
        _ => return false,
    };
    if !rights.allows(color, kingside) {
        return false;
    }

    let rook_home = Square::new(home, if kingside { 7 } else { 0 });
    match board.piece_at(rook_home) {
        Some(p) if p.kind == PieceKind::Rook && p.color == color => {}
        _ => return false,
    }

    let between: &[u8] = if kingside { &[5, 6] } else { &[1, 2, 3] };
    if between
        .iter()
        .any(|&col| board.piece_at(Square::new(home, col)).is_some())
    {
        return false;
    }

    let enemy = color.opponent();
    if square_attacked(board, from, enemy) {
        return false;
    }
    let king_path: &[u8] = if kingside { &[5, 6] } else { &[3, 2] };
    !king_path
        .iter()
        .any(|&col| square_attacked(board, Square::new(home, col), enemy))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(kind: PieceKind, color: Color) -> Piece {
        Piece::new(kind, color)
    }

    #[test]
    fn knight_jumps_ignore_blockers() {
        let board = Board::standard();
        let from = Square::new(0, 1);
        let knight = piece(PieceKind::Knight, Color::White);
        assert!(move_pattern(&board, knight, from, Square::new(2, 2), None).is_ok());
        assert_eq!(
            move_pattern(&board, knight, from, Square::new(2, 1), None),
            Err(PatternError::Illegal)
        );
    }

    #[test]
    fn slider_reports_blocked_path() {
        let board = Board::standard();
        let rook = piece(PieceKind::Rook, Color::White);
        // a1 rook cannot pass through the a2 pawn.
        assert_eq!(
            move_pattern(&board, rook, Square::new(0, 0), Square::new(4, 0), None),
            Err(PatternError::Blocked)
        );
        // Sideways through the knight square on an empty rank is fine
        // once the knight is gone.
        let mut open = board;
        open.put(Square::new(0, 1), None);
        assert_eq!(
            move_pattern(&open, rook, Square::new(0, 0), Square::new(0, 2), None),
            Ok(())
        );
    }

    #[test]
    fn pawn_double_requires_clear_squares() {
        let mut board = Board::standard();
        let pawn = piece(PieceKind::Pawn, Color::White);
        assert!(move_pattern(&board, pawn, Square::new(1, 4), Square::new(3, 4), None).is_ok());
        board.put(
            Square::new(2, 4),
            Some(piece(PieceKind::Knight, Color::Black)),
        );
        assert_eq!(
            move_pattern(&board, pawn, Square::new(1, 4), Square::new(3, 4), None),
            Err(PatternError::Illegal)
        );
    }

    #[test]
    fn attack_detection_basics() {
        let mut board = Board::empty();
        board.put(Square::new(3, 3), Some(piece(PieceKind::Queen, Color::White)));
        assert!(square_attacked(&board, Square::new(3, 7), Color::White));
        assert!(square_attacked(&board, Square::new(6, 6), Color::White));
        assert!(!square_attacked(&board, Square::new(4, 5), Color::White));

        // A blocker on the file cuts the ray.
        board.put(Square::new(5, 3), Some(piece(PieceKind::Pawn, Color::Black)));
        assert!(!square_attacked(&board, Square::new(7, 3), Color::White));
    }

    #[test]
    fn pawn_attacks_are_diagonal_only() {
        let mut board = Board::empty();
        board.put(Square::new(3, 3), Some(piece(PieceKind::Pawn, Color::White)));
        assert!(square_attacked(&board, Square::new(4, 2), Color::White));
        assert!(square_attacked(&board, Square::new(4, 4), Color::White));
        assert!(!square_attacked(&board, Square::new(4, 3), Color::White));
    }

    #[test]
    fn castling_blocked_by_attacked_passage() {
        let mut board = Board::empty();
        board.put(Square::new(0, 4), Some(piece(PieceKind::King, Color::White)));
        board.put(Square::new(0, 7), Some(piece(PieceKind::Rook, Color::White)));
        board.put(Square::new(7, 4), Some(piece(PieceKind::King, Color::Black)));
        let rights = CastlingRights::default();

        assert!(castling_allowed(
            &board,
            Color::White,
            Square::new(0, 4),
            Square::new(0, 6),
            &rights
        ));

        // A rook eyeing f1 stops the king from passing through it.
        board.put(Square::new(5, 5), Some(piece(PieceKind::Rook, Color::Black)));
        assert!(!castling_allowed(
            &board,
            Color::White,
            Square::new(0, 4),
            Square::new(0, 6),
            &rights
        ));
    }
}
