// --- Piece values ---
pub const PAWN_VALUE: i32 = 100;
pub const KNIGHT_VALUE: i32 = 320;
pub const BISHOP_VALUE: i32 = 330;
pub const ROOK_VALUE: i32 = 500;
pub const QUEEN_VALUE: i32 = 900;

// Constants for game phase calculation
pub const QUEEN_PHASE_VAL: i32 = 4;
pub const ROOK_PHASE_VAL: i32 = 2;
pub const BISHOP_PHASE_VAL: i32 = 1;
pub const KNIGHT_PHASE_VAL: i32 = 1;
pub const TOTAL_PHASE: i32 =
    (QUEEN_PHASE_VAL * 2) + (ROOK_PHASE_VAL * 4) + (BISHOP_PHASE_VAL * 4) + (KNIGHT_PHASE_VAL * 4);

// Pawn Structure Evaluation
pub const DOUBLED_PAWN_PENALTY: i32 = 15;
pub const ISOLATED_PAWN_PENALTY: i32 = 12;
pub const PASSED_PAWN_BONUS: i32 = 20;

// Rook Evaluation
pub const ROOK_OPEN_FILE_BONUS: i32 = 20;
pub const ROOK_SEMI_OPEN_FILE_BONUS: i32 = 10;
pub const SEVENTH_RANK_BONUS: i32 = 25;

// Mobility Evaluation
pub const KNIGHT_MOBILITY_BONUS: i32 = 4;
pub const BISHOP_MOBILITY_BONUS: i32 = 5;
pub const ROOK_MOBILITY_BONUS: i32 = 2;
pub const QUEEN_MOBILITY_BONUS: i32 = 1;

pub const TEMPO_BONUS: i32 = 10;

// Search scores. Everything at or above MATE_BOUND in magnitude is a mate score.
pub const INFINITY: i32 = 32_000;
pub const MATE_SCORE: i32 = 31_000;
pub const MAX_PLY: usize = 128;
pub const MATE_BOUND: i32 = MATE_SCORE - MAX_PLY as i32;
pub const DRAW_SCORE: i32 = 0;

// Search limits
pub const MAX_DEPTH: u8 = 64;
pub const DEFAULT_HASH_MB: usize = 64;
pub const POLL_INTERVAL: u64 = 1024;
