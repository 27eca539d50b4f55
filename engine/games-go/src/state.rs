//! Full game state: board plus the rule bookkeeping around it.
//!
//! Tracks the ko point, consecutive passes, the positional-superko hash
//! history, and per-move snapshots for undo and SGF replay. The search
//! clones this state freely during descent, so it stays compact.

use thiserror::Error;

use crate::board::{Board, Cell, Color, NO_VERTEX, PASS, RESIGN};
use crate::zobrist::ZOBRIST;

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("illegal move")]
    IllegalMove,
    #[error("syntax not understood")]
    Syntax,
    #[error("Not a valid number of handicap stones")]
    BadHandicap,
}

#[derive(Clone)]
struct Snapshot {
    board: Board,
    passes: u32,
    komove: i32,
    last_move: i32,
}

#[derive(Clone)]
pub struct GameState {
    board: Board,
    komi: f32,
    handicap: u32,
    passes: u32,
    komove: i32,
    last_move: i32,
    resigned: Option<Color>,
    /// Stones placed outside the move sequence (handicap, SGF setup).
    setup_stones: Vec<(Color, i32)>,
    history: Vec<Snapshot>,
    move_history: Vec<i32>,
    /// Board-only hashes after every move, starting with the empty board.
    ko_hash_history: Vec<u64>,
}

impl GameState {
    pub fn new(komi: f32) -> Self {
        let board = Board::new();
        let initial_hash = board.ko_hash();
        Self {
            board,
            komi,
            handicap: 0,
            passes: 0,
            komove: NO_VERTEX,
            last_move: NO_VERTEX,
            resigned: None,
            setup_stones: Vec::new(),
            history: Vec::new(),
            move_history: Vec::new(),
            ko_hash_history: vec![initial_hash],
        }
    }

    /// Reset to an empty board, keeping the configured komi.
    pub fn reset(&mut self) {
        *self = GameState::new(self.komi);
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn komi(&self) -> f32 {
        self.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.komi = komi;
    }

    #[inline]
    pub fn handicap(&self) -> u32 {
        self.handicap
    }

    pub fn set_handicap(&mut self, handicap: u32) {
        self.handicap = handicap;
    }

    #[inline]
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn set_passes(&mut self, passes: u32) {
        self.passes = passes;
    }

    #[inline]
    pub fn to_move(&self) -> Color {
        self.board.to_move()
    }

    pub fn set_to_move(&mut self, color: Color) {
        self.board.set_to_move(color);
    }

    /// Number of moves played (passes included, handicap placement not).
    #[inline]
    pub fn movenum(&self) -> usize {
        self.move_history.len()
    }

    #[inline]
    pub fn last_move(&self) -> i32 {
        self.last_move
    }

    #[inline]
    pub fn move_history(&self) -> &[i32] {
        &self.move_history
    }

    #[inline]
    pub fn has_resigned(&self) -> bool {
        self.resigned.is_some()
    }

    #[inline]
    pub fn who_resigned(&self) -> Option<Color> {
        self.resigned
    }

    /// Full position hash: stones, side to move, ko point and pass count.
    /// This is what distinguishes positions for tree reuse.
    pub fn hash(&self) -> u64 {
        let mut hash = self.board.ko_hash();
        if self.to_move() == Color::Black {
            hash ^= ZOBRIST.black_to_move;
        }
        if self.komove != NO_VERTEX {
            hash ^= ZOBRIST.ko[self.komove as usize];
        }
        hash ^= ZOBRIST.passes[self.passes.min(2) as usize];
        hash
    }

    /// Cache key under a board symmetry.
    pub fn symmetry_hash(&self, symmetry: usize) -> u64 {
        self.board.symmetry_hash(symmetry)
    }

    pub fn is_move_legal(&self, color: Color, vertex: i32) -> bool {
        if self.resigned.is_some() {
            return false;
        }
        if vertex == PASS || vertex == RESIGN {
            return true;
        }
        if vertex < 0 || vertex as usize >= crate::board::NUM_VERTICES {
            return false;
        }
        self.board.cell(vertex) == Cell::Empty
            && vertex != self.komove
            && !self.board.is_suicide(color, vertex)
    }

    /// Apply a move. The caller is responsible for legality; use
    /// [`GameState::is_move_legal`] first on untrusted input.
    pub fn play_move(&mut self, color: Color, vertex: i32) {
        self.history.push(Snapshot {
            board: self.board.clone(),
            passes: self.passes,
            komove: self.komove,
            last_move: self.last_move,
        });

        match vertex {
            RESIGN => {
                self.resigned = Some(color);
            }
            PASS => {
                self.passes += 1;
                self.komove = NO_VERTEX;
                self.board.set_to_move(color.opponent());
            }
            _ => {
                let (_, ko) = self.board.play(color, vertex);
                self.komove = ko;
                self.passes = 0;
                self.board.set_to_move(color.opponent());
            }
        }
        self.last_move = vertex;
        self.move_history.push(vertex);
        self.ko_hash_history.push(self.board.ko_hash());
    }

    /// Apply a GTP `play` command. Fails without touching the state.
    pub fn play_text_move(&mut self, color: &str, vertex: &str) -> Result<(), PlayError> {
        let color = Color::from_gtp(color).ok_or(PlayError::Syntax)?;
        let vertex = Board::text_to_vertex(vertex).ok_or(PlayError::Syntax)?;
        if !self.is_move_legal(color, vertex) {
            return Err(PlayError::IllegalMove);
        }
        self.play_move(color, vertex);
        Ok(())
    }

    /// Does the current position repeat an earlier one? Checked after a
    /// stone move; passes repeat trivially and are exempt.
    pub fn superko(&self) -> bool {
        let (last, earlier) = self
            .ko_hash_history
            .split_last()
            .expect("hash history starts non-empty");
        earlier.contains(last)
    }

    pub fn undo_move(&mut self) -> bool {
        let Some(snapshot) = self.history.pop() else {
            return false;
        };
        self.board = snapshot.board;
        self.passes = snapshot.passes;
        self.komove = snapshot.komove;
        self.last_move = snapshot.last_move;
        if self.move_history.pop() == Some(RESIGN) {
            self.resigned = None;
        }
        self.ko_hash_history.pop();
        true
    }

    /// Final area score from Black's perspective. Handicap stones are
    /// compensated to White, as in the original engine.
    pub fn final_score(&self) -> f32 {
        self.board.area_score(self.komi + self.handicap as f32)
    }

    /// Star-point coordinates for fixed handicap, in placement order.
    fn handicap_points(stones: u32) -> Option<Vec<(usize, usize)>> {
        use crate::board::BOARD_SIZE;
        let low = 3;
        let high = BOARD_SIZE - 1 - low;
        let mid = BOARD_SIZE / 2;

        let corners = [(low, high), (high, low), (high, high), (low, low)];
        let sides = [(low, mid), (high, mid), (mid, low), (mid, high)];

        let mut points: Vec<(usize, usize)> = Vec::new();
        match stones {
            2..=4 => points.extend(&corners[..stones as usize]),
            5 => {
                points.extend(&corners);
                points.push((mid, mid));
            }
            6 => {
                points.extend(&corners);
                points.extend(&sides[..2]);
            }
            7 => {
                points.extend(&corners);
                points.extend(&sides[..2]);
                points.push((mid, mid));
            }
            8 => {
                points.extend(&corners);
                points.extend(&sides);
            }
            9 => {
                points.extend(&corners);
                points.extend(&sides);
                points.push((mid, mid));
            }
            _ => return None,
        }
        Some(points)
    }

    /// Place fixed handicap stones on the star points. The board must be
    /// empty. White moves first afterwards.
    pub fn set_fixed_handicap(&mut self, stones: u32) -> Result<(), PlayError> {
        if self.movenum() != 0 || self.handicap != 0 {
            return Err(PlayError::BadHandicap);
        }
        let points = Self::handicap_points(stones).ok_or(PlayError::BadHandicap)?;
        for (x, y) in points {
            let v = Board::get_vertex(x, y);
            self.board.play(Color::Black, v);
            self.setup_stones.push((Color::Black, v));
        }
        self.handicap = stones;
        self.board.set_to_move(Color::White);
        // Handicap placement resets the superko baseline.
        self.ko_hash_history = vec![self.board.ko_hash()];
        Ok(())
    }

    /// Place a setup stone outside the move sequence (SGF AB/AW
    /// properties). Resets the superko baseline; call before any moves.
    pub fn place_stone(&mut self, color: Color, vertex: i32) {
        self.board.play(color, vertex);
        self.setup_stones.push((color, vertex));
        self.ko_hash_history = vec![self.board.ko_hash()];
    }

    /// Setup stones in placement order.
    pub fn setup_stones(&self) -> &[(Color, i32)] {
        &self.setup_stones
    }

    /// Free-placement handicap: this engine uses the fixed pattern, capped
    /// at nine stones. Returns the placed vertices.
    pub fn place_free_handicap(&mut self, stones: u32) -> Result<Vec<i32>, PlayError> {
        let stones = stones.min(9);
        self.set_fixed_handicap(stones)?;
        let points = Self::handicap_points(stones).expect("validated above");
        Ok(points
            .into_iter()
            .map(|(x, y)| Board::get_vertex(x, y))
            .collect())
    }
}
