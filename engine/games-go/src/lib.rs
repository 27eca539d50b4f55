//! Go rules for the Tengen engine.
//!
//! This crate implements everything the search consumes from the game side:
//! move legality, captures, ko and positional superko, passes, terminal area
//! scoring, Zobrist and symmetry hashing, and handicap placement. The board
//! size is fixed at compile time.
//!
//! # Usage
//!
//! ```rust
//! use games_go::{GameState, Color, PASS};
//!
//! let mut game = GameState::new(7.5);
//! let v = games_go::Board::get_vertex(3, 3);
//! assert!(game.is_move_legal(Color::Black, v));
//! game.play_move(Color::Black, v);
//! game.play_move(Color::White, PASS);
//! assert_eq!(game.passes(), 1);
//! ```

pub mod board;
pub mod state;
pub mod zobrist;

pub use board::{
    Board, Cell, Color, BOARD_SIZE, NUM_INTERSECTIONS, NUM_SYMMETRIES, NUM_VERTICES, PASS, RESIGN,
};
pub use state::{GameState, PlayError};
