//! Parallel Monte-Carlo Tree Search for Tengen.
//!
//! This crate is the engine core: a lock-free expandable search tree
//! scored by an external policy/value evaluator, driven by parallel
//! playout workers under the PUCT selection rule, with tree reuse across
//! moves and a dual-tree strength-control layer on top.
//!
//! # Overview
//!
//! One playout walks the tree by PUCT from the root, expands the leaf it
//! lands on through the evaluator (or scores it exactly when the game is
//! over), and backs the value up the path. Virtual losses steer concurrent
//! workers apart; all node statistics are atomics, and a node's children
//! are published exactly once under an `INITIAL -> EXPANDING -> EXPANDED`
//! interlock.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use games_go::GameState;
//! use mcts::{EvalClient, PassPolicy, Search, SearchConfig, SearchLimits, UniformEvaluator};
//!
//! let client = EvalClient::new(Arc::new(UniformEvaluator::new()), 50_000);
//! let mut search = Search::new(client, SearchConfig::default().with_visits(800));
//! let state = GameState::new(7.5);
//! let result = search
//!     .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
//!     .unwrap();
//! println!("best: {}", games_go::Board::vertex_to_text(result.best_move));
//! ```

pub mod cache;
pub mod child;
pub mod config;
pub mod evaluator;
pub mod memory;
pub mod node;
pub mod root;
pub mod search;
pub mod strength;
pub mod time_control;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use cache::{ENTRY_SIZE, MIN_CACHE_COUNT};
pub use child::ChildSlot;
pub use config::{SearchConfig, UNLIMITED};
pub use evaluator::{EnsembleMode, EvalClient, Evaluator, EvaluatorError, NetOutput, UniformEvaluator};
pub use memory::{
    set_max_memory, MemoryError, MemoryLimits, MemoryReport, DEFAULT_MAX_MEMORY, MIB,
    MIN_TREE_SPACE,
};
pub use node::{tree_size_bytes, ExpandState, Node, NodeStatus, VIRTUAL_LOSS_COUNT};
pub use search::{
    AnalyzeSink, PassPolicy, RootStat, Search, SearchError, SearchLimits, ThinkResult,
};
pub use strength::{select_move, StrengthControl, STRENGTH_C, T_DIF, T_MAX, T_MIN, T_UNIQUE};
pub use time_control::TimeControl;

#[cfg(feature = "onnx")]
pub use onnx::OnnxEvaluator;
