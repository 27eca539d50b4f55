//! Search controller: drives parallel playout workers over one tree.
//!
//! The controller owns the root between moves (tree reuse), prepares it
//! before each search, spawns workers under a scoped pool, and halts on
//! whichever budget fires first: visits, playouts, wall time, tree memory,
//! or external cancellation. The main thread participates in the playout
//! loop and doubles as the analyze emitter.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use games_go::{Color, GameState, PASS, RESIGN};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::child::ChildSlot;
use crate::config::SearchConfig;
use crate::evaluator::{EvalClient, EvaluatorError};
use crate::node::{tree_size_bytes, Node};

/// Root visits required before resignation is considered.
const RESIGN_MIN_VISITS: u32 = 10;

/// Principal variations reported to analysis are cut at this depth.
const MAX_PV_DEPTH: usize = 15;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Evaluator error: {0}")]
    Evaluator(#[from] EvaluatorError),
}

/// Whether passing is an acceptable best move. Cleanup mode forbids it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassPolicy {
    Normal,
    NoPass,
}

/// Per-search limits that are not part of the persistent config.
#[derive(Debug, Clone, Default)]
pub struct SearchLimits {
    /// Wall-clock budget. `None` searches until another budget fires.
    pub time: Option<Duration>,
    /// Emit analysis snapshots at this cadence.
    pub analyze_interval: Option<Duration>,
}

/// One root child's statistics, for move selection and analysis output.
#[derive(Debug, Clone)]
pub struct RootStat {
    pub mv: i32,
    pub visits: u32,
    /// Winrate from the searching side's perspective.
    pub winrate: f32,
    pub prior: f32,
    /// Evaluator prior captured at root preparation.
    pub static_sp: f32,
    pub pv: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct ThinkResult {
    pub best_move: i32,
    /// Root evaluation from Black's perspective.
    pub root_eval: f32,
    /// Visited root children, best first.
    pub candidates: Vec<RootStat>,
    pub playouts: u32,
}

/// Callback receiving analysis snapshots during search.
pub type AnalyzeSink<'a> = &'a dyn Fn(&[RootStat]);

struct RunState {
    stop: AtomicBool,
    playouts: AtomicU32,
}

pub struct Search {
    cfg: SearchConfig,
    client: EvalClient,
    root: Option<Box<Node>>,
    last_rootstate: Option<GameState>,
    run: RunState,
}

impl Search {
    pub fn new(client: EvalClient, cfg: SearchConfig) -> Self {
        Self {
            cfg,
            client,
            root: None,
            last_rootstate: None,
            run: RunState {
                stop: AtomicBool::new(false),
                playouts: AtomicU32::new(0),
            },
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn client(&self) -> &EvalClient {
        &self.client
    }

    /// 0 means unlimited, matching the protocol option.
    pub fn set_visit_limit(&mut self, visits: u32) {
        self.cfg.max_visits = if visits == 0 { u32::MAX } else { visits };
    }

    pub fn set_playout_limit(&mut self, playouts: u32) {
        self.cfg.max_playouts = if playouts == 0 { u32::MAX } else { playouts };
    }

    pub fn set_resign_percent(&mut self, percent: i32) {
        self.cfg.resign_percent = percent;
    }

    pub fn set_max_tree_size(&mut self, bytes: usize) {
        self.cfg.max_tree_size = bytes;
    }

    /// Drop the reused tree (board was cleared or edited).
    pub fn clear(&mut self) {
        self.root = None;
        self.last_rootstate = None;
    }

    /// Request cancellation of a search in flight.
    pub fn stop(&self) {
        self.run.stop.store(true, Ordering::Release);
    }

    /// Run a full search from `state` and pick a move for the side to move.
    pub fn think(
        &mut self,
        state: &GameState,
        policy: PassPolicy,
        limits: &SearchLimits,
        analyze: Option<AnalyzeSink>,
    ) -> Result<ThinkResult, SearchError> {
        let color = state.to_move();
        self.run.stop.store(false, Ordering::Release);
        self.run.playouts.store(0, Ordering::Release);

        self.update_root(state);
        let root = self.root.take().expect("update_root always installs a root");
        let mut rng = ChaCha20Rng::seed_from_u64(self.cfg.seed);

        let root_eval = match root.prepare_root(&self.client, state, &self.cfg, &mut rng) {
            Ok(eval) => eval,
            Err(e) => {
                self.root = Some(root);
                return Err(e.into());
            }
        };

        let start = Instant::now();
        let mut search_err = None;
        if root.has_children() && state.passes() < 2 {
            search_err = self.run_search(&root, state, color, limits, analyze, true, None, &mut rng);
        }
        if let Some(e) = search_err {
            self.root = Some(root);
            return Err(e);
        }

        let candidates = Self::collect_stats(&root, color);
        let best_move = self.select_best_move(&root, state, color, policy, &mut rng);
        let playouts = self.run.playouts.load(Ordering::Acquire);

        info!(
            playouts,
            visits = root.visits(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            best = %games_go::Board::vertex_to_text(best_move),
            winrate = candidates.first().map(|c| c.winrate).unwrap_or(root_eval),
            "search finished"
        );

        self.root = Some(root);
        self.last_rootstate = Some(state.clone());
        Ok(ThinkResult {
            best_move,
            root_eval,
            candidates,
            playouts,
        })
    }

    /// Background search: identical to [`Search::think`] except every
    /// budget other than memory and cancellation is infinite, and no move
    /// is selected. `stop_check` is polled between playouts.
    pub fn ponder(
        &mut self,
        state: &GameState,
        stop_check: &dyn Fn() -> bool,
        limits: &SearchLimits,
        analyze: Option<AnalyzeSink>,
    ) -> Result<(), SearchError> {
        let color = state.to_move();
        self.run.stop.store(false, Ordering::Release);
        self.run.playouts.store(0, Ordering::Release);

        self.update_root(state);
        let root = self.root.take().expect("update_root always installs a root");
        let mut rng = ChaCha20Rng::seed_from_u64(self.cfg.seed);

        if let Err(e) = root.prepare_root(&self.client, state, &self.cfg, &mut rng) {
            self.root = Some(root);
            return Err(e.into());
        }

        let mut search_err = None;
        if root.has_children() && state.passes() < 2 {
            search_err = self.run_search(
                &root,
                state,
                color,
                limits,
                analyze,
                false,
                Some(stop_check),
                &mut rng,
            );
        }

        debug!(
            playouts = self.run.playouts.load(Ordering::Acquire),
            visits = root.visits(),
            "ponder stopped"
        );
        self.root = Some(root);
        self.last_rootstate = Some(state.clone());
        match search_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// The worker fan-out and supervising playout loop shared by think and
    /// ponder. Returns the first worker error, if any.
    #[allow(clippy::too_many_arguments)]
    fn run_search(
        &self,
        root: &Node,
        state: &GameState,
        color: Color,
        limits: &SearchLimits,
        analyze: Option<AnalyzeSink>,
        respect_budgets: bool,
        extra_halt: Option<&dyn Fn() -> bool>,
        rng: &mut ChaCha20Rng,
    ) -> Option<SearchError> {
        let threads = self.cfg.effective_threads();
        let start = Instant::now();
        let mut first_err: Option<SearchError> = None;

        std::thread::scope(|scope| {
            let handles: Vec<_> = (1..threads)
                .map(|index| {
                    let root = &*root;
                    scope.spawn(move || self.worker_loop(root, state, index as u64))
                })
                .collect();

            let mut last_emit = Instant::now();
            loop {
                let mut copy = state.clone();
                match self.play_simulation(&mut copy, root, true, rng) {
                    Ok(Some(_)) => {
                        self.run.playouts.fetch_add(1, Ordering::AcqRel);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        first_err.get_or_insert(e);
                        break;
                    }
                }
                if let (Some(interval), Some(sink)) = (limits.analyze_interval, analyze) {
                    if last_emit.elapsed() >= interval {
                        sink(&Self::collect_stats(root, color));
                        last_emit = Instant::now();
                    }
                }
                if self.should_halt(root, start, limits.time, respect_budgets) {
                    break;
                }
                if let Some(halt) = extra_halt {
                    if halt() {
                        break;
                    }
                }
            }
            self.run.stop.store(true, Ordering::Release);

            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        first_err.get_or_insert(e);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        // Fast searches can finish inside one emission interval; always
        // close with a final snapshot.
        if first_err.is_none() {
            if let (Some(_), Some(sink)) = (limits.analyze_interval, analyze) {
                sink(&Self::collect_stats(root, color));
            }
        }
        first_err
    }

    fn worker_loop(
        &self,
        root: &Node,
        state: &GameState,
        index: u64,
    ) -> Result<(), SearchError> {
        let mut rng =
            ChaCha20Rng::seed_from_u64(self.cfg.seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15));
        while !self.run.stop.load(Ordering::Acquire) {
            let mut copy = state.clone();
            match self.play_simulation(&mut copy, root, true, &mut rng) {
                Ok(Some(_)) => {
                    self.run.playouts.fetch_add(1, Ordering::AcqRel);
                }
                Ok(None) => {}
                Err(e) => {
                    self.run.stop.store(true, Ordering::Release);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// One playout: descend by PUCT, expand or score the leaf, back the
    /// value up the call path. Returns the backed-up Black-relative value,
    /// or `None` when the simulation produced nothing (superko
    /// invalidation, lost expansion race with no value, memory ceiling).
    fn play_simulation(
        &self,
        state: &mut GameState,
        node: &Node,
        is_root: bool,
        rng: &mut ChaCha20Rng,
    ) -> Result<Option<f32>, SearchError> {
        let color = state.to_move();
        node.virtual_loss();

        let mut result: Option<f32> = None;
        let min_psa_ratio = self.min_psa_ratio();

        if node.expandable(min_psa_ratio) {
            if state.passes() >= 2 {
                // Terminal: exact score, no evaluator.
                let score = state.final_score();
                result = Some(if score > 1e-4 {
                    1.0
                } else if score < -1e-4 {
                    0.0
                } else {
                    0.5
                });
            } else if tree_size_bytes() < self.cfg.max_tree_size {
                match node.create_children(&self.client, state, rng, min_psa_ratio) {
                    Ok(Some(eval)) => result = Some(eval),
                    Ok(None) => {
                        // Lost the expansion race: adopt the winner's
                        // published evaluation instead of expanding.
                        node.wait_expanded();
                        if node.has_children() {
                            result = Some(node.net_eval(Color::Black));
                        }
                    }
                    Err(e) => {
                        node.virtual_loss_undo();
                        return Err(e.into());
                    }
                }
            }
        }

        if result.is_none() && node.has_children() {
            let child = node.select_child(color, is_root, &self.cfg);
            let mv = child.mv();
            let child_node = child.inflate();
            state.play_move(color, mv);
            if mv != PASS && state.superko() {
                child_node.invalidate();
            } else {
                match self.play_simulation(state, child_node, false, rng) {
                    Ok(r) => result = r,
                    Err(e) => {
                        node.virtual_loss_undo();
                        return Err(e);
                    }
                }
            }
        }

        if let Some(eval) = result {
            node.update(eval);
        }
        node.virtual_loss_undo();
        Ok(result)
    }

    /// Trim low-prior children harder as the tree approaches its ceiling.
    fn min_psa_ratio(&self) -> f32 {
        let fill = tree_size_bytes() as f32 / self.cfg.max_tree_size as f32;
        if fill > 0.95 {
            0.01
        } else if fill > 0.5 {
            0.0027
        } else {
            0.0
        }
    }

    fn should_halt(
        &self,
        root: &Node,
        start: Instant,
        time_budget: Option<Duration>,
        respect_budgets: bool,
    ) -> bool {
        if self.run.stop.load(Ordering::Acquire) {
            return true;
        }
        if tree_size_bytes() >= self.cfg.max_tree_size {
            warn!(
                tree_bytes = tree_size_bytes(),
                "tree memory ceiling reached"
            );
            return true;
        }
        if !respect_budgets {
            return false;
        }
        if root.visits() >= self.cfg.max_visits {
            return true;
        }
        if self.run.playouts.load(Ordering::Acquire) >= self.cfg.max_playouts {
            return true;
        }
        if let Some(budget) = time_budget {
            if start.elapsed() >= budget {
                return true;
            }
        }
        false
    }

    fn collect_stats(root: &Node, color: Color) -> Vec<RootStat> {
        root.sorted_children(color)
            .into_iter()
            .filter(|child| child.valid() && child.visits() > 0)
            .map(|child| {
                let node = child.node().expect("visited child is inflated");
                RootStat {
                    mv: child.mv(),
                    visits: child.visits(),
                    winrate: node.raw_eval(color, 0),
                    prior: child.prior(),
                    static_sp: node.static_sp(),
                    pv: Self::principal_variation(child, color),
                }
            })
            .collect()
    }

    /// Most-visited line below a root child.
    fn principal_variation(slot: &ChildSlot, color: Color) -> Vec<i32> {
        let mut pv = vec![slot.mv()];
        let mut node = slot.node();
        let mut side = color.opponent();
        while let Some(current) = node {
            if !current.has_children() || pv.len() >= MAX_PV_DEPTH {
                break;
            }
            let sorted = current.sorted_children(side);
            match sorted.first() {
                Some(next) if next.visits() > 0 => {
                    pv.push(next.mv());
                    node = next.node();
                    side = side.opponent();
                }
                _ => break,
            }
        }
        pv
    }

    fn select_best_move(
        &self,
        root: &Node,
        state: &GameState,
        color: Color,
        policy: PassPolicy,
        rng: &mut ChaCha20Rng,
    ) -> i32 {
        let sorted = root.sorted_children(color);
        let Some(first) = sorted.iter().find(|c| c.valid()).copied() else {
            return PASS;
        };
        let mut best = first.mv();

        if (state.movenum() as u32) < self.cfg.random_moves {
            if let Some(mv) = root.randomize_first_proportionally(
                rng,
                self.cfg.random_temp,
                self.cfg.random_min_visits,
            ) {
                best = mv;
            }
        }

        if policy == PassPolicy::NoPass && best == PASS {
            if let Some(child) = root.nopass_child(color) {
                best = child.mv();
            }
        }

        if self.should_resign(root, state, color, first) {
            return RESIGN;
        }
        best
    }

    fn should_resign(
        &self,
        root: &Node,
        state: &GameState,
        color: Color,
        best: &ChildSlot,
    ) -> bool {
        if self.cfg.resign_percent < 0 {
            return false;
        }
        // Never resign inside the opening randomization window.
        if (state.movenum() as u32) < self.cfg.random_moves {
            return false;
        }
        if root.visits() < RESIGN_MIN_VISITS || best.visits() == 0 {
            return false;
        }
        let threshold = self.cfg.resign_percent as f32 / 100.0;
        let winrate = best
            .node()
            .map(|n| n.raw_eval(color, 0))
            .unwrap_or(1.0);
        winrate < threshold
    }

    /// Reuse the tree across plies: when the new position extends the last
    /// searched one, promote the matching subtree; otherwise start fresh.
    fn update_root(&mut self, state: &GameState) {
        let promoted = self.try_promote_root(state);
        if promoted.is_none() {
            debug!("building fresh root");
        }
        self.root =
            Some(promoted.unwrap_or_else(|| Box::new(Node::new(state.last_move()))));
    }

    fn try_promote_root(&mut self, state: &GameState) -> Option<Box<Node>> {
        let last = self.last_rootstate.as_ref()?;
        let last_hist = last.move_history();
        let new_hist = state.move_history();
        if new_hist.len() < last_hist.len() || new_hist[..last_hist.len()] != *last_hist {
            self.root = None;
            return None;
        }
        let suffix: Vec<i32> = new_hist[last_hist.len()..].to_vec();
        if suffix.contains(&RESIGN) {
            self.root = None;
            return None;
        }

        let mut replay = last.clone();
        let mut node = self.root.take()?;
        for mv in suffix {
            replay.play_move(replay.to_move(), mv);
            node = node.find_child(mv)?;
        }
        // Histories matching is necessary but not sufficient (komi or
        // handicap edits change the position identity).
        if replay.hash() != state.hash() {
            return None;
        }
        debug!(reused_visits = node.visits(), "promoted subtree to root");
        Some(node)
    }

    /// Root visit count of the held tree, if any.
    pub fn root_visits(&self) -> u32 {
        self.root.as_ref().map_or(0, |r| r.visits())
    }

    #[cfg(test)]
    pub(crate) fn root_node(&self) -> Option<&Node> {
        self.root.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::test_support::FailingEvaluator;
    use crate::evaluator::{Evaluator, EvaluatorError, NetOutput, UniformEvaluator};
    use games_go::{Board, NUM_INTERSECTIONS};
    use std::sync::Arc;

    fn uniform_search(cfg: SearchConfig) -> Search {
        Search::new(
            EvalClient::new(Arc::new(UniformEvaluator::new()), 10_000),
            cfg,
        )
    }

    /// Black is always losing in this evaluator's eyes.
    struct BlackLosingEvaluator;

    impl Evaluator for BlackLosingEvaluator {
        fn forward(
            &self,
            state: &GameState,
            _symmetry: usize,
        ) -> Result<NetOutput, EvaluatorError> {
            let prob = 1.0 / (NUM_INTERSECTIONS + 1) as f32;
            let value = match state.to_move() {
                Color::Black => 0.02,
                Color::White => 0.98,
            };
            Ok(NetOutput {
                policy: vec![prob; NUM_INTERSECTIONS],
                policy_pass: prob,
                value,
            })
        }

        fn estimated_size(&self) -> usize {
            std::mem::size_of::<Self>()
        }
    }

    #[test]
    fn search_respects_visit_budget() {
        let mut search = uniform_search(SearchConfig::for_testing());
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_eq!(search.root_visits(), 64);
        assert!(result.playouts >= 64);
        assert!(!result.candidates.is_empty());
    }

    #[test]
    fn search_respects_playout_budget() {
        let cfg = SearchConfig {
            threads: 1,
            max_playouts: 20,
            seed: 1,
            ..SearchConfig::default()
        };
        let mut search = uniform_search(cfg);
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_eq!(result.playouts, 20);
    }

    #[test]
    fn single_thread_fixed_seed_is_deterministic() {
        let state = GameState::new(7.5);
        let runs: Vec<ThinkResult> = (0..2)
            .map(|_| {
                let mut search = uniform_search(SearchConfig::for_testing());
                search
                    .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
                    .unwrap()
            })
            .collect();
        assert_eq!(runs[0].best_move, runs[1].best_move);
        let visits = |r: &ThinkResult| -> Vec<(i32, u32)> {
            r.candidates.iter().map(|c| (c.mv, c.visits)).collect()
        };
        assert_eq!(visits(&runs[0]), visits(&runs[1]));
    }

    #[test]
    fn uniform_tie_break_picks_first_legal_move() {
        // Stub evaluator, uniform policy, value 0.5 on an empty board: the
        // most-visited root child is the first legal move in canonical
        // order.
        let mut search = uniform_search(SearchConfig::for_testing());
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_eq!(result.candidates[0].mv, Board::get_vertex(0, 0));
        assert_eq!(result.best_move, Board::get_vertex(0, 0));
    }

    #[test]
    fn visit_sum_invariant_holds() {
        let mut search = uniform_search(SearchConfig::for_testing());
        let state = GameState::new(7.5);
        search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();

        // Root: every playout passes through, so children account for all
        // root visits.
        let root = search.root_node().unwrap();
        let child_sum: u32 = root.children().iter().map(ChildSlot::visits).sum();
        assert_eq!(child_sum, root.visits());

        // Non-root visited nodes carry the +1 expansion visit themselves.
        for child in root.children() {
            let Some(node) = child.node() else { continue };
            if node.visits() == 0 || !node.has_children() {
                continue;
            }
            let sum: u32 = node.children().iter().map(ChildSlot::visits).sum();
            assert_eq!(sum + 1, node.visits(), "at move {}", node.mv());
        }
    }

    #[test]
    fn parallel_search_keeps_invariants() {
        let cfg = SearchConfig {
            threads: 4,
            max_visits: 400,
            seed: 9,
            ..SearchConfig::default()
        };
        let mut search = uniform_search(cfg);
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        // Visit budget may overshoot by in-flight simulations, never by
        // more than the worker count allows.
        assert!(search.root_visits() >= 400);
        assert!(!result.candidates.is_empty());

        let root = search.root_node().unwrap();
        let child_sum: u32 = root.children().iter().map(ChildSlot::visits).sum();
        assert_eq!(child_sum, root.visits());
        // Virtual losses are all returned.
        assert_eq!(root.virtual_loss_count(), 0);
        for child in root.children() {
            if let Some(node) = child.node() {
                assert_eq!(node.virtual_loss_count(), 0);
            }
        }
    }

    #[test]
    fn tree_reuse_promotes_subtree() {
        let mut search = uniform_search(SearchConfig::for_testing());
        let mut state = GameState::new(7.5);
        let first = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();

        // Play our move and an opponent reply, then search again.
        state.play_move(Color::Black, first.best_move);
        let reply = Board::get_vertex(10, 10);
        state.play_move(Color::White, reply);

        let reused_visits = {
            let root = search.root_node().unwrap();
            root.children()
                .iter()
                .find(|c| c.mv() == first.best_move)
                .and_then(ChildSlot::node)
                .and_then(|n| {
                    n.children()
                        .iter()
                        .find(|c| c.mv() == reply)
                        .map(ChildSlot::visits)
                })
                .unwrap_or(0)
        };

        let second = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert!(!second.candidates.is_empty());
        // The promoted root kept its old visits, so only the remainder of
        // the budget was searched fresh.
        assert_eq!(search.root_visits(), 64);
        assert_eq!(second.playouts + reused_visits, 64);
    }

    #[test]
    fn unrelated_position_discards_tree() {
        let mut search = uniform_search(SearchConfig::for_testing());
        let state = GameState::new(7.5);
        search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();

        // A different game entirely.
        let mut other = GameState::new(7.5);
        other.play_move(Color::Black, Board::get_vertex(0, 0));
        other.play_move(Color::White, Board::get_vertex(1, 1));
        other.play_move(Color::Black, Board::get_vertex(2, 2));
        let result = search
            .think(&other, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert!(!result.candidates.is_empty());
        assert_eq!(search.root_visits(), 64);
    }

    #[test]
    fn terminal_position_returns_pass() {
        let mut search = uniform_search(SearchConfig::for_testing());
        let mut state = GameState::new(7.5);
        state.play_move(Color::Black, PASS);
        state.play_move(Color::White, PASS);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_eq!(result.best_move, PASS);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn losing_position_resigns_when_enabled() {
        let cfg = SearchConfig {
            threads: 1,
            max_visits: 64,
            resign_percent: 10,
            seed: 3,
            ..SearchConfig::default()
        };
        let mut search = Search::new(
            EvalClient::new(Arc::new(BlackLosingEvaluator), 10_000),
            cfg,
        );
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_eq!(result.best_move, RESIGN);
    }

    #[test]
    fn resign_disabled_at_minus_one() {
        let cfg = SearchConfig {
            threads: 1,
            max_visits: 64,
            resign_percent: -1,
            seed: 3,
            ..SearchConfig::default()
        };
        let mut search = Search::new(
            EvalClient::new(Arc::new(BlackLosingEvaluator), 10_000),
            cfg,
        );
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_ne!(result.best_move, RESIGN);
    }

    #[test]
    fn resign_suppressed_in_random_window() {
        let cfg = SearchConfig {
            threads: 1,
            max_visits: 64,
            resign_percent: 10,
            random_moves: 4,
            seed: 3,
            ..SearchConfig::default()
        };
        let mut search = Search::new(
            EvalClient::new(Arc::new(BlackLosingEvaluator), 10_000),
            cfg,
        );
        let state = GameState::new(7.5);
        let result = search
            .think(&state, PassPolicy::Normal, &SearchLimits::default(), None)
            .unwrap();
        assert_ne!(result.best_move, RESIGN);
    }

    #[test]
    fn evaluator_failure_surfaces() {
        let mut search = Search::new(
            EvalClient::new(Arc::new(FailingEvaluator), 10_000),
            SearchConfig::for_testing(),
        );
        let state = GameState::new(7.5);
        let result = search.think(&state, PassPolicy::Normal, &SearchLimits::default(), None);
        assert!(result.is_err());
    }

    #[test]
    fn analyze_sink_receives_snapshots() {
        use std::cell::RefCell;
        let mut search = uniform_search(SearchConfig {
            threads: 1,
            max_visits: 256,
            seed: 5,
            ..SearchConfig::default()
        });
        let state = GameState::new(7.5);
        let snapshots = RefCell::new(0u32);
        let sink = |stats: &[RootStat]| {
            assert!(!stats.is_empty());
            *snapshots.borrow_mut() += 1;
        };
        let limits = SearchLimits {
            time: None,
            analyze_interval: Some(Duration::from_millis(0)),
        };
        search
            .think(&state, PassPolicy::Normal, &limits, Some(&sink))
            .unwrap();
        assert!(*snapshots.borrow() > 0);
    }
}
