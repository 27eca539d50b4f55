//! Tree nodes: statistics, the expansion interlock, linking and selection.
//!
//! Every field a worker can touch concurrently is atomic; `children` is
//! published exactly once under the `INITIAL -> EXPANDING -> EXPANDED`
//! protocol and never changes length afterwards. Searches create millions
//! of nodes, so fields stay narrow and the process-wide byte counter below
//! feeds the memory governor.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::OnceLock;

use games_go::{Board, Color, GameState, PASS};
use rand_chacha::ChaCha20Rng;

use crate::child::ChildSlot;
use crate::config::SearchConfig;
use crate::evaluator::{EnsembleMode, EvalClient, EvaluatorError};

/// Virtual losses added per selection, removed per backup. Steers
/// concurrent workers toward different lines.
pub const VIRTUAL_LOSS_COUNT: i32 = 3;

/// Live tree footprint in bytes: every constructed node and child slot.
pub(crate) static TREE_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Current estimated tree footprint across all trees in the process.
pub fn tree_size_bytes() -> usize {
    TREE_BYTES.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeStatus {
    /// Superko-illegal; never selected.
    Invalid = 0,
    Pruned = 1,
    Active = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExpandState {
    /// No children yet.
    Initial = 0,
    /// One thread is creating children; it must finish with `expand_done`
    /// or revert with `expand_cancel`.
    Expanding = 1,
    /// Children are published and frozen.
    Expanded = 2,
}

impl ExpandState {
    fn from_u8(v: u8) -> ExpandState {
        match v {
            0 => ExpandState::Initial,
            1 => ExpandState::Expanding,
            _ => ExpandState::Expanded,
        }
    }
}

pub struct Node {
    mv: i32,
    /// Evaluator value at expansion, Black-relative, f32 bits.
    net_eval: AtomicU32,
    /// Evaluator prior captured at root preparation, f32 bits.
    static_sp: AtomicU32,
    visits: AtomicU32,
    virtual_loss: AtomicI32,
    /// Running sum of backed-up values from Black's perspective, f64 bits.
    black_evals: AtomicU64,
    status: AtomicU8,
    expand_state: AtomicU8,
    /// 2.0 until linked; afterwards the ratio below which children were
    /// dropped, or 0.0 when nothing was dropped.
    min_psa_ratio_children: AtomicU32,
    children: OnceLock<Box<[ChildSlot]>>,
}

impl Node {
    pub fn new(mv: i32) -> Self {
        TREE_BYTES.fetch_add(std::mem::size_of::<Node>(), Ordering::Relaxed);
        Self {
            mv,
            net_eval: AtomicU32::new(0f32.to_bits()),
            static_sp: AtomicU32::new(0f32.to_bits()),
            visits: AtomicU32::new(0),
            virtual_loss: AtomicI32::new(0),
            black_evals: AtomicU64::new(0f64.to_bits()),
            status: AtomicU8::new(NodeStatus::Active as u8),
            expand_state: AtomicU8::new(ExpandState::Initial as u8),
            min_psa_ratio_children: AtomicU32::new(2.0f32.to_bits()),
            children: OnceLock::new(),
        }
    }

    #[inline]
    pub fn mv(&self) -> i32 {
        self.mv
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.visits.load(Ordering::Acquire)
    }

    #[inline]
    pub fn first_visit(&self) -> bool {
        self.visits() == 0
    }

    pub fn virtual_loss(&self) {
        self.virtual_loss
            .fetch_add(VIRTUAL_LOSS_COUNT, Ordering::Relaxed);
    }

    pub fn virtual_loss_undo(&self) {
        self.virtual_loss
            .fetch_sub(VIRTUAL_LOSS_COUNT, Ordering::Relaxed);
    }

    #[inline]
    pub fn virtual_loss_count(&self) -> i32 {
        self.virtual_loss.load(Ordering::Relaxed)
    }

    fn black_evals_sum(&self) -> f64 {
        f64::from_bits(self.black_evals.load(Ordering::Relaxed))
    }

    /// Lock-free add into the f64 accumulator.
    fn accumulate_eval(&self, eval: f64) {
        let mut current = self.black_evals.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + eval).to_bits();
            match self.black_evals.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// One completed backup through this node.
    pub fn update(&self, eval: f32) {
        self.visits.fetch_add(1, Ordering::AcqRel);
        self.accumulate_eval(eval as f64);
    }

    /// Mean winrate for `tomove`, pretending `virtual_loss` extra lost
    /// visits from the mover's perspective.
    pub fn raw_eval(&self, tomove: Color, virtual_loss: i32) -> f32 {
        let visits = self.visits() as i64 + virtual_loss as i64;
        debug_assert!(visits > 0, "raw_eval on unvisited node");
        let mut black = self.black_evals_sum();
        if tomove == Color::White {
            // A virtual loss for White is a win for Black.
            black += virtual_loss as f64;
        }
        let mut eval = (black / visits as f64) as f32;
        if tomove == Color::White {
            eval = 1.0 - eval;
        }
        eval
    }

    /// Winrate including this node's current virtual losses. Stale reads
    /// are fine; PUCT tolerates them.
    pub fn eval(&self, tomove: Color) -> f32 {
        self.raw_eval(tomove, self.virtual_loss_count())
    }

    pub(crate) fn set_net_eval(&self, black_eval: f32) {
        self.net_eval.store(black_eval.to_bits(), Ordering::Relaxed);
    }

    /// The evaluator's value at expansion, from `tomove`'s perspective.
    pub fn net_eval(&self, tomove: Color) -> f32 {
        let black = f32::from_bits(self.net_eval.load(Ordering::Relaxed));
        match tomove {
            Color::Black => black,
            Color::White => 1.0 - black,
        }
    }

    pub fn static_sp(&self) -> f32 {
        f32::from_bits(self.static_sp.load(Ordering::Relaxed))
    }

    pub(crate) fn set_static_sp(&self, sp: f32) {
        self.static_sp.store(sp.to_bits(), Ordering::Relaxed);
    }

    // Status flags.

    pub fn invalidate(&self) {
        self.status.store(NodeStatus::Invalid as u8, Ordering::Relaxed);
    }

    pub fn set_active(&self, active: bool) {
        if self.valid() {
            let status = if active {
                NodeStatus::Active
            } else {
                NodeStatus::Pruned
            };
            self.status.store(status as u8, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn valid(&self) -> bool {
        self.status.load(Ordering::Relaxed) != NodeStatus::Invalid as u8
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.status.load(Ordering::Relaxed) == NodeStatus::Active as u8
    }

    // Expansion interlock.

    #[inline]
    pub fn expand_state(&self) -> ExpandState {
        ExpandState::from_u8(self.expand_state.load(Ordering::Acquire))
    }

    /// INITIAL -> EXPANDING. False if another thread got there first (or
    /// the node is already expanded).
    fn acquire_expanding(&self) -> bool {
        self.expand_state
            .compare_exchange(
                ExpandState::Initial as u8,
                ExpandState::Expanding as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// EXPANDING -> EXPANDED. Publishes the linked children.
    fn expand_done(&self) {
        let prev = self
            .expand_state
            .swap(ExpandState::Expanded as u8, Ordering::AcqRel);
        debug_assert_eq!(prev, ExpandState::Expanding as u8);
    }

    /// EXPANDING -> INITIAL. Taken when the evaluator fails so a later
    /// playout can retry.
    fn expand_cancel(&self) {
        let prev = self
            .expand_state
            .swap(ExpandState::Initial as u8, Ordering::AcqRel);
        debug_assert_eq!(prev, ExpandState::Expanding as u8);
    }

    /// Spin until a concurrent expansion has published.
    pub fn wait_expanded(&self) {
        while self.expand_state.load(Ordering::Acquire) == ExpandState::Expanding as u8 {
            std::hint::spin_loop();
        }
        debug_assert_eq!(self.expand_state(), ExpandState::Expanded);
    }

    pub fn min_psa_ratio_children(&self) -> f32 {
        f32::from_bits(self.min_psa_ratio_children.load(Ordering::Relaxed))
    }

    /// Children exist once any link has happened.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.min_psa_ratio_children() <= 1.0
    }

    /// Can this node still be expanded? Children are append-frozen, so a
    /// node that reached EXPANDED never expands again even if a smaller
    /// ratio would admit more moves.
    pub fn expandable(&self, min_psa_ratio: f32) -> bool {
        self.expand_state() != ExpandState::Expanded
            && min_psa_ratio < self.min_psa_ratio_children()
    }

    #[inline]
    pub fn children(&self) -> &[ChildSlot] {
        match self.children.get() {
            Some(children) => children,
            None => &[],
        }
    }

    /// Expand this node through the evaluator client.
    ///
    /// Returns `Ok(Some(eval))` with the Black-relative evaluation when
    /// this thread performed the expansion, `Ok(None)` when the expansion
    /// was lost to a concurrent worker. Evaluator failure cancels the
    /// in-flight expansion so a later playout can retry.
    pub fn create_children(
        &self,
        client: &EvalClient,
        state: &GameState,
        rng: &mut ChaCha20Rng,
        min_psa_ratio: f32,
    ) -> Result<Option<f32>, EvaluatorError> {
        // No successors in a final position.
        if state.passes() >= 2 {
            return Ok(None);
        }
        if !self.acquire_expanding() {
            return Ok(None);
        }
        if !self.expandable(min_psa_ratio) {
            self.expand_done();
            return Ok(None);
        }

        let raw = match client.evaluate(state, EnsembleMode::RandomSymmetry, rng) {
            Ok(raw) => raw,
            Err(e) => {
                self.expand_cancel();
                return Err(e);
            }
        };

        // The evaluator scores for the side to move; the tree stores
        // Black-relative values.
        let net_eval = match state.to_move() {
            Color::Black => raw.value,
            Color::White => 1.0 - raw.value,
        };
        self.set_net_eval(net_eval);

        let nodelist = legal_policy(&raw, state);
        self.link_children(nodelist, min_psa_ratio);
        self.expand_done();
        Ok(Some(net_eval))
    }

    /// Sort the candidate list and create one slot per entry above the
    /// prior-ratio floor. Called exactly once per node, while EXPANDING.
    fn link_children(&self, mut nodelist: Vec<(f32, i32)>, min_psa_ratio: f32) {
        debug_assert!(min_psa_ratio < self.min_psa_ratio_children());
        if nodelist.is_empty() {
            return;
        }

        // Descending prior; the stable sort keeps canonical vertex order
        // within ties, which is what the selection tie-break sees.
        nodelist.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(CmpOrdering::Equal));

        let max_psa = nodelist[0].0;
        let new_min_psa = max_psa * min_psa_ratio;

        let mut slots = Vec::with_capacity(nodelist.len());
        let mut skipped = false;
        for (prior, mv) in nodelist {
            if prior < new_min_psa {
                skipped = true;
            } else {
                slots.push(ChildSlot::new(mv, prior));
            }
        }

        let recorded = if skipped { min_psa_ratio } else { 0.0 };
        self.min_psa_ratio_children
            .store(recorded.to_bits(), Ordering::Relaxed);
        let published = self.children.set(slots.into_boxed_slice()).is_ok();
        debug_assert!(published, "children linked twice");
    }

    /// PUCT child selection with first-play urgency.
    ///
    /// Panics if every child is inactive; with a legal pass always linked
    /// that is an invariant breach, not a recoverable state.
    pub fn select_child(&self, color: Color, is_root: bool, cfg: &SearchConfig) -> &ChildSlot {
        self.wait_expanded();
        let children = self.children();

        let mut parent_visits = 0u64;
        let mut total_visited_policy = 0.0f32;
        for child in children {
            if child.valid() {
                let visits = child.visits();
                parent_visits += visits as u64;
                if visits > 0 {
                    total_visited_policy += child.prior();
                }
            }
        }

        let numerator = (parent_visits as f64).sqrt();
        let fpu_coeff = if is_root {
            cfg.fpu_root_reduction
        } else {
            cfg.fpu_reduction
        };
        let fpu_reduction = fpu_coeff * total_visited_policy.sqrt();
        // Unvisited children start from the parent's net eval, reduced.
        let fpu_eval = self.net_eval(color) - fpu_reduction;

        let mut best: Option<&ChildSlot> = None;
        let mut best_value = f64::MIN;
        for child in children {
            if !child.active() {
                continue;
            }

            let winrate = if child.is_expanding() {
                // Never descend into a node mid-expansion if avoidable;
                // we would only spin on it.
                -1.0 - fpu_reduction
            } else if child.visits() > 0 {
                child.eval(color)
            } else {
                fpu_eval
            };
            let psa = child.prior() as f64;
            let denom = 1.0 + child.visits() as f64;
            let puct = cfg.c_puct as f64 * psa * (numerator / denom);
            let value = winrate as f64 + puct;

            if value > best_value {
                best_value = value;
                best = Some(child);
            }
        }

        best.unwrap_or_else(|| panic!("select_child: no active children at move {}", self.mv))
    }

    /// "Less than" in best-move order: visits first, then prior for
    /// unvisited pairs, then winrate.
    fn node_cmp(a: &ChildSlot, b: &ChildSlot, color: Color) -> CmpOrdering {
        let (va, vb) = (a.visits(), b.visits());
        if va != vb {
            return va.cmp(&vb);
        }
        if va == 0 {
            return a
                .prior()
                .partial_cmp(&b.prior())
                .unwrap_or(CmpOrdering::Equal);
        }
        a.eval(color)
            .partial_cmp(&b.eval(color))
            .unwrap_or(CmpOrdering::Equal)
    }

    /// Children in best-first order for move selection and reporting.
    /// The underlying slots are never reordered.
    pub fn sorted_children(&self, color: Color) -> Vec<&ChildSlot> {
        let mut sorted: Vec<&ChildSlot> = self.children().iter().collect();
        sorted.sort_by(|a, b| Self::node_cmp(b, a, color));
        sorted
    }
}

impl Node {
    pub(crate) fn children_mut(&mut self) -> Option<&mut [ChildSlot]> {
        self.children.get_mut().map(|boxed| &mut **boxed)
    }
}

/// Priors for the legal moves plus pass, normalized to sum to one. Falls
/// back to a uniform distribution when the legal mass underflows.
pub(crate) fn legal_policy(raw: &crate::evaluator::NetOutput, state: &GameState) -> Vec<(f32, i32)> {
    let to_move = state.to_move();
    let mut nodelist: Vec<(f32, i32)> = Vec::with_capacity(raw.policy.len() + 1);
    let mut legal_sum = 0.0f32;
    for v in Board::vertices() {
        if state.is_move_legal(to_move, v) {
            let p = raw.policy[Board::policy_index(v)];
            nodelist.push((p, v));
            legal_sum += p;
        }
    }
    nodelist.push((raw.policy_pass, PASS));
    legal_sum += raw.policy_pass;

    if legal_sum > f32::MIN_POSITIVE {
        // Re-normalize after removing illegal moves.
        for entry in &mut nodelist {
            entry.0 /= legal_sum;
        }
    } else {
        // Happens with freshly randomized nets putting all mass on
        // illegal moves.
        let uniform = 1.0 / nodelist.len() as f32;
        for entry in &mut nodelist {
            entry.0 = uniform;
        }
    }
    nodelist
}

impl Drop for Node {
    fn drop(&mut self) {
        TREE_BYTES.fetch_sub(std::mem::size_of::<Node>(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::test_support::{FailingEvaluator, FixedEvaluator};
    use crate::evaluator::UniformEvaluator;
    use games_go::NUM_INTERSECTIONS;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn uniform_client() -> EvalClient {
        EvalClient::new(Arc::new(UniformEvaluator::new()), 100)
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(7)
    }

    #[test]
    fn update_accumulates_black_evals() {
        let node = Node::new(PASS);
        node.update(1.0);
        node.update(0.0);
        node.update(0.5);
        assert_eq!(node.visits(), 3);
        assert!((node.raw_eval(Color::Black, 0) - 0.5).abs() < 1e-6);
        assert!((node.raw_eval(Color::White, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn eval_flips_for_white() {
        let node = Node::new(PASS);
        node.update(1.0);
        node.update(1.0);
        assert!((node.raw_eval(Color::Black, 0) - 1.0).abs() < 1e-6);
        assert!((node.raw_eval(Color::White, 0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn virtual_loss_biases_mover_down() {
        let node = Node::new(PASS);
        node.update(1.0);
        // Black to move: three virtual losses drag a sure win toward 0.25.
        node.virtual_loss();
        assert!((node.eval(Color::Black) - 0.25).abs() < 1e-6);
        node.virtual_loss_undo();
        assert!((node.eval(Color::Black) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn expansion_links_sorted_children() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = EvalClient::new(
            Arc::new(FixedEvaluator::peaked(Board::policy_index(Board::get_vertex(6, 6)), 0.7)),
            100,
        );
        let eval = node
            .create_children(&client, &state, &mut rng(), 0.0)
            .unwrap()
            .expect("this thread expands");
        assert!((eval - 0.7).abs() < 1e-6);
        assert_eq!(node.expand_state(), ExpandState::Expanded);
        assert!(node.has_children());
        // All legal moves plus pass linked; highest prior first.
        assert_eq!(node.children().len(), NUM_INTERSECTIONS + 1);
        assert_eq!(node.children()[0].mv(), Board::get_vertex(6, 6));
        assert!((node.min_psa_ratio_children() - 0.0).abs() < 1e-6);
    }

    #[test]
    fn expansion_converts_value_for_white() {
        let node = Node::new(PASS);
        let mut state = GameState::new(7.5);
        state.set_to_move(Color::White);
        let client = EvalClient::new(Arc::new(FixedEvaluator::peaked(0, 0.7)), 100);
        let eval = node
            .create_children(&client, &state, &mut rng(), 0.0)
            .unwrap()
            .unwrap();
        // 0.7 for White is 0.3 for Black.
        assert!((eval - 0.3).abs() < 1e-6);
        assert!((node.net_eval(Color::White) - 0.7).abs() < 1e-6);
        assert!((node.net_eval(Color::Black) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn min_psa_ratio_trims_tail() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        // One dominant move; everything else far below half its prior.
        let client = EvalClient::new(Arc::new(FixedEvaluator::peaked(0, 0.5)), 100);
        node.create_children(&client, &state, &mut rng(), 0.5)
            .unwrap();
        assert_eq!(node.children().len(), 1);
        assert!((node.min_psa_ratio_children() - 0.5).abs() < 1e-6);
        // Frozen: even a permissive ratio cannot reopen expansion.
        assert!(!node.expandable(0.0));
    }

    #[test]
    fn zero_ratio_drops_nothing() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = uniform_client();
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        assert_eq!(node.children().len(), NUM_INTERSECTIONS + 1);
        assert_eq!(node.min_psa_ratio_children(), 0.0);
    }

    #[test]
    fn zero_policy_mass_links_uniform() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        // All mass nowhere: zero policy and zero pass prior.
        let client = EvalClient::new(
            Arc::new(FixedEvaluator {
                output: crate::evaluator::NetOutput {
                    policy: vec![0.0; NUM_INTERSECTIONS],
                    policy_pass: 0.0,
                    value: 0.5,
                },
            }),
            100,
        );
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        let children = node.children();
        assert_eq!(children.len(), NUM_INTERSECTIONS + 1);
        let uniform = 1.0 / (NUM_INTERSECTIONS + 1) as f32;
        for child in children {
            assert!((child.prior() - uniform).abs() < 1e-6);
        }
    }

    #[test]
    fn terminal_position_never_calls_evaluator() {
        let node = Node::new(PASS);
        let mut state = GameState::new(7.5);
        state.play_move(Color::Black, PASS);
        state.play_move(Color::White, PASS);
        // A failing evaluator proves it is not consulted.
        let client = EvalClient::new(Arc::new(FailingEvaluator), 100);
        let out = node
            .create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        assert!(out.is_none());
        assert_eq!(node.expand_state(), ExpandState::Initial);
    }

    #[test]
    fn evaluator_failure_cancels_expansion() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = EvalClient::new(Arc::new(FailingEvaluator), 100);
        assert!(node
            .create_children(&client, &state, &mut rng(), 0.0)
            .is_err());
        // Reverted to INITIAL so a retry is possible.
        assert_eq!(node.expand_state(), ExpandState::Initial);
        let good = uniform_client();
        assert!(node
            .create_children(&good, &state, &mut rng(), 0.0)
            .unwrap()
            .is_some());
    }

    #[test]
    fn lost_expansion_returns_none() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = uniform_client();
        assert!(node
            .create_children(&client, &state, &mut rng(), 0.0)
            .unwrap()
            .is_some());
        // Second attempt finds the node already expanded.
        assert!(node
            .create_children(&client, &state, &mut rng(), 0.0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn selection_prefers_prior_when_unvisited() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let hot = Board::get_vertex(3, 3);
        let client = EvalClient::new(
            Arc::new(FixedEvaluator::peaked(Board::policy_index(hot), 0.5)),
            100,
        );
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        node.update(0.5);
        let cfg = SearchConfig::default();
        let picked = node.select_child(Color::Black, false, &cfg);
        assert_eq!(picked.mv(), hot);
    }

    #[test]
    fn invalid_children_never_selected() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let hot = Board::get_vertex(3, 3);
        let client = EvalClient::new(
            Arc::new(FixedEvaluator::peaked(Board::policy_index(hot), 0.5)),
            100,
        );
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        node.update(0.5);
        // Kill the dominant child; selection must route around it.
        node.children()[0].inflate().invalidate();
        let cfg = SearchConfig::default();
        for _ in 0..32 {
            let picked = node.select_child(Color::Black, false, &cfg);
            assert_ne!(picked.mv(), hot);
        }
    }

    #[test]
    fn pruned_children_skipped_until_reactivated() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let hot = Board::get_vertex(3, 3);
        let client = EvalClient::new(
            Arc::new(FixedEvaluator::peaked(Board::policy_index(hot), 0.5)),
            100,
        );
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        node.update(0.5);
        let cfg = SearchConfig::default();
        let target = node.children()[0].inflate();
        target.set_active(false);
        assert_ne!(node.select_child(Color::Black, false, &cfg).mv(), hot);
        target.set_active(true);
        assert_eq!(node.select_child(Color::Black, false, &cfg).mv(), hot);
    }

    #[test]
    fn selection_tie_break_is_first_in_link_order() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = uniform_client();
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        node.update(0.5);
        // Uniform priors, nothing visited: the first linked slot wins,
        // and link order under ties is canonical vertex order.
        let cfg = SearchConfig::default();
        let picked = node.select_child(Color::Black, false, &cfg);
        assert_eq!(picked.mv(), node.children()[0].mv());
        assert_eq!(picked.mv(), Board::get_vertex(0, 0));
    }

    #[test]
    fn sorted_children_orders_by_visits() {
        let node = Node::new(PASS);
        let state = GameState::new(7.5);
        let client = uniform_client();
        node.create_children(&client, &state, &mut rng(), 0.0)
            .unwrap();
        let children = node.children();
        for _ in 0..5 {
            children[3].inflate().update(1.0);
        }
        for _ in 0..2 {
            children[10].inflate().update(0.0);
        }
        let sorted = node.sorted_children(Color::Black);
        assert_eq!(sorted[0].mv(), children[3].mv());
        assert_eq!(sorted[1].mv(), children[10].mv());
    }
}
