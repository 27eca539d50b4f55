//! Root-only node operations: preparation before a move, exploration
//! noise, superko pruning, static-prior capture, opening randomization and
//! subtree promotion for tree reuse.

use games_go::{Color, GameState, PASS};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Gamma};
use tracing::debug;

use crate::child::ChildSlot;
use crate::config::SearchConfig;
use crate::evaluator::{EnsembleMode, EvalClient, EvaluatorError};
use crate::node::{legal_policy, Node};

impl Node {
    /// Prepare this node to serve as the search root: expand it, inflate
    /// every child, prune superko repetitions, mix in exploration noise
    /// when configured, and capture the evaluator's static priors.
    ///
    /// Returns the root evaluation, Black-relative.
    pub fn prepare_root(
        &self,
        client: &EvalClient,
        state: &GameState,
        cfg: &SearchConfig,
        rng: &mut ChaCha20Rng,
    ) -> Result<f32, EvaluatorError> {
        let root_eval = match self.create_children(client, state, rng, 0.0)? {
            Some(eval) => eval,
            // Reused root, already expanded in a previous search (or a
            // finished game with nothing to expand).
            None => self.net_eval(Color::Black),
        };

        if !self.has_children() {
            return Ok(root_eval);
        }

        // Root children hold statistics under concurrent access from the
        // first playout on; inflate them all up front.
        self.inflate_all_children();
        self.kill_superkos(state);
        if cfg.noise {
            self.dirichlet_noise(cfg.dirichlet_epsilon, cfg.dirichlet_alpha, rng);
        }
        self.capture_static_policy(client, state, rng)?;

        debug!(
            root_eval,
            children = self.children().len(),
            "root prepared"
        );
        Ok(root_eval)
    }

    pub fn inflate_all_children(&self) {
        for child in self.children() {
            child.inflate();
        }
    }

    /// Mark root moves that would repeat a historical position.
    fn kill_superkos(&self, state: &GameState) {
        for child in self.children() {
            let mv = child.mv();
            if mv == PASS {
                continue;
            }
            let mut copy = state.clone();
            copy.play_move(copy.to_move(), mv);
            if copy.superko() {
                if let Some(node) = child.node() {
                    node.invalidate();
                }
            }
        }
    }

    /// Mix `epsilon * Dir(alpha)` into the child priors, drawn once.
    fn dirichlet_noise(&self, epsilon: f32, alpha: f32, rng: &mut ChaCha20Rng) {
        let children = self.children();
        if children.is_empty() || alpha <= 0.0 {
            return;
        }

        let gamma = Gamma::new(alpha as f64, 1.0).expect("alpha is positive");
        let mut samples: Vec<f64> = children.iter().map(|_| gamma.sample(rng)).collect();
        let total: f64 = samples.iter().sum();
        if total <= f64::MIN_POSITIVE {
            return;
        }
        for sample in &mut samples {
            *sample /= total;
        }

        for (child, noise) in children.iter().zip(samples) {
            let mixed = (1.0 - epsilon) * child.prior() + epsilon * noise as f32;
            child.set_prior(mixed);
        }
    }

    /// Record the evaluator's raw prior on each child before any search
    /// statistics exist. The strength-control layer reads these as the
    /// "naturalness" of a move.
    fn capture_static_policy(
        &self,
        client: &EvalClient,
        state: &GameState,
        rng: &mut ChaCha20Rng,
    ) -> Result<(), EvaluatorError> {
        let raw = client.evaluate(state, EnsembleMode::RandomSymmetry, rng)?;
        let statics = legal_policy(&raw, state);
        for child in self.children() {
            if let Some(node) = child.node() {
                let sp = statics
                    .iter()
                    .find(|(_, mv)| *mv == child.mv())
                    .map(|(p, _)| *p)
                    .unwrap_or(0.0);
                node.set_static_sp(sp);
            }
        }
        Ok(())
    }

    /// Sample a root move proportionally to `visits^(1/temp)`, for the
    /// opening randomization window. Returns `None` when the sampled child
    /// is below the visit floor; the caller keeps the best move then.
    pub fn randomize_first_proportionally(
        &self,
        rng: &mut ChaCha20Rng,
        temp: f32,
        min_visits: u32,
    ) -> Option<i32> {
        let children = self.children();
        let mut accum = 0.0f64;
        let mut table = Vec::with_capacity(children.len());
        for child in children {
            if child.active() {
                accum += (child.visits() as f64).powf(1.0 / temp as f64);
            }
            table.push(accum);
        }
        if accum <= 0.0 {
            return None;
        }
        let pick = rng.gen_range(0.0..accum);
        let index = table.iter().position(|&edge| edge > pick)?;
        let child = &children[index];
        if child.visits() < min_visits {
            return None;
        }
        Some(child.mv())
    }

    /// Best non-pass child, for cleanup mode where passing is not allowed
    /// until the board is settled.
    pub fn nopass_child(&self, color: Color) -> Option<&ChildSlot> {
        self.sorted_children(color)
            .into_iter()
            .find(|child| child.mv() != PASS && child.valid())
    }

    /// Detach the subtree reached by `mv`, promoting it to be a root.
    /// The rest of the tree is dropped by the caller.
    pub fn find_child(&mut self, mv: i32) -> Option<Box<Node>> {
        let children = self.children_mut()?;
        let slot = children.iter_mut().find(|c| c.mv() == mv)?;
        slot.inflate();
        slot.take_node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::UniformEvaluator;
    use games_go::{Board, NUM_INTERSECTIONS};
    use rand::SeedableRng;
    use std::sync::Arc;

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(11)
    }

    fn uniform_client() -> EvalClient {
        EvalClient::new(Arc::new(UniformEvaluator::new()), 100)
    }

    #[test]
    fn prepare_root_inflates_everything() {
        let root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig::default();
        let eval = root
            .prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        assert!((eval - 0.5).abs() < 1e-6);
        assert_eq!(root.children().len(), NUM_INTERSECTIONS + 1);
        assert!(root.children().iter().all(ChildSlot::is_inflated));
    }

    #[test]
    fn static_priors_recorded() {
        let root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig::default();
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        let uniform = 1.0 / (NUM_INTERSECTIONS + 1) as f32;
        for child in root.children() {
            let sp = child.node().unwrap().static_sp();
            assert!((sp - uniform).abs() < 1e-5);
        }
    }

    #[test]
    fn noise_preserves_total_mass() {
        let root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig {
            noise: true,
            ..SearchConfig::default()
        };
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        let total: f32 = root.children().iter().map(ChildSlot::prior).sum();
        assert!((total - 1.0).abs() < 1e-3);
        // With noise mixed in, the priors are no longer uniform.
        let uniform = 1.0 / (NUM_INTERSECTIONS + 1) as f32;
        assert!(root
            .children()
            .iter()
            .any(|c| (c.prior() - uniform).abs() > 1e-4));
    }

    #[test]
    fn noise_is_deterministic_per_seed() {
        let state = GameState::new(7.5);
        let cfg = SearchConfig {
            noise: true,
            ..SearchConfig::default()
        };
        let priors: Vec<Vec<f32>> = (0..2)
            .map(|_| {
                let root = Node::new(PASS);
                root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
                    .unwrap();
                root.children().iter().map(ChildSlot::prior).collect()
            })
            .collect();
        assert_eq!(priors[0], priors[1]);
    }

    #[test]
    fn superko_root_moves_invalidated() {
        // Build the position where retaking the ko would repeat.
        let mut state = GameState::new(7.5);
        state.play_move(Color::Black, Board::get_vertex(2, 1));
        state.play_move(Color::White, Board::get_vertex(3, 1));
        state.play_move(Color::Black, Board::get_vertex(1, 2));
        state.play_move(Color::White, Board::get_vertex(4, 2));
        state.play_move(Color::Black, Board::get_vertex(2, 3));
        state.play_move(Color::White, Board::get_vertex(3, 3));
        state.play_move(Color::Black, Board::get_vertex(3, 2));
        state.play_move(Color::White, Board::get_vertex(2, 2));
        state.play_move(Color::Black, PASS);
        state.play_move(Color::White, PASS);
        // Passes cleared the simple ko, so only superko forbids retaking.
        // (Two passes also end the game; reset the counter as a cleanup
        // front-end would before searching on.)
        state.set_passes(0);

        let root = Node::new(PASS);
        let cfg = SearchConfig::default();
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();

        let ko_retake = Board::get_vertex(3, 2);
        let child = root
            .children()
            .iter()
            .find(|c| c.mv() == ko_retake)
            .expect("retake is nominally legal");
        assert!(!child.valid());
        // Everything else stays selectable.
        let valid = root.children().iter().filter(|c| c.valid()).count();
        assert_eq!(valid, root.children().len() - 1);
    }

    #[test]
    fn find_child_promotes_subtree() {
        let mut root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig::default();
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        let mv = root.children()[5].mv();
        root.children()[5].node().unwrap().update(0.75);

        let promoted = root.find_child(mv).expect("child exists");
        assert_eq!(promoted.mv(), mv);
        assert_eq!(promoted.visits(), 1);
        // The slot is empty now; promoting again yields nothing.
        assert!(root.find_child(mv).is_none());
    }

    #[test]
    fn randomize_respects_visit_floor() {
        let root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig::default();
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        // Nothing visited: sampling has no mass.
        assert!(root
            .randomize_first_proportionally(&mut rng(), 1.0, 1)
            .is_none());

        let children = root.children();
        for _ in 0..10 {
            children[0].node().unwrap().update(0.5);
        }
        let picked = root.randomize_first_proportionally(&mut rng(), 1.0, 1);
        // All mass sits on the only visited child.
        assert_eq!(picked, Some(children[0].mv()));
        // A floor above its visits suppresses the randomization.
        assert!(root
            .randomize_first_proportionally(&mut rng(), 1.0, 100)
            .is_none());
    }

    #[test]
    fn nopass_child_skips_pass() {
        let root = Node::new(PASS);
        let state = GameState::new(7.5);
        let cfg = SearchConfig::default();
        root.prepare_root(&uniform_client(), &state, &cfg, &mut rng())
            .unwrap();
        // Make pass the most-visited child.
        let pass_slot = root
            .children()
            .iter()
            .find(|c| c.mv() == PASS)
            .unwrap();
        for _ in 0..20 {
            pass_slot.node().unwrap().update(1.0);
        }
        let best = root.sorted_children(Color::Black)[0].mv();
        assert_eq!(best, PASS);
        let nopass = root.nopass_child(Color::Black).unwrap();
        assert_ne!(nopass.mv(), PASS);
    }
}
