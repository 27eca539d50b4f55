//! Evaluator seam and client-side ensemble handling.
//!
//! The evaluator maps a position to a side-to-move win probability, a prior
//! over the intersections and a pass prior. What sits behind the trait
//! (a network runtime, a remote process, a stub) is not the search's
//! business. [`EvalClient`] adds the pieces the search does own: the
//! symmetry ensemble and the content-addressed result cache.

use std::sync::{Arc, Mutex, MutexGuard};

use games_go::{GameState, NUM_INTERSECTIONS, NUM_SYMMETRIES};
use rand::Rng;
use thiserror::Error;

use crate::cache::EvalCache;

/// Errors that can occur during evaluation.
#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("Evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Model error: {0}")]
    ModelError(String),
}

/// How to combine board symmetries for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsembleMode {
    /// Evaluate one fixed symmetry (debug / heatmap use).
    Direct(usize),
    /// Evaluate a single randomly chosen symmetry. The common search path;
    /// results are cacheable because the cache is keyed by position, not
    /// symmetry.
    RandomSymmetry,
    /// Average all eight symmetries. Slow; bypasses the cache.
    Average,
}

/// Raw evaluator output for one position.
#[derive(Debug, Clone)]
pub struct NetOutput {
    /// Prior per intersection in canonical vertex order. Not normalized
    /// over legal moves; the node store does that at link time.
    pub policy: Vec<f32>,

    /// Prior for passing.
    pub policy_pass: f32,

    /// Win probability in [0, 1] from the side to move's perspective.
    pub value: f32,
}

/// Position evaluator seam.
///
/// Implementations must be shareable across search workers.
pub trait Evaluator: Send + Sync {
    /// Evaluate `state` under the given board symmetry, returning the
    /// policy mapped back to canonical orientation.
    fn forward(&self, state: &GameState, symmetry: usize) -> Result<NetOutput, EvaluatorError>;

    /// Resident size estimate in bytes, for the memory governor.
    fn estimated_size(&self) -> usize;
}

/// Uniform stub evaluator: equal prior everywhere, neutral value. Stands in
/// when no weights are configured and anchors deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct UniformEvaluator;

impl UniformEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl Evaluator for UniformEvaluator {
    fn forward(&self, _state: &GameState, _symmetry: usize) -> Result<NetOutput, EvaluatorError> {
        let prob = 1.0 / (NUM_INTERSECTIONS + 1) as f32;
        Ok(NetOutput {
            policy: vec![prob; NUM_INTERSECTIONS],
            policy_pass: prob,
            value: 0.5,
        })
    }

    fn estimated_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }
}

/// Thin adapter in front of the evaluator: picks the symmetry, consults the
/// result cache, and counts hits. Cache hits never touch search statistics.
pub struct EvalClient {
    net: Arc<dyn Evaluator>,
    cache: Mutex<EvalCache>,
}

impl EvalClient {
    pub fn new(net: Arc<dyn Evaluator>, cache_entries: usize) -> Self {
        Self {
            net,
            cache: Mutex::new(EvalCache::new(cache_entries)),
        }
    }

    fn cache(&self) -> MutexGuard<'_, EvalCache> {
        // The cache holds no invariants worth dying over if a worker
        // panicked mid-insert.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn evaluate(
        &self,
        state: &GameState,
        mode: EnsembleMode,
        rng: &mut impl Rng,
    ) -> Result<NetOutput, EvaluatorError> {
        match mode {
            EnsembleMode::Direct(symmetry) => self.net.forward(state, symmetry),
            EnsembleMode::Average => {
                let mut policy = vec![0.0f32; NUM_INTERSECTIONS];
                let mut policy_pass = 0.0f32;
                let mut value = 0.0f32;
                for symmetry in 0..NUM_SYMMETRIES {
                    let out = self.net.forward(state, symmetry)?;
                    for (acc, p) in policy.iter_mut().zip(&out.policy) {
                        *acc += p;
                    }
                    policy_pass += out.policy_pass;
                    value += out.value;
                }
                let n = NUM_SYMMETRIES as f32;
                for p in &mut policy {
                    *p /= n;
                }
                Ok(NetOutput {
                    policy,
                    policy_pass: policy_pass / n,
                    value: value / n,
                })
            }
            EnsembleMode::RandomSymmetry => {
                let hash = state.symmetry_hash(0);
                if let Some(hit) = self.cache().lookup(hash) {
                    return Ok(hit);
                }
                let symmetry = rng.gen_range(0..NUM_SYMMETRIES);
                let out = self.net.forward(state, symmetry)?;
                self.cache().insert(hash, out.clone());
                Ok(out)
            }
        }
    }

    /// Resize the result cache. Must not run during an active search; the
    /// memory governor serializes this with move generation.
    pub fn resize_cache(&self, entries: usize) {
        self.cache().resize(entries);
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache().hits()
    }

    pub fn cache_lookups(&self) -> u64 {
        self.cache().lookups()
    }

    /// Current cache footprint estimate in bytes.
    pub fn estimated_cache_size(&self) -> usize {
        self.cache().estimated_size()
    }

    /// Resident size of the wrapped evaluator.
    pub fn network_size(&self) -> usize {
        self.net.estimated_size()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn uniform_evaluator_sums_to_one() {
        let eval = UniformEvaluator::new();
        let state = GameState::new(7.5);
        let out = eval.forward(&state, 0).unwrap();
        let total: f32 = out.policy.iter().sum::<f32>() + out.policy_pass;
        assert!((total - 1.0).abs() < 1e-4);
        assert!((out.value - 0.5).abs() < 1e-6);
    }

    #[test]
    fn random_symmetry_hits_cache_on_repeat() {
        let client = EvalClient::new(Arc::new(UniformEvaluator::new()), 100);
        let state = GameState::new(7.5);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        client
            .evaluate(&state, EnsembleMode::RandomSymmetry, &mut rng)
            .unwrap();
        client
            .evaluate(&state, EnsembleMode::RandomSymmetry, &mut rng)
            .unwrap();

        assert_eq!(client.cache_lookups(), 2);
        assert_eq!(client.cache_hits(), 1);
    }

    #[test]
    fn direct_mode_bypasses_cache() {
        let client = EvalClient::new(Arc::new(UniformEvaluator::new()), 100);
        let state = GameState::new(7.5);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        client
            .evaluate(&state, EnsembleMode::Direct(3), &mut rng)
            .unwrap();
        assert_eq!(client.cache_lookups(), 0);
    }

    #[test]
    fn average_mode_averages_value() {
        let client = EvalClient::new(Arc::new(UniformEvaluator::new()), 100);
        let state = GameState::new(7.5);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let out = client
            .evaluate(&state, EnsembleMode::Average, &mut rng)
            .unwrap();
        assert!((out.value - 0.5).abs() < 1e-6);
    }
}
