//! ONNX Runtime evaluator backend.
//!
//! # Model Format
//!
//! The model takes a flattened observation of the position and returns
//! move logits and a value:
//! - Input: "observation" - shape (1, 340) float32: one-hot black stones,
//!   one-hot white stones (canonical vertex order), then a two-element
//!   side-to-move indicator.
//! - Output: "policy_logits" - shape (1, 170) float32: one logit per
//!   intersection plus pass, canonical order.
//! - Output: "value" - shape (1, 1) float32 in [0, 1], side to move.
//!
//! Board symmetries are applied on the way in and inverted on the way out,
//! so callers always see canonical-orientation policies.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use games_go::board::symmetry_vertex;
use games_go::{Board, Cell, Color, GameState, NUM_INTERSECTIONS};
use ort::{session::Session, value::Value};
use tracing::debug;

use crate::evaluator::{Evaluator, EvaluatorError, NetOutput};

/// Observation length: two stone planes plus the side-to-move pair.
const OBS_SIZE: usize = 2 * NUM_INTERSECTIONS + 2;
/// Policy head length: intersections plus pass.
const POLICY_SIZE: usize = NUM_INTERSECTIONS + 1;

/// ONNX Runtime evaluator.
///
/// Uses a Mutex internally because `Session::run` requires `&mut self`,
/// but the `Evaluator` trait uses `&self` for thread-safe sharing.
pub struct OnnxEvaluator {
    session: Mutex<Session>,
    model_bytes: usize,
    inference_count: AtomicU64,
    total_inference_time_us: AtomicU64,
}

impl std::fmt::Debug for OnnxEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxEvaluator")
            .field("model_bytes", &self.model_bytes)
            .finish_non_exhaustive()
    }
}

impl OnnxEvaluator {
    /// Load a model from the given path.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self, EvaluatorError> {
        let model_bytes = std::fs::metadata(model_path.as_ref())
            .map(|m| m.len() as usize)
            .unwrap_or(0);
        let session = Session::builder()
            .map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(2)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to load model: {}", e)))?;

        Ok(Self {
            session: Mutex::new(session),
            model_bytes,
            inference_count: AtomicU64::new(0),
            total_inference_time_us: AtomicU64::new(0),
        })
    }

    /// Encode the position under a board symmetry.
    fn encode(state: &GameState, symmetry: usize) -> Vec<f32> {
        let board = state.board();
        let mut obs = vec![0.0f32; OBS_SIZE];
        for v in Board::vertices() {
            let target = Board::policy_index(symmetry_vertex(v, symmetry));
            match board.cell(v) {
                Cell::Black => obs[target] = 1.0,
                Cell::White => obs[NUM_INTERSECTIONS + target] = 1.0,
                _ => {}
            }
        }
        if state.to_move() == Color::Black {
            obs[2 * NUM_INTERSECTIONS] = 1.0;
        } else {
            obs[2 * NUM_INTERSECTIONS + 1] = 1.0;
        }
        obs
    }

    /// Softmax over the policy head, then map intersections back to
    /// canonical orientation (pass is symmetry-invariant).
    fn decode_policy(logits: &[f32], symmetry: usize) -> (Vec<f32>, f32) {
        let max_logit = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits.iter().map(|&l| (l - max_logit).exp()).collect();
        let total: f32 = exp.iter().sum();

        let mut policy = vec![0.0f32; NUM_INTERSECTIONS];
        for v in Board::vertices() {
            let transformed = Board::policy_index(symmetry_vertex(v, symmetry));
            policy[Board::policy_index(v)] = exp[transformed] / total;
        }
        (policy, exp[NUM_INTERSECTIONS] / total)
    }
}

impl Evaluator for OnnxEvaluator {
    fn forward(&self, state: &GameState, symmetry: usize) -> Result<NetOutput, EvaluatorError> {
        let obs = Self::encode(state, symmetry);
        let input_array = ndarray::Array2::from_shape_vec((1, OBS_SIZE), obs)
            .map_err(|e| EvaluatorError::ModelError(format!("Failed to shape input: {}", e)))?;
        let input_value = Value::from_array(input_array).map_err(|e| {
            EvaluatorError::ModelError(format!("Failed to create input tensor: {}", e))
        })?;

        let inference_start = Instant::now();
        let (logits, value) = {
            let mut session = self.session.lock().map_err(|e| {
                EvaluatorError::EvaluationFailed(format!("Failed to acquire session lock: {}", e))
            })?;
            let outputs = session
                .run(ort::inputs!["observation" => input_value])
                .map_err(|e| EvaluatorError::EvaluationFailed(format!("Inference failed: {}", e)))?;

            let policy_output = outputs.get("policy_logits").ok_or_else(|| {
                EvaluatorError::ModelError("Missing policy_logits output".to_string())
            })?;
            let (_shape, policy_data) = policy_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to extract policy tensor: {}", e))
            })?;
            if policy_data.len() < POLICY_SIZE {
                return Err(EvaluatorError::ModelError(format!(
                    "Policy head has {} outputs, expected {}",
                    policy_data.len(),
                    POLICY_SIZE
                )));
            }
            let logits: Vec<f32> = policy_data.to_vec();

            let value_output = outputs
                .get("value")
                .ok_or_else(|| EvaluatorError::ModelError("Missing value output".to_string()))?;
            let (_shape, value_data) = value_output.try_extract_tensor::<f32>().map_err(|e| {
                EvaluatorError::ModelError(format!("Failed to extract value tensor: {}", e))
            })?;
            let value = value_data.first().cloned().unwrap_or(0.5);
            (logits, value)
        };

        let inference_time_us = inference_start.elapsed().as_micros() as u64;
        self.total_inference_time_us
            .fetch_add(inference_time_us, Ordering::Relaxed);
        let count = self.inference_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count % 10_000 == 0 {
            let total_us = self.total_inference_time_us.load(Ordering::Relaxed);
            debug!(
                calls = count,
                avg_ms = (total_us / count) as f64 / 1000.0,
                "ONNX inference stats"
            );
        }

        let (policy, policy_pass) = Self::decode_policy(&logits[..POLICY_SIZE], symmetry);
        Ok(NetOutput {
            policy,
            policy_pass,
            value: value.clamp(0.0, 1.0),
        })
    }

    fn estimated_size(&self) -> usize {
        // Runtime workspace tends to dwarf the raw weights.
        self.model_bytes * 2
    }
}
