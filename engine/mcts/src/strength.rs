//! Strength control: two trees, one move.
//!
//! A strong tree S provides precise play; a nominal tree N provides
//! reference play. The final move comes from a four-case rule set over S's
//! winrate distribution and the evaluator's static priors, deliberately
//! softening play in won positions while never butchering lost or critical
//! ones. In the first moves of the game the nominal tree's choice is played
//! outright.

use games_go::{GameState, PASS, RESIGN};
use tracing::{debug, info};

use crate::search::{AnalyzeSink, PassPolicy, RootStat, Search, SearchError, SearchLimits};

/// Master softening coefficient; every threshold below scales with it.
pub const STRENGTH_C: f32 = 0.8;
/// Winrate lead that makes the first move mandatory.
pub const T_UNIQUE: f32 = 0.08 * STRENGTH_C;
/// Below this winrate the position is lost; play the best move.
pub const T_MIN: f32 = 0.40;
/// Above this winrate the position is won; softening kicks in.
pub const T_MAX: f32 = 0.60;
/// Winrate slack when picking the most natural move in between.
pub const T_DIF: f32 = 0.03 * STRENGTH_C;

/// Case 4 policy floors, one per winrate-gap band.
const ALLOWED_POLICY: [f32; 4] = [0.05, 0.10, 0.20, 0.40];
/// Case 4 winrate-gap band edges, scaled by the softening coefficient.
const ALLOWED_GAP: [f32; 4] = [
    0.03 * STRENGTH_C,
    0.04 * STRENGTH_C,
    0.06 * STRENGTH_C,
    0.08 * STRENGTH_C,
];

/// Visit floor for a move to be considered in the winning case.
const CASE_FOUR_MIN_VISITS: u32 = 10;

pub struct StrengthControl {
    strong: Search,
    nominal: Search,
    opening_moves: u32,
}

impl StrengthControl {
    pub fn new(strong: Search, nominal: Search, opening_moves: u32) -> Self {
        Self {
            strong,
            nominal,
            opening_moves,
        }
    }

    pub fn strong(&self) -> &Search {
        &self.strong
    }

    pub fn strong_mut(&mut self) -> &mut Search {
        &mut self.strong
    }

    pub fn nominal(&self) -> &Search {
        &self.nominal
    }

    pub fn nominal_mut(&mut self) -> &mut Search {
        &mut self.nominal
    }

    /// Apply a mutation to both searches (option changes, clears).
    pub fn for_both(&mut self, mut apply: impl FnMut(&mut Search)) {
        apply(&mut self.strong);
        apply(&mut self.nominal);
    }

    /// Search both trees and pick the move to play.
    pub fn genmove(
        &mut self,
        state: &GameState,
        policy: PassPolicy,
        limits: &SearchLimits,
        analyze: Option<AnalyzeSink>,
    ) -> Result<i32, SearchError> {
        let strong_result = self.strong.think(state, policy, limits, analyze)?;
        if strong_result.best_move == RESIGN {
            info!("strong tree resigns");
            return Ok(RESIGN);
        }
        let nominal_result = self.nominal.think(state, policy, limits, None)?;

        let move_number = state.movenum() as u32 + 1;
        let mv = select_move(
            &strong_result.candidates,
            &nominal_result.candidates,
            move_number,
            self.opening_moves,
        );
        debug!(
            move_number,
            picked = %games_go::Board::vertex_to_text(mv),
            strong_best = %games_go::Board::vertex_to_text(strong_result.best_move),
            "strength control decision"
        );

        // Pass policy was already honored inside each search; the rule set
        // only ever picks among searched candidates, so re-check the one
        // restriction that matters here.
        if policy == PassPolicy::NoPass && mv == PASS {
            return Ok(strong_result.best_move);
        }
        Ok(mv)
    }

    /// Ponder on the strong tree until `stop_check` fires.
    pub fn ponder(
        &mut self,
        state: &GameState,
        stop_check: &dyn Fn() -> bool,
        limits: &SearchLimits,
        analyze: Option<AnalyzeSink>,
    ) -> Result<(), SearchError> {
        self.strong.ponder(state, stop_check, limits, analyze)
    }
}

/// The four-case rule set. `strong` and `nominal` are root candidates
/// sorted best-first; `move_number` is 1-based for the move about to be
/// played. Pure so the rule table can be exercised directly.
pub fn select_move(
    strong: &[RootStat],
    nominal: &[RootStat],
    move_number: u32,
    opening_moves: u32,
) -> i32 {
    // Opening override: play the reference move before the rules apply.
    if move_number <= opening_moves {
        if let Some(first) = nominal.first() {
            return first.mv;
        }
    }

    let Some(first) = strong.first() else {
        return PASS;
    };
    let w1 = first.winrate;
    let w2 = strong.get(1).map(|c| c.winrate).unwrap_or(0.0);

    // Case 1: dominant first move.
    if w1 - w2 >= T_UNIQUE {
        return first.mv;
    }
    // Case 2: losing position, no softening.
    if w1 <= T_MIN {
        return first.mv;
    }
    // Case 3: intermediate position; the most natural move within slack.
    if w1 <= T_MAX {
        let threshold = w1 - T_DIF;
        let mut pick = first.mv;
        let mut best_sp = f32::MIN;
        for candidate in strong {
            if candidate.winrate >= threshold && candidate.static_sp > best_sp {
                best_sp = candidate.static_sp;
                pick = candidate.mv;
            }
        }
        return pick;
    }

    // Case 4: winning; among natural-enough moves inside the allowed gap
    // bands, play the weakest.
    let mut pick = first.mv;
    let mut pick_rate = w1;
    for candidate in strong {
        if candidate.visits < CASE_FOUR_MIN_VISITS {
            continue;
        }
        let gap = w1 - candidate.winrate;
        let qualifies = (0..ALLOWED_GAP.len()).any(|band| {
            let lo = if band == 0 { 0.0 } else { ALLOWED_GAP[band - 1] };
            let hi = ALLOWED_GAP[band];
            gap >= lo && gap < hi && candidate.static_sp >= ALLOWED_POLICY[band]
        });
        if qualifies && candidate.winrate < pick_rate {
            pick = candidate.mv;
            pick_rate = candidate.winrate;
        }
    }
    pick
}
