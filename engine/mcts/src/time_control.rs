//! Game clock models and per-move time allotment.
//!
//! All bookkeeping is in centiseconds, matching the GTP time commands.
//! Supported models: absolute (no overtime), Canadian overtime (stones per
//! period), byo-yomi (fixed periods), and "none" (a nominal long absolute
//! clock so searches still terminate).

use games_go::{Color, NUM_INTERSECTIONS};

/// Allotment returned when the clock model imposes no real pressure.
const NO_PRESSURE_CS: i32 = i32::MAX / 2;

#[derive(Debug, Clone)]
pub struct TimeControl {
    main_time: i32,
    byo_time: i32,
    byo_stones: i32,
    byo_periods: i32,
    remaining: [i32; 2],
    stones_left: [i32; 2],
    periods_left: [i32; 2],
    in_byo: [bool; 2],
}

impl Default for TimeControl {
    /// One hour absolute, the stand-in when no time settings arrive.
    fn default() -> Self {
        Self::new(60 * 60 * 100, 0, 0, 0)
    }
}

impl TimeControl {
    /// All times in centiseconds. `byo_stones` selects Canadian overtime,
    /// `byo_periods` selects byo-yomi; both zero with a nonzero `byo_time`
    /// means no effective pressure.
    pub fn new(main_time: i32, byo_time: i32, byo_stones: i32, byo_periods: i32) -> Self {
        let mut tc = Self {
            main_time,
            byo_time,
            byo_stones,
            byo_periods,
            remaining: [0; 2],
            stones_left: [0; 2],
            periods_left: [0; 2],
            in_byo: [false; 2],
        };
        tc.reset_clocks();
        tc
    }

    pub fn reset_clocks(&mut self) {
        self.remaining = [self.main_time; 2];
        self.stones_left = [self.byo_stones; 2];
        self.periods_left = [self.byo_periods; 2];
        // Zero main time starts directly in overtime.
        let start_in_byo = self.main_time <= 0 && self.byo_time > 0;
        self.in_byo = [start_in_byo; 2];
        if start_in_byo {
            self.remaining = [self.byo_time; 2];
        }
    }

    /// Expected number of own moves still to play, used to spread the
    /// remaining main time. Deliberately underestimates late in the game.
    fn moves_expected(movenum: usize) -> i32 {
        let budgeted = (NUM_INTERSECTIONS as i32 - movenum as i32) / 4;
        budgeted.max(NUM_INTERSECTIONS as i32 / 16).max(1)
    }

    /// Wall-clock budget for the next move, after lag compensation.
    pub fn max_time_for_move(&self, color: Color, movenum: usize, lagbuffer_cs: i32) -> i32 {
        let i = color.index();
        let mut time_remaining = self.remaining[i];
        let mut moves_remaining = Self::moves_expected(movenum);
        let mut extra_time_per_move = 0;

        if self.byo_time != 0 {
            if self.byo_stones == 0 && self.byo_periods == 0 {
                return NO_PRESSURE_CS;
            }
            if self.in_byo[i] {
                if self.byo_stones != 0 {
                    // Canadian: spread the period over its stones.
                    moves_remaining = self.stones_left[i].max(1);
                } else {
                    // Byo-yomi: one period per move.
                    time_remaining = self.byo_time;
                    moves_remaining = 1;
                }
            } else if self.byo_stones != 0 {
                extra_time_per_move = self.byo_time / self.byo_stones.max(1);
            } else {
                extra_time_per_move = self.byo_time;
            }
        }

        let base_time = (time_remaining - lagbuffer_cs).max(0) / moves_remaining.max(1);
        let inc_time = (extra_time_per_move - lagbuffer_cs).max(0);
        base_time + inc_time
    }

    /// Account for time spent on a move and roll byo-yomi state forward.
    pub fn used(&mut self, color: Color, elapsed_cs: i32) {
        let i = color.index();
        if self.in_byo[i] {
            if self.byo_stones != 0 {
                self.remaining[i] -= elapsed_cs;
                self.stones_left[i] -= 1;
                if self.stones_left[i] <= 0 {
                    self.remaining[i] = self.byo_time;
                    self.stones_left[i] = self.byo_stones;
                }
            } else if elapsed_cs > self.byo_time {
                self.periods_left[i] = (self.periods_left[i] - 1).max(0);
            }
            return;
        }

        self.remaining[i] -= elapsed_cs;
        if self.remaining[i] <= 0 && self.byo_time > 0 {
            self.in_byo[i] = true;
            self.remaining[i] = self.byo_time;
            self.stones_left[i] = self.byo_stones;
            self.periods_left[i] = self.byo_periods;
        }
    }

    /// Sync from a GTP `time_left` report. `stones > 0` signals Canadian
    /// overtime in progress.
    pub fn adjust_time(&mut self, color: Color, time_cs: i32, stones: i32) {
        let i = color.index();
        self.remaining[i] = time_cs;
        if stones > 0 {
            self.in_byo[i] = true;
            self.stones_left[i] = stones;
        }
    }

    pub fn remaining(&self, color: Color) -> i32 {
        self.remaining[color.index()]
    }

    pub fn in_byo(&self, color: Color) -> bool {
        self.in_byo[color.index()]
    }
}
