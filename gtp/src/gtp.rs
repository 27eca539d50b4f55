//! GTP command dispatch.
//!
//! One command per line, responses prefixed `=` (ok) or `?` (error) and
//! terminated by a blank line. Analysis commands stream multi-line `info`
//! output until the next command arrives. The engine ponders between
//! moves when allowed.

use std::cell::RefCell;
use std::io::Write;
use std::time::{Duration, Instant};

use engine_config::CentralConfig;
use games_go::{Board, Color, GameState, PlayError, BOARD_SIZE, PASS};
use mcts::{
    memory, set_max_memory, tree_size_bytes, AnalyzeSink, MemoryError, PassPolicy, RootStat,
    SearchLimits, StrengthControl, TimeControl,
};
use tracing::{info, warn};

use crate::input::InputQueue;
use crate::sgf;

pub const PROGRAM_NAME: &str = "Tengen";
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");
const GTP_VERSION: u32 = 2;

const COMMANDS: &[&str] = &[
    "protocol_version",
    "name",
    "version",
    "quit",
    "known_command",
    "list_commands",
    "boardsize",
    "clear_board",
    "komi",
    "play",
    "genmove",
    "showboard",
    "undo",
    "final_score",
    "final_status_list",
    "time_settings",
    "time_left",
    "fixed_handicap",
    "place_free_handicap",
    "set_free_handicap",
    "loadsgf",
    "printsgf",
    "kgs-genmove_cleanup",
    "kgs-time_settings",
    "kgs-game_over",
    "lz-analyze",
    "lz-genmove_analyze",
    "lz-memory_report",
    "lz-setoption",
];

const OPTIONS: &[&str] = &[
    "option name Maximum Memory Use (MiB) type spin default 2048 min 128 max 131072",
    "option name Percentage of memory for cache type spin default 10 min 1 max 99",
    "option name Visits type spin default 0 min 0 max 1000000000",
    "option name Playouts type spin default 0 min 0 max 1000000000",
    "option name Lagbuffer type spin default 0 min 0 max 3000",
    "option name Resign Percentage type spin default -1 min -1 max 30",
    "option name Pondering type check default true",
];

pub struct GtpServer<W: Write> {
    out: W,
    game: GameState,
    engine: StrengthControl,
    time: TimeControl,
    lagbuffer_cs: i32,
    pondering: bool,
    playouts_limited: bool,
    max_memory: usize,
    cache_ratio_percent: usize,
    last_move: i32,
}

impl<W: Write> GtpServer<W> {
    pub fn new(out: W, engine: StrengthControl, config: &CentralConfig) -> anyhow::Result<Self> {
        let mut server = Self {
            out,
            game: GameState::new(config.game.komi),
            engine,
            time: TimeControl::default(),
            lagbuffer_cs: config.time.lagbuffer_cs,
            pondering: config.search.pondering,
            playouts_limited: config.search.playouts != 0,
            max_memory: config.memory.max_memory_mib * memory::MIB,
            cache_ratio_percent: config.memory.cache_ratio_percent,
            last_move: PASS,
        };
        let message = server
            .apply_max_memory(server.max_memory, server.cache_ratio_percent)
            .map_err(|e| anyhow::anyhow!("Error setting memory requirements: {e}"))?;
        info!("{}", message);
        Ok(server)
    }

    /// Process commands until the input ends or `quit` arrives.
    pub fn run(&mut self, input: &InputQueue) -> anyhow::Result<()> {
        while let Some(line) = input.pop() {
            if !self.execute(&line, input)? {
                break;
            }
        }
        Ok(())
    }

    fn ok(&mut self, id: Option<u32>, msg: &str) -> anyhow::Result<()> {
        self.reply('=', id, msg)
    }

    fn fail(&mut self, id: Option<u32>, msg: &str) -> anyhow::Result<()> {
        self.reply('?', id, msg)
    }

    fn reply(&mut self, prefix: char, id: Option<u32>, msg: &str) -> anyhow::Result<()> {
        match id {
            Some(id) => write!(self.out, "{}{} {}\n\n", prefix, id, msg)?,
            None => write!(self.out, "{} {}\n\n", prefix, msg)?,
        }
        self.out.flush()?;
        Ok(())
    }

    /// Handle one command line. Returns false when the session should end.
    pub fn execute(&mut self, line: &str, input: &InputQueue) -> anyhow::Result<bool> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(true);
        }

        let mut tokens: Vec<&str> = line.split_whitespace().collect();
        let id = tokens.first().and_then(|t| t.parse::<u32>().ok());
        if id.is_some() {
            tokens.remove(0);
        }
        let Some(&command) = tokens.first() else {
            return Ok(true);
        };
        let command = command.to_ascii_lowercase();
        let args = &tokens[1..];

        match command.as_str() {
            "protocol_version" => self.ok(id, &GTP_VERSION.to_string())?,
            "name" => self.ok(id, PROGRAM_NAME)?,
            "version" => self.ok(id, PROGRAM_VERSION)?,
            "quit" => {
                self.ok(id, "")?;
                return Ok(false);
            }
            "known_command" => {
                let known = args
                    .first()
                    .map(|c| COMMANDS.contains(&c.to_ascii_lowercase().as_str()))
                    .unwrap_or(false);
                self.ok(id, if known { "true" } else { "false" })?;
            }
            "list_commands" => self.ok(id, &COMMANDS.join("\n"))?,
            "boardsize" => self.cmd_boardsize(id, args)?,
            "clear_board" => {
                self.clear_game();
                self.ok(id, "")?;
            }
            "komi" => self.cmd_komi(id, args)?,
            "play" => self.cmd_play(id, args)?,
            "genmove" => self.cmd_genmove(id, args, false, false, input)?,
            "lz-genmove_analyze" => self.cmd_genmove(id, args, true, false, input)?,
            "kgs-genmove_cleanup" => self.cmd_genmove(id, args, false, true, input)?,
            "lz-analyze" => self.cmd_analyze(id, args, input)?,
            "undo" => {
                if self.game.undo_move() {
                    self.engine.for_both(|s| s.clear());
                    self.ok(id, "")?;
                } else {
                    self.fail(id, "cannot undo")?;
                }
            }
            "showboard" => {
                eprintln!("{}", self.game.board());
                self.ok(id, "")?;
            }
            "final_score" => {
                let score = self.game.final_score();
                let text = if score < -0.1 {
                    format!("W+{:.1}", score.abs())
                } else if score > 0.1 {
                    format!("B+{:.1}", score)
                } else {
                    "0".to_string()
                };
                self.ok(id, &text)?;
            }
            "final_status_list" => self.cmd_final_status_list(id, args)?,
            "time_settings" => self.cmd_time_settings(id, args)?,
            "kgs-time_settings" => self.cmd_kgs_time_settings(id, args)?,
            "time_left" => self.cmd_time_left(id, args, input)?,
            "kgs-game_over" => {
                // Do nothing. Particularly, don't ponder.
                self.ok(id, "")?;
            }
            "fixed_handicap" => self.cmd_fixed_handicap(id, args)?,
            "place_free_handicap" => self.cmd_place_free_handicap(id, args)?,
            "set_free_handicap" => self.cmd_set_free_handicap(id, args)?,
            "loadsgf" => self.cmd_loadsgf(id, args)?,
            "printsgf" => self.cmd_printsgf(id, args)?,
            "lz-memory_report" => self.cmd_memory_report(id)?,
            "lz-setoption" => self.cmd_setoption(id, args)?,
            _ => self.fail(id, "unknown command")?,
        }
        Ok(true)
    }

    fn clear_game(&mut self) {
        self.game.reset();
        self.engine.for_both(|s| s.clear());
        self.time.reset_clocks();
        self.last_move = PASS;
    }

    fn cmd_boardsize(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        match args.first().and_then(|s| s.parse::<usize>().ok()) {
            Some(size) if size == BOARD_SIZE => {
                self.clear_game();
                self.ok(id, "")
            }
            Some(_) => self.fail(id, "unacceptable size"),
            None => self.fail(id, "syntax not understood"),
        }
    }

    fn cmd_komi(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let Some(komi) = args.first().and_then(|s| s.parse::<f32>().ok()) else {
            return self.fail(id, "syntax not understood");
        };
        if komi != self.game.komi() {
            self.game.set_komi(komi);
            // Komi changes position values; reused trees are stale.
            self.engine.for_both(|s| s.clear());
        }
        self.ok(id, "")
    }

    fn cmd_play(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let (Some(color), Some(vertex)) = (args.first(), args.get(1)) else {
            return self.fail(id, "syntax not understood");
        };
        match self.game.play_text_move(color, vertex) {
            Ok(()) => {
                self.last_move = self.game.last_move();
                self.ok(id, "")
            }
            Err(PlayError::IllegalMove) => self.fail(id, "illegal move"),
            Err(_) => self.fail(id, "syntax not understood"),
        }
    }

    fn cmd_genmove(
        &mut self,
        id: Option<u32>,
        args: &[&str],
        analysis: bool,
        cleanup: bool,
        input: &InputQueue,
    ) -> anyhow::Result<()> {
        let Some(color) = args.first().and_then(|s| Color::from_gtp(s)) else {
            return self.fail(id, "syntax error");
        };
        let interval_cs = if analysis {
            match args.get(1).and_then(|s| s.parse::<u32>().ok()) {
                Some(cs) => Some(cs),
                None => return self.fail(id, "syntax not understood"),
            }
        } else {
            None
        };

        if cleanup {
            self.game.set_passes(0);
        }
        self.game.set_to_move(color);

        if analysis {
            // Start of multi-line response.
            match id {
                Some(id) => writeln!(self.out, "={}", id)?,
                None => writeln!(self.out, "=")?,
            }
            self.out.flush()?;
        }

        let budget_cs = self
            .time
            .max_time_for_move(color, self.game.movenum(), self.lagbuffer_cs);
        let limits = SearchLimits {
            time: Some(Duration::from_millis(budget_cs.max(1) as u64 * 10)),
            analyze_interval: interval_cs.map(|cs| Duration::from_millis(cs.max(1) as u64 * 10)),
        };
        let policy = if cleanup {
            PassPolicy::NoPass
        } else {
            PassPolicy::Normal
        };

        let start = Instant::now();
        let result = {
            let out_cell = RefCell::new(&mut self.out);
            let sink = |stats: &[RootStat]| {
                let mut out = out_cell.borrow_mut();
                let _ = write_analysis(&mut **out, stats);
            };
            let analyze: Option<AnalyzeSink> = if analysis { Some(&sink) } else { None };
            self.engine.genmove(&self.game, policy, &limits, analyze)
        };
        let mv = match result {
            Ok(mv) => mv,
            Err(e) => {
                warn!(error = %e, "search failed");
                return self.fail(id, "search failed");
            }
        };
        self.time
            .used(color, (start.elapsed().as_millis() / 10) as i32);

        self.game.play_move(color, mv);
        self.last_move = mv;
        let vertex = Board::vertex_to_text(mv);
        if analysis {
            writeln!(self.out, "play {}", vertex)?;
            self.out.flush()?;
        } else {
            self.ok(id, &vertex)?;
        }

        if self.pondering && !self.game.has_resigned() {
            self.ponder(input, interval_cs)?;
        }
        if analysis {
            // Terminate the multi-line response.
            writeln!(self.out)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn cmd_analyze(
        &mut self,
        id: Option<u32>,
        args: &[&str],
        input: &InputQueue,
    ) -> anyhow::Result<()> {
        let mut args = args.iter();
        let mut interval_cs: Option<u32> = None;
        if let Some(&first) = args.next() {
            if let Some(color) = Color::from_gtp(first) {
                self.game.set_to_move(color);
                interval_cs = args.next().and_then(|s| s.parse().ok());
            } else {
                interval_cs = first.parse().ok();
            }
        }
        let Some(interval_cs) = interval_cs else {
            return self.fail(id, "syntax not understood");
        };

        // Start of multi-line response.
        match id {
            Some(id) => writeln!(self.out, "={}", id)?,
            None => writeln!(self.out, "=")?,
        }
        self.out.flush()?;

        if !self.game.has_resigned() {
            self.ponder(input, Some(interval_cs))?;
        }

        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }

    /// Background search until the next command is pending.
    fn ponder(&mut self, input: &InputQueue, interval_cs: Option<u32>) -> anyhow::Result<()> {
        let limits = SearchLimits {
            time: None,
            analyze_interval: interval_cs.map(|cs| Duration::from_millis(cs.max(1) as u64 * 10)),
        };
        let out_cell = RefCell::new(&mut self.out);
        let sink = |stats: &[RootStat]| {
            let mut out = out_cell.borrow_mut();
            let _ = write_analysis(&mut **out, stats);
        };
        let analyze: Option<AnalyzeSink> = if interval_cs.is_some() {
            Some(&sink)
        } else {
            None
        };
        let stop = || input.has_pending();
        if let Err(e) = self.engine.ponder(&self.game, &stop, &limits, analyze) {
            warn!(error = %e, "ponder aborted");
        }
        Ok(())
    }

    fn cmd_final_status_list(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        match args.first().copied() {
            Some("alive") => {
                let lines: Vec<String> = self
                    .game
                    .board()
                    .chains()
                    .into_iter()
                    .map(|chain| {
                        chain
                            .into_iter()
                            .map(Board::vertex_to_text)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                self.ok(id, &lines.join("\n"))
            }
            // No dead-stone estimation without a cleanup search.
            Some("dead") => self.ok(id, ""),
            _ => self.ok(id, ""),
        }
    }

    fn cmd_time_settings(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let parsed: Vec<i32> = args.iter().filter_map(|s| s.parse().ok()).collect();
        let &[main, byo, stones] = parsed.as_slice() else {
            return self.fail(id, "syntax not understood");
        };
        // Seconds on the wire, centiseconds inside.
        self.time = TimeControl::new(main * 100, byo * 100, stones, 0);
        self.ok(id, "")
    }

    fn cmd_kgs_time_settings(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let Some(&kind) = args.first() else {
            return self.fail(id, "syntax not understood");
        };
        let numbers: Vec<i32> = args[1..].iter().filter_map(|s| s.parse().ok()).collect();
        match kind {
            "none" => {
                // 30 minutes nominal.
                self.time = TimeControl::new(30 * 60 * 100, 0, 0, 0);
            }
            "absolute" => {
                let &[main] = numbers.as_slice() else {
                    return self.fail(id, "syntax not understood");
                };
                self.time = TimeControl::new(main * 100, 0, 0, 0);
            }
            "canadian" => {
                let &[main, byo, stones] = numbers.as_slice() else {
                    return self.fail(id, "syntax not understood");
                };
                self.time = TimeControl::new(main * 100, byo * 100, stones, 0);
            }
            "byoyomi" => {
                let &[main, byo, periods] = numbers.as_slice() else {
                    return self.fail(id, "syntax not understood");
                };
                self.time = TimeControl::new(main * 100, byo * 100, 0, periods);
            }
            _ => return self.fail(id, "syntax not understood"),
        }
        self.ok(id, "")
    }

    fn cmd_time_left(
        &mut self,
        id: Option<u32>,
        args: &[&str],
        input: &InputQueue,
    ) -> anyhow::Result<()> {
        let (Some(color), Some(time), Some(stones)) = (
            args.first().and_then(|s| Color::from_gtp(s)),
            args.get(1).and_then(|s| s.parse::<i32>().ok()),
            args.get(2).and_then(|s| s.parse::<i32>().ok()),
        ) else {
            return self.fail(id, "syntax not understood");
        };
        self.time.adjust_time(color, time * 100, stones);
        self.ok(id, "")?;
        // KGS sends this right after our move; keep thinking.
        if self.pondering && !self.game.has_resigned() {
            self.ponder(input, None)?;
        }
        Ok(())
    }

    fn cmd_fixed_handicap(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let Some(stones) = args.first().and_then(|s| s.parse::<u32>().ok()) else {
            return self.fail(id, "Not a valid number of handicap stones");
        };
        match self.game.set_fixed_handicap(stones) {
            Ok(()) => {
                self.engine.for_both(|s| s.clear());
                let list = self.game.board().stone_list();
                self.ok(id, &list)
            }
            Err(_) => self.fail(id, "Not a valid number of handicap stones"),
        }
    }

    fn cmd_place_free_handicap(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let Some(stones) = args.first().and_then(|s| s.parse::<u32>().ok()) else {
            return self.fail(id, "Not a valid number of handicap stones");
        };
        match self.game.place_free_handicap(stones) {
            Ok(placed) => {
                self.engine.for_both(|s| s.clear());
                let list = placed
                    .into_iter()
                    .map(Board::vertex_to_text)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.ok(id, &list)
            }
            Err(_) => self.fail(id, "Not a valid number of handicap stones"),
        }
    }

    fn cmd_set_free_handicap(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let mut placed = 0u32;
        for vertex in args {
            if self.game.play_text_move("black", vertex).is_ok() {
                placed += 1;
            }
        }
        self.game.set_handicap(self.game.handicap() + placed);
        self.engine.for_both(|s| s.clear());
        let list = self.game.board().stone_list();
        self.ok(id, &list)
    }

    fn cmd_loadsgf(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let Some(filename) = args.first() else {
            return self.fail(id, "Missing filename.");
        };
        let max_moves = args
            .get(1)
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(999);
        match sgf::load_file(filename) {
            Ok(parsed) => {
                self.game = sgf::to_state(&parsed, max_moves.saturating_sub(1));
                self.engine.for_both(|s| s.clear());
                self.ok(id, "")
            }
            Err(_) => self.fail(id, "cannot load file"),
        }
    }

    fn cmd_printsgf(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        let text = sgf::from_state(&self.game);
        match args.first() {
            Some(filename) => match std::fs::write(filename, &text) {
                Ok(()) => self.ok(id, ""),
                Err(_) => self.fail(id, "cannot save file"),
            },
            None => self.ok(id, &text),
        }
    }

    fn network_size(&self) -> usize {
        self.engine.strong().client().network_size()
            + self.engine.nominal().client().network_size()
    }

    fn cmd_memory_report(&mut self, id: Option<u32>) -> anyhow::Result<()> {
        let cache_bytes = self.engine.strong().client().estimated_cache_size()
            + self.engine.nominal().client().estimated_cache_size();
        let report = mcts::MemoryReport::new(self.network_size(), tree_size_bytes(), cache_bytes);
        let text = format!(
            "Estimated total memory consumption: {} MiB.\nNetwork with overhead: {} MiB / Search tree: {} MiB / Network cache: {} MiB",
            report.total() / memory::MIB,
            report.base / memory::MIB,
            report.tree / memory::MIB,
            report.cache / memory::MIB,
        );
        self.ok(id, &text)
    }

    fn apply_max_memory(
        &mut self,
        max_memory: usize,
        cache_ratio_percent: usize,
    ) -> Result<String, MemoryError> {
        let base = self.network_size();
        let (limits, message) = set_max_memory(max_memory, cache_ratio_percent, base)?;
        self.max_memory = limits.max_memory;
        self.cache_ratio_percent = limits.cache_ratio_percent;
        // Two trees share the budget: the tree ceiling is global (one
        // live-byte counter), the cache splits evenly.
        let per_tree_cache = (limits.cache_count / 2).max(1);
        self.engine.for_both(|s| {
            s.set_max_tree_size(limits.max_tree_size);
            s.client().resize_cache(per_tree_cache);
        });
        Ok(message)
    }

    fn cmd_setoption(&mut self, id: Option<u32>, args: &[&str]) -> anyhow::Result<()> {
        if args.is_empty() {
            return self.ok(id, &OPTIONS.join("\n"));
        }
        if args.first() != Some(&"name") {
            return self.fail(id, "incorrect syntax for lz-setoption");
        }
        let rest = &args[1..];
        let value_pos = rest.iter().position(|&t| t == "value");
        let (name_tokens, value_tokens) = match value_pos {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, &[][..]),
        };
        let name = name_tokens.join(" ").to_ascii_lowercase();
        let value = value_tokens.join(" ");

        match name.as_str() {
            "maximum memory use (mib)" => {
                let Ok(mib) = value.parse::<usize>() else {
                    return self.fail(id, "incorrect value");
                };
                if !(128..=131_072).contains(&mib) {
                    return self.fail(id, "incorrect value");
                }
                let ratio = self.cache_ratio_percent;
                match self.apply_max_memory(mib * memory::MIB, ratio) {
                    Ok(message) => self.ok(id, &message),
                    Err(e) => self.fail(id, &e.to_string()),
                }
            }
            "percentage of memory for cache" => {
                let Ok(ratio) = value.parse::<usize>() else {
                    return self.fail(id, "incorrect value");
                };
                if !(1..=99).contains(&ratio) {
                    return self.fail(id, "incorrect value");
                }
                let max_memory = self.max_memory;
                match self.apply_max_memory(max_memory, ratio) {
                    Ok(message) => self.ok(id, &message),
                    Err(e) => self.fail(id, &e.to_string()),
                }
            }
            "visits" => {
                let Ok(visits) = value.parse::<u32>() else {
                    return self.fail(id, "incorrect value");
                };
                if visits > 1_000_000_000 {
                    return self.fail(id, "incorrect value");
                }
                self.engine.for_both(|s| s.set_visit_limit(visits));
                self.ok(id, "")
            }
            "playouts" => {
                let Ok(playouts) = value.parse::<u32>() else {
                    return self.fail(id, "incorrect value");
                };
                if playouts > 1_000_000_000 {
                    return self.fail(id, "incorrect value");
                }
                // Limiting playouts while pondering makes no sense: the
                // background search would eat the whole budget.
                if playouts != 0 && self.pondering {
                    return self.fail(id, "incorrect value");
                }
                self.playouts_limited = playouts != 0;
                self.engine.for_both(|s| s.set_playout_limit(playouts));
                self.ok(id, "")
            }
            "lagbuffer" => {
                let Ok(lag) = value.parse::<i32>() else {
                    return self.fail(id, "incorrect value");
                };
                if !(0..=3000).contains(&lag) {
                    return self.fail(id, "incorrect value");
                }
                self.lagbuffer_cs = lag;
                self.ok(id, "")
            }
            "resign percentage" => {
                let Ok(pct) = value.parse::<i32>() else {
                    return self.fail(id, "incorrect value");
                };
                if !(-1..=30).contains(&pct) {
                    return self.fail(id, "incorrect value");
                }
                self.engine.for_both(|s| s.set_resign_percent(pct));
                self.ok(id, "")
            }
            "pondering" => match value.as_str() {
                "true" => {
                    if self.playouts_limited {
                        return self.fail(id, "incorrect value");
                    }
                    self.pondering = true;
                    self.ok(id, "")
                }
                "false" => {
                    self.pondering = false;
                    self.ok(id, "")
                }
                _ => self.fail(id, "incorrect value"),
            },
            _ => self.fail(id, "Unknown option"),
        }
    }
}

impl GtpServer<Vec<u8>> {
    #[cfg(test)]
    pub(crate) fn take_output(&mut self) -> String {
        String::from_utf8(std::mem::take(&mut self.out)).expect("utf8 output")
    }
}

/// One analysis snapshot as a single `info ...` line.
fn write_analysis(out: &mut dyn Write, stats: &[RootStat]) -> std::io::Result<()> {
    if stats.is_empty() {
        return Ok(());
    }
    let mut line = String::new();
    for (order, stat) in stats.iter().enumerate() {
        line.push_str(&format!(
            "info move {} visits {} winrate {} prior {} order {} pv",
            Board::vertex_to_text(stat.mv),
            stat.visits,
            (stat.winrate * 10_000.0) as i32,
            (stat.prior * 10_000.0) as i32,
            order,
        ));
        for &mv in &stat.pv {
            line.push(' ');
            line.push_str(&Board::vertex_to_text(mv));
        }
        line.push(' ');
    }
    writeln!(out, "{}", line.trim_end())?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcts::{EvalClient, Search, SearchConfig, UniformEvaluator};
    use std::sync::Arc;

    fn test_engine() -> StrengthControl {
        let cfg = SearchConfig {
            threads: 1,
            max_visits: 16,
            seed: 7,
            ..SearchConfig::default()
        };
        let strong = Search::new(
            EvalClient::new(Arc::new(UniformEvaluator::new()), 10_000),
            cfg.clone(),
        );
        let nominal = Search::new(
            EvalClient::new(Arc::new(UniformEvaluator::new()), 10_000),
            cfg,
        );
        StrengthControl::new(strong, nominal, 2)
    }

    fn test_server() -> GtpServer<Vec<u8>> {
        GtpServer::new(Vec::new(), test_engine(), &CentralConfig::default()).unwrap()
    }

    fn closed_input() -> InputQueue {
        let input = InputQueue::new();
        input.close();
        input
    }

    fn run_cmd(server: &mut GtpServer<Vec<u8>>, line: &str) -> String {
        let input = closed_input();
        server.execute(line, &input).unwrap();
        server.take_output()
    }

    #[test]
    fn identity_commands() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "protocol_version"), "= 2\n\n");
        assert_eq!(run_cmd(&mut server, "name"), "= Tengen\n\n");
        assert!(run_cmd(&mut server, "version").starts_with("= "));
    }

    #[test]
    fn id_echoed_in_response() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "42 protocol_version"), "=42 2\n\n");
        assert!(run_cmd(&mut server, "7 bogus_command").starts_with("?7 "));
    }

    #[test]
    fn unknown_command_fails() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "frobnicate"), "? unknown command\n\n");
    }

    #[test]
    fn known_command_lookup() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "known_command genmove"), "= true\n\n");
        assert_eq!(run_cmd(&mut server, "known_command frobnicate"), "= false\n\n");
    }

    #[test]
    fn boardsize_only_accepts_compiled_size() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "boardsize 13"), "= \n\n");
        assert_eq!(
            run_cmd(&mut server, "boardsize 19"),
            "? unacceptable size\n\n"
        );
    }

    #[test]
    fn play_and_illegal_move() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "play b D4"), "= \n\n");
        // Occupied point.
        assert_eq!(run_cmd(&mut server, "play w D4"), "? illegal move\n\n");
        assert_eq!(
            run_cmd(&mut server, "play purple D4"),
            "? syntax not understood\n\n"
        );
    }

    #[test]
    fn genmove_plays_and_responds() {
        let mut server = test_server();
        let response = run_cmd(&mut server, "genmove b");
        assert!(response.starts_with("= "));
        let vertex = response.trim_start_matches("= ").trim();
        assert!(Board::text_to_vertex(vertex).is_some());
        assert_eq!(server.game.movenum(), 1);
        assert_eq!(server.game.to_move(), Color::White);
    }

    #[test]
    fn genmove_analyze_streams() {
        let mut server = test_server();
        let response = run_cmd(&mut server, "lz-genmove_analyze b 1");
        assert!(response.starts_with("=\n"));
        assert!(response.contains("play "));
        assert!(response.ends_with("\n\n"));
        // With visits 16 and interval ~0 at least one info line shows up.
        assert!(response.contains("info move"));
        assert!(response.contains("order 0"));
    }

    #[test]
    fn lz_analyze_streams_until_input() {
        let mut server = test_server();
        let response = run_cmd(&mut server, "lz-analyze b 1");
        assert!(response.starts_with("=\n"));
        assert!(response.ends_with("\n\n"));
    }

    #[test]
    fn final_score_empty_board_is_white_komi() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "final_score"), "= W+7.5\n\n");
    }

    #[test]
    fn komi_command_updates() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "komi 0.5"), "= \n\n");
        assert_eq!(run_cmd(&mut server, "final_score"), "= W+0.5\n\n");
    }

    #[test]
    fn fixed_handicap_lists_stones() {
        let mut server = test_server();
        let response = run_cmd(&mut server, "fixed_handicap 4");
        assert!(response.starts_with("= "));
        assert_eq!(response.trim_start_matches("= ").split_whitespace().count(), 4);
        assert_eq!(
            run_cmd(&mut server, "fixed_handicap 4"),
            "? Not a valid number of handicap stones\n\n"
        );
    }

    #[test]
    fn time_settings_accepted() {
        let mut server = test_server();
        assert_eq!(run_cmd(&mut server, "time_settings 600 30 5"), "= \n\n");
        assert_eq!(
            run_cmd(&mut server, "kgs-time_settings byoyomi 600 30 5"),
            "= \n\n"
        );
        assert_eq!(run_cmd(&mut server, "time_left b 550 0"), "= \n\n");
        assert_eq!(
            run_cmd(&mut server, "kgs-time_settings bogus"),
            "? syntax not understood\n\n"
        );
    }

    #[test]
    fn setoption_visits_and_ranges() {
        let mut server = test_server();
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name visits value 100"),
            "= \n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name lagbuffer value 5000"),
            "? incorrect value\n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name resign percentage value 31"),
            "? incorrect value\n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name resign percentage value -1"),
            "= \n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name bogus value 1"),
            "? Unknown option\n\n"
        );
    }

    #[test]
    fn setoption_playouts_conflicts_with_pondering() {
        let mut server = test_server();
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name playouts value 100"),
            "? incorrect value\n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name pondering value false"),
            "= \n\n"
        );
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name playouts value 100"),
            "= \n\n"
        );
        // And pondering cannot come back while playouts are limited.
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name pondering value true"),
            "? incorrect value\n\n"
        );
    }

    #[test]
    fn setoption_memory_range() {
        let mut server = test_server();
        assert_eq!(
            run_cmd(&mut server, "lz-setoption name maximum memory use (mib) value 64"),
            "? incorrect value\n\n"
        );
        let response = run_cmd(
            &mut server,
            "lz-setoption name maximum memory use (mib) value 1024",
        );
        assert!(response.starts_with("= Setting max tree size"));
    }

    #[test]
    fn memory_report_three_parts() {
        let mut server = test_server();
        let response = run_cmd(&mut server, "lz-memory_report");
        assert!(response.contains("Estimated total memory consumption"));
        assert!(response.contains("Search tree"));
        assert!(response.contains("Network cache"));
    }

    #[test]
    fn printsgf_and_loadsgf_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.sgf");
        let path_str = path.to_str().unwrap().to_string();

        let mut server = test_server();
        run_cmd(&mut server, "play b C3");
        run_cmd(&mut server, "play w K10");
        assert_eq!(
            run_cmd(&mut server, &format!("printsgf {}", path_str)),
            "= \n\n"
        );
        let expected = server.game.hash();

        let mut fresh = test_server();
        assert_eq!(
            run_cmd(&mut fresh, &format!("loadsgf {}", path_str)),
            "= \n\n"
        );
        assert_eq!(fresh.game.hash(), expected);
        assert_eq!(
            run_cmd(&mut fresh, "loadsgf /nonexistent/file.sgf"),
            "? cannot load file\n\n"
        );
    }

    #[test]
    fn undo_restores() {
        let mut server = test_server();
        run_cmd(&mut server, "play b C3");
        assert_eq!(run_cmd(&mut server, "undo"), "= \n\n");
        assert_eq!(server.game.movenum(), 0);
        assert_eq!(run_cmd(&mut server, "undo"), "? cannot undo\n\n");
    }

    #[test]
    fn quit_stops_session() {
        let mut server = test_server();
        let input = closed_input();
        assert!(!server.execute("quit", &input).unwrap());
    }

    #[test]
    fn final_status_list_alive_chains() {
        let mut server = test_server();
        run_cmd(&mut server, "play b C3");
        run_cmd(&mut server, "play w K10");
        let response = run_cmd(&mut server, "final_status_list alive");
        assert!(response.contains("C3"));
        assert!(response.contains("K10"));
        assert_eq!(run_cmd(&mut server, "final_status_list dead"), "= \n\n");
    }
}
