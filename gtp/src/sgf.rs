//! Minimal SGF reading and writing: enough to load a game's main line and
//! to dump the current game for the `printsgf` command.

use games_go::{Board, Color, GameState, BOARD_SIZE, PASS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SgfError {
    #[error("cannot load file")]
    Io(#[from] std::io::Error),
    #[error("cannot load file")]
    Malformed,
    #[error("cannot load file")]
    WrongBoardSize,
}

#[derive(Debug, Default)]
pub struct SgfGame {
    pub komi: f32,
    pub handicap: u32,
    pub setup_black: Vec<i32>,
    pub setup_white: Vec<i32>,
    pub moves: Vec<(Color, i32)>,
}

/// SGF point ("cc") to vertex. SGF rows count from the top.
fn point_to_vertex(value: &str) -> Option<i32> {
    if value.is_empty() || value == "tt" {
        return Some(PASS);
    }
    let bytes = value.as_bytes();
    if bytes.len() != 2 {
        return None;
    }
    let x = (bytes[0] as i32 - 'a' as i32) as isize;
    let row = (bytes[1] as i32 - 'a' as i32) as isize;
    if x < 0 || row < 0 || x as usize >= BOARD_SIZE || row as usize >= BOARD_SIZE {
        return None;
    }
    let y = BOARD_SIZE - 1 - row as usize;
    Some(Board::get_vertex(x as usize, y))
}

fn vertex_to_point(vertex: i32) -> String {
    if vertex == PASS {
        return String::new();
    }
    let (x, y) = Board::get_xy(vertex);
    let row = BOARD_SIZE - 1 - y;
    format!(
        "{}{}",
        (b'a' + x as u8) as char,
        (b'a' + row as u8) as char
    )
}

/// Parse the main line of an SGF game. Side variations are skipped.
pub fn parse(text: &str) -> Result<SgfGame, SgfError> {
    let mut game = SgfGame {
        komi: 7.5,
        ..SgfGame::default()
    };

    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    // One flag per open group: has a child branch been followed already?
    // The first child at each level is the main line; later siblings are
    // variations and get skipped wholesale.
    let mut frames: Vec<bool> = Vec::new();
    let mut seen_main = false;

    while i < chars.len() {
        match chars[i] {
            '(' => {
                if frames.last() == Some(&true) {
                    // Sibling variation: skip the balanced group.
                    let mut nest = 1;
                    i += 1;
                    while i < chars.len() && nest > 0 {
                        match chars[i] {
                            '(' => nest += 1,
                            ')' => nest -= 1,
                            '[' => {
                                // Property values may contain parens.
                                i += 1;
                                while i < chars.len() && chars[i] != ']' {
                                    if chars[i] == '\\' {
                                        i += 1;
                                    }
                                    i += 1;
                                }
                            }
                            _ => {}
                        }
                        i += 1;
                    }
                    continue;
                }
                if let Some(frame) = frames.last_mut() {
                    *frame = true;
                }
                frames.push(false);
                seen_main = true;
                i += 1;
            }
            ')' => {
                frames.pop();
                i += 1;
            }
            c if c.is_ascii_uppercase() => {
                // Property identifier, then one or more [value] blocks.
                let start = i;
                while i < chars.len() && chars[i].is_ascii_uppercase() {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let mut values = Vec::new();
                loop {
                    while i < chars.len() && chars[i].is_whitespace() {
                        i += 1;
                    }
                    if i >= chars.len() || chars[i] != '[' {
                        break;
                    }
                    i += 1;
                    let mut value = String::new();
                    while i < chars.len() && chars[i] != ']' {
                        if chars[i] == '\\' && i + 1 < chars.len() {
                            i += 1;
                        }
                        value.push(chars[i]);
                        i += 1;
                    }
                    i += 1; // closing bracket
                    values.push(value);
                }
                apply_property(&mut game, &ident, &values)?;
            }
            _ => i += 1,
        }
    }

    if !seen_main {
        return Err(SgfError::Malformed);
    }
    Ok(game)
}

fn apply_property(game: &mut SgfGame, ident: &str, values: &[String]) -> Result<(), SgfError> {
    let first = values.first().map(String::as_str).unwrap_or("");
    match ident {
        "SZ" => {
            let size: usize = first.parse().map_err(|_| SgfError::Malformed)?;
            if size != BOARD_SIZE {
                return Err(SgfError::WrongBoardSize);
            }
        }
        "KM" => {
            game.komi = first.parse().unwrap_or(7.5);
        }
        "HA" => {
            game.handicap = first.parse().unwrap_or(0);
        }
        "AB" => {
            for value in values {
                let v = point_to_vertex(value).ok_or(SgfError::Malformed)?;
                if v != PASS {
                    game.setup_black.push(v);
                }
            }
        }
        "AW" => {
            for value in values {
                let v = point_to_vertex(value).ok_or(SgfError::Malformed)?;
                if v != PASS {
                    game.setup_white.push(v);
                }
            }
        }
        "B" => {
            let v = point_to_vertex(first).ok_or(SgfError::Malformed)?;
            game.moves.push((Color::Black, v));
        }
        "W" => {
            let v = point_to_vertex(first).ok_or(SgfError::Malformed)?;
            game.moves.push((Color::White, v));
        }
        _ => {}
    }
    Ok(())
}

pub fn load_file(path: &str) -> Result<SgfGame, SgfError> {
    parse(&std::fs::read_to_string(path)?)
}

/// Rebuild a game state from a parsed SGF, replaying the main line up to
/// `max_moves`.
pub fn to_state(sgf: &SgfGame, max_moves: usize) -> GameState {
    let mut state = GameState::new(sgf.komi);
    for &v in &sgf.setup_black {
        state.place_stone(Color::Black, v);
    }
    for &v in &sgf.setup_white {
        state.place_stone(Color::White, v);
    }
    if sgf.handicap > 0 {
        state.set_handicap(sgf.handicap);
        state.set_to_move(Color::White);
    }
    for &(color, v) in sgf.moves.iter().take(max_moves) {
        if state.is_move_legal(color, v) {
            state.play_move(color, v);
        }
    }
    state
}

/// Serialize the current game as SGF.
pub fn from_state(state: &GameState) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "(;GM[1]FF[4]CA[UTF-8]AP[tengen]SZ[{}]KM[{}]",
        BOARD_SIZE,
        state.komi()
    ));
    if state.handicap() > 0 {
        out.push_str(&format!("HA[{}]", state.handicap()));
    }
    let setup = |want: Color| -> Vec<String> {
        state
            .setup_stones()
            .iter()
            .filter(|(c, _)| *c == want)
            .map(|(_, v)| format!("[{}]", vertex_to_point(*v)))
            .collect()
    };
    let black_setup = setup(Color::Black);
    if !black_setup.is_empty() {
        out.push_str(&format!("AB{}", black_setup.concat()));
    }
    let white_setup = setup(Color::White);
    if !white_setup.is_empty() {
        out.push_str(&format!("AW{}", white_setup.concat()));
    }

    // Replay the move list to recover colors: history stores vertices
    // only, and setup stones are not part of it.
    let mut color = if state.handicap() > 0 {
        Color::White
    } else {
        Color::Black
    };
    for &mv in state.move_history() {
        if mv == games_go::RESIGN {
            break;
        }
        let tag = match color {
            Color::Black => "B",
            Color::White => "W",
        };
        out.push_str(&format!(";{}[{}]", tag, vertex_to_point(mv)));
        color = color.opponent();
    }
    out.push(')');
    out
}
