//! Board data model and coordinate mapping.
//!
//! Vertices use the Go convention: column letters `A`-`T` skipping `I`
//! (to avoid confusion with `J`), row numbers starting at 1 on the
//! bottom row. Internally coordinates are 0-based `(col, row)` pairs
//! with row 0 at the bottom, so the text form is orientation-stable no
//! matter how a caller lays out its own arrays.
//!
//! A board state is simply a set of stones; it is always derived by
//! replaying a move path, never edited in place.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Column letters in board order. `I` is skipped by convention.
pub const COLUMNS: &[u8] = b"ABCDEFGHJKLMNOPQRST";

/// Stone color. Serializes as `"B"` / `"W"` on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    #[serde(rename = "B")]
    Black,
    #[serde(rename = "W")]
    White,
}

impl Color {
    /// The opposing color.
    pub fn other(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "B"),
            Color::White => write!(f, "W"),
        }
    }
}

/// A point on the board: 0-based column and row, row 0 at the bottom.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub col: u8,
    pub row: u8,
}

impl Coord {
    /// Parse a vertex like `"D4"` against a board of the given size.
    ///
    /// # Errors
    /// [`GameError::InvalidCoordinate`] for malformed text, the skipped
    /// letter `I`, or a vertex outside the board.
    pub fn from_text(s: &str, size: usize) -> Result<Coord> {
        let err = || GameError::InvalidCoordinate(s.to_string());
        let cols = &COLUMNS[..size.min(COLUMNS.len())];

        let mut chars = s.chars();
        let letter = chars.next().ok_or_else(err)?.to_ascii_uppercase();
        let col = cols
            .iter()
            .position(|&c| c as char == letter)
            .ok_or_else(err)?;

        let row: usize = chars.as_str().parse().map_err(|_| err())?;
        if row == 0 || row > size {
            return Err(err());
        }

        Ok(Coord {
            col: col as u8,
            row: (row - 1) as u8,
        })
    }

    /// The vertex text, e.g. `"D4"`.
    pub fn text(&self) -> String {
        format!("{}{}", COLUMNS[self.col as usize] as char, self.row + 1)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// The up-to-4 orthogonal neighbors of a point, clipped to the board.
pub fn neighbors(coord: Coord, size: usize) -> Vec<Coord> {
    let (c, r) = (coord.col as usize, coord.row as usize);
    let mut v = Vec::with_capacity(4);
    if c > 0 {
        v.push(Coord { col: coord.col - 1, row: coord.row });
    }
    if c + 1 < size {
        v.push(Coord { col: coord.col + 1, row: coord.row });
    }
    if r > 0 {
        v.push(Coord { col: coord.col, row: coord.row - 1 });
    }
    if r + 1 < size {
        v.push(Coord { col: coord.col, row: coord.row + 1 });
    }
    v
}

/// A colored stone on a point. At most one stone per coordinate in any
/// board state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stone {
    pub color: Color,
    pub coord: Coord,
}

/// The set of stones currently on the board.
pub type BoardState = HashSet<Stone>;

/// A recorded move.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Move {
    /// Root placeholder: the empty board before any move.
    Start,
    /// A turn spent without placing a stone.
    Pass(Color),
    /// A stone placed on the board.
    Place(Stone),
}

impl Move {
    /// The color that made the move. The start placeholder counts as
    /// White so that Black opens the game.
    pub fn color(&self) -> Color {
        match self {
            Move::Start => Color::White,
            Move::Pass(color) => *color,
            Move::Place(stone) => stone.color,
        }
    }

    /// The vertex text: `""` for start, `"pass"` for a pass.
    pub fn vertex(&self) -> String {
        match self {
            Move::Start => String::new(),
            Move::Pass(_) => "pass".to_string(),
            Move::Place(stone) => stone.coord.text(),
        }
    }

    /// The placed stone, if any. Passes and the start placeholder put
    /// nothing on the board.
    pub fn placement(&self) -> Option<Stone> {
        match self {
            Move::Place(stone) => Some(*stone),
            _ => None,
        }
    }
}

/// Human-readable listing of a stone set, sorted for stable output.
pub fn describe(stones: &BoardState) -> String {
    let mut items: Vec<&Stone> = stones.iter().collect();
    items.sort();
    let texts: Vec<String> = items
        .iter()
        .map(|s| format!("{} {}", s.color, s.coord))
        .collect();
    texts.join(", ")
}

/// ASCII diagram of a board state: `#` for Black, `o` for White.
/// Rows are printed top-down with a column footer.
pub fn render(state: &BoardState, size: usize) -> String {
    let cols = &COLUMNS[..size.min(COLUMNS.len())];
    let mut lines = Vec::with_capacity(size + 1);

    for row in (0..size).rev() {
        let cells: Vec<&str> = (0..size)
            .map(|col| {
                let coord = Coord { col: col as u8, row: row as u8 };
                if state.contains(&Stone { color: Color::Black, coord }) {
                    " #"
                } else if state.contains(&Stone { color: Color::White, coord }) {
                    " o"
                } else {
                    " ."
                }
            })
            .collect();
        lines.push(format!("{:2} {}", row + 1, cells.join(" ")));
    }

    let footer: Vec<String> = cols.iter().map(|&c| (c as char).to_string()).collect();
    lines.push(format!("    {}", footer.join("  ")));
    lines.join("\n")
}
