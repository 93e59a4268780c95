//! Runtime configuration for a game session.
//!
//! Everything here can be overridden from a JSON config file passed to
//! the binary; unspecified fields keep their defaults.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Color;

/// Who controls a color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Seat {
    Human,
    #[serde(rename = "AI")]
    Ai,
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::Human => write!(f, "Human"),
            Seat::Ai => write!(f, "AI"),
        }
    }
}

/// Seat assignment for both colors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seats {
    #[serde(rename = "player_b")]
    pub black: Seat,
    #[serde(rename = "player_w")]
    pub white: Seat,
}

impl Seats {
    pub fn seat(&self, color: Color) -> Seat {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }
}

impl Default for Seats {
    fn default() -> Self {
        Seats { black: Seat::Human, white: Seat::Human }
    }
}

/// Game parameters.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Grid size N for an NxN board.
    pub board_size: usize,
    /// Scoring compensation for the second player.
    pub komi: f64,
    /// Minimum ownership confidence for a point to count as settled
    /// when scoring.
    pub ownership_threshold: f64,
    /// The color a positive score favors. This follows the analysis
    /// engine's reporting convention; nothing internal depends on it.
    pub score_perspective: Color,
    /// Who controls each color.
    pub players: Seats,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            board_size: 19,
            komi: 6.5,
            ownership_threshold: 0.9,
            score_perspective: Color::Black,
            players: Seats::default(),
        }
    }
}
