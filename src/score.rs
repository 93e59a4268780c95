//! Final scoring from an ownership estimate.
//!
//! The analysis engine reports, per vertex, which color it expects to
//! control that point and with what confidence. Points claimed above
//! the configured confidence threshold form the "owned" set; comparing
//! it with the stones actually on the board separates settled
//! territory (owned points with no matching stone, including points
//! under dead enemy stones) from stones the estimate has written off.
//!
//! The sign convention (positive favors the perspective color,
//! conventionally Black) comes from the engine's reporting
//! configuration and is passed through untouched.

use std::collections::HashMap;

use crate::board::{BoardState, Color, Coord, Stone};
use crate::config::GameConfig;
use crate::error::Result;
use crate::record::Prisoners;

/// Area score for a finished position:
/// owned-but-vacant points, minus stones the ownership map declares
/// dead, minus komi, minus the prisoner difference.
pub fn final_score(
    ownership: &HashMap<String, (Color, f64)>,
    board: &BoardState,
    prisoners: &Prisoners,
    config: &GameConfig,
) -> Result<f64> {
    let mut owned = BoardState::new();
    for (vertex, (color, confidence)) in ownership {
        if *confidence > config.ownership_threshold {
            owned.insert(Stone {
                color: *color,
                coord: Coord::from_text(vertex, config.board_size)?,
            });
        }
    }

    // Claimed points with no matching stone: territory, plus the points
    // under enemy stones the estimate considers dead.
    let territory: i64 = owned.difference(board).map(signed).sum();
    // Stones on the board whose own color does not claim them.
    let dead: i64 = board.difference(&owned).map(signed).sum();

    Ok(territory as f64
        - dead as f64
        - config.komi
        - (prisoners.black_stones as f64 - prisoners.white_stones as f64))
}

fn signed(stone: &Stone) -> i64 {
    match stone.color {
        Color::Black => 1,
        Color::White => -1,
    }
}
