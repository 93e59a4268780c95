//! Capture rules: groups, liberties, and capture detection.
//!
//! All three functions are pure: they take a board state snapshot and
//! never mutate anything. Connectivity is computed with an explicit
//! worklist rather than recursion so a full-board group on a large grid
//! cannot exhaust the call stack.
//!
//! Self-capture is deliberately not rejected here. Legality of the
//! placement itself is the caller's concern; this module only answers
//! which opposing stones a placement removes.

use std::collections::HashSet;

use crate::board::{BoardState, Coord, Move, Stone, neighbors};

/// The maximal set of same-color stones connected to `origin` through
/// orthogonal adjacency. Empty if `origin` is not on the board.
pub fn group(origin: Stone, state: &BoardState, size: usize) -> HashSet<Stone> {
    let mut members = HashSet::new();
    if !state.contains(&origin) {
        return members;
    }

    let mut work = vec![origin];
    while let Some(stone) = work.pop() {
        if !members.insert(stone) {
            continue;
        }
        for coord in neighbors(stone.coord, size) {
            let friend = Stone { color: stone.color, coord };
            if state.contains(&friend) && !members.contains(&friend) {
                work.push(friend);
            }
        }
    }
    members
}

/// The liberties of a group: every empty point orthogonally adjacent to
/// any of its stones. A group with no liberties is captured.
pub fn liberties(group: &HashSet<Stone>, state: &BoardState, size: usize) -> HashSet<Coord> {
    let occupied: HashSet<Coord> = state.iter().map(|s| s.coord).collect();

    let mut libs = HashSet::new();
    for stone in group {
        for coord in neighbors(stone.coord, size) {
            if !occupied.contains(&coord) {
                libs.insert(coord);
            }
        }
    }
    libs
}

/// The stones a move captures, evaluated with the placed stone already
/// on the board. Each opposite-color neighbor group that ends up with
/// no liberties is captured whole. Passes capture nothing.
pub fn captured_by(mv: &Move, state: &BoardState, size: usize) -> HashSet<Stone> {
    let mut captured = HashSet::new();
    let Some(placed) = mv.placement() else {
        return captured;
    };

    let mut after = state.clone();
    after.insert(placed);

    for coord in neighbors(placed.coord, size) {
        let enemy = Stone { color: placed.color.other(), coord };
        if !after.contains(&enemy) || captured.contains(&enemy) {
            continue;
        }
        let members = group(enemy, &after, size);
        if liberties(&members, &after, size).is_empty() {
            captured.extend(members);
        }
    }
    captured
}
