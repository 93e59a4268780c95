//! The branching game record.
//!
//! Moves live in an arena of nodes addressed by stable ids; the root is
//! a placeholder for the empty board and one pointer marks the node
//! under review. Recording a move that a child already holds navigates
//! to that child instead of duplicating it, which makes replaying a
//! known line free and keeps variations unique among siblings.
//!
//! Everything observable about a position (the board state, prisoner
//! tally, side to move, game-over flag, the tree projection for
//! frontends) is derived on demand from the path between the root and
//! the current node. A node's captured-stone set and prisoner tally
//! are computed once when the node is created and never change
//! afterwards, so replaying a path is a pure fold.
//!
//! Analysis results arrive asynchronously and are keyed by node id. A
//! response for a node that has since been pruned is discarded; an
//! engine failure removes the node it refers to (and any descendants),
//! rolling the record back to the position before the rejected move.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{BoardState, Color, Move};
use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::protocol::{Analysis, AnalysisRequest, AnalysisResponse, GraphMove, wire_move};
use crate::rules;
use crate::score;

/// Stable identity of a move node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cumulative capture tally along a path: how many stones of each
/// color have been taken off the board.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prisoners {
    pub black_stones: u32,
    pub white_stones: u32,
}

/// One node of the record: a move, the stones it captured, and the
/// running prisoner tally at that point.
#[derive(Debug, Clone)]
pub struct MoveNode {
    pub id: NodeId,
    pub mv: Move,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Stones removed by this move. Fixed at creation.
    pub captured: BoardState,
    /// Cumulative tally including this move's captures. Fixed at creation.
    pub prisoners: Prisoners,
    /// Engine analysis, attached at most once when the response lands.
    pub analysis: Option<Analysis>,
}

/// The authoritative move tree.
pub struct GameRecord {
    config: GameConfig,
    nodes: HashMap<NodeId, MoveNode>,
    root: NodeId,
    current: NodeId,
    next_id: u64,
}

impl GameRecord {
    /// A fresh record holding only the game-start placeholder.
    pub fn new(config: GameConfig) -> Self {
        let root = NodeId(0);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            MoveNode {
                id: root,
                mv: Move::Start,
                parent: None,
                children: Vec::new(),
                captured: BoardState::new(),
                prisoners: Prisoners::default(),
                analysis: None,
            },
        );
        GameRecord { config, nodes, root, current: root, next_id: 1 }
    }

    /// The analysis query for the empty starting position.
    pub fn start_request(&self) -> AnalysisRequest {
        self.analysis_request(self.root)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn node(&self, id: NodeId) -> Option<&MoveNode> {
        self.nodes.get(&id)
    }

    pub fn current_node(&self) -> &MoveNode {
        &self.nodes[&self.current]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Record a move as a child of the current node and make it
    /// current. If an equal move is already among the children this
    /// only navigates and no new analysis is needed; otherwise the
    /// query for the freshly created node is returned so the caller
    /// can forward it to the engine.
    pub fn record_move(&mut self, mv: Move) -> Option<AnalysisRequest> {
        let existing = self.nodes[&self.current]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[id].mv == mv);
        if let Some(child) = existing {
            self.current = child;
            return None;
        }

        let state = self.board_state();
        let captured = rules::captured_by(&mv, &state, self.config.board_size);
        let mut prisoners = self.nodes[&self.current].prisoners;
        prisoners.black_stones +=
            captured.iter().filter(|s| s.color == Color::Black).count() as u32;
        prisoners.white_stones +=
            captured.iter().filter(|s| s.color == Color::White).count() as u32;

        let id = NodeId(self.next_id);
        self.next_id += 1;
        let parent = self.current;
        self.nodes.insert(
            id,
            MoveNode {
                id,
                mv,
                parent: Some(parent),
                children: Vec::new(),
                captured,
                prisoners,
                analysis: None,
            },
        );
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        self.current = id;
        Some(self.analysis_request(id))
    }

    /// Move the review pointer to a node.
    pub fn set_current(&mut self, id: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&id) {
            return Err(GameError::UnknownNode(id));
        }
        self.current = id;
        Ok(())
    }

    /// Attach an analysis result, or roll back a rejected move.
    ///
    /// An engine failure removes the referenced node and its whole
    /// subtree before the error surfaces; the current pointer falls
    /// back to the node's parent if it was inside. Responses for
    /// already-pruned nodes are stale and silently discarded.
    pub fn set_analysis(&mut self, response: AnalysisResponse) -> Result<()> {
        if let Some(error) = response.error {
            if self.nodes.contains_key(&response.query_id) {
                self.remove_subtree(response.query_id);
                return Err(GameError::Engine(error));
            }
            log::debug!("discarding engine error for pruned node {}", response.query_id);
            return Ok(());
        }
        match self.nodes.get_mut(&response.query_id) {
            Some(node) => node.analysis = Some(response.analysis),
            None => log::debug!("discarding stale analysis for node {}", response.query_id),
        }
        Ok(())
    }

    /// Step the pointer up `x` ancestors without deleting anything.
    pub fn undo_last_x(&mut self, x: usize) -> Result<()> {
        let mut target = self.current;
        for _ in 0..x {
            target = self.nodes[&target]
                .parent
                .ok_or_else(|| GameError::UndoNotFound(format!("{x} moves")))?;
        }
        self.current = target;
        Ok(())
    }

    /// Step the pointer up `x` ancestors and discard every branch below
    /// the new current node.
    pub fn remove_last_x(&mut self, x: usize) -> Result<()> {
        self.undo_last_x(x)?;
        for child in self.nodes[&self.current].children.clone() {
            self.remove_subtree(child);
        }
        Ok(())
    }

    /// Undo whatever trailing stretch of moves put exactly `target` on
    /// the board. Window sizes from `target.len()` up to the current
    /// depth are tried; a window matches when its placements, minus
    /// every stone captured anywhere on the path, equal `target`.
    pub fn undo_stones(&mut self, target: &BoardState) -> Result<()> {
        match self.matching_undo_depth(target) {
            Some(x) => self.undo_last_x(x),
            None => Err(GameError::UndoNotFound(crate::board::describe(target))),
        }
    }

    fn matching_undo_depth(&self, target: &BoardState) -> Option<usize> {
        let moves = self.all_moves();
        let captured = self.path_captures();
        let depth = moves.len();

        for x in target.len()..=depth {
            let mut window: BoardState =
                moves[depth - x..].iter().filter_map(Move::placement).collect();
            window.retain(|stone| !captured.contains(stone));
            if window == *target {
                return Some(x);
            }
        }
        None
    }

    // ------------------------------------------------------------------
    // Derived views. All pure functions of (nodes, current).
    // ------------------------------------------------------------------

    /// The board at the current node: every placement on the path from
    /// the root, minus every stone captured along it.
    pub fn board_state(&self) -> BoardState {
        let mut state = BoardState::new();
        for id in &self.path_to(self.current)[1..] {
            let node = &self.nodes[id];
            if let Some(stone) = node.mv.placement() {
                state.insert(stone);
            }
            for stone in &node.captured {
                state.remove(stone);
            }
        }
        state
    }

    /// The prisoner tally at the current node.
    pub fn prisoners(&self) -> Prisoners {
        self.nodes[&self.current].prisoners
    }

    /// The move that produced the current node.
    pub fn last_move(&self) -> Move {
        self.nodes[&self.current].mv
    }

    /// The side to move: the opponent of whoever moved last.
    pub fn current_player(&self) -> Color {
        self.last_move().color().other()
    }

    /// Moves already explored from the current node.
    pub fn next_moves(&self) -> Vec<Move> {
        self.nodes[&self.current]
            .children
            .iter()
            .map(|id| self.nodes[id].mv)
            .collect()
    }

    /// The game ends when the last two moves on the path are passes.
    pub fn game_over(&self) -> bool {
        let moves = self.all_moves();
        moves.len() >= 2
            && moves[moves.len() - 2..]
                .iter()
                .all(|mv| matches!(mv, Move::Pass(_)))
    }

    /// All moves from the game start to the current node, in order.
    pub fn all_moves(&self) -> Vec<Move> {
        self.path_to(self.current)[1..]
            .iter()
            .map(|id| self.nodes[id].mv)
            .collect()
    }

    /// The tree projection for frontends: one row per root-to-leaf
    /// path, one entry per analyzed node past the root. A row stops at
    /// the first node still waiting for analysis.
    pub fn graph_data(&self) -> Vec<Vec<GraphMove>> {
        self.paths_to_leaves()
            .into_iter()
            .map(|path| {
                path[1..]
                    .iter()
                    .map_while(|id| {
                        let node = &self.nodes[id];
                        let analysis = node.analysis.as_ref()?;
                        Some(GraphMove {
                            mv: wire_move(&node.mv),
                            score: analysis.estimated_score.clone(),
                            variations: self.variations(*id),
                            is_current_move: *id == self.current,
                            identifier: *id,
                        })
                    })
                    .collect()
            })
            .collect()
    }

    /// The score of the finished game from the current node's ownership
    /// estimate, or `None` while no analysis is attached.
    pub fn final_score(&self) -> Result<Option<f64>> {
        let Some(analysis) = self.current_node().analysis.as_ref() else {
            return Ok(None);
        };
        if analysis.ownership.is_empty() {
            return Ok(None);
        }
        score::final_score(
            &analysis.ownership,
            &self.board_state(),
            &self.prisoners(),
            &self.config,
        )
        .map(Some)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn analysis_request(&self, id: NodeId) -> AnalysisRequest {
        let moves = self.path_to(id)[1..]
            .iter()
            .map(|nid| wire_move(&self.nodes[nid].mv))
            .collect();
        AnalysisRequest { query_id: id, moves }
    }

    /// Node ids from the root to `id`, inclusive.
    fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.nodes[&id].parent;
        }
        path.reverse();
        path
    }

    /// Every stone captured anywhere on the path to the current node.
    fn path_captures(&self) -> BoardState {
        self.path_to(self.current)[1..]
            .iter()
            .flat_map(|id| self.nodes[id].captured.iter().copied())
            .collect()
    }

    /// Root-to-leaf paths in depth-first order.
    fn paths_to_leaves(&self) -> Vec<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![vec![self.root]];
        while let Some(path) = stack.pop() {
            let node = &self.nodes[path.last().unwrap_or(&self.root)];
            if node.children.is_empty() {
                out.push(path);
                continue;
            }
            for &child in node.children.iter().rev() {
                let mut next = path.clone();
                next.push(child);
                stack.push(next);
            }
        }
        out
    }

    /// Sibling alternatives of a node, cyclically ordered by vertex
    /// text starting just past the node itself.
    fn variations(&self, id: NodeId) -> Vec<NodeId> {
        let Some(parent) = self.nodes[&id].parent else {
            return Vec::new();
        };
        let mut siblings = self.nodes[&parent].children.clone();
        siblings.sort_by_key(|sid| self.nodes[sid].mv.vertex());
        if let Some(pos) = siblings.iter().position(|&sid| sid == id) {
            siblings.rotate_left(pos);
        }
        siblings.split_off(1)
    }

    /// Detach `id` from its parent and drop it with all descendants.
    /// The root placeholder is never removed.
    fn remove_subtree(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|&child| child != id);
        }

        let mut doomed = Vec::new();
        let mut work = vec![id];
        while let Some(nid) = work.pop() {
            if let Some(node) = self.nodes.get(&nid) {
                work.extend(node.children.iter().copied());
            }
            doomed.push(nid);
        }
        if doomed.contains(&self.current) {
            self.current = parent;
        }
        for nid in doomed {
            self.nodes.remove(&nid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Coord, Stone};
    use crate::protocol::CandidateMove;

    use Color::{Black, White};

    const SIZE: usize = 9;

    fn record() -> GameRecord {
        GameRecord::new(GameConfig { board_size: SIZE, ..GameConfig::default() })
    }

    fn stone(color: Color, vertex: &str) -> Stone {
        Stone { color, coord: Coord::from_text(vertex, SIZE).unwrap() }
    }

    fn place(color: Color, vertex: &str) -> Move {
        Move::Place(stone(color, vertex))
    }

    fn play(record: &mut GameRecord, moves: &[(Color, &str)]) {
        for &(color, vertex) in moves {
            record.record_move(place(color, vertex));
        }
    }

    fn analysis(score: &str) -> Analysis {
        Analysis { estimated_score: score.to_string(), ..Analysis::default() }
    }

    /// Classic surround: Black captures White D4 on the last move.
    const CAPTURE_GAME: &[(Color, &str)] = &[
        (Black, "C4"),
        (White, "D4"),
        (Black, "E4"),
        (White, "G7"),
        (Black, "D3"),
        (White, "G6"),
        (Black, "D5"),
    ];

    #[test]
    fn test_new_record_has_start_placeholder() {
        let record = record();
        assert_eq!(record.node_count(), 1);
        assert_eq!(record.last_move(), Move::Start);
        assert_eq!(record.current_player(), Black);
        assert!(record.board_state().is_empty());
        assert_eq!(record.start_request().moves, vec![]);
    }

    #[test]
    fn test_record_move_returns_request_with_full_path() {
        let mut record = record();
        let r1 = record.record_move(place(Black, "D4")).unwrap();
        assert_eq!(r1.moves, vec![(Black, "D4".to_string())]);

        record.record_move(Move::Pass(White));
        let r3 = record.record_move(place(Black, "C3")).unwrap();
        assert_eq!(
            r3.moves,
            vec![
                (Black, "D4".to_string()),
                (White, "pass".to_string()),
                (Black, "C3".to_string()),
            ]
        );
    }

    #[test]
    fn test_record_move_twice_navigates_instead_of_duplicating() {
        let mut record = record();
        let first = record.record_move(place(Black, "D4"));
        assert!(first.is_some());
        let node = record.current();

        record.undo_last_x(1).unwrap();
        let second = record.record_move(place(Black, "D4"));
        assert!(second.is_none(), "replay must not request analysis again");
        assert_eq!(record.current(), node);
        assert_eq!(record.node_count(), 2);
    }

    #[test]
    fn test_capture_updates_board_and_prisoners() {
        let mut record = record();
        play(&mut record, CAPTURE_GAME);

        let state = record.board_state();
        assert!(!state.contains(&stone(White, "D4")), "captured stone must be gone");
        assert_eq!(state.len(), 6);
        assert_eq!(
            record.prisoners(),
            Prisoners { black_stones: 0, white_stones: 1 }
        );
        assert_eq!(record.current_player(), White);
    }

    #[test]
    fn test_replay_invariant() {
        // Board equals union of placements minus union of captures
        let mut record = record();
        play(&mut record, CAPTURE_GAME);

        let mut expected: BoardState =
            CAPTURE_GAME.iter().map(|&(c, v)| stone(c, v)).collect();
        expected.remove(&stone(White, "D4"));
        assert_eq!(record.board_state(), expected);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut record = record();
        play(&mut record, CAPTURE_GAME);
        let state = record.board_state();
        let nodes = record.node_count();

        record.undo_last_x(2).unwrap();
        assert_ne!(record.board_state(), state);

        play(&mut record, &CAPTURE_GAME[CAPTURE_GAME.len() - 2..]);
        assert_eq!(record.board_state(), state);
        assert_eq!(record.node_count(), nodes, "redo must reuse existing nodes");
    }

    #[test]
    fn test_undo_past_root_fails_closed() {
        let mut record = record();
        play(&mut record, &[(Black, "D4")]);
        let current = record.current();

        assert!(matches!(record.undo_last_x(5), Err(GameError::UndoNotFound(_))));
        assert_eq!(record.current(), current, "failed undo must not move the pointer");
    }

    #[test]
    fn test_remove_last_x_discards_branch() {
        let mut record = record();
        play(&mut record, &[(Black, "D4"), (White, "G6"), (Black, "C3")]);

        record.remove_last_x(2).unwrap();
        assert_eq!(record.node_count(), 2);
        assert_eq!(record.all_moves(), vec![place(Black, "D4")]);
        assert!(record.next_moves().is_empty());
    }

    #[test]
    fn test_undo_stones_matches_trailing_moves() {
        let mut record = record();
        play(&mut record, &[(Black, "D4"), (White, "F6"), (Black, "C3")]);

        let target: BoardState = [stone(White, "F6"), stone(Black, "C3")].into();
        record.undo_stones(&target).unwrap();
        assert_eq!(record.all_moves(), vec![place(Black, "D4")]);
    }

    #[test]
    fn test_undo_stones_rejects_unmatched_set() {
        let mut record = record();
        play(&mut record, &[(Black, "D4"), (White, "F6")]);

        let target: BoardState = [stone(Black, "C3")].into();
        assert!(matches!(
            record.undo_stones(&target),
            Err(GameError::UndoNotFound(_))
        ));
        assert_eq!(record.all_moves().len(), 2);
    }

    #[test]
    fn test_undo_stones_skips_captured_stones() {
        // Lifting only the capturing stone must match even though the
        // captured White stone also left the board on that move.
        let mut record = record();
        play(&mut record, CAPTURE_GAME);

        let target: BoardState = [stone(Black, "D5")].into();
        record.undo_stones(&target).unwrap();
        assert_eq!(record.all_moves().len(), CAPTURE_GAME.len() - 1);
        assert!(record.board_state().contains(&stone(White, "D4")));
    }

    #[test]
    fn test_set_analysis_attaches_once() {
        let mut record = record();
        let request = record.record_move(place(Black, "D4")).unwrap();

        record
            .set_analysis(AnalysisResponse {
                query_id: request.query_id,
                error: None,
                analysis: analysis("1.5"),
            })
            .unwrap();
        let attached = record.current_node().analysis.as_ref().unwrap();
        assert_eq!(attached.estimated_score, "1.5");
    }

    #[test]
    fn test_set_analysis_stale_id_is_noop() {
        let mut record = record();
        play(&mut record, &[(Black, "D4")]);

        let result = record.set_analysis(AnalysisResponse {
            query_id: NodeId(99),
            error: None,
            analysis: analysis("0.0"),
        });
        assert_eq!(result, Ok(()));
        assert_eq!(record.node_count(), 2);
    }

    #[test]
    fn test_engine_error_rolls_back_subtree() {
        let mut record = record();
        let request = record.record_move(place(Black, "D4")).unwrap();
        let child = record.record_move(place(White, "F6")).unwrap();

        let result = record.set_analysis(AnalysisResponse {
            query_id: request.query_id,
            error: Some("illegal move".to_string()),
            analysis: Analysis::default(),
        });
        assert!(matches!(result, Err(GameError::Engine(_))));
        assert_eq!(record.node_count(), 1, "node and descendants must be gone");
        assert_eq!(record.last_move(), Move::Start);

        // A late response for the pruned child is stale, not an error
        let late = record.set_analysis(AnalysisResponse {
            query_id: child.query_id,
            error: None,
            analysis: analysis("0.5"),
        });
        assert_eq!(late, Ok(()));
        let late_error = record.set_analysis(AnalysisResponse {
            query_id: child.query_id,
            error: Some("gone".to_string()),
            analysis: Analysis::default(),
        });
        assert_eq!(late_error, Ok(()));
    }

    #[test]
    fn test_game_over_after_two_passes() {
        let mut record = record();
        play(&mut record, &[(Black, "D4")]);
        assert!(!record.game_over());

        record.record_move(Move::Pass(White));
        assert!(!record.game_over());
        record.record_move(Move::Pass(Black));
        assert!(record.game_over());

        // Navigating back re-derives the flag
        record.undo_last_x(1).unwrap();
        assert!(!record.game_over());
    }

    #[test]
    fn test_graph_data_truncates_unanalyzed_tail() {
        let mut record = record();
        let r1 = record.record_move(place(Black, "D4")).unwrap();
        record.record_move(place(White, "F6"));

        let graph = record.graph_data();
        assert_eq!(graph, vec![vec![]], "no analysis yet, row must be empty");

        record
            .set_analysis(AnalysisResponse {
                query_id: r1.query_id,
                error: None,
                analysis: analysis("2.0"),
            })
            .unwrap();
        let graph = record.graph_data();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph[0].len(), 1, "row stops at the unanalyzed child");
        assert_eq!(graph[0][0].mv, (Black, "D4".to_string()));
        assert_eq!(graph[0][0].score, "2.0");
        assert!(!graph[0][0].is_current_move);
    }

    #[test]
    fn test_graph_variations_cycle_from_node() {
        let mut record = record();
        let ids: Vec<NodeId> = ["C3", "D4", "E5"]
            .iter()
            .map(|vertex| {
                let request = record.record_move(place(Black, vertex)).unwrap();
                record
                    .set_analysis(AnalysisResponse {
                        query_id: request.query_id,
                        error: None,
                        analysis: analysis("0.0"),
                    })
                    .unwrap();
                record.undo_last_x(1).unwrap();
                request.query_id
            })
            .collect();
        let (c3, d4, e5) = (ids[0], ids[1], ids[2]);

        record.set_current(d4).unwrap();
        let graph = record.graph_data();
        assert_eq!(graph.len(), 3, "one row per leaf");

        let d4_row: Vec<&GraphMove> = graph
            .iter()
            .flatten()
            .filter(|entry| entry.identifier == d4)
            .collect();
        assert_eq!(d4_row[0].variations, vec![e5, c3], "cyclic order past D4");
        assert!(d4_row[0].is_current_move);
    }

    #[test]
    fn test_final_score_requires_ownership() {
        let mut record = record();
        let request = record.record_move(place(Black, "D4")).unwrap();
        assert_eq!(record.final_score(), Ok(None));

        record
            .set_analysis(AnalysisResponse {
                query_id: request.query_id,
                error: None,
                analysis: Analysis {
                    estimated_score: "7.5".to_string(),
                    moves: vec![CandidateMove { vertex: "C3".to_string(), score_change: 0.0 }],
                    ownership: [("D4".to_string(), (Black, 0.99))].into(),
                    ..Analysis::default()
                },
            })
            .unwrap();
        // Lone black stone claimed by Black: only komi and prisoners count
        assert_eq!(record.final_score(), Ok(Some(-6.5)));
    }
}
