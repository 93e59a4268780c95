//! Wire types for the session's JSON line protocol.
//!
//! One JSON object per line in both directions. Inbound events come
//! from three collaborators and are told apart by shape: a board
//! observation carries `new_board_state`, an analysis response carries
//! `query_id`, anything else is a control command. Outbound messages
//! are single-key objects whose key names the channel a frontend
//! subscribes to (`graph`, `current_node`, `diff`, `error`, `message`,
//! `analysis_request`).
//!
//! Example exchange:
//!
//! ```text
//! -> {"new_board_state": [["B", "D4"]]}
//! <- {"analysis_request": {"query_id": 1, "moves": [["B", "D4"]]}}
//! <- {"current_node": {...}}
//! <- {"graph": [[...]]}
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::{BoardState, Color, Coord, Move, Stone};
use crate::config::Seats;
use crate::error::Result;
use crate::record::{NodeId, Prisoners};

/// A stone or move on the wire: color plus vertex text, `"pass"` for a
/// pass and `""` for the game-start placeholder.
pub type WireMove = (Color, String);

/// The wire form of a move.
pub fn wire_move(mv: &Move) -> WireMove {
    (mv.color(), mv.vertex())
}

/// The wire form of a stone.
pub fn wire_stone(stone: &Stone) -> WireMove {
    (stone.color, stone.coord.text())
}

/// A stone set as a sorted wire list, for stable output.
pub fn wire_stones(stones: &BoardState) -> Vec<WireMove> {
    let mut sorted: Vec<&Stone> = stones.iter().collect();
    sorted.sort();
    sorted.into_iter().map(wire_stone).collect()
}

/// A complete sensor snapshot of the physical board.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardObservation {
    pub new_board_state: Vec<WireMove>,
}

impl BoardObservation {
    /// Parse the observed stones against the configured board size.
    pub fn board_state(&self, size: usize) -> Result<BoardState> {
        self.new_board_state
            .iter()
            .map(|(color, vertex)| {
                Ok(Stone {
                    color: *color,
                    coord: Coord::from_text(vertex, size)?,
                })
            })
            .collect()
    }
}

/// A query for the analysis engine: the full move list from the game
/// start to the node identified by `query_id`, passes included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub query_id: NodeId,
    pub moves: Vec<WireMove>,
}

/// One ranked candidate move in an analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMove {
    #[serde(rename = "move")]
    pub vertex: String,
    /// Estimated score delta relative to the engine's top choice.
    pub score_change: f64,
}

/// The analysis payload attached to a move node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// The engine's suggested next move.
    #[serde(default)]
    pub next_ai_move: Option<WireMove>,
    /// Estimated score as reported, e.g. `"4.5"`.
    #[serde(default)]
    pub estimated_score: String,
    /// Ranked candidate moves with score deltas.
    #[serde(default)]
    pub moves: Vec<CandidateMove>,
    /// Per-vertex ownership estimate: controlling color and confidence
    /// in `[0, 1]`.
    #[serde(default)]
    pub ownership: HashMap<String, (Color, f64)>,
}

/// An analysis engine response, successful or not.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    pub query_id: NodeId,
    /// Present when the engine rejected the query.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub analysis: Analysis,
}

/// A control command from the outside (reviewer UI, buttons).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Control {
    /// Start a fresh game with the given seat assignment.
    #[serde(default)]
    pub new_game: Option<Seats>,
    /// Navigate the review pointer to this node.
    #[serde(default)]
    pub current_nid: Option<NodeId>,
    /// Record a pass for the side to move.
    #[serde(default, rename = "pass")]
    pub pass_turn: bool,
    /// Re-emit the current graph and node payloads.
    #[serde(default)]
    pub refresh_data: bool,
}

/// Any inbound event. Variants are tried in order, so the two shapes
/// with required fields must come before the catch-all control command.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Observation(BoardObservation),
    Analysis(AnalysisResponse),
    Control(Control),
}

/// One move entry in the tree projection handed to frontends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphMove {
    #[serde(rename = "move")]
    pub mv: WireMove,
    /// The estimated score attached to this node.
    pub score: String,
    /// Sibling alternatives, cyclically ordered by vertex text starting
    /// just past this node.
    pub variations: Vec<NodeId>,
    pub is_current_move: bool,
    pub identifier: NodeId,
}

/// The payload describing the node under review.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentNode {
    #[serde(rename = "move")]
    pub mv: WireMove,
    pub captured_stones: Vec<WireMove>,
    pub prisoners: Prisoners,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

/// Stones to add and lift to bring the physical board back in line
/// with the game record.
#[derive(Debug, Clone, Serialize)]
pub struct BoardDiff {
    pub to_add: Vec<WireMove>,
    pub to_remove: Vec<WireMove>,
}

/// Any outbound message. Serializes as a single-key object whose key
/// is the channel name.
#[derive(Debug, Clone, Serialize)]
pub enum Outbound {
    #[serde(rename = "analysis_request")]
    AnalysisRequest(AnalysisRequest),
    #[serde(rename = "graph")]
    Graph(Vec<Vec<GraphMove>>),
    #[serde(rename = "current_node")]
    CurrentNode(CurrentNode),
    #[serde(rename = "diff")]
    Diff(BoardDiff),
    #[serde(rename = "error")]
    Error(String),
    #[serde(rename = "message")]
    Message(String),
}
