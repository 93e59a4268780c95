//! The game session event loop.
//!
//! Reads one JSON event per line from stdin and writes channel-keyed
//! JSON messages to stdout, one per line. Collaborators sit on the far
//! side of both streams: the board driver sends snapshots, the engine
//! wrapper sends analysis responses and consumes analysis requests,
//! reviewer frontends send control commands and consume graph, node
//! and diff payloads.
//!
//! The loop is strictly synchronous: one inbound event is handled to
//! completion before the next is read, so the record and reconciler
//! never see interleaved mutations.
//!
//! ## Event shapes
//!
//! - `{"new_board_state": [["B","D4"], ...]}` - sensor snapshot
//! - `{"query_id": n, ...}` - analysis response (or engine error)
//! - `{"pass": true}` - record a pass for the side to move
//! - `{"current_nid": n}` - navigate the review pointer
//! - `{"new_game": {"player_b": "Human", "player_w": "AI"}}` - restart
//! - `{"refresh_data": true}` - re-emit graph and current node

use std::io::{self, BufRead, Write};

use crate::board::{self, BoardState, Move};
use crate::config::{GameConfig, Seat};
use crate::protocol::{
    AnalysisResponse, BoardDiff, BoardObservation, Control, CurrentNode, Inbound, Outbound,
    wire_move, wire_stones,
};
use crate::reconcile::{Outcome, Reconciler};
use crate::record::GameRecord;

/// One game session: the record, its reconciler, and the last sensor
/// snapshot seen.
pub struct Session {
    config: GameConfig,
    record: GameRecord,
    reconciler: Reconciler,
    observed: Option<BoardState>,
}

impl Session {
    pub fn new(config: GameConfig) -> Self {
        Session {
            record: GameRecord::new(config),
            reconciler: Reconciler::new(config.players),
            observed: None,
            config,
        }
    }

    /// Run the event loop over stdin/stdout until end of input.
    pub fn run(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        let opening = self.start_game();
        write_messages(&mut stdout, opening)?;

        for line in stdin.lock().lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let outputs = self.handle_line(line);
            write_messages(&mut stdout, outputs)?;
        }
        Ok(())
    }

    /// Reset to a fresh record and announce the game.
    pub fn start_game(&mut self) -> Vec<Outbound> {
        self.record = GameRecord::new(self.config);
        self.reconciler = Reconciler::new(self.config.players);
        log::info!(
            "new game: {} (black) vs {} (white)",
            self.config.players.black,
            self.config.players.white
        );
        vec![
            Outbound::Message(format!(
                "New game {} (black) vs {} (white)",
                self.config.players.black, self.config.players.white
            )),
            Outbound::AnalysisRequest(self.record.start_request()),
        ]
    }

    /// Parse and handle one line of input.
    pub fn handle_line(&mut self, line: &str) -> Vec<Outbound> {
        match serde_json::from_str::<Inbound>(line) {
            Ok(event) => self.handle(event),
            Err(error) => {
                log::warn!("ignoring malformed event: {error}");
                vec![Outbound::Error(format!("malformed event: {error}"))]
            }
        }
    }

    /// Handle one inbound event.
    pub fn handle(&mut self, event: Inbound) -> Vec<Outbound> {
        match event {
            Inbound::Observation(observation) => self.handle_observation(observation),
            Inbound::Analysis(response) => self.handle_analysis(response),
            Inbound::Control(command) => self.handle_control(command),
        }
    }

    fn handle_observation(&mut self, observation: BoardObservation) -> Vec<Outbound> {
        match observation.board_state(self.config.board_size) {
            Ok(state) => {
                self.observed = Some(state);
                self.apply_observation()
            }
            Err(error) => vec![Outbound::Error(error.to_string())],
        }
    }

    /// Reconcile the stored snapshot against the record and report.
    fn apply_observation(&mut self) -> Vec<Outbound> {
        let Some(observed) = self.observed.clone() else {
            return Vec::new();
        };

        let result = self.reconciler.reconcile(&mut self.record, &observed);
        let mut out = Vec::new();
        if let Some(note) = self.reconciler.take_advisory() {
            out.push(Outbound::Message(note));
        }

        match result {
            Ok(outcome) => {
                if let Outcome::InSync { .. } = outcome {
                    // Frontends watch the error channel; "resolved"
                    // clears the banner.
                    out.push(Outbound::Error("resolved".to_string()));
                }
                if let Outcome::Applied { requests } = outcome {
                    out.extend(requests.into_iter().map(Outbound::AnalysisRequest));
                }
                log::info!(
                    "board in sync with record\n{}",
                    board::render(&self.record.board_state(), self.config.board_size)
                );
                out.push(Outbound::CurrentNode(self.current_node_payload()));
                out.push(Outbound::Graph(self.record.graph_data()));
                out.extend(self.maybe_auto_pass());
            }
            Err(error) => {
                out.push(Outbound::Error(error.to_string()));
                out.push(Outbound::Diff(self.board_diff(&observed)));
            }
        }
        out
    }

    fn handle_analysis(&mut self, response: AnalysisResponse) -> Vec<Outbound> {
        let mut out = Vec::new();
        match self.record.set_analysis(response) {
            Ok(()) => {
                out.push(Outbound::Graph(self.record.graph_data()));
                if self.record.game_over() {
                    out.extend(self.announce_final_score());
                }
                out.extend(self.maybe_auto_pass());
            }
            Err(error) => {
                // The rejected move is already rolled back; the stone
                // that caused it is still standing on the board.
                self.reconciler.invalidate();
                out.push(Outbound::Error(error.to_string()));
                if let Some(observed) = self.observed.clone() {
                    out.push(Outbound::Diff(self.board_diff(&observed)));
                }
            }
        }
        out
    }

    fn handle_control(&mut self, command: Control) -> Vec<Outbound> {
        if let Some(seats) = command.new_game {
            self.config.players = seats;
            return self.start_game();
        }
        if let Some(id) = command.current_nid {
            return match self.record.set_current(id) {
                Ok(()) => {
                    // The physical board no longer matches the reviewed
                    // position; force a fresh reconciliation.
                    self.reconciler.invalidate();
                    if self.observed.is_some() {
                        self.apply_observation()
                    } else {
                        vec![
                            Outbound::CurrentNode(self.current_node_payload()),
                            Outbound::Graph(self.record.graph_data()),
                        ]
                    }
                }
                Err(error) => vec![Outbound::Error(error.to_string())],
            };
        }
        if command.pass_turn {
            return self.record_pass();
        }
        if command.refresh_data {
            return vec![
                Outbound::Graph(self.record.graph_data()),
                Outbound::CurrentNode(self.current_node_payload()),
            ];
        }
        Vec::new()
    }

    /// Record a pass for the side to move.
    fn record_pass(&mut self) -> Vec<Outbound> {
        let player = self.record.current_player();
        let mut out = vec![Outbound::Message(format!("{player} passed"))];
        if let Some(request) = self.record.record_move(Move::Pass(player)) {
            out.push(Outbound::AnalysisRequest(request));
        }
        out.push(Outbound::CurrentNode(self.current_node_payload()));
        out.push(Outbound::Graph(self.record.graph_data()));
        out
    }

    /// An engine-controlled side passes on its own once the analysis
    /// suggests it; board moves it plays arrive through the sensor when
    /// the player places the suggested stone.
    fn maybe_auto_pass(&mut self) -> Vec<Outbound> {
        if self.record.game_over() {
            return Vec::new();
        }
        if self.config.players.seat(self.record.current_player()) != Seat::Ai {
            return Vec::new();
        }
        let suggestion = self
            .record
            .current_node()
            .analysis
            .as_ref()
            .and_then(|analysis| analysis.next_ai_move.clone());
        match suggestion {
            Some((_, vertex)) if vertex == "pass" => self.record_pass(),
            _ => Vec::new(),
        }
    }

    fn announce_final_score(&self) -> Vec<Outbound> {
        match self.record.final_score() {
            // The error channel doubles as the attention banner.
            Ok(Some(score)) => vec![Outbound::Error(format!(
                "Final score: {} {}",
                self.config.score_perspective, score
            ))],
            Ok(None) => Vec::new(),
            Err(error) => vec![Outbound::Error(error.to_string())],
        }
    }

    fn current_node_payload(&self) -> CurrentNode {
        let node = self.record.current_node();
        CurrentNode {
            mv: wire_move(&node.mv),
            captured_stones: wire_stones(&node.captured),
            prisoners: node.prisoners,
            analysis: node.analysis.clone(),
        }
    }

    /// What to add and lift to bring the physical board in line.
    fn board_diff(&self, observed: &BoardState) -> BoardDiff {
        let logical = self.record.board_state();
        BoardDiff {
            to_add: wire_stones(&logical.difference(observed).copied().collect()),
            to_remove: wire_stones(&observed.difference(&logical).copied().collect()),
        }
    }
}

fn write_messages(out: &mut impl Write, messages: Vec<Outbound>) -> io::Result<()> {
    for message in messages {
        let line = serde_json::to_string(&message).map_err(io::Error::other)?;
        writeln!(out, "{line}")?;
    }
    out.flush()
}
