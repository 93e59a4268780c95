//! Reconciliation between the physical board and the game record.
//!
//! The sensor reports complete snapshots, not events, and it reports
//! them late: a capture leaves dead stones on the physical board until
//! a player lifts them, a fumbled stone shows up as an extra, an undo
//! shows up as missing stones. Each snapshot is classified against the
//! record's board state: equality clears the latch, additions are
//! validated and recorded, removals are matched against a trailing
//! stretch of moves and undone.
//!
//! Any failure latches the reconciler in the invalid state, which
//! blocks recording until the physical board matches the record
//! exactly again; the caller is expected to show the player what to
//! add and lift. The record itself is never corrupted: a rejected
//! snapshot either records nothing or records real moves and then
//! reports the remaining physical surplus.

use crate::board::{BoardState, Move, Stone, describe};
use crate::config::{Seat, Seats};
use crate::error::{GameError, Result};
use crate::protocol::AnalysisRequest;
use crate::record::GameRecord;

/// What a successful reconciliation cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The snapshot already matches the record. `resolved` is set when
    /// this cleared a latched invalid state.
    InSync { resolved: bool },
    /// Moves were recorded and/or undone; forward these queries to the
    /// analysis engine.
    Applied { requests: Vec<AnalysisRequest> },
}

/// Maps sensor snapshots onto the game record.
pub struct Reconciler {
    invalid: bool,
    seats: Seats,
    advisory: Option<String>,
}

impl Reconciler {
    pub fn new(seats: Seats) -> Self {
        Reconciler { invalid: false, seats, advisory: None }
    }

    /// Whether the latch is set: the physical board must be restored to
    /// match the record before anything is recorded again.
    pub fn invalid(&self) -> bool {
        self.invalid
    }

    /// Latch manually, e.g. after navigating the record away from the
    /// position standing on the physical board.
    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    /// A pending non-fatal notice for the player, produced at most once
    /// per cycle.
    pub fn take_advisory(&mut self) -> Option<String> {
        self.advisory.take()
    }

    /// Run one reconciliation cycle against a sensor snapshot.
    pub fn reconcile(
        &mut self,
        record: &mut GameRecord,
        observed: &BoardState,
    ) -> Result<Outcome> {
        let result = self.run(record, observed);
        if result.is_err() {
            self.invalid = true;
        }
        result
    }

    fn run(&mut self, record: &mut GameRecord, observed: &BoardState) -> Result<Outcome> {
        let logical = record.board_state();
        if *observed == logical {
            let resolved = self.invalid;
            self.invalid = false;
            if resolved {
                log::info!("physical board matches the record again");
            }
            return Ok(Outcome::InSync { resolved });
        }
        if self.invalid {
            return Err(GameError::BoardMismatch);
        }

        let added: BoardState = observed.difference(&logical).copied().collect();
        let removed: BoardState = logical.difference(observed).copied().collect();

        let mut requests = Vec::new();
        if !added.is_empty() {
            match self.add_stones(record, &added) {
                Ok(forwarded) => requests.extend(forwarded),
                Err(error @ (GameError::AmbiguousPlacement(_) | GameError::WrongPlayer(_)))
                    if !removed.is_empty() =>
                {
                    // The surplus may be explained by an undo the player
                    // performed in the same motion: take back the lifted
                    // stones and try the additions once more.
                    log::debug!("retrying after undo: {error}");
                    record.undo_stones(&removed)?;
                    requests.extend(self.add_stones(record, &added)?);
                }
                Err(error) => return Err(error),
            }
        } else {
            record.undo_stones(&removed)?;
        }

        // Whatever was recorded, the physical board must now agree;
        // leftover differences (e.g. captured stones not yet lifted)
        // latch the reconciler until the player cleans up.
        if *observed != record.board_state() {
            return Err(GameError::BoardMismatch);
        }
        Ok(Outcome::Applied { requests })
    }

    /// Validate and record newly observed stones.
    fn add_stones(
        &mut self,
        record: &mut GameRecord,
        added: &BoardState,
    ) -> Result<Vec<AnalysisRequest>> {
        let to_move = record.current_player();
        let colors: std::collections::HashSet<_> = added.iter().map(|s| s.color).collect();
        if added.len() > 2 || (added.len() == 2 && colors.len() == 1) {
            return Err(GameError::AmbiguousPlacement(describe(added)));
        }
        if added.len() == 1 {
            if let Some(stone) = added.iter().next() {
                if stone.color != to_move {
                    return Err(GameError::WrongPlayer(describe(added)));
                }
            }
        }

        if self.seats.seat(to_move) == Seat::Ai && !self.matches_suggestion(record, added) {
            // The engine's seat moved differently than suggested. Warn
            // and record nothing; the player corrects the board and the
            // cycle reports the mismatch.
            let note = format!("Wrong move, Human! Please remove {}", describe(added));
            log::warn!("{note}");
            self.advisory = Some(note);
            return Ok(Vec::new());
        }

        // With a stone of each color added at once, the side to move
        // placed first.
        let mut ordered: Vec<Stone> = added.iter().copied().collect();
        ordered.sort_by_key(|stone| stone.color != to_move);

        let mut requests = Vec::new();
        for stone in ordered {
            if let Some(request) = record.record_move(Move::Place(stone)) {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    /// Whether the engine's suggested move is among the added stones.
    fn matches_suggestion(&self, record: &GameRecord, added: &BoardState) -> bool {
        let Some(analysis) = record.current_node().analysis.as_ref() else {
            return false;
        };
        let Some((color, vertex)) = analysis.next_ai_move.as_ref() else {
            return false;
        };
        added
            .iter()
            .any(|stone| stone.color == *color && stone.coord.text() == *vertex)
    }
}
