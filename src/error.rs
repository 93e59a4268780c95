//! Error taxonomy for the game core.
//!
//! Three families, with different guarantees:
//! - validation errors ([`AmbiguousPlacement`], [`WrongPlayer`],
//!   [`BoardMismatch`]) are raised by the reconciler, never corrupt the
//!   move tree, and clear once the physical board matches the record
//!   again;
//! - [`Engine`] means the analysis engine rejected a query; the
//!   offending node is rolled back before the error surfaces;
//! - structural errors ([`InvalidCoordinate`], [`UndoNotFound`],
//!   [`UnknownNode`]) fail closed with no mutation.
//!
//! [`AmbiguousPlacement`]: GameError::AmbiguousPlacement
//! [`WrongPlayer`]: GameError::WrongPlayer
//! [`BoardMismatch`]: GameError::BoardMismatch
//! [`Engine`]: GameError::Engine
//! [`InvalidCoordinate`]: GameError::InvalidCoordinate
//! [`UndoNotFound`]: GameError::UndoNotFound
//! [`UnknownNode`]: GameError::UnknownNode

use thiserror::Error;

use crate::record::NodeId;

/// All failure modes of the game core.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    /// A vertex outside the configured board, or malformed text.
    #[error("Invalid coordinate {0}")]
    InvalidCoordinate(String),

    /// More simultaneous additions than one turn can explain.
    #[error("Too many stones! Please remove {0}")]
    AmbiguousPlacement(String),

    /// A single added stone whose color is not the side to move.
    #[error("Wrong player! Please remove {0}")]
    WrongPlayer(String),

    /// Physical and logical board disagree and recording is blocked
    /// until they match exactly again.
    #[error("Board does not match game record")]
    BoardMismatch,

    /// No trailing window of moves reproduces the removed stones.
    #[error("Can not undo {0}")]
    UndoNotFound(String),

    /// Navigation to a node id that is not (or no longer) in the tree.
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    /// The analysis engine rejected a query.
    #[error("Engine error {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
