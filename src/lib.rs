//! Goban-Sync: keeps a physical Go board and its game record in sync.
//!
//! A camera-and-sensor board reports complete snapshots of the stones
//! it sees; this crate validates them against the rules, maintains a
//! branching move record, asks an external engine for analysis, and
//! tells the player how to fix the board when the physical and logical
//! positions drift apart.
//!
//! ## Modules
//!
//! - [`board`] - data model and vertex coordinate mapping
//! - [`rules`] - groups, liberties, and capture detection
//! - [`record`] - the branching game record with analysis payloads
//! - [`score`] - ownership-based final scoring
//! - [`reconcile`] - snapshot reconciliation against the record
//! - [`session`] - the JSON line protocol event loop
//! - [`protocol`] - wire types for all collaborator interfaces
//! - [`config`] - board size, komi, seats and scoring knobs
//! - [`error`] - the error taxonomy
//!
//! ## Example
//!
//! ```
//! use goban_sync::board::{BoardState, Color, Coord, Stone};
//! use goban_sync::config::GameConfig;
//! use goban_sync::reconcile::Reconciler;
//! use goban_sync::record::GameRecord;
//!
//! let config = GameConfig::default();
//! let mut record = GameRecord::new(config);
//! let mut reconciler = Reconciler::new(config.players);
//!
//! // The sensor reports a single black stone on D4.
//! let mut observed = BoardState::new();
//! observed.insert(Stone {
//!     color: Color::Black,
//!     coord: Coord::from_text("D4", config.board_size).unwrap(),
//! });
//!
//! reconciler.reconcile(&mut record, &observed).unwrap();
//! assert_eq!(record.all_moves().len(), 1);
//! assert_eq!(record.current_player(), Color::White);
//! ```

pub mod board;
pub mod config;
pub mod error;
pub mod protocol;
pub mod reconcile;
pub mod record;
pub mod rules;
pub mod score;
pub mod session;
