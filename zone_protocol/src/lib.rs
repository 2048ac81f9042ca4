//! Turn protocol for the zone-control bot.
//!
//! The game referee speaks a line-oriented numeric protocol. This crate turns
//! that stream into typed values ([`GameSetup`], [`TurnObservation`]) and
//! renders the bot's answers back, without depending on the decision engine
//! in `zone_core`.

mod text;
mod types;

pub use text::{
    read_dump, render_dump, write_targets, ProtocolError, TokenReader, DUMP_BEGIN, DUMP_END,
};
pub use types::{GameSetup, Position, TeamId, TurnObservation};
