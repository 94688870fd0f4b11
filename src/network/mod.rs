//! Network Layer
//!
//! JSON-over-HTTP API for the browser client.
//! This layer holds no game state of its own; everything runs through `game/`.

pub mod protocol;
pub mod server;

pub use protocol::{
    ErrorBody, ErrorCode, SessionResponse, StatsResponse, TilesResponse, ValidateRequest,
    ValidateResponse, VersionResponse, SESSION_HEADER,
};
pub use server::{router, ApiError, GameServer, GameServerError, PlayerSession};
