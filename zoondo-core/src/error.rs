//! Engine error taxonomy

use crate::cards::CardRef;

/// Errors raised by game operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("illegal move")]
    IllegalMove,

    #[error("illegal selection")]
    IllegalSelection,

    /// Out of phase or out of turn request; a desync or a cheating attempt
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("game is over")]
    GameOver,

    #[error("unknown player: {0}")]
    UnknownPlayer(String),

    #[error("unknown card: {}/{}", .0.tribe, .0.slug)]
    UnknownCard(CardRef),

    #[error("unknown tribe: {0}")]
    UnknownTribe(String),

    #[error("room is full")]
    RoomFull,

    #[error("invalid disposition: {0}")]
    InvalidDisposition(String),
}

impl GameError {
    pub fn protocol(detail: impl Into<String>) -> Self {
        GameError::ProtocolViolation(detail.into())
    }

    /// Fatal errors abort the request and drop the offending connection;
    /// the others are reported to the requesting player only.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GameError::IllegalMove
                | GameError::IllegalSelection
                | GameError::RoomFull
                | GameError::InvalidDisposition(_)
                | GameError::UnknownTribe(_)
        )
    }
}
