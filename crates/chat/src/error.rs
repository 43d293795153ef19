use huddle_services::auth::AuthError;
use huddle_services::store::StoreError;
use thiserror::Error;

/// Chat operation failures surfaced to clients as `error {message, code}`.
/// Codes are stable; the prose is informational.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Authentication required")]
    AuthRequired,
    #[error("Authentication failed")]
    AuthFailed,
    #[error("{0}")]
    Validation(String),
    #[error("Invalid code format")]
    InvalidCodeFormat,
    #[error("Room not found")]
    RoomNotFound,
    #[error("A code is required to join this room")]
    CodeRequired,
    #[error("Invalid room code")]
    InvalidCode,
    #[error("Code does not refer to a private room")]
    NotPrivateRoom,
    #[error("You are not a participant of this room")]
    NotParticipant,
    #[error("Could not generate a unique room code")]
    CodeGenerationFailed,
    #[error("Store operation timed out")]
    StoreTimeout,
    #[error("Store unavailable")]
    StoreUnavailable,
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::AuthRequired => "AUTH_REQUIRED",
            ChatError::AuthFailed => "AUTH_FAILED",
            ChatError::Validation(_) => "VALIDATION_ERROR",
            ChatError::InvalidCodeFormat => "INVALID_CODE_FORMAT",
            ChatError::RoomNotFound => "ROOM_NOT_FOUND",
            ChatError::CodeRequired => "CODE_REQUIRED",
            ChatError::InvalidCode => "INVALID_CODE",
            ChatError::NotPrivateRoom => "NOT_PRIVATE_ROOM",
            ChatError::NotParticipant => "NOT_PARTICIPANT",
            ChatError::CodeGenerationFailed => "CODE_GENERATION_FAILED",
            ChatError::StoreTimeout => "STORE_TIMEOUT",
            ChatError::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => ChatError::StoreTimeout,
            _ => ChatError::StoreUnavailable,
        }
    }
}

impl From<AuthError> for ChatError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => ChatError::AuthRequired,
            AuthError::InvalidToken(_) => ChatError::AuthFailed,
        }
    }
}
