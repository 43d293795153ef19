use huddle_services::store::StoreError;
use thiserror::Error;

/// Video operation failures surfaced to clients as `error {message, code}`
/// over the socket or `{success:false, error}` over HTTP.
#[derive(Debug, Error)]
pub enum VideoError {
    #[error("Only the host may do that")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("Unknown signal kind: {0}")]
    InvalidSignalType(String),
    #[error("Malformed signal payload")]
    InvalidSignalStructure,
    #[error("Signal payload is required")]
    MissingSignalData,
    #[error("Offers and answers must include a target user")]
    MustIncludeTarget,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Target user is not in the room")]
    TargetUserNotFound,
    #[error("You are not in this room")]
    NotInRoom,
    #[error("Room is full")]
    RoomFull,
    #[error("Could not generate a unique room code")]
    CodeGenerationFailed,
    #[error("Store operation timed out")]
    StoreTimeout,
    #[error("Store unavailable")]
    StoreUnavailable,
}

impl VideoError {
    pub fn code(&self) -> &'static str {
        match self {
            VideoError::Unauthorized => "UNAUTHORIZED",
            VideoError::Validation(_) => "VALIDATION_ERROR",
            VideoError::InvalidSignalType(_) => "INVALID_SIGNAL_TYPE",
            VideoError::InvalidSignalStructure => "INVALID_SIGNAL_STRUCTURE",
            VideoError::MissingSignalData => "MISSING_SIGNAL_DATA",
            VideoError::MustIncludeTarget => "MUST_INCLUDE_TARGET",
            VideoError::RoomNotFound => "ROOM_NOT_FOUND",
            VideoError::TargetUserNotFound => "TARGET_USER_NOT_FOUND",
            VideoError::NotInRoom => "NOT_IN_ROOM",
            VideoError::RoomFull => "ROOM_FULL",
            VideoError::CodeGenerationFailed => "CODE_GENERATION_FAILED",
            VideoError::StoreTimeout => "STORE_TIMEOUT",
            VideoError::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }
}

impl From<StoreError> for VideoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout => VideoError::StoreTimeout,
            _ => VideoError::StoreUnavailable,
        }
    }
}
