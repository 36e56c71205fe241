use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chadempire_core::GameError;
use chadempire_shared::{ApiError, ErrorBody};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database operation timed out")]
    Timeout,
}

pub type ServerResult<T> = Result<T, AppError>;

impl AppError {
    /// Collapse into the game error vocabulary seen by clients.
    pub fn to_game(&self) -> GameError {
        match self {
            AppError::Game(e) => e.clone(),
            AppError::Database(e) => GameError::Persistence(e.to_string()),
            AppError::Timeout => GameError::Persistence("database operation timed out".into()),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.to_game().is_retryable()
    }
}

impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Invalid(msg) => AppError::Game(GameError::InvalidRequest(msg)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Game(GameError::InvalidRequest(e.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::Game(GameError::InvalidRequest(e.body_text()))
    }
}

pub fn status_for(err: &GameError) -> StatusCode {
    match err {
        GameError::Unauthenticated => StatusCode::UNAUTHORIZED,
        GameError::UserNotFound | GameError::BoosterNotFound | GameError::StakeNotFound => StatusCode::NOT_FOUND,
        GameError::Persistence(_) | GameError::InvalidConfiguration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let game = self.to_game();
        let status = status_for(&game);
        if status.is_server_error() {
            error!(kind = game.kind(), "request failed: {self}");
        }
        let next_spin_time = match &game {
            GameError::DailySpinAlreadyUsed { next_spin_time } => Some(*next_spin_time),
            _ => None,
        };
        let body = ErrorBody {
            error: game.to_string(),
            kind: game.kind().to_string(),
            next_spin_time,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(status_for(&GameError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&GameError::StakeNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&GameError::BoosterAlreadyUsed), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&GameError::NoYieldAvailable), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&GameError::InvalidConfiguration("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_failures_are_retryable() {
        assert!(AppError::Timeout.is_retryable());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!AppError::Game(GameError::BoosterAlreadyUsed).is_retryable());
        assert_eq!(AppError::Timeout.to_game().kind(), "PERSISTENCE_ERROR");
    }
}
