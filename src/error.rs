//! アプリケーション全体のエラー定義モジュール
//! ゲームロジック、スナップショット同期、セッション管理のエラーを統一管理。

use thiserror::Error;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::game::types::Player;

/// ゲームロジックに関連するエラー
/// 着手の不合法理由は全て回復可能な通常の条件として扱う
#[derive(Debug, Error)]
pub enum GameError {
    #[error("Position ({row}, {col}) is out of bounds")]
    OutOfBounds { row: usize, col: usize },

    #[error("Cell ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },

    #[error("Position ({row}, {col}) is not adjacent to any stone")]
    NotAdjacentToAnyStone { row: usize, col: usize },

    #[error("Match is already finished")]
    MatchAlreadyTerminal,

    #[error("Move time expired for {player}")]
    ClockExpired { player: Player },

    #[error("Malformed snapshot: {reason}")]
    MalformedSnapshot { reason: String },

    #[error("Snapshot encoding failed: {reason}")]
    SnapshotEncodeFailed { reason: String },

    #[error("Match not found: {match_id}")]
    MatchNotFound { match_id: Uuid },

    #[error("Session limit exceeded: max {max}")]
    SessionLimitExceeded { max: usize },

    #[error("Invalid match configuration: {source}")]
    InvalidConfig {
        #[from]
        source: ConfigError,
    },
}

/// ゲームエラーをベースとした結果型
pub type Result<T> = std::result::Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GameError::OutOfBounds { row: 20, col: 3 };
        assert_eq!(err.to_string(), "Position (20, 3) is out of bounds");

        let err = GameError::ClockExpired {
            player: Player::White,
        };
        assert_eq!(err.to_string(), "Move time expired for White");

        let err = GameError::MalformedSnapshot {
            reason: "board has 3 rows, expected 15".to_string(),
        };
        assert!(err.to_string().contains("Malformed snapshot"));
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::InvalidValue {
            field: "match.win_length".to_string(),
            value: "1".to_string(),
        };
        let err: GameError = config_err.into();
        assert!(matches!(err, GameError::InvalidConfig { .. }));
    }
}
