//! 対局セッション管理モジュール
//! 同時に進行する複数の対局を管理し、セッション数制限と
//! 非アクティブ対局のクリーンアップを担当する。
//! エンジン自体は同期機構を持たないため、エントリ単位の
//! 排他アクセスでこの層が書き込みを直列化する。

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{MatchConfig, SystemLimits};
use crate::error::{GameError, Result};
use crate::game::engine::GameEngine;
use crate::game::types::{MatchOutcome, Move, Player};
use crate::sync::snapshot::GameSnapshot;

/// 1つの対局セッション
/// エンジン本体と管理用のタイムスタンプを保持する
#[derive(Debug, Clone)]
pub struct MatchSession {
    pub engine: GameEngine,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

/// 対局一覧表示用のサマリ
#[derive(Debug, Clone)]
pub struct MatchSummary {
    pub id: Uuid,
    pub outcome: MatchOutcome,
    pub move_count: usize,
    pub created_at: DateTime<Utc>,
}

/// セッション統計
#[derive(Debug)]
pub struct SessionStats {
    pub total_matches: usize,
    pub max_matches: usize,
    pub in_progress_count: usize,
    pub finished_count: usize,
}

/// 対局セッションの管理を行うメイン構造体
/// スレッドセーフなDashMapで同時アクセスを効率的に処理
#[derive(Debug, Clone)]
pub struct MatchSessionManager {
    /// アクティブセッションのコレクション
    sessions: Arc<DashMap<Uuid, MatchSession>>,
    /// 同時存在可能な最大セッション数
    max_sessions: usize,
    /// セッションのタイムアウト時間（分）
    session_timeout_minutes: i64,
}

impl MatchSessionManager {
    /// デフォルトタイムアウト（60分）でセッションマネージャーを作成
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_sessions,
            session_timeout_minutes: 60,
        }
    }

    /// カスタムタイムアウトでセッションマネージャーを作成
    pub fn with_timeout(max_sessions: usize, timeout_minutes: i64) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            max_sessions,
            session_timeout_minutes: timeout_minutes,
        }
    }

    /// システム制限値からセッションマネージャーを作成
    pub fn from_limits(limits: &SystemLimits) -> Self {
        Self::with_timeout(
            limits.max_concurrent_matches,
            (limits.session_timeout.as_secs() / 60) as i64,
        )
    }

    /// 新しい対局セッションを作成する
    /// 最大セッション数に達している場合はエラーを返す
    pub fn create_match(&self, config: MatchConfig) -> Result<Uuid> {
        if self.sessions.len() >= self.max_sessions {
            return Err(GameError::SessionLimitExceeded {
                max: self.max_sessions,
            });
        }

        let engine = GameEngine::new(config)?;
        let match_id = engine.id();
        let now = Utc::now();

        self.sessions.insert(
            match_id,
            MatchSession {
                engine,
                created_at: now,
                last_activity: now,
            },
        );

        Ok(match_id)
    }

    pub fn match_exists(&self, match_id: &Uuid) -> bool {
        self.sessions.contains_key(match_id)
    }

    pub fn match_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn list_matches(&self) -> Vec<MatchSummary> {
        self.sessions
            .iter()
            .map(|entry| {
                let session = entry.value();
                MatchSummary {
                    id: *entry.key(),
                    outcome: session.engine.outcome(),
                    move_count: session.engine.move_count(),
                    created_at: session.created_at,
                }
            })
            .collect()
    }

    pub fn remove_match(&self, match_id: &Uuid) -> Result<MatchSession> {
        match self.sessions.remove(match_id) {
            Some((_, session)) => Ok(session),
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    /// 指定した対局に着手する
    /// エントリの排他参照を取るため、同一対局への操作は直列化される
    pub fn place_stone(
        &self,
        match_id: &Uuid,
        row: usize,
        col: usize,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                let outcome = session.engine.place_stone(row, col, now)?;
                session.last_activity = now;
                Ok(outcome)
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    /// 指定した対局の直近の1手を取り消す
    pub fn undo_last_move(&self, match_id: &Uuid) -> Result<Option<Move>> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                let undone = session.engine.undo_last_move();
                if undone.is_some() {
                    session.last_activity = Utc::now();
                }
                Ok(undone)
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    pub fn resign(&self, match_id: &Uuid, player: Player) -> Result<MatchOutcome> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                let outcome = session.engine.resign(player)?;
                session.last_activity = Utc::now();
                Ok(outcome)
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    pub fn timeout_current_player(
        &self,
        match_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                let outcome = session.engine.timeout_current_player(now)?;
                session.last_activity = now;
                Ok(outcome)
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    pub fn start_clock(&self, match_id: &Uuid, now: DateTime<Utc>) -> Result<()> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                session.engine.start_clock(now);
                session.last_activity = now;
                Ok(())
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    /// 指定した対局のスナップショットを生成する
    pub fn snapshot(&self, match_id: &Uuid) -> Result<GameSnapshot> {
        match self.sessions.get(match_id) {
            Some(session) => Ok(session.engine.to_snapshot()),
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    /// 受信したスナップショットを指定した対局に適用する
    pub fn apply_snapshot(&self, match_id: &Uuid, snapshot: &GameSnapshot) -> Result<()> {
        match self.sessions.get_mut(match_id) {
            Some(mut session) => {
                session.engine.apply_snapshot(snapshot)?;
                session.last_activity = Utc::now();
                Ok(())
            }
            None => Err(GameError::MatchNotFound {
                match_id: *match_id,
            }),
        }
    }

    /// 一定時間操作のなかった対局を削除する
    /// 戻り値は削除した対局数
    pub fn cleanup_inactive_matches(&self) -> usize {
        let cutoff_time = Utc::now() - Duration::minutes(self.session_timeout_minutes);
        let mut removed_count = 0;

        let expired_ids: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().last_activity < cutoff_time)
            .map(|entry| *entry.key())
            .collect();

        for match_id in expired_ids {
            if self.sessions.remove(&match_id).is_some() {
                removed_count += 1;
            }
        }

        removed_count
    }

    pub fn stats(&self) -> SessionStats {
        let total_matches = self.sessions.len();
        let finished_count = self
            .sessions
            .iter()
            .filter(|entry| entry.value().engine.is_finished())
            .count();

        SessionStats {
            total_matches,
            max_matches: self.max_sessions,
            in_progress_count: total_matches - finished_count,
            finished_count,
        }
    }
}

impl Default for MatchSessionManager {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_create_match() {
        let manager = MatchSessionManager::new(10);
        let match_id = manager.create_match(MatchConfig::default()).unwrap();

        assert!(manager.match_exists(&match_id));
        assert_eq!(manager.match_count(), 1);
    }

    #[test]
    fn test_max_sessions_limit() {
        let manager = MatchSessionManager::new(2);

        let _match1 = manager.create_match(MatchConfig::default()).unwrap();
        let _match2 = manager.create_match(MatchConfig::default()).unwrap();

        let result = manager.create_match(MatchConfig::default());
        assert!(matches!(
            result,
            Err(GameError::SessionLimitExceeded { max: 2 })
        ));
    }

    #[test]
    fn test_from_limits() {
        let limits = SystemLimits {
            max_concurrent_matches: 2,
            session_timeout: std::time::Duration::from_secs(600),
        };
        let manager = MatchSessionManager::from_limits(&limits);

        let _match1 = manager.create_match(MatchConfig::default()).unwrap();
        let _match2 = manager.create_match(MatchConfig::default()).unwrap();
        assert!(matches!(
            manager.create_match(MatchConfig::default()),
            Err(GameError::SessionLimitExceeded { max: 2 })
        ));
    }

    #[test]
    fn test_create_match_rejects_invalid_config() {
        let manager = MatchSessionManager::new(10);
        let result = manager.create_match(MatchConfig {
            board_size: 3,
            win_length: 5,
            move_time_limit: None,
        });

        assert!(matches!(result, Err(GameError::InvalidConfig { .. })));
        assert_eq!(manager.match_count(), 0);
    }

    #[test]
    fn test_place_stone_through_manager() {
        let manager = MatchSessionManager::new(10);
        let match_id = manager.create_match(MatchConfig::default()).unwrap();

        let outcome = manager.place_stone(&match_id, 7, 7, at(0)).unwrap();
        assert_eq!(outcome, MatchOutcome::InProgress);

        // 不合法手はそのまま伝播する
        let result = manager.place_stone(&match_id, 7, 7, at(1));
        assert!(matches!(result, Err(GameError::CellOccupied { .. })));
    }

    #[test]
    fn test_operations_on_unknown_match() {
        let manager = MatchSessionManager::new(10);
        let unknown_id = Uuid::new_v4();

        assert!(matches!(
            manager.place_stone(&unknown_id, 0, 0, at(0)),
            Err(GameError::MatchNotFound { .. })
        ));
        assert!(matches!(
            manager.snapshot(&unknown_id),
            Err(GameError::MatchNotFound { .. })
        ));
        assert!(matches!(
            manager.remove_match(&unknown_id),
            Err(GameError::MatchNotFound { .. })
        ));
    }

    #[test]
    fn test_undo_through_manager() {
        let manager = MatchSessionManager::new(10);
        let match_id = manager.create_match(MatchConfig::default()).unwrap();

        manager.place_stone(&match_id, 7, 7, at(0)).unwrap();
        let undone = manager.undo_last_move(&match_id).unwrap().unwrap();
        assert_eq!(undone.player, Player::Black);

        // 履歴が空ならNone
        assert_eq!(manager.undo_last_move(&match_id).unwrap(), None);
    }

    #[test]
    fn test_resign_through_manager() {
        let manager = MatchSessionManager::new(10);
        let match_id = manager.create_match(MatchConfig::default()).unwrap();

        let outcome = manager.resign(&match_id, Player::White).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Won {
                winner: Player::Black
            }
        );
    }

    #[test]
    fn test_snapshot_exchange_between_matches() {
        let manager = MatchSessionManager::new(10);
        let match_a = manager.create_match(MatchConfig::default()).unwrap();
        let match_b = manager.create_match(MatchConfig::default()).unwrap();

        manager.place_stone(&match_a, 7, 7, at(0)).unwrap();
        let snapshot = manager.snapshot(&match_a).unwrap();
        manager.apply_snapshot(&match_b, &snapshot).unwrap();

        let summary_b = manager.snapshot(&match_b).unwrap();
        assert_eq!(summary_b.board, snapshot.board);
        assert_eq!(summary_b.current_player, snapshot.current_player);
    }

    #[test]
    fn test_remove_match() {
        let manager = MatchSessionManager::new(10);
        let match_id = manager.create_match(MatchConfig::default()).unwrap();

        let removed = manager.remove_match(&match_id).unwrap();
        assert_eq!(removed.engine.id(), match_id);
        assert!(!manager.match_exists(&match_id));
    }

    #[test]
    fn test_list_matches() {
        let manager = MatchSessionManager::new(10);
        let match1 = manager.create_match(MatchConfig::default()).unwrap();
        let _match2 = manager.create_match(MatchConfig::default()).unwrap();

        manager.place_stone(&match1, 7, 7, at(0)).unwrap();

        let summaries = manager.list_matches();
        assert_eq!(summaries.len(), 2);

        let summary1 = summaries.iter().find(|s| s.id == match1).unwrap();
        assert_eq!(summary1.move_count, 1);
    }

    #[test]
    fn test_cleanup_inactive_matches() {
        let manager = MatchSessionManager::with_timeout(10, 0);

        let _match_id = manager.create_match(MatchConfig::default()).unwrap();
        assert_eq!(manager.match_count(), 1);

        std::thread::sleep(std::time::Duration::from_millis(10));
        let removed_count = manager.cleanup_inactive_matches();

        assert_eq!(removed_count, 1);
        assert_eq!(manager.match_count(), 0);
    }

    #[test]
    fn test_stats() {
        let manager = MatchSessionManager::new(10);
        let match1 = manager.create_match(MatchConfig::default()).unwrap();
        let _match2 = manager.create_match(MatchConfig::default()).unwrap();

        manager.resign(&match1, Player::Black).unwrap();

        let stats = manager.stats();
        assert_eq!(stats.total_matches, 2);
        assert_eq!(stats.max_matches, 10);
        assert_eq!(stats.finished_count, 1);
        assert_eq!(stats.in_progress_count, 1);
    }
}
