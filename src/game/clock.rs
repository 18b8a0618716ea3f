//! 持ち時間管理モジュール
//! プレイヤーごとのカウントダウンと手番の経過時間、時間切れ判定を担当する。
//! 時刻は常に外部から引数で渡され、このモジュールが現在時刻を読むことはない。

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::types::Player;

/// 両プレイヤーの残り時間と手番開始時刻を保持する構造体
/// 残り時間は対局開始時の上限から単調に減少し、補充されない。
/// 手番中でないプレイヤーの残り時間は凍結される
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchClock {
    remaining_black: Duration,
    remaining_white: Duration,
    turn_started_at: Option<DateTime<Utc>>,
}

impl MatchClock {
    /// 両プレイヤーに同じ持ち時間を与えて時計を作成する
    pub fn new(move_time_limit: Duration) -> Self {
        MatchClock {
            remaining_black: move_time_limit,
            remaining_white: move_time_limit,
            turn_started_at: None,
        }
    }

    /// 残り時間を上限に戻し、計時を止める
    pub fn reset(&mut self, move_time_limit: Duration) {
        *self = MatchClock::new(move_time_limit);
    }

    /// 手番の計時を開始する
    pub fn start_turn(&mut self, now: DateTime<Utc>) {
        self.turn_started_at = Some(now);
    }

    /// 計時を止める（終局時やundo時）
    pub fn stop(&mut self) {
        self.turn_started_at = None;
    }

    /// 手番開始時刻を返す。計時していない場合はNone
    pub fn turn_started_at(&self) -> Option<DateTime<Utc>> {
        self.turn_started_at
    }

    /// 手番開始からの経過時間を計算する
    /// 計時していない場合、またはnowが開始時刻より前の場合はゼロ
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.turn_started_at {
            Some(started) => (now - started).to_std().unwrap_or(Duration::ZERO),
            None => Duration::ZERO,
        }
    }

    /// 指定プレイヤーの残り時間を返す
    pub fn remaining(&self, player: Player) -> Duration {
        match player {
            Player::Black => self.remaining_black,
            Player::White => self.remaining_white,
        }
    }

    /// 指定プレイヤーの残り時間を設定する（スナップショット適用用）
    pub fn set_remaining(&mut self, player: Player, remaining: Duration) {
        match player {
            Player::Black => self.remaining_black = remaining,
            Player::White => self.remaining_white = remaining,
        }
    }

    /// 手番中のプレイヤーが時間切れかチェックする
    /// 計時していない場合はfalse
    pub fn has_expired(&self, player: Player, now: DateTime<Utc>) -> bool {
        self.turn_started_at.is_some() && self.elapsed(now) >= self.remaining(player)
    }

    /// 着手完了時に経過時間を手番プレイヤーの残り時間から差し引き、計時を止める
    /// 消費されなかった残り時間はそのまま次の手番に持ち越される
    pub fn charge(&mut self, player: Player, now: DateTime<Utc>) {
        let elapsed = self.elapsed(now);
        let remaining = self.remaining(player).saturating_sub(elapsed);
        self.set_remaining(player, remaining);
        self.turn_started_at = None;
    }
}
