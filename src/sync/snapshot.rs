//! リモート同期用スナップショットの定義とコーデックモジュール
//! 対局状態全体をフラットなレコードとしてJSONと相互変換する。
//! 着手単位のメッセージングではなく、全状態の定期交換で
//! 2台のエンジンを同期させるための形式。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GameError, Result};
use crate::game::types::Player;

/// 現在のスナップショット形式のバージョン
/// バージョンフィールド導入前のスナップショットは1として扱う
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_FORMAT_VERSION
}

/// 履歴・直近手のワイヤ表現
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSnapshot {
    pub row: usize,
    pub col: usize,
    pub player: Player,
}

/// 勝利ラインのワイヤ表現
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningLineSnapshot {
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
    pub player: Player,
}

/// 対局状態全体のフラットなワイヤ表現
/// 旧バージョンのスナップショットも受理できるよう、boardと
/// currentPlayer以外のフィールドは全て省略時デフォルトで復号する。
/// partyCodeとplayerSymbolPreferencesはコアでは解釈しない
/// パススルー項目で、復号・再符号化で内容がそのまま保存される
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    #[serde(default = "default_version")]
    pub version: u32,
    pub board: Vec<Vec<Option<Player>>>,
    #[serde(default)]
    pub moves: Vec<MoveSnapshot>,
    pub current_player: Player,
    #[serde(default)]
    pub winner: Option<Player>,
    #[serde(default)]
    pub is_draw: bool,
    #[serde(default)]
    pub last_move: Option<MoveSnapshot>,
    #[serde(default)]
    pub winning_line: Option<WinningLineSnapshot>,
    #[serde(default)]
    pub party_code: Option<String>,
    #[serde(default)]
    pub player_symbol_preferences: BTreeMap<String, (String, String)>,
    /// 残り時間（秒）。時間無制限の対局ではnull
    #[serde(default)]
    pub black_time_remaining: Option<f64>,
    #[serde(default)]
    pub white_time_remaining: Option<f64>,
    /// 手番開始時刻（エポックミリ秒）。計時していない場合はnull
    #[serde(default)]
    pub turn_started_at: Option<i64>,
}

impl GameSnapshot {
    /// スナップショットをJSON文字列に符号化する
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| GameError::SnapshotEncodeFailed {
            reason: e.to_string(),
        })
    }

    /// 転送用のバイト列に符号化する
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| GameError::SnapshotEncodeFailed {
            reason: e.to_string(),
        })
    }

    /// JSON文字列からスナップショットを復号する
    /// 未知のプレイヤータグや必須フィールドの欠落はMalformedSnapshot
    pub fn from_json(json: &str) -> Result<GameSnapshot> {
        serde_json::from_str(json).map_err(|e| GameError::MalformedSnapshot {
            reason: e.to_string(),
        })
    }

    /// 受信したバイト列からスナップショットを復号する
    pub fn from_bytes(bytes: &[u8]) -> Result<GameSnapshot> {
        serde_json::from_slice(bytes).map_err(|e| GameError::MalformedSnapshot {
            reason: e.to_string(),
        })
    }
}
