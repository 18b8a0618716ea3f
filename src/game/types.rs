//! ゲームの基本型定義モジュール
//! 五目並べで使用される基本的な型とenum、構造体を定義する。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 盤面の各マスの状態を表現するenum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Black,
    White,
}

impl Cell {
    /// マスに石があればその持ち主を返す
    pub fn occupant(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Black => Some(Player::Black),
            Cell::White => Some(Player::White),
        }
    }
}

/// ゲームのプレイヤーを表すenum
/// 先手は黒、後手は白
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    Black,
    White,
}

impl Player {
    /// 相手プレイヤーを返す
    pub fn opposite(self) -> Player {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    /// プレイヤーを対応するセル状態に変換する
    pub fn to_cell(self) -> Cell {
        match self {
            Player::Black => Cell::Black,
            Player::White => Cell::White,
        }
    }

    /// 表示用のラベルを返す
    pub fn label(self) -> &'static str {
        match self {
            Player::Black => "Black",
            Player::White => "White",
        }
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// 盤面上の座標を表す構造体
/// 盤面サイズは対局ごとに決まるため、範囲チェックはBoard側で行う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    /// 指定方向に1歩進めた座標を返す
    /// 負の座標になる場合はNoneを返す
    pub fn offset(self, dr: i64, dc: i64) -> Option<Position> {
        let row = self.row as i64 + dr;
        let col = self.col as i64 + dc;
        if row >= 0 && col >= 0 {
            Some(Position {
                row: row as usize,
                col: col as usize,
            })
        } else {
            None
        }
    }
}

/// ゲームの1手を表現する構造体
/// 着手順と着手時刻を合わせて保持する。履歴を空盤面へ
/// 順に再生すると現在の盤面が正確に再現される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub player: Player,
    pub position: Position,
    pub sequence: u32,
    pub timestamp: DateTime<Utc>,
}

impl Move {
    /// 新しい手を作成する
    /// 時刻は呼び出し側から明示的に渡される
    pub fn new(player: Player, position: Position, sequence: u32, timestamp: DateTime<Utc>) -> Self {
        Self {
            player,
            position,
            sequence,
            timestamp,
        }
    }
}

/// 直近の1手のキャッシュ
/// 履歴が空でない限り常にmovesの末尾と一致する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    pub player: Player,
    pub position: Position,
}

impl From<&Move> for LastMove {
    fn from(game_move: &Move) -> Self {
        Self {
            player: game_move.player,
            position: game_move.position,
        }
    }
}

/// 勝利ラインを表す構造体
/// 勝着を通る最長の連の両端を保持する。6連以上の場合も
/// 連全体の両端をそのまま報告する
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinningLine {
    pub start: Position,
    pub end: Position,
    pub player: Player,
}

/// 対局の結果状態を表すenum
/// InProgressからWonまたはDrawへ一方向にのみ遷移する。
/// 巻き戻しはreset、または終局手をまたぐundoに限られる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOutcome {
    InProgress,
    Won { winner: Player },
    Draw,
}

impl MatchOutcome {
    /// 対局が終了しているかチェックする
    pub fn is_terminal(self) -> bool {
        !matches!(self, MatchOutcome::InProgress)
    }

    /// 勝者がいればそのプレイヤーを返す
    pub fn winner(self) -> Option<Player> {
        match self {
            MatchOutcome::Won { winner } => Some(winner),
            _ => None,
        }
    }
}
