//! 五目並べのルール判定モジュール
//! 着手可能判定（隣接制約）と勝利判定、勝利ラインの抽出を担当する。

use super::board::Board;
use super::types::{Player, Position, WinningLine};
use crate::error::{GameError, Result};

/// 勝利判定で走査する4軸の方向ベクトル
/// 縦、横、右下斜め、左下斜めの順。複数の軸が同時に成立した場合は
/// この順で最初に成立した軸を勝利ラインとして採用する
const DIRECTIONS: [(i64, i64); 4] = [
    (1, 0),  // 縦
    (0, 1),  // 横
    (1, 1),  // 右下斜め
    (1, -1), // 左下斜め
];

/// 五目並べのルールを実装する構造体
/// 勝利に必要な連の長さのみを設定として保持し、可変状態は持たない
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GomokuRules {
    win_length: usize,
}

impl GomokuRules {
    /// 指定した連の長さでルールを作成する
    pub fn new(win_length: usize) -> Self {
        GomokuRules { win_length }
    }

    /// 勝利に必要な連の長さを返す
    pub fn win_length(&self) -> usize {
        self.win_length
    }

    /// 着手の合法性を判定し、不合法の場合は理由付きのエラーを返す
    /// 盤面に石がない初手は盤内の空マスならどこでも合法。
    /// 2手目以降は既存の石の8近傍に限られる
    pub fn check_move(&self, board: &Board, row: usize, col: usize) -> Result<()> {
        if !board.in_bounds(row, col) {
            return Err(GameError::OutOfBounds { row, col });
        }
        if !board.is_empty(row, col) {
            return Err(GameError::CellOccupied { row, col });
        }
        if board.has_any_stone() && !board.has_adjacent_stone(row, col) {
            return Err(GameError::NotAdjacentToAnyStone { row, col });
        }
        Ok(())
    }

    /// 指定した位置に着手できるかチェックする
    pub fn is_valid_move(&self, board: &Board, row: usize, col: usize) -> bool {
        self.check_move(board, row, col).is_ok()
    }

    /// 現在の盤面で合法な着手を全て取得する
    /// 隣接制約により候補は既存の石の周辺に絞られる
    pub fn valid_moves(&self, board: &Board) -> Vec<Position> {
        let mut moves = Vec::new();

        for row in 0..board.size() {
            for col in 0..board.size() {
                if self.is_valid_move(board, row, col) {
                    moves.push(Position::new(row, col));
                }
            }
        }

        moves
    }

    /// 指定した位置に石を置いた場合に勝利となるかチェックする
    pub fn is_winning_move(&self, board: &Board, row: usize, col: usize, player: Player) -> bool {
        self.detect_winning_line(board, row, col, player).is_some()
    }

    /// 指定した位置を通る勝利ラインを検出する
    /// 4軸それぞれについて前方・後方に連続する自石を数え、
    /// 着手マス自身を含めてwin_length以上なら勝利。
    /// ラインの両端は実際の連の長さから計算する（6連以上も全体を報告）
    pub fn detect_winning_line(
        &self,
        board: &Board,
        row: usize,
        col: usize,
        player: Player,
    ) -> Option<WinningLine> {
        for &(dr, dc) in &DIRECTIONS {
            let forward = self.count_run(board, row, col, dr, dc, player);
            let backward = self.count_run(board, row, col, -dr, -dc, player);

            if 1 + forward + backward >= self.win_length {
                let start = Position::new(
                    (row as i64 - backward as i64 * dr) as usize,
                    (col as i64 - backward as i64 * dc) as usize,
                );
                let end = Position::new(
                    (row as i64 + forward as i64 * dr) as usize,
                    (col as i64 + forward as i64 * dc) as usize,
                );
                return Some(WinningLine { start, end, player });
            }
        }

        None
    }

    /// 起点の次のマスから指定方向へ連続する自石の数を数える
    fn count_run(
        &self,
        board: &Board,
        row: usize,
        col: usize,
        dr: i64,
        dc: i64,
        player: Player,
    ) -> usize {
        let mut count = 0;
        let mut pos = Position::new(row, col);

        while let Some(next) = pos.offset(dr, dc) {
            if board.get_cell(next.row, next.col) != Some(player.to_cell()) {
                break;
            }
            count += 1;
            pos = next;
        }

        count
    }
}
