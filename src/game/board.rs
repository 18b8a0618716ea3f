//! 五目並べの盤面状態を管理するモジュール
//! N×Nグリッドの盤面と石の配置、近傍・充填判定を担当する。

use serde::{Deserialize, Serialize};

use super::types::{Cell, Player, Position};

/// 隣接判定で走査する8方向の移動ベクトル
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1), (-1, 0), (-1, 1),  // 左上、上、右上
    (0, -1),           (0, 1),   // 左、右
    (1, -1),  (1, 0),  (1, 1),   // 左下、下、右下
];

/// 正方形の五目並べ盤面を表現する構造体
/// 一辺のサイズは対局開始時に固定され、以後変わらない。
/// 石は置かれるか、undoで直近の1個が取り除かれるだけで、移動はしない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    size: usize,
    cells: Vec<Vec<Cell>>,
}

impl Board {
    /// 指定サイズの空盤面を作成する
    pub fn new(size: usize) -> Self {
        Board {
            size,
            cells: vec![vec![Cell::Empty; size]; size],
        }
    }

    /// 盤面の一辺のマス数を返す
    pub fn size(&self) -> usize {
        self.size
    }

    /// 全マスを空に戻す
    pub fn reset(&mut self) {
        for row in self.cells.iter_mut() {
            for cell in row.iter_mut() {
                *cell = Cell::Empty;
            }
        }
    }

    /// 盤面全体を一括で置き換える
    /// リモートスナップショットの適用時に使用する。
    /// 渡すグリッドがsize×sizeであることは呼び出し側が保証すること
    /// （この関数自体は形状を検証しない）
    pub fn replace(&mut self, cells: Vec<Vec<Cell>>) {
        self.cells = cells;
    }

    /// 座標が盤面内かチェックする
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size
    }

    /// 指定した位置のセル状態を取得する
    /// 範囲外の場合はNoneを返す
    pub fn get_cell(&self, row: usize, col: usize) -> Option<Cell> {
        if self.in_bounds(row, col) {
            Some(self.cells[row][col])
        } else {
            None
        }
    }

    /// 指定した位置が空かチェックする
    /// 範囲外は常にfalse
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        matches!(self.get_cell(row, col), Some(Cell::Empty))
    }

    /// 指定した位置に石を置く
    /// 範囲外の場合は何もしない
    pub fn place(&mut self, player: Player, row: usize, col: usize) {
        if self.in_bounds(row, col) {
            self.cells[row][col] = player.to_cell();
        }
    }

    /// 指定した位置の石を取り除く
    /// 範囲外の場合は何もしない
    pub fn clear(&mut self, row: usize, col: usize) {
        if self.in_bounds(row, col) {
            self.cells[row][col] = Cell::Empty;
        }
    }

    /// 盤面に石が1つでもあるかチェックする
    pub fn has_any_stone(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .any(|&cell| cell != Cell::Empty)
    }

    /// 全マスが埋まっているかチェックする
    pub fn is_full(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .all(|&cell| cell != Cell::Empty)
    }

    /// 指定した位置の8近傍に石があるかチェックする
    /// 盤外の近傍は存在しないものとして扱い、エラーにはならない
    pub fn has_adjacent_stone(&self, row: usize, col: usize) -> bool {
        let pos = Position::new(row, col);
        NEIGHBORS.iter().any(|&(dr, dc)| {
            pos.offset(dr, dc)
                .and_then(|neighbor| self.get_cell(neighbor.row, neighbor.col))
                .map_or(false, |cell| cell != Cell::Empty)
        })
    }

    /// 盤面上の黒石と白石の数を数える
    /// 戻り値: (黒石数, 白石数)
    pub fn count_stones(&self) -> (usize, usize) {
        let mut black_count = 0;
        let mut white_count = 0;

        for row in &self.cells {
            for &cell in row {
                match cell {
                    Cell::Black => black_count += 1,
                    Cell::White => white_count += 1,
                    Cell::Empty => {}
                }
            }
        }

        (black_count, white_count)
    }

    /// スナップショット用に各マスの占有者を平坦な格子として書き出す
    pub fn cell_grid(&self) -> Vec<Vec<Option<Player>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.occupant()).collect())
            .collect()
    }

    /// デバッグ用の盤面表示文字列を生成する
    /// ●で黒、○で白、.で空マスを表現
    pub fn display(&self) -> String {
        let mut result = String::new();
        result.push_str("  ");
        for col in 0..self.size {
            result.push_str(&format!("{} ", col % 10));
        }
        result.push('\n');

        // 各行を処理して表示文字列を構築
        for (row_idx, row) in self.cells.iter().enumerate() {
            result.push_str(&format!("{} ", row_idx % 10));
            for &cell in row {
                let symbol = match cell {
                    Cell::Empty => ".",
                    Cell::Black => "●",
                    Cell::White => "○",
                };
                result.push_str(&format!("{} ", symbol));
            }
            result.push('\n');
        }

        result
    }
}
