//! 対局エンジンモジュール
//! 盤面、手番、履歴、持ち時間、結果を所有する状態機械。
//! 着手・undo・投了・時間切れの各操作と、リモート同期用の
//! スナップショット生成・適用を提供する。
//! 全ての操作は同期的に完了し、内部でロックは持たない。
//! 並行ホストに組み込む場合は呼び出し側が書き込みを直列化すること。

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use super::board::Board;
use super::clock::MatchClock;
use super::rules::GomokuRules;
use super::types::{Cell, LastMove, MatchOutcome, Move, Player, Position, WinningLine};
use crate::config::MatchConfig;
use crate::error::{GameError, Result};
use crate::sync::snapshot::{
    GameSnapshot, MoveSnapshot, WinningLineSnapshot, SNAPSHOT_FORMAT_VERSION,
};

/// 1対局の全状態を所有するエンジン
/// 盤面・履歴・時計・結果はこのエンジンだけが所有し、
/// 生成されたスナップショットはエンジンと状態を共有しない
#[derive(Debug, Clone)]
pub struct GameEngine {
    id: Uuid,
    config: MatchConfig,
    rules: GomokuRules,
    board: Board,
    /// 履歴の再生起点となる盤面。リセット時は空盤面、
    /// スナップショット適用後は適用された盤面になる
    history_base: Board,
    current_player: Player,
    outcome: MatchOutcome,
    moves: Vec<Move>,
    last_move: Option<LastMove>,
    winning_line: Option<WinningLine>,
    clock: Option<MatchClock>,
    party_code: Option<String>,
    symbol_preferences: BTreeMap<String, (String, String)>,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl GameEngine {
    /// 設定を検証して新しい対局を作成する
    /// 初期状態: 黒の手番、空盤面、持ち時間は設定値
    pub fn new(config: MatchConfig) -> Result<Self> {
        Self::new_with_id(Uuid::new_v4(), config)
    }

    /// 指定IDで新しい対局を作成する
    /// テストや特定のIDが必要な場合に使用
    pub fn new_with_id(id: Uuid, config: MatchConfig) -> Result<Self> {
        config.validate()?;
        let now = Utc::now();
        let board = Board::new(config.board_size);

        Ok(Self {
            id,
            rules: GomokuRules::new(config.win_length),
            history_base: board.clone(),
            board,
            current_player: Player::Black,
            outcome: MatchOutcome::InProgress,
            moves: Vec::new(),
            last_move: None,
            winning_line: None,
            clock: config.move_time_limit.map(MatchClock::new),
            party_code: None,
            symbol_preferences: BTreeMap::new(),
            created_at: now,
            last_updated: now,
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current_player(&self) -> Player {
        self.current_player
    }

    pub fn outcome(&self) -> MatchOutcome {
        self.outcome
    }

    /// 着手履歴を古い順に返す
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn last_move(&self) -> Option<LastMove> {
        self.last_move
    }

    pub fn winning_line(&self) -> Option<WinningLine> {
        self.winning_line
    }

    /// 対局が終了しているかチェックする
    pub fn is_finished(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// 現在の盤面で合法な着手を全て取得する
    pub fn valid_moves(&self) -> Vec<Position> {
        self.rules.valid_moves(&self.board)
    }

    /// 指定プレイヤーの残り時間を返す。時間無制限の対局ではNone
    pub fn time_remaining(&self, player: Player) -> Option<Duration> {
        self.clock.map(|clock| clock.remaining(player))
    }

    /// 手番開始時刻を返す。計時していない場合はNone
    pub fn turn_started_at(&self) -> Option<DateTime<Utc>> {
        self.clock.and_then(|clock| clock.turn_started_at())
    }

    /// 現在の手番プレイヤーが時間切れかチェックする
    /// 時間無制限の対局では常にfalse
    pub fn clock_expired(&self, now: DateTime<Utc>) -> bool {
        self.clock
            .map_or(false, |clock| clock.has_expired(self.current_player, now))
    }

    pub fn party_code(&self) -> Option<&str> {
        self.party_code.as_deref()
    }

    /// リモートサービスが発行する合言葉を設定する。コアでは解釈しない
    pub fn set_party_code(&mut self, code: Option<String>) {
        self.party_code = code;
    }

    pub fn symbol_preferences(&self) -> &BTreeMap<String, (String, String)> {
        &self.symbol_preferences
    }

    /// プレイヤー識別子ごとの表示設定を登録する。コアでは解釈しない
    pub fn set_symbol_preference(&mut self, identity: impl Into<String>, prefs: (String, String)) {
        self.symbol_preferences.insert(identity.into(), prefs);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// 現在の手番プレイヤーの計時を開始する
    /// 対局画面の表示開始などホスト側の契機で呼び出す。
    /// 時間無制限の対局や終局後は何もしない
    pub fn start_clock(&mut self, now: DateTime<Utc>) {
        if self.outcome.is_terminal() {
            return;
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.start_turn(now);
        }
    }

    /// 指定した位置に現在の手番プレイヤーの石を置く
    /// 成功時は盤面・履歴・手番・時計を更新し、着手後の結果を返す。
    /// 時間切れの場合はClockExpiredを返すだけで終局はさせないので、
    /// 呼び出し側がtimeout_current_playerで終局させること
    pub fn place_stone(
        &mut self,
        row: usize,
        col: usize,
        now: DateTime<Utc>,
    ) -> Result<MatchOutcome> {
        if self.outcome.is_terminal() {
            return Err(GameError::MatchAlreadyTerminal);
        }

        if let Some(clock) = &self.clock {
            if clock.has_expired(self.current_player, now) {
                return Err(GameError::ClockExpired {
                    player: self.current_player,
                });
            }
        }

        self.rules.check_move(&self.board, row, col)?;

        let player = self.current_player;
        let position = Position::new(row, col);
        self.board.place(player, row, col);

        let sequence = self.moves.len() as u32;
        let game_move = Move::new(player, position, sequence, now);
        self.moves.push(game_move);
        self.last_move = Some(LastMove::from(&game_move));

        if let Some(line) = self.rules.detect_winning_line(&self.board, row, col, player) {
            // 勝利確定。以降の判定は行わない
            self.outcome = MatchOutcome::Won { winner: player };
            self.winning_line = Some(line);
            if let Some(clock) = self.clock.as_mut() {
                clock.charge(player, now);
            }
        } else if self.board.is_full() {
            self.outcome = MatchOutcome::Draw;
            if let Some(clock) = self.clock.as_mut() {
                clock.charge(player, now);
            }
        } else {
            // 手番を交代し、次のプレイヤーの計時を開始する
            if let Some(clock) = self.clock.as_mut() {
                clock.charge(player, now);
                clock.start_turn(now);
            }
            self.current_player = player.opposite();
        }

        self.last_updated = now;
        debug_assert!(self.history_matches_board());
        Ok(self.outcome)
    }

    /// 直近の1手を取り消す
    /// 履歴が空の場合はNoneを返して何もしない。盤面から石を取り除き、
    /// 終局状態を解除し、手番を取り消した手のプレイヤーに戻す。
    /// 繰り返し呼べば1手ずつ遡る。次の着手まで計時は止まる
    pub fn undo_last_move(&mut self) -> Option<Move> {
        let removed = self.moves.pop()?;

        self.board.clear(removed.position.row, removed.position.col);
        self.last_move = self.moves.last().map(LastMove::from);
        self.outcome = MatchOutcome::InProgress;
        self.winning_line = None;
        self.current_player = removed.player;

        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }

        debug_assert!(self.history_matches_board());
        Some(removed)
    }

    /// 現在の手番プレイヤーを時間切れ負けとして終局させる
    /// この操作自体は時間切れの検証を行わない。clock_expiredまたは
    /// place_stoneのClockExpiredで確認してから呼ぶのは呼び出し側の責任
    pub fn timeout_current_player(&mut self, now: DateTime<Utc>) -> Result<MatchOutcome> {
        if self.outcome.is_terminal() {
            return Err(GameError::MatchAlreadyTerminal);
        }

        self.outcome = MatchOutcome::Won {
            winner: self.current_player.opposite(),
        };
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.last_updated = now;
        Ok(self.outcome)
    }

    /// 指定したプレイヤーの投了として終局させる
    /// どちらのプレイヤーも相手の手番中に投了できる
    pub fn resign(&mut self, player: Player) -> Result<MatchOutcome> {
        if self.outcome.is_terminal() {
            return Err(GameError::MatchAlreadyTerminal);
        }

        self.outcome = MatchOutcome::Won {
            winner: player.opposite(),
        };
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        Ok(self.outcome)
    }

    /// 対局を初期状態に戻す
    /// 盤面・履歴・結果・持ち時間を全てリセットする。
    /// パーティコードなどのパススルー項目は保持する
    pub fn reset(&mut self) {
        self.board.reset();
        self.history_base = self.board.clone();
        self.moves.clear();
        self.last_move = None;
        self.winning_line = None;
        self.outcome = MatchOutcome::InProgress;
        self.current_player = Player::Black;

        if let (Some(clock), Some(limit)) = (self.clock.as_mut(), self.config.move_time_limit) {
            clock.reset(limit);
        }
    }

    /// 現在の状態から独立したスナップショットを生成する
    /// 生成されたスナップショットを変更してもエンジンには影響しない
    pub fn to_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            version: SNAPSHOT_FORMAT_VERSION,
            board: self.board.cell_grid(),
            moves: self
                .moves
                .iter()
                .map(|m| MoveSnapshot {
                    row: m.position.row,
                    col: m.position.col,
                    player: m.player,
                })
                .collect(),
            current_player: self.current_player,
            winner: self.outcome.winner(),
            is_draw: self.outcome == MatchOutcome::Draw,
            last_move: self.last_move.map(|m| MoveSnapshot {
                row: m.position.row,
                col: m.position.col,
                player: m.player,
            }),
            winning_line: self.winning_line.map(|line| WinningLineSnapshot {
                start_row: line.start.row,
                start_col: line.start.col,
                end_row: line.end.row,
                end_col: line.end.col,
                player: line.player,
            }),
            party_code: self.party_code.clone(),
            player_symbol_preferences: self.symbol_preferences.clone(),
            black_time_remaining: self
                .clock
                .map(|clock| clock.remaining(Player::Black).as_secs_f64()),
            white_time_remaining: self
                .clock
                .map(|clock| clock.remaining(Player::White).as_secs_f64()),
            turn_started_at: self
                .clock
                .and_then(|clock| clock.turn_started_at())
                .map(|at| at.timestamp_millis()),
        }
    }

    /// 受信したスナップショットで対局状態を全面的に置き換える
    /// 検証に失敗した場合はエンジンの状態を一切変更せずに
    /// MalformedSnapshotを返す。適用時にローカルの着手履歴は破棄される
    /// （受信したスナップショットを新たな正とし、マージや差分照合は行わない）
    pub fn apply_snapshot(&mut self, snapshot: &GameSnapshot) -> Result<()> {
        let size = self.board.size();
        if snapshot.board.len() != size {
            return Err(GameError::MalformedSnapshot {
                reason: format!("board has {} rows, expected {}", snapshot.board.len(), size),
            });
        }

        let mut cells: Vec<Vec<Cell>> = Vec::with_capacity(size);
        for (row_idx, row) in snapshot.board.iter().enumerate() {
            if row.len() != size {
                return Err(GameError::MalformedSnapshot {
                    reason: format!(
                        "board row {} has {} cells, expected {}",
                        row_idx,
                        row.len(),
                        size
                    ),
                });
            }
            cells.push(
                row.iter()
                    .map(|occupant| occupant.map_or(Cell::Empty, Player::to_cell))
                    .collect(),
            );
        }

        let black_remaining = decode_seconds("blackTimeRemaining", snapshot.black_time_remaining)?;
        let white_remaining = decode_seconds("whiteTimeRemaining", snapshot.white_time_remaining)?;
        let turn_started_at = match snapshot.turn_started_at {
            Some(millis) => Some(DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(
                || GameError::MalformedSnapshot {
                    reason: format!("turnStartedAt {} is out of range", millis),
                },
            )?),
            None => None,
        };

        // 検証が全て通った。ここから先は失敗しない
        self.board.replace(cells);
        self.history_base = self.board.clone();
        self.current_player = snapshot.current_player;
        // winnerとisDrawが両方立っていた場合はwinnerを優先する
        self.outcome = if let Some(winner) = snapshot.winner {
            MatchOutcome::Won { winner }
        } else if snapshot.is_draw {
            MatchOutcome::Draw
        } else {
            MatchOutcome::InProgress
        };
        self.last_move = snapshot.last_move.as_ref().map(|m| LastMove {
            player: m.player,
            position: Position::new(m.row, m.col),
        });
        self.winning_line = snapshot.winning_line.as_ref().map(|line| WinningLine {
            start: Position::new(line.start_row, line.start_col),
            end: Position::new(line.end_row, line.end_col),
            player: line.player,
        });
        self.party_code = snapshot.party_code.clone();
        self.symbol_preferences = snapshot.player_symbol_preferences.clone();

        if let Some(clock) = self.clock.as_mut() {
            if let Some(remaining) = black_remaining {
                clock.set_remaining(Player::Black, remaining);
            }
            if let Some(remaining) = white_remaining {
                clock.set_remaining(Player::White, remaining);
            }
            match turn_started_at {
                Some(at) => clock.start_turn(at),
                None => clock.stop(),
            }
        }

        // 受信側の履歴は空から始まる
        self.moves.clear();
        self.last_updated = Utc::now();
        Ok(())
    }

    /// 履歴を再生起点の盤面へ再生した結果が現在の盤面と一致するかチェックする
    fn history_matches_board(&self) -> bool {
        let mut replayed = self.history_base.clone();
        for game_move in &self.moves {
            replayed.place(game_move.player, game_move.position.row, game_move.position.col);
        }
        replayed == self.board
    }
}

/// スナップショットの秒数フィールドをDurationに変換する
/// 負数やNaNはMalformedSnapshot
fn decode_seconds(field: &str, value: Option<f64>) -> Result<Option<Duration>> {
    match value {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| GameError::MalformedSnapshot {
                reason: format!("{} {} is not a valid duration", field, secs),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn untimed_engine() -> GameEngine {
        GameEngine::new(MatchConfig::default()).unwrap()
    }

    fn timed_engine(limit_secs: u64) -> GameEngine {
        GameEngine::new(MatchConfig {
            move_time_limit: Some(Duration::from_secs(limit_secs)),
            ..MatchConfig::default()
        })
        .unwrap()
    }

    /// 黒が(7,7)から横に5連を作るまでの交互の着手列
    fn play_black_horizontal_win(engine: &mut GameEngine) {
        let script = [
            (7usize, 7usize),
            (8, 7),
            (7, 8),
            (8, 8),
            (7, 9),
            (8, 9),
            (7, 10),
            (8, 10),
            (7, 11),
        ];
        for (i, &(row, col)) in script.iter().enumerate() {
            engine.place_stone(row, col, at(i as i64)).unwrap();
        }
    }

    #[test]
    fn test_engine_new_initial_state() {
        let engine = untimed_engine();

        assert_eq!(engine.current_player(), Player::Black);
        assert_eq!(engine.outcome(), MatchOutcome::InProgress);
        assert!(!engine.is_finished());
        assert_eq!(engine.move_count(), 0);
        assert_eq!(engine.last_move(), None);
        assert_eq!(engine.winning_line(), None);
        assert_eq!(engine.time_remaining(Player::Black), None);
        assert_eq!(engine.config().board_size, 15);
    }

    #[test]
    fn test_engine_rejects_invalid_config() {
        let result = GameEngine::new(MatchConfig {
            board_size: 4,
            win_length: 5,
            move_time_limit: None,
        });
        assert!(matches!(result, Err(GameError::InvalidConfig { .. })));
    }

    #[test]
    fn test_place_stone_alternates_players() {
        let mut engine = untimed_engine();

        engine.place_stone(7, 7, at(0)).unwrap();
        assert_eq!(engine.current_player(), Player::White);
        engine.place_stone(7, 8, at(1)).unwrap();
        assert_eq!(engine.current_player(), Player::Black);

        let moves = engine.moves();
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].player, Player::Black);
        assert_eq!(moves[0].sequence, 0);
        assert_eq!(moves[1].player, Player::White);
        assert_eq!(moves[1].sequence, 1);
        assert_eq!(
            engine.last_move(),
            Some(LastMove {
                player: Player::White,
                position: Position::new(7, 8),
            })
        );
        assert_eq!(engine.last_updated(), at(1));
    }

    #[test]
    fn test_place_stone_rejects_illegal_moves() {
        let mut engine = untimed_engine();
        engine.place_stone(7, 7, at(0)).unwrap();

        assert!(matches!(
            engine.place_stone(99, 0, at(1)),
            Err(GameError::OutOfBounds { .. })
        ));
        assert!(matches!(
            engine.place_stone(7, 7, at(1)),
            Err(GameError::CellOccupied { .. })
        ));
        assert!(matches!(
            engine.place_stone(0, 0, at(1)),
            Err(GameError::NotAdjacentToAnyStone { .. })
        ));

        // 失敗した操作は状態を変更しない
        assert_eq!(engine.move_count(), 1);
        assert_eq!(engine.current_player(), Player::White);
    }

    #[test]
    fn test_win_detection_and_retention() {
        let mut engine = untimed_engine();
        play_black_horizontal_win(&mut engine);

        assert_eq!(
            engine.outcome(),
            MatchOutcome::Won {
                winner: Player::Black
            }
        );
        let line = engine.winning_line().unwrap();
        assert_eq!(line.start, Position::new(7, 7));
        assert_eq!(line.end, Position::new(7, 11));
        assert_eq!(line.player, Player::Black);

        // 終局後の着手は拒否される
        assert!(matches!(
            engine.place_stone(9, 9, at(100)),
            Err(GameError::MatchAlreadyTerminal)
        ));
    }

    #[test]
    fn test_undo_round_trip() {
        let mut engine = untimed_engine();
        engine.place_stone(7, 7, at(0)).unwrap();

        let board_before = engine.board().clone();
        engine.place_stone(8, 8, at(1)).unwrap();

        let undone = engine.undo_last_move().unwrap();
        assert_eq!(undone.position, Position::new(8, 8));
        assert_eq!(undone.player, Player::White);

        assert_eq!(engine.board(), &board_before);
        assert_eq!(engine.current_player(), Player::White);
        assert_eq!(engine.outcome(), MatchOutcome::InProgress);
        assert_eq!(
            engine.last_move(),
            Some(LastMove {
                player: Player::Black,
                position: Position::new(7, 7),
            })
        );
    }

    #[test]
    fn test_undo_clears_terminal_outcome() {
        let mut engine = untimed_engine();
        play_black_horizontal_win(&mut engine);
        assert!(engine.is_finished());

        let undone = engine.undo_last_move().unwrap();
        assert_eq!(undone.player, Player::Black);
        assert_eq!(engine.outcome(), MatchOutcome::InProgress);
        assert_eq!(engine.winning_line(), None);
        // 手番は取り消した手のプレイヤーに戻る
        assert_eq!(engine.current_player(), Player::Black);
    }

    #[test]
    fn test_undo_on_empty_history_is_noop() {
        let mut engine = untimed_engine();
        assert_eq!(engine.undo_last_move(), None);
        assert_eq!(engine.outcome(), MatchOutcome::InProgress);
    }

    #[test]
    fn test_resign() {
        let mut engine = untimed_engine();
        engine.place_stone(7, 7, at(0)).unwrap();

        // 相手の手番中でも投了できる
        let outcome = engine.resign(Player::Black).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Won {
                winner: Player::White
            }
        );

        assert!(matches!(
            engine.resign(Player::White),
            Err(GameError::MatchAlreadyTerminal)
        ));
    }

    #[test]
    fn test_timeout_current_player() {
        let mut engine = untimed_engine();

        let outcome = engine.timeout_current_player(at(0)).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Won {
                winner: Player::White
            }
        );

        assert!(matches!(
            engine.timeout_current_player(at(1)),
            Err(GameError::MatchAlreadyTerminal)
        ));
    }

    #[test]
    fn test_clock_charged_on_completed_move() {
        let mut engine = timed_engine(30);
        engine.start_clock(at(0));

        engine.place_stone(7, 7, at(10)).unwrap();

        assert_eq!(
            engine.time_remaining(Player::Black),
            Some(Duration::from_secs(20))
        );
        assert_eq!(
            engine.time_remaining(Player::White),
            Some(Duration::from_secs(30))
        );
        // 白の手番の計時が始まっている
        assert_eq!(engine.turn_started_at(), Some(at(10)));
    }

    #[test]
    fn test_clock_expired_rejects_placement() {
        let mut engine = timed_engine(30);
        engine.start_clock(at(0));

        assert!(engine.clock_expired(at(31)));
        assert!(matches!(
            engine.place_stone(7, 7, at(31)),
            Err(GameError::ClockExpired {
                player: Player::Black
            })
        ));
        assert_eq!(engine.move_count(), 0);

        let outcome = engine.timeout_current_player(at(31)).unwrap();
        assert_eq!(
            outcome,
            MatchOutcome::Won {
                winner: Player::White
            }
        );
    }

    #[test]
    fn test_reset() {
        let mut engine = timed_engine(30);
        engine.set_party_code(Some("ROOM42".to_string()));
        engine.start_clock(at(0));
        engine.place_stone(7, 7, at(5)).unwrap();
        engine.place_stone(7, 8, at(6)).unwrap();

        engine.reset();

        assert_eq!(engine.outcome(), MatchOutcome::InProgress);
        assert_eq!(engine.current_player(), Player::Black);
        assert_eq!(engine.move_count(), 0);
        assert!(!engine.board().has_any_stone());
        assert_eq!(engine.last_move(), None);
        assert_eq!(
            engine.time_remaining(Player::Black),
            Some(Duration::from_secs(30))
        );
        // パススルー項目は保持される
        assert_eq!(engine.party_code(), Some("ROOM42"));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut engine = timed_engine(30);
        engine.set_party_code(Some("ROOM42".to_string()));
        engine.set_symbol_preference("player-abc", ("cross".to_string(), "large".to_string()));
        engine.start_clock(at(0));
        engine.place_stone(7, 7, at(5)).unwrap();
        engine.place_stone(8, 8, at(9)).unwrap();

        let snapshot = engine.to_snapshot();
        assert_eq!(snapshot.moves.len(), 2);
        assert_eq!(snapshot.black_time_remaining, Some(25.0));

        let mut peer = timed_engine(30);
        peer.apply_snapshot(&snapshot).unwrap();

        assert_eq!(peer.board(), engine.board());
        assert_eq!(peer.current_player(), engine.current_player());
        assert_eq!(peer.outcome(), engine.outcome());
        assert_eq!(peer.last_move(), engine.last_move());
        assert_eq!(peer.winning_line(), engine.winning_line());
        assert_eq!(peer.party_code(), engine.party_code());
        assert_eq!(peer.symbol_preferences(), engine.symbol_preferences());
        assert_eq!(peer.time_remaining(Player::Black), engine.time_remaining(Player::Black));
        assert_eq!(peer.turn_started_at(), engine.turn_started_at());
        // 適用側の履歴は空から始まる
        assert!(peer.moves().is_empty());
    }

    #[test]
    fn test_snapshot_is_detached_from_engine() {
        let mut engine = untimed_engine();
        engine.place_stone(7, 7, at(0)).unwrap();

        let mut snapshot = engine.to_snapshot();
        snapshot.board[0][0] = Some(Player::White);
        snapshot.party_code = Some("HACKED".to_string());

        // スナップショットを書き換えてもエンジンには影響しない
        assert_eq!(engine.board().get_cell(0, 0), Some(Cell::Empty));
        assert_eq!(engine.party_code(), None);
    }

    #[test]
    fn test_apply_snapshot_wrong_shape_leaves_state_untouched() {
        let mut engine = untimed_engine();
        engine.place_stone(7, 7, at(0)).unwrap();
        let board_before = engine.board().clone();

        let mut snapshot = engine.to_snapshot();
        snapshot.board.pop();

        let result = engine.apply_snapshot(&snapshot);
        assert!(matches!(result, Err(GameError::MalformedSnapshot { .. })));
        assert_eq!(engine.board(), &board_before);
        assert_eq!(engine.move_count(), 1);
    }

    #[test]
    fn test_apply_snapshot_negative_clock_is_malformed() {
        let mut engine = timed_engine(30);
        let mut snapshot = engine.to_snapshot();
        snapshot.black_time_remaining = Some(-3.0);

        let result = engine.apply_snapshot(&snapshot);
        assert!(matches!(result, Err(GameError::MalformedSnapshot { .. })));
        assert_eq!(
            engine.time_remaining(Player::Black),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_terminal_snapshot_applies_outcome() {
        let mut engine = untimed_engine();
        play_black_horizontal_win(&mut engine);
        let snapshot = engine.to_snapshot();

        let mut peer = untimed_engine();
        peer.apply_snapshot(&snapshot).unwrap();

        assert_eq!(
            peer.outcome(),
            MatchOutcome::Won {
                winner: Player::Black
            }
        );
        assert_eq!(peer.winning_line(), engine.winning_line());
        // 適用後の着手も拒否される
        assert!(matches!(
            peer.place_stone(0, 0, at(50)),
            Err(GameError::MatchAlreadyTerminal)
        ));
    }
}
