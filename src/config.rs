//! アプリケーション設定管理モジュール
//! 対局ルールとホスト側の制限値を設定ファイルと環境変数から
//! 読み込んで管理する。

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, time::Duration};

/// Duration型をJSONでシリアライズするためのモジュール
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Durationを(secs, nanos)のタプルとしてシリアライズ
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let secs = duration.as_secs();
        let nanos = duration.subsec_nanos();
        (secs, nanos).serialize(serializer)
    }

    /// (secs, nanos)のタプルからDurationをデシリアライズ
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos) = <(u64, u32)>::deserialize(deserializer)?;
        Ok(Duration::new(secs, nanos))
    }
}

/// Option<Duration>型を同じタプル形式でシリアライズするためのモジュール
mod opt_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Some(Duration)を(secs, nanos)のタプル、Noneをnullとしてシリアライズ
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| (d.as_secs(), d.subsec_nanos()))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pair = <Option<(u64, u32)>>::deserialize(deserializer)?;
        Ok(pair.map(|(secs, nanos)| Duration::new(secs, nanos)))
    }
}

/// 1対局のルール設定を保持する構造体
/// 対局開始時に固定され、対局中は変更されない
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// 盤面の一辺のマス数
    pub board_size: usize,
    /// 勝利に必要な連の長さ
    pub win_length: usize,
    /// 持ち時間。Noneの場合は時間無制限
    #[serde(with = "opt_duration_serde")]
    pub move_time_limit: Option<Duration>,
}

impl Default for MatchConfig {
    /// 標準の15路盤・五連勝利・時間無制限
    fn default() -> Self {
        Self {
            board_size: 15,
            win_length: 5,
            move_time_limit: None,
        }
    }
}

impl MatchConfig {
    /// 対局設定の妥当性をチェックする
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.win_length < 2 {
            return Err(ConfigError::InvalidValue {
                field: "match.win_length".to_string(),
                value: self.win_length.to_string(),
            });
        }

        if self.board_size < self.win_length {
            return Err(ConfigError::InvalidValue {
                field: "match.board_size".to_string(),
                value: self.board_size.to_string(),
            });
        }

        if self.board_size > 64 {
            return Err(ConfigError::InvalidValue {
                field: "match.board_size".to_string(),
                value: self.board_size.to_string(),
            });
        }

        if let Some(limit) = self.move_time_limit {
            if limit.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "match.move_time_limit".to_string(),
                    value: "0".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// システムの制限値を定義する構造体
/// 同時対局数やセッションのタイムアウトなどのリソース制限を管理
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLimits {
    /// 同時に保持できる対局セッション数の上限
    pub max_concurrent_matches: usize,
    /// 操作のないセッションを破棄するまでの時間
    #[serde(with = "duration_serde")]
    pub session_timeout: Duration,
}

impl Default for SystemLimits {
    fn default() -> Self {
        Self {
            max_concurrent_matches: 100,
            session_timeout: Duration::from_secs(3600), // 1時間
        }
    }
}

/// アプリケーションの全設定を統合するメイン設定構造体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub match_defaults: MatchConfig,
    pub limits: SystemLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            match_defaults: MatchConfig::default(),
            limits: SystemLimits::default(),
        }
    }
}

/// 設定関連のエラーを表すenum
/// ファイル読み込み、パース、検証エラーなどを含む
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("設定ファイル読み込みエラー: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("設定ファイル解析エラー: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("環境変数エラー: {name} = {value}")]
    EnvVarError { name: String, value: String },

    #[error("設定値が無効です: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl Config {
    /// 指定したファイルパスから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 環境変数から設定を読み込む
    /// デフォルト値をベースに環境変数で上書きする
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 現在の設定に環境変数を上書き適用する
    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(board_size) = env::var("GOMOKU_BOARD_SIZE") {
            self.match_defaults.board_size =
                board_size.parse().map_err(|_| ConfigError::EnvVarError {
                    name: "GOMOKU_BOARD_SIZE".to_string(),
                    value: board_size,
                })?;
        }

        if let Ok(win_length) = env::var("GOMOKU_WIN_LENGTH") {
            self.match_defaults.win_length =
                win_length.parse().map_err(|_| ConfigError::EnvVarError {
                    name: "GOMOKU_WIN_LENGTH".to_string(),
                    value: win_length,
                })?;
        }

        // 0を指定すると時間無制限になる
        if let Ok(move_time) = env::var("GOMOKU_MOVE_TIME_SECS") {
            let secs: u64 = move_time.parse().map_err(|_| ConfigError::EnvVarError {
                name: "GOMOKU_MOVE_TIME_SECS".to_string(),
                value: move_time,
            })?;
            self.match_defaults.move_time_limit = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }

        if let Ok(max_matches) = env::var("GOMOKU_MAX_MATCHES") {
            self.limits.max_concurrent_matches =
                max_matches.parse().map_err(|_| ConfigError::EnvVarError {
                    name: "GOMOKU_MAX_MATCHES".to_string(),
                    value: max_matches,
                })?;
        }

        if let Ok(timeout) = env::var("GOMOKU_SESSION_TIMEOUT_SECS") {
            let secs: u64 = timeout.parse().map_err(|_| ConfigError::EnvVarError {
                name: "GOMOKU_SESSION_TIMEOUT_SECS".to_string(),
                value: timeout,
            })?;
            self.limits.session_timeout = Duration::from_secs(secs);
        }

        Ok(())
    }

    /// 設定ファイルと環境変数を結合して設定を読み込む
    /// 設定ファイルがなくてもデフォルト値で動作する
    pub fn load() -> Self {
        let mut config = Config::default();

        if let Ok(file_config) = Self::from_file("config.json") {
            config = file_config;
        } else if let Ok(file_config) = Self::from_file("config/app.json") {
            config = file_config;
        } else if let Ok(file_config) = Self::from_file("/etc/gomoku/config.json") {
            config = file_config;
        }

        // 環境変数で設定を上書き
        let _ = config.apply_env();

        config
    }

    /// 現在の設定を指定したファイルに保存する
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// 設定値の妥当性をチェックする
    /// 不正な値がある場合はConfigErrorを返す
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.match_defaults.validate()?;

        if self.limits.max_concurrent_matches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_concurrent_matches".to_string(),
                value: self.limits.max_concurrent_matches.to_string(),
            });
        }

        if self.limits.session_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "limits.session_timeout".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
