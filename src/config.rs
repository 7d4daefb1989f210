//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::SiteDefinition;
use crate::search::morphology::Language;

const DEFAULT_FREQUENCY_LIMIT: i64 = 20;
const DEFAULT_SNIPPET_LENGTH: i64 = 500;
const DEFAULT_SNIPPET_INDENT: i64 = 50;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Sites to crawl / 需要索引的站点
    #[serde(default)]
    pub sites: Vec<SiteDefinition>,
    /// Crawler configuration / 爬虫配置
    #[serde(default)]
    pub crawler: CrawlerConfig,
    /// Search configuration / 搜索配置
    #[serde(default)]
    pub search: SearchConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Database file path (relative to data_dir) / 数据库文件路径
    pub db_file: String,
}

/// Crawler configuration / 爬虫配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    pub user_agent: String,
    pub referrer: String,
    /// Courtesy delay before each child page / 抓取子页面前的礼貌延迟
    pub request_delay_ms: u64,
    /// Per-request timeout, 0 = none / 单次请求超时，0 表示不限制
    pub fetch_timeout_secs: u64,
    /// Max concurrent fetches, 0 = number of CPUs / 最大并发抓取数
    pub max_concurrency: usize,
    /// stopIndexing polling interval / 停止索引时的轮询间隔
    pub stop_poll_interval_ms: u64,
    pub follow_redirects: bool,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Lemmas found on more pages than this are ignored / 词频上限
    pub frequency_limit: i64,
    /// Max snippet length / 摘要最大长度
    pub snippet_length: i64,
    /// Text kept before the first match / 首个匹配前保留的文本长度
    pub snippet_indent: i64,
    /// Morphology language / 词形分析语言
    pub language: Language,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "search_engine.db".to_string(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: "LemmaSearchBot/1.0".to_string(),
            referrer: "http://www.google.com".to_string(),
            request_delay_ms: 100,
            fetch_timeout_secs: 30,
            max_concurrency: 0,
            stop_poll_interval_ms: 200,
            follow_redirects: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            frequency_limit: DEFAULT_FREQUENCY_LIMIT,
            snippet_length: DEFAULT_SNIPPET_LENGTH,
            snippet_indent: DEFAULT_SNIPPET_INDENT,
            language: Language::Russian,
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        (self.fetch_timeout_secs > 0).then(|| Duration::from_secs(self.fetch_timeout_secs))
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms.max(1))
    }

    /// Effective fetch parallelism / 实际并发数
    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            num_cpus::get()
        }
    }
}

impl SearchConfig {
    /// Non-positive limit falls back to 20 / 非正数时使用默认值 20
    pub fn effective_frequency_limit(&self) -> i64 {
        if self.frequency_limit > 0 {
            self.frequency_limit
        } else {
            DEFAULT_FREQUENCY_LIMIT
        }
    }

    pub fn effective_snippet_length(&self) -> usize {
        if self.snippet_length > 0 {
            self.snippet_length as usize
        } else {
            DEFAULT_SNIPPET_LENGTH as usize
        }
    }

    pub fn effective_snippet_indent(&self) -> usize {
        if self.snippet_indent > 0 {
            self.snippet_indent as usize
        } else {
            DEFAULT_SNIPPET_INDENT as usize
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path / 从指定路径加载配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?} ({} sites)", config_path, config.sites.len());
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
