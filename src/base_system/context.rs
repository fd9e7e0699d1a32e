//! 全局配置结构（Config / RunConfig）与默认值。
//!
//! `Config` 对应磁盘上的 `config.yml`；`RunConfig` 是合并命令行参数并校验后的
//! 不可变运行配置，整个进程生命周期内只构建一次。

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};

/// 文件名（不含扩展名）的最大字节数，留出 `{index}-` 前缀与 `.epub` 后缀的空间。
const MAX_STEM_BYTES: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 站点配置
    #[serde(default = "default_base_url")]
    pub base_url: String,

    // 网络配置
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_false")]
    pub random_user_agent: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    // 路径配置
    #[serde(default)]
    pub save_path: String,
    #[serde(default = "default_error_log_path")]
    pub error_log_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_workers: default_max_workers(),
            random_user_agent: default_false(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            save_path: String::new(),
            error_log_path: default_error_log_path(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 7] = [
            FieldMeta {
                name: "base_url",
                description: "书籍页面地址前缀，实际请求为 {base_url}/{id}",
            },
            FieldMeta {
                name: "max_workers",
                description: "每批最大并发页面数（同时也是每个主机的空闲连接上限）",
            },
            FieldMeta {
                name: "random_user_agent",
                description: "每次抓取页面时是否随机选择 User-Agent",
            },
            FieldMeta {
                name: "user_agent",
                description: "默认 User-Agent",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒），0 表示不设超时",
            },
            FieldMeta {
                name: "save_path",
                description: "EPUB 保存路径（留空为当前目录）",
            },
            FieldMeta {
                name: "error_log_path",
                description: "下载失败链接记录文件，每行一个链接",
            },
        ];
        &FIELDS
    }
}

/// 命令行传入、优先级高于 `config.yml` 的参数。
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub output: Option<String>,
    pub concurrency: Option<usize>,
    pub random_user_agent: bool,
    pub start_id: u32,
    pub stop_id: u32,
}

/// 校验后的运行配置。
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub random_user_agent: bool,
    pub start_id: u32,
    pub stop_id: u32,
    pub base_url: String,
    pub user_agent: String,
    pub error_log: PathBuf,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    /// 合并命令行参数并校验，得到本次运行的 `RunConfig`。
    pub fn run_config(&self, overrides: RunOverrides) -> Result<RunConfig, ConfigError> {
        let concurrency = overrides.concurrency.unwrap_or(self.max_workers);
        if concurrency == 0 {
            return Err(ConfigError::Validation(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if overrides.start_id > overrides.stop_id {
            return Err(ConfigError::Validation(format!(
                "start id {} is greater than stop id {}",
                overrides.start_id, overrides.stop_id
            )));
        }
        let base_url = self.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ConfigError::Validation("base_url is empty".to_string()));
        }

        let output_dir = match overrides.output {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => self.default_save_dir(),
        };

        Ok(RunConfig {
            output_dir,
            concurrency,
            random_user_agent: overrides.random_user_agent || self.random_user_agent,
            start_id: overrides.start_id,
            stop_id: overrides.stop_id,
            base_url,
            user_agent: self.user_agent.clone(),
            error_log: PathBuf::from(&self.error_log_path),
            request_timeout: (self.request_timeout > 0)
                .then(|| Duration::from_secs(self.request_timeout)),
        })
    }
}

impl RunConfig {
    pub fn ids(&self) -> RangeInclusive<u32> {
        self.start_id..=self.stop_id
    }

    pub fn page_count(&self) -> u64 {
        u64::from(self.stop_id - self.start_id) + 1
    }

    pub fn page_url(&self, index: u32) -> String {
        format!("{}/{}", self.base_url, index)
    }

    /// `{output_dir}/{index}-{title}.epub`，同一 (index, title) 总是得到同一路径。
    pub fn artifact_path(&self, index: u32, title: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}.epub", index, safe_file_stem(title)))
    }
}

pub fn safe_file_stem(title: &str) -> String {
    let mut cleaned: String = title
        .chars()
        .map(|ch| match ch {
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            _ => ch,
        })
        .collect();

    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.len() > MAX_STEM_BYTES {
        // 避免在多字节 UTF-8 字符中间截断导致 panic
        let mut end = MAX_STEM_BYTES;
        while !cleaned.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
    }

    if cleaned.is_empty() {
        cleaned.push_str("unnamed");
    }

    cleaned
}

fn default_false() -> bool {
    false
}

fn default_base_url() -> String {
    "http://www.gutenberg.org/ebooks".to_string()
}

fn default_max_workers() -> usize {
    4
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string()
}

fn default_request_timeout() -> u64 {
    0
}

fn default_error_log_path() -> String {
    "error.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(start_id: u32, stop_id: u32) -> RunOverrides {
        RunOverrides {
            output: Some("out".to_string()),
            concurrency: None,
            random_user_agent: false,
            start_id,
            stop_id,
        }
    }

    #[test]
    fn separators_become_hyphens() {
        assert_eq!(safe_file_stem("Foo/Bar"), "Foo-Bar");
        assert_eq!(safe_file_stem("a\\b/c//d"), "a-b-c--d");
        let stem = safe_file_stem("/etc/passwd");
        assert!(!stem.contains('/') && !stem.contains('\\'));
        assert_eq!(stem, safe_file_stem("/etc/passwd"));
    }

    #[test]
    fn stem_is_trimmed_and_bounded() {
        assert_eq!(safe_file_stem("Title. "), "Title");
        assert_eq!(safe_file_stem("..."), "unnamed");
        assert_eq!(safe_file_stem("tab\there"), "tab_here");

        let long = "书".repeat(200);
        let stem = safe_file_stem(&long);
        assert!(stem.len() <= MAX_STEM_BYTES);
        assert!(stem.chars().all(|c| c == '书'));
    }

    #[test]
    fn artifact_path_is_deterministic() {
        let run = Config::default().run_config(overrides(5, 5)).unwrap();
        let path = run.artifact_path(5, "Foo/Bar");
        assert_eq!(path, PathBuf::from("out").join("5-Foo-Bar.epub"));
        assert_eq!(path, run.artifact_path(5, "Foo/Bar"));
        assert_ne!(path, run.artifact_path(6, "Foo/Bar"));
    }

    #[test]
    fn run_config_merges_overrides() {
        let cfg = Config {
            base_url: "http://127.0.0.1:9/ebooks/".to_string(),
            max_workers: 7,
            random_user_agent: true,
            request_timeout: 30,
            ..Config::default()
        };
        let run = cfg.run_config(overrides(10, 12)).unwrap();
        assert_eq!(run.concurrency, 7);
        assert!(run.random_user_agent);
        assert_eq!(run.page_url(11), "http://127.0.0.1:9/ebooks/11");
        assert_eq!(run.page_count(), 3);
        assert_eq!(run.ids().collect::<Vec<_>>(), vec![10, 11, 12]);
        assert_eq!(run.request_timeout, Some(Duration::from_secs(30)));

        let run = cfg
            .run_config(RunOverrides {
                concurrency: Some(2),
                ..overrides(1, 1)
            })
            .unwrap();
        assert_eq!(run.concurrency, 2);
        assert_eq!(Config::default().run_config(overrides(1, 1)).unwrap().request_timeout, None);
    }

    #[test]
    fn run_config_rejects_malformed_input() {
        let cfg = Config::default();
        assert!(matches!(
            cfg.run_config(overrides(3, 2)),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            cfg.run_config(RunOverrides {
                concurrency: Some(0),
                ..overrides(1, 2)
            }),
            Err(ConfigError::Validation(_))
        ));
    }
}
