//! 下载失败链接记录（error.txt）。
//!
//! 多个下载线程可能同时写入；每条记录在锁内完成 open-append-write-close，
//! 保证行与行之间不会交错。

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一行失败链接。
    pub fn record(&self, link: &str) -> io::Result<()> {
        // 换行会破坏一行一条的格式
        let line = format!("{}\n", link.trim().replace(['\r', '\n'], " "));

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }
}
