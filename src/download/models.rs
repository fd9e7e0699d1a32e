//! 下载相关的数据模型定义。
//!
//! 包含单个 EPUB 的下载结果、单个页面任务的结果以及整次运行的汇总。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("cannot create output dir {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
    #[error("cannot create file in {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("cannot write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub enum DownloadOutcome {
    /// 目标文件已存在。
    Skipped { path: PathBuf },
    Written { path: PathBuf, bytes: u64 },
    /// 链接已记录到失败列表。
    Failed(DownloadError),
}

#[derive(Debug)]
pub enum PageOutcome {
    /// 页面不存在或没有 EPUB 版本。
    NotFound,
    /// 页面本身抓取失败（不写入失败列表）。
    PageError,
    Download(DownloadOutcome),
    Panicked,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub pages: usize,
    pub not_found: usize,
    pub page_errors: usize,
    pub skipped: usize,
    pub written: usize,
    pub written_bytes: u64,
    pub failed: usize,
    pub panicked: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &PageOutcome) {
        self.pages += 1;
        match outcome {
            PageOutcome::NotFound => self.not_found += 1,
            PageOutcome::PageError => self.page_errors += 1,
            PageOutcome::Download(DownloadOutcome::Skipped { .. }) => self.skipped += 1,
            PageOutcome::Download(DownloadOutcome::Written { bytes, .. }) => {
                self.written += 1;
                self.written_bytes += bytes;
            }
            PageOutcome::Download(DownloadOutcome::Failed(_)) => self.failed += 1,
            PageOutcome::Panicked => self.panicked += 1,
        }
    }
}
