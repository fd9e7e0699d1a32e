//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`     — 数据模型（DownloadOutcome / PageOutcome / RunSummary）
//! - `progress`   — CLI 进度条
//! - `writer`     — EPUB 落盘与失败记录
//! - `dispatcher` — 按批调度页面任务

pub mod dispatcher;
pub mod models;
pub mod progress;
pub mod writer;
