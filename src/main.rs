//! Gutenberg EPUB 批量下载器。
//!
//! 按 ID 区间抓取 Project Gutenberg 的书籍页面，解析书名与 EPUB 链接，
//! 本地不存在时下载保存；下载失败的链接追加到 `error.txt`。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置/日志/失败记录等基础设施
//! - `network_parser`：HTTP 客户端
//! - `book_parser`：页面解析
//! - `download`：下载落盘与批量调度

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::{Path, PathBuf};

mod base_system;
mod book_parser;
mod download;
mod network_parser;
#[cfg(test)]
mod test_support;

use base_system::config::load_or_create;
use base_system::context::{Config, RunOverrides};
use base_system::error_log::ErrorLog;
use base_system::logging::{LogOptions, LogSystem};
use download::progress::RunProgress;
use network_parser::network::CatalogClient;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "gutenberg-epub-scraper")]
#[command(about = "Download EPUB editions of Project Gutenberg books by ID range")]
struct Cli {
    /// 起始书籍 ID（包含）
    #[arg(long, default_value_t = 1)]
    start: u32,

    /// 结束书籍 ID（包含）
    #[arg(long)]
    stop: u32,

    /// 每批并发页面数（覆盖 config.yml 的 max_workers）
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// EPUB 保存目录（覆盖 config.yml 的 save_path）
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// 每次抓取页面时随机选择 User-Agent
    #[arg(long, default_value_t = false)]
    random_ua: bool,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// 配置文件路径（默认为数据目录下的 config.yml）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 数据目录路径（用于存放 config.yml 和 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 显示版本信息后退出
    #[arg(long, default_value_t = false)]
    version: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("Gutenberg EPUB Scraper v{}", VERSION);
        return Ok(());
    }

    let data_dir = cli.data_dir.as_deref();
    let _log = init_logging(cli.debug, data_dir)?;
    info!(target: "startup", "当前版本: v{}", VERSION);

    let config: Config =
        load_or_create(cli.config.as_deref(), data_dir).map_err(|e| anyhow!(e.to_string()))?;
    let run = config
        .run_config(RunOverrides {
            output: cli.output,
            concurrency: cli.concurrency,
            random_user_agent: cli.random_ua,
            start_id: cli.start,
            stop_id: cli.stop,
        })
        .map_err(|e| anyhow!(e.to_string()))?;

    let client = CatalogClient::new(&run).context("init http client")?;
    let error_log = ErrorLog::new(&run.error_log);

    let progress = RunProgress::new(run.page_count());
    let summary = download::dispatcher::run(&run, &client, &error_log, &progress);
    progress.finish();

    info!(
        target: "startup",
        pages = summary.pages,
        written = summary.written,
        written_bytes = summary.written_bytes,
        skipped = summary.skipped,
        not_found = summary.not_found,
        failed = summary.failed,
        page_errors = summary.page_errors,
        panicked = summary.panicked,
        "全部完成"
    );
    if summary.failed > 0 {
        info!(target: "startup", "失败链接已记录到 {}", error_log.path().display());
    }

    Ok(())
}

fn init_logging(debug: bool, base_dir: Option<&Path>) -> Result<LogSystem> {
    let opts = LogOptions {
        debug,
        use_color: true,
        archive_on_exit: true,
        console: true,
    };
    LogSystem::init_with_base(opts, base_dir).map_err(|e| anyhow!(e))
}
