//! 批量调度：按 ID 区间逐批启动页面任务。
//!
//! 每批最多 `concurrency` 个任务并行（每个任务一个线程），整批全部结束后才启动
//! 下一批，因此任意时刻在跑的任务数不超过并发上限。没有超时与取消：某个请求
//! 卡住会拖住所在批次，需要时通过 `request_timeout` 配置超时。

use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{debug, error, info, warn};

use super::models::{DownloadOutcome, PageOutcome, RunSummary};
use super::progress::RunProgress;
use super::writer::DownloadWriter;
use crate::base_system::context::RunConfig;
use crate::base_system::error_log::ErrorLog;
use crate::base_system::logging;
use crate::book_parser::page;
use crate::network_parser::network::CatalogClient;

/// 对区间内每个 ID 执行一次 `job`，每批 `limit` 个并行，批与批之间串行。
///
/// 整批结束后按 ID 顺序把结果交给 `on_done`，不跨批保留结果；panic 的任务
/// 对应 `None`，不影响同批其他任务。
pub fn run_batches<T, F, G>(ids: RangeInclusive<u32>, limit: usize, job: F, mut on_done: G)
where
    F: Fn(u32) -> T + Sync,
    G: FnMut(u32, Option<T>),
    T: Send,
{
    let limit = limit.max(1);
    let mut batch: Vec<u32> = Vec::with_capacity(limit);

    for id in ids {
        batch.push(id);
        if batch.len() == limit {
            run_batch(&batch, &job, &mut on_done);
            batch.clear();
        }
    }
    if !batch.is_empty() {
        run_batch(&batch, &job, &mut on_done);
    }
}

fn run_batch<T, F, G>(batch: &[u32], job: &F, on_done: &mut G)
where
    F: Fn(u32) -> T + Sync,
    G: FnMut(u32, Option<T>),
    T: Send,
{
    debug!(target: "dispatch", first = batch[0], size = batch.len(), "启动批次");
    let results: Vec<(u32, Option<T>)> = thread::scope(|s| {
        let spawned: Vec<_> = batch
            .iter()
            .map(|&id| {
                let handle = thread::Builder::new()
                    .name(format!("page-{id}"))
                    .spawn_scoped(s, move || job(id));
                (id, handle)
            })
            .collect();

        spawned
            .into_iter()
            .map(|(id, handle)| match handle {
                Ok(handle) => match handle.join() {
                    Ok(value) => (id, Some(value)),
                    Err(_) => {
                        error!(target: "dispatch", index = id, "页面任务 panic");
                        (id, None)
                    }
                },
                Err(err) => {
                    warn!(target: "dispatch", index = id, error = %err, "无法创建线程，改为当前线程执行");
                    let caught = logging::with_isolated_panics(|| {
                        panic::catch_unwind(AssertUnwindSafe(|| job(id)))
                    });
                    if caught.is_err() {
                        error!(target: "dispatch", index = id, "页面任务 panic");
                    }
                    (id, caught.ok())
                }
            })
            .collect()
    });

    for (id, result) in results {
        on_done(id, result);
    }
}

/// 单个页面任务：解析页面，有 EPUB 时下载。
pub fn process_page(
    client: &CatalogClient,
    run: &RunConfig,
    writer: &DownloadWriter<'_>,
    index: u32,
) -> PageOutcome {
    match page::extract(client, run, index) {
        Ok(Some(found)) => {
            PageOutcome::Download(writer.download(&found.link, &found.title, found.index))
        }
        Ok(None) => PageOutcome::NotFound,
        Err(err) => {
            warn!(target: "page", index, error = %err, "页面抓取失败");
            PageOutcome::PageError
        }
    }
}

pub fn run(
    run: &RunConfig,
    client: &CatalogClient,
    error_log: &ErrorLog,
    progress: &RunProgress,
) -> RunSummary {
    info!(
        target: "dispatch",
        start = run.start_id,
        stop = run.stop_id,
        concurrency = run.concurrency,
        "开始抓取，保存到 {}",
        run.output_dir.display()
    );

    let writer = DownloadWriter::new(client, run, error_log);
    let mut summary = RunSummary::default();
    run_batches(
        run.ids(),
        run.concurrency,
        |index| {
            let outcome = process_page(client, run, &writer, index);
            progress.inc();
            outcome
        },
        |index, outcome| {
            let outcome = outcome.unwrap_or(PageOutcome::Panicked);
            trace_outcome(index, &outcome);
            summary.record(&outcome);
        },
    );
    summary
}

fn trace_outcome(index: u32, outcome: &PageOutcome) {
    match outcome {
        PageOutcome::NotFound => debug!(target: "dispatch", index, "无 EPUB"),
        PageOutcome::PageError => debug!(target: "dispatch", index, "页面错误"),
        PageOutcome::Panicked => debug!(target: "dispatch", index, "任务 panic"),
        PageOutcome::Download(DownloadOutcome::Skipped { path }) => {
            debug!(target: "dispatch", index, path = %path.display(), "跳过")
        }
        PageOutcome::Download(DownloadOutcome::Written { path, bytes }) => {
            debug!(target: "dispatch", index, bytes, path = %path.display(), "写入")
        }
        PageOutcome::Download(DownloadOutcome::Failed(err)) => {
            debug!(target: "dispatch", index, error = %err, "失败")
        }
    }
}
