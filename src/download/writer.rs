//! EPUB 落盘。
//!
//! 目标文件已存在则跳过；否则下载到同目录下的临时文件，完整写入后再以
//! 不覆盖的方式改名为目标文件。任何失败都只记录链接，不向上传播。

use std::fs;
use std::io;
use std::path::Path;

use tracing::{error, info, warn};

use super::models::{DownloadError, DownloadOutcome};
use crate::base_system::context::RunConfig;
use crate::base_system::error_log::ErrorLog;
use crate::network_parser::network::CatalogClient;

pub struct DownloadWriter<'a> {
    client: &'a CatalogClient,
    run: &'a RunConfig,
    error_log: &'a ErrorLog,
}

impl<'a> DownloadWriter<'a> {
    pub fn new(client: &'a CatalogClient, run: &'a RunConfig, error_log: &'a ErrorLog) -> Self {
        Self {
            client,
            run,
            error_log,
        }
    }

    pub fn download(&self, link: &str, title: &str, index: u32) -> DownloadOutcome {
        let path = self.run.artifact_path(index, title);
        if path.exists() {
            info!(target: "download", index, title, "已下载，跳过: {}", path.display());
            return DownloadOutcome::Skipped { path };
        }

        match self.fetch_to(link, &path, index) {
            Ok(Some(bytes)) => {
                info!(target: "download", index, title, bytes, "下载完成: {}", path.display());
                DownloadOutcome::Written { path, bytes }
            }
            Ok(None) => {
                info!(target: "download", index, title, "已被其他任务写入，跳过: {}", path.display());
                DownloadOutcome::Skipped { path }
            }
            Err(err) => {
                warn!(target: "download", index, title, link, error = %err, "下载失败");
                self.record_failure(link);
                DownloadOutcome::Failed(err)
            }
        }
    }

    /// 返回写入的字节数；目标在写入期间被别人创建时返回 `None`。
    fn fetch_to(&self, link: &str, target: &Path, index: u32) -> Result<Option<u64>, DownloadError> {
        let dir = &self.run.output_dir;
        fs::create_dir_all(dir).map_err(|source| DownloadError::OutputDir {
            path: dir.clone(),
            source,
        })?;

        let mut resp = self.client.fetch_asset(link)?;

        let mut part = tempfile::Builder::new()
            .prefix(&format!(".{index}-"))
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(|source| DownloadError::Create {
                path: dir.clone(),
                source,
            })?;

        let bytes = io::copy(&mut resp, part.as_file_mut())
            .and_then(|n| part.as_file().sync_all().map(|_| n))
            .map_err(|source| DownloadError::Write {
                path: part.path().to_path_buf(),
                source,
            })?;

        match part.persist_noclobber(target) {
            Ok(_) => Ok(Some(bytes)),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => Ok(None),
            Err(err) => Err(DownloadError::Write {
                path: target.to_path_buf(),
                source: err.error,
            }),
        }
    }

    fn record_failure(&self, link: &str) {
        if let Err(err) = self.error_log.record(link) {
            error!(
                target: "download",
                link,
                error = %err,
                "写入失败记录失败: {}",
                self.error_log.path().display()
            );
        }
    }
}
