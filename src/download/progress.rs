//! 命令行进度条。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::base_system::logging;

pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    /// 绘制到 stderr 的进度条，期间控制台日志会先挂起进度条再输出。
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(style);
        bar.set_prefix("页面");
        logging::attach_progress_bar(&bar);
        Self { bar }
    }

    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn inc(&self) {
        self.bar.inc(1);
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self) {
        logging::detach_progress_bar();
        self.bar.finish_and_clear();
    }
}
