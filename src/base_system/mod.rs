//! 基础设施：配置、日志、失败记录。

pub mod config;
pub mod context;
pub mod error_log;
pub mod logging;
