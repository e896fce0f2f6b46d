//! 共享库
//!
//! 包含表达式引擎及其宿主共用的配置与日志初始化代码。

pub mod config;
pub mod observability;
