//! 定时器解析器的运行配置。
//!
//! ## 设计目的（Why）
//! - 单目标调用遇到“无超时方法且无调度声明”的组件时，默认只记录诊断并继续返回句柄；
//!   部分宿主希望直接拒绝，`strict_entitlement` 提供显式开关；
//! - `log_filter` 供 [`crate::telemetry::install`] 组装 `EnvFilter`，与宿主其它配置放在同一 TOML 中。
//!
//! ## 契约定义（What）
//! - 所有字段都有缺省值，空文本即得到默认配置；
//! - 未知字段会被拒绝，避免拼写错误悄悄失效。

use serde::Deserialize;

use crate::error::SettingsError;

/// 解析器与日志相关配置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimerSettings {
    /// 为 `true` 时，单目标调用对无资格组件返回 `NotEntitled`，而不是记录诊断后放行。
    pub strict_entitlement: bool,
    /// `tracing-subscriber` 的过滤指令，例如 `"spark_timer=debug"`。
    pub log_filter: Option<String>,
}

impl TimerSettings {
    /// 从 TOML 文本解析配置。
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn with_strict_entitlement(mut self, strict: bool) -> Self {
        self.strict_entitlement = strict;
        self
    }

    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }
}
