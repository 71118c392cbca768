//! 日志安装入口。
//!
//! # 教案式说明
//! - **意图（Why）**：库代码只通过 `tracing` 宏发出事件；宿主若没有自己的 Subscriber，
//!   可调用 [`install`] 获得 `fmt + EnvFilter` 的默认组合；
//! - **逻辑（How）**：过滤指令优先取 [`TimerSettings::log_filter`]，其次 `RUST_LOG`，最后回落到 `info`；
//! - **契约（What）**：进程内只能成功安装一次，外部已设置全局 Subscriber 时返回
//!   [`SettingsError::SubscriberAlreadySet`]。

use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

use crate::{error::SettingsError, settings::TimerSettings};

/// 安装全局 `tracing` Subscriber。
pub fn install(settings: &TimerSettings) -> Result<(), SettingsError> {
    if dispatcher::has_been_set() {
        return Err(SettingsError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(settings)?)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|_| SettingsError::SubscriberAlreadySet)
}

fn build_env_filter(settings: &TimerSettings) -> Result<EnvFilter, SettingsError> {
    match settings.log_filter.as_deref() {
        Some(filter) => {
            EnvFilter::try_new(filter).map_err(|err| SettingsError::InvalidFilter {
                filter: filter.to_owned(),
                detail: err.to_string(),
            })
        }
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_filter_is_reported_before_installing() {
        let settings = TimerSettings::default().with_log_filter("spark_timer=loud");
        let err = build_env_filter(&settings).expect_err("malformed directive");
        assert!(matches!(err, SettingsError::InvalidFilter { .. }));
    }
}
