//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中声明定时器能力解析、门面调用与调度引擎之间传递的错误语义；
//! - 调用方只需按 [`TimerErrorKind`] 区分“状态错误 / 参数错误 / 引擎错误”，与容器定时器的
//!   `IllegalState` / `IllegalArgument` / `EJBException` 三分法一一对应。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，保证与 `std::error::Error` 生态兼容；
//! - 核心层不包装、不翻译引擎返回的错误，引擎直接构造对应变体，门面原样透传。

use thiserror::Error;

use crate::ids::DeploymentId;

/// 错误的粗粒度类别，调用方据此选择处理策略。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerErrorKind {
    /// 调用时机或组件配置不允许该操作。
    IllegalState,
    /// 入参不合法，通常由调度引擎校验得出。
    IllegalArgument,
    /// 调度引擎自身的运行期失败。
    Timer,
}

impl TimerErrorKind {
    /// 稳定字符串表示，用于日志字段与指标标签。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IllegalState => "illegal_state",
            Self::IllegalArgument => "illegal_argument",
            Self::Timer => "timer",
        }
    }
}

/// 定时器子系统错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：把“组件从未绑定引擎”“组件无定时器资格”“调用缺少上下文”与引擎透传错误
///   收敛到同一枚举，便于 `?` 直接传播；
/// - **契约 (What)**：
///   - 所有变体均为 `Send + Sync + 'static`，可跨线程传播；
///   - [`TimerError::kind`] 给出稳定类别，调用方不应依赖 `Display` 文本做分支；
/// - **设计权衡 (Trade-offs)**：上下文使用 `String` 保存，牺牲少量分配换取可读性。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TimerError {
    /// 组件部署时未绑定调度引擎，无论是否静默解析都视为致命错误。
    #[error("this component does not support timers: `{deployment_id}`")]
    NotSupported { deployment_id: DeploymentId },

    /// 组件既无超时方法也无调度声明，且严格模式拒绝了单目标调用。
    #[error(
        "component `{deployment_id}` declares neither a timeout method nor schedules; timers are not permitted"
    )]
    NotEntitled { deployment_id: DeploymentId },

    /// 构造调用上下文时缺少正在执行的组件定义。
    #[error("no invocation is bound: the executing component definition is missing")]
    NoInvocationContext,

    /// 引擎判定参数非法。
    #[error("illegal timer argument: {detail}")]
    IllegalArgument { detail: String },

    /// 引擎判定当前状态不允许该操作。
    #[error("illegal timer state: {detail}")]
    IllegalState { detail: String },

    /// 引擎内部失败，原样交给调用方。
    #[error("timer engine failure: {detail}")]
    Engine { detail: String },
}

impl TimerError {
    /// 返回错误所属类别。
    pub const fn kind(&self) -> TimerErrorKind {
        match self {
            Self::NotSupported { .. }
            | Self::NotEntitled { .. }
            | Self::NoInvocationContext
            | Self::IllegalState { .. } => TimerErrorKind::IllegalState,
            Self::IllegalArgument { .. } => TimerErrorKind::IllegalArgument,
            Self::Engine { .. } => TimerErrorKind::Timer,
        }
    }

    /// 便捷构造参数错误。
    pub fn illegal_argument(detail: impl Into<String>) -> Self {
        Self::IllegalArgument {
            detail: detail.into(),
        }
    }

    /// 便捷构造状态错误。
    pub fn illegal_state(detail: impl Into<String>) -> Self {
        Self::IllegalState {
            detail: detail.into(),
        }
    }

    /// 便捷构造引擎错误。
    pub fn engine(detail: impl Into<String>) -> Self {
        Self::Engine {
            detail: detail.into(),
        }
    }
}

/// 配置解析与日志安装阶段的错误。
///
/// - **意图 (Why)**：与运行期的 [`TimerError`] 分离，启动期失败通常直接终止宿主；
/// - **契约 (What)**：`Parse` 保留底层 `toml` 诊断，`InvalidFilter` 携带被拒绝的过滤表达式。
#[derive(Debug, Error)]
pub enum SettingsError {
    /// TOML 文本无法反序列化为 [`crate::settings::TimerSettings`]。
    #[error("failed to parse timer settings: {0}")]
    Parse(#[from] toml::de::Error),

    /// `log_filter` 不是合法的 `EnvFilter` 指令。
    #[error("invalid log filter `{filter}`: {detail}")]
    InvalidFilter { filter: String, detail: String },

    /// 进程内已存在全局 `tracing` Subscriber。
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
}
