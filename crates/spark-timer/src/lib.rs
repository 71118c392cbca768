#![deny(unsafe_code)]

//! # spark-timer
//!
//! ## 定位与职责（Why）
//! - 为组件运行时提供按调用解析的定时器能力：判断当前组件是否有资格使用定时器，
//!   在首次访问时计算并记忆化该资格，有资格时返回绑定到当前实例的定时器服务句柄；
//! - 提供部署单元级聚合：列出与当前调用同属一个部署单元的全部组件定义上的定时器。
//!
//! ## 架构嵌入（Where）
//! - `definition` / `registry`：部署期产生的只读组件元数据及其注册表；
//! - `context`：显式传递的调用上下文（组件定义 + 实例主键）；
//! - `entitlement`：按部署标识记忆化“是否具备定时器资格”的侧表；
//! - `resolver`：引擎绑定与资格判定，构造 [`TimerServiceHandle`]；
//! - `facade`：面向组件代码的操作面，含聚合；
//! - `engine`：外部调度引擎契约与进程内参考实现；
//! - `settings` / `telemetry`：运行配置与日志安装。
//!
//! ## 并发模型（What）
//! - 无内部线程、无异步挂起，所有操作在调用线程上同步完成；
//! - 唯一的共享可变状态是资格侧表：读路径只做分片读取，首次写入为“缺席才插入”，
//!   不同定义之间不会因同一把全局锁而串行。

pub mod context;
pub mod definition;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod facade;
pub mod ids;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod telemetry;
pub mod timer;

pub use context::{InvocationContext, InvocationContextBuilder};
pub use definition::{
    ComponentDefinition, ComponentDefinitionBuilder, ComponentKind, DefinitionToken,
    DeploymentUnit, MethodMetadata,
};
pub use engine::{InMemoryTimerEngine, TimerEngine};
pub use entitlement::{EntitlementCache, EntitlementFlag};
pub use error::{SettingsError, TimerError, TimerErrorKind};
pub use facade::TimerFacade;
pub use ids::{DeploymentId, MethodRef, PrimaryKey, TimerId, UnitId};
pub use registry::{ApplicationRegistry, DefinitionRegistry};
pub use resolver::{TimerServiceHandle, TimerServiceResolver};
pub use settings::TimerSettings;
pub use timer::{
    ScheduleExpression, TimerConfig, TimerInfo, TimerOwner, TimerRecord, TimerSchedule,
    TimerStart,
};
