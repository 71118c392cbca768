//! # 调度引擎契约
//!
//! ## 契约声明
//! * **外部协作者**：真正负责持久化与触发定时器的调度引擎不属于本 crate，这里只定义边界；
//! * **错误透传**：引擎自行构造 [`TimerError`] 的 `IllegalArgument` / `IllegalState` / `Engine`
//!   变体，门面层原样返回，不做包装或重试；
//! * **并发模型**：调用发生在宿主提供的调用线程上，实现必须 `Send + Sync`，阻塞（若有）只发生在实现内部。
//!
//! [`InMemoryTimerEngine`] 提供一个不触发回调的参考实现，供宿主联调与测试使用。

mod memory;

pub use memory::InMemoryTimerEngine;

use crate::{
    error::TimerError,
    timer::{TimerConfig, TimerOwner, TimerRecord, TimerSchedule},
};

/// 调度引擎需要实现的最小能力集合。
///
/// # 教案式说明
/// - **意图 (Why)**：门面暴露的十余种创建入口全部折叠为 `create` 一种形态，引擎实现者无需关心重载；
/// - **契约 (What)**：
///   - `create`：为 `owner` 登记新定时器并返回快照；
///   - `timers`：`owner.primary_key()` 为 `Some` 时只返回该实例的定时器，为 `None` 时返回整个部署的定时器；
/// - **风险 (Trade-offs)**：trait 保持同步签名，异步引擎需在实现内部自行桥接。
pub trait TimerEngine: Send + Sync {
    fn create(
        &self,
        owner: &TimerOwner,
        schedule: TimerSchedule,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError>;

    fn timers(&self, owner: &TimerOwner) -> Result<Vec<TimerRecord>, TimerError>;
}
