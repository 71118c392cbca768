use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::SystemTime,
};

use dashmap::DashMap;
use tracing::trace;

use crate::{
    error::TimerError,
    ids::TimerId,
    timer::{TimerConfig, TimerOwner, TimerRecord, TimerSchedule, TimerStart},
};

use super::TimerEngine;

/// `InMemoryTimerEngine` 充当进程内的定时器登记表。
///
/// # 教案式解读
/// - **意图（Why）**：
///   - 宿主联调与测试需要一个可观察的引擎，以验证解析器把调用路由到了正确的组件与实例；
///   - 使用 `DashMap` 封装登记表，多个组件共享同一引擎时读写互不阻塞。
/// - **实现策略（How）**：
///   - `AtomicU64` 递增分配 [`TimerId`]，从 1 开始；
///   - 创建前做基础参数校验：间隔为零、日历字段为空、相对时长溢出均返回 `IllegalArgument`；
///   - 查询按 `(deployment_id, primary_key)` 过滤，主键为 `None` 时返回整个部署的定时器。
///
/// # 契约说明
/// - **后置条件**：`create` 成功后定时器立即对 `timers` 可见；
/// - **风险提示**：不触发回调、不持久化、不做过期清理，只用于登记与查询。
#[derive(Debug)]
pub struct InMemoryTimerEngine {
    next_id: AtomicU64,
    timers: DashMap<TimerId, TimerRecord>,
}

impl Default for InMemoryTimerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTimerEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            timers: DashMap::new(),
        }
    }

    /// 当前登记的定时器数量。
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn next_timeout(
        schedule: &TimerSchedule,
        now: SystemTime,
    ) -> Result<Option<SystemTime>, TimerError> {
        match schedule {
            TimerSchedule::SingleAction { start } => Self::first_expiration(*start, now).map(Some),
            TimerSchedule::Interval { start, interval } => {
                if interval.is_zero() {
                    return Err(TimerError::illegal_argument(
                        "interval duration must be greater than zero",
                    ));
                }
                Self::first_expiration(*start, now).map(Some)
            }
            TimerSchedule::Calendar(expression) => {
                if let Some((field, _)) = expression
                    .fields()
                    .into_iter()
                    .find(|(_, value)| value.trim().is_empty())
                {
                    return Err(TimerError::illegal_argument(format!(
                        "schedule field `{field}` must not be empty"
                    )));
                }
                if let (Some(start), Some(end)) = (expression.start(), expression.end()) {
                    if end < start {
                        return Err(TimerError::illegal_argument(
                            "schedule end must not precede its start",
                        ));
                    }
                }
                Ok(None)
            }
        }
    }

    fn first_expiration(start: TimerStart, now: SystemTime) -> Result<SystemTime, TimerError> {
        start.resolve(now).ok_or_else(|| {
            TimerError::illegal_argument("initial duration overflows the system clock")
        })
    }
}

impl TimerEngine for InMemoryTimerEngine {
    fn create(
        &self,
        owner: &TimerOwner,
        schedule: TimerSchedule,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        let next_timeout = Self::next_timeout(&schedule, SystemTime::now())?;
        let id = TimerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = TimerRecord::new(id, owner.clone(), schedule, config, next_timeout);
        self.timers.insert(id, record.clone());
        trace!(
            timer_id = %id,
            deployment_id = %owner.deployment_id(),
            "timer registered in memory"
        );
        Ok(record)
    }

    fn timers(&self, owner: &TimerOwner) -> Result<Vec<TimerRecord>, TimerError> {
        let mut timers: Vec<TimerRecord> = self
            .timers
            .iter()
            .filter(|entry| {
                let candidate = entry.value().owner();
                candidate.deployment_id() == owner.deployment_id()
                    && (owner.primary_key().is_none()
                        || candidate.primary_key() == owner.primary_key())
            })
            .map(|entry| entry.value().clone())
            .collect();
        timers.sort_by_key(TimerRecord::id);
        Ok(timers)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        error::TimerErrorKind,
        ids::{DeploymentId, PrimaryKey},
        timer::ScheduleExpression,
    };

    fn after(delay: Duration) -> TimerSchedule {
        TimerSchedule::SingleAction {
            start: TimerStart::After(delay),
        }
    }

    fn owner(deployment: &str, pk: Option<&str>) -> TimerOwner {
        TimerOwner::new(
            DeploymentId::parse(deployment).expect("valid id"),
            pk.map(|pk| PrimaryKey::parse(pk).expect("valid pk")),
            None,
        )
    }

    #[test]
    fn class_view_sees_every_instance_of_the_deployment() {
        let engine = InMemoryTimerEngine::new();
        let cfg = TimerConfig::default;
        engine
            .create(&owner("cart", Some("a")), after(Duration::from_secs(1)), cfg())
            .expect("create a");
        engine
            .create(&owner("cart", Some("b")), after(Duration::from_secs(1)), cfg())
            .expect("create b");
        engine
            .create(&owner("other", None), after(Duration::from_secs(1)), cfg())
            .expect("create other");

        let instance = engine.timers(&owner("cart", Some("a"))).expect("query a");
        assert_eq!(instance.len(), 1);
        let class = engine.timers(&owner("cart", None)).expect("query class");
        assert_eq!(class.len(), 2);
        assert_eq!(engine.len(), 3);
    }

    #[test]
    fn zero_interval_is_an_illegal_argument() {
        let engine = InMemoryTimerEngine::new();
        let err = engine
            .create(
                &owner("cart", None),
                TimerSchedule::Interval {
                    start: TimerStart::After(Duration::from_secs(1)),
                    interval: Duration::ZERO,
                },
                TimerConfig::default(),
            )
            .expect_err("zero interval must be rejected");
        assert_eq!(err.kind(), TimerErrorKind::IllegalArgument);
        assert!(engine.is_empty());
    }

    #[test]
    fn blank_calendar_field_is_an_illegal_argument() {
        let engine = InMemoryTimerEngine::new();
        let err = engine
            .create(
                &owner("cart", None),
                TimerSchedule::Calendar(ScheduleExpression::new().minute(" ")),
                TimerConfig::default(),
            )
            .expect_err("blank field must be rejected");
        assert!(err.to_string().contains("minute"));
    }

    #[test]
    fn identifiers_are_allocated_in_order() {
        let engine = InMemoryTimerEngine::new();
        let first = engine
            .create(&owner("cart", None), after(Duration::from_secs(5)), TimerConfig::default())
            .expect("first");
        let second = engine
            .create(&owner("cart", None), after(Duration::from_secs(5)), TimerConfig::default())
            .expect("second");
        assert_eq!(first.id(), TimerId::new(1));
        assert_eq!(second.id(), TimerId::new(2));
        assert!(first.next_timeout().is_some());
    }
}
