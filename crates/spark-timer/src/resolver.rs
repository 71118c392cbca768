//! # TimerServiceResolver：按调用构造定时器服务句柄
//!
//! ## 核心意图（Why）
//! - 给定组件定义、实例主键（可缺省）与“无资格时是否静默”，返回绑定到该调用的
//!   [`TimerServiceHandle`]，或说明该组件不支持定时器；
//! - 资格判定委托 [`EntitlementCache`]，保证每个定义的方法元数据只被扫描有限次。
//!
//! ## 行为契约（What）
//! 1. 定义未绑定调度引擎：返回 [`TimerError::NotSupported`]，与 `silent` 无关；
//! 2. 定义未声明超时方法时查询资格：
//!    - 无资格且 `silent == true`：返回 `Ok(None)`，供聚合跳过；
//!    - 无资格且 `silent == false`：记录 `error` 级诊断后仍返回句柄（宽松模式，默认）；
//!      启用 [`TimerSettings::strict_entitlement`] 时改为返回 [`TimerError::NotEntitled`]；
//! 3. 构造绑定 `{引擎, 主键, 超时方法}` 的句柄。
//!
//! ## 风险提示（Trade-offs）
//! - 宽松模式是有意为之：没有超时方法与调度声明并不排除程序化创建定时器的用法，
//!   元数据扫描无法预见这类场景，因此只告警不拒绝。

use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::error;

use crate::{
    definition::ComponentDefinition,
    engine::TimerEngine,
    entitlement::EntitlementCache,
    error::TimerError,
    ids::PrimaryKey,
    settings::TimerSettings,
    timer::{
        ScheduleExpression, TimerConfig, TimerInfo, TimerOwner, TimerRecord, TimerSchedule,
        TimerStart,
    },
};

/// 定时器服务解析器。
///
/// # 教案式注释
/// - **意图 (Why)**：集中承载“引擎是否绑定、组件是否有资格”两道判定，门面只负责取上下文与委托；
/// - **契约 (What)**：解析器自身无可变状态，除资格缓存外可在线程间自由共享；
/// - **风险 (Trade-offs)**：资格缓存按定义实例索引，缓存规模随进程内构建过的定义数增长。
#[derive(Debug, Default)]
pub struct TimerServiceResolver {
    entitlements: EntitlementCache,
    settings: TimerSettings,
}

impl TimerServiceResolver {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            entitlements: EntitlementCache::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    /// 暴露资格缓存，便于宿主观测扫描次数与缓存规模。
    pub fn entitlements(&self) -> &EntitlementCache {
        &self.entitlements
    }

    /// 为 `definition` 构造句柄。
    ///
    /// - **参数**：
    ///   - `primary_key`：实例主键；聚合时传 `None` 以获得类级别视角；
    ///   - `silent_if_not_capable`：无资格时返回 `Ok(None)` 而非句柄；
    /// - **返回值**：`Ok(None)` 仅在“无超时方法 + 无资格 + 静默”三者同时成立时出现。
    pub fn resolve(
        &self,
        primary_key: Option<PrimaryKey>,
        definition: &ComponentDefinition,
        silent_if_not_capable: bool,
    ) -> Result<Option<TimerServiceHandle>, TimerError> {
        if !silent_if_not_capable {
            return self.resolve_for_call(primary_key, definition).map(Some);
        }
        let engine = bound_engine(definition)?;
        if !self.admits(definition) {
            return Ok(None);
        }
        Ok(Some(TimerServiceHandle::bind(engine, primary_key, definition)))
    }

    /// 非静默解析：单目标调用的入口，总是得到句柄或错误。
    ///
    /// 无资格时按配置分流：严格模式返回 [`TimerError::NotEntitled`]，宽松模式记录 `error` 后放行。
    pub fn resolve_for_call(
        &self,
        primary_key: Option<PrimaryKey>,
        definition: &ComponentDefinition,
    ) -> Result<TimerServiceHandle, TimerError> {
        let engine = bound_engine(definition)?;
        if !self.admits(definition) {
            if self.settings.strict_entitlement {
                return Err(TimerError::NotEntitled {
                    deployment_id: definition.deployment_id().clone(),
                });
            }
            error!(
                deployment_id = %definition.deployment_id(),
                kind = %definition.kind(),
                "this component does not support timers: no timeout method nor schedules are configured"
            );
        }
        Ok(TimerServiceHandle::bind(engine, primary_key, definition))
    }

    // 有超时方法时不查侧表
    fn admits(&self, definition: &ComponentDefinition) -> bool {
        definition.timeout_method().is_some() || self.entitlements.is_timer_capable(definition)
    }
}

fn bound_engine(definition: &ComponentDefinition) -> Result<&Arc<dyn TimerEngine>, TimerError> {
    definition
        .timer_engine()
        .ok_or_else(|| TimerError::NotSupported {
            deployment_id: definition.deployment_id().clone(),
        })
}

/// 绑定到单次调用的定时器服务句柄。
///
/// # 教案式说明
/// - **意图 (Why)**：把引擎引用与归属信息打包，创建入口只需补齐调度形态与配置；
/// - **契约 (What)**：每次调用重新构造，不实现 `Clone`，不应跨调用缓存；
///   所有方法直接返回引擎结果，错误不做翻译。
pub struct TimerServiceHandle {
    engine: Arc<dyn TimerEngine>,
    owner: TimerOwner,
}

impl TimerServiceHandle {
    fn bind(
        engine: &Arc<dyn TimerEngine>,
        primary_key: Option<PrimaryKey>,
        definition: &ComponentDefinition,
    ) -> Self {
        Self {
            engine: Arc::clone(engine),
            owner: TimerOwner::new(
                definition.deployment_id().clone(),
                primary_key,
                definition.timeout_method().cloned(),
            ),
        }
    }

    pub fn owner(&self) -> &TimerOwner {
        &self.owner
    }

    /// 在 `expiration` 触发一次的持久化定时器。
    pub fn create_timer_at(
        &self,
        expiration: SystemTime,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.create(single(TimerStart::At(expiration)), TimerConfig::new(info))
    }

    /// 在 `duration` 之后触发一次的持久化定时器。
    pub fn create_timer_after(
        &self,
        duration: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.create(single(TimerStart::After(duration)), TimerConfig::new(info))
    }

    pub fn create_repeating_timer_at(
        &self,
        initial_expiration: SystemTime,
        interval: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.create(
            repeating(TimerStart::At(initial_expiration), interval),
            TimerConfig::new(info),
        )
    }

    pub fn create_repeating_timer_after(
        &self,
        initial_duration: Duration,
        interval: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.create(
            repeating(TimerStart::After(initial_duration), interval),
            TimerConfig::new(info),
        )
    }

    pub fn create_single_action_timer_at(
        &self,
        expiration: SystemTime,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.create(single(TimerStart::At(expiration)), config)
    }

    pub fn create_single_action_timer_after(
        &self,
        duration: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.create(single(TimerStart::After(duration)), config)
    }

    pub fn create_interval_timer_at(
        &self,
        initial_expiration: SystemTime,
        interval: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.create(repeating(TimerStart::At(initial_expiration), interval), config)
    }

    pub fn create_interval_timer_after(
        &self,
        initial_duration: Duration,
        interval: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.create(repeating(TimerStart::After(initial_duration), interval), config)
    }

    pub fn create_calendar_timer(
        &self,
        expression: ScheduleExpression,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.create(TimerSchedule::Calendar(expression), config)
    }

    /// 归属视角下的全部定时器：带主键时为单实例，不带主键时为整个部署。
    pub fn timers(&self) -> Result<Vec<TimerRecord>, TimerError> {
        self.engine.timers(&self.owner)
    }

    fn create(
        &self,
        schedule: TimerSchedule,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.engine.create(&self.owner, schedule, config)
    }
}

fn single(start: TimerStart) -> TimerSchedule {
    TimerSchedule::SingleAction { start }
}

fn repeating(start: TimerStart, interval: Duration) -> TimerSchedule {
    TimerSchedule::Interval { start, interval }
}
