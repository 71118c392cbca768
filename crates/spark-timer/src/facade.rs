//! # TimerFacade：面向组件代码的定时器操作面
//!
//! ## 定位与职责（Why）
//! - 组件在业务方法中调用的全部定时器操作：创建固定时刻/间隔/日历定时器，列出当前调用的定时器，
//!   以及列出所属部署单元内的全部定时器；
//! - 每个操作显式接收 [`InvocationContext`]，解析出句柄后直接委托，不做任何错误翻译。
//!
//! ## 聚合语义（What）
//! - `all_timers` 只遍历与当前调用同一部署单元的定义（字面相等，不做传递），
//!   以“静默 + 无主键”方式解析，得到类级别的定时器集合；
//! - 无资格或未绑定引擎的兄弟定义被跳过，某个兄弟的引擎查询失败也只记录告警，聚合本身不失败；
//! - 结果为集合，重复身份折叠，不保证顺序；与兄弟定义上的并发创建之间没有一致性切面。

use std::{
    collections::HashSet,
    sync::Arc,
    time::{Duration, SystemTime},
};

use tracing::{debug, trace, warn};

use crate::{
    context::InvocationContext,
    error::TimerError,
    registry::DefinitionRegistry,
    resolver::{TimerServiceHandle, TimerServiceResolver},
    settings::TimerSettings,
    timer::{ScheduleExpression, TimerConfig, TimerInfo, TimerRecord},
};

/// 定时器门面。
///
/// # 教案式注释
/// - **意图 (Why)**：把“取上下文 → 解析句柄 → 委托引擎”的样板收拢在一处，组件代码只看到业务参数；
/// - **契约 (What)**：
///   - 单目标操作以 `silent = false` 与调用上下文中的主键解析；
///   - 返回值与错误均来自引擎或解析器，门面不包装；
/// - **风险 (Trade-offs)**：门面持有注册表引用用于聚合，注册表的一致性由其实现负责。
pub struct TimerFacade {
    resolver: Arc<TimerServiceResolver>,
    registry: Arc<dyn DefinitionRegistry>,
}

impl TimerFacade {
    pub fn new(resolver: Arc<TimerServiceResolver>, registry: Arc<dyn DefinitionRegistry>) -> Self {
        Self { resolver, registry }
    }

    /// 以给定配置创建解析器并组装门面。
    pub fn with_settings(settings: TimerSettings, registry: Arc<dyn DefinitionRegistry>) -> Self {
        Self::new(Arc::new(TimerServiceResolver::new(settings)), registry)
    }

    pub fn resolver(&self) -> &Arc<TimerServiceResolver> {
        &self.resolver
    }

    pub fn create_timer_at(
        &self,
        ctx: &InvocationContext,
        expiration: SystemTime,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?.create_timer_at(expiration, info)
    }

    pub fn create_timer_after(
        &self,
        ctx: &InvocationContext,
        duration: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?.create_timer_after(duration, info)
    }

    pub fn create_repeating_timer_at(
        &self,
        ctx: &InvocationContext,
        initial_expiration: SystemTime,
        interval: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_repeating_timer_at(initial_expiration, interval, info)
    }

    pub fn create_repeating_timer_after(
        &self,
        ctx: &InvocationContext,
        initial_duration: Duration,
        interval: Duration,
        info: Option<TimerInfo>,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_repeating_timer_after(initial_duration, interval, info)
    }

    pub fn create_single_action_timer_at(
        &self,
        ctx: &InvocationContext,
        expiration: SystemTime,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_single_action_timer_at(expiration, config)
    }

    pub fn create_single_action_timer_after(
        &self,
        ctx: &InvocationContext,
        duration: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_single_action_timer_after(duration, config)
    }

    pub fn create_interval_timer_at(
        &self,
        ctx: &InvocationContext,
        initial_expiration: SystemTime,
        interval: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_interval_timer_at(initial_expiration, interval, config)
    }

    pub fn create_interval_timer_after(
        &self,
        ctx: &InvocationContext,
        initial_duration: Duration,
        interval: Duration,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_interval_timer_after(initial_duration, interval, config)
    }

    /// 使用默认配置（无负载、持久化）的日历定时器。
    pub fn create_calendar_timer(
        &self,
        ctx: &InvocationContext,
        expression: ScheduleExpression,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?
            .create_calendar_timer(expression, TimerConfig::default())
    }

    pub fn create_calendar_timer_with_config(
        &self,
        ctx: &InvocationContext,
        expression: ScheduleExpression,
        config: TimerConfig,
    ) -> Result<TimerRecord, TimerError> {
        self.handle(ctx)?.create_calendar_timer(expression, config)
    }

    /// 当前调用视角下的定时器。
    pub fn timers(&self, ctx: &InvocationContext) -> Result<Vec<TimerRecord>, TimerError> {
        self.handle(ctx)?.timers()
    }

    /// 当前调用所属部署单元内全部定义的定时器并集。
    ///
    /// # 执行逻辑（How）
    /// 1. 取当前定义的 `unit_id`，向注册表索取该单元的 [`crate::definition::DeploymentUnit`] 快照；
    /// 2. 再按 `unit_id` 字面相等过滤，防止注册表实现返回越界定义；
    /// 3. 对每个定义以无主键、静默方式解析；`None` 或 `NotSupported` 跳过；
    /// 4. 引擎查询结果并入 `HashSet`，查询失败只记录告警。
    ///
    /// 有状态组件与其他类别走同一路径：无主键解析得到的就是全部实例的定时器。
    pub fn all_timers(&self, ctx: &InvocationContext) -> HashSet<TimerRecord> {
        let unit = ctx.definition().unit_id();
        let snapshot = self.registry.unit(unit);
        let mut timers = HashSet::new();

        for definition in snapshot
            .component_definitions()
            .iter()
            .filter(|definition| definition.unit_id() == unit)
        {
            let handle = match self.resolver.resolve(None, definition, true) {
                Ok(Some(handle)) => handle,
                Ok(None) => {
                    debug!(
                        deployment_id = %definition.deployment_id(),
                        unit_id = %snapshot.id(),
                        "skipping definition without timer entitlement"
                    );
                    continue;
                }
                Err(err) => {
                    debug!(
                        deployment_id = %definition.deployment_id(),
                        unit_id = %snapshot.id(),
                        error = %err,
                        "skipping definition without a timer engine"
                    );
                    continue;
                }
            };

            match handle.timers() {
                Ok(found) => {
                    trace!(
                        deployment_id = %definition.deployment_id(),
                        stateful = definition.kind().is_stateful(),
                        count = found.len(),
                        "collected unit timers"
                    );
                    timers.extend(found);
                }
                Err(err) => warn!(
                    deployment_id = %definition.deployment_id(),
                    unit_id = %snapshot.id(),
                    kind = err.kind().as_str(),
                    error = %err,
                    "timer engine failed while aggregating unit timers"
                ),
            }
        }

        timers
    }

    fn handle(&self, ctx: &InvocationContext) -> Result<TimerServiceHandle, TimerError> {
        self.resolver
            .resolve_for_call(ctx.primary_key().cloned(), ctx.definition())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definition::{ComponentDefinition, ComponentKind},
        engine::{InMemoryTimerEngine, TimerEngine},
        ids::{DeploymentId, MethodRef, PrimaryKey, UnitId},
        registry::ApplicationRegistry,
    };

    fn stateful(engine: Arc<dyn TimerEngine>) -> Arc<ComponentDefinition> {
        Arc::new(
            ComponentDefinition::builder(
                DeploymentId::parse("cart").expect("valid id"),
                ComponentKind::Stateful,
                UnitId::parse("shop").expect("valid unit"),
            )
            .with_timer_engine(engine)
            .with_timeout_method(MethodRef::parse("expire").expect("valid method"))
            .build(),
        )
    }

    fn ctx(definition: &Arc<ComponentDefinition>, pk: &str) -> InvocationContext {
        InvocationContext::builder()
            .with_definition(Arc::clone(definition))
            .with_primary_key(PrimaryKey::parse(pk).expect("valid pk"))
            .build()
            .expect("context")
    }

    #[test]
    fn instance_view_and_unit_view_differ_for_stateful_components() {
        let engine: Arc<dyn TimerEngine> = Arc::new(InMemoryTimerEngine::new());
        let registry = Arc::new(ApplicationRegistry::new());
        let definition = stateful(engine);
        registry.deploy(Arc::clone(&definition)).expect("deploy");
        let facade = TimerFacade::with_settings(TimerSettings::default(), registry);

        let alice = ctx(&definition, "alice");
        let bob = ctx(&definition, "bob");
        facade
            .create_timer_after(&alice, Duration::from_secs(30), None)
            .expect("alice timer");
        facade
            .create_timer_after(&bob, Duration::from_secs(30), None)
            .expect("bob timer");

        assert_eq!(facade.timers(&alice).expect("alice timers").len(), 1);
        assert_eq!(facade.all_timers(&alice).len(), 2);
    }

    #[test]
    fn legacy_creators_store_the_info_on_a_persistent_timer() {
        let engine: Arc<dyn TimerEngine> = Arc::new(InMemoryTimerEngine::new());
        let registry = Arc::new(ApplicationRegistry::new());
        let definition = stateful(engine);
        registry.deploy(Arc::clone(&definition)).expect("deploy");
        let facade = TimerFacade::with_settings(TimerSettings::default(), registry);

        let timer = facade
            .create_repeating_timer_after(
                &ctx(&definition, "alice"),
                Duration::from_secs(1),
                Duration::from_secs(60),
                Some(TimerInfo::new(serde_json::json!({ "reason": "idle" }))),
            )
            .expect("repeating timer");

        assert!(timer.is_persistent());
        assert_eq!(
            timer.info().map(TimerInfo::value),
            Some(&serde_json::json!({ "reason": "idle" }))
        );
    }
}
