//! # 组件定义与部署单元
//!
//! ## 核心意图（Why）
//! - 描述部署期确定、运行期只读的组件元数据：超时方法、按方法声明的调度表达式、绑定的调度引擎；
//! - 定义本身不提供可变扩展槽，派生事实（如定时器资格）由 [`crate::entitlement::EntitlementCache`]
//!   的侧表持有。
//!
//! ## 行为契约（What）
//! - [`ComponentDefinition`] 只能通过 [`ComponentDefinitionBuilder`] 构造，构造后结构不可变；
//! - `methods()` 按注册顺序返回 `(MethodRef, MethodMetadata)`，扫描结果可重复计算且无副作用；
//! - 每次 `build` 分配一个进程内唯一的 [`DefinitionToken`]，同名重新部署得到的是另一个定义。

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    engine::TimerEngine,
    ids::{DeploymentId, MethodRef, UnitId},
    timer::ScheduleExpression,
};

/// 组件类别。
///
/// `Stateful` 表示按实例区分状态的组件；其余类别在定时器语义上按类级别处理。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ComponentKind {
    Stateless,
    Stateful,
    Singleton,
    MessageDriven,
}

impl ComponentKind {
    /// 返回稳定字符串描述，用于日志字段。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::Stateful => "stateful",
            Self::Singleton => "singleton",
            Self::MessageDriven => "message_driven",
        }
    }

    pub const fn is_stateful(self) -> bool {
        matches!(self, Self::Stateful)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 方法级元数据，目前只关心该方法上声明的自动调度。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MethodMetadata {
    schedules: Vec<ScheduleExpression>,
}

impl MethodMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一条调度声明。
    pub fn with_schedule(mut self, schedule: ScheduleExpression) -> Self {
        self.schedules.push(schedule);
        self
    }

    pub fn schedules(&self) -> &[ScheduleExpression] {
        &self.schedules
    }

    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }
}

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// 组件定义实例的身份标记。
///
/// # 教案式注释
/// - **意图 (Why)**：部署标识是名字，卸载后可以被新的定义复用；派生事实必须跟随定义实例，
///   而不是跟随名字；
/// - **契约 (What)**：由 [`ComponentDefinitionBuilder::build`] 从进程级递增序列分配，永不复用。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DefinitionToken(u64);

impl DefinitionToken {
    fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DefinitionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "definition-{}", self.0)
    }
}

/// 可部署组件的静态描述。
///
/// # 教案式注释
/// - **意图 (Why)**：聚合定时器解析所需的全部部署期事实，避免解析器回查外部注册表；
/// - **契约 (What)**：
///   - `timer_engine` 为 `None` 表示部署时未启用定时器，任何定时器调用都会得到 `NotSupported`；
///   - `unit_id` 指向所属部署单元，聚合时按它做字面相等过滤；
/// - **风险 (Trade-offs)**：引擎以 `Arc<dyn TimerEngine>` 共享，同一单元内多个组件可以指向同一引擎实例。
pub struct ComponentDefinition {
    token: DefinitionToken,
    deployment_id: DeploymentId,
    kind: ComponentKind,
    unit_id: UnitId,
    timer_engine: Option<Arc<dyn TimerEngine>>,
    timeout_method: Option<MethodRef>,
    methods: Vec<(MethodRef, MethodMetadata)>,
}

impl ComponentDefinition {
    /// 以必填字段开启构建。
    pub fn builder(
        deployment_id: DeploymentId,
        kind: ComponentKind,
        unit_id: UnitId,
    ) -> ComponentDefinitionBuilder {
        ComponentDefinitionBuilder {
            deployment_id,
            kind,
            unit_id,
            timer_engine: None,
            timeout_method: None,
            methods: Vec::new(),
        }
    }

    /// 本定义实例的身份，资格侧表以它为键。
    pub fn token(&self) -> DefinitionToken {
        self.token
    }

    pub fn deployment_id(&self) -> &DeploymentId {
        &self.deployment_id
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn unit_id(&self) -> &UnitId {
        &self.unit_id
    }

    /// 部署时绑定的调度引擎。
    pub fn timer_engine(&self) -> Option<&Arc<dyn TimerEngine>> {
        self.timer_engine.as_ref()
    }

    /// 声明的超时回调方法。
    pub fn timeout_method(&self) -> Option<&MethodRef> {
        self.timeout_method.as_ref()
    }

    /// 按注册顺序遍历方法元数据。
    pub fn methods(&self) -> impl Iterator<Item = (&MethodRef, &MethodMetadata)> {
        self.methods.iter().map(|(method, meta)| (method, meta))
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("token", &self.token)
            .field("deployment_id", &self.deployment_id)
            .field("kind", &self.kind)
            .field("unit_id", &self.unit_id)
            .field("timer_engine", &self.timer_engine.is_some())
            .field("timeout_method", &self.timeout_method)
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// [`ComponentDefinition`] 的构建器。
pub struct ComponentDefinitionBuilder {
    deployment_id: DeploymentId,
    kind: ComponentKind,
    unit_id: UnitId,
    timer_engine: Option<Arc<dyn TimerEngine>>,
    timeout_method: Option<MethodRef>,
    methods: Vec<(MethodRef, MethodMetadata)>,
}

impl ComponentDefinitionBuilder {
    /// 绑定调度引擎，等价于部署时启用定时器支持。
    pub fn with_timer_engine(mut self, engine: Arc<dyn TimerEngine>) -> Self {
        self.timer_engine = Some(engine);
        self
    }

    pub fn with_timeout_method(mut self, method: MethodRef) -> Self {
        self.timeout_method = Some(method);
        self
    }

    /// 登记一个方法及其元数据；重复登记同名方法时后者覆盖前者并保留原位置。
    pub fn with_method(mut self, method: MethodRef, metadata: MethodMetadata) -> Self {
        match self.methods.iter_mut().find(|(existing, _)| *existing == method) {
            Some((_, slot)) => *slot = metadata,
            None => self.methods.push((method, metadata)),
        }
        self
    }

    pub fn build(self) -> ComponentDefinition {
        ComponentDefinition {
            token: DefinitionToken::next(),
            deployment_id: self.deployment_id,
            kind: self.kind,
            unit_id: self.unit_id,
            timer_engine: self.timer_engine,
            timeout_method: self.timeout_method,
            methods: self.methods,
        }
    }
}

/// 部署单元：一起打包部署的一组组件定义。
///
/// - **契约 (What)**：由注册表生成的只读快照，成员列表反映快照时刻的部署状态。
#[derive(Clone, Debug)]
pub struct DeploymentUnit {
    id: UnitId,
    definitions: Vec<Arc<ComponentDefinition>>,
}

impl DeploymentUnit {
    pub fn new(id: UnitId, definitions: Vec<Arc<ComponentDefinition>>) -> Self {
        Self { id, definitions }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn component_definitions(&self) -> &[Arc<ComponentDefinition>] {
        &self.definitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(name: &str) -> MethodRef {
        MethodRef::parse(name).expect("valid method")
    }

    #[test]
    fn re_registering_a_method_keeps_its_position() {
        let definition = ComponentDefinition::builder(
            DeploymentId::parse("reports").expect("valid id"),
            ComponentKind::Stateless,
            UnitId::parse("reports.jar").expect("valid unit"),
        )
        .with_method(method("render"), MethodMetadata::new())
        .with_method(method("purge"), MethodMetadata::new())
        .with_method(
            method("render"),
            MethodMetadata::new().with_schedule(ScheduleExpression::new().hour("2")),
        )
        .build();

        let order: Vec<_> = definition
            .methods()
            .map(|(name, meta)| (name.as_str().to_owned(), meta.schedule_count()))
            .collect();
        assert_eq!(
            order,
            [("render".to_owned(), 1), ("purge".to_owned(), 0)]
        );
    }

    #[test]
    fn every_build_gets_a_fresh_token() {
        let build = || {
            ComponentDefinition::builder(
                DeploymentId::parse("orders").expect("valid id"),
                ComponentKind::Stateless,
                UnitId::parse("shop").expect("valid unit"),
            )
            .build()
        };
        let first = build();
        let second = build();
        assert_eq!(first.deployment_id(), second.deployment_id());
        assert_ne!(first.token(), second.token());
        assert!(second.token().get() > first.token().get());
    }

    #[test]
    fn only_stateful_kind_is_per_instance() {
        assert!(ComponentKind::Stateful.is_stateful());
        assert!(!ComponentKind::Singleton.is_stateful());
        assert_eq!(ComponentKind::MessageDriven.to_string(), "message_driven");
    }
}
