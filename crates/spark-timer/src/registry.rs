//! # 组件定义注册表
//!
//! ## 核心意图（Why）
//! - 聚合操作需要列出与当前调用同属一个部署单元的全部组件定义；元数据注册表本身属于外部协作者，
//!   这里只定义读取契约 [`DefinitionRegistry`]；
//! - [`ApplicationRegistry`] 是进程内实现，宿主可直接用它承载部署结果。
//!
//! ## 行为契约（What）
//! - `unit` 返回 [`DeploymentUnit`] 快照，调用方持有期间的部署/卸载不会影响已返回的成员列表；
//! - 实现可以返回超出该单元的定义，聚合方仍会按 `unit_id` 字面相等再过滤一次。

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    definition::{ComponentDefinition, DeploymentUnit},
    error::TimerError,
    ids::{DeploymentId, UnitId},
};

/// 读取组件定义的最小契约。
pub trait DefinitionRegistry: Send + Sync {
    /// 生成 `unit` 的部署单元快照。
    fn unit(&self, unit: &UnitId) -> DeploymentUnit;
}

/// 单个应用内全部组件定义的登记表。
///
/// # 教案式注释
/// - **意图 (Why)**：部署期写、调用期读，读多写少，采用 `parking_lot::RwLock` 包裹有序列表，
///   保持部署顺序以便诊断输出稳定；
/// - **契约 (What)**：
///   - `deploy`：同一应用内部署标识唯一，重复部署返回 `IllegalState`；
///   - `undeploy`：移除并返回定义，未命中返回 `None`；
/// - **风险 (Trade-offs)**：查询按单元线性过滤，组件规模在千级以内时开销可忽略。
#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    definitions: RwLock<Vec<Arc<ComponentDefinition>>>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个组件定义。
    pub fn deploy(&self, definition: Arc<ComponentDefinition>) -> Result<(), TimerError> {
        let mut definitions = self.definitions.write();
        if definitions
            .iter()
            .any(|existing| existing.deployment_id() == definition.deployment_id())
        {
            return Err(TimerError::illegal_state(format!(
                "deployment `{}` is already registered",
                definition.deployment_id()
            )));
        }
        debug!(
            deployment_id = %definition.deployment_id(),
            unit_id = %definition.unit_id(),
            kind = %definition.kind(),
            "component definition deployed"
        );
        definitions.push(definition);
        Ok(())
    }

    /// 卸载并返回组件定义。
    pub fn undeploy(&self, id: &DeploymentId) -> Option<Arc<ComponentDefinition>> {
        let mut definitions = self.definitions.write();
        let index = definitions
            .iter()
            .position(|definition| definition.deployment_id() == id)?;
        Some(definitions.remove(index))
    }

    /// 按部署标识查找定义。
    pub fn get(&self, id: &DeploymentId) -> Option<Arc<ComponentDefinition>> {
        self.definitions
            .read()
            .iter()
            .find(|definition| definition.deployment_id() == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }
}

impl DefinitionRegistry for ApplicationRegistry {
    fn unit(&self, unit: &UnitId) -> DeploymentUnit {
        let members = self
            .definitions
            .read()
            .iter()
            .filter(|definition| definition.unit_id() == unit)
            .cloned()
            .collect();
        DeploymentUnit::new(unit.clone(), members)
    }
}
