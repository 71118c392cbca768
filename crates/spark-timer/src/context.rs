//! 调用上下文：当前正在执行的组件定义与实例主键。
//!
//! # 设计定位（Why）
//! - 门面的每个操作都显式接收 [`InvocationContext`]，以参数传递替代线程本地的“当前调用”记录，
//!   调用关系在签名上可见，测试也无需预先布置全局状态；
//! - 上下文由调用层在进入组件前构造，本 crate 只读取，不创建也不销毁调用。
//!
//! # 契约说明（What）
//! - 通过 [`InvocationContextBuilder`] 构造；缺少组件定义时返回
//!   [`TimerError::NoInvocationContext`]，对应“调用未绑定”的状态错误；
//! - 克隆为常数开销，定义以 `Arc` 共享。

use std::sync::Arc;

use crate::{definition::ComponentDefinition, error::TimerError, ids::PrimaryKey};

/// 单次调用的身份。
#[derive(Clone, Debug)]
pub struct InvocationContext {
    definition: Arc<ComponentDefinition>,
    primary_key: Option<PrimaryKey>,
}

impl InvocationContext {
    /// 直接以定义与主键构造。
    pub fn new(definition: Arc<ComponentDefinition>, primary_key: Option<PrimaryKey>) -> Self {
        Self {
            definition,
            primary_key,
        }
    }

    pub fn builder() -> InvocationContextBuilder {
        InvocationContextBuilder::default()
    }

    /// 当前执行组件的定义。
    pub fn definition(&self) -> &Arc<ComponentDefinition> {
        &self.definition
    }

    /// 当前实例主键；无主键组件返回 `None`。
    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }
}

/// [`InvocationContext`] 的构建器。
///
/// - **意图 (Why)**：调用层往往分步拿到定义与主键，构建器允许按任意顺序注入；
/// - **契约 (What)**：`build` 前必须调用 `with_definition`，否则返回状态错误。
#[derive(Clone, Debug, Default)]
pub struct InvocationContextBuilder {
    definition: Option<Arc<ComponentDefinition>>,
    primary_key: Option<PrimaryKey>,
}

impl InvocationContextBuilder {
    pub fn with_definition(mut self, definition: Arc<ComponentDefinition>) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn with_primary_key(mut self, primary_key: PrimaryKey) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn build(self) -> Result<InvocationContext, TimerError> {
        let definition = self.definition.ok_or(TimerError::NoInvocationContext)?;
        Ok(InvocationContext::new(definition, self.primary_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        definition::ComponentKind,
        error::TimerErrorKind,
        ids::{DeploymentId, UnitId},
    };

    #[test]
    fn building_without_a_definition_is_an_illegal_state() {
        let err = InvocationContext::builder()
            .with_primary_key(PrimaryKey::parse("42").expect("valid pk"))
            .build()
            .expect_err("definition is required");
        assert_eq!(err, TimerError::NoInvocationContext);
        assert_eq!(err.kind(), TimerErrorKind::IllegalState);
    }

    #[test]
    fn builder_carries_definition_and_key() {
        let definition = Arc::new(
            ComponentDefinition::builder(
                DeploymentId::parse("cart").expect("valid id"),
                ComponentKind::Stateful,
                UnitId::parse("shop").expect("valid unit"),
            )
            .build(),
        );
        let ctx = InvocationContext::builder()
            .with_definition(Arc::clone(&definition))
            .with_primary_key(PrimaryKey::parse("session-1").expect("valid pk"))
            .build()
            .expect("complete context");

        assert!(Arc::ptr_eq(ctx.definition(), &definition));
        assert_eq!(ctx.primary_key().map(PrimaryKey::as_str), Some("session-1"));
    }
}
