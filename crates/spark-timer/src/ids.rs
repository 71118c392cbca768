//! 标识符契约，规范组件、部署单元、实例主键与定时器的身份表达。
//!
//! # 设计动机（Why）
//! - 消除“字符串即 ID”造成的隐式耦合，部署标识与单元标识不会被误传；
//! - 统一拒绝空白标识，保证侧表缓存与聚合过滤的键始终有意义。
//!
//! # 集成方式（How）
//! - 字符串类标识通过 `::parse` 校验后构造，内部以 `Arc<str>` 共享，克隆为常数开销；
//! - [`TimerId`] 由调度引擎分配，仅承载数值身份。

use std::{fmt, sync::Arc};

use crate::error::TimerError;

fn non_empty(value: impl Into<Arc<str>>, what: &str) -> Result<Arc<str>, TimerError> {
    let value = value.into();
    if value.trim().is_empty() {
        return Err(TimerError::illegal_argument(format!(
            "{what} must not be blank"
        )));
    }
    Ok(value)
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Arc<str>);

        impl $name {
            /// 从原始字符串解析标识；空白输入返回 `IllegalArgument`。
            pub fn parse(value: impl Into<Arc<str>>) -> Result<Self, TimerError> {
                Ok(Self(non_empty(value, $what)?))
            }

            /// 返回底层字符串切片。
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// 组件定义的部署标识，在同一应用内唯一。
    ///
    /// # 契约定义（What）
    /// - **前置条件**：注册表保证同一应用内不存在两个同名部署；
    /// - **后置条件**：可作为能力缓存侧表的键，缓存生命周期与应用一致。
    DeploymentId,
    "deployment id"
);

string_id!(
    /// 部署单元（打包模块）的标识。
    UnitId,
    "unit id"
);

string_id!(
    /// 组件实例的主键，无主键的组件以 `None` 表示而非空串。
    PrimaryKey,
    "primary key"
);

string_id!(
    /// 组件方法引用，按方法签名字符串区分。
    MethodRef,
    "method name"
);

/// 调度引擎分配的定时器身份，聚合结果按该值去重。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// 包装引擎分配的数值。
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// 读取底层数值。
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}
