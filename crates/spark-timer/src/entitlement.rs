//! # EntitlementCache：定时器资格的一次性记忆化
//!
//! ## 核心意图（Why）
//! - 判定组件定义是否“具备定时器资格”：声明了超时方法，或任一方法声明了至少一条调度；
//! - 判定需要扫描全部方法元数据，结果在定义生命周期内不变，因此首次计算后写入侧表，后续直接命中。
//!
//! ## 行为契约（What）
//! - 读路径只做分片读取，不触碰任何全局锁；
//! - 写路径先在锁外完成扫描，再通过 `DashMap::entry` 以“缺席才插入”的方式落表：
//!   若其他线程已经写入，则沿用其值，绝不覆盖；
//! - 侧表以 [`DefinitionToken`] 为键：同名卸载后重新部署的定义拿到新令牌，重新计算资格；
//! - 无失效、无过期。
//!
//! ## 风险提示（Trade-offs）
//! - 首次访问的竞争窗口内多个线程可能各扫描一次，扫描次数上界为并发首访线程数；扫描是纯函数，结果一致。

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};
use tracing::{debug, trace};

use crate::definition::{ComponentDefinition, DefinitionToken};

/// 侧表中保存的资格标记。
///
/// 以独立类型包装布尔值，避免与侧表中可能出现的其他布尔事实混淆。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitlementFlag(bool);

impl EntitlementFlag {
    pub const fn new(capable: bool) -> Self {
        Self(capable)
    }

    pub const fn is_capable(self) -> bool {
        self.0
    }
}

/// 按组件定义记忆化定时器资格的侧表。
///
/// # 教案式注释
/// - **意图 (Why)**：替代“在定义对象上挂可变扩展槽 + 借用定义对象做监视器”的做法，
///   把缓存与并发契约收拢到一个显式组件中；
/// - **契约 (What)**：
///   - [`EntitlementCache::is_timer_capable`] 对同一定义的所有调用返回同一布尔值；
///   - `scans()` 统计实际执行的元数据扫描次数，可用于验证记忆化是否生效；
/// - **风险 (Trade-offs)**：已卸载定义的条目不会回收，每个条目只占一个令牌与一个布尔值。
#[derive(Debug, Default)]
pub struct EntitlementCache {
    flags: DashMap<DefinitionToken, EntitlementFlag>,
    scans: AtomicU64,
}

impl EntitlementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回定义是否具备定时器资格，首次调用时计算并落表。
    pub fn is_timer_capable(&self, definition: &ComponentDefinition) -> bool {
        let token = definition.token();
        if let Some(flag) = self.flags.get(&token) {
            return flag.is_capable();
        }

        let id = definition.deployment_id();
        let computed = EntitlementFlag::new(self.scan(definition));
        match self.flags.entry(token) {
            Entry::Occupied(existing) => {
                let stored = *existing.get();
                trace!(
                    deployment_id = %id,
                    token = %token,
                    capable = stored.is_capable(),
                    "entitlement already cached by a concurrent caller"
                );
                stored.is_capable()
            }
            Entry::Vacant(vacant) => {
                vacant.insert(computed);
                debug!(
                    deployment_id = %id,
                    token = %token,
                    capable = computed.is_capable(),
                    "entitlement cached"
                );
                computed.is_capable()
            }
        }
    }

    /// 累计执行的元数据扫描次数。
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    fn scan(&self, definition: &ComponentDefinition) -> bool {
        self.scans.fetch_add(1, Ordering::Relaxed);
        definition.timeout_method().is_some()
            || definition
                .methods()
                .any(|(_, metadata)| metadata.schedule_count() > 0)
    }
}
