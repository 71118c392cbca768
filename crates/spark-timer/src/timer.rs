//! 定时器值类型：创建参数、日历表达式与引擎返回的定时器记录。
//!
//! # 设计定位（Why）
//! - 门面的多个创建入口最终都折叠为 [`TimerSchedule`] + [`TimerConfig`] 两个值交给引擎，
//!   引擎只需实现一个创建方法；
//! - [`TimerRecord`] 的相等性只看 [`TimerId`]，聚合时放入 `HashSet` 即可折叠重复身份。

use std::{
    hash::{Hash, Hasher},
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

use crate::ids::{DeploymentId, MethodRef, PrimaryKey, TimerId};

/// 应用随定时器保存的负载，到期回调时原样交还。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerInfo(serde_json::Value);

impl TimerInfo {
    /// 包装任意可序列化的 JSON 值。
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    /// 读取负载。
    pub fn value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for TimerInfo {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// 单个定时器的创建配置。
///
/// - **契约 (What)**：默认不携带负载且为持久化定时器，与容器规范的缺省一致；
/// - **风险 (Trade-offs)**：`persistent` 仅是对引擎的意图声明，本 crate 不实现持久化。
#[derive(Clone, Debug, PartialEq)]
pub struct TimerConfig {
    info: Option<TimerInfo>,
    persistent: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            info: None,
            persistent: true,
        }
    }
}

impl TimerConfig {
    /// 携带负载的持久化配置。
    pub fn new(info: Option<TimerInfo>) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// 调整是否持久化。
    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn info(&self) -> Option<&TimerInfo> {
        self.info.as_ref()
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// 首次到期时间的两种表达：绝对时刻或相对当前的时长。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerStart {
    At(SystemTime),
    After(Duration),
}

impl TimerStart {
    /// 以 `now` 为基准换算出绝对到期时刻；溢出时返回 `None`。
    pub fn resolve(self, now: SystemTime) -> Option<SystemTime> {
        match self {
            Self::At(at) => Some(at),
            Self::After(delay) => now.checked_add(delay),
        }
    }
}

/// 日历式调度表达式。
///
/// # 教案式说明
/// - **意图 (Why)**：沿用容器日历定时器的七字段模型（秒、分、时、日、月、周、年），
///   便于从部署描述或注解迁移；
/// - **契约 (What)**：字段保存原始文本，默认值为 `"0" "0" "0" "*" "*" "*" "*"`，
///   即每天零点；语法校验与触发计算属于调度引擎职责；
/// - **风险 (Trade-offs)**：不在此解析 cron 语法，非法文本要到引擎侧才会被拒绝。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScheduleExpression {
    second: String,
    minute: String,
    hour: String,
    day_of_month: String,
    month: String,
    day_of_week: String,
    year: String,
    timezone: Option<String>,
    start: Option<SystemTime>,
    end: Option<SystemTime>,
}

impl Default for ScheduleExpression {
    fn default() -> Self {
        Self {
            second: "0".to_owned(),
            minute: "0".to_owned(),
            hour: "0".to_owned(),
            day_of_month: "*".to_owned(),
            month: "*".to_owned(),
            day_of_week: "*".to_owned(),
            year: "*".to_owned(),
            timezone: None,
            start: None,
            end: None,
        }
    }
}

impl ScheduleExpression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn second(mut self, value: impl Into<String>) -> Self {
        self.second = value.into();
        self
    }

    pub fn minute(mut self, value: impl Into<String>) -> Self {
        self.minute = value.into();
        self
    }

    pub fn hour(mut self, value: impl Into<String>) -> Self {
        self.hour = value.into();
        self
    }

    pub fn day_of_month(mut self, value: impl Into<String>) -> Self {
        self.day_of_month = value.into();
        self
    }

    pub fn month(mut self, value: impl Into<String>) -> Self {
        self.month = value.into();
        self
    }

    pub fn day_of_week(mut self, value: impl Into<String>) -> Self {
        self.day_of_week = value.into();
        self
    }

    pub fn year(mut self, value: impl Into<String>) -> Self {
        self.year = value.into();
        self
    }

    pub fn timezone(mut self, value: impl Into<String>) -> Self {
        self.timezone = Some(value.into());
        self
    }

    /// 限定表达式生效的时间窗口。
    pub fn window(mut self, start: Option<SystemTime>, end: Option<SystemTime>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// 以 `(名称, 文本)` 形式遍历七个日历字段，供引擎逐项校验。
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("second", &self.second),
            ("minute", &self.minute),
            ("hour", &self.hour),
            ("day_of_month", &self.day_of_month),
            ("month", &self.month),
            ("day_of_week", &self.day_of_week),
            ("year", &self.year),
        ]
    }

    pub fn timezone_id(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn start(&self) -> Option<SystemTime> {
        self.start
    }

    pub fn end(&self) -> Option<SystemTime> {
        self.end
    }
}

/// 交给调度引擎的调度形态。
#[derive(Clone, Debug, PartialEq)]
pub enum TimerSchedule {
    /// 只触发一次。
    SingleAction { start: TimerStart },
    /// 首次到期后按固定间隔重复。
    Interval { start: TimerStart, interval: Duration },
    /// 按日历表达式触发。
    Calendar(ScheduleExpression),
}

/// 定时器归属：哪个组件、哪个实例、到期回调哪个方法。
///
/// - **契约 (What)**：`primary_key` 为 `None` 表示类级别（整个部署）的视角，
///   引擎查询时应返回该部署下全部定时器。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimerOwner {
    deployment_id: DeploymentId,
    primary_key: Option<PrimaryKey>,
    timeout_method: Option<MethodRef>,
}

impl TimerOwner {
    pub fn new(
        deployment_id: DeploymentId,
        primary_key: Option<PrimaryKey>,
        timeout_method: Option<MethodRef>,
    ) -> Self {
        Self {
            deployment_id,
            primary_key,
            timeout_method,
        }
    }

    pub fn deployment_id(&self) -> &DeploymentId {
        &self.deployment_id
    }

    pub fn primary_key(&self) -> Option<&PrimaryKey> {
        self.primary_key.as_ref()
    }

    pub fn timeout_method(&self) -> Option<&MethodRef> {
        self.timeout_method.as_ref()
    }
}

/// 引擎返回的定时器快照。
///
/// # 契约说明
/// - 相等与哈希只比较 [`TimerId`]：同一定时器经由不同句柄查询得到的快照视为同一元素；
/// - `next_timeout` 对日历定时器可能为 `None`，由引擎决定何时计算。
#[derive(Clone, Debug)]
pub struct TimerRecord {
    id: TimerId,
    owner: TimerOwner,
    schedule: TimerSchedule,
    config: TimerConfig,
    next_timeout: Option<SystemTime>,
}

impl TimerRecord {
    pub fn new(
        id: TimerId,
        owner: TimerOwner,
        schedule: TimerSchedule,
        config: TimerConfig,
        next_timeout: Option<SystemTime>,
    ) -> Self {
        Self {
            id,
            owner,
            schedule,
            config,
            next_timeout,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn owner(&self) -> &TimerOwner {
        &self.owner
    }

    pub fn schedule(&self) -> &TimerSchedule {
        &self.schedule
    }

    pub fn info(&self) -> Option<&TimerInfo> {
        self.config.info()
    }

    pub fn is_persistent(&self) -> bool {
        self.config.is_persistent()
    }

    pub fn next_timeout(&self) -> Option<SystemTime> {
        self.next_timeout
    }
}

impl PartialEq for TimerRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TimerRecord {}

impl Hash for TimerRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
