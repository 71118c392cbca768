//! 资格缓存的并发首访测试套件。
//!
//! # 教案级导览
//!
//! - **Why**：资格判定在首次访问时计算，多个调用线程可能同时首访同一组件定义；
//!   缓存必须收敛到同一布尔值，且后续访问不再扫描方法元数据。
//! - **How**：用 `Barrier` 让所有线程同时起跑，放大竞争窗口，结束后检查返回值与扫描计数。
//! - **What**：扫描次数上界为并发首访线程数；收敛后追加调用扫描次数不变。

use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use spark_timer::{
    ApplicationRegistry, ComponentDefinition, ComponentKind, DeploymentId, EntitlementCache,
    InMemoryTimerEngine, InvocationContext, MethodMetadata, MethodRef, PrimaryKey,
    ScheduleExpression, TimerEngine, TimerFacade, TimerSettings, UnitId,
};

const THREADS: usize = 8;

fn definition(id: &str, scheduled: bool) -> Arc<ComponentDefinition> {
    let metadata = if scheduled {
        MethodMetadata::new().with_schedule(ScheduleExpression::new().hour("3"))
    } else {
        MethodMetadata::new()
    };
    let engine: Arc<dyn TimerEngine> = Arc::new(InMemoryTimerEngine::new());
    Arc::new(
        ComponentDefinition::builder(
            DeploymentId::parse(id).expect("valid id"),
            ComponentKind::Stateless,
            UnitId::parse("batch").expect("valid unit"),
        )
        .with_timer_engine(engine)
        .with_method(MethodRef::parse("cleanup").expect("valid method"), metadata)
        .build(),
    )
}

/// ## 测试一：同一定义的并发首访收敛
///
/// - **意图 (Why)**：验证竞争窗口内各线程得到相同结论，且扫描次数有界。
/// - **契约 (What)**：
///   - **后置条件**：所有线程返回 `true`；`1 <= scans <= THREADS`；再调用 100 次扫描数不变。
#[test]
fn concurrent_first_access_converges_to_one_value() {
    let cache = Arc::new(EntitlementCache::new());
    let definition = definition("nightly", true);
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let definition = Arc::clone(&definition);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.is_timer_capable(&definition)
            })
        })
        .collect();

    let results: Vec<bool> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker must not panic"))
        .collect();

    assert!(results.iter().all(|capable| *capable), "所有线程必须得到同一结论");
    let scans = cache.scans();
    assert!(
        (1..=THREADS as u64).contains(&scans),
        "扫描次数必须有界，实际为 {scans}"
    );

    for _ in 0..100 {
        assert!(cache.is_timer_capable(&definition));
    }
    assert_eq!(cache.scans(), scans, "收敛后不应再扫描");
    assert_eq!(cache.len(), 1);
}

/// ## 测试二：不相关定义互不干扰
///
/// - **意图 (Why)**：侧表按定义分别记忆，不同定义的首访结果不能串味。
#[test]
fn unrelated_definitions_are_cached_independently() {
    let cache = Arc::new(EntitlementCache::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|index| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            let definition = definition(&format!("job-{index}"), index % 2 == 0);
            thread::spawn(move || {
                barrier.wait();
                (index, cache.is_timer_capable(&definition))
            })
        })
        .collect();

    for worker in workers {
        let (index, capable) = worker.join().expect("worker must not panic");
        assert_eq!(capable, index % 2 == 0, "job-{index} 的结论错误");
    }
    assert_eq!(cache.len(), THREADS);
    assert_eq!(cache.scans(), THREADS as u64);
}

/// ## 测试三：带调度声明的组件并发创建日历定时器
///
/// - **意图 (Why)**：组件只有一个调度方法、没有超时方法；首个调用计算出资格并缓存，
///   并发的后续调用复用缓存。
/// - **契约 (What)**：所有创建都成功；全部完成后再创建一次，扫描次数不变。
#[test]
fn scheduled_component_creates_calendar_timers_concurrently() {
    let registry = Arc::new(ApplicationRegistry::new());
    let definition = definition("reports", true);
    registry
        .deploy(Arc::clone(&definition))
        .expect("deploy reports");
    let facade = Arc::new(TimerFacade::with_settings(
        TimerSettings::default(),
        registry,
    ));
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|index| {
            let facade = Arc::clone(&facade);
            let barrier = Arc::clone(&barrier);
            let ctx = InvocationContext::new(
                Arc::clone(&definition),
                Some(PrimaryKey::parse(format!("run-{index}")).expect("valid pk")),
            );
            thread::spawn(move || {
                barrier.wait();
                facade.create_calendar_timer(&ctx, ScheduleExpression::new().minute("*/5"))
            })
        })
        .collect();

    for worker in workers {
        worker
            .join()
            .expect("worker must not panic")
            .expect("calendar timer must be created");
    }

    let entitlements = facade.resolver().entitlements();
    let scans = entitlements.scans();
    assert!((1..=THREADS as u64).contains(&scans));

    let ctx = InvocationContext::new(Arc::clone(&definition), None);
    facade
        .create_timer_after(&ctx, Duration::from_secs(1), None)
        .expect("cached entitlement admits later calls");
    assert_eq!(entitlements.scans(), scans);
    assert_eq!(facade.all_timers(&ctx).len(), THREADS + 1);
}
