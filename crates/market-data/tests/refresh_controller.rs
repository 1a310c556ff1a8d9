//! 갱신 컨트롤러 통합 테스트
//!
//! 스텁 수집기와 메모리 캐시로 상태 전이, 캐시 정책, 중복 갱신 생략,
//! 주기적 갱신 태스크를 검증합니다.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use market_core::{MarketError, RawPoint, Result, Snapshot, SortColumn, Trend};
use market_data::{
    CacheStore, ChartFetcher, KeyValueBackend, MemoryBackend, RefreshController, RefreshOptions,
    RefreshOutcome, RefreshState, SnapshotCache,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

const CACHE_KEY: &str = "sp500_market_data";

// 2024-03-14 13:30 UTC (목), 2024-03-15 13:30 UTC (금)
const THU: i64 = 1_710_423_000;
const FRI: i64 = 1_710_509_400;

fn scenario_points() -> Vec<RawPoint> {
    vec![
        RawPoint::new(THU, 100.00, 101.005),
        RawPoint::new(FRI, 50.00, 49.50),
    ]
}

/// 미리 정한 응답을 순서대로 돌려주는 수집기.
#[derive(Default)]
struct ScriptedFetcher {
    responses: Mutex<Vec<Result<Vec<RawPoint>>>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new(responses: Vec<Result<Vec<RawPoint>>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChartFetcher for ScriptedFetcher {
    async fn fetch_raw_series(&self) -> Result<Vec<RawPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(scenario_points())
        } else {
            responses.remove(0)
        }
    }
}

/// `release` 신호가 올 때까지 응답을 보류하는 수집기.
#[derive(Default)]
struct GatedFetcher {
    started: Notify,
    release: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl ChartFetcher for GatedFetcher {
    async fn fetch_raw_series(&self) -> Result<Vec<RawPoint>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(scenario_points())
    }
}

fn memory_cache() -> Arc<SnapshotCache<MemoryBackend>> {
    Arc::new(SnapshotCache::new(
        MemoryBackend::new(),
        CACHE_KEY,
        ChronoDuration::minutes(5),
    ))
}

fn utc_options() -> RefreshOptions {
    RefreshOptions {
        timezone: chrono_tz::UTC,
        ..RefreshOptions::default()
    }
}

fn controller(
    fetcher: Arc<dyn ChartFetcher>,
    cache: Arc<SnapshotCache<MemoryBackend>>,
) -> Arc<RefreshController> {
    Arc::new(RefreshController::new(fetcher, cache, utc_options()))
}

#[tokio::test]
async fn activate_without_cache_fetches_derives_and_caches() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = memory_cache();
    let controller = controller(fetcher.clone(), cache.clone());

    let outcome = controller.activate().await;
    assert_eq!(outcome, RefreshOutcome::Updated { record_count: 2 });
    assert_eq!(fetcher.calls(), 1);

    let view = controller.view();
    assert!(!view.is_loading);
    assert_eq!(view.error_message, None);
    assert!(view.last_updated_display.is_some());

    // 최신 날짜 우선
    let friday = &view.records[0];
    assert_eq!(friday.date, "03/15/2024");
    assert_eq!(friday.day_of_week, "Friday");
    assert_eq!(friday.value_change, -0.5);
    assert_eq!(friday.percentage_change, -1.0);
    assert_eq!(friday.trend, Trend::Down);

    let thursday = &view.records[1];
    assert_eq!(thursday.date, "03/14/2024");
    assert_eq!(thursday.open, 100.0);
    assert_eq!(thursday.close, 101.01);
    assert_eq!(thursday.value_change, 1.01);
    assert_eq!(thursday.percentage_change, 1.01);
    assert_eq!(thursday.trend, Trend::Up);

    let cached = cache.read().await.unwrap();
    assert_eq!(cached.records, view.records);
}

#[tokio::test]
async fn activate_with_fresh_cache_skips_fetch() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = memory_cache();
    let records = market_core::derive_records(&scenario_points(), &Utc).unwrap();
    cache.write(&Snapshot::new(records, Utc::now())).await.unwrap();

    let controller = controller(fetcher.clone(), cache);
    let outcome = controller.activate().await;

    assert_eq!(outcome, RefreshOutcome::FromCache { record_count: 2 });
    assert_eq!(fetcher.calls(), 0);
    assert!(matches!(controller.state(), RefreshState::Ready { .. }));
    assert!(controller.view().last_updated_display.is_some());
}

#[tokio::test]
async fn activate_with_stale_cache_fetches() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = memory_cache();
    let stale = Snapshot::new(vec![], Utc::now() - ChronoDuration::minutes(6));
    cache.write(&stale).await.unwrap();

    let controller = controller(fetcher.clone(), cache);
    let outcome = controller.activate().await;

    assert_eq!(outcome, RefreshOutcome::Updated { record_count: 2 });
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test]
async fn activate_with_corrupt_cache_clears_and_fetches() {
    let fetcher = ScriptedFetcher::new(vec![Err(MarketError::EmptyData)]);
    let cache = memory_cache();
    cache
        .backend()
        .set(CACHE_KEY, "{\"data\": [".to_string())
        .await
        .unwrap();

    let controller = controller(fetcher.clone(), cache.clone());
    controller.activate().await;

    assert_eq!(fetcher.calls(), 1);
    // 손상 항목은 삭제되고, 실패한 갱신은 새로 쓰지 않음
    assert!(cache.backend().get(CACHE_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn empty_data_fails_without_cache_write() {
    let fetcher = ScriptedFetcher::new(vec![Err(MarketError::EmptyData)]);
    let cache = memory_cache();
    let controller = controller(fetcher.clone(), cache.clone());

    let outcome = controller.activate().await;
    assert_eq!(
        outcome,
        RefreshOutcome::Failed("No valid market data found".to_string())
    );

    let view = controller.view();
    assert!(!view.is_loading);
    assert_eq!(
        view.error_message.as_deref(),
        Some("No valid market data found")
    );
    assert!(view.records.is_empty());
    assert!(cache.backend().is_empty().await);
}

#[tokio::test]
async fn failed_refresh_keeps_last_good_records() {
    let fetcher = ScriptedFetcher::new(vec![
        Ok(scenario_points()),
        Err(MarketError::Transport("HTTP error! status: 503".to_string())),
    ]);
    let controller = controller(fetcher.clone(), memory_cache());

    controller.activate().await;
    let before = controller.view();

    let outcome = controller.refresh().await;
    assert_eq!(
        outcome,
        RefreshOutcome::Failed("HTTP error! status: 503".to_string())
    );

    let after = controller.view();
    assert_eq!(after.error_message.as_deref(), Some("HTTP error! status: 503"));
    assert_eq!(after.records, before.records);
    assert_eq!(after.last_updated_display, before.last_updated_display);

    // 다음 갱신이 성공하면 에러가 사라짐
    assert_eq!(
        controller.refresh().await,
        RefreshOutcome::Updated { record_count: 2 }
    );
    assert_eq!(controller.view().error_message, None);
}

#[tokio::test]
async fn overlapping_refresh_is_skipped() {
    let fetcher = Arc::new(GatedFetcher::default());
    let controller = controller(fetcher.clone(), memory_cache());

    let first = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.refresh().await })
    };

    fetcher.started.notified().await;
    assert!(controller.state().is_loading());
    assert_eq!(controller.refresh().await, RefreshOutcome::Skipped);

    fetcher.release.notify_one();
    assert_eq!(
        first.await.unwrap(),
        RefreshOutcome::Updated { record_count: 2 }
    );
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert!(!controller.state().is_loading());
}

#[tokio::test]
async fn sorting_by_trend_twice_is_idempotent() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let controller = controller(fetcher, memory_cache());
    controller.activate().await;

    controller.sort(SortColumn::Trend);
    let once = controller.view().records;
    controller.sort(SortColumn::Trend);
    let twice = controller.view().records;

    assert_eq!(once, twice);
    assert_eq!(once[0].trend, Trend::Down);
    assert_eq!(once[1].trend, Trend::Up);
    assert!(matches!(
        controller.state(),
        RefreshState::Ready {
            sort_column: Some(SortColumn::Trend),
            ..
        }
    ));
}

#[tokio::test]
async fn sort_does_not_touch_cache_or_fetcher() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = memory_cache();
    let controller = controller(fetcher.clone(), cache.clone());
    controller.activate().await;

    controller.sort(SortColumn::Open);
    controller.sort(SortColumn::PercentageChange);

    assert_eq!(fetcher.calls(), 1);
    // 캐시는 날짜 내림차순 원본 유지
    let cached = cache.read().await.unwrap();
    assert_eq!(cached.records[0].date, "03/15/2024");
    assert_eq!(controller.view().records[0].percentage_change, -1.0);
}

#[tokio::test]
async fn subscribers_observe_transitions() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let controller = controller(fetcher, memory_cache());
    let mut states = controller.subscribe();

    controller.activate().await;

    assert!(states.has_changed().unwrap());
    let state = states.borrow_and_update().clone();
    assert!(matches!(state, RefreshState::Ready { .. }));
    assert_eq!(state.records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn periodic_timer_refetches_until_shutdown() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let controller = controller(fetcher.clone(), memory_cache());

    let handle = controller.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 1);

    // 캐시가 신선해도 타이머는 항상 수집
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), 2);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), 3);
    assert!(!handle.is_finished());

    handle.shutdown().await;
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn extreme_price_fails_refresh_and_controller_recovers() {
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![RawPoint::new(THU, 0.01, 1e27)])]);
    let cache = memory_cache();
    let controller = controller(fetcher.clone(), cache.clone());

    match controller.activate().await {
        RefreshOutcome::Failed(message) => assert!(message.starts_with("Invalid price")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(cache.backend().is_empty().await);

    // 다음 갱신은 정상 처리
    assert_eq!(
        controller.refresh().await,
        RefreshOutcome::Updated { record_count: 2 }
    );
    assert_eq!(controller.view().error_message, None);
}

#[tokio::test(start_paused = true)]
async fn timer_survives_failed_refresh() {
    let fetcher = ScriptedFetcher::new(vec![Ok(vec![RawPoint::new(THU, -7e28, 7e28)])]);
    let controller = controller(fetcher.clone(), memory_cache());

    let handle = controller.start();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 1);
    assert!(controller.view().error_message.is_some());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), 2);
    assert!(!handle.is_finished());
    assert_eq!(controller.view().error_message, None);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn timer_starts_after_cache_hit() {
    let fetcher = ScriptedFetcher::new(vec![]);
    let cache = memory_cache();
    let records = market_core::derive_records(&scenario_points(), &Utc).unwrap();
    cache.write(&Snapshot::new(records, Utc::now())).await.unwrap();

    let controller = controller(fetcher.clone(), cache);
    let handle = controller.start();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(), 0);
    assert!(matches!(controller.state(), RefreshState::Ready { .. }));

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(fetcher.calls(), 1);

    drop(handle);
    tokio::time::sleep(Duration::from_secs(900)).await;
    assert_eq!(fetcher.calls(), 1);
}
