//! 갱신 컨트롤러.
//!
//! 캐시 조회 → 수집 → 파생 → 캐시 저장 파이프라인을 한 번에 하나씩 실행하고,
//! 결과 상태를 `watch` 채널로 공개합니다.
//!
//! # 상태 전이
//!
//! ```text
//! Idle ──activate──▶ Ready            (신선한 캐시)
//!   │
//!   └──────────────▶ Loading ──성공──▶ Ready
//!                        └────실패──▶ Failed (마지막 정상 데이터 유지)
//! ```
//!
//! 모든 전이는 상태 값 전체를 교체합니다.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use market_core::{
    derive_records, sorted_records, AppConfig, DailyRecord, Result, Snapshot, SortColumn,
};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{CacheStore, FileBackend, SnapshotCache};
use crate::provider::{ChartFetcher, YahooChartFetcher};

/// 타이머 주기 하한.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// 타이머 주기 상한.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// 컨트롤러 동작 옵션.
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    /// 주기적 갱신 간격
    pub interval: Duration,
    /// 거래일 계산 및 갱신 시각 표시 시간대
    pub timezone: Tz,
    /// 갱신 시각 표시 형식 (strftime)
    pub time_format: String,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            timezone: chrono_tz::America::New_York,
            time_format: "%H:%M:%S".to_string(),
        }
    }
}

impl RefreshOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            interval: config.refresh.interval(),
            timezone: config.display.tz()?,
            time_format: config.display.time_format.clone(),
        })
    }

    /// 수집 시각을 표시 시간대의 문자열로 변환.
    ///
    /// 형식 문자열이 잘못되었으면 `None`.
    pub fn format_time(&self, at: DateTime<Utc>) -> Option<String> {
        let mut out = String::new();
        write!(
            out,
            "{}",
            at.with_timezone(&self.timezone).format(&self.time_format)
        )
        .ok()?;
        Some(out)
    }
}

/// 컨트롤러 상태.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RefreshState {
    /// 활성화 전
    #[default]
    Idle,
    /// 수집 중 (이전 데이터는 계속 표시)
    Loading { previous: Option<Snapshot> },
    /// 데이터 표시 중
    Ready {
        snapshot: Snapshot,
        sort_column: Option<SortColumn>,
    },
    /// 마지막 갱신 실패
    Failed {
        message: String,
        last_good: Option<Snapshot>,
    },
}

impl RefreshState {
    /// 현재 보유한 스냅샷.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            RefreshState::Idle => None,
            RefreshState::Loading { previous } => previous.as_ref(),
            RefreshState::Ready { snapshot, .. } => Some(snapshot),
            RefreshState::Failed { last_good, .. } => last_good.as_ref(),
        }
    }

    /// 표시할 레코드.
    pub fn records(&self) -> &[DailyRecord] {
        self.snapshot().map_or(&[], |s| s.records.as_slice())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, RefreshState::Loading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RefreshState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// 보유 레코드를 `column` 기준으로 안정 정렬한 새 상태.
    ///
    /// 상태 종류는 바뀌지 않습니다.
    pub fn sorted_by(&self, column: SortColumn) -> RefreshState {
        let resort = |snapshot: &Snapshot| Snapshot {
            records: sorted_records(&snapshot.records, column),
            fetched_at_epoch_millis: snapshot.fetched_at_epoch_millis,
        };

        match self {
            RefreshState::Idle => RefreshState::Idle,
            RefreshState::Loading { previous } => RefreshState::Loading {
                previous: previous.as_ref().map(resort),
            },
            RefreshState::Ready { snapshot, .. } => RefreshState::Ready {
                snapshot: resort(snapshot),
                sort_column: Some(column),
            },
            RefreshState::Failed { message, last_good } => RefreshState::Failed {
                message: message.clone(),
                last_good: last_good.as_ref().map(resort),
            },
        }
    }
}

/// 표 렌더러에 넘기는 화면 모델.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketView {
    pub records: Vec<DailyRecord>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    /// 보유 스냅샷의 수집 시각 (표시 시간대)
    pub last_updated_display: Option<String>,
}

impl MarketView {
    pub fn from_state(state: &RefreshState, options: &RefreshOptions) -> Self {
        Self {
            records: state.records().to_vec(),
            is_loading: state.is_loading(),
            error_message: state.error_message().map(str::to_string),
            last_updated_display: state
                .snapshot()
                .and_then(Snapshot::fetched_at)
                .and_then(|at| options.format_time(at)),
        }
    }
}

/// `activate`/`refresh` 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// 신선한 캐시 사용
    FromCache { record_count: usize },
    /// 새로 수집
    Updated { record_count: usize },
    /// 다른 갱신이 진행 중이라 생략
    Skipped,
    /// 갱신 실패 (사용자 표시 메시지)
    Failed(String),
}

/// 갱신 컨트롤러.
pub struct RefreshController {
    fetcher: Arc<dyn ChartFetcher>,
    cache: Arc<dyn CacheStore>,
    options: RefreshOptions,
    state: watch::Sender<RefreshState>,
    /// 동시에 하나의 수집만 허용
    fetch_gate: Mutex<()>,
}

impl RefreshController {
    pub fn new(
        fetcher: Arc<dyn ChartFetcher>,
        cache: Arc<dyn CacheStore>,
        options: RefreshOptions,
    ) -> Self {
        let (state, _) = watch::channel(RefreshState::Idle);
        Self {
            fetcher,
            cache,
            options,
            state,
            fetch_gate: Mutex::new(()),
        }
    }

    /// 설정으로 Yahoo 수집기와 파일 캐시를 구성합니다.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let fetcher = YahooChartFetcher::new(config.source.clone())?;
        let cache = SnapshotCache::new(
            FileBackend::new(config.cache.dir.clone()),
            config.cache.key.clone(),
            config.cache.ttl()?,
        );

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(cache),
            RefreshOptions::from_config(config)?,
        ))
    }

    /// 현재 상태 복사본.
    pub fn state(&self) -> RefreshState {
        self.state.borrow().clone()
    }

    /// 현재 화면 모델.
    pub fn view(&self) -> MarketView {
        MarketView::from_state(&self.state.borrow(), &self.options)
    }

    /// 상태 변경 구독.
    pub fn subscribe(&self) -> watch::Receiver<RefreshState> {
        self.state.subscribe()
    }

    /// 활성화: 신선한 캐시가 있으면 사용하고, 없으면 수집합니다.
    #[instrument(skip(self))]
    pub async fn activate(&self) -> RefreshOutcome {
        if let Some(snapshot) = self.cache.read().await {
            let record_count = snapshot.len();
            info!(count = record_count, "캐시 데이터 사용");
            self.state.send_replace(RefreshState::Ready {
                snapshot,
                sort_column: None,
            });
            return RefreshOutcome::FromCache { record_count };
        }

        self.refresh().await
    }

    /// 수집 → 파생 → 캐시 저장.
    ///
    /// 이미 수집 중이면 아무것도 하지 않고 `Skipped`를 반환합니다.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> RefreshOutcome {
        let Ok(_guard) = self.fetch_gate.try_lock() else {
            debug!("갱신 진행 중, 요청 생략");
            return RefreshOutcome::Skipped;
        };

        self.state.send_modify(|state| {
            let previous = state.snapshot().cloned();
            *state = RefreshState::Loading { previous };
        });

        match self.fetch_snapshot().await {
            Ok(snapshot) => {
                if let Err(e) = self.cache.write(&snapshot).await {
                    warn!(error = %e, "스냅샷 캐시 저장 실패");
                }

                let record_count = snapshot.len();
                info!(count = record_count, "시장 데이터 갱신 완료");
                self.state.send_replace(RefreshState::Ready {
                    snapshot,
                    sort_column: None,
                });
                RefreshOutcome::Updated { record_count }
            }
            Err(e) => {
                error!(error = %e, retryable = e.is_retryable(), "시장 데이터 갱신 실패");
                let message = e.to_string();
                self.state.send_modify(|state| {
                    let last_good = state.snapshot().cloned();
                    *state = RefreshState::Failed {
                        message: message.clone(),
                        last_good,
                    };
                });
                RefreshOutcome::Failed(message)
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let points = self.fetcher.fetch_raw_series().await?;
        let records = derive_records(&points, &self.options.timezone)?;
        Ok(Snapshot::new(records, Utc::now()))
    }

    /// 보유 레코드 정렬. 캐시나 수집 상태에는 영향이 없습니다.
    pub fn sort(&self, column: SortColumn) {
        self.state.send_modify(|state| {
            *state = state.sorted_by(column);
        });
        debug!(column = %column, "레코드 정렬");
    }

    /// 활성화 후 주기적 갱신 태스크를 시작합니다.
    ///
    /// 타이머는 캐시 적중 여부와 관계없이 활성화 시점부터 `interval`마다 수집합니다.
    pub fn start(self: &Arc<Self>) -> RefreshHandle {
        let shutdown = CancellationToken::new();
        let controller = Arc::clone(self);
        let token = shutdown.clone();

        let task = tokio::spawn(async move {
            controller.run(token).await;
        });

        RefreshHandle {
            shutdown,
            task: Some(task),
        }
    }

    async fn run(&self, shutdown: CancellationToken) {
        let outcome = self.activate().await;
        debug!(?outcome, "활성화 완료");

        let period = self.options.interval.clamp(MIN_INTERVAL, MAX_INTERVAL);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = period.as_secs(), "주기적 갱신 시작");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("주기적 갱신 종료");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.refresh().await;
                    debug!(?outcome, "주기적 갱신");
                }
            }
        }
    }
}

/// 주기적 갱신 태스크 핸들.
///
/// drop 되면 태스크도 취소됩니다.
pub struct RefreshHandle {
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// 태스크를 취소하고 종료를 기다립니다.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "갱신 태스크 종료 실패");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
