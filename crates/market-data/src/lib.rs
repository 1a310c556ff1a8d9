//! # Market Data
//!
//! 지수 일별 리포트의 데이터 계층입니다:
//! - Yahoo Finance 차트 수집기 (CORS 릴레이 경유)
//! - TTL 스냅샷 캐시 (메모리/파일 백엔드)
//! - 갱신 컨트롤러 (상태 머신, 주기적 갱신 태스크)
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use market_core::AppConfig;
//! use market_data::RefreshController;
//! use std::sync::Arc;
//!
//! let config = AppConfig::load("config/market-report.toml")?;
//! let controller = Arc::new(RefreshController::from_config(&config)?);
//! let handle = controller.start();
//!
//! let mut states = controller.subscribe();
//! while states.changed().await.is_ok() {
//!     render(controller.view());
//! }
//! handle.shutdown().await;
//! ```

pub mod cache;
pub mod controller;
pub mod provider;

pub use cache::{CacheStore, FileBackend, KeyValueBackend, MemoryBackend, SnapshotCache};
pub use controller::{
    MarketView, RefreshController, RefreshHandle, RefreshOptions, RefreshOutcome, RefreshState,
};
pub use provider::{parse_chart_response, ChartFetcher, YahooChartFetcher};
