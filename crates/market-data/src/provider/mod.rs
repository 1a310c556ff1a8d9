//! 데이터 Provider 모듈.
//!
//! 원격 소스에서 원시 시계열을 가져오는 수집기를 정의합니다.
//!
//! ## Yahoo Finance 차트 API
//! - `YahooChartFetcher`: CORS 릴레이를 거친 v8 chart API 수집기
//! - 최근 30일 일봉, (timestamp, open, close) 삼중항만 추출

pub mod yahoo_chart;

use async_trait::async_trait;
use market_core::{RawPoint, Result};

pub use yahoo_chart::{parse_chart_response, YahooChartFetcher};

/// 원시 시계열 수집기 트레잇.
///
/// 릴레이나 엔드포인트를 교체하거나 테스트에서 대체할 수 있도록
/// 컨트롤러는 이 트레잇에만 의존합니다.
#[async_trait]
pub trait ChartFetcher: Send + Sync {
    /// 최근 구간의 원시 포인트를 가져옵니다.
    ///
    /// 비어 있지 않은 결과만 `Ok`로 반환합니다.
    async fn fetch_raw_series(&self) -> Result<Vec<RawPoint>>;
}
