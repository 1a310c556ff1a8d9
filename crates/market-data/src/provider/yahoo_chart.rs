//! Yahoo Finance 차트 API 수집기.
//!
//! 최근 30일 일봉을 CORS 릴레이를 거쳐 요청하고, 응답 구조를 검증한 뒤
//! (timestamp, open, close) 삼중항만 추출합니다.
//!
//! # 검증 순서
//!
//! 1. HTTP 상태 → `Transport`
//! 2. `chart.result[0].indicators.quote[0]` 존재 → `Schema(InvalidFormat)`
//! 3. `timestamp`, `open`, `close` 배열 존재 → `Schema(MissingFields)`
//! 4. 인덱스 단위 필터링 (open/close 가 null 이거나 숫자가 아니면 해당 일 제거)
//! 5. 남은 포인트가 없으면 → `EmptyData`
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use market_data::provider::{ChartFetcher, YahooChartFetcher};
//!
//! let fetcher = YahooChartFetcher::new(SourceConfig::default())?;
//! let points = fetcher.fetch_raw_series().await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_core::{MarketError, RawPoint, Result, SchemaViolation, SourceConfig};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, instrument};

use super::ChartFetcher;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// 조회 기간 (일).
pub const WINDOW_DAYS: i64 = 30;

/// Yahoo Finance 차트 API 수집기.
#[derive(Clone)]
pub struct YahooChartFetcher {
    client: reqwest::Client,
    source: SourceConfig,
}

impl YahooChartFetcher {
    /// 새로운 수집기 생성.
    pub fn new(source: SourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(source.request_timeout())
            .user_agent(source.user_agent.clone())
            .build()
            .map_err(|e| MarketError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { client, source })
    }

    /// `now`로 끝나는 조회 구간의 차트 URL.
    pub fn chart_url(&self, now: DateTime<Utc>) -> Result<Url> {
        let period2 = now.timestamp();
        let period1 = period2 - WINDOW_DAYS * SECONDS_PER_DAY;

        let base = format!(
            "{}/{}",
            self.source.chart_base_url.trim_end_matches('/'),
            self.source.symbol
        );

        Url::parse_with_params(
            &base,
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", self.source.interval.clone()),
            ],
        )
        .map_err(|e| MarketError::Config(format!("invalid chart URL '{}': {}", base, e)))
    }

    /// 실제 요청 URL. 릴레이가 설정되어 있으면 차트 URL을 쿼리 인자로 감쌉니다.
    pub fn request_url(&self, now: DateTime<Utc>) -> Result<Url> {
        let target = self.chart_url(now)?;

        match self.source.relay_url.as_deref().filter(|url| !url.is_empty()) {
            Some(relay) => Url::parse_with_params(
                relay,
                &[(self.source.relay_param.as_str(), target.as_str())],
            )
            .map_err(|e| MarketError::Config(format!("invalid relay URL '{}': {}", relay, e))),
            None => Ok(target),
        }
    }

    /// `now` 기준 구간의 원시 포인트 수집.
    #[instrument(skip(self), fields(symbol = %self.source.symbol))]
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> Result<Vec<RawPoint>> {
        let url = self.request_url(now)?;
        debug!(url = %url, "차트 데이터 요청");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MarketError::Transport(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketError::Transport(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| MarketError::Transport(format!("Failed to read response body: {}", e)))?;

        let points = parse_chart_response(&body)?;
        info!(count = points.len(), "차트 데이터 수집 완료");

        Ok(points)
    }
}

#[async_trait]
impl ChartFetcher for YahooChartFetcher {
    async fn fetch_raw_series(&self) -> Result<Vec<RawPoint>> {
        self.fetch_at(Utc::now()).await
    }
}

/// null 이 아닌 JSON 노드만 반환.
fn present<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    value.pointer(pointer).filter(|v| !v.is_null())
}

/// 유한한 숫자 가격만 허용.
fn price_at(series: &[Value], index: usize) -> Option<f64> {
    series
        .get(index)
        .and_then(Value::as_f64)
        .filter(|price| price.is_finite())
}

/// 차트 API 응답 본문을 검증하고 원시 포인트로 변환합니다.
///
/// timestamp[i], open[i], close[i]는 하나의 삼중항으로 취급합니다.
/// 어느 한 가격이라도 없으면 그 날짜 전체를 버립니다.
pub fn parse_chart_response(body: &str) -> Result<Vec<RawPoint>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SchemaViolation::InvalidFormat(Some(format!("malformed JSON: {}", e))))?;

    let (result, quote) = match (
        present(&value, "/chart/result/0"),
        present(&value, "/chart/result/0/indicators/quote/0"),
    ) {
        (Some(result), Some(quote)) => (result, quote),
        _ => {
            let detail = present(&value, "/chart/error/description")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(SchemaViolation::InvalidFormat(detail).into());
        }
    };

    let (timestamps, opens, closes) = match (
        result.get("timestamp").and_then(Value::as_array),
        quote.get("open").and_then(Value::as_array),
        quote.get("close").and_then(Value::as_array),
    ) {
        (Some(t), Some(o), Some(c)) => (t, o, c),
        _ => return Err(SchemaViolation::MissingFields.into()),
    };

    let points: Vec<RawPoint> = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            Some(RawPoint::new(
                ts.as_i64()?,
                price_at(opens, i)?,
                price_at(closes, i)?,
            ))
        })
        .collect();

    let dropped = timestamps.len() - points.len();
    if dropped > 0 {
        debug!(dropped, total = timestamps.len(), "불완전한 데이터 포인트 제외");
    }

    if points.is_empty() {
        return Err(MarketError::EmptyData);
    }

    Ok(points)
}
