//! 일별 변동 지표 계산 로직.
//!
//! 모든 가격과 변동값은 `rust_decimal`로 소수점 2자리 반올림합니다
//! (MidpointAwayFromZero). 변동률은 반올림된 변동폭과 반올림된 시가로 계산합니다:
//!
//! ```text
//! value_change      = round2(round2(close) - round2(open))
//! percentage_change = round2(value_change / round2(open) * 100)
//! ```

use chrono::{DateTime, NaiveDate, TimeZone};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use super::market_data::{DailyRecord, RawPoint, Trend};
use crate::error::{MarketError, Result, SchemaViolation};

/// 하루치 변동 지표.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyChange {
    /// 변동폭 (종가 - 시가)
    pub value_change: f64,
    /// 변동률 (%)
    pub percentage_change: f64,
    /// 추세
    pub trend: Trend,
}

/// f64를 Decimal로 변환.
///
/// 최단 왕복 문자열 표현을 거치므로 `101.005`는 정확히 `101.005`가 됩니다.
fn to_decimal(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(MarketError::InvalidPrice(format!("{} is not finite", value)));
    }

    Decimal::from_str(&value.to_string())
        .map_err(|e| MarketError::InvalidPrice(format!("{}: {}", value, e)))
}

fn to_f64(value: Decimal) -> Result<f64> {
    value
        .to_f64()
        .ok_or_else(|| MarketError::InvalidPrice(format!("{} is out of range", value)))
}

/// 소수점 2자리 반올림 (0.5는 0에서 먼 쪽으로).
fn round_dp2(value: Decimal) -> Decimal {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    // -0.00 정규화
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// f64 값을 소수점 2자리로 반올림합니다.
pub fn round2(value: f64) -> Result<f64> {
    to_f64(round_dp2(to_decimal(value)?))
}

fn classify(value_change: Decimal) -> Trend {
    if value_change > Decimal::ZERO {
        Trend::Up
    } else if value_change < Decimal::ZERO {
        Trend::Down
    } else {
        Trend::Neutral
    }
}

/// Decimal 단위 변동 계산. 반환값은 (시가, 종가, 변동폭, 변동률).
fn compute(open: f64, close: f64) -> Result<(Decimal, Decimal, Decimal, Decimal)> {
    let open = round_dp2(to_decimal(open)?);
    let close = round_dp2(to_decimal(close)?);

    if open.is_zero() {
        return Err(MarketError::InvalidPrice(
            "open price is zero, percentage change is undefined".to_string(),
        ));
    }

    let overflow =
        || MarketError::InvalidPrice(format!("open {} / close {} out of range", open, close));

    let value_change = round_dp2(close.checked_sub(open).ok_or_else(overflow)?);
    let percentage_change = round_dp2(
        value_change
            .checked_div(open)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?,
    );

    Ok((open, close, value_change, percentage_change))
}

/// 시가/종가로 변동폭, 변동률, 추세를 계산합니다.
///
/// # Errors
///
/// 반올림 후 시가가 0이거나 가격이 유한하지 않으면 `MarketError::InvalidPrice`.
///
/// # Examples
///
/// ```
/// use market_core::{derive_changes, Trend};
///
/// let change = derive_changes(50.0, 49.5).unwrap();
/// assert_eq!(change.value_change, -0.5);
/// assert_eq!(change.percentage_change, -1.0);
/// assert_eq!(change.trend, Trend::Down);
/// ```
pub fn derive_changes(open: f64, close: f64) -> Result<DailyChange> {
    let (_, _, value_change, percentage_change) = compute(open, close)?;

    Ok(DailyChange {
        value_change: to_f64(value_change)?,
        percentage_change: to_f64(percentage_change)?,
        trend: classify(value_change),
    })
}

/// 원시 포인트 하나를 `tz` 기준 거래일과 일별 레코드로 변환합니다.
fn derive_record<Tz: TimeZone>(point: &RawPoint, tz: &Tz) -> Result<(NaiveDate, DailyRecord)> {
    let utc = DateTime::from_timestamp(point.timestamp_seconds, 0).ok_or_else(|| {
        SchemaViolation::InvalidFormat(Some(format!(
            "invalid timestamp: {}",
            point.timestamp_seconds
        )))
    })?;
    let date = utc.with_timezone(tz).date_naive();

    let (open, close, value_change, percentage_change) = compute(point.open, point.close)?;

    let record = DailyRecord {
        date: date.format("%m/%d/%Y").to_string(),
        day_of_week: date.format("%A").to_string(),
        open: to_f64(open)?,
        close: to_f64(close)?,
        percentage_change: to_f64(percentage_change)?,
        value_change: to_f64(value_change)?,
        trend: classify(value_change),
    };

    Ok((date, record))
}

/// 원시 시계열을 날짜 내림차순(최신 우선) 일별 레코드로 변환합니다.
///
/// 입력 순서와 무관하게 출력은 항상 날짜 내림차순입니다.
/// 같은 날짜끼리의 순서는 입력 순서를 따릅니다.
pub fn derive_records<Tz: TimeZone>(points: &[RawPoint], tz: &Tz) -> Result<Vec<DailyRecord>> {
    let mut dated = points
        .iter()
        .map(|point| derive_record(point, tz))
        .collect::<Result<Vec<_>>>()?;

    dated.sort_by(|a, b| b.0.cmp(&a.0));

    Ok(dated.into_iter().map(|(_, record)| record).collect())
}
