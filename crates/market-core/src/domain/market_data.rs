//! 일별 시세 도메인 모델.
//!
//! - `RawPoint`: 원격 응답에서 추출한 (timestamp, open, close) 삼중항
//! - `DailyRecord`: 요일, 변동폭, 변동률, 추세가 계산된 일별 레코드
//! - `Snapshot`: 캐시 단위 (레코드 전체 + 수집 시각)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 원격 응답에서 추출한 원시 데이터 포인트.
///
/// 한 번의 수집 주기 동안만 존재합니다.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    /// Unix epoch 초
    pub timestamp_seconds: i64,
    /// 시가
    pub open: f64,
    /// 종가
    pub close: f64,
}

impl RawPoint {
    pub fn new(timestamp_seconds: i64, open: f64, close: f64) -> Self {
        Self {
            timestamp_seconds,
            open,
            close,
        }
    }
}

/// 일별 가격 움직임 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// 상승 (변동폭 > 0)
    Up,
    /// 하락 (변동폭 < 0)
    Down,
    /// 보합 (반올림 후 변동폭 == 0)
    Neutral,
}

impl Trend {
    /// 직렬화 형식과 동일한 소문자 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 파생 지표가 계산된 일별 레코드.
///
/// 한 번 계산되면 변경되지 않습니다. 갱신은 컬렉션 전체를 교체합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    /// 거래일 (MM/DD/YYYY)
    pub date: String,
    /// 요일 전체 이름 (예: "Monday")
    pub day_of_week: String,
    /// 시가 (소수점 2자리)
    pub open: f64,
    /// 종가 (소수점 2자리)
    pub close: f64,
    /// 변동률 % (소수점 2자리)
    pub percentage_change: f64,
    /// 변동폭 (소수점 2자리)
    pub value_change: f64,
    /// 추세
    pub trend: Trend,
}

/// 캐시 단위가 되는 레코드 스냅샷.
///
/// 저장 형식은 `{ "data": DailyRecord[], "timestamp": epoch-millis }` 입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// 날짜 내림차순 레코드
    #[serde(rename = "data")]
    pub records: Vec<DailyRecord>,
    /// 수집 시각 (epoch 밀리초)
    #[serde(rename = "timestamp")]
    pub fetched_at_epoch_millis: i64,
}

impl Snapshot {
    /// 주어진 수집 시각으로 스냅샷 생성.
    pub fn new(records: Vec<DailyRecord>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records,
            fetched_at_epoch_millis: fetched_at.timestamp_millis(),
        }
    }

    /// 수집 시각.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at_epoch_millis)
    }

    /// `now` 기준 경과 시간.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        Duration::milliseconds(now.timestamp_millis() - self.fetched_at_epoch_millis)
    }

    /// `now - fetched_at < ttl` 이면 신선한 스냅샷입니다.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
