//! 일별 레코드 컬럼 정렬.
//!
//! 문자열 컬럼은 사전순, 숫자 컬럼은 값 오름차순으로 비교합니다.
//! 내림차순 토글은 없습니다. 같은 컬럼으로 두 번 정렬해도 결과는 같습니다.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::market_data::DailyRecord;

/// 정렬 가능한 컬럼.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortColumn {
    Date,
    DayOfWeek,
    Open,
    Close,
    PercentageChange,
    ValueChange,
    Trend,
}

impl SortColumn {
    /// 모든 컬럼 (표시 순서).
    pub const ALL: [SortColumn; 7] = [
        SortColumn::Date,
        SortColumn::DayOfWeek,
        SortColumn::Open,
        SortColumn::Close,
        SortColumn::PercentageChange,
        SortColumn::ValueChange,
        SortColumn::Trend,
    ];

    /// 레코드 직렬화 형식의 필드 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Date => "date",
            SortColumn::DayOfWeek => "dayOfWeek",
            SortColumn::Open => "open",
            SortColumn::Close => "close",
            SortColumn::PercentageChange => "percentageChange",
            SortColumn::ValueChange => "valueChange",
            SortColumn::Trend => "trend",
        }
    }

    /// 두 레코드를 이 컬럼 기준으로 비교합니다.
    pub fn compare(&self, a: &DailyRecord, b: &DailyRecord) -> Ordering {
        match self {
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::DayOfWeek => a.day_of_week.cmp(&b.day_of_week),
            SortColumn::Trend => a.trend.as_str().cmp(b.trend.as_str()),
            SortColumn::Open => a.open.total_cmp(&b.open),
            SortColumn::Close => a.close.total_cmp(&b.close),
            SortColumn::PercentageChange => a.percentage_change.total_cmp(&b.percentage_change),
            SortColumn::ValueChange => a.value_change.total_cmp(&b.value_change),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "date" => Ok(Self::Date),
            "dayofweek" => Ok(Self::DayOfWeek),
            "open" => Ok(Self::Open),
            "close" => Ok(Self::Close),
            "percentagechange" => Ok(Self::PercentageChange),
            "valuechange" => Ok(Self::ValueChange),
            "trend" => Ok(Self::Trend),
            _ => Err(format!("Unknown sort column: {}", s)),
        }
    }
}

/// 레코드를 제자리에서 안정 정렬합니다 (오름차순).
pub fn sort_records(records: &mut [DailyRecord], column: SortColumn) {
    records.sort_by(|a, b| column.compare(a, b));
}

/// 정렬된 사본을 반환합니다.
pub fn sorted_records(records: &[DailyRecord], column: SortColumn) -> Vec<DailyRecord> {
    let mut sorted = records.to_vec();
    sort_records(&mut sorted, column);
    sorted
}
