//! 설정 관리.
//!
//! 기본값 위에 TOML 파일을 덮어써서 `AppConfig`를 구성합니다.
//! 환경 변수는 읽지 않습니다.

use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{MarketError, Result};

/// 캐시 유효 기간 상한 (1일).
pub const MAX_CACHE_TTL_SECS: u64 = 24 * 60 * 60;

/// 갱신 주기 상한 (1일).
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 원격 데이터 소스 설정
    pub source: SourceConfig,
    /// 스냅샷 캐시 설정
    pub cache: CacheConfig,
    /// 주기적 갱신 설정
    pub refresh: RefreshConfig,
    /// 표시 설정
    pub display: DisplayConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 원격 차트 데이터 소스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceConfig {
    /// 대상 지수 심볼
    pub symbol: String,
    /// 차트 API 기본 URL (심볼이 경로 끝에 붙음)
    pub chart_base_url: String,
    /// CORS 릴레이 URL (없거나 비어 있으면 직접 요청)
    pub relay_url: Option<String>,
    /// 릴레이가 대상 URL을 받는 쿼리 파라미터 이름
    pub relay_param: String,
    /// 캔들 간격
    pub interval: String,
    /// 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            symbol: "^GSPC".to_string(),
            chart_base_url: "https://query1.finance.yahoo.com/v8/finance/chart".to_string(),
            relay_url: Some("https://api.allorigins.win/raw".to_string()),
            relay_param: "url".to_string(),
            interval: "1d".to_string(),
            request_timeout_secs: 30,
            user_agent: "Mozilla/5.0 (compatible; market-report/0.1)".to_string(),
        }
    }
}

impl SourceConfig {
    /// 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// 스냅샷 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 캐시 슬롯 키
    pub key: String,
    /// 파일 백엔드 디렉토리
    pub dir: PathBuf,
    /// 스냅샷 유효 기간 (초)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            key: "sp500_market_data".to_string(),
            dir: PathBuf::from("./cache"),
            ttl_secs: 300,
        }
    }
}

impl CacheConfig {
    /// 유효 기간을 chrono Duration으로 반환
    pub fn ttl(&self) -> Result<chrono::Duration> {
        i64::try_from(self.ttl_secs)
            .ok()
            .and_then(chrono::TimeDelta::try_seconds)
            .ok_or_else(|| {
                MarketError::Config(format!("cache.ttl_secs out of range: {}", self.ttl_secs))
            })
    }
}

/// 주기적 갱신 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// 갱신 주기 (초)
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self { interval_secs: 300 }
    }
}

impl RefreshConfig {
    /// 갱신 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// 표시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 거래일/갱신 시각 계산에 쓰는 시간대 (IANA 이름)
    pub timezone: String,
    /// 마지막 갱신 시각 표시 형식 (strftime)
    pub time_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".to_string(),
            time_format: "%H:%M:%S".to_string(),
        }
    }
}

impl DisplayConfig {
    /// 시간대 파싱.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| MarketError::Config(format!("invalid timezone '{}': {}", self.timezone, e)))
    }

    /// strftime 형식 검증.
    pub fn check_time_format(&self) -> Result<()> {
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(MarketError::Config(format!(
                "invalid display.time_format '{}'",
                self.time_format
            )));
        }
        Ok(())
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨 필터
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일에서 설정을 로드합니다. 파일에 없는 항목은 기본값을 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// 설정 값 검증.
    pub fn validate(&self) -> Result<()> {
        self.display.tz()?;
        self.display.check_time_format()?;

        if !(1..=MAX_REFRESH_INTERVAL_SECS).contains(&self.refresh.interval_secs) {
            return Err(MarketError::Config(format!(
                "refresh.interval_secs must be in 1..={}: {}",
                MAX_REFRESH_INTERVAL_SECS, self.refresh.interval_secs
            )));
        }
        if self.cache.ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(MarketError::Config(format!(
                "cache.ttl_secs must be at most {}: {}",
                MAX_CACHE_TTL_SECS, self.cache.ttl_secs
            )));
        }
        if self.cache.key.is_empty() {
            return Err(MarketError::Config("cache.key must not be empty".to_string()));
        }

        Ok(())
    }
}
