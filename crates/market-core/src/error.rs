//! 리포트 파이프라인의 에러 타입.
//!
//! 수집 → 검증 → 변환 → 캐시 단계에서 발생하는 모든 에러를 하나의 열거형으로 정의합니다.
//! `CacheCorruption`을 제외한 모든 에러는 컨트롤러를 통해 사용자 메시지로 노출됩니다.

use thiserror::Error;

/// 응답 스키마 위반 종류.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// `chart.result[0].indicators.quote[0]` 구조가 없음
    #[error("Invalid data format received from Yahoo Finance{}", detail_suffix(.0))]
    InvalidFormat(Option<String>),

    /// timestamp / open / close 배열 중 하나가 없음
    #[error("Missing required data fields from Yahoo Finance")]
    MissingFields,
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

/// 리포트 파이프라인 에러.
#[derive(Debug, Error)]
pub enum MarketError {
    /// HTTP 비정상 상태 코드 또는 네트워크 실패 (릴레이 장애 포함)
    #[error("{0}")]
    Transport(String),

    /// 응답 구조가 기대와 다름
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    /// 필터링 후 남은 데이터 포인트가 없음
    #[error("No valid market data found")]
    EmptyData,

    /// 파생 계산 불가 가격 (시가 0, 비유한 값)
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// 저장된 캐시 페이로드 손상 (내부에서 복구, 사용자에게 노출하지 않음)
    #[error("Corrupt cache entry: {0}")]
    CacheCorruption(String),

    /// 캐시 백엔드 I/O 에러
    #[error("Cache error: {0}")]
    Cache(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 파이프라인 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, MarketError>;

impl MarketError {
    /// 사용자에게 표시되는 에러인지 확인합니다.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, MarketError::CacheCorruption(_))
    }

    /// 다음 갱신 주기에서 회복될 수 있는 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarketError::Transport(_) | MarketError::EmptyData | MarketError::Schema(_)
        )
    }
}

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        MarketError::CacheCorruption(err.to_string())
    }
}

impl From<std::io::Error> for MarketError {
    fn from(err: std::io::Error) -> Self {
        MarketError::Cache(err.to_string())
    }
}

impl From<config::ConfigError> for MarketError {
    fn from(err: config::ConfigError) -> Self {
        MarketError::Config(err.to_string())
    }
}
