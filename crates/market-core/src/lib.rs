//! # Market Core
//!
//! 지수 일별 리포트의 핵심 도메인 모델과 공통 인프라를 제공합니다:
//! - 원시 포인트, 일별 레코드, 스냅샷 타입
//! - 일별 변동 지표 계산 (변동폭, 변동률, 추세)
//! - 컬럼 정렬
//! - 에러 타입
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
