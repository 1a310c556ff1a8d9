//! 일별 지수 리포트 도메인 모델.

mod calculations;
mod market_data;
mod sorting;

pub use calculations::*;
pub use market_data::*;
pub use sorting::*;
