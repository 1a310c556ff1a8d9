//! 스냅샷 캐시.
//!
//! 고정 키 하나에 마지막 스냅샷을 JSON으로 저장합니다.
//!
//! # 읽기 정책
//!
//! | 저장 상태              | `read()` 결과 | 부수 효과        |
//! |------------------------|---------------|------------------|
//! | 없음                   | `None`        | -                |
//! | 파싱 불가 / 구조 불일치 | `None`        | 항목 삭제        |
//! | TTL 경과               | `None`        | - (항목 유지)    |
//! | 신선함                 | `Some`        | -                |

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use market_core::{MarketError, Result, Snapshot};
use tracing::{debug, instrument, warn};

use super::backend::KeyValueBackend;
use super::CacheStore;

/// 키-값 백엔드 위의 스냅샷 캐시.
pub struct SnapshotCache<B> {
    backend: B,
    key: String,
    ttl: Duration,
}

impl<B: KeyValueBackend> SnapshotCache<B> {
    /// 새로운 스냅샷 캐시 생성.
    pub fn new(backend: B, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            backend,
            key: key.into(),
            ttl,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 저장된 페이로드를 스냅샷으로 해석.
    fn decode(payload: &str) -> Result<Snapshot> {
        let snapshot: Snapshot = serde_json::from_str(payload)?;
        if snapshot.fetched_at().is_none() {
            return Err(MarketError::CacheCorruption(format!(
                "timestamp out of range: {}",
                snapshot.fetched_at_epoch_millis
            )));
        }
        Ok(snapshot)
    }

    /// `now` 기준으로 신선한 스냅샷을 조회합니다.
    ///
    /// 손상된 항목은 삭제하고 `None`을 반환합니다. 백엔드 에러도 `None`으로 처리합니다.
    #[instrument(skip(self), fields(key = %self.key))]
    pub async fn read_at(&self, now: DateTime<Utc>) -> Option<Snapshot> {
        let payload = match self.backend.get(&self.key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!("캐시 미스");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "캐시 조회 실패");
                return None;
            }
        };

        let snapshot = match Self::decode(&payload) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "손상된 캐시 항목 삭제");
                if let Err(e) = self.backend.remove(&self.key).await {
                    warn!(error = %e, "손상된 캐시 항목 삭제 실패");
                }
                return None;
            }
        };

        if !snapshot.is_fresh_at(now, self.ttl) {
            debug!(
                age_secs = snapshot.age_at(now).num_seconds(),
                "캐시 만료"
            );
            return None;
        }

        debug!(count = snapshot.len(), "캐시 적중");
        Some(snapshot)
    }
}

#[async_trait]
impl<B: KeyValueBackend> CacheStore for SnapshotCache<B> {
    async fn read(&self) -> Option<Snapshot> {
        self.read_at(Utc::now()).await
    }

    async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let payload = serde_json::to_string(snapshot)
            .map_err(|e| MarketError::Cache(format!("snapshot serialization failed: {}", e)))?;
        self.backend.set(&self.key, payload).await?;

        debug!(key = %self.key, count = snapshot.len(), "스냅샷 캐시 저장");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.backend.remove(&self.key).await
    }
}
