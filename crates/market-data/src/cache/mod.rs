//! 스냅샷 캐시 모듈.
//!
//! 마지막으로 수집한 레코드 전체를 TTL과 함께 보관합니다.
//! 스냅샷 판단 로직(`SnapshotCache`)과 저장 위치(`KeyValueBackend`)를 분리합니다.

pub mod backend;
pub mod snapshot_cache;

use async_trait::async_trait;
use market_core::{Result, Snapshot};

pub use backend::{FileBackend, KeyValueBackend, MemoryBackend};
pub use snapshot_cache::SnapshotCache;

/// 스냅샷 저장소 트레잇.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 신선한 스냅샷 조회. 없거나 만료되었거나 손상되었으면 `None`.
    async fn read(&self) -> Option<Snapshot>;

    /// 스냅샷 저장 (이전 값 교체).
    async fn write(&self, snapshot: &Snapshot) -> Result<()>;

    /// 저장된 스냅샷 삭제.
    async fn clear(&self) -> Result<()>;
}
