//! 키-값 저장 백엔드.
//!
//! 스냅샷 캐시는 직렬화된 문자열 하나를 고정 키에 저장합니다.
//! 백엔드는 저장 위치만 담당하고 신선도/손상 판단은 `SnapshotCache`가 합니다.
//!
//! - `MemoryBackend`: 프로세스 메모리 (테스트, 임시 세션)
//! - `FileBackend`: `{dir}/{key}.json` 파일 (임시 파일 작성 후 rename)

use async_trait::async_trait;
use market_core::Result;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// 문자열 페이로드 키-값 저장소.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// 키의 페이로드 조회. 없으면 `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 키에 페이로드 저장 (덮어쓰기).
    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// 키 삭제. 없는 키 삭제는 성공으로 취급합니다.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// 메모리 백엔드.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장된 키 수.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// 파일 백엔드.
///
/// 키마다 `{dir}/{key}.json` 파일 하나를 사용합니다.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 키의 파일 경로.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl KeyValueBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read(self.path_for(key)).await {
            // UTF-8이 아닌 내용은 손상 페이로드로 넘겨 상위에서 정리
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(path = %path.display(), bytes = value.len(), "캐시 파일 저장");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
