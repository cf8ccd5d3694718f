//! In-memory artifact store. Artifacts live for the session only.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const ARTIFACT_URL_PREFIX: &str = "artifact://reports/";

/// A finished report file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub bytes: Arc<[u8]>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

impl Artifact {
    pub fn new(bytes: Vec<u8>, content_type: &'static str, extension: &'static str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
            extension,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a caller needs to deliver a completed report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDownload {
    pub filename: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Default)]
pub struct ArtifactStore {
    artifacts: RwLock<HashMap<String, Artifact>>,
}

impl ArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact` and return its download URL.
    pub async fn put(&self, artifact: Artifact) -> String {
        let url = format!("{}{}", ARTIFACT_URL_PREFIX, uuid::Uuid::new_v4());
        self.artifacts.write().await.insert(url.clone(), artifact);
        url
    }

    pub async fn get(&self, url: &str) -> Option<Artifact> {
        self.artifacts.read().await.get(url).cloned()
    }

    pub async fn remove(&self, url: &str) -> Option<Artifact> {
        self.artifacts.write().await.remove(url)
    }

    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}
