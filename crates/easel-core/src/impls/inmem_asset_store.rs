//! InMemoryAssetStore - development blob store keyed by `(bucket, assetId)`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::AssetId;
use crate::error::AssetError;
use crate::ports::{AssetStore, StoredAsset};

/// URL prefix used when none is configured.
pub const DEFAULT_BASE_URL: &str = "memory://assets";

#[derive(Debug, Clone)]
struct Entry {
    owner: String,
    asset: StoredAsset,
}

pub struct InMemoryAssetStore {
    base_url: String,
    entries: Mutex<HashMap<(String, AssetId), Entry>>,
}

impl InMemoryAssetStore {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Seed an asset owned by `user_id`.
    pub fn insert(&self, bucket: &str, asset_id: AssetId, user_id: &str, data: Vec<u8>, content_type: &str) {
        let entry = Entry {
            owner: user_id.to_string(),
            asset: StoredAsset {
                data,
                content_type: content_type.to_string(),
            },
        };
        self.entries.lock().insert((bucket.to_string(), asset_id), entry);
    }

    /// Read an asset regardless of owner.
    pub fn get(&self, bucket: &str, asset_id: &AssetId) -> Option<StoredAsset> {
        self.entries
            .lock()
            .get(&(bucket.to_string(), asset_id.clone()))
            .map(|entry| entry.asset.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    async fn load_asset(
        &self,
        bucket: &str,
        asset_id: &AssetId,
        user_id: &str,
    ) -> Result<Option<StoredAsset>, AssetError> {
        let entries = self.entries.lock();
        let asset = entries
            .get(&(bucket.to_string(), asset_id.clone()))
            .filter(|entry| entry.owner == user_id)
            .map(|entry| entry.asset.clone());
        Ok(asset)
    }

    async fn store_asset(
        &self,
        bucket: &str,
        asset_id: &AssetId,
        user_id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetError> {
        if bucket.is_empty() {
            return Err(AssetError::Storage("bucket name is empty".to_string()));
        }
        self.insert(bucket, asset_id.clone(), user_id, data, content_type);
        Ok(())
    }

    fn asset_url(&self, bucket: &str, asset_id: &AssetId) -> String {
        format!("{}/{}/{}", self.base_url, bucket, asset_id)
    }
}
