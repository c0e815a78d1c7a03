//! AssetStore port - binary asset storage (generated images and their sources).

use async_trait::async_trait;

use crate::domain::AssetId;
use crate::error::AssetError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub data: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Load an asset owned by `user_id`. `Ok(None)` when it does not exist
    /// (or is not visible to that user).
    async fn load_asset(
        &self,
        bucket: &str,
        asset_id: &AssetId,
        user_id: &str,
    ) -> Result<Option<StoredAsset>, AssetError>;

    async fn store_asset(
        &self,
        bucket: &str,
        asset_id: &AssetId,
        user_id: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AssetError>;

    /// URL under which a stored asset is served.
    fn asset_url(&self, bucket: &str, asset_id: &AssetId) -> String;
}
