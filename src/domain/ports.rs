use crate::domain::model::{Page, Resource, ResourceId};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Remote persistence for one resource type. Implementations keep no state
/// between calls beyond connection reuse.
#[async_trait]
pub trait ResourceClient<R: Resource>: Send + Sync {
    async fn fetch(&self, id: ResourceId) -> Result<R>;
    async fn commit(&self, id: ResourceId, draft: &R::Draft) -> Result<R>;
    async fn remove(&self, id: ResourceId) -> Result<()>;
    async fn create(&self, draft: &R::Draft) -> Result<R>;
    /// `page` is either `None` for the first page or a `next`/`previous`
    /// link taken from an earlier page.
    async fn list(&self, page: Option<&str>) -> Result<Page<R>>;
    async fn bulk_remove(&self, ids: &[ResourceId]) -> Result<()>;
}

/// Opaque holder of the bearer credential.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> std::time::Duration;
    fn token_file(&self) -> &std::path::Path;
}
