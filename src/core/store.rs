use crate::core::cache::{QueryCache, QueryKey};
use crate::domain::model::{Page, Resource, ResourceId};
use crate::domain::ports::ResourceClient;
use crate::utils::error::Result;
use std::marker::PhantomData;

/// Read-through access to one resource type. Reads are served from the
/// shared [`QueryCache`] while fresh; every write invalidates.
pub struct ResourceStore<R, C> {
    client: C,
    cache: QueryCache,
    _resource: PhantomData<fn() -> R>,
}

impl<R, C: Clone> Clone for ResourceStore<R, C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource, C: ResourceClient<R>> ResourceStore<R, C> {
    pub fn new(client: C, cache: QueryCache) -> Self {
        Self {
            client,
            cache,
            _resource: PhantomData,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub async fn get(&self, id: ResourceId) -> Result<R> {
        let key = QueryKey::detail(R::SINGULAR, id);
        if let Some(hit) = self.cache.get::<R>(&key) {
            tracing::debug!("Cache hit for {} {}", R::SINGULAR, id);
            return Ok(hit);
        }

        let fresh = self.client.fetch(id).await?;
        self.cache.put(key, &fresh)?;
        Ok(fresh)
    }

    pub async fn list(&self, page: Option<&str>) -> Result<Page<R>> {
        let key = QueryKey::list(R::COLLECTION, page);
        if let Some(hit) = self.cache.get::<Page<R>>(&key) {
            tracing::debug!("Cache hit for {} list", R::COLLECTION);
            return Ok(hit);
        }

        let fresh = self.client.list(page).await?;
        self.cache.put(key, &fresh)?;
        Ok(fresh)
    }

    pub async fn create(&self, draft: &R::Draft) -> Result<R> {
        let created = self.client.create(draft).await?;
        tracing::info!("Created {} {}", R::SINGULAR, created.id());
        self.cache.invalidate_prefix(&[R::COLLECTION]);
        Ok(created)
    }

    pub async fn delete(&self, id: ResourceId) -> Result<()> {
        self.client.remove(id).await?;
        tracing::info!("Deleted {} {}", R::SINGULAR, id);
        self.invalidate_after_write(id);
        Ok(())
    }

    pub async fn bulk_delete(&self, ids: &[ResourceId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client.bulk_remove(ids).await?;
        tracing::info!("Deleted {} {} records", ids.len(), R::COLLECTION);
        for id in ids {
            self.cache.invalidate(&QueryKey::detail(R::SINGULAR, *id));
        }
        self.cache.invalidate_prefix(&[R::COLLECTION]);
        Ok(())
    }

    /// Marks the detail entry and every list page of the collection stale.
    pub fn invalidate_after_write(&self, id: ResourceId) {
        self.cache.invalidate(&QueryKey::detail(R::SINGULAR, id));
        self.cache.invalidate_prefix(&[R::COLLECTION]);
    }
}
