use crate::adapters::upload::ImageUpload;
use crate::domain::model::{BulkDeleteRequest, Page, Part, PartDraft, Resource, ResourceId};
use crate::domain::ports::{ConfigProvider, CredentialStore, ResourceClient};
use crate::utils::error::{AdminError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const REFRESHED_TOKEN_HEADER: &str = "x-access-token";
const INVALID_TOKEN_CODE: &str = "token_not_valid";

/// Shared HTTP plumbing: base URL, bearer credential and status mapping.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        Url::parse(base_url)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::ConfigError {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn from_config<C: ConfigProvider>(
        config: &C,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout(), credentials)
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialStore> {
        &self.credentials
    }

    /// Resolves an API path, or passes through an absolute pagination link.
    pub fn url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Ok(Url::parse(&joined)?)
    }

    pub fn resource<R: Resource>(&self) -> RestResource<R> {
        RestResource {
            api: self.clone(),
            _resource: PhantomData,
        }
    }

    pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if let Some(token) = self.credentials.load()? {
            request = request.bearer_auth(token);
        }
        Ok(request)
    }

    /// Sends a request and maps every non-success status onto the error
    /// taxonomy. `resource`/`id` only label `NotFound` and `Conflict`.
    pub async fn execute(
        &self,
        request: RequestBuilder,
        resource: &str,
        id: Option<ResourceId>,
    ) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if let Some(token) = response
            .headers()
            .get(REFRESHED_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            tracing::debug!("Server issued a refreshed access token");
            self.credentials.save(token)?;
        }

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let id = id.map(|id| id.to_string()).unwrap_or_default();
        let error = error_for_status(status, &body, resource, &id);
        if matches!(error, AdminError::TokenInvalid) {
            tracing::warn!("Access token rejected by server");
        }
        Err(error)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        resource: &str,
        id: Option<ResourceId>,
    ) -> Result<T> {
        let request = self.request(Method::GET, path)?;
        let response = self.execute(request, resource, id).await?;
        decode(response).await
    }

    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        resource: &str,
        id: Option<ResourceId>,
    ) -> Result<T> {
        let request = self.request(method, path)?.json(body);
        let response = self.execute(request, resource, id).await?;
        decode(response).await
    }

    /// Multipart POST of text fields plus an optional image under `image`.
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: Vec<(&'static str, String)>,
        image: Option<ImageUpload>,
        resource: &str,
    ) -> Result<T> {
        let mut form = reqwest::multipart::Form::new();
        for (key, value) in fields {
            form = form.text(key, value);
        }

        if let Some(image) = image {
            tracing::debug!(
                "Attaching image {} ({} bytes)",
                image.file_name(),
                image.len()
            );
            form = form.part("image", image.into_part()?);
        }

        let request = self.request(Method::POST, path)?.multipart(form);
        let response = self.execute(request, resource, None).await?;
        decode(response).await
    }

    pub async fn create_part(&self, draft: &PartDraft, image: Option<ImageUpload>) -> Result<Part> {
        self.post_form(
            &format!("{}/", Part::ENDPOINT),
            draft.form_fields(),
            image,
            Part::SINGULAR,
        )
        .await
    }
}

/// Body decode failures are serialization errors, not transport errors.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

pub fn error_for_status(status: StatusCode, body: &str, resource: &str, id: &str) -> AdminError {
    let json: Option<serde_json::Value> = serde_json::from_str(body).ok();

    match status {
        StatusCode::NOT_FOUND => AdminError::not_found(resource, id),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => AdminError::Conflict {
            resource: resource.to_string(),
            id: id.to_string(),
            message: format!("server rejected stale write ({})", status.as_u16()),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AdminError::Validation {
            status: status.as_u16(),
            details: json.unwrap_or_else(|| serde_json::Value::String(body.to_string())),
        },
        StatusCode::UNAUTHORIZED
            if json
                .as_ref()
                .and_then(|v| v.get("code"))
                .and_then(|v| v.as_str())
                == Some(INVALID_TOKEN_CODE) =>
        {
            AdminError::TokenInvalid
        }
        _ => AdminError::Http {
            status: status.as_u16(),
            body: body.to_string(),
        },
    }
}

/// JSON REST endpoints of one resource type.
pub struct RestResource<R> {
    api: ApiClient,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for RestResource<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> RestResource<R> {
    fn item_path(id: ResourceId) -> String {
        format!("{}/{}/", R::ENDPOINT, id)
    }

    fn collection_path() -> String {
        format!("{}/", R::ENDPOINT)
    }
}

#[async_trait]
impl<R: Resource> ResourceClient<R> for RestResource<R> {
    async fn fetch(&self, id: ResourceId) -> Result<R> {
        self.api
            .get_json(&Self::item_path(id), R::SINGULAR, Some(id))
            .await
    }

    async fn commit(&self, id: ResourceId, draft: &R::Draft) -> Result<R> {
        self.api
            .send_json(Method::PUT, &Self::item_path(id), draft, R::SINGULAR, Some(id))
            .await
    }

    async fn remove(&self, id: ResourceId) -> Result<()> {
        let request = self.api.request(Method::DELETE, &Self::item_path(id))?;
        self.api.execute(request, R::SINGULAR, Some(id)).await?;
        Ok(())
    }

    async fn create(&self, draft: &R::Draft) -> Result<R> {
        match R::create_form(draft) {
            Some(fields) => {
                self.api
                    .post_form(&Self::collection_path(), fields, None, R::SINGULAR)
                    .await
            }
            None => {
                self.api
                    .send_json(Method::POST, &Self::collection_path(), draft, R::SINGULAR, None)
                    .await
            }
        }
    }

    async fn list(&self, page: Option<&str>) -> Result<Page<R>> {
        let path = page
            .map(str::to_string)
            .unwrap_or_else(Self::collection_path);
        self.api.get_json(&path, R::COLLECTION, None).await
    }

    async fn bulk_remove(&self, ids: &[ResourceId]) -> Result<()> {
        let path = format!("{}/bulk-delete/", R::ENDPOINT);
        let request = self
            .api
            .request(Method::POST, &path)?
            .json(&BulkDeleteRequest { ids });
        self.api.execute(request, R::COLLECTION, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::credentials::MemoryCredentialStore;

    fn api(base: &str) -> ApiClient {
        ApiClient::new(
            base,
            Duration::from_secs(5),
            Arc::new(MemoryCredentialStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_url_joins_paths_and_keeps_absolute_links() {
        let api = api("http://localhost:8000/");
        assert_eq!(
            api.url("/api/masters/suppliers/3/").unwrap().as_str(),
            "http://localhost:8000/api/masters/suppliers/3/"
        );
        assert_eq!(
            api.url("http://other:9000/api/masters/suppliers/?page=2")
                .unwrap()
                .as_str(),
            "http://other:9000/api/masters/suppliers/?page=2"
        );
    }

    #[test]
    fn test_rejects_malformed_base_url() {
        let result = ApiClient::new(
            "not a url",
            Duration::from_secs(5),
            Arc::new(MemoryCredentialStore::new()),
        );
        assert!(matches!(result, Err(AdminError::InvalidUrl(_))));
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            error_for_status(StatusCode::NOT_FOUND, "", "supplier", "4"),
            AdminError::NotFound { .. }
        ));
        assert!(matches!(
            error_for_status(StatusCode::PRECONDITION_FAILED, "", "supplier", "4"),
            AdminError::Conflict { .. }
        ));
        assert!(matches!(
            error_for_status(
                StatusCode::UNAUTHORIZED,
                r#"{"code":"token_not_valid","detail":"expired"}"#,
                "supplier",
                "4"
            ),
            AdminError::TokenInvalid
        ));
        assert!(matches!(
            error_for_status(StatusCode::UNAUTHORIZED, r#"{"detail":"no"}"#, "supplier", "4"),
            AdminError::Http { status: 401, .. }
        ));

        match error_for_status(
            StatusCode::BAD_REQUEST,
            r#"{"email":["Enter a valid email address."]}"#,
            "supplier",
            "4",
        ) {
            AdminError::Validation { status, details } => {
                assert_eq!(status, 400);
                assert_eq!(details["email"][0], "Enter a valid email address.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
