// Adapters layer: concrete implementations for external systems (http, credentials, uploads).

pub mod credentials;
pub mod http;
pub mod upload;

pub use credentials::{FileCredentialStore, MemoryCredentialStore};
pub use http::{ApiClient, RestResource};
pub use upload::ImageUpload;
