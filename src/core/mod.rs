pub mod auth;
pub mod cache;
pub mod guard;
pub mod pagination;
pub mod session;
pub mod store;
pub mod view;

pub use crate::domain::model::{Page, Part, Resource, ResourceId, Supplier, VersionToken};
pub use crate::domain::ports::{CredentialStore, ResourceClient};
pub use crate::utils::error::Result;
