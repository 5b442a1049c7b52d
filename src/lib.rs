pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;
pub use config::{toml_config::TomlConfig, Settings};

pub use adapters::{ApiClient, FileCredentialStore, ImageUpload, MemoryCredentialStore, RestResource};
pub use core::{
    auth::UserContext,
    cache::{QueryCache, QueryKey},
    guard::{
        ConcurrencyGuard, ConflictCheck, ConflictResolver, ConflictState, FixedResolution,
        Resolution, ResolveOutcome, SubmitOutcome,
    },
    pagination::PageCursor,
    session::{EditSession, SessionState},
    store::ResourceStore,
    view::ViewState,
};
pub use domain::model::{Part, PartCategory, PartDraft, Resource, ResourceId, Supplier, SupplierDraft};
pub use utils::error::{AdminError, Result};
