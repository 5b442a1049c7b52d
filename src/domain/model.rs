use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ResourceId {
    fn from(value: u64) -> Self {
        ResourceId(value)
    }
}

/// Opaque version marker. The server rewrites it on every persisted write;
/// tokens are compared for equality only, never ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        VersionToken(value.to_string())
    }
}

/// A server-owned record that can be edited under optimistic concurrency.
pub trait Resource: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// The editable subset of the record, as sent on create and update.
    type Draft: Serialize
        + DeserializeOwned
        + Clone
        + PartialEq
        + fmt::Debug
        + Send
        + Sync
        + 'static;

    /// Collection path below the API root, without trailing slash.
    const ENDPOINT: &'static str;
    /// Cache namespace for list queries.
    const COLLECTION: &'static str;
    /// Cache namespace for detail queries, also used in error messages.
    const SINGULAR: &'static str;

    fn id(&self) -> ResourceId;
    fn version(&self) -> Option<&VersionToken>;
    fn to_draft(&self) -> Self::Draft;

    /// Text fields for resources the server only accepts as a multipart
    /// form on create. `None` means a JSON body.
    fn create_form(_draft: &Self::Draft) -> Option<Vec<(&'static str, String)>> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: ResourceId,
    pub supplier_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub fax: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<VersionToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplierDraft {
    pub supplier_code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub contact_person: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub fax: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub prefecture: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub building: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub remarks: String,
}

impl Resource for Supplier {
    type Draft = SupplierDraft;

    const ENDPOINT: &'static str = "/api/masters/suppliers";
    const COLLECTION: &'static str = "suppliers";
    const SINGULAR: &'static str = "supplier";

    fn id(&self) -> ResourceId {
        self.id
    }

    fn version(&self) -> Option<&VersionToken> {
        self.updated_at.as_ref()
    }

    fn to_draft(&self) -> SupplierDraft {
        SupplierDraft {
            supplier_code: self.supplier_code.clone(),
            name: self.name.clone(),
            contact_person: self.contact_person.clone(),
            phone: self.phone.clone(),
            fax: self.fax.clone(),
            email: self.email.clone(),
            postal_code: self.postal_code.clone(),
            prefecture: self.prefecture.clone(),
            city: self.city.clone(),
            town: self.town.clone(),
            building: self.building.clone(),
            website: self.website.clone(),
            remarks: self.remarks.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartCategory {
    Head,
    Shaft,
    Grip,
    Other,
}

impl PartCategory {
    pub const ALL: [PartCategory; 4] = [
        PartCategory::Head,
        PartCategory::Shaft,
        PartCategory::Grip,
        PartCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PartCategory::Head => "head",
            PartCategory::Shaft => "shaft",
            PartCategory::Grip => "grip",
            PartCategory::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PartCategory::Head => "Head",
            PartCategory::Shaft => "Shaft",
            PartCategory::Grip => "Grip",
            PartCategory::Other => "Other",
        }
    }
}

impl std::str::FromStr for PartCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PartCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| format!("unknown part category: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: ResourceId,
    pub name: String,
    pub category: PartCategory,
    pub supplier_id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    pub cost_price: f64,
    pub selling_price: f64,
    pub tax_rate: f64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<VersionToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDraft {
    pub name: String,
    pub category: PartCategory,
    pub supplier_id: ResourceId,
    pub cost_price: f64,
    pub selling_price: f64,
    pub tax_rate: f64,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub description: String,
}

impl PartDraft {
    /// Text fields of the multipart create form. `tax_rate` is held as a
    /// fraction locally and submitted as a percentage.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("category", self.category.as_str().to_string()),
            ("supplier_id", self.supplier_id.to_string()),
            ("cost_price", self.cost_price.to_string()),
            ("selling_price", self.selling_price.to_string()),
            ("tax_rate", (self.tax_rate * 100.0).to_string()),
            ("stock_quantity", self.stock_quantity.to_string()),
            ("reorder_level", self.reorder_level.to_string()),
            ("description", self.description.clone()),
        ]
    }
}

impl Resource for Part {
    type Draft = PartDraft;

    const ENDPOINT: &'static str = "/api/masters/parts";
    const COLLECTION: &'static str = "parts";
    const SINGULAR: &'static str = "part";

    fn id(&self) -> ResourceId {
        self.id
    }

    fn version(&self) -> Option<&VersionToken> {
        self.updated_at.as_ref()
    }

    fn to_draft(&self) -> PartDraft {
        PartDraft {
            name: self.name.clone(),
            category: self.category,
            supplier_id: self.supplier_id,
            cost_price: self.cost_price,
            selling_price: self.selling_price,
            tax_rate: self.tax_rate,
            stock_quantity: self.stock_quantity,
            reorder_level: self.reorder_level,
            description: self.description.clone(),
        }
    }

    fn create_form(draft: &PartDraft) -> Option<Vec<(&'static str, String)>> {
        Some(draft.form_fields())
    }
}

/// Paginated list envelope returned by every collection endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub total_pages: u64,
    pub current: u64,
    pub page_size: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkDeleteRequest<'a> {
    pub ids: &'a [ResourceId],
}
