use crate::config::Overrides;
use crate::core::guard::{ConflictResolver, ConflictState, FixedResolution, Resolution};
use crate::domain::model::{PartCategory, PartDraft, Resource, ResourceId};
use crate::utils::error::{AdminError, Result};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "inventory-desk")]
#[command(about = "Administer parts and suppliers of the inventory API")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API root, e.g. https://inventory.example.com
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Where the access token is kept between runs
    #[arg(long, global = true)]
    pub token_file: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.api_url.clone(),
            timeout_seconds: self.timeout,
            token_file: self.token_file.clone(),
            json_logs: self.json_logs,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the access token
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored access token
    Logout,
    /// Show the signed-in user
    Whoami,
    #[command(subcommand)]
    Suppliers(SupplierCommand),
    #[command(subcommand)]
    Parts(PartCommand),
}

#[derive(Debug, Subcommand)]
pub enum SupplierCommand {
    List {
        /// A `next`/`previous` link from an earlier listing
        #[arg(long)]
        page: Option<String>,
    },
    Show {
        id: u64,
    },
    Create {
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<Assignment>,
    },
    Edit {
        id: u64,
        #[arg(long = "set", value_name = "FIELD=VALUE", required = true)]
        assignments: Vec<Assignment>,
        /// What to do when someone else saved the record first
        #[arg(long, value_enum, default_value_t = OnConflict::Prompt)]
        on_conflict: OnConflict,
    },
    Delete {
        id: u64,
    },
    BulkDelete {
        #[arg(required = true)]
        ids: Vec<u64>,
        /// The page the ids were selected from
        #[arg(long)]
        page: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum PartCommand {
    List {
        #[arg(long)]
        page: Option<String>,
    },
    Create(PartArgs),
}

#[derive(Debug, Args)]
pub struct PartArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, value_parser = PartCategory::from_str)]
    pub category: PartCategory,
    #[arg(long)]
    pub supplier_id: u64,
    #[arg(long)]
    pub cost_price: f64,
    #[arg(long)]
    pub selling_price: f64,
    /// Fraction, e.g. 0.1 for 10%
    #[arg(long)]
    pub tax_rate: f64,
    #[arg(long, default_value = "0")]
    pub stock_quantity: i64,
    #[arg(long, default_value = "0")]
    pub reorder_level: i64,
    #[arg(long, default_value = "")]
    pub description: String,
    /// JPEG or PNG, at most 2 MiB
    #[arg(long)]
    pub image: Option<PathBuf>,
}

impl PartArgs {
    pub fn to_draft(&self) -> PartDraft {
        PartDraft {
            name: self.name.clone(),
            category: self.category,
            supplier_id: ResourceId(self.supplier_id),
            cost_price: self.cost_price,
            selling_price: self.selling_price,
            tax_rate: self.tax_rate,
            stock_quantity: self.stock_quantity,
            reorder_level: self.reorder_level,
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnConflict {
    Prompt,
    Discard,
    Overwrite,
}

impl OnConflict {
    pub fn resolver<R: Resource>(self) -> Box<dyn ConflictResolver<R>> {
        match self {
            OnConflict::Prompt => Box::new(PromptResolver),
            OnConflict::Discard => Box::new(FixedResolution(Resolution::Discard)),
            OnConflict::Overwrite => Box::new(FixedResolution(Resolution::ForceOverwrite)),
        }
    }
}

/// `field=value` from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected FIELD=VALUE, got '{}'", s))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("missing field name in '{}'", s));
        }
        Ok(Assignment {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Applies assignments to a draft. String fields take the text as is; other
/// fields parse it as JSON (`null`, numbers, booleans) and fall back to the
/// text when the draft type does not accept the parsed value.
pub fn apply_assignments<D>(draft: &D, assignments: &[Assignment]) -> Result<D>
where
    D: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(draft)?;
    let known: Vec<String> = match value.as_object() {
        Some(fields) => fields.keys().cloned().collect(),
        None => {
            return Err(AdminError::ConfigError {
                message: "draft is not an object".to_string(),
            })
        }
    };

    for assignment in assignments {
        if !known.contains(&assignment.field) {
            return Err(AdminError::InvalidConfigValueError {
                field: "--set".to_string(),
                value: assignment.field.clone(),
                reason: format!("unknown field; expected one of: {}", known.join(", ")),
            });
        }

        let field = assignment.field.as_str();
        let text = serde_json::Value::String(assignment.value.clone());
        if value[field].is_string() {
            value[field] = text;
            continue;
        }

        value[field] = serde_json::from_str(&assignment.value).unwrap_or_else(|_| text.clone());
        // an optional text field that is currently null, e.g. `supplier_code=123`
        if serde_json::from_value::<D>(value.clone()).is_err() {
            value[field] = text;
        }
    }

    Ok(serde_json::from_value(value)?)
}

/// Asks on stdin until one of the choices is given. End of input cancels.
pub struct PromptResolver;

#[async_trait]
impl<R: Resource> ConflictResolver<R> for PromptResolver {
    async fn decide(&self, conflict: &ConflictState<R>) -> Resolution {
        let summary = if conflict.is_deleted() {
            format!(
                "{} {} was deleted by someone else while you were editing.",
                R::SINGULAR,
                conflict.resource_id()
            )
        } else {
            let changed = conflict.differing_fields();
            format!(
                "{} {} was changed by someone else (now at {}). Fields that differ from your edit: {}",
                R::SINGULAR,
                conflict.resource_id(),
                conflict
                    .server()
                    .and_then(|s| s.version())
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "unknown version".to_string()),
                if changed.is_empty() {
                    "none".to_string()
                } else {
                    changed.join(", ")
                }
            )
        };

        let answer = tokio::task::spawn_blocking(move || ask(&summary)).await;
        answer.unwrap_or(Resolution::Cancel)
    }
}

fn ask(summary: &str) -> Resolution {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    println!("{}", summary);

    loop {
        print!("[d]iscard your edit and reload, [o]verwrite theirs, [c]ancel: ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => return Resolution::Cancel,
            Ok(_) => {}
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "d" | "discard" => return Resolution::Discard,
            "o" | "overwrite" => return Resolution::ForceOverwrite,
            "c" | "cancel" => return Resolution::Cancel,
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SupplierDraft;

    #[test]
    fn test_parse_assignment() {
        let assignment: Assignment = "remarks=pay on delivery=yes".parse().unwrap();
        assert_eq!(assignment.field, "remarks");
        assert_eq!(assignment.value, "pay on delivery=yes");
        assert!("no-equals".parse::<Assignment>().is_err());
        assert!("=value".parse::<Assignment>().is_err());
    }

    #[test]
    fn test_apply_keeps_digits_in_string_fields() {
        let draft = SupplierDraft {
            name: "Acme".to_string(),
            ..SupplierDraft::default()
        };
        let updated = apply_assignments(
            &draft,
            &[
                "phone=0312345678".parse().unwrap(),
                "supplier_code=SUP-9".parse().unwrap(),
            ],
        )
        .unwrap();

        assert_eq!(updated.phone, "0312345678");
        assert_eq!(updated.supplier_code.as_deref(), Some("SUP-9"));
        assert_eq!(updated.name, "Acme");
    }

    #[test]
    fn test_apply_digits_to_unset_optional_text_field() {
        let updated = apply_assignments(
            &SupplierDraft::default(),
            &["supplier_code=123".parse().unwrap()],
        )
        .unwrap();
        assert_eq!(updated.supplier_code.as_deref(), Some("123"));

        let cleared = apply_assignments(&updated, &["supplier_code=null".parse().unwrap()]).unwrap();
        assert_eq!(cleared.supplier_code, None);
    }

    #[test]
    fn test_apply_parses_numeric_fields() {
        let draft = PartDraft {
            name: "Shaft".to_string(),
            category: PartCategory::Shaft,
            supplier_id: ResourceId(1),
            cost_price: 100.0,
            selling_price: 200.0,
            tax_rate: 0.1,
            stock_quantity: 0,
            reorder_level: 0,
            description: String::new(),
        };
        let updated = apply_assignments(
            &draft,
            &[
                "stock_quantity=12".parse().unwrap(),
                "selling_price=250.5".parse().unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(updated.stock_quantity, 12);
        assert_eq!(updated.selling_price, 250.5);

        assert!(apply_assignments(&draft, &["stock_quantity=many".parse().unwrap()]).is_err());
    }

    #[test]
    fn test_apply_rejects_unknown_fields() {
        let result = apply_assignments(
            &SupplierDraft::default(),
            &["colour=red".parse().unwrap()],
        );
        assert!(matches!(
            result,
            Err(AdminError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_cli_parses_edit_command() {
        let cli = Cli::try_parse_from([
            "inventory-desk",
            "--api-url",
            "http://localhost:9000",
            "suppliers",
            "edit",
            "7",
            "--set",
            "name=New Name",
            "--on-conflict",
            "overwrite",
        ])
        .unwrap();

        assert_eq!(cli.overrides().base_url.as_deref(), Some("http://localhost:9000"));
        match cli.command {
            Command::Suppliers(SupplierCommand::Edit {
                id,
                assignments,
                on_conflict,
            }) => {
                assert_eq!(id, 7);
                assert_eq!(assignments[0].value, "New Name");
                assert_eq!(on_conflict, OnConflict::Overwrite);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
