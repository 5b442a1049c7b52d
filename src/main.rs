use clap::Parser;
use inventory_desk::config::cli::{apply_assignments, Command, PartCommand, SupplierCommand};
use inventory_desk::domain::model::{Page, Part, Supplier, SupplierDraft};
use inventory_desk::utils::{logger, validation::Validate};
use inventory_desk::{
    AdminError, ApiClient, Cli, ConcurrencyGuard, FileCredentialStore, ImageUpload, PageCursor,
    QueryCache, Resource, ResourceId, ResourceStore, ResolveOutcome, RestResource, Result,
    Settings, TomlConfig, UserContext,
};
use inventory_desk::core::view;
use std::io::BufRead;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let file_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path.display(), e);
                std::process::exit(e.exit_code());
            }
        },
        None => None,
    };

    let settings = Settings::resolve(cli.overrides(), file_config.as_ref());

    if settings.json_logs {
        logger::init_json_logger(cli.verbose, settings.log_level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, settings.log_level.as_deref());
    }
    tracing::debug!("Effective settings: {:?}", settings);

    let validated = match &file_config {
        Some(config) => config.validate().and_then(|_| settings.validate()),
        None => settings.validate(),
    };
    if let Err(e) = validated {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    if let Err(e) = run(cli.command, &settings).await {
        tracing::error!("❌ {} (category: {:?})", e, e.category());
        eprintln!("❌ {}", e.user_friendly_message());
        if e.is_retryable() {
            eprintln!("💡 Nothing was lost; run the same command again.");
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(command: Command, settings: &Settings) -> Result<()> {
    let credentials = Arc::new(FileCredentialStore::new(settings.token_file.clone()));
    let api = ApiClient::from_config(settings, credentials)?;
    let cache = QueryCache::new();

    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let context = UserContext::signed_out(api);
            let user = context.login(&email, &password).await?;
            println!("✅ Signed in as {} ({})", user.username, user.email);
        }
        Command::Logout => {
            UserContext::signed_out(api).logout()?;
            println!("Signed out");
        }
        Command::Whoami => match UserContext::init(api).await?.current() {
            Some(user) => {
                println!("{} <{}>", user.username, user.email);
                if !user.groups.is_empty() {
                    println!("groups: {}", user.groups.join(", "));
                }
            }
            None => println!("Not signed in"),
        },
        Command::Suppliers(command) => {
            let store = ResourceStore::new(api.resource::<Supplier>(), cache);
            run_suppliers(command, store).await?;
        }
        Command::Parts(command) => {
            let store = ResourceStore::new(api.resource::<Part>(), cache);
            run_parts(command, &api, store).await?;
        }
    }

    Ok(())
}

async fn run_suppliers(
    command: SupplierCommand,
    store: ResourceStore<Supplier, RestResource<Supplier>>,
) -> Result<()> {
    match command {
        SupplierCommand::List { page } => {
            view::render(store.list(page.as_deref()).await, print_suppliers)?;
        }
        SupplierCommand::Show { id } => {
            view::render(store.get(ResourceId(id)).await, print_supplier)?;
        }
        SupplierCommand::Create { assignments } => {
            let draft = apply_assignments(&SupplierDraft::default(), &assignments)?;
            let created = store.create(&draft).await?;
            println!("✅ Created supplier {}", created.id);
        }
        SupplierCommand::Edit {
            id,
            assignments,
            on_conflict,
        } => {
            let guard = ConcurrencyGuard::new(store);
            let mut session = guard.begin(ResourceId(id)).await?;
            let draft = apply_assignments(session.draft(), &assignments)?;
            session.set_draft(draft)?;

            let resolver = on_conflict.resolver::<Supplier>();
            match guard.save(&mut session, resolver.as_ref()).await? {
                ResolveOutcome::Committed(saved) => {
                    println!(
                        "✅ Saved supplier {} (version {})",
                        saved.id,
                        saved
                            .version()
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "unknown".to_string())
                    );
                }
                ResolveOutcome::Reloaded(Some(current)) => {
                    println!("Your edit was discarded. Current record:");
                    print_supplier(&current);
                }
                ResolveOutcome::Reloaded(None) => {
                    println!("Your edit was discarded; the supplier no longer exists.");
                }
                ResolveOutcome::Cancelled => println!("Edit cancelled, nothing was saved."),
            }
        }
        SupplierCommand::Delete { id } => {
            store.delete(ResourceId(id)).await?;
            println!("🗑️  Deleted supplier {}", id);
        }
        SupplierCommand::BulkDelete { ids, page } => {
            let ids: Vec<ResourceId> = ids.into_iter().map(ResourceId).collect();
            let listed = store.list(page.as_deref()).await?;
            store.bulk_delete(&ids).await?;
            println!("🗑️  Deleted {} suppliers", ids.len());

            let mut cursor = match page {
                Some(link) => PageCursor::at(link),
                None => PageCursor::new(),
            };
            if cursor.after_bulk_delete(&listed, &ids) {
                println!("That page is now empty; showing the previous one.");
            }
            view::render(store.list(cursor.current()).await, print_suppliers)?;
        }
    }
    Ok(())
}

async fn run_parts(
    command: PartCommand,
    api: &ApiClient,
    store: ResourceStore<Part, RestResource<Part>>,
) -> Result<()> {
    match command {
        PartCommand::List { page } => {
            view::render(store.list(page.as_deref()).await, print_parts)?;
        }
        PartCommand::Create(args) => {
            let draft = args.to_draft();
            let created = match &args.image {
                Some(path) => {
                    let image = ImageUpload::from_path(path).await?;
                    let created = api.create_part(&draft, Some(image)).await?;
                    store.cache().invalidate_prefix(&[Part::COLLECTION]);
                    created
                }
                None => store.create(&draft).await?,
            };
            println!("✅ Created part {} ({})", created.id, created.name);
        }
    }
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AdminError::MissingConfigError {
            field: "password".to_string(),
        });
    }
    Ok(password)
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn print_supplier(supplier: &Supplier) {
    println!("id:             {}", supplier.id);
    println!("name:           {}", supplier.name);
    println!(
        "supplier_code:  {}",
        or_unset(supplier.supplier_code.as_deref().unwrap_or(""))
    );
    println!("contact_person: {}", or_unset(&supplier.contact_person));
    println!("phone:          {}", or_unset(&supplier.phone));
    println!("fax:            {}", or_unset(&supplier.fax));
    println!("email:          {}", or_unset(&supplier.email));
    println!("website:        {}", or_unset(&supplier.website));
    println!(
        "address:        {} {} {} {} {}",
        supplier.postal_code, supplier.prefecture, supplier.city, supplier.town, supplier.building
    );
    if !supplier.remarks.is_empty() {
        println!("remarks:        {}", supplier.remarks);
    }
    if let Some(version) = &supplier.updated_at {
        println!("updated_at:     {}", version);
    }
}

fn print_footer<T>(page: &Page<T>) {
    println!(
        "page {}/{} · {} per page · {} total",
        page.current, page.total_pages, page.page_size, page.count
    );
    if let Some(previous) = &page.previous {
        println!("previous: {}", previous);
    }
    if let Some(next) = &page.next {
        println!("next:     {}", next);
    }
}

fn print_suppliers(page: &Page<Supplier>) {
    for supplier in &page.results {
        println!(
            "{:>6}  {:<10}  {:<30}  {:<15}  {}",
            supplier.id.0,
            or_unset(supplier.supplier_code.as_deref().unwrap_or("")),
            supplier.name,
            or_unset(&supplier.phone),
            or_unset(&supplier.email)
        );
    }
    print_footer(page);
}

fn print_parts(page: &Page<Part>) {
    for part in &page.results {
        println!(
            "{:>6}  {:<30}  {:<6}  {:<20}  {:>10.2}  {:>5}",
            part.id.0,
            part.name,
            part.category.label(),
            part.supplier_name.as_deref().unwrap_or("-"),
            part.selling_price,
            part.stock_quantity
        );
    }
    print_footer(page);
}
