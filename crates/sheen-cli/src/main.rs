use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use sheen_core::catalog::{self, Catalog, ProductFilter};
use sheen_core::config::SheenConfig;
use sheen_core::debounce::Debouncer;
use sheen_core::error::SheenError;
use sheen_core::gateway::RelayClient;
use sheen_core::model::{Message, Product, Role};
use sheen_core::selection::{Selection, Toggle};
use sheen_core::session::{Session, EMPTY_SELECTION_NOTICE};
use sheen_core::store::FileStore;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sheen", about = "Sheen: beauty advisor in the terminal", version)]
struct Cli {
    /// Directory holding the saved session (overrides client.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Product catalog JSON file (overrides client.catalog_path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    /// Relay base URL (overrides client.relay_url)
    #[arg(long, global = true)]
    relay: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a project config to .sheen/config.toml
    Init,
    /// List catalog products
    Products {
        /// Exact category to show
        #[arg(short, long)]
        category: Option<String>,
        /// Case-insensitive search over name, brand, description and category
        #[arg(short, long)]
        search: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog categories
    Categories,
    /// Search as you type: each stdin line is the current search text
    Browse {
        /// Exact category to search within
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Toggle products in or out of the selection
    Select {
        /// Product ids
        #[arg(required = true)]
        ids: Vec<u32>,
    },
    /// Remove a product from the selection
    Unselect { id: u32 },
    /// Show the current selection
    Selection {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Empty the selection
    ClearSelection,
    /// Tell the advisor your name
    Name { name: String },
    /// Ask the advisor something; with no message, start an interactive chat
    Chat { message: Vec<String> },
    /// Generate a routine from the selected products
    Routine,
    /// Replay recent conversation
    History {
        /// Output the saved transcript as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what the advisor remembers about you
    Profile {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the conversation and profile
    Reset {
        /// Required: confirm the reset
        #[arg(long)]
        yes: bool,
    },
    /// Show or toggle the text direction preference
    Direction {
        #[arg(long)]
        toggle: bool,
    },
}

/// Resolved client settings after CLI overrides.
struct Client {
    data_dir: PathBuf,
    catalog_path: PathBuf,
    relay_url: String,
}

impl Client {
    fn resolve(cli: &Cli, config: &SheenConfig) -> Self {
        Self {
            data_dir: cli
                .data_dir
                .clone()
                .unwrap_or_else(|| config.client.resolved_data_dir()),
            catalog_path: cli
                .catalog
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.client.catalog_path)),
            relay_url: cli
                .relay
                .clone()
                .unwrap_or_else(|| config.client.relay_url.clone()),
        }
    }

    fn session(&self) -> Session<FileStore> {
        Session::open(FileStore::new(&self.data_dir))
    }

    fn catalog(&self) -> Result<Catalog> {
        Catalog::load(&self.catalog_path).with_context(|| {
            format!(
                "failed to load product catalog from {}",
                self.catalog_path.display()
            )
        })
    }

    fn relay(&self) -> RelayClient {
        RelayClient::new(&self.relay_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let config = SheenConfig::load(Some(&std::env::current_dir()?))
        .unwrap_or_else(|_| SheenConfig::default_config());
    let client = Client::resolve(&cli, &config);
    tracing::debug!(
        data_dir = %client.data_dir.display(),
        relay = %client.relay_url,
        "resolved client settings"
    );

    run(cli.command, &client).await
}

async fn run(command: Command, client: &Client) -> Result<()> {
    match command {
        Command::Init => cmd_init(),
        Command::Products {
            category,
            search,
            json,
        } => cmd_products(client, category, search, json),
        Command::Categories => cmd_categories(client),
        Command::Browse { category } => cmd_browse(client, category).await,
        Command::Select { ids } => cmd_select(client, &ids),
        Command::Unselect { id } => cmd_unselect(client, id),
        Command::Selection { json } => cmd_selection(client, json),
        Command::ClearSelection => {
            let mut session = client.session();
            session.clear_selection();
            println!("{}", "Selection cleared.".dimmed());
            Ok(())
        }
        Command::Name { name } => cmd_name(client, &name),
        Command::Chat { message } => cmd_chat(client, &message.join(" ")).await,
        Command::Routine => cmd_routine(client).await,
        Command::History { json } => cmd_history(client, json),
        Command::Profile { json } => cmd_profile(client, json),
        Command::Reset { yes } => cmd_reset(client, yes),
        Command::Direction { toggle } => {
            let mut session = client.session();
            let direction = if toggle {
                session.toggle_direction()
            } else {
                session.direction()
            };
            println!("{direction}");
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

fn cmd_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let sheen_dir = cwd.join(".sheen");

    if sheen_dir.join("config.toml").exists() {
        println!("Sheen already initialized in this project.");
        return Ok(());
    }

    std::fs::create_dir_all(&sheen_dir)?;

    let config = SheenConfig::default_config();
    let toml_str = format!(
        "# Put llm.api_key in config.local.toml or set OPENAI_API_KEY\n{}",
        toml::to_string_pretty(&config)?
    );
    std::fs::write(sheen_dir.join("config.toml"), toml_str)?;

    let gitignore_path = cwd.join(".gitignore");
    let entry = ".sheen/config.local.toml";
    if gitignore_path.exists() {
        let contents = std::fs::read_to_string(&gitignore_path)?;
        if !contents.lines().any(|l| l.trim() == entry) {
            let mut appended = contents;
            if !appended.ends_with('\n') {
                appended.push('\n');
            }
            appended.push_str(entry);
            appended.push('\n');
            std::fs::write(&gitignore_path, appended)?;
        }
    } else {
        std::fs::write(&gitignore_path, format!("{entry}\n"))?;
    }

    println!("{}", "Initialized Sheen in .sheen/".green());
    println!("  {}   .sheen/config.toml", "Config:".dimmed());
    println!("  {}    {}", "Relay:".dimmed(), config.client.relay_url.cyan());
    println!(
        "  {}",
        "Edit .sheen/config.local.toml for local overrides (gitignored)".dimmed()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

fn print_products(products: &[&Product], selection: &Selection) {
    if products.is_empty() {
        println!("{}", "No products found.".dimmed());
        return;
    }
    for p in products {
        let mark = if selection.contains(p.id) {
            "✓".green().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{mark} {:>4}  {}  {}  {}",
            p.id.to_string().dimmed(),
            p.name.bold(),
            p.brand.dimmed(),
            p.category.cyan()
        );
    }
}

fn print_filtered(catalog: &Catalog, filter: &ProductFilter, selection: &Selection) {
    let shown = catalog.filter(filter);
    print_products(&shown, selection);
    if let Some(info) = catalog::results_info(shown.len(), catalog.len()) {
        println!("{}", info.dimmed());
    }
}

fn cmd_products(
    client: &Client,
    category: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let catalog = client.catalog()?;
    let filter = ProductFilter { category, search };

    if json {
        let shown = catalog.filter(&filter);
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    let session = client.session();
    print_filtered(&catalog, &filter, session.selection());
    Ok(())
}

fn cmd_categories(client: &Client) -> Result<()> {
    let catalog = client.catalog()?;
    for category in catalog.categories() {
        println!("{category}");
    }
    Ok(())
}

/// Each line re-filters after a quiet period; only the last burst prints.
/// End of input flushes a pending search immediately.
async fn cmd_browse(client: &Client, category: Option<String>) -> Result<()> {
    let catalog = Arc::new(client.catalog()?);
    let selection = Arc::new(client.session().selection().clone());
    let debouncer = Debouncer::default();

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last: Option<ProductFilter> = None;

    while let Some(line) = lines.next_line().await? {
        let filter = ProductFilter {
            category: category.clone(),
            search: Some(line),
        };
        last = Some(filter.clone());

        let catalog = catalog.clone();
        let selection = selection.clone();
        debouncer.schedule(async move {
            print_filtered(&catalog, &filter, &selection);
        });
    }

    if debouncer.cancel() {
        if let Some(filter) = last {
            print_filtered(&catalog, &filter, &selection);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// selection
// ---------------------------------------------------------------------------

fn cmd_select(client: &Client, ids: &[u32]) -> Result<()> {
    let catalog = client.catalog()?;
    let mut session = client.session();

    for &id in ids {
        let product = catalog
            .find(id)
            .ok_or_else(|| SheenError::NotFound(format!("product {id}")))?;
        match session.toggle_product(product) {
            Toggle::Added => println!("{} {}", "+".green(), product.name),
            Toggle::Removed => println!("{} {}", "-".red(), product.name),
        }
    }
    println!(
        "{}",
        format!("{} product(s) selected", session.selection().len()).dimmed()
    );
    Ok(())
}

fn cmd_unselect(client: &Client, id: u32) -> Result<()> {
    let mut session = client.session();
    if !session.remove_product(id) {
        anyhow::bail!("product {id} is not selected");
    }
    println!("{}", format!("Removed product {id}.").dimmed());
    Ok(())
}

fn cmd_selection(client: &Client, json: bool) -> Result<()> {
    let session = client.session();
    let selection = session.selection();

    if json {
        println!("{}", serde_json::to_string_pretty(selection.products())?);
        return Ok(());
    }

    if selection.is_empty() {
        println!("{}", "No products selected yet.".dimmed());
        return Ok(());
    }
    let products: Vec<&Product> = selection.products().iter().collect();
    print_products(&products, selection);
    Ok(())
}

// ---------------------------------------------------------------------------
// conversation
// ---------------------------------------------------------------------------

const ADVISOR: &str = "L'Oréal Beauty Expert";

fn print_advisor(text: &str) {
    println!("{}", ADVISOR.magenta().bold());
    println!("{text}");
    println!();
}

fn print_message(message: &Message, user_name: Option<&str>) {
    match message.role {
        Role::User => {
            println!("{}", user_name.unwrap_or("You").cyan().bold());
            println!("{}", message.content);
            println!();
        }
        _ => print_advisor(&message.content),
    }
}

fn cmd_name(client: &Client, name: &str) -> Result<()> {
    let mut session = client.session();
    let welcome = session.set_name(name)?;
    print_advisor(&welcome);
    Ok(())
}

fn require_name(session: &Session<FileStore>) -> Result<()> {
    if session.profile().name.is_none() {
        anyhow::bail!("Before we chat, what's your name? Run `sheen name <NAME>` first.");
    }
    Ok(())
}

/// Upstream and validation messages are shown as is; anything else is logged
/// and replaced with a generic apology.
fn turn_error(e: SheenError) -> anyhow::Error {
    if e.is_user_visible() {
        anyhow::anyhow!("Sorry, I encountered an error. {e}")
    } else {
        tracing::error!("turn failed: {e}");
        anyhow::anyhow!("Sorry, I encountered an error. Please try again.")
    }
}

async fn chat_turn(
    session: &mut Session<FileStore>,
    relay: &RelayClient,
    text: &str,
) -> Result<()> {
    match session.send_chat(relay, text).await {
        Ok(reply) => {
            print_advisor(&reply);
            Ok(())
        }
        Err(e) => Err(turn_error(e)),
    }
}

async fn cmd_chat(client: &Client, message: &str) -> Result<()> {
    let mut session = client.session();
    require_name(&session)?;
    let relay = client.relay();

    if !message.trim().is_empty() {
        return chat_turn(&mut session, &relay, message).await;
    }

    // Interactive: greet, then one turn per line until EOF or "exit".
    if let Some(greeting) = session.welcome_back() {
        print_advisor(&greeting);
    }
    println!("{}", "Ask me about products or routines (exit to quit)".dimmed());

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }
        if let Err(e) = chat_turn(&mut session, &relay, line).await {
            eprintln!("{}", e.to_string().red());
        }
    }
    Ok(())
}

async fn cmd_routine(client: &Client) -> Result<()> {
    let mut session = client.session();
    if session.selection().is_empty() {
        print_advisor(EMPTY_SELECTION_NOTICE);
        return Ok(());
    }

    println!("{}", "Generating routine...".dimmed());
    let routine = session
        .generate_routine(&client.relay())
        .await
        .map_err(turn_error)?;
    print_advisor(&routine);
    Ok(())
}

fn cmd_history(client: &Client, json: bool) -> Result<()> {
    let session = client.session();

    if json {
        println!("{}", serde_json::to_string_pretty(session.log())?);
        return Ok(());
    }

    let replay = session.replay();
    if replay.is_empty() {
        println!("{}", "No conversation yet.".dimmed());
        return Ok(());
    }
    let name = session.profile().name.as_deref();
    for message in replay {
        print_message(message, name);
    }
    if let Some(greeting) = session.welcome_back() {
        print_advisor(&greeting);
    }
    Ok(())
}

fn cmd_profile(client: &Client, json: bool) -> Result<()> {
    let session = client.session();
    let profile = session.profile();

    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    let unset = || "-".dimmed().to_string();
    println!(
        "  {}      {}",
        "Name:".dimmed(),
        profile.name.clone().unwrap_or_else(unset)
    );
    println!(
        "  {} {}",
        "Skin type:".dimmed(),
        profile
            .skin_type
            .map(|s| s.to_string())
            .unwrap_or_else(unset)
    );
    let concerns: Vec<&str> = profile.concerns.iter().map(|c| c.keyword()).collect();
    println!(
        "  {}  {}",
        "Concerns:".dimmed(),
        if concerns.is_empty() {
            unset()
        } else {
            concerns.join(", ")
        }
    );
    println!(
        "  {}  {}",
        "Messages:".dimmed(),
        profile.total_messages.to_string().cyan()
    );
    println!(
        "  {}  {}",
        "Selected:".dimmed(),
        profile.selected_products.len().to_string().cyan()
    );
    Ok(())
}

fn cmd_reset(client: &Client, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!("this clears the conversation history and profile; re-run with --yes");
    }
    let mut session = client.session();
    session.reset();
    println!("{}", "Conversation history cleared.".green());
    Ok(())
}
