use fleetdeck::api::{set_silent, DeploymentGateway, HttpGateway};
use fleetdeck::config;
use fleetdeck::models::{AppState, Catalog, Instance, InstanceTypeOption};
use fleetdeck::routes::build_router;
use fleetdeck::services::{
    resolve_user_id, FleetError, FleetStore, IdentifierSource, RandomIdentifiers, StaticIdentity, MAX_ACCELERATORS,
};
use fleetdeck::utils::paint_status;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "fleetdeck",
    author,
    version,
    about = "Manage a GPU workstation fleet: one principal instance plus up to three accelerators",
    long_about = r#"fleetdeck keeps a per-user fleet of GPU instances in step with the deployment backend.

The backend is configured with FLEET_API_BASE_URL (default http://localhost:3000). The acting user
comes from --user-id, FLEET_USER_ID or, as a fallback, FLEET_DEFAULT_USER_ID.

Examples:
  1) Run the dashboard API:
      fleetdeck serve --port 8080
  2) Deploy and inspect a principal:
      fleetdeck fleet deploy g5.xlarge
      fleetdeck fleet list
  3) Tear it down again:
      fleetdeck fleet destroy
"#,
    after_help = "Use `fleetdeck <subcommand> --help` to get subcommand specific options and usage examples."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Disable request/response logging
    #[arg(long, global = true)]
    silent: bool,
    /// Path to .env file
    #[arg(long, global = true)]
    env_file: Option<String>,
    /// Act as this user instead of FLEET_USER_ID
    #[arg(long, global = true)]
    user_id: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard API server
    Serve {
        /// Host to bind to (defaults to FLEET_HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (defaults to FLEET_PORT or 8080)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate configuration and backend connectivity
    #[command(
        about = "Validate configuration and ensure backend connectivity.",
        long_about = "Print the resolved configuration, then list the acting user's resources to confirm the backend answers."
    )]
    CheckConfig,
    /// Manage the fleet through the deployment backend
    #[command(
        about = "Inspect and change the fleet (list, deploy, terminate, destroy, catalog)",
        long_about = "Every command first refreshes from the backend, then performs its action. Accelerators are attached through the server API only."
    )]
    Fleet {
        #[command(subcommand)]
        sub: FleetCommands,
    },
}

#[derive(Subcommand)]
enum FleetCommands {
    /// List active instances
    List {
        /// Include terminated records
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Deploy the principal instance
    #[command(about = "Deploy the principal instance", long_about = "Request a principal of the given type, e.g. `g5.xlarge`. Fails when one is already active.")]
    Deploy { instance_type: String },
    /// Terminate an instance by id
    #[command(about = "Terminate an instance", long_about = "Terminating the principal also terminates every accelerator attached to it. Accelerators cannot be destroyed individually by the backend and are refused here.")]
    Terminate { instance_id: String },
    /// Terminate the active principal and its accelerators
    Destroy,
    /// Show offered instance types
    Catalog,
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

fn print_instances(instances: &[Instance]) {
    if instances.is_empty() {
        println!("{}", yansi::Paint::new("(no instances)").dim());
        return;
    }
    let mut table = new_table();
    table.set_header(vec!["ID", "Name", "Role", "Type", "Status", "Endpoint", "Related to"]);
    for i in instances {
        table.add_row(vec![
            i.id.clone(),
            i.name.clone(),
            i.role.label().to_string(),
            i.instance_type.clone(),
            paint_status(i.status),
            if i.has_endpoint() {
                i.endpoint.clone()
            } else {
                yansi::Paint::new(&i.endpoint).dim().to_string()
            },
            i.related_to.clone().unwrap_or_default(),
        ]);
    }
    println!("\n{table}\n");
}

fn print_options(title: &str, options: &[InstanceTypeOption]) {
    let mut table = new_table();
    table.set_header(vec![title, "GPU"]);
    for opt in options {
        table.add_row(vec![opt.value, opt.gpu]);
    }
    println!("\n{table}");
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!(%err, "{}", context);
    eprintln!("{}: {}", yansi::Paint::new(context).red(), err);
    process::exit(1);
}

/// Run `fut` behind a spinner on stderr.
async fn with_spinner<T>(message: &str, fut: impl Future<Output = T>) -> T {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    let out = fut.await;
    pb.finish_and_clear();
    out
}

fn build_gateway(ids: Arc<dyn IdentifierSource>) -> Arc<dyn DeploymentGateway> {
    let base_url = config::get_api_base_url();
    match HttpGateway::new(&base_url, config::get_http_timeout(), ids) {
        Ok(gateway) => Arc::new(gateway),
        Err(e) => fail("Failed to create HTTP client", e),
    }
}

fn cli_user_id(flag: Option<String>) -> Result<String, FleetError> {
    let identity = StaticIdentity(flag.or_else(config::get_user_id));
    resolve_user_id(&identity, config::get_default_user_id().as_deref())
}

/// Store for the CLI user, refreshed from the backend.
async fn synced_store(user_flag: Option<String>) -> FleetStore {
    let user_id = cli_user_id(user_flag).unwrap_or_else(|e| fail("Cannot determine user", e));
    let ids: Arc<dyn IdentifierSource> = Arc::new(RandomIdentifiers);
    let store = FleetStore::new(user_id, build_gateway(ids.clone()), ids);
    if let Err(e) = with_spinner("Refreshing fleet...", store.refresh()).await {
        fail("Failed to refresh fleet", e);
    }
    store
}

async fn start_server(host: &str, port: u16) {
    let ids: Arc<dyn IdentifierSource> = Arc::new(RandomIdentifiers);
    let default_user_id = config::get_default_user_id();
    if default_user_id.is_none() {
        tracing::info!("FLEET_DEFAULT_USER_ID is not set; requests without a bearer token are rejected");
    }
    let state = AppState::new(build_gateway(ids.clone()), ids, default_user_id);

    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => fail("Invalid host/port format", e),
    };
    let app = build_router(state);
    tracing::info!(%addr, backend = %config::get_api_base_url(), "Starting fleetdeck server");
    println!(
        "{} {}",
        yansi::Paint::new("Fleet API running on").green(),
        yansi::Paint::new(format!("http://{}", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                fail("Server error", e);
            }
        }
        Err(e) => {
            tracing::error!(%e, "Failed to bind to address; is the port already in use?");
            eprintln!(
                "{}: {}\n{}",
                yansi::Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                yansi::Paint::new("Please stop any process using this port, or start the server with a different --port value.").yellow()
            );
            process::exit(1);
        }
    }
}

async fn check_config(user_flag: Option<String>) {
    println!("{:<24} {}", "FLEET_API_BASE_URL", config::get_api_base_url());
    println!("{:<24} {}s", "FLEET_HTTP_TIMEOUT_SECS", config::get_http_timeout().as_secs());
    println!(
        "{:<24} {}",
        "FLEET_DEFAULT_USER_ID",
        config::get_default_user_id().unwrap_or_else(|| "(unset)".to_string())
    );
    let user_id = match cli_user_id(user_flag) {
        Ok(id) => id,
        Err(e) => fail("Cannot determine user", e),
    };
    println!("{:<24} {}", "user", user_id);

    let ids: Arc<dyn IdentifierSource> = Arc::new(RandomIdentifiers);
    let gateway = build_gateway(ids);
    match with_spinner("Contacting backend...", gateway.list_resources(&user_id)).await {
        Ok(records) => println!(
            "{}",
            yansi::Paint::new(format!("Configuration looks valid ({} resources listed)", records.len())).green()
        ),
        Err(e) => fail("Configuration appears invalid", e),
    }
}

async fn run_fleet(sub: FleetCommands, user_flag: Option<String>) {
    match sub {
        FleetCommands::Catalog => {
            let catalog = Catalog::load();
            print_options("Principal type", &catalog.principal);
            print_options("Accelerator type", &catalog.accelerators);
            println!();
        }
        FleetCommands::List { all } => {
            let store = synced_store(user_flag).await;
            if all {
                print_instances(&store.all());
            } else {
                print_instances(&store.list_active());
            }
            println!(
                "{}",
                yansi::Paint::new(format!(
                    "{} of {} accelerator slots free",
                    store.remaining_accelerator_slots(),
                    MAX_ACCELERATORS
                ))
                .dim()
            );
        }
        FleetCommands::Deploy { instance_type } => {
            let store = synced_store(user_flag).await;
            match with_spinner("Deploying principal...", store.deploy_principal(&instance_type)).await {
                Ok(instance) => {
                    println!("{} {}", yansi::Paint::new("Principal deployed:").green(), instance.id);
                    print_instances(&[instance]);
                }
                Err(e) => fail("Deploy failed", e),
            }
        }
        FleetCommands::Terminate { instance_id } => {
            let store = synced_store(user_flag).await;
            if let Some(record) = store.get(&instance_id).filter(|i| i.is_active() && !i.terminates_remotely()) {
                eprintln!(
                    "{}",
                    yansi::Paint::new(format!(
                        "{} is a {} record; the backend cannot destroy it individually. Terminating it only changes a server's local fleet, use DELETE /api/fleet/instances/{} on `fleetdeck serve`.",
                        record.id,
                        record.role.label().to_lowercase(),
                        record.id
                    ))
                    .yellow()
                );
                process::exit(1);
            }
            match with_spinner("Terminating...", store.terminate(&instance_id)).await {
                Ok(ids) => println!("{} {}", yansi::Paint::new("Terminated:").green(), ids.join(", ")),
                Err(e) => fail("Terminate failed", e),
            }
        }
        FleetCommands::Destroy => {
            let store = synced_store(user_flag).await;
            let Some(principal) = store.principal() else {
                println!("{}", yansi::Paint::new("No active principal; nothing to destroy").yellow());
                return;
            };
            match with_spinner("Destroying fleet...", store.terminate(&principal.id)).await {
                Ok(ids) => println!("{} {}", yansi::Paint::new("Terminated:").green(), ids.join(", ")),
                Err(e) => fail("Destroy failed", e),
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    if cli.silent {
        set_silent(true);
    }

    config::load_env_file(cli.env_file.as_deref());

    match cli.command {
        None => start_server(&config::get_host(), config::get_port()).await,
        Some(Commands::Serve { host, port }) => {
            let host = host.unwrap_or_else(config::get_host);
            let port = port.unwrap_or_else(config::get_port);
            start_server(&host, port).await;
        }
        Some(Commands::CheckConfig) => check_config(cli.user_id).await,
        Some(Commands::Fleet { sub }) => run_fleet(sub, cli.user_id).await,
    }
}
