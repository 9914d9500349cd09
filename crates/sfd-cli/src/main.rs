use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sfd")]
#[command(about = "Storefront order workflow CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and query the order status workflow
    Workflow {
        #[command(subcommand)]
        cmd: WorkflowCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> tenant overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Cart utilities
    Cart {
        #[command(subcommand)]
        cmd: CartCmd,
    },
}

/// Flags shared by every workflow subcommand.
#[derive(clap::Args)]
struct WorkflowSource {
    /// Layered config paths in merge order (standard workflow when omitted)
    #[arg(long = "config")]
    config_paths: Vec<String>,

    /// Tenant whose workflow to use (falls back to the default workflow)
    #[arg(long)]
    tenant: Option<String>,
}

#[derive(Subcommand)]
enum WorkflowCmd {
    /// Print every transition and the terminal statuses
    Show {
        #[command(flatten)]
        src: WorkflowSource,
    },

    /// Print the statuses directly reachable from --from
    Next {
        #[arg(long)]
        from: String,

        #[command(flatten)]
        src: WorkflowSource,
    },

    /// Check a status change; exits non-zero when refused
    Check {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[command(flatten)]
        src: WorkflowSource,
    },

    /// Print the step-by-step route between two statuses
    Path {
        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[command(flatten)]
        src: WorkflowSource,
    },
}

#[derive(Subcommand)]
enum CartCmd {
    /// Validate a cart JSON file against a catalog JSON file
    Validate {
        /// `{"lines": [{product_id, qty, unit_price_cents}, ...]}`
        #[arg(long)]
        cart: String,

        /// `[{product_id, name, price_cents, stock, active?}, ...]`
        #[arg(long)]
        catalog: String,

        /// Exit non-zero when the cart needed any adjustment
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    // Dev convenience; silent when the file is absent.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Workflow { cmd } => match cmd {
            WorkflowCmd::Show { src } => {
                let wf = commands::workflow::load(&src.config_paths, src.tenant.as_deref())?;
                commands::workflow::show(&wf);
            }
            WorkflowCmd::Next { from, src } => {
                let wf = commands::workflow::load(&src.config_paths, src.tenant.as_deref())?;
                commands::workflow::next(&wf, &from)?;
            }
            WorkflowCmd::Check { from, to, src } => {
                let wf = commands::workflow::load(&src.config_paths, src.tenant.as_deref())?;
                commands::workflow::check(&wf, &from, &to)?;
            }
            WorkflowCmd::Path { from, to, src } => {
                let wf = commands::workflow::load(&src.config_paths, src.tenant.as_deref())?;
                commands::workflow::path(&wf, &from, &to)?;
            }
        },

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = sfd_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Cart { cmd } => match cmd {
            CartCmd::Validate {
                cart,
                catalog,
                strict,
            } => commands::cart::validate(&cart, &catalog, strict)?,
        },
    }

    Ok(())
}

/// Logs go to stderr so stdout stays parseable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}
