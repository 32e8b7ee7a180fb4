//! # hivconnect CLI (`hvc`)
//!
//! Administrative commands for the provider directory CMS.
//!
//! ## Usage
//!
//! ```bash
//! hvc --config ./config/hvc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hvc collections` | List the collection and global schemas |
//! | `hvc migrate sql [--down]` | Print the SQLite DDL for the schemas |
//! | `hvc import <file>` | Bulk-import providers from a JSON array |
//! | `hvc crud-check` | Create, read, update, and delete a test provider |
//! | `hvc seed faqs` | Create FAQ entries |
//! | `hvc seed navigation` | Replace the Site Settings navigation menu |
//! | `hvc deploy-hook delete <id>` | Delete a Cloudflare Pages deploy hook |
//! | `hvc serve hooks` | Start the CMS hook receiver |
//!
//! Commands that write to the CMS read `ADMIN_PASSWORD` (and optionally
//! `ADMIN_EMAIL`) from the environment.
//!
//! ## Examples
//!
//! ```bash
//! # Import into staging
//! ADMIN_PASSWORD=… hvc import data/providers.json
//!
//! # Import into production, skipping the countdown
//! ADMIN_PASSWORD=… hvc import data/providers.json --target production --yes
//!
//! # Render the down migration
//! hvc migrate sql --down
//! ```

use clap::{Parser, Subcommand};
use hivconnect::{
    collections, config, crud_check, deploy_hook, import, migrate, seed, server,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Content tooling for the HIV Connect Central NJ provider directory.
#[derive(Parser)]
#[command(
    name = "hvc",
    about = "Content tooling for the HIV Connect Central NJ provider directory",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/hvc.toml`. Targets, change-log tuning, the hook
    /// receiver bind address, and Cloudflare settings are read from it.
    #[arg(long, global = true, default_value = "./config/hvc.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured collections and globals.
    Collections,

    /// Render database migrations.
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Import providers from a JSON file.
    ///
    /// Records are created one at a time. Each is defaulted and validated
    /// locally first; invalid records count as failures. Exits non-zero if
    /// any record was not created.
    Import {
        /// JSON file holding an array of provider records.
        file: PathBuf,

        /// Target name from `[targets]`. Defaults to `cms.default_target`.
        #[arg(long)]
        target: Option<String>,

        /// Skip the countdown on targets marked `confirm = true`.
        #[arg(long)]
        yes: bool,
    },

    /// Run a create/read/update/delete cycle against a target.
    CrudCheck {
        #[arg(long)]
        target: Option<String>,
    },

    /// Seed content.
    Seed {
        #[command(subcommand)]
        action: SeedAction,
    },

    /// Manage Cloudflare Pages deploy hooks.
    DeployHook {
        #[command(subcommand)]
        action: DeployHookAction,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Print the SQL script.
    Sql {
        /// Print the reverse migration instead.
        #[arg(long)]
        down: bool,
    },
}

#[derive(Subcommand)]
enum SeedAction {
    /// Create FAQ entries (built-in set unless --file is given).
    Faqs {
        #[arg(long)]
        target: Option<String>,

        /// JSON array of `{question, answer, category, order, language, status}`.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Replace the Site Settings navigation with the default menu.
    Navigation {
        #[arg(long)]
        target: Option<String>,
    },
}

#[derive(Subcommand)]
enum DeployHookAction {
    /// Delete a deploy hook by id. Reads CLOUDFLARE_API_TOKEN.
    Delete {
        /// Deploy hook id.
        id: String,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// Receive CMS change notifications and log them.
    Hooks,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    match &cli.command {
        Commands::Collections => {
            collections::list_collections();
            return Ok(());
        }
        Commands::Migrate {
            action: MigrateAction::Sql { down },
        } => {
            let script = if *down {
                migrate::render_down(&collections::all(), &collections::globals())
            } else {
                migrate::render_up(&collections::all(), &collections::globals())
            };
            print!("{}", script);
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Import { file, target, yes } => {
            import::run_import(&cfg, &file, target.as_deref(), yes).await?;
        }
        Commands::CrudCheck { target } => {
            crud_check::run_crud_check(&cfg, target.as_deref()).await?;
        }
        Commands::Seed { action } => match action {
            SeedAction::Faqs { target, file } => {
                seed::run_seed_faqs(&cfg, target.as_deref(), file.as_deref()).await?;
            }
            SeedAction::Navigation { target } => {
                seed::run_seed_navigation(&cfg, target.as_deref()).await?;
            }
        },
        Commands::DeployHook { action } => match action {
            DeployHookAction::Delete { id } => {
                deploy_hook::run_delete(&cfg, &id).await?;
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Hooks => {
                server::run_server(&cfg).await?;
            }
        },
        Commands::Collections | Commands::Migrate { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
