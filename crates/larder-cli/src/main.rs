mod config;
mod plan_cmds;
mod recipe_cmds;
mod serve_cmd;

use clap::{Parser, Subcommand};

use larder_db::config::DbConfig;
use larder_db::pool;

use config::LarderConfig;
use plan_cmds::GenerateArgs;

#[derive(Parser)]
#[command(name = "larder", about = "Meal-plan generator")]
struct Cli {
    /// Database URL (overrides LARDER_DATABASE_URL env var)
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a larder config file (no database required)
    Init {
        /// PostgreSQL connection URL
        #[arg(long, default_value = DbConfig::DEFAULT_URL)]
        db_url: String,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Create the larder database and run migrations
    DbInit,
    /// Recipe catalog management
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Meal plan generation and inspection
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Serve the plan API over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Subcommand)]
pub enum RecipeCommands {
    /// Import recipes from a TOML file
    Import {
        /// Path to the recipe TOML file
        file: String,
    },
    /// Print the number of recipes in the catalog
    Count,
}

#[derive(Subcommand)]
pub enum PlanCommands {
    /// Generate and store a new meal plan
    Generate(GenerateArgs),
    /// Show a stored plan with its nutrition summary
    Show {
        /// Plan ID to show
        plan_id: String,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// List stored plans
    List,
    /// Delete a stored plan
    Delete {
        /// Plan ID to delete
        plan_id: String,
    },
}

/// Execute the `larder init` command: write config file.
fn cmd_init(db_url: &str, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let cfg = config::ConfigFile {
        database: config::DatabaseSection {
            url: db_url.to_string(),
        },
        planner: config::PlannerSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  database.url = {db_url}");
    println!();
    println!("Next: run `larder db-init` to create and migrate the database.");

    Ok(())
}

/// Execute the `larder db-init` command: create database and run migrations.
async fn cmd_db_init(cli_db_url: Option<&str>) -> anyhow::Result<()> {
    let resolved = LarderConfig::resolve(cli_db_url)?;

    println!("Initializing larder database...");

    pool::ensure_database_exists(&resolved.db_config).await?;
    let db_pool = pool::create_pool(&resolved.db_config).await?;
    pool::run_migrations(&db_pool).await?;

    let counts = pool::table_counts(&db_pool).await?;
    println!("Database ready. Tables:");
    for (table, count) in &counts {
        println!("  {table}: {count} rows");
    }

    db_pool.close().await;

    println!("larder db-init complete.");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { db_url, force } => {
            cmd_init(&db_url, force)?;
        }
        Commands::DbInit => {
            cmd_db_init(cli.database_url.as_deref()).await?;
        }
        Commands::Recipe { command } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = recipe_cmds::run_recipe_command(command, &db_pool).await;
            db_pool.close().await;
            result?;
        }
        Commands::Plan { command } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = plan_cmds::run_plan_command(command, &db_pool, resolved.seed).await;
            db_pool.close().await;
            result?;
        }
        Commands::Serve { bind, port } => {
            let resolved = LarderConfig::resolve(cli.database_url.as_deref())?;
            let db_pool = pool::create_pool(&resolved.db_config).await?;
            let result = serve_cmd::run_serve(db_pool.clone(), resolved.seed, &bind, port).await;
            db_pool.close().await;
            result?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test_util {
    use std::sync::{Mutex, MutexGuard};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that touch process environment variables.
    pub fn lock_env() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
