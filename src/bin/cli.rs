use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use school_portal::authz::{Policy, PolicyConfig, Principal, Role};
use school_portal::db::compile;
use school_portal::utils::{hash_password, new_id, utc_now};

#[derive(Parser, Debug)]
#[command(author, version, about = "school portal admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Create a user with one of the six roles
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        role: String,
        /// Principal id; a random one is generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Validate a policy file (or the built-in policy) and print a summary
    CheckPolicy {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the gate decision for a path
    Decide {
        #[arg(long)]
        path: String,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the row scope for a resource as SQL
    Scope {
        #[arg(long)]
        resource: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::CreateUser { username, password, role, id } => {
            let role: Role = role.parse()?;
            let pool = get_pool().await?;
            let id = create_user(&pool, id, &username, &password, role).await?;
            println!("Created {role} user {username} ({id})");
        }
        Commands::CheckPolicy { file } => {
            let policy = load_policy(file.as_deref())?;
            println!("Policy OK: {} route entries, sign-in at {}", policy.route_count(), policy.sign_in_path());
            for role in Role::ALL {
                println!("  {:<11} home {}", role.as_str(), policy.home_for(role).unwrap_or("-"));
            }
        }
        Commands::Decide { path, role, id, file } => {
            let policy = load_policy(file.as_deref())?;
            let principal = principal_from_args(role.as_deref(), id.as_deref())?;
            let decision = policy.decide(&path, &principal);
            println!("{}", serde_json::to_string(&decision)?);
        }
        Commands::Scope { resource, role, id, file } => {
            let policy = load_policy(file.as_deref())?;
            let principal = Principal::new(id, role.parse()?);
            let predicate = policy.scope_for(&resource, &principal);
            let filter = compile(&predicate, "t")?;
            println!("{}", serde_json::to_string_pretty(&predicate)?);
            println!("WHERE {}", filter.sql);
            if !filter.binds.is_empty() {
                println!("binds: {:?}", filter.binds);
            }
        }
    }

    Ok(())
}

fn load_policy(file: Option<&Path>) -> anyhow::Result<Policy> {
    let config = match file {
        Some(path) => PolicyConfig::from_file(path)?,
        None => PolicyConfig::from_env()?,
    };
    Ok(Policy::from_config(config)?)
}

fn principal_from_args(role: Option<&str>, id: Option<&str>) -> anyhow::Result<Principal> {
    match (role, id) {
        (None, None) => Ok(Principal::anonymous()),
        (Some(role), Some(id)) => Ok(Principal::new(id, role.parse()?)),
        _ => anyhow::bail!("--role and --id must be given together"),
    }
}

async fn create_user(
    pool: &SqlitePool,
    id: Option<String>,
    username: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<String> {
    let id = id.unwrap_or_else(new_id);
    let password_hash = hash_password(password)?;

    sqlx::query("INSERT INTO users (id, username, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(utc_now())
        .execute(pool)
        .await
        .with_context(|| format!("failed to insert user {username}"))?;

    Ok(id)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let tracked = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if tracked.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Prefer ./migrations when running from the repo root, else the crate-local folder.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {display}"))
}
