//! `uncip-server`: runs the UNCIP API, or performs one of two operator
//! chores against the configured store and exits.
//!
//! ```text
//! uncip-server [--config config.toml]          # serve
//! uncip-server --hash-password                 # print a hash for admin_password_hash
//! uncip-server --add-user EMAIL [--role R] [--school-id S]
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uncip_core::{
  credentials::hash_password,
  principal::Role,
  store::UserDirectory,
  user::NewUser,
};
use uncip_server::ServerConfig;
use uncip_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "UNCIP child-safety alert server")]
struct Cli {
  /// TOML configuration; `UNCIP_*` variables override it.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Read a password from stdin, print its argon2 PHC string and exit.
  #[arg(long, conflicts_with = "add_user")]
  hash_password: bool,

  /// Create a directory user (password from stdin) and exit.
  #[arg(long, value_name = "EMAIL")]
  add_user: Option<String>,

  #[arg(long, default_value = "parent", requires = "add_user")]
  role: Role,

  /// Only meaningful together with `--role school`.
  #[arg(long, requires = "add_user")]
  school_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  if cli.hash_password {
    let hash = hash_password(&prompt_password()?)?;
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("loading {}", cli.config.display()))?;
  let store_path = config.resolved_store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store {}", store_path.display()))?;

  match cli.add_user {
    Some(email) => provision(&store, email, cli.role, cli.school_id).await,
    None => serve(store, &config).await,
  }
}

async fn provision(
  store: &SqliteStore,
  email: String,
  role: Role,
  school_id: Option<String>,
) -> anyhow::Result<()> {
  let secret = hash_password(&prompt_password()?)?;
  let user = store
    .add_user(NewUser {
      email,
      password: Some(secret),
      role,
      is_admin: false,
      school_id,
      display_name: None,
    })
    .await
    .context("adding user")?;
  println!("{}\t{}\t{}", user.uid, user.email, user.role);
  Ok(())
}

async fn serve(store: SqliteStore, config: &ServerConfig) -> anyhow::Result<()> {
  if config.demo_password.is_some() {
    tracing::warn!("demo password is set; every email will accept it");
  }

  let address = config.address();
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("binding {address}"))?;
  tracing::info!(%address, "uncip api listening under /api");

  axum::serve(listener, uncip_server::app(Arc::new(store), config))
    .await
    .context("serving")
}

fn prompt_password() -> anyhow::Result<String> {
  use std::io::Write as _;

  eprint!("password: ");
  std::io::stderr().flush()?;
  let mut line = String::new();
  std::io::stdin().read_line(&mut line).context("reading password")?;
  let password = line.trim_end_matches(['\r', '\n']);
  anyhow::ensure!(!password.is_empty(), "empty password");
  Ok(password.to_owned())
}
