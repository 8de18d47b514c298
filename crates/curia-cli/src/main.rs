//! curia admin binary.
//!
//! Reads `curia.toml` (or the path given with `--config`), opens the SQLite
//! store, and runs one council-administration operation against the
//! composition engine. Records and snapshots print as pretty JSON.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use curia_core::{
  assignment::AssignmentPatch,
  catalog::PositionKind,
  member::{MemberStatus, NewMember},
  store::MemberDirectory as _,
  term::{NewTerm, TermPatch},
};
use curia_engine::CompositionEngine;
use curia_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

type Engine = CompositionEngine<SqliteStore, SqliteStore, SqliteStore>;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct AppConfig {
  /// Path to the SQLite database file.
  #[serde(default = "default_store_path")]
  store_path: PathBuf,
}

fn default_store_path() -> PathBuf { PathBuf::from("curia.db") }

// ─── CLI surface ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "curia council administration")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "curia.toml")]
  config: PathBuf,

  /// Override the store path from the config file.
  #[arg(long)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Manage council terms.
  #[command(subcommand)]
  Term(TermCommand),

  /// Manage directory members.
  #[command(subcommand)]
  Member(MemberCommand),

  /// Appoint a member to a council seat.
  Assign {
    #[arg(long)]
    term:   Uuid,
    #[arg(long)]
    member: Uuid,
    #[arg(long, value_parser = parse_kind)]
    seat:   PositionKind,
    /// Tenure start (YYYY-MM-DD or RFC 3339); defaults to now.
    #[arg(long, value_parser = parse_date)]
    start:  Option<DateTime<Utc>>,
  },

  /// Vacate a seat by assignment id.
  Remove { position: Uuid },

  /// Edit an assignment's seat or dates.
  Update {
    position: Uuid,
    #[arg(long, value_parser = parse_kind)]
    seat:     Option<PositionKind>,
    #[arg(long, value_parser = parse_date)]
    start:    Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_date)]
    end:      Option<DateTime<Utc>>,
  },

  /// Show a term's composition snapshot.
  Composition {
    term:    Uuid,
    /// Join each seat to its member record.
    #[arg(long)]
    details: bool,
  },

  /// Show remaining slots per seat for a term.
  Available { term: Uuid },

  /// Check whether a seat still has a free slot in a term.
  Validate {
    #[arg(long)]
    term: Uuid,
    #[arg(long, value_parser = parse_kind)]
    seat: PositionKind,
  },

  /// Show a member's council history.
  History { member: Uuid },

  /// Recompute a member's cached position from assignment records.
  Reconcile { member: Uuid },
}

#[derive(Subcommand)]
enum TermCommand {
  /// Create a term.
  Create {
    #[arg(long)]
    name:        String,
    #[arg(long, value_parser = parse_date)]
    start:       DateTime<Utc>,
    #[arg(long, value_parser = parse_date)]
    end:         DateTime<Utc>,
    /// Activate immediately (deactivates every other term).
    #[arg(long)]
    activate:    bool,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// List all terms, newest first.
  List,
  /// Show one term.
  Show { term: Uuid },
  /// Show the currently active term.
  Active,
  /// Edit a term's fields.
  Update {
    term:        Uuid,
    #[arg(long)]
    name:        Option<String>,
    #[arg(long, value_parser = parse_date)]
    start:       Option<DateTime<Utc>>,
    #[arg(long, value_parser = parse_date)]
    end:         Option<DateTime<Utc>>,
    #[arg(long)]
    description: Option<String>,
  },
  /// Make a term the single active term.
  Activate { term: Uuid },
  /// Clear a term's active flag.
  Deactivate { term: Uuid },
}

#[derive(Subcommand)]
enum MemberCommand {
  /// Register a member.
  Add {
    #[arg(long)]
    name:  String,
    #[arg(long)]
    email: String,
  },
  /// List all members.
  List,
  /// Show one member.
  Show { member: Uuid },
}

// ─── Argument parsers ────────────────────────────────────────────────────────

fn parse_kind(s: &str) -> Result<PositionKind, String> {
  s.parse::<PositionKind>().map_err(|e| e.to_string())
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }
  let date: NaiveDate = s.parse().map_err(|_| {
    format!("invalid date: {s:?} (expected YYYY-MM-DD or RFC 3339)")
  })?;
  Ok(date.and_time(NaiveTime::MIN).and_utc())
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("CURIA"))
    .build()
    .context("failed to read config file")?;

  let app_cfg: AppConfig = settings
    .try_deserialize()
    .context("failed to deserialise AppConfig")?;

  let store_path = cli.store.clone().unwrap_or(app_cfg.store_path);

  let store = Arc::new(
    SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?,
  );
  tracing::debug!(path = %store_path.display(), "opened store");

  let engine = CompositionEngine::from_shared(store.clone());

  match cli.command {
    Command::Term(cmd) => run_term(&engine, cmd).await,
    Command::Member(cmd) => run_member(&store, cmd).await,
    Command::Assign { term, member, seat, start } => {
      let assignment = engine.assign_position(term, member, seat, start).await?;
      print_json(&assignment)
    }
    Command::Remove { position } => match engine.remove_position(position).await? {
      Some(closed) => print_json(&closed),
      None => {
        println!("position {position} is already inactive; nothing to do");
        Ok(())
      }
    },
    Command::Update { position, seat, start, end } => {
      let updated = engine
        .update_position(position, AssignmentPatch {
          kind:       seat,
          start_date: start,
          end_date:   end,
        })
        .await?;
      print_json(&updated)
    }
    Command::Composition { term, details } => {
      if details {
        print_json(&engine.composition_with_details(term).await?)
      } else {
        print_json(&engine.composition(term).await?)
      }
    }
    Command::Available { term } => {
      print_json(&engine.available_positions(term).await?)
    }
    Command::Validate { term, seat } => {
      let available = engine.validate_position_availability(term, seat).await?;
      print_json(&serde_json::json!({
        "seat":      seat,
        "available": available,
      }))
    }
    Command::History { member } => {
      print_json(&engine.member_history(member).await?)
    }
    Command::Reconcile { member } => {
      print_json(&engine.reconcile_member_cache(member).await?)
    }
  }
}

async fn run_term(engine: &Engine, cmd: TermCommand) -> anyhow::Result<()> {
  match cmd {
    TermCommand::Create { name, start, end, activate, description } => {
      let term = engine
        .create_term(NewTerm {
          name,
          start_date: start,
          end_date: end,
          is_active: activate,
          description,
        })
        .await?;
      print_json(&term)
    }
    TermCommand::List => print_json(&engine.list_terms().await?),
    TermCommand::Show { term } => print_json(&engine.term(term).await?),
    TermCommand::Active => print_json(&engine.active_term().await?),
    TermCommand::Update { term, name, start, end, description } => {
      let updated = engine
        .update_term(term, TermPatch {
          name,
          start_date: start,
          end_date: end,
          is_active: None,
          description,
        })
        .await?;
      print_json(&updated)
    }
    TermCommand::Activate { term } => {
      print_json(&engine.activate_term(term).await?)
    }
    TermCommand::Deactivate { term } => {
      print_json(&engine.deactivate_term(term).await?)
    }
  }
}

async fn run_member(
  store: &Arc<SqliteStore>,
  cmd: MemberCommand,
) -> anyhow::Result<()> {
  match cmd {
    MemberCommand::Add { name, email } => {
      let member = store
        .insert_member(NewMember {
          full_name: name,
          email,
          status: MemberStatus::Active,
        })
        .await?;
      print_json(&member)
    }
    MemberCommand::List => print_json(&store.list_members().await?),
    MemberCommand::Show { member } => {
      let record = store
        .member(member)
        .await?
        .with_context(|| format!("member {member} not found"))?;
      print_json(&record)
    }
  }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
