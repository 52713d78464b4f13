use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cadence_core::{
    Difficulty, OverrideRequest, Owner, OwnerState, PracticeItem, SessionOutcome,
};
use cadence_store::{Mutation, MutationContext, SessionLog, Workspace};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "cadence", about = "Adaptive spaced-repetition practice scheduler")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Practice day to act on (defaults to the current session date)
    #[arg(long, global = true, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage owners (collections of items)
    #[command(subcommand)]
    Owner(OwnerCommand),

    /// Manage practice items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Record a practice session and schedule the next one
    Log {
        item: Uuid,
        /// Performance score, 0-10
        #[arg(long)]
        score: f64,
        /// Repetitions completed this session
        #[arg(long, default_value_t = 0)]
        reps: u32,
        /// Session length in seconds
        #[arg(long, default_value_t = 0)]
        seconds: u32,
        #[arg(long, default_value = "target-reached")]
        outcome: SessionOutcome,
        #[arg(long, default_value_t = 0)]
        failures: u32,
        /// Ask for a specific interval instead of the computed one
        #[arg(long, requires = "reason")]
        override_days: Option<f64>,
        #[arg(long)]
        reason: Option<String>,
        /// Bonus practice: record it without moving the due date
        #[arg(long)]
        extra: bool,
    },

    /// List sessions due on or before the practice day
    Due,

    /// Recompute every planned session
    Replan,

    /// Remove orphans, repair missing sessions and move overdue ones
    Maintain,

    /// Merge items into one, combining their history and stability data
    Merge {
        #[arg(required = true)]
        old: Vec<Uuid>,
        #[arg(long)]
        into: Uuid,
    },

    /// Print the predicted retention curve of an item
    Curve {
        item: Uuid,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },

    /// Show workspace statistics
    Stats,
}

#[derive(Subcommand)]
enum OwnerCommand {
    Add { name: String },
    List,
    Pause { id: Uuid },
    Resume { id: Uuid },
    Remove { id: Uuid },
}

#[derive(Subcommand)]
enum ItemCommand {
    Add {
        name: String,
        #[arg(long)]
        owner: Uuid,
        #[arg(long, default_value = "average")]
        difficulty: Difficulty,
        #[arg(long, default_value_t = 0)]
        target_reps: u32,
    },
    List {
        /// Print the items as a JSON array
        #[arg(long)]
        json: bool,
    },
    Remove { id: Uuid },
}

fn open_workspace() -> Result<Workspace> {
    let base_dir = std::env::var("CADENCE_DATA_DIR").ok().map(PathBuf::from);
    Workspace::open(base_dir.as_deref()).context("failed to open workspace")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ws = open_workspace()?;
    let today = cli.date.unwrap_or_else(|| ws.today());

    match &cli.command {
        Commands::Owner(cmd) => cmd_owner(&ws, cmd),
        Commands::Item(cmd) => cmd_item(&ws, cmd),
        Commands::Log {
            item,
            score,
            reps,
            seconds,
            outcome,
            failures,
            override_days,
            reason,
            extra,
        } => {
            let log = SessionLog {
                item_id: *item,
                performance_score: *score,
                repetitions: *reps,
                duration_seconds: *seconds,
                outcome: *outcome,
                total_failures: *failures,
                override_request: override_days.map(|interval_days| OverrideRequest {
                    interval_days,
                    reason: reason.clone().unwrap_or_default(),
                }),
                context: if *extra {
                    MutationContext::PreserveDueDate
                } else {
                    MutationContext::Normal
                },
            };
            cmd_log(&ws, &log, today)
        }
        Commands::Due => cmd_due(&ws, today),
        Commands::Replan => cmd_replan(&ws, today),
        Commands::Maintain => cmd_maintain(&ws, today),
        Commands::Merge { old, into } => cmd_merge(&ws, old, *into),
        Commands::Curve { item, days } => cmd_curve(&ws, *item, *days),
        Commands::Stats => cmd_stats(&ws),
    }
}

fn cmd_owner(ws: &Workspace, cmd: &OwnerCommand) -> Result<()> {
    let (id, state) = match cmd {
        OwnerCommand::Add { name } => {
            let owner = Owner::new(name);
            ws.library()
                .add_owner(&owner)
                .context("failed to add owner")?;
            println!("added owner {}", owner.id);
            return Ok(());
        }
        OwnerCommand::List => {
            for owner in ws.library().owners().context("failed to load owners")? {
                println!("{}  {:<8} {}", owner.id, owner.state.as_str(), owner.name);
            }
            return Ok(());
        }
        OwnerCommand::Pause { id } => (*id, OwnerState::Paused),
        OwnerCommand::Resume { id } => (*id, OwnerState::Active),
        OwnerCommand::Remove { id } => (*id, OwnerState::Removed),
    };
    ws.library()
        .set_owner_state(id, state)
        .with_context(|| format!("failed to update owner {id}"))?;
    println!("owner {id} is now {}", state.as_str());
    Ok(())
}

fn cmd_item(ws: &Workspace, cmd: &ItemCommand) -> Result<()> {
    match cmd {
        ItemCommand::Add {
            name,
            owner,
            difficulty,
            target_reps,
        } => {
            let owners = ws.library().owners().context("failed to load owners")?;
            if !owners.iter().any(|o| o.id == *owner) {
                bail!("unknown owner {owner}");
            }
            let mut item = PracticeItem::new(*owner, name, *difficulty);
            item.target_repetitions = *target_reps;
            ws.library()
                .upsert_item(&item)
                .context("failed to add item")?;
            println!("added item {}", item.id);
        }
        ItemCommand::List { json } => {
            let items = ws.library().items().context("failed to load items")?;
            if *json {
                let out = serde_json::to_string_pretty(&items).context("failed to serialize items")?;
                println!("{out}");
                return Ok(());
            }
            if items.is_empty() {
                println!("(no items)");
            }
            for item in items {
                let due = item
                    .next_due_date
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}  {:<10} stage={} reps={:<4} due={due}  {}",
                    item.id,
                    item.difficulty.as_str(),
                    item.foundation_stage,
                    item.completed_repetitions,
                    item.name
                );
            }
        }
        ItemCommand::Remove { id } => {
            if !ws.remove_item(*id).context("failed to remove item")? {
                bail!("unknown item {id}");
            }
            println!("removed item {id}");
        }
    }
    Ok(())
}

fn cmd_log(ws: &Workspace, log: &SessionLog, today: NaiveDate) -> Result<()> {
    let report = ws
        .record_session(log, today)
        .with_context(|| format!("failed to record session for {}", log.item_id))?;

    if let Some(id) = report.completed_session {
        println!("completed planned session {id}");
    }
    match (&report.decision, report.mutation) {
        (Some(decision), _) => {
            println!(
                "next practice: {} ({} days, {})",
                decision.next_date,
                decision.interval_days,
                decision.path.as_str()
            );
            if let Some(o) = &decision.override_record {
                println!(
                    "override: asked {} days, computed {}, scheduled {}",
                    o.requested_days, o.computed_days, o.final_days
                );
            }
        }
        (None, Mutation::Skipped) if log.context == MutationContext::PreserveDueDate => {
            println!("extra practice recorded; due date unchanged");
        }
        (None, _) => println!("practice recorded; item is not scheduled"),
    }
    Ok(())
}

fn item_names(ws: &Workspace) -> Result<HashMap<Uuid, String>> {
    Ok(ws
        .library()
        .items()
        .context("failed to load items")?
        .into_iter()
        .map(|i| (i.id, i.name))
        .collect())
}

fn cmd_due(ws: &Workspace, today: NaiveDate) -> Result<()> {
    let names = item_names(ws)?;
    let due = ws.schedule().due_on_or_before(today);
    if due.is_empty() {
        println!("nothing due on {today}");
        return Ok(());
    }
    for session in due {
        let name = names
            .get(&session.item_id)
            .map(String::as_str)
            .unwrap_or("(unknown)");
        println!("{}  {}  {name}", session.scheduled_date, session.item_id);
    }
    Ok(())
}

fn cmd_replan(ws: &Workspace, today: NaiveDate) -> Result<()> {
    let mutation = ws
        .replan_all(today, MutationContext::Normal)
        .context("failed to replan sessions")?;
    println!("planned {} sessions", mutation.count());
    Ok(())
}

fn cmd_maintain(ws: &Workspace, today: NaiveDate) -> Result<()> {
    let report = ws.run_maintenance(today).context("maintenance failed")?;
    println!("orphans removed: {}", report.orphans_removed);
    println!("repaired:        {}", report.repaired);
    println!("completed:       {}", report.completed);
    println!("rescheduled:     {}", report.rescheduled);
    Ok(())
}

fn cmd_merge(ws: &Workspace, old: &[Uuid], into: Uuid) -> Result<()> {
    let report = ws
        .merge_items(old, into)
        .with_context(|| format!("failed to merge into {into}"))?;
    println!(
        "merged {} items into {into} ({} history entries moved)",
        report.merged_items, report.moved_history
    );
    if let Some(record) = report.stability {
        println!(
            "stability: S={:.2}, D={:.2}, reviews={}",
            record.stability, record.difficulty, record.review_count
        );
    }
    Ok(())
}

fn cmd_curve(ws: &Workspace, item: Uuid, days: u32) -> Result<()> {
    let curve = ws
        .retention_curve(item, days)
        .with_context(|| format!("failed to compute curve for {item}"))?;
    for (day, r) in curve.iter().enumerate() {
        println!("{day:>4}  {:.3}", r);
    }
    Ok(())
}

fn cmd_stats(ws: &Workspace) -> Result<()> {
    let stats = ws.stats().context("failed to collect stats")?;
    println!("owners:     {}", stats.owners);
    println!("items:      {}", stats.items);
    println!("history:    {}", stats.history_entries);
    println!("open:       {}", stats.open_sessions);
    println!("completed:  {}", stats.completed_sessions);
    println!("stability:  {}", stats.stability_records);
    Ok(())
}
