//! Sync subcommand: one pass from Todoist into Google Calendar.

use clap::{Args, ValueEnum};
use workblock_core::integrations::{GoogleCalendarStore, TodoistSource};
use workblock_core::sync::{SkipReason, SyncEngine, SyncSummary};
use workblock_core::{Config, DryRunCalendar, PlacementPolicy, TaskResult, UnschedulableReason};

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Prefer slots that keep the most contiguous room free
    Scored,
    /// Earliest slot with room
    FirstFit,
}

impl From<PolicyArg> for PlacementPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Scored => PlacementPolicy::Scored,
            PolicyArg::FirstFit => PlacementPolicy::FirstFit,
        }
    }
}

#[derive(Args)]
pub struct SyncArgs {
    /// Preview placements without writing to the calendar
    #[arg(long)]
    dry_run: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
    /// Override the configured placement policy
    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,
}

pub fn run(args: SyncArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut scheduler = config.to_scheduler_config();
    if let Some(policy) = args.policy {
        scheduler.policy = policy.into();
    }

    let calendar = GoogleCalendarStore::from_keyring(&config.google)?;
    let tasks = TodoistSource::from_env_or_keyring(&config.todoist)?;

    let summary = if args.dry_run {
        let engine = SyncEngine::new(DryRunCalendar::new(calendar), tasks, scheduler);
        let summary = engine.run_pass()?;
        let staged = engine.store().planned_writes().len();
        if !args.json {
            println!("Dry run: {staged} write(s) staged, nothing written.");
        }
        summary
    } else {
        SyncEngine::new(calendar, tasks, scheduler).run_pass()?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_summary(summary: &SyncSummary) {
    println!(
        "{} window(s), {} task(s) as of {}",
        summary.windows_found,
        summary.tasks_found,
        summary.rounded_now.format("%Y-%m-%d %H:%M UTC")
    );

    for skipped in &summary.skipped {
        let why = match &skipped.reason {
            SkipReason::AlreadyScheduled {
                title_updated: true,
                ..
            } => "already scheduled, title updated",
            SkipReason::AlreadyScheduled { .. } => "already scheduled",
            SkipReason::MissingDeadline => "no deadline",
        };
        println!("  skip  {} ({why})", skipped.content);
    }

    for report in &summary.reports {
        match &report.result {
            TaskResult::Scheduled(p) => println!(
                "  place {} -> {} - {}",
                report.content,
                p.start.format("%a %m-%d %H:%M"),
                p.end.format("%H:%M")
            ),
            TaskResult::Unschedulable { reason } => {
                let why = match reason {
                    UnschedulableReason::NoFreeSlot => "no free slot",
                    UnschedulableReason::PastDeadline => "no slot before deadline",
                };
                println!(
                    "  fail  {} ({} min, {why})",
                    report.content, report.duration_minutes
                );
            }
            TaskResult::MissingDeadline => println!("  skip  {} (no deadline)", report.content),
            TaskResult::WriteFailed { error } => {
                println!("  fail  {} (write failed: {error})", report.content)
            }
        }
    }

    println!(
        "{} scheduled, {} unschedulable, {} write failure(s)",
        summary.scheduled_count(),
        summary.unschedulable().count(),
        summary.write_failures().count()
    );
}
