use chrono::Utc;
use clap::Args;
use workblock_core::calendar::CalendarStore;
use workblock_core::integrations::GoogleCalendarStore;
use workblock_core::sync::{cleanup_synced_entries, CleanupSummary};
use workblock_core::{Config, DryRunCalendar};

#[derive(Args)]
pub struct CleanupArgs {
    /// Count what would be deleted without deleting it
    #[arg(long)]
    dry_run: bool,
    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: CleanupArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let scheduler = config.to_scheduler_config();
    let now = Utc::now();
    let end = now + scheduler.lookahead();

    let calendar = GoogleCalendarStore::from_keyring(&config.google)?;
    let summary = if args.dry_run {
        sweep(&DryRunCalendar::new(calendar), now, end)?
    } else {
        sweep(&calendar, now, end)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let verb = if args.dry_run { "would delete" } else { "deleted" };
        println!(
            "{verb} {} of {} entries checked ({} failed)",
            summary.deleted, summary.checked, summary.failed
        );
    }
    Ok(())
}

fn sweep(
    store: &dyn CalendarStore,
    now: chrono::DateTime<Utc>,
    end: chrono::DateTime<Utc>,
) -> Result<CleanupSummary, Box<dyn std::error::Error>> {
    Ok(cleanup_synced_entries(store, now, end)?)
}
