//! Execute one retention run

use crate::config::Config;
use crate::locks::RunLock;
use crate::util;
use anyhow::Result;
use autosnap_engine::{Coordinator, CreateDecision, PassState, RunReport};
use autosnap_zfs::ZfsCli;
use chrono::Utc;
use owo_colors::OwoColorize;
use std::path::Path;
use tracing::{info, warn};

/// Returns whether the run finished without recorded errors
pub fn run(config: &Config, report_path: Option<&Path>) -> Result<bool> {
    let lock = if config.lock_enabled {
        Some(RunLock::acquire(&config.lock_file)?)
    } else {
        warn!("Lock file disabled - concurrent runs are not prevented");
        None
    };

    info!(mode = %config.mode, "Starting autosnap run");
    let mut backend = ZfsCli::for_mode(config.mode, &config.mode_settings(), &config.snapshot_prefix);
    let report = Coordinator::new(&mut backend, config.retention.clone(), config.run_options())
        .run(Utc::now())?;

    if let Some(path) = report_path {
        util::write_report(&report, path)?;
        info!(path = %path.display(), "Wrote run report");
    }

    print_summary(&report);

    if let Some(lock) = lock {
        release_lock(lock);
    }

    Ok(report.is_success())
}

/// The report is already out, so a failed unlink only warns
fn release_lock(lock: RunLock) -> bool {
    let path = lock.path().to_path_buf();
    match lock.release() {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), "Failed to release run lock: {:#}", e);
            false
        }
    }
}

fn print_summary(report: &RunReport) {
    let title = if report.dry_run { "Run Summary (dry run)" } else { "Run Summary" };
    println!("{}", title.bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut dataset = "";
    for outcome in &report.outcomes {
        if outcome.dataset != dataset {
            dataset = outcome.dataset.as_str();
            println!("{}", dataset.cyan());
        }

        let creation = match &outcome.creation {
            CreateDecision::Covered { existing } => format!("covered by {}", existing).dimmed().to_string(),
            CreateDecision::Created { name } => format!("created {}", name).green().to_string(),
            CreateDecision::WouldCreate { name } => format!("would create {}", name).yellow().to_string(),
            CreateDecision::Failed { name } => format!("FAILED to create {}", name).red().to_string(),
            CreateDecision::Skipped => match outcome.state {
                PassState::Disabled => "disabled".dimmed().to_string(),
                _ => "-".dimmed().to_string(),
            },
        };

        let mut line = format!(
            "  {:<10} {}  kept {}  deleted {}",
            outcome.frequency.as_str(),
            creation,
            outcome.kept.len(),
            outcome.deleted.len()
        );
        if !outcome.delete_failures.is_empty() {
            line.push_str(&format!("  failed {}", outcome.delete_failures.len()).red().to_string());
        }
        if !outcome.skipped_by_budget.is_empty() {
            line.push_str(&format!("  over limit {}", outcome.skipped_by_budget.len()).yellow().to_string());
        }
        if outcome.rescued.is_some() {
            line.push_str(&"  (held back last snapshot)".yellow().to_string());
        }
        println!("{}", line);
    }
    if !report.outcomes.is_empty() {
        println!();
    }

    let verb = if report.dry_run { "Would create:" } else { "Created:" };
    println!("{:<15}{}", verb, report.snapshots_created.to_string().green());
    let verb = if report.dry_run { "Would delete:" } else { "Deleted:" };
    println!("{:<15}{}", verb, report.snapshots_deleted.to_string().green());
    if report.delete_failures > 0 {
        println!("{:<15}{}", "Failed deletes:", report.delete_failures.to_string().red());
    }
    if report.skipped_by_budget > 0 {
        println!(
            "{:<15}{} {}",
            "Over limit:",
            report.skipped_by_budget.to_string().yellow(),
            "(deferred to the next run)".dimmed()
        );
    }
    println!(
        "{:<15}{}",
        "Duration:",
        format!("{}ms", (report.finished_at - report.started_at).num_milliseconds()).dimmed()
    );

    if report.errors.is_empty() {
        println!("\n{}", "Run completed successfully ✓".green());
        return;
    }

    println!("\n{} ({})", "Errors".red().bold(), report.errors.len());
    for error in &report.errors {
        println!("  {} {}", "✗".red(), error);
    }
    if report.has_safety_critical_errors() {
        println!(
            "  {}",
            "Snapshot creation failed; deletions were skipped for the affected frequencies".yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_failure_only_warns() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("autosnap.lock");

        let lock = RunLock::acquire(&path).unwrap();
        assert!(release_lock(lock));
        assert!(!path.exists());

        let lock = RunLock::acquire(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(!release_lock(lock));
    }
}
