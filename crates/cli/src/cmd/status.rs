//! Show pool health, usage and snapshot counts without changing anything

use crate::config::Config;
use crate::util;
use anyhow::{Context, Result};
use autosnap_core::{Snapshot, SnapshotFilter, VolumeDescriptor};
use autosnap_engine::inspect::{assess_health, scrub_age, summarize};
use autosnap_engine::VolumeBackend;
use autosnap_zfs::ZfsCli;
use chrono::Utc;
use owo_colors::OwoColorize;

pub fn run(config: &Config) -> Result<()> {
    let backend = ZfsCli::for_mode(config.mode, &config.mode_settings(), &config.snapshot_prefix);
    let options = config.run_options();
    let now = Utc::now();

    let health = backend
        .health_status()
        .context("Failed to read pool health status")?;
    let volumes = backend
        .list_volumes()
        .context("Failed to list pools and filesystems")?;
    let snapshots = backend
        .list_snapshots(&SnapshotFilter::all())
        .context("Failed to list snapshots")?;

    println!("{}", "Autosnap Status".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    println!("Mode:          {}", config.mode.to_string().cyan());
    match backend.version() {
        Ok(version) => println!("ZFS:           {} (kernel {})", version.userland, version.kernel),
        Err(_) => println!("ZFS:           {}", "version unavailable".yellow()),
    }
    if config.dry_run {
        println!("Dry run:       {}", "enabled".yellow());
    }
    println!();

    println!("{}", "Pools".bold());
    for volume in volumes.iter().filter(|v| v.is_pool_root()) {
        let pool = volume.pool.as_str();
        print!("  {:<20} ", pool.cyan());
        if !options.is_pool_allowed(pool) {
            println!("{}", "not in whitelist".dimmed());
            continue;
        }

        let verdict = assess_health(pool, &health);
        if verdict.is_healthy() {
            println!("{}", "healthy ✓".green());
        } else {
            println!("{}", verdict.to_string().red());
        }

        if let Some(status) = health.get(pool) {
            if let (Some(alloc), Some(total)) = (&status.alloc_space, &status.total_space) {
                println!("    Allocated:   {} of {}", alloc, total);
            }
            let scrub = scrub_age(status, now, options.scrub_age_threshold);
            if scrub.needs_attention() {
                println!("    Scrub:       {}", scrub.to_string().yellow());
            } else {
                println!("    Scrub:       {}", scrub);
            }
        }
    }
    println!();

    let frequencies = config.retention.frequencies();
    println!("{}", "Filesystems".bold());
    for volume in volumes.iter().filter(|v| !v.is_pool_root()) {
        let name = volume.display_name();
        print!("  {:<20} ", name.cyan());
        if !options.is_pool_allowed(&volume.pool) || !options.is_filesystem_allowed(name) {
            println!("{}", "not in whitelist".dimmed());
            continue;
        }
        println!("{}", usage_line(volume));

        let own: Vec<Snapshot> = snapshots
            .iter()
            .filter(|s| s.pool == volume.pool && s.dataset == name)
            .cloned()
            .collect();
        for summary in summarize(&own, &frequencies) {
            let max = config.retention.max_count(summary.frequency).unwrap_or(0);
            let count = format!("{}/{}", summary.count, max);
            let count = if max == 0 || summary.count == 0 {
                count.dimmed().to_string()
            } else {
                count.green().to_string()
            };
            match summary.newest {
                Some(newest) => println!(
                    "    {:<10} {:<8} {}",
                    summary.frequency.as_str(),
                    count,
                    format!("newest {}", util::format_relative(newest, now)).dimmed()
                ),
                None => println!("    {:<10} {}", summary.frequency.as_str(), count),
            }
        }

        let foreign = own.iter().filter(|s| !s.is_managed()).count();
        if foreign > 0 {
            println!("    {}", format!("{} unmanaged snapshot(s)", foreign).dimmed());
        }
    }

    Ok(())
}

fn usage_line(volume: &VolumeDescriptor) -> String {
    match (&volume.used, &volume.available, volume.usage_percent()) {
        (Some(used), Some(available), Some(percent)) => {
            format!("used {}, available {} ({:.1}%)", used, available, percent)
        }
        _ => "usage unknown".dimmed().to_string(),
    }
}
