//! Dry-run a coupon build against a job snapshot and print the host commands.
//!
//! Usage: cargo run --example dry_run -- [SNAPSHOT] [SITE]

use drillsense::prelude::*;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let snapshot_path = args.next().map(PathBuf::from).unwrap_or_else(|| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join("four_layer_job.json")
    });
    let site = args.next();

    let config_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");
    let mut sources = ConfigSources::new(config_dir);
    if let Some(ref site) = site {
        sources = sources.with_site(site);
    }
    let config = CouponConfig::from_map(sources.load())?;

    let snapshot = JobSnapshot::load(&snapshot_path)?;
    let mut context = JobContext::new(snapshot.job.clone());
    if let Some(site) = site {
        context = context.with_site(site);
    }

    let mut builder = CouponBuilder::new(MemoryHost::from_snapshot(snapshot), config, context);
    let report = builder.run()?;

    println!("Coupon {} in {}", report.step, report.job);
    for span in &report.spans {
        println!(
            "  {}: start {:?}, must-not-cut {:?}",
            span.name, span.drl_start, span.drl_mnc
        );
    }
    for skipped in &report.skipped {
        println!("  skipped {} {} ({:?})", skipped.span, skipped.role, skipped.reason);
    }

    println!("\nHost commands:");
    for line in builder.host().journal() {
        println!("  {}", line);
    }

    Ok(())
}
