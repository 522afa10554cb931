//! DrillSense CLI - build depth-sensing backdrill coupons from the command line.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use drillsense::backdrill::DEFAULT_BACKDRILL_PREFIX;
use drillsense::host::{ScriptHost, StdioTransport};
use drillsense::{
    BackdrillSpan, BuildReport, ConfigSources, CouponBuilder, CouponConfig, JobContext,
    JobSnapshot, MemoryHost, SkipReason,
};
use serde_json::{Map, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drillsense")]
#[command(about = "Depth-sensing backdrill coupon builder", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw the coupon step into a job
    Build {
        /// Job name (required unless a snapshot provides it)
        #[arg(long, env = "JOB")]
        job: Option<String>,

        #[command(flatten)]
        config: ConfigArgs,

        /// Build against a job snapshot file instead of a live host (dry run)
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List the backdrill spans of a job snapshot
    Spans {
        /// Job snapshot file
        #[arg(long, value_name = "FILE")]
        snapshot: PathBuf,

        /// Name prefix of backdrill layers
        #[arg(long, default_value = DEFAULT_BACKDRILL_PREFIX)]
        prefix: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// Print the merged configuration
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[derive(Args, Clone)]
struct ConfigArgs {
    /// Site whose {SITE}_DepthSensing.json overrides the defaults
    #[arg(long, env = "SITE")]
    site: Option<String>,

    /// Directory holding the configuration files
    #[arg(long, value_name = "DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Default configuration file (overrides DIR/DepthSensing.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn sources(&self) -> ConfigSources {
        let mut sources = ConfigSources::new(&self.config_dir);
        if let Some(ref path) = self.config {
            sources = sources.with_default_path(path);
        }
        if let Some(ref site) = self.site {
            sources = sources.with_site(site);
        }
        sources
    }

    fn load(&self) -> Result<CouponConfig> {
        CouponConfig::from_map(self.sources().load()).context("Invalid coupon configuration")
    }

    fn context(&self, job: String) -> JobContext {
        match self.site {
            Some(ref site) if !site.is_empty() => JobContext::new(job).with_site(site),
            _ => JobContext::new(job),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            job,
            config,
            snapshot,
            format,
        } => handle_build(job, &config, snapshot, format),
        Commands::Spans {
            snapshot,
            prefix,
            format,
        } => handle_spans(&snapshot, &prefix, format),
        Commands::Config { config } => handle_config(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn handle_build(
    job: Option<String>,
    args: &ConfigArgs,
    snapshot: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let config = args.load()?;

    match snapshot {
        Some(path) => {
            let snapshot = JobSnapshot::load(&path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            let context = args.context(job.unwrap_or_else(|| snapshot.job.clone()));
            tracing::info!("Dry run of job {} from {}", context.job_name, path.display());

            let mut builder =
                CouponBuilder::new(MemoryHost::from_snapshot(snapshot), config, context);
            let report = builder.run().context("Coupon build failed")?;
            let journal = builder.into_host().take_journal();

            output_build(&mut io::stdout().lock(), &report, Some(journal.as_slice()), format)
        }
        None => {
            let job = job.context("--job (or JOB) is required when no snapshot is given")?;
            let host = ScriptHost::new(StdioTransport::stdio(), job.clone());
            let context = args.context(job);
            tracing::debug!("Driving host over stdin/stdout for job {}", context.job_name);

            let mut builder = CouponBuilder::new(host, config, context);
            let report = builder.run().context("Coupon build failed")?;

            // stdout belongs to the host protocol
            output_build(&mut io::stderr().lock(), &report, None, format)
        }
    }
}

fn handle_spans(snapshot: &Path, prefix: &str, format: OutputFormat) -> Result<()> {
    let spans = drillsense::resolve_snapshot_spans(snapshot, prefix)
        .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;

    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Human => {
            if spans.is_empty() {
                writeln!(out, "No backdrill spans found")?;
            }
            for span in &spans {
                writeln!(out, "{}", span_line(span))?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&spans)?)?;
        }
    }
    Ok(())
}

fn handle_config(args: &ConfigArgs) -> Result<()> {
    let merged: Map<String, Value> = args.sources().load();
    CouponConfig::from_map(merged.clone()).context("Invalid coupon configuration")?;

    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}

fn span_line(span: &BackdrillSpan) -> String {
    format!(
        "  {:<16} {} -> {}  must-not-cut {}",
        span.name,
        span.drl_start.as_deref().unwrap_or("?"),
        span.end_cu_name.as_deref().unwrap_or("?"),
        span.drl_mnc.as_deref().unwrap_or("-"),
    )
}

fn output_build(
    out: &mut impl Write,
    report: &BuildReport,
    journal: Option<&[String]>,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Human => output_human(out, report, journal),
        OutputFormat::Json => {
            let output = serde_json::json!({
                "report": report,
                "commands": journal.unwrap_or_default(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
            Ok(())
        }
    }
}

fn output_human(
    out: &mut impl Write,
    report: &BuildReport,
    journal: Option<&[String]>,
) -> Result<()> {
    writeln!(out, "\nCoupon: {} in job {}", report.step, report.job)?;
    if let Some(ref site) = report.site {
        writeln!(out, "Site:   {}", site)?;
    }
    writeln!(out, "{}", "─".repeat(60))?;

    if report.spans.is_empty() {
        writeln!(out, "  No backdrill spans found")?;
    } else {
        writeln!(out, "\n  SPANS:")?;
        for span in &report.spans {
            writeln!(out, "  {}", span_line(span))?;
        }
    }

    if report.has_skips() {
        writeln!(out, "\n  SKIPPED:")?;
        for skipped in &report.skipped {
            let reason = match skipped.reason {
                SkipReason::Unresolved => "unresolved",
                SkipReason::Missing => "layer not in job",
            };
            writeln!(
                out,
                "    - {} {} {} ({})",
                skipped.span,
                skipped.role,
                skipped.layer.as_deref().unwrap_or("-"),
                reason
            )?;
        }
    }

    writeln!(out, "\n  Summary:")?;
    writeln!(out, "    Spans:         {}", report.spans.len())?;
    writeln!(out, "    Skipped:       {}", report.skipped.len())?;
    writeln!(out, "    Thieved:       {}", report.thieved_layers.join(", "))?;
    writeln!(out, "    Mask openings: {}", report.mask_openings.join(", "))?;

    if let Some(journal) = journal {
        writeln!(out, "\n  COMMANDS ({}):", journal.len())?;
        for line in journal {
            writeln!(out, "    {}", line)?;
        }
    }
    Ok(())
}
