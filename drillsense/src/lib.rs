//! DrillSense - depth-sensing backdrill coupon builder
//!
//! This library draws a backdrill test coupon into a CAM job: a clamping
//! hole, one drill-sense hole per backdrill span with numbered pads on the
//! start layers and connections on the must-not-cut layers, side labels, a
//! profile, inner-layer thieving and mask openings.
//!
//! # Quick Start
//!
//! ```no_run
//! use drillsense::prelude::*;
//! use std::path::Path;
//!
//! let sources = ConfigSources::new("config").with_site("ORANGE");
//! let config = CouponConfig::from_map(sources.load()).unwrap();
//!
//! let snapshot = JobSnapshot::load(Path::new("job.json")).unwrap();
//! let context = JobContext::new(snapshot.job.clone()).with_site("ORANGE");
//! let mut builder = CouponBuilder::new(MemoryHost::from_snapshot(snapshot), config, context);
//!
//! let report = builder.run().unwrap();
//! for span in &report.spans {
//!     println!("{}: {:?} -> {:?}", span.name, span.drl_start, span.drl_mnc);
//! }
//! ```
//!
//! # Modules
//!
//! - **config**: default + site JSON configuration and the typed view
//! - **matrix**: job matrix rows and the copper stack
//! - **backdrill**: span resolution and must-not-cut computation
//! - **host**: the CAM host trait, its command language and two hosts
//! - **builder**: the coupon drawing sequence

pub mod backdrill;
pub mod builder;
pub mod config;
pub mod core;
pub mod host;
pub mod matrix;

// Re-export main types
pub use backdrill::{must_not_cut_index, BackdrillSpan, SpanResolver};
pub use builder::CouponBuilder;
pub use config::{ConfigSources, CouponConfig};
pub use crate::core::{BuildReport, CouponError, JobContext, SkipReason, SkippedLayer};
pub use host::{CamHost, HostError, JobSnapshot, MemoryHost, ScriptHost, StdioTransport};
pub use matrix::{CopperStack, MatrixRow};

/// Resolve the backdrill spans of a job snapshot file (convenience wrapper).
pub fn resolve_snapshot_spans(
    path: &std::path::Path,
    prefix: &str,
) -> Result<Vec<BackdrillSpan>, CouponError> {
    let snapshot = JobSnapshot::load(path)?;
    Ok(SpanResolver::new(&snapshot.rows).with_prefix(prefix).resolve())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BackdrillSpan, BuildReport, CamHost, ConfigSources, CouponBuilder, CouponConfig,
        CouponError, JobContext, JobSnapshot, MemoryHost,
    };
}
