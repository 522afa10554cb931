//! Core types shared by the builder and the CLI.
//! No host-specific dependencies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::backdrill::BackdrillSpan;
use crate::host::HostError;

#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which job the coupon is built in, and for which site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobContext {
    pub job_name: String,
    pub site: Option<String>,
}

impl JobContext {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            site: None,
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }
}

/// Why a layer was left out of the coupon
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Span end could not be resolved to a copper layer
    Unresolved,
    /// Layer name resolved but the job has no such layer
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLayer {
    pub span: String,
    pub role: String,       // "start" or "must_not_cut"
    pub layer: Option<String>,
    pub reason: SkipReason,
}

/// Outcome of one coupon build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub run_id: Uuid,
    pub job: String,
    pub site: Option<String>,
    pub step: String,
    pub generated_at: DateTime<Utc>,
    pub spans: Vec<BackdrillSpan>,
    pub skipped: Vec<SkippedLayer>,
    pub thieved_layers: Vec<String>,
    pub mask_openings: Vec<String>,
}

impl BuildReport {
    pub fn new(context: &JobContext, step: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job: context.job_name.clone(),
            site: context.site.clone(),
            step: step.into(),
            generated_at: Utc::now(),
            spans: Vec::new(),
            skipped: Vec::new(),
            thieved_layers: Vec::new(),
            mask_openings: Vec::new(),
        }
    }

    pub fn has_skips(&self) -> bool {
        !self.skipped.is_empty()
    }
}
