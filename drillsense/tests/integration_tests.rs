//! Integration tests for the coupon builder against an in-memory job

use drillsense::config::loader::embedded_default;
use drillsense::host::memory::Feature;
use drillsense::host::{Command, Limits, Symbol};
use drillsense::matrix::{MatrixRow, Polarity};
use drillsense::prelude::*;
use drillsense::{HostError, SkipReason};
use std::path::PathBuf;

const STEP: &str = "bd_sense_cpn";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn config() -> CouponConfig {
    CouponConfig::from_map(embedded_default()).expect("Default config should convert")
}

fn host() -> MemoryHost {
    let snapshot = JobSnapshot::load(&fixture_path("four_layer_job.json")).expect("Should load fixture");
    MemoryHost::from_snapshot(snapshot)
}

fn build() -> (MemoryHost, BuildReport) {
    let mut builder = CouponBuilder::new(host(), config(), JobContext::new("bd_test_job"));
    let report = builder.run().expect("Build should succeed");
    (builder.into_host(), report)
}

fn pads(host: &MemoryHost, layer: &str) -> Vec<f64> {
    host.features(STEP, layer)
        .iter()
        .filter_map(|f| match f {
            Feature::Pad(p) => Some(p.symbol.diameter()),
            _ => None,
        })
        .collect()
}

fn texts(host: &MemoryHost, layer: &str) -> Vec<String> {
    host.features(STEP, layer)
        .iter()
        .filter_map(|f| match f {
            Feature::Text(t) => Some(t.text.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_clamping_hole_on_every_copper_layer() {
    let (host, _) = build();

    assert_eq!(pads(&host, "drill"), vec![40.0]);
    for layer in ["top", "bot"] {
        assert!(
            pads(&host, layer).contains(&60.0),
            "{} should carry the clamping pad",
            layer
        );
    }
}

#[test]
fn test_drill_sense_holes_per_span() {
    let (host, report) = build();

    let names: Vec<_> = report.spans.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["bdrill_1-2", "bd_missing", "bdrill_4-3"]);

    let holes: Vec<_> = host
        .features(STEP, "drill_sense")
        .iter()
        .filter_map(|f| match f {
            Feature::Pad(p) => Some((p.x, p.symbol.diameter())),
            _ => None,
        })
        .collect();
    assert_eq!(holes.len(), 3);
    assert!((holes[0].0 - 0.09).abs() < 1e-9);
    assert!((holes[2].0 - 0.17).abs() < 1e-9);
    assert!(holes.iter().all(|(_, size)| *size == 12.0));
}

#[test]
fn test_start_layers_are_numbered() {
    let (host, _) = build();

    assert_eq!(texts(&host, "top"), vec!["1", "2", "TOP"]);
    assert_eq!(texts(&host, "bot"), vec!["3", "BOT"]);
}

#[test]
fn test_bottom_label_is_mirrored() {
    let (host, _) = build();

    let bot_label = host
        .features(STEP, "bot")
        .iter()
        .find_map(|f| match f {
            Feature::Text(t) if t.text == "BOT" => Some(t.clone()),
            _ => None,
        })
        .expect("BOT label");
    assert!(bot_label.mirror);
}

#[test]
fn test_unresolved_span_is_skipped_and_later_spans_continue() {
    let (host, report) = build();

    assert_eq!(report.skipped.len(), 1);
    let skipped = &report.skipped[0];
    assert_eq!(skipped.span, "bd_missing");
    assert_eq!(skipped.role, "must_not_cut");
    assert_eq!(skipped.reason, SkipReason::Unresolved);

    // bdrill_4-3 still reaches its must-not-cut layer
    let connections = host
        .features(STEP, "pgp2")
        .iter()
        .filter(|f| matches!(f, Feature::Line(l) if l.symbol == Symbol(6.0)))
        .count();
    assert_eq!(connections, 2);
}

#[test]
fn test_must_not_cut_connects_back_to_clamping_hole() {
    let (host, _) = build();

    let lines: Vec<_> = host
        .features(STEP, "pgp3")
        .iter()
        .filter_map(|f| match f {
            Feature::Line(l) => Some(l.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 2);
    assert!((lines[0].xs - 0.09).abs() < 1e-9 && (lines[0].ye - 0.05).abs() < 1e-9);
    assert!((lines[1].xe - 0.05).abs() < 1e-9 && (lines[1].ye - 0.05).abs() < 1e-9);
}

#[test]
fn test_thieving_only_on_inner_layers() {
    let (host, report) = build();

    assert_eq!(report.thieved_layers, vec!["pgp2".to_string(), "pgp3".to_string()]);
    assert!(!host.rows().iter().any(|r| r.name == "thiev_tmp+++"));

    let has_surface = |layer: &str| {
        host.features(STEP, layer)
            .iter()
            .any(|f| matches!(f, Feature::Surface { .. }))
    };
    assert!(has_surface("pgp2"));
    assert!(has_surface("pgp3"));
    assert!(!has_surface("top"));
    assert!(!has_surface("bot"));
}

#[test]
fn test_negative_layer_gets_routed_isolation() {
    let (host, _) = build();

    let routs = host
        .features(STEP, "pgp2")
        .iter()
        .filter(|f| matches!(f, Feature::Line(l) if l.symbol == Symbol(7.0)))
        .count();
    assert_eq!(routs, 4);

    let inverted = host
        .features(STEP, "pgp2")
        .iter()
        .any(|f| matches!(f, Feature::Pad(p) if p.polarity == Polarity::Negative));
    assert!(inverted);

    let pgp3_routs = host
        .features(STEP, "pgp3")
        .iter()
        .filter(|f| matches!(f, Feature::Line(l) if l.symbol == Symbol(7.0)))
        .count();
    assert_eq!(pgp3_routs, 0);
}

#[test]
fn test_mask_openings_grow_coupon_pads() {
    let (host, report) = build();

    assert_eq!(report.mask_openings, vec!["smt".to_string(), "smb".to_string()]);
    let mut top_mask = pads(&host, "smt");
    top_mask.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(top_mask, vec![29.0, 29.0, 65.0]);
    assert_eq!(pads(&host, "smb").len(), 2);
}

#[test]
fn test_profile_encloses_coupon() {
    let (host, _) = build();

    let profile = host.step(STEP).and_then(|s| s.profile).expect("Profile should be set");
    assert_eq!((profile.x1, profile.y1), (0.0, 0.0));

    // Last drill-sense hole sits at x=0.17, labels reach y=0.126
    assert!(profile.x2 > 0.17 + 0.025);
    assert!(profile.y2 > 0.126);
}

#[test]
fn test_ends_on_top_layer() {
    let (host, _) = build();
    assert_eq!(host.work_layer(), Some("top"));
}

#[test]
fn test_rerun_is_idempotent() {
    let mut builder = CouponBuilder::new(host(), config(), JobContext::new("bd_test_job"));
    builder.run().unwrap();
    let first = builder.host().clone();

    builder.run().unwrap();
    let second = builder.host();

    assert_eq!(first.steps(), second.steps());
    assert_eq!(first.rows(), second.rows());
    assert!(second
        .journal()
        .iter()
        .any(|line| line.starts_with("delete_entity,job=bd_test_job,type=step,name=bd_sense_cpn")));
}

#[test]
fn test_existing_layers_are_not_recreated() {
    let (host, _) = build();

    let drill_rows = host.rows().iter().filter(|r| r.name == "drill").count();
    assert_eq!(drill_rows, 1);
    assert!(host.rows().iter().any(|r| r.name == "drill_sense"));
}

#[test]
fn test_journal_starts_with_step_creation() {
    let (host, _) = build();
    assert_eq!(
        host.journal()[0],
        Command::CreateStep {
            job: "bd_test_job".to_string(),
            name: STEP.to_string(),
        }
        .to_string()
    );
}

#[test]
fn test_configured_label_layer_does_not_change_thieving() {
    let mut config = config();
    config.top_layer_name = Some("pgp2".to_string());
    let mut builder = CouponBuilder::new(host(), config, JobContext::new("bd_test_job"));
    let report = builder.run().expect("Build should succeed");
    let host = builder.into_host();

    // Thieving follows the matrix copper stack, not the label layers
    assert_eq!(report.thieved_layers, vec!["pgp2".to_string(), "pgp3".to_string()]);
    assert!(!host
        .features(STEP, "top")
        .iter()
        .any(|f| matches!(f, Feature::Surface { .. })));

    assert!(texts(&host, "pgp2").contains(&"TOP".to_string()));
    assert_eq!(texts(&host, "top"), vec!["1", "2"]);
}

#[test]
fn test_missing_mask_layer_is_left_alone() {
    let mut config = config();
    config.top_mask_name = "sm_top".to_string();
    let mut builder = CouponBuilder::new(host(), config, JobContext::new("bd_test_job"));
    let report = builder.run().expect("Build should succeed");

    assert_eq!(report.mask_openings, vec!["smb".to_string()]);

    let issued = builder.host().journal().len();
    assert!(!builder.add_mask_openings("top", "sm_top").unwrap());
    assert!(!builder.add_mask_openings("no_such_cu", "smt").unwrap());
    assert_eq!(builder.host().journal().len(), issued);
    assert_eq!(builder.report().mask_openings, vec!["smb".to_string()]);

    let host = builder.into_host();
    assert!(!host.rows().iter().any(|r| r.name == "sm_top"));
    assert!(host.steps().values().all(|s| !s.layers.contains_key("sm_top")));
    assert!(host.features(STEP, "smt").is_empty());
    assert!(!host.journal().iter().any(|line| line.contains("sm_top")));
}

/// Host that hides one layer from existence checks
struct HidingHost {
    inner: MemoryHost,
    hidden: &'static str,
}

impl CamHost for HidingHost {
    fn execute(&mut self, command: Command) -> Result<(), HostError> {
        self.inner.execute(command)
    }

    fn step_exists(&mut self, step: &str) -> Result<bool, HostError> {
        self.inner.step_exists(step)
    }

    fn layer_exists(&mut self, layer: &str) -> Result<bool, HostError> {
        if layer == self.hidden {
            return Ok(false);
        }
        self.inner.layer_exists(layer)
    }

    fn layer_polarity(&mut self, layer: &str) -> Result<Polarity, HostError> {
        self.inner.layer_polarity(layer)
    }

    fn step_limits(&mut self, step: &str) -> Result<Limits, HostError> {
        self.inner.step_limits(step)
    }

    fn matrix_rows(&mut self) -> Result<Vec<MatrixRow>, HostError> {
        self.inner.matrix_rows()
    }

    fn job_name(&self) -> &str {
        self.inner.job_name()
    }
}

#[test]
fn test_absent_must_not_cut_layer_is_skipped() {
    let hiding = HidingHost {
        inner: host(),
        hidden: "pgp3",
    };
    let mut builder = CouponBuilder::new(hiding, config(), JobContext::new("bd_test_job"));
    let report = builder.run().expect("Missing layers must not fail the build");

    let missing: Vec<_> = report
        .skipped
        .iter()
        .filter(|s| s.reason == SkipReason::Missing)
        .collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].span, "bdrill_1-2");
    assert_eq!(missing[0].layer.as_deref(), Some("pgp3"));

    let host = builder.into_host().inner;
    assert!(host.features(STEP, "pgp3").is_empty());
    assert_eq!(report.thieved_layers, vec!["pgp2".to_string()]);
}
