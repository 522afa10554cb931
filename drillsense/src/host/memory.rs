//! In-memory CAM host.
//!
//! Holds a job matrix and per-step feature lists and applies commands to
//! them. It tracks the open step, the work layer, the symbol filter and the
//! selection closely enough to follow a coupon build, and journals every
//! command line it accepts. Clip commands are checked and journaled but do
//! not trim geometry.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::command::{Command, Line, Pad, Rect, Symbol, Text};
use super::{CamHost, HostError, Limits};
use crate::core::CouponError;
use crate::matrix::{MatrixRow, Polarity};

/// Serialized job used to seed a [`MemoryHost`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job: String,
    #[serde(default)]
    pub steps: Vec<String>,
    pub rows: Vec<MatrixRow>,
}

impl JobSnapshot {
    pub fn from_json(content: &str) -> Result<Self, CouponError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, CouponError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// A drawn feature
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feature {
    Pad(Pad),
    Line(Line),
    Text(Text),
    Surface { rect: Rect, polarity: Polarity },
}

impl Feature {
    fn polarity_mut(&mut self) -> &mut Polarity {
        match self {
            Feature::Pad(p) => &mut p.polarity,
            Feature::Line(l) => &mut l.polarity,
            Feature::Text(t) => &mut t.polarity,
            Feature::Surface { polarity, .. } => polarity,
        }
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match self {
            Feature::Pad(p) => Some(p.symbol),
            Feature::Line(l) => Some(l.symbol),
            _ => None,
        }
    }

    fn resize(&mut self, size: f64) {
        match self {
            Feature::Pad(p) => p.symbol = Symbol(p.symbol.0 + size),
            Feature::Line(l) => l.symbol = Symbol(l.symbol.0 + size),
            _ => {}
        }
    }

    /// Bounding box in inches.
    pub fn bounds(&self) -> Limits {
        match self {
            Feature::Pad(p) => {
                let r = p.symbol.0 / 2000.0;
                Limits {
                    xmin: p.x - r,
                    ymin: p.y - r,
                    xmax: p.x + r,
                    ymax: p.y + r,
                }
            }
            Feature::Line(l) => {
                let r = l.symbol.0 / 2000.0;
                Limits {
                    xmin: l.xs.min(l.xe) - r,
                    ymin: l.ys.min(l.ye) - r,
                    xmax: l.xs.max(l.xe) + r,
                    ymax: l.ys.max(l.ye) + r,
                }
            }
            Feature::Text(t) => Limits {
                xmin: t.x,
                ymin: t.y,
                xmax: t.x + t.x_size * t.text.chars().count() as f64,
                ymax: t.y + t.y_size,
            },
            Feature::Surface { rect, .. } => Limits {
                xmin: rect.x1.min(rect.x2),
                ymin: rect.y1.min(rect.y2),
                xmax: rect.x1.max(rect.x2),
                ymax: rect.y1.max(rect.y2),
            },
        }
    }
}

/// Features and profile of one step
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepModel {
    pub layers: BTreeMap<String, Vec<Feature>>,
    pub profile: Option<Rect>,
}

impl StepModel {
    fn limits(&self) -> Limits {
        let mut bounds = self.layers.values().flatten().map(Feature::bounds);
        let Some(first) = bounds.next() else {
            return Limits::default();
        };
        bounds.fold(first, |acc, b| Limits {
            xmin: acc.xmin.min(b.xmin),
            ymin: acc.ymin.min(b.ymin),
            xmax: acc.xmax.max(b.xmax),
            ymax: acc.ymax.max(b.ymax),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryHost {
    job: String,
    rows: Vec<MatrixRow>,
    steps: BTreeMap<String, StepModel>,
    open_step: Option<String>,
    work_layer: Option<String>,
    filter: Vec<Symbol>,
    selection: Option<Vec<usize>>,
    journal: Vec<String>,
}

impl MemoryHost {
    pub fn new(job: impl Into<String>, rows: Vec<MatrixRow>) -> Self {
        Self {
            job: job.into(),
            rows,
            steps: BTreeMap::new(),
            open_step: None,
            work_layer: None,
            filter: Vec::new(),
            selection: None,
            journal: Vec::new(),
        }
    }

    pub fn from_snapshot(snapshot: JobSnapshot) -> Self {
        let mut host = Self::new(snapshot.job, snapshot.rows);
        for step in snapshot.steps {
            host.steps.insert(step, StepModel::default());
        }
        host
    }

    pub fn rows(&self) -> &[MatrixRow] {
        &self.rows
    }

    pub fn steps(&self) -> &BTreeMap<String, StepModel> {
        &self.steps
    }

    pub fn step(&self, name: &str) -> Option<&StepModel> {
        self.steps.get(name)
    }

    /// Features of `layer` in `step`, empty when none were drawn.
    pub fn features(&self, step: &str, layer: &str) -> &[Feature] {
        self.steps
            .get(step)
            .and_then(|s| s.layers.get(layer))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn work_layer(&self) -> Option<&str> {
        self.work_layer.as_deref()
    }

    /// Every command line accepted so far.
    pub fn journal(&self) -> &[String] {
        &self.journal
    }

    pub fn take_journal(&mut self) -> Vec<String> {
        std::mem::take(&mut self.journal)
    }

    fn has_layer(&self, name: &str) -> bool {
        self.rows.iter().any(|r| r.name == name)
    }

    fn require_layer(&self, name: &str) -> Result<(), HostError> {
        if self.has_layer(name) {
            Ok(())
        } else {
            Err(HostError::UnknownLayer(name.to_string()))
        }
    }

    fn open_step_mut(&mut self) -> Result<&mut StepModel, HostError> {
        let name = self.open_step.as_ref().ok_or(HostError::NoOpenStep)?;
        self.steps
            .get_mut(name)
            .ok_or_else(|| HostError::UnknownStep(name.clone()))
    }

    fn work_layer_name(&self) -> Result<String, HostError> {
        self.work_layer
            .clone()
            .ok_or_else(|| HostError::Protocol("No work layer".to_string()))
    }

    fn draw(&mut self, feature: Feature) -> Result<(), HostError> {
        let layer = self.work_layer_name()?;
        self.open_step_mut()?.layers.entry(layer).or_default().push(feature);
        Ok(())
    }

    /// Take the selected features of the work layer, or all of them.
    fn take_selection(&mut self, remove: bool) -> Result<Vec<Feature>, HostError> {
        let layer = self.work_layer_name()?;
        let selection = self.selection.take();
        let features = self.open_step_mut()?.layers.entry(layer).or_default();

        let picked = match selection {
            None => {
                if remove {
                    std::mem::take(features)
                } else {
                    features.clone()
                }
            }
            Some(indices) => {
                let picked: Vec<Feature> =
                    indices.iter().filter_map(|&i| features.get(i).cloned()).collect();
                if remove {
                    let mut i = 0;
                    features.retain(|_| {
                        let keep = !indices.contains(&i);
                        i += 1;
                        keep
                    });
                }
                picked
            }
        };
        Ok(picked)
    }

    fn transfer(&mut self, target: &str, invert: bool, size: f64, remove: bool) -> Result<(), HostError> {
        self.require_layer(target)?;
        let mut features = self.take_selection(remove)?;
        for feature in &mut features {
            if invert {
                let polarity = feature.polarity_mut();
                *polarity = polarity.inverted();
            }
            if size != 0.0 {
                feature.resize(size);
            }
        }
        self.open_step_mut()?
            .layers
            .entry(target.to_string())
            .or_default()
            .extend(features);
        Ok(())
    }

    fn fill_rect(&mut self, margin_x: f64, margin_y: f64) -> Result<Rect, HostError> {
        let step = self.open_step_mut()?;
        let rect = match step.profile {
            Some(profile) => profile,
            None => {
                let l = step.limits();
                Rect {
                    x1: l.xmin,
                    y1: l.ymin,
                    x2: l.xmax,
                    y2: l.ymax,
                }
            }
        };
        Ok(Rect {
            x1: rect.x1 + margin_x,
            y1: rect.y1 + margin_y,
            x2: rect.x2 - margin_x,
            y2: rect.y2 - margin_y,
        })
    }

    fn apply(&mut self, command: &Command) -> Result<(), HostError> {
        match command {
            Command::CreateStep { name, .. } => {
                if self.steps.contains_key(name) {
                    return Err(HostError::CommandFailed {
                        status: 1,
                        command: command.to_string(),
                    });
                }
                self.steps.insert(name.clone(), StepModel::default());
            }
            Command::DeleteStep { name, .. } => {
                self.steps
                    .remove(name)
                    .ok_or_else(|| HostError::UnknownStep(name.clone()))?;
                if self.open_step.as_deref() == Some(name.as_str()) {
                    self.open_step = None;
                    self.work_layer = None;
                }
            }
            Command::OpenEditor { step, .. } => {
                if !self.steps.contains_key(step) {
                    return Err(HostError::UnknownStep(step.clone()));
                }
                self.open_step = Some(step.clone());
            }
            Command::ZoomHome | Command::ClearAffected | Command::FilterAreaStart => {}
            Command::CreateLayer(spec) => {
                if self.has_layer(&spec.name) {
                    return Err(HostError::CommandFailed {
                        status: 1,
                        command: command.to_string(),
                    });
                }
                let row = self.rows.iter().map(|r| r.row).max().unwrap_or(0) + 1;
                self.rows.push(MatrixRow {
                    row,
                    name: spec.name.clone(),
                    layer_type: spec.layer_type,
                    context: spec.context,
                    polarity: spec.polarity,
                    drl_start: String::new(),
                    drl_end: String::new(),
                });
            }
            Command::DeleteLayer { name } => {
                self.require_layer(name)?;
                self.rows.retain(|r| &r.name != name);
                for step in self.steps.values_mut() {
                    step.layers.remove(name);
                }
                if self.work_layer.as_deref() == Some(name.as_str()) {
                    self.work_layer = None;
                    self.selection = None;
                }
            }
            Command::ClearLayers => {
                self.work_layer = None;
                self.selection = None;
            }
            Command::DisplayLayer { name } => self.require_layer(name)?,
            Command::WorkLayer { name } => {
                self.require_layer(name)?;
                self.work_layer = Some(name.clone());
                self.selection = None;
            }
            Command::AddPad(pad) => self.draw(Feature::Pad(pad.clone()))?,
            Command::AddLine(line) => self.draw(Feature::Line(line.clone()))?,
            Command::AddText(text) => self.draw(Feature::Text(text.clone()))?,
            Command::StepFill(fill) => {
                let rect = self.fill_rect(fill.step_margin_x, fill.step_margin_y)?;
                self.draw(Feature::Surface {
                    rect,
                    polarity: fill.polarity,
                })?;
            }
            Command::ClipArea(clip) => {
                self.require_layer(&clip.ref_layer)?;
                self.work_layer_name()?;
            }
            Command::MoveToLayer(t) => self.transfer(&t.target_layer, t.invert, t.size, true)?,
            Command::CopyToLayer(t) => self.transfer(&t.target_layer, t.invert, t.size, false)?,
            Command::FilterReset => {
                self.filter.clear();
                self.selection = None;
            }
            Command::FilterSymbols { symbols } => self.filter = symbols.clone(),
            Command::FilterSelect => {
                let layer = self.work_layer_name()?;
                let filter = self.filter.clone();
                let features = self.open_step_mut()?.layers.entry(layer).or_default();
                let selected = features
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| {
                        f.symbol()
                            .map(|s| filter.iter().any(|w| (w.0 - s.0).abs() < 1e-9))
                            .unwrap_or(false)
                    })
                    .map(|(i, _)| i)
                    .collect();
                self.selection = Some(selected);
            }
            Command::ProfileRect(rect) => self.open_step_mut()?.profile = Some(*rect),
            Command::ProfileToRout { layer, width } => {
                self.require_layer(layer)?;
                let step = self.open_step_mut()?;
                let p = step
                    .profile
                    .ok_or_else(|| HostError::Protocol("Step has no profile".to_string()))?;
                let symbol = Symbol(*width);
                let corners = [(p.x1, p.y1), (p.x2, p.y1), (p.x2, p.y2), (p.x1, p.y2)];
                let routs = step.layers.entry(layer.clone()).or_default();
                for i in 0..corners.len() {
                    let start = corners[i];
                    let end = corners[(i + 1) % corners.len()];
                    routs.push(Feature::Line(Line::new(start, end, symbol)));
                }
            }
        }
        Ok(())
    }
}

impl CamHost for MemoryHost {
    fn execute(&mut self, command: Command) -> Result<(), HostError> {
        self.apply(&command)?;
        self.journal.push(command.to_string());
        Ok(())
    }

    fn step_exists(&mut self, step: &str) -> Result<bool, HostError> {
        Ok(self.steps.contains_key(step))
    }

    fn layer_exists(&mut self, layer: &str) -> Result<bool, HostError> {
        Ok(self.has_layer(layer))
    }

    fn layer_polarity(&mut self, layer: &str) -> Result<Polarity, HostError> {
        self.rows
            .iter()
            .find(|r| r.name == layer)
            .map(|r| r.polarity)
            .ok_or_else(|| HostError::UnknownLayer(layer.to_string()))
    }

    fn step_limits(&mut self, step: &str) -> Result<Limits, HostError> {
        self.steps
            .get(step)
            .map(StepModel::limits)
            .ok_or_else(|| HostError::UnknownStep(step.to_string()))
    }

    fn matrix_rows(&mut self) -> Result<Vec<MatrixRow>, HostError> {
        Ok(self.rows.clone())
    }

    fn job_name(&self) -> &str {
        &self.job
    }
}
