//! CAM Host Module
//!
//! The coupon is drawn by a CAM host that owns the job database. This module
//! defines the [`CamHost`] trait the builder talks to, the typed command
//! language it sends, and two implementations:
//!
//! - [`ScriptHost`] - speaks the host's line protocol over a [`Transport`]
//!   (stdin/stdout when running as a host script)
//! - [`MemoryHost`] - an in-memory job used for dry runs and tests

pub mod command;
pub mod memory;
pub mod script;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::{CopperStack, MatrixRow, Polarity};

pub use command::{
    ClipArea, Command, LayerSpec, Line, Pad, Rect, StepFill, Symbol, Text, Transfer,
};
pub use memory::{JobSnapshot, MemoryHost};
pub use script::{ScriptHost, StdioTransport, Transport};

/// Errors raised by a host
#[derive(Debug, Error)]
pub enum HostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command failed with status {status}: {command}")]
    CommandFailed { status: i32, command: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("No step is open in the editor")]
    NoOpenStep,
}

/// Bounding box of the features of a step
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Names of the two outer copper layers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterLayers {
    pub top: String,
    pub bot: String,
}

/// Operations the coupon builder needs from a CAM host.
///
/// Implementors provide [`execute`](CamHost::execute) and the queries; the
/// typed drawing operations are expressed as commands on top of them.
pub trait CamHost {
    /// Run one command against the open job.
    fn execute(&mut self, command: Command) -> Result<(), HostError>;

    fn step_exists(&mut self, step: &str) -> Result<bool, HostError>;

    /// Whether a layer exists in the job matrix.
    fn layer_exists(&mut self, layer: &str) -> Result<bool, HostError>;

    fn layer_polarity(&mut self, layer: &str) -> Result<Polarity, HostError>;

    /// Feature limits of a step.
    fn step_limits(&mut self, step: &str) -> Result<Limits, HostError>;

    /// All matrix rows, top of the matrix first.
    fn matrix_rows(&mut self) -> Result<Vec<MatrixRow>, HostError>;

    fn job_name(&self) -> &str;

    fn create_step(&mut self, name: &str) -> Result<(), HostError> {
        let job = self.job_name().to_string();
        self.execute(Command::CreateStep {
            job,
            name: name.to_string(),
        })
    }

    fn delete_step(&mut self, name: &str) -> Result<(), HostError> {
        let job = self.job_name().to_string();
        self.execute(Command::DeleteStep {
            job,
            name: name.to_string(),
        })
    }

    /// Open a step in the editor with no layers displayed.
    fn open_editor(&mut self, step: &str) -> Result<(), HostError> {
        let job = self.job_name().to_string();
        self.execute(Command::OpenEditor {
            job,
            step: step.to_string(),
        })?;
        self.execute(Command::ClearLayers)?;
        self.execute(Command::ZoomHome)
    }

    fn create_layer(&mut self, spec: LayerSpec) -> Result<(), HostError> {
        self.execute(Command::CreateLayer(spec))
    }

    fn delete_layer(&mut self, name: &str) -> Result<(), HostError> {
        self.execute(Command::DeleteLayer {
            name: name.to_string(),
        })
    }

    /// Make `layer` the only displayed, affected and work layer.
    fn work_on_layer(&mut self, layer: &str) -> Result<(), HostError> {
        self.execute(Command::ClearLayers)?;
        self.execute(Command::ClearAffected)?;
        self.execute(Command::DisplayLayer {
            name: layer.to_string(),
        })?;
        self.execute(Command::WorkLayer {
            name: layer.to_string(),
        })
    }

    fn add_pad(&mut self, pad: Pad) -> Result<(), HostError> {
        self.execute(Command::AddPad(pad))
    }

    fn add_line(&mut self, line: Line) -> Result<(), HostError> {
        self.execute(Command::AddLine(line))
    }

    fn add_text(&mut self, text: Text) -> Result<(), HostError> {
        self.execute(Command::AddText(text))
    }

    fn fill_step(&mut self, fill: StepFill) -> Result<(), HostError> {
        self.execute(Command::StepFill(fill))
    }

    fn clip_area(&mut self, clip: ClipArea) -> Result<(), HostError> {
        self.execute(Command::ClipArea(clip))
    }

    fn move_selection(&mut self, transfer: Transfer) -> Result<(), HostError> {
        self.execute(Command::MoveToLayer(transfer))
    }

    fn copy_selection(&mut self, transfer: Transfer) -> Result<(), HostError> {
        self.execute(Command::CopyToLayer(transfer))
    }

    /// Select the work layer's features drawn with any of `symbols`.
    fn select_symbols(&mut self, symbols: &[Symbol]) -> Result<(), HostError> {
        self.execute(Command::FilterReset)?;
        self.execute(Command::FilterSymbols {
            symbols: symbols.to_vec(),
        })?;
        self.execute(Command::FilterAreaStart)?;
        self.execute(Command::FilterSelect)
    }

    fn profile_rect(&mut self, rect: Rect) -> Result<(), HostError> {
        self.execute(Command::ProfileRect(rect))
    }

    fn profile_to_rout(&mut self, layer: &str, width: f64) -> Result<(), HostError> {
        self.execute(Command::ProfileToRout {
            layer: layer.to_string(),
            width,
        })
    }

    /// Copper layer names, top to bottom.
    fn copper_layer_names(&mut self) -> Result<Vec<String>, HostError> {
        let rows = self.matrix_rows()?;
        Ok(CopperStack::from_rows(&rows).names().to_vec())
    }

    fn outer_layers(&mut self) -> Result<Option<OuterLayers>, HostError> {
        let rows = self.matrix_rows()?;
        let stack = CopperStack::from_rows(&rows);
        Ok(match (stack.top(), stack.bottom()) {
            (Some(top), Some(bot)) => Some(OuterLayers {
                top: top.to_string(),
                bot: bot.to_string(),
            }),
            _ => None,
        })
    }
}
