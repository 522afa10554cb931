//! Host Command Language
//!
//! Typed form of the textual commands the CAM host accepts. Each [`Command`]
//! renders to exactly one command line through `Display`, e.g.
//!
//! ```text
//! add_pad,attributes=no,x=0.09,y=0.1,symbol=r12,polarity=positive,...
//! sr_fill,polarity=positive,step_margin_x=0.0035,...
//! ```
//!
//! Coordinates are inches, symbol sizes and margins mils.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::matrix::{LayerContext, LayerType, Polarity};

/// Feature types a clip acts on
const CLIP_FEAT_TYPES: &str = r"line\;pad\;surface\;arc\;text";

/// Format a coordinate or size without float noise (`0.09000000000000001` -> `0.09`).
///
/// Values are cut to 12 significant digits, well below any host resolution,
/// and printed in plain decimal.
pub fn fmt_num(value: f64) -> String {
    let trimmed: f64 = format!("{:.11e}", value).parse().unwrap_or(value);
    if trimmed == 0.0 {
        return "0".to_string();
    }
    trimmed.to_string()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Round symbol, diameter in mils
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Symbol(pub f64);

impl Symbol {
    pub fn diameter(&self) -> f64 {
        self.0
    }

    /// Parse `r<diameter>`.
    pub fn parse(name: &str) -> Option<Self> {
        name.strip_prefix('r')?.parse().ok().map(Symbol)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", fmt_num(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    pub x: f64,
    pub y: f64,
    pub symbol: Symbol,
    pub polarity: Polarity,
}

impl Pad {
    pub fn new(x: f64, y: f64, symbol: Symbol) -> Self {
        Self {
            x,
            y,
            symbol,
            polarity: Polarity::Positive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub xs: f64,
    pub ys: f64,
    pub xe: f64,
    pub ye: f64,
    pub symbol: Symbol,
    pub polarity: Polarity,
}

impl Line {
    pub fn new(start: (f64, f64), end: (f64, f64), symbol: Symbol) -> Self {
        Self {
            xs: start.0,
            ys: start.1,
            xe: end.0,
            ye: end.1,
            symbol,
            polarity: Polarity::Positive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub x_size: f64,
    pub y_size: f64,
    pub w_factor: f64,
    pub polarity: Polarity,
    pub mirror: bool,
    pub font: String,
}

/// New matrix layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name: String,
    pub layer_type: LayerType,
    pub context: LayerContext,
    pub polarity: Polarity,
}

impl LayerSpec {
    pub fn drill(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_type: LayerType::Drill,
            context: LayerContext::Board,
            polarity: Polarity::Positive,
        }
    }

    /// Positive misc scratch layer
    pub fn scratch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layer_type: LayerType::Signal,
            context: LayerContext::Misc,
            polarity: Polarity::Positive,
        }
    }
}

/// Step-and-repeat fill of the affected layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFill {
    pub polarity: Polarity,
    pub step_margin_x: f64,
    pub step_margin_y: f64,
}

/// Keep the affected layers' features outside a reference layer's rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipArea {
    pub ref_layer: String,
    pub margin: f64,
}

/// Move or copy the selection (or all features) to another layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub target_layer: String,
    pub invert: bool,
    pub size: f64,      // Resize in mils, positive grows
}

impl Transfer {
    pub fn to(target_layer: impl Into<String>) -> Self {
        Self {
            target_layer: target_layer.into(),
            invert: false,
            size: 0.0,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn resized(mut self, size: f64) -> Self {
        self.size = size;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// One host command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    CreateStep { job: String, name: String },
    DeleteStep { job: String, name: String },
    OpenEditor { job: String, step: String },
    ZoomHome,
    CreateLayer(LayerSpec),
    DeleteLayer { name: String },
    ClearLayers,
    ClearAffected,
    DisplayLayer { name: String },
    WorkLayer { name: String },
    AddPad(Pad),
    AddLine(Line),
    AddText(Text),
    StepFill(StepFill),
    ClipArea(ClipArea),
    MoveToLayer(Transfer),
    CopyToLayer(Transfer),
    FilterReset,
    FilterSymbols { symbols: Vec<Symbol> },
    FilterAreaStart,
    FilterSelect,
    ProfileRect(Rect),
    ProfileToRout { layer: String, width: f64 },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CreateStep { job, name } => write!(
                f,
                "create_entity,job={},name={},db=,is_fw=no,type=step,fw_type=form",
                job, name
            ),
            Command::DeleteStep { job, name } => {
                write!(f, "delete_entity,job={},type=step,name={}", job, name)
            }
            Command::OpenEditor { job, step } => {
                write!(f, "open_entity,job={},type=step,name={},iconic=no", job, step)
            }
            Command::ZoomHome => f.write_str("zoom_home"),
            Command::CreateLayer(spec) => write!(
                f,
                "create_layer,layer={},context={},type={},polarity={},ins_layer=",
                spec.name,
                spec.context.as_str(),
                spec.layer_type.as_str(),
                spec.polarity
            ),
            Command::DeleteLayer { name } => write!(f, "delete_layer,layer={}", name),
            Command::ClearLayers => f.write_str("clear_layers"),
            Command::ClearAffected => f.write_str("affected_layer,mode=all,affected=no"),
            Command::DisplayLayer { name } => {
                write!(f, "display_layer,name={},display=yes,number=1", name)
            }
            Command::WorkLayer { name } => write!(f, "work_layer,name={}", name),
            Command::AddPad(pad) => write!(
                f,
                "add_pad,attributes=no,x={},y={},symbol={},polarity={},angle=0,mirror=no,nx=1,ny=1,dx=0,dy=0,xscale=1,yscale=1",
                fmt_num(pad.x),
                fmt_num(pad.y),
                pad.symbol,
                pad.polarity
            ),
            Command::AddLine(line) => write!(
                f,
                "add_line,attributes=no,xs={},ys={},xe={},ye={},symbol={},polarity={},bus_num_lines=0,bus_dist_by=pitch,bus_distance=0,bus_reference=left",
                fmt_num(line.xs),
                fmt_num(line.ys),
                fmt_num(line.xe),
                fmt_num(line.ye),
                line.symbol,
                line.polarity
            ),
            Command::AddText(text) => write!(
                f,
                "add_text,attributes=no,type=string,x={},y={},text={},x_size={},y_size={},w_factor={},polarity={},angle=0,mirror={},fontname={},ver=1",
                fmt_num(text.x),
                fmt_num(text.y),
                text.text,
                fmt_num(text.x_size),
                fmt_num(text.y_size),
                fmt_num(text.w_factor),
                text.polarity,
                yes_no(text.mirror),
                text.font
            ),
            Command::StepFill(fill) => write!(
                f,
                "sr_fill,polarity={},step_margin_x={},step_margin_y={},step_max_dist_x=100,step_max_dist_y=100,sr_margin_x=0,sr_margin_y=0,sr_max_dist_x=0,sr_max_dist_y=0,nest_sr=yes,stop_at_steps=,consider_feat=no,consider_drill=no,consider_rout=no,dest=affected_layers,attributes=no",
                fill.polarity,
                fmt_num(fill.step_margin_x),
                fmt_num(fill.step_margin_y)
            ),
            Command::ClipArea(clip) => write!(
                f,
                "clip_area_end,layers_mode=affected_layers,layer=,area=reference,area_type=rectangle,inout=inside,contour_cut=yes,margin={},ref_layer={},feat_types={}",
                fmt_num(clip.margin),
                clip.ref_layer,
                CLIP_FEAT_TYPES
            ),
            Command::MoveToLayer(t) => write!(
                f,
                "sel_move_other,target_layer={},invert={},dx=0,dy=0,size={},x_anchor=0,y_anchor=0,rotation=0,mirror=none",
                t.target_layer,
                yes_no(t.invert),
                fmt_num(t.size)
            ),
            Command::CopyToLayer(t) => write!(
                f,
                "sel_copy_other,dest=layer_name,target_layer={},invert={},dx=0,dy=0,size={},x_anchor=0,y_anchor=0,rotation=0,mirror=none",
                t.target_layer,
                yes_no(t.invert),
                fmt_num(t.size)
            ),
            Command::FilterReset => f.write_str("filter_reset,filter_name=popup"),
            Command::FilterSymbols { symbols } => {
                let syms: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
                write!(
                    f,
                    "filter_set,filter_name=popup,update_popup=no,include_syms={}",
                    syms.join("\\;")
                )
            }
            Command::FilterAreaStart => f.write_str("filter_area_strt"),
            Command::FilterSelect => f.write_str(
                "filter_area_end,layer=,filter_name=popup,operation=select,area_type=none,inside_area=no,intersect_area=no",
            ),
            Command::ProfileRect(r) => write!(
                f,
                "profile_rect,x1={},y1={},x2={},y2={}",
                fmt_num(r.x1),
                fmt_num(r.y1),
                fmt_num(r.x2),
                fmt_num(r.y2)
            ),
            Command::ProfileToRout { layer, width } => {
                write!(f, "profile_to_rout,layer={},width={}", layer, fmt_num(*width))
            }
        }
    }
}
