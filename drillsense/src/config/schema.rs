//! Typed coupon configuration.
//!
//! Locations and offsets are in inches, symbol sizes and line widths in mils,
//! thieving margins in mils. Keys without a default must be present in the
//! merged configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::CouponError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouponConfig {
    pub coupon_name: String,
    pub pth_hole_lay_name: String,
    pub drill_sense_lay_name: String,

    pub pth_hole_x_location: f64,
    pub pth_hole_y_location: f64,
    pub pth_hole_size: f64,
    pub pth_hole_pad_size: f64,

    pub drill_sense_hole_size: f64,
    pub drill_sense_hole_pad_size: f64,
    pub drill_sense_x_location_offset: f64,
    pub drill_sense_y_location_offset: f64,
    pub connection_line_width: f64,

    pub text_x: f64,
    pub text_y: f64,
    pub text_width_w_factor: f64,
    pub font_type: String,

    #[serde(default = "default_backdrill_prefix")]
    pub backdrill_prefix: String,
    #[serde(default)]
    pub top_layer_name: Option<String>,     // Defaults to the first copper layer
    #[serde(default)]
    pub bot_layer_name: Option<String>,     // Defaults to the last copper layer
    #[serde(default = "default_top_mask")]
    pub top_mask_name: String,
    #[serde(default = "default_bot_mask")]
    pub bot_mask_name: String,

    #[serde(default = "default_outline_ref_layer")]
    pub outline_ref_layer: String,
    #[serde(default = "default_thieving_tmp_layer")]
    pub thieving_tmp_layer: String,
    #[serde(default = "default_thieving_step_margin")]
    pub thieving_step_margin: f64,
    #[serde(default = "default_thieving_ref_margin")]
    pub thieving_ref_margin: f64,
    #[serde(default = "default_thieving_self_margin")]
    pub thieving_self_margin: f64,
    #[serde(default = "default_thieving_rout_width")]
    pub thieving_rout_width: f64,
    #[serde(default = "default_mask_clearance")]
    pub mask_clearance: f64,

    #[serde(default = "default_profile_margin_x")]
    pub profile_margin_x: f64,
    #[serde(default = "default_profile_margin_y")]
    pub profile_margin_y: f64,

    #[serde(default = "default_top_text_x")]
    pub top_text_x: f64,
    #[serde(default = "default_side_text_y")]
    pub top_text_y: f64,
    #[serde(default = "default_bot_text_x")]
    pub bot_text_x: f64,
    #[serde(default = "default_side_text_y")]
    pub bot_text_y: f64,
}

fn default_backdrill_prefix() -> String {
    crate::backdrill::DEFAULT_BACKDRILL_PREFIX.to_string()
}

fn default_top_mask() -> String {
    "smt".to_string()
}

fn default_bot_mask() -> String {
    "smb".to_string()
}

fn default_outline_ref_layer() -> String {
    "epoxy".to_string()
}

fn default_thieving_tmp_layer() -> String {
    "thiev_tmp+++".to_string()
}

fn default_thieving_step_margin() -> f64 {
    0.0035
}

fn default_thieving_ref_margin() -> f64 {
    15.0
}

fn default_thieving_self_margin() -> f64 {
    7.0
}

fn default_thieving_rout_width() -> f64 {
    7.0
}

fn default_mask_clearance() -> f64 {
    5.0
}

fn default_profile_margin_x() -> f64 {
    0.025
}

fn default_profile_margin_y() -> f64 {
    0.010
}

fn default_top_text_x() -> f64 {
    0.0061
}

fn default_bot_text_x() -> f64 {
    0.118
}

fn default_side_text_y() -> f64 {
    0.101
}

impl CouponConfig {
    /// Convert a merged key/value map. A missing required key is reported by name.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, CouponError> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| CouponError::Config(e.to_string()))
    }

    /// Location of the drill-sense hole of the first span.
    pub fn first_sense_location(&self) -> (f64, f64) {
        (
            self.pth_hole_x_location + self.drill_sense_x_location_offset,
            self.pth_hole_y_location + self.drill_sense_y_location_offset,
        )
    }
}
