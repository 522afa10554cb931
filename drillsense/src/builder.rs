//! Coupon Builder
//!
//! Issues the fixed sequence of host operations that draws a depth-sensing
//! backdrill coupon:
//!
//! 1. recreate the coupon step and the PTH / drill-sense layers, place the
//!    clamping hole and its pad on every copper layer;
//! 2. for each backdrill span, place a drill-sense hole, a numbered pad on the
//!    start layer and a pad with a connection back to the clamping hole on the
//!    must-not-cut layer;
//! 3. label the outer layers, draw the profile, thieve the inner layers and
//!    open the mask over the coupon pads.
//!
//! Layers a job does not have are skipped and listed in the [`BuildReport`].
//! The step and the thieving scratch layer are deleted before they are
//! created, so a rerun replaces the previous coupon instead of adding to it.

use crate::backdrill::{BackdrillSpan, SpanResolver};
use crate::config::CouponConfig;
use crate::core::{BuildReport, CouponError, JobContext, SkipReason, SkippedLayer};
use crate::host::{
    CamHost, ClipArea, LayerSpec, Line, OuterLayers, Pad, Rect, StepFill, Symbol, Text, Transfer,
};
use crate::matrix::Polarity;

pub struct CouponBuilder<H: CamHost> {
    host: H,
    config: CouponConfig,
    context: JobContext,
    report: BuildReport,
}

impl<H: CamHost> CouponBuilder<H> {
    pub fn new(host: H, config: CouponConfig, context: JobContext) -> Self {
        tracing::info!(
            "Job: {}, Site: {}, Coupon Step Name: {}",
            context.job_name,
            context.site.as_deref().unwrap_or("-"),
            config.coupon_name
        );
        tracing::info!("Configuration Loaded: {:?}", config);

        let report = BuildReport::new(&context, config.coupon_name.clone());
        Self {
            host,
            config,
            context,
            report,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn config(&self) -> &CouponConfig {
        &self.config
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Build the whole coupon.
    pub fn run(&mut self) -> Result<BuildReport, CouponError> {
        self.report = BuildReport::new(&self.context, self.config.coupon_name.clone());
        self.add_clamping_hole_features()?;
        self.add_drill_sense_features()?;
        tracing::info!(
            "Coupon {} built with {} spans ({} layers skipped)",
            self.config.coupon_name,
            self.report.spans.len(),
            self.report.skipped.len()
        );
        Ok(self.report.clone())
    }

    /// Recreate the coupon step and place the clamping hole.
    pub fn add_clamping_hole_features(&mut self) -> Result<(), CouponError> {
        let step = self.config.coupon_name.clone();
        if self.host.step_exists(&step)? {
            tracing::info!("Replacing existing coupon step {}", step);
            self.host.delete_step(&step)?;
        }
        self.host.create_step(&step)?;
        self.host.open_editor(&step)?;

        for layer in [
            self.config.pth_hole_lay_name.clone(),
            self.config.drill_sense_lay_name.clone(),
        ] {
            if !self.host.layer_exists(&layer)? {
                self.host.create_layer(LayerSpec::drill(layer))?;
            }
        }

        let location = (self.config.pth_hole_x_location, self.config.pth_hole_y_location);
        self.host.work_on_layer(&self.config.pth_hole_lay_name)?;
        self.host
            .add_pad(Pad::new(location.0, location.1, Symbol(self.config.pth_hole_size)))?;

        for layer in self.host.copper_layer_names()? {
            if layer.is_empty() || !self.host.layer_exists(&layer)? {
                continue;
            }
            self.host.work_on_layer(&layer)?;
            self.host
                .add_pad(Pad::new(location.0, location.1, Symbol(self.config.pth_hole_pad_size)))?;
        }
        Ok(())
    }

    /// Backdrill spans of the job, in matrix order.
    pub fn resolve_spans(&mut self) -> Result<Vec<BackdrillSpan>, CouponError> {
        let rows = self.host.matrix_rows()?;
        let spans = SpanResolver::new(&rows)
            .with_prefix(self.config.backdrill_prefix.clone())
            .resolve();
        Ok(spans)
    }

    /// Place the per-span drill-sense features, then finish the coupon.
    pub fn add_drill_sense_features(&mut self) -> Result<(), CouponError> {
        let spans = self.resolve_spans()?;
        let (mut x, y) = self.config.first_sense_location();

        for (i, span) in spans.iter().enumerate() {
            let count = i + 1;
            self.host.work_on_layer(&self.config.drill_sense_lay_name)?;
            self.host
                .add_pad(Pad::new(x, y, Symbol(self.config.drill_sense_hole_size)))?;

            if let Some(layer) = self.usable_layer(span, "start", span.drl_start.as_deref())? {
                let pad = self.sense_pad(x, y);
                self.host.work_on_layer(&layer)?;
                self.host.add_pad(pad)?;
                let label = self.text(
                    x - self.config.text_x / 3.0,
                    self.config.drill_sense_y_location_offset / 2.0,
                    &count.to_string(),
                    false,
                );
                self.host.add_text(label)?;
            }

            if let Some(layer) = self.usable_layer(span, "must_not_cut", span.drl_mnc.as_deref())? {
                let pth = (self.config.pth_hole_x_location, self.config.pth_hole_y_location);
                let width = Symbol(self.config.connection_line_width);
                let pad = self.sense_pad(x, y);
                self.host.work_on_layer(&layer)?;
                self.host.add_pad(pad)?;
                self.host.add_line(Line::new((x, y), (x, pth.1), width))?;
                self.host.add_line(Line::new((x, pth.1), pth, width))?;
            }

            x += self.config.drill_sense_x_location_offset;
        }
        self.report.spans = spans;

        let outer = self.label_layers()?;
        if let Some(outer) = &outer {
            let (top_x, top_y) = (self.config.top_text_x, self.config.top_text_y);
            let (bot_x, bot_y) = (self.config.bot_text_x, self.config.bot_text_y);
            self.add_top_bot_text(&outer.top, "TOP", top_x, top_y, false)?;
            self.add_top_bot_text(&outer.bot, "BOT", bot_x, bot_y, true)?;
        }

        self.add_profile()?;
        self.add_thieving()?;

        if let Some(outer) = &outer {
            let top_mask = self.config.top_mask_name.clone();
            let bot_mask = self.config.bot_mask_name.clone();
            self.add_mask_openings(&outer.top, &top_mask)?;
            self.add_mask_openings(&outer.bot, &bot_mask)?;
            if self.host.layer_exists(&outer.top)? {
                self.host.work_on_layer(&outer.top)?;
            }
        }
        Ok(())
    }

    /// Label and mask-opening layers: configured names first, then the
    /// outer copper of the matrix.
    fn label_layers(&mut self) -> Result<Option<OuterLayers>, CouponError> {
        let detected = self.host.outer_layers()?;
        let top = self
            .config
            .top_layer_name
            .clone()
            .or_else(|| detected.as_ref().map(|o| o.top.clone()));
        let bot = self
            .config
            .bot_layer_name
            .clone()
            .or_else(|| detected.as_ref().map(|o| o.bot.clone()));
        Ok(match (top, bot) {
            (Some(top), Some(bot)) => Some(OuterLayers { top, bot }),
            _ => None,
        })
    }

    /// Check a span layer, recording it in the report when it is unusable.
    fn usable_layer(
        &mut self,
        span: &BackdrillSpan,
        role: &str,
        layer: Option<&str>,
    ) -> Result<Option<String>, CouponError> {
        let reason = match layer {
            None => SkipReason::Unresolved,
            Some(name) => {
                if self.host.layer_exists(name)? {
                    return Ok(Some(name.to_string()));
                }
                SkipReason::Missing
            }
        };

        tracing::debug!("Span {}: skipping {} layer {:?} ({:?})", span.name, role, layer, reason);
        self.report.skipped.push(SkippedLayer {
            span: span.name.clone(),
            role: role.to_string(),
            layer: layer.map(str::to_string),
            reason,
        });
        Ok(None)
    }

    fn sense_pad(&self, x: f64, y: f64) -> Pad {
        Pad::new(x, y, Symbol(self.config.drill_sense_hole_pad_size))
    }

    fn text(&self, x: f64, y: f64, text: &str, mirror: bool) -> Text {
        Text {
            x,
            y,
            text: text.to_string(),
            x_size: self.config.text_x,
            y_size: self.config.text_y,
            w_factor: self.config.text_width_w_factor,
            polarity: Polarity::Positive,
            mirror,
            font: self.config.font_type.clone(),
        }
    }

    /// Side label on an outer layer. Returns `false` when the layer is absent.
    pub fn add_top_bot_text(
        &mut self,
        layer: &str,
        label: &str,
        x: f64,
        y: f64,
        mirror: bool,
    ) -> Result<bool, CouponError> {
        if !self.host.layer_exists(layer)? {
            tracing::debug!("No layer {} for {} label", layer, label);
            return Ok(false);
        }
        self.host.work_on_layer(layer)?;
        let text = self.text(x, y, label, mirror);
        self.host.add_text(text)?;
        Ok(true)
    }

    /// Profile around everything drawn so far, plus margin.
    pub fn add_profile(&mut self) -> Result<(), CouponError> {
        let limits = self.host.step_limits(&self.config.coupon_name)?;
        self.host.profile_rect(Rect {
            x1: 0.0,
            y1: 0.0,
            x2: limits.xmax + self.config.profile_margin_x,
            y2: limits.ymax + self.config.profile_margin_y,
        })?;
        Ok(())
    }

    /// Copper thieving on every inner layer.
    ///
    /// Fill is drawn on a scratch layer, clipped clear of the outline, the
    /// drill-sense holes and the layer's own features, then moved onto the
    /// layer. Negative layers additionally get a routed isolation channel
    /// around the profile. Inner and outer follow the matrix copper stack.
    pub fn add_thieving(&mut self) -> Result<(), CouponError> {
        let outer = self.host.outer_layers()?;
        let tmp = self.config.thieving_tmp_layer.clone();
        if self.host.layer_exists(&tmp)? {
            self.host.delete_layer(&tmp)?;
        }
        self.host.create_layer(LayerSpec::scratch(tmp.clone()))?;
        self.host.work_on_layer(&tmp)?;

        let fill = StepFill {
            polarity: Polarity::Positive,
            step_margin_x: self.config.thieving_step_margin,
            step_margin_y: self.config.thieving_step_margin,
        };

        for layer in self.host.copper_layer_names()? {
            if layer.is_empty() || !self.host.layer_exists(&layer)? {
                continue;
            }
            if outer.as_ref().is_some_and(|o| o.top == layer || o.bot == layer) {
                continue;
            }

            self.host.fill_step(fill.clone())?;
            let clips = [
                (self.config.outline_ref_layer.clone(), self.config.thieving_ref_margin),
                (self.config.drill_sense_lay_name.clone(), self.config.thieving_ref_margin),
                (layer.clone(), self.config.thieving_self_margin),
            ];
            for (ref_layer, margin) in clips {
                if !self.host.layer_exists(&ref_layer)? {
                    tracing::debug!("No clip reference layer {}", ref_layer);
                    continue;
                }
                self.host.clip_area(ClipArea { ref_layer, margin })?;
            }
            self.host.move_selection(Transfer::to(layer.clone()))?;

            if self.host.layer_polarity(&layer)? == Polarity::Negative {
                self.host.fill_step(fill.clone())?;
                self.host.work_on_layer(&layer)?;
                self.host.move_selection(Transfer::to(tmp.clone()).inverted())?;
                self.host.work_on_layer(&tmp)?;
                self.host.profile_to_rout(&tmp, self.config.thieving_rout_width)?;
                self.host.move_selection(Transfer::to(layer.clone()))?;
            }

            self.report.thieved_layers.push(layer);
        }

        self.host.delete_layer(&tmp)?;
        Ok(())
    }

    /// Copy the coupon pads of `cu_layer` onto `mask_layer` with clearance.
    /// Returns `false` without touching the job when either layer is absent.
    pub fn add_mask_openings(&mut self, cu_layer: &str, mask_layer: &str) -> Result<bool, CouponError> {
        if !self.host.layer_exists(cu_layer)? || !self.host.layer_exists(mask_layer)? {
            return Ok(false);
        }
        self.host.work_on_layer(cu_layer)?;
        self.host.select_symbols(&[
            Symbol(self.config.pth_hole_pad_size),
            Symbol(self.config.drill_sense_hole_pad_size),
        ])?;
        self.host
            .copy_selection(Transfer::to(mask_layer).resized(self.config.mask_clearance))?;
        self.report.mask_openings.push(mask_layer.to_string());
        Ok(true)
    }
}
