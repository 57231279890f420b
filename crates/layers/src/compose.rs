//! Layer composition: a pure function from field data and UI state to the
//! ordered layer stack.
//!
//! Stack order, bottom to top:
//! 1. base cells, colored by the active attribute (or application rate);
//! 2. the selected prescription pass, if any;
//! 3. when a highlight is active: a dimming backdrop, then the highlighted
//!    cells again at full color;
//! 4. painted edits, colored by their overridden value.

use scene::{
    Attribute, CellFeature, EditOverlayStore, HighlightSet, Nutrient, identity_for,
};
use tracing::debug;

use crate::layer::{CellFill, LayerDescriptor, LayerKind, LayerStyle, StrokePolicy};
use crate::symbology::{
    BACKDROP_COLOR, BASE_ALPHA, EMPHASIS_ALPHA, HOVER_COLOR, NO_DATA_COLOR, PRESCRIPTION_ALPHA,
    ScaleError, color_for, legend_for,
};

/// Property key carrying the application rate of a prescription zone.
pub const ZONE_RATE_KEY: &str = "rate";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OverlayMode {
    #[default]
    None,
    /// Color base cells by the nutrient's per-cell application rate.
    Application(Nutrient),
    /// Draw the nutrient's generated prescription zones above the base cells.
    Prescription(Nutrient),
}

/// Zones of one generated prescription pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionLayer {
    /// Field the zones were generated for; other fields never draw them.
    pub field: String,
    pub nutrient: Nutrient,
    pub zones: Vec<CellFeature>,
}

/// Everything the composer reads. Each field here is also represented in
/// [`UpdateTrigger`].
#[derive(Debug, Clone, Copy)]
pub struct ComposeInputs<'a> {
    pub field: &'a str,
    pub base: &'a [CellFeature],
    /// Bumped by the owner whenever `base` is replaced.
    pub base_revision: u64,
    pub highlight: &'a HighlightSet,
    pub overlay: &'a EditOverlayStore,
    pub hover: Option<&'a str>,
    pub attribute: Attribute,
    pub overlay_mode: OverlayMode,
    pub prescriptions: &'a [PrescriptionLayer],
    pub prescriptions_revision: u64,
    pub zoom: f64,
    pub stroke: StrokePolicy,
}

/// Snapshot of the composer inputs. Two compositions with equal triggers
/// produce identical stacks.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateTrigger {
    field: String,
    base_revision: u64,
    base_len: usize,
    highlight_revision: u64,
    overlay_revision: u64,
    overlay_len: usize,
    hover: Option<String>,
    attribute: Attribute,
    overlay_mode: OverlayMode,
    prescriptions_revision: u64,
    line_width: f32,
}

impl ComposeInputs<'_> {
    pub fn trigger(&self) -> UpdateTrigger {
        UpdateTrigger {
            field: self.field.to_string(),
            base_revision: self.base_revision,
            base_len: self.base.len(),
            highlight_revision: self.highlight.revision(),
            overlay_revision: self.overlay.revision(),
            overlay_len: self.overlay.len(),
            hover: self.hover.map(str::to_string),
            attribute: self.attribute,
            overlay_mode: self.overlay_mode,
            prescriptions_revision: self.prescriptions_revision,
            line_width: self.stroke.line_width(self.zoom),
        }
    }
}

pub fn compose_layers<'a>(inputs: &ComposeInputs<'a>) -> Result<Vec<LayerDescriptor<'a>>, ScaleError> {
    let line_width = inputs.stroke.line_width(inputs.zoom);
    let color_attribute = match inputs.overlay_mode {
        OverlayMode::Application(nutrient) => nutrient.application(),
        OverlayMode::None | OverlayMode::Prescription(_) => inputs.attribute,
    };
    let table = legend_for(color_attribute)?;

    let mut layers = Vec::with_capacity(5);

    let mut base = LayerDescriptor::new(LayerKind::Base, LayerStyle::new(true, 1.0, line_width));
    base.fills = inputs
        .base
        .iter()
        .map(|feature| {
            let identity = identity_for(feature);
            let value = feature.value(color_attribute);
            let color = if inputs.hover == Some(identity.as_str()) {
                HOVER_COLOR
            } else {
                value.map_or(NO_DATA_COLOR, |v| color_for(v, &table).with_alpha(BASE_ALPHA))
            };
            CellFill {
                identity,
                geometry: &feature.geometry,
                color,
                value,
            }
        })
        .collect();

    layers.push(base);

    if let OverlayMode::Prescription(nutrient) = inputs.overlay_mode {
        let pass = inputs
            .prescriptions
            .iter()
            .find(|p| p.nutrient == nutrient && p.field == inputs.field);
        match pass {
            Some(prescription) => layers.push(prescription_layer(prescription, line_width)?),
            None => debug!(
                field = inputs.field,
                pass = nutrient.pass_name(),
                "no prescription generated for field"
            ),
        }
    }

    if !inputs.highlight.is_empty() {
        let mut backdrop =
            LayerDescriptor::new(LayerKind::Backdrop, LayerStyle::new(true, 1.0, 0.0));
        backdrop.backdrop = Some(BACKDROP_COLOR);
        layers.push(backdrop);

        let mut highlight =
            LayerDescriptor::new(LayerKind::Highlight, LayerStyle::new(true, 1.0, line_width));
        highlight.fills = inputs
            .base
            .iter()
            .filter_map(|feature| {
                let identity = identity_for(feature);
                let hit = feature
                    .cell_id()
                    .is_some_and(|cell| inputs.highlight.contains(cell))
                    || inputs.highlight.contains(&identity);
                if !hit {
                    return None;
                }
                let value = feature.value(color_attribute);
                let color = if inputs.hover == Some(identity.as_str()) {
                    HOVER_COLOR
                } else {
                    value.map_or(NO_DATA_COLOR.with_alpha(EMPHASIS_ALPHA), |v| {
                        color_for(v, &table).with_alpha(EMPHASIS_ALPHA)
                    })
                };
                Some(CellFill {
                    identity,
                    geometry: &feature.geometry,
                    color,
                    value,
                })
            })
            .collect();
        layers.push(highlight);
    }

    if let Some(overlay) = overlay_layer(inputs, line_width)? {
        layers.push(overlay);
    }

    Ok(layers)
}

fn prescription_layer<'a>(
    prescription: &'a PrescriptionLayer,
    line_width: f32,
) -> Result<LayerDescriptor<'a>, ScaleError> {
    let table = legend_for(prescription.nutrient.application())?;
    let mut layer = LayerDescriptor::new(
        LayerKind::Prescription(prescription.nutrient),
        LayerStyle::new(true, 1.0, line_width),
    );
    layer.fills = prescription
        .zones
        .iter()
        .map(|zone| {
            let value = zone.properties.number(ZONE_RATE_KEY);
            let color = value.map_or(NO_DATA_COLOR, |v| {
                color_for(v, &table).with_alpha(PRESCRIPTION_ALPHA)
            });
            CellFill {
                identity: identity_for(zone),
                geometry: &zone.geometry,
                color,
                value,
            }
        })
        .collect();
    Ok(layer)
}

fn overlay_layer<'a>(
    inputs: &ComposeInputs<'a>,
    line_width: f32,
) -> Result<Option<LayerDescriptor<'a>>, ScaleError> {
    let overlay = inputs.overlay;
    if overlay.is_empty() {
        return Ok(None);
    }
    if overlay.field() != Some(inputs.field) {
        debug!(
            overlay_field = overlay.field().unwrap_or(""),
            field = inputs.field,
            "skipping edits bound to another field"
        );
        return Ok(None);
    }

    let on_attribute = inputs.attribute == overlay.attribute()
        && matches!(inputs.overlay_mode, OverlayMode::None);
    let style = if on_attribute {
        LayerStyle::new(true, 1.0, line_width)
    } else {
        LayerStyle::hidden()
    };

    let table = legend_for(overlay.attribute())?;
    let mut layer = LayerDescriptor::new(LayerKind::EditOverlay, style);
    layer.fills = overlay
        .entries()
        .map(|record| {
            let color = if inputs.hover == Some(record.feature_id.as_str()) {
                HOVER_COLOR
            } else {
                color_for(record.overridden_value, &table).with_alpha(EMPHASIS_ALPHA)
            };
            CellFill {
                identity: record.feature_id.clone(),
                geometry: &record.geometry,
                color,
                value: Some(record.overridden_value),
            }
        })
        .collect();
    Ok(Some(layer))
}
