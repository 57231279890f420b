//! Boundary between the composer and whatever draws the layers.
//!
//! The engine hands a freshly composed stack to a [`RenderHost`]; hosts own
//! the drawing surface and never feed anything back into composition. Tests
//! and the CLI use [`RecordingHost`], which keeps a summary of every frame.

use foundation::Rgba;
use tracing::debug;

use crate::compose::{ComposeInputs, UpdateTrigger, compose_layers};
use crate::layer::{LayerDescriptor, LayerKind};
use crate::symbology::ScaleError;

pub trait RenderHost {
    fn present(&mut self, layers: &[LayerDescriptor<'_>]);
}

/// Recomposes and presents only when the update trigger changes.
#[derive(Debug, Default)]
pub struct LayerStack {
    last: Option<UpdateTrigger>,
    compositions: u64,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a new stack was presented.
    ///
    /// A failed composition leaves the previous trigger in place so the next
    /// call tries again.
    pub fn refresh<H>(&mut self, inputs: &ComposeInputs<'_>, host: &mut H) -> Result<bool, ScaleError>
    where
        H: RenderHost + ?Sized,
    {
        let trigger = inputs.trigger();
        if self.last.as_ref() == Some(&trigger) {
            return Ok(false);
        }
        let layers = compose_layers(inputs)?;
        host.present(&layers);
        self.compositions += 1;
        debug!(
            layers = layers.len(),
            compositions = self.compositions,
            "layer stack recomposed"
        );
        self.last = Some(trigger);
        Ok(true)
    }

    /// Forces the next `refresh` to recompose.
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn compositions(&self) -> u64 {
        self.compositions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub kind: LayerKind,
    pub visible: bool,
    pub opacity: f32,
    pub line_width: f32,
    pub backdrop: Option<Rgba>,
    pub cells: Vec<(String, Rgba)>,
}

impl LayerSummary {
    pub fn of(layer: &LayerDescriptor<'_>) -> Self {
        Self {
            kind: layer.kind,
            visible: layer.style.visible,
            opacity: layer.style.opacity,
            line_width: layer.style.line_width,
            backdrop: layer.backdrop,
            cells: layer
                .fills
                .iter()
                .map(|f| (f.identity.clone(), f.color))
                .collect(),
        }
    }
}

/// Headless host that records a summary of each presented stack.
#[derive(Debug, Default)]
pub struct RecordingHost {
    frames: Vec<Vec<LayerSummary>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<LayerSummary>] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&[LayerSummary]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl RenderHost for RecordingHost {
    fn present(&mut self, layers: &[LayerDescriptor<'_>]) {
        self.frames.push(layers.iter().map(LayerSummary::of).collect());
    }
}
