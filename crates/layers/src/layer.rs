use foundation::Rgba;
use scene::{Geometry, Nutrient};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct LayerId(pub u64);

/// Role of a layer in the composed stack. Also fixes its stable id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Base,
    Prescription(Nutrient),
    Backdrop,
    Highlight,
    EditOverlay,
}

impl LayerKind {
    pub fn id(self) -> LayerId {
        LayerId(match self {
            LayerKind::Base => 1,
            LayerKind::Prescription(Nutrient::Nitrogen) => 10,
            LayerKind::Prescription(Nutrient::Phosphorus) => 11,
            LayerKind::Prescription(Nutrient::Potassium) => 12,
            LayerKind::Backdrop => 20,
            LayerKind::Highlight => 21,
            LayerKind::EditOverlay => 30,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Base => "base",
            LayerKind::Prescription(_) => "prescription",
            LayerKind::Backdrop => "backdrop",
            LayerKind::Highlight => "highlight",
            LayerKind::EditOverlay => "edit-overlay",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayerStyle {
    pub visible: bool,
    pub opacity: f32,
    /// Outline width in pixels; `0.0` hides outlines.
    pub line_width: f32,
    pub line_color: Rgba,
}

impl LayerStyle {
    pub const fn new(visible: bool, opacity: f32, line_width: f32) -> Self {
        Self {
            visible,
            opacity,
            line_width,
            line_color: Rgba::WHITE,
        }
    }

    pub const fn hidden() -> Self {
        Self::new(false, 0.0, 0.0)
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self::new(true, 1.0, 1.0)
    }
}

/// Outline width as a function of map zoom. Width steps once per whole zoom
/// level so small zoom changes do not force a recomposition.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StrokePolicy {
    /// Below this zoom outlines are not drawn at all.
    pub min_zoom: f64,
    pub width_per_zoom: f32,
    pub max_width: f32,
}

impl StrokePolicy {
    pub fn line_width(&self, zoom: f64) -> f32 {
        if !(zoom >= self.min_zoom) {
            return 0.0;
        }
        let steps = (zoom - self.min_zoom).floor() as f32 + 1.0;
        (steps * self.width_per_zoom).min(self.max_width)
    }
}

impl Default for StrokePolicy {
    fn default() -> Self {
        Self {
            min_zoom: 14.0,
            width_per_zoom: 0.5,
            max_width: 3.0,
        }
    }
}

/// One cell drawn by a layer.
#[derive(Debug, Clone, PartialEq)]
pub struct CellFill<'a> {
    pub identity: String,
    pub geometry: &'a Geometry,
    pub color: Rgba,
    /// Attribute value behind `color`, when the cell had one.
    pub value: Option<f64>,
}

/// Render description for one layer. Produced fresh on every composition and
/// never mutated by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor<'a> {
    pub id: LayerId,
    pub kind: LayerKind,
    pub style: LayerStyle,
    /// Full-canvas fill drawn before any cells.
    pub backdrop: Option<Rgba>,
    pub fills: Vec<CellFill<'a>>,
}

impl<'a> LayerDescriptor<'a> {
    pub fn new(kind: LayerKind, style: LayerStyle) -> Self {
        Self {
            id: kind.id(),
            kind,
            style,
            backdrop: None,
            fills: Vec::new(),
        }
    }

    pub fn fill(&self, identity: &str) -> Option<&CellFill<'a>> {
        self.fills.iter().find(|f| f.identity == identity)
    }
}
