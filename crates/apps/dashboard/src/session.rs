//! The dashboard session: loaded fields, UI selections, the edit overlay and
//! the view-state controller, wired to the layer composer.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use compute::analysis::nutrients::apply_recommendations;
use compute::{FieldStatistics, StatsKey, StatsStatus, StatsTicket, StatsTracker, aggregate};
use layers::{
    ComposeInputs, LayerStack, LayerSummary, OverlayMode, RenderHost, StrokePolicy,
    compose_layers,
};
use runtime::RequestTicket;
use scene::{Attribute, CellFeature, EditOverlayStore, FeatureCollection, Upsert, identity_for};
use streaming::{ApiError, PrescriptionResponse, QueryResponse};
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::error::{ControllerError, DashboardError};
use crate::paint::PaintGesture;
use crate::view::{Applied, ViewState, ViewStateController};

pub const DEFAULT_ZOOM: f64 = 15.0;

/// Base cells of one field, loaded once.
#[derive(Debug)]
pub struct FieldData {
    name: String,
    cells: Arc<Vec<CellFeature>>,
    /// Resolved identity and spatial index -> position in `cells`.
    index: BTreeMap<String, usize>,
    revision: u64,
}

impl FieldData {
    fn new(name: &str, cells: Vec<CellFeature>, revision: u64) -> Self {
        let mut index = BTreeMap::new();
        for (i, cell) in cells.iter().enumerate() {
            index.entry(identity_for(cell)).or_insert(i);
            if let Some(cell_id) = cell.cell_id() {
                index.entry(cell_id.to_string()).or_insert(i);
            }
        }
        Self {
            name: name.to_string(),
            cells: Arc::new(cells),
            index,
            revision,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cells(&self) -> &[CellFeature] {
        &self.cells
    }

    /// Looks a cell up by resolved identity or by spatial index.
    pub fn find(&self, id: &str) -> Option<&CellFeature> {
        self.index.get(id).and_then(|&i| self.cells.get(i))
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub hover: Option<String>,
    pub attribute: Attribute,
    pub overlay_mode: OverlayMode,
    pub zoom: f64,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            hover: None,
            attribute: Attribute::YieldTarget,
            overlay_mode: OverlayMode::None,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// A statistics computation detached from the session so it can run off the
/// paint path.
#[derive(Debug)]
pub struct StatsJob {
    ticket: StatsTicket,
    base: Arc<Vec<CellFeature>>,
    overlay: EditOverlayStore,
}

impl StatsJob {
    pub fn ticket(&self) -> StatsTicket {
        self.ticket
    }

    pub fn run(self) -> (StatsTicket, FieldStatistics) {
        (self.ticket, aggregate(&self.base, &self.overlay))
    }
}

#[derive(Debug)]
pub struct Dashboard {
    fields: BTreeMap<String, FieldData>,
    active: Option<String>,
    next_base_revision: u64,
    overlay: EditOverlayStore,
    editing: bool,
    gesture: PaintGesture,
    controller: ViewStateController,
    ui: UiState,
    stroke: StrokePolicy,
    stats: StatsTracker,
    layers: LayerStack,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(StrokePolicy::default())
    }
}

impl Dashboard {
    pub fn new(stroke: StrokePolicy) -> Self {
        Self {
            fields: BTreeMap::new(),
            active: None,
            next_base_revision: 1,
            overlay: EditOverlayStore::new(Attribute::YieldTarget),
            editing: false,
            gesture: PaintGesture::new(),
            controller: ViewStateController::new(),
            ui: UiState::default(),
            stroke,
            stats: StatsTracker::new(),
            layers: LayerStack::new(),
        }
    }

    /// Loads every configured field and selects the default one (or the first).
    pub fn from_config(config: &DashboardConfig) -> Result<Self, DashboardError> {
        let mut dashboard = Self::new(config.stroke_policy());
        for source in &config.fields {
            dashboard.load_field_file(&source.name, &source.path)?;
        }
        let initial = config
            .default_field
            .clone()
            .or_else(|| config.fields.first().map(|f| f.name.clone()));
        if let Some(name) = initial {
            dashboard.select_field(&name)?;
        }
        Ok(dashboard)
    }

    // ---- fields ----

    pub fn load_field(&mut self, name: &str, collection: FeatureCollection) -> usize {
        let revision = self.next_base_revision;
        self.next_base_revision += 1;
        let count = collection.len();
        self.fields
            .insert(name.to_string(), FieldData::new(name, collection.features, revision));
        info!(field = name, cells = count, "field loaded");
        count
    }

    pub fn load_field_file(&mut self, name: &str, path: &Path) -> Result<usize, DashboardError> {
        let text = std::fs::read_to_string(path).map_err(|source| DashboardError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let collection =
            FeatureCollection::from_json(&text).map_err(|source| DashboardError::Feature {
                field: name.to_string(),
                source,
            })?;
        Ok(self.load_field(name, collection))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.keys().map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&FieldData> {
        self.fields.get(name)
    }

    pub fn active_field(&self) -> Option<&FieldData> {
        self.active.as_deref().and_then(|name| self.fields.get(name))
    }

    fn active_data(&self) -> Result<&FieldData, DashboardError> {
        self.active_field().ok_or(DashboardError::NoActiveField)
    }

    /// Switches the field in view. Unsaved edits of the previous field are
    /// discarded; returns how many.
    pub fn select_field(&mut self, name: &str) -> Result<usize, DashboardError> {
        if !self.fields.contains_key(name) {
            return Err(DashboardError::UnknownField(name.to_string()));
        }
        let dropped = self.overlay.bind_field(name);
        if dropped > 0 {
            warn!(field = name, dropped, "field switch discarded unsaved edits");
        }
        self.gesture.release();
        self.ui.hover = None;
        self.active = Some(name.to_string());
        debug!(field = name, "field selected");
        Ok(dropped)
    }

    // ---- UI selections ----

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_attribute(&mut self, attribute: Attribute) {
        self.ui.attribute = attribute;
    }

    pub fn set_overlay_mode(&mut self, mode: OverlayMode) {
        self.ui.overlay_mode = mode;
    }

    pub fn set_hover(&mut self, identity: Option<&str>) {
        self.ui.hover = identity.map(str::to_string);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.ui.zoom = zoom;
    }

    // ---- editing ----

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn overlay(&self) -> &EditOverlayStore {
        &self.overlay
    }

    /// Enters edit mode on the active field and shows the editable attribute.
    pub fn enter_edit_mode(&mut self) -> Result<(), DashboardError> {
        self.active_data()?;
        self.editing = true;
        self.ui.attribute = self.overlay.attribute();
        self.ui.overlay_mode = OverlayMode::None;
        Ok(())
    }

    /// Leaves edit mode. Pending edits are discarded; returns how many.
    pub fn leave_edit_mode(&mut self) -> usize {
        self.gesture.release();
        self.editing = false;
        let dropped = self.overlay.len();
        self.overlay.clear();
        if dropped > 0 {
            info!(dropped, "edit mode left, unsaved edits discarded");
        }
        dropped
    }

    pub fn paint_press(&mut self, value: f64) -> Result<(), DashboardError> {
        if !self.editing {
            return Err(DashboardError::NotEditing);
        }
        self.gesture.press(value);
        Ok(())
    }

    /// Paints the cell under the pointer if a stroke is active. Cells outside
    /// the active field are ignored.
    pub fn paint_move(&mut self, cell: &str) -> Result<Option<Upsert>, DashboardError> {
        let Some(value) = self.gesture.value() else {
            return Ok(None);
        };
        let field = self
            .active
            .as_deref()
            .and_then(|name| self.fields.get(name))
            .ok_or(DashboardError::NoActiveField)?;
        let Some(feature) = field.find(cell) else {
            debug!(cell, "paint over unknown cell ignored");
            return Ok(None);
        };
        let identity = identity_for(feature);
        let upsert = self.overlay.upsert_with(feature, value, apply_recommendations);
        self.gesture.painted(&identity);
        Ok(Some(upsert))
    }

    /// Ends the stroke; returns the number of distinct cells it painted.
    pub fn paint_release(&mut self) -> usize {
        let touched = self.gesture.release();
        if touched > 0 {
            debug!(touched, overlay = self.overlay.len(), "paint stroke finished");
        }
        touched
    }

    /// One stroke over `cells`. Returns how many cells were painted.
    pub fn paint_cells<I, S>(&mut self, cells: I, value: f64) -> Result<usize, DashboardError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.paint_press(value)?;
        let mut painted = 0;
        for cell in cells {
            match self.paint_move(cell.as_ref()) {
                Ok(Some(_)) => painted += 1,
                Ok(None) => {}
                Err(err) => {
                    self.paint_release();
                    return Err(err);
                }
            }
        }
        self.paint_release();
        Ok(painted)
    }

    // ---- conversation ----

    pub fn controller(&self) -> &ViewStateController {
        &self.controller
    }

    pub fn view(&self) -> &ViewState {
        self.controller.view()
    }

    pub fn submit(&mut self, question: &str) -> Result<RequestTicket, ControllerError> {
        self.controller.submit(question)
    }

    pub fn apply_response(
        &mut self,
        ticket: &RequestTicket,
        result: Result<QueryResponse, ApiError>,
    ) -> Applied {
        self.controller.apply_response(ticket, result)
    }

    /// Ticket for a prescription request on `field_name`, or the active field.
    pub fn request_prescription(
        &mut self,
        field_name: Option<&str>,
    ) -> Result<(RequestTicket, String), ControllerError> {
        let field = match field_name {
            Some(name) => name.to_string(),
            None => self
                .active
                .clone()
                .ok_or(ControllerError::NoActiveField)?,
        };
        Ok((self.controller.request_prescription(&field), field))
    }

    pub fn apply_prescription(
        &mut self,
        ticket: &RequestTicket,
        field_name: &str,
        result: Result<PrescriptionResponse, ApiError>,
    ) -> Applied {
        self.controller.apply_prescription(ticket, field_name, result)
    }

    pub(crate) fn controller_mut(&mut self) -> &mut ViewStateController {
        &mut self.controller
    }

    /// Clears the conversation, highlight and view. The edit overlay survives.
    pub fn clear_history(&mut self) {
        self.controller.clear_history();
    }

    // ---- composition ----

    pub fn compose_inputs(&self) -> Result<ComposeInputs<'_>, DashboardError> {
        let field = self.active_data()?;
        Ok(ComposeInputs {
            field: &field.name,
            base: &field.cells,
            base_revision: field.revision,
            highlight: self.controller.highlight(),
            overlay: &self.overlay,
            hover: self.ui.hover.as_deref(),
            attribute: self.ui.attribute,
            overlay_mode: self.ui.overlay_mode,
            prescriptions: self.controller.prescriptions(),
            prescriptions_revision: self.controller.prescriptions_revision(),
            zoom: self.ui.zoom,
            stroke: self.stroke,
        })
    }

    pub fn compose(&self) -> Result<Vec<LayerSummary>, DashboardError> {
        let inputs = self.compose_inputs()?;
        let layers = compose_layers(&inputs)?;
        Ok(layers.iter().map(LayerSummary::of).collect())
    }

    /// Presents the layer stack to `host` if any composer input changed.
    pub fn render<H>(&mut self, host: &mut H) -> Result<bool, DashboardError>
    where
        H: RenderHost + ?Sized,
    {
        let mut stack = std::mem::take(&mut self.layers);
        let result = self
            .compose_inputs()
            .and_then(|inputs| stack.refresh(&inputs, host).map_err(DashboardError::from));
        self.layers = stack;
        result
    }

    pub fn compositions(&self) -> u64 {
        self.layers.compositions()
    }

    // ---- statistics ----

    pub fn stats_key(&self) -> Option<StatsKey> {
        let field = self.active_field()?;
        Some(StatsKey {
            field: field.name.clone(),
            base_revision: field.revision,
            overlay_revision: self.overlay.revision(),
        })
    }

    /// Starts a recompute if the field, its base cells or the overlay changed
    /// since the last one.
    pub fn begin_statistics(&mut self) -> Option<StatsJob> {
        let key = self.stats_key()?;
        if !self.stats.needs_recompute(&key) {
            return None;
        }
        let base = Arc::clone(&self.active_field()?.cells);
        let ticket = self.stats.begin(key);
        Some(StatsJob {
            ticket,
            base,
            overlay: self.overlay.clone(),
        })
    }

    /// Returns `false` if a newer computation has started since.
    pub fn finish_statistics(&mut self, ticket: StatsTicket, stats: FieldStatistics) -> bool {
        let accepted = self.stats.finish(ticket, stats);
        if !accepted {
            debug!(ticket = ticket.0, "stale statistics discarded");
        }
        accepted
    }

    pub fn stats_status(&self) -> &StatsStatus {
        self.stats.status()
    }

    /// Recomputes inline if needed and returns the current totals.
    pub fn statistics(&mut self) -> Result<FieldStatistics, DashboardError> {
        self.active_data()?;
        if let Some(job) = self.begin_statistics() {
            let (ticket, stats) = job.run();
            self.finish_statistics(ticket, stats);
        }
        self.stats
            .last_ready()
            .cloned()
            .ok_or_else(|| DashboardError::Statistics("no statistics computed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Dashboard;
    use crate::error::DashboardError;
    use layers::{LayerKind, OverlayMode, RecordingHost};
    use scene::{Attribute, CellFeature, FeatureCollection, Geometry, Nutrient, Properties, Upsert};

    fn cell(id: &str, lon: f64, yield_target: f64) -> CellFeature {
        let mut props = Properties::new();
        props.set_text("h3_index", id);
        props.set_attribute(Attribute::YieldTarget, yield_target);
        props.set_attribute(Attribute::SoilPhosphorus, 30.0);
        let ring = vec![[lon, 42.0], [lon + 0.001, 42.0], [lon + 0.001, 42.001], [lon, 42.001]];
        CellFeature::new(Geometry::polygon(ring), props)
    }

    fn dashboard() -> Dashboard {
        let mut d = Dashboard::default();
        d.load_field(
            "North of Road",
            FeatureCollection::new(vec![cell("a", -93.0, 150.0), cell("b", -92.9, 170.0)]),
        );
        d.load_field("South Pivot", FeatureCollection::new(vec![cell("s", -94.0, 160.0)]));
        d.select_field("North of Road").unwrap();
        d
    }

    #[test]
    fn painting_requires_edit_mode() {
        let mut d = dashboard();
        assert!(matches!(d.paint_press(200.0), Err(DashboardError::NotEditing)));
    }

    #[test]
    fn painting_applies_recommendations() {
        let mut d = dashboard();
        d.enter_edit_mode().unwrap();
        d.paint_press(200.0).unwrap();
        assert_eq!(d.paint_move("a").unwrap(), Some(Upsert::Inserted));
        assert_eq!(d.paint_move("a").unwrap(), Some(Upsert::Updated));
        assert_eq!(d.paint_move("zzz").unwrap(), None);
        // Unknown cells are not counted.
        assert_eq!(d.paint_release(), 1);

        let rec = d.overlay().get("a").unwrap();
        assert_eq!(rec.overridden_value, 200.0);
        // 200 bu/ac * 0.76 - 30 ppm in soil
        assert_eq!(rec.properties.attribute(Nutrient::Phosphorus.application()), Some(122.0));
    }

    #[test]
    fn switching_field_discards_edits() {
        let mut d = dashboard();
        d.enter_edit_mode().unwrap();
        d.paint_cells(["a", "b"], 210.0).unwrap();
        assert_eq!(d.select_field("South Pivot").unwrap(), 2);
        assert!(d.overlay().is_empty());
        assert!(matches!(
            d.select_field("Nowhere"),
            Err(DashboardError::UnknownField(_))
        ));
    }

    #[test]
    fn leaving_edit_mode_clears_overlay() {
        let mut d = dashboard();
        d.enter_edit_mode().unwrap();
        d.paint_cells(["a"], 210.0).unwrap();
        assert_eq!(d.leave_edit_mode(), 1);
        assert!(d.overlay().is_empty());
        assert!(!d.is_editing());
    }

    #[test]
    fn render_presents_only_on_change() {
        let mut d = dashboard();
        let mut host = RecordingHost::new();
        assert!(d.render(&mut host).unwrap());
        assert!(!d.render(&mut host).unwrap());

        d.set_hover(Some("a"));
        assert!(d.render(&mut host).unwrap());

        d.set_overlay_mode(OverlayMode::Application(Nutrient::Nitrogen));
        assert!(d.render(&mut host).unwrap());
        assert_eq!(host.frames().len(), 3);
        assert_eq!(host.last_frame().unwrap()[0].kind, LayerKind::Base);
    }

    #[test]
    fn statistics_follow_overlay_changes() {
        let mut d = dashboard();
        let before = d.statistics().unwrap();
        assert_eq!(before.cell_count, 2);
        assert!(d.begin_statistics().is_none());

        d.enter_edit_mode().unwrap();
        d.paint_cells(["a"], 300.0).unwrap();
        let job = d.begin_statistics().unwrap();
        assert!(d.stats_status() == &compute::StatsStatus::Calculating);
        let (ticket, stats) = job.run();
        assert!(d.finish_statistics(ticket, stats.clone()));
        assert_eq!(stats.edited_cells, 1);
        assert!(stats.total_projected_yield > before.total_projected_yield);
    }

    #[test]
    fn repaint_during_recompute_is_not_lost() {
        let mut d = dashboard();
        d.enter_edit_mode().unwrap();
        d.paint_cells(["a"], 150.0).unwrap();
        let first = d.begin_statistics().unwrap();

        d.paint_cells(["a"], 250.0).unwrap();
        let second = d.begin_statistics().unwrap();

        let (ticket, stats) = first.run();
        assert!(!d.finish_statistics(ticket, stats));
        let (ticket, stats) = second.run();
        assert!(d.finish_statistics(ticket, stats));

        let stats = d.statistics().unwrap();
        assert_eq!(stats.value_range, Some((170.0, 250.0)));
        assert_eq!(stats.edited_cells, 1);
    }

    #[test]
    fn compose_requires_a_field() {
        let d = Dashboard::default();
        assert!(matches!(d.compose(), Err(DashboardError::NoActiveField)));
    }
}
