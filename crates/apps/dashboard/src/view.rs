//! View-state controller: turns query answers into exactly one active view.
//!
//! ```text
//!  None ──► Map | Table | Chart ──► Map | Table | Chart ...
//!    ▲                                   │
//!    └──────────── clear_history ────────┘
//! ```
//!
//! A `map` answer also replaces the highlight set; `table` and `chart` answers
//! leave the map untouched. Failures (backend errors, malformed charts) are
//! logged to the conversation and leave the current view in place.

use layers::PrescriptionLayer;
use runtime::{Conversation, RequestSequencer, RequestTicket};
use scene::HighlightSet;
use serde_json::{Map, Value};
use streaming::{AnswerKind, ApiError, PrescriptionResponse, QueryResponse, Row, Series};
use tracing::{debug, info, warn};

use crate::error::ControllerError;

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    /// Column order of the first row.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub column_metadata: Option<Map<String, Value>>,
}

impl TableView {
    pub fn from_response(resp: &QueryResponse) -> Self {
        let columns = resp
            .results
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            columns,
            rows: resp.results.clone(),
            column_metadata: resp.column_metadata.clone(),
        }
    }

    /// Display label for `column`, from its metadata when present.
    pub fn label<'a>(&'a self, column: &'a str) -> &'a str {
        self.metadata_text(column, "label").unwrap_or(column)
    }

    pub fn unit(&self, column: &str) -> Option<&str> {
        self.metadata_text(column, "unit")
    }

    fn metadata_text(&self, column: &str, key: &str) -> Option<&str> {
        self.column_metadata
            .as_ref()?
            .get(column)?
            .get(key)?
            .as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartView {
    pub x: Series,
    pub y: Series,
}

impl ChartView {
    /// Series come from `scatter_plot_data` when the answer carries any,
    /// otherwise from the numeric columns of the rows. The first two are X/Y.
    pub fn from_response(resp: &QueryResponse) -> Result<Self, ControllerError> {
        let mut series = match &resp.scatter_plot_data {
            Some(data) if !data.series.is_empty() => data.series.clone(),
            _ => numeric_columns(&resp.results),
        };
        if series.len() < 2 {
            return Err(ControllerError::MalformedChart {
                found: series.len(),
            });
        }
        series.truncate(2);
        let y = series.pop();
        let x = series.pop();
        match (x, y) {
            (Some(x), Some(y)) => Ok(Self { x, y }),
            _ => Err(ControllerError::MalformedChart { found: 0 }),
        }
    }

    /// `(x, y)` pairs, truncated to the shorter series.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.x.values.iter().copied().zip(self.y.values.iter().copied())
    }
}

/// Columns whose value is a number in every row, in first-row order.
fn numeric_columns(rows: &[Row]) -> Vec<Series> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    first
        .keys()
        .filter_map(|column| {
            let values: Option<Vec<f64>> = rows
                .iter()
                .map(|row| row.get(column).and_then(Value::as_f64))
                .collect();
            values.map(|values| Series {
                name: column.clone(),
                values,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    None,
    Map,
    Table(TableView),
    Chart(ChartView),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ViewKind {
    None,
    Map,
    Table,
    Chart,
}

impl ViewState {
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewState::None => ViewKind::None,
            ViewState::Map => ViewKind::Map,
            ViewState::Table(_) => ViewKind::Table,
            ViewState::Chart(_) => ViewKind::Chart,
        }
    }
}

/// What applying a backend answer did.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Superseded or issued before a history clear; ignored entirely.
    Stale,
    Transitioned(ViewKind),
    /// Summary only; the view is unchanged.
    SummaryOnly,
    /// The answer asks for prescription maps; the caller should fetch them and
    /// hand the result to [`ViewStateController::apply_prescription`].
    NeedsPrescription { field_name: Option<String> },
    Failed(ControllerError),
}

#[derive(Debug, Default)]
pub struct ViewStateController {
    sequencer: RequestSequencer,
    conversation: Conversation,
    highlight: HighlightSet,
    view: ViewState,
    prescriptions: Vec<PrescriptionLayer>,
    prescriptions_revision: u64,
}

impl ViewStateController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn highlight(&self) -> &HighlightSet {
        &self.highlight
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    pub fn prescriptions(&self) -> &[PrescriptionLayer] {
        &self.prescriptions
    }

    pub fn prescriptions_revision(&self) -> u64 {
        self.prescriptions_revision
    }

    pub fn in_flight(&self) -> usize {
        self.sequencer.in_flight()
    }

    /// Logs the question and binds a ticket to it. An empty question is
    /// reported inline and never reaches the backend.
    pub fn submit(&mut self, question: &str) -> Result<RequestTicket, ControllerError> {
        let question = question.trim();
        if question.is_empty() {
            let err = ControllerError::EmptyQuestion;
            self.conversation.error(err.to_string(), None);
            return Err(err);
        }
        let ticket = self.sequencer.issue(question);
        self.conversation.user(question, Some(ticket.id));
        debug!(request = ticket.id.0, question, "question submitted");
        Ok(ticket)
    }

    /// Ticket for a prescription request not triggered by a question.
    pub fn request_prescription(&mut self, field_name: &str) -> RequestTicket {
        let question = format!("prescription map for {field_name}");
        let ticket = self.sequencer.issue(question.as_str());
        self.conversation.user(question, Some(ticket.id));
        ticket
    }

    pub fn apply_response(
        &mut self,
        ticket: &RequestTicket,
        result: Result<QueryResponse, ApiError>,
    ) -> Applied {
        let admission = self.sequencer.admit(ticket);
        self.sequencer.complete(ticket);
        if !admission.is_current() {
            debug!(request = ticket.id.0, ?admission, "discarding stale answer");
            return Applied::Stale;
        }

        let resp = match result {
            Ok(resp) => resp,
            Err(err) => return self.fail(ticket, ControllerError::Backend(err)),
        };

        if resp.wants_prescription() {
            self.log_summary(ticket, &resp);
            return Applied::NeedsPrescription {
                field_name: resp.field_name.clone(),
            };
        }

        let next = match resp.answer_kind() {
            None => {
                self.log_summary(ticket, &resp);
                return Applied::SummaryOnly;
            }
            Some(AnswerKind::Map) => {
                self.highlight.replace(resp.hex_ids.iter().map(String::as_str));
                ViewState::Map
            }
            Some(AnswerKind::Table) => ViewState::Table(TableView::from_response(&resp)),
            Some(AnswerKind::Chart) => match ChartView::from_response(&resp) {
                Ok(chart) => ViewState::Chart(chart),
                Err(err) => return self.fail(ticket, err),
            },
        };

        self.log_summary(ticket, &resp);
        self.transition(next)
    }

    /// Installs the prescription passes generated for `field_name` and forces
    /// the map view.
    pub fn apply_prescription(
        &mut self,
        ticket: &RequestTicket,
        field_name: &str,
        result: Result<PrescriptionResponse, ApiError>,
    ) -> Applied {
        self.sequencer.complete(ticket);
        if !self.sequencer.admit(ticket).is_current() {
            return Applied::Stale;
        }
        let resp = match result {
            Ok(resp) => resp,
            Err(err) => return self.fail(ticket, ControllerError::Backend(err)),
        };
        if !resp.success {
            return self.fail(ticket, ControllerError::PrescriptionRejected);
        }

        let mut layers = Vec::with_capacity(resp.prescription_maps.len());
        for map in &resp.prescription_maps {
            let Some(nutrient) = map.nutrient() else {
                warn!(pass = %map.pass, "skipping unknown prescription pass");
                continue;
            };
            match map.zones() {
                Ok(zones) => layers.push(PrescriptionLayer {
                    field: field_name.to_string(),
                    nutrient,
                    zones: zones.features,
                }),
                Err(err) => warn!(pass = %map.pass, error = %err, "skipping malformed prescription pass"),
            }
        }

        info!(field = field_name, passes = layers.len(), "prescription maps installed");
        self.conversation.assistant(
            format!("Created {} prescription passes.", layers.len()),
            Some(ticket.id),
        );
        self.prescriptions = layers;
        self.prescriptions_revision += 1;
        self.transition(ViewState::Map)
    }

    /// Records a failure that never produced a backend answer (for example no
    /// field to prescribe for).
    pub fn abandon(&mut self, ticket: &RequestTicket, err: ControllerError) -> Applied {
        self.sequencer.complete(ticket);
        self.fail(ticket, err)
    }

    /// Resets highlight, view, prescriptions and the conversation, and
    /// invalidates every outstanding request.
    pub fn clear_history(&mut self) {
        self.sequencer.clear();
        self.conversation.clear();
        self.highlight.clear();
        self.view = ViewState::None;
        if !self.prescriptions.is_empty() {
            self.prescriptions.clear();
            self.prescriptions_revision += 1;
        }
        info!("conversation history cleared");
    }

    fn transition(&mut self, next: ViewState) -> Applied {
        let kind = next.kind();
        if self.view.kind() != kind {
            debug!(from = ?self.view.kind(), to = ?kind, "view transition");
        }
        self.view = next;
        Applied::Transitioned(kind)
    }

    fn fail(&mut self, ticket: &RequestTicket, err: ControllerError) -> Applied {
        warn!(request = ticket.id.0, error = %err, "request failed");
        self.conversation.error(err.to_string(), Some(ticket.id));
        Applied::Failed(err)
    }

    fn log_summary(&mut self, ticket: &RequestTicket, resp: &QueryResponse) {
        let text = if resp.summary.trim().is_empty() {
            format!("Found {} results.", resp.count)
        } else {
            resp.summary.clone()
        };
        self.conversation.assistant(text, Some(ticket.id));
    }
}

#[cfg(test)]
mod tests {
    use super::{Applied, ChartView, TableView, ViewKind, ViewState, ViewStateController};
    use crate::error::ControllerError;
    use pretty_assertions::assert_eq;
    use runtime::Role;
    use serde_json::json;
    use streaming::{ApiError, PrescriptionResponse, QueryResponse};

    fn answer(body: serde_json::Value) -> QueryResponse {
        serde_json::from_value(body).unwrap()
    }

    fn map_answer(ids: &[&str]) -> QueryResponse {
        answer(json!({"summary": "ok", "view_type": "map", "hex_ids": ids}))
    }

    fn highlight_ids(c: &ViewStateController) -> Vec<String> {
        c.highlight().iter().map(str::to_string).collect()
    }

    #[test]
    fn map_answers_replace_the_highlight_set() {
        let mut c = ViewStateController::new();
        let t = c.submit("low phosphorus").unwrap();
        assert_eq!(
            c.apply_response(&t, Ok(map_answer(&["a", "b"]))),
            Applied::Transitioned(ViewKind::Map)
        );
        assert_eq!(highlight_ids(&c), vec!["a", "b"]);

        let t = c.submit("nothing matches").unwrap();
        c.apply_response(&t, Ok(map_answer(&[])));
        assert!(c.highlight().is_empty());
        assert_eq!(c.view(), &ViewState::Map);
    }

    #[test]
    fn table_answers_keep_rows_and_leave_the_map_alone() {
        let mut c = ViewStateController::new();
        let t = c.submit("low phosphorus").unwrap();
        c.apply_response(&t, Ok(map_answer(&["a"])));

        let t = c.submit("average yield per field").unwrap();
        let applied = c.apply_response(
            &t,
            Ok(answer(json!({
                "view_type": "table",
                "results": [{"field_name": "North", "avg_yield": 181.2}],
                "column_metadata": {"avg_yield": {"label": "Avg yield", "unit": "bu/ac"}}
            }))),
        );
        assert_eq!(applied, Applied::Transitioned(ViewKind::Table));
        let ViewState::Table(table) = c.view() else {
            panic!("expected table view");
        };
        assert_eq!(table.columns, vec!["field_name", "avg_yield"]);
        assert_eq!(table.label("avg_yield"), "Avg yield");
        assert_eq!(table.unit("avg_yield"), Some("bu/ac"));
        assert_eq!(table.label("field_name"), "field_name");
        assert_eq!(highlight_ids(&c), vec!["a"]);
    }

    #[test]
    fn chart_with_one_series_is_reported_without_transition() {
        let mut c = ViewStateController::new();
        let t = c.submit("average yield per field").unwrap();
        c.apply_response(&t, Ok(answer(json!({"view_type": "table", "results": []}))));

        let t = c.submit("yield vs nitrogen").unwrap();
        let applied = c.apply_response(
            &t,
            Ok(answer(json!({
                "view_type": "chart",
                "scatter_plot_data": {"series": [{"name": "yield_target", "values": [1.0, 2.0]}]}
            }))),
        );
        assert_eq!(applied, Applied::Failed(ControllerError::MalformedChart { found: 1 }));
        assert_eq!(c.view().kind(), ViewKind::Table);
        assert_eq!(c.conversation().last().unwrap().role, Role::Error);
    }

    #[test]
    fn chart_series_fall_back_to_numeric_columns() {
        let resp = answer(json!({
            "view_type": "chart",
            "results": [
                {"h3_index": "a", "yield_target": 150.0, "N_in_soil": 12},
                {"h3_index": "b", "yield_target": 190.0, "N_in_soil": 30}
            ]
        }));
        let chart = ChartView::from_response(&resp).unwrap();
        assert_eq!(chart.x.name, "yield_target");
        assert_eq!(chart.y.name, "N_in_soil");
        assert_eq!(chart.points().collect::<Vec<_>>(), vec![(150.0, 12.0), (190.0, 30.0)]);
    }

    #[test]
    fn summary_only_answers_keep_the_view() {
        let mut c = ViewStateController::new();
        let t = c.submit("hello").unwrap();
        assert_eq!(
            c.apply_response(&t, Ok(answer(json!({"summary": "Hi there"})))),
            Applied::SummaryOnly
        );
        assert_eq!(c.view(), &ViewState::None);
        assert_eq!(c.conversation().last().unwrap().text, "Hi there");
    }

    #[test]
    fn empty_question_is_reported_inline() {
        let mut c = ViewStateController::new();
        assert_eq!(c.submit("   ").unwrap_err(), ControllerError::EmptyQuestion);
        assert_eq!(c.conversation().last().unwrap().role, Role::Error);
        assert_eq!(c.in_flight(), 0);
    }

    #[test]
    fn backend_errors_leave_the_previous_view() {
        let mut c = ViewStateController::new();
        let t = c.submit("low phosphorus").unwrap();
        c.apply_response(&t, Ok(map_answer(&["a"])));

        let t = c.submit("broken").unwrap();
        let err = ApiError::Http {
            status: 400,
            message: "Query failed: syntax".into(),
        };
        assert!(matches!(c.apply_response(&t, Err(err)), Applied::Failed(_)));
        assert_eq!(c.view(), &ViewState::Map);
        assert_eq!(highlight_ids(&c), vec!["a"]);
        let last = c.conversation().last().unwrap();
        assert_eq!(last.role, Role::Error);
        assert!(last.text.contains("Query failed: syntax"));
    }

    #[test]
    fn late_answer_for_superseded_question_is_ignored() {
        let mut c = ViewStateController::new();
        let slow = c.submit("low phosphorus").unwrap();
        let fast = c.submit("average yield").unwrap();
        c.apply_response(&fast, Ok(answer(json!({"view_type": "table", "results": []}))));
        assert_eq!(c.apply_response(&slow, Ok(map_answer(&["a"]))), Applied::Stale);
        assert_eq!(c.view().kind(), ViewKind::Table);
        assert!(c.highlight().is_empty());
    }

    #[test]
    fn answer_arriving_after_clear_is_ignored() {
        let mut c = ViewStateController::new();
        let t = c.submit("low phosphorus").unwrap();
        c.clear_history();
        assert_eq!(c.apply_response(&t, Ok(map_answer(&["a"]))), Applied::Stale);
        assert_eq!(c.view(), &ViewState::None);
        assert!(c.conversation().messages().is_empty());
    }

    #[test]
    fn prescription_answers_force_the_map() {
        let mut c = ViewStateController::new();
        let t = c.submit("make a prescription map").unwrap();
        let applied = c.apply_response(
            &t,
            Ok(answer(json!({"intent": "prescription_map", "field_name": "North of Road"}))),
        );
        assert_eq!(
            applied,
            Applied::NeedsPrescription {
                field_name: Some("North of Road".into())
            }
        );

        let resp: PrescriptionResponse = serde_json::from_value(json!({
            "success": true,
            "prescription_maps": [
                {"pass": "nitrogen pass", "geojson": {"type": "FeatureCollection", "features": []}},
                {"pass": "sulfur pass", "geojson": {"type": "FeatureCollection", "features": []}}
            ]
        }))
        .unwrap();
        let before = c.prescriptions_revision();
        assert_eq!(
            c.apply_prescription(&t, "North of Road", Ok(resp)),
            Applied::Transitioned(ViewKind::Map)
        );
        assert_eq!(c.prescriptions().len(), 1);
        assert_eq!(c.prescriptions()[0].field, "North of Road");
        assert_eq!(c.prescriptions_revision(), before + 1);
    }

    #[test]
    fn rejected_prescription_keeps_previous_layers() {
        let mut c = ViewStateController::new();
        let t = c.request_prescription("North of Road");
        let resp = PrescriptionResponse::default();
        assert_eq!(
            c.apply_prescription(&t, "North of Road", Ok(resp)),
            Applied::Failed(ControllerError::PrescriptionRejected)
        );
        assert!(c.prescriptions().is_empty());
        assert_eq!(c.view(), &ViewState::None);
    }

    #[test]
    fn clear_history_resets_view_and_highlight() {
        let mut c = ViewStateController::new();
        let t = c.submit("low phosphorus").unwrap();
        c.apply_response(&t, Ok(map_answer(&["a", "b"])));
        c.clear_history();
        assert!(c.highlight().is_empty());
        assert_eq!(c.view(), &ViewState::None);
        assert!(c.conversation().messages().is_empty());
    }

    #[test]
    fn table_columns_follow_first_row() {
        let resp = answer(json!({"results": [{"b": 1, "a": 2}, {"a": 3, "b": 4, "c": 5}]}));
        assert_eq!(TableView::from_response(&resp).columns, vec!["b", "a"]);
    }
}
