//! Plain-text rendering of sessions for the command line.

use std::fmt::Write;

use compute::FieldStatistics;
use layers::{LayerDescriptor, LayerSummary, RenderHost};
use runtime::{Message, Role};

use crate::view::{TableView, ViewState};

/// Render host that describes each presented stack as text, one line per
/// layer.
#[derive(Debug, Default)]
pub struct TextHost {
    out: String,
    /// Also list each cell's color.
    pub verbose: bool,
}

impl TextHost {
    pub fn new(verbose: bool) -> Self {
        Self {
            out: String::new(),
            verbose,
        }
    }

    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.out)
    }
}

impl RenderHost for TextHost {
    fn present(&mut self, layers: &[LayerDescriptor<'_>]) {
        for layer in layers {
            let summary = LayerSummary::of(layer);
            write_layer(&mut self.out, &summary, self.verbose);
        }
    }
}

pub fn write_layer(out: &mut String, layer: &LayerSummary, verbose: bool) {
    let _ = writeln!(
        out,
        "{:<14} visible={} opacity={:.2} line={:.1} cells={}{}",
        layer.kind.name(),
        layer.visible,
        layer.opacity,
        layer.line_width,
        layer.cells.len(),
        layer
            .backdrop
            .map(|c| format!(" backdrop={}", c.to_hex()))
            .unwrap_or_default(),
    );
    if verbose {
        for (id, color) in &layer.cells {
            let _ = writeln!(out, "  {id} {}", color.to_hex());
        }
    }
}

pub fn format_statistics(stats: &FieldStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "cells            {}", stats.cell_count);
    let _ = writeln!(out, "edited cells     {}", stats.edited_cells);
    let _ = writeln!(out, "total acres      {:.2}", stats.total_acres);
    let _ = writeln!(out, "projected yield  {:.0} bu", stats.total_projected_yield);
    if let Some(mean) = stats.mean_value {
        let _ = writeln!(out, "mean yield       {mean:.1} bu/ac");
    }
    if let Some((min, max)) = stats.value_range {
        let _ = writeln!(out, "yield range      {min:.1} - {max:.1} bu/ac");
    }
    out
}

pub fn format_message(message: &Message) -> String {
    let tag = match message.role {
        Role::User => ">",
        Role::Assistant => "<",
        Role::Error => "!",
    };
    format!("{tag} {}", message.text)
}

pub fn format_view(view: &ViewState) -> String {
    match view {
        ViewState::None => String::new(),
        ViewState::Map => "[map]\n".to_string(),
        ViewState::Table(table) => format_table(table),
        ViewState::Chart(chart) => {
            let mut out = format!("[chart] x={} y={}\n", chart.x.name, chart.y.name);
            for (x, y) in chart.points() {
                let _ = writeln!(out, "  {x}\t{y}");
            }
            out
        }
    }
}

fn format_table(table: &TableView) -> String {
    let mut out = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .map(|c| match table.unit(c) {
            Some(unit) => format!("{} ({unit})", table.label(c)),
            None => table.label(c).to_string(),
        })
        .collect();
    let _ = writeln!(out, "{}", header.join("\t"));
    for row in &table.rows {
        let cells: Vec<String> = table
            .columns
            .iter()
            .map(|c| match row.get(c) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("\t"));
    }
    out
}
