//! Interactive scatter rendering of reduction results.
//!
//! Produces a standalone HTML page that pulls plotly.js from its CDN.
//! Storage of the rendered page lives in [`store`].

pub mod store;

pub use store::{Artifact, ArtifactStore, FsArtifactStore, MemoryArtifactStore};

use polars::prelude::*;
use serde_json::{json, Value};

use crate::error::{Result, VisualDataError};
use crate::frame::{any_value_as_str, any_value_to_json, is_numeric_dtype};
use crate::reduction::{ReductionResult, TargetDim};

pub const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
pub const DEFAULT_TITLE: &str = "Interactive Visualization";

/// Scatter plot page builder
#[derive(Debug, Clone)]
pub struct ScatterPlot {
    title: String,
    marker_size: u32,
}

impl Default for ScatterPlot {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn coordinates(result: &ReductionResult, name: &str) -> Result<Vec<Value>> {
    let column = result.frame.column(name)?;
    let values = column
        .f64()
        .map_err(|e| VisualDataError::Internal(e.to_string()))?;
    Ok(values.into_iter().map(|v| json!(v)).collect())
}

impl ScatterPlot {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            marker_size: 6,
        }
    }

    pub fn with_marker_size(mut self, size: u32) -> Self {
        self.marker_size = size;
        self
    }

    /// Full title: `<title> (<METHOD> <k>D)`.
    pub fn full_title(&self, result: &ReductionResult) -> String {
        format!("{} ({} {}D)", self.title, result.method.acronym(), result.dim.get())
    }

    fn base_trace(&self, result: &ReductionResult, axes: &[Vec<Value>], rows: &[usize]) -> Value {
        let three_d = result.dim == TargetDim::Three;
        let keys = result.frame.keys();
        let pick = |axis: &Vec<Value>| -> Vec<Value> { rows.iter().map(|&i| axis[i].clone()).collect() };
        let mut trace = json!({
            "type": if three_d { "scatter3d" } else { "scatter" },
            "mode": "markers",
            "x": pick(&axes[0]),
            "y": pick(&axes[1]),
            "text": rows.iter().map(|&i| keys[i].to_string()).collect::<Vec<_>>(),
            "hovertemplate": "%{text}<extra></extra>",
            "marker": { "size": if three_d { self.marker_size / 2 } else { self.marker_size } },
        });
        if three_d {
            trace["z"] = Value::Array(pick(&axes[2]));
        }
        trace
    }

    fn traces(&self, result: &ReductionResult) -> Result<Vec<Value>> {
        let axes = result
            .coordinate_columns
            .iter()
            .map(|c| coordinates(result, c))
            .collect::<Result<Vec<_>>>()?;
        let all_rows: Vec<usize> = (0..result.frame.height()).collect();

        let label = match &result.label_column {
            Some(label) => result.frame.column(label)?,
            None => return Ok(vec![self.base_trace(result, &axes, &all_rows)]),
        };

        if is_numeric_dtype(label.dtype()) {
            let colors: Vec<Value> = (0..label.len())
                .map(|i| label.get(i).map(|v| any_value_to_json(&v)).unwrap_or(Value::Null))
                .collect();
            let mut trace = self.base_trace(result, &axes, &all_rows);
            trace["marker"]["color"] = Value::Array(colors);
            trace["marker"]["colorscale"] = json!("Viridis");
            trace["marker"]["showscale"] = json!(true);
            trace["marker"]["colorbar"] = json!({ "title": { "text": label.name().as_str() } });
            return Ok(vec![trace]);
        }

        // One trace per category, in order of first appearance.
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for i in 0..label.len() {
            let name = match label.get(i) {
                Ok(AnyValue::Null) | Err(_) => "(missing)".to_string(),
                Ok(v) => any_value_as_str(&v).unwrap_or_else(|| v.to_string()),
            };
            match groups.iter_mut().find(|(g, _)| *g == name) {
                Some((_, rows)) => rows.push(i),
                None => groups.push((name, vec![i])),
            }
        }
        Ok(groups
            .into_iter()
            .map(|(name, rows)| {
                let mut trace = self.base_trace(result, &axes, &rows);
                trace["name"] = json!(name);
                trace
            })
            .collect())
    }

    fn layout(&self, result: &ReductionResult) -> Value {
        let cols = &result.coordinate_columns;
        let mut layout = json!({
            "title": { "text": self.full_title(result) },
            "legend": { "title": { "text": result.label_column.clone().unwrap_or_default() } },
            "margin": { "l": 40, "r": 20, "t": 60, "b": 40 },
        });
        if result.dim == TargetDim::Three {
            layout["scene"] = json!({
                "xaxis": { "title": { "text": cols[0] } },
                "yaxis": { "title": { "text": cols[1] } },
                "zaxis": { "title": { "text": cols[2] } },
            });
        } else {
            layout["xaxis"] = json!({ "title": { "text": cols[0] } });
            layout["yaxis"] = json!({ "title": { "text": cols[1] } });
        }
        layout
    }

    /// Render a standalone HTML page.
    pub fn render(&self, result: &ReductionResult) -> Result<String> {
        if result.coordinate_columns.len() != result.dim.get() {
            return Err(VisualDataError::Internal(format!(
                "{} coordinate columns for a {}D plot",
                result.coordinate_columns.len(),
                result.dim.get()
            )));
        }
        let traces = Value::Array(self.traces(result)?);
        // "</" would close the script element early.
        let data = traces.to_string().replace("</", "<\\/");
        let layout = self.layout(result).to_string().replace("</", "<\\/");
        let title = escape_html(&self.full_title(result));

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="plot" style="width:100%;height:100vh;"></div>
<script>
Plotly.newPlot("plot", {data}, {layout}, {{"responsive": true}});
</script>
</body>
</html>
"#,
            title = title,
            cdn = PLOTLY_CDN,
            data = data,
            layout = layout,
        ))
    }
}
