//! Vega-Lite JSON writer implementation
//!
//! Converts bound charts into Vega-Lite v6 specifications.
//!
//! # Mapping Strategy
//!
//! - `Mark` → Vega-Lite mark type
//! - `Channel` bindings → Vega-Lite encoding channels
//! - value labels (`Channel::Text`) → a second `text` layer
//! - `Channel::Facet` → wrapped facet with `columns`
//! - Polars DataFrame → inline named dataset
//!
//! # Example
//!
//! ```rust,ignore
//! use salesviz::writer::{VegaLiteWriter, Writer};
//!
//! let writer = VegaLiteWriter::new();
//! let vega_json = writer.write(&chart)?;
//! // Can be rendered in browser with vega-embed
//! ```

use crate::chart::{Channel, Chart, Encoding, FieldType, Mark};
use crate::naming;
use crate::table::dataframe_to_values;
use crate::writer::Writer;
use crate::{DataFrame, Result, SalesvizError};
use polars::prelude::*;
use serde_json::{json, Map, Value};

const CHART_WIDTH: u32 = 720;
const CHART_HEIGHT: u32 = 400;
const PANEL_WIDTH: u32 = 240;
const PANEL_HEIGHT: u32 = 200;

/// Vega-Lite JSON writer
///
/// Generates Vega-Lite v6 specifications from charts.
pub struct VegaLiteWriter {
    /// Vega-Lite schema version
    schema: String,
}

impl VegaLiteWriter {
    /// Create a new Vega-Lite writer with default settings
    pub fn new() -> Self {
        Self {
            schema: "https://vega.github.io/schema/vega-lite/v6.json".to_string(),
        }
    }

    fn mark(&self, chart: &Chart) -> Value {
        let mut mark = json!({ "type": chart.spec.mark.as_str() });
        match chart.spec.mark {
            Mark::Line => mark["point"] = json!(true),
            Mark::Point => mark["filled"] = json!(true),
            Mark::Bar | Mark::Arc => {}
        }
        if let Some(opacity) = chart.spec.opacity {
            mark["opacity"] = json!(opacity);
        }
        mark
    }

    /// Infer Vega-Lite field type from DataFrame column
    fn infer_field_type(&self, df: &DataFrame, field: &str) -> FieldType {
        match df.column(field).map(|c| c.dtype().clone()) {
            Ok(dtype) if dtype.is_primitive_numeric() => FieldType::Quantitative,
            Ok(DataType::Date) | Ok(DataType::Datetime(_, _)) => FieldType::Temporal,
            _ => FieldType::Nominal,
        }
    }

    /// Explicit type, else ordinal for explicitly ordered fields, else inferred
    fn field_type(&self, chart: &Chart, encoding: &Encoding) -> FieldType {
        match (encoding.field_type, &encoding.sort) {
            (Some(field_type), _) => field_type,
            (None, Some(_)) => FieldType::Ordinal,
            (None, None) => self.infer_field_type(&chart.data, &encoding.field),
        }
    }

    fn build_encoding_channel(
        &self,
        chart: &Chart,
        channel: Channel,
        encoding: &Encoding,
    ) -> Value {
        let mut value = json!({
            "field": encoding.field,
            "type": self.field_type(chart, encoding).as_str(),
            "title": chart.spec.label_for(&encoding.field),
        });
        if let Some(order) = &encoding.sort {
            value["sort"] = json!(order);
        }
        if let Some(format) = &encoding.format {
            value["format"] = json!(format);
        }
        if channel == Channel::X {
            if let Some(angle) = chart.spec.label_angle {
                value["axis"] = json!({ "labelAngle": angle });
            }
        }
        if channel == Channel::Theta {
            value["stack"] = json!(true);
        }
        value
    }

    /// Encodings shared by the mark layer and the value-label layer
    fn positional_encoding(&self, chart: &Chart) -> Map<String, Value> {
        let mut encoding = Map::new();
        for (channel, binding) in &chart.spec.encodings {
            match channel {
                Channel::Facet | Channel::Text => continue,
                _ => {
                    encoding.insert(
                        channel.as_str().to_string(),
                        self.build_encoding_channel(chart, *channel, binding),
                    );
                }
            }
        }

        if chart.spec.grouped {
            if let Some(color) = chart.spec.encoding(Channel::Color) {
                encoding.insert(
                    "xOffset".to_string(),
                    json!({ "field": color.field, "type": FieldType::Nominal.as_str() }),
                );
            }
        }
        encoding
    }

    fn build_layers(&self, chart: &Chart) -> Vec<Value> {
        let encoding = self.positional_encoding(chart);
        let mut layers = vec![json!({
            "mark": self.mark(chart),
            "encoding": Value::Object(encoding.clone()),
        })];

        if let Some(text) = chart.spec.encoding(Channel::Text) {
            let mut text_encoding = encoding;
            text_encoding.remove("color");
            text_encoding.insert(
                "text".to_string(),
                self.build_encoding_channel(chart, Channel::Text, text),
            );
            layers.push(json!({
                "mark": { "type": "text", "dy": -6, "fontSize": 10 },
                "encoding": Value::Object(text_encoding),
            }));
        }
        layers
    }

    /// Build the Vega-Lite document as a JSON value
    pub fn to_value(&self, chart: &Chart) -> Result<Value> {
        self.validate(chart)?;

        let mut datasets = Map::new();
        datasets.insert(
            naming::CHART_DATA_KEY.to_string(),
            json!(dataframe_to_values(&chart.data)?),
        );

        let mut vl_spec = json!({
            "$schema": self.schema,
            "title": chart.spec.title,
            "datasets": Value::Object(datasets),
            "data": { "name": naming::CHART_DATA_KEY },
        });

        let layers = self.build_layers(chart);
        match chart.spec.encoding(Channel::Facet) {
            Some(facet) => {
                vl_spec["facet"] = self.build_encoding_channel(chart, Channel::Facet, facet);
                if let Some(columns) = chart.spec.facet_columns {
                    vl_spec["columns"] = json!(columns);
                }
                vl_spec["spec"] = json!({
                    "width": PANEL_WIDTH,
                    "height": PANEL_HEIGHT,
                    "layer": layers,
                });
                vl_spec["resolve"] = json!({ "scale": { "x": "independent" } });
            }
            None => {
                vl_spec["width"] = json!(CHART_WIDTH);
                vl_spec["height"] = json!(CHART_HEIGHT);
                vl_spec["layer"] = json!(layers);
            }
        }

        Ok(vl_spec)
    }
}

impl Default for VegaLiteWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for VegaLiteWriter {
    type Output = String;

    fn write(&self, chart: &Chart) -> Result<String> {
        let vl_spec = self.to_value(chart)?;
        serde_json::to_string_pretty(&vl_spec).map_err(|e| {
            SalesvizError::WriterError(format!("Failed to serialize Vega-Lite JSON: {}", e))
        })
    }

    fn validate(&self, chart: &Chart) -> Result<()> {
        let spec = &chart.spec;
        let required: &[Channel] = match spec.mark {
            Mark::Arc => &[Channel::Theta],
            Mark::Bar | Mark::Line | Mark::Point => &[Channel::X, Channel::Y],
        };
        for channel in required {
            if spec.encoding(*channel).is_none() {
                return Err(SalesvizError::ValidationError(format!(
                    "Chart '{}': {} mark requires a '{}' encoding",
                    spec.title,
                    spec.mark.as_str(),
                    channel.as_str()
                )));
            }
        }

        if spec.grouped && spec.encoding(Channel::Color).is_none() {
            return Err(SalesvizError::ValidationError(format!(
                "Chart '{}': grouped bars need a 'color' encoding",
                spec.title
            )));
        }

        for encoding in spec.encodings.values() {
            if chart.data.column(&encoding.field).is_err() {
                return Err(SalesvizError::ValidationError(format!(
                    "Column '{}' referenced in chart '{}' does not exist.\nAvailable columns: {}",
                    encoding.field,
                    spec.title,
                    crate::table::column_names(&chart.data).join(", ")
                )));
            }
        }

        Ok(())
    }
}
