//! Chart specifications
//!
//! A [`ChartSpec`] is a declarative description of one chart: mark type,
//! column-to-channel bindings, title and axis labels. Binding a spec to a
//! table ([`ChartSpec::bind`]) checks the referenced columns exist and
//! projects the table down to exactly those columns, giving a [`Chart`] that
//! the writers render.
//!
//! The functions in [`catalog`] build the report charts. None of them
//! aggregate; each documents the table shape it expects.

pub mod catalog;

pub use catalog::*;

use crate::table::require_columns;
use crate::{DataFrame, Result, SalesvizError};
use std::collections::BTreeMap;

/// Mark type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Bar,
    Line,
    Point,
    /// Pie slices
    Arc,
}

impl Mark {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Bar => "bar",
            Mark::Line => "line",
            Mark::Point => "point",
            Mark::Arc => "arc",
        }
    }
}

/// Visual channel a column is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    X,
    Y,
    Color,
    Theta,
    Text,
    Facet,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::X => "x",
            Channel::Y => "y",
            Channel::Color => "color",
            Channel::Theta => "theta",
            Channel::Text => "text",
            Channel::Facet => "facet",
        }
    }
}

/// Measurement type of a bound field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Quantitative,
    Ordinal,
    Nominal,
    Temporal,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Quantitative => "quantitative",
            FieldType::Ordinal => "ordinal",
            FieldType::Nominal => "nominal",
            FieldType::Temporal => "temporal",
        }
    }
}

/// Binding of one column to a channel
#[derive(Debug, Clone, PartialEq)]
pub struct Encoding {
    pub field: String,
    /// Explicit measurement type; inferred from the column dtype when absent
    pub field_type: Option<FieldType>,
    /// Explicit category order
    pub sort: Option<Vec<String>>,
    /// Number format for labels (d3-format)
    pub format: Option<String>,
}

impl Encoding {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            field_type: None,
            sort: None,
            format: None,
        }
    }
}

/// Declarative chart description
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub mark: Mark,
    pub title: String,
    pub encodings: BTreeMap<Channel, Encoding>,
    /// Axis/legend titles by field name
    pub labels: BTreeMap<String, String>,
    /// Bars sharing an x value are placed side by side per color
    pub grouped: bool,
    pub opacity: Option<f64>,
    /// Rotation of the x tick labels, in degrees
    pub label_angle: Option<f64>,
    /// Number of facet panels per row
    pub facet_columns: Option<usize>,
}

impl ChartSpec {
    pub fn new(mark: Mark, title: impl Into<String>) -> Self {
        Self {
            mark,
            title: title.into(),
            encodings: BTreeMap::new(),
            labels: BTreeMap::new(),
            grouped: false,
            opacity: None,
            label_angle: None,
            facet_columns: None,
        }
    }

    pub fn encode(mut self, channel: Channel, field: impl Into<String>) -> Self {
        self.encodings.insert(channel, Encoding::new(field));
        self
    }

    /// Bind with an explicit measurement type
    pub fn encode_as(
        mut self,
        channel: Channel,
        field: impl Into<String>,
        field_type: FieldType,
    ) -> Self {
        let mut encoding = Encoding::new(field);
        encoding.field_type = Some(field_type);
        self.encodings.insert(channel, encoding);
        self
    }

    /// Fix the category order of an already bound channel
    pub fn sort(mut self, channel: Channel, order: &[String]) -> Self {
        if let Some(encoding) = self.encodings.get_mut(&channel) {
            encoding.sort = Some(order.to_vec());
        }
        self
    }

    pub fn format(mut self, channel: Channel, format: impl Into<String>) -> Self {
        if let Some(encoding) = self.encodings.get_mut(&channel) {
            encoding.format = Some(format.into());
        }
        self
    }

    pub fn label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    pub fn grouped(mut self) -> Self {
        self.grouped = true;
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn label_angle(mut self, degrees: f64) -> Self {
        self.label_angle = Some(degrees);
        self
    }

    pub fn facet_columns(mut self, columns: usize) -> Self {
        self.facet_columns = Some(columns);
        self
    }

    pub fn encoding(&self, channel: Channel) -> Option<&Encoding> {
        self.encodings.get(&channel)
    }

    /// Title for a field: its label if one is set, otherwise the field name
    pub fn label_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.labels.get(field).map(|s| s.as_str()).unwrap_or(field)
    }

    /// Distinct fields referenced by the encodings, in channel order
    pub fn fields(&self) -> Vec<&str> {
        let mut fields: Vec<&str> = Vec::new();
        for encoding in self.encodings.values() {
            if !fields.contains(&encoding.field.as_str()) {
                fields.push(encoding.field.as_str());
            }
        }
        fields
    }

    /// Bind the spec to a table.
    ///
    /// # Errors
    ///
    /// Returns `SalesvizError::ValidationError` if a referenced column is
    /// missing, or the spec binds no columns at all.
    pub fn bind(self, df: &DataFrame) -> Result<Chart> {
        let fields = self.fields();
        if fields.is_empty() {
            return Err(SalesvizError::ValidationError(format!(
                "Chart '{}' binds no columns",
                self.title
            )));
        }
        require_columns(df, &fields, &format!("chart '{}'", self.title))?;

        let data = df.select(fields.iter().copied()).map_err(|e| {
            SalesvizError::ValidationError(format!(
                "Failed to select columns for chart '{}': {}",
                self.title, e
            ))
        })?;

        Ok(Chart { spec: self, data })
    }
}

/// A chart specification together with the table it renders
#[derive(Debug, Clone)]
pub struct Chart {
    pub spec: ChartSpec,
    pub data: DataFrame,
}

impl Chart {
    pub fn title(&self) -> &str {
        &self.spec.title
    }
}
