//! Standalone HTML documents
//!
//! The page loads vega, vega-lite and vega-embed from the jsDelivr CDN, so
//! files stay small but need network access to display. The Vega-Lite spec
//! is embedded verbatim in a `<script type="application/json">` element and
//! can be recovered with [`read_embedded_spec`].

use crate::chart::Chart;
use crate::naming;
use crate::writer::{VegaLiteWriter, Writer};
use crate::{Result, SalesvizError};
use serde_json::Value;

const VEGA_CDN: &str = "https://cdn.jsdelivr.net/npm/vega@6";
const VEGA_LITE_CDN: &str = "https://cdn.jsdelivr.net/npm/vega-lite@6.4.1";
const VEGA_EMBED_CDN: &str = "https://cdn.jsdelivr.net/npm/vega-embed@7";

/// HTML page writer wrapping the Vega-Lite writer
#[derive(Default)]
pub struct HtmlWriter {
    vegalite: VegaLiteWriter,
}

/// Escape HTML special characters
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Make JSON safe inside a `<script>` element.
///
/// `</` is written as `<\/`, which is the same JSON string.
fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

impl HtmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already serialized Vega-Lite spec into a page
    pub fn page(&self, title: &str, spec_json: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="{vega}"></script>
  <script src="{vega_lite}"></script>
  <script src="{vega_embed}"></script>
  <style>
    body {{ font-family: sans-serif; margin: 1.5rem; }}
  </style>
</head>
<body>
  <div id="{view_id}"></div>
  <script type="application/json" id="{spec_id}">{spec}</script>
  <script type="text/javascript">
    (function() {{
      const spec = JSON.parse(document.getElementById('{spec_id}').textContent);
      const options = {{
        "actions": true,
      }};
      vegaEmbed('#{view_id}', spec, options).catch(console.error);
    }})();
  </script>
</body>
</html>
"#,
            title = escape_html(title),
            vega = VEGA_CDN,
            vega_lite = VEGA_LITE_CDN,
            vega_embed = VEGA_EMBED_CDN,
            view_id = naming::VIEW_ELEMENT_ID,
            spec_id = naming::SPEC_ELEMENT_ID,
            spec = escape_script_json(spec_json),
        )
    }
}

impl Writer for HtmlWriter {
    type Output = String;

    fn write(&self, chart: &Chart) -> Result<String> {
        let spec_json = self.vegalite.write(chart)?;
        Ok(self.page(chart.title(), &spec_json))
    }

    fn validate(&self, chart: &Chart) -> Result<()> {
        self.vegalite.validate(chart)
    }
}

/// Recover the Vega-Lite spec embedded in a page written by [`HtmlWriter`].
///
/// # Errors
///
/// Returns `SalesvizError::WriterError` if the page has no embedded spec or
/// the spec is not valid JSON.
pub fn read_embedded_spec(html: &str) -> Result<Value> {
    let open_tag = format!(
        r#"<script type="application/json" id="{}">"#,
        naming::SPEC_ELEMENT_ID
    );
    let start = html
        .find(&open_tag)
        .map(|idx| idx + open_tag.len())
        .ok_or_else(|| {
            SalesvizError::WriterError("Document has no embedded chart spec".to_string())
        })?;
    let end = html[start..]
        .find("</script>")
        .map(|idx| start + idx)
        .ok_or_else(|| {
            SalesvizError::WriterError("Embedded chart spec is not terminated".to_string())
        })?;

    serde_json::from_str(&html[start..end]).map_err(|e| {
        SalesvizError::WriterError(format!("Embedded chart spec is not valid JSON: {}", e))
    })
}
