//! HTML view assembly
//!
//! Produces one self-contained page: a service picker and, when a spec is
//! available, a Swagger UI viewer initialised with it.
//!
//! # Security
//!
//! Every dynamic value is escaped for where it lands:
//! - HTML text and attribute values go through [`escape_html`]
//! - values inside `<script>` are emitted as JSON string literals through
//!   [`script_string`], with `<`, `>` and `&` escaped so a backend title or
//!   spec can never close the script element

use std::fmt::Write;
use thiserror::Error;

use crate::aggregator::RenderContext;

const SWAGGER_UI_VERSION: &str = "5.17.14";
const BOOTSTRAP_VERSION: &str = "5.3.3";

const SWAGGER_UI_BUNDLE_SRI: &str =
    "sha512-7ihPQv5ibiTr0DW6onbl2MIKegdT6vjpPySyIb4Ftp68kER6Z7Yiub0tFoMmCHzZfQE9+M+KSjQndv6NhYxDgg==";
const SWAGGER_UI_PRESET_SRI: &str =
    "sha512-UrYi+60Ci3WWWcoDXbMmzpoi1xpERbwjPGij6wTh8fXl81qNdioNNHExr9ttnBebKF0ZbVnPlTPlw+zECUK1Xw==";
const SWAGGER_UI_CSS_SRI: &str =
    "sha512-+9UD8YSD9GF7FzOH38L9S6y56aYNx3R4dYbOCgvTJ2ZHpJScsahNdaMQJU/8osUiz9FPu0YZ8wdKf4evUbsGSg==";
const BOOTSTRAP_CSS_SRI: &str =
    "sha512-jnSuA4Ss2PkkikSOLtYs8BlYIeeIK1h99ty4YfvRPAlzr377vr3CXDb7sb7eEEBYjDtcYj+AjBH3FLv5uSJuXg==";

/// Failure to assemble the page
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to encode script value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write HTML: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Escape text for an HTML body or a quoted attribute value
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Encode a value as a JavaScript string literal, quotes included,
/// safe to place inside an inline `<script>` element
pub fn script_string(value: &str) -> Result<String, RenderError> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(c),
        }
    }
    Ok(out)
}

/// Gateway address as it prefixes "try it out" URLs, always ending in '/'
fn rewrite_prefix(gateway_address: &str) -> String {
    format!("{}/", gateway_address.trim_end_matches('/'))
}

/// Render the page for a request
pub fn render(context: &RenderContext) -> Result<String, RenderError> {
    let mut html = String::with_capacity(4096 + context.spec.len() * 2);

    write_head(&mut html)?;

    html.push_str(
        r#"<body>
  <div class="container">
    <div class="toolbar">
      <div class="form-group">
        <label for="microservice-select" class="font-weight-bold">Select Microservice:</label>
        <select id="microservice-select" class="form-control">
          <option value=""></option>
"#,
    );
    for entry in &context.list {
        writeln!(
            html,
            r#"          <option value="{}"{}>{}</option>"#,
            escape_html(&entry.routing_key),
            if entry.selected { " selected" } else { "" },
            escape_html(&entry.label)
        )?;
    }
    html.push_str(
        r#"        </select>
      </div>
    </div>
    <div id="swagger-ui"></div>
  </div>
"#,
    );

    writeln!(
        html,
        r#"  <script>
  document.getElementById('microservice-select').addEventListener('change', function() {{
    var newEndpoint = this.value;
    if (newEndpoint !== {}) {{
      window.location.href = newEndpoint;
    }}
  }});"#,
        script_string(&context.selected_key)?
    )?;

    if context.shows_viewer() {
        write_viewer(&mut html, context)?;
    }
    html.push_str("  </script>\n");

    if !context.shows_viewer() {
        writeln!(
            html,
            r#"  <br />
  <p id="message" class="container">{}</p>"#,
            escape_html(&context.message)
        )?;
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

fn write_head(html: &mut String) -> Result<(), RenderError> {
    write!(
        html,
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8" />
  <title>Swagger UI</title>
  <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/{swagger}/swagger-ui-bundle.min.js" integrity="{bundle_sri}" crossorigin="anonymous" referrerpolicy="no-referrer"></script>
  <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/{swagger}/swagger-ui-standalone-preset.min.js" integrity="{preset_sri}" crossorigin="anonymous" referrerpolicy="no-referrer"></script>
  <link rel="stylesheet" type="text/css" href="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/{swagger}/swagger-ui.min.css" integrity="{css_sri}" crossorigin="anonymous" referrerpolicy="no-referrer" />
  <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/bootstrap/{bootstrap}/css/bootstrap.min.css" integrity="{bootstrap_sri}" crossorigin="anonymous" referrerpolicy="no-referrer" />
  <style>
    .toolbar {{
      margin: 20px 0;
    }}
  </style>
</head>
"#,
        swagger = SWAGGER_UI_VERSION,
        bootstrap = BOOTSTRAP_VERSION,
        bundle_sri = SWAGGER_UI_BUNDLE_SRI,
        preset_sri = SWAGGER_UI_PRESET_SRI,
        css_sri = SWAGGER_UI_CSS_SRI,
        bootstrap_sri = BOOTSTRAP_CSS_SRI,
    )?;
    Ok(())
}

/// Swagger UI initialisation. "Try it out" calls are built against the
/// gateway's address; the interceptor points them at the real service and
/// adds the configured headers.
fn write_viewer(html: &mut String, context: &RenderContext) -> Result<(), RenderError> {
    writeln!(
        html,
        r##"
  window.onload = function() {{
    const ui = SwaggerUIBundle({{
      spec: JSON.parse({spec}),
      dom_id: "#swagger-ui",
      requestInterceptor: (req) => {{
        req.url = req.url.replace({from}, {to});"##,
        spec = script_string(&context.spec)?,
        from = script_string(&rewrite_prefix(&context.gateway_address))?,
        to = script_string(&context.service_url)?,
    )?;
    for (name, value) in &context.headers {
        writeln!(
            html,
            "        req.headers[{}] = {};",
            script_string(name)?,
            script_string(value)?
        )?;
    }
    html.push_str(
        r#"        return req;
      }
    });
  };
"#,
    );
    Ok(())
}
