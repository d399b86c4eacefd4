//! Analytics dashboard view
//!
//! The page is a Tera template with HTML autoescaping on, so type labels,
//! asset paths and the echoed token are escaped on output. Report titles only
//! reach the page through the chart payload: JSON with the HTML-significant
//! characters hex-escaped so it can sit inside a `<script>` element.

use serde::Serialize;
use tera::{Context, Tera};

use crate::core::content_types::ContentType;
use crate::core::report::DataPoint;
use crate::hooks::{Asset, AssetKind, ANALYTICS_SLUG};

/// Name the template is registered under; the suffix turns on autoescaping
pub const TEMPLATE_NAME: &str = "dashboard.html";

/// Point shape consumed by the chart script
#[derive(Serialize)]
struct ChartPoint<'a> {
    y: u64,
    title_main: &'a str,
}

/// JSON array of `{"y": count, "title_main": label}` safe to embed in a page
pub fn chart_payload(points: &[DataPoint]) -> String {
    let chart: Vec<ChartPoint<'_>> = points
        .iter()
        .map(|p| ChartPoint {
            y: p.value,
            title_main: &p.label,
        })
        .collect();

    // Serializing plain structs of strings and integers cannot fail
    let json = serde_json::to_string(&chart).unwrap_or_else(|_| "[]".to_string());

    // These can only occur inside JSON strings, where \uXXXX is equivalent
    json.replace('<', "\\u003C")
        .replace('>', "\\u003E")
        .replace('&', "\\u0026")
        .replace('\'', "\\u0027")
}

pub struct Dashboard<'a> {
    pub selected: &'a str,
    pub types: &'a [&'a ContentType],
    pub points: &'a [DataPoint],
    pub assets: &'a [Asset],
    /// Query token the page was opened with, carried through the selector form
    pub token: Option<&'a str>,
}

impl Dashboard<'_> {
    pub fn render(&self, template: &str) -> tera::Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, template)?;

        let mut context = Context::new();
        context.insert("slug", ANALYTICS_SLUG);
        context.insert("selected", self.selected);
        context.insert("types", self.types);
        context.insert("token", &self.token.filter(|t| !t.is_empty()));
        context.insert("styles", &self.assets_of(AssetKind::Style));
        context.insert("scripts", &self.assets_of(AssetKind::Script));
        context.insert("no_data", &self.points.is_empty());
        context.insert("chart", &chart_payload(self.points));

        tera.render(TEMPLATE_NAME, &context)
    }

    fn assets_of(&self, kind: AssetKind) -> Vec<&Asset> {
        self.assets.iter().filter(|a| a.kind == kind).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = include_str!("../static/dashboard.html");

    fn point(label: &str, value: u64) -> DataPoint {
        DataPoint {
            label: label.to_string(),
            value,
        }
    }

    fn content_type(name: &str, label: &str) -> ContentType {
        ContentType {
            name: name.to_string(),
            label: label.to_string(),
            public: true,
        }
    }

    fn types() -> Vec<ContentType> {
        vec![content_type("post", "Posts"), content_type("page", "Pages")]
    }

    #[test]
    fn payload_values_are_numbers() {
        let payload = chart_payload(&[point("A", 17), point("B", 0)]);
        assert_eq!(
            payload,
            r#"[{"y":17,"title_main":"A"},{"y":0,"title_main":"B"}]"#
        );
    }

    #[test]
    fn payload_cannot_break_out_of_script() {
        let title = "</script><script>alert('x')</script> & co";
        let payload = chart_payload(&[point(title, 1)]);

        for c in ['<', '>', '\'', '&'] {
            assert!(!payload.contains(c), "raw {c} in {payload}");
        }

        // Still valid JSON carrying the original title
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed[0]["title_main"], title);
        assert_eq!(parsed[0]["y"], 1);
    }

    #[test]
    fn empty_report_renders_no_data() {
        let types = types();
        let refs: Vec<&ContentType> = types.iter().collect();
        let html = Dashboard {
            selected: "post",
            types: &refs,
            points: &[],
            assets: &[],
            token: None,
        }
        .render(TEMPLATE)
        .unwrap();

        assert!(html.contains("No Data Found"));
        assert!(!html.contains("chartContainer"));
        assert!(!html.contains(r#"name="token""#));
    }

    #[test]
    fn chart_and_selector() {
        let types = types();
        let refs: Vec<&ContentType> = types.iter().collect();
        let assets = [Asset {
            handle: "avc-chart".to_string(),
            path: "/static/chart.js".to_string(),
            kind: AssetKind::Script,
        }];
        let html = Dashboard {
            selected: "page",
            types: &refs,
            points: &[point("Hello", 3)],
            assets: &assets,
            token: None,
        }
        .render(TEMPLATE)
        .unwrap();

        assert!(html.contains(r#"<option value="page" selected>Pages</option>"#));
        assert!(html.contains(r#"<option value="post">Posts</option>"#));
        assert!(html.contains(r#"{"y":3,"title_main":"Hello"}"#));
        assert!(html.contains(r#"<script id="avc-chart" src="#));
        assert!(html.contains(r#"name="page" value="avc-views-analytics""#));
        assert!(!html.contains("No Data Found"));
    }

    #[test]
    fn labels_are_not_rendered_as_markup() {
        let types = vec![
            content_type("evil", "{{ no_data }}<b>bold</b>"),
            content_type("post", "Posts"),
        ];
        let refs: Vec<&ContentType> = types.iter().collect();
        let html = Dashboard {
            selected: "post",
            types: &refs,
            points: &[],
            assets: &[],
            token: None,
        }
        .render(TEMPLATE)
        .unwrap();

        assert_eq!(html.matches("No Data Found").count(), 1);
        assert!(html.contains("{{ no_data }}&lt;b&gt;bold&lt;&#x2F;b&gt;"));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn selector_form_keeps_the_token() {
        let types = types();
        let refs: Vec<&ContentType> = types.iter().collect();
        let html = Dashboard {
            selected: "post",
            types: &refs,
            points: &[],
            assets: &[],
            token: Some(r#"a"b<c"#),
        }
        .render(TEMPLATE)
        .unwrap();

        assert!(html.contains(r#"<input type="hidden" name="token" value="a&quot;b&lt;c" />"#));
    }
}
