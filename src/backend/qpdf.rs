//! `qpdf --json` backed first-page geometry.
//!
//! qpdf exposes the page tree as JSON: `pages[].object` names the page
//! object, and the object table holds its dictionary. Two layouts exist:
//!
//! ```text
//! v1: { "pages": [{ "object": "3 0 R" }], "objects": { "3 0 R": { "/MediaBox": [...] } } }
//! v2: { "pages": [{ "object": "3 0 R" }], "qpdf": [ {...}, { "obj:3 0 R": { "value": { ... } } } ] }
//! ```
//!
//! Some wrappers flatten the boxes onto the page entry itself
//! (`trimbox` / `trim_box`); those are honoured first.
//!
//! Boxes are returned raw. A box holding a string or the wrong number of
//! entries is passed on as-is so the resolver can report it as malformed.

use crate::error::PageBoxError;
use crate::extract::pdf::PageGeometry;
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// How far up `/Parent` to look for an inherited MediaBox.
const MAX_PARENT_DEPTH: usize = 32;

/// Object lookup over either JSON layout.
struct ObjectTable<'a> {
    v1: Option<&'a Map<String, Value>>,
    v2: Option<&'a Map<String, Value>>,
}

impl<'a> ObjectTable<'a> {
    fn new(root: &'a Value) -> Self {
        let v1 = root.get("objects").and_then(Value::as_object);
        let v2 = root
            .get("qpdf")
            .and_then(Value::as_array)
            .and_then(|a| a.get(1))
            .and_then(Value::as_object);
        Self { v1, v2 }
    }

    /// Look up an indirect object such as `"3 0 R"`.
    fn object(&self, reference: &str) -> Option<&'a Value> {
        if let Some(v1) = self.v1 {
            if let Some(v) = v1.get(reference) {
                return Some(v);
            }
        }
        let entry = self.v2?.get(&format!("obj:{reference}"))?;
        entry
            .get("value")
            .or_else(|| entry.get("stream").and_then(|s| s.get("dict")))
    }

    /// Follow a reference string to its value; anything else is returned unchanged.
    fn resolve(&self, v: &'a Value) -> &'a Value {
        match v.as_str() {
            Some(s) if is_reference(s) => self.object(s).unwrap_or(v),
            _ => v,
        }
    }

    /// Find `key` in `dict`, optionally walking `/Parent` for inheritable keys.
    fn lookup(&self, dict: &'a Value, key: &str, inherit: bool) -> Option<&'a Value> {
        let mut current = dict;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Some(v) = current.get(key) {
                return Some(self.resolve(v));
            }
            if !inherit {
                return None;
            }
            current = self.resolve(current.get("/Parent")?);
        }
        warn!("/Parent chain deeper than {} while looking for {}", MAX_PARENT_DEPTH, key);
        None
    }
}

fn is_reference(s: &str) -> bool {
    let mut parts = s.split_whitespace();
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(n), Some(g), Some("R"), None)
            if n.parse::<u32>().is_ok() && g.parse::<u32>().is_ok()
    )
}

/// Turn a JSON box into raw numbers. Non-numeric entries become NaN and a
/// non-array becomes an empty box, so the resolver reports them.
fn box_values(table: &ObjectTable<'_>, v: &Value) -> Vec<f64> {
    match v.as_array() {
        Some(items) => items
            .iter()
            .map(|item| table.resolve(item).as_f64().unwrap_or(f64::NAN))
            .collect(),
        None => Vec::new(),
    }
}

fn flattened_box(page: &Value, keys: &[&str]) -> Option<Value> {
    keys.iter().find_map(|k| page.get(*k)).cloned()
}

/// Read first-page geometry from `qpdf --json` output.
pub fn parse_qpdf_json(json: &str) -> Result<PageGeometry, serde_json::Error> {
    let root: Value = serde_json::from_str(json)?;
    Ok(geometry_from_value(&root))
}

fn geometry_from_value(root: &Value) -> PageGeometry {
    let pages = root.get("pages").and_then(Value::as_array);
    let page_count = pages.map_or(0, Vec::len);
    let Some(first) = pages.and_then(|p| p.first()) else {
        return PageGeometry::default();
    };

    let table = ObjectTable::new(root);
    let dict = first
        .get("object")
        .and_then(Value::as_str)
        .and_then(|r| table.object(r));

    let trim_box = flattened_box(first, &["trimbox", "trim_box"])
        .or_else(|| dict.and_then(|d| table.lookup(d, "/TrimBox", false)).cloned())
        .map(|v| box_values(&table, &v));
    let media_box = flattened_box(first, &["mediabox", "media_box"])
        .or_else(|| dict.and_then(|d| table.lookup(d, "/MediaBox", true)).cloned())
        .map(|v| box_values(&table, &v));

    debug!(
        "qpdf: {} pages, TrimBox {:?}, MediaBox {:?}",
        page_count, trim_box, media_box
    );

    PageGeometry {
        page_count,
        trim_box,
        media_box,
        intrinsic_size: None,
    }
}

/// Run `qpdf --json` on `pdf_path` and parse its output.
///
/// qpdf exits with 3 when it succeeded with warnings; that counts as success.
pub async fn run_qpdf(
    pdf_path: &Path,
    qpdf: &str,
    timeout_secs: u64,
) -> Result<PageGeometry, PageBoxError> {
    let failed = |detail: String| PageBoxError::QpdfFailed {
        path: pdf_path.to_path_buf(),
        detail,
    };

    let run = tokio::process::Command::new(qpdf)
        .arg("--json")
        .arg(pdf_path)
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(Duration::from_secs(timeout_secs), run)
        .await
        .map_err(|_| failed(format!("timed out after {timeout_secs}s")))?
        .map_err(|e| failed(format!("could not run '{qpdf}': {e}")))?;

    match output.status.code() {
        Some(0) | Some(3) => {}
        code => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "exit status {:?}: {}",
                code,
                stderr.trim()
            )));
        }
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_qpdf_json(&stdout).map_err(|e| failed(format!("unreadable JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;
    use crate::extract::pdf::{resolve_geometry, PdfFallbackPolicy};
    use crate::geometry::GeometrySource;

    const V2: &str = r#"{
        "version": 2,
        "pages": [{ "object": "3 0 R", "pageposfrom1": 1 }],
        "qpdf": [
            { "jsonversion": 2 },
            {
                "obj:2 0 R": { "value": { "/Type": "/Pages", "/MediaBox": [0, 0, 595, 842], "/Kids": ["3 0 R"] } },
                "obj:3 0 R": { "value": { "/Type": "/Page", "/Parent": "2 0 R", "/TrimBox": [10, 10, 110, 210] } }
            }
        ]
    }"#;

    const V1: &str = r#"{
        "version": 1,
        "pages": [{ "object": "4 0 R" }, { "object": "5 0 R" }],
        "objects": {
            "4 0 R": { "/Type": "/Page", "/MediaBox": "6 0 R" },
            "6 0 R": [0, 0, 612, 792]
        }
    }"#;

    #[test]
    fn v2_trim_box_and_inherited_media_box() {
        let g = parse_qpdf_json(V2).unwrap();
        assert_eq!(g.page_count, 1);
        assert_eq!(g.trim_box, Some(vec![10.0, 10.0, 110.0, 210.0]));
        assert_eq!(g.media_box, Some(vec![0.0, 0.0, 595.0, 842.0]));
        assert_eq!(g.intrinsic_size, None);

        let e = resolve_geometry(&g, &PdfFallbackPolicy::default()).unwrap();
        assert_eq!(e.source, GeometrySource::TrimBox);
        assert_eq!(e.dimensions.width_mm, 35.28);
    }

    #[test]
    fn v1_indirect_media_box() {
        let g = parse_qpdf_json(V1).unwrap();
        assert_eq!(g.page_count, 2);
        assert_eq!(g.trim_box, None);
        assert_eq!(g.media_box, Some(vec![0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn flattened_keys_win() {
        let json = r#"{ "pages": [{ "trim_box": [0, 0, 100, 200], "media_box": [0, 0, 110, 210] }] }"#;
        let g = parse_qpdf_json(json).unwrap();
        assert_eq!(g.trim_box, Some(vec![0.0, 0.0, 100.0, 200.0]));
        assert_eq!(g.media_box, Some(vec![0.0, 0.0, 110.0, 210.0]));
    }

    #[test]
    fn no_pages() {
        let g = parse_qpdf_json(r#"{ "version": 2, "pages": [] }"#).unwrap();
        let err = resolve_geometry(&g, &PdfFallbackPolicy::default()).unwrap_err();
        assert_eq!(err, GeometryError::NoPageFound);
    }

    #[test]
    fn three_element_box_is_malformed() {
        let json = r#"{ "pages": [{ "trimbox": [0, 0, 100] }] }"#;
        let g = parse_qpdf_json(json).unwrap();
        let err = resolve_geometry(&g, &PdfFallbackPolicy::default()).unwrap_err();
        assert!(matches!(err, GeometryError::MalformedBox { which: "TrimBox", .. }));
    }

    #[test]
    fn non_numeric_entry_is_malformed() {
        let json = r#"{ "pages": [{ "mediabox": [0, 0, "wide", 842] }] }"#;
        let g = parse_qpdf_json(json).unwrap();
        let err = resolve_geometry(&g, &PdfFallbackPolicy::default()).unwrap_err();
        assert!(matches!(err, GeometryError::MalformedBox { which: "MediaBox", .. }));
    }

    #[test]
    fn trim_box_is_not_inherited() {
        let json = r#"{
            "pages": [{ "object": "3 0 R" }],
            "objects": {
                "2 0 R": { "/TrimBox": [0, 0, 1, 1], "/MediaBox": [0, 0, 595, 842] },
                "3 0 R": { "/Parent": "2 0 R" }
            }
        }"#;
        let g = parse_qpdf_json(json).unwrap();
        assert_eq!(g.trim_box, None);
        assert!(g.media_box.is_some());
    }

    #[test]
    fn cyclic_parent_terminates() {
        let json = r#"{
            "pages": [{ "object": "3 0 R" }],
            "objects": { "3 0 R": { "/Parent": "3 0 R" } }
        }"#;
        let g = parse_qpdf_json(json).unwrap();
        assert_eq!(g.media_box, None);
    }

    #[test]
    fn invalid_json_is_error() {
        assert!(parse_qpdf_json("not json").is_err());
    }

    #[test]
    fn reference_syntax() {
        assert!(is_reference("12 0 R"));
        assert!(!is_reference("/MediaBox"));
        assert!(!is_reference("12 0 R extra"));
    }
}
