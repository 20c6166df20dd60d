//! Reading and writing the `<script type="importmap">` of an HTML document.
//!
//! Only the document head is searched, matching what browsers honour: an
//! import map after the first module script or inside `<body>` is ignored.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::ImportMap;
use crate::Result;

/// Starter document written when no `index.html` exists yet.
pub const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <script type="importmap">
{importmap}
  </script>
</head>
<body>
  <h1>Hello, world!</h1>
</body>
</html>
"#;

struct Patterns {
    script: Regex,
    importmap_type: Regex,
    head_end: Regex,
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| {
    Some(Patterns {
        script: Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").ok()?,
        importmap_type: Regex::new(r#"(?i)\btype\s*=\s*["']?importmap["']?"#).ok()?,
        head_end: Regex::new(r"(?i)</head\s*>|<body\b").ok()?,
    })
});

/// Offset where the document head ends.
fn head_end(patterns: &Patterns, html: &str) -> Option<(usize, bool)> {
    patterns
        .head_end
        .find(html)
        .map(|m| (m.start(), m.as_str().starts_with("</")))
}

/// Byte range of the first import map script body inside the head.
fn find_import_map(html: &str) -> Option<Range<usize>> {
    let patterns = PATTERNS.as_ref()?;
    let end = head_end(patterns, html).map_or(html.len(), |(start, _)| start);
    patterns
        .script
        .captures_iter(&html[..end])
        .find(|caps| {
            caps.get(1)
                .is_some_and(|attrs| patterns.importmap_type.is_match(attrs.as_str()))
        })
        .and_then(|caps| caps.get(2))
        .map(|body| body.range())
}

/// Parse the import map of `html`, or `None` when the head has none.
pub fn extract_import_map(html: &str) -> Result<Option<ImportMap>> {
    find_import_map(html)
        .map(|range| ImportMap::parse(&html[range]))
        .transpose()
}

/// Return `html` with its import map replaced by `import_map`.
///
/// When the document has no import map script one is inserted at the end of
/// the head, or at the very top for documents without a head.
pub fn write_import_map(html: &str, import_map: &ImportMap) -> String {
    let json = import_map.format_json(2);
    if let Some(range) = find_import_map(html) {
        return format!("{}\n{json}\n  {}", &html[..range.start], &html[range.end..]);
    }

    let script = format!("  <script type=\"importmap\">\n{json}\n  </script>\n");
    let closing_head = PATTERNS
        .as_ref()
        .and_then(|patterns| head_end(patterns, html))
        .filter(|(_, is_closing_tag)| *is_closing_tag);
    match closing_head {
        Some((start, _)) => format!("{}{script}{}", &html[..start], &html[start..]),
        None => format!("{script}{html}"),
    }
}

/// A fresh document hosting `import_map`.
pub fn new_document(import_map: &ImportMap) -> String {
    HTML_TEMPLATE.replace("{importmap}", &import_map.format_json(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Hello, world!</title>
  <script type="importmap">
    {
      "config": {
        "cdn": "https://esm.sh"
      },
      "imports": {
        "react": "https://esm.sh/react@19.1.0",
        "react/": "https://esm.sh/react@19.1.0/",
        "react-dom": "https://esm.sh/*react-dom@19.1.0",
        "react-dom/": "https://esm.sh/*react-dom@19.1.0/"
      },
      "scopes": {
        "https://esm.sh/": {
          "scheduler": "https://esm.sh/scheduler@0.26.0",
          "scheduler/": "https://esm.sh/scheduler@0.26.0/"
        }
      }
    }
  </script>
</head>
<body>
  <h1>Hello, world!</h1>
</body>
</html>
"#;

    #[test]
    fn test_extract_from_head() {
        let im = extract_import_map(INDEX_HTML).unwrap().unwrap();
        assert_eq!(im.config.cdn, "https://esm.sh");
        assert_eq!(im.imports.len(), 4);
        assert_eq!(im.scopes.len(), 1);
        assert_eq!(im.scopes["https://esm.sh/"].len(), 2);
    }

    #[test]
    fn test_ignores_scripts_outside_head() {
        let html = r#"<html><head><script type="module">import "x"</script></head>
<body><script type="importmap">{"imports":{"a":"./a.js"}}</script></body></html>"#;
        assert!(extract_import_map(html).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let html = r#"<head><script type="importmap">{"imports":</script></head>"#;
        assert!(extract_import_map(html).is_err());
    }

    #[test]
    fn test_write_replaces_existing_map() {
        let mut im = extract_import_map(INDEX_HTML).unwrap().unwrap();
        im.imports.clear();
        im.scopes.clear();
        im.imports.insert("vue".into(), "https://esm.sh/vue@3.5.0/es2024/vue.mjs".into());

        let html = write_import_map(INDEX_HTML, &im);
        let reread = extract_import_map(&html).unwrap().unwrap();
        assert_eq!(reread.imports.len(), 1);
        assert!(reread.scopes.is_empty());
        assert!(html.contains("<title>Hello, world!</title>"));
        assert!(html.contains("  <script type=\"importmap\">\n    {\n      \"imports\": {\n"));
        assert!(html.contains("    }\n  </script>\n</head>"));
    }

    #[test]
    fn test_write_inserts_before_head_end() {
        let html = "<html><head>\n<title>x</title>\n</head><body></body></html>";
        let out = write_import_map(html, &ImportMap::default());
        assert!(out.contains("<title>x</title>\n  <script type=\"importmap\">"));
        assert!(extract_import_map(&out).unwrap().is_some());
    }

    #[test]
    fn test_new_document() {
        let html = new_document(&ImportMap::default());
        let im = extract_import_map(&html).unwrap().unwrap();
        assert!(im.is_empty());
    }
}
