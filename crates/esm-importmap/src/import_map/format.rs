//! Canonical JSON output.
//!
//! The output is byte-stable for a given map regardless of insertion order,
//! so it can be diffed and used as a cache key.

use indexmap::IndexMap;
use serde_json::Value;

use super::ImportMap;

const INDENT: &str = "  ";

impl ImportMap {
    /// Serialize the map as indented JSON.
    ///
    /// `indent` is the nesting level of the opening brace, which lets the
    /// output sit inside an HTML `<script>` block. Keys are sorted, a
    /// trailing-slash key follows its bare counterpart, empty values and
    /// empty scopes are dropped, and the `config` block is written only for
    /// a non-default CDN.
    pub fn format_json(&self, indent: usize) -> String {
        let outer = INDENT.repeat(indent);
        let inner = INDENT.repeat(indent + 1);

        let mut sections = Vec::new();
        if self.config.has_custom_cdn() {
            sections.push(format!("{inner}\"config\": {}", self.format_config(indent + 1)));
        }
        sections.push(format!(
            "{inner}\"imports\": {}",
            format_bindings(&self.imports, indent + 1)
        ));

        let mut scope_keys: Vec<&String> = self
            .scopes
            .iter()
            .filter(|(_, bindings)| bindings.values().any(|url| !url.is_empty()))
            .map(|(key, _)| key)
            .collect();
        if !scope_keys.is_empty() {
            scope_keys.sort();
            let scope_indent = INDENT.repeat(indent + 2);
            let scopes: Vec<String> = scope_keys
                .into_iter()
                .map(|key| {
                    format!(
                        "{scope_indent}{}: {}",
                        quote(key),
                        format_bindings(&self.scopes[key], indent + 2)
                    )
                })
                .collect();
            sections.push(format!("{inner}\"scopes\": {{\n{}\n{inner}}}", scopes.join(",\n")));
        }

        if self.routes.values().any(|v| !v.is_empty()) {
            sections.push(format!("{inner}\"routes\": {}", format_map(&self.routes, indent + 1)));
        }
        if self.integrity.values().any(|v| !v.is_empty()) {
            sections.push(format!(
                "{inner}\"integrity\": {}",
                format_map(&self.integrity, indent + 1)
            ));
        }

        format!("{outer}{{\n{}\n{outer}}}", sections.join(",\n"))
    }

    fn format_config(&self, indent: usize) -> String {
        let field_indent = INDENT.repeat(indent + 1);
        let mut fields = vec![format!("{field_indent}\"cdn\": {}", quote(self.cdn_origin()))];
        if !self.config.target.is_empty() {
            fields.push(format!("{field_indent}\"target\": {}", quote(&self.config.target)));
        }
        if self.config.sri {
            fields.push(format!("{field_indent}\"sri\": true"));
        }
        format!("{{\n{}\n{}}}", fields.join(",\n"), INDENT.repeat(indent))
    }
}

/// Import bindings: sorted, with `key/` right after `key`.
fn format_bindings(bindings: &IndexMap<String, String>, indent: usize) -> String {
    let has = |key: &str| bindings.get(key).is_some_and(|url| !url.is_empty());

    let mut keys: Vec<&str> = bindings
        .iter()
        .filter(|(_, url)| !url.is_empty())
        .map(|(key, _)| key.as_str())
        .filter(|key| match key.strip_suffix('/') {
            Some(bare) if !bare.is_empty() => !has(bare),
            _ => true,
        })
        .collect();
    keys.sort_unstable();

    let mut entries = Vec::with_capacity(bindings.len());
    for key in keys {
        entries.push((key.to_string(), bindings[key].as_str()));
        if !key.ends_with('/') {
            let slash = format!("{key}/");
            if has(&slash) {
                let url = bindings[&slash].as_str();
                entries.push((slash, url));
            }
        }
    }
    format_entries(entries.iter().map(|(k, v)| (k.as_str(), *v)), indent)
}

/// A plain string map with sorted keys.
fn format_map(map: &IndexMap<String, String>, indent: usize) -> String {
    let mut entries: Vec<(&str, &str)> = map
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    entries.sort_unstable();
    format_entries(entries.into_iter(), indent)
}

fn format_entries<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>, indent: usize) -> String {
    let entry_indent = INDENT.repeat(indent + 1);
    let lines: Vec<String> = entries
        .map(|(key, value)| format!("{entry_indent}{}: {}", quote(key), quote(value)))
        .collect();
    if lines.is_empty() {
        return "{}".to_string();
    }
    format!("{{\n{}\n{}}}", lines.join(",\n"), INDENT.repeat(indent))
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
