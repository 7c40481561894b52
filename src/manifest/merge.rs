//! Flat-field accumulators used by the hierarchical override merge.
//! Scalars are overwritten by later layers; lists are appended.

use toml::Value;

pub(crate) fn subtable<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Table> {
    table.get(key).and_then(Value::as_table)
}

fn string_list(table: &toml::Table, key: &str) -> Vec<String> {
    table
        .get(key)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Default, Clone)]
pub(crate) struct BuildFields {
    pub compiler: Option<String>,
    pub language: Option<String>,
    pub standard: Option<String>,
    pub output: Option<String>,
    pub arch: Option<String>,
    pub kind: Option<String>,
    pub defines: Vec<String>,
    pub flags: Vec<String>,
}

impl BuildFields {
    pub(crate) fn apply_layer(&mut self, table: &toml::Table) {
        if let Some(v) = table.get("compiler").and_then(Value::as_str) {
            self.compiler = Some(v.to_string());
        }
        if let Some(v) = table.get("language").and_then(Value::as_str) {
            self.language = Some(v.to_string());
        }
        if let Some(v) = table.get("standard").and_then(Value::as_str) {
            self.standard = Some(v.to_string());
        }
        if let Some(v) = table.get("output").and_then(Value::as_str) {
            self.output = Some(v.to_string());
        }
        if let Some(v) = table.get("arch").and_then(Value::as_str) {
            self.arch = Some(v.to_string());
        }
        if let Some(v) = table.get("type").and_then(Value::as_str) {
            self.kind = Some(v.to_string());
        }
        self.defines.extend(string_list(table, "defines"));
        self.flags.extend(string_list(table, "flags"));
    }
}

#[derive(Default, Clone)]
pub(crate) struct DependencyFields {
    pub git: Option<String>,
    pub tag: Option<String>,
    pub url: Option<String>,
    pub path: Option<String>,
    pub defines: Vec<String>,
    pub build_cmd: Option<String>,
    pub include_dirs: Option<Vec<String>>,
    pub lib_dirs: Option<Vec<String>>,
    pub libs: Option<Vec<String>>,
    pub extra_dependencies: Vec<String>,
}

impl DependencyFields {
    pub(crate) fn apply_layer(&mut self, table: &toml::Table) {
        if let Some(v) = table.get("git").and_then(Value::as_str) {
            self.git = Some(v.to_string());
        }
        if let Some(v) = table.get("tag").and_then(Value::as_str) {
            self.tag = Some(v.to_string());
        }
        if let Some(v) = table.get("url").and_then(Value::as_str) {
            self.url = Some(v.to_string());
        }
        if let Some(v) = table.get("path").and_then(Value::as_str) {
            self.path = Some(v.to_string());
        }
        self.defines.extend(string_list(table, "defines"));
        if let Some(v) = table.get("build_cmd").and_then(Value::as_str) {
            self.build_cmd = Some(v.to_string());
        }
        if table.contains_key("include_dirs") {
            self.include_dirs = Some(string_list(table, "include_dirs"));
        }
        if table.contains_key("lib_dirs") {
            self.lib_dirs = Some(string_list(table, "lib_dirs"));
        }
        if table.contains_key("libs") {
            self.libs = Some(string_list(table, "libs"));
        }
        self.extra_dependencies
            .extend(string_list(table, "extra_dependencies"));
    }
}
