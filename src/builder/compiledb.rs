//! Writes `compile_commands.json`: a JSON array of
//! `{directory, command, file}` records, one per translation unit,
//! written by hand rather than through a reflection-based serializer.

use std::path::{Path, PathBuf};

use crate::error::IoError;

#[derive(Clone)]
pub struct CompileRecord {
    pub directory: PathBuf,
    pub command: String,
    pub file: PathBuf,
}

/// Serialize `records` as `compile_commands.json` and write it to
/// `output_path`.
pub fn write(output_path: &Path, records: &[CompileRecord]) -> Result<(), IoError> {
    let json = to_json(records);
    std::fs::write(output_path, json).map_err(|source| IoError::Copy {
        from: output_path.to_path_buf(),
        to: output_path.to_path_buf(),
        source,
    })
}

fn to_json(records: &[CompileRecord]) -> String {
    let mut out = String::from("[\n");
    for (i, record) in records.iter().enumerate() {
        out.push_str("  {\n");
        out.push_str(&format!(
            "    \"directory\": \"{}\",\n",
            escape(&record.directory.display().to_string())
        ));
        out.push_str(&format!(
            "    \"command\": \"{}\",\n",
            escape(&record.command)
        ));
        out.push_str(&format!(
            "    \"file\": \"{}\"\n",
            escape(&record.file.display().to_string())
        ));
        out.push_str(if i + 1 == records.len() { "  }\n" } else { "  },\n" });
    }
    out.push(']');
    out
}

/// Escape backslashes and quotes for embedding inside a JSON string.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(ch),
        }
    }
    out
}
