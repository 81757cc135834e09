//! Source action documents (`.funscript`) and how they map to channels.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::script::{Channel, SCRIPT_EXTENSION};

/// Extension of single-axis source documents.
pub const SOURCE_EXTENSION: &str = "funscript";

/// Name tokens that select a non-stroke channel, checked in order.
const CHANNEL_TOKENS: [(&str, Channel); 5] = [
    ("pitch", Channel::Pitch),
    ("roll", Channel::Roll),
    ("twist", Channel::Twist),
    ("surge", Channel::Surge),
    ("sway", Channel::Sway),
];

/// Errors loading a single source document.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse source document: {0}")]
    Json(#[from] serde_json::Error),
}

/// One timed position in a source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAction {
    /// Timestamp in milliseconds.
    pub at: i64,
    /// Position on the source's own scale.
    pub pos: i64,
}

/// Optional document metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// A parsed single-axis action document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDocument {
    #[serde(default)]
    pub actions: Vec<RawAction>,
    #[serde(default)]
    pub metadata: Option<SourceMetadata>,
}

impl SourceDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }

    pub fn duration(&self) -> Option<f64> {
        self.metadata.as_ref().and_then(|m| m.duration)
    }
}

/// File name up to its first `.`.
pub fn base_name(file_name: &str) -> &str {
    match file_name.find('.') {
        Some(dot) => &file_name[..dot],
        None => file_name,
    }
}

/// Infer the channel a source file drives from its file name.
///
/// Matching is case-insensitive. Axis tokens take priority; a plain
/// `<base>.funscript` name is the stroke axis; anything else is `Unknown`.
pub fn infer_channel(file_name: &str, base: &str) -> Channel {
    let name = file_name.to_lowercase();
    for (token, channel) in CHANNEL_TOKENS {
        if name.contains(token) {
            return channel;
        }
    }
    let stroke_name = format!("{}.{}", base, SOURCE_EXTENSION).to_lowercase();
    if name.contains(&stroke_name) {
        Channel::Stroke
    } else {
        Channel::Unknown
    }
}

/// Input documents sharing one base name.
#[derive(Debug, Clone)]
pub struct SourceSet {
    /// Common base name of every file in the set.
    pub base_name: String,
    /// Files in merge order.
    pub paths: Vec<PathBuf>,
}

impl SourceSet {
    /// Output file name: base name without whitespace plus the script extension.
    pub fn output_file_name(&self) -> String {
        output_file_name(&self.base_name)
    }
}

/// Base name with whitespace removed, suffixed with the script extension.
pub fn output_file_name(base: &str) -> String {
    let stripped: String = base.chars().filter(|c| !c.is_whitespace()).collect();
    format!("{}.{}", stripped, SCRIPT_EXTENSION)
}

/// Find the regular files next to `input` that share its base name.
///
/// Siblings are sorted by file name and `input` itself comes last, so it is
/// the final word on any conflicting value.
pub fn discover_sources(input: &Path) -> io::Result<SourceSet> {
    // Fails with NotFound for missing inputs
    fs::metadata(input)?;

    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Input has no file name"))?;
    let base = base_name(&file_name).to_string();

    let dir = match input.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut siblings = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == file_name || base_name(&name) != base {
            continue;
        }
        siblings.push(entry.path());
    }
    siblings.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    siblings.push(input.to_path_buf());

    log::debug!("Discovered {} source(s) for '{}'", siblings.len(), base);

    Ok(SourceSet {
        base_name: base,
        paths: siblings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_infer_channel() {
        let base = "Clip";
        assert_eq!(infer_channel("Clip.funscript", base), Channel::Stroke);
        assert_eq!(infer_channel("clip.FUNSCRIPT", base), Channel::Stroke);
        assert_eq!(infer_channel("Clip.pitch.funscript", base), Channel::Pitch);
        assert_eq!(infer_channel("Clip.ROLL.funscript", base), Channel::Roll);
        assert_eq!(infer_channel("Clip.twist.funscript", base), Channel::Twist);
        assert_eq!(infer_channel("Clip.surge.funscript", base), Channel::Surge);
        assert_eq!(infer_channel("Clip.sway.funscript", base), Channel::Sway);
        assert_eq!(infer_channel("Clip.mp4", base), Channel::Unknown);
        assert_eq!(infer_channel("Clip.vib.funscript", base), Channel::Unknown);
    }

    #[test]
    fn test_parse_document() {
        let doc = SourceDocument::from_json(
            r#"{
                "version": "1.0",
                "actions": [{"at": 0, "pos": 10}, {"at": 250, "pos": 90}],
                "metadata": {"title": "Demo", "duration": 12.5}
            }"#,
        )
        .unwrap();
        assert_eq!(doc.actions.len(), 2);
        assert_eq!(doc.actions[1], RawAction { at: 250, pos: 90 });
        assert_eq!(doc.title(), Some("Demo"));
        assert_eq!(doc.duration(), Some(12.5));
    }

    #[test]
    fn test_parse_document_without_optional_sections() {
        let doc = SourceDocument::from_json("{}").unwrap();
        assert!(doc.actions.is_empty());
        assert_eq!(doc.title(), None);
    }

    #[test]
    fn test_parse_error() {
        let err = SourceDocument::from_json(r#"{"actions": [{"at": "x"}]}"#).unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("My Clip 01"), "MyClip01.srbs");
        assert_eq!(output_file_name("clip"), "clip.srbs");
    }

    #[test]
    fn test_discover_sources() {
        let dir = tempdir().unwrap();
        for name in [
            "Clip.funscript",
            "Clip.roll.funscript",
            "Clip.pitch.funscript",
            "Clip.mp4",
            "Other.funscript",
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("Clip.dir")).unwrap();

        let input = dir.path().join("Clip.funscript");
        let set = discover_sources(&input).unwrap();
        assert_eq!(set.base_name, "Clip");

        let names: Vec<String> = set
            .paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "Clip.mp4",
                "Clip.pitch.funscript",
                "Clip.roll.funscript",
                "Clip.funscript"
            ]
        );
        assert_eq!(set.output_file_name(), "Clip.srbs");
    }

    #[test]
    fn test_discover_missing_input() {
        let dir = tempdir().unwrap();
        let err = discover_sources(&dir.path().join("missing.funscript")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
