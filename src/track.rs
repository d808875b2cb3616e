use serde::{Deserialize, Serialize};
use std::path::Path;

/// A playable MIDI file. Identity is the path; everything else is display data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub duration: Option<f64>, // seconds
}

impl Track {
    pub fn new(path: impl Into<String>, name: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            duration,
        }
    }

    /// Build a track named after the file stem, the way the album folder lists them
    pub fn from_path(path: &Path, duration: Option<f64>) -> Self {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("Unknown")
            .to_string();

        Self {
            path: path.to_string_lossy().to_string(),
            name,
            duration,
        }
    }

    pub fn same_file(&self, path: &str) -> bool {
        self.path == path
    }

    pub fn duration_string(&self) -> String {
        match self.duration {
            Some(secs) if secs > 0.0 => {
                let total = secs.round() as u64;
                format!("{}:{:02}", total / 60, total % 60)
            }
            _ => "--:--".to_string(),
        }
    }
}
