use std::path::Path;

use serde::Deserialize;

use crate::FormatError;

/// File names and switches for the archetype loaders.
///
/// The defaults mirror the historic collection layout, so a default
/// config loads an unpacked `arch` directory or a collected archive
/// without any TOML at all.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoaderConfig {
    /// Collected archetype archive file name.
    #[serde(default = "default_arch_file")]
    pub arch_file: String,
    /// Collected face image archive file name.
    #[serde(default = "default_face_file")]
    pub face_file: String,
    /// Collected animations file name.
    #[serde(default = "default_animations_file")]
    pub animations_file: String,
    /// Face name list written alongside the face archive.
    #[serde(default = "default_bmaps_file")]
    pub bmaps_file: String,
    /// Artifact definition file name.
    #[serde(default = "default_artifacts_file")]
    pub artifacts_file: String,
    /// Multi-part position table file name.
    #[serde(default = "default_positions_file")]
    pub positions_file: String,
    /// Image set infix; when set, only `.png` files carrying
    /// `.<set>.` in their name are loaded and the infix is stripped
    /// from the face name.
    #[serde(default)]
    pub image_set: Option<String>,
    /// Directory and file names the tree walker skips, compared
    /// case-insensitively.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
    /// Whether multi-part shape data (`mpart_id`/`mpart_nr`) is parsed
    /// and the lowest-part flags are computed.
    #[serde(default = "default_shaped")]
    pub shaped: bool,
}

fn default_arch_file() -> String {
    "archetypes".to_string()
}

fn default_face_file() -> String {
    "atrinik.0".to_string()
}

fn default_animations_file() -> String {
    "animations".to_string()
}

fn default_bmaps_file() -> String {
    "bmaps".to_string()
}

fn default_artifacts_file() -> String {
    "artifacts".to_string()
}

fn default_positions_file() -> String {
    "archdef.dat".to_string()
}

fn default_skip_dirs() -> Vec<String> {
    vec!["cvs".to_string(), "dev".to_string()]
}

fn default_shaped() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            arch_file: default_arch_file(),
            face_file: default_face_file(),
            animations_file: default_animations_file(),
            bmaps_file: default_bmaps_file(),
            artifacts_file: default_artifacts_file(),
            positions_file: default_positions_file(),
            image_set: None,
            skip_dirs: default_skip_dirs(),
            shaped: default_shaped(),
        }
    }
}

impl LoaderConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, FormatError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, FormatError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Whether `name` is on the skip list, ignoring case.
    pub fn skips(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}
