//! Demo manifest: the TOML description of a show.
//!
//! A manifest names the music track, an optional shared shader preamble,
//! a handful of presentation flags, and the ordered effect list. Durations
//! accept either a bare number of seconds or a humantime string ("2s",
//! "1m30s").

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read manifest at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

/// One entry of the effect list: a fragment shader file and how long it
/// stays on screen.
#[derive(Debug, Clone, Deserialize)]
pub struct EffectEntry {
    pub shader: PathBuf,
    #[serde(deserialize_with = "deserialize_duration")]
    pub duration: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DemoManifest {
    pub title: String,
    /// Decoded and fed to the audio output by the embedding application.
    #[serde(default)]
    pub music: Option<PathBuf>,
    /// Shared GLSL prepended to every effect's fragment source.
    #[serde(default)]
    pub preamble: Option<PathBuf>,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default)]
    pub vsync: bool,
    #[serde(default)]
    pub no_audio: bool,
    #[serde(default)]
    pub disable_cursor: bool,
    #[serde(default)]
    pub effects: Vec<EffectEntry>,
}

impl DemoManifest {
    pub fn from_toml_str(raw: &str) -> Result<Self, ManifestError> {
        let manifest: DemoManifest = toml::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.effects.is_empty() {
            return Err(ManifestError::Invalid(
                "demo defines no effects".to_string(),
            ));
        }
        Ok(())
    }

    /// Sum of all effect durations.
    pub fn total_duration(&self) -> Duration {
        self.effects.iter().map(|entry| entry.duration).sum()
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v).map_err(de::Error::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| de::Error::custom("duration must be non-negative"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0.0 || !v.is_finite() {
                return Err(de::Error::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }
    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
title = "first light"
music = "music/track.wav"
preamble = "shaders/common.glsl"
fullscreen = true

[[effects]]
shader = "shaders/intro.frag"
duration = 2

[[effects]]
shader = "shaders/tunnel.frag"
duration = "1m30s"

[[effects]]
shader = "shaders/credits.frag"
duration = 4.5
"#;

    #[test]
    fn parses_durations_in_all_forms() {
        let manifest = DemoManifest::from_toml_str(MANIFEST).unwrap();
        assert_eq!(manifest.title, "first light");
        assert_eq!(manifest.effects.len(), 3);
        assert_eq!(manifest.effects[0].duration, Duration::from_secs(2));
        assert_eq!(manifest.effects[1].duration, Duration::from_secs(90));
        assert_eq!(manifest.effects[2].duration, Duration::from_secs_f64(4.5));
        assert_eq!(
            manifest.total_duration(),
            Duration::from_secs_f64(96.5)
        );
        assert!(manifest.fullscreen);
        assert!(!manifest.no_audio);
    }

    #[test]
    fn empty_effect_list_is_rejected() {
        let err = DemoManifest::from_toml_str("title = \"empty\"").unwrap_err();
        assert!(matches!(err, ManifestError::Invalid(_)));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let raw = r#"
title = "broken"
[[effects]]
shader = "a.frag"
duration = -1
"#;
        assert!(DemoManifest::from_toml_str(raw).is_err());
    }

    #[test]
    fn flags_default_to_off_and_music_is_optional() {
        let raw = r#"
title = "minimal"
[[effects]]
shader = "a.frag"
duration = 1
"#;
        let manifest = DemoManifest::from_toml_str(raw).unwrap();
        assert!(manifest.music.is_none());
        assert!(manifest.preamble.is_none());
        assert!(!manifest.fullscreen && !manifest.vsync && !manifest.disable_cursor);
    }
}
