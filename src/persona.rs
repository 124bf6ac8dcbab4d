//! Persona profile: a descriptive summary of the historical message corpus

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::Result;

/// Number of sentence-final fragments kept by [`PersonaProfile::analyze`]
const MAX_COMMON_ENDINGS: usize = 5;
/// Number of greeting samples kept by [`PersonaProfile::analyze`]
const MAX_SAMPLE_GREETINGS: usize = 10;

/// Stylistic profile read by the heuristic composer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Average message length in characters
    #[serde(default = "default_avg_message_length")]
    pub avg_message_length: f64,
    /// Sentence-final phrases, most frequent first
    #[serde(default)]
    pub common_endings: Vec<String>,
    #[serde(default)]
    pub sample_greetings: Vec<String>,
}

fn default_avg_message_length() -> f64 {
    50.0
}

impl Default for PersonaProfile {
    fn default() -> Self {
        Self {
            avg_message_length: default_avg_message_length(),
            common_endings: Vec::new(),
            sample_greetings: Vec::new(),
        }
    }
}

impl PersonaProfile {
    /// Load a profile from a JSON file.
    ///
    /// A missing file is not an error: it yields `None` and the composer
    /// degrades to returning the best match verbatim.
    pub async fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!("No persona profile at {}", path.display());
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let profile: Self = serde_json::from_str(&content)?;
        info!(
            "Loaded persona profile: avg length {:.1}, {} endings, {} greetings",
            profile.avg_message_length,
            profile.common_endings.len(),
            profile.sample_greetings.len()
        );
        Ok(Some(profile))
    }

    /// Write the profile as pretty JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Derive a profile from raw message texts.
    ///
    /// Endings are the last two characters of each message once trailing
    /// punctuation is removed; greetings are messages containing one of
    /// `greeting_markers`.
    pub fn analyze<S: AsRef<str>>(texts: &[S], greeting_markers: &[String]) -> Self {
        let texts: Vec<&str> = texts
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect();

        if texts.is_empty() {
            return Self::default();
        }

        let total_chars: usize = texts.iter().map(|t| t.chars().count()).sum();
        let avg_message_length = total_chars as f64 / texts.len() as f64;

        let mut ending_counts: HashMap<String, usize> = HashMap::new();
        for text in &texts {
            let core = text.trim_end_matches(|c: char| crate::rag::composer::is_trailing_noise(c));
            let chars: Vec<char> = core.chars().collect();
            if chars.len() < 2 {
                continue;
            }
            let ending: String = chars[chars.len() - 2..].iter().collect();
            *ending_counts.entry(ending).or_insert(0) += 1;
        }

        let mut endings: Vec<(String, usize)> = ending_counts.into_iter().collect();
        // Frequency first, then lexical for a stable order
        endings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let common_endings = endings
            .into_iter()
            .take(MAX_COMMON_ENDINGS)
            .map(|(ending, _)| ending)
            .collect();

        let mut sample_greetings: Vec<String> = Vec::new();
        for text in &texts {
            if sample_greetings.len() >= MAX_SAMPLE_GREETINGS {
                break;
            }
            let is_greeting = greeting_markers.iter().any(|m| text.contains(m.as_str()));
            if is_greeting && !sample_greetings.iter().any(|g| g == text) {
                sample_greetings.push((*text).to_string());
            }
        }

        Self {
            avg_message_length,
            common_endings,
            sample_greetings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        crate::config::default_greeting_markers()
    }

    #[test]
    fn test_analyze_average_length() {
        let profile = PersonaProfile::analyze(&["abcd", "ab", "  "], &markers());
        assert!((profile.avg_message_length - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_analyze_endings_by_frequency() {
        let texts = ["そうだよね。", "いいよね！", "なるほどだよ", "了解だよ"];
        let profile = PersonaProfile::analyze(&texts, &markers());
        assert_eq!(profile.common_endings[0], "だよ");
        assert!(profile.common_endings.contains(&"よね".to_string()));
    }

    #[test]
    fn test_analyze_greetings_deduplicated() {
        let texts = ["おはよう！", "おはよう！", "こんばんは〜", "今日は雨"];
        let profile = PersonaProfile::analyze(&texts, &markers());
        assert_eq!(profile.sample_greetings, vec!["おはよう！", "こんばんは〜"]);
    }

    #[test]
    fn test_analyze_empty_corpus() {
        let empty: [&str; 0] = [];
        let profile = PersonaProfile::analyze(&empty, &markers());
        assert_eq!(profile, PersonaProfile::default());
        assert!((profile.avg_message_length - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_matches_file_default() {
        let from_json: PersonaProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(PersonaProfile::default(), from_json);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = PersonaProfile::load(dir.path().join("persona.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("persona.json");
        let profile = PersonaProfile {
            avg_message_length: 42.0,
            common_endings: vec!["だね".to_string()],
            sample_greetings: vec!["おはよう".to_string()],
        };
        profile.save(&path).await.unwrap();
        assert_eq!(PersonaProfile::load(&path).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_load_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("persona.json");
        tokio::fs::write(&path, r#"{"common_endings": ["よ"]}"#).await.unwrap();
        let profile = PersonaProfile::load(&path).await.unwrap().unwrap();
        assert!((profile.avg_message_length - 50.0).abs() < f64::EPSILON);
        assert!(profile.sample_greetings.is_empty());
    }
}
