//! Heuristic reply composition from retrieved messages and the persona profile.
//!
//! Nothing here touches the network. Randomness (greeting and ending choice)
//! comes from the caller so replies are reproducible under a seeded RNG.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::config::ComposerConfig;
use crate::persona::PersonaProfile;

/// Characters that terminate a sentence
pub const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// Coarse intent of an incoming query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryIntent {
    Greeting,
    Question,
    Casual,
}

/// Deterministic, persona-aware reply builder
#[derive(Debug, Clone, Default)]
pub struct ResponseComposer {
    config: ComposerConfig,
}

impl ResponseComposer {
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Classify by lexicon lookup. Greeting markers win over question markers.
    pub fn classify_intent(&self, query: &str) -> QueryIntent {
        let query = query.to_lowercase();
        if contains_any(&query, &self.config.greeting_markers) {
            QueryIntent::Greeting
        } else if contains_any(&query, &self.config.question_markers) {
            QueryIntent::Question
        } else {
            QueryIntent::Casual
        }
    }

    /// Build a reply for `query` from `retrieved` (best match first)
    pub fn compose<R: Rng + ?Sized>(
        &self,
        query: &str,
        retrieved: &[String],
        persona: &PersonaProfile,
        rng: &mut R,
    ) -> String {
        match self.classify_intent(query) {
            QueryIntent::Greeting => match persona.sample_greetings.choose(rng) {
                Some(greeting) => greeting.clone(),
                None => self.casual_reply(retrieved, persona, rng),
            },
            QueryIntent::Question => self.detailed_answer(retrieved, persona, rng),
            QueryIntent::Casual => self.casual_reply(retrieved, persona, rng),
        }
    }

    /// Multi-line answer stitched from distinct sentences of the retrieved messages.
    ///
    /// Sentences are taken in retrieval order until their combined length
    /// reaches `max(avg_message_length * 3, min_target_length)`. A sentence
    /// whose character-set Jaccard similarity to any accepted sentence exceeds
    /// the duplicate threshold is skipped.
    pub fn detailed_answer<R: Rng + ?Sized>(
        &self,
        retrieved: &[String],
        persona: &PersonaProfile,
        rng: &mut R,
    ) -> String {
        let Some(first) = retrieved.first() else {
            return self.config.unknown_response.clone();
        };

        let target_length =
            (persona.avg_message_length * 3.0).max(self.config.min_target_length as f64);

        let mut accepted: Vec<String> = Vec::new();
        let mut total_length = 0usize;

        'messages: for message in retrieved {
            for sentence in split_sentences(message) {
                if total_length as f64 >= target_length {
                    break 'messages;
                }
                let length = sentence.chars().count();
                if length < self.config.min_sentence_chars {
                    continue;
                }
                let max_similarity = accepted
                    .iter()
                    .map(|used| jaccard_similarity(&sentence, used))
                    .fold(0.0_f64, f64::max);
                if max_similarity > self.config.duplicate_threshold {
                    continue;
                }
                total_length += length;
                accepted.push(sentence);
            }
        }

        let parts: Vec<String> = if accepted.len() < 2 && retrieved.len() >= 2 {
            retrieved[..2].to_vec()
        } else {
            accepted
        };

        if parts.is_empty() {
            return first.clone();
        }

        let last = parts.len() - 1;
        parts
            .iter()
            .enumerate()
            .map(|(i, part)| {
                let terminated = self.ensure_terminated(part);
                if i == last {
                    self.apply_common_ending(&terminated, &persona.common_endings, rng)
                } else {
                    terminated
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short reply sized toward the persona's average message length.
    ///
    /// Long best matches are cut to their first sentence; short ones borrow
    /// the first sentence of the runner-up.
    pub fn casual_reply<R: Rng + ?Sized>(
        &self,
        retrieved: &[String],
        persona: &PersonaProfile,
        rng: &mut R,
    ) -> String {
        let Some(base) = retrieved.first() else {
            return self.config.unknown_response.clone();
        };

        let length = base.chars().count() as f64;
        let target = persona.avg_message_length;
        let full_stop = &self.config.full_stop;

        let response = if length > target * 1.5 {
            match split_sentences(base).into_iter().next() {
                Some(sentence) => format!("{sentence}{full_stop}"),
                None => base.clone(),
            }
        } else if length < target * 0.5 && retrieved.len() > 1 {
            match split_sentences(&retrieved[1]).into_iter().next() {
                Some(sentence) => format!("{base} {sentence}{full_stop}"),
                None => base.clone(),
            }
        } else {
            base.clone()
        };

        self.apply_common_ending(&response, &persona.common_endings, rng)
    }

    /// Give `text` one of the persona's sentence endings.
    ///
    /// Text that already ends in a complete grammatical form is returned
    /// untouched, as is text that already carries the chosen ending.
    pub fn apply_common_ending<R: Rng + ?Sized>(
        &self,
        text: &str,
        endings: &[String],
        rng: &mut R,
    ) -> String {
        if endings.is_empty() {
            return text.to_string();
        }

        let stripped = text.trim_end_matches(is_trailing_noise);
        let is_complete = self
            .config
            .complete_endings
            .iter()
            .any(|ending| !ending.is_empty() && stripped.ends_with(ending.as_str()));
        if is_complete {
            return text.to_string();
        }

        let Some(ending) = endings.choose(rng) else {
            return text.to_string();
        };

        let ending_core = ending.trim_end_matches(is_ending_punctuation);
        if ending_core.is_empty() {
            // Pure punctuation ending
            format!("{stripped}{ending}")
        } else if stripped.ends_with(ending_core) {
            text.to_string()
        } else {
            format!("{stripped}{ending}")
        }
    }

    fn ensure_terminated(&self, text: &str) -> String {
        if text.ends_with(SENTENCE_TERMINATORS) {
            text.to_string()
        } else {
            format!("{text}{}", self.config.full_stop)
        }
    }
}

/// `haystack` must already be lowercase; needles are lowercased here
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles
        .iter()
        .any(|needle| !needle.is_empty() && haystack.contains(needle.to_lowercase().as_str()))
}

/// Split text on sentence terminators, dropping blank fragments
pub fn split_sentences(text: &str) -> Vec<String> {
    text.split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Intersection-over-union of the character sets of `a` and `b`
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}

/// Punctuation, whitespace and emoji that may trail a message
pub fn is_trailing_noise(c: char) -> bool {
    is_ending_punctuation(c) || ('\u{1F300}'..='\u{1F9FF}').contains(&c)
}

fn is_ending_punctuation(c: char) -> bool {
    SENTENCE_TERMINATORS.contains(&c) || c.is_whitespace()
}
