//! Caption text classification.
//!
//! The default [`KeywordClassifier`] is a fixed lookup-table heuristic, not a
//! trained detector. It sits behind [`ContentClassifier`] so a real detector
//! can replace it without touching aggregation.

use std::collections::{HashMap, HashSet};

/// Result of classifying the tokens of every caption of one video.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub objects: Vec<String>,
    pub scenes: Vec<String>,
    pub actions: Vec<String>,
    pub mood: String,
}

pub trait ContentClassifier: Send + Sync {
    /// `tokens` are lowercase caption words in temporal order.
    fn classify(&self, tokens: &[String]) -> Classification;
}

pub const NEUTRAL_MOOD: &str = "neutral";

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "of", "in", "on", "at", "to", "for", "with", "from",
    "by", "into", "onto", "over", "under", "near", "next", "behind", "front", "top", "up",
    "down", "out", "off", "through", "while", "as", "is", "are", "was", "were", "be", "been",
    "being", "has", "have", "had", "it", "its", "this", "that", "these", "those", "there",
    "their", "they", "he", "she", "his", "her", "him", "them", "who", "which", "what", "some",
    "very", "two", "three", "one", "other", "another", "each", "it's", "image", "picture",
    "photo", "view", "arafed", "araffe", "arafe", "close", "background", "foreground",
];

const SCENE_KEYWORDS: &[&str] = &[
    "indoor", "indoors", "outdoor", "outdoors", "street", "road", "highway", "room", "bedroom",
    "kitchen", "bathroom", "office", "classroom", "studio", "stage", "beach", "forest", "park",
    "city", "field", "mountain", "mountains", "lake", "river", "ocean", "sea", "garden",
    "stadium", "restaurant", "desert", "countryside", "market", "airport", "station", "hallway",
    "library", "gym", "farm", "village", "underwater",
];

const MOOD_KEYWORDS: &[(&str, &str)] = &[
    ("happy", "happy"),
    ("smiling", "happy"),
    ("smile", "happy"),
    ("joyful", "happy"),
    ("cheerful", "happy"),
    ("laughing", "happy"),
    ("celebrating", "happy"),
    ("sad", "sad"),
    ("crying", "sad"),
    ("lonely", "sad"),
    ("tearful", "sad"),
    ("dark", "dark"),
    ("gloomy", "dark"),
    ("shadowy", "dark"),
    ("stormy", "dark"),
    ("calm", "calm"),
    ("peaceful", "calm"),
    ("quiet", "calm"),
    ("serene", "calm"),
    ("relaxing", "calm"),
    ("tranquil", "calm"),
    ("energetic", "energetic"),
    ("busy", "energetic"),
    ("crowded", "energetic"),
    ("exciting", "energetic"),
    ("scary", "tense"),
    ("spooky", "tense"),
    ("creepy", "tense"),
    ("angry", "tense"),
    ("romantic", "romantic"),
];

// -ing words that name things rather than actions
const ING_NOUNS: &[&str] = &[
    "building", "ceiling", "clothing", "evening", "morning", "painting", "wedding",
    "something", "nothing", "everything", "anything", "string", "spring", "sibling",
    "pudding", "railing", "awning", "icing",
];

/// Split a caption into lowercase content words.
///
/// Apostrophes are dropped (`dog's` becomes `dogs`), every other
/// non-alphanumeric character separates words. Stop-words, pure numbers and
/// single characters are removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    text.to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 1)
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .filter(|word| !stop.contains(word))
        .map(str::to_string)
        .collect()
}

/// Drop case-insensitive duplicates, keeping first-seen order and spelling.
pub fn dedup_case_insensitive<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let item = item.into();
        if seen.insert(item.to_lowercase()) {
            out.push(item);
        }
    }
    out
}

pub struct KeywordClassifier {
    scenes: HashSet<String>,
    moods: HashMap<String, String>,
    ing_nouns: HashSet<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            SCENE_KEYWORDS.iter().copied(),
            MOOD_KEYWORDS.iter().copied(),
        )
    }
}

impl KeywordClassifier {
    /// Build a classifier from caller-supplied tables.
    pub fn new<S, M, K, C>(scenes: S, moods: M) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        M: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<String>,
    {
        Self {
            scenes: scenes
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
            moods: moods
                .into_iter()
                .map(|(word, category)| (word.into().to_lowercase(), category.into()))
                .collect(),
            ing_nouns: ING_NOUNS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_action(&self, token: &str) -> bool {
        token.len() > 4 && token.ends_with("ing") && !self.ing_nouns.contains(token)
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, tokens: &[String]) -> Classification {
        let mut objects = Vec::new();
        let mut scenes = Vec::new();
        let mut actions = Vec::new();
        // category -> (hits, first position)
        let mut votes: HashMap<&str, (usize, usize)> = HashMap::new();

        for (position, token) in tokens.iter().enumerate() {
            let token = token.to_lowercase();
            if let Some(category) = self.moods.get(&token) {
                let entry = votes.entry(category.as_str()).or_insert((0, position));
                entry.0 += 1;
            } else if self.scenes.contains(&token) {
                scenes.push(token);
            } else if self.is_action(&token) {
                actions.push(token);
            } else {
                objects.push(token);
            }
        }

        let mood = votes
            .into_iter()
            .max_by(|(_, (hits_a, first_a)), (_, (hits_b, first_b))| {
                hits_a.cmp(hits_b).then(first_b.cmp(first_a))
            })
            .map(|(category, _)| category.to_string())
            .unwrap_or_else(|| NEUTRAL_MOOD.to_string());

        Classification {
            objects: dedup_case_insensitive(objects),
            scenes: dedup_case_insensitive(scenes),
            actions: dedup_case_insensitive(actions),
            mood,
        }
    }
}
