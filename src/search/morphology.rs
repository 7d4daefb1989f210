//! Morphological analysis - normal form + part of speech per word / 词形分析
//!
//! The analyzer is pluggable through [`Morphology`]. The bundled
//! [`SnowballMorphology`] reduces words with the Snowball stemmer and tags
//! closed-class words (prepositions, conjunctions, interjections) from a
//! fixed lexicon.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

/// Target language / 目标语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Russian,
    English,
}

/// Coarse part of speech / 词性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Preposition,
    Conjunction,
    Interjection,
    Content,
}

impl PartOfSpeech {
    /// Closed-class words are never indexed / 虚词不参与索引
    pub fn is_closed_class(&self) -> bool {
        matches!(
            self,
            PartOfSpeech::Preposition | PartOfSpeech::Conjunction | PartOfSpeech::Interjection
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    pub normal_form: String,
    pub part_of_speech: PartOfSpeech,
}

/// Morphological analyzer for one target language / 单语言词形分析器
pub trait Morphology: Send + Sync {
    /// Whether `c` belongs to the target alphabet / 是否为目标语言字母
    fn is_word_char(&self, c: char) -> bool;

    /// Analyze a lowercase word; `None` when analysis fails / 分析失败返回 None
    fn analyze(&self, word: &str) -> Option<WordForm>;
}

const RUSSIAN_PREPOSITIONS: &[&str] = &[
    "в", "во", "без", "безо", "до", "из", "изо", "к", "ко", "на", "по", "о", "об", "обо", "от",
    "ото", "перед", "передо", "пред", "при", "через", "с", "со", "у", "за", "над", "надо", "под",
    "подо", "про", "для", "между", "меж", "около", "вокруг", "после", "среди", "сквозь", "ради",
    "возле", "мимо", "против", "вдоль", "кроме", "вместо", "внутри", "вне", "сверх", "близ",
];

const RUSSIAN_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "что", "чтобы", "если", "когда", "хотя", "потому",
    "поэтому", "также", "тоже", "зато", "однако", "будто", "словно", "ни", "ибо", "пока",
    "едва", "раз", "причем", "притом", "следовательно", "итак",
];

const RUSSIAN_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "ой", "эх", "увы", "ура", "эй", "ого", "ага", "ух", "фу", "ай", "браво", "тьфу",
    "батюшки", "ахти", "айда", "алло",
];

const ENGLISH_PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "to", "from", "up", "down", "of", "off",
    "over", "under", "near", "among", "upon", "within", "without", "across", "behind", "beyond",
    "toward", "towards", "via",
];

const ENGLISH_CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "yet", "because", "although", "though", "while", "if", "unless",
    "since", "whether", "whereas",
];

const ENGLISH_INTERJECTIONS: &[&str] = &[
    "oh", "ah", "wow", "hey", "oops", "ouch", "alas", "hmm", "uh", "um", "hurray", "hooray",
];

fn lexicon(groups: &[(&[&'static str], PartOfSpeech)]) -> HashMap<&'static str, PartOfSpeech> {
    let mut map = HashMap::new();
    for (words, pos) in groups {
        for word in words.iter() {
            map.entry(*word).or_insert(*pos);
        }
    }
    map
}

static RUSSIAN_CLOSED_CLASS: Lazy<HashMap<&'static str, PartOfSpeech>> = Lazy::new(|| {
    lexicon(&[
        (RUSSIAN_PREPOSITIONS, PartOfSpeech::Preposition),
        (RUSSIAN_CONJUNCTIONS, PartOfSpeech::Conjunction),
        (RUSSIAN_INTERJECTIONS, PartOfSpeech::Interjection),
    ])
});

static ENGLISH_CLOSED_CLASS: Lazy<HashMap<&'static str, PartOfSpeech>> = Lazy::new(|| {
    lexicon(&[
        (ENGLISH_PREPOSITIONS, PartOfSpeech::Preposition),
        (ENGLISH_CONJUNCTIONS, PartOfSpeech::Conjunction),
        (ENGLISH_INTERJECTIONS, PartOfSpeech::Interjection),
    ])
});

/// Snowball-stemmer backed morphology / 基于 Snowball 词干提取的词形分析
pub struct SnowballMorphology {
    language: Language,
    stemmer: Stemmer,
}

impl SnowballMorphology {
    pub fn new(language: Language) -> Self {
        let algorithm = match language {
            Language::Russian => Algorithm::Russian,
            Language::English => Algorithm::English,
        };
        Self {
            language,
            stemmer: Stemmer::create(algorithm),
        }
    }

    fn closed_class(&self) -> &'static HashMap<&'static str, PartOfSpeech> {
        match self.language {
            Language::Russian => &RUSSIAN_CLOSED_CLASS,
            Language::English => &ENGLISH_CLOSED_CLASS,
        }
    }
}

impl Morphology for SnowballMorphology {
    fn is_word_char(&self, c: char) -> bool {
        match self.language {
            Language::Russian => matches!(c, 'а'..='я' | 'А'..='Я' | 'ё' | 'Ё'),
            Language::English => c.is_ascii_alphabetic(),
        }
    }

    fn analyze(&self, word: &str) -> Option<WordForm> {
        if word.is_empty() || !word.chars().all(|c| self.is_word_char(c)) {
            return None;
        }

        if let Some(pos) = self.closed_class().get(word) {
            return Some(WordForm {
                normal_form: word.to_string(),
                part_of_speech: *pos,
            });
        }

        // ё 与 е 视为同一字母
        let folded;
        let word = if self.language == Language::Russian && word.contains('ё') {
            folded = word.replace('ё', "е");
            folded.as_str()
        } else {
            word
        };

        let normal_form = self.stemmer.stem(word).into_owned();
        if normal_form.is_empty() {
            return None;
        }
        Some(WordForm {
            normal_form,
            part_of_speech: PartOfSpeech::Content,
        })
    }
}
