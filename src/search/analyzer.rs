//! Text analyzer - HTML to lemmas, lemmas to highlighted snippets / 文本分析器
//!
//! Stateless apart from the morphology backend and snippet window settings,
//! so one instance is shared by the crawler and the search engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use scraper::{Html, Selector};

use super::morphology::{Language, Morphology, SnowballMorphology};
use crate::config::SearchConfig;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Elements whose text never reaches the snippet / 不参与摘要的元素
const HIDDEN_ELEMENTS: &[&str] = &["head", "script", "style", "noscript", "template"];

pub const EMPHASIS_OPEN: &str = "<b>";
pub const EMPHASIS_CLOSE: &str = "</b>";

#[derive(Clone)]
pub struct TextAnalyzer {
    morphology: Arc<dyn Morphology>,
    snippet_length: usize,
    snippet_indent: usize,
}

impl TextAnalyzer {
    pub fn new(morphology: Arc<dyn Morphology>, snippet_length: usize, snippet_indent: usize) -> Self {
        Self {
            morphology,
            snippet_length,
            snippet_indent,
        }
    }

    /// Build from the `search` config section / 根据配置构建
    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(
            Arc::new(SnowballMorphology::new(config.language)),
            config.effective_snippet_length(),
            config.effective_snippet_indent(),
        )
    }

    pub fn for_language(language: Language) -> Self {
        Self::from_config(&SearchConfig {
            language,
            ..SearchConfig::default()
        })
    }

    /// Remove tags and collapse whitespace / 去除标签并压缩空白
    pub fn strip_markup(&self, html: &str) -> String {
        let text = TAG_RE.replace_all(html, " ");
        WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
    }

    /// Normal form -> occurrence count, closed-class words dropped / 词元 -> 出现次数
    pub fn extract_lemmas(&self, text: &str) -> HashMap<String, u32> {
        let mut counts = HashMap::new();
        for word in self.words(&text.to_lowercase()) {
            let Some(form) = self.morphology.analyze(&word) else {
                continue;
            };
            if form.part_of_speech.is_closed_class() {
                continue;
            }
            *counts.entry(form.normal_form).or_insert(0) += 1;
        }
        counts
    }

    /// Document `<title>`, empty if absent / 文档标题
    pub fn extract_title(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|title| collapse(&title.text().collect::<String>()))
            .unwrap_or_default()
    }

    /// Highlighted excerpt around the first query-lemma hit / 生成高亮摘要
    ///
    /// Every word of the page text whose normal form belongs to `lemmas` is
    /// wrapped in `<b>`/`</b>` wherever it occurs literally (case-sensitive,
    /// mid-word hits included). The excerpt starts up to `snippet_indent`
    /// chars before the first hit and spans up to `snippet_length` chars,
    /// widened to whole words. Empty when nothing matches.
    pub fn build_snippet(&self, html: &str, lemmas: &HashSet<String>) -> String {
        let text = plain_text(html);

        let mut hits: Vec<String> = self
            .words(&text)
            .into_iter()
            .filter(|word| {
                self.morphology
                    .analyze(&word.to_lowercase())
                    .map_or(false, |form| lemmas.contains(&form.normal_form))
            })
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if hits.is_empty() {
            return String::new();
        }

        // 长词优先，避免短词切断长词
        hits.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let pattern = hits.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
        let highlighted = match Regex::new(&pattern) {
            Ok(re) => re
                .replace_all(&text, |caps: &Captures| {
                    format!("{}{}{}", EMPHASIS_OPEN, &caps[0], EMPHASIS_CLOSE)
                })
                .into_owned(),
            Err(e) => {
                tracing::warn!("snippet pattern rejected: {}", e);
                return String::new();
            }
        };

        let Some(first_byte) = highlighted.find(EMPHASIS_OPEN) else {
            return String::new();
        };
        let chars: Vec<char> = highlighted.chars().collect();
        let first = highlighted[..first_byte].chars().count();

        let mut start = first.saturating_sub(self.snippet_indent);
        while start > 0 && !chars[start - 1].is_whitespace() {
            start -= 1;
        }

        let mut end = (first + self.snippet_length).min(chars.len());
        while end < chars.len() && !chars[end].is_whitespace() {
            end += 1;
        }

        chars[start..end].iter().collect::<String>().trim().to_string()
    }

    /// Split into runs of target-alphabet chars / 按目标字母表切词
    fn words(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !self.morphology.is_word_char(c))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Visible document text with whitespace collapsed / 可见正文文本
fn plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(text);
        }
    }
    collapse(&parts.join(" "))
}
