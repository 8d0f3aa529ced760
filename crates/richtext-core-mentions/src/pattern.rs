//! Mention patterns.
//!
//! All patterns are built from the trigger list (literal strings or regex fragments) and a
//! punctuation character class, then compiled with Oniguruma: the body class needs a negative
//! lookahead so that a trigger never counts as part of a mention body.
//!
//! The query pattern is anchored to the end of the text it runs on, so running it on the text
//! before the caret only ever matches the mention being typed.

use crate::error::MentionError;
use onig::Regex;
use richtext_core::text::char_offset;
use std::fmt;
use std::sync::Arc;

/// Punctuation that ends a mention body.
pub const DEFAULT_PUNCTUATION: &str = r#"\.,\*\?\$\|#{}\(\)\^\[\]\\/!%'"~=<>_:;"#;

/// Characters (besides whitespace and start of text) that may precede a trigger.
pub const DEFAULT_PRE_TRIGGER_CHARS: &str = r"\(";

/// Upper bound on the mention body length.
pub const LENGTH_LIMIT: usize = 75;

/// Alternation of all triggers: `(?:t1|t2|...)`.
pub fn triggers_pattern(triggers: &[String]) -> String {
    format!("(?:{})", triggers.join("|"))
}

/// One body character: not whitespace, not punctuation, not the start of a trigger.
pub fn valid_chars_pattern(triggers: &[String], punctuation: &str) -> String {
    format!(r"(?!{})[^\s{}]", triggers_pattern(triggers), punctuation)
}

/// Joins allowed inside a body when spaces are allowed: `Mr. Smith`, whitespace, punctuation.
pub fn valid_joins_pattern(punctuation: &str) -> String {
    format!(r"(?:\.[ |$]|\s|[{punctuation}])")
}

fn lead_pattern(pre_trigger_chars: &str) -> String {
    if pre_trigger_chars.is_empty() {
        r"(\A|\s)".to_string()
    } else {
        format!(r"(\A|\s|[{pre_trigger_chars}])")
    }
}

/// Pattern for the mention being typed.
///
/// Capture groups: 1 = the character before the trigger (empty at start of text),
/// 2 = trigger + query, 3 = query.
pub fn query_pattern(
    triggers: &[String],
    punctuation: &str,
    pre_trigger_chars: &str,
    allow_spaces: bool,
) -> String {
    let valid_chars = valid_chars_pattern(triggers, punctuation);
    let body = if allow_spaces {
        format!("(?:{valid_chars}|{})", valid_joins_pattern(punctuation))
    } else {
        format!("(?:{valid_chars})")
    };
    format!(
        r"{}({}({}{{0,{LENGTH_LIMIT}}}))\z",
        lead_pattern(pre_trigger_chars),
        triggers_pattern(triggers),
        body
    )
}

/// Pattern for whole-text scans.
///
/// Capture groups: 1 = the character before the trigger, 2 = trigger, 3 = value.
pub fn scan_pattern(triggers: &[String], punctuation: &str, pre_trigger_chars: &str) -> String {
    format!(
        "{}({})((?:{}){{1,{LENGTH_LIMIT}}})",
        lead_pattern(pre_trigger_chars),
        triggers_pattern(triggers),
        valid_chars_pattern(triggers, punctuation)
    )
}

fn compile(pattern: String) -> Result<Arc<Regex>, MentionError> {
    Regex::new(&pattern)
        .map(Arc::new)
        .map_err(|e| MentionError::PatternCompile {
            pattern,
            message: e.to_string(),
        })
}

/// A trigger + query run found before the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryMatch {
    /// Char offset of the trigger within the scanned text.
    pub lead_offset: usize,
    /// The query (body typed so far, possibly empty).
    pub matching_string: String,
    /// Trigger + query.
    pub replaceable_string: String,
    /// The trigger that opened the match.
    pub trigger: String,
}

/// A piece of scanned plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSegment {
    /// Plain text run.
    Text(String),
    /// Recognized mention.
    Mention {
        /// Trigger.
        trigger: String,
        /// Value.
        value: String,
    },
}

/// Compiled patterns for one trigger set.
#[derive(Clone)]
pub struct PatternSet {
    triggers: Vec<String>,
    punctuation: String,
    query: Arc<Regex>,
    query_with_spaces: Arc<Regex>,
    scan: Arc<Regex>,
    word_char: Arc<Regex>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("triggers", &self.triggers)
            .field("punctuation", &self.punctuation)
            .finish_non_exhaustive()
    }
}

impl PatternSet {
    /// Compile the patterns for `triggers`.
    pub fn new(
        triggers: &[String],
        punctuation: &str,
        pre_trigger_chars: &str,
    ) -> Result<Self, MentionError> {
        if triggers.is_empty() || triggers.iter().any(String::is_empty) {
            return Err(MentionError::NoTriggers);
        }
        Ok(Self {
            triggers: triggers.to_vec(),
            punctuation: punctuation.to_string(),
            query: compile(query_pattern(triggers, punctuation, pre_trigger_chars, false))?,
            query_with_spaces: compile(query_pattern(
                triggers,
                punctuation,
                pre_trigger_chars,
                true,
            ))?,
            scan: compile(scan_pattern(triggers, punctuation, pre_trigger_chars))?,
            word_char: compile(format!(
                r"\A{}\z",
                valid_chars_pattern(triggers, punctuation)
            ))?,
        })
    }

    /// Configured triggers.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// `true` when `c` may be part of a mention body.
    pub fn is_word_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.word_char.find(c.encode_utf8(&mut buf)).is_some()
    }

    /// `true` when `text` is exactly one of the configured triggers.
    pub fn is_trigger(&self, text: &str) -> bool {
        self.triggers.iter().any(|trigger| trigger == text)
    }

    /// Match the mention being typed at the end of `text`.
    pub fn find_match(&self, text: &str, allow_spaces: bool) -> Option<QueryMatch> {
        let regex = if allow_spaces {
            &self.query_with_spaces
        } else {
            &self.query
        };
        let captures = regex.captures(text)?;
        let (start, _) = captures.pos(0)?;
        let leading = captures.at(1).unwrap_or("");
        let replaceable = captures.at(2)?;
        let matching = captures.at(3).unwrap_or("");

        let trigger = trigger_of(replaceable, matching);
        if trigger.is_empty() {
            return None;
        }
        Some(QueryMatch {
            lead_offset: char_offset(text, start + leading.len()),
            matching_string: matching.to_string(),
            replaceable_string: replaceable.to_string(),
            trigger,
        })
    }

    /// Split plain text into text runs and mentions.
    pub fn scan(&self, text: &str) -> Vec<TextSegment> {
        let mut segments = Vec::new();
        let mut last = 0usize;
        for captures in self.scan.captures_iter(text) {
            let (Some((trigger_start, _)), Some(trigger), Some(value), Some((_, end))) = (
                captures.pos(2),
                captures.at(2),
                captures.at(3),
                captures.pos(3),
            ) else {
                continue;
            };
            if trigger_start > last {
                segments.push(TextSegment::Text(text[last..trigger_start].to_string()));
            }
            segments.push(TextSegment::Mention {
                trigger: trigger.to_string(),
                value: value.to_string(),
            });
            last = end;
        }
        if last < text.len() {
            segments.push(TextSegment::Text(text[last..].to_string()));
        }
        segments
    }
}

/// The trigger of a match: the replaceable string without the last occurrence of the query.
pub fn trigger_of(replaceable: &str, matching: &str) -> String {
    match replaceable.rfind(matching) {
        Some(index) => format!(
            "{}{}",
            &replaceable[..index],
            &replaceable[index + matching.len()..]
        ),
        None => replaceable.to_string(),
    }
}
