//! Plugin configuration.
//!
//! [`MentionsConfig`] deserializes from camelCase JSON so a host can ship it as data:
//!
//! ```json
//! {
//!   "triggers": ["@", "#"],
//!   "allowSpaces": false,
//!   "creatable": {"@": "Add user \"{{name}}\""},
//!   "menuItemLimit": 10,
//!   "items": {"@": ["Anton", {"value": "Catherine", "data": {"id": 3}}]}
//! }
//! ```
//!
//! Per-trigger settings and static item lists are keyed by trigger. A key matches a trigger when
//! it is equal to it, or otherwise when it matches the whole trigger as a regular expression.

use crate::error::MentionError;
use crate::node::MentionData;
use crate::pattern::{DEFAULT_PRE_TRIGGER_CHARS, DEFAULT_PUNCTUATION};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Default number of suggestions shown.
pub const DEFAULT_MENU_ITEM_LIMIT: usize = 5;

/// Debounce used when a search source is attached and no delay is configured.
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 250;

static NAME_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*name\s*\}\}").expect("static pattern"));

/// A candidate supplied by the host: a bare value or a value with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MentionItem {
    /// Bare value.
    Plain(String),
    /// Value with optional metadata.
    Structured {
        /// Value.
        value: String,
        /// Metadata.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<MentionData>,
    },
}

impl MentionItem {
    /// The value.
    pub fn value(&self) -> &str {
        match self {
            MentionItem::Plain(value) => value,
            MentionItem::Structured { value, .. } => value,
        }
    }

    /// The metadata.
    pub fn data(&self) -> Option<&MentionData> {
        match self {
            MentionItem::Plain(_) => None,
            MentionItem::Structured { data, .. } => data.as_ref(),
        }
    }
}

impl From<&str> for MentionItem {
    fn from(value: &str) -> Self {
        MentionItem::Plain(value.to_string())
    }
}

/// A setting given once for every trigger or separately per trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerTrigger<T> {
    /// Same value for every trigger.
    All(T),
    /// Values keyed by trigger.
    ByTrigger(IndexMap<String, T>),
}

/// Whether typed queries may become new mentions, and the label of the "create" entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Creatable {
    /// `true` enables creation with the default label `Add "<query>"`.
    Flag(bool),
    /// Enables creation with a label template; `{{name}}` is replaced by the query.
    Template(String),
}

impl Creatable {
    /// Whether creation is enabled.
    pub fn enabled(&self) -> bool {
        !matches!(self, Creatable::Flag(false))
    }

    /// Label of the "create" entry for `query`.
    pub fn label(&self, query: &str) -> Option<String> {
        match self {
            Creatable::Flag(false) => None,
            Creatable::Flag(true) => Some(format!("Add \"{query}\"")),
            Creatable::Template(template) => Some(
                NAME_PLACEHOLDER
                    .replace_all(template, regex::NoExpand(query))
                    .into_owned(),
            ),
        }
    }
}

/// Maximum number of suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuItemLimit {
    /// Explicit limit; `0` disables truncation.
    Limit(usize),
    /// `false` disables truncation, `true` uses the default limit.
    Flag(bool),
}

impl MenuItemLimit {
    /// Effective limit, `None` when unlimited.
    pub fn limit(self) -> Option<usize> {
        match self {
            MenuItemLimit::Limit(0) | MenuItemLimit::Flag(false) => None,
            MenuItemLimit::Limit(n) => Some(n),
            MenuItemLimit::Flag(true) => Some(DEFAULT_MENU_ITEM_LIMIT),
        }
    }
}

/// Configuration of the mentions plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MentionsConfig {
    /// Trigger strings (literal prefixes or regex fragments).
    pub triggers: Vec<String>,
    /// Punctuation character class body that ends a mention.
    pub punctuation: String,
    /// Character class body of characters allowed right before a trigger.
    pub pre_trigger_chars: String,
    /// Allow spaces and punctuation joins inside the query.
    pub allow_spaces: bool,
    /// Allow creating mentions that are not in the candidate list.
    pub creatable: PerTrigger<Creatable>,
    /// Convert a typed mention into a token when the editor loses focus.
    pub insert_on_blur: bool,
    /// Offer mentions already in the document as suggestions.
    pub show_current_mentions_as_suggestions: bool,
    /// Backspace next to a mention reopens the menu instead of deleting it.
    pub show_mentions_on_delete: bool,
    /// Maximum number of suggestions.
    pub menu_item_limit: PerTrigger<MenuItemLimit>,
    /// Debounce delay in milliseconds; defaults to 250 with a search source and 0 otherwise.
    pub search_delay: Option<u64>,
    /// Insert protective spaces around mentions.
    pub auto_space: bool,
    /// Static candidates keyed by trigger.
    pub items: IndexMap<String, Vec<MentionItem>>,
    /// Show the trigger catalogue while the editor has focus and no trigger is active.
    pub combobox: bool,
}

impl Default for MentionsConfig {
    fn default() -> Self {
        Self {
            triggers: Vec::new(),
            punctuation: DEFAULT_PUNCTUATION.to_string(),
            pre_trigger_chars: DEFAULT_PRE_TRIGGER_CHARS.to_string(),
            allow_spaces: true,
            creatable: PerTrigger::All(Creatable::Flag(false)),
            insert_on_blur: true,
            show_current_mentions_as_suggestions: true,
            show_mentions_on_delete: false,
            menu_item_limit: PerTrigger::All(MenuItemLimit::Limit(DEFAULT_MENU_ITEM_LIMIT)),
            search_delay: None,
            auto_space: true,
            items: IndexMap::new(),
            combobox: false,
        }
    }
}

impl MentionsConfig {
    /// Defaults with the given triggers.
    pub fn new<S: Into<String>>(triggers: impl IntoIterator<Item = S>) -> Self {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MentionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Static candidates for one trigger.
    pub fn with_items<S: Into<MentionItem>>(
        mut self,
        trigger: &str,
        items: impl IntoIterator<Item = S>,
    ) -> Self {
        self.items
            .insert(trigger.to_string(), items.into_iter().map(Into::into).collect());
        self
    }
}

/// Map from trigger keys to values, resolved against concrete triggers.
#[derive(Debug, Clone)]
pub struct TriggerMap<T> {
    entries: Vec<(String, Regex, T)>,
}

impl<T: Clone> TriggerMap<T> {
    /// Compile every key. Keys that are not valid patterns are rejected.
    pub fn compile(map: &IndexMap<String, T>) -> Result<Self, MentionError> {
        let entries = map
            .iter()
            .map(|(key, value)| {
                let pattern = Regex::new(&format!("^(?:{key})$")).map_err(|e| {
                    MentionError::InvalidTriggerKey {
                        key: key.clone(),
                        message: e.to_string(),
                    }
                })?;
                Ok((key.clone(), pattern, value.clone()))
            })
            .collect::<Result<Vec<_>, MentionError>>()?;
        Ok(Self { entries })
    }
}

impl<T> TriggerMap<T> {
    /// Value for `trigger`: an equal key first, then the first key matching as a pattern.
    pub fn get(&self, trigger: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(key, _, _)| key == trigger)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(_, pattern, _)| pattern.is_match(trigger))
            })
            .map(|(_, _, value)| value)
    }

    /// `true` when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compiled [`PerTrigger`] setting with a fallback for unlisted triggers.
#[derive(Debug, Clone)]
pub struct TriggerSetting<T> {
    all: Option<T>,
    by_trigger: TriggerMap<T>,
    fallback: T,
}

impl<T: Clone> TriggerSetting<T> {
    /// Compile `setting`; triggers missing from a per-trigger map get `fallback`.
    pub fn compile(setting: &PerTrigger<T>, fallback: T) -> Result<Self, MentionError> {
        Ok(match setting {
            PerTrigger::All(value) => Self {
                all: Some(value.clone()),
                by_trigger: TriggerMap { entries: Vec::new() },
                fallback,
            },
            PerTrigger::ByTrigger(map) => Self {
                all: None,
                by_trigger: TriggerMap::compile(map)?,
                fallback,
            },
        })
    }

    /// Value for `trigger`.
    pub fn get(&self, trigger: &str) -> &T {
        self.all
            .as_ref()
            .or_else(|| self.by_trigger.get(trigger))
            .unwrap_or(&self.fallback)
    }
}

/// Configuration with all trigger-keyed parts compiled.
#[derive(Debug, Clone)]
pub(crate) struct CompiledConfig {
    pub(crate) creatable: TriggerSetting<Creatable>,
    pub(crate) menu_item_limit: TriggerSetting<MenuItemLimit>,
    pub(crate) items: TriggerMap<Vec<MentionItem>>,
}

impl CompiledConfig {
    pub(crate) fn compile(config: &MentionsConfig) -> Result<Self, MentionError> {
        Ok(Self {
            creatable: TriggerSetting::compile(&config.creatable, Creatable::Flag(false))?,
            menu_item_limit: TriggerSetting::compile(
                &config.menu_item_limit,
                MenuItemLimit::Limit(DEFAULT_MENU_ITEM_LIMIT),
            )?,
            items: TriggerMap::compile(&config.items)?,
        })
    }
}
