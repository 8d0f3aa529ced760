//! Menu model handed to the rendering layer.

use crate::config::MentionItem;
use crate::node::MentionData;

/// Where a menu entry comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuItemKind {
    /// Static item or search result.
    Suggestion,
    /// A mention already present in the document.
    CurrentMention,
    /// Creates a mention from the typed query.
    Create,
}

/// What selecting an entry inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// A trigger (combobox catalogue); selecting it opens the value menu.
    Trigger,
    /// A mention value.
    Value,
}

/// One menu entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    /// Value committed into the mention.
    pub value: String,
    /// Text shown to the user.
    pub display_value: String,
    /// Metadata committed into the mention.
    pub data: Option<MentionData>,
    /// Origin of the entry.
    pub kind: MenuItemKind,
    /// Trigger or value entry.
    pub item_type: ItemType,
}

impl MenuItem {
    /// A value suggestion.
    pub fn suggestion(item: &MentionItem) -> Self {
        Self {
            value: item.value().to_string(),
            display_value: item.value().to_string(),
            data: item.data().cloned(),
            kind: MenuItemKind::Suggestion,
            item_type: ItemType::Value,
        }
    }

    /// A trigger catalogue entry.
    pub fn trigger(trigger: &str) -> Self {
        Self {
            value: trigger.to_string(),
            display_value: trigger.to_string(),
            data: None,
            kind: MenuItemKind::Suggestion,
            item_type: ItemType::Trigger,
        }
    }
}

/// Char span of the active match within its text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    /// Offset of the trigger.
    pub start: usize,
    /// Caret offset.
    pub end: usize,
}

/// Snapshot of the menu for the rendering layer.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    /// Whether the menu is shown.
    pub open: bool,
    /// Kind of entries listed.
    pub item_type: ItemType,
    /// Entries.
    pub items: Vec<MenuItem>,
    /// A search is pending.
    pub loading: bool,
    /// Highlighted entry.
    pub highlighted: Option<usize>,
    /// Span of the active match.
    pub match_span: Option<MatchSpan>,
    /// Active trigger.
    pub trigger: Option<String>,
}

impl MenuState {
    /// Closed menu.
    pub fn closed() -> Self {
        Self {
            open: false,
            item_type: ItemType::Value,
            items: Vec::new(),
            loading: false,
            highlighted: None,
            match_span: None,
            trigger: None,
        }
    }
}

/// Inputs of the value menu composition.
#[derive(Debug, Clone, Default)]
pub struct Composition<'a> {
    /// Raw query (not debounced).
    pub query: &'a str,
    /// Maximum number of suggestions, `None` for unlimited.
    pub limit: Option<usize>,
    /// Values of document mentions with the active trigger, in document order. Empty when the
    /// feature is off.
    pub current_mentions: Vec<&'a str>,
    /// A search is pending.
    pub loading: bool,
    /// Label of the "create" entry, `None` when creation is disabled.
    pub create_label: Option<String>,
}

/// Build the value menu: truncated results, then current document mentions, then "create".
pub fn compose_menu(results: &[MentionItem], input: &Composition<'_>) -> Vec<MenuItem> {
    let take = input.limit.unwrap_or(usize::MAX);
    let mut items: Vec<MenuItem> = results.iter().take(take).map(MenuItem::suggestion).collect();

    if !input.loading {
        let query = input.query.to_lowercase();
        for value in &input.current_mentions {
            let listed = items.iter().any(|item| item.value == *value);
            if listed || !value.to_lowercase().contains(&query) {
                continue;
            }
            items.push(MenuItem {
                value: value.to_string(),
                display_value: value.to_string(),
                data: None,
                kind: MenuItemKind::CurrentMention,
                item_type: ItemType::Value,
            });
        }
    }

    if let Some(label) = &input.create_label
        && !input.query.is_empty()
        && !items.iter().any(|item| item.display_value == input.query)
    {
        items.push(MenuItem {
            value: input.query.to_string(),
            display_value: label.clone(),
            data: None,
            kind: MenuItemKind::Create,
            item_type: ItemType::Value,
        });
    }
    items
}

/// Case-insensitive substring filter used for static items.
pub fn filter_items(items: &[MentionItem], query: &str) -> Vec<MentionItem> {
    let query = query.to_lowercase();
    items
        .iter()
        .filter(|item| item.value().to_lowercase().contains(&query))
        .cloned()
        .collect()
}

/// Next highlight when moving through `len` entries; wraps at both ends.
pub fn step_highlight(current: Option<usize>, len: usize, forward: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(match (current, forward) {
        (None, true) => 0,
        (None, false) => len - 1,
        (Some(i), true) => (i + 1) % len,
        (Some(i), false) => (i + len - 1) % len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(values: &[&str]) -> Vec<MentionItem> {
        values.iter().map(|&v| MentionItem::from(v)).collect()
    }

    fn values(menu: &[MenuItem]) -> Vec<&str> {
        menu.iter().map(|item| item.display_value.as_str()).collect()
    }

    #[test]
    fn results_are_truncated_to_limit() {
        let menu = compose_menu(
            &items(&["a", "b", "c"]),
            &Composition {
                limit: Some(2),
                ..Composition::default()
            },
        );
        assert_eq!(values(&menu), vec!["a", "b"]);
    }

    #[test]
    fn current_mentions_follow_results_unless_loading() {
        let input = Composition {
            query: "an",
            current_mentions: vec!["Anton", "Dan", "Zoe", "Anton"],
            ..Composition::default()
        };
        let menu = compose_menu(&items(&["Anna"]), &input);
        assert_eq!(values(&menu), vec!["Anna", "Anton", "Dan"]);
        assert_eq!(menu[1].kind, MenuItemKind::CurrentMention);

        let loading = Composition {
            loading: true,
            ..input
        };
        assert_eq!(values(&compose_menu(&items(&["Anna"]), &loading)), vec!["Anna"]);
    }

    #[test]
    fn create_entry_only_without_exact_match() {
        let input = Composition {
            query: "Zoe",
            create_label: Some("Add \"Zoe\"".to_string()),
            ..Composition::default()
        };
        let menu = compose_menu(&items(&["Zoey"]), &input);
        assert_eq!(values(&menu), vec!["Zoey", "Add \"Zoe\""]);
        assert_eq!(menu[1].value, "Zoe");
        assert_eq!(menu[1].kind, MenuItemKind::Create);

        let menu = compose_menu(&items(&["Zoe"]), &input);
        assert_eq!(values(&menu), vec!["Zoe"]);

        let empty = Composition {
            query: "",
            ..input
        };
        assert!(compose_menu(&[], &empty).is_empty());
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let filtered = filter_items(&items(&["Catherine", "Anton", "Cathy"]), "CATH");
        assert_eq!(filtered, items(&["Catherine", "Cathy"]));
    }

    #[test]
    fn highlight_wraps() {
        assert_eq!(step_highlight(Some(2), 3, true), Some(0));
        assert_eq!(step_highlight(Some(0), 3, false), Some(2));
        assert_eq!(step_highlight(None, 3, true), Some(0));
        assert_eq!(step_highlight(None, 0, true), None);
    }
}
