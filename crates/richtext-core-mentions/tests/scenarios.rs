mod common;

use common::{config, mentions, press, seed, setup, text_with_caret, type_text};
use pretty_assertions::assert_eq;
use richtext_core::{Key, Point, Selection};
use richtext_core_mentions::{Creatable, MatchState, MentionCommand, PerTrigger};

fn pair(trigger: &str, value: &str) -> (String, String) {
    (trigger.to_string(), value.to_string())
}

#[test]
fn test_plain_text_converts_to_tokens_and_runs() {
    let (mut editor, mut plugin, _) = setup(config());
    seed(
        &mut plugin,
        &mut editor,
        "Hey @John, the task is #urgent and due:tomorrow",
    );

    assert_eq!(
        mentions(&editor),
        vec![
            pair("@", "John"),
            pair("#", "urgent"),
            pair("due:", "tomorrow")
        ]
    );
    assert_eq!(
        editor.state().debug_text(),
        "Hey [@John], the task is [#urgent] and [due:tomorrow]"
    );
    let paragraph = editor.state().paragraphs()[0];
    let runs: Vec<&str> = editor
        .state()
        .children(paragraph)
        .iter()
        .filter_map(|&key| editor.state().text(key))
        .collect();
    assert_eq!(runs, vec!["Hey ", ", the task is ", " and "]);
}

#[test]
fn test_remove_trailing_mention_trims_space() {
    let (mut editor, mut plugin, _) = setup(config());
    seed(&mut plugin, &mut editor, "Hey @John");

    assert!(plugin.execute(
        &mut editor,
        MentionCommand::Remove {
            trigger: "@".to_string(),
            value: None,
            focus: true,
        },
    ));
    assert_eq!(editor.state().debug_text(), "Hey");
    let paragraph = editor.state().paragraphs()[0];
    let text = editor.state().children(paragraph)[0];
    assert_eq!(
        editor.state().selection(),
        Some(&Selection::collapsed(Point::text(text, 3)))
    );
}

#[test]
fn test_remove_inner_mention_collapses_double_space() {
    let (mut editor, mut plugin, _) = setup(config());
    seed(&mut plugin, &mut editor, "The #task is important");

    assert!(plugin.execute(
        &mut editor,
        MentionCommand::Remove {
            trigger: "#".to_string(),
            value: None,
            focus: true,
        },
    ));
    assert_eq!(editor.state().debug_text(), "The is important");
    assert!(mentions(&editor).is_empty());
}

#[test]
fn test_typed_mention_converts_on_space() {
    let mut config = config();
    config.allow_spaces = false;
    config.creatable = PerTrigger::All(Creatable::Flag(true));
    let (mut editor, mut plugin, _) = setup(config);
    editor.update(|state| state.select_end());

    type_text(&mut plugin, &mut editor, "@");
    type_text(&mut plugin, &mut editor, "C");
    type_text(&mut plugin, &mut editor, "atherine");
    assert_eq!(plugin.session().map(|s| s.query()), Some("Catherine"));

    type_text(&mut plugin, &mut editor, " ");
    assert_eq!(editor.state().debug_text(), "[@Catherine] ");
    assert_eq!(mentions(&editor), vec![pair("@", "Catherine")]);
    assert!(plugin.session().is_none());
}

#[test]
fn test_word_char_after_caret_prevents_session() {
    let mut config = config();
    config.auto_space = false;
    let (mut editor, mut plugin, _) = setup(config);
    text_with_caret(&mut editor, "foo", 0);

    type_text(&mut plugin, &mut editor, "@");
    assert_eq!(editor.state().debug_text(), "@foo");
    assert_eq!(plugin.match_state(), &MatchState::Idle);
    assert!(plugin.session().is_none());
    assert!(!plugin.menu().open);
}

#[test]
fn test_insert_without_focus_into_empty_document() {
    let (mut editor, mut plugin, _) = setup(config());

    assert!(plugin.execute(
        &mut editor,
        MentionCommand::Insert {
            trigger: "@".to_string(),
            value: "John".to_string(),
            data: None,
            focus: false,
        },
    ));
    assert_eq!(mentions(&editor), vec![pair("@", "John")]);
    assert_eq!(editor.state().debug_text(), "[@John]");
    assert_eq!(editor.state().selection(), None);
}

#[test]
fn test_escape_keeps_menu_closed_until_text_changes() {
    let config = config().with_items("@", ["Anton", "Andrea"]);
    let (mut editor, mut plugin, _) = setup(config);
    editor.update(|state| state.select_end());

    type_text(&mut plugin, &mut editor, "@an");
    assert!(plugin.menu().open);
    assert!(press(&mut plugin, &mut editor, Key::Escape));
    assert!(!plugin.menu().open);

    plugin.on_update(&editor);
    assert!(!plugin.menu().open);

    type_text(&mut plugin, &mut editor, "t");
    assert!(plugin.menu().open);
    assert_eq!(plugin.menu().items[0].value, "Anton");
}
