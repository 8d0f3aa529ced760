mod common;

use common::{
    RecordingSource, config, menu_labels, mentions, press, seed, setup, text_with_caret,
    type_text,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use richtext_core::Key;
use richtext_core_mentions::{
    Creatable, DataValue, ItemType, ManualEnvironment, MatchSpan, MentionData, MentionItem,
    MentionsPlugin, MenuItemKind, MenuItemLimit, PerTrigger, as_mention, find_mentions,
};
use std::rc::Rc;
use std::time::Duration;

fn start(editor: &mut richtext_core::Editor) {
    editor.update(|state| state.select_end());
}

fn remote(
    config: richtext_core_mentions::MentionsConfig,
) -> (
    richtext_core::Editor,
    MentionsPlugin,
    Rc<ManualEnvironment>,
    RecordingSource,
) {
    let (editor, plugin, env) = setup(config);
    let source = RecordingSource::default();
    let plugin = plugin.with_search_source(Box::new(source.clone()));
    (editor, plugin, env, source)
}

#[test]
fn test_static_items_filter_case_insensitively() {
    let config = config().with_items("@", ["Anton", "Catherine", "cathy", "Bob"]);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "Hi @CAT");
    let menu = plugin.menu();
    assert!(menu.open);
    assert_eq!(menu.item_type, ItemType::Value);
    assert_eq!(menu.trigger.as_deref(), Some("@"));
    assert_eq!(menu.match_span, Some(MatchSpan { start: 3, end: 7 }));
    assert_eq!(menu_labels(&plugin), vec!["Catherine", "cathy"]);
    assert_eq!(menu.highlighted, Some(0));
    assert!(!menu.loading);
}

#[test]
fn test_static_items_keyed_by_pattern() {
    let config = config().with_items(r"due:|#", ["today", "tomorrow"]);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "due:to");
    assert_eq!(menu_labels(&plugin), vec!["today", "tomorrow"]);
}

#[test]
fn test_menu_item_limit_per_trigger() {
    let mut config = config()
        .with_items("@", ["a1", "a2", "a3", "a4"])
        .with_items("#", ["t1", "t2", "t3", "t4"]);
    config.allow_spaces = false;
    let mut limits = IndexMap::new();
    limits.insert("@".to_string(), MenuItemLimit::Limit(2));
    limits.insert("#".to_string(), MenuItemLimit::Flag(false));
    config.menu_item_limit = PerTrigger::ByTrigger(limits);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@");
    assert_eq!(menu_labels(&plugin), vec!["a1", "a2"]);
    type_text(&mut plugin, &mut editor, " #");
    assert_eq!(menu_labels(&plugin), vec!["t1", "t2", "t3", "t4"]);
}

#[test]
fn test_create_entry_uses_template() {
    let mut config = config().with_items("@", ["Anton"]);
    config.creatable = PerTrigger::All(Creatable::Template("Invite \"{{name}}\"".to_string()));
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@Ant");
    assert_eq!(menu_labels(&plugin), vec!["Anton", "Invite \"Ant\""]);
    let create = &plugin.menu().items[1];
    assert_eq!(create.kind, MenuItemKind::Create);
    assert_eq!(create.value, "Ant");

    plugin.select_option(&mut editor, 1);
    assert_eq!(editor.state().debug_text(), "[@Ant]");
}

#[test]
fn test_current_mentions_are_suggested() {
    let config = config().with_items("@", ["Anton"]);
    let (mut editor, mut plugin, _) = setup(config);
    seed(&mut plugin, &mut editor, "@Andrea and @Bob and #Anna ");

    type_text(&mut plugin, &mut editor, "@an");
    let menu = plugin.menu();
    assert_eq!(menu_labels(&plugin), vec!["Anton", "Andrea"]);
    assert_eq!(menu.items[1].kind, MenuItemKind::CurrentMention);
}

#[test]
fn test_arrow_keys_wrap_and_enter_commits() {
    let config = config().with_items("@", ["Anton", "Andrea", "Anna"]);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "Hey @an");
    assert!(press(&mut plugin, &mut editor, Key::ArrowUp));
    assert_eq!(plugin.menu().highlighted, Some(2));
    assert!(press(&mut plugin, &mut editor, Key::ArrowDown));
    assert_eq!(plugin.menu().highlighted, Some(0));
    assert!(press(&mut plugin, &mut editor, Key::ArrowDown));

    assert!(press(&mut plugin, &mut editor, Key::Enter));
    assert_eq!(editor.state().debug_text(), "Hey [@Andrea]");
    assert!(plugin.session().is_none());
    assert!(!plugin.menu().open);

    type_text(&mut plugin, &mut editor, "!");
    assert_eq!(editor.state().debug_text(), "Hey [@Andrea]!");
}

#[test]
fn test_commit_carries_candidate_data() {
    let mut data = MentionData::new();
    data.insert("id".to_string(), DataValue::from(42));
    let mut config = config();
    config.items.insert(
        "@".to_string(),
        vec![MentionItem::Structured {
            value: "Catherine".to_string(),
            data: Some(data.clone()),
        }],
    );
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@cat");
    assert!(press(&mut plugin, &mut editor, Key::Tab));
    let key = find_mentions(editor.state())[0];
    let mention = as_mention(editor.state(), key).unwrap();
    assert_eq!(mention.value(), "Catherine");
    assert_eq!(mention.data(), Some(&data));
}

#[test]
fn test_mobile_menu_has_no_initial_highlight() {
    let config = config().with_items("@", ["Anton"]);
    let mut editor = common::editor();
    let mut plugin =
        MentionsPlugin::new(&editor, config, Rc::new(ManualEnvironment::mobile())).unwrap();
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@");
    assert!(plugin.menu().open);
    assert_eq!(plugin.menu().highlighted, None);

    // Enter without a highlight types a new paragraph.
    press(&mut plugin, &mut editor, Key::Enter);
    assert_eq!(editor.state().paragraphs().len(), 2);
}

#[test]
fn test_remote_search_is_debounced() {
    let (mut editor, mut plugin, env, source) = remote(config());
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@jo");
    assert_eq!(source.count(), 0);
    assert!(plugin.menu().loading);
    assert!(plugin.menu().open);

    env.advance(Duration::from_millis(200));
    assert!(!plugin.poll(&mut editor));
    type_text(&mut plugin, &mut editor, "h");
    env.advance(Duration::from_millis(200));
    assert!(!plugin.poll(&mut editor));
    env.advance(Duration::from_millis(50));
    assert!(plugin.poll(&mut editor));

    assert_eq!(source.count(), 1);
    let request = source.last();
    assert_eq!(request.trigger, "@");
    assert_eq!(request.query, "joh");

    let applied = plugin
        .complete_search::<()>(
            &mut editor,
            request.ticket,
            Ok(vec![MentionItem::from("John"), MentionItem::from("Johanna")]),
        )
        .unwrap();
    assert!(applied);
    assert!(!plugin.menu().loading);
    assert_eq!(menu_labels(&plugin), vec!["John", "Johanna"]);
}

#[test]
fn test_stale_search_results_are_dropped() {
    let mut config = config();
    config.search_delay = Some(0);
    let (mut editor, mut plugin, _, source) = remote(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@j");
    let first = source.last();
    type_text(&mut plugin, &mut editor, "o");
    let second = source.last();
    assert_eq!(first.query, "j");
    assert_eq!(second.query, "jo");
    assert_eq!(source.count(), 3);

    let applied = plugin
        .complete_search::<()>(&mut editor, first.ticket, Ok(vec![MentionItem::from("Jack")]))
        .unwrap();
    assert!(!applied);
    assert!(plugin.menu().loading);

    plugin
        .complete_search::<()>(&mut editor, second.ticket, Ok(vec![MentionItem::from("Joe")]))
        .unwrap();
    assert_eq!(menu_labels(&plugin), vec!["Joe"]);

    // Results of a closed session never apply.
    press(&mut plugin, &mut editor, Key::Escape);
    let applied = plugin
        .complete_search::<()>(&mut editor, second.ticket, Ok(vec![MentionItem::from("Jo")]))
        .unwrap();
    assert!(!applied);
}

#[test]
fn test_highlight_survives_incoming_results() {
    let mut config = config();
    config.search_delay = Some(0);
    let (mut editor, mut plugin, _, source) = remote(config);
    start(&mut editor);
    let people = || {
        vec![
            MentionItem::from("Jo"),
            MentionItem::from("Joe"),
            MentionItem::from("John"),
        ]
    };

    type_text(&mut plugin, &mut editor, "@j");
    plugin
        .complete_search::<()>(&mut editor, source.last().ticket, Ok(people()))
        .unwrap();
    assert_eq!(plugin.menu().highlighted, Some(0));
    press(&mut plugin, &mut editor, Key::ArrowDown);
    press(&mut plugin, &mut editor, Key::ArrowDown);

    // Earlier results stay listed while the next search runs.
    type_text(&mut plugin, &mut editor, "o");
    assert!(plugin.menu().loading);
    assert_eq!(plugin.menu().highlighted, Some(2));
    plugin
        .complete_search::<()>(&mut editor, source.last().ticket, Ok(people()))
        .unwrap();
    assert_eq!(plugin.menu().highlighted, Some(2));

    type_text(&mut plugin, &mut editor, "h");
    let narrowed = vec![MentionItem::from("John")];
    plugin
        .complete_search::<()>(&mut editor, source.last().ticket, Ok(narrowed))
        .unwrap();
    assert_eq!(plugin.menu().highlighted, Some(0));
}

#[test]
fn test_search_error_clears_loading_and_is_returned() {
    let mut config = config();
    config.search_delay = Some(0);
    let (mut editor, mut plugin, _, source) = remote(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@j");
    let request = source.last();
    let result = plugin.complete_search(&mut editor, request.ticket, Err("offline"));
    assert_eq!(result, Err("offline"));
    assert!(!plugin.menu().loading);
    assert!(plugin.session().is_some());
}

#[test]
fn test_blur_converts_typed_mention() {
    let mut config = config();
    config.creatable = PerTrigger::All(Creatable::Flag(true));
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "Hi @Zoe");
    assert!(plugin.handle_blur(&mut editor));
    assert_eq!(editor.state().debug_text(), "Hi [@Zoe]");
    assert!(plugin.session().is_none());

    // Conversion folds into the typing step.
    editor.undo().unwrap();
    assert_eq!(editor.state().debug_text(), "");
}

#[test]
fn test_blur_waits_for_pending_search() {
    let mut config = config();
    config.creatable = PerTrigger::All(Creatable::Flag(true));
    let (mut editor, mut plugin, env, source) = remote(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@Zoe");
    assert!(!plugin.handle_blur(&mut editor));
    assert_eq!(mentions(&editor), vec![]);

    env.advance(Duration::from_millis(250));
    plugin.poll(&mut editor);
    let request = source.last();
    let mut data = MentionData::new();
    data.insert("id".to_string(), DataValue::from(9));
    plugin
        .complete_search::<()>(
            &mut editor,
            request.ticket,
            Ok(vec![MentionItem::Structured {
                value: "Zoe".to_string(),
                data: Some(data.clone()),
            }]),
        )
        .unwrap();

    assert_eq!(editor.state().debug_text(), "[@Zoe]");
    let key = find_mentions(editor.state())[0];
    assert_eq!(as_mention(editor.state(), key).unwrap().data(), Some(&data));
    assert!(plugin.session().is_none());
}

#[test]
fn test_blur_without_creatable_only_closes_menu() {
    let config = config().with_items("@", ["Zoey"]);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@Zoe");
    assert!(plugin.menu().open);
    assert!(!plugin.handle_blur(&mut editor));
    assert_eq!(editor.state().debug_text(), "@Zoe");
    assert!(!plugin.menu().open);

    plugin.handle_focus(&editor);
    assert!(plugin.menu().open);
}

#[test]
fn test_one_session_at_a_time() {
    let mut config = config()
        .with_items("@", ["Anton"])
        .with_items("#", ["urgent"]);
    config.allow_spaces = false;
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@an");
    let first = plugin.session().unwrap().generation();
    type_text(&mut plugin, &mut editor, " #ur");
    let session = plugin.session().unwrap();
    assert_eq!(session.trigger(), "#");
    assert!(session.generation() > first);
    assert_eq!(menu_labels(&plugin), vec!["urgent"]);
}

#[test]
fn test_update_query_from_rendering_layer() {
    let config = config().with_items("@", ["Anton", "Bob"]);
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@");
    assert_eq!(menu_labels(&plugin), vec!["Anton", "Bob"]);
    assert!(plugin.update_query(&editor, "bo"));
    assert_eq!(menu_labels(&plugin), vec!["Bob"]);
    assert!(!plugin.update_query(&editor, "bo"));
}

#[test]
fn test_combobox_lists_triggers_then_values() {
    let mut config = config().with_items("#", ["urgent", "later"]);
    config.combobox = true;
    let (mut editor, mut plugin, _) = setup(config);
    text_with_caret(&mut editor, "Task", 4);

    assert!(!plugin.menu().open);
    plugin.handle_focus(&editor);
    let menu = plugin.menu();
    assert!(menu.open);
    assert_eq!(menu.item_type, ItemType::Trigger);
    assert_eq!(menu_labels(&plugin), vec!["@", "#", "due:"]);

    assert!(press(&mut plugin, &mut editor, Key::ArrowDown));
    assert!(press(&mut plugin, &mut editor, Key::Enter));
    assert_eq!(editor.state().debug_text(), "Task #");
    let menu = plugin.menu();
    assert_eq!(menu.item_type, ItemType::Value);
    assert_eq!(menu_labels(&plugin), vec!["urgent", "later"]);

    plugin.select_option(&mut editor, 1);
    assert_eq!(editor.state().debug_text(), "Task [#later]");
    assert_eq!(plugin.menu().item_type, ItemType::Trigger);

    plugin.handle_blur(&mut editor);
    assert!(!plugin.menu().open);
}

#[test]
fn test_config_from_json_drives_plugin() {
    let config = richtext_core_mentions::MentionsConfig::from_json(
        r#"{
            "triggers": ["@"],
            "allowSpaces": false,
            "creatable": "Add user {{ name }}",
            "menuItemLimit": 1,
            "items": {"@": ["Ada", {"value": "Adam", "data": {"id": 2}}]}
        }"#,
    )
    .unwrap();
    let (mut editor, mut plugin, _) = setup(config);
    start(&mut editor);

    type_text(&mut plugin, &mut editor, "@Ad");
    assert_eq!(menu_labels(&plugin), vec!["Ada", "Add user Ad"]);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    use richtext_core_mentions::{MentionError, MentionsConfig, SystemEnvironment};

    let editor = common::editor();
    let build = |config: MentionsConfig| {
        MentionsPlugin::new(&editor, config, Rc::new(SystemEnvironment)).unwrap_err()
    };

    let no_triggers: [&str; 0] = [];
    assert!(matches!(
        build(MentionsConfig::new(no_triggers)),
        MentionError::NoTriggers
    ));
    assert!(matches!(
        build(MentionsConfig::new(["("])),
        MentionError::PatternCompile { .. }
    ));
    let err = build(config().with_items("[", ["x"]));
    assert!(matches!(err, MentionError::InvalidTriggerKey { ref key, .. } if key == "["));
    assert!(MentionsConfig::from_json("{\"triggers\": 3}").is_err());
}
