mod common;

use common::{chip_registry, push_chip, push_text};
use pretty_assertions::assert_eq;
use richtext_core::{Editor, EditorError};
use serde_json::json;

#[test]
fn test_export_document_shape() {
    let mut editor = Editor::with_registry(chip_registry());
    editor.update(|state| {
        push_text(state, "Hi ");
        push_chip(state, "X");
    });

    assert_eq!(
        editor.export_json(),
        json!({
            "root": {
                "type": "root",
                "version": 1,
                "children": [{
                    "type": "paragraph",
                    "version": 1,
                    "children": [
                        { "type": "text", "version": 1, "text": "Hi " },
                        { "type": "chip", "version": 1, "label": "X" }
                    ]
                }]
            }
        })
    );
}

#[test]
fn test_import_restores_document() {
    let mut source = Editor::with_registry(chip_registry());
    source.update(|state| {
        push_text(state, "a");
        push_chip(state, "X");
        push_text(state, "b");
    });
    let exported = source.export_json();

    let mut target = Editor::with_registry(chip_registry());
    target.import_json(&exported).unwrap();
    assert_eq!(target.state().debug_text(), "a[X]b");
    assert_eq!(target.export_json(), exported);
    assert!(!target.can_undo());
}

#[test]
fn test_import_merges_adjacent_text_runs() {
    let editor = Editor::new();
    let state = editor
        .parse_json(&json!({
            "root": { "type": "root", "children": [
                { "type": "paragraph", "children": [
                    { "type": "text", "text": "foo" },
                    { "type": "text", "text": "bar" }
                ]}
            ]}
        }))
        .unwrap();
    let paragraph = state.paragraphs()[0];
    assert_eq!(state.children(paragraph).len(), 1);
    assert_eq!(state.document_text(), "foobar");
}

#[test]
fn test_import_unregistered_type_fails() {
    let mut source = Editor::with_registry(chip_registry());
    source.update(|state| {
        push_chip(state, "X");
    });

    let mut target = Editor::new();
    let err = target.import_json(&source.export_json()).unwrap_err();
    assert!(matches!(err, EditorError::UnregisteredNodeType(ref t) if t == "chip"));
    assert_eq!(target.state().document_text(), "");
}

#[test]
fn test_import_rejects_malformed_documents() {
    let editor = Editor::new();
    assert!(matches!(
        editor.parse_json(&json!({ "root": { "type": "paragraph" } })),
        Err(EditorError::MalformedNode(_))
    ));
    assert!(matches!(
        editor.parse_json(&json!({ "nope": 1 })),
        Err(EditorError::Json(_))
    ));
}
