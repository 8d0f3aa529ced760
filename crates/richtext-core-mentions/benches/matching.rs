use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use richtext_core::{Editor, KeyEvent, NodeRegistry};
use richtext_core_mentions::pattern::{DEFAULT_PRE_TRIGGER_CHARS, DEFAULT_PUNCTUATION};
use richtext_core_mentions::{
    MentionsConfig, MentionsPlugin, PatternSet, SystemEnvironment, register_mention_node,
};
use std::rc::Rc;

fn triggers() -> Vec<String> {
    vec!["@".to_string(), "#".to_string(), "due:".to_string()]
}

fn patterns() -> PatternSet {
    PatternSet::new(&triggers(), DEFAULT_PUNCTUATION, DEFAULT_PRE_TRIGGER_CHARS).unwrap()
}

fn paragraph(sentences: usize) -> String {
    let mut out = String::with_capacity(sentences * 64);
    for i in 0..sentences {
        out.push_str(&format!(
            "ping @user{i} about #ticket{i}, it is due:tomorrow and still open. "
        ));
    }
    out
}

fn bench_find_match(c: &mut Criterion) {
    let patterns = patterns();
    // The query pattern runs on the text before the caret after every keystroke.
    let prefix = format!("{}@Joh", paragraph(20));
    c.bench_function("find_match/long_prefix", |b| {
        b.iter(|| black_box(patterns.find_match(black_box(&prefix), true)))
    });
}

fn bench_scan(c: &mut Criterion) {
    let patterns = patterns();
    let text = paragraph(1_000);
    c.bench_function("scan/1k_sentences", |b| {
        b.iter(|| black_box(patterns.scan(black_box(&text)).len()))
    });
}

fn bench_typing_session(c: &mut Criterion) {
    let items: Vec<String> = (0..500).map(|i| format!("user{i}")).collect();
    c.bench_function("typing/mention_with_static_items", |b| {
        b.iter_batched(
            || {
                let mut registry = NodeRegistry::new();
                register_mention_node(&mut registry, None);
                let mut editor = Editor::with_registry(registry);
                editor.update(|state| state.select_end());
                let config = MentionsConfig::new(triggers())
                    .with_items("@", items.iter().map(String::as_str));
                let plugin =
                    MentionsPlugin::new(&editor, config, Rc::new(SystemEnvironment)).unwrap();
                (editor, plugin)
            },
            |(mut editor, mut plugin)| {
                for c in "hello @user4".chars() {
                    plugin.handle_key(&mut editor, &KeyEvent::char(c));
                }
                black_box(plugin.menu().items.len());
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_find_match, bench_scan, bench_typing_session);
criterion_main!(benches);
