//! The mentions plugin: glue between the host editor, the matching engine, the rules and the
//! suggestion session.
//!
//! The host forwards its events:
//!
//! - key presses to [`MentionsPlugin::handle_key`]
//! - focus changes to [`MentionsPlugin::handle_focus`] / [`MentionsPlugin::handle_blur`]
//! - updates it makes on its own to [`MentionsPlugin::on_update`]
//! - timer ticks to [`MentionsPlugin::poll`]
//! - search responses to [`MentionsPlugin::complete_search`]
//!
//! and renders [`MentionsPlugin::menu`].

use crate::config::{CompiledConfig, DEFAULT_SEARCH_DELAY_MS, MentionItem, MentionsConfig};
use crate::env::Environment;
use crate::error::MentionError;
use crate::matching::{MatchState, MatchTransition, MatchingEngine};
use crate::menu::{
    Composition, ItemType, MenuItem, MenuState, compose_menu, filter_items, step_highlight,
};
use crate::node::{
    MENTION_NODE_TYPE, MentionComponent, MentionData, as_mention, find_mentions_by,
};
use crate::pattern::PatternSet;
use crate::session::{SearchSource, SearchTicket, Session};
use crate::transform::{
    RuleContext, commit_candidate, conversion_candidate, convert_text_to_mention,
    convert_to_mention_nodes, insert_mention_at_selection, intercept_keystroke, remove_mentions,
    rename_mentions, reopen_adjacent_mention,
};
use richtext_core::{Editor, EditorError, EditorState, Key, KeyEvent, UpdateOptions};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Programmatic commands.
#[derive(Debug, Clone, PartialEq)]
pub enum MentionCommand {
    /// Insert a mention at the caret.
    Insert {
        /// Trigger.
        trigger: String,
        /// Value.
        value: String,
        /// Metadata.
        data: Option<MentionData>,
        /// Keep the caret after the mention; `false` clears the selection.
        focus: bool,
    },
    /// Remove mentions with a trigger (and value).
    Remove {
        /// Trigger.
        trigger: String,
        /// Only mentions with this value.
        value: Option<String>,
        /// Place the caret where the last mention was; `false` clears the selection.
        focus: bool,
    },
    /// Rename mentions with a trigger (and value).
    Rename {
        /// Trigger.
        trigger: String,
        /// New value.
        new_value: String,
        /// Only mentions with this value.
        value: Option<String>,
        /// Place the caret next to the last renamed mention; `false` clears the selection.
        focus: bool,
    },
    /// Insert a bare trigger so the menu opens.
    OpenMenu {
        /// Trigger.
        trigger: String,
    },
}

#[derive(Debug, Clone, Copy, Default)]
struct Combobox {
    open: bool,
    highlighted: Option<usize>,
}

/// The mentions plugin for one editor.
pub struct MentionsPlugin {
    config: MentionsConfig,
    compiled: CompiledConfig,
    engine: MatchingEngine,
    env: Rc<dyn Environment>,
    search_source: Option<Box<dyn SearchSource>>,
    component: Option<Rc<dyn MentionComponent>>,
    session: Option<Session>,
    generation: u64,
    combobox: Combobox,
}

impl fmt::Debug for MentionsPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MentionsPlugin")
            .field("config", &self.config)
            .field("engine", &self.engine)
            .field("session", &self.session)
            .field("search_source", &self.search_source.is_some())
            .field("component", &self.component.is_some())
            .finish_non_exhaustive()
    }
}

impl MentionsPlugin {
    /// Create the plugin for `editor`.
    ///
    /// Fails when the editor cannot deserialize mention nodes, the trigger list is empty, or a
    /// trigger or per-trigger key is not a valid pattern.
    pub fn new(
        editor: &Editor,
        config: MentionsConfig,
        env: Rc<dyn Environment>,
    ) -> Result<Self, MentionError> {
        if !editor.registry().is_registered(MENTION_NODE_TYPE) {
            return Err(MentionError::NodeTypeNotRegistered(MENTION_NODE_TYPE));
        }
        let patterns = PatternSet::new(
            &config.triggers,
            &config.punctuation,
            &config.pre_trigger_chars,
        )?;
        let compiled = CompiledConfig::compile(&config)?;
        Ok(Self {
            engine: MatchingEngine::new(patterns, config.allow_spaces),
            compiled,
            config,
            env,
            search_source: None,
            component: None,
            session: None,
            generation: 0,
            combobox: Combobox::default(),
        })
    }

    /// Fetch candidates from `source` instead of the static items.
    pub fn with_search_source(mut self, source: Box<dyn SearchSource>) -> Self {
        self.search_source = Some(source);
        self
    }

    /// Render new mentions with `component`.
    pub fn with_component(mut self, component: Rc<dyn MentionComponent>) -> Self {
        self.component = Some(component);
        self
    }

    /// Configuration.
    pub fn config(&self) -> &MentionsConfig {
        &self.config
    }

    /// Matching engine state.
    pub fn match_state(&self) -> &MatchState {
        self.engine.state()
    }

    /// Active session.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn rules(&self) -> RuleContext<'_> {
        RuleContext {
            patterns: self.engine.patterns(),
            auto_space: self.config.auto_space,
            component: self.component.as_ref(),
        }
    }

    fn search_delay(&self) -> Duration {
        let default = if self.search_source.is_some() {
            DEFAULT_SEARCH_DELAY_MS
        } else {
            0
        };
        Duration::from_millis(self.config.search_delay.unwrap_or(default))
    }

    /// Run a programmatic command. Returns `true` when the document was changed.
    pub fn execute(&mut self, editor: &mut Editor, command: MentionCommand) -> bool {
        let rules = self.rules();
        let result = match command {
            MentionCommand::Insert {
                trigger,
                value,
                data,
                focus,
            } => editor.try_update(UpdateOptions::default(), |state| {
                let inserted =
                    insert_mention_at_selection(state, rules, &trigger, Some(&value), data)?;
                if inserted && !focus {
                    state.set_selection(None);
                }
                Ok(inserted)
            }),
            MentionCommand::Remove {
                trigger,
                value,
                focus,
            } => editor.try_update(UpdateOptions::default(), |state| {
                remove_mentions(state, &trigger, value.as_deref(), focus)
            }),
            MentionCommand::Rename {
                trigger,
                new_value,
                value,
                focus,
            } => editor.try_update(UpdateOptions::default(), |state| {
                rename_mentions(state, &trigger, &new_value, value.as_deref(), focus)
            }),
            MentionCommand::OpenMenu { trigger } => {
                editor.try_update(UpdateOptions::default(), |state| {
                    insert_mention_at_selection(state, rules, &trigger, None, None)
                })
            }
        };
        let changed = log_failure(result, "mention command");
        self.on_update(editor);
        changed
    }

    /// Insert plain text at the caret, turning every `trigger + value` run into a mention.
    pub fn insert_text_with_mentions(&mut self, editor: &mut Editor, text: &str) -> bool {
        let rules = self.rules();
        let result = editor.try_update(UpdateOptions::default(), |state| {
            if state.selection().is_none() {
                state.select_end();
            }
            let nodes = convert_to_mention_nodes(state, rules, text);
            state.insert_nodes(&nodes)
        });
        let changed = log_failure(result, "mention text insertion");
        self.on_update(editor);
        changed
    }

    /// Handle a key press. Returns `true` when the key was consumed.
    pub fn handle_key(&mut self, editor: &mut Editor, event: &KeyEvent) -> bool {
        if let Some(handled) = self.handle_menu_key(editor, event) {
            return handled;
        }

        if event.key == Key::Backspace
            && self.config.show_mentions_on_delete
            && !event.has_command_modifier()
        {
            let patterns = self.engine.patterns();
            let result = editor.try_update(UpdateOptions::default(), |state| {
                reopen_adjacent_mention(state, patterns)
            });
            if log_failure(result, "mention deletion") {
                self.on_update(editor);
                return true;
            }
        }

        let mut handled = false;
        if let Some(c) = event.typed_char().filter(|_| !event.has_command_modifier()) {
            if c == ' ' && !self.config.allow_spaces {
                handled |= self.convert_typed_mention(editor);
            }
            let rules = self.rules();
            let result = editor.try_update(UpdateOptions::typing(), |state| {
                intercept_keystroke(state, rules, c)
            });
            log_failure(result, "keystroke interception");
        }

        handled |= editor.dispatch_key(event);
        self.on_update(editor);
        handled
    }

    fn handle_menu_key(&mut self, editor: &mut Editor, event: &KeyEvent) -> Option<bool> {
        if event.has_command_modifier() {
            return None;
        }
        let menu = self.menu();
        let escape_target = self.session.is_some() || self.combobox_visible();
        match event.key {
            Key::ArrowDown | Key::ArrowUp if menu.open => {
                let forward = event.key == Key::ArrowDown;
                let next = step_highlight(menu.highlighted, menu.items.len(), forward);
                match self.session.as_mut() {
                    Some(session) => session.highlighted = next,
                    None => self.combobox.highlighted = next,
                }
                Some(true)
            }
            Key::Enter | Key::Tab if menu.open => {
                let index = menu.highlighted?;
                Some(self.select_option(editor, index))
            }
            Key::Escape if escape_target => {
                self.close_menu();
                Some(true)
            }
            _ => None,
        }
    }

    /// Space with spaces disallowed: turn the typed mention into a token before the space lands.
    fn convert_typed_mention(&mut self, editor: &mut Editor) -> bool {
        let Some(found) = conversion_candidate(editor.state(), self.engine.patterns()) else {
            return false;
        };
        if !self.compiled.creatable.get(&found.trigger).enabled() {
            return false;
        }
        let data = self.candidate_data(&found.trigger, &found.matching_string);
        let rules = self.rules();
        let result = editor.try_update(UpdateOptions::history_merge(), |state| {
            convert_text_to_mention(state, rules, &found, data)
        });
        let converted = log_failure(result, "mention conversion");
        if converted {
            self.engine.reset();
            self.close_session();
        }
        converted
    }

    /// Metadata of a candidate whose value equals `value`.
    fn candidate_data(&self, trigger: &str, value: &str) -> Option<MentionData> {
        let from_session = self
            .session
            .as_ref()
            .filter(|session| session.trigger() == trigger)
            .and_then(|session| session.results().iter().find(|item| item.value() == value));
        let from_static = || {
            self.compiled
                .items
                .get(trigger)
                .and_then(|items| items.iter().find(|item| item.value() == value))
        };
        from_session
            .or_else(from_static)
            .and_then(|item| item.data().cloned())
    }

    /// The editor gained focus.
    pub fn handle_focus(&mut self, editor: &Editor) {
        self.engine.release();
        if self.config.combobox {
            self.combobox = Combobox {
                open: true,
                highlighted: self.initial_highlight(self.config.triggers.len()),
            };
        }
        self.on_update(editor);
    }

    /// The editor lost focus. Returns `true` when a typed mention was converted.
    ///
    /// While a search is pending the conversion waits for its result.
    pub fn handle_blur(&mut self, editor: &mut Editor) -> bool {
        self.combobox.open = false;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let creatable = self.compiled.creatable.get(session.trigger()).enabled();
        if !(self.config.insert_on_blur && creatable) {
            self.close_menu();
            return false;
        }
        if session.loading() {
            session.blur_pending = true;
            log::debug!(
                "deferring blur conversion until session {} settles",
                session.generation()
            );
            return false;
        }
        self.convert_on_blur(editor)
    }

    fn convert_on_blur(&mut self, editor: &mut Editor) -> bool {
        let converted = match conversion_candidate(editor.state(), self.engine.patterns()) {
            Some(found) if self.compiled.creatable.get(&found.trigger).enabled() => {
                let data = self.candidate_data(&found.trigger, &found.matching_string);
                let rules = self.rules();
                let result = editor.try_update(UpdateOptions::history_merge(), |state| {
                    convert_text_to_mention(state, rules, &found, data)
                });
                log_failure(result, "mention conversion")
            }
            _ => false,
        };
        self.close_menu();
        converted
    }

    fn settle_pending_blur(&mut self, editor: &mut Editor) {
        let due = self
            .session
            .as_ref()
            .is_some_and(|session| session.blur_pending && !session.loading());
        if due {
            self.convert_on_blur(editor);
        }
    }

    /// Re-evaluate the caret after a committed update.
    pub fn on_update(&mut self, editor: &Editor) {
        let state = editor.state();
        match self.engine.update(state) {
            MatchTransition::Unchanged => {}
            MatchTransition::Opened(active) => {
                self.close_session();
                self.generation += 1;
                log::debug!(
                    "mention session {} opened for trigger `{}`",
                    self.generation,
                    active.trigger()
                );
                self.session = Some(Session::new(
                    self.generation,
                    active.trigger(),
                    active.query_string(),
                ));
                self.refresh_search(state);
            }
            MatchTransition::Changed(active) => {
                let changed = self
                    .session
                    .as_mut()
                    .is_some_and(|session| session.set_query(active.query_string()));
                if changed {
                    self.refresh_search(state);
                }
            }
            MatchTransition::Closed => self.close_session(),
        }
    }

    fn refresh_search(&mut self, state: &EditorState) {
        let delay = self.search_delay();
        if delay.is_zero() {
            self.run_search(state);
            return;
        }
        let now = self.env.now();
        if let Some(session) = self.session.as_mut() {
            session.schedule(now, delay);
        }
        self.recompose(state);
    }

    fn run_search(&mut self, state: &EditorState) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match self.search_source.as_mut() {
            Some(source) => source.search(&session.begin_search()),
            None => {
                let results = self
                    .compiled
                    .items
                    .get(session.trigger())
                    .map(|items| filter_items(items, session.query()))
                    .unwrap_or_default();
                session.set_results(results);
            }
        }
        self.recompose(state);
    }

    fn recompose(&mut self, state: &EditorState) {
        let mobile = self.env.is_mobile();
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let trigger = session.trigger().to_string();
        let current: Vec<String> = if self.config.show_current_mentions_as_suggestions {
            find_mentions_by(state, &trigger, None)
                .into_iter()
                .filter_map(|key| as_mention(state, key).map(|m| m.value().to_string()))
                .collect()
        } else {
            Vec::new()
        };
        let input = Composition {
            query: session.query(),
            limit: self.compiled.menu_item_limit.get(&trigger).limit(),
            current_mentions: current.iter().map(String::as_str).collect(),
            loading: session.loading(),
            create_label: self.compiled.creatable.get(&trigger).label(session.query()),
        };
        let items = compose_menu(session.results(), &input);
        session.highlighted = match session.highlighted {
            _ if items.is_empty() => None,
            Some(index) if index < items.len() => Some(index),
            _ if mobile => None,
            _ => Some(0),
        };
        session.items = items;
    }

    fn initial_highlight(&self, len: usize) -> Option<usize> {
        (len > 0 && !self.env.is_mobile()).then_some(0)
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!("mention session {} closed", session.generation());
        }
    }

    /// Fire due timers. Returns `true` when a debounced search started.
    pub fn poll(&mut self, editor: &mut Editor) -> bool {
        let now = self.env.now();
        let due = self
            .session
            .as_mut()
            .is_some_and(|session| session.take_due(now));
        if !due {
            return false;
        }
        self.run_search(editor.state());
        self.settle_pending_blur(editor);
        true
    }

    /// Deliver the result of a search.
    ///
    /// Results for a closed session or a superseded request are dropped (`Ok(false)`). A failed
    /// search clears the loading state and its error is returned.
    pub fn complete_search<E>(
        &mut self,
        editor: &mut Editor,
        ticket: SearchTicket,
        result: Result<Vec<MentionItem>, E>,
    ) -> Result<bool, E> {
        let Some(session) = self.session.as_mut().filter(|s| s.accepts(ticket)) else {
            log::debug!(
                "dropping stale search result of session {}",
                ticket.generation()
            );
            return Ok(false);
        };
        let outcome = match result {
            Ok(items) => {
                session.finish_search(Some(items));
                Ok(true)
            }
            Err(err) => {
                session.finish_search(None);
                Err(err)
            }
        };
        self.recompose(editor.state());
        self.settle_pending_blur(editor);
        outcome
    }

    /// Commit the menu entry at `index`.
    pub fn select_option(&mut self, editor: &mut Editor, index: usize) -> bool {
        if let Some(session) = &self.session {
            let Some(item) = session.items.get(index).cloned() else {
                return false;
            };
            let Some(active) = self.engine.begin_commit() else {
                return false;
            };
            let rules = self.rules();
            let result = editor.try_update(UpdateOptions::default(), |state| {
                commit_candidate(state, rules, &active, &item.value, item.data.clone())
            });
            let committed = log_failure(result, "mention commit");
            self.engine.reset();
            self.close_session();
            self.on_update(editor);
            return committed;
        }
        if self.combobox_visible() {
            let Some(trigger) = self.config.triggers.get(index).cloned() else {
                return false;
            };
            return self.execute(editor, MentionCommand::OpenMenu { trigger });
        }
        false
    }

    /// Replace the query from an input box owned by the rendering layer.
    pub fn update_query(&mut self, editor: &Editor, query: &str) -> bool {
        let changed = self
            .session
            .as_mut()
            .is_some_and(|session| session.set_query(query));
        if changed {
            self.refresh_search(editor.state());
        }
        changed
    }

    /// Dismiss the menu; it stays closed until the typed text changes.
    pub fn close_menu(&mut self) {
        self.engine.suppress();
        self.close_session();
        self.combobox.open = false;
    }

    fn combobox_visible(&self) -> bool {
        self.config.combobox && self.combobox.open && self.session.is_none()
    }

    /// Menu snapshot for the rendering layer.
    pub fn menu(&self) -> MenuState {
        if let Some(session) = &self.session {
            return MenuState {
                open: !session.items.is_empty() || session.loading(),
                item_type: ItemType::Value,
                items: session.items.clone(),
                loading: session.loading(),
                highlighted: session.highlighted,
                match_span: self.engine.active().map(|active| active.span()),
                trigger: Some(session.trigger().to_string()),
            };
        }
        if self.combobox_visible() {
            return MenuState {
                open: true,
                item_type: ItemType::Trigger,
                items: self
                    .config
                    .triggers
                    .iter()
                    .map(|trigger| MenuItem::trigger(trigger))
                    .collect(),
                loading: false,
                highlighted: self.combobox.highlighted,
                match_span: None,
                trigger: None,
            };
        }
        MenuState::closed()
    }
}

fn log_failure(result: Result<bool, EditorError>, what: &str) -> bool {
    result.unwrap_or_else(|err| {
        log::warn!("{what} failed: {err}");
        false
    })
}
