//! Editor page over one nesting level of a document.
//!
//! Entries are derived from the resolved schema shape and the current
//! document on every structural change: the document's own key order
//! drives the display, the schema contributes widget types, descriptions
//! and deletability, and keys the schema does not declare are still shown
//! from their value shape. Scalar edits are written through a small
//! mutation loop (regex gate, parse by kind, compare-and-write); nested
//! values open a child page over a deep copy that is folded back in when
//! the child closes.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use crate::{
    data::{
        schema::{Resolved, ScalarKind, SchemaError, SchemaNode, SchemaRule},
        validator::{default_instance, normalize, parse_scalar, seed_value},
        value::{is_empty_element, preview, scalar_text, title_case},
    },
    page::{
        AddAction, Effect, ExitChoice, FieldEntry, FieldKey, FieldKind, Page, PageAction,
        PageEvent, PagePayload, PageResult, PopupPage, PopupPurpose,
    },
};

/// Editor page state.
#[derive(Debug)]
pub struct EditorPage {
    name: String,
    origin: Option<FieldKey>,
    schema: SchemaNode,
    document: Value,
    entries: Vec<FieldEntry>,
    field_index: HashMap<String, FieldKey>,
    add_action: AddAction,
    deletable: HashSet<FieldKey>,
}

impl EditorPage {
    /// Open a page over `document` as described by `schema`.
    ///
    /// The document is normalized on entry: defaults are filled in and
    /// keys are brought into schema order. `origin` is the key this
    /// document came from in the parent page, `None` for the root.
    ///
    /// # Errors
    ///
    /// Fails when a selector in `schema` cannot be resolved against
    /// `document`.
    pub fn new(
        name: impl Into<String>,
        origin: Option<FieldKey>,
        schema: SchemaNode,
        document: &Value,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let document = normalize(&schema, document, false)?;
        let mut page = EditorPage {
            name,
            origin,
            schema,
            document,
            entries: Vec::new(),
            field_index: HashMap::new(),
            add_action: AddAction::None,
            deletable: HashSet::new(),
        };
        page.rebuild()?;
        Ok(page)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> Option<&FieldKey> {
        self.origin.as_ref()
    }

    /// Current document of this nesting level.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Consume the page, yielding its document.
    pub fn into_document(self) -> Value {
        self.document
    }

    /// Rows to render, in display order.
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    /// What the add shortcut does on this page.
    pub fn add_action(&self) -> &AddAction {
        &self.add_action
    }

    /// Re-derive entries, the add action and deletability from the
    /// current document.
    fn rebuild(&mut self) -> Result<(), SchemaError> {
        let (entries, add_action, deletable) =
            derive_entries(&self.schema, &self.document, &self.name)?;
        self.field_index = entries
            .iter()
            .map(|e| (e.handle.clone(), e.key.clone()))
            .collect();
        self.entries = entries;
        self.add_action = add_action;
        self.deletable = deletable;
        Ok(())
    }

    pub(crate) fn on_event(&mut self, event: PageEvent) -> PageAction {
        match event {
            PageEvent::Edited { handle, text } => self.on_change(&handle, &text),
            PageEvent::Toggled { handle, on } => self.on_toggle(&handle, on),
            PageEvent::Activated { handle } => self.activate(&handle),
            PageEvent::AddItem => self.add_item(),
            PageEvent::DeleteItem { handle } => self.delete_item(&handle),
            PageEvent::Back => {
                if self.origin.is_none() {
                    self.confirm_exit()
                } else {
                    PageAction::PopSelf(PagePayload::Document(self.document.clone()))
                }
            }
            PageEvent::ExitRequest => self.confirm_exit(),
            _ => PageAction::Effects(Vec::new()),
        }
    }

    pub(crate) fn on_page_result(&mut self, result: PageResult) -> PageAction {
        match result.payload {
            PagePayload::Document(doc) => self.fold_document(result.origin, doc),
            PagePayload::AddKey(Some(key)) if !key.trim().is_empty() => self.insert_key(&key),
            PagePayload::AddKey(_) => PageAction::Effects(Vec::new()),
            PagePayload::Pick {
                handle,
                value: Some(value),
            } => self.on_select(&handle, &value),
            PagePayload::Pick { value: None, .. } => PageAction::Effects(Vec::new()),
            PagePayload::Exit(Some(ExitChoice::Yes)) => PageAction::Quit { commit: true },
            PagePayload::Exit(Some(ExitChoice::No)) => PageAction::Quit { commit: false },
            PagePayload::Exit(_) => PageAction::Effects(Vec::new()),
        }
    }

    pub(crate) fn key_hints(&self) -> Vec<&'static str> {
        let mut hints = Vec::new();
        if !matches!(self.add_action, AddAction::None) {
            hints.push("Ctrl+N: Add new item");
        }
        if !self.deletable.is_empty() {
            hints.push("Ctrl+D: Delete item");
        }
        if self.origin.is_some() {
            hints.push("Esc: Back");
        }
        hints.push("Ctrl+X: Exit");
        hints
    }

    /// Mutation loop for scalar edits: regex gate, parse by kind, then a
    /// compare-and-write into the document. Rejected input leaves the
    /// document untouched and surfaces as a warning.
    fn on_change(&mut self, handle: &str, text: &str) -> PageAction {
        let Some(key) = self.field_index.get(handle).cloned() else {
            warn!("stale edit handle {handle:?}");
            return PageAction::Effects(Vec::new());
        };
        let sub = self.sub_schema(&key);

        if let SchemaRule::Scalar(ScalarKind::String) = sub.rule
            && let Some(re) = &sub.regex
            && !re.is_match(text)
        {
            return PageAction::Effects(vec![Effect::Warn(format!(
                "value does not match regex '{}'",
                re.pattern
            ))]);
        }

        let kind = match sub.rule {
            SchemaRule::Scalar(kind) => kind,
            _ => ScalarKind::String,
        };
        match parse_scalar(kind, text) {
            Ok(value) => {
                // Multiline edits come back from a closing dialog, so
                // the row preview has to be rebuilt. Inline edits skip
                // the redraw to keep the input focused.
                if sub.multiline && get_value(&self.document, &key) != Some(&value) {
                    set_value(&mut self.document, &key, value);
                    return self.after_mutation();
                }
                self.write_scalar(key, value)
            }
            Err(msg) => PageAction::Effects(vec![Effect::Warn(msg)]),
        }
    }

    fn on_toggle(&mut self, handle: &str, on: bool) -> PageAction {
        let Some(key) = self.field_index.get(handle).cloned() else {
            return PageAction::Effects(Vec::new());
        };
        self.write_scalar(key, Value::Bool(on))
    }

    fn write_scalar(&mut self, key: FieldKey, value: Value) -> PageAction {
        if get_value(&self.document, &key) == Some(&value) {
            return PageAction::Effects(vec![Effect::ClearWarn]);
        }
        set_value(&mut self.document, &key, value);
        PageAction::Effects(vec![Effect::ClearWarn, Effect::MarkDirty])
    }

    /// Discriminator switch: write the new kind, then re-normalize with
    /// unknown keys purged so stale variant fields drop out and the new
    /// variant's defaults appear.
    fn on_select(&mut self, handle: &str, choice: &str) -> PageAction {
        let Some(key) = self.field_index.get(handle).cloned() else {
            return PageAction::Effects(Vec::new());
        };
        if get_value(&self.document, &key).and_then(Value::as_str) == Some(choice) {
            return PageAction::Effects(Vec::new());
        }
        let mut candidate = self.document.clone();
        set_value(&mut candidate, &key, Value::String(choice.to_string()));
        match normalize(&self.schema, &candidate, true) {
            Ok(doc) => {
                debug!("switched {} to {choice:?}", key.label());
                self.document = doc;
                self.after_mutation()
            }
            Err(e) => PageAction::Effects(vec![Effect::Warn(e.to_string())]),
        }
    }

    /// Selector rows open a choice popup listing the variants; every
    /// other activatable row drills down into a child page.
    fn activate(&mut self, handle: &str) -> PageAction {
        let Some(entry) = self.entries.iter().find(|e| e.handle == handle) else {
            return PageAction::Effects(Vec::new());
        };
        if let FieldKind::Select { options, selected } = &entry.kind {
            let popup = PopupPage::choice(
                entry.label.clone(),
                options.clone(),
                *selected,
                PopupPurpose::SelectValue {
                    handle: handle.to_string(),
                },
            );
            return PageAction::Push(Box::new(Page::Popup(popup)));
        }
        self.drill_down(handle)
    }

    /// Open a child page over a deep copy of the entry's value. The
    /// parent document is only updated when the child folds back.
    fn drill_down(&mut self, handle: &str) -> PageAction {
        let Some(key) = self.field_index.get(handle).cloned() else {
            return PageAction::Effects(Vec::new());
        };
        let sub = self.sub_schema(&key);
        let value = get_value(&self.document, &key)
            .cloned()
            .unwrap_or(Value::Null);
        debug!("enter {}", key.label());
        match EditorPage::new(key.label(), Some(key), sub, &value) {
            Ok(child) => PageAction::Push(Box::new(Page::Editor(child))),
            Err(e) => PageAction::Effects(vec![Effect::Warn(e.to_string())]),
        }
    }

    fn add_item(&mut self) -> PageAction {
        match self.add_action.clone() {
            AddAction::None => PageAction::Effects(Vec::new()),
            AddAction::AppendElement => {
                let elem = match self.schema.resolve(&self.document, &self.name) {
                    Ok(Resolved::List(elem)) => elem.clone(),
                    _ => SchemaNode::default(),
                };
                let seed = match seed_value(&elem) {
                    Ok(v) => v,
                    Err(e) => return PageAction::Effects(vec![Effect::Warn(e.to_string())]),
                };
                match &mut self.document {
                    Value::Array(items) => items.push(seed),
                    doc @ Value::Null => *doc = Value::Array(vec![seed]),
                    _ => return PageAction::Effects(Vec::new()),
                }
                self.after_mutation()
            }
            AddAction::PromptKey(key_schema) => PageAction::Push(Box::new(Page::Popup(
                PopupPage::edit("Add new item", key_schema),
            ))),
            AddAction::PromptMissing(keys) => {
                let items = keys.into_iter().map(|k| (k.clone(), k)).collect();
                PageAction::Push(Box::new(Page::Popup(PopupPage::choice(
                    "Add new item",
                    items,
                    0,
                    PopupPurpose::AddKey,
                ))))
            }
        }
    }

    fn delete_item(&mut self, handle: &str) -> PageAction {
        let Some(key) = self.field_index.get(handle).cloned() else {
            return PageAction::Effects(Vec::new());
        };
        if !self.deletable.contains(&key) {
            return PageAction::Effects(vec![Effect::Warn(
                "Cannot remove immutable item (required or default item).".to_string(),
            )]);
        }
        remove_value(&mut self.document, &key);
        debug!("removed {}", key.label());
        self.after_mutation()
    }

    fn confirm_exit(&self) -> PageAction {
        PageAction::Push(Box::new(Page::Popup(PopupPage::exit_confirm())))
    }

    /// Fold a child page's document back into this one. Empty list
    /// elements and null mapping values the child left behind are
    /// dropped on the way in.
    fn fold_document(&mut self, origin: Option<FieldKey>, doc: Value) -> PageAction {
        let Some(key) = origin else {
            return PageAction::Effects(Vec::new());
        };
        let folded = fold_value(doc);
        let changed = get_value(&self.document, &key) != Some(&folded);
        if changed {
            set_value(&mut self.document, &key, folded);
        }
        match self.rebuild() {
            Ok(()) => {
                let mut effects = vec![Effect::ClearWarn];
                if changed {
                    effects.push(Effect::MarkDirty);
                }
                effects.push(Effect::Redraw);
                PageAction::Effects(effects)
            }
            Err(e) => PageAction::Effects(vec![Effect::Warn(e.to_string())]),
        }
    }

    fn insert_key(&mut self, key: &str) -> PageAction {
        let field = FieldKey::Key(key.to_string());
        if get_value(&self.document, &field).is_some() {
            return PageAction::Effects(vec![Effect::Warn(format!("item {key:?} already exists"))]);
        }
        let sub = self.sub_schema(&field);
        let instance = match default_instance(&sub) {
            Ok(v) => v,
            Err(e) => return PageAction::Effects(vec![Effect::Warn(e.to_string())]),
        };
        match &mut self.document {
            Value::Object(map) => {
                map.insert(key.to_string(), instance);
            }
            doc @ Value::Null => {
                let mut map = Map::new();
                map.insert(key.to_string(), instance);
                *doc = Value::Object(map);
            }
            _ => return PageAction::Effects(Vec::new()),
        }
        debug!("added item {key:?}");
        self.after_mutation()
    }

    fn after_mutation(&mut self) -> PageAction {
        match self.rebuild() {
            Ok(()) => PageAction::Effects(vec![
                Effect::ClearWarn,
                Effect::MarkDirty,
                Effect::Redraw,
            ]),
            Err(e) => PageAction::Effects(vec![Effect::Warn(e.to_string())]),
        }
    }

    /// Effective rule for one entry. Entries without a declared rule get
    /// an untyped one so malformed documents stay editable.
    fn sub_schema(&self, key: &FieldKey) -> SchemaNode {
        let Ok(resolved) = self.schema.resolve(&self.document, &self.name) else {
            return SchemaNode::default();
        };
        match (resolved, key) {
            (Resolved::List(elem), FieldKey::Index(_)) => elem.clone(),
            (Resolved::Fields(fields), FieldKey::Key(name)) => {
                fields.get(name).cloned().unwrap_or_default()
            }
            (Resolved::ValuesRules { value, .. }, FieldKey::Key(_)) => value.clone(),
            _ => SchemaNode::default(),
        }
    }
}

fn derive_entries(
    schema: &SchemaNode,
    document: &Value,
    path: &str,
) -> Result<(Vec<FieldEntry>, AddAction, HashSet<FieldKey>), SchemaError> {
    let mut entries = Vec::new();
    let mut deletable = HashSet::new();
    let mut add_action = AddAction::None;

    let selector = match &schema.rule {
        SchemaRule::Selector { key, variants } => {
            Some((key.as_str(), variants.keys().cloned().collect::<Vec<_>>()))
        }
        _ => None,
    };

    match schema.resolve(document, path)? {
        Resolved::List(elem) => {
            let empty = Vec::new();
            let items = document.as_array().unwrap_or(&empty);
            for (idx, item) in items.iter().enumerate() {
                let key = FieldKey::Index(idx);
                deletable.insert(key.clone());
                entries.push(make_entry(key, elem, item));
            }
            add_action = AddAction::AppendElement;
        }
        Resolved::Fields(fields) => {
            let empty = Map::new();
            let map = document.as_object().unwrap_or(&empty);
            for (name, value) in map {
                let key = FieldKey::Key(name.clone());
                if let Some((sel_key, variants)) = &selector
                    && name == sel_key
                {
                    entries.push(selector_entry(key, variants, fields.get(name), value));
                    continue;
                }
                match fields.get(name) {
                    Some(sub) => {
                        if !sub.required && sub.default.is_none() {
                            deletable.insert(key.clone());
                        }
                        entries.push(make_entry(key, sub, value));
                    }
                    None => {
                        // Keys the schema does not declare are rendered
                        // from their value shape and can always go.
                        deletable.insert(key.clone());
                        entries.push(make_entry(key, &SchemaNode::default(), value));
                    }
                }
            }
            let missing: Vec<String> = fields
                .keys()
                .filter(|name| !map.contains_key(*name))
                .cloned()
                .collect();
            if !missing.is_empty() {
                add_action = AddAction::PromptMissing(missing);
            }
        }
        Resolved::ValuesRules { value: rule, key } => {
            let empty = Map::new();
            let map = document.as_object().unwrap_or(&empty);
            let removable = !rule.required && rule.default.is_none();
            for (name, value) in map {
                let entry_key = FieldKey::Key(name.clone());
                if removable {
                    deletable.insert(entry_key.clone());
                }
                entries.push(make_entry(entry_key, rule, value));
            }
            let key_schema = key.cloned().unwrap_or_else(string_rule);
            add_action = AddAction::PromptKey(key_schema);
        }
        Resolved::Untyped => match document {
            Value::Object(map) => {
                for (name, value) in map {
                    let key = FieldKey::Key(name.clone());
                    deletable.insert(key.clone());
                    entries.push(make_entry(key, &SchemaNode::default(), value));
                }
                add_action = AddAction::PromptKey(string_rule());
            }
            Value::Array(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let key = FieldKey::Index(idx);
                    deletable.insert(key.clone());
                    entries.push(make_entry(key, &SchemaNode::default(), item));
                }
                add_action = AddAction::AppendElement;
            }
            _ => {}
        },
        Resolved::Scalar(_) => {}
    }

    // The discriminator row must stay; removing it would make the page
    // unresolvable.
    if let Some((sel_key, _)) = &selector {
        deletable.remove(&FieldKey::Key(sel_key.to_string()));
    }

    Ok((entries, add_action, deletable))
}

fn make_entry(key: FieldKey, schema: &SchemaNode, value: &Value) -> FieldEntry {
    let kind = match &schema.rule {
        SchemaRule::Scalar(scalar) => match value {
            Value::Array(_) | Value::Object(_) => FieldKind::Nested {
                preview: preview(value),
            },
            _ => scalar_widget(*scalar, value, schema.multiline),
        },
        SchemaRule::List(_)
        | SchemaRule::Fields(_)
        | SchemaRule::Selector { .. }
        | SchemaRule::ValuesRules { .. } => {
            let shown = match value {
                Value::Null => empty_shape(&schema.rule),
                other => other.clone(),
            };
            FieldKind::Nested {
                preview: preview(&shown),
            }
        }
        SchemaRule::Untyped => match value {
            Value::Array(_) | Value::Object(_) => FieldKind::Nested {
                preview: preview(value),
            },
            _ => FieldKind::Text {
                value: scalar_text(value),
                multiline: false,
            },
        },
    };
    let editable = !matches!(kind, FieldKind::Nested { .. });
    FieldEntry {
        handle: key.handle(),
        label: key.label(),
        description: schema.description.clone(),
        kind,
        editable,
        key,
    }
}

fn scalar_widget(scalar: ScalarKind, value: &Value, multiline: bool) -> FieldKind {
    match scalar {
        ScalarKind::String => FieldKind::Text {
            value: scalar_text(value),
            multiline,
        },
        ScalarKind::Integer => FieldKind::Integer {
            value: if value.is_null() {
                "0".to_string()
            } else {
                scalar_text(value)
            },
        },
        ScalarKind::Number => FieldKind::Number {
            value: if value.is_null() {
                "0.0".to_string()
            } else {
                scalar_text(value)
            },
        },
        ScalarKind::Boolean => FieldKind::Boolean {
            value: value.as_bool().unwrap_or(false),
        },
    }
}

fn selector_entry(
    key: FieldKey,
    variants: &[String],
    rule: Option<&SchemaNode>,
    value: &Value,
) -> FieldEntry {
    let current = value.as_str().unwrap_or("").to_lowercase();
    let selected = variants.iter().position(|v| *v == current).unwrap_or(0);
    let options = variants
        .iter()
        .map(|v| (title_case(v), v.clone()))
        .collect();
    FieldEntry {
        handle: key.handle(),
        label: key.label(),
        description: rule.and_then(|r| r.description.clone()),
        kind: FieldKind::Select { options, selected },
        editable: true,
        key,
    }
}

fn empty_shape(rule: &SchemaRule) -> Value {
    match rule {
        SchemaRule::List(_) => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    }
}

fn string_rule() -> SchemaNode {
    SchemaNode {
        rule: SchemaRule::Scalar(ScalarKind::String),
        ..Default::default()
    }
}

/// Drop empty elements from folded lists and null values from folded
/// mappings. Zero and `false` count as real values.
fn fold_value(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !is_empty_element(v))
                .collect(),
        ),
        Value::Object(map) => {
            Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect())
        }
        other => other,
    }
}

fn get_value<'v>(document: &'v Value, key: &FieldKey) -> Option<&'v Value> {
    match key {
        FieldKey::Key(name) => document.get(name),
        FieldKey::Index(idx) => document.get(idx),
    }
}

fn set_value(document: &mut Value, key: &FieldKey, value: Value) {
    match key {
        FieldKey::Key(name) => {
            if let Some(map) = document.as_object_mut() {
                map.insert(name.clone(), value);
            }
        }
        FieldKey::Index(idx) => {
            if let Some(slot) = document.as_array_mut().and_then(|items| items.get_mut(*idx)) {
                *slot = value;
            }
        }
    }
}

fn remove_value(document: &mut Value, key: &FieldKey) {
    match key {
        FieldKey::Key(name) => {
            if let Some(map) = document.as_object_mut() {
                // shift_remove keeps the order of the remaining keys
                map.shift_remove(name);
            }
        }
        FieldKey::Index(idx) => {
            if let Some(items) = document.as_array_mut()
                && *idx < items.len()
            {
                items.remove(*idx);
            }
        }
    }
}
