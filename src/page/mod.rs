//! Editing pages and the events that drive them.
//!
//! A page is one editing surface over a `(schema, document)` pair. Editor
//! pages expose the fields of one nesting level; popup pages collect a
//! single input on top of an editor. Pages are plain state machines: the
//! UI layer translates widget callbacks into [`PageEvent`]s, pages answer
//! with a [`PageAction`], and the [`crate::stack`] module applies
//! structural actions and routes results between pages. Nothing in here
//! touches the terminal, which is what makes the editing logic testable.

use serde_json::Value;

use crate::data::SchemaNode;

/// Editor page over one nesting level.
pub mod editor;

/// Modal popups for single inputs and confirmations.
pub mod popup;

pub use editor::EditorPage;
pub use popup::{PopupMode, PopupPage, PopupPurpose};

/// Location of one editable entry inside a page's document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Named field of an object.
    Key(String),
    /// Position in a list.
    Index(usize),
}

impl FieldKey {
    /// Stable widget handle for the entry, unique within its page.
    pub fn handle(&self) -> String {
        match self {
            FieldKey::Key(name) => format!("f:{name}"),
            FieldKey::Index(idx) => format!("f:#{idx}"),
        }
    }

    /// Label shown next to the entry and in the breadcrumb.
    pub fn label(&self) -> String {
        match self {
            FieldKey::Key(name) => name.clone(),
            FieldKey::Index(idx) => format!("[{idx}]"),
        }
    }
}

/// Outcome of the exit confirmation popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitChoice {
    /// Save the document and quit.
    Yes,
    /// Quit without saving.
    No,
    /// Keep editing.
    Cancel,
}

impl ExitChoice {
    /// Parse a button label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_lowercase().as_str() {
            "yes" => Some(ExitChoice::Yes),
            "no" => Some(ExitChoice::No),
            "cancel" => Some(ExitChoice::Cancel),
            _ => None,
        }
    }
}

/// Data a closing page hands to the page below it.
#[derive(Debug, Clone)]
pub enum PagePayload {
    /// Edited document of a closing editor page.
    Document(Value),
    /// Key picked in an add popup; `None` when cancelled.
    AddKey(Option<String>),
    /// Variant picked in a selector popup for the entry at `handle`;
    /// `None` when cancelled.
    Pick {
        handle: String,
        value: Option<String>,
    },
    /// Choice made in the exit popup; `None` when cancelled.
    Exit(Option<ExitChoice>),
}

/// Result delivered to the new top page after a pop.
#[derive(Debug, Clone)]
pub struct PageResult {
    /// Name of the page that closed.
    pub name: String,
    /// Where the closed page's value belongs in the receiving document.
    pub origin: Option<FieldKey>,
    /// What the closed page produced.
    pub payload: PagePayload,
}

/// Input events pages react to.
#[derive(Debug, Clone)]
pub enum PageEvent {
    /// Text of a scalar entry changed.
    Edited { handle: String, text: String },
    /// Boolean entry toggled.
    Toggled { handle: String, on: bool },
    /// Nested or selector entry activated.
    Activated { handle: String },
    /// Add operation requested.
    AddItem,
    /// Delete requested for one entry.
    DeleteItem { handle: String },
    /// Navigate back, or cancel the current popup.
    Back,
    /// Exit confirmation requested.
    ExitRequest,
    /// Popup input buffer changed.
    PopupInput { text: String },
    /// Popup commit requested.
    PopupSubmit,
    /// Popup option picked. `choice` is the stored value, not the
    /// display label.
    PopupPick { choice: String },
}

/// UI instructions produced while handling an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Rebuild the top layer from page state.
    Redraw,
    /// A page was pushed; render it as a new layer.
    PushLayer,
    /// The top page was popped; drop its layer.
    PopLayer,
    /// Show a warning in the status line.
    Warn(String),
    /// Clear the status line.
    ClearWarn,
    /// Update the popup's status line without rebuilding it.
    PopupStatus(String),
    /// The document diverged from what was loaded.
    MarkDirty,
    /// Leave the main loop; `commit` tells the caller whether to save.
    Quit { commit: bool },
}

/// What a page wants done after handling an event.
#[derive(Debug)]
pub enum PageAction {
    /// Stay on this page.
    Effects(Vec<Effect>),
    /// Push a new page on top of this one.
    Push(Box<Page>),
    /// Close this page, delivering `payload` to the page below.
    PopSelf(PagePayload),
    /// Unwind the whole stack and leave the main loop.
    Quit { commit: bool },
}

/// One renderable row of an editor page.
#[derive(Debug, Clone)]
pub struct FieldEntry {
    /// Location of the value in the page document.
    pub key: FieldKey,
    /// Widget handle, unique within the page.
    pub handle: String,
    /// Label shown next to the widget.
    pub label: String,
    /// Description line shown above the row.
    pub description: Option<String>,
    /// Widget selection for the value.
    pub kind: FieldKind,
    /// Whether the row takes inline input. Drill-down rows are activated,
    /// not edited.
    pub editable: bool,
}

/// Widget selection for one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Single or multi line text input.
    Text { value: String, multiline: bool },
    /// Integer input, kept as text until it parses.
    Integer { value: String },
    /// Floating-point input, kept as text until it parses.
    Number { value: String },
    /// Checkbox.
    Boolean { value: bool },
    /// Selector variant; activating the row opens a choice popup.
    /// Options are `(label, stored value)` pairs.
    Select {
        options: Vec<(String, String)>,
        selected: usize,
    },
    /// Drill-down row with a YAML preview of the nested value.
    Nested { preview: String },
}

/// What the add operation does on the current page.
#[derive(Debug, Clone)]
pub enum AddAction {
    /// Nothing can be added.
    None,
    /// Append a zero element to the list.
    AppendElement,
    /// Ask for a new mapping key through an edit popup.
    PromptKey(SchemaNode),
    /// Offer the schema fields currently missing from the document.
    PromptMissing(Vec<String>),
}

/// A frame of the navigation stack.
#[derive(Debug)]
pub enum Page {
    Editor(EditorPage),
    Popup(PopupPage),
}

impl Page {
    /// Page name shown in the breadcrumb.
    pub fn name(&self) -> &str {
        match self {
            Page::Editor(p) => p.name(),
            Page::Popup(p) => p.name(),
        }
    }

    /// Key of this page's document in its parent, if any.
    pub fn origin(&self) -> Option<&FieldKey> {
        match self {
            Page::Editor(p) => p.origin(),
            Page::Popup(_) => None,
        }
    }

    /// Whether the page blocks page-level shortcuts below it.
    pub fn is_modal(&self) -> bool {
        matches!(self, Page::Popup(_))
    }

    /// Handle one input event.
    pub fn on_event(&mut self, event: PageEvent) -> PageAction {
        match self {
            Page::Editor(p) => p.on_event(event),
            Page::Popup(p) => p.on_event(event),
        }
    }

    /// Receive the result of a page that closed on top of this one.
    pub fn on_page_result(&mut self, result: PageResult) -> PageAction {
        match self {
            Page::Editor(p) => p.on_page_result(result),
            Page::Popup(_) => PageAction::Effects(Vec::new()),
        }
    }

    /// Key hints for the footer.
    pub fn key_hints(&self) -> Vec<&'static str> {
        match self {
            Page::Editor(p) => p.key_hints(),
            Page::Popup(p) => p.key_hints(),
        }
    }
}
