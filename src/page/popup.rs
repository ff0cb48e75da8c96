//! Modal popup pages.
//!
//! Two shapes exist: an edit popup collecting one line of text that is
//! validated live against a rule, and a choice popup offering a fixed
//! list of options where picking one closes the popup immediately.
//! Choice popups serve three purposes: offering missing keys to add,
//! switching a selector variant, and confirming exit. All popups deliver
//! their result to the page below through the stack; an invalid edit
//! buffer can never be committed, only cancelled.

use crate::{
    data::{SchemaNode, validator::validate_text},
    page::{Effect, ExitChoice, PageAction, PageEvent, PagePayload},
};

/// Popup collecting one input on top of an editor page.
#[derive(Debug)]
pub struct PopupPage {
    name: String,
    purpose: PopupPurpose,
    mode: PopupMode,
}

/// What the collected input is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupPurpose {
    /// Adding a key to the page below.
    AddKey,
    /// Switching the variant of the selector entry at `handle`.
    SelectValue { handle: String },
    /// Confirming exit with or without saving.
    ExitConfirm,
}

/// Input mode of a popup.
#[derive(Debug)]
pub enum PopupMode {
    /// Free-text input validated live against a rule.
    Edit {
        schema: SchemaNode,
        buffer: String,
        valid: bool,
    },
    /// Fixed list of `(label, stored value)` options.
    Choice {
        items: Vec<(String, String)>,
        selected: usize,
    },
}

impl PopupPage {
    /// Popup with one validated text input.
    pub fn edit(name: impl Into<String>, schema: SchemaNode) -> Self {
        PopupPage {
            name: name.into(),
            purpose: PopupPurpose::AddKey,
            mode: PopupMode::Edit {
                schema,
                buffer: String::new(),
                // Nothing has been typed, so nothing can be committed.
                valid: false,
            },
        }
    }

    /// Popup offering a fixed set of options, with `selected`
    /// highlighted initially.
    pub fn choice(
        name: impl Into<String>,
        items: Vec<(String, String)>,
        selected: usize,
        purpose: PopupPurpose,
    ) -> Self {
        PopupPage {
            name: name.into(),
            purpose,
            mode: PopupMode::Choice { items, selected },
        }
    }

    /// The exit confirmation popup.
    pub fn exit_confirm() -> Self {
        let items = ["Yes", "No", "Cancel"]
            .into_iter()
            .map(|s| (s.to_string(), s.to_string()))
            .collect();
        Self::choice("Exit with Save", items, 0, PopupPurpose::ExitConfirm)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input mode, used by the UI to build the dialog.
    pub fn mode(&self) -> &PopupMode {
        &self.mode
    }

    pub(crate) fn on_event(&mut self, event: PageEvent) -> PageAction {
        match event {
            PageEvent::PopupInput { text } => self.on_input(text),
            PageEvent::PopupSubmit => self.on_submit(),
            PageEvent::PopupPick { choice } => self.on_pick(&choice),
            PageEvent::Back => PageAction::PopSelf(self.cancel_payload()),
            // Popups are modal; page-level shortcuts do not reach the
            // editor below and do nothing here.
            _ => PageAction::Effects(Vec::new()),
        }
    }

    pub(crate) fn key_hints(&self) -> Vec<&'static str> {
        match self.mode {
            PopupMode::Edit { .. } => vec!["Esc: Cancel", "Enter: Add"],
            PopupMode::Choice { .. } => vec!["Esc: Cancel"],
        }
    }

    fn on_input(&mut self, text: String) -> PageAction {
        let PopupMode::Edit {
            schema,
            buffer,
            valid,
        } = &mut self.mode
        else {
            return PageAction::Effects(Vec::new());
        };
        let errors = validate_text(schema, &text);
        *buffer = text;
        *valid = errors.is_empty();
        let status = if *valid { String::new() } else { errors.join(", ") };
        PageAction::Effects(vec![Effect::PopupStatus(status)])
    }

    fn on_submit(&mut self) -> PageAction {
        let PopupMode::Edit { buffer, valid, .. } = &self.mode else {
            return PageAction::Effects(Vec::new());
        };
        if !*valid || buffer.trim().is_empty() {
            return PageAction::Effects(vec![Effect::PopupStatus(
                "Item is not valid.".to_string(),
            )]);
        }
        PageAction::PopSelf(PagePayload::AddKey(Some(buffer.clone())))
    }

    fn on_pick(&self, choice: &str) -> PageAction {
        match &self.purpose {
            PopupPurpose::AddKey => {
                PageAction::PopSelf(PagePayload::AddKey(Some(choice.to_string())))
            }
            PopupPurpose::SelectValue { handle } => PageAction::PopSelf(PagePayload::Pick {
                handle: handle.clone(),
                value: Some(choice.to_string()),
            }),
            PopupPurpose::ExitConfirm => {
                let choice = ExitChoice::from_label(choice).unwrap_or(ExitChoice::Cancel);
                PageAction::PopSelf(PagePayload::Exit(Some(choice)))
            }
        }
    }

    fn cancel_payload(&self) -> PagePayload {
        match &self.purpose {
            PopupPurpose::AddKey => PagePayload::AddKey(None),
            PopupPurpose::SelectValue { handle } => PagePayload::Pick {
                handle: handle.clone(),
                value: None,
            },
            PopupPurpose::ExitConfirm => PagePayload::Exit(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key_schema() -> SchemaNode {
        SchemaNode::parse(&json!({ "type": "string", "regex": "[a-z]+" }), "key").unwrap()
    }

    fn pairs(items: &[&str]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|s| (s.to_string(), s.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_popup_refuses_commit() {
        let mut p = PopupPage::edit("Add new item", key_schema());
        let PageAction::Effects(fx) = p.on_event(PageEvent::PopupSubmit) else {
            panic!("popup must stay open");
        };
        assert_eq!(fx, [Effect::PopupStatus("Item is not valid.".into())]);
    }

    #[test]
    fn test_invalid_input_reported_live_and_refused() {
        let mut p = PopupPage::edit("Add new item", key_schema());
        let PageAction::Effects(fx) = p.on_event(PageEvent::PopupInput { text: "A1".into() })
        else {
            panic!("input must not close the popup");
        };
        assert!(matches!(&fx[0], Effect::PopupStatus(s) if s.contains("regex")));

        let PageAction::Effects(fx) = p.on_event(PageEvent::PopupSubmit) else {
            panic!("invalid buffer must not commit");
        };
        assert_eq!(fx, [Effect::PopupStatus("Item is not valid.".into())]);
    }

    #[test]
    fn test_valid_input_commits() {
        let mut p = PopupPage::edit("Add new item", key_schema());
        let PageAction::Effects(fx) = p.on_event(PageEvent::PopupInput { text: "abc".into() })
        else {
            panic!("input must not close the popup");
        };
        assert_eq!(fx, [Effect::PopupStatus(String::new())]);

        let action = p.on_event(PageEvent::PopupSubmit);
        let PageAction::PopSelf(PagePayload::AddKey(Some(key))) = action else {
            panic!("expected commit, got {action:?}");
        };
        assert_eq!(key, "abc");
    }

    #[test]
    fn test_choice_pick_closes_immediately() {
        let mut p = PopupPage::choice(
            "Add new item",
            pairs(&["port", "host"]),
            0,
            PopupPurpose::AddKey,
        );
        let action = p.on_event(PageEvent::PopupPick {
            choice: "port".into(),
        });
        assert!(matches!(
            action,
            PageAction::PopSelf(PagePayload::AddKey(Some(key))) if key == "port"
        ));
    }

    #[test]
    fn test_select_pick_carries_its_entry() {
        let mut p = PopupPage::choice(
            "kind",
            vec![
                ("Qemu".to_string(), "qemu".to_string()),
                ("Board".to_string(), "board".to_string()),
            ],
            0,
            PopupPurpose::SelectValue {
                handle: "f:kind".into(),
            },
        );
        let action = p.on_event(PageEvent::PopupPick {
            choice: "board".into(),
        });
        let PageAction::PopSelf(PagePayload::Pick { handle, value }) = action else {
            panic!("expected pick payload");
        };
        assert_eq!(handle, "f:kind");
        assert_eq!(value.as_deref(), Some("board"));
    }

    #[test]
    fn test_exit_popup_choices() {
        for (label, expected) in [
            ("Yes", ExitChoice::Yes),
            ("No", ExitChoice::No),
            ("Cancel", ExitChoice::Cancel),
        ] {
            let mut p = PopupPage::exit_confirm();
            let action = p.on_event(PageEvent::PopupPick {
                choice: label.into(),
            });
            assert!(matches!(
                action,
                PageAction::PopSelf(PagePayload::Exit(Some(choice))) if choice == expected
            ));
        }
    }

    #[test]
    fn test_cancel_payloads() {
        let mut p = PopupPage::edit("Add new item", key_schema());
        assert!(matches!(
            p.on_event(PageEvent::Back),
            PageAction::PopSelf(PagePayload::AddKey(None))
        ));

        let mut p = PopupPage::choice(
            "kind",
            pairs(&["qemu"]),
            0,
            PopupPurpose::SelectValue {
                handle: "f:kind".into(),
            },
        );
        assert!(matches!(
            p.on_event(PageEvent::Back),
            PageAction::PopSelf(PagePayload::Pick { value: None, .. })
        ));

        let mut p = PopupPage::exit_confirm();
        assert!(matches!(
            p.on_event(PageEvent::Back),
            PageAction::PopSelf(PagePayload::Exit(None))
        ));
    }

    #[test]
    fn test_popup_swallows_page_shortcuts() {
        let mut p = PopupPage::exit_confirm();
        assert!(matches!(
            p.on_event(PageEvent::ExitRequest),
            PageAction::Effects(fx) if fx.is_empty()
        ));
        assert!(matches!(
            p.on_event(PageEvent::AddItem),
            PageAction::Effects(fx) if fx.is_empty()
        ));
    }
}
