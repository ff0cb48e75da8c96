//! Fullscreen form layer for an editor page.
//!
//! One row per field entry: scalars edit inline, booleans toggle,
//! selector and nested rows are buttons that open a popup or a child
//! page. Every row answers Ctrl+D with a delete request for its entry;
//! whether the entry may actually go is the page's call.

use cursive::{
    event::Event,
    theme::{BaseColor, Effect},
    utils::markup::StyledString,
    view::{Nameable, Resizable, Scrollable},
    views::{
        Button, Checkbox, Dialog, DummyView, EditView, LinearLayout, OnEventView, ResizedView,
        TextArea, TextView,
    },
};

use crate::{
    page::{EditorPage, FieldEntry, FieldKind, PageEvent},
    ui::dispatch,
};

/// Name of the text block editor, used to detect the open dialog.
pub const TEXT_BLOCK: &str = "text_block";

const LABEL_WIDTH: usize = 24;

/// Build the fullscreen layer for an editor page.
pub fn page_view(
    page: &EditorPage,
    breadcrumb: &str,
    depth: usize,
    needs_save: bool,
    warning: Option<&str>,
) -> ResizedView<LinearLayout> {
    let mut body = LinearLayout::vertical();
    if page.entries().is_empty() {
        body.add_child(TextView::new(StyledString::styled(
            "Empty items.",
            Effect::Dim,
        )));
    }
    for entry in page.entries() {
        if let Some(desc) = &entry.description {
            body.add_child(TextView::new(StyledString::styled(
                format!("# {desc}"),
                BaseColor::Yellow.dark(),
            )));
        }
        body.add_child(field_row(entry));
    }

    let warning = warning.unwrap_or("");
    LinearLayout::vertical()
        .child(
            TextView::new(header_text(breadcrumb, needs_save))
                .with_name(format!("header@{depth}")),
        )
        .child(DummyView)
        .child(body.scrollable().full_height())
        .child(
            TextView::new(StyledString::styled(
                warning.to_string(),
                BaseColor::Red.light(),
            ))
            .with_name(format!("status@{depth}")),
        )
        .child(TextView::new(StyledString::styled(
            page.key_hints().join("  |  "),
            Effect::Dim,
        )))
        .full_screen()
}

/// Header line content: breadcrumb plus a pending-changes marker.
pub fn header_text(breadcrumb: &str, needs_save: bool) -> StyledString {
    let marker = if needs_save { " *" } else { "" };
    StyledString::styled(format!(" {breadcrumb}{marker}"), Effect::Bold)
}

fn field_row(entry: &FieldEntry) -> OnEventView<LinearLayout> {
    let mut row = LinearLayout::horizontal();
    match &entry.kind {
        FieldKind::Text { value, multiline } => {
            row.add_child(row_label(&entry.label));
            if *multiline {
                row.add_child(text_block_button(&entry.handle, &entry.label, value));
            } else {
                row.add_child(edit_input(&entry.handle, value));
            }
        }
        FieldKind::Integer { value } | FieldKind::Number { value } => {
            row.add_child(row_label(&entry.label));
            row.add_child(edit_input(&entry.handle, value));
        }
        FieldKind::Boolean { value } => {
            let h = entry.handle.clone();
            row.add_child(row_label(&entry.label));
            row.add_child(
                Checkbox::new()
                    .with_checked(*value)
                    .on_change(move |siv, on| {
                        dispatch(
                            siv,
                            PageEvent::Toggled {
                                handle: h.clone(),
                                on,
                            },
                        );
                    }),
            );
        }
        FieldKind::Select { options, selected } => {
            let h = entry.handle.clone();
            let current = options
                .get(*selected)
                .map(|(label, _)| label.clone())
                .unwrap_or_default();
            row.add_child(row_label(&entry.label));
            row.add_child(Button::new(current, move |siv| {
                dispatch(siv, PageEvent::Activated { handle: h.clone() });
            }));
        }
        FieldKind::Nested { preview } => {
            let h = entry.handle.clone();
            let text = format!(
                "{:<width$}",
                format!("{} ...", entry.label),
                width = LABEL_WIDTH
            );
            row.add_child(Button::new_raw(text, move |siv| {
                dispatch(siv, PageEvent::Activated { handle: h.clone() });
            }));
            row.add_child(TextView::new(StyledString::styled(
                preview.clone(),
                Effect::Dim,
            )));
        }
    }
    deletable_row(&entry.handle, row)
}

fn row_label(label: &str) -> TextView {
    TextView::new(format!("{:<width$}", label, width = LABEL_WIDTH))
}

fn edit_input(handle: &str, value: &str) -> ResizedView<EditView> {
    let h = handle.to_string();
    EditView::new()
        .content(value)
        .on_edit(move |siv, text, _cursor| {
            dispatch(
                siv,
                PageEvent::Edited {
                    handle: h.clone(),
                    text: text.to_string(),
                },
            );
        })
        .full_width()
}

/// Multiline strings edit in a dialog so the row stays one line high.
fn text_block_button(handle: &str, label: &str, value: &str) -> Button {
    let mut shown = value.lines().next().unwrap_or("").to_string();
    if value.lines().count() > 1 {
        shown.push_str(" ...");
    }
    if shown.is_empty() {
        shown = "edit".to_string();
    }
    Button::new(
        shown,
        open_text_block(handle.to_string(), label.to_string(), value.to_string()),
    )
}

fn open_text_block(handle: String, title: String, value: String) -> impl Fn(&mut cursive::Cursive) {
    move |siv| {
        let h = handle.clone();
        let dialog = Dialog::around(
            TextArea::new()
                .content(value.clone())
                .with_name(TEXT_BLOCK)
                .min_size((48, 8)),
        )
        .title(title.clone())
        .button("Ok", move |siv| {
            let text = siv
                .call_on_name(TEXT_BLOCK, |v: &mut TextArea| v.get_content().to_string())
                .unwrap_or_default();
            siv.pop_layer();
            dispatch(
                siv,
                PageEvent::Edited {
                    handle: h.clone(),
                    text,
                },
            );
        })
        .dismiss_button("Cancel");
        siv.add_layer(dialog);
    }
}

fn deletable_row(handle: &str, row: LinearLayout) -> OnEventView<LinearLayout> {
    let h = handle.to_string();
    OnEventView::new(row).on_event(Event::CtrlChar('d'), move |siv| {
        dispatch(siv, PageEvent::DeleteItem { handle: h.clone() });
    })
}
