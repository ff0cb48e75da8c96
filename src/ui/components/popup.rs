//! Modal dialogs for popup pages.

use cursive::{
    theme::Effect,
    utils::markup::StyledString,
    view::{Nameable, Resizable, Scrollable},
    views::{Dialog, EditView, LinearLayout, SelectView, TextView},
};

use crate::{
    page::{PageEvent, PopupMode, PopupPage},
    ui::dispatch,
};

/// Build the dialog for a popup page.
pub fn popup_dialog(popup: &PopupPage, depth: usize) -> Dialog {
    match popup.mode() {
        PopupMode::Edit { buffer, .. } => edit_dialog(popup.name(), buffer, depth),
        PopupMode::Choice { items, selected } => {
            choice_dialog(popup.name(), items, *selected, &popup.key_hints())
        }
    }
}

fn edit_dialog(title: &str, buffer: &str, depth: usize) -> Dialog {
    let input = EditView::new()
        .content(buffer)
        .on_edit(|siv, text, _cursor| {
            dispatch(
                siv,
                PageEvent::PopupInput {
                    text: text.to_string(),
                },
            );
        })
        .on_submit(|siv, _text| {
            dispatch(siv, PageEvent::PopupSubmit);
        })
        .min_width(32);
    let status = TextView::new("").with_name(format!("popup_status@{depth}"));

    Dialog::around(LinearLayout::vertical().child(input).child(status))
        .title(title)
        .button("Add", |siv| dispatch(siv, PageEvent::PopupSubmit))
        .button("Cancel", |siv| dispatch(siv, PageEvent::Back))
}

fn choice_dialog(
    title: &str,
    items: &[(String, String)],
    selected: usize,
    hints: &[&'static str],
) -> Dialog {
    let mut list = SelectView::new();
    for (label, value) in items {
        list.add_item(label.clone(), value.clone());
    }
    let list = list.selected(selected).on_submit(|siv, choice: &String| {
        dispatch(
            siv,
            PageEvent::PopupPick {
                choice: choice.clone(),
            },
        );
    });

    Dialog::around(
        LinearLayout::vertical()
            .child(list.scrollable())
            .child(TextView::new(StyledString::styled(
                hints.join("  |  "),
                Effect::Dim,
            ))),
    )
    .title(title)
}
