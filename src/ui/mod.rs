//! Cursive frontend.
//!
//! Pages are rendered as cursive layers and widget callbacks are turned
//! back into [`PageEvent`]s. All editing state lives in the [`PageStack`]
//! stored as cursive user data; this module only reads it to build
//! layers and applies the effects the stack hands back. Layers are
//! rebuilt from page state rather than mutated in place, except for the
//! header and status lines which are updated through named views.

pub mod components;

use cursive::{
    Cursive,
    theme::BaseColor,
    utils::markup::StyledString,
    views::{BoxedView, TextArea, TextView},
};

use crate::{
    page::{Effect, Page, PageEvent},
    stack::PageStack,
};

/// Build a layer rendering the top page of `stack`.
pub fn top_layer(stack: &PageStack) -> BoxedView {
    match stack.top() {
        Page::Editor(page) => BoxedView::boxed(components::form::page_view(
            page,
            &stack.breadcrumb(),
            stack.depth(),
            stack.needs_save,
            stack.warning.as_deref(),
        )),
        Page::Popup(popup) => {
            BoxedView::boxed(components::popup::popup_dialog(popup, stack.depth()))
        }
    }
}

/// Send one page event through the stack and apply the resulting
/// effects to the screen.
pub fn dispatch(siv: &mut Cursive, event: PageEvent) {
    let Some(stack) = siv.user_data::<PageStack>() else {
        return;
    };
    let effects = stack.handle(event);
    apply_effects(siv, &effects);
}

/// Esc: close the view-level text dialog if one is open, otherwise go
/// back one page, folding edits into the parent.
pub fn handle_back(siv: &mut Cursive) {
    if text_block_open(siv) {
        siv.pop_layer();
        return;
    }
    dispatch(siv, PageEvent::Back);
}

/// Ctrl+N: add an element or key to the page being edited.
pub fn handle_add(siv: &mut Cursive) {
    if text_block_open(siv) {
        return;
    }
    dispatch(siv, PageEvent::AddItem);
}

/// Ctrl+X: ask to leave the editor.
pub fn handle_exit(siv: &mut Cursive) {
    if text_block_open(siv) {
        return;
    }
    dispatch(siv, PageEvent::ExitRequest);
}

// The text block dialog lives outside the page stack, so the global
// shortcuts must not reach the editor below while it is open.
fn text_block_open(siv: &mut Cursive) -> bool {
    siv.find_name::<TextArea>(components::form::TEXT_BLOCK)
        .is_some()
}

fn apply_effects(siv: &mut Cursive, effects: &[Effect]) {
    for effect in effects {
        match effect {
            Effect::Redraw => refresh_top(siv),
            Effect::PushLayer => push_top_layer(siv),
            Effect::PopLayer => {
                siv.pop_layer();
            }
            Effect::Warn(msg) => set_status(siv, msg),
            Effect::ClearWarn => set_status(siv, ""),
            Effect::PopupStatus(msg) => set_popup_status(siv, msg),
            Effect::MarkDirty => update_header(siv),
            Effect::Quit { .. } => siv.quit(),
        }
    }
}

/// Drop the top layer and rebuild it from page state.
fn refresh_top(siv: &mut Cursive) {
    siv.pop_layer();
    push_top_layer(siv);
}

fn push_top_layer(siv: &mut Cursive) {
    let Some(stack) = siv.user_data::<PageStack>() else {
        return;
    };
    let modal = stack.top().is_modal();
    let layer = top_layer(stack);
    if modal {
        siv.add_layer(layer);
    } else {
        siv.add_fullscreen_layer(layer);
    }
}

fn set_status(siv: &mut Cursive, msg: &str) {
    let Some(stack) = siv.user_data::<PageStack>() else {
        return;
    };
    let name = format!("status@{}", stack.depth());
    let text = StyledString::styled(msg.to_string(), BaseColor::Red.light());
    siv.call_on_name(&name, |v: &mut TextView| v.set_content(text));
}

fn set_popup_status(siv: &mut Cursive, msg: &str) {
    let Some(stack) = siv.user_data::<PageStack>() else {
        return;
    };
    let name = format!("popup_status@{}", stack.depth());
    let text = StyledString::styled(msg.to_string(), BaseColor::Red.light());
    siv.call_on_name(&name, |v: &mut TextView| v.set_content(text));
}

fn update_header(siv: &mut Cursive) {
    let Some(stack) = siv.user_data::<PageStack>() else {
        return;
    };
    let name = format!("header@{}", stack.depth());
    let text = components::form::header_text(&stack.breadcrumb(), stack.needs_save);
    siv.call_on_name(&name, |v: &mut TextView| v.set_content(text));
}
