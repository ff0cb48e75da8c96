//! Navigation stack over editing pages.
//!
//! The stack owns every open page, routes input events to the top one,
//! applies the structural actions pages ask for (push, pop, unwind) and
//! carries the result of a closing page to the page below it. Pending
//! changes are tracked here as a single dirty flag, and the exit decision
//! is recorded so the caller knows whether to write the document back.

use serde_json::Value;

use crate::page::{Effect, EditorPage, Page, PageAction, PageEvent, PagePayload, PageResult};

/// Stack of open pages; the root editor page is always at the bottom.
#[derive(Debug)]
pub struct PageStack {
    frames: Vec<Page>,
    /// Whether the document differs from what was loaded.
    pub needs_save: bool,
    /// Warning currently shown in the status line.
    pub warning: Option<String>,
    exit_commit: Option<bool>,
}

impl PageStack {
    /// Start a session with `root` as the only page.
    pub fn new(root: EditorPage) -> Self {
        PageStack {
            frames: vec![Page::Editor(root)],
            needs_save: false,
            warning: None,
            exit_commit: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Page currently receiving events.
    pub fn top(&self) -> &Page {
        // frames is never empty, the root page cannot be popped
        self.frames.last().expect("page stack lost its root")
    }

    /// Breadcrumb of open page names, root first.
    pub fn breadcrumb(&self) -> String {
        self.frames
            .iter()
            .map(Page::name)
            .collect::<Vec<_>>()
            .join(" > ")
    }

    /// Exit decision, present once the stack has been unwound.
    pub fn exit_commit(&self) -> Option<bool> {
        self.exit_commit
    }

    /// Consume the stack, yielding the root document.
    pub fn into_document(mut self) -> Value {
        match self.frames.drain(..).next() {
            Some(Page::Editor(page)) => page.into_document(),
            _ => Value::Null,
        }
    }

    /// Route one event to the top page and apply whatever it asks for.
    ///
    /// The returned effects tell the UI layer what to update; dirty and
    /// warning state has already been recorded by the time this returns.
    pub fn handle(&mut self, event: PageEvent) -> Vec<Effect> {
        let Some(top) = self.frames.last_mut() else {
            return Vec::new();
        };
        let action = top.on_event(event);
        let effects = self.apply(action);
        self.absorb(&effects);
        effects
    }

    fn apply(&mut self, action: PageAction) -> Vec<Effect> {
        match action {
            PageAction::Effects(effects) => effects,
            PageAction::Push(page) => {
                debug!("push page {:?}", page.name());
                self.frames.push(*page);
                vec![Effect::PushLayer]
            }
            PageAction::PopSelf(payload) => self.pop_with(payload),
            PageAction::Quit { commit } => self.destroy(commit),
        }
    }

    /// Pop the top page and deliver its result to the page below.
    /// Popping the root is a no-op.
    fn pop_with(&mut self, payload: PagePayload) -> Vec<Effect> {
        if self.frames.len() <= 1 {
            return Vec::new();
        }
        let Some(popped) = self.frames.pop() else {
            return Vec::new();
        };
        let result = PageResult {
            name: popped.name().to_string(),
            origin: popped.origin().cloned(),
            payload,
        };
        debug!("pop page {:?}", result.name);

        let mut effects = vec![Effect::PopLayer];
        let action = match self.frames.last_mut() {
            Some(parent) => parent.on_page_result(result),
            None => return effects,
        };
        effects.extend(self.apply(action));
        effects
    }

    /// Unwind the whole stack. Every open editor page is folded into its
    /// parent on the way down so nothing being edited is lost, then the
    /// exit decision is recorded.
    fn destroy(&mut self, commit: bool) -> Vec<Effect> {
        debug!("unwind stack, commit={commit}");
        while self.frames.len() > 1 {
            let Some(popped) = self.frames.pop() else {
                break;
            };
            // Popups deliver nothing on unwind.
            let Page::Editor(child) = popped else {
                continue;
            };
            let result = PageResult {
                name: child.name().to_string(),
                origin: child.origin().cloned(),
                payload: PagePayload::Document(child.into_document()),
            };
            let action = match self.frames.last_mut() {
                Some(parent) => parent.on_page_result(result),
                None => break,
            };
            // Only the state-bearing effects matter while unwinding.
            if let PageAction::Effects(effects) = action {
                self.absorb(&effects);
            }
        }
        self.exit_commit = Some(commit);
        vec![Effect::Quit { commit }]
    }

    /// Record the state-bearing effects so later layer rebuilds can
    /// re-render them.
    fn absorb(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::MarkDirty => self.needs_save = true,
                Effect::Warn(msg) => self.warning = Some(msg.clone()),
                Effect::ClearWarn => self.warning = None,
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SchemaRoot;
    use serde_json::json;

    fn stack(schema: serde_json::Value, doc: serde_json::Value) -> PageStack {
        let _ = env_logger::builder().is_test(true).try_init();
        let root = SchemaRoot::try_from(&schema).unwrap();
        let page = EditorPage::new("config.yaml", None, root.node, &doc).unwrap();
        PageStack::new(page)
    }

    fn demo_schema() -> serde_json::Value {
        json!({
            "name": { "type": "string", "required": true },
            "tags": { "type": "list", "schema": { "type": "string" } },
        })
    }

    fn root_document(s: &PageStack) -> &Value {
        let Page::Editor(page) = s.top() else {
            panic!("expected editor on top");
        };
        page.document()
    }

    #[test]
    fn test_drill_down_and_fold() {
        let mut s = stack(demo_schema(), json!({ "name": "svc", "tags": ["a"] }));
        let fx = s.handle(PageEvent::Activated {
            handle: "f:tags".into(),
        });
        assert_eq!(fx, [Effect::PushLayer]);
        assert_eq!(s.depth(), 2);
        assert_eq!(s.breadcrumb(), "config.yaml > tags");

        // 在子页面追加并填写一个元素，再返回
        s.handle(PageEvent::AddItem);
        s.handle(PageEvent::Edited {
            handle: "f:#1".into(),
            text: "b".into(),
        });
        let fx = s.handle(PageEvent::Back);
        assert_eq!(s.depth(), 1);
        assert!(fx.contains(&Effect::PopLayer));
        assert!(fx.contains(&Effect::Redraw));
        assert_eq!(
            root_document(&s),
            &json!({ "name": "svc", "tags": ["a", "b"] })
        );
        assert!(s.needs_save);
    }

    #[test]
    fn test_pop_never_removes_root() {
        let mut s = stack(demo_schema(), json!({ "name": "x" }));
        let fx = s.pop_with(PagePayload::Document(json!({})));
        assert!(fx.is_empty());
        assert_eq!(s.depth(), 1);
    }

    #[test]
    fn test_exit_cancel_keeps_session() {
        let mut s = stack(demo_schema(), json!({ "name": "x" }));
        s.handle(PageEvent::ExitRequest);
        assert_eq!(s.depth(), 2);
        assert!(s.top().is_modal());

        let fx = s.handle(PageEvent::PopupPick {
            choice: "Cancel".into(),
        });
        assert!(fx.contains(&Effect::PopLayer));
        assert_eq!(s.depth(), 1);
        assert!(s.exit_commit().is_none());

        // 取消后会话继续，页面仍可编辑
        s.handle(PageEvent::Edited {
            handle: "f:name".into(),
            text: "y".into(),
        });
        assert_eq!(root_document(&s)["name"], json!("y"));
    }

    #[test]
    fn test_exit_yes_folds_all_open_pages() {
        let mut s = stack(demo_schema(), json!({ "name": "svc", "tags": ["a"] }));
        s.handle(PageEvent::Activated {
            handle: "f:tags".into(),
        });
        s.handle(PageEvent::AddItem);
        s.handle(PageEvent::Edited {
            handle: "f:#1".into(),
            text: "b".into(),
        });

        // 从子页面直接退出，未折叠的修改也要进入根文档
        s.handle(PageEvent::ExitRequest);
        let fx = s.handle(PageEvent::PopupPick {
            choice: "Yes".into(),
        });
        assert!(fx.contains(&Effect::Quit { commit: true }));
        assert_eq!(s.exit_commit(), Some(true));
        assert_eq!(
            s.into_document(),
            json!({ "name": "svc", "tags": ["a", "b"] })
        );
    }

    #[test]
    fn test_exit_no_discards() {
        let mut s = stack(demo_schema(), json!({ "name": "svc" }));
        s.handle(PageEvent::Edited {
            handle: "f:name".into(),
            text: "other".into(),
        });
        s.handle(PageEvent::ExitRequest);
        let fx = s.handle(PageEvent::PopupPick { choice: "No".into() });
        assert!(fx.contains(&Effect::Quit { commit: false }));
        assert_eq!(s.exit_commit(), Some(false));
    }

    #[test]
    fn test_warning_state_follows_effects() {
        let mut s = stack(
            json!({ "name": { "type": "string", "regex": "[a-z]+" } }),
            json!({ "name": "ok" }),
        );
        s.handle(PageEvent::Edited {
            handle: "f:name".into(),
            text: "NO".into(),
        });
        assert!(s.warning.as_deref().unwrap().contains("regex"));

        s.handle(PageEvent::Edited {
            handle: "f:name".into(),
            text: "yes".into(),
        });
        assert!(s.warning.is_none());
    }

    #[test]
    fn test_add_key_through_popup() {
        let mut s = stack(
            json!({ "__root__": {
                "valuesrules": { "type": "integer" },
                "keysrules": { "type": "string", "regex": "[a-z]+" },
            } }),
            json!({}),
        );
        s.handle(PageEvent::AddItem);
        assert!(s.top().is_modal());

        // 无效key提交被拒绝，弹窗保持打开
        s.handle(PageEvent::PopupInput { text: "BAD".into() });
        s.handle(PageEvent::PopupSubmit);
        assert_eq!(s.depth(), 2);

        s.handle(PageEvent::PopupInput { text: "mem".into() });
        let fx = s.handle(PageEvent::PopupSubmit);
        assert!(fx.contains(&Effect::PopLayer));
        assert_eq!(s.depth(), 1);
        assert_eq!(root_document(&s), &json!({ "mem": null }));
        assert!(s.needs_save);
    }

    #[test]
    fn test_popup_blocks_page_shortcuts() {
        let mut s = stack(demo_schema(), json!({ "name": "x" }));
        s.handle(PageEvent::ExitRequest);
        assert_eq!(s.depth(), 2);

        let fx = s.handle(PageEvent::ExitRequest);
        assert!(fx.is_empty());
        assert_eq!(s.depth(), 2);
    }
}
