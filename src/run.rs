use std::{path::Path, time::SystemTime};

use anyhow::Context;
pub use cursive;
use cursive::{
    Cursive, CursiveExt,
    event::{Event, Key},
};
use serde_json::Value;

use crate::{
    data::SchemaRoot,
    page::EditorPage,
    stack::PageStack,
    ui::{self, handle_add, handle_back, handle_exit},
};

/// Supported document encodings, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Yaml,
    Json,
}

impl DocFormat {
    /// Format for a document path.
    ///
    /// # Errors
    ///
    /// Returns an error for extensions other than yaml, yml and json.
    pub fn of(path: &Path) -> anyhow::Result<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        match ext {
            "yaml" | "yml" => Ok(DocFormat::Yaml),
            "json" => Ok(DocFormat::Json),
            _ => {
                anyhow::bail!("Unsupported document file extension: {ext:?}");
            }
        }
    }

    /// Parse `content` into a JSON value. Empty content reads as an
    /// empty mapping so a new document can be edited from scratch.
    pub fn decode(self, content: &str) -> anyhow::Result<Value> {
        if content.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        let value = match self {
            DocFormat::Yaml => serde_yaml::from_str(content)?,
            DocFormat::Json => serde_json::from_str(content)?,
        };
        Ok(value)
    }

    /// Render `value` in this format.
    pub fn encode(self, value: &Value) -> anyhow::Result<String> {
        let s = match self {
            DocFormat::Yaml => serde_yaml::to_string(value)?,
            DocFormat::Json => serde_json::to_string_pretty(value)?,
        };
        Ok(s)
    }
}

/// Run the editing workflow for one document.
///
/// Loads the schema and the document (a missing document starts empty),
/// runs the UI, and returns the edited document when the user chose to
/// save changes. `None` means nothing should be written.
///
/// # Errors
///
/// Returns errors when the schema cannot be read or parsed, when either
/// file has an unsupported extension, or when the document does not
/// resolve against the schema.
pub async fn run(
    document: impl AsRef<Path>,
    schema: impl AsRef<Path>,
) -> anyhow::Result<Option<Value>> {
    let document = document.as_ref();
    let schema = schema.as_ref();
    let format = DocFormat::of(document)?;

    let schema_content = tokio::fs::read_to_string(schema)
        .await
        .with_context(|| format!("Failed to read schema {}", schema.display()))?;
    let schema_value = DocFormat::of(schema)?
        .decode(&schema_content)
        .with_context(|| format!("Failed to parse schema {}", schema.display()))?;

    let content = tokio::fs::read_to_string(document).await.unwrap_or_default();
    let doc_value = format
        .decode(&content)
        .with_context(|| format!("Failed to parse {}", document.display()))?;

    let name = document
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());

    run_with_values(&name, &schema_value, &doc_value)
}

/// Run the editor UI over parsed schema and document values.
///
/// This is the embedding entry point: callers that already hold both
/// values skip the file layer entirely. `name` labels the root page.
///
/// # Errors
///
/// Returns errors when the schema is malformed or the document does not
/// resolve against it.
pub fn run_with_values(
    name: &str,
    schema: &Value,
    document: &Value,
) -> anyhow::Result<Option<Value>> {
    let root = SchemaRoot::try_from(schema)?;
    root.check_document(document)?;

    let page = EditorPage::new(name, None, root.node, document)?;
    let stack = PageStack::new(page);

    #[cfg(feature = "logging")]
    {
        cursive::logger::init();
        cursive::logger::set_filter_levels_from_env();
    }
    // 创建Cursive应用
    let mut siv = Cursive::default();

    // 设置PageStack为user_data
    let layer = ui::top_layer(&stack);
    siv.set_user_data(stack);

    // 添加全局键盘事件处理
    siv.add_global_callback(Key::Esc, handle_back);
    siv.add_global_callback(Event::CtrlChar('n'), handle_add);
    siv.add_global_callback(Event::CtrlChar('x'), handle_exit);
    #[cfg(feature = "logging")]
    siv.add_global_callback('~', Cursive::toggle_debug_console);

    // 初始层为根文档页面
    siv.add_fullscreen_layer(layer);

    // 运行应用
    siv.run();

    let Some(stack) = siv.take_user_data::<PageStack>() else {
        return Ok(None);
    };
    match stack.exit_commit() {
        Some(true) if stack.needs_save => Ok(Some(stack.into_document())),
        _ => Ok(None),
    }
}

/// Write `value` to `path` in the format its extension names, keeping
/// the previous content in a timestamped backup next to it.
pub async fn save(path: impl AsRef<Path>, value: &Value) -> anyhow::Result<()> {
    let path = path.as_ref();
    let format = DocFormat::of(path)?;
    let content = format.encode(value)?;

    if path.exists() {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
        let bk = format!(
            "bk-{:?}.{ext}",
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)?
                .as_secs()
        );
        let backup_path = path.with_extension(bk);
        tokio::fs::copy(path, &backup_path)
            .await
            .with_context(|| format!("Failed to back up {}", path.display()))?;
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
