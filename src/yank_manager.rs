use anyhow::Result;
use arboard::Clipboard;
use tracing::debug;

/// Destination for copied text
pub trait ClipboardWriter {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// The system clipboard, opened lazily and kept for the session.
///
/// Some platforms drop clipboard contents when the owning handle goes away,
/// so the handle lives as long as the manager.
#[derive(Default)]
pub struct YankManager {
    clipboard: Option<Clipboard>,
}

impl YankManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardWriter for YankManager {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            clipboard.set_text(text)?;
        }
        debug!(target: "clipboard", "Copied {} characters", text.len());
        Ok(())
    }
}

/// In-memory clipboard for tests and headless sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
    pub fail: bool,
}

impl ClipboardWriter for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.fail {
            anyhow::bail!("clipboard unavailable");
        }
        self.contents = Some(text.to_string());
        Ok(())
    }
}
