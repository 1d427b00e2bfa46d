use crate::error::{PainterError, Result};
use crate::scene::Item;
use image::RgbaImage;
use serde_json::Value;
use std::cell::RefCell;
use std::path::PathBuf;

/// Host-supplied resource access: image decoding for image marks and link
/// sanitising for `href` events.
pub trait ResourceLoader {
    fn load_image(&self, url: &str) -> Result<RgbaImage>;

    /// Returns the URL to open, or `None` to drop the link.
    fn sanitize(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.to_ascii_lowercase().starts_with("javascript:") {
            None
        } else {
            Some(href.to_string())
        }
    }

    /// Called with a sanitised link when an item with `href` is clicked.
    fn open_href(&self, _href: &str) {}
}

/// Reads images from the local filesystem relative to `base`.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    base: PathBuf,
    opened: RefCell<Vec<String>>,
}

impl FileLoader {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base: base.into(),
            opened: RefCell::new(Vec::new()),
        }
    }

    /// Links handed to `open_href`, oldest first.
    pub fn opened(&self) -> Vec<String> {
        self.opened.borrow().clone()
    }
}

impl ResourceLoader for FileLoader {
    fn load_image(&self, url: &str) -> Result<RgbaImage> {
        let url = url.strip_prefix("file://").unwrap_or(url);
        let path = self.base.join(url);
        let img = image::ImageReader::open(&path)
            .map_err(|e| PainterError::Image(format!("{}: {}", path.display(), e)))?
            .decode()
            .map_err(|e| PainterError::Image(format!("{}: {}", path.display(), e)))?;
        Ok(img.to_rgba8())
    }

    fn open_href(&self, href: &str) {
        log::info!("open link {}", href);
        self.opened.borrow_mut().push(href.to_string());
    }
}

/// Receives tooltip show/hide requests from the handler.
pub trait TooltipHandler {
    fn tooltip(&self, item: Option<&Item>, value: Option<&Value>, show: bool);
}

/// Records the latest tooltip state, enough for headless hosts and tests.
#[derive(Debug, Default)]
pub struct TooltipRecorder {
    pub current: RefCell<Option<String>>,
    pub calls: RefCell<usize>,
}

impl TooltipHandler for TooltipRecorder {
    fn tooltip(&self, _item: Option<&Item>, value: Option<&Value>, show: bool) {
        *self.calls.borrow_mut() += 1;
        *self.current.borrow_mut() = match (show, value) {
            (true, Some(Value::String(s))) => Some(s.clone()),
            (true, Some(v)) => Some(v.to_string()),
            _ => None,
        };
    }
}
