//! View rendering collaborator
//!
//! Views are handlebars templates addressed with dot notation:
//! `views/blocks/hero.hbs` is the view `blocks.hero`.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use handlebars::Handlebars;
use include_dir::{include_dir, Dir};
use serde_json::Value;
use tracing::debug;

use crate::common::get_handlebars;

static DEFAULT_VIEWS: Dir = include_dir!("views");

pub const DEFAULT_LAYOUT: &str = "layouts.default";
pub const PAGE_BODY_VIEW: &str = "page-blocks.default";

pub trait ViewRenderer: Send + Sync {
    fn exists(&self, name: &str) -> bool;
    fn render(&self, name: &str, data: &Value) -> Result<String>;
}

pub struct HandlebarsViews {
    registry: Handlebars<'static>,
}

impl HandlebarsViews {
    /// Registry holding the embedded default views
    pub fn new() -> Result<Self> {
        let mut views = Self {
            registry: get_handlebars(),
        };
        views.register_embedded(&DEFAULT_VIEWS)?;
        Ok(views)
    }

    /// Register every `*.hbs` under `dir`, overriding embedded views of the same name
    pub fn with_directory(mut self, dir: &Path) -> Result<Self> {
        self.register_directory(dir, dir)?;
        Ok(self)
    }

    pub fn register(&mut self, name: &str, source: &str) -> Result<()> {
        self.registry
            .register_template_string(name, source)
            .with_context(|| format!("Failed to compile view '{}'", name))?;
        debug!("Registered view {}", name);
        Ok(())
    }

    fn register_embedded(&mut self, dir: &Dir) -> Result<()> {
        for file in dir.files() {
            let Some(name) = view_name(file.path()) else {
                continue;
            };
            let source = file
                .contents_utf8()
                .ok_or_else(|| anyhow!("View {:?} is not valid UTF-8", file.path()))?;
            self.register(&name, source)?;
        }
        for sub_dir in dir.dirs() {
            self.register_embedded(sub_dir)?;
        }
        Ok(())
    }

    fn register_directory(&mut self, root: &Path, dir: &Path) -> Result<()> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read views directory {:?}", dir))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                self.register_directory(root, &path)?;
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let Some(name) = view_name(relative) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read view {:?}", path))?;
            self.register(&name, &source)?;
        }
        Ok(())
    }
}

impl ViewRenderer for HandlebarsViews {
    fn exists(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    fn render(&self, name: &str, data: &Value) -> Result<String> {
        self.registry
            .render(name, data)
            .with_context(|| format!("Failed to render view '{}'", name))
    }
}

fn view_name(relative: &Path) -> Option<String> {
    if relative.extension().and_then(|e| e.to_str()) != Some("hbs") {
        return None;
    }
    let stem = relative.with_extension("");
    let parts: Vec<String> = stem
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("."))
    }
}
