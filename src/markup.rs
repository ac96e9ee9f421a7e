//! Embedded markup compiler for block content
//!
//! String values stored on a block may contain short-codes such as
//! `[button href="/contact" label="Get in touch"]`. They are expanded to
//! HTML at render time; unknown short-codes pass through untouched.

use std::collections::HashMap;

use chrono::{Datelike, Utc};
use handlebars::html_escape;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SHORTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[([a-zA-Z][\w-]*)((?:\s+[a-zA-Z][\w-]*="[^"]*")*)\s*\]"#)
        .expect("valid shortcode pattern")
});

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([a-zA-Z][\w-]*)="([^"]*)""#).expect("valid attribute pattern"));

pub trait MarkupCompiler: Send + Sync {
    fn compile(&self, source: &str) -> String;
}

pub type ShortcodeAttributes = IndexMap<String, String>;
type ShortcodeHandler = Box<dyn Fn(&ShortcodeAttributes) -> String + Send + Sync>;

pub struct ShortcodeCompiler {
    handlers: HashMap<String, ShortcodeHandler>,
}

impl ShortcodeCompiler {
    /// Compiler with no short-codes registered
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Compiler with the built-in `year`, `email` and `button` short-codes
    pub fn with_defaults() -> Self {
        let mut compiler = Self::empty();
        compiler.register("year", |_| Utc::now().year().to_string());
        compiler.register("email", |attrs| {
            let address = attrs.get("address").map(String::as_str).unwrap_or_default();
            let text = attrs.get("text").map(String::as_str).unwrap_or(address);
            format!(
                r#"<a href="mailto:{}">{}</a>"#,
                html_escape(address),
                html_escape(text)
            )
        });
        compiler.register("button", |attrs| {
            let href = attrs.get("href").map(String::as_str).unwrap_or("#");
            let label = attrs.get("label").map(String::as_str).unwrap_or_default();
            format!(
                r#"<a class="button" href="{}">{}</a>"#,
                html_escape(href),
                html_escape(label)
            )
        });
        compiler
    }

    pub fn register<F>(&mut self, name: &str, handler: F)
    where
        F: Fn(&ShortcodeAttributes) -> String + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
    }
}

impl Default for ShortcodeCompiler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MarkupCompiler for ShortcodeCompiler {
    fn compile(&self, source: &str) -> String {
        if !source.contains('[') {
            return source.to_string();
        }
        SHORTCODE
            .replace_all(source, |caps: &Captures| {
                let Some(handler) = self.handlers.get(&caps[1]) else {
                    return caps[0].to_string();
                };
                let attrs: ShortcodeAttributes = caps
                    .get(2)
                    .map(|raw| {
                        ATTRIBUTE
                            .captures_iter(raw.as_str())
                            .map(|attr| (attr[1].to_string(), attr[2].to_string()))
                            .collect()
                    })
                    .unwrap_or_default();
                handler(&attrs)
            })
            .into_owned()
    }
}
