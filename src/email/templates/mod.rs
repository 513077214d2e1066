//! Email template system
//!
//! Templates are Jinja-style documents looked up by file name (`welcome.txt`,
//! `welcome.html`) and rendered with a JSON data value. Files ending in
//! `.html` are HTML-escaped automatically. Shared fragments are pulled in with
//! `{% include "partials/footer.html" %}` and layouts with `{% extends %}`.

use crate::error::{MailError, Result};
use minijinja::{Environment, ErrorKind};
use serde_json::{Map, Value};
use std::io;
use std::path::Path;

/// Named set of templates backed by a minijinja environment
#[derive(Debug, Clone)]
pub struct TemplateSet {
    env: Environment<'static>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateSet {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Serve templates from `dir`, loading each file on first use.
    ///
    /// Names are paths relative to `dir`, so partials live under e.g.
    /// `partials/footer.html`.
    pub fn from_dir(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("template directory {} does not exist", dir.display()),
            ));
        }

        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        tracing::debug!("Serving email templates from {}", dir.display());

        Ok(Self { env })
    }

    /// Add a template under its full file name (e.g., `welcome.html`)
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) -> Result<&mut Self> {
        self.env.add_template_owned(name.into(), body.into())?;
        Ok(self)
    }

    /// Render a single template file
    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => MailError::TemplateNotFound(name.to_string()),
            _ => MailError::Template(e),
        })?;

        let rendered = match data {
            Value::Object(_) => template.render(data)?,
            _ => template.render(Map::new())?,
        };
        Ok(rendered)
    }

    /// Render both the text and html variants of `name` (given without extension)
    pub fn render_email(&self, name: &str, data: &Value) -> Result<RenderedEmail> {
        Ok(RenderedEmail {
            text_body: self.render(&format!("{}.txt", name), data)?,
            html_body: self.render(&format!("{}.html", name), data)?,
        })
    }
}

/// Rendered email bodies with all variables substituted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub text_body: String,
    pub html_body: String,
}
