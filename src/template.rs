//! Tera-backed email template rendering.

use std::collections::HashMap;

use tera::Tera;

use crate::error::MailError;

pub use tera::Context;

/// Template engine for email bodies.
///
/// Templates are named files; the convention is `<base>.html` for the HTML
/// part and an optional `<base>.txt` sibling for the plain text part.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load every `.html` and `.txt` template under `template_dir`.
    pub fn from_dir(template_dir: &str) -> Result<Self, MailError> {
        let pattern = format!("{template_dir}/**/*.{{html,txt}}");
        let tera = Tera::new(&pattern)
            .map_err(|e| MailError::Template(format!("failed to load templates: {e}")))?;

        tracing::debug!(template_dir, "email templates loaded");

        Ok(Self { tera })
    }

    /// Build an engine from in-memory template strings (used in tests and
    /// embedded setups).
    pub fn from_strings(templates: HashMap<String, String>) -> Result<Self, MailError> {
        let mut tera = Tera::default();

        for (name, content) in templates {
            tera.add_raw_template(&name, &content)
                .map_err(|e| MailError::Template(format!("failed to add template {name}: {e}")))?;
        }

        Ok(Self { tera })
    }

    /// Render a single template by full name.
    pub fn render(&self, name: &str, context: &Context) -> Result<String, MailError> {
        self.tera
            .render(name, context)
            .map_err(|e| MailError::Template(format!("failed to render {name}: {e}")))
    }

    /// Render `<base>.html` plus `<base>.txt` when the text sibling exists.
    pub fn render_pair(
        &self,
        base: &str,
        context: &Context,
    ) -> Result<(String, Option<String>), MailError> {
        let html = self.render(&format!("{base}.html"), context)?;

        let text_name = format!("{base}.txt");
        let text = if self.has_template(&text_name) {
            Some(self.render(&text_name, context)?)
        } else {
            None
        };

        Ok((html, text))
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(pairs: &[(&str, &str)]) -> TemplateEngine {
        let templates = pairs
            .iter()
            .map(|(name, content)| (name.to_string(), content.to_string()))
            .collect();
        TemplateEngine::from_strings(templates).unwrap()
    }

    #[test]
    fn renders_with_context() {
        let engine = engine(&[("welcome.html", "<h1>Hello {{ name }}!</h1>")]);

        let mut context = Context::new();
        context.insert("name", "World");

        let html = engine.render("welcome.html", &context).unwrap();
        assert_eq!(html, "<h1>Hello World!</h1>");
    }

    #[test]
    fn render_pair_includes_text_sibling_when_present() {
        let engine = engine(&[
            ("welcome.html", "<p>Hi {{ name }}</p>"),
            ("welcome.txt", "Hi {{ name }}"),
        ]);

        let mut context = Context::new();
        context.insert("name", "Ada");

        let (html, text) = engine.render_pair("welcome", &context).unwrap();
        assert_eq!(html, "<p>Hi Ada</p>");
        assert_eq!(text.as_deref(), Some("Hi Ada"));
    }

    #[test]
    fn render_pair_tolerates_missing_text_sibling() {
        let engine = engine(&[("welcome.html", "<p>Hi</p>")]);

        let (html, text) = engine.render_pair("welcome", &Context::new()).unwrap();
        assert_eq!(html, "<p>Hi</p>");
        assert!(text.is_none());
    }

    #[test]
    fn missing_template_errors() {
        let engine = engine(&[]);
        let result = engine.render("absent.html", &Context::new());
        assert!(matches!(result, Err(MailError::Template(_))));
    }
}
