//! `{{ name }}` placeholder templates for command arguments.
//!
//! The grammar is literal text plus placeholders. Inside the braces,
//! surrounding whitespace and one leading dot are ignored, so `{{tmpDir}}`,
//! `{{ tmpDir }}` and `{{.tmpDir}}` are the same reference. There is no
//! escaping and no expression syntax.

use super::vars::Variables;
use crate::error::{BenchError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// Parsed template, ready to render against a [`Variables`] snapshot
///
/// # Example
///
/// ```
/// use indexbench_core::orchestrator::{Template, Variables};
///
/// let template = Template::parse("{{tmpDir}}/run-{{ .runNumber }}").unwrap();
/// let mut vars = Variables::default();
/// vars.set("tmpDir", "/tmp/x");
/// vars.set("runNumber", "2");
/// assert_eq!(template.render(&vars).unwrap(), "/tmp/x/run-2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let inside = &rest[open + 2..];
            let close = inside.find("}}").ok_or_else(|| {
                BenchError::template(
                    source,
                    format!(
                        "unterminated '{{{{' at byte {}",
                        source.len() - rest.len() + open
                    ),
                )
            })?;

            let raw = inside[..close].trim();
            let name = raw.strip_prefix('.').unwrap_or(raw).trim();
            if !is_identifier(name) {
                return Err(BenchError::template(
                    source,
                    format!("invalid variable name '{}'", raw),
                ));
            }
            segments.push(Segment::Variable(name.to_string()));
            rest = &inside[close + 2..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Names referenced, in order of appearance
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute every placeholder; an unknown name is an error
    pub fn render(&self, vars: &Variables) -> Result<String> {
        let mut output = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Variable(name) => {
                    let value = vars.get(name).ok_or_else(|| {
                        BenchError::template(&self.source, format!("undefined variable '{}'", name))
                    })?;
                    output.push_str(value);
                }
            }
        }
        Ok(output)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
