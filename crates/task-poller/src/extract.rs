//! Text-pattern extraction of task data from assignment emails.
//!
//! Labels and id prefixes come from configuration and are matched as
//! literals. Nothing here fails on missing text: an absent id is `None`,
//! absent fields fall back to empty strings or the default priority.

use crate::config::ExtractConfig;
use regex::{Regex, RegexBuilder};

/// Finds task ids such as `INC123` in a subject line.
///
/// Every prefix is paired with its own digit run, so `INC|WO|TAS` compiles to
/// `INC[0-9]+|WO[0-9]+|TAS[0-9]+` and a bare prefix never matches.
#[derive(Debug, Clone)]
pub struct IdMatcher {
    regex: Option<Regex>,
}

impl IdMatcher {
    pub fn new(prefixes: &[String]) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = prefixes
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| format!("{}[0-9]+", regex::escape(p)))
            .collect();

        if alternatives.is_empty() {
            return Ok(Self { regex: None });
        }

        let regex = RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
            .case_insensitive(true)
            .build()?;

        Ok(Self { regex: Some(regex) })
    }

    /// First id in the subject, uppercased and trimmed
    pub fn find(&self, subject: &str) -> Option<String> {
        self.regex
            .as_ref()?
            .find(subject)
            .map(|m| m.as_str().trim().to_uppercase())
    }
}

/// Title, comment and priority pulled from a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub comment: String,
    pub priority: String,
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    title: Regex,
    comment_until_dash: Regex,
    comment_rest: Regex,
    priority: Regex,
    default_priority: String,
}

impl FieldExtractor {
    pub fn new(labels: &ExtractConfig, default_priority: &str) -> Result<Self, regex::Error> {
        let title = regex::escape(&labels.title_label);
        let comment = regex::escape(&labels.comment_label);
        let priority = regex::escape(&labels.priority_label);

        Ok(Self {
            title: Regex::new(&format!(r"(?i){}([^\r\n]*)", title))?,
            comment_until_dash: Regex::new(&format!(r"(?is){}\s*(.*?)\s*-", comment))?,
            comment_rest: Regex::new(&format!(r"(?is){}\s*(.*)", comment))?,
            priority: Regex::new(&format!(r"(?i){}\s*(high|medium|low)", priority))?,
            default_priority: default_priority.to_string(),
        })
    }

    pub fn extract(&self, body: &str) -> ExtractedFields {
        ExtractedFields {
            title: self.title(body),
            comment: self.comment(body),
            priority: self.priority(body),
        }
    }

    /// Rest of the line after the title label
    pub fn title(&self, body: &str) -> String {
        first_group(&self.title, body)
            .map(|t| t.trim().to_string())
            .unwrap_or_default()
    }

    /// Text after the comment label up to the next `-`, or everything after
    /// the label when there is no dash (or nothing before it). The label
    /// matches in any case.
    pub fn comment(&self, body: &str) -> String {
        first_group(&self.comment_until_dash, body)
            .filter(|c| !c.is_empty())
            .or_else(|| first_group(&self.comment_rest, body))
            .map(|c| c.trim().to_string())
            .unwrap_or_default()
    }

    /// `High`, `Medium` or `Low` after the priority label, else the default
    pub fn priority(&self, body: &str) -> String {
        first_group(&self.priority, body)
            .map(capitalize)
            .unwrap_or_else(|| self.default_priority.clone())
    }
}

fn first_group<'a>(regex: &Regex, text: &'a str) -> Option<&'a str> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn capitalize(word: &str) -> String {
    let lower = word.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
