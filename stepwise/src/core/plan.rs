//! Extraction of plan steps from delimited oracle output.

use anyhow::{Context, Result, anyhow};
use regex::Regex;

use crate::core::types::Plan;

pub const DEFAULT_STEP_TAG: &str = "step";

/// Matches `<tag>...</tag>` segments for a configurable tag name.
#[derive(Debug, Clone)]
pub struct StepExtractor {
    tag: String,
    pattern: Regex,
}

impl StepExtractor {
    pub fn new(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() || tag.chars().any(|c| c.is_whitespace() || c == '<' || c == '>') {
            return Err(anyhow!("step tag must be a bare tag name (got '{tag}')"));
        }
        let escaped = regex::escape(tag);
        let pattern = Regex::new(&format!(r"(?s)<{escaped}>(.*?)</{escaped}>"))
            .with_context(|| format!("compile step pattern for <{tag}>"))?;
        Ok(Self {
            tag: tag.to_string(),
            pattern,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Every delimited segment in document order, trimmed. Unterminated
    /// segments are ignored; zero matches yields an empty plan.
    pub fn extract(&self, response: &str) -> Plan {
        Plan::from_descriptions(
            self.pattern
                .captures_iter(response)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptions(plan: &Plan) -> Vec<&str> {
        plan.steps().iter().map(|s| s.description.as_str()).collect()
    }

    #[test]
    fn extracts_steps_in_document_order() {
        let extractor = StepExtractor::new(DEFAULT_STEP_TAG).expect("extractor");
        let plan = extractor.extract(
            "Here is the plan:\n<step> Open codey.py </step>\n<step>Rewrite the loop</step>",
        );
        assert_eq!(descriptions(&plan), vec!["Open codey.py", "Rewrite the loop"]);
    }

    #[test]
    fn steps_may_span_lines() {
        let extractor = StepExtractor::new("step").expect("extractor");
        let plan = extractor.extract("<step>Write\nthe file</step>");
        assert_eq!(descriptions(&plan), vec!["Write\nthe file"]);
    }

    #[test]
    fn missing_delimiters_yield_empty_plan() {
        let extractor = StepExtractor::new("step").expect("extractor");
        assert!(extractor.extract("1. do this\n2. do that").is_empty());
        assert!(extractor.extract("<step>never closed").is_empty());
    }

    #[test]
    fn custom_tag_ignores_other_tags() {
        let extractor = StepExtractor::new("li").expect("extractor");
        let plan = extractor.extract("<ul><li>one</li><step>no</step><li>two</li></ul>");
        assert_eq!(descriptions(&plan), vec!["one", "two"]);
        assert_eq!(extractor.tag(), "li");
    }

    #[test]
    fn rejects_tag_with_brackets() {
        let err = StepExtractor::new("<step>").unwrap_err();
        assert!(err.to_string().contains("bare tag name"));
    }
}
