//! Gmail search query construction.
//!
//! Kept separate from the classifier keywords on purpose: the query narrows
//! what Gmail returns, the classifier decides what is shown.

use crate::config::QueryConfig;

/// Parts of the live-mode search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub label: String,
    pub categories: Vec<String>,
    pub terms: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl SearchQuery {
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            label: config.label.clone(),
            categories: config.categories.clone(),
            terms: config.terms.clone(),
            exclude: config.exclude.clone(),
        }
    }

    /// Render the query for messages newer than `period_days` days.
    ///
    /// Lists with several entries become `{a b}` (Gmail's OR group).
    pub fn build(&self, period_days: u32) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.label.trim().is_empty() {
            parts.push(format!("label:{}", self.label.trim()));
        }

        let categories: Vec<String> = self
            .categories
            .iter()
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("category:{}", c.trim()))
            .collect();
        if let Some(group) = any_of(&categories) {
            parts.push(group);
        }

        let terms: Vec<String> = self
            .terms
            .iter()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.trim().to_string())
            .collect();
        if let Some(group) = any_of(&terms) {
            parts.push(group);
        }

        for word in self.exclude.iter().filter(|w| !w.trim().is_empty()) {
            parts.push(format!("-{}", word.trim()));
        }

        parts.push(format!("newer_than:{period_days}d"));
        parts.join(" ")
    }
}

fn any_of(items: &[String]) -> Option<String> {
    match items {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(format!("{{{}}}", many.join(" "))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query() {
        assert_eq!(
            SearchQuery::default().build(14),
            "label:important {category:primary category:updates} {subject:refund subject:\"return\"} -Fwd newer_than:14d"
        );
    }

    #[test]
    fn test_single_items_and_blanks() {
        let query = SearchQuery {
            label: String::new(),
            categories: vec!["primary".to_string(), " ".to_string()],
            terms: vec!["refund".to_string()],
            exclude: Vec::new(),
        };
        assert_eq!(query.build(7), "category:primary refund newer_than:7d");
    }

    #[test]
    fn test_only_window() {
        let query = SearchQuery {
            label: String::new(),
            categories: Vec::new(),
            terms: Vec::new(),
            exclude: Vec::new(),
        };
        assert_eq!(query.build(30), "newer_than:30d");
    }
}
