use select::node::Node;
use select::predicate::Predicate;
use serde::{Deserialize, Serialize};

/// Structured CSS selector used to locate dashboard elements in a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args")]
pub enum CssSelector {
    /// Matches an HTML tag name (e.g., "option")
    Tag(String),

    /// Matches one CSS class among the element's classes
    Class(String),

    /// Matches an attribute existence or specific value
    Attribute { key: String, value: Option<String> },

    /// Matches if ALL sub-selectors match
    And(Vec<CssSelector>),

    /// Matches if the inner selector does not
    Not(Box<CssSelector>),
}

impl CssSelector {
    pub fn tag(tag: &str) -> Self {
        CssSelector::Tag(tag.to_string())
    }

    pub fn class(class: &str) -> Self {
        CssSelector::Class(class.to_string())
    }

    pub fn attr(key: &str) -> Self {
        CssSelector::Attribute {
            key: key.to_string(),
            value: None,
        }
    }

    pub fn attr_eq(key: &str, value: &str) -> Self {
        CssSelector::Attribute {
            key: key.to_string(),
            value: Some(value.to_string()),
        }
    }

    pub fn and(self, other: CssSelector) -> Self {
        match self {
            CssSelector::And(mut selectors) => {
                selectors.push(other);
                CssSelector::And(selectors)
            }
            first => CssSelector::And(vec![first, other]),
        }
    }

    pub fn not(self) -> Self {
        CssSelector::Not(Box::new(self))
    }

    /// Standard CSS text for the selector, used in log and error messages.
    pub fn to_css_string(&self) -> String {
        match self {
            CssSelector::Tag(tag) => tag.clone(),
            CssSelector::Class(cls) => format!(".{}", cls),
            CssSelector::Attribute { key, value } => match value {
                Some(v) => format!("[{}='{}']", key, v),
                None => format!("[{}]", key),
            },
            CssSelector::And(selectors) => selectors
                .iter()
                .map(|s| s.to_css_string())
                .collect::<Vec<_>>()
                .join(""),
            CssSelector::Not(inner) => format!(":not({})", inner.to_css_string()),
        }
    }
}

impl Predicate for CssSelector {
    fn matches(&self, node: &Node) -> bool {
        match self {
            CssSelector::Tag(tag) => node.name() == Some(tag.as_str()),
            CssSelector::Class(cls) => node
                .attr("class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == cls)),
            CssSelector::Attribute { key, value } => match value {
                Some(v) => node.attr(key.as_str()) == Some(v.as_str()),
                None => node.attr(key.as_str()).is_some(),
            },
            CssSelector::And(selectors) => selectors.iter().all(|s| s.matches(node)),
            CssSelector::Not(inner) => node.name().is_some() && !inner.matches(node),
        }
    }
}

impl<'a> Predicate for &'a CssSelector {
    fn matches(&self, node: &Node) -> bool {
        (*self).matches(node)
    }
}
