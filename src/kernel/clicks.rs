//! Click classification.
//!
//! The page delivers one [`ClickedElement`] per click: the element the click
//! originated on plus its ancestor chain. [`match_click`] decides which reports
//! that click produces, walking the chain nearest-first the way a delegated
//! document-level listener would. CTA and outbound checks are independent, so
//! a CTA-styled link to another host yields both.

use super::event::EventData;
use reqwest::Url;
use std::collections::BTreeMap;

/// Longest visible text carried in a click report, in characters.
pub const TEXT_LIMIT: usize = 50;

pub const TRACK_ATTR: &str = "data-track";
pub const TRACK_CATEGORY_ATTR: &str = "data-track-category";
pub const DEFAULT_CATEGORY: &str = "cta";

const CTA_CLASSES: [&str; 3] = ["btn", "button", "cta"];
const CTA_CLASS_PREFIXES: [&str; 2] = ["btn-", "cta-"];

/// One element in a click's chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    fn has_class(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.get("class")
            .map(|classes| classes.split_whitespace().any(pred))
            .unwrap_or(false)
    }

    fn is_cta(&self) -> bool {
        if self.attributes.contains_key(TRACK_ATTR) {
            return true;
        }
        let styled = self.has_class(|c| {
            CTA_CLASSES.contains(&c) || CTA_CLASS_PREFIXES.iter().any(|p| c.starts_with(p))
        });
        if styled {
            return true;
        }
        if self.is("a") && self.get("href").is_some_and(|href| href.contains("contact")) {
            return true;
        }
        (self.is("button") || self.is("input"))
            && self
                .get("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("submit"))
    }

    fn is_link(&self) -> bool {
        self.is("a") && self.attributes.contains_key("href")
    }
}

/// Synthetic description of the element a click landed on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickedElement {
    pub target: ElementNode,
    /// Nearest parent first.
    pub ancestors: Vec<ElementNode>,
}

impl ClickedElement {
    pub fn new(target: ElementNode) -> Self {
        Self {
            target,
            ancestors: Vec::new(),
        }
    }

    pub fn within(mut self, ancestor: ElementNode) -> Self {
        self.ancestors.push(ancestor);
        self
    }

    pub fn chain(&self) -> impl Iterator<Item = &ElementNode> {
        std::iter::once(&self.target).chain(self.ancestors.iter())
    }

    fn closest(&self, pred: impl Fn(&ElementNode) -> bool) -> Option<&ElementNode> {
        self.chain().find(|node| pred(*node))
    }
}

/// Which reports a click produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClickMatch {
    pub cta: Option<EventData>,
    pub outbound: Option<EventData>,
}

impl ClickMatch {
    pub fn is_empty(&self) -> bool {
        self.cta.is_none() && self.outbound.is_none()
    }

    pub fn into_events(self) -> Vec<EventData> {
        self.cta.into_iter().chain(self.outbound).collect()
    }
}

pub fn match_click(element: &ClickedElement, page: &Url) -> ClickMatch {
    let cta = element.closest(ElementNode::is_cta).map(|node| EventData::CtaClick {
        text: node
            .get(TRACK_ATTR)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| truncate_text(&node.text)),
        category: node
            .get(TRACK_CATEGORY_ATTR)
            .filter(|category| !category.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string(),
        href: node
            .get("href")
            .filter(|_| node.is("a"))
            .and_then(|href| page.join(href).ok())
            .map(|url| url.to_string()),
    });

    let outbound = element.closest(ElementNode::is_link).and_then(|link| {
        let target = page.join(link.get("href")?).ok()?;
        if !matches!(target.scheme(), "http" | "https") {
            return None;
        }
        if target.host_str() == page.host_str() {
            return None;
        }
        Some(EventData::OutboundClick {
            url: target.to_string(),
            text: truncate_text(&link.text),
        })
    });

    ClickMatch { cta, outbound }
}

/// Trimmed visible text, cut to [`TEXT_LIMIT`] characters.
pub fn truncate_text(text: &str) -> String {
    text.trim().chars().take(TEXT_LIMIT).collect()
}
