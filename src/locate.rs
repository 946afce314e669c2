use std::borrow::Cow;

use log::warn;
use scraper::{ElementRef, Html, Selector};

use crate::error::{ErrorLog, ErrorRecord};
use crate::session::{Deadline, DeadlineExceeded};

/// Bounded stand-in for wildcard selectors.
///
/// Matching literally every element is O(n) over the whole tree, so `*`
/// is narrowed to the tags that carry visible text and are worth
/// checking element-by-element.
const WILDCARD_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "span", "a", "label", "button",
    "caption", "figcaption",
];

/// Resolve a rule's target elements within the context subtree.
///
/// - An empty selector targets the context root itself.
/// - A selector naming the document's root tag resolves against the
///   document root, not the context root.
/// - Selector syntax failures are recorded as `selector_error` for the
///   owning rule and yield an empty list; they never propagate.
pub(crate) fn locate<'a>(
    selector: &str,
    context: ElementRef<'a>,
    document: &'a Html,
    rule_id: &str,
    errors: &ErrorLog,
    deadline: Deadline,
) -> Result<Vec<ElementRef<'a>>, DeadlineExceeded> {
    if deadline.expired() {
        return Err(DeadlineExceeded);
    }

    let selector = selector.trim();
    if selector.is_empty() {
        return Ok(vec![context]);
    }

    let document_root = document.root_element();
    if selector == document_root.value().name() {
        return Ok(vec![document_root]);
    }

    let source: Cow<'_, str> = if selector == "*" {
        Cow::Owned(WILDCARD_TAGS.join(", "))
    } else {
        Cow::Borrowed(selector)
    };

    // The parse error borrows `source`; own it before matching.
    let parsed = Selector::parse(&source).map_err(|err| err.to_string());
    match parsed {
        Ok(parsed) => Ok(context.select(&parsed).collect()),
        Err(err) => {
            warn!("rule '{rule_id}': selector '{selector}' failed to parse: {err}");
            errors.push(ErrorRecord::selector_error(
                rule_id,
                format!("selector '{selector}' failed to parse: {err}"),
            ));
            Ok(Vec::new())
        }
    }
}
