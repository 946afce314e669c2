use scraper::{ElementRef, Html};

/// Ancestor traversal bound for pathological trees.
const MAX_PATH_DEPTH: usize = 32;

/// Upper bound on reported element markup, in bytes.
const MAX_SNIPPET_LEN: usize = 300;

/// Build a stable identifying path for an element.
///
/// Walks parent links from the element upward. An ancestor whose `id`
/// attribute is unique in the document terminates the walk with an
/// id shortcut; otherwise each step contributes a `tag:nth-of-type(n)`
/// segment, with `n` only when same-tag siblings make it ambiguous.
/// The walk follows parent links only, so it cannot cycle; the depth
/// cap bounds degenerate nesting.
pub fn build_path(element: ElementRef<'_>, document: &Html) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut current = Some(element);

    while let Some(el) = current {
        if segments.len() >= MAX_PATH_DEPTH {
            break;
        }
        if let Some(id) = el.value().attr("id") {
            if !id.is_empty() && id_is_unique(id, document) {
                segments.push(format!("#{id}"));
                break;
            }
        }
        segments.push(segment_for(el));
        current = el.parent().and_then(ElementRef::wrap);
    }

    segments.reverse();
    segments.join(" > ")
}

/// Serialize an element's outer markup, truncated at a char boundary.
pub fn bounded_outer_html(element: ElementRef<'_>) -> String {
    let html = element.html();
    if html.len() <= MAX_SNIPPET_LEN {
        return html;
    }
    let mut end = MAX_SNIPPET_LEN;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    let mut truncated = html[..end].to_string();
    truncated.push('…');
    truncated
}

fn id_is_unique(id: &str, document: &Html) -> bool {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().attr("id") == Some(id))
        .count()
        == 1
}

fn segment_for(el: ElementRef<'_>) -> String {
    let tag = el.value().name();
    let before = el
        .prev_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sib| sib.value().name() == tag)
        .count();
    let after = el
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|sib| sib.value().name() == tag)
        .count();

    if before + after == 0 {
        tag.to_string()
    } else {
        format!("{tag}:nth-of-type({})", before + 1)
    }
}
