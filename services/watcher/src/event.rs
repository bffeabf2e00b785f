//! Push-event extraction from journal lines.
//!
//! The registry's access log records a manifest push as a request line of
//! the form:
//!
//! ```text
//! ... "PUT /v2/<repository>/manifests/<tag> HTTP/1.1" 201 ...
//! ```
//!
//! A line is actionable iff it contains `PUT /v2/` followed by a
//! single-segment repository name, the literal `manifests/`, and a
//! non-empty tag. Repository and tag never contain `/` or whitespace;
//! anything else on the line is ignored. Parsing is kept free of any
//! stream handling so the accept/reject table below covers it entirely.

/// A pushed image, extracted from one journal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub repository: String,
    pub tag: String,
}

/// Extract the pushed `(repository, tag)` from a journal line, if any.
pub fn extract_push_event(line: &str) -> Option<PushEvent> {
    const MARKER: &str = "PUT /v2/";

    let rest = &line[line.find(MARKER)? + MARKER.len()..];

    let (repository, rest) = rest.split_once('/')?;
    if repository.is_empty() || repository.contains(char::is_whitespace) {
        return None;
    }

    let rest = rest.strip_prefix("manifests/")?;
    let tag: String = rest
        .chars()
        .take_while(|c| *c != '/' && !c.is_whitespace())
        .collect();
    if tag.is_empty() {
        return None;
    }

    Some(PushEvent {
        repository: repository.to_string(),
        tag,
    })
}
