//! RFC 5988-style `Link` header parsing for pagination.

/// Continuation URLs extracted from a `Link` response header.
///
/// `next` is the opaque continuation token for the pager; `None` denotes the
/// terminal page. The URLs are not interpreted beyond equality checks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkRelations {
    /// URL of the next page (from `rel="next"`).
    pub next: Option<String>,
    /// URL of the last page (from `rel="last"`).
    pub last: Option<String>,
}

/// Parse a `Link` header into its pagination relations.
///
/// GitHub Link headers look like:
/// `<https://api.github.com/repositories/1/issues?page=2>; rel="next", <...&page=5>; rel="last"`
#[must_use]
pub fn parse_link_header(link_header: &str) -> LinkRelations {
    let mut relations = LinkRelations::default();

    for part in link_header.split(',') {
        let part = part.trim();

        let mut url = None;
        let mut rel = None;

        for segment in part.split(';') {
            let segment = segment.trim();
            if segment.starts_with('<') && segment.ends_with('>') {
                url = Some(&segment[1..segment.len() - 1]);
            } else if let Some(rel_value) = segment.strip_prefix("rel=") {
                rel = Some(rel_value.trim_matches('"'));
            }
        }

        if let (Some(url), Some(rel_type)) = (url, rel) {
            match rel_type {
                "next" => relations.next = Some(url.to_string()),
                "last" => relations.last = Some(url.to_string()),
                _ => {}
            }
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_next_and_last_relations() {
        let header = "<https://api.github.com/repos/o/r/issues?page=2>; rel=\"next\", \
                      <https://api.github.com/repos/o/r/issues?page=5>; rel=\"last\"";
        let relations = parse_link_header(header);

        assert_eq!(
            relations.next.as_deref(),
            Some("https://api.github.com/repos/o/r/issues?page=2")
        );
        assert_eq!(
            relations.last.as_deref(),
            Some("https://api.github.com/repos/o/r/issues?page=5")
        );
    }

    #[test]
    fn missing_next_means_terminal_page() {
        let header = "<https://api.github.com/repos/o/r/issues?page=1>; rel=\"prev\", \
                      <https://api.github.com/repos/o/r/issues?page=1>; rel=\"first\"";
        let relations = parse_link_header(header);
        assert_eq!(relations.next, None);
        assert_eq!(relations.last, None);
    }

    #[test]
    fn tolerates_unquoted_rel_and_extra_whitespace() {
        let header = " <https://api.github.com/x?page=3> ;  rel=next ";
        let relations = parse_link_header(header);
        assert_eq!(relations.next.as_deref(), Some("https://api.github.com/x?page=3"));
    }

    #[test]
    fn ignores_malformed_parts() {
        let header = "garbage, <https://api.github.com/x?page=2>; rel=\"next\", ; rel=\"last\"";
        let relations = parse_link_header(header);
        assert_eq!(relations.next.as_deref(), Some("https://api.github.com/x?page=2"));
        assert_eq!(relations.last, None);
    }

    #[test]
    fn empty_header_yields_no_relations() {
        assert_eq!(parse_link_header(""), LinkRelations::default());
    }
}
