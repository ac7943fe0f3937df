//! `Link` header pagination.

/// Extract the `rel="next"` target from a `Link` header value.
///
/// ```text
/// <https://api.github.com/orgs/acme/repos?page=2>; rel="next", <...>; rel="last"
/// ```
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|part| {
        let mut pieces = part.split(';');
        let target = pieces.next()?.trim();
        let is_next = pieces.any(|p| {
            let p = p.trim();
            p == "rel=\"next\"" || p == "rel=next"
        });
        if !is_next {
            return None;
        }
        target
            .strip_prefix('<')
            .and_then(|t| t.strip_suffix('>'))
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_among_several_relations() {
        let header = r#"<https://api.github.com/orgs/acme/repos?page=1>; rel="prev", <https://api.github.com/orgs/acme/repos?page=3>; rel="next", <https://api.github.com/orgs/acme/repos?page=9>; rel="last""#;
        assert_eq!(
            next_link(header).as_deref(),
            Some("https://api.github.com/orgs/acme/repos?page=3")
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let header = r#"<https://api.github.com/orgs/acme/repos?page=1>; rel="first""#;
        assert_eq!(next_link(header), None);
    }

    #[test]
    fn test_garbage_header() {
        assert_eq!(next_link("not a link"), None);
        assert_eq!(next_link(""), None);
    }
}
