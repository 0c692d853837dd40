use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use url::Url;

use crate::parser::Candidate;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// How repeated scrapes of the same page are merged into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DedupPolicy {
    /// Insert every candidate as a new article.
    #[default]
    Append,
    /// Refresh the existing article with the same fingerprint instead of inserting.
    Fingerprint,
}

/// Normalized identity of a candidate.
///
/// Links are resolved against `base`, fragments and a trailing `/` dropped;
/// `Url` already lowercases scheme and host. Candidates without a link fall
/// back to their whitespace-collapsed, lowercased title.
pub fn fingerprint(candidate: &Candidate, base: Option<&Url>) -> String {
    match candidate.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => format!("link:{}", normalize_link(link, base)),
        _ => format!("title:{}", normalize_title(&candidate.title)),
    }
}

fn normalize_link(link: &str, base: Option<&Url>) -> String {
    let resolved = match Url::parse(link) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => base.and_then(|b| b.join(link).ok()),
        Err(_) => None,
    };

    let Some(mut url) = resolved else {
        return link.to_string();
    };
    url.set_fragment(None);
    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        url.set_path(&trimmed);
    }
    url.to_string()
}

fn normalize_title(title: &str) -> String {
    WHITESPACE_RE
        .replace_all(title.trim(), " ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(title: &str, link: Option<&str>) -> Candidate {
        Candidate {
            title: title.to_string(),
            link: link.map(str::to_string),
        }
    }

    fn base() -> Url {
        Url::parse("http://www.worldsurfleague.com/").unwrap()
    }

    #[test]
    fn relative_and_absolute_links_agree() {
        let b = base();
        let rel = fingerprint(&candidate("a", Some("/posts/1")), Some(&b));
        let abs = fingerprint(
            &candidate("b", Some("HTTP://WWW.WorldSurfLeague.com/posts/1/#top")),
            Some(&b),
        );
        assert_eq!(rel, abs);
        assert_eq!(rel, "link:http://www.worldsurfleague.com/posts/1");
    }

    #[test]
    fn relative_link_without_base_is_kept_verbatim() {
        let fp = fingerprint(&candidate("a", Some("/posts/1")), None);
        assert_eq!(fp, "link:/posts/1");
    }

    #[test]
    fn title_fallback_collapses_whitespace_and_case() {
        let a = fingerprint(&candidate("Big   Wave\nAwards", None), None);
        let b = fingerprint(&candidate(" big wave awards ", Some("  ")), None);
        assert_eq!(a, b);
        assert_eq!(a, "title:big wave awards");
    }

    #[test]
    fn root_path_keeps_its_slash() {
        let fp = fingerprint(&candidate("", Some("https://example.com/")), None);
        assert_eq!(fp, "link:https://example.com/");
    }
}
