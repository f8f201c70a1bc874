//! 按域名把条目分派给 agent
//!
//! host 等于允许域名，或以 ".域名" 结尾才算匹配（foo.example.com 匹配 example.com，fooexample.com 不匹配）。
//! 同一条目可同时分派给多个 agent。

use url::{Host, Url};

use crate::feed::FeedEntry;

/// 返回链接 host 属于 domains 之一的条目，保持原顺序
pub fn filter_by_domains<S: AsRef<str>>(entries: &[FeedEntry], domains: &[S]) -> Vec<FeedEntry> {
    let domains: Vec<String> = domains
        .iter()
        .map(|d| normalize_domain(d.as_ref()))
        .filter(|d| !d.is_empty())
        .collect();

    entries
        .iter()
        .filter(|e| match hostname(&e.link) {
            Some(host) => domains.iter().any(|d| host_matches(&host, d)),
            None => false,
        })
        .cloned()
        .collect()
}

/// 按标签边界做后缀匹配；两侧都应已小写
pub fn host_matches(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }
    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

fn hostname(link: &str) -> Option<String> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?.trim_end_matches('.').to_lowercase();
    (!host.is_empty()).then_some(host)
}

/// 去掉首尾的点并转成 ASCII（IDNA punycode）小写形式，与 Url::host_str 的输出对齐
fn normalize_domain(domain: &str) -> String {
    let trimmed = domain.trim().trim_start_matches('.').trim_end_matches('.');
    match Host::parse(trimmed) {
        Ok(host) => host.to_string().to_lowercase(),
        Err(_) => trimmed.to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(link: &str) -> FeedEntry {
        FeedEntry {
            title: "t".to_string(),
            link: link.to_string(),
            published_at: None,
        }
    }

    #[test]
    fn test_host_matches_on_label_boundary() {
        assert!(host_matches("example.com", "example.com"));
        assert!(host_matches("blog.example.com", "example.com"));
        assert!(host_matches("a.b.example.com", "example.com"));
        assert!(!host_matches("fakeexample.com", "example.com"));
        assert!(!host_matches("example.com.evil.net", "example.com"));
        assert!(!host_matches("com", "example.com"));
    }

    #[test]
    fn test_filter_preserves_order_and_case_insensitive() {
        let entries = vec![
            entry("https://Blog.Example.com/a"),
            entry("https://fakeexample.com/b"),
            entry("https://other.org/c"),
            entry("https://example.com/d?x=1"),
            entry("not a link"),
        ];
        let out = filter_by_domains(&entries, &["EXAMPLE.com", ".other.org"]);
        let links: Vec<&str> = out.iter().map(|e| e.link.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://Blog.Example.com/a",
                "https://other.org/c",
                "https://example.com/d?x=1"
            ]
        );
    }

    #[test]
    fn test_unicode_domains_match_punycode_hosts() {
        let entries = vec![
            entry("https://www.bücher.de/neu"),
            entry("https://xn--bcher-kva.de/alt"),
            entry("https://buecher.de/x"),
        ];
        let out = filter_by_domains(&entries, &["Bücher.de"]);
        assert_eq!(out.len(), 2);
        assert_eq!(filter_by_domains(&entries, &["xn--bcher-kva.de"]).len(), 2);
    }

    #[test]
    fn test_empty_domain_list_routes_nothing() {
        let entries = vec![entry("https://example.com/a")];
        let none: [&str; 0] = [];
        assert!(filter_by_domains(&entries, &none).is_empty());
        assert!(filter_by_domains(&entries, &[""]).is_empty());
    }

    #[test]
    fn test_same_entry_fans_out_to_overlapping_agents() {
        let entries = vec![entry("https://news.example.com/a")];
        let a = filter_by_domains(&entries, &["example.com"]);
        let b = filter_by_domains(&entries, &["news.example.com"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 1);
    }
}
