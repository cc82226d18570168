use url::Url;

/// How an href relates to the page it appears on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Same site; carries the resolved URL without fragment
    Internal(Url),
    /// Different host
    External(Url),
    /// Not a page link (mailto:, javascript:, fragment-only, unparsable)
    Ignored,
}

/// Schemes that never point at a page
const NON_PAGE_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "data:", "sms:", "ftp:"];

/// Decides which hrefs on a page are internal
#[derive(Debug, Clone)]
pub struct LinkScope {
    page_url: Url,
    host: Option<String>,
}

impl LinkScope {
    /// Create a scope for the page at `page_url`
    pub fn new(page_url: &str) -> Result<Self, url::ParseError> {
        let page_url = Url::parse(page_url)?;
        let host = page_url.host_str().map(canonical_host);
        Ok(Self { page_url, host })
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    /// Classify an href found on the page
    ///
    /// Root-relative, query-relative and bare relative hrefs resolve to the
    /// page's host and are internal. Absolute and protocol-relative hrefs
    /// are internal when their host matches, ignoring a leading `www.`.
    pub fn resolve(&self, href: &str) -> LinkTarget {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return LinkTarget::Ignored;
        }
        let lowered = href.to_lowercase();
        if NON_PAGE_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
            return LinkTarget::Ignored;
        }

        let Ok(mut resolved) = self.page_url.join(href) else {
            ::log::debug!("Ignoring unparsable href: {}", href);
            return LinkTarget::Ignored;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            return LinkTarget::Ignored;
        }
        resolved.set_fragment(None);

        let same_host = match (&self.host, resolved.host_str()) {
            (Some(page_host), Some(link_host)) => *page_host == canonical_host(link_host),
            _ => false,
        };
        if same_host {
            LinkTarget::Internal(resolved)
        } else {
            LinkTarget::External(resolved)
        }
    }

    /// Whether an href or URL points at this site
    pub fn is_internal(&self, href: &str) -> bool {
        matches!(self.resolve(href), LinkTarget::Internal(_))
    }
}

/// Lowercased host without a leading `www.`
fn canonical_host(host: &str) -> String {
    let host = host.to_lowercase();
    match host.strip_prefix("www.") {
        Some(stripped) => stripped.to_string(),
        None => host,
    }
}

/// Number of non-empty path segments of a URL
pub fn url_depth(url: &Url) -> usize {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Key used to compare link targets for uniqueness: no fragment, no trailing slash
pub fn normalize_target(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let text = normalized.to_string();
    if normalized.path() != "/" {
        if let Some(stripped) = text.strip_suffix('/') {
            return stripped.to_string();
        }
    }
    text
}
