//! Aggregator redirect resolution.
//!
//! Feed links usually point at the aggregator, which forwards to the
//! publisher. Resolution tries, in order:
//!
//! 1. a GET with redirects disabled, using an off-aggregator `Location`;
//! 2. a GET following redirects, using the final URL when it left the aggregator;
//! 3. the body of that landing page, scanned by [`MARKUP_STRATEGIES`]
//!    (meta refresh, script location, "read more" anchor, any outbound anchor).
//!
//! Every failure degrades to the original URL.

use crate::transport::{RequestOptions, Transport};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

static META_REFRESH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<meta[^>]+http-equiv\s*=\s*["']?refresh["']?[^>]*>"#).unwrap()
});
static META_REFRESH_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)content\s*=\s*["']?\s*\d*\s*;?\s*url\s*=\s*['"]?([^"'>\s]+)"#).unwrap());
static SCRIPT_LOCATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)(?:window\.|document\.|top\.|self\.)?location(?:\.href)?\s*=\s*["']([^"']+)["']|location\.(?:replace|assign)\(\s*["']([^"']+)["']\s*\)"#,
    )
    .unwrap()
});
static ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["'][^>]*>(.*?)</a>"#).unwrap());
static READ_MORE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(read\s+(more|full|the\s+full|article|story)|continue\s+reading|full\s+(story|article)|view\s+(article|story)|go\s+to\s+article)\b").unwrap()
});
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Scans a landing page for the publisher URL. `base` resolves relative links.
pub type MarkupStrategy = fn(&RedirectResolver, &str, &Url) -> Option<String>;

/// Markup strategies in precedence order.
pub const MARKUP_STRATEGIES: &[(&str, MarkupStrategy)] = &[
    ("meta_refresh", RedirectResolver::from_meta_refresh as MarkupStrategy),
    ("script_location", RedirectResolver::from_script_location as MarkupStrategy),
    ("read_more_anchor", RedirectResolver::from_read_more_anchor as MarkupStrategy),
    ("outbound_anchor", RedirectResolver::from_outbound_anchor as MarkupStrategy),
];

/// Finds the canonical publisher URL behind an aggregator link.
#[derive(Debug, Clone)]
pub struct RedirectResolver {
    aggregator_domains: Vec<String>,
    timeout: Duration,
}

impl RedirectResolver {
    pub fn new(aggregator_domains: Vec<String>, timeout: Duration) -> Self {
        let aggregator_domains = aggregator_domains
            .into_iter()
            .map(|d| d.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            aggregator_domains,
            timeout,
        }
    }

    /// Whether `url` is hosted on an aggregator domain or one of its subdomains.
    /// Unparseable URLs count as aggregator links so they are never chosen.
    pub fn is_aggregator(&self, url: &str) -> bool {
        let Some(host) = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        else {
            return true;
        };
        self.aggregator_domains
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }

    /// `candidate` made absolute against `base`, if it is an http(s) URL off the aggregator.
    fn outbound(&self, candidate: &str, base: &Url) -> Option<String> {
        let decoded = html_escape::decode_html_entities(candidate.trim());
        let url = base.join(&decoded).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let url = url.to_string();
        (!self.is_aggregator(&url)).then_some(url)
    }

    /// Resolve `url` to the publisher URL, or return it unchanged.
    #[instrument(level = "debug", skip(self, transport))]
    pub async fn resolve<T: Transport>(&self, transport: &T, url: &str) -> String {
        let url = url.trim();
        let Ok(base) = Url::parse(url) else {
            debug!("Link is not an absolute URL; leaving as is");
            return url.to_string();
        };
        if !self.is_aggregator(url) {
            return url.to_string();
        }

        // 1. Location header of an unfollowed redirect.
        match transport.get(url, RequestOptions::manual(self.timeout)).await {
            Ok(response) if response.is_redirect() => {
                if let Some(target) = response
                    .location
                    .as_deref()
                    .and_then(|location| self.outbound(location, &base))
                {
                    debug!(%target, "Resolved via Location header");
                    return target;
                }
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "Redirect probe failed"),
        }

        // 2. Final URL after following redirects; 3. its body.
        let landing = match transport.get(url, RequestOptions::follow(self.timeout)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Could not follow aggregator link; using original URL");
                return url.to_string();
            }
        };
        if landing.final_url != url && !self.is_aggregator(&landing.final_url) {
            debug!(target = %landing.final_url, "Resolved via followed redirects");
            return landing.final_url;
        }

        let page_url = Url::parse(&landing.final_url).unwrap_or(base);
        if let Some(target) = self.scan_markup(&landing.body, &page_url) {
            return target;
        }

        debug!("No canonical link found; using original URL");
        url.to_string()
    }

    /// Run [`MARKUP_STRATEGIES`] over `body`; the first hit wins.
    pub fn scan_markup(&self, body: &str, page_url: &Url) -> Option<String> {
        MARKUP_STRATEGIES.iter().find_map(|(name, strategy)| {
            let target = strategy(self, body, page_url)?;
            debug!(strategy = *name, %target, "Resolved via landing page markup");
            Some(target)
        })
    }

    pub fn from_meta_refresh(&self, body: &str, base: &Url) -> Option<String> {
        META_REFRESH.find_iter(body).find_map(|tag| {
            let caps = META_REFRESH_URL.captures(tag.as_str())?;
            self.outbound(caps.get(1)?.as_str(), base)
        })
    }

    pub fn from_script_location(&self, body: &str, base: &Url) -> Option<String> {
        SCRIPT_LOCATION.captures_iter(body).find_map(|caps| {
            let target = caps.get(1).or_else(|| caps.get(2))?;
            let unescaped = target.as_str().replace("\\/", "/");
            self.outbound(&unescaped, base)
        })
    }

    pub fn from_read_more_anchor(&self, body: &str, base: &Url) -> Option<String> {
        ANCHOR.captures_iter(body).find_map(|caps| {
            let whole = caps.get(0)?.as_str();
            let label = TAGS.replace_all(caps.get(2)?.as_str(), " ");
            let open_tag = whole.split('>').next().unwrap_or_default();
            if READ_MORE.is_match(&label) || READ_MORE.is_match(open_tag) {
                self.outbound(caps.get(1)?.as_str(), base)
            } else {
                None
            }
        })
    }

    pub fn from_outbound_anchor(&self, body: &str, base: &Url) -> Option<String> {
        ANCHOR
            .captures_iter(body)
            .find_map(|caps| self.outbound(caps.get(1)?.as_str(), base))
    }
}
