// src/checker/extract.rs
// =============================================================================
// Link Extractor: fetches one seed page and collects its outbound links.
//
// Steps for a seed page:
// 1. GET the page with a bounded timeout (non-2xx or transport error = FetchError)
// 2. Parse the body with `scraper` (html5ever never rejects a document, it
//    repairs it, so malformed pages still yield whatever links survive)
// 3. Walk every <a href> and <area href>, resolve against the page base
// 4. Drop fragments-only links, non-HTTP(S) schemes and internal hosts
// 5. Normalize (lower-case scheme/host, strip fragment) and dedupe by URL
// =============================================================================

use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::SeedPage;

/// Longest anchor text / page title kept for the report
const MAX_LABEL_CHARS: usize = 80;

/// Why a seed page could not be used. The seed is skipped, the run goes on.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid seed URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
}

/// One occurrence of an outbound hyperlink on a seed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    /// Label of the seed page the link was found on
    pub source_label: String,
    /// URL of the seed page the link was found on
    pub source_url: String,
    /// Absolute, normalized target (fragment stripped)
    pub target_url: String,
    pub anchor_text: Option<String>,
}

/// Everything extracted from one seed page.
#[derive(Debug, Clone, Default)]
pub struct PageLinks {
    pub title: Option<String>,
    pub links: Vec<LinkReference>,
}

/// Hosts whose links are treated as internal and skipped.
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    hosts: HashSet<String>,
}

impl HostFilter {
    /// Builds the filter for one seed: its own host (with and without
    /// `www.`), the seed's skip list and the global skip list.
    pub fn for_seed(seed_url: &Url, seed_skips: &[String], global_skips: &[String]) -> Self {
        let mut hosts = HashSet::new();

        if let Some(host) = seed_url.host_str() {
            let host = host.to_ascii_lowercase();
            match host.strip_prefix("www.") {
                Some(bare) => hosts.insert(bare.to_string()),
                None => hosts.insert(format!("www.{}", host)),
            };
            hosts.insert(host);
        }

        for domain in seed_skips.iter().chain(global_skips) {
            let domain = domain.trim().to_ascii_lowercase();
            if !domain.is_empty() {
                hosts.insert(domain);
            }
        }

        Self { hosts }
    }

    pub fn is_skipped(&self, url: &Url) -> bool {
        url.host_str()
            .map(|host| self.hosts.contains(&host.to_ascii_lowercase()))
            .unwrap_or(true)
    }
}

/// Builds the HTTP client used for seed page fetches.
pub fn page_client(timeout: std::time::Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

/// Fetches a seed page and extracts its outbound links.
pub async fn extract(
    client: &Client,
    seed: &SeedPage,
    global_skips: &[String],
) -> Result<PageLinks, FetchError> {
    let page_url = Url::parse(&seed.url).map_err(|e| FetchError::InvalidUrl {
        url: seed.url.clone(),
        reason: e.to_string(),
    })?;

    info!(seed = %seed.label, url = %seed.url, "fetching seed page");
    let html = fetch_page(client, &page_url).await?;

    let filter = HostFilter::for_seed(&page_url, &seed.skip_domains, global_skips);
    let page = extract_links(&html, seed, &page_url, &filter);
    info!(seed = %seed.label, links = page.links.len(), "extracted outbound links");
    Ok(page)
}

// Fetches a page and returns its body; any non-2xx status is an error
async fn fetch_page(client: &Client, url: &Url) -> Result<String, FetchError> {
    let transport = |source| FetchError::Transport {
        url: url.to_string(),
        source,
    };

    let response = client.get(url.clone()).send().await.map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().await.map_err(transport)
}

/// Extracts outbound links from already-fetched HTML.
///
/// Links are returned in document order, one per distinct normalized URL.
/// Hrefs that cannot be resolved are skipped rather than failing the page.
pub fn extract_links(html: &str, seed: &SeedPage, page_url: &Url, filter: &HostFilter) -> PageLinks {
    let document = Html::parse_document(html);

    // Constant selectors, known to be valid
    let link_selector = Selector::parse("a[href], area[href]").unwrap();
    let title_selector = Selector::parse("title").unwrap();
    let base_selector = Selector::parse("base[href]").unwrap();

    let title = document
        .select(&title_selector)
        .next()
        .and_then(collapse_text);

    // A <base href> overrides the page URL for resolution
    let base = document
        .select(&base_selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href.trim()).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut links: Vec<LinkReference> = Vec::new();
    let mut index_by_url: HashMap<String, usize> = HashMap::new();
    let mut unresolved = 0usize;

    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        let target = match resolve_link(&base, href) {
            Resolved::Link(url) => url,
            Resolved::Ignored => continue,
            Resolved::Invalid => {
                unresolved += 1;
                continue;
            }
        };

        if filter.is_skipped(&target) {
            continue;
        }

        let target_url = normalize_url(target);
        let anchor_text = collapse_text(element);

        match index_by_url.get(&target_url) {
            Some(&i) => {
                // Same URL again: keep the first non-empty anchor text
                if links[i].anchor_text.is_none() {
                    links[i].anchor_text = anchor_text;
                }
            }
            None => {
                index_by_url.insert(target_url.clone(), links.len());
                links.push(LinkReference {
                    source_label: seed.label.clone(),
                    source_url: seed.url.clone(),
                    target_url,
                    anchor_text,
                });
            }
        }
    }

    if unresolved > 0 {
        debug!(seed = %seed.label, unresolved, "skipped hrefs that could not be resolved");
    }

    PageLinks { title, links }
}

enum Resolved {
    Link(Url),
    /// Fragment-only or non-HTTP(S): not a link we check
    Ignored,
    /// Garbage href the URL parser rejects
    Invalid,
}

fn resolve_link(base: &Url, href: &str) -> Resolved {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return Resolved::Ignored;
    }

    // join() also accepts absolute URLs, so this covers both cases
    match base.join(href) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Resolved::Link(url),
        Ok(_) => Resolved::Ignored,
        Err(_) => Resolved::Invalid,
    }
}

/// Lower-cases scheme and host (the `url` crate already does this on parse)
/// and strips the fragment. Path and query are left untouched.
pub fn normalize_url(mut url: Url) -> String {
    url.set_fragment(None);
    url.to_string()
}

fn collapse_text(element: ElementRef<'_>) -> Option<String> {
    let text: String = element.text().collect();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.chars().take(MAX_LABEL_CHARS).collect())
    }
}
