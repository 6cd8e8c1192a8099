//! Link preview fetching over HTTP.
//!
//! Pages are fetched with a short timeout and their OpenGraph / Twitter card
//! / plain HTML head tags are read into [`LinkMetadata`].
//!
//! Only public addresses are contacted. Host names go through
//! [`PublicResolver`], IP literals are checked on the first request and on
//! every redirect hop.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use brickpage_core::error::CoreError;
use brickpage_core::link::{LinkMetadata, LinkMetadataFetcher};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use scraper::{Html, Selector};
use url::{Host, Url};

/// Pages larger than this are not parsed.
const MAX_HTML_BYTES: usize = 2 * 1024 * 1024;

const MAX_REDIRECTS: usize = 5;

const USER_AGENT: &str = "brickpage-link-preview/0.1";

#[derive(Debug, thiserror::Error)]
#[error("{0} does not resolve to a public address")]
pub struct NonPublicAddress(String);

/// [`LinkMetadataFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpLinkFetcher {
    client: reqwest::Client,
}

impl HttpLinkFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let redirects = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if let Err(err) = check_ip_literal(attempt.url()) {
                attempt.error(err)
            } else {
                attempt.follow()
            }
        });
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .redirect(redirects)
            .dns_resolver(Arc::new(PublicResolver))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_metadata(&self, url: &Url) -> Result<LinkMetadata> {
        check_ip_literal(url)?;
        let mut response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{url} responded with {status}");
        }
        if response
            .content_length()
            .is_some_and(|len| len > MAX_HTML_BYTES as u64)
        {
            bail!("{url} is too large to preview");
        }

        // Redirects may land on another host; resolve relative URLs against it.
        let final_url = response.url().clone();
        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("text/html"));

        if !is_html {
            return Ok(LinkMetadata {
                site_name: final_url.host_str().map(str::to_string),
                ..LinkMetadata::default()
            });
        }

        // Content-Length is optional; chunked bodies are capped as they arrive.
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .context("failed to read response body")?
        {
            if body.len() + chunk.len() > MAX_HTML_BYTES {
                bail!("{url} is too large to preview");
            }
            body.extend_from_slice(&chunk);
        }
        Ok(extract_link_metadata(&final_url, &String::from_utf8_lossy(&body)))
    }
}

#[async_trait]
impl LinkMetadataFetcher for HttpLinkFetcher {
    async fn fetch(&self, url: &str) -> Result<LinkMetadata, CoreError> {
        let parsed = Url::parse(url)
            .map_err(|_| CoreError::Validation(format!("Invalid link URL '{url}'")))?;
        self.fetch_metadata(&parsed).await.map_err(|e| {
            tracing::debug!(url = %url, error = %e, "link preview failed");
            CoreError::Upstream("Could not load link preview".to_string())
        })
    }
}

/// DNS resolver that only hands out public addresses.
#[derive(Debug, Clone, Copy)]
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolve_public(&host).await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

/// Resolve `host`, keeping only public addresses. Fails when none are left.
async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, NonPublicAddress> {
    let resolved = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|_| NonPublicAddress(host.to_string()))?;
    let public: Vec<SocketAddr> = resolved.filter(|addr| is_public_ip(addr.ip())).collect();
    if public.is_empty() {
        tracing::debug!(host, "Refusing link preview for non-public host");
        return Err(NonPublicAddress(host.to_string()));
    }
    Ok(public)
}

/// Reject URLs whose host is a non-public IP literal. Named hosts are left
/// to [`PublicResolver`].
fn check_ip_literal(url: &Url) -> Result<(), NonPublicAddress> {
    let ip = match url.host() {
        Some(Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(Host::Ipv6(v6)) => IpAddr::V6(v6),
        Some(Host::Domain(_)) => return Ok(()),
        None => return Err(NonPublicAddress(url.to_string())),
    };
    if is_public_ip(ip) {
        Ok(())
    } else {
        Err(NonPublicAddress(ip.to_string()))
    }
}

/// Whether `ip` is routable on the public internet.
///
/// Loopback, private, link-local (including cloud metadata endpoints),
/// unspecified, broadcast and IPv6 unique-local addresses are not. IPv4
/// mapped IPv6 addresses are judged by their IPv4 part.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                // Shared address space (100.64.0.0/10)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64))
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_public_ip(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            !(v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80)
        }
    }
}

/// Read preview metadata out of an HTML document.
///
/// Titles prefer `og:title`, then `twitter:title`, then `<title>`. Favicon
/// and image URLs are resolved against `base`; a page without an icon link
/// gets `/favicon.ico` on its own origin.
pub fn extract_link_metadata(base: &Url, html: &str) -> LinkMetadata {
    let document = Html::parse_document(html);

    let title = meta_content(&document, "meta[property=\"og:title\"]")
        .or_else(|| meta_content(&document, "meta[name=\"twitter:title\"]"))
        .or_else(|| element_text(&document, "title"));

    let description = meta_content(&document, "meta[property=\"og:description\"]")
        .or_else(|| meta_content(&document, "meta[name=\"description\"]"))
        .or_else(|| meta_content(&document, "meta[name=\"twitter:description\"]"));

    let site_name = meta_content(&document, "meta[property=\"og:site_name\"]");

    let image = meta_content(&document, "meta[property=\"og:image\"]")
        .or_else(|| meta_content(&document, "meta[name=\"twitter:image\"]"))
        .and_then(|href| resolve(base, &href));

    let favicon = attr(&document, "link[rel~=\"icon\"]", "href")
        .or_else(|| attr(&document, "link[rel=\"shortcut icon\"]", "href"))
        .or_else(|| attr(&document, "link[rel=\"apple-touch-icon\"]", "href"))
        .and_then(|href| resolve(base, &href))
        .or_else(|| resolve(base, "/favicon.ico"));

    LinkMetadata {
        title,
        description,
        site_name,
        favicon,
        image,
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    attr(document, selector, "content")
}

fn attr(document: &Html, selector: &str, name: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .filter_map(|el| el.value().attr(name))
        .map(collapse_whitespace)
        .find(|v| !v.is_empty())
}

fn element_text(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let element = document.select(&sel).next()?;
    let text = collapse_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
