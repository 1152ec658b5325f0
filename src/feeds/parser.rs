//! RSS 2.0 / Atom parsing into flat feed entries.
//!
//! [`parse_feed`] walks the XML with `quick-xml` and keeps only the fields the
//! pipeline reads: title, link, dates, media URLs, and embedded HTML content.
//! [`HttpFeedSource`] is the network-backed [`FeedSource`].

use crate::error::FeedError;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use reqwest::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, instrument};

/// A parsed feed: its channel title and every item or entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub items: Vec<FeedEntry>,
}

/// One `<item>` (RSS) or `<entry>` (Atom).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// ISO 8601 date (`dc:date`, Atom `published`/`updated`).
    pub iso_date: Option<String>,
    /// RFC 2822 date from `pubDate`.
    pub pub_date: Option<String>,
    pub enclosure_url: Option<String>,
    pub media_content_url: Option<String>,
    pub media_thumbnail_url: Option<String>,
    /// `content:encoded` / Atom `content`.
    pub content: Option<String>,
    /// `description` / Atom `summary`.
    pub description: Option<String>,
    /// Publisher named by an RSS `<source>` element (Google News sets it).
    pub source_name: Option<String>,
}

impl FeedEntry {
    /// Best available date string, ISO first.
    pub fn date(&self) -> &str {
        self.iso_date
            .as_deref()
            .or(self.pub_date.as_deref())
            .unwrap_or("")
    }
}

/// Anything that can turn a feed URL into a [`FeedDocument`].
pub trait FeedSource {
    async fn parse(&self, url: &str) -> Result<FeedDocument, FeedError>;
}

/// Fetches feeds over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
}

impl HttpFeedSource {
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("daily_brief/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl FeedSource for HttpFeedSource {
    #[instrument(level = "debug", skip(self))]
    async fn parse(&self, url: &str) -> Result<FeedDocument, FeedError> {
        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "application/rss+xml, application/atom+xml, application/xml;q=0.9, */*;q=0.8",
            )
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let document = parse_feed(&body)?;
        debug!(items = document.items.len(), "Parsed feed");
        Ok(document)
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Pull URLs out of attribute-only elements. `direct_child` gates Atom links,
/// which must sit directly under the entry; media elements may be nested.
fn apply_attributes(entry: &mut FeedEntry, name: &str, e: &BytesStart<'_>, direct_child: bool) {
    match name {
        "enclosure" if entry.enclosure_url.is_none() => entry.enclosure_url = attribute(e, "url"),
        "media:content" if entry.media_content_url.is_none() => {
            entry.media_content_url = attribute(e, "url");
        }
        "media:thumbnail" if entry.media_thumbnail_url.is_none() => {
            entry.media_thumbnail_url = attribute(e, "url");
        }
        "link" if direct_child && entry.link.is_empty() => {
            let rel = attribute(e, "rel");
            if rel.as_deref().is_none_or(|r| r == "alternate") {
                if let Some(href) = attribute(e, "href") {
                    entry.link = href;
                }
            }
        }
        _ => {}
    }
}

fn assign_field(entry: &mut FeedEntry, name: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let value = Some(text.to_string());
    match name {
        "title" => entry.title = text.to_string(),
        "link" if entry.link.is_empty() => entry.link = text.to_string(),
        "pubDate" => entry.pub_date = value,
        "dc:date" | "published" => entry.iso_date = value,
        "updated" if entry.iso_date.is_none() => entry.iso_date = value,
        "content:encoded" | "content" => entry.content = value,
        "description" | "summary" => entry.description = value,
        "source" => entry.source_name = value,
        _ => {}
    }
}

/// Parse an RSS or Atom XML body.
///
/// # Errors
///
/// Returns [`FeedError::Xml`] if the document is malformed.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = FeedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<FeedEntry> = None;
    // Stack depth at which the open item/entry element sits.
    let mut entry_depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                match entry.as_mut() {
                    None if name == "item" || name == "entry" => {
                        entry = Some(FeedEntry::default());
                        entry_depth = stack.len() + 1;
                    }
                    Some(current) => {
                        let direct_child = stack.len() == entry_depth;
                        if direct_child {
                            text.clear();
                        }
                        apply_attributes(current, &name, &e, direct_child);
                    }
                    None => text.clear(),
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                if let Some(current) = entry.as_mut() {
                    let name = tag_name(&e);
                    apply_attributes(current, &name, &e, stack.len() == entry_depth);
                }
            }
            Ok(Event::Text(e)) => {
                let piece = match e.unescape() {
                    Ok(unescaped) => unescaped.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&piece);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(_)) => {
                let name = stack.pop().unwrap_or_default();
                match entry.as_mut() {
                    Some(current) if stack.len() == entry_depth => {
                        assign_field(current, &name, &text);
                        text.clear();
                    }
                    Some(_) if stack.len() + 1 == entry_depth => {
                        if let Some(done) = entry.take() {
                            document.items.push(done);
                        }
                    }
                    Some(_) => {}
                    None => {
                        let parent = stack.last().map(String::as_str);
                        if name == "title"
                            && document.title.is_none()
                            && matches!(parent, Some("channel") | Some("feed"))
                        {
                            let title = text.trim();
                            if !title.is_empty() {
                                document.title = Some(title.to_string());
                            }
                        }
                        text.clear();
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Xml(e)),
            _ => {}
        }
    }

    Ok(document)
}
