//! RSS item extraction.
//!
//! Parsing is split in two steps so that a bad entry never takes its
//! siblings down with it:
//!
//! 1. [`extract`] turns the whole payload into [`RawItem`]s.  Only a payload
//!    that is not an RSS document at all fails here.
//! 2. [`RawItem::into_entry`] validates one item, strips its description
//!    markup and resolves its image.  Failures are per item.
//!
//! ## Image resolution
//!
//! First match wins:
//!
//! 1. the item's first `<enclosure>`, if its `type` starts with `image`
//! 2. `<media:thumbnail url=..>`
//! 3. `<media:content url=..>`
//! 4. `src` of the first `<img>` inside the description markup
//!
//! Media elements wrapped in `<media:group>` count as well.

use std::collections::BTreeMap;

use ::rss::extension::Extension;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scraper::{ElementRef, Html};
use thiserror::Error;

use super::SourceError;

/// Why a single item was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("item has no title")]
    MissingTitle,
    #[error("item has no link")]
    MissingLink,
    #[error("item has no pubDate")]
    MissingDate,
    #[error("item has no description")]
    MissingDescription,
}

/// An `<enclosure>` element's relevant attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
}

/// One `<item>` as it appeared in the feed, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Description markup (entities already decoded by the XML reader).
    pub description: Option<String>,
    pub pub_date: Option<String>,
    /// The first `<enclosure>` of the item, whatever its type.
    pub enclosure: Option<Enclosure>,
    pub media_thumbnail: Option<String>,
    pub media_content: Option<String>,
}

/// A validated item: required fields present, description plain text,
/// image resolved.  The date is still raw; the normaliser handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Raw `pubDate` text, trimmed.
    pub pub_date: String,
}

/// Parse a feed payload into its items.
///
/// # Errors
///
/// [`SourceError::MalformedFeed`] when the bytes are not an RSS document.
pub fn extract(bytes: &[u8]) -> Result<Vec<RawItem>, SourceError> {
    let channel = ::rss::Channel::read_from(bytes)?;
    let mut items: Vec<RawItem> = channel.items().iter().map(RawItem::from_rss).collect();

    // `rss` keeps only the last enclosure of an item; the first one counts.
    let first = first_enclosures(bytes);
    if first.len() == items.len() {
        for (item, enclosure) in items.iter_mut().zip(first) {
            item.enclosure = enclosure;
        }
    } else {
        tracing::debug!(
            items = items.len(),
            scanned = first.len(),
            "Enclosure scan disagrees with parsed items, keeping parsed enclosures"
        );
    }
    Ok(items)
}

impl RawItem {
    fn from_rss(item: &::rss::Item) -> Self {
        let media = item.extensions().get("media");

        Self {
            title: item.title().map(String::from),
            link: item.link().map(String::from),
            description: item.description().map(String::from),
            pub_date: item.pub_date().map(String::from),
            enclosure: item.enclosure().map(|e| Enclosure {
                url: e.url().to_string(),
                mime_type: e.mime_type().to_string(),
            }),
            media_thumbnail: media.and_then(|m| media_url(m, "thumbnail")),
            media_content: media.and_then(|m| media_url(m, "content")),
        }
    }

    /// Validate this item and resolve its derived fields.
    ///
    /// # Errors
    ///
    /// [`EntryError::MissingTitle`] / [`EntryError::MissingLink`] when the
    /// field is absent or blank; [`EntryError::MissingDate`] /
    /// [`EntryError::MissingDescription`] when the element is absent.
    pub fn into_entry(self) -> Result<Entry, EntryError> {
        let title = required(self.title).ok_or(EntryError::MissingTitle)?;
        let link = required(self.link).ok_or(EntryError::MissingLink)?;
        let pub_date = self.pub_date.ok_or(EntryError::MissingDate)?;
        let markup = self.description.ok_or(EntryError::MissingDescription)?;

        let fragment = Html::parse_fragment(markup.trim());
        let description = fragment.root_element().text().collect::<String>();

        let image_url = self
            .enclosure
            .filter(|e| e.mime_type.starts_with("image"))
            .map(|e| e.url)
            .and_then(non_empty)
            .or_else(|| self.media_thumbnail.and_then(non_empty))
            .or_else(|| self.media_content.and_then(non_empty))
            .or_else(|| first_img_src(&fragment));

        Ok(Entry {
            title,
            link,
            description: description.trim().to_string(),
            image_url,
            pub_date: pub_date.trim().to_string(),
        })
    }
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|s| s.trim().to_string()).and_then(non_empty)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// `url` attribute of the first `media:<name>` element, looking inside
/// `media:group` when the item has none at top level.
fn media_url(media: &BTreeMap<String, Vec<Extension>>, name: &str) -> Option<String> {
    let direct = media
        .get(name)
        .and_then(|list| list.first())
        .and_then(|ext| ext.attrs().get("url"))
        .cloned();

    direct.or_else(|| {
        media
            .get("group")?
            .iter()
            .find_map(|group| group.children().get(name)?.first()?.attrs().get("url").cloned())
    })
}

/// The first `<enclosure>` inside each `<item>`, one slot per item in
/// document order.  A reader error ends the scan early.
fn first_enclosures(bytes: &[u8]) -> Vec<Option<Enclosure>> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut slots: Vec<Option<Enclosure>> = Vec::new();
    let mut seen_in_item = false;
    // Element depth inside the current item; 0 when outside any item.
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth > 0 {
                    if !seen_in_item && e.name().as_ref() == b"enclosure" {
                        record_enclosure(&mut slots, &mut seen_in_item, &e);
                    }
                    depth += 1;
                } else if e.name().as_ref() == b"item" {
                    slots.push(None);
                    seen_in_item = false;
                    depth = 1;
                }
            }
            Ok(Event::Empty(e)) => {
                if depth > 0 && !seen_in_item && e.name().as_ref() == b"enclosure" {
                    record_enclosure(&mut slots, &mut seen_in_item, &e);
                } else if depth == 0 && e.name().as_ref() == b"item" {
                    slots.push(None);
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) | Err(_) => break,
            Ok(_) => {}
        }
        buf.clear();
    }
    slots
}

fn record_enclosure(slots: &mut [Option<Enclosure>], seen: &mut bool, e: &BytesStart<'_>) {
    *seen = true;
    let attr = |name: &str| {
        e.try_get_attribute(name)
            .ok()
            .flatten()
            .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
    };
    if let (Some(slot), Some(url)) = (slots.last_mut(), attr("url")) {
        *slot = Some(Enclosure {
            url,
            mime_type: attr("type").unwrap_or_default(),
        });
    }
}

/// `src` of the first `<img>` in the fragment, if that tag has one.
fn first_img_src(fragment: &Html) -> Option<String> {
    fragment
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "img")
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string())
        .and_then(non_empty)
}
