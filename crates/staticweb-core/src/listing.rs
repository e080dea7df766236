//! Container listing decoding and HTML rendering.
//!
//! The backend answers `?format=json&delimiter=/` listing queries with an array of
//! entries, each either a `{"subdir": ...}` grouping or an object record. Entries are
//! rendered in the order the backend returned them.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;

use crate::error::StaticWebResult;
use crate::path::encode_path;

/// One row of a container listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListingEntry {
    /// A pseudo-directory grouping objects under a common prefix.
    Subdir {
        /// Full prefix of the group, ending with the delimiter.
        subdir: String,
    },
    /// A stored object.
    Object {
        /// Full object name.
        name: String,
        /// Object size in bytes.
        #[serde(default)]
        bytes: u64,
        /// Object content type.
        #[serde(default)]
        content_type: String,
        /// Last modification time, as reported by the backend.
        #[serde(default)]
        last_modified: String,
    },
}

impl ListingEntry {
    /// The full name of the entry.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Subdir { subdir } => subdir,
            Self::Object { name, .. } => name,
        }
    }
}

/// Decode a JSON listing body.
pub fn parse_listing(body: &[u8]) -> StaticWebResult<Vec<ListingEntry>> {
    Ok(serde_json::from_slice(body)?)
}

/// Page-level inputs of a rendered listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListingPage<'a> {
    /// Decoded request path shown in the title and heading.
    pub display_path: &'a str,
    /// Prefix stripped from displayed names; also turns on the parent row.
    pub prefix: Option<&'a str>,
    /// Stylesheet URL; the built-in style is used when absent.
    pub stylesheet: Option<&'a str>,
}

const DEFAULT_STYLE: &str = concat!(
    "  <style type=\"text/css\">\n",
    "   h1 {font-size: 1em; font-weight: bold;}\n",
    "   th {text-align: left; padding: 0px 1em 0px 1em;}\n",
    "   td {padding: 0px 1em 0px 1em;}\n",
    "   a {text-decoration: none;}\n",
    "  </style>\n",
);

/// Render `entries` as an HTML listing document.
///
/// # Examples
///
/// ```
/// use staticweb_core::listing::{ListingEntry, ListingPage, render_listing};
///
/// let entries = vec![ListingEntry::Subdir { subdir: "photos/".to_owned() }];
/// let page = ListingPage { display_path: "/v1/a/site/", ..ListingPage::default() };
/// let html = render_listing(&entries, &page);
/// assert!(html.contains(r#"<a href="photos/">photos/</a>"#));
/// ```
#[must_use]
pub fn render_listing(entries: &[ListingEntry], page: &ListingPage<'_>) -> String {
    let title = escape_html(page.display_path);
    let prefix = page.prefix.filter(|p| !p.is_empty());

    let mut body = String::from(concat!(
        "<!DOCTYPE HTML PUBLIC \"-//W3C//DTD HTML 4.01 Transitional//EN\" ",
        "\"http://www.w3.org/TR/html4/loose.dtd\">\n",
        "<html>\n",
        " <head>\n",
    ));
    body.push_str(&format!("  <title>Listing of {title}</title>\n"));
    match page.stylesheet {
        Some(href) => body.push_str(&format!(
            "  <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\" />\n",
            escape_html(href)
        )),
        None => body.push_str(DEFAULT_STYLE),
    }
    body.push_str(" </head>\n <body>\n");
    body.push_str(&format!("  <h1 id=\"title\">Listing of {title}</h1>\n"));
    body.push_str(concat!(
        "  <table id=\"listing\">\n",
        "   <tr id=\"heading\">\n",
        "    <th class=\"colname\">Name</th>\n",
        "    <th class=\"colsize\">Size</th>\n",
        "    <th class=\"coldate\">Date</th>\n",
        "   </tr>\n",
    ));

    if prefix.is_some() {
        body.push_str(concat!(
            "   <tr id=\"parent\" class=\"item\">\n",
            "    <td class=\"colname\"><a href=\"../\">../</a></td>\n",
            "    <td class=\"colsize\">&nbsp;</td>\n",
            "    <td class=\"coldate\">&nbsp;</td>\n",
            "   </tr>\n",
        ));
    }

    for entry in entries {
        let full = entry.name();
        let shown = prefix.and_then(|p| full.strip_prefix(p)).unwrap_or(full);
        let link = format!(
            "<a href=\"{}\">{}</a>",
            escape_html(&encode_path(shown)),
            escape_html(shown)
        );
        match entry {
            ListingEntry::Subdir { .. } => {
                body.push_str("   <tr class=\"item subdir\">\n");
                body.push_str(&format!("    <td class=\"colname\">{link}</td>\n"));
                body.push_str("    <td class=\"colsize\">&nbsp;</td>\n");
                body.push_str("    <td class=\"coldate\">&nbsp;</td>\n");
            }
            ListingEntry::Object {
                bytes,
                content_type,
                last_modified,
                ..
            } => {
                body.push_str(&format!(
                    "   <tr class=\"item {}\">\n",
                    type_classes(content_type)
                ));
                body.push_str(&format!("    <td class=\"colname\">{link}</td>\n"));
                body.push_str(&format!(
                    "    <td class=\"colsize\">{}</td>\n",
                    human_readable(*bytes)
                ));
                body.push_str(&format!(
                    "    <td class=\"coldate\">{}</td>\n",
                    escape_html(&format_last_modified(last_modified))
                ));
            }
        }
        body.push_str("   </tr>\n");
    }

    body.push_str("  </table>\n </body>\n</html>\n");
    body
}

/// `type-{major} type-{minor}` CSS classes for a content type.
fn type_classes(content_type: &str) -> String {
    content_type
        .split('/')
        .map(|part| format!("type-{}", escape_html(&part.trim().to_ascii_lowercase())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Size with binary suffixes: `12 bytes`, `2Ki`, `3Mi`, ...
#[must_use]
pub fn human_readable(bytes: u64) -> String {
    const SUFFIXES: [char; 8] = ['K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y'];

    let mut value = bytes;
    let mut suffix = None;
    for s in SUFFIXES {
        if value < 1024 {
            break;
        }
        // Round half up, as the division result is displayed as an integer.
        value = value / 1024 + u64::from(value % 1024 >= 512);
        suffix = Some(s);
    }

    match suffix {
        Some(s) => format!("{value}{s}i"),
        None => format!("{value} bytes"),
    }
}

/// Timestamp without sub-second precision or zone: `2023-01-01 00:00:00`.
#[must_use]
pub fn format_last_modified(raw: &str) -> String {
    const DISPLAY: &str = "%Y-%m-%d %H:%M:%S";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.naive_local().format(DISPLAY).to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format(DISPLAY).to_string();
    }
    raw.split('.')
        .next()
        .unwrap_or(raw)
        .trim_end_matches('Z')
        .replace('T', " ")
}

/// Escape text for HTML element content and attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
