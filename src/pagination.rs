//! Cursor-paginated listing.
//!
//! List endpoints return one page at a time together with a link to the
//! following page. [`collect_pages`] drives a single-page fetch until the
//! server stops returning a cursor and concatenates the pages in order.

use std::future::Future;

use reqwest::Url;

use crate::api::Page;

const START_PARAM: &str = "start";

/// Fetches every page and returns the concatenated items in server order.
///
/// `fetch` receives `None` for the first page and the previous page's
/// cursor afterwards. An empty cursor is treated the same as no cursor.
///
/// # Errors
///
/// Returns the first error produced by `fetch`; items gathered from earlier
/// pages are discarded.
pub async fn collect_pages<T, E, F, Fut>(mut fetch: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = fetch(cursor.take()).await?;
        items.extend(page.items);
        match page.next.filter(|next| !next.is_empty()) {
            Some(next) => cursor = Some(next),
            None => return Ok(items),
        }
    }
}

/// Extracts the `start` cursor from a `next.href` link.
///
/// Returns `None` when the link cannot be parsed or carries no cursor.
#[must_use]
pub fn next_start_token(href: &str) -> Option<String> {
    let url = Url::parse(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == START_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
