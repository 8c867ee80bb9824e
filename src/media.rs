use scraper::{Html, Selector};

/// Macaulay Library asset page for a media id.
pub fn asset_url(media_id: &str) -> String {
    format!("https://macaulaylibrary.org/asset/{media_id}")
}

/// A fetched asset page counts as confirmed unless it carries the
/// "Unconfirmed" review badge.
pub fn confirmed_from_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    match Selector::parse("span.Badge--unconfirmed") {
        Ok(badge_selector) => document.select(&badge_selector).next().is_none(),
        Err(_) => false,
    }
}
