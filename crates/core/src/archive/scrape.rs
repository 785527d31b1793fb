use scraper::{Html, Selector};

// Checked in order; the first tag with a non-empty content attribute wins.
const IMAGE_META_SELECTORS: [&str; 2] = [
    r#"meta[property="og:image"]"#,
    r#"meta[name="twitter:image"]"#,
];

/// Pulls the canonical strip image URL out of an archive page.
pub fn extract_image_url(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    IMAGE_META_SELECTORS.iter().find_map(|sel| {
        let selector = Selector::parse(sel).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}
