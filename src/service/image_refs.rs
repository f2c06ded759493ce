use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::{error::Result, repository::ImageRepository};

fn html_img_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("valid img tag pattern")
    })
}

fn markdown_img_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"!\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#)
            .expect("valid markdown image pattern")
    })
}

/// Distinct image URLs embedded in announcement content, from `<img src>`
/// attributes and markdown `![alt](url)` syntax.
///
/// An image referenced several times by one announcement still counts as a
/// single reference; every write path goes through this set.
pub fn extract_image_urls(content: &str) -> BTreeSet<String> {
    let html = html_img_pattern().captures_iter(content).filter_map(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
    });
    let markdown = markdown_img_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));

    html.chain(markdown)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

/// URLs to increment and decrement when content changes from `old` to `new`.
pub fn reference_changes(old: &str, new: &str) -> (Vec<String>, Vec<String>) {
    let before = extract_image_urls(old);
    let after = extract_image_urls(new);

    let added = after.difference(&before).cloned().collect();
    let removed = before.difference(&after).cloned().collect();
    (added, removed)
}

/// Summary of one reference update pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceUpdate {
    pub incremented: usize,
    pub decremented: usize,
    /// URLs that matched no uploaded image, e.g. external links.
    pub untracked: usize,
    pub failed: usize,
}

/// Keeps image reference counts in step with announcement content.
pub struct ImageReferenceCounter {
    images: Arc<dyn ImageRepository>,
}

impl ImageReferenceCounter {
    pub fn new(images: Arc<dyn ImageRepository>) -> Self {
        Self { images }
    }

    pub async fn on_create(&self, content: &str) -> ReferenceUpdate {
        let urls: Vec<String> = extract_image_urls(content).into_iter().collect();
        let mut update = ReferenceUpdate::default();
        self.apply(&urls, 1, &mut update).await;
        update
    }

    pub async fn on_update(&self, old: &str, new: &str) -> ReferenceUpdate {
        let mut update = ReferenceUpdate::default();
        if old == new {
            return update;
        }

        let (added, removed) = reference_changes(old, new);
        self.apply(&removed, -1, &mut update).await;
        self.apply(&added, 1, &mut update).await;
        update
    }

    pub async fn on_delete(&self, content: &str) -> ReferenceUpdate {
        let urls: Vec<String> = extract_image_urls(content).into_iter().collect();
        let mut update = ReferenceUpdate::default();
        self.apply(&urls, -1, &mut update).await;
        update
    }

    // Each URL is an independent point update; one failure does not stop the rest.
    async fn apply(&self, urls: &[String], delta: i64, update: &mut ReferenceUpdate) {
        for url in urls {
            match self.adjust(url, delta).await {
                Ok(true) if delta > 0 => update.incremented += 1,
                Ok(true) => update.decremented += 1,
                Ok(false) => update.untracked += 1,
                Err(e) => {
                    tracing::error!("Failed to adjust reference count for {} by {}: {}", url, delta, e);
                    update.failed += 1;
                }
            }
        }
    }

    async fn adjust(&self, url: &str, delta: i64) -> Result<bool> {
        let matched = self.images.adjust_reference_count(url, delta).await?;
        if matched {
            tracing::debug!("Adjusted reference count for {} by {}", url, delta);
        }
        Ok(matched)
    }
}
