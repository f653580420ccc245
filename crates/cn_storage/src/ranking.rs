//! Ordering and matching rules shared by every backend so that they return
//! identical results for identical data.

use cn_core::{Article, Coordinates};
use std::cmp::Ordering;

/// Weight of a search term found in the title.
pub const TITLE_WEIGHT: u32 = 5;
/// Weight of a search term found in the description.
pub const DESCRIPTION_WEIGHT: u32 = 3;

/// Lowercase alphanumeric terms of a free-text query, in order, deduplicated.
pub fn search_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
    {
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

pub fn text_score(article: &Article, terms: &[String]) -> u32 {
    let title = article.title.to_lowercase();
    let description = article.description.to_lowercase();
    terms
        .iter()
        .map(|term| {
            let mut score = 0;
            if title.contains(term.as_str()) {
                score += TITLE_WEIGHT;
            }
            if description.contains(term.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            score
        })
        .sum()
}

pub fn contains_ignore_case(haystack: &str, pattern: &str) -> bool {
    haystack.to_lowercase().contains(&pattern.to_lowercase())
}

pub fn matches_category(article: &Article, pattern: &str) -> bool {
    article
        .category
        .iter()
        .any(|category| contains_ignore_case(category, pattern))
}

/// Newest first, then id ascending.
pub fn by_recency(a: &Article, b: &Article) -> Ordering {
    b.publication_date
        .cmp(&a.publication_date)
        .then_with(|| a.id.cmp(&b.id))
}

/// Highest relevance first, then id ascending.
pub fn by_relevance(a: &Article, b: &Article) -> Ordering {
    b.relevance_score
        .total_cmp(&a.relevance_score)
        .then_with(|| a.id.cmp(&b.id))
}

/// Keeps articles matching at least one term, best text match first.
pub fn rank_search(articles: Vec<Article>, terms: &[String]) -> Vec<Article> {
    let mut scored: Vec<(u32, Article)> = articles
        .into_iter()
        .map(|article| (text_score(&article, terms), article))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| by_relevance(a, b)));
    scored.into_iter().map(|(_, article)| article).collect()
}

/// Keeps articles within `radius_km` of `center`, nearest first.
pub fn rank_nearby(articles: Vec<Article>, center: &Coordinates, radius_km: f64) -> Vec<Article> {
    let mut located: Vec<(f64, Article)> = articles
        .into_iter()
        .map(|article| (center.distance_km(&article.coordinates()), article))
        .filter(|(distance, _)| *distance <= radius_km)
        .collect();
    located.sort_by(|(da, a), (db, b)| da.total_cmp(db).then_with(|| a.id.cmp(&b.id)));
    located.into_iter().map(|(_, article)| article).collect()
}
