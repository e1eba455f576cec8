/// Derives a registry id from a display name
///
/// The name is lower-cased and every space becomes an underscore, so
/// `"Web Scraper"` is stored as `web_scraper`. Other characters are kept.
pub fn slug_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Returns true when a slug can serve as an id in a URL path
///
/// An all-space name would produce an id made only of underscores, which
/// still routes, so only an empty result is rejected here.
pub fn is_usable_slug(slug: &str) -> bool {
    !slug.is_empty() && !slug.contains('/')
}


#[cfg(test)]
mod prop_tests;
