//! Mirrors the search query into a `q` URL parameter so a view can be shared

use url::Url;

use crate::interface::SonderError;

pub const QUERY_PARAM: &str = "q";

/// The `q` parameter of `location`, if present and non-empty.
/// Unparseable locations yield `None`.
pub fn query_from_location(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    url.query_pairs()
        .find(|(name, _)| name == QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// `location` with `q` set to `query`, or removed when `query` is empty.
/// Other parameters keep their order.
pub fn location_with_query(location: &str, query: &str) -> Result<String, SonderError> {
    let mut url = Url::parse(location)?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| name != QUERY_PARAM)
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    if kept.is_empty() && query.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (name, value) in &kept {
            pairs.append_pair(name, value);
        }
        if !query.is_empty() {
            pairs.append_pair(QUERY_PARAM, query);
        }
    }
    Ok(url.into())
}
