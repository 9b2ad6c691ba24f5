//! Topic filters and templates.

/// Placeholder replaced by the edge id in configured topics
pub const EDGE_ID_PLACEHOLDER: &str = "{EdgeId}";

/// Whether `topic` matches the subscription `filter`
///
/// `+` matches exactly one level, a trailing `#` matches any number of
/// remaining levels (including none).
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Substitute the edge id into a configured topic
pub fn expand(template: &str, edge_id: &str) -> String {
    template.replace(EDGE_ID_PLACEHOLDER, edge_id)
}
