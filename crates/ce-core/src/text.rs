use crate::Event;

/// Escape markup-significant characters in user-entered text.
pub fn sanitize_input(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

/// Events whose title or description contains `query`, ignoring case. A blank query
/// keeps every event.
pub fn search_events(events: &[Event], query: &str) -> Vec<Event> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return events.to_vec();
    }
    events
        .iter()
        .filter(|e| format!("{} {}", e.title, e.description).to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, title: &str, description: &str) -> Event {
        Event {
            id: id.into(),
            title: title.into(),
            date: crate::TBA.into(),
            location: String::new(),
            description: description.into(),
            image: None,
        }
    }

    #[test]
    fn escapes_tags_and_ampersand() {
        let s = sanitize_input("<b>Tom & Jerry</b>");
        assert_eq!(s, "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
        assert!(!sanitize_input("<script>alert(1)</script>").contains("<script>"));
    }

    #[test]
    fn quotes_and_backticks() {
        assert_eq!(sanitize_input(r#"'a' "b" `c`"#), "&#39;a&#39; &quot;b&quot; &#96;c&#96;");
        assert_eq!(sanitize_input("plain"), "plain");
    }

    #[test]
    fn search_matches_title_or_description_ignoring_case() {
        let events = [
            event("e1", "Spring FAIR", "Stalls on the quad"),
            event("e2", "Chess night", "Bring a board"),
            event("e3", "Film club", "Documentary screening"),
        ];
        let ids = |q: &str| search_events(&events, q).into_iter().map(|e| e.id).collect::<Vec<_>>();

        assert_eq!(ids("fair"), ["e1"]);
        assert_eq!(ids("BOARD"), ["e2"]);
        assert_eq!(ids("night bring"), ["e2"]);
        assert!(ids("karaoke").is_empty());
        assert_eq!(ids(""), ["e1", "e2", "e3"]);
        assert_eq!(ids("   "), ["e1", "e2", "e3"]);
    }
}
