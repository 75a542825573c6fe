//! Notification text extraction.

use crate::event::RawNotification;

/// Combine a notification's title and body into one text payload.
///
/// The expanded body wins over the short body whenever it is present
/// and non-empty, even when both carry the same text; a notification
/// with neither body falls back to the empty string. Title and body
/// are joined with a single line break and the result is trimmed of
/// leading and trailing whitespace.
pub fn extract(event: &RawNotification) -> String {
    let body = match event.expanded_text.as_deref() {
        Some(expanded) if !expanded.is_empty() => expanded,
        _ => event.text.as_deref().unwrap_or(""),
    };
    let title = event.title.as_deref().unwrap_or("");

    format!("{}\n{}", title, body).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        title: Option<&str>,
        text: Option<&str>,
        expanded_text: Option<&str>,
    ) -> RawNotification {
        RawNotification {
            source_id: "kz.kaspi.mobile".to_string(),
            title: title.map(String::from),
            text: text.map(String::from),
            expanded_text: expanded_text.map(String::from),
        }
    }

    #[test]
    fn test_expanded_text_wins_over_short_text() {
        let e = event(
            Some("Kaspi Bank"),
            Some("short"),
            Some("Payment of 1500 KZT to Shop"),
        );
        assert_eq!(extract(&e), "Kaspi Bank\nPayment of 1500 KZT to Shop");
    }

    #[test]
    fn test_falls_back_to_short_text() {
        let e = event(Some(""), Some("5000 KZT debited"), None);
        assert_eq!(extract(&e), "5000 KZT debited");
    }

    #[test]
    fn test_empty_expanded_text_falls_back() {
        let e = event(Some("Bank"), Some("1000 KZT"), Some(""));
        assert_eq!(extract(&e), "Bank\n1000 KZT");
    }

    #[test]
    fn test_expanded_wins_even_when_identical() {
        let e = event(Some("Bank"), Some("same"), Some("same"));
        assert_eq!(extract(&e), "Bank\nsame");
    }

    #[test]
    fn test_no_body_at_all() {
        let e = event(Some("Bank"), None, None);
        assert_eq!(extract(&e), "Bank");
    }

    #[test]
    fn test_fully_empty_event() {
        let e = event(None, None, None);
        assert_eq!(extract(&e), "");
    }

    #[test]
    fn test_result_is_trimmed() {
        let e = event(Some("  Bank  "), Some("  paid  "), None);
        assert_eq!(extract(&e), "Bank  \n  paid");
    }
}
