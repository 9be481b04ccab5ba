use url::Url;

/// Extract the candidate ticket id from a decoded QR payload.
///
/// An absolute `http(s)` URL yields the `ticketId` (or `ticket_id`) query
/// parameter when present, else the last non-empty path segment. Anything
/// else is used as-is, trimmed. `None` means no id could be read and the
/// scan should report an error instead of a lookup.
pub fn extract_ticket_id(decoded: &str) -> Option<String> {
    let text = decoded.trim();
    if text.is_empty() {
        return None;
    }

    if text.starts_with("http://") || text.starts_with("https://") {
        if let Ok(url) = Url::parse(text) {
            let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            let param = pairs
                .iter()
                .find(|(key, _)| key == "ticketId")
                .or_else(|| pairs.iter().find(|(key, _)| key == "ticket_id"));
            if let Some((_, value)) = param {
                if !value.is_empty() {
                    return non_empty(value.trim());
                }
            }

            if let Some(segment) = url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            {
                return non_empty(segment.trim());
            }
        }
    }

    Some(text.to_string())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_parameter_wins() {
        assert_eq!(
            extract_ticket_id("https://x.test/r?ticketId=T9"),
            Some("T9".to_string())
        );
        assert_eq!(
            extract_ticket_id("https://x.test/r?ticket_id=T9"),
            Some("T9".to_string())
        );
    }

    #[test]
    fn ticket_id_param_is_preferred_over_snake_case() {
        assert_eq!(
            extract_ticket_id("https://x.test/r?ticket_id=OTHER&ticketId=T9"),
            Some("T9".to_string())
        );
    }

    #[test]
    fn falls_back_to_last_path_segment() {
        assert_eq!(
            extract_ticket_id("https://x.test/tickets/T9"),
            Some("T9".to_string())
        );
        assert_eq!(
            extract_ticket_id("https://x.test/tickets/T9/"),
            Some("T9".to_string())
        );
    }

    #[test]
    fn bare_host_url_is_used_verbatim() {
        assert_eq!(
            extract_ticket_id("https://x.test/"),
            Some("https://x.test/".to_string())
        );
    }

    #[test]
    fn plain_text_is_trimmed_and_used_as_is() {
        assert_eq!(extract_ticket_id("  T-42  "), Some("T-42".to_string()));
        assert_eq!(extract_ticket_id("GA/0042"), Some("GA/0042".to_string()));
    }

    #[test]
    fn empty_payload_yields_nothing() {
        assert_eq!(extract_ticket_id(""), None);
        assert_eq!(extract_ticket_id("   "), None);
    }

    #[test]
    fn whitespace_only_param_yields_nothing() {
        assert_eq!(extract_ticket_id("https://x.test/r?ticketId=%20%20"), None);
    }
}
