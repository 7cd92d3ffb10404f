use crate::models::event::FirewallEvent;

/// AbuseIPDB rejects comments longer than this.
pub const MAX_COMMENT_CHARS: usize = 1024;

/// Report comment describing the firewall event, with the operator's
/// custom message appended.
pub fn build_comment(event: &FirewallEvent, custom_message: &str) -> String {
    let comment = format!(
        "The IP has triggered Cloudflare WAF. action: {} source: {} clientAsn: {} \
         clientASNDescription: {} clientCountryName: {} clientIP: {} \
         clientRequestHTTPMethodName: {} clientRequestHTTPProtocol: {} \
         clientRequestPath: {} clientRequestQuery: {} datetime: {} rayName: {} \
         ruleId: {} userAgent: {}. {}",
        event.action,
        event.source,
        event.client_asn,
        event.client_asn_description,
        event.client_country,
        event.client_ip,
        event.method,
        event.protocol,
        event.path,
        event.query,
        event.datetime,
        event.ray_name,
        event.rule_id,
        event.user_agent,
        custom_message,
    );
    truncate_chars(comment.trim_end(), MAX_COMMENT_CHARS)
}

/// First `max` characters of `s` (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> FirewallEvent {
        FirewallEvent {
            action: "block".to_string(),
            source: "firewallManaged".to_string(),
            client_ip: "203.0.113.7".to_string(),
            client_asn: "64500".to_string(),
            client_asn_description: "EXAMPLE-NET".to_string(),
            client_country: "NL".to_string(),
            method: "GET".to_string(),
            protocol: "HTTP/1.1".to_string(),
            path: "/.env".to_string(),
            query: "".to_string(),
            datetime: "2024-05-01T10:00:00Z".to_string(),
            ray_name: "8a1b2c".to_string(),
            rule_id: "r1".to_string(),
            user_agent: "zgrab/0.x".to_string(),
        }
    }

    #[test]
    fn test_comment_is_deterministic_and_complete() {
        let comment = build_comment(&event(), "");
        assert_eq!(comment, build_comment(&event(), ""));
        assert!(comment.starts_with("The IP has triggered Cloudflare WAF. action: block "));
        assert!(comment.contains("clientIP: 203.0.113.7"));
        assert!(comment.contains("clientRequestPath: /.env"));
        assert!(comment.ends_with("userAgent: zgrab/0.x."));
    }

    #[test]
    fn test_custom_message_is_appended() {
        let comment = build_comment(&event(), "Reported by example.org");
        assert!(comment.ends_with("userAgent: zgrab/0.x. Reported by example.org"));
    }

    #[test]
    fn test_comment_is_capped() {
        let mut e = event();
        e.path = "/ä".repeat(2000);
        let comment = build_comment(&e, "");
        assert_eq!(comment.chars().count(), MAX_COMMENT_CHARS);
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("ääää", 2), "ää");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }
}
