//! Event-name sanitization applied to every name before it reaches the
//! collector.
//!
//! Output contains only `[a-z0-9_]`, never two underscores in a row, and
//! never a leading or trailing underscore.

/// Normalise a raw event name into collector-safe snake case.
///
/// `"Form Submit!!"` becomes `"form_submit"`. The function is idempotent.
pub fn sanitize_event_name(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut previous_underscore = false;

    for ch in lowered.chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '_'
        };
        if ch == '_' {
            if previous_underscore {
                continue;
            }
            previous_underscore = true;
        } else {
            previous_underscore = false;
        }
        out.push(ch);
    }

    out.trim_matches('_').to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn is_clean(name: &str) -> bool {
        name.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !name.contains("__")
            && !name.starts_with('_')
            && !name.ends_with('_')
    }

    #[test]
    fn test_basic_names() {
        assert_eq!(sanitize_event_name("Form Submit!!"), "form_submit");
        assert_eq!(sanitize_event_name("form_submit"), "form_submit");
        assert_eq!(sanitize_event_name("  Phone Click  "), "phone_click");
        assert_eq!(sanitize_event_name("Scroll-Depth 75%"), "scroll_depth_75");
    }

    #[test]
    fn test_collapses_separator_runs() {
        assert_eq!(sanitize_event_name("a___b"), "a_b");
        assert_eq!(sanitize_event_name("a - / b"), "a_b");
        assert_eq!(sanitize_event_name("__lead__"), "lead");
    }

    #[test]
    fn test_non_ascii_becomes_separator() {
        assert_eq!(sanitize_event_name("Café Réservé"), "caf_r_serv");
        assert_eq!(sanitize_event_name("démo"), "d_mo");
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(sanitize_event_name(""), "");
        assert_eq!(sanitize_event_name("!!!"), "");
        assert_eq!(sanitize_event_name("   "), "");
    }

    #[test]
    fn test_idempotent_and_clean() {
        let samples = [
            "Form Submit!!",
            "CALENDLY.event_scheduled",
            "Outbound  Link -- Click",
            "__x__y__",
            "tel:+1 (555) 010-0000",
            "Ünïcödé Névent",
            "a\tb\nc",
            "2024 Q3 / Launch",
            "_",
            "ok",
        ];
        for sample in samples {
            let once = sanitize_event_name(sample);
            assert_eq!(sanitize_event_name(&once), once, "not idempotent: {sample}");
            assert!(is_clean(&once), "unclean output {once:?} for {sample:?}");
        }
    }
}
