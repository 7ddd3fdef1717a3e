use chrono::{DateTime, Local};
use client_core::{StringTable, ValidationError};
use shared::domain::{AuditResult, HistoryItem};

const CITATION_PREVIEW_CHARS: usize = 120;
const HISTORY_PREVIEW_CHARS: usize = 60;

pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}

pub fn validation_text(strings: &StringTable, err: &ValidationError) -> &'static str {
    match err {
        ValidationError::EmptyInput => strings.input_empty,
        ValidationError::TooLong { .. } => strings.input_too_long,
    }
}

/// One verdict card: label, citation, confidence, message and the matched
/// source when the service found one.
pub fn render_result(strings: &StringTable, result: &AuditResult) -> String {
    let mut header = format!(
        "[{}] {}",
        strings.verdict_label(&result.status),
        truncate_chars(&result.citation_text, CITATION_PREVIEW_CHARS)
    );
    if let Some(percent) = result.confidence_percent() {
        header.push_str(&format!("  ({percent}% {})", strings.confidence_suffix));
    }

    let mut lines = vec![header];
    if !result.source.is_empty() {
        lines.push(format!("    {}", result.source));
    }
    if !result.message.is_empty() {
        lines.push(format!("    {}", result.message));
    }
    if let Some(metadata) = &result.metadata {
        if let Some(title) = &metadata.title {
            let year = metadata
                .year
                .as_deref()
                .map(|y| format!(" ({y})"))
                .unwrap_or_default();
            lines.push(format!("    {}: {title}{year}", strings.source_match));
        }
        if let Some(url) = &metadata.oa_url {
            lines.push(format!("    {}: {url}", strings.view_full_text));
        }
    }
    lines.join("\n")
}

/// Renders a finished session. An empty list shows the "no citations" hint.
pub fn render_results(strings: &StringTable, results: &[AuditResult]) -> String {
    if results.is_empty() {
        return format!("{}\n{}", strings.no_citations_title, strings.no_citations_hint);
    }
    results
        .iter()
        .map(|result| render_result(strings, result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_timestamp(timestamp_millis: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_millis)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| timestamp_millis.to_string())
}

pub fn render_history_line(strings: &StringTable, item: &HistoryItem) -> String {
    let mut line = format!(
        "{}  {}  {} {}",
        item.id,
        format_timestamp(item.timestamp),
        item.results.len(),
        strings.citations_count
    );
    if item.has_fake() {
        line.push_str(&format!("  [{}]", strings.fake_detected));
    }
    let preview = item.input_text.split_whitespace().collect::<Vec<_>>().join(" ");
    line.push_str(&format!("\n    {}", truncate_chars(&preview, HISTORY_PREVIEW_CHARS)));
    line
}

pub fn render_history(strings: &StringTable, items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return format!("{}\n{}", strings.no_history_title, strings.no_history_desc);
    }
    let mut out = vec![strings.history_title.to_string()];
    out.extend(items.iter().map(|item| render_history_line(strings, item)));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::Language;
    use shared::domain::{CitationMetadata, HistoryId, VerdictStatus};

    fn fake_result() -> AuditResult {
        AuditResult {
            citation_text: "Smith (2023)".to_string(),
            status: VerdictStatus::Fake,
            source: "None".to_string(),
            confidence: 0.0,
            message: "No matching publication found".to_string(),
            metadata: None,
        }
    }

    #[test]
    fn verdict_card_uses_localized_label_and_hides_zero_confidence() {
        let en = render_result(Language::En.strings(), &fake_result());
        assert!(en.starts_with("[FAKE] Smith (2023)"));
        assert!(!en.contains('%'));

        let zh = render_result(Language::Zh.strings(), &fake_result());
        assert!(zh.starts_with("[伪造] Smith (2023)"));
    }

    #[test]
    fn verdict_card_shows_confidence_and_source_match() {
        let result = AuditResult {
            confidence: 0.87,
            metadata: Some(CitationMetadata {
                title: Some("An argument for basic emotions".to_string()),
                year: Some("1992".to_string()),
                oa_url: Some("https://example.org/ekman.pdf".to_string()),
                ..CitationMetadata::default()
            }),
            ..AuditResult::new("Ekman (1992)", VerdictStatus::Real)
        };
        let card = render_result(Language::En.strings(), &result);
        assert!(card.contains("(87% conf.)"));
        assert!(card.contains("Source match: An argument for basic emotions (1992)"));
        assert!(card.contains("View full text: https://example.org/ekman.pdf"));
    }

    #[test]
    fn long_citations_are_cut() {
        let result = AuditResult::new("a".repeat(300), VerdictStatus::Unverified);
        let card = render_result(Language::En.strings(), &result);
        let first_line = card.lines().next().unwrap_or_default();
        assert!(first_line.ends_with("..."));
        assert_eq!(truncate_chars("引用引用", 2), "引用...");
    }

    #[test]
    fn unknown_status_renders_fallback_label() {
        let result = AuditResult::new("Doe (2001)", VerdictStatus::Unknown("ERROR".to_string()));
        let card = render_result(Language::En.strings(), &result);
        assert!(card.starts_with("[UNKNOWN]"));
    }

    #[test]
    fn empty_results_show_hint() {
        let strings = Language::En.strings();
        let text = render_results(strings, &[]);
        assert!(text.starts_with(strings.no_citations_title));
    }

    #[test]
    fn history_line_flags_fake_sessions() {
        let strings = Language::En.strings();
        let item = HistoryItem {
            id: HistoryId::from_timestamp_millis(1_700_000_000_000),
            timestamp: 1_700_000_000_000,
            input_text: "Smith (2023)\nclaims X.".to_string(),
            results: vec![fake_result()],
        };
        let line = render_history_line(strings, &item);
        assert!(line.starts_with("0001700000000000"));
        assert!(line.contains("1 citations"));
        assert!(line.contains("[Fake detected]"));
        assert!(line.contains("Smith (2023) claims X."));

        assert!(render_history(strings, &[]).starts_with(strings.no_history_title));
    }
}
