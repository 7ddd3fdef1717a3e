//! Active language and the string tables every user-facing label comes from.

use std::fmt;

use shared::domain::VerdictStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Zh,
}

impl Language {
    /// Toggle order.
    pub const ALL: [Language; 2] = [Language::En, Language::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Maps a POSIX or BCP-47 locale tag (`zh_CN.UTF-8`, `zh-Hans`, `en_US`)
    /// to a supported language. Anything not Chinese is English.
    pub fn from_locale_tag(tag: &str) -> Self {
        if tag.trim().to_ascii_lowercase().starts_with("zh") {
            Self::Zh
        } else {
            Self::En
        }
    }

    /// Reads the platform locale from `LC_ALL`, `LC_MESSAGES`, then `LANG`.
    pub fn from_ambient_locale(lookup: impl Fn(&str) -> Option<String>) -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .into_iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty() && value != "C" && value != "POSIX")
            .map(|tag| Self::from_locale_tag(&tag))
            .unwrap_or(Self::En)
    }

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn strings(self) -> &'static StringTable {
        match self {
            Self::En => &EN,
            Self::Zh => &ZH,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug)]
pub struct StringTable {
    pub app_title: &'static str,
    pub tagline: &'static str,
    pub input_label: &'static str,
    pub input_placeholder: &'static str,
    pub load_example: &'static str,
    pub submit: &'static str,
    pub submitting: &'static str,
    pub ready_title: &'static str,
    pub ready_hint: &'static str,
    pub analyzing: &'static str,
    pub no_citations_title: &'static str,
    pub no_citations_hint: &'static str,
    pub input_empty: &'static str,
    pub input_too_long: &'static str,
    pub audit_failed: &'static str,
    pub audit_timed_out: &'static str,
    pub audit_rejected: &'static str,
    pub audit_server_error: &'static str,
    pub audit_bad_response: &'static str,
    pub history_not_saved: &'static str,
    pub history_title: &'static str,
    pub no_history_title: &'static str,
    pub no_history_desc: &'static str,
    pub citations_count: &'static str,
    pub fake_detected: &'static str,
    pub clear_history: &'static str,
    pub clear_history_confirm: &'static str,
    pub history_cleared: &'static str,
    pub history_entry_missing: &'static str,
    pub busy: &'static str,
    pub source_match: &'static str,
    pub view_full_text: &'static str,
    pub confidence_suffix: &'static str,
    pub language_switched: &'static str,
    pub status_real: &'static str,
    pub status_fake: &'static str,
    pub status_mismatch: &'static str,
    pub status_unverified: &'static str,
    pub status_suspicious: &'static str,
    pub status_minor_error: &'static str,
    pub status_unknown: &'static str,
}

impl StringTable {
    pub fn verdict_label(&self, status: &VerdictStatus) -> &'static str {
        match status {
            VerdictStatus::Real => self.status_real,
            VerdictStatus::Fake => self.status_fake,
            VerdictStatus::Mismatch => self.status_mismatch,
            VerdictStatus::Unverified => self.status_unverified,
            VerdictStatus::Suspicious => self.status_suspicious,
            VerdictStatus::MinorError => self.status_minor_error,
            VerdictStatus::Unknown(_) => self.status_unknown,
        }
    }
}

static EN: StringTable = StringTable {
    app_title: "Veru",
    tagline: "AI Citation Auditor",
    input_label: "Source text (paste an AI-generated answer here)",
    input_placeholder: "Example: 'Smith (2023) argues that...'",
    load_example: "Load example",
    submit: "Start audit",
    submitting: "Verifying...",
    ready_title: "Ready to audit",
    ready_hint: "Paste text to begin",
    analyzing: "Running forensic analysis...",
    no_citations_title: "No citations detected",
    no_citations_hint: "Try text that contains references like \"Author (Year)\" or \"Title by Author\".",
    input_empty: "Enter some text to audit.",
    input_too_long: "Text is over the 5,000 character limit.",
    audit_failed: "Cannot reach the audit server. Check that the backend is running, then retry.",
    audit_timed_out: "The audit server did not answer in time. Please retry.",
    audit_rejected: "The audit server rejected the request.",
    audit_server_error: "The audit server hit an internal error. Please retry later.",
    audit_bad_response: "The audit server sent a response that could not be read.",
    history_not_saved: "The audit finished but could not be saved to history.",
    history_title: "Audit history",
    no_history_title: "No history yet",
    no_history_desc: "Finished audits will appear here.",
    citations_count: "citations",
    fake_detected: "Fake detected",
    clear_history: "Clear history",
    clear_history_confirm: "Delete all audit history? This cannot be undone.",
    history_cleared: "History cleared.",
    history_entry_missing: "No history entry with that id.",
    busy: "An audit is already running.",
    source_match: "Source match",
    view_full_text: "View full text",
    confidence_suffix: "conf.",
    language_switched: "Language: English",
    status_real: "REAL",
    status_fake: "FAKE",
    status_mismatch: "MISMATCH",
    status_unverified: "UNVERIFIED",
    status_suspicious: "SUSPICIOUS",
    status_minor_error: "MINOR ERROR",
    status_unknown: "UNKNOWN",
};

static ZH: StringTable = StringTable {
    app_title: "Veru",
    tagline: "AI 引用审计",
    input_label: "原文（在此粘贴 AI 生成的回答）",
    input_placeholder: "例如：'Smith (2023) 认为……'",
    load_example: "加载示例",
    submit: "开始审计",
    submitting: "验证中……",
    ready_title: "准备就绪",
    ready_hint: "粘贴文本即可开始",
    analyzing: "正在进行取证分析……",
    no_citations_title: "未检测到引用",
    no_citations_hint: "请尝试包含“作者 (年份)”或“标题 作者”等引用格式的文本。",
    input_empty: "请输入需要审计的文本。",
    input_too_long: "文本超过 5000 字符上限。",
    audit_failed: "无法连接到审计服务器，请检查后端是否启动后重试。",
    audit_timed_out: "审计服务器响应超时，请重试。",
    audit_rejected: "审计服务器拒绝了该请求。",
    audit_server_error: "审计服务器内部错误，请稍后重试。",
    audit_bad_response: "审计服务器返回的结果无法解析。",
    history_not_saved: "审计已完成，但未能保存到历史记录。",
    history_title: "审计历史",
    no_history_title: "暂无历史记录",
    no_history_desc: "完成的审计会显示在这里。",
    citations_count: "条引用",
    fake_detected: "发现伪造",
    clear_history: "清空历史",
    clear_history_confirm: "确定删除全部审计历史？此操作无法撤销。",
    history_cleared: "历史记录已清空。",
    history_entry_missing: "找不到该历史记录。",
    busy: "已有审计正在进行。",
    source_match: "来源匹配",
    view_full_text: "查看全文",
    confidence_suffix: "置信度",
    language_switched: "语言：中文",
    status_real: "真实",
    status_fake: "伪造",
    status_mismatch: "不符",
    status_unverified: "未验证",
    status_suspicious: "可疑",
    status_minor_error: "小错误",
    status_unknown: "未知",
};

/// Holds the active language for one session.
#[derive(Debug, Clone)]
pub struct Localization {
    language: Language,
}

impl Localization {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn strings(&self) -> &'static StringTable {
        self.language.strings()
    }

    /// Advances to the next supported language and returns it.
    pub fn toggle(&mut self) -> Language {
        self.language = self.language.next();
        self.language
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_cycles_in_fixed_order() {
        let mut localization = Localization::new(Language::En);
        assert_eq!(localization.toggle(), Language::Zh);
        assert_eq!(localization.toggle(), Language::En);
    }

    #[test]
    fn ambient_locale_prefers_lc_all() {
        let env = |name: &str| match name {
            "LC_ALL" => Some("zh_CN.UTF-8".to_string()),
            "LANG" => Some("en_US.UTF-8".to_string()),
            _ => None,
        };
        assert_eq!(Language::from_ambient_locale(env), Language::Zh);
    }

    #[test]
    fn ambient_locale_skips_c_locale_and_defaults_to_english() {
        let env = |name: &str| match name {
            "LC_ALL" => Some("C".to_string()),
            _ => None,
        };
        assert_eq!(Language::from_ambient_locale(env), Language::En);
        assert_eq!(Language::from_ambient_locale(|_| None), Language::En);
    }

    #[test]
    fn locale_tags_map_to_supported_languages() {
        assert_eq!(Language::from_locale_tag("zh-Hans"), Language::Zh);
        assert_eq!(Language::from_locale_tag("fr_FR"), Language::En);
        assert_eq!(Language::from_code(" ZH "), Some(Language::Zh));
        assert_eq!(Language::from_code("fr"), None);
    }

    #[test]
    fn unknown_verdict_uses_neutral_label() {
        let status = VerdictStatus::Unknown("ERROR".to_string());
        assert_eq!(Language::En.strings().verdict_label(&status), "UNKNOWN");
        assert_eq!(Language::Zh.strings().verdict_label(&status), "未知");
    }
}
