// src/notify/message.rs
use crate::feed::DisclosureDetail;

/// Fields of one buyback alert, resolved from the detail record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPayload {
    pub index: u64,
    pub sender: String,
    pub subject: String,
    pub time: String,
    pub link: String,
}

impl AlertPayload {
    /// `link_base` is used when the detail carries no link of its own.
    pub fn from_detail(index: u64, detail: &DisclosureDetail, link_base: &str) -> Self {
        let link = detail
            .link
            .clone()
            .unwrap_or_else(|| format!("{link_base}{index}"));
        Self {
            index,
            sender: detail.sender_title.clone().unwrap_or_default(),
            subject: detail.subject.preferred().unwrap_or_default().to_string(),
            time: detail.time.clone().unwrap_or_default(),
            link,
        }
    }
}

/// Render the Telegram (legacy Markdown) text for one alert.
pub fn format_alert(a: &AlertPayload) -> String {
    let dash = |s: &str| {
        if s.trim().is_empty() {
            "—".to_string()
        } else {
            escape_markdown(s)
        }
    };
    format!(
        "📢 *PAY GERİ ALIMI BİLDİRİMİ*\n\n\
         🏢 *Şirket:* {}\n\
         📝 *Başlık:* {}\n\
         ⏰ *Tarih/Saat:* {}\n\
         🔗 *Link:* {}\n\
         🆔 *DisclosureIndex:* {}",
        dash(&a.sender),
        dash(&a.subject),
        dash(&a.time),
        escape_markdown(&a.link),
        a.index
    )
}

/// Backslash-escape the characters legacy Markdown treats as entity markers.
pub fn escape_markdown(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
