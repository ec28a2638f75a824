//! Detail panel content for one selected record.

use serde::Serialize;
use serde_json::Value;

use crate::config::DatasetSchema;
use crate::data::record::{value_text, Columns, CrashRecord};
use crate::search::result::photo_link;

pub const FALLBACK_TITLE: &str = "Crash Details";

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    Fatal,
    Injury,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fatal => "Fatal",
            Self::Injury => "Injury",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Photo {
    pub url: String,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailsView {
    pub title: String,
    pub badges: Vec<Badge>,
    pub photo: Option<Photo>,
    pub location: String,
    pub date: String,
    /// e.g. `"1 Killed 2 Injured"`; empty when nobody was hurt.
    pub casualties: String,
    pub news_link: Option<String>,
    pub raw: Columns,
}

impl DetailsView {
    pub fn from_record(record: &CrashRecord, schema: &DatasetSchema) -> Self {
        let text = |column: &str| record.text(column).unwrap_or_default();
        let deaths = record.number(&schema.deaths_column).filter(|n| *n > 0.0);
        let injuries = record.number(&schema.injuries_column).filter(|n| *n > 0.0);

        let mut badges = Vec::new();
        if deaths.is_some() {
            badges.push(Badge::Fatal);
        }
        if injuries.is_some() {
            badges.push(Badge::Injury);
        }

        let description = strip_timestamp_prefix(&text(&schema.description_column)).trim().to_string();
        let title = if description.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            description
        };

        let photo = photo_link(record.column(&schema.photo_column)).map(|url| Photo {
            url,
            caption: present(record.column(&schema.photo_caption_column)),
        });

        let casualties = [
            deaths.map(|n| format!("{} Killed", format_count(n))),
            injuries.map(|n| format!("{} Injured", format_count(n))),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");

        Self {
            title,
            badges,
            photo,
            location: format!("{}, {}", text(&schema.location_column), text(&schema.municipality_column)),
            date: text(&schema.date_column),
            casualties,
            news_link: present(record.column(&schema.news_column)),
            raw: record.to_properties(),
        }
    }

    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if !self.badges.is_empty() {
            let labels: Vec<String> = self.badges.iter().map(|b| format!("[{}]", b.label())).collect();
            out.push_str(&labels.join(" "));
            out.push('\n');
        }
        out.push_str(&self.title);
        out.push_str("\n\n");
        if let Some(photo) = &self.photo {
            out.push_str(&format!("Photo: {}\n", photo.url));
            if let Some(caption) = &photo.caption {
                out.push_str(&format!("       {caption}\n"));
            }
        }
        out.push_str(&format!("Location: {}\n", self.location));
        out.push_str(&format!("Date: {}\n", self.date));
        out.push_str(&format!("Casualties: {}\n", self.casualties));
        if let Some(link) = &self.news_link {
            out.push_str(&format!("News: {link}\n"));
        }
        out.push_str("\nRaw Data\n");
        out.push_str(
            &serde_json::to_string_pretty(&Value::Object(self.raw.clone())).unwrap_or_default(),
        );
        out.push('\n');
        out
    }
}

/// Drops a leading `[*] Mon D HHMM:` tweet timestamp (month name case-insensitive).
pub fn strip_timestamp_prefix(description: &str) -> &str {
    fn digits(s: &str) -> Option<&str> {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        (end > 0).then(|| &s[end..])
    }
    fn whitespace(s: &str) -> Option<&str> {
        let rest = s.trim_start();
        (rest.len() < s.len()).then_some(rest)
    }

    fn parse(description: &str) -> Option<&str> {
        let rest = description.strip_prefix('*').unwrap_or(description).trim_start();
        let month = rest.get(..3)?;
        if !MONTHS.iter().any(|m| m.eq_ignore_ascii_case(month)) {
            return None;
        }
        let rest = whitespace(&rest[3..])?;
        let rest = whitespace(digits(rest)?)?;
        let rest = digits(rest)?;
        Some(rest.strip_prefix(':')?.trim_start())
    }

    parse(description).unwrap_or(description)
}

fn present(value: Option<&Value>) -> Option<String> {
    let text = value_text(value?);
    let trimmed = text.trim();
    (!trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("n/a")).then(|| trimmed.to_string())
}

fn format_count(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_tweet_timestamp() {
        assert_eq!(strip_timestamp_prefix("* Mar 4 1530: Driver hit cyclist"), "Driver hit cyclist");
        assert_eq!(strip_timestamp_prefix("oct 12 0900:Pedestrian struck"), "Pedestrian struck");
        assert_eq!(strip_timestamp_prefix("March 4 1530: kept"), "March 4 1530: kept");
        assert_eq!(strip_timestamp_prefix("Mar 4: kept"), "Mar 4: kept");
    }

    #[test]
    fn builds_view_from_record() {
        let record: CrashRecord = serde_json::from_value(json!({
            "VZ Tweet Description ( * = Corrected/Edited)": "Jan 2 1100: Two cars collided",
            "Photo link": "https://example.org/a.jpg",
            "Photo caption": "n/a",
            "Example news source": "https://news.example.org/1",
            "Intersection or street block": "Kingsway & Knight",
            "Municipality": "Vancouver",
            "Date (DD/MM/YY)": "2021-01-02",
            "Deaths": 1,
            "Injuries": 0
        }))
        .unwrap();

        let view = DetailsView::from_record(&record, &DatasetSchema::default());
        assert_eq!(view.title, "Two cars collided");
        assert_eq!(view.badges, vec![Badge::Fatal]);
        assert_eq!(view.photo, Some(Photo { url: "https://example.org/a.jpg".to_string(), caption: None }));
        assert_eq!(view.location, "Kingsway & Knight, Vancouver");
        assert_eq!(view.casualties, "1 Killed");
        assert_eq!(view.news_link.as_deref(), Some("https://news.example.org/1"));
        assert!(view.render_text().contains("Casualties: 1 Killed"));
    }

    #[test]
    fn empty_description_uses_fallback_title() {
        let record: CrashRecord = serde_json::from_value(json!({"Photo link": "n/a"})).unwrap();
        let view = DetailsView::from_record(&record, &DatasetSchema::default());
        assert_eq!(view.title, FALLBACK_TITLE);
        assert!(view.badges.is_empty());
        assert!(view.photo.is_none());
        assert_eq!(view.casualties, "");
    }
}
