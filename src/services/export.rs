//! CSV export of board feedback
//!
//! One row per feedback item under the header `Date,Category,Content,Author`.
//! The content column is always quoted; the other columns only when they
//! contain a comma, a quote or a line break.

use chrono::NaiveDate;

use crate::models::FeedbackWithCategory;

const HEADER: &str = "Date,Category,Content,Author";

/// A rendered export ready to be served as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub filename: String,
    pub content: String,
}

/// `{slug}-feedback-{YYYY-MM-DD}.csv`
pub fn export_filename(slug: &str, date: NaiveDate) -> String {
    format!("{}-feedback-{}.csv", slug, date.format("%Y-%m-%d"))
}

/// Render feedback rows in the order given
pub fn feedback_csv(items: &[FeedbackWithCategory]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(HEADER.to_string());

    for item in items {
        let date = item.feedback.created_at.format("%Y-%m-%d").to_string();
        let category = item.category_name.as_deref().unwrap_or("Uncategorized");
        let author = item
            .feedback
            .author_name
            .as_deref()
            .filter(|a| !a.is_empty())
            .unwrap_or("Anonymous");

        lines.push(format!(
            "{},{},{},{}",
            escape_field(&date),
            escape_field(category),
            quote_field(&item.feedback.description),
            escape_field(author)
        ));
    }

    lines.join("\n")
}

/// Quote a field unconditionally, doubling embedded quotes
fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Quote a field only when it would otherwise break the row
fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        quote_field(value)
    } else {
        value.to_string()
    }
}
