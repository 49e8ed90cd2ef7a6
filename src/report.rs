use serde_json::Value;

use crate::client::QueryError;
use crate::markup::{parse_analysis, Block, Document, SectionKind};
use crate::response::{AnalysisResponse, QueryDetails};

/// Analysis text containing one of these is a backend-side failure report.
const ERROR_MARKERS: [&str; 2] = ["Error:", "Error getting AI response"];

const EMPTY_FIELD: &str = "(none)";

pub fn build_outcome(outcome: &Result<AnalysisResponse, QueryError>) -> Document {
    match outcome {
        Ok(response) => build_report(response),
        Err(e) => build_error(&e.to_string()),
    }
}

pub fn build_report(response: &AnalysisResponse) -> Document {
    let analysis = response.analysis.as_deref().unwrap_or_default();
    if is_error_report(analysis) {
        return build_error(analysis);
    }

    let mut blocks = vec![Block::Section {
        kind: SectionKind::Analysis,
        title: "Analysis".to_string(),
        blocks: parse_analysis(analysis),
    }];

    if let Some(details) = &response.query_details {
        blocks.push(focus_section(details));
    }

    if let Some(raw) = &response.raw_data {
        blocks.push(raw_data_section(raw));
    }

    Document::new(blocks)
}

pub fn is_error_report(analysis: &str) -> bool {
    ERROR_MARKERS.iter().any(|marker| analysis.contains(marker))
}

pub fn build_error(message: &str) -> Document {
    let mut lines = parse_analysis(message);
    if lines.is_empty() {
        lines.push(Block::Paragraph(Vec::new()));
    }
    Document::new(vec![Block::Section {
        kind: SectionKind::Error,
        title: "Error".to_string(),
        blocks: lines,
    }])
}

pub fn focus_section(details: &QueryDetails) -> Block {
    let mut fields = vec![
        field("Focus", &details.query_focus),
        field("Data points", &details.data_points_joined()),
    ];

    if !details.time_frame.trim().is_empty() {
        fields.push(field("Time frame", &details.time_frame));
    }
    if !details.relevant_columns.is_empty() {
        fields.push(field("Relevant columns", &details.relevant_columns.join(", ")));
    }
    if !details.filter_criteria.is_empty() {
        fields.push(field("Filters", &details.filter_criteria.join(", ")));
    }

    Block::Section {
        kind: SectionKind::Focus,
        title: "Query focus".to_string(),
        blocks: fields,
    }
}

pub fn raw_data_section(raw: &Value) -> Block {
    Block::Section {
        kind: SectionKind::RawData,
        title: "Raw data".to_string(),
        blocks: vec![Block::Preformatted(pretty_json(raw))],
    }
}

/// Two-space indented JSON. Keys follow serde_json's default `Map`, which is
/// sorted unless some dependency enables the `preserve_order` feature.
pub fn pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn field(label: &str, value: &str) -> Block {
    let value = value.trim();
    Block::Field {
        label: label.to_string(),
        value: if value.is_empty() { EMPTY_FIELD } else { value }.to_string(),
    }
}
