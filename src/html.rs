use crate::console::{Content, ConsoleView, LogMessage, MessageKind, Panel};
use crate::markup::{Block, Document, Span};
use crate::report;

/// Simple HTML escaping
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn render_spans(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Span::Text(t) => escape(t),
            Span::Strong(t) => format!("<strong>{}</strong>", escape(t)),
        })
        .collect()
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Paragraph(spans) => format!("<p>{}</p>", render_spans(spans)),
        Block::Header(text) => format!(
            "<p><strong class=\"section-header\">{}</strong></p>",
            escape(text)
        ),
        Block::Field { label, value } => format!(
            "<p><span class=\"field-label\">{}:</span> {}</p>",
            escape(label),
            escape(value)
        ),
        Block::Preformatted(text) => format!(
            "<pre class=\"monospace\" style=\"font-family: monospace; white-space: pre;\">{}</pre>",
            escape(text)
        ),
        Block::Section { kind, title, blocks } => {
            let inner: String = blocks.iter().map(render_block).collect();
            format!(
                "<div class=\"report-section {}\"><h4>{}</h4>{}</div>",
                kind.css_class(),
                escape(title),
                inner
            )
        }
    }
}

pub fn render_document(doc: &Document) -> String {
    doc.blocks.iter().map(render_block).collect()
}

pub fn render_message(message: &LogMessage) -> String {
    let body = match &message.content {
        Content::Text(text) => escape(text),
        Content::Rich(doc) => render_document(doc),
    };

    let id_attr = if message.kind == MessageKind::Loading {
        format!(" id=\"loading-{}\"", message.id)
    } else {
        String::new()
    };

    format!(
        "<div class=\"message {}\" data-id=\"{}\"{}>{}</div>",
        message.kind.css_class(),
        message.id,
        id_attr,
        body
    )
}

fn render_panel_body(view: &ConsoleView, panel: Panel) -> String {
    match panel {
        Panel::Conversation => {
            let messages: String = view.messages().iter().map(render_message).collect();
            format!("<div id=\"chat-messages\" class=\"chat-messages\">{}</div>", messages)
        }
        Panel::Details => match view.latest_details() {
            Some(details) => render_block(&report::focus_section(details)),
            None => "<p class=\"empty\">No query details yet.</p>".to_string(),
        },
        Panel::RawData => match view.latest_raw_data() {
            Some(raw) => render_block(&report::raw_data_section(raw)),
            None => "<p class=\"empty\">No raw data yet.</p>".to_string(),
        },
    }
}

/// Renders the whole console: tab buttons, panels and the loading indicator.
pub fn render_console(view: &ConsoleView) -> String {
    let states = view.panel_states();

    let buttons: String = states
        .iter()
        .map(|(panel, active)| {
            format!(
                "<button id=\"tab-{}\" class=\"tab-button{}\" data-panel=\"{}\">{}</button>",
                panel.id(),
                if *active { " active" } else { "" },
                panel.id(),
                escape(panel.label())
            )
        })
        .collect();

    let panels: String = states
        .iter()
        .map(|(panel, active)| {
            format!(
                "<div id=\"panel-{}\" class=\"panel{}\" style=\"display: {};\">{}</div>",
                panel.id(),
                if *active { " active" } else { "" },
                if *active { "block" } else { "none" },
                render_panel_body(view, *panel)
            )
        })
        .collect();

    format!(
        "<div class=\"tabs\">{}</div>{}<div id=\"loading-spinner\" class=\"loading-spinner\" style=\"display: {};\"></div>",
        buttons,
        panels,
        if view.is_loading() { "block" } else { "none" }
    )
}
