use iced::{
    widget::{
        button, column, container, rich_text, row, scrollable, span, text, text_input,
        text_input::Id,
    },
    clipboard,
    event::{self, Event as IcedEvent},
    font,
    keyboard::{self, Key},
    time, window, Color, Element, Font, Length, Size, Subscription, Task, Theme,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use query_console::client::{QueryClient, QueryError};
use query_console::config::Config;
use query_console::console::{
    Content, ConsoleView, LogMessage, MessageId, MessageKind, Panel, Rejected,
};
use query_console::{html, logging};
use query_console::markup::{Block, Document, SectionKind, Span};
use query_console::report;
use query_console::response::AnalysisResponse;

const BOLD: Font = Font {
    weight: font::Weight::Bold,
    ..Font::MONOSPACE
};

const ERROR_COLOR: Color = Color::from_rgb(0.93, 0.38, 0.42);

const LOADING_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn main() -> iced::Result {
    if let Err(e) = logging::init() {
        eprintln!("Warning: could not initialise logging: {}", e);
    }

    let config = Config::load();
    tracing::info!(backend = %config.backend.base_url, "starting query console");

    let window_settings = window::Settings {
        size: Size::new(config.window.width as f32, config.window.height as f32),
        min_size: Some(Size::new(
            config.window.min_width as f32,
            config.window.min_height as f32,
        )),
        position: window::Position::Centered,
        ..Default::default()
    };

    iced::application("Query Console", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window_settings)
        .default_font(Font::MONOSPACE)
        .run_with(move || App::new(config))
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    Settled(MessageId, Result<AnalysisResponse, QueryError>),
    SwitchPanel(Panel),
    ClearLog,
    Escape,
    Tick,
    CopyOutput,
    CopyHtml,
}

struct App {
    console: ConsoleView,
    client: Arc<QueryClient>,
    cancel: Option<CancellationToken>,
    loading_frame: usize,
    input_id: Id,
    log_id: scrollable::Id,
}

impl App {
    fn new(config: Config) -> (Self, Task<Message>) {
        let input_id = Id::unique();

        let app = App {
            console: ConsoleView::new(),
            client: Arc::new(QueryClient::from_config(&config.backend)),
            cancel: None,
            loading_frame: 0,
            input_id: input_id.clone(),
            log_id: scrollable::Id::unique(),
        };

        (app, text_input::focus(input_id))
    }

    fn scroll_to_end(&self) -> Task<Message> {
        scrollable::snap_to(self.log_id.clone(), scrollable::RelativeOffset::END)
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.console.set_input(value);
                Task::none()
            }
            Message::Submit => match self.console.submit() {
                Ok(submission) => {
                    let token = CancellationToken::new();
                    self.cancel = Some(token.clone());
                    self.loading_frame = 0;

                    let client = self.client.clone();
                    let dispatch = Task::future(async move {
                        let outcome = client.submit(&submission.query, token).await;
                        Message::Settled(submission.id, outcome)
                    });

                    Task::batch([dispatch, self.scroll_to_end()])
                }
                Err(Rejected::Empty) => {
                    alert_empty_query();
                    Task::none()
                }
                Err(Rejected::Busy) => Task::none(),
            },
            Message::Settled(id, outcome) => {
                if self.console.settle(id, outcome) {
                    self.cancel = None;
                }
                Task::batch([self.scroll_to_end(), text_input::focus(self.input_id.clone())])
            }
            Message::SwitchPanel(panel) => {
                self.console.switch_panel(panel);
                Task::none()
            }
            Message::ClearLog => {
                self.console.clear_log();
                Task::none()
            }
            Message::Escape => match &self.cancel {
                Some(token) => {
                    token.cancel();
                    Task::none()
                }
                None if self.console.can_close() => iced::exit(),
                None => Task::none(),
            },
            Message::Tick => {
                if self.console.is_loading() {
                    self.loading_frame = (self.loading_frame + 1) % LOADING_FRAMES.len();
                }
                Task::none()
            }
            Message::CopyOutput => match self.last_answer() {
                Some(doc) => clipboard::write(doc.plain_text()),
                None => Task::none(),
            },
            Message::CopyHtml => clipboard::write(html::render_console(&self.console)),
        }
    }

    fn last_answer(&self) -> Option<&Document> {
        self.console
            .messages()
            .iter()
            .rev()
            .find_map(|m| match (&m.kind, &m.content) {
                (MessageKind::Answer, Content::Rich(doc)) => Some(doc),
                _ => None,
            })
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.console.is_loading() {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            if let IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                key: Key::Named(keyboard::key::Named::Escape),
                ..
            }) = event
            {
                Some(Message::Escape)
            } else {
                None
            }
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let tabs = row(self.console.panel_states().into_iter().map(|(panel, active)| {
            let style: fn(&Theme, button::Status) -> button::Style = if active {
                button::primary
            } else {
                button::secondary
            };
            button(text(panel.label()).size(14))
                .on_press(Message::SwitchPanel(panel))
                .padding(8)
                .style(style)
                .into()
        }))
        .spacing(6);

        let mut input = text_input("Ask about your data...", self.console.input())
            .padding(15)
            .size(18)
            .id(self.input_id.clone());
        if !self.console.is_loading() {
            input = input
                .on_input(Message::InputChanged)
                .on_submit(Message::Submit);
        }

        let send = button(text("Send").size(15))
            .padding(12)
            .on_press_maybe((!self.console.is_loading()).then_some(Message::Submit));

        let panel: Element<Message> = match self.console.active_panel() {
            Panel::Conversation => self.view_log(),
            Panel::Details => match self.console.latest_details() {
                Some(details) => view_block(&report::focus_section(details)),
                None => text("No query details yet.").size(15).into(),
            },
            Panel::RawData => match self.console.latest_raw_data() {
                Some(raw) => scrollable(view_block(&report::raw_data_section(raw)))
                    .height(Length::Fill)
                    .into(),
                None => text("No raw data yet.").size(15).into(),
            },
        };

        let mut footer = row![].spacing(10);
        if self.console.is_loading() {
            footer = footer.push(text("[Esc] cancel").size(13));
        } else if !self.console.messages().is_empty() {
            footer = footer.push(
                button(text("[Clear]").size(14))
                    .on_press(Message::ClearLog)
                    .padding(10),
            );
            if self.last_answer().is_some() {
                footer = footer
                    .push(
                        button(text("[Copy]").size(14))
                            .on_press(Message::CopyOutput)
                            .padding(10),
                    )
                    .push(
                        button(text("[Copy HTML]").size(14))
                            .on_press(Message::CopyHtml)
                            .padding(10),
                    );
            }
        }

        let content = column![
            tabs,
            row![input, send].spacing(8),
            container(panel).height(Length::Fill),
            footer,
        ]
        .spacing(10)
        .padding(10);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn view_log(&self) -> Element<Message> {
        let entries = column(
            self.console
                .messages()
                .iter()
                .map(|m| self.view_message(m)),
        )
        .spacing(12)
        .padding(5);

        scrollable(entries)
            .id(self.log_id.clone())
            .height(Length::Fill)
            .into()
    }

    fn view_message(&self, message: &LogMessage) -> Element<Message> {
        let label = match message.kind {
            MessageKind::Question => "You".to_string(),
            MessageKind::Answer => "Analysis".to_string(),
            MessageKind::Loading => LOADING_FRAMES[self.loading_frame].to_string(),
        };

        let body: Element<Message> = match &message.content {
            Content::Text(t) => text(t.clone()).size(15).into(),
            Content::Rich(doc) => view_document(doc),
        };

        container(column![text(label).size(12).font(BOLD), body].spacing(6))
            .padding(10)
            .width(Length::Fill)
            .style(container::rounded_box)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}

fn alert_empty_query() {
    if let Err(e) = notify_rust::Notification::new()
        .summary("Query Console")
        .body("Please enter a query")
        .show()
    {
        tracing::warn!("could not show notification: {}", e);
    }
}

fn view_document(doc: &Document) -> Element<'static, Message> {
    column(doc.blocks.iter().map(view_block)).spacing(8).into()
}

fn view_spans(spans: &[Span]) -> Element<'static, Message> {
    let parts: Vec<text::Span<'static, Message>> = spans
        .iter()
        .map(|s| match s {
            Span::Text(t) => span(t.clone()),
            Span::Strong(t) => span(t.clone()).font(BOLD),
        })
        .collect();
    rich_text(parts).size(15).into()
}

fn view_block(block: &Block) -> Element<'static, Message> {
    match block {
        Block::Paragraph(spans) => view_spans(spans),
        Block::Header(t) => text(t.clone()).size(16).font(BOLD).into(),
        Block::Field { label, value } => view_spans(&[
            Span::Strong(format!("{}: ", label)),
            Span::Text(value.clone()),
        ]),
        Block::Preformatted(t) => container(text(t.clone()).size(13).font(Font::MONOSPACE))
            .padding(8)
            .width(Length::Fill)
            .style(container::bordered_box)
            .into(),
        Block::Section { kind, title, blocks } => {
            let mut heading = text(title.clone()).size(13).font(BOLD);
            if *kind == SectionKind::Error {
                heading = heading.color(ERROR_COLOR);
            }
            column(std::iter::once(Element::from(heading)).chain(blocks.iter().map(view_block)))
                .spacing(6)
                .into()
        }
    }
}
