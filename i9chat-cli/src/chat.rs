use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use i9chat_core::{replies, MessageKind, Role, UiMessage, DEFAULT_TITLE};
use i9chat_store::{deliveries, DocumentStore, Theme};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Terminal,
};
use std::io::{self, Stdout};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::chat_worker::{self, TurnEvent, TurnRequest};
use crate::service::ChatService;

#[derive(Clone, Debug)]
struct Msg {
    role: Role,
    content: String,
    kind: Option<MessageKind>,
}

impl From<&UiMessage> for Msg {
    fn from(m: &UiMessage) -> Self {
        Self {
            role: m.role,
            content: m.content.clone(),
            kind: m.kind,
        }
    }
}

fn system(content: impl Into<String>) -> Msg {
    Msg {
        role: Role::System,
        content: content.into(),
        kind: None,
    }
}

struct Palette {
    accent: Color,
    user: Color,
    bot: Color,
    form: Color,
    muted: Color,
    text: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                accent: Color::Green,
                user: Color::Green,
                bot: Color::Black,
                form: Color::Blue,
                muted: Color::DarkGray,
                text: Color::Black,
            },
            Theme::Dark => Self {
                accent: Color::LightGreen,
                user: Color::LightGreen,
                bot: Color::Gray,
                form: Color::LightCyan,
                muted: Color::Gray,
                text: Color::White,
            },
        }
    }
}

/// Progressive display of the newest assistant reply.
#[derive(Debug, Default)]
struct Reveal {
    index: usize,
    shown: usize,
    total: usize,
}

impl Reveal {
    fn start(index: usize, content: &str) -> Self {
        Self {
            index,
            shown: 0,
            total: content.chars().count(),
        }
    }

    /// Returns false once everything is visible.
    fn tick(&mut self, speed: usize) -> bool {
        if speed == 0 {
            self.shown = self.total;
        } else {
            self.shown = (self.shown + speed).min(self.total);
        }
        self.shown < self.total
    }

    fn visible<'a>(&self, index: usize, content: &'a str) -> &'a str {
        if index != self.index || self.shown >= self.total {
            return content;
        }
        match content.char_indices().nth(self.shown) {
            Some((byte, _)) => &content[..byte],
            None => content,
        }
    }
}

pub struct ChatUi {
    pub store: DocumentStore,
    pub user_id: String,
    pub user_name: String,
    pub theme: Theme,
    pub typing_speed: usize,
    pub model_ready: bool,
}

pub fn run_chat(ui: ChatUi, svc: Arc<Mutex<ChatService>>) -> Result<()> {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel();
    tokio::spawn(chat_worker::run_worker(svc.clone(), req_rx, ev_tx));

    let (history, title) = match svc.lock() {
        Ok(s) => match s.conversation() {
            Some(c) => (c.messages.iter().map(Msg::from).collect(), c.title.clone()),
            None => (Vec::new(), DEFAULT_TITLE.to_string()),
        },
        Err(_) => (Vec::new(), DEFAULT_TITLE.to_string()),
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = chat_loop(&mut terminal, &ui, history, title, req_tx, ev_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    res
}

fn chat_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ui: &ChatUi,
    mut messages: Vec<Msg>,
    mut title: String,
    req_tx: mpsc::UnboundedSender<TurnRequest>,
    ev_rx: std::sync::mpsc::Receiver<TurnEvent>,
) -> Result<()> {
    let palette = Palette::for_theme(ui.theme);
    let mut input = String::new();
    let mut show_help = false;
    let mut pending: Option<u64> = None;
    let mut next_request_id: u64 = 1;
    let mut reveal: Option<Reveal> = None;

    if !ui.model_ready {
        messages.push(system(
            "Nenhum modelo configurado; as respostas serão o aviso de falha. \
Configure com: i9chat auth paste-gemini-key",
        ));
    }

    loop {
        while let Ok(ev) = ev_rx.try_recv() {
            match ev {
                TurnEvent::Started { .. } => {}
                TurnEvent::Reply { request_id, outcome } => {
                    if pending == Some(request_id) {
                        pending = None;
                    }
                    match outcome.reply {
                        Some(reply) => {
                            messages.push(Msg::from(&reply));
                            reveal = Some(Reveal::start(messages.len() - 1, &reply.content));
                        }
                        None => messages.push(system(replies::BOT_PAUSED_NOTICE)),
                    }
                }
                TurnEvent::Title { title: t } => title = t,
                TurnEvent::Error { request_id, message } => {
                    if pending == Some(request_id) {
                        pending = None;
                    }
                    tracing::error!(%message, "turn failed");
                    messages.push(system(format!("Erro: {message}")));
                }
            }
        }

        if let Some(r) = reveal.as_mut() {
            if !r.tick(ui.typing_speed) {
                reveal = None;
            }
        }

        terminal.draw(|f| {
            let size = f.area();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(4),
                    Constraint::Min(5),
                    Constraint::Length(3),
                ])
                .split(size);

            let splash = Paragraph::new(Text::from(vec![
                Line::from(Span::styled(
                    "Chatbot I9",
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "Enter=enviar  Esc=sair  F1=ajuda  /help",
                    Style::default().fg(palette.muted),
                )),
            ]))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
            f.render_widget(splash, chunks[0]);

            let header = Block::default().borders(Borders::ALL).title(title.as_str());

            let mut lines: Vec<Line> = Vec::new();
            if show_help {
                for l in HELP.lines() {
                    lines.push(Line::from(Span::styled(l, Style::default().fg(palette.muted))));
                }
                lines.push(Line::raw(""));
            }

            if messages.is_empty() {
                lines.push(Line::from(Span::styled(
                    "Envie uma mensagem para começar a conversa",
                    Style::default().fg(palette.muted),
                )));
            }

            for (i, m) in messages.iter().enumerate() {
                let (tag, color) = match (m.role, m.kind) {
                    (Role::User, _) => (ui.user_name.as_str(), palette.user),
                    (Role::Assistant, Some(MessageKind::DeliveryForm)) => ("i9 (cadastro)", palette.form),
                    (Role::Assistant, _) => ("i9", palette.bot),
                    (Role::System, _) => ("sistema", palette.muted),
                };
                let shown = match &reveal {
                    Some(r) => r.visible(i, &m.content),
                    None => m.content.as_str(),
                };
                let mut body = shown.lines();
                lines.push(Line::from(vec![
                    Span::styled(format!("{tag}: "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::styled(body.next().unwrap_or_default().to_string(), Style::default().fg(palette.text)),
                ]));
                for rest in body {
                    lines.push(Line::from(Span::styled(rest.to_string(), Style::default().fg(palette.text))));
                }
                lines.push(Line::raw(""));
            }

            // keep the newest rows in view
            let text = Text::from(lines);
            let scroll = history_scroll(
                &text,
                chunks[1].width.saturating_sub(2),
                chunks[1].height.saturating_sub(2),
            );

            let history = Paragraph::new(text)
                .block(header)
                .wrap(Wrap { trim: false })
                .scroll((scroll, 0));
            f.render_widget(history, chunks[1]);

            let (label, body) = if pending.is_some() {
                ("Enviando...", String::new())
            } else {
                ("Digite sua mensagem...", input.clone())
            };
            let input_widget = Paragraph::new(body)
                .block(Block::default().borders(Borders::ALL).title(label))
                .style(Style::default().fg(palette.text));
            f.render_widget(input_widget, chunks[2]);
        })?;

        if event::poll(std::time::Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Esc => break,
                    KeyCode::F(1) => {
                        show_help = !show_help;
                    }
                    // input is disabled while a turn is in flight
                    _ if pending.is_some() => {}
                    KeyCode::Enter => {
                        let trimmed = input.trim().to_string();
                        if !trimmed.is_empty() {
                            match slash_command(&trimmed) {
                                Some(Slash::New) => {
                                    let _ = req_tx.send(TurnRequest::Reset);
                                    messages.clear();
                                    reveal = None;
                                    title = DEFAULT_TITLE.to_string();
                                }
                                Some(cmd) => messages.push(system(slash_reply(cmd, ui))),
                                None => {
                                    messages.push(Msg {
                                        role: Role::User,
                                        content: trimmed.clone(),
                                        kind: Some(MessageKind::Text),
                                    });
                                    let request_id = next_request_id;
                                    next_request_id += 1;
                                    if req_tx
                                        .send(TurnRequest::Submit {
                                            request_id,
                                            text: trimmed,
                                        })
                                        .is_ok()
                                    {
                                        pending = Some(request_id);
                                    } else {
                                        messages.push(system(replies::APOLOGY));
                                    }
                                }
                            }
                        }
                        input.clear();
                    }
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char(c) => {
                        input.push(c);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

/// Rows to scroll so the last wrapped row sits at the bottom of a
/// `width` x `height` view.
fn history_scroll(text: &Text<'_>, width: u16, height: u16) -> u16 {
    let rows = Paragraph::new(text.clone())
        .wrap(Wrap { trim: false })
        .line_count(width);
    u16::try_from(rows.saturating_sub(usize::from(height))).unwrap_or(u16::MAX)
}

const HELP: &str = "Comandos:\n\
/help        esta ajuda\n\
/status      versão, usuário e armazenamento\n\
/new         começar uma nova conversa\n\
/deliveries  suas entregas cadastradas\n\
Atalhos: Enter=enviar, Esc=sair, F1=mostrar/ocultar ajuda";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slash {
    Help,
    Status,
    New,
    Deliveries,
    Unknown,
}

fn slash_command(input: &str) -> Option<Slash> {
    let s = input.trim();
    if !s.starts_with('/') {
        return None;
    }
    Some(match s {
        "/help" => Slash::Help,
        "/status" => Slash::Status,
        "/new" => Slash::New,
        "/deliveries" => Slash::Deliveries,
        _ => Slash::Unknown,
    })
}

fn slash_reply(cmd: Slash, ui: &ChatUi) -> String {
    match cmd {
        Slash::Help => HELP.to_string(),
        Slash::Status => format!(
            "i9chat {} ({})\nusuário: {}\narmazenamento: {}\nmodelo: {}",
            env!("CARGO_PKG_VERSION"),
            option_env!("I9CHAT_BUILD_SHA").unwrap_or("dev"),
            ui.user_id,
            ui.store.root().display(),
            if ui.model_ready { "configurado" } else { "não configurado" },
        ),
        Slash::Deliveries => match deliveries::load_deliveries(&ui.store, &ui.user_id) {
            Ok(list) if list.is_empty() => "Nenhuma entrega cadastrada.".to_string(),
            Ok(list) => list
                .iter()
                .map(|d| d.summary())
                .collect::<Vec<_>>()
                .join("\n\n"),
            Err(e) => {
                tracing::error!(error = %e, "could not load deliveries");
                replies::APOLOGY.to_string()
            }
        },
        Slash::New => String::new(),
        Slash::Unknown => "Comando desconhecido. Tente /help".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_advances_by_speed_on_char_boundaries() {
        let content = "Olá, ação";
        let mut r = Reveal::start(3, content);
        assert!(r.tick(2));
        assert_eq!(r.visible(3, content), "Ol");
        assert!(r.tick(2));
        assert_eq!(r.visible(3, content), "Olá,");
        // other messages are never truncated
        assert_eq!(r.visible(2, "anterior"), "anterior");
        while r.tick(2) {}
        assert_eq!(r.visible(3, content), content);
    }

    #[test]
    fn test_reveal_speed_zero_is_instant() {
        let mut r = Reveal::start(0, "abc");
        assert!(!r.tick(0));
        assert_eq!(r.visible(0, "abc"), "abc");
    }

    /// Regression test: long replies wrap, and the newest row must stay visible.
    #[test]
    fn test_history_scroll_counts_wrapped_rows() {
        let text = Text::from(vec![Line::raw("abcd ".repeat(6)), Line::raw("fim")]);
        // two logical lines, at least four rows once wrapped at width 10
        assert!(history_scroll(&text, 10, 2) >= 2);
        assert_eq!(history_scroll(&text, 200, 5), 0);
    }

    #[test]
    fn test_slash_commands() {
        assert_eq!(slash_command("/new"), Some(Slash::New));
        assert_eq!(slash_command(" /deliveries "), Some(Slash::Deliveries));
        assert_eq!(slash_command("/xyz"), Some(Slash::Unknown));
        assert_eq!(slash_command("cadê a entrega 5?"), None);
    }

    #[test]
    fn test_deliveries_command_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let ui = ChatUi {
            store: DocumentStore::open(dir.path()).unwrap(),
            user_id: "demo".to_string(),
            user_name: "Usuário".to_string(),
            theme: Theme::Light,
            typing_speed: 3,
            model_ready: false,
        };
        assert_eq!(slash_reply(Slash::Deliveries, &ui), "Nenhuma entrega cadastrada.");
        assert!(slash_reply(Slash::Status, &ui).contains("não configurado"));
    }
}
