//! swarmview TUI
//!
//! Renders the derived dashboard view: one column per node, the node's
//! tasks below its resource summary. The session runs on the same task as
//! the draw loop; terminal input arrives from a blocking reader thread.

use crate::error::Result;
use crate::session::{Session, SessionEvent};
use crate::store::ClusterState;
use crate::swarm::{NodeAvailability, Service, TaskState};
use crate::view::{build_dashboard, NodeView, TaskRow, ViewConfig, ViewFilter};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Service colors, indexed by the service's color slot
const PALETTE: [Color; 10] = [
    Color::Rgb(0x03, 0x9b, 0xe5),
    Color::Rgb(0x39, 0x49, 0xab),
    Color::Rgb(0x8e, 0x24, 0xaa),
    Color::Rgb(0xe5, 0x39, 0x35),
    Color::Rgb(0xfb, 0x8c, 0x00),
    Color::Rgb(0xfd, 0xd8, 0x35),
    Color::Rgb(0x7c, 0xb3, 0x42),
    Color::Rgb(0x00, 0x89, 0x7b),
    Color::Rgb(0x00, 0xac, 0xc1),
    Color::Rgb(0x6d, 0x4c, 0x41),
];

/// Narrowest a node column is allowed to get
const MIN_COLUMN_WIDTH: u16 = 34;

/// What the caller should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Reconnect,
    Quit,
}

/// Connection status as shown in the header
#[derive(Debug, Clone, PartialEq, Eq)]
enum Connection {
    Connecting,
    Connected,
    Disconnected { retry_in: Option<Duration> },
    Unauthorized,
}

/// TUI application state
pub struct App {
    /// Filter and sort settings
    view: ViewConfig,
    /// Latest store snapshot
    state: Arc<ClusterState>,
    connection: Connection,
    /// First visible node column
    node_offset: usize,
    /// Filter text being edited, if in edit mode
    editing: Option<String>,
    show_help: bool,
    /// Position in the service list while the details overlay is open
    details: Option<usize>,
    status_message: Option<String>,
}

impl App {
    /// Create a new TUI application
    pub fn new(view: ViewConfig) -> Self {
        Self {
            view,
            state: Arc::new(ClusterState::default()),
            connection: Connection::Connecting,
            node_offset: 0,
            editing: None,
            show_help: false,
            details: None,
            status_message: None,
        }
    }

    /// Run the TUI until the user quits
    pub async fn run(
        &mut self,
        session: &mut Session,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal, session, events).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn main_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        session: &mut Session,
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Result<()> {
        let mut keys = spawn_key_reader();
        session.connect();

        loop {
            while let Ok(event) = events.try_recv() {
                self.handle_session_event(event);
            }

            terminal.draw(|f| self.ui(f))?;

            tokio::select! {
                key = keys.recv() => match key {
                    Some(key) => match self.handle_key(key) {
                        KeyAction::Quit => break,
                        KeyAction::Reconnect => {
                            self.connection = Connection::Connecting;
                            session.connect();
                        }
                        KeyAction::None => {}
                    },
                    None => break,
                },
                // A halted channel waits for the `c` key.
                _ = session.step() => {}
            }
        }

        session.shutdown();
        Ok(())
    }

    /// Fold a session event into the displayed state
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected => {
                self.connection = Connection::Connected;
                self.status_message = None;
            }
            SessionEvent::Disconnected { reason, retry_in } => {
                self.connection = Connection::Disconnected { retry_in };
                self.status_message = Some(format!("Disconnected: {}", reason));
            }
            SessionEvent::Unauthorized => {
                self.connection = Connection::Unauthorized;
                self.status_message = Some("Unauthorized, press c to reconnect".to_string());
            }
            SessionEvent::Update(state) => {
                self.state = state;
                self.clamp_offset();
            }
            SessionEvent::Error(message) => {
                self.status_message = Some(format!("Error: {}", message));
            }
        }
    }

    /// Handle key press
    pub fn handle_key(&mut self, key: KeyCode) -> KeyAction {
        if let Some(text) = self.editing.as_mut() {
            match key {
                KeyCode::Enter => {
                    self.editing = None;
                }
                KeyCode::Esc => {
                    self.editing = None;
                    self.view.filter.text.clear();
                }
                KeyCode::Backspace => {
                    text.pop();
                    self.view.filter.text = text.clone();
                }
                KeyCode::Char(c) => {
                    text.push(c);
                    self.view.filter.text = text.clone();
                }
                _ => {}
            }
            return KeyAction::None;
        }

        if self.show_help {
            self.show_help = false;
            return KeyAction::None;
        }

        if let Some(position) = self.details {
            let count = self.state.service_count();
            self.details = match key {
                _ if count == 0 => None,
                KeyCode::Down | KeyCode::Char('j') => Some((position + 1) % count),
                KeyCode::Up | KeyCode::Char('k') => Some((position + count - 1) % count),
                _ => None,
            };
            return KeyAction::None;
        }

        match key {
            KeyCode::Char('q') => return KeyAction::Quit,
            KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            KeyCode::Char('d') => {
                if self.state.service_count() > 0 {
                    self.details = Some(0);
                }
            }
            KeyCode::Char('/') => self.editing = Some(self.view.filter.text.clone()),
            KeyCode::Char('g') => self.view.filter.modes.global = !self.view.filter.modes.global,
            KeyCode::Char('r') => {
                self.view.filter.modes.replicated = !self.view.filter.modes.replicated
            }
            KeyCode::Char('s') => self.view.sort_by = self.view.sort_by.toggled(),
            KeyCode::Char('o') => self.view.mode_order = self.view.mode_order.toggled(),
            KeyCode::Char('c') => {
                if matches!(
                    self.connection,
                    Connection::Unauthorized | Connection::Disconnected { .. }
                ) {
                    return KeyAction::Reconnect;
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.node_offset += 1;
                self.clamp_offset();
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.node_offset = self.node_offset.saturating_sub(1);
            }
            _ => {}
        }

        KeyAction::None
    }

    fn clamp_offset(&mut self) {
        let last = self.state.node_count().saturating_sub(1);
        self.node_offset = self.node_offset.min(last);
    }

    /// Render UI
    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Nodes
                Constraint::Length(3), // Status bar
            ])
            .split(f.area());

        let dashboard = build_dashboard(&self.state, &self.view);

        self.render_header(f, chunks[0]);
        self.render_nodes(f, chunks[1], &dashboard.nodes);
        self.render_status_bar(f, chunks[2], dashboard.visible_tasks(), dashboard.total_tasks());

        if let Some(position) = self.details {
            if let Some(service) = ViewFilter::available_services(&self.state).get(position) {
                self.render_details(f, service);
            }
        }
        if self.show_help {
            self.render_help(f);
        }
    }

    /// Render header
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let (status, color) = match &self.connection {
            Connection::Connecting => ("connecting".to_string(), Color::Yellow),
            Connection::Connected => ("connected".to_string(), Color::Green),
            Connection::Disconnected { retry_in: Some(delay) } => (
                format!("disconnected, retrying in {}s", delay.as_secs().max(1)),
                Color::Red,
            ),
            Connection::Disconnected { retry_in: None } => ("disconnected".to_string(), Color::Red),
            Connection::Unauthorized => ("unauthorized".to_string(), Color::Red),
        };

        let cluster = self.state.cluster_name().unwrap_or("swarm");
        let counts = format!(
            "{} nodes, {} services, {} tasks, {} networks",
            self.state.node_count(),
            self.state.service_count(),
            self.state.task_count(),
            self.state.network_count()
        );
        let title = Paragraph::new(Line::from(vec![
            Span::styled("swarmview", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" - "),
            Span::styled(cluster.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(format!("● {}", status), Style::default().fg(color)),
            Span::raw("  "),
            Span::styled(counts, Style::default().fg(Color::Gray)),
        ]))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Blue)));
        f.render_widget(title, area);
    }

    /// Render one column per visible node
    fn render_nodes(&self, f: &mut Frame, area: Rect, nodes: &[NodeView<'_>]) {
        if nodes.is_empty() {
            let text = Paragraph::new("No nodes yet. Waiting for the first update.")
                .block(Block::default().borders(Borders::ALL).title("Nodes"))
                .style(Style::default().fg(Color::Gray));
            f.render_widget(text, area);
            return;
        }

        let fit = usize::from((area.width / MIN_COLUMN_WIDTH).max(1));
        let visible: Vec<&NodeView<'_>> = nodes.iter().skip(self.node_offset).take(fit).collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, visible.len() as u32); visible.len()])
            .split(area);

        for (view, column) in visible.into_iter().zip(columns.iter()) {
            self.render_node(f, *column, view);
        }
    }

    fn render_node(&self, f: &mut Frame, area: Rect, view: &NodeView<'_>) {
        let node = view.node;
        let status_color = if node.is_ready() { Color::Green } else { Color::Red };

        let mut title = vec![
            Span::styled("● ", Style::default().fg(status_color)),
            Span::styled(node.hostname.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ];
        if node.availability != NodeAvailability::Active {
            title.push(Span::raw(format!(" ({})", node.availability)));
        }
        if node.is_leader() {
            title.push(Span::styled(" ★", Style::default().fg(Color::Yellow)));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .title(Line::from(title))
            .title_bottom(format!(" {}/{} tasks ", view.tasks.len(), view.total_tasks));
        let inner = block.inner(area);
        f.render_widget(block, area);

        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(inner);

        let usage = &view.usage;
        let summary = Paragraph::new(vec![
            Line::from(format!("{} | {}", node.role, node.platform_architecture)),
            Line::from(format!(
                "CPU {} / Mem {}",
                format_cpus(node.nano_cpus),
                format_bytes(node.memory_bytes)
            )),
            Line::from(format!(
                "Rsv {} / {}",
                format_cpus(usage.reserved_nano_cpus),
                format_bytes(usage.reserved_memory_bytes)
            )),
            Line::from(format!(
                "Lim {} / {}",
                format_cpus(usage.limit_nano_cpus),
                format_bytes(usage.limit_memory_bytes)
            )),
        ])
        .style(Style::default().fg(Color::Gray));
        f.render_widget(summary, parts[0]);

        let items: Vec<ListItem> = view.tasks.iter().map(task_item).collect();
        f.render_widget(List::new(items), parts[1]);
    }

    /// Render status bar
    fn render_status_bar(&self, f: &mut Frame, area: Rect, shown: usize, total: usize) {
        let status = if let Some(text) = &self.editing {
            format!("Filter: {}▏ (Enter: apply, Esc: clear)", text)
        } else if let Some(ref msg) = self.status_message {
            msg.clone()
        } else {
            let modes = &self.view.filter.modes;
            format!(
                "Tasks: {}/{} | Sort: {} | Global: {} | Replicated: {} | Filter: {} | ?: Help | q: Quit",
                shown,
                total,
                self.view.sort_by,
                on_off(modes.global),
                on_off(modes.replicated),
                if self.view.filter.text.is_empty() { "-" } else { self.view.filter.text.as_str() },
            )
        };

        let status_bar = Paragraph::new(status)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Blue)))
            .style(Style::default().fg(Color::Cyan));

        f.render_widget(status_bar, area);
    }

    /// Render help overlay
    fn render_help(&self, f: &mut Frame) {
        let area = centered_rect(60, 70, f.area());

        f.render_widget(Clear, area);

        let key = |k: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("{:<10}", k), Style::default().fg(Color::Cyan)),
                Span::raw(what),
            ])
        };

        let help_text = vec![
            Line::from(Span::styled("Keyboard Shortcuts", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
            Line::from(""),
            key("/", "Edit filter text"),
            key("g", "Toggle global services"),
            key("r", "Toggle replicated services"),
            key("s", "Sort by creation time or service name"),
            key("o", "Global or replicated first"),
            key("← → / h l", "Scroll nodes"),
            key("d", "Service details (↑ ↓ / j k to browse)"),
            key("c", "Reconnect"),
            key("? / F1", "Show this help"),
            key("q", "Quit"),
            Line::from(""),
            Line::from(Span::styled("Press any key to close", Style::default().fg(Color::Gray))),
        ];

        let help = Paragraph::new(help_text)
            .block(Block::default()
                .borders(Borders::ALL)
                .title("Help")
                .border_style(Style::default().fg(Color::Yellow)))
            .alignment(Alignment::Left);

        f.render_widget(help, area);
    }

    /// Render the details overlay for one service
    fn render_details(&self, f: &mut Frame, service: &Service) {
        let area = centered_rect(70, 80, f.area());
        f.render_widget(Clear, area);

        let color = PALETTE[service.color_slot(PALETTE.len())];
        let details = Paragraph::new(service_details(service, &self.state))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", service.name))
                    .title_bottom(" ↑ ↓: next service, any other key: close ")
                    .border_style(Style::default().fg(color)),
            )
            .wrap(Wrap { trim: false });

        f.render_widget(details, area);
    }
}

/// Lines of the service details overlay
fn service_details(service: &Service, state: &ClusterState) -> Vec<Line<'static>> {
    let heading = |text: &str| {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    };
    let field = |name: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<10}", name), Style::default().fg(Color::Cyan)),
            Span::raw(value),
        ])
    };

    let mode = match service.replicas() {
        Some(replicas) => format!("{} ({} replicas)", service.mode_kind(), replicas),
        None => service.mode_kind().to_string(),
    };
    let mut lines = vec![
        field("ID", service.id.clone()),
        field("Mode", mode),
        field("Image", service.image.clone()),
    ];

    let resources = &service.resources;
    lines.push(field(
        "Reserved",
        format!(
            "{} / {}",
            format_cpus(resources.reserved_nano_cpus()),
            format_bytes(resources.reserved_memory_bytes())
        ),
    ));
    lines.push(field(
        "Limits",
        format!(
            "{} / {}",
            format_cpus(resources.limit_nano_cpus()),
            format_bytes(resources.limit_memory_bytes())
        ),
    ));

    if !service.networks.is_empty() {
        let names: Vec<&str> = service
            .networks
            .iter()
            .map(|id| state.network(id).map_or(id.as_str(), |n| n.name.as_str()))
            .collect();
        lines.push(field("Networks", names.join(", ")));
    }

    let mut section = |title: &str, items: Vec<String>| {
        if items.is_empty() {
            return;
        }
        lines.push(Line::from(""));
        lines.push(heading(title));
        lines.extend(items.into_iter().map(|item| Line::from(format!("  {}", item))));
    };

    section("Environment", service.env.clone());
    section(
        "Mounts",
        service
            .mounts
            .iter()
            .map(|m| {
                let access = if m.read_only { "ro" } else { "rw" };
                format!("{} {} ({})", m.mount_type, m.target, access)
            })
            .collect(),
    );
    section(
        "Configs",
        service.configs.iter().map(|c| c.config_name.clone()).collect(),
    );
    section(
        "Secrets",
        service.secrets.iter().map(|s| s.secret_name.clone()).collect(),
    );

    let mut labels: Vec<(&String, &String)> = service.labels.iter().collect();
    labels.sort();
    section(
        "Labels",
        labels.into_iter().map(|(k, v)| format!("{}={}", k, v)).collect(),
    );

    lines
}

fn task_item<'a>(row: &TaskRow<'a>) -> ListItem<'a> {
    let state_color = match row.task.state {
        TaskState::Running => Color::Green,
        TaskState::New
        | TaskState::Pending
        | TaskState::Assigned
        | TaskState::Accepted
        | TaskState::Preparing
        | TaskState::Ready
        | TaskState::Starting => Color::Yellow,
        _ => Color::Red,
    };
    let color = PALETTE[row.service.color_slot(PALETTE.len())];
    let name_style = if row.task.is_terminal() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };

    ListItem::new(vec![
        Line::from(vec![
            Span::styled("▌", Style::default().fg(color)),
            Span::styled("● ", Style::default().fg(state_color)),
            Span::styled(row.task.display_name(row.service), name_style),
        ]),
        Line::from(vec![
            Span::styled("▌", Style::default().fg(color)),
            Span::styled(
                format!("  {} {}", row.service.mode_kind(), row.service.image_without_digest()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ])
}

/// Read terminal key presses on a blocking thread
fn spawn_key_reader() -> mpsc::UnboundedReceiver<KeyCode> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if tx.send(key.code).is_err() {
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Terminal input closed");
                return;
            }
        }
    });
    rx
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn format_cpus(nano_cpus: i64) -> String {
    let cpus = nano_cpus as f64 / 1e9;
    format!("{} vCPU", trim_decimals(format!("{:.2}", cpus)))
}

/// Human-readable size, base 1024, at most two decimals
fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes <= 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimals(format!("{:.2}", value)), UNITS[unit])
}

fn trim_decimals(formatted: String) -> String {
    if formatted.contains('.') {
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        formatted
    }
}

/// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ModeOrder, SortBy};
    use ratatui::backend::TestBackend;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1 << 30), "1 GB");
        assert_eq!(format_bytes(1_234_567_890), "1.15 GB");
        assert_eq!(format_bytes(3 << 40), "3 TB");
        assert_eq!(format_bytes(5 << 50), "5120 TB");
    }

    #[test]
    fn test_format_cpus() {
        assert_eq!(format_cpus(4_000_000_000), "4 vCPU");
        assert_eq!(format_cpus(250_000_000), "0.25 vCPU");
        assert_eq!(format_cpus(0), "0 vCPU");
    }

    #[test]
    fn test_toggle_keys() {
        let mut app = App::new(ViewConfig::default());

        app.handle_key(KeyCode::Char('g'));
        assert!(!app.view.filter.modes.global);
        app.handle_key(KeyCode::Char('r'));
        assert!(!app.view.filter.modes.replicated);
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.view.sort_by, SortBy::ServiceName);
        app.handle_key(KeyCode::Char('o'));
        assert_eq!(app.view.mode_order, ModeOrder::ReplicatedFirst);
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::Quit);
    }

    #[test]
    fn test_filter_editing() {
        let mut app = App::new(ViewConfig::default());

        app.handle_key(KeyCode::Char('/'));
        for c in "webx".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Backspace);
        // Keys are text while editing.
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::None);
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.view.filter.text, "web");

        app.handle_key(KeyCode::Char('/'));
        app.handle_key(KeyCode::Esc);
        assert!(app.view.filter.text.is_empty());
    }

    #[test]
    fn test_reconnect_only_when_disconnected() {
        let mut app = App::new(ViewConfig::default());
        app.handle_session_event(SessionEvent::Connected);
        assert_eq!(app.handle_key(KeyCode::Char('c')), KeyAction::None);

        app.handle_session_event(SessionEvent::Unauthorized);
        assert_eq!(app.handle_key(KeyCode::Char('c')), KeyAction::Reconnect);
    }

    #[test]
    fn test_help_swallows_next_key() {
        let mut app = App::new(ViewConfig::default());
        app.handle_key(KeyCode::Char('?'));
        assert!(app.show_help);
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::None);
        assert!(!app.show_help);
    }

    #[test]
    fn test_renders_empty_dashboard() {
        let app = App::new(ViewConfig::default());
        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Waiting for the first update"));
        assert!(text.contains("connecting"));
    }

    fn detailed_state() -> Arc<ClusterState> {
        let full = r#"{"kind":"full",
            "nodes":[{"id":"n1","hostname":"alpha"}],
            "services":[
                {"id":"s1","name":"web","mode":{"replicated":{"replicas":3}},"image":"nginx:1.27",
                 "env":["PORT=8080"],
                 "mounts":[{"target":"/data","type":"volume","read_only":true}],
                 "secrets":[{"secret_id":"x1","secret_name":"tls-key"}],
                 "labels":{"tier":"front"},
                 "networks":["net1"],
                 "resources":{"reservations":{"nano_cpus":500000000}}},
                {"id":"s2","name":"db","mode":"global"}
            ],
            "tasks":[],
            "networks":[{"id":"net1","name":"frontend"}]}"#;
        let mut store = crate::store::StateStore::new();
        store
            .apply_update(crate::swarm::UpdatePayload::parse(full).unwrap())
            .unwrap();
        store.snapshot()
    }

    #[test]
    fn test_service_details_lines() {
        let state = detailed_state();
        let text: Vec<String> = service_details(state.service("s1").unwrap(), &state)
            .iter()
            .map(|line| line.to_string())
            .collect();

        assert!(text.iter().any(|l| l.contains("replicated (3 replicas)")));
        assert!(text.iter().any(|l| l.contains("nginx:1.27")));
        assert!(text.iter().any(|l| l.contains("0.5 vCPU")));
        assert!(text.iter().any(|l| l.contains("frontend")));
        assert!(text.iter().any(|l| l.contains("PORT=8080")));
        assert!(text.iter().any(|l| l.contains("volume /data (ro)")));
        assert!(text.iter().any(|l| l.contains("tls-key")));
        assert!(text.iter().any(|l| l.contains("tier=front")));
        // No configs, so no section for them.
        assert!(!text.iter().any(|l| l.contains("Configs")));
    }

    #[test]
    fn test_details_overlay_keys() {
        let mut app = App::new(ViewConfig::default());
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.details, None);

        app.handle_session_event(SessionEvent::Update(detailed_state()));
        app.handle_key(KeyCode::Char('d'));
        assert_eq!(app.details, Some(0));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.details, Some(1));
        app.handle_key(KeyCode::Char('j'));
        assert_eq!(app.details, Some(0));
        app.handle_key(KeyCode::Up);
        assert_eq!(app.details, Some(1));
        // Any other key closes, and is not acted on.
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::None);
        assert_eq!(app.details, None);
    }

    #[test]
    fn test_renders_details_and_counts() {
        let mut app = App::new(ViewConfig::default());
        app.handle_session_event(SessionEvent::Update(detailed_state()));
        app.handle_key(KeyCode::Char('d'));
        app.handle_key(KeyCode::Down);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.ui(f)).unwrap();

        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("1 nodes, 2 services, 0 tasks, 1 networks"));
        // Services are listed by name, so the second one is web.
        assert!(text.contains("PORT=8080"));
    }
}
