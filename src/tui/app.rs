use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::client::ConfigTransport;
use crate::error::SyncError;
use crate::session::Session;

/// 状态消息自动清除时间
const STATUS_TTL: Duration = Duration::from_secs(4);
/// 事件轮询间隔，保证 TTL 到期后界面及时刷新
const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// 焦点区域：token 输入框 or 文档编辑区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Token,
    Editor,
}

/// 状态消息类别，决定状态栏颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Ok,
    Error,
}

/// TUI 应用状态。所有行为经 handle_key 驱动，无终端即可测试。
pub struct App {
    transport: Box<dyn ConfigTransport>,
    session: Session,
    focus: Focus,
    status_message: String,
    status_kind: StatusKind,
    status_since: Option<Instant>,
    running: bool,
}

impl App {
    pub fn new(transport: Box<dyn ConfigTransport>) -> Self {
        Self {
            transport,
            session: Session::new(),
            focus: Focus::Token,
            status_message: "Ready".to_string(),
            status_kind: StatusKind::Ok,
            status_since: None,
            running: true,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn status_kind(&self) -> StatusKind {
        self.status_kind
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_status(&mut self, msg: impl Into<String>, kind: StatusKind) {
        self.status_message = msg.into();
        self.status_kind = kind;
        self.status_since = Some(Instant::now());
    }

    /// TTL 到期后清空状态消息
    pub fn clear_expired_status(&mut self, now: Instant) {
        if let Some(since) = self.status_since {
            if now.duration_since(since) >= STATUS_TTL {
                self.status_message.clear();
                self.status_kind = StatusKind::Ok;
                self.status_since = None;
            }
        }
    }

    /// 处理键盘输入
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => self.running = false,
                KeyCode::Char('l') => self.load(),
                KeyCode::Char('s') => self.save(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => self.running = false,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Token => Focus::Editor,
                    Focus::Editor => Focus::Token,
                };
            }
            _ => match self.focus {
                Focus::Token => self.handle_token_key(key.code),
                Focus::Editor => self.handle_editor_key(key.code),
            },
        }
    }

    /// token 输入框按键处理。Enter 相当于按下加载
    fn handle_token_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.session.push_token_char(c),
            KeyCode::Backspace => self.session.pop_token_char(),
            KeyCode::Enter => self.load(),
            _ => {}
        }
    }

    /// 编辑区按键处理
    fn handle_editor_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(c) => self.session.insert_char(c),
            KeyCode::Backspace => self.session.backspace(),
            KeyCode::Enter => self.session.insert_newline(),
            KeyCode::Left => self.session.move_left(),
            KeyCode::Right => self.session.move_right(),
            KeyCode::Up => self.session.move_up(),
            KeyCode::Down => self.session.move_down(),
            _ => {}
        }
    }

    /// 拉取配置。空 token 不发请求；401 单独提示；其余失败原样展示
    fn load(&mut self) {
        if self.session.token_trimmed().is_empty() {
            self.set_status("enter token before load", StatusKind::Error);
            return;
        }
        let token = self.session.token_trimmed().to_string();
        match self.transport.load(&token) {
            Ok(doc) => {
                self.session.set_document(&doc);
                self.set_status("Successfully loaded", StatusKind::Ok);
            }
            Err(SyncError::Unauthorized) => {
                self.set_status("Unauthorized", StatusKind::Error);
            }
            Err(e) => {
                self.set_status(format!("Failed while loading: {}", e), StatusKind::Error);
            }
        }
    }

    /// 提交配置。先本地解析缓冲，不合法 JSON 不发请求
    fn save(&mut self) {
        if self.session.token_trimmed().is_empty() {
            self.set_status("Enter token before save", StatusKind::Error);
            return;
        }
        let document = match self.session.parse() {
            Ok(doc) => doc,
            Err(e) => {
                self.set_status(format!("Error: {}", e), StatusKind::Error);
                return;
            }
        };
        let token = self.session.token_trimmed().to_string();
        match self.transport.save(&token, &document) {
            Ok(resp) if resp.is_ok() => {
                self.set_status("Config saved successfully", StatusKind::Ok);
                self.reload_after_save(&token);
            }
            Ok(resp) => {
                let body = serde_json::to_string(&resp).unwrap_or_default();
                self.set_status(format!("Server returned: {}", body), StatusKind::Error);
            }
            Err(SyncError::Unauthorized) => {
                self.set_status("Unauthorized", StatusKind::Error);
            }
            Err(SyncError::UnsupportedMediaType) => {
                self.set_status("Content-Type must be application/json", StatusKind::Error);
            }
            Err(e) => {
                self.set_status(format!("Failed while saving: {}", e), StatusKind::Error);
            }
        }
    }

    /// 保存成功后重新拉取确认落盘内容。失败只记日志，不覆盖成功提示
    fn reload_after_save(&mut self, token: &str) {
        match self.transport.load(token) {
            Ok(doc) => self.session.set_document(&doc),
            Err(e) => tracing::warn!("保存后确认拉取失败: {}", e),
        }
    }

    /// 启动 TUI 事件循环
    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(TICK_INTERVAL)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    self.handle_key(key);
                }
            }
            self.clear_expired_status(Instant::now());
        }
        Ok(())
    }

    /// 渲染整个界面
    fn render(&self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(3),
            ])
            .split(area);

        self.render_title(frame, outer[0]);
        self.render_token(frame, outer[1]);
        self.render_editor(frame, outer[2]);
        self.render_status(frame, outer[3]);
    }

    fn border_style(&self, focus: Focus) -> Style {
        if self.focus == focus {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    }

    fn render_title(&self, frame: &mut ratatui::Frame, area: Rect) {
        let title = Paragraph::new("Config Sync - Remote Config Editor")
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, area);
    }

    fn render_token(&self, frame: &mut ratatui::Frame, area: Rect) {
        let field = Paragraph::new(self.session.token()).block(
            Block::default()
                .title(" API Token ")
                .borders(Borders::ALL)
                .border_style(self.border_style(Focus::Token)),
        );
        frame.render_widget(field, area);

        if self.focus == Focus::Token {
            let x = area.x + 1 + self.session.token().chars().count() as u16;
            frame.set_cursor_position(Position::new(
                x.min(area.right().saturating_sub(2)),
                area.y + 1,
            ));
        }
    }

    fn render_editor(&self, frame: &mut ratatui::Frame, area: Rect) {
        let title = if self.session.is_dirty() {
            " Config Document [edited] "
        } else {
            " Config Document "
        };
        let (cursor_line, cursor_col) = self.session.cursor();

        // 光标超出可视范围时向下滚动
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = if inner_height > 0 && cursor_line >= inner_height {
            cursor_line - inner_height + 1
        } else {
            0
        };

        let text: Vec<Line> = self
            .session
            .lines()
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect();
        let editor = Paragraph::new(text)
            .scroll((scroll as u16, 0))
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(self.border_style(Focus::Editor)),
            );
        frame.render_widget(editor, area);

        if self.focus == Focus::Editor {
            let x = area.x + 1 + cursor_col as u16;
            let y = area.y + 1 + (cursor_line - scroll) as u16;
            frame.set_cursor_position(Position::new(
                x.min(area.right().saturating_sub(2)),
                y.min(area.bottom().saturating_sub(2)),
            ));
        }
    }

    fn render_status(&self, frame: &mut ratatui::Frame, area: Rect) {
        let color = match self.status_kind {
            StatusKind::Ok => Color::Green,
            StatusKind::Error => Color::Red,
        };
        let status = Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(&self.status_message, Style::default().fg(color)),
            Span::raw(" | "),
            Span::styled(
                "Ctrl-L:Load  Ctrl-S:Save  Tab:Switch  Esc:Quit",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        let bar = Paragraph::new(status).block(Block::default().borders(Borders::ALL));
        frame.render_widget(bar, area);
    }
}
