use std::collections::VecDeque;

use ansi_to_tui::IntoText;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};

use crate::app::{format_pending, App, FocusedPanel, InputMode};
use crate::controller::{LinkStatus, Mode, ScrollTelemetry};
use crate::surface::{Fragment, Row, Surface};
use crate::theme::Theme;

const SIDE_PANEL_WIDTH: u16 = 24;

/// Rows within this many lines of the bottom count as the live edge
const STICKY_SLACK: usize = 3;

/// The terminal implementation of the presentation surface.
///
/// One row is one terminal line, so the height delta of a prepend is
/// exactly the fragment length; offsetting the scroll index by it keeps
/// the visible rows stationary.
pub struct TuiSurface {
    rows: VecDeque<Row>,
    /// Index of the first visible row
    scroll: usize,
    /// Pinned to the newest row
    follow: bool,
    /// Height of the log area at the last draw
    viewport: usize,
    visible: bool,
    /// Presentation-side cap, independent of the line buffer's
    max_rows: usize,
}

impl TuiSurface {
    pub fn new(max_rows: usize) -> Self {
        Self {
            rows: VecDeque::new(),
            scroll: 0,
            follow: true,
            viewport: 1,
            visible: true,
            max_rows: max_rows.max(1),
        }
    }

    fn max_scroll(&self) -> usize {
        self.rows.len().saturating_sub(self.viewport)
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
        self.follow = false;
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = (self.scroll + n).min(self.max_scroll());
        if self.scroll == self.max_scroll() {
            self.follow = true;
        }
    }

    pub fn to_top(&mut self) {
        self.scroll = 0;
        self.follow = false;
    }

    pub fn to_bottom(&mut self) {
        self.scroll = self.max_scroll();
        self.follow = true;
    }

    pub fn telemetry(&self) -> ScrollTelemetry {
        if self.rows.is_empty() {
            return ScrollTelemetry::default();
        }
        ScrollTelemetry {
            at_top_edge: self.scroll == 0,
            at_bottom_edge: self.scroll >= self.max_scroll(),
            at_live_edge: self.max_scroll() - self.scroll.min(self.max_scroll()) <= STICKY_SLACK,
        }
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        let start = self.scroll.min(self.rows.len());
        let end = (start + self.viewport).min(self.rows.len());
        self.rows.range(start..end)
    }

    fn enforce_cap(&mut self) {
        while self.rows.len() > self.max_rows {
            self.rows.pop_front();
            self.scroll = self.scroll.saturating_sub(1);
        }
    }
}

impl Surface for TuiSurface {
    fn append(&mut self, fragment: Fragment, sticky: bool) {
        self.rows.extend(fragment);
        self.enforce_cap();
        self.follow = sticky;
        if self.follow {
            self.scroll = self.max_scroll();
        }
    }

    fn prepend(&mut self, fragment: Fragment) {
        let height = fragment.len();
        for row in fragment.into_iter().rev() {
            self.rows.push_front(row);
        }
        while self.rows.len() > self.max_rows {
            self.rows.pop_back();
        }
        if self.follow {
            self.scroll = self.max_scroll();
        } else {
            // Keep what the user was reading stationary
            self.scroll = (self.scroll + height).min(self.max_scroll());
        }
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.scroll = 0;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}

/// Draw the entire UI
pub fn draw(frame: &mut Frame, app: &mut App) {
    let main_chunks = if app.show_side_panel {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDE_PANEL_WIDTH), Constraint::Min(20)])
            .split(frame.area())
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20)])
            .split(frame.area())
    };

    if app.show_side_panel {
        draw_alias_panel(frame, app, main_chunks[0]);
    }

    let content_area = if app.show_side_panel {
        main_chunks[1]
    } else {
        main_chunks[0]
    };

    let content_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Log view
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Filter bar
        ])
        .split(content_area);

    draw_header(frame, app, content_chunks[0]);
    draw_log_view(frame, app, content_chunks[1]);
    draw_status_bar(frame, app, content_chunks[2]);
    draw_filter_bar(frame, app, content_chunks[3]);

    if app.show_help {
        draw_help_overlay(frame, &app.theme);
    }
}

/// Draw the tracked-alias list
fn draw_alias_panel(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focused_panel == FocusedPanel::Aliases;
    let border_style = if focused {
        Style::default().fg(app.theme.border_focused)
    } else {
        Style::default().fg(app.theme.border_unfocused)
    };

    let block = Block::default()
        .title(" Logs ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let items: Vec<ListItem> = app
        .aliases
        .iter()
        .enumerate()
        .map(|(i, alias)| {
            let prefix = if i == app.current_alias_idx { "▶ " } else { "  " };
            let mut style = Style::default();
            if i == app.current_alias_idx {
                style = style.fg(app.theme.alias_current);
            }
            if focused && i == app.selected_alias_idx {
                style = style.add_modifier(Modifier::REVERSED);
            }
            ListItem::new(format!("{}{}", prefix, alias)).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let mut spans = vec![
        Span::styled(
            format!(" {} ", app.current_alias()),
            Style::default()
                .fg(theme.header_title)
                .add_modifier(Modifier::BOLD),
        ),
        badge(app, theme),
    ];

    if let Some(md) = app.controller.metadata() {
        spans.push(Span::styled(
            format!("  {} · {} lines", md.size_human, md.total_lines),
            Style::default().fg(theme.header_info),
        ));
    }

    let pending = app.controller.pending_count();
    if pending > 0 {
        spans.push(Span::styled(
            format!("  [{} pending]", format_pending(pending)),
            Style::default().fg(theme.pending_badge),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn badge(app: &App, theme: &Theme) -> Span<'static> {
    let (label, color) = match (app.controller.mode(), app.controller.link()) {
        (Mode::Historical, _) => (" HISTORY ", theme.badge_history),
        (Mode::Paused, _) => (" PAUSED ", theme.badge_paused),
        (Mode::Live, LinkStatus::Live) => (" LIVE ", theme.badge_live),
        (Mode::Live, LinkStatus::Connecting) => (" CONNECTING ", theme.badge_paused),
        (Mode::Live, LinkStatus::Offline) => (" OFFLINE ", theme.badge_offline),
    };
    Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::REVERSED),
    )
}

fn draw_log_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focused_panel == FocusedPanel::LogView;
    let border_style = if focused {
        Style::default().fg(app.theme.border_focused)
    } else {
        Style::default().fg(app.theme.border_unfocused)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    app.surface.viewport = inner.height as usize;

    if !app.surface.visible || app.surface.rows.is_empty() {
        let hint = if app.aliases.is_empty() {
            "no tracked logs"
        } else {
            "waiting for log data..."
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(app.theme.empty_state)),
            inner,
        );
        return;
    }

    let width = inner.width as usize;
    let mut lines: Vec<Line> = Vec::with_capacity(app.surface.viewport);
    for row in app.surface.visible_rows() {
        match row {
            Row::Log { text, .. } => lines.extend(render_log_line(text).lines),
            Row::System(msg) => lines.push(Line::from(Span::styled(
                msg.clone(),
                Style::default()
                    .fg(app.theme.system_line)
                    .add_modifier(Modifier::ITALIC),
            ))),
            Row::Divider => lines.push(divider_line(width, &app.theme)),
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render one raw log line, honoring any ANSI escape codes it carries.
fn render_log_line(text: &str) -> Text<'static> {
    if text.contains('\x1b') {
        text.as_bytes()
            .into_text()
            .unwrap_or_else(|_| Text::raw(text.to_string()))
    } else {
        Text::raw(text.to_string())
    }
}

fn divider_line(width: usize, theme: &Theme) -> Line<'static> {
    let label = " live stream started ";
    let fill = width.saturating_sub(label.len()) / 2;
    let bar: String = "─".repeat(fill);
    Line::from(Span::styled(
        format!("{}{}{}", bar, label, bar),
        Style::default().fg(theme.divider),
    ))
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let buffer = app.controller.buffer();

    let mut spans = Vec::new();
    if let Some(msg) = &app.status_message {
        spans.push(Span::raw(format!(" {} ", msg)));
    } else if !buffer.is_empty() {
        spans.push(Span::styled(
            format!(" lines {}–{} ", buffer.start_line(), buffer.end_line()),
            Style::default().fg(theme.header_info),
        ));
        if app.controller.is_at_top() {
            spans.push(Span::styled("· top ", Style::default().fg(theme.header_info)));
        }
    }
    if app.controller.is_loading() {
        spans.push(Span::styled(
            "loading... ",
            Style::default().fg(theme.badge_paused),
        ));
    }
    if let Some(filter) = app.controller.filter() {
        spans.push(Span::styled(
            format!("filter:{} ", filter.term),
            Style::default().fg(theme.border_focused),
        ));
    }
    spans.push(Span::styled(
        "? help · q quit",
        Style::default().fg(theme.status_help),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_filter_bar(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(9), Constraint::Min(10)])
        .split(area);

    let label_style = if app.mode == InputMode::FilterEditing {
        Style::default().fg(app.theme.border_focused)
    } else {
        Style::default().fg(app.theme.status_help)
    };
    frame.render_widget(Paragraph::new(" filter> ").style(label_style), chunks[0]);
    frame.render_widget(&app.filter_textarea, chunks[1]);
}

fn draw_help_overlay(frame: &mut Frame, theme: &Theme) {
    let area = centered_rect(50, 14, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from("  j/k, wheel   scroll"),
        Line::from("  ctrl-u/d     page up / down"),
        Line::from("  g / G        jump to top / bottom"),
        Line::from("  p, space     pause / resume"),
        Line::from("  /            edit filter (enter apply, esc cancel)"),
        Line::from("  esc          clear filter"),
        Line::from("  c            clear view"),
        Line::from("  t            cycle theme"),
        Line::from("  b            toggle log list"),
        Line::from("  tab          switch panel"),
        Line::from("  q            quit"),
    ];
    let block = Block::default()
        .title(" Keys ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_focused));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
