use std::time::Instant;

use ratatui::style::{Color, Style};
use tui_textarea::TextArea;

use crate::config::Config;
use crate::controller::{Action, StreamController};
use crate::filter::FilterInput;
use crate::live::LiveEvent;
use crate::protocol::HistoryResponse;
use crate::render::RenderScheduler;
use crate::theme::{self, Theme};
use crate::ui::TuiSurface;

/// Input mode for the application
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Editing the filter text
    FilterEditing,
}

/// Which panel has focus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusedPanel {
    LogView,
    Aliases,
}

/// Main application state
pub struct App<'a> {
    /// The stream/window engine for the active source
    pub controller: StreamController,
    /// Queued render work, drained once per tick
    pub scheduler: RenderScheduler,
    /// Rendered rows and scroll position
    pub surface: TuiSurface,
    /// Debounce state for the filter box
    pub filter_input: FilterInput,
    /// Filter text input widget
    pub filter_textarea: TextArea<'a>,
    /// Current input mode
    pub mode: InputMode,
    /// Tracked log aliases from the server
    pub aliases: Vec<String>,
    /// Index of the connected alias
    pub current_alias_idx: usize,
    /// Index highlighted in the alias panel
    pub selected_alias_idx: usize,
    /// Which panel currently has focus
    pub focused_panel: FocusedPanel,
    /// Whether the alias panel is visible
    pub show_side_panel: bool,
    /// Whether to show help overlay
    pub show_help: bool,
    pub theme: Theme,
    /// Status message to display
    pub status_message: Option<String>,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Controller actions awaiting the event loop
    actions: Vec<Action>,
}

impl<'a> App<'a> {
    pub fn new(config: &Config, aliases: Vec<String>, current_alias_idx: usize) -> Self {
        let mut textarea = TextArea::default();
        textarea.set_cursor_line_style(Style::default());
        textarea.set_placeholder_text("type to filter...");
        textarea.set_placeholder_style(Style::default().fg(Color::DarkGray));

        Self {
            controller: StreamController::new(config),
            scheduler: RenderScheduler::new(config.chunk_size, config.chunk_threshold),
            surface: TuiSurface::new(config.max_lines + config.max_lines / 4),
            filter_input: FilterInput::new(config.filter_debounce),
            filter_textarea: textarea,
            mode: InputMode::Normal,
            aliases,
            current_alias_idx,
            selected_alias_idx: current_alias_idx,
            focused_panel: FocusedPanel::LogView,
            show_side_panel: true,
            show_help: false,
            theme: theme::load_saved(),
            status_message: None,
            should_quit: false,
            actions: Vec::new(),
        }
    }

    pub fn current_alias(&self) -> &str {
        self.aliases
            .get(self.current_alias_idx)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Drain actions for the event loop to perform.
    pub fn take_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    /// Connect (or reconnect) to the currently selected alias.
    pub fn connect_current(&mut self) {
        let actions = self.controller.switch_source(&mut self.scheduler);
        self.actions.extend(actions);
        self.status_message = Some(format!("Connecting to {}...", self.current_alias()));
    }

    /// Switch to another tracked alias. No state survives the switch.
    pub fn switch_alias(&mut self, idx: usize) {
        if idx >= self.aliases.len() || idx == self.current_alias_idx {
            return;
        }
        self.current_alias_idx = idx;
        self.connect_current();
    }

    pub fn on_live_event(&mut self, event: LiveEvent) {
        if let LiveEvent::Closed(reason) = &event {
            self.status_message = Some(match reason {
                Some(why) => format!("Disconnected: {}", why),
                None => "Disconnected".to_string(),
            });
        }
        self.controller.on_live_event(event, &mut self.scheduler);
    }

    pub fn on_history(
        &mut self,
        ticket: crate::controller::FetchTicket,
        result: anyhow::Result<HistoryResponse>,
    ) {
        let actions = self.controller.on_history(ticket, result, &mut self.scheduler);
        self.actions.extend(actions);
    }

    /// Report the surface's scroll position to the controller.
    pub fn report_scroll(&mut self) {
        let telemetry = self.surface.telemetry();
        let actions = self.controller.on_scroll(telemetry, &mut self.scheduler);
        self.actions.extend(actions);
    }

    pub fn toggle_pause(&mut self) {
        self.controller.toggle_pause(&mut self.scheduler);
    }

    pub fn jump_to_top(&mut self) {
        let actions = self.controller.jump_to_top();
        if actions.is_empty() {
            // Everything above is already in memory
            self.surface.to_top();
            self.report_scroll();
        } else {
            self.actions.extend(actions);
        }
    }

    pub fn jump_to_bottom(&mut self) {
        let actions = self.controller.jump_to_bottom(&mut self.scheduler);
        if actions.is_empty() {
            self.surface.to_bottom();
        }
        self.actions.extend(actions);
    }

    /// Clear the rendered view. The buffer is untouched; a filter change
    /// or mode transition will repopulate from it.
    pub fn clear_view(&mut self) {
        self.scheduler.clear();
        self.status_message = Some("View cleared".to_string());
    }

    pub fn cycle_theme(&mut self) {
        self.theme = self.theme.next();
        theme::persist(self.theme.name);
        self.status_message = Some(format!("Theme: {}", self.theme.name));
    }

    /// Get the current filter input text
    pub fn filter_text(&self) -> String {
        self.filter_textarea.lines().join("")
    }

    /// Mark that filter input changed (for debounce)
    pub fn filter_changed(&mut self) {
        self.filter_input.changed(self.filter_text(), Instant::now());
    }

    /// Apply the current filter input immediately.
    pub fn apply_filter(&mut self) {
        self.filter_input.cancel();
        let text = self.filter_text();
        self.controller.set_filter(&text, &mut self.scheduler);
        self.mode = InputMode::Normal;
    }

    /// Cancel filter editing and revert to the applied filter.
    pub fn cancel_filter(&mut self) {
        self.filter_input.cancel();
        let prev = self
            .controller
            .filter()
            .map(|f| f.term.clone())
            .unwrap_or_default();
        self.filter_textarea = TextArea::new(vec![prev]);
        self.filter_textarea.set_cursor_line_style(Style::default());
        self.mode = InputMode::Normal;
    }

    /// Clear any active filter.
    pub fn clear_filter(&mut self) {
        if self.controller.filter().is_some() {
            self.filter_textarea = TextArea::new(vec![String::new()]);
            self.filter_textarea.set_cursor_line_style(Style::default());
            self.controller.set_filter("", &mut self.scheduler);
            self.status_message = Some("Filter cleared".to_string());
        }
    }

    /// Per-tick upkeep: settle the filter debounce and advance the
    /// render queue by one step.
    pub fn tick(&mut self, now: Instant) {
        if let Some(text) = self.filter_input.tick(now) {
            self.controller.set_filter(&text, &mut self.scheduler);
        }
        self.scheduler.step(&mut self.surface);
    }

    /// Toggle side panel visibility
    pub fn toggle_side_panel(&mut self) {
        self.show_side_panel = !self.show_side_panel;
        if !self.show_side_panel {
            self.focused_panel = FocusedPanel::LogView;
        }
    }

    /// Cycle focus between panels
    pub fn cycle_focus(&mut self) {
        if !self.show_side_panel {
            return;
        }
        self.focused_panel = match self.focused_panel {
            FocusedPanel::LogView => FocusedPanel::Aliases,
            FocusedPanel::Aliases => FocusedPanel::LogView,
        };
    }
}

/// Clamp the pending counter for the header badge.
pub fn format_pending(count: usize) -> String {
    if count > 99 {
        "99+".to_string()
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pending_clamps_at_99() {
        assert_eq!(format_pending(0), "0");
        assert_eq!(format_pending(99), "99");
        assert_eq!(format_pending(100), "99+");
        assert_eq!(format_pending(5_000), "99+");
    }
}
