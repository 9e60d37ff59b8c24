use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tui_textarea::Input;

use crate::app::{App, FocusedPanel, InputMode};

/// Handle a mouse event
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.surface.scroll_up(3);
            app.report_scroll();
        }
        MouseEventKind::ScrollDown => {
            app.surface.scroll_down(3);
            app.report_scroll();
        }
        _ => {}
    }
}

/// Handle a key event and update app state accordingly
pub fn handle_key(app: &mut App, key: KeyEvent, page_size: usize) {
    // Help overlay takes priority
    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?')) {
            app.show_help = false;
        }
        return;
    }

    match app.mode {
        InputMode::Normal => handle_normal_mode(app, key, page_size),
        InputMode::FilterEditing => handle_filter_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, page_size: usize) {
    match key.code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        // Ctrl+C also quits
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Help
        KeyCode::Char('?') => {
            app.show_help = true;
        }

        // Toggle side panel
        KeyCode::Char('b') => {
            app.toggle_side_panel();
        }

        // Cycle focus between panels
        KeyCode::Tab => {
            app.cycle_focus();
        }

        // Navigation (context-dependent on focused panel)
        KeyCode::Char('j') | KeyCode::Down => match app.focused_panel {
            FocusedPanel::LogView => {
                app.surface.scroll_down(1);
                app.report_scroll();
            }
            FocusedPanel::Aliases => {
                if app.selected_alias_idx + 1 < app.aliases.len() {
                    app.selected_alias_idx += 1;
                }
            }
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focused_panel {
            FocusedPanel::LogView => {
                app.surface.scroll_up(1);
                app.report_scroll();
            }
            FocusedPanel::Aliases => {
                app.selected_alias_idx = app.selected_alias_idx.saturating_sub(1);
            }
        },

        // Enter connects to the selected alias
        KeyCode::Enter => {
            if app.focused_panel == FocusedPanel::Aliases {
                app.switch_alias(app.selected_alias_idx);
            }
        }

        KeyCode::PageDown | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.surface.scroll_down(page_size);
            app.report_scroll();
        }
        KeyCode::PageUp | KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.surface.scroll_up(page_size);
            app.report_scroll();
        }
        KeyCode::Char('g') => {
            app.jump_to_top();
        }
        KeyCode::Char('G') => {
            app.jump_to_bottom();
        }

        // Pause / resume tailing
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            app.toggle_pause();
        }

        // Enter filter mode
        KeyCode::Char('/') => {
            app.mode = InputMode::FilterEditing;
            app.focused_panel = FocusedPanel::LogView;
            app.filter_textarea.select_all();
            app.filter_textarea.cut();
        }

        // Clear the rendered view (buffer untouched)
        KeyCode::Char('c') => {
            app.clear_view();
        }

        // Cycle color theme
        KeyCode::Char('t') => {
            app.cycle_theme();
        }

        // Clear filter
        KeyCode::Esc => {
            app.clear_filter();
        }

        _ => {}
    }
}

fn handle_filter_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.apply_filter();
        }
        KeyCode::Esc => {
            app.cancel_filter();
        }
        _ => {
            // Forward all other keys to the textarea
            let input = Input::from(key);
            if app.filter_textarea.input(input) {
                // Text changed, mark for debounce
                app.filter_changed();
            }
        }
    }
}
