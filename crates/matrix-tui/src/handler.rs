use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(w, h) => app.resize_surface(w, h),
        AppEvent::RainTick => app.tick_rain(),
        // Redraw only, for reveals in progress
        AppEvent::Tick => {}
    }
    Ok(())
}

/// Ctrl+Space. Some terminals report it as Ctrl+@ (NUL).
fn is_voice_shortcut(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char(' ') | KeyCode::Char('@'))
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }
    if is_voice_shortcut(&key) {
        app.widget.toggle_voice();
        return;
    }

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::Enter => app.submit_input(),

        KeyCode::F(2) => app.activate_avatar(),
        KeyCode::F(3) => app.toggle_rain(),
        KeyCode::F(5) => app.widget.check_status(),

        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1) / 2),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1) / 2),

        // Line editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;
    let hit = |area: Option<Rect>| area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if hit(app.send_area) {
                app.submit_input();
            } else if hit(app.voice_area) {
                app.widget.toggle_voice();
            } else if hit(app.avatar_area) {
                app.activate_avatar();
            }
        }
        MouseEventKind::ScrollDown if hit(app.chat_area) => app.scroll_down(3),
        MouseEventKind::ScrollUp if hit(app.chat_area) => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core::{Config, MatrixClient};
    use tokio::sync::mpsc;

    fn app() -> App {
        let config = Config::new();
        let client = MatrixClient::new(&config.server_url).unwrap();
        let (widget_tx, _) = mpsc::unbounded_channel();
        let (ui_tx, _) = mpsc::unbounded_channel();
        App::new(&config, client, widget_tx, ui_tx)
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    #[test]
    fn utf8_safe_indices() {
        assert_eq!(char_to_byte_index("néo", 2), 3);
        assert_eq!(char_to_byte_index("néo", 9), 4);
    }

    #[test]
    fn voice_shortcut_variants() {
        assert!(is_voice_shortcut(&ctrl(' ')));
        assert!(is_voice_shortcut(&ctrl('@')));
        assert!(!is_voice_shortcut(&KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)));
    }

    #[tokio::test]
    async fn line_editing() {
        let mut app = app();
        type_text(&mut app, "hllo");
        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Right)).unwrap();
        type_text(&mut app, "e");
        assert_eq!(app.input, "hello");
        assert_eq!(app.cursor, 2);

        handle_event(&mut app, key(KeyCode::End)).unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input, "hell");
        handle_event(&mut app, key(KeyCode::Home)).unwrap();
        handle_event(&mut app, key(KeyCode::Delete)).unwrap();
        assert_eq!(app.input, "ell");
    }

    #[tokio::test]
    async fn control_chords_are_not_typed() {
        let mut app = app();
        handle_event(&mut app, AppEvent::Key(ctrl('x'))).unwrap();
        assert!(app.input.is_empty());
        assert!(!app.should_quit);

        handle_event(&mut app, AppEvent::Key(ctrl('c'))).unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn enter_sends_and_clears_input() {
        let mut app = app();
        type_text(&mut app, "hello");
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();

        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert_eq!(app.widget.len(), 1);
        assert!(app.widget.state().speaking);
    }

    #[tokio::test]
    async fn clicking_avatar_greets() {
        let mut app = app();
        app.avatar_area = Some(Rect::new(2, 1, 8, 4));
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 4,
            row: 2,
            modifiers: KeyModifiers::NONE,
        };
        handle_event(&mut app, AppEvent::Mouse(click)).unwrap();
        assert_eq!(app.widget.len(), 1);

        let miss = MouseEvent { column: 40, ..click };
        handle_event(&mut app, AppEvent::Mouse(miss)).unwrap();
        assert_eq!(app.widget.len(), 1);
    }
}
