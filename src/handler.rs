use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::App;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Paste(text) => {
            app.conversation.insert_str(&text);
        }
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
}

/// Shift+Enter is the newline chord. Alt+Enter is accepted as well because
/// many terminals cannot report Shift on Enter.
fn is_newline_chord(modifiers: KeyModifiers) -> bool {
    modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT)
}

fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => app.should_quit = true,
        KeyCode::Esc => app.should_quit = true,

        KeyCode::Enter if is_newline_chord(key.modifiers) => {
            app.conversation.insert_newline();
        }
        KeyCode::Enter => {
            app.submit();
        }

        // Message list scrolling
        KeyCode::Char('u') if ctrl => app.scroll_half_page_up(),
        KeyCode::Char('d') if ctrl => app.scroll_half_page_down(),
        KeyCode::PageUp => app.scroll_page_up(),
        KeyCode::PageDown => app.scroll_page_down(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),

        // Draft editing (the conversation refuses these while a reply is pending)
        KeyCode::Backspace => {
            app.conversation.backspace();
        }
        KeyCode::Delete => {
            app.conversation.delete();
        }
        KeyCode::Left => app.conversation.move_left(),
        KeyCode::Right => app.conversation.move_right(),
        KeyCode::Home => app.conversation.move_home(),
        KeyCode::End => app.conversation.move_end(),
        KeyCode::Char(c) if !ctrl => {
            app.conversation.insert_char(c);
        }

        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Clicking Send does exactly what Enter does
    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
        let on_send = app
            .send_area
            .is_some_and(|r| point_in_rect(mouse.column, mouse.row, r));
        if on_send {
            app.submit();
        }
        return;
    }

    let over_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(true);
    if !over_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollUp => app.scroll_up(3),
        MouseEventKind::ScrollDown => app.scroll_down(3),
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: ratatui::layout::Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}
