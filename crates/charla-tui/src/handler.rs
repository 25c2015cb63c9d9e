use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    let now = Instant::now();
    match event {
        AppEvent::Key(key) => handle_key(app, key, now),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse, now),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(now),
        AppEvent::Scheduled(scheduled) => app.apply_scheduled(scheduled),
    }
    app.sync_scroll();
}

fn handle_key(app: &mut App, key: KeyEvent, now: Instant) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match key.code {
        KeyCode::F(n @ 1..=3) => {
            app.toggle_tooltip(usize::from(n - 1), now);
            return;
        }
        KeyCode::PageUp => {
            app.scroll_up(app.chat_height.max(1));
            return;
        }
        KeyCode::PageDown => {
            app.scroll_down(app.chat_height.max(1));
            return;
        }
        _ => {}
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key, now),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, now: Instant) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('g') => {
            app.chat_scroll = 0;
            app.follow_bottom = false;
        }
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }

        // Nav bar tooltips
        KeyCode::Char(c @ '1'..='3') => {
            let item = c as usize - '1' as usize;
            app.toggle_tooltip(item, now);
        }
        KeyCode::Esc => app.tooltip.press_out(now),

        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
        }

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.send();
        }
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent, now: Instant) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let on_send = app.send_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let nav_item = app.nav_areas.iter().position(|r| point_in_rect(x, y, *r));

    match mouse.kind {
        MouseEventKind::ScrollDown if in_chat => app.scroll_down(3),
        MouseEventKind::ScrollUp if in_chat => app.scroll_up(3),
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(item) = nav_item {
                app.tooltip.press_in(item, now);
            } else if on_send {
                app.send();
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            // Release anywhere ends the press, like a touch leaving the button
            app.tooltip.press_out(now);
        }
        _ => {}
    }
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}
