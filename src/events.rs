use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::settings::SettingsTab;

/// Dispatch one key event. Returns true when the app should quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    if app.settings.visible {
        handle_settings_key(app, key);
        return false;
    }

    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => return true,
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => app.new_chat(),
        (KeyModifiers::CONTROL, KeyCode::Char('s')) => app.settings.open(),
        (KeyModifiers::CONTROL, KeyCode::Char('x')) => app.remove_last_attachment(),
        (_, KeyCode::Esc) => {
            if app.busy {
                app.stop_generation();
            }
        }
        (_, KeyCode::PageUp) => app.scroll_offset = app.scroll_offset.saturating_sub(5),
        (_, KeyCode::PageDown) => app.scroll_offset = app.scroll_offset.saturating_add(5),
        (KeyModifiers::SHIFT, KeyCode::Enter) => app.composer.insert_newline(),
        (_, KeyCode::Enter) => app.submit(),
        _ => {
            app.composer.input(Event::Key(key));
        }
    }
    false
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Esc) => app.settings.close(),
        (_, KeyCode::Left) => app.settings.previous_tab(),
        (_, KeyCode::Right) | (_, KeyCode::Tab) => app.settings.next_tab(),
        (_, KeyCode::Enter) => {
            if app.settings.current_tab() == SettingsTab::ApiKey {
                app.save_settings();
            }
        }
        (KeyModifiers::CONTROL, KeyCode::Char('d')) => {
            if app.settings.current_tab() == SettingsTab::ApiKey {
                app.remove_saved_key();
            }
        }
        (_, KeyCode::Backspace) => app.settings.backspace(),
        (m, KeyCode::Char(c)) if m.is_empty() || m == KeyModifiers::SHIFT => {
            if app.settings.current_tab() == SettingsTab::ApiKey {
                app.settings.push_char(c);
            }
        }
        _ => {}
    }
}
