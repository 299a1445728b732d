//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{App, AppState};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,

        // Month navigation
        KeyCode::Left | KeyCode::Char('h') => app.prev_month(),
        KeyCode::Right | KeyCode::Char('l') => app.next_month(),
        KeyCode::Char('t') => app.this_month(),
        KeyCode::Char('r') => app.retry(),

        // Lesson list
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::Home => app.selection = 0,
        KeyCode::End => app.selection = app.lessons.len().saturating_sub(1),
        _ => {}
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use reforco_core::cache::MemoryStore;
    use reforco_core::{CacheManager, CalendarMonth, Config};

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_input(app, KeyEvent::new(code, KeyModifiers::NONE)).unwrap()
    }

    fn test_app() -> App {
        App::new(
            Config::default(),
            CacheManager::new(MemoryStore::new()),
            None,
            CalendarMonth::new(2024, 3).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_quit_needs_confirmation() {
        let mut app = test_app();

        assert!(!press(&mut app, KeyCode::Char('q')));
        assert_eq!(app.state, AppState::ConfirmingQuit);
        assert!(!press(&mut app, KeyCode::Char('n')));
        assert_eq!(app.state, AppState::Normal);

        press(&mut app, KeyCode::Char('q'));
        assert!(press(&mut app, KeyCode::Char('y')));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[tokio::test]
    async fn test_help_overlay_swallows_keys() {
        let mut app = test_app();

        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.state, AppState::ShowingHelp);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.month, CalendarMonth::new(2024, 3).unwrap());
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Normal);
    }

    #[tokio::test]
    async fn test_arrows_and_vim_keys_change_month() {
        let mut app = test_app();

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.month, CalendarMonth::new(2024, 5).unwrap());

        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.month, CalendarMonth::new(2024, 4).unwrap());

        press(&mut app, KeyCode::Char('r'));
        assert!(app.is_loading());
    }
}
