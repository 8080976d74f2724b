use crate::app::actions::Action;
use crate::app::events::{Event, InputEvent};
use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::mpsc;

const SEEK_STEP_SECS: f64 = 5.0;
const SEEK_LONG_STEP_SECS: f64 = 30.0;

pub fn spawn_input_task(tx: mpsc::Sender<Event>) {
    tokio::task::spawn_blocking(move || {
        loop {
            if !event::poll(std::time::Duration::from_millis(250)).unwrap_or(false) {
                if tx.is_closed() {
                    break;
                }
                continue;
            }
            let ev = match event::read() {
                Ok(CtEvent::Key(k)) if k.kind == KeyEventKind::Press => InputEvent::Key(k),
                Ok(CtEvent::Resize(_, _)) => InputEvent::Resize,
                _ => continue,
            };
            if tx.blocking_send(Event::Input(ev)).is_err() {
                break;
            }
        }
    });
}

pub fn map_input_to_action(ev: InputEvent) -> Option<Action> {
    match ev {
        InputEvent::Resize => Some(Action::Resize),
        InputEvent::Key(k) => map_key(k),
    }
}

fn map_key(k: KeyEvent) -> Option<Action> {
    match k.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),

        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Char(']') | KeyCode::Right => Some(Action::Seek(SEEK_STEP_SECS)),
        KeyCode::Char('[') | KeyCode::Left => Some(Action::Seek(-SEEK_STEP_SECS)),
        KeyCode::Char('}') => Some(Action::Seek(SEEK_LONG_STEP_SECS)),
        KeyCode::Char('{') => Some(Action::Seek(-SEEK_LONG_STEP_SECS)),
        KeyCode::Home | KeyCode::Char('0') => Some(Action::Restart),

        KeyCode::Char('=') | KeyCode::Char('+') | KeyCode::Up => Some(Action::VolumeUp),
        KeyCode::Char('-') | KeyCode::Char('_') | KeyCode::Down => Some(Action::VolumeDown),

        KeyCode::Char('f') => Some(Action::ToggleFavorite),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Option<Action> {
        map_input_to_action(InputEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    #[test]
    fn test_playback_keys() {
        assert_eq!(key(KeyCode::Char(' ')), Some(Action::TogglePause));
        assert_eq!(key(KeyCode::Char(']')), Some(Action::Seek(5.0)));
        assert_eq!(key(KeyCode::Left), Some(Action::Seek(-5.0)));
        assert_eq!(key(KeyCode::Home), Some(Action::Restart));
        assert_eq!(key(KeyCode::Char('+')), Some(Action::VolumeUp));
        assert_eq!(key(KeyCode::Char('f')), Some(Action::ToggleFavorite));
        assert_eq!(key(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(key(KeyCode::Char('q')), Some(Action::Quit));
        assert_eq!(key(KeyCode::Esc), Some(Action::Quit));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_input_to_action(InputEvent::Key(ctrl_c)), Some(Action::Quit));
        assert_eq!(map_input_to_action(InputEvent::Resize), Some(Action::Resize));
    }
}
