//! Keyboard controls for a running session.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use karaoke_core::{CoreError, PlaybackController};
use tracing::{debug, info, warn};

const VOLUME_STEP: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    SeekForward,
    SeekBackward,
    VolumeUp,
    VolumeDown,
    Quit,
}

/// Map a key press to a playback command.
#[must_use]
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Command::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char(' ') => Some(Command::TogglePause),
        KeyCode::Right => Some(Command::SeekForward),
        KeyCode::Left => Some(Command::SeekBackward),
        KeyCode::Char('+' | '=') => Some(Command::VolumeUp),
        KeyCode::Char('-') => Some(Command::VolumeDown),
        _ => None,
    }
}

/// Apply a command to the controller. Returns `false` when the session
/// should end.
pub async fn apply(controller: &PlaybackController, command: Command, seek_step_ms: i64) -> bool {
    let result = match command {
        Command::Quit => {
            info!("Quit requested");
            return false;
        }
        Command::TogglePause => controller
            .toggle_pause()
            .await
            .map(|state| debug!("Playback {}", state)),
        Command::SeekForward => controller
            .seek_by(seek_step_ms)
            .map(|position| debug!("Seeked to {:?}", position)),
        Command::SeekBackward => controller
            .seek_by(-seek_step_ms)
            .map(|position| debug!("Seeked to {:?}", position)),
        Command::VolumeUp => controller
            .adjust_volume(VOLUME_STEP)
            .map(|volume| debug!("Volume {:.1}", volume)),
        Command::VolumeDown => controller
            .adjust_volume(-VOLUME_STEP)
            .map(|volume| debug!("Volume {:.1}", volume)),
    };

    match result {
        Ok(()) => {}
        Err(e @ CoreError::InvalidTransition { .. }) => debug!("Ignoring {:?}: {}", command, e),
        Err(e) => warn!("{:?} failed: {}", command, e),
    }
    true
}
