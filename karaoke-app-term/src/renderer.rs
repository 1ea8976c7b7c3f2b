//! Terminal lyric display drawn with crossterm.

use async_trait::async_trait;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::terminal::{
    self, disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use karaoke_core::timing::word_state;
use karaoke_core::{
    format_time, CoreError, DisplayConfig, DurationExt, Frame, FrameSink, Sentence, WordState,
};
use std::io::{self, Stdout, Write};
use std::time::Duration;
use tracing::warn;

const MAX_PROGRESS_WIDTH: usize = 50;
const FALLBACK_COLUMNS: u16 = 80;
/// Audio/lyrics drift below this is not worth showing.
const DRIFT_DISPLAY_THRESHOLD_MS: u64 = 250;
const HELP_LINE: &str = "space pause  \u{2190}/\u{2192} seek  +/- volume  q quit";

/// How a piece of text is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Title,
    Plain,
    Dim,
    Active,
    Sung,
    Upcoming,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

pub type Line = Vec<Span>;

/// Lays out frames as styled lines.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    pub display: DisplayConfig,
    pub highlight_duration_ms: u64,
}

impl Layout {
    #[must_use]
    pub fn compose(&self, frame: &Frame, columns: u16) -> Vec<Line> {
        let mut lines = vec![
            vec![Span::new(
                format!("\u{266a} {} - {}", frame.title, frame.artist),
                Style::Title,
            )],
            Vec::new(),
        ];

        if self.display.show_previous_sentence {
            lines.push(sentence_line(frame.previous.as_ref(), Style::Dim));
        }

        match &frame.current {
            Some(sentence) => lines.push(self.current_line(sentence, frame.elapsed_ms())),
            None => lines.push(vec![Span::new("\u{266a} \u{266a} \u{266a}", Style::Dim)]),
        }

        if self.display.show_next_sentence {
            lines.push(sentence_line(frame.next.as_ref(), Style::Upcoming));
        }
        lines.push(Vec::new());

        if self.display.show_progress_bar {
            let width = usize::from(columns.saturating_sub(4)).min(MAX_PROGRESS_WIDTH);
            lines.push(vec![Span::new(
                progress_bar(frame.progress, width),
                Style::Plain,
            )]);
        }
        if self.display.show_time_info {
            lines.push(vec![Span::new(
                format!(
                    "{} / {}",
                    format_time(frame.elapsed_ms()),
                    format_time(frame.total_duration.as_millis_u64())
                ),
                Style::Plain,
            )]);
        }

        lines.push(vec![Span::new(status_text(frame), Style::Status)]);
        lines.push(vec![Span::new(HELP_LINE, Style::Dim)]);
        lines
    }

    fn current_line(&self, sentence: &Sentence, t: u64) -> Line {
        let mut line = Vec::with_capacity(sentence.words().len() * 2);
        for (i, word) in sentence.words().iter().enumerate() {
            if i > 0 {
                line.push(Span::new(" ", Style::Plain));
            }
            let style = match word_state(word.time, t, self.highlight_duration_ms) {
                WordState::Active => Style::Active,
                WordState::Sung => Style::Sung,
                WordState::Upcoming => Style::Upcoming,
            };
            line.push(Span::new(word.text.clone(), style));
        }
        line
    }
}

fn sentence_line(sentence: Option<&Sentence>, style: Style) -> Line {
    sentence
        .map(|s| vec![Span::new(s.text(), style)])
        .unwrap_or_default()
}

fn status_text(frame: &Frame) -> String {
    let state = if frame.is_paused() { "[PAUSED]" } else { "" };
    let audio = if frame.audio_enabled {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (frame.volume * 100.0).round() as u32;
        match frame.audio_position {
            Some(position) => format!(
                "volume {percent}%  audio {}{}",
                format_time(position.as_millis_u64()),
                drift_text(position, frame.elapsed)
            ),
            None => format!("volume {percent}%"),
        }
    } else {
        "visual only".to_string()
    };
    if state.is_empty() {
        audio
    } else {
        format!("{state} {audio}")
    }
}

/// Audio position relative to the lyric clock, e.g. ` (drift +400ms)`.
fn drift_text(audio: Duration, lyrics: Duration) -> String {
    let (ahead, behind) = (audio.saturating_sub(lyrics), lyrics.saturating_sub(audio));
    if ahead.as_millis_u64() >= DRIFT_DISPLAY_THRESHOLD_MS {
        format!(" (drift +{}ms)", ahead.as_millis_u64())
    } else if behind.as_millis_u64() >= DRIFT_DISPLAY_THRESHOLD_MS {
        format!(" (drift -{}ms)", behind.as_millis_u64())
    } else {
        String::new()
    }
}

/// `[#####-----]` style bar, `width` cells between the brackets.
#[must_use]
pub fn progress_bar(progress: f64, width: usize) -> String {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let filled = ((progress.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}]",
        "\u{2588}".repeat(filled),
        "\u{2591}".repeat(width - filled)
    )
}

const fn color_for(style: Style) -> Option<Color> {
    match style {
        Style::Title => Some(Color::Cyan),
        Style::Plain => None,
        Style::Dim | Style::Upcoming => Some(Color::DarkGrey),
        Style::Active => Some(Color::Yellow),
        Style::Sung => Some(Color::Green),
        Style::Status => Some(Color::Magenta),
    }
}

/// Raw mode plus alternate screen, restored on drop.
pub struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be switched to raw mode.
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { active: true })
    }

    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Err(e) = execute!(io::stdout(), Show, LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

/// [`FrameSink`] drawing onto the alternate screen.
pub struct TerminalRenderer<W = Stdout> {
    layout: Layout,
    out: W,
}

impl TerminalRenderer {
    #[must_use]
    pub fn new(display: DisplayConfig, highlight_duration_ms: u64) -> Self {
        Self::with_writer(display, highlight_duration_ms, io::stdout())
    }
}

impl<W: Write> TerminalRenderer<W> {
    #[must_use]
    pub fn with_writer(display: DisplayConfig, highlight_duration_ms: u64, out: W) -> Self {
        Self {
            layout: Layout {
                display,
                highlight_duration_ms,
            },
            out,
        }
    }

    fn draw_frame(&mut self, lines: &[Line]) -> karaoke_core::Result<()> {
        self.draw(lines).map_err(|e| CoreError::RenderError {
            reason: format!("terminal write failed: {e}"),
        })
    }

    fn draw(&mut self, lines: &[Line]) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All))?;
        for (row, line) in (0u16..).zip(lines) {
            queue!(self.out, MoveTo(2, row + 1))?;
            for span in line {
                if span.style == Style::Active {
                    queue!(self.out, SetAttribute(Attribute::Bold))?;
                }
                if let Some(color) = color_for(span.style) {
                    queue!(self.out, SetForegroundColor(color))?;
                }
                queue!(
                    self.out,
                    Print(&span.text),
                    ResetColor,
                    SetAttribute(Attribute::Reset)
                )?;
            }
        }
        self.out.flush()
    }
}

#[async_trait]
impl<W: Write + Send> FrameSink for TerminalRenderer<W> {
    async fn render(&mut self, frame: &Frame) -> karaoke_core::Result<()> {
        let (columns, _) = terminal::size().unwrap_or((FALLBACK_COLUMNS, 0));
        let lines = self.layout.compose(frame, columns);
        self.draw_frame(&lines)
    }

    async fn finished(&mut self, frame: &Frame) -> karaoke_core::Result<()> {
        let (columns, _) = terminal::size().unwrap_or((FALLBACK_COLUMNS, 0));
        let mut lines = self.layout.compose(frame, columns);
        lines.push(Vec::new());
        lines.push(vec![Span::new("Song finished!", Style::Title)]);
        self.draw_frame(&lines)
    }
}
