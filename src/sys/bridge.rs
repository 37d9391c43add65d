//! The display bridge.
//!
//! The window manager does not speak the display protocol itself. An external
//! adapter writes [`Event`]s to our stdin as JSON lines and reads
//! [`Request`]s from our stdout. Logs therefore go to stderr only.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::actor::reactor::{self, Event};
use crate::model::{MonitorId, WindowHandle};
use crate::sys::geometry::Rect;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to write to the bridge: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One tag cell of the bar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TagIndicator {
    pub name: String,
    pub selected: bool,
    pub occupied: bool,
    pub urgent: bool,
    /// The focused client carries this tag.
    pub focused: bool,
}

/// Everything the bar renderer needs to redraw one monitor's bar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BarContent {
    pub monitor: MonitorId,
    pub show: bool,
    pub rect: Rect,
    /// Whether this is the selected monitor.
    pub active: bool,
    pub tags: Vec<TagIndicator>,
    pub layout_symbol: String,
    pub title: Option<String>,
    pub status: String,
}

/// Presentation values, forwarded once at startup. Opaque to the core.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Appearance {
    pub fonts: Vec<String>,
    pub normal: ColorScheme,
    pub selected: ColorScheme,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorScheme {
    pub foreground: String,
    pub background: String,
    pub border: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Appearance(Appearance),
    /// `rect` is the inner rectangle; the border is drawn outside it.
    MoveResize {
        window: WindowHandle,
        rect: Rect,
        border: i32,
    },
    Map { window: WindowHandle },
    Unmap { window: WindowHandle },
    SetBorderColor { window: WindowHandle, color: String },
    Raise { window: WindowHandle },
    /// `None` gives focus back to the root window.
    SetInputFocus { window: Option<WindowHandle> },
    Close { window: WindowHandle },
    UpdateBar(BarContent),
    /// Sent before quitting or re-executing; clients stay mapped.
    Release,
}

/// The placement surface the reactor drives.
///
/// Every operation is a fire-and-forget request; implementations only need
/// [`WindowSystem::send`].
pub trait WindowSystem {
    fn send(&mut self, request: Request);

    fn move_resize(&mut self, window: WindowHandle, rect: Rect, border: i32) {
        self.send(Request::MoveResize { window, rect, border });
    }

    fn map(&mut self, window: WindowHandle) { self.send(Request::Map { window }); }

    fn unmap(&mut self, window: WindowHandle) { self.send(Request::Unmap { window }); }

    fn set_border_color(&mut self, window: WindowHandle, color: &str) {
        self.send(Request::SetBorderColor { window, color: color.to_string() });
    }

    fn raise(&mut self, window: WindowHandle) { self.send(Request::Raise { window }); }

    fn set_input_focus(&mut self, window: Option<WindowHandle>) {
        self.send(Request::SetInputFocus { window });
    }

    fn close(&mut self, window: WindowHandle) { self.send(Request::Close { window }); }

    fn update_bar(&mut self, bar: BarContent) { self.send(Request::UpdateBar(bar)); }

    fn release(&mut self) { self.send(Request::Release); }
}

/// Writes requests as JSON lines.
pub struct StdioBridge<W: Write> {
    out: W,
}

impl StdioBridge<std::io::Stdout> {
    pub fn stdout() -> Self { Self::new(std::io::stdout()) }
}

impl<W: Write> StdioBridge<W> {
    pub fn new(out: W) -> Self { Self { out } }

    pub fn into_inner(self) -> W { self.out }

    fn write_request(&mut self, request: &Request) -> Result<(), BridgeError> {
        serde_json::to_writer(&mut self.out, request)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> WindowSystem for StdioBridge<W> {
    fn send(&mut self, request: Request) {
        trace!(?request, "bridge request");
        if let Err(e) = self.write_request(&request) {
            warn!("Dropping request: {e}");
        }
    }
}

/// Decodes one line from the bridge. Blank lines yield `None`.
pub fn parse_event_line(line: &str) -> Option<Result<Event, serde_json::Error>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(serde_json::from_str(line))
}

/// Forwards every event read from `input` to the reactor. Bad lines are
/// logged and skipped. End of input means the bridge went away, so the
/// reactor is asked to quit.
pub fn spawn_event_reader<R>(
    input: R,
    events_tx: reactor::Sender,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("bridge-reader".to_string())
        .spawn(move || read_events(input, &events_tx))
}

fn read_events<R: BufRead>(input: R, events_tx: &reactor::Sender) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read from the bridge: {e}");
                break;
            }
        };
        match parse_event_line(&line) {
            None => {}
            Some(Ok(Event::Unknown)) => debug!("Ignoring unknown event: {line}"),
            Some(Ok(event)) => {
                if events_tx.try_send(event).is_err() {
                    return;
                }
            }
            Some(Err(e)) => warn!("Skipping malformed event ({e}): {line}"),
        }
    }
    info!("Bridge input closed");
    events_tx.send(Event::Quit);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor;

    #[test]
    fn requests_are_json_lines() {
        let mut bridge = StdioBridge::new(Vec::new());
        bridge.map(WindowHandle(7));
        bridge.move_resize(WindowHandle(7), Rect::new(0, 0, 10, 20), 2);
        let out = String::from_utf8(bridge.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], r#"{"type":"map","window":7}"#);
        let decoded: Request = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(
            decoded,
            Request::MoveResize {
                window: WindowHandle(7),
                rect: Rect::new(0, 0, 10, 20),
                border: 2
            }
        );
    }

    #[test]
    fn reader_skips_bad_lines_and_quits_at_eof() {
        let input = concat!(
            "{\"type\":\"status_text\",\"text\":\"hi\"}\n",
            "\n",
            "not json\n",
            "{\"type\":\"something_new\"}\n",
            "{\"type\":\"window_destroyed\",\"window\":3}\n",
        );
        let (tx, mut rx) = actor::channel();
        read_events(std::io::Cursor::new(input), &tx);
        let mut events = Vec::new();
        while let Ok((_, event)) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                Event::StatusText { text: "hi".into() },
                Event::WindowDestroyed { window: WindowHandle(3) },
                Event::Quit,
            ]
        );
    }
}
