use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};
use tokio::sync::mpsc;

use crate::error::{AppError, Result};
use crate::tree::engine::Completion;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event; the next draw picks up the new size.
    Resize,
    /// Background tree work finished.
    Completion(Completion),
}

/// Merges terminal input and engine completions into one event stream.
///
/// Terminal polling runs on a blocking thread so the main context never
/// stalls on `crossterm::event::poll`.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    completions: mpsc::UnboundedReceiver<Completion>,
}

impl EventHandler {
    /// Start polling the terminal at `tick_rate`.
    pub fn new(tick_rate: Duration, completions: mpsc::UnboundedReceiver<Completion>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::task::spawn_blocking(move || loop {
            let event = if event::poll(tick_rate).unwrap_or(false) {
                match event::read() {
                    Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                        Event::Key(key)
                    }
                    Ok(CrosstermEvent::Mouse(mouse)) => Event::Mouse(mouse),
                    Ok(CrosstermEvent::Resize(..)) => Event::Resize,
                    _ => continue,
                }
            } else {
                Event::Tick
            };
            if tx.send(event).is_err() {
                break;
            }
        });

        Self { rx, completions }
    }

    /// Receive the next event, preferring completions so state settles first.
    pub async fn next(&mut self) -> Result<Event> {
        tokio::select! {
            biased;
            Some(completion) = self.completions.recv() => Ok(Event::Completion(completion)),
            event = self.rx.recv() => {
                event.ok_or_else(|| AppError::Terminal("Event channel closed".into()))
            }
        }
    }
}
