use anyhow::Result;
use crossterm::event::{Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::time::timeout;

/// Application events
#[derive(Debug, Clone)]
pub enum Event {
    /// Keyboard input event
    Key(KeyEvent),

    /// Terminal resize event
    Resize(u16, u16),

    /// Periodic tick event
    Tick,
}

/// Event handler for managing input events
pub struct EventHandler {
    /// Poll window before falling back to a tick
    tick_interval: Duration,
}

impl EventHandler {
    pub fn new() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
        }
    }

    /// Get the next event, yielding a tick when no input arrives in time
    pub async fn next(&mut self) -> Result<Event> {
        let poll = timeout(
            self.tick_interval,
            tokio::task::spawn_blocking(|| -> Result<Option<CrosstermEvent>> {
                if crossterm::event::poll(Duration::from_millis(50))? {
                    Ok(Some(crossterm::event::read()?))
                } else {
                    Ok(None)
                }
            }),
        )
        .await;

        match poll {
            Ok(Ok(Ok(Some(event)))) => Ok(Self::convert_crossterm_event(event)),
            Ok(Ok(Ok(None))) => Ok(Event::Tick),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(join_error)) => Err(anyhow::anyhow!("Input task failed: {}", join_error)),
            Err(_elapsed) => Ok(Event::Tick),
        }
    }

    /// Convert crossterm events to application events
    fn convert_crossterm_event(event: CrosstermEvent) -> Event {
        match event {
            CrosstermEvent::Key(key_event) => Event::Key(key_event),
            CrosstermEvent::Resize(width, height) => Event::Resize(width, height),
            _ => Event::Tick,
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}
