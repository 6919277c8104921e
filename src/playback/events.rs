//! Observer surface of the playback controller.
//!
//! Each subscriber gets its own `mpsc` receiver. Dropped receivers are pruned
//! on the next emit, so unsubscribing is optional.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use crate::library::Track;

#[derive(Clone, Debug, PartialEq)]
pub struct TimeUpdate {
    pub current_time: Duration,
    /// `None` while the duration is unknown.
    pub duration: Option<Duration>,
    /// `0..=100`; 0 when the duration is unknown.
    pub progress_percent: f64,
}

impl TimeUpdate {
    pub fn new(current_time: Duration, duration: Option<Duration>) -> Self {
        let progress_percent = match duration {
            Some(d) if !d.is_zero() => {
                (current_time.as_secs_f64() / d.as_secs_f64() * 100.0).clamp(0.0, 100.0)
            }
            _ => 0.0,
        };
        Self {
            current_time,
            duration,
            progress_percent,
        }
    }

    /// Progress as a `[0, 1]` fraction for host-shell indicators.
    pub fn fraction(&self) -> f64 {
        self.progress_percent / 100.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    TimeUpdate(TimeUpdate),
    TrackChanged { track: Track, index: usize },
    PlayStateChanged(bool),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventHub {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sender<PlaybackEvent>)>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, tx));
        (id, rx)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sid, _)| *sid != id);
    }

    pub fn emit(&mut self, event: PlaybackEvent) {
        self.subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
    }
}
