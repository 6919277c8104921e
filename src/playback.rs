//! Queue and transport state on top of the audio graph.

mod controller;
mod events;
mod policy;

pub use controller::{NowPlaying, PlaybackController, Transport};
pub use events::{EventHub, PlaybackEvent, SubscriptionId, TimeUpdate};
pub use policy::{random_index_excluding, wrap_index};

#[cfg(test)]
mod tests;
