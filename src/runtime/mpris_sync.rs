use crate::audio::OutputDevice;
use crate::mpris::MprisHandle;
use crate::playback::{PlaybackController, PlaybackEvent, Transport};

/// Push the controller's full state to MPRIS, e.g. at startup.
pub fn update_mpris<D: OutputDevice>(mpris: &MprisHandle, controller: &PlaybackController<D>) {
    let index = controller.current_index();
    let track = if controller.transport() == Transport::Idle {
        None
    } else {
        controller.current_track()
    };
    mpris.set_track_metadata(index.filter(|_| track.is_some()), track);
    mpris.set_playback(controller.transport());
    if let Some(now) = controller.now_playing() {
        mpris.set_progress(now.time.fraction());
    }
}

/// Mirror one playback event to MPRIS. `transport` is the controller's
/// current state and only decides whether a stop leaves anything loaded.
pub fn forward_event(mpris: &MprisHandle, event: &PlaybackEvent, transport: Transport) {
    match event {
        PlaybackEvent::TimeUpdate(update) => mpris.set_progress(update.fraction()),
        PlaybackEvent::TrackChanged { track, index } => {
            mpris.set_track_metadata(Some(*index), Some(track));
        }
        PlaybackEvent::PlayStateChanged(playing) => {
            mpris.set_playback(transport_for(*playing, transport));
        }
    }
}

/// Transport a play-state change stands for.
fn transport_for(playing: bool, current: Transport) -> Transport {
    match (playing, current) {
        (true, _) => Transport::Playing,
        (false, Transport::Idle) => Transport::Idle,
        (false, _) => Transport::Paused,
    }
}
