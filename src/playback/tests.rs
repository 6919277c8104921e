use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::audio::fake::FakeDevice;
use crate::audio::{AudioGraph, DeviceEvent, GraphMode, TapRegistry};
use crate::config::Settings;
use crate::library::Track;

use super::*;

type Controller = PlaybackController<FakeDevice, StdRng>;

fn track(id: usize) -> Track {
    let mut t = Track::minimal(id, &PathBuf::from(format!("/music/{id:02}.mp3")));
    t.duration = Duration::from_secs(200);
    t
}

fn tracks(n: usize) -> Vec<Track> {
    (0..n).map(track).collect()
}

fn controller_with(settings: &Settings, n: usize) -> Controller {
    let graph = AudioGraph::new(FakeDevice::new("fake"), TapRegistry::new(), 256);
    let mut c = PlaybackController::with_rng(graph, settings, StdRng::seed_from_u64(7));
    c.load_queue(tracks(n));
    c
}

fn controller(n: usize) -> Controller {
    controller_with(&Settings::default(), n)
}

fn playing(n: usize) -> Controller {
    let mut c = controller(n);
    c.play();
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
    c
}

fn drain(rx: &Receiver<PlaybackEvent>) -> Vec<PlaybackEvent> {
    rx.try_iter().collect()
}

// ---- queue and loading ----

#[test]
fn load_queue_on_empty_selects_first_track() {
    let c = controller(3);
    assert_eq!(c.current_index(), Some(0));
    assert_eq!(c.transport(), Transport::Idle);
    assert!(c.graph().device().loaded.is_empty());
}

#[test]
fn load_queue_empty_goes_idle() {
    let mut c = playing(3);
    let (_, rx) = c.subscribe();
    c.load_queue(Vec::new());

    assert_eq!(c.current_index(), None);
    assert_eq!(c.transport(), Transport::Idle);
    assert_eq!(drain(&rx), vec![PlaybackEvent::PlayStateChanged(false)]);
    assert!(!c.load_track(0));
}

#[test]
fn load_queue_keeps_index_that_still_fits() {
    let mut c = controller(5);
    c.load_track(3);
    c.load_queue(tracks(4));
    assert_eq!(c.current_index(), Some(3));

    c.load_queue(tracks(2));
    assert_eq!(c.current_index(), Some(0));
}

#[test]
fn load_track_wraps_both_ends() {
    let mut c = controller(4);
    assert!(c.load_track(-1));
    assert_eq!(c.current_index(), Some(3));
    assert!(c.load_track(4));
    assert_eq!(c.current_index(), Some(0));
    assert_eq!(c.graph().device().loaded, vec![3, 0]);
}

#[test]
fn load_track_emits_zeroed_time_then_track_change() {
    let mut c = controller(2);
    let (_, rx) = c.subscribe();
    c.load_track(1);

    let events = drain(&rx);
    assert_eq!(
        events,
        vec![
            PlaybackEvent::TimeUpdate(TimeUpdate {
                current_time: Duration::ZERO,
                duration: Some(Duration::from_secs(200)),
                progress_percent: 0.0,
            }),
            PlaybackEvent::TrackChanged {
                track: track(1),
                index: 1,
            },
        ]
    );
    assert_eq!(c.transport(), Transport::Loaded);
}

// ---- transport ----

#[test]
fn play_on_empty_queue_is_noop() {
    let mut c = controller(0);
    c.play();
    c.poll();
    assert_eq!(c.transport(), Transport::Idle);
    assert!(c.graph().device().starts.is_empty());
    assert_eq!(c.graph_mode(), None);
}

#[test]
fn play_loads_first_track_and_builds_graph() {
    let mut c = controller(3);
    let (_, rx) = c.subscribe();
    c.play();

    assert_eq!(c.graph().device().loaded, vec![0]);
    assert_eq!(c.graph_mode(), Some(GraphMode::Full));
    assert!(c.analysis_tap().is_some());
    // The outcome is not applied until the device reports it.
    assert_eq!(c.transport(), Transport::Loaded);
    assert!(c.is_active());

    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
    let events = drain(&rx);
    assert_eq!(events.last(), Some(&PlaybackEvent::PlayStateChanged(true)));
}

#[test]
fn graph_is_resumed_before_start() {
    let mut c = controller(1);
    c.play();
    let chain = c.graph().device().chain.clone();
    assert!(chain.is_some_and(|ch| ch.clock.is_running()));
}

#[test]
fn start_failure_leaves_transport_and_is_not_retried() {
    let mut c = controller(2);
    c.graph_mut().device_mut().reject_start = true;
    c.play();
    c.poll();

    assert_eq!(c.transport(), Transport::Loaded);
    assert!(!c.is_active());
    assert_eq!(c.graph().device().starts.len(), 1);
    c.poll();
    assert_eq!(c.graph().device().starts.len(), 1);
}

#[test]
fn pause_is_synchronous() {
    let mut c = playing(2);
    let (_, rx) = c.subscribe();
    c.pause();

    assert_eq!(c.transport(), Transport::Paused);
    assert_eq!(c.graph().device().pauses, 1);
    assert_eq!(drain(&rx), vec![PlaybackEvent::PlayStateChanged(false)]);
}

#[test]
fn pause_when_idle_is_noop() {
    let mut c = controller(2);
    c.pause();
    assert_eq!(c.transport(), Transport::Idle);
    assert_eq!(c.graph().device().pauses, 0);
}

#[test]
fn toggle_twice_restores_transport() {
    let mut c = playing(2);
    c.toggle();
    assert_eq!(c.transport(), Transport::Paused);
    c.toggle();
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);

    c.pause();
    c.toggle();
    c.poll();
    c.toggle();
    assert_eq!(c.transport(), Transport::Paused);
}

// ---- start generations ----

#[test]
fn start_completing_after_pause_is_ignored() {
    let mut c = controller(2);
    c.graph_mut().device_mut().defer_starts = true;
    c.play();
    c.pause();

    c.graph_mut().device_mut().resolve_starts();
    c.poll();
    assert_eq!(c.transport(), Transport::Paused);
    assert!(!c.is_active());
}

#[test]
fn only_latest_start_completes_after_navigation() {
    let mut c = controller(3);
    c.graph_mut().device_mut().defer_starts = true;
    let (_, rx) = c.subscribe();
    c.play();
    c.next();

    let starts = c.graph().device().starts.clone();
    assert_eq!(starts.len(), 2);
    assert_ne!(starts[0], starts[1]);

    c.graph_mut().device_mut().resolve_starts();
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
    assert_eq!(c.current_index(), Some(1));
    let play_events = drain(&rx)
        .into_iter()
        .filter(|e| matches!(e, PlaybackEvent::PlayStateChanged(true)))
        .count();
    assert_eq!(play_events, 1);
}

#[test]
fn stale_start_failure_is_ignored() {
    let mut c = controller(2);
    c.play();
    let stale = c.graph().device().starts[0];
    c.poll();
    c.graph_mut().device_mut().push_event(DeviceEvent::StartFailed {
        generation: stale,
        reason: "late".to_string(),
    });
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
}

// ---- navigation ----

#[test]
fn next_cycles_through_queue() {
    let mut c = controller(3);
    c.load_track(0);
    let mut visited = Vec::new();
    for _ in 0..3 {
        c.next();
        visited.push(c.current_index().unwrap_or(usize::MAX));
    }
    assert_eq!(visited, vec![1, 2, 0]);
}

#[test]
fn next_resumes_only_when_active() {
    let mut c = controller(3);
    c.load_track(0);
    c.next();
    assert!(c.graph().device().starts.is_empty());
    assert_eq!(c.transport(), Transport::Loaded);

    let mut c = playing(3);
    c.next();
    c.poll();
    assert_eq!(c.current_index(), Some(1));
    assert_eq!(c.transport(), Transport::Playing);
}

#[test]
fn shuffle_never_repeats_current() {
    let mut c = controller(5);
    c.set_shuffle(true);
    c.load_track(0);
    for _ in 0..200 {
        let before = c.current_index();
        c.next();
        assert_ne!(c.current_index(), before);
    }
}

#[test]
fn previous_goes_back_and_wraps() {
    let mut settings = Settings::default();
    settings.playback.previous_restart_threshold_ms = 0;
    let mut c = controller_with(&settings, 3);
    c.load_track(0);
    c.graph_mut().device_mut().position = Duration::from_secs(60);
    c.previous();
    assert_eq!(c.current_index(), Some(2));
    c.previous();
    assert_eq!(c.current_index(), Some(1));
}

#[test]
fn previous_restarts_past_threshold() {
    let mut c = playing(3);
    c.load_track(1);
    c.graph_mut().device_mut().position = Duration::from_secs(10);
    c.previous();

    assert_eq!(c.current_index(), Some(1));
    assert_eq!(c.graph().device().seeks, vec![Duration::ZERO]);

    // Near the start it navigates instead.
    c.graph_mut().device_mut().position = Duration::from_secs(1);
    c.previous();
    assert_eq!(c.current_index(), Some(0));
}

#[test]
fn play_random_picks_other_track_and_plays() {
    let mut c = controller(4);
    c.load_track(2);
    c.play_random();
    assert_ne!(c.current_index(), Some(2));
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
}

// ---- track end and errors ----

#[test]
fn track_end_advances_and_plays() {
    let mut c = playing(3);
    c.graph_mut().device_mut().push_event(DeviceEvent::Ended);
    c.poll();
    assert_eq!(c.current_index(), Some(1));
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
}

#[test]
fn track_end_wraps_to_first() {
    let mut c = playing(2);
    c.next();
    c.poll();
    c.graph_mut().device_mut().push_event(DeviceEvent::Ended);
    c.poll();
    assert_eq!(c.current_index(), Some(0));
}

#[test]
fn repeat_reloads_same_track_from_zero() {
    let mut c = playing(3);
    c.set_repeat(true);
    c.graph_mut().device_mut().position = Duration::from_secs(199);
    let (_, rx) = c.subscribe();
    c.graph_mut().device_mut().push_event(DeviceEvent::Ended);
    c.poll();

    assert_eq!(c.current_index(), Some(0));
    assert_eq!(c.graph().device().loaded, vec![0, 0]);
    assert_eq!(c.graph().device().position, Duration::ZERO);
    let first = drain(&rx).into_iter().next();
    assert!(matches!(
        first,
        Some(PlaybackEvent::TimeUpdate(TimeUpdate { current_time, .. })) if current_time.is_zero()
    ));
}

#[test]
fn shuffle_end_of_single_track_replays_it() {
    let mut c = playing(1);
    c.set_shuffle(true);
    c.graph_mut().device_mut().push_event(DeviceEvent::Ended);
    c.poll();
    assert_eq!(c.current_index(), Some(0));
    assert_eq!(c.graph().device().loaded, vec![0, 0]);
}

#[test]
fn ended_while_paused_is_ignored() {
    let mut c = playing(3);
    c.pause();
    c.graph_mut().device_mut().push_event(DeviceEvent::Ended);
    c.poll();
    assert_eq!(c.current_index(), Some(0));
    assert_eq!(c.transport(), Transport::Paused);
}

#[test]
fn device_error_advances_ignoring_repeat() {
    let mut c = playing(3);
    c.set_repeat(true);
    c.graph_mut().device_mut().push_event(DeviceEvent::Error {
        reason: "undecodable".to_string(),
    });
    c.poll();
    assert_eq!(c.current_index(), Some(1));
    c.poll();
    assert_eq!(c.transport(), Transport::Playing);
}

#[test]
fn device_error_while_paused_skips_without_playing() {
    let mut c = playing(3);
    c.pause();
    c.next();
    assert_eq!(c.transport(), Transport::Loaded);
    let starts = c.graph().device().starts.len();

    c.graph_mut().device_mut().push_event(DeviceEvent::Error {
        reason: "undecodable".to_string(),
    });
    c.poll();
    c.poll();

    assert_eq!(c.current_index(), Some(2));
    assert_eq!(c.transport(), Transport::Loaded);
    assert!(!c.is_active());
    assert_eq!(c.graph().device().starts.len(), starts);
}

#[test]
fn device_errors_on_every_track_stop_playback() {
    let mut c = playing(2);
    c.graph_mut().device_mut().reject_start = true;
    for _ in 0..2 {
        c.graph_mut().device_mut().push_event(DeviceEvent::Error {
            reason: "undecodable".to_string(),
        });
        c.poll();
    }
    assert_eq!(c.transport(), Transport::Paused);
    assert!(!c.is_active());
}

// ---- seeking ----

#[test]
fn seek_by_percentage_maps_to_duration() {
    let mut c = controller(1);
    c.load_track(0);
    c.seek_by_percentage(25.0);
    c.seek_by_percentage(150.0);
    c.seek_by_percentage(-3.0);
    assert_eq!(
        c.graph().device().seeks,
        vec![
            Duration::from_secs(50),
            Duration::from_secs(200),
            Duration::ZERO
        ]
    );
}

#[test]
fn seek_by_percentage_without_duration_or_nan_is_noop() {
    let mut c = controller(1);
    c.load_track(0);
    c.seek_by_percentage(f64::NAN);
    c.graph_mut().device_mut().duration = None;
    c.seek_by_percentage(50.0);
    assert!(c.graph().device().seeks.is_empty());
}

#[test]
fn seek_by_clamps_at_zero_and_duration() {
    let mut c = controller(1);
    c.load_track(0);
    c.graph_mut().device_mut().position = Duration::from_secs(3);
    c.seek_by(-5);
    c.graph_mut().device_mut().position = Duration::from_secs(198);
    c.seek_by(5);
    assert_eq!(
        c.graph().device().seeks,
        vec![Duration::ZERO, Duration::from_secs(200)]
    );
}

#[test]
fn time_advance_reports_progress_while_playing() {
    let mut c = playing(1);
    let (_, rx) = c.subscribe();
    c.graph_mut().device_mut().push_event(DeviceEvent::TimeAdvanced {
        position: Duration::from_secs(50),
    });
    c.poll();

    match drain(&rx).as_slice() {
        [PlaybackEvent::TimeUpdate(update)] => {
            assert_eq!(update.current_time, Duration::from_secs(50));
            assert!((update.progress_percent - 25.0).abs() < 1e-9);
            assert!((update.fraction() - 0.25).abs() < 1e-9);
        }
        other => panic!("unexpected events: {other:?}"),
    }
}

#[test]
fn replay_seeks_to_start_and_plays() {
    let mut c = controller(2);
    c.load_track(1);
    c.graph_mut().device_mut().position = Duration::from_secs(40);
    c.replay();
    c.poll();
    assert_eq!(c.graph().device().seeks, vec![Duration::ZERO]);
    assert_eq!(c.transport(), Transport::Playing);
    assert_eq!(c.current_index(), Some(1));
}

// ---- volume and modes ----

#[test]
fn set_volume_clamps() {
    let mut c = controller(1);
    assert_eq!(c.set_volume(1.5), 1.0);
    assert_eq!(c.volume(), 1.0);
    assert_eq!(c.set_volume(-0.2), 0.0);
    assert_eq!(c.volume(), 0.0);
    assert_eq!(c.set_volume(f32::NAN), 0.0);
    assert_eq!(c.set_volume(0.3), 0.3);
    assert_eq!(c.graph().device().volume, 0.3);
}

#[test]
fn volume_reaches_gain_stage() {
    let mut c = playing(1);
    c.set_volume(0.25);
    let gain = c.graph().device().chain.as_ref().map(|ch| ch.gain.get());
    assert_eq!(gain, Some(0.25));
}

#[test]
fn mute_remembers_and_restores_level() {
    let mut c = controller(1);
    c.set_volume(0.45);

    assert_eq!(c.toggle_mute(), 0.0);
    assert!(c.is_muted());
    assert_eq!(c.graph().device().volume, 0.0);

    assert_eq!(c.toggle_mute(), 0.45);
    assert!(!c.is_muted());
    assert_eq!(c.graph().device().volume, 0.45);
}

#[test]
fn unmute_after_volume_lowered_to_zero_uses_default_level() {
    let mut c = controller(1);
    c.set_volume(0.0);
    assert_eq!(c.toggle_mute(), 0.7);
    assert_eq!(c.volume(), 0.7);
}

#[test]
fn initial_volume_comes_from_settings() {
    let c = controller(1);
    assert_eq!(c.volume(), Settings::default().audio.initial_volume);
}

#[test]
fn toggles_flip_and_report() {
    let mut c = controller(1);
    assert!(c.toggle_shuffle());
    assert!(!c.toggle_shuffle());
    assert!(c.toggle_repeat());
    assert!(c.repeat());
}

// ---- observers and shutdown ----

#[test]
fn unsubscribed_and_dropped_receivers_stop_receiving() {
    let mut c = controller(2);
    let (id, rx) = c.subscribe();
    let (_, dropped) = c.subscribe();
    drop(dropped);
    c.unsubscribe(id);
    c.load_track(1);
    assert!(drain(&rx).is_empty());
}

#[test]
fn now_playing_reports_position() {
    let mut c = controller(2);
    assert_eq!(c.now_playing().map(|n| n.time.current_time), Some(Duration::ZERO));
    c.load_track(1);
    c.graph_mut().device_mut().position = Duration::from_secs(100);
    let now = c.now_playing();
    assert_eq!(now.as_ref().map(|n| n.index), Some(1));
    assert_eq!(now.map(|n| n.time.progress_percent), Some(50.0));
}

#[test]
fn shutdown_stops_and_releases_tap() {
    let registry = TapRegistry::new();
    let graph = AudioGraph::new(FakeDevice::new("fake"), registry.clone(), 256);
    let mut c = PlaybackController::with_rng(graph, &Settings::default(), StdRng::seed_from_u64(1));
    c.load_queue(tracks(2));
    c.play();
    c.poll();
    let (_, rx) = c.subscribe();

    c.shutdown(Duration::ZERO);
    assert_eq!(c.transport(), Transport::Paused);
    assert_eq!(c.graph_mode(), None);
    assert!(!registry.is_tapped(&crate::audio::DeviceId::new("fake")));
    assert_eq!(drain(&rx), vec![PlaybackEvent::PlayStateChanged(false)]);
}

// ---- policy ----

#[test]
fn wrap_index_edges() {
    assert_eq!(wrap_index(0, 0), None);
    assert_eq!(wrap_index(-1, 3), Some(2));
    assert_eq!(wrap_index(3, 3), Some(0));
    assert_eq!(wrap_index(1, 3), Some(1));
}

#[test]
fn random_index_single_entry_is_zero() {
    let mut rng = StdRng::seed_from_u64(3);
    assert_eq!(random_index_excluding(&mut rng, 1, 0), 0);
    for _ in 0..50 {
        assert_ne!(random_index_excluding(&mut rng, 2, 1), 1);
    }
}
