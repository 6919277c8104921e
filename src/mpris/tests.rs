use super::*;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

fn make_track() -> Track {
    let mut track = Track::minimal(7, &PathBuf::from("/tmp/music/test.mp3"));
    track.name = "Test Title".to_string();
    track.artist = Some("Test Artist".to_string());
    track.album = Some("Test Album".to_string());
    track.duration = Duration::from_micros(1_234_567);
    track
}

fn handle() -> (MprisHandle, Arc<Mutex<SharedState>>, Receiver<()>) {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify, notify_rx) = mpsc::channel::<()>();
    (
        MprisHandle {
            state: state.clone(),
            notify,
        },
        state,
        notify_rx,
    )
}

fn player(state: &Arc<Mutex<SharedState>>) -> (PlayerIface, Receiver<ControlCmd>) {
    let (tx, rx) = mpsc::channel::<ControlCmd>();
    (
        PlayerIface {
            tx,
            state: state.clone(),
        },
        rx,
    )
}

#[test]
fn set_track_metadata_sets_and_clears_shared_state() {
    let (handle, state, notify) = handle();

    let track = make_track();
    handle.set_track_metadata(Some(7), Some(&track));

    {
        let s = state.lock().unwrap();
        assert_eq!(s.title.as_deref(), Some("Test Title"));
        assert_eq!(s.artist, vec!["Test Artist".to_string()]);
        assert_eq!(s.album.as_deref(), Some("Test Album"));
        assert!(s.url.as_deref().unwrap().contains("/tmp/music/test.mp3"));
        assert_eq!(s.length_micros, Some(1_234_567));
        assert_eq!(
            s.track_id.as_ref().map(|p| p.as_str()),
            Some("/org/mpris/MediaPlayer2/track/7")
        );
    }

    handle.set_track_metadata(None, None);
    {
        let s = state.lock().unwrap();
        assert_eq!(s.title, None);
        assert!(s.artist.is_empty());
        assert_eq!(s.album, None);
        assert_eq!(s.url, None);
        assert_eq!(s.length_micros, None);
        assert!(s.track_id.is_none());
    }

    assert_eq!(notify.try_iter().count(), 2);
}

#[test]
fn unknown_duration_has_no_length() {
    let (handle, state, _notify) = handle();
    let mut track = make_track();
    track.duration = Duration::ZERO;
    handle.set_track_metadata(Some(0), Some(&track));
    assert_eq!(state.lock().unwrap().length_micros, None);
}

#[test]
fn playback_status_maps_transport() {
    let (handle, state, _notify) = handle();
    let (iface, _rx) = player(&state);

    assert_eq!(iface.playback_status(), "Stopped");
    handle.set_playback(Transport::Loaded);
    assert_eq!(iface.playback_status(), "Stopped");
    handle.set_playback(Transport::Playing);
    assert_eq!(iface.playback_status(), "Playing");
    handle.set_playback(Transport::Paused);
    assert_eq!(iface.playback_status(), "Paused");
}

#[test]
fn position_follows_progress_fraction() {
    let (handle, state, _notify) = handle();
    let (iface, _rx) = player(&state);

    let mut track = make_track();
    track.duration = Duration::from_secs(100);
    handle.set_track_metadata(Some(1), Some(&track));
    assert_eq!(iface.position(), 0);

    handle.set_progress(0.25);
    assert_eq!(iface.position(), 25_000_000);
    handle.set_progress(3.0);
    assert_eq!(iface.position(), 100_000_000);
    handle.set_progress(f64::NAN);
    assert_eq!(iface.position(), 0);
}

#[test]
fn player_methods_relay_commands() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (iface, rx) = player(&state);

    iface.play_pause();
    iface.next();
    iface.previous();
    iface.play();
    iface.pause();

    let cmds: Vec<ControlCmd> = rx.try_iter().collect();
    assert_eq!(
        cmds,
        vec![
            ControlCmd::PlayPause,
            ControlCmd::Next,
            ControlCmd::Prev,
            ControlCmd::Play,
            ControlCmd::Pause,
        ]
    );
}

#[test]
fn metadata_includes_expected_keys_when_present() {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (iface, _rx) = player(&state);

    assert!(iface.metadata().is_empty());

    {
        let mut s = state.lock().unwrap();
        s.title = Some("Title".to_string());
        s.artist = vec!["Artist".to_string()];
        s.album = Some("Album".to_string());
        s.url = Some("file:///tmp/test.mp3".to_string());
        s.length_micros = Some(42);
        s.track_id = OwnedObjectPath::try_from("/org/mpris/MediaPlayer2/track/1").ok();
    }

    let map = iface.metadata();
    for k in [
        "mpris:trackid",
        "xesam:title",
        "xesam:artist",
        "xesam:album",
        "xesam:url",
        "mpris:length",
    ] {
        assert!(map.contains_key(k), "missing key: {k}");
    }
}
