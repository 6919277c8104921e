//! MPRIS relay: media keys and desktop widgets drive the controller through
//! `ControlCmd`, and read back status, metadata, and position.

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::object_server::InterfaceRef;
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::library::Track;
use crate::playback::Transport;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const BUS_NAME: &str = "org.mpris.MediaPlayer2.tremolo";
const NOTIFY_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Next,
    Prev,
}

#[derive(Debug, Default)]
struct SharedState {
    transport: Transport,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    length_micros: Option<i64>,
    track_id: Option<OwnedObjectPath>,
    /// Fraction of the current track played, `[0, 1]`.
    progress: f64,
}

impl SharedState {
    fn position_micros(&self) -> i64 {
        match self.length_micros {
            Some(len) => (len as f64 * self.progress.clamp(0.0, 1.0)) as i64,
            None => 0,
        }
    }
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
}

impl MprisHandle {
    pub fn set_playback(&self, transport: Transport) {
        if let Ok(mut s) = self.state.lock() {
            s.transport = transport;
        }
        let _ = self.notify.send(());
    }

    pub fn set_track_metadata(&self, index: Option<usize>, track: Option<&Track>) {
        if let Ok(mut s) = self.state.lock() {
            match track {
                Some(t) => {
                    s.title = Some(t.name.clone());
                    s.artist = t.artist.iter().cloned().collect();
                    s.album = t.album.clone();
                    s.url = Some(format!("file://{}", t.source.display()));
                    s.length_micros = t
                        .known_duration()
                        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
                    s.track_id = index.and_then(track_object_path);
                }
                None => {
                    s.title = None;
                    s.artist.clear();
                    s.album = None;
                    s.url = None;
                    s.length_micros = None;
                    s.track_id = None;
                }
            }
            s.progress = 0.0;
        }
        let _ = self.notify.send(());
    }

    /// Publish playback progress as a `[0, 1]` fraction.
    pub fn set_progress(&self, fraction: f64) {
        if let Ok(mut s) = self.state.lock() {
            s.progress = if fraction.is_nan() {
                0.0
            } else {
                fraction.clamp(0.0, 1.0)
            };
        }
    }
}

fn track_object_path(index: usize) -> Option<OwnedObjectPath> {
    ObjectPath::try_from(format!("{OBJECT_PATH}/track/{index}"))
        .ok()
        .map(OwnedObjectPath::from)
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {
        // No window to raise.
    }

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "tremolo"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.transport {
            Transport::Playing => "Playing",
            Transport::Paused => "Paused",
            Transport::Idle | Transport::Loaded => "Stopped",
        }
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros()).unwrap_or(0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut insert = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        if let Some(id) = &s.track_id {
            insert("mpris:trackid", owned(Value::ObjectPath(id.clone().into_inner())));
        }
        if let Some(title) = &s.title {
            insert("xesam:title", owned(Value::from(title.clone())));
        }
        if !s.artist.is_empty() {
            insert("xesam:artist", owned(Value::from(s.artist.clone())));
        }
        if let Some(album) = &s.album {
            insert("xesam:album", owned(Value::from(album.clone())));
        }
        if let Some(url) = &s.url {
            insert("xesam:url", owned(Value::from(url.clone())));
        }
        if let Some(len) = s.length_micros {
            insert("mpris:length", owned(Value::from(len)));
        }
        map
    }
}

/// Emit `PropertiesChanged` for whatever the handle touched since last time.
async fn forward_changes(player: &InterfaceRef<PlayerIface>, notify: &Receiver<()>) {
    loop {
        Timer::after(NOTIFY_INTERVAL).await;
        let mut changed = false;
        while notify.try_recv().is_ok() {
            changed = true;
        }
        if !changed {
            continue;
        }

        let iface = player.get().await;
        let emitter = player.signal_emitter();
        if let Err(e) = iface.playback_status_changed(emitter).await {
            debug!(error = %e, "could not signal playback status");
        }
        if let Err(e) = iface.metadata_changed(emitter).await {
            debug!(error = %e, "could not signal metadata");
        }
    }
}

pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel::<()>();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        block_on(async move {
            let connection = match Connection::session().await {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "MPRIS: failed to connect to session bus");
                    return;
                }
            };

            if let Err(e) = connection.request_name(BUS_NAME).await {
                warn!(error = %e, "MPRIS: failed to acquire name");
                return;
            }

            let object_server = connection.object_server();

            if let Err(e) = object_server
                .at(OBJECT_PATH, RootIface { tx: tx.clone() })
                .await
            {
                warn!(error = %e, "MPRIS: failed to register root iface");
                return;
            }

            if let Err(e) = object_server
                .at(
                    OBJECT_PATH,
                    PlayerIface {
                        tx,
                        state: state_for_thread,
                    },
                )
                .await
            {
                warn!(error = %e, "MPRIS: failed to register player iface");
                return;
            }

            let player = match object_server
                .interface::<_, PlayerIface>(OBJECT_PATH)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "MPRIS: player iface not found");
                    return;
                }
            };
            debug!("MPRIS service up");
            forward_changes(&player, &notify_rx).await;
        });
    });

    MprisHandle {
        state,
        notify: notify_tx,
    }
}

#[cfg(test)]
mod tests;
