//! Per-connection session state and the outbound write handle.
//!
//! A client owns nothing network-side directly: the reader task lives in
//! `main::handle_conn`, and writes go through a bounded channel drained by
//! that connection's writer task. Any task holding the `Arc` may write or
//! force a disconnect.

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use tracing::warn;

#[derive(Debug)]
pub struct Client {
    id: u64,
    ipid: String,
    tx: mpsc::Sender<Bytes>,
    shutdown: Notify,
    state: Mutex<ClientState>,
}

#[derive(Debug)]
struct ClientState {
    uid: i32,
    hdid: String,
    version: String,
    authenticated: bool,
    mod_name: String,
    perms: u64,
    area: usize,
    char_id: i32,
    ooc_name: String,
    last_msg: String,
}

impl Client {
    pub fn new(id: u64, ipid: String, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            id,
            ipid,
            tx,
            shutdown: Notify::new(),
            state: Mutex::new(ClientState {
                uid: -1,
                hdid: String::new(),
                version: String::new(),
                authenticated: false,
                mod_name: String::new(),
                perms: 0,
                area: 0,
                char_id: -1,
                ooc_name: String::new(),
                last_msg: String::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ipid(&self) -> &str {
        &self.ipid
    }

    pub fn uid(&self) -> i32 {
        self.state.lock().uid
    }

    pub fn set_uid(&self, uid: i32) {
        self.state.lock().uid = uid;
    }

    pub fn hdid(&self) -> String {
        self.state.lock().hdid.clone()
    }

    pub fn set_hdid(&self, hdid: String) {
        self.state.lock().hdid = hdid;
    }

    pub fn set_version(&self, version: String) {
        self.state.lock().version = version;
    }

    pub fn authenticated(&self) -> bool {
        self.state.lock().authenticated
    }

    pub fn perms(&self) -> u64 {
        self.state.lock().perms
    }

    pub fn set_perms(&self, perms: u64) {
        self.state.lock().perms = perms;
    }

    pub fn mod_name(&self) -> String {
        self.state.lock().mod_name.clone()
    }

    pub fn set_auth(&self, mod_name: String, perms: u64) {
        let mut st = self.state.lock();
        st.authenticated = true;
        st.mod_name = mod_name;
        st.perms = perms;
    }

    /// Clears moderator state and tells the client to drop its mod UI.
    pub fn remove_auth(&self) {
        {
            let mut st = self.state.lock();
            st.authenticated = false;
            st.mod_name.clear();
            st.perms = 0;
        }
        self.send_packet("AUTH", &["-1"]);
    }

    pub fn area_idx(&self) -> usize {
        self.state.lock().area
    }

    pub fn set_area_idx(&self, area: usize) {
        self.state.lock().area = area;
    }

    pub fn char_id(&self) -> i32 {
        self.state.lock().char_id
    }

    pub fn set_char_id(&self, char_id: i32) {
        self.state.lock().char_id = char_id;
    }

    pub fn ooc_name(&self) -> String {
        self.state.lock().ooc_name.clone()
    }

    pub fn set_ooc_name(&self, name: String) {
        self.state.lock().ooc_name = name;
    }

    pub fn last_msg(&self) -> String {
        self.state.lock().last_msg.clone()
    }

    pub fn set_last_msg(&self, msg: String) {
        self.state.lock().last_msg = msg;
    }

    /// Queues one wire frame. A full queue means the peer has stopped
    /// draining; the connection is dropped rather than buffering unbounded.
    pub fn write_bytes(&self, frame: Bytes) {
        match self.tx.try_send(frame) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(ipid = %self.ipid, "outbound queue full; disconnecting");
                self.disconnect();
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    pub fn write(&self, frame: String) {
        self.write_bytes(Bytes::from(frame));
    }

    pub fn send_packet(&self, name: &str, args: &[&str]) {
        if args.is_empty() {
            self.write(format!("{name}#%"));
        } else {
            self.write(format!("{}#{}#%", name, args.join("#")));
        }
    }

    /// Signals the reader task to close this connection. The permit is
    /// stored, so a not-yet-waiting reader still observes it.
    pub fn disconnect(&self) {
        self.shutdown.notify_one();
    }

    pub fn shutdown_notified(&self) -> Notified<'_> {
        self.shutdown.notified()
    }
}
