//! The server aggregate: configuration, the seeded lists, all areas, the
//! client registry and the store, plus every fan-out helper. Broadcasts
//! snapshot the recipient set (and any area state they render) before
//! queueing bytes, so no lock is ever held across the write path.

use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use gavelproto::escape::encode;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::area::{Area, LockState};
use crate::client::Client;
use crate::config::{AreaData, Config};
use crate::permissions::{self, Role};
use crate::registry::Registry;
use crate::store::Store;

pub const SOFTWARE: &str = "Athena";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ARUP aggregate kinds.
const ARUP_PLAYERS: u8 = 0;
const ARUP_STATUS: u8 = 1;
const ARUP_CM: u8 = 2;
const ARUP_LOCK: u8 = 3;

#[derive(Debug)]
pub struct Server {
    pub config: Config,
    pub characters: Vec<String>,
    pub music: Vec<String>,
    pub backgrounds: Vec<String>,
    pub areas: Vec<Area>,
    pub area_names: String,
    pub roles: Vec<Role>,
    pub registry: Registry,
    pub store: Store,
    ipid_salt: [u8; 16],
}

impl Server {
    pub fn new(
        config: Config,
        characters: Vec<String>,
        music: Vec<String>,
        backgrounds: Vec<String>,
        area_data: Vec<AreaData>,
        roles: Vec<Role>,
        store: Store,
    ) -> anyhow::Result<Self> {
        let mut ipid_salt = [0u8; 16];
        getrandom::getrandom(&mut ipid_salt)
            .map_err(|e| anyhow::anyhow!("getrandom failed: {e}"))?;

        let areas = area_data
            .iter()
            .map(|d| {
                Area::new(
                    d.name.clone(),
                    characters.len(),
                    config.server.log_buffer_size,
                )
            })
            .collect::<Vec<_>>();
        let area_names = area_data
            .iter()
            .map(|d| d.name.as_str())
            .collect::<Vec<_>>()
            .join("#");

        Ok(Self {
            config,
            characters,
            music,
            backgrounds,
            areas,
            area_names,
            roles,
            registry: Registry::new(),
            store,
            ipid_salt,
        })
    }

    /// Derives the opaque per-peer token: a salted hash of the source
    /// address, stable for the process lifetime.
    pub fn ipid(&self, ip: IpAddr) -> String {
        let mut h = Sha256::new();
        h.update(self.ipid_salt);
        h.update(ip.to_string().as_bytes());
        let mut s = hex_lower(&h.finalize());
        s.truncate(16);
        s
    }

    pub fn get_role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn character_name(&self, char_id: i32) -> String {
        if char_id == -1 {
            return "Spectator".to_string();
        }
        self.characters
            .get(char_id.max(0) as usize)
            .cloned()
            .unwrap_or_else(|| "Spectator".to_string())
    }

    // Fan-out.

    pub fn write_to_area(&self, area: usize, frame: &str) {
        let b = Bytes::from(frame.to_string());
        for c in self.registry.snapshot() {
            if c.uid() != -1 && c.area_idx() == area {
                c.write_bytes(b.clone());
            }
        }
    }

    pub fn write_to_joined(&self, frame: &str) {
        let b = Bytes::from(frame.to_string());
        for c in self.registry.snapshot() {
            if c.uid() != -1 {
                c.write_bytes(b.clone());
            }
        }
    }

    pub fn write_to_authenticated(&self, frame: &str) {
        let b = Bytes::from(frame.to_string());
        for c in self.registry.snapshot() {
            if c.authenticated() {
                c.write_bytes(b.clone());
            }
        }
    }

    /// One OOC line from the server to a single client.
    pub fn send_server_message(&self, client: &Client, msg: &str) {
        client.write(format!(
            "CT#{}#{}#1#%",
            encode(&self.config.server.name),
            encode(msg)
        ));
    }

    /// One OOC line from the server to everyone in an area.
    pub fn send_area_server_message(&self, area: usize, msg: &str) {
        self.write_to_area(
            area,
            &format!(
                "CT#{}#{}#1#%",
                encode(&self.config.server.name),
                encode(msg)
            ),
        );
    }

    // ARUP aggregates, one value per area, to every joined client.

    fn send_arup(&self, kind: u8, values: Vec<String>) {
        self.write_to_joined(&format!("ARUP#{}#{}#%", kind, values.join("#")));
    }

    pub fn send_player_arup(&self) {
        let v = self
            .areas
            .iter()
            .map(|a| a.player_count().to_string())
            .collect();
        self.send_arup(ARUP_PLAYERS, v);
    }

    pub fn send_status_arup(&self) {
        let v = self
            .areas
            .iter()
            .map(|a| a.status().as_str().to_uppercase())
            .collect();
        self.send_arup(ARUP_STATUS, v);
    }

    pub fn send_cm_arup(&self) {
        let v = self
            .areas
            .iter()
            .map(|a| {
                let cms = a.cms();
                if cms.is_empty() {
                    "FREE".to_string()
                } else {
                    cms.iter()
                        .map(|u| u.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                }
            })
            .collect();
        self.send_arup(ARUP_CM, v);
    }

    pub fn send_lock_arup(&self) {
        let v = self
            .areas
            .iter()
            .map(|a| a.lock_state().as_str().to_string())
            .collect();
        self.send_arup(ARUP_LOCK, v);
    }

    // Area helpers.

    pub fn chars_check(&self, area: usize) -> String {
        format!("CharsCheck#{}#%", self.areas[area].taken_list().join("#"))
    }

    pub fn le_packet(&self, area: usize) -> String {
        format!("LE#{}#%", self.areas[area].evidence().join("#"))
    }

    /// Moves a client to `dest`, enforcing the destination's admission test:
    /// a locked area admits only invited UIDs and lock-bypass holders.
    /// Returns whether the move happened.
    pub fn change_area(&self, client: &Arc<Client>, dest: usize) -> bool {
        let uid = client.uid();
        let char_id = client.char_id();
        let src = client.area_idx();
        let dest_area = &self.areas[dest];

        if dest_area.lock_state() == LockState::Locked
            && !dest_area.is_invited(uid)
            && !permissions::has(client.perms(), permissions::BYPASS_LOCK)
        {
            return false;
        }
        if !dest_area.add_char(char_id) {
            return false;
        }

        self.add_to_buffer(client, "AREA", "Left area.", false);
        self.areas[src].remove_char(char_id);
        client.set_area_idx(dest);

        let (def, pro) = dest_area.hp();
        client.write(self.le_packet(dest));
        client.write(format!("HP#1#{def}#%"));
        client.write(format!("HP#2#{pro}#%"));
        self.send_player_arup();
        self.write_to_area(dest, &self.chars_check(dest));
        self.add_to_buffer(client, "AREA", "Joined area.", false);
        true
    }

    /// Switches a client's character in place, rebroadcasting occupancy.
    pub fn change_character(&self, client: &Arc<Client>, new: i32) -> bool {
        let area = client.area_idx();
        if !self.areas[area].switch_char(client.char_id(), new) {
            return false;
        }
        client.set_char_id(new);
        self.write_to_area(area, &self.chars_check(area));
        true
    }

    /// Appends one line to the client's area event buffer. Audited entries
    /// also land in the server log.
    pub fn add_to_buffer(&self, client: &Client, kind: &str, msg: &str, audit: bool) {
        let uid = client.uid();
        let character = self.character_name(client.char_id());
        self.areas[client.area_idx()]
            .update_buffer(format!("{kind}: [{uid}] {character}: {msg}"));
        if audit {
            info!(uid = uid, ipid = %client.ipid(), "{kind}: {msg}");
        }
    }

    pub fn can_alter_evidence(&self, client: &Client) -> bool {
        use crate::area::EvidenceMode;
        let area = &self.areas[client.area_idx()];
        match area.evidence_mode() {
            EvidenceMode::Any => true,
            EvidenceMode::Cms => {
                area.has_cm(client.uid())
                    || permissions::has(client.perms(), permissions::MOD_EVI)
            }
            EvidenceMode::Mods => permissions::has(client.perms(), permissions::MOD_EVI),
        }
    }

    /// CM-level authority: the CM right, or being a CM of one's own area.
    pub fn has_cm_permission(&self, client: &Client) -> bool {
        permissions::has(client.perms(), permissions::CM)
            || self.areas[client.area_idx()].has_cm(client.uid())
    }

    pub fn get_uid_list(&self, uids: &[String]) -> Vec<Arc<Client>> {
        let snapshot = self.registry.snapshot();
        let mut out = Vec::new();
        for s in uids {
            let Ok(uid) = s.trim().parse::<i32>() else {
                continue;
            };
            if uid == -1 {
                continue;
            }
            if let Some(c) = snapshot.iter().find(|c| c.uid() == uid) {
                out.push(c.clone());
            }
        }
        out
    }

    pub fn get_ipid_list(&self, ipids: &[String]) -> Vec<Arc<Client>> {
        self.registry
            .snapshot()
            .into_iter()
            .filter(|c| c.uid() != -1 && ipids.iter().any(|i| i.trim() == c.ipid()))
            .collect()
    }

    /// Tears down a session's shared state after its connection ends.
    pub fn remove_client(&self, client: &Arc<Client>) {
        self.registry.remove(client.id());
        let uid = client.uid();
        if uid == -1 {
            return;
        }

        let area = &self.areas[client.area_idx()];
        area.remove_char(client.char_id());
        let was_cm = area.remove_cm(uid);
        area.remove_invited(uid);
        self.registry.release_uid(uid);
        self.registry.remove_player();

        self.send_player_arup();
        if was_cm {
            self.send_cm_arup();
        }
        info!(uid = uid, ipid = %client.ipid(), "client disconnected");
    }

    pub fn write_modcall_report(&self, area: usize) {
        let name = self.areas[area].name().to_string();
        let buffer = self.areas[area].buffer();
        let dir = std::path::Path::new(&self.config.server.report_dir);
        if let Err(e) = crate::report::write_report(dir, &name, &buffer) {
            warn!(err = %e, area = %name, "failed to write modcall report");
        }
    }
}

fn hex_lower(b: &[u8]) -> String {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(b.len() * 2);
    for &x in b {
        s.push(LUT[(x >> 4) as usize] as char);
        s.push(LUT[(x & 0x0f) as usize] as char);
    }
    s
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::ServerConfig;
    use tokio::sync::mpsc;

    pub(crate) fn test_server() -> Server {
        let config = Config {
            server: ServerConfig {
                name: "TestServer".to_string(),
                description: "a test server".to_string(),
                max_players: 10,
                log_buffer_size: 8,
                report_dir: std::env::temp_dir()
                    .join("gaveld-test-reports")
                    .to_string_lossy()
                    .into_owned(),
                ..ServerConfig::default()
            },
            master: Default::default(),
        };
        let characters = vec![
            "Phoenix".to_string(),
            "Edgeworth".to_string(),
            "Maya".to_string(),
            "Gumshoe".to_string(),
        ];
        let music = vec![
            "Songs".to_string(),
            "trial.mp3".to_string(),
            "cross-examination.mp3".to_string(),
        ];
        let backgrounds = vec!["courtroom".to_string(), "lobby".to_string()];
        let areas = vec![
            AreaData {
                name: "Lobby".to_string(),
            },
            AreaData {
                name: "Courtroom 1".to_string(),
            },
        ];
        let all = permissions::FIELD.iter().fold(0, |acc, (_, b)| acc | b);
        let roles = vec![
            Role {
                name: "admin".to_string(),
                perms: all,
            },
            Role {
                name: "mod".to_string(),
                perms: permissions::KICK | permissions::BAN,
            },
        ];
        Server::new(
            config,
            characters,
            music,
            backgrounds,
            areas,
            roles,
            Store::open_in_memory().unwrap(),
        )
        .unwrap()
    }

    pub(crate) fn connect(server: &Server) -> (Arc<Client>, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(64);
        let id = server.registry.alloc_conn_id();
        let client = Arc::new(Client::new(id, format!("ipid-{id}"), tx));
        server.registry.insert(client.clone());
        (client, rx)
    }

    /// A client that has completed the join handshake as a lobby spectator.
    pub(crate) fn join(server: &Server) -> (Arc<Client>, mpsc::Receiver<Bytes>) {
        let (client, rx) = connect(server);
        client.set_uid(server.registry.take_uid());
        server.registry.add_player();
        server.areas[0].add_char(-1);
        (client, rx)
    }

    pub(crate) fn drain(rx: &mut mpsc::Receiver<Bytes>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(b) = rx.try_recv() {
            out.push(String::from_utf8_lossy(&b).to_string());
        }
        out
    }
}
