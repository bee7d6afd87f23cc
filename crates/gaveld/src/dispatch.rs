//! The inbound packet dispatcher. The opcode table is plain data: name,
//! minimum argument count, whether the session must have completed the join
//! handshake, and the handler. Unknown opcodes, short packets and must-join
//! violations are dropped without a reply.
//!
//! Protocol reference:
//! https://github.com/AttorneyOnline/docs/blob/master/docs/development/network.md

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use gavelproto::escape::{decode, encode};
use gavelproto::packet::Packet;
use md5::{Digest, Md5};
use tracing::info;

use crate::client::Client;
use crate::commands;
use crate::server::{Server, SOFTWARE, VERSION};
use crate::store::BanLookup;

pub struct PacketDef {
    pub args: usize,
    pub must_join: bool,
    pub func: fn(&Server, &Arc<Client>, &Packet),
}

pub const PACKET_MAP: &[(&str, PacketDef)] = &[
    ("HI", PacketDef { args: 1, must_join: false, func: pkt_hdid }),
    ("ID", PacketDef { args: 2, must_join: false, func: pkt_id }),
    ("askchaa", PacketDef { args: 0, must_join: false, func: pkt_res_count }),
    ("RC", PacketDef { args: 0, must_join: false, func: pkt_req_char }),
    ("RM", PacketDef { args: 0, must_join: false, func: pkt_req_am }),
    ("RD", PacketDef { args: 0, must_join: false, func: pkt_req_done }),
    ("CC", PacketDef { args: 3, must_join: true, func: pkt_change_char }),
    ("MS", PacketDef { args: 15, must_join: true, func: pkt_ic }),
    ("MC", PacketDef { args: 2, must_join: true, func: pkt_am }),
    ("HP", PacketDef { args: 2, must_join: true, func: pkt_hp }),
    ("RT", PacketDef { args: 1, must_join: true, func: pkt_wtce }),
    ("CT", PacketDef { args: 2, must_join: true, func: pkt_ooc }),
    ("PE", PacketDef { args: 3, must_join: true, func: pkt_add_evi }),
    ("DE", PacketDef { args: 0, must_join: true, func: pkt_remove_evi }),
    ("EE", PacketDef { args: 4, must_join: true, func: pkt_edit_evi }),
    ("CH", PacketDef { args: 0, must_join: false, func: pkt_ping }),
    ("ZZ", PacketDef { args: 0, must_join: true, func: pkt_modcall }),
];

const FEATURES: &[&str] = &[
    "noencryption",
    "yellowtext",
    "prezoom",
    "flipping",
    "customobjections",
    "fastloading",
    "deskmod",
    "evidence",
    "cccc_ic_support",
    "arup",
    "casing_alerts",
    "looping_sfx",
    "additive",
    "effects",
    "y_offset",
    "expanded_desk_mods",
    "auth_packet",
];

pub fn dispatch(server: &Server, client: &Arc<Client>, p: &Packet) {
    let Some((_, def)) = PACKET_MAP.iter().find(|(name, _)| *name == p.name) else {
        return;
    };
    if p.body.len() < def.args {
        return;
    }
    if def.must_join && client.uid() == -1 {
        return;
    }
    (def.func)(server, client, p);
}

// HI#<hdid>#% — client hardware id.
fn pkt_hdid(server: &Server, client: &Arc<Client>, p: &Packet) {
    if p.body[0].trim().is_empty() || client.uid() != -1 {
        return;
    }

    // The raw HDID is never stored, only its MD5. That keeps the column a
    // bounded length and out of the privacy blast radius.
    let mut h = Md5::new();
    h.update(decode(&p.body[0]).as_bytes());
    let hdid = BASE64.encode(h.finalize());
    client.set_hdid(hdid.clone());

    if let Ok(Some(ban)) = server.store.is_banned(BanLookup::Hdid, &hdid) {
        info!(ipid = %client.ipid(), ban = ban.id, "rejected banned hdid");
        client.write(format!("BD#{}#%", ban.reason));
        client.disconnect();
        return;
    }
    client.write(format!("ID#0#{SOFTWARE}#{VERSION}#%"));
}

// ID#<client>#<version>#% — client software id.
fn pkt_id(server: &Server, client: &Arc<Client>, p: &Packet) {
    if client.uid() != -1 {
        return;
    }
    client.set_version(p.body[1].clone());
    client.write(format!(
        "PN#{}#{}#{}#%",
        server.registry.player_count(),
        server.config.server.max_players,
        encode(&server.config.server.description)
    ));
    client.write(format!("FL#{}#%", FEATURES.join("#")));
}

// askchaa#% — resource counts, and the last gate before loading.
fn pkt_res_count(server: &Server, client: &Arc<Client>, _p: &Packet) {
    if client.uid() != -1 {
        return;
    }
    if server.registry.player_count() >= server.config.server.max_players {
        info!("player limit reached");
        client.write("BD#This server is full#%".to_string());
        client.disconnect();
        return;
    }
    client.write(format!(
        "SI#{}#0#{}#%",
        server.characters.len(),
        server.music.len()
    ));
}

// RC#% — request character list.
fn pkt_req_char(server: &Server, client: &Arc<Client>, _p: &Packet) {
    client.write(format!("SC#{}#%", server.characters.join("#")));
}

// RM#% — request area and music lists.
fn pkt_req_am(server: &Server, client: &Arc<Client>, _p: &Packet) {
    client.write(format!(
        "SM#{}#{}#%",
        server.area_names,
        server.music.join("#")
    ));
}

// RD#% — loading finished; the session joins area 0 as a spectator.
fn pkt_req_done(server: &Server, client: &Arc<Client>, _p: &Packet) {
    if client.uid() != -1 {
        return;
    }
    let uid = server.registry.take_uid();
    client.set_uid(uid);
    server.registry.add_player();
    client.set_area_idx(0);
    server.areas[0].add_char(-1);
    server.send_player_arup();

    let (def, pro) = server.areas[0].hp();
    client.write(server.le_packet(0));
    client.write(server.chars_check(0));
    client.write(format!("HP#1#{def}#%"));
    client.write(format!("HP#2#{pro}#%"));
    info!(ipid = %client.ipid(), uid = uid, "client joined the server");
    client.send_packet("DONE", &[]);
}

// CC#<client>#<charid>#<hash>#% — character selection.
fn pkt_change_char(server: &Server, client: &Arc<Client>, p: &Packet) {
    let Ok(new_id) = p.body[1].parse::<i32>() else {
        return;
    };
    let area = client.area_idx();
    if server.areas[area].switch_char(client.char_id(), new_id) {
        client.set_char_id(new_id);
        client.write(format!("PV#0#CID#{new_id}#%"));
        server.write_to_area(area, &server.chars_check(area));
    }
}

// MS#...#% — in-character message.
fn pkt_ic(server: &Server, client: &Arc<Client>, p: &Packet) {
    let mut body = p.body.clone();
    body[4] = body[4].trim().to_string();

    if client.char_id() == -1 {
        return;
    }
    if body[4].len() > server.config.server.max_message_length {
        server.send_server_message(client, "Your message exceeds the maximum message length!");
        return;
    }
    if body[4] == client.last_msg() {
        return;
    }
    let args = body.len();

    // desk_mod
    if !["chat", "0", "1", "2", "3", "4", "5"].contains(&body[0].as_str()) {
        return;
    }

    // emote_modifier: 4 is a legacy alias for 6.
    if body[7] == "4" {
        body[7] = "6".to_string();
    }
    if !["0", "1", "2", "5", "6"].contains(&body[7].as_str()) {
        return;
    }

    // char_id must be the character the sender actually holds.
    if body[8] != client.char_id().to_string() {
        return;
    }

    let mut out: Vec<String> = body[..15].to_vec();
    if args >= 19 {
        // 2.6 extensions, with two reserved pair slots between them.
        out.extend([
            body[15].clone(),
            body[16].clone(),
            String::new(),
            String::new(),
            body[17].clone(),
            body[18].clone(),
        ]);
        if args == 26 {
            // 2.8 extensions.
            out.extend(body[19..].iter().cloned());
        }
    }

    client.set_last_msg(body[4].clone());
    server.write_to_area(client.area_idx(), &Packet::with_body("MS", out).to_string());
    server.add_to_buffer(client, "IC", &format!("\"{}\"", body[4]), false);
}

// MC#<song|area>#<charid>#% — music selection, or area change.
fn pkt_am(server: &Server, client: &Arc<Client>, p: &Packet) {
    if p.body[1] != client.char_id().to_string() {
        return;
    }

    if server.music.contains(&p.body[0]) && client.char_id() != -1 {
        // A list entry with no extension is a category header; selecting one
        // stops the music.
        let mut song = p.body[0].clone();
        if !song.contains('.') {
            song = "~stop.mp3".to_string();
        }
        let showname = p.body.get(2).cloned().unwrap_or_default();
        let effects = p.body.get(3).cloned().unwrap_or_else(|| "0".to_string());
        server.write_to_area(
            client.area_idx(),
            &format!("MC#{}#{}#{}#1#0#{}#%", song, p.body[1], showname, effects),
        );
        server.add_to_buffer(client, "MUSIC", &format!("Changed music to {song}."), false);
        return;
    }

    let wanted = decode(&p.body[0]);
    if wanted == server.areas[client.area_idx()].name() {
        return;
    }
    let Some(dest) = server.areas.iter().position(|a| a.name() == wanted) else {
        return;
    };
    if !server.areas[dest].add_char(client.char_id()) {
        return;
    }

    server.add_to_buffer(client, "AREA", "Left area.", false);
    server.areas[client.area_idx()].remove_char(client.char_id());
    client.set_area_idx(dest);

    let (def, pro) = server.areas[dest].hp();
    client.write(server.le_packet(dest));
    client.write(format!("HP#1#{def}#%"));
    client.write(format!("HP#2#{pro}#%"));
    server.send_player_arup();
    server.write_to_area(dest, &server.chars_check(dest));
    server.add_to_buffer(client, "AREA", "Joined area.", false);
}

// HP#<bar>#<value>#% — judge HP bars.
fn pkt_hp(server: &Server, client: &Arc<Client>, p: &Packet) {
    let (Ok(bar), Ok(value)) = (p.body[0].parse::<i32>(), p.body[1].parse::<i32>()) else {
        return;
    };
    if !server.areas[client.area_idx()].set_hp(bar, value) {
        return;
    }
    server.write_to_area(client.area_idx(), &format!("HP#{bar}#{value}#%"));

    let side = if bar == 1 { "Defense" } else { "Prosecution" };
    server.add_to_buffer(client, "JUD", &format!("Set {side} HP to {value}."), false);
}

// RT#<anim>#% — witness testimony / cross examination animations.
fn pkt_wtce(server: &Server, client: &Arc<Client>, p: &Packet) {
    server.write_to_area(client.area_idx(), &format!("RT#{}#%", p.body[0]));
    server.add_to_buffer(client, "JUD", "Played WT/CE animation.", false);
}

// CT#<name>#<message>#% — out-of-character chat and the command language.
fn pkt_ooc(server: &Server, client: &Arc<Client>, p: &Packet) {
    let dname = decode(p.body[0].trim());
    if dname.is_empty() || dname == server.config.server.name {
        server.send_server_message(client, "Invalid username.");
        return;
    }
    if p.body[1].len() > server.config.server.max_message_length {
        server.send_server_message(client, "Your message exceeds the maximum message length!");
        return;
    }
    for c in server.registry.snapshot() {
        if c.id() != client.id() && c.ooc_name() == dname {
            server.send_server_message(client, "That username is already taken.");
            return;
        }
    }
    client.set_ooc_name(dname);

    if p.body[1].starts_with('/') {
        let decoded = decode(&p.body[1]);
        let (command, args) = commands::tokenize(&decoded);
        commands::parse_command(server, client, &command, &args);
        return;
    }

    server.write_to_area(
        client.area_idx(),
        &format!("CT#{}#{}#0#%", encode(&client.ooc_name()), p.body[1]),
    );
    server.add_to_buffer(client, "OOC", &format!("\"{}\"", decode(&p.body[1])), false);
}

// PE#<name>#<description>#<image>#% — add evidence.
fn pkt_add_evi(server: &Server, client: &Arc<Client>, p: &Packet) {
    server.areas[client.area_idx()].add_evidence(p.body.join("&"));
    server.write_to_area(client.area_idx(), &server.le_packet(client.area_idx()));
    server.add_to_buffer(
        client,
        "EVI",
        &format!("Added evidence: {} | {}", p.body[0], p.body[1]),
        false,
    );
}

// DE#<id>#% — remove evidence.
fn pkt_remove_evi(server: &Server, client: &Arc<Client>, p: &Packet) {
    let Some(Ok(id)) = p.body.first().map(|s| s.parse::<usize>()) else {
        return;
    };
    server.areas[client.area_idx()].remove_evidence(id);
    server.write_to_area(client.area_idx(), &server.le_packet(client.area_idx()));
    server.add_to_buffer(client, "EVI", &format!("Removed evidence {id}."), false);
}

// EE#<id>#<name>#<description>#<image>#% — edit evidence.
fn pkt_edit_evi(server: &Server, client: &Arc<Client>, p: &Packet) {
    let Ok(id) = p.body[0].parse::<usize>() else {
        return;
    };
    server.areas[client.area_idx()].edit_evidence(id, p.body[1..].join("&"));
    server.write_to_area(client.area_idx(), &server.le_packet(client.area_idx()));
    server.add_to_buffer(
        client,
        "EVI",
        &format!("Updated evidence {} to {} | {}", id, p.body[1], p.body[2]),
        false,
    );
}

// CH#% — keepalive.
fn pkt_ping(_server: &Server, client: &Arc<Client>, _p: &Packet) {
    client.send_packet("CHECK", &[]);
}

// ZZ#<reason>#% — moderator call.
fn pkt_modcall(server: &Server, client: &Arc<Client>, p: &Packet) {
    let reason = p.body.first().cloned().unwrap_or_default();
    let area = client.area_idx();
    server.write_to_authenticated(&format!(
        "ZZ#[{}]{}({}): {}#%",
        server.areas[area].name(),
        server.character_name(client.char_id()),
        client.ipid(),
        reason
    ));
    server.write_modcall_report(area);
    server.add_to_buffer(
        client,
        "MOD",
        &format!("Called moderator for reason: {reason}."),
        false,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::testing::{connect, drain, join, test_server};

    fn send(server: &Server, client: &Arc<Client>, frame: &str) {
        let p = Packet::parse(frame).unwrap();
        dispatch(server, client, &p);
    }

    #[test]
    fn full_join_handshake() {
        let server = test_server();
        let (client, mut rx) = connect(&server);

        send(&server, &client, "HI#abcdef#");
        send(&server, &client, "ID#AO2#2.9#");
        send(&server, &client, "askchaa#");
        send(&server, &client, "RC#");
        send(&server, &client, "RM#");
        send(&server, &client, "RD#");

        let frames = drain(&mut rx);
        assert_eq!(
            frames,
            vec![
                format!("ID#0#Athena#{VERSION}#%"),
                "PN#0#10#a test server#%".to_string(),
                format!("FL#{}#%", FEATURES.join("#")),
                "SI#4#0#3#%".to_string(),
                "SC#Phoenix#Edgeworth#Maya#Gumshoe#%".to_string(),
                "SM#Lobby#Courtroom 1#Songs#trial.mp3#cross-examination.mp3#%".to_string(),
                "ARUP#0#1#0#%".to_string(),
                "LE##%".to_string(),
                "CharsCheck#0#0#0#0#%".to_string(),
                "HP#1#10#%".to_string(),
                "HP#2#10#%".to_string(),
                "DONE#%".to_string(),
            ]
        );
        assert_eq!(client.uid(), 0);
        assert_eq!(client.char_id(), -1);
        assert_eq!(server.registry.player_count(), 1);
        // The hardware id is stored hashed, not raw.
        assert_ne!(client.hdid(), "abcdef");
    }

    #[test]
    fn handshake_packets_ignore_joined_sessions() {
        let server = test_server();
        let (client, mut rx) = join(&server);
        send(&server, &client, "HI#abcdef#");
        send(&server, &client, "RD#");
        assert!(drain(&mut rx).is_empty());
        assert_eq!(server.registry.player_count(), 1);
    }

    #[test]
    fn full_server_turns_clients_away() {
        let server = test_server();
        for _ in 0..10 {
            join(&server);
        }
        let (client, mut rx) = connect(&server);
        send(&server, &client, "askchaa#");
        assert_eq!(drain(&mut rx), vec!["BD#This server is full#%"]);
    }

    #[test]
    fn banned_hdid_is_rejected() {
        let server = test_server();
        let now = chrono::Utc::now().timestamp();

        // Pre-compute the stored hash for the raw hdid "evil".
        let mut h = Md5::new();
        h.update(b"evil");
        let hashed = BASE64.encode(h.finalize());
        server
            .store
            .add_ban("someip", &hashed, now, -1, "begone", "admin")
            .unwrap();

        let (client, mut rx) = connect(&server);
        send(&server, &client, "HI#evil#");
        assert_eq!(drain(&mut rx), vec!["BD#begone#%"]);
    }

    #[test]
    fn must_join_packets_are_silent_before_rd() {
        let server = test_server();
        let (client, mut rx) = connect(&server);
        send(&server, &client, "CC#0#1#hash#");
        send(&server, &client, "HP#1#5#");
        send(&server, &client, "CT#name#hello#");
        send(&server, &client, "UNKNOWN#x#");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn short_packets_are_silent() {
        let server = test_server();
        let (client, mut rx) = join(&server);
        send(&server, &client, "CT#only-name#");
        send(&server, &client, "HP#1#");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn character_selection_marks_slot() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        let (b, mut rx_b) = join(&server);

        send(&server, &a, "CC#0#3#hash#");
        assert_eq!(a.char_id(), 3);
        assert!(server.areas[0].taken_list()[3] == "-1");
        let frames_a = drain(&mut rx_a);
        assert!(frames_a.contains(&"CharsCheck#0#0#0#-1#%".to_string()));
        assert!(frames_a.contains(&"PV#0#CID#3#%".to_string()));
        assert_eq!(drain(&mut rx_b), vec!["CharsCheck#0#0#0#-1#%"]);

        // The taken slot cannot be claimed by the other client.
        send(&server, &b, "CC#0#3#hash#");
        assert_eq!(b.char_id(), -1);
        assert!(drain(&mut rx_b).is_empty());
    }

    fn ms_body(char_id: i32, text: &str) -> String {
        // 15 base fields: deskmod, preanim, char, emote, text, side, sfx,
        // emote_mod, charid, sfx_delay, objection, evidence, flip, realize, color.
        format!("MS#chat#-#Phoenix#normal#{text}#def#1#0#{char_id}#0#0#0#0#0#0#")
    }

    #[test]
    fn ic_messages_broadcast_and_dedup() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        send(&server, &a, "CC#0#0#hash#");
        drain(&mut rx_a);

        send(&server, &a, &ms_body(0, "Hold it!"));
        let first = drain(&mut rx_a);
        assert_eq!(first.len(), 1);
        assert!(first[0].starts_with("MS#chat#"));
        assert!(first[0].contains("#Hold it!#"));

        // An identical message is dropped; a new one goes through.
        send(&server, &a, &ms_body(0, "Hold it!"));
        assert!(drain(&mut rx_a).is_empty());
        send(&server, &a, &ms_body(0, "Objection!"));
        assert_eq!(drain(&mut rx_a).len(), 1);
    }

    #[test]
    fn ic_rejects_spectators_and_spoofed_ids() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);

        // Spectator.
        send(&server, &a, &ms_body(-1, "ghost"));
        assert!(drain(&mut rx_a).is_empty());

        send(&server, &a, "CC#0#0#hash#");
        drain(&mut rx_a);

        // char_id spoofed to someone else's slot.
        send(&server, &a, &ms_body(2, "imposter"));
        assert!(drain(&mut rx_a).is_empty());

        // Oversized messages earn a server notice, not a broadcast.
        send(&server, &a, &ms_body(0, &"x".repeat(300)));
        let frames = drain(&mut rx_a);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("maximum message length"));
    }

    #[test]
    fn ic_remaps_legacy_emote_modifier() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        send(&server, &a, "CC#0#0#hash#");
        drain(&mut rx_a);

        send(&server, &a, "MS#chat#-#Phoenix#normal#hi#def#1#4#0#0#0#0#0#0#0#");
        let frames = drain(&mut rx_a);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("#6#0#"));
    }

    #[test]
    fn music_requests_broadcast() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        send(&server, &a, "CC#0#1#hash#");
        drain(&mut rx_a);

        send(&server, &a, "MC#trial.mp3#1#Edgeworth#1#");
        assert_eq!(
            drain(&mut rx_a),
            vec!["MC#trial.mp3#1#Edgeworth#1#0#1#%"]
        );

        // Category headers stop the music.
        send(&server, &a, "MC#Songs#1#Edgeworth#");
        assert_eq!(drain(&mut rx_a), vec!["MC#~stop.mp3#1#Edgeworth#1#0#0#%"]);

        // A spoofed char id is dropped.
        send(&server, &a, "MC#trial.mp3#0#Edgeworth#");
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn music_packet_moves_between_areas() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        send(&server, &a, "CC#0#1#hash#");
        drain(&mut rx_a);

        send(&server, &a, "MC#Courtroom 1#1#");
        assert_eq!(a.area_idx(), 1);
        assert_eq!(server.areas[0].player_count(), 0);
        assert_eq!(server.areas[1].player_count(), 1);
        assert_eq!(server.areas[1].taken_list()[1], "-1");
        let frames = drain(&mut rx_a);
        assert!(frames.iter().any(|f| f.starts_with("LE#")));
        assert!(frames.iter().any(|f| f.starts_with("CharsCheck#")));

        // Same-area requests are a no-op.
        send(&server, &a, "MC#Courtroom 1#1#");
        assert!(drain(&mut rx_a).is_empty());
    }

    #[test]
    fn hp_updates_are_bounds_checked() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);

        send(&server, &a, "HP#1#7#");
        assert_eq!(drain(&mut rx_a), vec!["HP#1#7#%"]);
        assert_eq!(server.areas[0].hp(), (7, 10));

        send(&server, &a, "HP#2#11#");
        send(&server, &a, "HP#3#5#");
        send(&server, &a, "HP#2#-1#");
        assert!(drain(&mut rx_a).is_empty());
        assert_eq!(server.areas[0].hp(), (7, 10));
    }

    #[test]
    fn ooc_chat_round_trips_escapes() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);

        send(&server, &a, "CT#mia#hello<num>world#");
        assert_eq!(a.ooc_name(), "mia");
        assert_eq!(drain(&mut rx_a), vec!["CT#mia#hello<num>world#0#%"]);
        // The decoded form lands in the area buffer.
        let buffer = server.areas[0].buffer();
        assert!(buffer[0].contains("\"hello#world\""));
    }

    #[test]
    fn ooc_names_are_validated() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        let (b, mut rx_b) = join(&server);

        send(&server, &a, "CT#mia#hi#");
        drain(&mut rx_a);
        drain(&mut rx_b);

        // Taken by another connected session.
        send(&server, &b, "CT#mia#hi#");
        let frames = drain(&mut rx_b);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].contains("That username is already taken."));

        // Empty and server-named are invalid.
        send(&server, &b, "CT# #x#");
        send(&server, &b, "CT#TestServer#x#");
        let frames = drain(&mut rx_b);
        assert!(frames.iter().all(|f| f.contains("Invalid username.")));
    }

    #[test]
    fn evidence_packets_update_the_area() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);

        send(&server, &a, "PE#knife#a knife#knife.png#");
        assert_eq!(drain(&mut rx_a), vec!["LE#knife&a knife&knife.png#%"]);

        send(&server, &a, "EE#0#dagger#a dagger#dagger.png#");
        assert_eq!(drain(&mut rx_a), vec!["LE#dagger&a dagger&dagger.png#%"]);

        // Out-of-range removal still rebroadcasts the unchanged list.
        send(&server, &a, "DE#5#");
        assert_eq!(drain(&mut rx_a), vec!["LE#dagger&a dagger&dagger.png#%"]);

        send(&server, &a, "DE#0#");
        assert_eq!(drain(&mut rx_a), vec!["LE##%"]);
    }

    #[test]
    fn ping_and_modcall() {
        let server = test_server();
        let (a, mut rx_a) = join(&server);
        let (m, mut rx_m) = join(&server);
        m.set_auth("admin".to_string(), 0);

        send(&server, &a, "CH#");
        assert_eq!(drain(&mut rx_a), vec!["CHECK#%"]);

        send(&server, &a, "ZZ#cheating#");
        let frames = drain(&mut rx_m);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("ZZ#[Lobby]Spectator("));
        assert!(frames[0].contains("cheating"));
        // Non-moderators hear nothing.
        assert!(drain(&mut rx_a).is_empty());
    }
}
