//! The `/`-prefixed OOC command language: tokenizing, the command table,
//! permission gating and every handler. The table is plain data so `/help`
//! can enumerate it.
//!
//! A caller is allowed a command when its permission mask covers the
//! command's bit, or when the command requires CM and the caller is a CM of
//! its current area.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tracing::error;

use crate::area::{EvidenceMode, LockState, Status};
use crate::client::Client;
use crate::permissions::{self, has};
use crate::server::{Server, SOFTWARE, VERSION};
use crate::store::BanLookup;

pub struct CmdDef {
    pub args: usize,
    pub usage: &'static str,
    pub desc: &'static str,
    pub perm: u64,
    pub func: fn(&Server, &Arc<Client>, &[String], &str),
}

#[rustfmt::skip]
pub const COMMANDS: &[(&str, CmdDef)] = &[
    // admin commands
    ("mkusr", CmdDef { args: 3, usage: "Usage: /mkusr <username> <password> <role>", desc: "Creates a new moderator user.", perm: permissions::ADMIN, func: cmd_make_user }),
    ("rmusr", CmdDef { args: 1, usage: "Usage: /rmusr <username>", desc: "Removes a moderator user.", perm: permissions::ADMIN, func: cmd_remove_user }),
    ("setrole", CmdDef { args: 2, usage: "Usage: /setrole <username> <role>", desc: "Updates a moderator user's role.", perm: permissions::ADMIN, func: cmd_change_role }),
    // general commands
    ("about", CmdDef { args: 0, usage: "Usage: /about", desc: "Prints server version information.", perm: permissions::NONE, func: cmd_about }),
    ("move", CmdDef { args: 1, usage: "Usage: /move [-u <uid1>,<uid2>...] <area>", desc: "Moves user(s) to an area.", perm: permissions::NONE, func: cmd_move }),
    // area commands
    ("bg", CmdDef { args: 1, usage: "Usage: /bg <background>", desc: "Sets the area's background.", perm: permissions::CM, func: cmd_bg }),
    ("status", CmdDef { args: 1, usage: "Usage: /status <status>", desc: "Sets the area's status.", perm: permissions::CM, func: cmd_status }),
    ("cm", CmdDef { args: 0, usage: "Usage: /cm [uid1],[uid2]...", desc: "Adds CM(s) to the area.", perm: permissions::NONE, func: cmd_cm }),
    ("uncm", CmdDef { args: 0, usage: "Usage: /uncm [uid1],[uid2]...", desc: "Removes CM(s) from the area.", perm: permissions::CM, func: cmd_uncm }),
    ("lock", CmdDef { args: 0, usage: "Usage: /lock [-s]", desc: "Locks the area or sets it to spectatable.", perm: permissions::CM, func: cmd_lock }),
    ("unlock", CmdDef { args: 0, usage: "Usage: /unlock", desc: "Unlocks the area.", perm: permissions::CM, func: cmd_unlock }),
    ("invite", CmdDef { args: 1, usage: "Usage: /invite <uid1>,<uid2>...", desc: "Invites user(s) to the area.", perm: permissions::CM, func: cmd_invite }),
    ("uninvite", CmdDef { args: 1, usage: "Usage: /uninvite <uid1>,<uid2>...", desc: "Uninvites user(s) to the area.", perm: permissions::CM, func: cmd_uninvite }),
    ("evimode", CmdDef { args: 1, usage: "Usage: /evimode <mode>", desc: "Sets the area's evidence mode.", perm: permissions::CM, func: cmd_set_evi_mode }),
    ("kickarea", CmdDef { args: 1, usage: "Usage: /kickarea <uid1>,<uid2>...", desc: "Kicks user(s) from the area.", perm: permissions::CM, func: cmd_area_kick }),
    ("swapevi", CmdDef { args: 2, usage: "Usage: /swapevi <id1> <id2>", desc: "Swaps the position of two pieces of evidence.", perm: permissions::NONE, func: cmd_swap_evi }),
    ("nointpres", CmdDef { args: 1, usage: "Usage: /nointpres <true|false>", desc: "Toggles non-interrupting preanims in the area.", perm: permissions::MODIFY_AREA, func: cmd_no_int_pres }),
    ("allowiniswap", CmdDef { args: 1, usage: "Usage: /allowiniswap <true|false>", desc: "Toggles iniswapping in the area.", perm: permissions::MODIFY_AREA, func: cmd_allow_iniswap }),
    ("forcebglist", CmdDef { args: 1, usage: "Usage: /forcebglist <true|false>", desc: "Toggles enforcing the server BG list in the area.", perm: permissions::MODIFY_AREA, func: cmd_force_bg_list }),
    ("allowcms", CmdDef { args: 1, usage: "Usage: /allowcms <true|false>", desc: "Toggles allowing CMs in the area.", perm: permissions::MODIFY_AREA, func: cmd_allow_cms }),
    ("lockbg", CmdDef { args: 1, usage: "Usage: /lockbg <true|false>", desc: "Toggles locking the area's BG.", perm: permissions::MODIFY_AREA, func: cmd_lock_bg }),
    ("lockmusic", CmdDef { args: 1, usage: "Usage: /lockmusic <true|false>", desc: "Toggles making music in the area CM only.", perm: permissions::CM, func: cmd_lock_music }),
    ("charselect", CmdDef { args: 0, usage: "Usage: /charselect [uid1],[uid2]...", desc: "Moves back to character select.", perm: permissions::NONE, func: cmd_char_select }),
    ("players", CmdDef { args: 0, usage: "Usage: /players [-a]", desc: "Shows players in the current area, or all areas.", perm: permissions::NONE, func: cmd_players }),
    ("areainfo", CmdDef { args: 0, usage: "Usage: /areainfo", desc: "Shows information on the current area.", perm: permissions::NONE, func: cmd_area_info }),
    // mod commands
    ("login", CmdDef { args: 2, usage: "Usage: /login <username> <password>", desc: "Logs in as moderator.", perm: permissions::NONE, func: cmd_login }),
    ("logout", CmdDef { args: 0, usage: "Usage: /logout", desc: "Logs out as moderator.", perm: permissions::NONE, func: cmd_logout }),
    ("kick", CmdDef { args: 3, usage: "Usage: /kick -u <uid1>,<uid2>... | -i <ipid1>,<ipid2>... <reason>", desc: "Kicks user(s) from the server.", perm: permissions::KICK, func: cmd_kick }),
    ("ban", CmdDef { args: 3, usage: "Usage: /ban -u <uid1>,<uid2>... | -i <ipid1>,<ipid2>... [-d duration] <reason>", desc: "Bans user(s) from the server.", perm: permissions::BAN, func: cmd_ban }),
    ("unban", CmdDef { args: 1, usage: "Usage: /unban <banid>", desc: "Revokes a ban.", perm: permissions::BAN, func: cmd_unban }),
    ("getban", CmdDef { args: 1, usage: "Usage: /getban <banid|ipid>", desc: "Shows ban records matching a ban ID or IPID.", perm: permissions::BAN, func: cmd_get_ban }),
    ("updateban", CmdDef { args: 2, usage: "Usage: /updateban <banid> <reason>", desc: "Updates the reason of a ban.", perm: permissions::BAN, func: cmd_update_ban }),
];

/// Splits a decoded OOC body into the command word and its arguments.
/// The command is the leading run of lowercase letters after the slash;
/// the arguments are the space-separated tokens after the first.
pub fn tokenize(decoded: &str) -> (String, Vec<String>) {
    let command: String = decoded
        .strip_prefix('/')
        .unwrap_or(decoded)
        .chars()
        .take_while(char::is_ascii_lowercase)
        .collect();
    let args = decoded
        .split(' ')
        .skip(1)
        .map(str::to_string)
        .collect();
    (command, args)
}

pub fn parse_command(server: &Server, client: &Arc<Client>, command: &str, args: &[String]) {
    if command == "help" {
        let mut lines: Vec<String> = COMMANDS
            .iter()
            .filter(|(_, cmd)| allowed(server, client, cmd))
            .map(|(name, cmd)| format!("/{}: {}", name, cmd.desc))
            .collect();
        lines.sort();
        server.send_server_message(
            client,
            &format!("Recognized commands:\n{}", lines.join("\n")),
        );
        return;
    }

    let Some((_, cmd)) = COMMANDS.iter().find(|(name, _)| *name == command) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    if !allowed(server, client, cmd) {
        server.send_server_message(client, "You do not have permission to use that command.");
        return;
    }
    if args.iter().any(|a| a == "-h") {
        server.send_server_message(client, cmd.usage);
        return;
    }
    if args.len() < cmd.args {
        server.send_server_message(client, &format!("Not enough arguments.\n{}", cmd.usage));
        return;
    }
    (cmd.func)(server, client, args, cmd.usage);
}

fn allowed(server: &Server, client: &Client, cmd: &CmdDef) -> bool {
    has(client.perms(), cmd.perm)
        || (cmd.perm == permissions::CM
            && server.areas[client.area_idx()].has_cm(client.uid()))
}

/// Parsed `-u/-i/-d/-a/-s` flags. Parsing stops at the first positional
/// token; everything from there on is `rest`. An unknown flag is an error.
#[derive(Debug, Default, PartialEq, Eq)]
struct CmdFlags {
    uids: Vec<String>,
    ipids: Vec<String>,
    duration: Option<String>,
    all: bool,
    spectatable: bool,
    rest: Vec<String>,
}

fn parse_flags(args: &[String]) -> Option<CmdFlags> {
    let mut f = CmdFlags::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-u" => {
                i += 1;
                f.uids = args.get(i)?.split(',').map(str::to_string).collect();
            }
            "-i" => {
                i += 1;
                f.ipids = args.get(i)?.split(',').map(str::to_string).collect();
            }
            "-d" => {
                i += 1;
                f.duration = Some(args.get(i)?.clone());
            }
            "-a" => f.all = true,
            "-s" => f.spectatable = true,
            s if s.starts_with('-') && s.len() > 1 => return None,
            _ => {
                f.rest = args[i..].to_vec();
                break;
            }
        }
        i += 1;
    }
    Some(f)
}

fn parse_toggle(arg: &str) -> Option<bool> {
    match arg {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn until_string(until: i64) -> String {
    match until {
        -1 => "∞".to_string(),
        0 => "revoked".to_string(),
        t => match Utc.timestamp_opt(t, 0).single() {
            Some(dt) => dt.format("%d %b %Y %H:%M UTC").to_string(),
            None => t.to_string(),
        },
    }
}

// Handles /login
fn cmd_login(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if client.authenticated() {
        server.send_server_message(client, "You are already logged in.");
        return;
    }
    let (ok, perms) = server.store.authenticate(&args[0], &args[1]);
    server.add_to_buffer(client, "AUTH", &format!("Attempted login as {}.", args[0]), true);
    if ok {
        client.set_auth(args[0].clone(), perms);
        server.send_server_message(client, "Logged in as moderator.");
        client.send_packet("AUTH", &["1"]);
        server.send_server_message(client, &format!("Welcome, {}.", args[0]));
        server.add_to_buffer(client, "AUTH", &format!("Logged in as {}.", args[0]), true);
        return;
    }
    client.send_packet("AUTH", &["0"]);
    server.add_to_buffer(client, "AUTH", &format!("Failed login as {}.", args[0]), true);
}

// Handles /logout
fn cmd_logout(server: &Server, client: &Arc<Client>, _args: &[String], _usage: &str) {
    if !client.authenticated() {
        server.send_server_message(client, "Invalid command.");
        return;
    }
    server.add_to_buffer(
        client,
        "AUTH",
        &format!("Logged out as {}.", client.mod_name()),
        true,
    );
    client.remove_auth();
}

// Handles /mkusr
fn cmd_make_user(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if server.store.user_exists(&args[0]) {
        server.send_server_message(client, "User already exists.");
        return;
    }
    let Some(role) = server.get_role(&args[2]) else {
        server.send_server_message(client, "Invalid role.");
        return;
    };
    if let Err(e) = server.store.create_user(&args[0], &args[1], role.perms) {
        error!(err = %e, "failed to create user");
        server.send_server_message(client, "Invalid username/password.");
        return;
    }
    server.send_server_message(client, "User created.");
    server.add_to_buffer(client, "CMD", &format!("Created user {}.", args[0]), true);
}

// Handles /rmusr
fn cmd_remove_user(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if !server.store.user_exists(&args[0]) {
        server.send_server_message(client, "User does not exist.");
        return;
    }
    if let Err(e) = server.store.remove_user(&args[0]) {
        server.send_server_message(client, "Failed to remove user.");
        error!(err = %e, "failed to remove user");
        return;
    }
    server.send_server_message(client, "Removed user.");

    for c in server.registry.snapshot() {
        if c.authenticated() && c.mod_name() == args[0] {
            c.remove_auth();
        }
    }
    server.add_to_buffer(client, "CMD", &format!("Removed user {}.", args[0]), true);
}

// Handles /setrole
fn cmd_change_role(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(role) = server.get_role(&args[1]) else {
        server.send_server_message(client, "Invalid role.");
        return;
    };
    if !server.store.user_exists(&args[0]) {
        server.send_server_message(client, "User does not exist.");
        return;
    }
    if let Err(e) = server.store.change_permissions(&args[0], role.perms) {
        server.send_server_message(client, "Failed to change permissions.");
        error!(err = %e, "failed to change permissions");
        return;
    }
    server.send_server_message(client, "Role updated.");

    for c in server.registry.snapshot() {
        if c.authenticated() && c.mod_name() == args[0] {
            c.set_perms(role.perms);
        }
    }
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Updated role of {} to {}.", args[0], args[1]),
        true,
    );
}

// Handles /kick
fn cmd_kick(server: &Server, client: &Arc<Client>, args: &[String], usage: &str) {
    let flags = parse_flags(args).filter(|f| !f.rest.is_empty());
    let Some(flags) = flags else {
        server.send_server_message(client, &format!("Not enough arguments:\n{usage}"));
        return;
    };

    let targets = if !flags.uids.is_empty() {
        server.get_uid_list(&flags.uids)
    } else if !flags.ipids.is_empty() {
        server.get_ipid_list(&flags.ipids)
    } else {
        server.send_server_message(client, &format!("Not enough arguments:\n{usage}"));
        return;
    };

    let reason = flags.rest.join(" ");
    let mut count = 0;
    let mut report = Vec::new();
    for c in targets {
        report.push(c.ipid().to_string());
        c.send_packet("KK", &[&reason]);
        c.disconnect();
        count += 1;
    }
    server.send_server_message(client, &format!("Kicked {count} clients."));
    server.send_player_arup();
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Kicked {} from server for reason: {}.", report.join(", "), reason),
        true,
    );
}

// Handles /ban
fn cmd_ban(server: &Server, client: &Arc<Client>, args: &[String], usage: &str) {
    let flags = parse_flags(args).filter(|f| !f.rest.is_empty());
    let Some(flags) = flags else {
        server.send_server_message(client, &format!("Not enough arguments:\n{usage}"));
        return;
    };

    let targets = if !flags.uids.is_empty() {
        server.get_uid_list(&flags.uids)
    } else if !flags.ipids.is_empty() {
        server.get_ipid_list(&flags.ipids)
    } else {
        server.send_server_message(client, &format!("Not enough arguments:\n{usage}"));
        return;
    };

    let duration = flags
        .duration
        .unwrap_or_else(|| server.config.server.ban_length.clone());
    let ban_time = Utc::now().timestamp();
    let reason = flags.rest.join(" ");
    let until = if duration.to_lowercase() == "perma" {
        -1
    } else {
        match crate::duration::parse_duration(&duration) {
            Ok(d) => ban_time + d.as_secs() as i64,
            Err(_) => {
                server.send_server_message(client, "Failed to ban: Cannot parse duration.");
                return;
            }
        }
    };

    let mut count = 0;
    let mut report: Vec<String> = Vec::new();
    for c in targets {
        let id = match server.store.add_ban(
            c.ipid(),
            &c.hdid(),
            ban_time,
            until,
            &reason,
            &client.mod_name(),
        ) {
            Ok(id) => id,
            Err(e) => {
                error!(err = %e, "failed to record ban");
                continue;
            }
        };
        if !report.iter().any(|r| r == c.ipid()) {
            report.push(c.ipid().to_string());
        }
        c.send_packet(
            "KB",
            &[&format!("{reason}\nUntil: {}\nID: {id}", until_string(until))],
        );
        c.disconnect();
        count += 1;
    }
    server.send_server_message(client, &format!("Banned {count} clients."));
    server.send_player_arup();
    server.add_to_buffer(
        client,
        "CMD",
        &format!(
            "Banned {} from server for {}: {}.",
            report.join(", "),
            duration,
            reason
        ),
        true,
    );
}

// Handles /unban
fn cmd_unban(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Ok(id) = args[0].parse::<i64>() else {
        server.send_server_message(client, "Invalid ban ID.");
        return;
    };
    if let Err(e) = server.store.unban(id) {
        error!(err = %e, "failed to unban");
        server.send_server_message(client, "Failed to unban.");
        return;
    }
    server.send_server_message(client, &format!("Unbanned ban {id}."));
    server.add_to_buffer(client, "CMD", &format!("Unbanned {id}."), true);
}

// Handles /getban
fn cmd_get_ban(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let lookup = if args[0].parse::<i64>().is_ok() {
        BanLookup::BanId
    } else {
        BanLookup::Ipid
    };
    let bans = match server.store.get_ban(lookup, &args[0]) {
        Ok(bans) => bans,
        Err(e) => {
            error!(err = %e, "failed to look up bans");
            server.send_server_message(client, "Failed to look up bans.");
            return;
        }
    };
    if bans.is_empty() {
        server.send_server_message(client, "No bans found.");
        return;
    }
    let lines: Vec<String> = bans
        .iter()
        .map(|b| {
            format!(
                "Ban {}: IPID {} | banned {} until {} by {}: {}",
                b.id,
                b.ipid,
                until_string(b.time),
                until_string(b.duration),
                b.moderator,
                b.reason
            )
        })
        .collect();
    server.send_server_message(client, &lines.join("\n"));
}

// Handles /updateban
fn cmd_update_ban(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Ok(id) = args[0].parse::<i64>() else {
        server.send_server_message(client, "Invalid ban ID.");
        return;
    };
    let reason = args[1..].join(" ");
    if let Err(e) = server.store.update_ban(id, &reason) {
        error!(err = %e, "failed to update ban");
        server.send_server_message(client, "Failed to update ban.");
        return;
    }
    server.send_server_message(client, &format!("Updated ban {id}."));
    server.add_to_buffer(client, "CMD", &format!("Updated ban {id} to: {reason}."), true);
}

// Handles /kickarea
fn cmd_area_kick(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if client.area_idx() == 0 {
        server.send_server_message(client, "Failed to kick: Cannot kick a user from area 0.");
        return;
    }
    let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();

    let mut count = 0;
    let mut report = Vec::new();
    for c in server.get_uid_list(&uids) {
        if c.area_idx() != client.area_idx()
            || has(c.perms(), permissions::BYPASS_LOCK)
        {
            continue;
        }
        if c.id() == client.id() {
            server.send_server_message(client, "You can't kick yourself from the area.");
            continue;
        }
        server.change_area(&c, 0);
        server.send_server_message(&c, "You were kicked from the area!");
        count += 1;
        report.push(c.uid().to_string());
    }
    server.send_server_message(client, &format!("Kicked {count} clients."));
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Kicked {} from area.", report.join(", ")),
        false,
    );
}

// Handles /bg
fn cmd_bg(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if area.lock_bg() && !has(client.perms(), permissions::MODIFY_AREA) {
        server.send_server_message(
            client,
            "You do not have permission to change the background in this area.",
        );
        return;
    }
    if area.force_bg_list() && !server.backgrounds.contains(&args[0]) {
        server.send_server_message(client, "Invalid background.");
        return;
    }
    area.set_background(args[0].clone());
    server.write_to_area(area_idx, &format!("BN#{}#%", args[0]));
    server.send_area_server_message(
        area_idx,
        &format!("{} set the background to {}.", client.ooc_name(), args[0]),
    );
    server.add_to_buffer(client, "CMD", &format!("Set BG to {}.", args[0]), false);
}

// Handles /about
fn cmd_about(server: &Server, client: &Arc<Client>, _args: &[String], _usage: &str) {
    server.send_server_message(client, &format!("Running {SOFTWARE} version {VERSION}."));
}

// Handles /cm
fn cmd_cm(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if client.char_id() == -1 {
        server.send_server_message(client, "You are spectating; you cannot become a CM.");
        return;
    }
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if !area.cms_allowed() && !server.has_cm_permission(client) {
        server.send_server_message(client, "You do not have permission to use that command.");
        return;
    }

    if args.is_empty() {
        if area.has_cm(client.uid()) {
            server.send_server_message(client, "You are already a CM in this area.");
            return;
        }
        if !area.cms().is_empty() && !has(client.perms(), permissions::CM) {
            server.send_server_message(client, "This area already has a CM.");
            return;
        }
        area.add_cm(client.uid());
        server.send_server_message(client, "Successfully became a CM.");
        server.add_to_buffer(client, "CMD", "CMed self.", false);
    } else {
        if !server.has_cm_permission(client) {
            server.send_server_message(client, "You do not have permission to use that command.");
            return;
        }
        let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();
        let mut count = 0;
        let mut report = Vec::new();
        for c in server.get_uid_list(&uids) {
            if c.area_idx() != area_idx || area.has_cm(c.uid()) {
                continue;
            }
            area.add_cm(c.uid());
            server.send_server_message(&c, "You have become a CM in this area.");
            count += 1;
            report.push(c.uid().to_string());
        }
        server.send_server_message(client, &format!("CMed {count} users."));
        server.add_to_buffer(
            client,
            "CMD",
            &format!("CMed {}.", report.join(", ")),
            false,
        );
    }
    server.send_cm_arup();
}

// Handles /uncm
fn cmd_uncm(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if args.is_empty() {
        if !area.has_cm(client.uid()) {
            server.send_server_message(client, "You are not a CM in this area.");
            return;
        }
        area.remove_cm(client.uid());
        server.send_server_message(client, "You are no longer a CM in this area.");
        server.add_to_buffer(client, "CMD", "Un-CMed self.", false);
    } else {
        let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();
        let mut count = 0;
        let mut report = Vec::new();
        for c in server.get_uid_list(&uids) {
            if c.area_idx() != area_idx || !area.has_cm(c.uid()) {
                continue;
            }
            area.remove_cm(c.uid());
            server.send_server_message(&c, "You are no longer a CM in this area.");
            count += 1;
            report.push(c.uid().to_string());
        }
        server.send_server_message(client, &format!("Un-CMed {count} users."));
        server.add_to_buffer(
            client,
            "CMD",
            &format!("Un-CMed {}.", report.join(", ")),
            false,
        );
    }
    server.send_cm_arup();
}

// Handles /status
fn cmd_status(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let status = match args[0].to_lowercase().as_str() {
        "idle" => Status::Idle,
        "looking-for-players" => Status::LookingForPlayers,
        "casing" => Status::Casing,
        "recess" => Status::Recess,
        "rp" => Status::Rp,
        "gaming" => Status::Gaming,
        _ => {
            server.send_server_message(
                client,
                "Status not recognized. Recognized statuses: idle, looking-for-players, casing, recess, rp, gaming",
            );
            return;
        }
    };
    server.areas[client.area_idx()].set_status(status);
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} set the status to {}.", client.ooc_name(), args[0]),
    );
    server.send_status_arup();
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set the status to {}.", args[0]),
        false,
    );
}

// Handles /lock
fn cmd_lock(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if area_idx == 0 {
        server.send_server_message(client, "You cannot lock area 0.");
        return;
    }
    if args.iter().any(|a| a == "-s") {
        area.set_lock_state(LockState::Spectatable);
        server.send_area_server_message(
            area_idx,
            &format!("{} set the area to spectatable.", client.ooc_name()),
        );
        server.add_to_buffer(client, "CMD", "Set the area to spectatable.", false);
    } else {
        if area.lock_state() == LockState::Locked {
            server.send_server_message(client, "This area is already locked.");
            return;
        }
        area.set_lock_state(LockState::Locked);
        server.send_area_server_message(
            area_idx,
            &format!("{} locked the area.", client.ooc_name()),
        );
        server.add_to_buffer(client, "CMD", "Locked the area.", false);
    }
    // Everyone already present is invited, so the lock never strands them.
    for c in server.registry.snapshot() {
        if c.uid() != -1 && c.area_idx() == area_idx {
            area.add_invited(c.uid());
        }
    }
    server.send_lock_arup();
}

// Handles /unlock
fn cmd_unlock(server: &Server, client: &Arc<Client>, _args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if area.lock_state() == LockState::Free {
        server.send_server_message(client, "This area is not locked.");
        return;
    }
    area.set_lock_state(LockState::Free);
    area.clear_invited();
    server.send_lock_arup();
    server.send_area_server_message(
        area_idx,
        &format!("{} unlocked the area.", client.ooc_name()),
    );
    server.add_to_buffer(client, "CMD", "Unlocked the area.", false);
}

// Handles /invite
fn cmd_invite(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if area.lock_state() == LockState::Free {
        server.send_server_message(client, "This area is unlocked.");
        return;
    }
    let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();
    let mut count = 0;
    let mut report = Vec::new();
    for c in server.get_uid_list(&uids) {
        if area.add_invited(c.uid()) {
            server.send_server_message(
                &c,
                &format!("You were invited to area {}.", area.name()),
            );
            count += 1;
            report.push(c.uid().to_string());
        }
    }
    server.send_server_message(client, &format!("Invited {count} users."));
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Invited {} to the area.", report.join(", ")),
        false,
    );
}

// Handles /uninvite
fn cmd_uninvite(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let area_idx = client.area_idx();
    let area = &server.areas[area_idx];
    if area.lock_state() == LockState::Free {
        server.send_server_message(client, "This area is unlocked.");
        return;
    }
    let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();
    let mut count = 0;
    let mut report = Vec::new();
    for c in server.get_uid_list(&uids) {
        if c.id() == client.id() || area.has_cm(c.uid()) {
            continue;
        }
        if !area.remove_invited(c.uid()) {
            continue;
        }
        if c.area_idx() == area_idx
            && area.lock_state() == LockState::Locked
            && !has(c.perms(), permissions::BYPASS_LOCK)
        {
            server.send_server_message(&c, "You were kicked from the area!");
            server.change_area(&c, 0);
        }
        server.send_server_message(
            &c,
            &format!("You were uninvited from area {}.", area.name()),
        );
        count += 1;
        report.push(c.uid().to_string());
    }
    server.send_server_message(client, &format!("Uninvited {count} users."));
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Uninvited {} from the area.", report.join(", ")),
        false,
    );
}

// Handles /swapevi
fn cmd_swap_evi(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if !server.can_alter_evidence(client) {
        server.send_server_message(client, "You are not allowed to alter evidence in this area.");
        return;
    }
    let (Ok(a), Ok(b)) = (args[0].parse::<usize>(), args[1].parse::<usize>()) else {
        return;
    };
    let area_idx = client.area_idx();
    if server.areas[area_idx].swap_evidence(a, b) {
        server.send_server_message(client, "Evidence swapped.");
        server.write_to_area(area_idx, &server.le_packet(area_idx));
        server.add_to_buffer(
            client,
            "CMD",
            &format!("Swapped positions of evidence {a} and {b}."),
            false,
        );
    } else {
        server.send_server_message(client, "Invalid arguments.");
    }
}

// Handles /evimode
fn cmd_set_evi_mode(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if !server.can_alter_evidence(client) {
        server.send_server_message(client, "You are not allowed to change the evidence mode.");
        return;
    }
    let area = &server.areas[client.area_idx()];
    match args[0].as_str() {
        "mods" => {
            if !has(client.perms(), permissions::MOD_EVI) {
                server.send_server_message(
                    client,
                    "You do not have permission for this evidence mode.",
                );
                return;
            }
            area.set_evidence_mode(EvidenceMode::Mods);
        }
        "cms" => area.set_evidence_mode(EvidenceMode::Cms),
        "any" => area.set_evidence_mode(EvidenceMode::Any),
        _ => {
            server.send_server_message(client, "Invalid evidence mode.");
            return;
        }
    }
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} set the evidence mode to {}.", client.ooc_name(), args[0]),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set the evidence mode to {}.", args[0]),
        false,
    );
}

// Handles /nointpres
fn cmd_no_int_pres(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_no_interrupt(v);
    let result = if v { "enabled" } else { "disabled" };
    server.send_area_server_message(
        client.area_idx(),
        &format!(
            "{} has {} non-interrupting preanims in this area.",
            client.ooc_name(),
            result
        ),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set non-interrupting preanims to {}.", args[0]),
        false,
    );
}

// Handles /allowiniswap
fn cmd_allow_iniswap(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_iniswap_allowed(v);
    let result = if v { "enabled" } else { "disabled" };
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} has {} iniswapping in this area.", client.ooc_name(), result),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set iniswapping to {}.", args[0]),
        false,
    );
}

// Handles /forcebglist
fn cmd_force_bg_list(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_force_bg_list(v);
    let result = if v { "enforced" } else { "unenforced" };
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} has {} the BG list in this area.", client.ooc_name(), result),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set the BG list to {}.", args[0]),
        false,
    );
}

// Handles /lockbg
fn cmd_lock_bg(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_lock_bg(v);
    let result = if v { "locked" } else { "unlocked" };
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} has {} the background in this area.", client.ooc_name(), result),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set the background to {}.", args[0]),
        false,
    );
}

// Handles /lockmusic
fn cmd_lock_music(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_lock_music(v);
    let result = if v { "enabled" } else { "disabled" };
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} has {} CM-only music in this area.", client.ooc_name(), result),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set CM-only music list to {}.", args[0]),
        false,
    );
}

// Handles /allowcms
fn cmd_allow_cms(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let Some(v) = parse_toggle(&args[0]) else {
        server.send_server_message(client, "Invalid command.");
        return;
    };
    server.areas[client.area_idx()].set_cms_allowed(v);
    let result = if v { "allowed" } else { "disallowed" };
    server.send_area_server_message(
        client.area_idx(),
        &format!("{} has {} CMs in this area.", client.ooc_name(), result),
    );
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Set allowing CMs to {}.", args[0]),
        false,
    );
}

// Handles /move
fn cmd_move(server: &Server, client: &Arc<Client>, args: &[String], usage: &str) {
    let flags = parse_flags(args).filter(|f| !f.rest.is_empty());
    let Some(flags) = flags else {
        server.send_server_message(client, &format!("Not enough arguments:\n{usage}"));
        return;
    };
    let dest = match flags.rest[0].parse::<usize>() {
        Ok(id) if id < server.areas.len() => id,
        _ => {
            server.send_server_message(client, "Invalid area.");
            return;
        }
    };

    if !flags.uids.is_empty() {
        if !has(client.perms(), permissions::MOVE_USERS) {
            server.send_server_message(client, "You do not have permission to use that command.");
            return;
        }
        let mut count = 0;
        let mut report = Vec::new();
        for c in server.get_uid_list(&flags.uids) {
            if !server.change_area(&c, dest) {
                continue;
            }
            server.send_server_message(
                &c,
                &format!("You were moved to {}.", server.areas[dest].name()),
            );
            count += 1;
            report.push(c.uid().to_string());
        }
        server.send_server_message(client, &format!("Moved {count} users."));
        server.add_to_buffer(
            client,
            "CMD",
            &format!(
                "Moved {} to {}.",
                report.join(", "),
                server.areas[dest].name()
            ),
            false,
        );
    } else if server.change_area(client, dest) {
        server.send_server_message(
            client,
            &format!("Moved to {}.", server.areas[dest].name()),
        );
    } else {
        server.send_server_message(client, "You are not invited to that area.");
    }
}

// Handles /charselect
fn cmd_char_select(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    if args.is_empty() {
        server.change_character(client, -1);
        client.send_packet("DONE", &[]);
        return;
    }

    if !server.has_cm_permission(client) {
        server.send_server_message(client, "You do not have permission to use that command.");
        return;
    }
    let uids: Vec<String> = args[0].split(',').map(str::to_string).collect();
    let mut count = 0;
    let mut report = Vec::new();
    for c in server.get_uid_list(&uids) {
        if c.area_idx() != client.area_idx() || c.char_id() == -1 {
            continue;
        }
        server.change_character(&c, -1);
        c.send_packet("DONE", &[]);
        server.send_server_message(&c, "You were moved back to character select.");
        count += 1;
        report.push(c.uid().to_string());
    }
    server.send_server_message(client, &format!("Moved {count} users to character select."));
    server.add_to_buffer(
        client,
        "CMD",
        &format!("Moved {} to character select.", report.join(", ")),
        false,
    );
}

// Handles /players
fn cmd_players(server: &Server, client: &Arc<Client>, args: &[String], _usage: &str) {
    let all = args.iter().any(|a| a == "-a");
    let caller_auth = client.authenticated();
    let snapshot = server.registry.snapshot();

    let entry = |c: &Arc<Client>| {
        let mut s = format!("-\n[{}] {}\n", c.uid(), server.character_name(c.char_id()));
        if caller_auth {
            if c.authenticated() {
                s.push_str(&format!("Mod: {}\n", c.mod_name()));
            }
            s.push_str(&format!("IPID: {}\n", c.ipid()));
        }
        if !c.ooc_name().is_empty() {
            s.push_str(&format!("OOC: {}\n", c.ooc_name()));
        }
        s
    };

    let mut out = String::from("\nPlayers\n----------\n");
    if all {
        for (i, a) in server.areas.iter().enumerate() {
            out.push_str(&format!("{}:\n{} players online.\n", a.name(), a.player_count()));
            for c in &snapshot {
                if c.uid() != -1 && c.area_idx() == i {
                    out.push_str(&entry(c));
                }
            }
            out.push_str("----------\n");
        }
    } else {
        let i = client.area_idx();
        let a = &server.areas[i];
        out.push_str(&format!("{}:\n{} players online.\n", a.name(), a.player_count()));
        for c in &snapshot {
            if c.uid() != -1 && c.area_idx() == i {
                out.push_str(&entry(c));
            }
        }
    }
    server.send_server_message(client, &out);
}

// Handles /areainfo
fn cmd_area_info(server: &Server, client: &Arc<Client>, _args: &[String], _usage: &str) {
    let a = &server.areas[client.area_idx()];
    server.send_server_message(
        client,
        &format!(
            "\nBG: {}\nEvi mode: {}\nAllow iniswap: {}\nNon-interrupting pres: {}\nCMs allowed: {}\nForce BG list: {}\nBG locked: {}\nMusic locked: {}",
            a.background(),
            a.evidence_mode().as_str(),
            a.iniswap_allowed(),
            a.no_interrupt(),
            a.cms_allowed(),
            a.force_bg_list(),
            a.lock_bg(),
            a.lock_music()
        ),
    );
}
