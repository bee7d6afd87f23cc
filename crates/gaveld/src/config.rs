//! Configuration loading: `config.toml` plus the list files that seed the
//! server (characters, music, backgrounds, areas, roles).

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::permissions::Role;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(rename = "Server", default)]
    pub server: ServerConfig,
    #[serde(rename = "MasterServer", default)]
    pub master: MasterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
    pub name: String,
    pub description: String,
    pub max_players: i64,
    pub max_message_length: usize,
    pub log_buffer_size: usize,
    pub ban_length: String,
    pub report_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: String::new(),
            port: 27016,
            name: "Unnamed Server".to_string(),
            description: String::new(),
            max_players: 100,
            max_message_length: 256,
            log_buffer_size: 150,
            ban_length: "3d".to_string(),
            report_dir: "reports".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MasterConfig {
    pub advertise: bool,
    pub addr: String,
}

/// One entry of `areas.toml`. Area 0 is the lobby.
#[derive(Debug, Clone, Deserialize)]
pub struct AreaData {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AreasFile {
    #[serde(default)]
    area: Vec<AreaData>,
}

#[derive(Debug, Deserialize)]
struct RolesFile {
    #[serde(default)]
    role: Vec<RoleData>,
}

#[derive(Debug, Deserialize)]
struct RoleData {
    name: String,
    #[serde(default)]
    permissions: Vec<String>,
}

pub fn load_config(dir: &Path) -> anyhow::Result<Config> {
    let path = dir.join("config.toml");
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(cfg)
}

fn load_lines(path: &Path) -> anyhow::Result<Vec<String>> {
    let s = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok(s.lines()
        .map(str::to_string)
        .filter(|l| !l.trim().is_empty())
        .collect())
}

pub fn load_characters(dir: &Path) -> anyhow::Result<Vec<String>> {
    let list = load_lines(&dir.join("characters.txt"))?;
    if list.is_empty() {
        anyhow::bail!("empty character list");
    }
    Ok(list)
}

/// Loads the music list. A list whose first entry looks like a file (contains
/// a `.`) gets a "Songs" category header prepended so clients render a group.
pub fn load_music(dir: &Path) -> anyhow::Result<Vec<String>> {
    let mut list = load_lines(&dir.join("music.txt"))?;
    if list.is_empty() {
        anyhow::bail!("empty music list");
    }
    if list[0].contains('.') {
        list.insert(0, "Songs".to_string());
    }
    Ok(list)
}

/// Loads the background list. Optional: an absent file means no server list,
/// which only matters for areas with `forceBGList` enabled.
pub fn load_backgrounds(dir: &Path) -> Vec<String> {
    let path = dir.join("backgrounds.txt");
    match load_lines(&path) {
        Ok(list) => list,
        Err(_) => {
            debug!(path = %path.display(), "no background list");
            Vec::new()
        }
    }
}

pub fn load_areas(dir: &Path) -> anyhow::Result<Vec<AreaData>> {
    let path = dir.join("areas.toml");
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: AreasFile =
        toml::from_str(&s).with_context(|| format!("failed to parse {}", path.display()))?;
    if file.area.is_empty() {
        anyhow::bail!("empty area list");
    }
    Ok(file.area)
}

pub fn load_roles(dir: &Path) -> anyhow::Result<Vec<Role>> {
    let path = dir.join("roles.toml");
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: RolesFile =
        toml::from_str(&s).with_context(|| format!("failed to parse {}", path.display()))?;
    if file.role.is_empty() {
        anyhow::bail!("empty role list");
    }
    file.role
        .iter()
        .map(|r| Role::resolve(&r.name, &r.permissions))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 27016);
        assert_eq!(cfg.server.max_players, 100);
        assert_eq!(cfg.server.max_message_length, 256);
        assert_eq!(cfg.server.log_buffer_size, 150);
        assert!(!cfg.master.advertise);
    }

    #[test]
    fn config_overrides() {
        let cfg: Config = toml::from_str(
            "[Server]\nname = \"Courthouse\"\nport = 27020\nmax_players = 42\n\n\
             [MasterServer]\nadvertise = true\n",
        )
        .unwrap();
        assert_eq!(cfg.server.name, "Courthouse");
        assert_eq!(cfg.server.port, 27020);
        assert_eq!(cfg.server.max_players, 42);
        assert!(cfg.master.advertise);
    }

    #[test]
    fn parses_area_and_role_tables() {
        let areas: AreasFile =
            toml::from_str("[[area]]\nname = \"Lobby\"\n\n[[area]]\nname = \"Courtroom 1\"\n")
                .unwrap();
        assert_eq!(areas.area.len(), 2);
        assert_eq!(areas.area[0].name, "Lobby");

        let roles: RolesFile = toml::from_str(
            "[[role]]\nname = \"admin\"\npermissions = [\"ADMIN\", \"KICK\", \"BAN\"]\n",
        )
        .unwrap();
        let resolved = Role::resolve(&roles.role[0].name, &roles.role[0].permissions).unwrap();
        assert_eq!(
            resolved.perms,
            crate::permissions::ADMIN | crate::permissions::KICK | crate::permissions::BAN
        );
    }
}
