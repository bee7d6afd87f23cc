//! The moderator permission model: a fixed lexicon of named rights, each a
//! unique bit in a `u64` mask. A role resolves a name from `roles.toml` to a
//! mask at load time.

pub const NONE: u64 = 0;
pub const KICK: u64 = 1 << 0;
pub const BAN: u64 = 1 << 1;
pub const ADMIN: u64 = 1 << 2;
pub const MOD_EVI: u64 = 1 << 3;
pub const MOVE_USERS: u64 = 1 << 4;
pub const BYPASS_LOCK: u64 = 1 << 5;
pub const MODIFY_AREA: u64 = 1 << 6;
pub const CM: u64 = 1 << 7;

pub const FIELD: &[(&str, u64)] = &[
    ("NONE", NONE),
    ("KICK", KICK),
    ("BAN", BAN),
    ("ADMIN", ADMIN),
    ("MOD_EVI", MOD_EVI),
    ("MOVE_USERS", MOVE_USERS),
    ("BYPASS_LOCK", BYPASS_LOCK),
    ("MODIFY_AREA", MODIFY_AREA),
    ("CM", CM),
];

/// Whether `perms` carries every bit of `need`. `NONE` always holds.
pub fn has(perms: u64, need: u64) -> bool {
    perms & need == need
}

pub fn by_name(name: &str) -> Option<u64> {
    FIELD.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
}

/// A named role resolved to its permission mask.
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub perms: u64,
}

impl Role {
    /// Resolves a list of right names into a role, rejecting unknown names.
    pub fn resolve(name: &str, rights: &[String]) -> anyhow::Result<Self> {
        let mut perms = NONE;
        for r in rights {
            let bit = by_name(r)
                .ok_or_else(|| anyhow::anyhow!("role {name:?}: unknown permission {r:?}"))?;
            perms |= bit;
        }
        Ok(Self {
            name: name.to_string(),
            perms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_unique() {
        let mut seen = 0u64;
        for (_, bit) in FIELD.iter().filter(|(_, b)| *b != 0) {
            assert_eq!(seen & bit, 0);
            seen |= bit;
        }
    }

    #[test]
    fn has_requires_all_bits() {
        assert!(has(KICK | BAN, KICK));
        assert!(has(KICK | BAN, KICK | BAN));
        assert!(!has(KICK, KICK | BAN));
        // NONE always holds, even for an empty mask.
        assert!(has(0, NONE));
    }

    #[test]
    fn resolves_roles() {
        let r = Role::resolve("mod", &["KICK".into(), "BAN".into()]).unwrap();
        assert_eq!(r.perms, KICK | BAN);
        assert!(Role::resolve("bad", &["NOT_A_RIGHT".into()]).is_err());
    }
}
