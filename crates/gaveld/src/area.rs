//! Per-room state. Every mutable field of an area lives behind one mutex;
//! each public method is one atomic operation. Methods return snapshots so
//! callers never transmit while holding the lock.

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    LookingForPlayers,
    Casing,
    Recess,
    Rp,
    Gaming,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::LookingForPlayers => "looking-for-players",
            Status::Casing => "casing",
            Status::Recess => "recess",
            Status::Rp => "rp",
            Status::Gaming => "gaming",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Free,
    Spectatable,
    Locked,
}

impl LockState {
    pub fn as_str(self) -> &'static str {
        match self {
            LockState::Free => "FREE",
            LockState::Spectatable => "SPECTATABLE",
            LockState::Locked => "LOCKED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceMode {
    Any,
    Cms,
    Mods,
}

impl EvidenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EvidenceMode::Any => "any",
            EvidenceMode::Cms => "cms",
            EvidenceMode::Mods => "mods",
        }
    }
}

#[derive(Debug)]
pub struct Area {
    name: String,
    state: Mutex<AreaState>,
}

#[derive(Debug)]
struct AreaState {
    taken: Vec<bool>,
    players: i64,
    def_hp: i32,
    pro_hp: i32,
    background: String,
    status: Status,
    evidence: Vec<String>,
    lock: LockState,
    invited: Vec<i32>,
    cms: Vec<i32>,
    iniswap_allowed: bool,
    no_interrupt: bool,
    force_bg_list: bool,
    lock_bg: bool,
    lock_music: bool,
    cms_allowed: bool,
    evi_mode: EvidenceMode,
    buffer: Vec<String>,
    buffer_size: usize,
}

impl Area {
    pub fn new(name: String, char_count: usize, buffer_size: usize) -> Self {
        Self {
            name,
            state: Mutex::new(AreaState {
                taken: vec![false; char_count],
                players: 0,
                def_hp: 10,
                pro_hp: 10,
                background: "default".to_string(),
                status: Status::Idle,
                evidence: Vec::new(),
                lock: LockState::Free,
                invited: Vec::new(),
                cms: Vec::new(),
                iniswap_allowed: true,
                no_interrupt: false,
                force_bg_list: false,
                lock_bg: false,
                lock_music: false,
                cms_allowed: true,
                evi_mode: EvidenceMode::Any,
                buffer: Vec::new(),
                buffer_size: buffer_size.max(1),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The taken list for `CharsCheck`: `-1` for taken slots, `0` for free.
    pub fn taken_list(&self) -> Vec<String> {
        let st = self.state.lock();
        st.taken
            .iter()
            .map(|t| (if *t { "-1" } else { "0" }).to_string())
            .collect()
    }

    /// Adds a player holding `char` (`-1` = spectator). Fails when the slot
    /// is taken or out of range.
    pub fn add_char(&self, char_id: i32) -> bool {
        let mut st = self.state.lock();
        if char_id != -1 {
            let Some(slot) = st.taken.get_mut(char_id.max(0) as usize) else {
                return false;
            };
            if char_id < 0 || *slot {
                return false;
            }
            *slot = true;
        }
        st.players += 1;
        true
    }

    /// Swaps the player's slot from `old` to `new`; `-1` releases only.
    pub fn switch_char(&self, old: i32, new: i32) -> bool {
        let mut st = self.state.lock();
        if new == -1 {
            if old != -1 {
                if let Some(slot) = st.taken.get_mut(old as usize) {
                    *slot = false;
                }
            }
            return true;
        }
        if new < 0 || st.taken.get(new as usize).copied().unwrap_or(true) {
            return false;
        }
        st.taken[new as usize] = true;
        if old != -1 {
            if let Some(slot) = st.taken.get_mut(old as usize) {
                *slot = false;
            }
        }
        true
    }

    pub fn remove_char(&self, char_id: i32) {
        let mut st = self.state.lock();
        if char_id != -1 {
            if let Some(slot) = st.taken.get_mut(char_id.max(0) as usize) {
                *slot = false;
            }
        }
        st.players -= 1;
    }

    pub fn player_count(&self) -> i64 {
        self.state.lock().players
    }

    pub fn hp(&self) -> (i32, i32) {
        let st = self.state.lock();
        (st.def_hp, st.pro_hp)
    }

    /// Sets the defense (`bar == 1`) or prosecution (`bar == 2`) HP.
    /// Values outside `[0, 10]` and unknown bars are rejected.
    pub fn set_hp(&self, bar: i32, value: i32) -> bool {
        if !(0..=10).contains(&value) {
            return false;
        }
        let mut st = self.state.lock();
        match bar {
            1 => st.def_hp = value,
            2 => st.pro_hp = value,
            _ => return false,
        }
        true
    }

    pub fn evidence(&self) -> Vec<String> {
        self.state.lock().evidence.clone()
    }

    pub fn add_evidence(&self, evi: String) {
        self.state.lock().evidence.push(evi);
    }

    /// Removes the evidence at `id`; out-of-range ids are a no-op.
    pub fn remove_evidence(&self, id: usize) {
        let mut st = self.state.lock();
        if id < st.evidence.len() {
            st.evidence.remove(id);
        }
    }

    /// Replaces the evidence at `id`; out-of-range ids are a no-op.
    pub fn edit_evidence(&self, id: usize, evi: String) {
        let mut st = self.state.lock();
        if id < st.evidence.len() {
            st.evidence[id] = evi;
        }
    }

    /// Swaps two evidence entries; both ids must be valid and distinct.
    pub fn swap_evidence(&self, a: usize, b: usize) -> bool {
        let mut st = self.state.lock();
        if a == b || a >= st.evidence.len() || b >= st.evidence.len() {
            return false;
        }
        st.evidence.swap(a, b);
        true
    }

    pub fn background(&self) -> String {
        self.state.lock().background.clone()
    }

    pub fn set_background(&self, bg: String) {
        self.state.lock().background = bg;
    }

    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    pub fn set_status(&self, status: Status) {
        self.state.lock().status = status;
    }

    pub fn lock_state(&self) -> LockState {
        self.state.lock().lock
    }

    pub fn set_lock_state(&self, lock: LockState) {
        self.state.lock().lock = lock;
    }

    pub fn is_invited(&self, uid: i32) -> bool {
        self.state.lock().invited.contains(&uid)
    }

    pub fn add_invited(&self, uid: i32) -> bool {
        let mut st = self.state.lock();
        if st.invited.contains(&uid) {
            return false;
        }
        st.invited.push(uid);
        true
    }

    pub fn remove_invited(&self, uid: i32) -> bool {
        let mut st = self.state.lock();
        match st.invited.iter().position(|u| *u == uid) {
            Some(i) => {
                st.invited.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn clear_invited(&self) {
        self.state.lock().invited.clear();
    }

    pub fn cms(&self) -> Vec<i32> {
        self.state.lock().cms.clone()
    }

    pub fn has_cm(&self, uid: i32) -> bool {
        self.state.lock().cms.contains(&uid)
    }

    pub fn add_cm(&self, uid: i32) -> bool {
        let mut st = self.state.lock();
        if st.cms.contains(&uid) {
            return false;
        }
        st.cms.push(uid);
        true
    }

    pub fn remove_cm(&self, uid: i32) -> bool {
        let mut st = self.state.lock();
        match st.cms.iter().position(|u| *u == uid) {
            Some(i) => {
                st.cms.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn iniswap_allowed(&self) -> bool {
        self.state.lock().iniswap_allowed
    }

    pub fn set_iniswap_allowed(&self, v: bool) {
        self.state.lock().iniswap_allowed = v;
    }

    pub fn no_interrupt(&self) -> bool {
        self.state.lock().no_interrupt
    }

    pub fn set_no_interrupt(&self, v: bool) {
        self.state.lock().no_interrupt = v;
    }

    pub fn force_bg_list(&self) -> bool {
        self.state.lock().force_bg_list
    }

    pub fn set_force_bg_list(&self, v: bool) {
        self.state.lock().force_bg_list = v;
    }

    pub fn lock_bg(&self) -> bool {
        self.state.lock().lock_bg
    }

    pub fn set_lock_bg(&self, v: bool) {
        self.state.lock().lock_bg = v;
    }

    pub fn lock_music(&self) -> bool {
        self.state.lock().lock_music
    }

    pub fn set_lock_music(&self, v: bool) {
        self.state.lock().lock_music = v;
    }

    pub fn cms_allowed(&self) -> bool {
        self.state.lock().cms_allowed
    }

    pub fn set_cms_allowed(&self, v: bool) {
        self.state.lock().cms_allowed = v;
    }

    pub fn evidence_mode(&self) -> EvidenceMode {
        self.state.lock().evi_mode
    }

    pub fn set_evidence_mode(&self, mode: EvidenceMode) {
        self.state.lock().evi_mode = mode;
    }

    /// Appends to the event buffer, dropping the oldest line once full.
    pub fn update_buffer(&self, line: String) {
        let mut st = self.state.lock();
        if st.buffer.len() == st.buffer_size {
            st.buffer.remove(0);
        }
        st.buffer.push(line);
    }

    pub fn buffer(&self) -> Vec<String> {
        self.state.lock().buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> Area {
        Area::new("Courtroom 1".to_string(), 3, 4)
    }

    #[test]
    fn char_occupancy() {
        let a = area();
        assert!(a.add_char(-1));
        assert_eq!(a.player_count(), 1);
        assert_eq!(a.taken_list(), vec!["0", "0", "0"]);

        assert!(a.add_char(1));
        assert!(!a.add_char(1));
        assert!(!a.add_char(3));
        assert!(!a.add_char(-2));
        assert_eq!(a.player_count(), 2);
        assert_eq!(a.taken_list(), vec!["0", "-1", "0"]);

        a.remove_char(1);
        assert_eq!(a.player_count(), 1);
        assert_eq!(a.taken_list(), vec!["0", "0", "0"]);
    }

    #[test]
    fn char_switching() {
        let a = area();
        assert!(a.add_char(0));
        assert!(a.add_char(2));

        // Occupied and out-of-range targets fail, holdings unchanged.
        assert!(!a.switch_char(0, 2));
        assert!(!a.switch_char(0, 5));
        assert_eq!(a.taken_list(), vec!["-1", "0", "-1"]);

        assert!(a.switch_char(0, 1));
        assert_eq!(a.taken_list(), vec!["0", "-1", "-1"]);

        // Back to spectator always succeeds and releases the slot.
        assert!(a.switch_char(1, -1));
        assert_eq!(a.taken_list(), vec!["0", "0", "-1"]);
        assert_eq!(a.player_count(), 2);
    }

    #[test]
    fn hp_bounds() {
        let a = area();
        assert_eq!(a.hp(), (10, 10));
        assert!(a.set_hp(1, 3));
        assert!(a.set_hp(2, 0));
        assert_eq!(a.hp(), (3, 0));

        assert!(!a.set_hp(1, 11));
        assert!(!a.set_hp(2, -1));
        assert!(!a.set_hp(3, 5));
        assert_eq!(a.hp(), (3, 0));
    }

    #[test]
    fn evidence_ops() {
        let a = area();
        a.add_evidence("knife&a knife&knife.png".to_string());
        a.add_evidence("letter&a letter&letter.png".to_string());

        a.edit_evidence(0, "dagger&a dagger&dagger.png".to_string());
        assert_eq!(a.evidence()[0], "dagger&a dagger&dagger.png");

        // Index == len is out of range, not the last element.
        a.edit_evidence(2, "ghost".to_string());
        a.remove_evidence(2);
        assert_eq!(a.evidence().len(), 2);

        assert!(a.swap_evidence(0, 1));
        assert_eq!(a.evidence()[0], "letter&a letter&letter.png");
        assert!(!a.swap_evidence(0, 0));
        assert!(!a.swap_evidence(0, 2));

        a.remove_evidence(0);
        assert_eq!(a.evidence(), vec!["dagger&a dagger&dagger.png"]);
    }

    #[test]
    fn cm_and_invite_sets() {
        let a = area();
        assert!(a.add_cm(7));
        assert!(!a.add_cm(7));
        assert!(a.has_cm(7));
        assert_eq!(a.cms(), vec![7]);
        assert!(a.remove_cm(7));
        assert!(!a.remove_cm(7));

        assert!(a.add_invited(3));
        assert!(!a.add_invited(3));
        assert!(a.is_invited(3));
        assert!(a.remove_invited(3));
        assert!(!a.remove_invited(3));
        a.add_invited(1);
        a.add_invited(2);
        a.clear_invited();
        assert!(!a.is_invited(1));
    }

    #[test]
    fn buffer_drops_oldest() {
        let a = area();
        for i in 0..6 {
            a.update_buffer(format!("line {i}"));
        }
        assert_eq!(
            a.buffer(),
            vec!["line 2", "line 3", "line 4", "line 5"]
        );
    }
}
