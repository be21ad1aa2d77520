/// Packets the client sends.
pub mod client {
    pub const C_CLOSE_ATTACK: u16 = 44;
    pub const C_RANGED_ATTACK: u16 = 45;
    pub const C_MAGIC_ATTACK: u16 = 46;
    pub const C_TAKE_DAMAGE: u16 = 48;
    pub const C_USE_SKILL: u16 = 91;
    pub const C_MOVE_MONSTER: u16 = 188;
}

/// Packets the server sends.
pub mod server {
    pub const S_ATTACKED_CLOSE: u16 = 0xBA;
    pub const S_ATTACKED_RANGED: u16 = 0xBB;
    pub const S_ATTACKED_MAGIC: u16 = 0xBC;
    pub const S_SHOW_FOREIGN_EFFECT: u16 = 0xC6;
    pub const S_ADD_COOLDOWN: u16 = 0xEA;
    pub const S_SPAWN_MOB: u16 = 0xEC;
    pub const S_KILL_MOB: u16 = 0xED;
    pub const S_SPAWN_MOB_C: u16 = 0xEE;
    pub const S_MOB_MOVED: u16 = 0xEF;
    pub const S_SHOW_MOB_HP: u16 = 0xFA;
}
