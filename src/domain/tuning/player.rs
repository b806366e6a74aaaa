/// Gameplay tuning for player-controlled avatars.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Distance moved per axis for each held direction in a Move packet.
    pub speed: u16,

    /// Spawn position.
    pub spawn_x: u16,
    pub spawn_y: u16,

    /// Initial avatar size; grows and shrinks in steps of one.
    pub width: u8,
    pub height: u8,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 5,
            spawn_x: 50,
            spawn_y: 50,
            width: 20,
            height: 20,
        }
    }
}
