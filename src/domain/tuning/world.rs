/// Fixed world extents shared by movement clamping, collision and GC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldBounds {
    pub width: u16,
    pub height: u16,
}

impl WorldBounds {
    /// Half-open containment: a point on the far edge is outside.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < f32::from(self.width) && y < f32::from(self.height)
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
        }
    }
}
