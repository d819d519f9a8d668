use glam::Vec3;

/// Per-frame view of the player handed to the renderer by the game.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub coords: Vec3,
    pub enraged: bool,
    /// Tail positions, front (nearest the head) to back (oldest).
    pub tail: Vec<Vec3>,
}

impl PlayerSnapshot {
    pub fn new(coords: Vec3) -> Self {
        Self {
            coords,
            enraged: false,
            tail: Vec::new(),
        }
    }

    pub fn with_tail(mut self, tail: impl IntoIterator<Item = Vec3>) -> Self {
        self.tail = tail.into_iter().collect();
        self
    }

    pub fn enraged(mut self, enraged: bool) -> Self {
        self.enraged = enraged;
        self
    }
}
