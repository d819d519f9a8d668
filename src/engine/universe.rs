//! Demo game state.
//!
//! Stands in for the game logic the renderer normally serves: a snake circling the arena whose
//! tail grows and resets, food hopping between spots, and timed enraged/special phases. Every
//! value is a pure function of elapsed time so frames are reproducible.

use glam::Vec3;

use crate::engine::graphics::FrameTime;
use crate::engine::player::PlayerSnapshot;

const ORBIT_RADIUS: f32 = 1500.0;
const RADIANS_PER_MS: f32 = 0.0004;
const SEGMENT_SPACING: f32 = 0.12;

const MIN_TAIL: usize = 3;
const MAX_TAIL: usize = 12;
const TAIL_GROWTH_MS: u64 = 2000;

const ENRAGED_CYCLE_MS: u64 = 20_000;
const ENRAGED_WINDOW_MS: u64 = 5_000;

const SPECIAL_CYCLE_MS: u64 = 15_000;
const SPECIAL_WINDOW_MS: u64 = 4_000;

const FOOD_HOP_MS: u64 = 4_000;
const FOOD_SPOTS: [Vec3; 5] = [
    Vec3::new(800.0, 0.0, 300.0),
    Vec3::new(-600.0, 0.0, 900.0),
    Vec3::new(-1100.0, 0.0, -400.0),
    Vec3::new(200.0, 0.0, -1200.0),
    Vec3::new(1300.0, 0.0, -700.0),
];

/// Everything `SceneRenderer::draw` needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    pub player: PlayerSnapshot,
    pub food_position: Vec3,
    pub food_is_special: bool,
}

#[derive(Debug, Default)]
pub struct Universe {
    game_over: bool,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn toggle_game_over(&mut self) {
        self.game_over = !self.game_over;
        log::info!("game over screen {}", if self.game_over { "shown" } else { "hidden" });
    }

    pub fn frame_at(&self, time: FrameTime) -> SceneFrame {
        let ms = time.elapsed_ms;
        let angle = ms as f32 * RADIANS_PER_MS;

        let tail_len = MIN_TAIL + (ms / TAIL_GROWTH_MS) as usize % (MAX_TAIL - MIN_TAIL + 1);
        let tail = (1..=tail_len).map(|i| orbit_point(angle - SEGMENT_SPACING * i as f32));

        let player = PlayerSnapshot::new(orbit_point(angle))
            .with_tail(tail)
            .enraged(ms % ENRAGED_CYCLE_MS >= ENRAGED_CYCLE_MS - ENRAGED_WINDOW_MS);

        SceneFrame {
            player,
            food_position: FOOD_SPOTS[(ms / FOOD_HOP_MS) as usize % FOOD_SPOTS.len()],
            food_is_special: ms % SPECIAL_CYCLE_MS < SPECIAL_WINDOW_MS,
        }
    }
}

fn orbit_point(angle: f32) -> Vec3 {
    Vec3::new(ORBIT_RADIUS * angle.cos(), 0.0, ORBIT_RADIUS * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn at(ms: u64) -> FrameTime {
        FrameTime::from_millis(ms)
    }

    #[test]
    fn frames_are_reproducible() {
        let universe = Universe::new();
        assert_eq!(universe.frame_at(at(12_345)), universe.frame_at(at(12_345)));
    }

    #[test]
    fn snake_stays_on_the_orbit() {
        let universe = Universe::new();
        for ms in [0, 999, 7_000, 61_000] {
            let frame = universe.frame_at(at(ms));
            assert_relative_eq!(frame.player.coords.length(), ORBIT_RADIUS, epsilon = 0.1);
            for segment in &frame.player.tail {
                assert_relative_eq!(segment.length(), ORBIT_RADIUS, epsilon = 0.1);
            }
        }
    }

    #[test]
    fn tail_grows_then_resets() {
        let universe = Universe::new();
        assert_eq!(universe.frame_at(at(0)).player.tail.len(), MIN_TAIL);
        assert_eq!(universe.frame_at(at(TAIL_GROWTH_MS)).player.tail.len(), MIN_TAIL + 1);

        let cycle = TAIL_GROWTH_MS * (MAX_TAIL - MIN_TAIL + 1) as u64;
        assert_eq!(universe.frame_at(at(cycle - 1)).player.tail.len(), MAX_TAIL);
        assert_eq!(universe.frame_at(at(cycle)).player.tail.len(), MIN_TAIL);
    }

    #[test]
    fn enraged_only_at_end_of_cycle() {
        let universe = Universe::new();
        assert!(!universe.frame_at(at(0)).player.enraged);
        assert!(!universe.frame_at(at(14_999)).player.enraged);
        assert!(universe.frame_at(at(15_000)).player.enraged);
        assert!(universe.frame_at(at(19_999)).player.enraged);
        assert!(!universe.frame_at(at(20_000)).player.enraged);
    }

    #[test]
    fn special_food_at_start_of_cycle() {
        let universe = Universe::new();
        assert!(universe.frame_at(at(0)).food_is_special);
        assert!(!universe.frame_at(at(SPECIAL_WINDOW_MS)).food_is_special);
        assert!(universe.frame_at(at(SPECIAL_CYCLE_MS)).food_is_special);
    }

    #[test]
    fn food_hops_between_spots() {
        let universe = Universe::new();
        assert_eq!(universe.frame_at(at(0)).food_position, FOOD_SPOTS[0]);
        assert_eq!(universe.frame_at(at(FOOD_HOP_MS)).food_position, FOOD_SPOTS[1]);
        assert_eq!(
            universe.frame_at(at(FOOD_HOP_MS * FOOD_SPOTS.len() as u64)).food_position,
            FOOD_SPOTS[0]
        );
    }

    #[test]
    fn game_over_toggles() {
        let mut universe = Universe::new();
        assert!(!universe.is_game_over());
        universe.toggle_game_over();
        assert!(universe.is_game_over());
        universe.toggle_game_over();
        assert!(!universe.is_game_over());
    }
}
