use glam::DVec2;
use rand::Rng;
use serde::Serialize;

use crate::config::FoodConfig;
use crate::fish::FishKind;
use crate::vector::wrapped_distance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FoodKind {
    Plankton,
    SmallFishCorpse,
    LargeCorpse,
}

impl FoodKind {
    /// Nutritional value of one item.
    pub fn energy(self) -> f64 {
        match self {
            FoodKind::Plankton => 10.0,
            FoodKind::SmallFishCorpse => 50.0,
            FoodKind::LargeCorpse => 100.0,
        }
    }

    pub fn edible_by(self, kind: FishKind) -> bool {
        match kind {
            FishKind::Small => true,
            FishKind::Mid => matches!(self, FoodKind::Plankton | FoodKind::SmallFishCorpse),
        }
    }

    /// The other food a mid fish may develop a taste for.
    pub fn other_prey_food(self) -> Self {
        match self {
            FoodKind::Plankton => FoodKind::SmallFishCorpse,
            FoodKind::SmallFishCorpse | FoodKind::LargeCorpse => FoodKind::Plankton,
        }
    }
}

/// Where an unconsumed item is, as seen by foraging fish this tick.
#[derive(Debug, Clone, Copy)]
pub struct FoodSighting {
    pub position: DVec2,
    pub kind: FoodKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    pub position: DVec2,
    pub kind: FoodKind,
    pub velocity: DVec2,
    pub size: f64,
    pub consumed: bool,
}

impl Food {
    pub fn new(position: DVec2, kind: FoodKind, config: &FoodConfig, rng: &mut impl Rng) -> Self {
        let (size, velocity) = match kind {
            FoodKind::Plankton => {
                let drift = config.plankton_drift.abs();
                let velocity = if drift > 0.0 {
                    DVec2::new(rng.random_range(-drift..=drift), rng.random_range(-drift..=drift))
                } else {
                    DVec2::ZERO
                };
                (config.plankton_size, velocity)
            }
            FoodKind::SmallFishCorpse => (config.small_corpse_size, DVec2::new(0.0, config.small_corpse_sink)),
            FoodKind::LargeCorpse => (config.large_corpse_size, DVec2::new(0.0, config.large_corpse_sink)),
        };

        Food {
            position,
            kind,
            velocity,
            size,
            consumed: false,
        }
    }

    /// Drift one tick and flag the item once it has left the map.
    ///
    /// Plankton rides the water current; corpses sink.
    pub fn update(&mut self, current: DVec2, config: &FoodConfig, width: f64, height: f64) {
        if self.consumed {
            return;
        }
        self.position += self.velocity;
        if self.kind == FoodKind::Plankton {
            self.position += current * config.current_drift;
        }

        let p = self.position;
        if p.x < 0.0
            || p.x > width
            || p.y < -config.bottom_overshoot
            || p.y > height + config.bottom_overshoot
        {
            self.consumed = true;
        }
    }

    pub fn sighting(&self) -> FoodSighting {
        FoodSighting {
            position: self.position,
            kind: self.kind,
        }
    }

    /// Whether something of `size` at `position` overlaps this item.
    pub fn touches(&self, position: DVec2, size: f64, width: f64) -> bool {
        wrapped_distance(self.position, position, width) < self.size + size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn corpses_sink_and_expire_below_the_map() {
        let config = FoodConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut corpse = Food::new(DVec2::new(100.0, 1040.0), FoodKind::SmallFishCorpse, &config, &mut rng);
        corpse.update(DVec2::new(5.0, 0.0), &config, 800.0, 1000.0);
        // corpses ignore the current
        assert_eq!(corpse.position.x, 100.0);
        assert!(!corpse.consumed);
        for _ in 0..100 {
            corpse.update(DVec2::ZERO, &config, 800.0, 1000.0);
        }
        assert!(corpse.consumed);
    }

    #[test]
    fn plankton_leaving_the_side_expires() {
        let config = FoodConfig {
            plankton_drift: 0.0,
            ..FoodConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut plankton = Food::new(DVec2::new(799.0, 500.0), FoodKind::Plankton, &config, &mut rng);
        plankton.update(DVec2::new(40.0, 0.0), &config, 800.0, 1000.0);
        assert!(plankton.consumed);
    }

    #[test]
    fn mid_fish_do_not_eat_large_corpses() {
        assert!(FoodKind::LargeCorpse.edible_by(FishKind::Small));
        assert!(!FoodKind::LargeCorpse.edible_by(FishKind::Mid));
        assert!(FoodKind::SmallFishCorpse.edible_by(FishKind::Mid));
        assert!(FoodKind::Plankton.energy() < FoodKind::LargeCorpse.energy());
    }

    #[test]
    fn contact_uses_wrapped_distance() {
        let config = FoodConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let food = Food::new(DVec2::new(1.0, 50.0), FoodKind::LargeCorpse, &config, &mut rng);
        assert!(food.touches(DVec2::new(799.0, 50.0), 2.5, 800.0));
        assert!(!food.touches(DVec2::new(400.0, 50.0), 2.5, 800.0));
    }
}
