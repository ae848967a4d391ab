use rand::Rng;

use crate::config::FishSpeciesConfig;
use crate::fish::FishKind;
use crate::food::FoodKind;

/// Traits fixed at birth.
#[derive(Debug, Clone, PartialEq)]
pub struct Genetics {
    /// Multiplier on the species speed tunable.
    pub speed_factor: f64,
    /// Added to the species base steering force.
    pub force_bonus: f64,
    pub size_factor: f64,
    /// Speeds up fear recovery.
    pub panic_resistance: f64,
    pub max_age: u64,
    pub preferred_food: FoodKind,
}

/// Older parents give slightly fitter offspring, up to a cap.
fn age_factor(parent_age: u64) -> f64 {
    (parent_age as f64 * 0.001).min(0.3)
}

fn sample_max_age(species: &FishSpeciesConfig, rng: &mut impl Rng) -> u64 {
    let low = species.max_age.saturating_sub(species.max_age_variation);
    let high = species.max_age + species.max_age_variation;
    rng.random_range(low..=high)
}

impl Genetics {
    pub fn new_random(
        kind: FishKind,
        parent_age: u64,
        species: &FishSpeciesConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let bonus = age_factor(parent_age);
        let preferred_food = match kind {
            FishKind::Small => FoodKind::Plankton,
            FishKind::Mid => {
                if rng.random_bool(0.5) {
                    FoodKind::Plankton
                } else {
                    FoodKind::SmallFishCorpse
                }
            }
        };

        Genetics {
            speed_factor: rng.random_range(0.7..1.3) + bonus * 0.5,
            force_bonus: bonus * 0.02,
            size_factor: rng.random_range(0.8..1.2),
            panic_resistance: bonus * 0.3,
            max_age: sample_max_age(species, rng),
            preferred_food,
        }
    }

    /// Traits for an offspring of `self`.
    ///
    /// Speed and size are redrawn; panic resistance, lifespan and food
    /// preference are inherited with a small perturbation.
    pub fn inherit(
        &self,
        kind: FishKind,
        parent_age: u64,
        species: &FishSpeciesConfig,
        rng: &mut impl Rng,
    ) -> Self {
        let mut child = Self::new_random(kind, parent_age, species, rng);

        child.panic_resistance = (self.panic_resistance.max(child.panic_resistance)
            + rng.random_range(-0.05..0.05))
        .clamp(0.0, 1.0);

        let low = species.max_age.saturating_sub(species.max_age_variation) as f64;
        let high = (species.max_age + species.max_age_variation) as f64;
        child.max_age = (self.max_age as f64 * rng.random_range(0.9..1.1))
            .clamp(low, high)
            .round() as u64;

        if kind == FishKind::Mid {
            child.preferred_food = if rng.random_bool(0.1) {
                self.preferred_food.other_prey_food()
            } else {
                self.preferred_food
            };
        }
        child
    }
}
