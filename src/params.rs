//! Shared tunables read by every agent and written only by the balancer.
//!
//! Every write goes through [`SimParameters::set`], which clamps into the
//! declared range, so no code path can leave a tunable out of bounds.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

/// Named numeric parameter shared by the whole simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Tunable {
    FishSpeed,
    FishForce,
    FishSize,
    FishCohesionRadius,
    FishSeparationRadius,
    FishAlignmentRadius,
    FishNaturalBreedChance,
    FishFoodBreedChance,
    FishBreedCooldown,
    MidFishSpeed,
    MidFishForce,
    MidFishSize,
    MidFishCohesionRadius,
    MidFishSeparationRadius,
    MidFishAlignmentRadius,
    MidFishBreedChance,
    MidFishBreedCooldown,
    PredatorSpeed,
    PredatorMaxForce,
    PredatorSize,
    PredatorHungerDecay,
    PredatorMaxHunger,
    PredatorFeedRestore,
    PredatorHuntFishWeight,
    PredatorHuntMidFishWeight,
    SeparationWeight,
    AlignmentWeight,
    CohesionWeight,
    FoodWeight,
    EscapeWeight,
    MidFishEscapeWeight,
    FoodCount,
}

/// Inclusive `[min, max]` band a tunable must stay inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TunableRange {
    pub min: f64,
    pub max: f64,
}

impl TunableRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Tunable {
    pub const COUNT: usize = 32;

    pub const ALL: [Tunable; Tunable::COUNT] = [
        Tunable::FishSpeed,
        Tunable::FishForce,
        Tunable::FishSize,
        Tunable::FishCohesionRadius,
        Tunable::FishSeparationRadius,
        Tunable::FishAlignmentRadius,
        Tunable::FishNaturalBreedChance,
        Tunable::FishFoodBreedChance,
        Tunable::FishBreedCooldown,
        Tunable::MidFishSpeed,
        Tunable::MidFishForce,
        Tunable::MidFishSize,
        Tunable::MidFishCohesionRadius,
        Tunable::MidFishSeparationRadius,
        Tunable::MidFishAlignmentRadius,
        Tunable::MidFishBreedChance,
        Tunable::MidFishBreedCooldown,
        Tunable::PredatorSpeed,
        Tunable::PredatorMaxForce,
        Tunable::PredatorSize,
        Tunable::PredatorHungerDecay,
        Tunable::PredatorMaxHunger,
        Tunable::PredatorFeedRestore,
        Tunable::PredatorHuntFishWeight,
        Tunable::PredatorHuntMidFishWeight,
        Tunable::SeparationWeight,
        Tunable::AlignmentWeight,
        Tunable::CohesionWeight,
        Tunable::FoodWeight,
        Tunable::EscapeWeight,
        Tunable::MidFishEscapeWeight,
        Tunable::FoodCount,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Config-file key, in the `SCREAMING_SNAKE` style of the tuning tables.
    pub const fn name(self) -> &'static str {
        match self {
            Tunable::FishSpeed => "FISH_SPEED",
            Tunable::FishForce => "FISH_FORCE",
            Tunable::FishSize => "FISH_SIZE",
            Tunable::FishCohesionRadius => "FISH_COHESION_RADIUS",
            Tunable::FishSeparationRadius => "FISH_SEPARATION_RADIUS",
            Tunable::FishAlignmentRadius => "FISH_ALIGNMENT_RADIUS",
            Tunable::FishNaturalBreedChance => "FISH_NATURAL_BREED_CHANCE",
            Tunable::FishFoodBreedChance => "FISH_FOOD_BREED_CHANCE",
            Tunable::FishBreedCooldown => "FISH_BREED_COOLDOWN",
            Tunable::MidFishSpeed => "MID_FISH_SPEED",
            Tunable::MidFishForce => "MID_FISH_FORCE",
            Tunable::MidFishSize => "MID_FISH_SIZE",
            Tunable::MidFishCohesionRadius => "MID_FISH_COHESION_RADIUS",
            Tunable::MidFishSeparationRadius => "MID_FISH_SEPARATION_RADIUS",
            Tunable::MidFishAlignmentRadius => "MID_FISH_ALIGNMENT_RADIUS",
            Tunable::MidFishBreedChance => "MID_FISH_BREED_CHANCE",
            Tunable::MidFishBreedCooldown => "MID_FISH_BREED_COOLDOWN",
            Tunable::PredatorSpeed => "PREDATOR_SPEED",
            Tunable::PredatorMaxForce => "PREDATOR_MAX_FORCE",
            Tunable::PredatorSize => "PREDATOR_SIZE",
            Tunable::PredatorHungerDecay => "PREDATOR_HUNGER_DECAY",
            Tunable::PredatorMaxHunger => "PREDATOR_MAX_HUNGER",
            Tunable::PredatorFeedRestore => "PREDATOR_FEED_RESTORE",
            Tunable::PredatorHuntFishWeight => "PREDATOR_HUNT_FISH_WEIGHT",
            Tunable::PredatorHuntMidFishWeight => "PREDATOR_HUNT_MID_FISH_WEIGHT",
            Tunable::SeparationWeight => "SEPARATION_WEIGHT",
            Tunable::AlignmentWeight => "ALIGNMENT_WEIGHT",
            Tunable::CohesionWeight => "COHESION_WEIGHT",
            Tunable::FoodWeight => "FOOD_WEIGHT",
            Tunable::EscapeWeight => "ESCAPE_WEIGHT",
            Tunable::MidFishEscapeWeight => "MID_FISH_ESCAPE_WEIGHT",
            Tunable::FoodCount => "FOOD_COUNT",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Base value and declared range.
    pub const fn defaults(self) -> (f64, TunableRange) {
        match self {
            Tunable::FishSpeed => (2.0, TunableRange::new(1.0, 6.0)),
            Tunable::FishForce => (0.1, TunableRange::new(0.04, 0.3)),
            Tunable::FishSize => (2.5, TunableRange::new(1.5, 6.0)),
            Tunable::FishCohesionRadius => (30.0, TunableRange::new(20.0, 150.0)),
            Tunable::FishSeparationRadius => (25.0, TunableRange::new(10.0, 50.0)),
            Tunable::FishAlignmentRadius => (50.0, TunableRange::new(20.0, 100.0)),
            Tunable::FishNaturalBreedChance => (0.0005, TunableRange::new(0.0001, 0.004)),
            Tunable::FishFoodBreedChance => (0.004, TunableRange::new(0.001, 0.02)),
            Tunable::FishBreedCooldown => (1800.0, TunableRange::new(600.0, 3600.0)),
            Tunable::MidFishSpeed => (1.5, TunableRange::new(0.8, 4.5)),
            Tunable::MidFishForce => (0.06, TunableRange::new(0.03, 0.2)),
            Tunable::MidFishSize => (4.0, TunableRange::new(2.5, 8.0)),
            Tunable::MidFishCohesionRadius => (45.0, TunableRange::new(30.0, 200.0)),
            Tunable::MidFishSeparationRadius => (37.5, TunableRange::new(15.0, 60.0)),
            Tunable::MidFishAlignmentRadius => (75.0, TunableRange::new(30.0, 120.0)),
            Tunable::MidFishBreedChance => (0.0004, TunableRange::new(0.0001, 0.003)),
            Tunable::MidFishBreedCooldown => (2700.0, TunableRange::new(900.0, 5400.0)),
            Tunable::PredatorSpeed => (3.0, TunableRange::new(1.5, 6.0)),
            Tunable::PredatorMaxForce => (0.15, TunableRange::new(0.05, 0.5)),
            Tunable::PredatorSize => (7.5, TunableRange::new(5.0, 15.0)),
            Tunable::PredatorHungerDecay => (20.0, TunableRange::new(8.0, 25.0)),
            Tunable::PredatorMaxHunger => (30000.0, TunableRange::new(15000.0, 60000.0)),
            Tunable::PredatorFeedRestore => (1000.0, TunableRange::new(300.0, 3000.0)),
            Tunable::PredatorHuntFishWeight => (30.0, TunableRange::new(0.0, 100.0)),
            Tunable::PredatorHuntMidFishWeight => (60.0, TunableRange::new(0.0, 100.0)),
            Tunable::SeparationWeight => (2.0, TunableRange::new(1.0, 3.5)),
            Tunable::AlignmentWeight => (1.0, TunableRange::new(0.5, 2.5)),
            Tunable::CohesionWeight => (1.0, TunableRange::new(0.5, 2.5)),
            Tunable::FoodWeight => (1.0, TunableRange::new(0.5, 2.5)),
            Tunable::EscapeWeight => (1.5, TunableRange::new(1.0, 3.0)),
            Tunable::MidFishEscapeWeight => (1.8, TunableRange::new(1.2, 3.5)),
            Tunable::FoodCount => (100.0, TunableRange::new(50.0, 200.0)),
        }
    }
}

/// One row of the tunable table, as handed to display code.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterReading {
    pub name: &'static str,
    pub value: f64,
    pub base: f64,
    pub min: f64,
    pub max: f64,
}

/// The shared tunable table: current values, base values and ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct SimParameters {
    values: [f64; Tunable::COUNT],
    base: [f64; Tunable::COUNT],
    ranges: [TunableRange; Tunable::COUNT],
}

impl Default for SimParameters {
    fn default() -> Self {
        let mut values = [0.0; Tunable::COUNT];
        let mut ranges = [TunableRange::new(0.0, 0.0); Tunable::COUNT];
        for tunable in Tunable::ALL {
            let (value, range) = tunable.defaults();
            values[tunable.index()] = value;
            ranges[tunable.index()] = range;
        }
        Self {
            values,
            base: values,
            ranges,
        }
    }
}

impl SimParameters {
    /// Defaults with `overrides` (keyed by [`Tunable::name`]) folded into the base.
    pub fn with_overrides(overrides: &BTreeMap<String, f64>) -> Self {
        let mut params = Self::default();
        for (name, value) in overrides {
            match Tunable::from_name(name) {
                Some(tunable) => params.set_base(tunable, *value),
                None => warn!(name = %name, "ignoring unknown tunable override"),
            }
        }
        params
    }

    pub fn get(&self, tunable: Tunable) -> f64 {
        self.values[tunable.index()]
    }

    pub fn base(&self, tunable: Tunable) -> f64 {
        self.base[tunable.index()]
    }

    pub fn range(&self, tunable: Tunable) -> TunableRange {
        self.ranges[tunable.index()]
    }

    /// Look a tunable up by name, falling back to `default` when unknown.
    pub fn lookup_or(&self, name: &str, default: f64) -> f64 {
        Tunable::from_name(name).map_or(default, |t| self.get(t))
    }

    /// Write a value, clamped into range. Non-finite input restores the base value.
    pub fn set(&mut self, tunable: Tunable, value: f64) -> f64 {
        let idx = tunable.index();
        let next = if value.is_finite() {
            self.ranges[idx].clamp(value)
        } else {
            self.base[idx]
        };
        self.values[idx] = next;
        next
    }

    pub fn nudge(&mut self, tunable: Tunable, delta: f64) -> f64 {
        self.set(tunable, self.get(tunable) + delta)
    }

    /// Set both the base and the live value.
    pub fn set_base(&mut self, tunable: Tunable, value: f64) {
        let idx = tunable.index();
        if !value.is_finite() {
            return;
        }
        let clamped = self.ranges[idx].clamp(value);
        self.base[idx] = clamped;
        self.values[idx] = clamped;
    }

    /// Re-declare a range; the live and base values are pulled inside it.
    pub fn with_range(mut self, tunable: Tunable, min: f64, max: f64) -> Self {
        let idx = tunable.index();
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let range = TunableRange::new(lo, hi);
        self.ranges[idx] = range;
        self.base[idx] = range.clamp(self.base[idx]);
        self.values[idx] = range.clamp(self.values[idx]);
        self
    }

    pub fn reset_to_base(&mut self) {
        self.values = self.base;
    }

    pub fn is_at_base(&self) -> bool {
        self.values == self.base
    }

    pub fn all_within_range(&self) -> bool {
        Tunable::ALL
            .iter()
            .all(|t| self.range(*t).contains(self.get(*t)))
    }

    pub fn snapshot(&self) -> Vec<ParameterReading> {
        Tunable::ALL
            .iter()
            .map(|t| {
                let range = self.range(*t);
                ParameterReading {
                    name: t.name(),
                    value: self.get(*t),
                    base: self.base(*t),
                    min: range.min,
                    max: range.max,
                }
            })
            .collect()
    }
}
