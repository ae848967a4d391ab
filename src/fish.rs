use std::f64::consts::{FRAC_PI_2, TAU};

use glam::DVec2;
use rand::Rng;
use serde::Serialize;
use slotmap::new_key_type;

use crate::config::{FishSpeciesConfig, SimConfig};
use crate::context::TickContext;
use crate::food::{FoodKind, FoodSighting};
use crate::genetics::Genetics;
use crate::params::{SimParameters, Tunable};
use crate::predator::PredatorSighting;
use crate::spatial::{Positioned, SpatialGrid};
use crate::steering::{
    Escape, Motion, Neighbour, Threat, alignment, cohesion, flee, separation, seek, vertical_boundary,
    wander,
};
use crate::vector::{limit, rotate, wrap_x, wrapped_delta};

new_key_type! {
    /// Generational handle to a fish. Lookups through a stale handle fail.
    pub struct FishId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FishKind {
    Small,
    Mid,
}

/// Which shared tunables drive a species.
#[derive(Debug, Clone, Copy)]
pub struct SpeciesTunables {
    pub speed: Tunable,
    pub force: Tunable,
    pub size: Tunable,
    pub separation_radius: Tunable,
    pub alignment_radius: Tunable,
    pub cohesion_radius: Tunable,
    pub natural_breed_chance: Tunable,
    /// `None` falls back to the species config value.
    pub fed_breed_chance: Option<Tunable>,
    pub breed_cooldown: Tunable,
    pub escape_weight: Tunable,
}

impl FishKind {
    pub const ALL: [FishKind; 2] = [FishKind::Small, FishKind::Mid];

    pub fn label(self) -> &'static str {
        match self {
            FishKind::Small => "small fish",
            FishKind::Mid => "mid fish",
        }
    }

    pub fn species(self, config: &SimConfig) -> &FishSpeciesConfig {
        match self {
            FishKind::Small => &config.small_fish,
            FishKind::Mid => &config.mid_fish,
        }
    }

    pub const fn tunables(self) -> SpeciesTunables {
        match self {
            FishKind::Small => SpeciesTunables {
                speed: Tunable::FishSpeed,
                force: Tunable::FishForce,
                size: Tunable::FishSize,
                separation_radius: Tunable::FishSeparationRadius,
                alignment_radius: Tunable::FishAlignmentRadius,
                cohesion_radius: Tunable::FishCohesionRadius,
                natural_breed_chance: Tunable::FishNaturalBreedChance,
                fed_breed_chance: Some(Tunable::FishFoodBreedChance),
                breed_cooldown: Tunable::FishBreedCooldown,
                escape_weight: Tunable::EscapeWeight,
            },
            FishKind::Mid => SpeciesTunables {
                speed: Tunable::MidFishSpeed,
                force: Tunable::MidFishForce,
                size: Tunable::MidFishSize,
                separation_radius: Tunable::MidFishSeparationRadius,
                alignment_radius: Tunable::MidFishAlignmentRadius,
                cohesion_radius: Tunable::MidFishCohesionRadius,
                natural_breed_chance: Tunable::MidFishBreedChance,
                fed_breed_chance: None,
                breed_cooldown: Tunable::MidFishBreedCooldown,
                escape_weight: Tunable::MidFishEscapeWeight,
            },
        }
    }

    /// Food left behind when a fish of this kind dies of old age or hunger.
    pub fn corpse(self) -> FoodKind {
        match self {
            FishKind::Small => FoodKind::SmallFishCorpse,
            FishKind::Mid => FoodKind::LargeCorpse,
        }
    }

    /// How filling this prey is for a predator, relative to a small fish.
    pub fn prey_value(self) -> f64 {
        match self {
            FishKind::Small => 1.0,
            FishKind::Mid => 1.6,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Fish {
    pub kind: FishKind,
    /// Birth order; breaks ties deterministically.
    pub serial: u64,
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    pub age: u64,
    pub hunger: f64,
    pub alive: bool,
    pub mature: bool,
    pub last_breed_tick: Option<u64>,
    pub last_feed_tick: Option<u64>,
    pub experience: f64,
    pub fear: f64,
    pub genetics: Genetics,
}

/// Per-tick copy of the fields other agents may look at.
#[derive(Debug, Clone, Copy)]
pub struct FishSnapshot {
    pub id: FishId,
    pub kind: FishKind,
    pub serial: u64,
    pub position: DVec2,
    pub velocity: DVec2,
    pub max_speed: f64,
    pub size: f64,
}

impl Positioned for FishSnapshot {
    fn position(&self) -> DVec2 {
        self.position
    }
}

/// Forces computed from the shared snapshot, before any mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Steering {
    pub separation: DVec2,
    pub alignment: DVec2,
    pub cohesion: DVec2,
    pub food: DVec2,
    pub escape: Escape,
    /// A predator is within the species danger radius.
    pub near_danger: bool,
}

impl Fish {
    pub fn new(
        kind: FishKind,
        position: DVec2,
        parent_age: u64,
        config: &SimConfig,
        params: &SimParameters,
        rng: &mut impl Rng,
    ) -> Self {
        let genetics = Genetics::new_random(kind, parent_age, kind.species(config), rng);
        Self::with_genetics(kind, position, genetics, config, params, rng)
    }

    pub fn with_genetics(
        kind: FishKind,
        position: DVec2,
        genetics: Genetics,
        config: &SimConfig,
        params: &SimParameters,
        rng: &mut impl Rng,
    ) -> Self {
        let species = kind.species(config);
        let jitter = species.hunger_jitter.abs();
        let offset = if jitter > 0.0 {
            rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        let hunger = (species.initial_hunger + offset).clamp(1.0, species.max_hunger);

        let mut fish = Fish {
            kind,
            serial: 0,
            position,
            velocity: DVec2::ZERO,
            acceleration: DVec2::ZERO,
            age: 0,
            hunger,
            alive: true,
            mature: false,
            last_breed_tick: None,
            last_feed_tick: None,
            experience: 0.0,
            fear: 0.0,
            genetics,
        };
        fish.velocity = DVec2::from_angle(rng.random_range(0.0..TAU)) * fish.max_speed(params);
        fish
    }

    pub fn max_speed(&self, params: &SimParameters) -> f64 {
        params.get(self.kind.tunables().speed) * self.genetics.speed_factor
    }

    pub fn max_force(&self, params: &SimParameters) -> f64 {
        params.get(self.kind.tunables().force) + self.genetics.force_bonus
    }

    pub fn size(&self, params: &SimParameters) -> f64 {
        params.get(self.kind.tunables().size) * self.genetics.size_factor
    }

    pub fn motion(&self, params: &SimParameters) -> Motion {
        Motion {
            velocity: self.velocity,
            max_speed: self.max_speed(params),
            max_force: self.max_force(params),
        }
    }

    pub fn snapshot(&self, id: FishId, params: &SimParameters) -> FishSnapshot {
        FishSnapshot {
            id,
            kind: self.kind,
            serial: self.serial,
            position: self.position,
            velocity: self.velocity,
            max_speed: self.max_speed(params),
            size: self.size(params),
        }
    }

    /// Compute this tick's forces. Reads only shared state, so it can run in parallel.
    pub fn sense(
        &self,
        id: FishId,
        ctx: &TickContext,
        grid: &SpatialGrid<FishSnapshot>,
        predators: &[PredatorSighting],
        food: &[FoodSighting],
    ) -> Steering {
        if !self.alive {
            return Steering::default();
        }
        let params = ctx.params;
        let tunables = self.kind.tunables();
        let species = self.kind.species(ctx.config);
        let behavior = &ctx.config.behavior;
        let width = ctx.width();
        let motion = self.motion(params);

        let separation_radius = params.get(tunables.separation_radius);
        let alignment_radius = params.get(tunables.alignment_radius);
        let cohesion_radius = params.get(tunables.cohesion_radius);
        let reach = separation_radius.max(alignment_radius).max(cohesion_radius);

        // schools only form within a species
        let mut neighbours = Vec::new();
        grid.for_each_within(self.position, reach, None, |_, other, delta| {
            if other.id != id && other.kind == self.kind {
                neighbours.push(Neighbour {
                    delta,
                    velocity: other.velocity,
                });
            }
        });

        let food_force = self
            .nearest_food(food, species.food_detection_radius, width)
            .map_or(DVec2::ZERO, |delta| seek(&motion, delta));

        let detection = species.escape_radius + self.experience * 10.0;
        let danger_sq = species.danger_radius * species.danger_radius;
        let mut near_danger = false;
        let mut threats = Vec::new();
        for predator in predators {
            let delta = wrapped_delta(self.position, predator.position, width);
            let distance_sq = delta.length_squared();
            if distance_sq < danger_sq {
                near_danger = true;
            }
            if distance_sq < detection * detection {
                threats.push(Threat {
                    delta,
                    dashing: predator.dashing,
                });
            }
        }

        Steering {
            separation: separation(&motion, &neighbours, separation_radius),
            alignment: alignment(&motion, &neighbours, alignment_radius),
            cohesion: cohesion(&motion, &neighbours, cohesion_radius),
            food: food_force,
            escape: flee(
                &motion,
                &threats,
                detection,
                behavior.flee_gain,
                behavior.flee_force_multiple,
            ),
            near_danger,
        }
    }

    /// Displacement to the closest edible item in range. Mid fish go for
    /// their preferred food first and settle for anything edible otherwise.
    fn nearest_food(&self, food: &[FoodSighting], radius: f64, width: f64) -> Option<DVec2> {
        let radius_sq = radius * radius;
        let mut any: Option<(f64, DVec2)> = None;
        let mut preferred: Option<(f64, DVec2)> = None;
        for item in food {
            if !item.kind.edible_by(self.kind) {
                continue;
            }
            let delta = wrapped_delta(self.position, item.position, width);
            let distance_sq = delta.length_squared();
            if distance_sq >= radius_sq {
                continue;
            }
            if any.is_none_or(|(best, _)| distance_sq < best) {
                any = Some((distance_sq, delta));
            }
            if self.kind == FishKind::Mid
                && item.kind == self.genetics.preferred_food
                && preferred.is_none_or(|(best, _)| distance_sq < best)
            {
                preferred = Some((distance_sq, delta));
            }
        }
        preferred.or(any).map(|(_, delta)| delta)
    }

    /// Apply this tick's forces and move.
    pub fn integrate(
        &mut self,
        steering: &Steering,
        ambient: DVec2,
        local: DVec2,
        ctx: &TickContext,
        rng: &mut impl Rng,
    ) {
        if !self.alive {
            return;
        }
        let params = ctx.params;
        let behavior = &ctx.config.behavior;
        let world = &ctx.config.world;

        let gained = if steering.near_danger {
            behavior.danger_experience
        } else {
            behavior.calm_experience
        };
        self.experience = (self.experience + gained).min(behavior.experience_cap);
        if steering.escape.dash_seen {
            self.fear = (self.fear + behavior.dash_fear).min(1.0);
        }

        let motion = self.motion(params);
        let experience_boost = 1.0 + (self.experience * 0.1).min(0.5);
        let escape_weight = params.get(self.kind.tunables().escape_weight);

        self.acceleration = steering.separation * params.get(Tunable::SeparationWeight)
            + steering.alignment * params.get(Tunable::AlignmentWeight)
            + steering.cohesion * params.get(Tunable::CohesionWeight) * ctx.cohesion_multiplier()
            + wander(&motion, behavior.wander_chance, rng) * behavior.wander_weight
            + ambient * behavior.current_strength
            + local
            + steering.food * params.get(Tunable::FoodWeight)
            + steering.escape.force * escape_weight * experience_boost
            + vertical_boundary(
                self.position.y,
                world.height,
                world.boundary_margin,
                behavior.boundary_force,
            );

        let top_speed = self.top_speed(ctx);
        self.velocity = limit(self.velocity + self.acceleration, top_speed);
        self.position += self.velocity;
        self.contain(world.width, world.height, top_speed, behavior.wrap_jitter, rng);

        let recovery = behavior.fear_recovery + self.genetics.panic_resistance * 0.01;
        self.fear = (self.fear - recovery).max(0.0);
    }

    /// Speed cap after the time-of-day multiplier.
    pub fn top_speed(&self, ctx: &TickContext) -> f64 {
        self.max_speed(ctx.params) * ctx.speed_multiplier()
    }

    fn contain(&mut self, width: f64, height: f64, top_speed: f64, jitter: f64, rng: &mut impl Rng) {
        if self.position.x < 0.0 || self.position.x >= width {
            self.position.x = wrap_x(self.position.x, width);
            if jitter > 0.0 {
                let kick = DVec2::new(
                    rng.random_range(-jitter..=jitter),
                    rng.random_range(-jitter..=jitter),
                );
                self.velocity = limit(self.velocity + kick, top_speed);
            }
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y > height {
            self.position.y = height;
            self.velocity.y = -self.velocity.y.abs();
        }
    }

    /// Age and starve by one tick. Returns `true` if the fish died now.
    pub fn live_one_tick(&mut self, species: &FishSpeciesConfig) -> bool {
        if !self.alive {
            return false;
        }
        self.age += 1;
        self.hunger -= species.hunger_decay;
        if self.age > species.reproduction_age {
            self.mature = true;
        }
        self.check_vitals()
    }

    /// Flip to dead when starved or past lifespan. Returns `true` on that flip.
    pub fn check_vitals(&mut self) -> bool {
        if self.alive && (self.hunger <= 0.0 || self.age > self.genetics.max_age) {
            self.alive = false;
            return true;
        }
        false
    }

    pub fn cooldown_elapsed(&self, tick: u64, cooldown: f64) -> bool {
        self.last_breed_tick
            .is_none_or(|last| tick.saturating_sub(last) as f64 > cooldown)
    }

    pub fn fed_recently(&self, tick: u64, window: u64) -> bool {
        self.last_feed_tick
            .is_some_and(|fed| tick.saturating_sub(fed) < window)
    }

    pub fn can_reproduce(&self, ctx: &TickContext) -> bool {
        let species = self.kind.species(ctx.config);
        let cooldown = ctx.params.get(self.kind.tunables().breed_cooldown);
        self.alive
            && self.mature
            && self.cooldown_elapsed(ctx.tick, cooldown)
            && self.hunger > species.breed_hunger_min
    }

    /// One breeding roll. The natural and the fed-bonus chances are drawn
    /// independently; either success yields exactly one offspring.
    pub fn attempt_reproduction(&mut self, ctx: &TickContext, rng: &mut impl Rng) -> Option<Fish> {
        if !self.can_reproduce(ctx) {
            return None;
        }
        let species = self.kind.species(ctx.config);
        let tunables = self.kind.tunables();
        let natural = ctx.params.get(tunables.natural_breed_chance);
        let fed = tunables
            .fed_breed_chance
            .map_or(species.food_breed_chance, |t| ctx.params.get(t));

        let bred = rng.random::<f64>() < natural
            || (self.fed_recently(ctx.tick, species.fed_window) && rng.random::<f64>() < fed);
        if !bred {
            return None;
        }
        Some(self.spawn_offspring(ctx, rng))
    }

    fn spawn_offspring(&mut self, ctx: &TickContext, rng: &mut impl Rng) -> Fish {
        let species = self.kind.species(ctx.config);
        let spread = species.spawn_offset.abs();
        let offset = if spread > 0.0 {
            DVec2::new(
                rng.random_range(-spread..=spread),
                rng.random_range(-spread..=spread),
            )
        } else {
            DVec2::ZERO
        };
        let mut position = self.position + offset;
        position.x = wrap_x(position.x, ctx.width());
        position.y = position.y.clamp(0.0, ctx.height());

        let genetics = self.genetics.inherit(self.kind, self.age, species, rng);
        let mut child = Fish::with_genetics(self.kind, position, genetics, ctx.config, ctx.params, rng);
        if self.velocity.length_squared() > 0.0 {
            let turned = rotate(self.velocity, rng.random_range(-FRAC_PI_2..FRAC_PI_2));
            child.velocity = limit(turned, child.max_speed(ctx.params));
        }

        self.hunger -= species.breed_hunger_cost;
        self.last_breed_tick = Some(ctx.tick);
        self.check_vitals();
        child
    }

    pub fn feed(&mut self, tick: u64, species: &FishSpeciesConfig) {
        self.hunger = (self.hunger + species.feed_restore).min(species.max_hunger);
        self.last_feed_tick = Some(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use slotmap::SlotMap;

    fn setup() -> (SimConfig, SimParameters, StdRng) {
        (SimConfig::default(), SimParameters::default(), StdRng::seed_from_u64(42))
    }

    fn ready_to_breed(fish: &mut Fish) {
        fish.age = 5000;
        fish.mature = true;
        fish.hunger = 110.0;
        fish.last_breed_tick = None;
    }

    #[test]
    fn starving_fish_dies_and_stays_dead() {
        let (config, params, mut rng) = setup();
        let mut fish = Fish::new(FishKind::Small, DVec2::new(100.0, 100.0), 0, &config, &params, &mut rng);
        fish.hunger = 0.01;
        assert!(fish.live_one_tick(&config.small_fish));
        assert!(!fish.alive);
        fish.hunger = 100.0;
        assert!(!fish.live_one_tick(&config.small_fish));
        assert!(!fish.alive);
    }

    #[test]
    fn old_age_kills_on_the_tick_it_is_exceeded() {
        let (config, params, mut rng) = setup();
        let mut fish = Fish::new(FishKind::Mid, DVec2::new(100.0, 100.0), 0, &config, &params, &mut rng);
        fish.age = fish.genetics.max_age - 1;
        assert!(!fish.live_one_tick(&config.mid_fish));
        assert!(fish.live_one_tick(&config.mid_fish));
        assert!(fish.age > fish.genetics.max_age);
    }

    #[test]
    fn maturity_is_reached_once() {
        let (config, params, mut rng) = setup();
        let mut fish = Fish::new(FishKind::Small, DVec2::new(100.0, 100.0), 0, &config, &params, &mut rng);
        fish.age = config.small_fish.reproduction_age;
        assert!(!fish.mature);
        fish.live_one_tick(&config.small_fish);
        assert!(fish.mature);
    }

    #[test]
    fn ineligible_fish_never_breeds() {
        let (config, _, mut rng) = setup();
        let params = SimParameters::default()
            .with_range(Tunable::FishNaturalBreedChance, 1.0, 1.0)
            .with_range(Tunable::FishFoodBreedChance, 1.0, 1.0);
        let ctx = TickContext::new(&config, &params, 10, 1.0);
        let mut fish = Fish::new(FishKind::Small, DVec2::new(300.0, 300.0), 0, &config, &params, &mut rng);

        // immature
        for _ in 0..50 {
            assert!(fish.attempt_reproduction(&ctx, &mut rng).is_none());
        }
        // mature but hungry
        ready_to_breed(&mut fish);
        fish.hunger = config.small_fish.breed_hunger_min;
        assert!(fish.attempt_reproduction(&ctx, &mut rng).is_none());
        // mature, fed, but on cooldown
        ready_to_breed(&mut fish);
        fish.last_breed_tick = Some(5);
        assert!(!fish.can_reproduce(&ctx));
        assert!(fish.attempt_reproduction(&ctx, &mut rng).is_none());
    }

    #[test]
    fn certain_breeding_yields_exactly_one_offspring_nearby() {
        let (config, _, mut rng) = setup();
        let params = SimParameters::default().with_range(Tunable::FishNaturalBreedChance, 1.0, 1.0);
        let ctx = TickContext::new(&config, &params, 100, 1.0);
        let mut parent = Fish::new(FishKind::Small, DVec2::new(400.0, 400.0), 0, &config, &params, &mut rng);
        ready_to_breed(&mut parent);
        let hunger_before = parent.hunger;

        let child = parent
            .attempt_reproduction(&ctx, &mut rng)
            .expect("guaranteed breed");
        let offset = child.position - parent.position;
        assert!(offset.x.abs() <= config.small_fish.spawn_offset);
        assert!(offset.y.abs() <= config.small_fish.spawn_offset);
        assert_eq!(child.age, 0);
        assert!(!child.mature);
        assert_eq!(parent.last_breed_tick, Some(100));
        assert!((hunger_before - parent.hunger - config.small_fish.breed_hunger_cost).abs() < 1e-9);

        // the cooldown now blocks a second offspring
        assert!(parent.attempt_reproduction(&ctx, &mut rng).is_none());
    }

    #[test]
    fn feeding_is_capped_and_unlocks_the_fed_bonus() {
        let (config, params, mut rng) = setup();
        let mut fish = Fish::new(FishKind::Small, DVec2::new(100.0, 100.0), 0, &config, &params, &mut rng);
        fish.hunger = config.small_fish.max_hunger - 1.0;
        fish.feed(50, &config.small_fish);
        assert_eq!(fish.hunger, config.small_fish.max_hunger);
        assert!(fish.fed_recently(100, config.small_fish.fed_window));
        assert!(!fish.fed_recently(50 + config.small_fish.fed_window, config.small_fish.fed_window));
    }

    #[test]
    fn integration_respects_the_speed_cap() {
        let (config, params, mut rng) = setup();
        let ctx = TickContext::new(&config, &params, 1, 0.0);
        let mut fish = Fish::new(FishKind::Small, DVec2::new(1399.5, 2.0), 0, &config, &params, &mut rng);
        fish.velocity = DVec2::new(50.0, -50.0);
        let steering = Steering {
            escape: Escape {
                force: DVec2::new(10.0, 0.0),
                dash_seen: true,
            },
            near_danger: true,
            ..Steering::default()
        };
        for _ in 0..20 {
            fish.integrate(&steering, DVec2::new(3.0, 0.0), DVec2::ZERO, &ctx, &mut rng);
            assert!(fish.velocity.length() <= fish.top_speed(&ctx) + 1e-9);
            assert!(fish.position.x >= 0.0 && fish.position.x < config.world.width);
            assert!(fish.position.y >= 0.0 && fish.position.y <= config.world.height);
        }
        assert!(fish.fear > 0.0);
        assert!(fish.experience > 0.0);
    }

    #[test]
    fn sense_flocks_within_species_only() {
        let (config, params, mut rng) = setup();
        let ctx = TickContext::new(&config, &params, 1, 1.0);
        let mut fishes: SlotMap<FishId, Fish> = SlotMap::with_key();
        let mut spawn = |kind, x, y| {
            let mut fish = Fish::new(kind, DVec2::new(x, y), 0, &config, &params, &mut rng);
            fish.velocity = DVec2::ZERO;
            fishes.insert(fish)
        };
        let me = spawn(FishKind::Small, 100.0, 100.0);
        spawn(FishKind::Small, 110.0, 100.0);
        spawn(FishKind::Mid, 100.0, 110.0);

        let mut grid = SpatialGrid::new(config.world.grid_cell_size, config.world.width);
        grid.rebuild(fishes.iter().map(|(id, f)| f.snapshot(id, &params)));

        let steering = fishes[me].sense(me, &ctx, &grid, &[], &[]);
        // the small buddy to the east is inside every radius; the mid fish is ignored
        assert!(steering.cohesion.x > 0.0);
        assert!(steering.separation.x < 0.0);
        assert!(steering.separation.y.abs() < 1e-12);
        assert!(steering.cohesion.y.abs() < 1e-12);
        assert_eq!(steering.alignment, DVec2::ZERO);
        assert_eq!(steering.food, DVec2::ZERO);
        assert!(!steering.near_danger);
    }

    #[test]
    fn mid_fish_prefer_their_food_but_fall_back() {
        let (config, params, mut rng) = setup();
        let ctx = TickContext::new(&config, &params, 1, 1.0);
        let mut fishes: SlotMap<FishId, Fish> = SlotMap::with_key();
        let mut fish = Fish::new(FishKind::Mid, DVec2::new(300.0, 300.0), 0, &config, &params, &mut rng);
        fish.genetics.preferred_food = FoodKind::SmallFishCorpse;
        fish.velocity = DVec2::ZERO;
        let id = fishes.insert(fish);
        let mut grid = SpatialGrid::new(config.world.grid_cell_size, config.world.width);
        grid.rebuild(fishes.iter().map(|(id, f)| f.snapshot(id, &params)));

        let near_plankton = FoodSighting {
            position: DVec2::new(310.0, 300.0),
            kind: FoodKind::Plankton,
        };
        let far_corpse = FoodSighting {
            position: DVec2::new(300.0, 200.0),
            kind: FoodKind::SmallFishCorpse,
        };
        let large = FoodSighting {
            position: DVec2::new(290.0, 300.0),
            kind: FoodKind::LargeCorpse,
        };

        let both = fishes[id].sense(id, &ctx, &grid, &[], &[near_plankton, far_corpse, large]);
        assert!(both.food.y < 0.0, "preferred corpse wins: {:?}", both.food);

        let fallback = fishes[id].sense(id, &ctx, &grid, &[], &[near_plankton, large]);
        assert!(fallback.food.x > 0.0, "large corpses are not mid-fish food");
    }

    #[test]
    fn nearby_predator_triggers_flight() {
        let (config, params, mut rng) = setup();
        let ctx = TickContext::new(&config, &params, 1, 1.0);
        let mut fishes: SlotMap<FishId, Fish> = SlotMap::with_key();
        let id = fishes.insert(Fish::new(FishKind::Small, DVec2::new(500.0, 500.0), 0, &config, &params, &mut rng));
        let mut grid = SpatialGrid::new(config.world.grid_cell_size, config.world.width);
        grid.rebuild(fishes.iter().map(|(id, f)| f.snapshot(id, &params)));

        let predator = PredatorSighting {
            position: DVec2::new(510.0, 500.0),
            dashing: true,
        };
        let steering = fishes[id].sense(id, &ctx, &grid, &[predator], &[]);
        assert!(steering.near_danger);
        assert!(steering.escape.dash_seen);
        assert!(steering.escape.force.x < 0.0);
    }
}
