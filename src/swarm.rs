//! The world: every agent, every food item, the balancer and the tick loop.
//!
//! One call to [`Swarm::advance`] runs a full tick:
//!
//! 1. the balancer observes the populations and may retune [`SimParameters`]
//!    or request respawns for extinct species;
//! 2. the grid is rebuilt over live fish and every fish computes its forces
//!    in parallel against that snapshot;
//! 3. fish move, age, starve and breed serially in slot order;
//! 4. the grid is rebuilt on the new positions and predators feed, hunt,
//!    move and mate;
//! 5. food drifts, gets eaten and is topped up;
//! 6. dead agents and consumed food are swept and the stats refreshed.

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use slotmap::SlotMap;
use tracing::{info, trace};

use crate::balancer::{BalanceStatus, EcosystemBalancer, Observation, Species};
use crate::config::{FoodConfig, SimConfig, WorldConfig};
use crate::context::TickContext;
use crate::environment::{Environment, day_night_factor};
use crate::error::ConfigError;
use crate::fish::{Fish, FishId, FishKind, FishSnapshot, Steering};
use crate::food::{Food, FoodKind, FoodSighting};
use crate::params::{SimParameters, Tunable};
use crate::predator::{Predator, PredatorId, PredatorSighting};
use crate::simulation_stats::SimulationStats;
use crate::spatial::SpatialGrid;
use crate::vector::{wrap_x, wrapped_delta};

/// Half extents of a dropped corpse cluster.
const SMALL_CLUSTER_SPREAD: DVec2 = DVec2::new(20.0, 10.0);
const LARGE_CLUSTER_SPREAD: DVec2 = DVec2::new(50.0, 20.0);

impl From<FishKind> for Species {
    fn from(kind: FishKind) -> Self {
        match kind {
            FishKind::Small => Species::SmallFish,
            FishKind::Mid => Species::MidFish,
        }
    }
}

pub struct Swarm {
    config: SimConfig,
    params: SimParameters,
    balancer: EcosystemBalancer,
    environment: Environment,
    fishes: SlotMap<FishId, Fish>,
    predators: SlotMap<PredatorId, Predator>,
    food: Vec<Food>,
    grid: SpatialGrid<FishSnapshot>,
    stats: SimulationStats,
    tick: u64,
    next_serial: u64,
    rng: StdRng,
}

impl Swarm {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let params = SimParameters::with_overrides(&config.tunables);
        Self::build(config, params, StdRng::from_os_rng())
    }

    /// A swarm driven by a seeded generator.
    pub fn with_rng(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        let params = SimParameters::with_overrides(&config.tunables);
        Self::build(config, params, StdRng::seed_from_u64(seed))
    }

    /// A seeded swarm starting from an explicit parameter table.
    pub fn with_parameters(config: SimConfig, params: SimParameters, seed: u64) -> Result<Self, ConfigError> {
        Self::build(config, params, StdRng::seed_from_u64(seed))
    }

    fn build(config: SimConfig, params: SimParameters, mut rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = &config.world;
        let environment = Environment::new(&config.environment, world.width, world.height, &mut rng);
        let grid = SpatialGrid::new(world.grid_cell_size, world.width);
        let balancer = EcosystemBalancer::new(config.balancer.clone());

        let mut swarm = Swarm {
            config,
            params,
            balancer,
            environment,
            fishes: SlotMap::with_key(),
            predators: SlotMap::with_key(),
            food: Vec::new(),
            grid,
            stats: SimulationStats::new(),
            tick: 0,
            next_serial: 0,
            rng,
        };
        swarm.populate();
        info!(
            width = swarm.config.world.width,
            height = swarm.config.world.height,
            fish = swarm.stats.small_fish,
            mid_fish = swarm.stats.mid_fish,
            predators = swarm.stats.predators,
            "swarm created"
        );
        Ok(swarm)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn params(&self) -> &SimParameters {
        &self.params
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn fishes(&self) -> &SlotMap<FishId, Fish> {
        &self.fishes
    }

    pub fn predators(&self) -> &SlotMap<PredatorId, Predator> {
        &self.predators
    }

    pub fn food(&self) -> &[Food] {
        &self.food
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn balance_status(&self) -> BalanceStatus {
        self.balancer.status(&self.params)
    }

    pub fn balancer_enabled(&self) -> bool {
        self.balancer.is_enabled()
    }

    pub fn set_balancer_enabled(&mut self, enabled: bool) {
        self.balancer.set_enabled(enabled, &mut self.params);
    }

    /// Brightness of the current moment of the day, from the environment clock.
    pub fn day_night(&self) -> f64 {
        day_night_factor(self.environment.time(), self.config.world.day_night_cycle_secs)
    }

    /// Advance one tick using the environment's own current and clock.
    pub fn step(&mut self) {
        let ambient = self.environment.global_current();
        let day_night = self.day_night();
        self.advance(ambient, day_night);
    }

    pub fn advance(&mut self, ambient: DVec2, day_night: f64) {
        self.tick += 1;
        self.environment.advance(1.0 / self.config.world.fps);
        self.balance();

        let ctx = TickContext::new(&self.config, &self.params, self.tick, day_night);
        let width = ctx.width();
        let height = ctx.height();

        // sensing: every fish reads the same snapshot
        self.grid.rebuild(
            self.fishes
                .iter()
                .filter(|(_, f)| f.alive)
                .map(|(id, f)| f.snapshot(id, ctx.params)),
        );
        let predator_sightings: Vec<PredatorSighting> = self
            .predators
            .values()
            .filter(|p| p.alive)
            .map(Predator::sighting)
            .collect();
        let food_sightings: Vec<FoodSighting> = self
            .food
            .iter()
            .filter(|f| !f.consumed)
            .map(Food::sighting)
            .collect();

        let steerings: Vec<(FishId, Steering)> = {
            let grid = &self.grid;
            let fishes: Vec<(FishId, &Fish)> = self.fishes.iter().filter(|(_, f)| f.alive).collect();
            fishes
                .par_iter()
                .map(|(id, fish)| {
                    let steering = fish.sense(*id, &ctx, grid, &predator_sightings, &food_sightings);
                    (*id, steering)
                })
                .collect()
        };

        // fish: move, live, breed
        let mut live = [0usize; 2];
        for fish in self.fishes.values().filter(|f| f.alive) {
            live[fish.kind as usize] += 1;
        }
        let mut newborns = Vec::new();
        for (id, steering) in steerings {
            let Some(fish) = self.fishes.get_mut(id) else {
                continue;
            };
            let local = self.environment.current_at(fish.position) * ctx.config.behavior.local_current_scale
                + self.environment.kelp_force(fish.position, fish.velocity);
            fish.integrate(&steering, ambient, local, &ctx, &mut self.rng);

            let kind = fish.kind;
            let species = kind.species(ctx.config);
            let cap = match kind {
                FishKind::Small => ctx.config.population.max_fish,
                FishKind::Mid => ctx.config.population.max_mid_fish,
            };
            let mut died = fish.live_one_tick(species);
            if !died && live[kind as usize] < cap {
                if let Some(child) = fish.attempt_reproduction(&ctx, &mut self.rng) {
                    newborns.push(child);
                    live[kind as usize] += 1;
                    self.stats.total_births += 1;
                    self.balancer.record_birth(kind.into());
                    // the hunger cost can be fatal
                    died = !fish.alive;
                }
            }
            if died {
                self.food
                    .push(Food::new(fish.position, kind.corpse(), &ctx.config.food, &mut self.rng));
                self.stats.total_deaths += 1;
                self.balancer.record_death(kind.into());
            }
        }
        for child in newborns {
            insert_fish(&mut self.fishes, &mut self.next_serial, child);
        }

        // predators see where the fish ended up
        self.grid.rebuild(
            self.fishes
                .iter()
                .filter(|(_, f)| f.alive)
                .map(|(id, f)| f.snapshot(id, ctx.params)),
        );
        let prey_reach = self.grid.entries().iter().map(|s| s.size).fold(0.0, f64::max);
        let predator_ids: Vec<PredatorId> = self.predators.keys().collect();
        let mut fallen: Vec<DVec2> = Vec::new();
        for predator_id in predator_ids {
            let Some(predator) = self.predators.get_mut(predator_id) else {
                continue;
            };
            if predator.live_one_tick(&ctx) {
                fallen.push(predator.position);
                continue;
            }

            let prey = if predator.can_eat(&ctx) {
                prey_in_contact(predator, &self.grid, &self.fishes, prey_reach, &ctx)
                    .and_then(|id| self.fishes.get_mut(id))
            } else {
                None
            };
            if let Some(prey) = prey {
                prey.alive = false;
                predator.feed_on(prey.kind, &ctx);
                self.stats.total_deaths += 1;
                self.balancer.record_death(prey.kind.into());
            }

            let fishes = &self.fishes;
            let is_live = |id: FishId| fishes.get(id).is_some_and(|f| f.alive);
            let mut steer = predator.hunt(&ctx, &self.grid, is_live, &mut self.rng);
            if !predator.hunt_target.is_none_or(is_live) {
                predator.hunt_target = None;
                steer = DVec2::ZERO;
            }
            // the dash cost can be fatal
            if !predator.alive {
                fallen.push(predator.position);
                continue;
            }
            let local = self.environment.kelp_force(predator.position, predator.velocity)
                * ctx.config.environment.predator_kelp_scale;
            predator.integrate(steer, local, &ctx);
        }

        let (cubs, spent) = mate_predators(&mut self.predators, &ctx, &mut self.rng);
        fallen.extend(spent);
        for cub in cubs {
            insert_predator(&mut self.predators, &mut self.next_serial, cub);
            self.stats.total_births += 1;
            self.balancer.record_birth(Species::Predators);
        }
        for position in fallen {
            self.food
                .push(Food::new(position, FoodKind::LargeCorpse, &ctx.config.food, &mut self.rng));
            self.stats.total_deaths += 1;
            self.balancer.record_death(Species::Predators);
        }

        // food: drift, consumption, top-up
        for item in &mut self.food {
            item.update(ambient, &ctx.config.food, width, height);
        }
        for item in self.food.iter_mut().filter(|f| !f.consumed) {
            let mut eater: Option<(u64, FishId)> = None;
            self.grid
                .for_each_within(item.position, item.size + prey_reach, None, |_, fish, _| {
                    if item.kind.edible_by(fish.kind)
                        && item.touches(fish.position, fish.size, width)
                        && eater.is_none_or(|(serial, _)| fish.serial < serial)
                        && self.fishes.get(fish.id).is_some_and(|f| f.alive)
                    {
                        eater = Some((fish.serial, fish.id));
                    }
                });
            if let Some(fish) = eater.and_then(|(_, id)| self.fishes.get_mut(id)) {
                let species = fish.kind.species(ctx.config);
                fish.feed(ctx.tick, species);
                item.consumed = true;
                self.stats.food_consumed += 1;
            }
        }
        let food_count = food_target(ctx.params);
        replenish_food(&mut self.food, food_count, &ctx.config.food, &ctx.config.world, &mut self.rng);

        self.sweep();
        trace!(
            tick = self.tick,
            fish = self.stats.small_fish,
            mid_fish = self.stats.mid_fish,
            predators = self.stats.predators,
            food = self.stats.food_on_map,
            "tick complete"
        );
    }

    fn observe(&self) -> Observation {
        let mut observation = Observation {
            max_predator_hunger: Predator::max_hunger(&self.params),
            food: self.food.iter().filter(|f| !f.consumed).count(),
            food_target: self.params.get(Tunable::FoodCount),
            ..Observation::default()
        };
        for fish in self.fishes.values().filter(|f| f.alive) {
            match fish.kind {
                FishKind::Small => observation.small_fish += 1,
                FishKind::Mid => observation.mid_fish += 1,
            }
        }
        let hungers: Vec<f64> = self
            .predators
            .values()
            .filter(|p| p.alive)
            .map(|p| p.hunger)
            .collect();
        observation.predators = hungers.len();
        if !hungers.is_empty() {
            observation.avg_predator_hunger = Some(hungers.iter().sum::<f64>() / hungers.len() as f64);
        }
        observation
    }

    fn balance(&mut self) {
        let observation = self.observe();
        let outcome = self.balancer.update(&observation, &mut self.params, &mut self.rng);
        for species in outcome.respawn {
            let position = random_position(&self.config.world, &mut self.rng);
            match species {
                Species::SmallFish => {
                    self.add_fish(FishKind::Small, position);
                }
                Species::MidFish => {
                    self.add_fish(FishKind::Mid, position);
                }
                Species::Predators => {
                    self.add_predator(position);
                }
            }
        }
    }

    fn sweep(&mut self) {
        self.fishes.retain(|_, f| f.alive);
        self.predators.retain(|_, p| p.alive);
        self.food.retain(|f| !f.consumed);
        let predators = self.predators.len();
        self.stats.refresh(self.fishes.values(), predators, &self.food);
    }

    fn add_fish(&mut self, kind: FishKind, position: DVec2) -> FishId {
        let fish = Fish::new(kind, position, 0, &self.config, &self.params, &mut self.rng);
        insert_fish(&mut self.fishes, &mut self.next_serial, fish)
    }

    fn add_predator(&mut self, position: DVec2) -> PredatorId {
        let predator = Predator::new(position, &self.config, &self.params, &mut self.rng);
        insert_predator(&mut self.predators, &mut self.next_serial, predator)
    }

    fn in_bounds(&self, x: f64, y: f64) -> bool {
        let world = &self.config.world;
        x.is_finite() && y.is_finite() && (0.0..world.width).contains(&x) && (0.0..=world.height).contains(&y)
    }

    /// Drop a plankton item at `(x, y)`. Refused off-map or once the map
    /// holds `user_spawn_factor` times the food-count tunable.
    pub fn spawn_food_at(&mut self, x: f64, y: f64) -> bool {
        let cap = food_target(&self.params) as f64 * self.config.food.user_spawn_factor;
        if !self.in_bounds(x, y) || self.food.len() as f64 >= cap {
            return false;
        }
        let item = Food::new(DVec2::new(x, y), FoodKind::Plankton, &self.config.food, &mut self.rng);
        self.food.push(item);
        self.stats.food_on_map = self.food.len();
        true
    }

    /// Add a predator at `(x, y)`, up to twice the initial predator count.
    pub fn spawn_predator_at(&mut self, x: f64, y: f64) -> bool {
        let cap = self.config.population.predators * 2;
        let live = self.predators.values().filter(|p| p.alive).count();
        if !self.in_bounds(x, y) || live >= cap {
            return false;
        }
        self.add_predator(DVec2::new(x, y));
        self.stats.predators = live + 1;
        true
    }

    /// Add a fish at `(x, y)`, respecting the species population cap.
    pub fn spawn_fish_at(&mut self, kind: FishKind, x: f64, y: f64) -> bool {
        let cap = match kind {
            FishKind::Small => self.config.population.max_fish,
            FishKind::Mid => self.config.population.max_mid_fish,
        };
        let live = self.fishes.values().filter(|f| f.alive && f.kind == kind).count();
        if !self.in_bounds(x, y) || live >= cap {
            return false;
        }
        self.add_fish(kind, DVec2::new(x, y));
        match kind {
            FishKind::Small => self.stats.small_fish = live + 1,
            FishKind::Mid => self.stats.mid_fish = live + 1,
        }
        true
    }

    /// Start over with fresh populations, food, environment and balancer state.
    pub fn reset(&mut self) {
        self.balancer.reset(&mut self.params);
        let world = &self.config.world;
        self.environment = Environment::new(&self.config.environment, world.width, world.height, &mut self.rng);
        self.tick = 0;
        self.stats = SimulationStats::new();
        self.populate();
        info!("swarm reset");
    }

    /// Resize the map and rebuild every population inside the new bounds.
    /// On error the swarm is left untouched.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.world.width = width;
        config.world.height = height;
        config.validate()?;
        self.config = config;
        let world = &self.config.world;
        self.grid = SpatialGrid::new(world.grid_cell_size, world.width);
        self.environment = Environment::new(&self.config.environment, world.width, world.height, &mut self.rng);
        self.populate();
        info!(width, height, "swarm resized");
        Ok(())
    }

    fn populate(&mut self) {
        self.fishes.clear();
        self.predators.clear();
        self.food.clear();

        let population = self.config.population.clone();
        for (kind, count) in [(FishKind::Small, population.fish), (FishKind::Mid, population.mid_fish)] {
            for _ in 0..count {
                let position = school_position(&self.config.world, population.spawn_spread, &mut self.rng);
                self.add_fish(kind, position);
            }
        }
        for _ in 0..population.predators {
            let position = random_position(&self.config.world, &mut self.rng);
            self.add_predator(position);
        }
        seed_food(
            &mut self.food,
            food_target(&self.params),
            &self.config.food,
            &self.config.world,
            &mut self.rng,
        );
        let predators = self.predators.len();
        self.stats.refresh(self.fishes.values(), predators, &self.food);
    }
}

fn insert_fish(fishes: &mut SlotMap<FishId, Fish>, next_serial: &mut u64, mut fish: Fish) -> FishId {
    fish.serial = *next_serial;
    *next_serial += 1;
    fishes.insert(fish)
}

fn insert_predator(
    predators: &mut SlotMap<PredatorId, Predator>,
    next_serial: &mut u64,
    mut predator: Predator,
) -> PredatorId {
    predator.serial = *next_serial;
    *next_serial += 1;
    predators.insert(predator)
}

fn food_target(params: &SimParameters) -> usize {
    params.get(Tunable::FoodCount).round().max(0.0) as usize
}

/// The earliest-born live fish touching the predator, if any.
fn prey_in_contact(
    predator: &Predator,
    grid: &SpatialGrid<FishSnapshot>,
    fishes: &SlotMap<FishId, Fish>,
    prey_reach: f64,
    ctx: &TickContext,
) -> Option<FishId> {
    let reach = predator.size(ctx.params) + prey_reach;
    let mut best: Option<(u64, FishId)> = None;
    grid.for_each_within(predator.position, reach, None, |_, prey, _| {
        if predator.in_contact(prey.position, prey.size, ctx)
            && best.is_none_or(|(serial, _)| prey.serial < serial)
            && fishes.get(prey.id).is_some_and(|f| f.alive)
        {
            best = Some((prey.serial, prey.id));
        }
    });
    best.map(|(_, id)| id)
}

/// Pair up ready adults within mating distance, in slot order. Each pair
/// produces one cub at its midpoint while the population cap allows.
/// Returns the cubs and where any parent died of the mating cost.
fn mate_predators(
    predators: &mut SlotMap<PredatorId, Predator>,
    ctx: &TickContext,
    rng: &mut impl Rng,
) -> (Vec<Predator>, Vec<DVec2>) {
    let cfg = &ctx.config.predator;
    let ready: Vec<PredatorId> = predators
        .iter()
        .filter(|(_, p)| p.can_mate(ctx))
        .map(|(id, _)| id)
        .collect();
    let mut live = predators.values().filter(|p| p.alive).count();
    let mut paired = vec![false; ready.len()];
    let mut cubs = Vec::new();
    let mut spent = Vec::new();

    for i in 0..ready.len() {
        if paired[i] {
            continue;
        }
        for j in i + 1..ready.len() {
            if paired[j] || live >= ctx.config.population.max_predators {
                continue;
            }
            let (a, b) = (&predators[ready[i]], &predators[ready[j]]);
            let delta = wrapped_delta(a.position, b.position, ctx.width());
            if delta.length() >= cfg.mating_distance {
                continue;
            }
            let mut midpoint = a.position + delta * 0.5;
            midpoint.x = wrap_x(midpoint.x, ctx.width());
            cubs.push(Predator::new(midpoint, ctx.config, ctx.params, rng));
            live += 1;
            paired[i] = true;
            paired[j] = true;
            for id in [ready[i], ready[j]] {
                let parent = &mut predators[id];
                if parent.after_mating(ctx) {
                    spent.push(parent.position);
                }
            }
            break;
        }
    }
    (cubs, spent)
}

fn uniform(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    if high > low {
        rng.random_range(low..high)
    } else {
        (low + high) * 0.5
    }
}

fn random_position(world: &WorldConfig, rng: &mut impl Rng) -> DVec2 {
    let margin = world.boundary_margin;
    DVec2::new(
        uniform(rng, margin, world.width - margin),
        uniform(rng, margin, world.height - margin),
    )
}

/// A start position near the map centre, kept out of the boundary band.
fn school_position(world: &WorldConfig, spread: f64, rng: &mut impl Rng) -> DVec2 {
    let spread = spread.abs();
    let margin = world.boundary_margin;
    let x = world.width * 0.5 + uniform(rng, -spread, spread);
    let y = world.height * 0.5 + uniform(rng, -spread, spread);
    DVec2::new(
        x.clamp(margin.min(world.width * 0.5), (world.width - margin).max(world.width * 0.5)),
        y.clamp(margin, world.height - margin),
    )
}

fn drop_cluster(
    food: &mut Vec<Food>,
    kind: FoodKind,
    count: usize,
    spread: DVec2,
    config: &FoodConfig,
    world: &WorldConfig,
    rng: &mut impl Rng,
) {
    let margin = world.boundary_margin;
    let centre = DVec2::new(
        uniform(rng, margin * 2.0, world.width - margin * 2.0),
        uniform(rng, margin, world.height - margin),
    );
    for _ in 0..count {
        let mut position = centre
            + DVec2::new(
                uniform(rng, -spread.x, spread.x),
                uniform(rng, -spread.y, spread.y),
            );
        position.x = wrap_x(position.x, world.width);
        food.push(Food::new(position, kind, config, rng));
    }
}

fn seed_food(food: &mut Vec<Food>, count: usize, config: &FoodConfig, world: &WorldConfig, rng: &mut impl Rng) {
    let plankton = (count as f64 * config.plankton_share) as usize;
    for _ in 0..plankton {
        let position = random_position(world, rng);
        food.push(Food::new(position, FoodKind::Plankton, config, rng));
    }
    let corpses = (count as f64 * config.corpse_share) as usize;
    let cluster = config.small_cluster.max(1);
    for _ in 0..corpses / cluster {
        drop_cluster(food, FoodKind::SmallFishCorpse, cluster, SMALL_CLUSTER_SPREAD, config, world, rng);
    }
    if rng.random_bool(config.initial_large_cluster_chance.clamp(0.0, 1.0)) {
        drop_cluster(food, FoodKind::LargeCorpse, config.large_cluster, LARGE_CLUSTER_SPREAD, config, world, rng);
    }
}

/// Keep plankton at its share of the food count and occasionally drop a
/// corpse cluster.
fn replenish_food(food: &mut Vec<Food>, count: usize, config: &FoodConfig, world: &WorldConfig, rng: &mut impl Rng) {
    let wanted = (count as f64 * config.plankton_share) as usize;
    let plankton = food
        .iter()
        .filter(|f| !f.consumed && f.kind == FoodKind::Plankton)
        .count();
    for _ in plankton..wanted {
        let position = random_position(world, rng);
        food.push(Food::new(position, FoodKind::Plankton, config, rng));
    }
    if rng.random_bool(config.small_cluster_chance.clamp(0.0, 1.0)) {
        drop_cluster(food, FoodKind::SmallFishCorpse, config.small_cluster, SMALL_CLUSTER_SPREAD, config, world, rng);
    }
    if rng.random_bool(config.large_cluster_chance.clamp(0.0, 1.0)) {
        drop_cluster(food, FoodKind::LargeCorpse, config.large_cluster, LARGE_CLUSTER_SPREAD, config, world, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predator::GrowthStage;

    fn quiet_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.population.fish = 20;
        config.population.mid_fish = 10;
        config.population.predators = 2;
        config
    }

    #[test]
    fn rejects_invalid_config() {
        let mut config = SimConfig::default();
        config.world.width = -1.0;
        assert!(Swarm::with_rng(config, 1).is_err());
    }

    #[test]
    fn initial_population_and_food() {
        let swarm = Swarm::with_rng(quiet_config(), 2).expect("valid config");
        assert_eq!(swarm.stats().small_fish, 20);
        assert_eq!(swarm.stats().mid_fish, 10);
        assert_eq!(swarm.stats().predators, 2);
        let plankton = swarm.food().iter().filter(|f| f.kind == FoodKind::Plankton).count();
        assert_eq!(plankton, 60);
        // serials are unique and increasing in insertion order
        let mut serials: Vec<u64> = swarm.fishes().values().map(|f| f.serial).collect();
        serials.sort_unstable();
        serials.dedup();
        assert_eq!(serials.len(), 30);
    }

    #[test]
    fn plankton_is_topped_up() {
        let mut swarm = Swarm::with_rng(quiet_config(), 3).expect("valid config");
        swarm.food.retain(|f| f.kind != FoodKind::Plankton);
        swarm.advance(DVec2::ZERO, 1.0);
        let plankton = swarm.food().iter().filter(|f| f.kind == FoodKind::Plankton).count();
        assert!(plankton >= 60);
    }

    #[test]
    fn spawn_outside_the_map_is_refused() {
        let mut swarm = Swarm::with_rng(quiet_config(), 4).expect("valid config");
        assert!(!swarm.spawn_food_at(-5.0, 10.0));
        assert!(!swarm.spawn_predator_at(10.0, 5000.0));
        assert!(!swarm.spawn_fish_at(FishKind::Small, f64::NAN, 10.0));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut swarm = Swarm::with_rng(quiet_config(), 5).expect("valid config");
        for _ in 0..30 {
            swarm.step();
        }
        swarm.reset();
        assert_eq!(swarm.tick(), 0);
        assert_eq!(swarm.stats().food_consumed, 0);
        assert_eq!(swarm.stats().small_fish, 20);
        assert!(swarm.params().is_at_base());
    }

    fn empty_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.population.fish = 0;
        config.population.mid_fish = 0;
        config.population.predators = 0;
        config.balancer.enabled = false;
        config.food.corpse_share = 0.0;
        config.food.small_cluster_chance = 0.0;
        config.food.large_cluster_chance = 0.0;
        config.food.initial_large_cluster_chance = 0.0;
        config
    }

    fn large_corpses(swarm: &Swarm) -> usize {
        swarm.food.iter().filter(|f| f.kind == FoodKind::LargeCorpse).count()
    }

    #[test]
    fn starving_from_a_dash_is_a_counted_death() {
        // the dash is a random draw, so look for a seed where it fires
        let mut dashed = false;
        for seed in 0..300 {
            let mut swarm = Swarm::with_rng(empty_config(), seed).expect("valid config");
            let hunter = swarm.add_predator(DVec2::new(500.0, 500.0));
            swarm.predators[hunter].hunger = 45.0;
            assert!(swarm.spawn_fish_at(FishKind::Small, 580.0, 500.0));

            swarm.advance(DVec2::ZERO, 1.0);

            if swarm.predators.contains_key(hunter) {
                let predator = &swarm.predators[hunter];
                assert!(!predator.dash.active);
                assert!((predator.hunger - 25.0).abs() < 1e-9);
                assert_eq!(swarm.stats().total_deaths, 0);
                continue;
            }
            dashed = true;
            assert_eq!(swarm.stats().predators, 0);
            assert_eq!(swarm.stats().total_deaths, 1);
            assert_eq!(large_corpses(&swarm), 1);
            break;
        }
        assert!(dashed, "no seed produced a dash");
    }

    #[test]
    fn prey_eaten_this_tick_is_not_hunted() {
        let mut swarm = Swarm::with_rng(empty_config(), 1).expect("valid config");
        let eater = swarm.add_predator(DVec2::new(500.0, 500.0));
        let hunter = swarm.add_predator(DVec2::new(580.0, 500.0));
        for id in [eater, hunter] {
            swarm.predators[id].hunger = 10_000.0;
        }
        assert!(swarm.spawn_fish_at(FishKind::Small, 500.0, 500.0));

        swarm.advance(DVec2::ZERO, 1.0);

        assert_eq!(swarm.stats().small_fish, 0);
        assert_eq!(swarm.predators[eater].feed_history.len(), 1);
        let predator = &swarm.predators[hunter];
        assert!(!predator.dash.active);
        assert!(predator.hunt_target.is_none());
        assert!((predator.hunger - (10_000.0 - 20.0)).abs() < 1e-9);
    }

    #[test]
    fn adult_pair_has_one_cub_at_the_wrapped_midpoint() {
        let config = empty_config();
        let width = config.world.width;
        let adult_age = config.predator.juvenile_until;
        let cost = config.predator.mating_hunger_cost;
        let mut swarm = Swarm::with_rng(config, 2).expect("valid config");
        let a = swarm.add_predator(DVec2::new(10.0, 500.0));
        let b = swarm.add_predator(DVec2::new(width - 30.0, 500.0));
        for id in [a, b] {
            swarm.predators[id].age = adult_age;
        }
        // juveniles close together never mate
        swarm.add_predator(DVec2::new(400.0, 300.0));
        swarm.add_predator(DVec2::new(420.0, 300.0));

        swarm.advance(DVec2::ZERO, 1.0);

        assert_eq!(swarm.predators.len(), 5);
        assert_eq!(swarm.stats().total_births, 1);
        let (pa, pb) = (&swarm.predators[a], &swarm.predators[b]);
        let full = Predator::max_hunger(&swarm.params);
        for parent in [pa, pb] {
            assert_eq!(parent.last_mating_tick, Some(1));
            assert!((parent.hunger - (full - 20.0 - cost)).abs() < 1e-9);
        }
        let delta = wrapped_delta(pa.position, pb.position, width);
        let midpoint = DVec2::new(wrap_x(pa.position.x + delta.x * 0.5, width), pa.position.y + delta.y * 0.5);
        let cubs: Vec<&Predator> = swarm.predators.values().filter(|p| p.age == 0).collect();
        assert_eq!(cubs.len(), 1);
        assert!((cubs[0].position - midpoint).length() < 1e-9);
        assert!(
            swarm
                .predators
                .values()
                .filter(|p| p.stage == GrowthStage::Juvenile && p.age == 1)
                .all(|p| p.last_mating_tick.is_none())
        );
    }

    #[test]
    fn predator_cap_blocks_mating() {
        let mut config = empty_config();
        config.population.max_predators = 2;
        let adult_age = config.predator.juvenile_until;
        let mut swarm = Swarm::with_rng(config, 3).expect("valid config");
        for x in [400.0, 440.0] {
            let id = swarm.add_predator(DVec2::new(x, 500.0));
            swarm.predators[id].age = adult_age;
        }

        swarm.advance(DVec2::ZERO, 1.0);

        assert_eq!(swarm.predators.len(), 2);
        assert_eq!(swarm.stats().total_births, 0);
        assert!(swarm.predators.values().all(|p| p.last_mating_tick.is_none()));
    }

    #[test]
    fn fatal_mating_cost_is_a_counted_death() {
        let mut config = empty_config();
        config.predator.mating_hunger_cost = 25_000.0;
        let adult_age = config.predator.juvenile_until;
        let mut swarm = Swarm::with_rng(config, 4).expect("valid config");
        let sturdy = swarm.add_predator(DVec2::new(400.0, 500.0));
        let frail = swarm.add_predator(DVec2::new(440.0, 500.0));
        for id in [sturdy, frail] {
            swarm.predators[id].age = adult_age;
        }
        // still keen enough to mate, but cannot afford the cost
        swarm.predators[frail].hunger = 20_000.0;

        swarm.advance(DVec2::ZERO, 1.0);

        assert!(!swarm.predators.contains_key(frail));
        assert!((swarm.predators[sturdy].hunger - (30_000.0 - 20.0 - 25_000.0)).abs() < 1e-9);
        assert_eq!(swarm.stats().predators, 2);
        assert_eq!(swarm.stats().total_births, 1);
        assert_eq!(swarm.stats().total_deaths, 1);
        assert_eq!(large_corpses(&swarm), 1);
    }
}
