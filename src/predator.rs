use std::collections::VecDeque;
use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;
use serde::Serialize;
use slotmap::new_key_type;

use crate::config::{PredatorConfig, SimConfig};
use crate::context::TickContext;
use crate::fish::{FishId, FishKind, FishSnapshot};
use crate::params::{SimParameters, Tunable};
use crate::spatial::SpatialGrid;
use crate::steering::Motion;
use crate::vector::{limit, wrap_x, wrapped_delta, wrapped_distance};

new_key_type! {
    pub struct PredatorId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrowthStage {
    Juvenile,
    Adult,
    Senior,
}

impl GrowthStage {
    pub fn for_age(age: u64, config: &PredatorConfig) -> Self {
        if age < config.juvenile_until {
            GrowthStage::Juvenile
        } else if age < config.adult_until {
            GrowthStage::Adult
        } else {
            GrowthStage::Senior
        }
    }

    pub fn size_multiplier(self) -> f64 {
        match self {
            GrowthStage::Juvenile => 0.7,
            GrowthStage::Adult => 1.0,
            GrowthStage::Senior => 1.2,
        }
    }

    pub fn speed_multiplier(self) -> f64 {
        match self {
            GrowthStage::Juvenile => 1.2,
            GrowthStage::Adult => 1.0,
            GrowthStage::Senior => 0.8,
        }
    }
}

/// What a fish needs to know about a predator to run from it.
#[derive(Debug, Clone, Copy)]
pub struct PredatorSighting {
    pub position: DVec2,
    pub dashing: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dash {
    pub active: bool,
    pub timer: u32,
    pub cooldown: u32,
    pub direction: DVec2,
}

impl Dash {
    /// Count the burst and the cooldown down by one tick.
    pub fn tick(&mut self) {
        if self.active {
            self.timer = self.timer.saturating_sub(1);
            if self.timer == 0 {
                self.active = false;
            }
        }
        self.cooldown = self.cooldown.saturating_sub(1);
    }
}

/// Chosen prey for this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuntChoice {
    pub id: FishId,
    /// Position of the prey in the grid snapshot.
    pub index: usize,
    pub score: f64,
    pub distance: f64,
}

#[derive(Debug, Clone)]
pub struct Predator {
    pub serial: u64,
    pub position: DVec2,
    pub velocity: DVec2,
    pub acceleration: DVec2,
    pub age: u64,
    pub max_age: u64,
    pub hunger: f64,
    pub alive: bool,
    pub stage: GrowthStage,
    pub dash: Dash,
    /// Only a handle; check it against the fish table before use.
    pub hunt_target: Option<FishId>,
    /// Ticks of recent kills, oldest first.
    pub feed_history: VecDeque<u64>,
    pub last_feed_tick: Option<u64>,
    pub last_mating_tick: Option<u64>,
}

impl Predator {
    pub fn new(position: DVec2, config: &SimConfig, params: &SimParameters, rng: &mut impl Rng) -> Self {
        let cfg = &config.predator;
        let low = cfg.max_age.saturating_sub(cfg.max_age_variation);
        let high = cfg.max_age + cfg.max_age_variation;
        let stage = GrowthStage::for_age(0, cfg);
        let speed = params.get(Tunable::PredatorSpeed) * stage.speed_multiplier();

        Predator {
            serial: 0,
            position,
            velocity: DVec2::from_angle(rng.random_range(0.0..TAU)) * speed,
            acceleration: DVec2::ZERO,
            age: 0,
            max_age: rng.random_range(low..=high),
            hunger: params.get(Tunable::PredatorMaxHunger),
            alive: true,
            stage,
            dash: Dash::default(),
            hunt_target: None,
            feed_history: VecDeque::with_capacity(cfg.feed_history_len),
            last_feed_tick: None,
            last_mating_tick: None,
        }
    }

    pub fn size(&self, params: &SimParameters) -> f64 {
        params.get(Tunable::PredatorSize) * self.stage.size_multiplier()
    }

    pub fn max_speed(&self, params: &SimParameters) -> f64 {
        params.get(Tunable::PredatorSpeed) * self.stage.speed_multiplier()
    }

    pub fn max_hunger(params: &SimParameters) -> f64 {
        params.get(Tunable::PredatorMaxHunger)
    }

    pub fn hunger_ratio(&self, params: &SimParameters) -> f64 {
        self.hunger / Self::max_hunger(params)
    }

    pub fn sighting(&self) -> PredatorSighting {
        PredatorSighting {
            position: self.position,
            dashing: self.dash.active,
        }
    }

    /// Age, starve, grow and count down dash timers.
    /// Returns `true` if the predator died this tick.
    pub fn live_one_tick(&mut self, ctx: &TickContext) -> bool {
        if !self.alive {
            return false;
        }
        self.age += 1;
        self.hunger -= ctx.params.get(Tunable::PredatorHungerDecay);
        if self.check_vitals() {
            return true;
        }
        self.stage = GrowthStage::for_age(self.age, &ctx.config.predator);
        self.dash.tick();
        false
    }

    pub fn check_vitals(&mut self) -> bool {
        if self.alive && (self.hunger <= 0.0 || self.age > self.max_age) {
            self.alive = false;
            self.dash = Dash::default();
            self.hunt_target = None;
            return true;
        }
        false
    }

    /// Predators stop eating once they are nearly full.
    pub fn can_eat(&self, ctx: &TickContext) -> bool {
        self.alive && self.hunger < Self::max_hunger(ctx.params) * ctx.config.predator.satiation_ratio
    }

    /// Whether prey of `prey_size` at `prey_position` is within reach.
    pub fn in_contact(&self, prey_position: DVec2, prey_size: f64, ctx: &TickContext) -> bool {
        wrapped_distance(self.position, prey_position, ctx.width()) < self.size(ctx.params) + prey_size
    }

    pub fn feed_on(&mut self, prey: FishKind, ctx: &TickContext) {
        let restore = ctx.params.get(Tunable::PredatorFeedRestore) * prey.prey_value();
        self.hunger = (self.hunger + restore).min(Self::max_hunger(ctx.params));
        self.last_feed_tick = Some(ctx.tick);
        self.feed_history.push_back(ctx.tick);
        while self.feed_history.len() > ctx.config.predator.feed_history_len {
            self.feed_history.pop_front();
        }
    }

    pub fn recent_kills(&self, tick: u64, window: u64) -> usize {
        self.feed_history
            .iter()
            .filter(|&&t| tick.saturating_sub(t) < window)
            .count()
    }

    /// Pick the best prey in range: proximity, slowness and species
    /// preference blended by the configured weights. Ties go to the
    /// earlier-born fish. Snapshots for which `is_live` says no are skipped.
    pub fn choose_target<F>(&self, ctx: &TickContext, grid: &SpatialGrid<FishSnapshot>, is_live: F) -> Option<HuntChoice>
    where
        F: Fn(FishId) -> bool,
    {
        let cfg = &ctx.config.predator;
        let ratio = self.hunger_ratio(ctx.params);
        let range = cfg.hunter_range_max * (1.0 - ratio).clamp(0.0, 1.0);
        if range <= 0.0 {
            return None;
        }

        let mut best: Option<(HuntChoice, u64)> = None;
        grid.for_each_within(self.position, range, None, |index, prey, delta| {
            if !is_live(prey.id) {
                return;
            }
            let distance = delta.length();
            let proximity = (range - distance) / range * 100.0;
            let slowness = (100.0 / prey.max_speed.max(0.5)).min(200.0);
            let preference = match prey.kind {
                FishKind::Small => ctx.params.get(Tunable::PredatorHuntFishWeight),
                FishKind::Mid => ctx.params.get(Tunable::PredatorHuntMidFishWeight),
            };
            let score = proximity * cfg.distance_weight
                + slowness * cfg.speed_weight
                + preference * cfg.type_weight;

            let better = match &best {
                None => true,
                Some((current, serial)) => {
                    score > current.score || (score == current.score && prey.serial < *serial)
                }
            };
            if better {
                best = Some((
                    HuntChoice {
                        id: prey.id,
                        index,
                        score,
                        distance,
                    },
                    prey.serial,
                ));
            }
        });
        best.map(|(choice, _)| choice)
    }

    pub fn should_dash(&self, distance: f64, ctx: &TickContext, rng: &mut impl Rng) -> bool {
        let cfg = &ctx.config.predator;
        if self.dash.active || self.dash.cooldown > 0 {
            return false;
        }
        if distance <= cfg.dash_min_distance || distance >= cfg.dash_max_distance {
            return false;
        }
        let ratio = self.hunger_ratio(ctx.params);
        if ratio >= cfg.satiation_ratio {
            return false;
        }
        let kills = self.recent_kills(ctx.tick, cfg.recent_kill_window) as f64;
        let chance = 0.01 + (1.0 - ratio) * 0.05 - (kills * 0.3).min(0.8);
        chance > 0.0 && rng.random::<f64>() < chance
    }

    /// Lock a burst toward where the prey will be.
    pub fn start_dash(&mut self, prey: &FishSnapshot, ctx: &TickContext) {
        let cfg = &ctx.config.predator;
        let aim = wrapped_delta(self.position, prey.position, ctx.width()) + prey.velocity * cfg.dash_lookahead;
        let direction = if aim.length_squared() > 0.0 {
            aim.normalize()
        } else {
            self.velocity.try_normalize().unwrap_or(DVec2::X)
        };

        let kills = self.feed_history.len() as f64;
        let stretch = 1.0 + (kills * 0.5).min(3.0);
        let cooldown = (f64::from(cfg.dash_cooldown_base) * stretch).round() as u32;

        self.dash = Dash {
            active: true,
            timer: cfg.dash_duration,
            cooldown: cooldown.min(cfg.dash_cooldown_max),
            direction,
        };
        self.hunger -= cfg.dash_hunger_cost;
        self.check_vitals();
    }

    /// Steering toward the prey's predicted position.
    pub fn pursue(&self, prey: &FishSnapshot, ctx: &TickContext) -> DVec2 {
        let predicted = wrapped_delta(self.position, prey.position, ctx.width())
            + prey.velocity * ctx.config.predator.pursuit_lookahead;
        let motion = Motion {
            velocity: self.velocity,
            max_speed: self.max_speed(ctx.params),
            max_force: ctx.params.get(Tunable::PredatorMaxForce),
        };
        motion.steer(predicted)
    }

    /// Slow aimless swimming with an occasional change of heading.
    pub fn cruise(&mut self, ctx: &TickContext, rng: &mut impl Rng) {
        self.hunt_target = None;
        let cfg = &ctx.config.predator;
        if rng.random_bool(cfg.cruise_turn_chance.clamp(0.0, 1.0)) {
            let speed = self.max_speed(ctx.params) * cfg.cruise_speed_ratio;
            self.velocity = DVec2::from_angle(rng.random_range(0.0..TAU)) * speed;
        }
    }

    /// Decide this tick's behaviour and return the steering force.
    ///
    /// Full predators cruise. Otherwise the best prey becomes the hunt
    /// target; a dash may start, else the predator pursues. `is_live`
    /// filters out prey that died since the grid was built.
    pub fn hunt<F>(
        &mut self,
        ctx: &TickContext,
        grid: &SpatialGrid<FishSnapshot>,
        is_live: F,
        rng: &mut impl Rng,
    ) -> DVec2
    where
        F: Fn(FishId) -> bool,
    {
        if !self.alive || self.dash.active {
            return DVec2::ZERO;
        }
        if self.hunger_ratio(ctx.params) >= ctx.config.predator.satiation_ratio {
            self.cruise(ctx, rng);
            return DVec2::ZERO;
        }

        let Some(choice) = self.choose_target(ctx, grid, is_live) else {
            self.cruise(ctx, rng);
            return DVec2::ZERO;
        };
        let Some(prey) = grid.entry(choice.index).copied() else {
            self.cruise(ctx, rng);
            return DVec2::ZERO;
        };
        self.hunt_target = Some(choice.id);

        if self.should_dash(choice.distance, ctx, rng) {
            self.start_dash(&prey, ctx);
            return DVec2::ZERO;
        }
        self.pursue(&prey, ctx)
    }

    /// Move one tick. Dashing overrides steering entirely.
    pub fn integrate(&mut self, steer: DVec2, local: DVec2, ctx: &TickContext) {
        if !self.alive {
            return;
        }
        if self.dash.active {
            self.velocity = self.dash.direction * ctx.config.predator.dash_speed;
        } else {
            self.acceleration = steer + local;
            self.velocity = limit(self.velocity + self.acceleration, self.max_speed(ctx.params));
        }
        self.position += self.velocity;
        self.contain(ctx);
    }

    fn contain(&mut self, ctx: &TickContext) {
        let margin = ctx.config.predator.boundary_margin;
        let height = ctx.height();
        self.position.x = wrap_x(self.position.x, ctx.width());
        if self.position.y < margin {
            self.position.y = margin;
            self.velocity.y = self.velocity.y.abs();
        } else if self.position.y > height - margin {
            self.position.y = height - margin;
            self.velocity.y = -self.velocity.y.abs();
        }
    }

    pub fn can_mate(&self, ctx: &TickContext) -> bool {
        let cfg = &ctx.config.predator;
        self.alive
            && self.stage == GrowthStage::Adult
            && self.hunger_ratio(ctx.params) > cfg.mating_hunger_ratio
            && self
                .last_mating_tick
                .is_none_or(|last| ctx.tick.saturating_sub(last) >= cfg.mating_cooldown)
    }

    /// Pay the cost of producing a cub. Returns `true` if that was fatal.
    pub fn after_mating(&mut self, ctx: &TickContext) -> bool {
        self.hunger -= ctx.config.predator.mating_hunger_cost;
        self.last_mating_tick = Some(ctx.tick);
        self.check_vitals()
    }
}
