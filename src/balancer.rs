//! Closed-loop controller that keeps each species near its target population.
//!
//! Two cadences run off the tick counter. The minor pass randomly nudges
//! tunables with a probability and amplitude that grow as ecosystem health
//! falls. The major pass runs one PID loop per species on the normalised
//! population error and then fires the targeted strategies whose trigger
//! conditions hold. Every write goes through [`SimParameters`], which clamps
//! into the declared range.

use std::collections::VecDeque;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BalancerConfig;
use crate::params::{ParameterReading, SimParameters, Tunable};
use crate::pid::PidController;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Species {
    SmallFish,
    MidFish,
    Predators,
}

impl Species {
    pub const ALL: [Species; 3] = [Species::SmallFish, Species::MidFish, Species::Predators];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Species::SmallFish => "small_fish",
            Species::MidFish => "mid_fish",
            Species::Predators => "predators",
        }
    }
}

/// Fixed-capacity FIFO of samples. A full buffer drops its oldest entry.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        HistoryBuffer {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Population standard deviation of the newest `window` samples.
    pub fn recent_std(&self, window: usize) -> f64 {
        let take = window.min(self.samples.len());
        if take == 0 {
            return 0.0;
        }
        let recent = self.samples.iter().rev().take(take);
        let mean = recent.clone().sum::<f64>() / take as f64;
        let variance = recent.map(|s| (s - mean).powi(2)).sum::<f64>() / take as f64;
        variance.sqrt()
    }
}

/// What the balancer sees of the world on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Observation {
    pub small_fish: usize,
    pub mid_fish: usize,
    pub predators: usize,
    /// `None` when no predator is alive.
    pub avg_predator_hunger: Option<f64>,
    pub max_predator_hunger: f64,
    pub food: usize,
    pub food_target: f64,
}

impl Observation {
    pub fn count(&self, species: Species) -> usize {
        match species {
            Species::SmallFish => self.small_fish,
            Species::MidFish => self.mid_fish,
            Species::Predators => self.predators,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Scores {
    pub small_fish: f64,
    pub mid_fish: f64,
    pub predators: f64,
    pub predator_hunger: f64,
    pub food: f64,
    pub overall: f64,
}

impl Scores {
    pub fn species(&self, species: Species) -> f64 {
        match species {
            Species::SmallFish => self.small_fish,
            Species::MidFish => self.mid_fish,
            Species::Predators => self.predators,
        }
    }
}

/// Everything the display needs to show the balancer's state.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceStatus {
    pub enabled: bool,
    pub health: f64,
    pub scores: Scores,
    pub populations: [usize; 3],
    pub targets: [usize; 3],
    pub aggression: f64,
    pub minor_passes: u64,
    pub major_passes: u64,
    pub last_strategies: Vec<&'static str>,
    pub parameters: Vec<ParameterReading>,
}

/// Result of one balancer tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceOutcome {
    pub health: f64,
    /// Species that went extinct and need one replacement each.
    pub respawn: Vec<Species>,
}

#[derive(Debug, Clone)]
pub struct EcosystemBalancer {
    config: BalancerConfig,
    enabled: bool,
    pids: [PidController; 3],
    populations: [HistoryBuffer; 3],
    births: [HistoryBuffer; 3],
    deaths: [HistoryBuffer; 3],
    predator_hunger: HistoryBuffer,
    pending_births: [u32; 3],
    pending_deaths: [u32; 3],
    latest: Observation,
    scores: Scores,
    aggression: f64,
    ticks: u64,
    minor_passes: u64,
    major_passes: u64,
    last_strategies: Vec<&'static str>,
}

impl EcosystemBalancer {
    pub fn new(config: BalancerConfig) -> Self {
        let pid = |gains| PidController::new(gains, config.pid_output_limit, config.pid_integral_limit);
        let history = || HistoryBuffer::new(config.history_len);
        EcosystemBalancer {
            enabled: config.enabled,
            pids: [
                pid(config.small_fish_gains),
                pid(config.mid_fish_gains),
                pid(config.predator_gains),
            ],
            populations: [history(), history(), history()],
            births: [history(), history(), history()],
            deaths: [history(), history(), history()],
            predator_hunger: history(),
            pending_births: [0; 3],
            pending_deaths: [0; 3],
            latest: Observation::default(),
            scores: Scores::default(),
            aggression: 1.0,
            ticks: 0,
            minor_passes: 0,
            major_passes: 0,
            last_strategies: Vec::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turning the balancer off hands control back to the base values.
    pub fn set_enabled(&mut self, enabled: bool, params: &mut SimParameters) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            params.reset_to_base();
            for pid in &mut self.pids {
                pid.reset();
            }
        }
        info!(enabled, "ecosystem balancer toggled");
    }

    pub fn target(&self, species: Species) -> usize {
        match species {
            Species::SmallFish => self.config.target_small_fish,
            Species::MidFish => self.config.target_mid_fish,
            Species::Predators => self.config.target_predators,
        }
    }

    pub fn population_history(&self, species: Species) -> &HistoryBuffer {
        &self.populations[species.index()]
    }

    pub fn birth_history(&self, species: Species) -> &HistoryBuffer {
        &self.births[species.index()]
    }

    pub fn death_history(&self, species: Species) -> &HistoryBuffer {
        &self.deaths[species.index()]
    }

    pub fn aggression(&self) -> f64 {
        self.aggression
    }

    pub fn record_birth(&mut self, species: Species) {
        self.pending_births[species.index()] += 1;
    }

    pub fn record_death(&mut self, species: Species) {
        self.pending_deaths[species.index()] += 1;
    }

    /// Observe one tick and, on the configured cadences, adjust `params`.
    pub fn update(
        &mut self,
        observation: &Observation,
        params: &mut SimParameters,
        rng: &mut impl Rng,
    ) -> BalanceOutcome {
        self.record(observation);
        self.scores = self.score(observation);

        if !self.enabled {
            return BalanceOutcome {
                health: self.scores.overall,
                respawn: Vec::new(),
            };
        }

        self.ticks += 1;
        if self.ticks % self.config.major_interval == 0 {
            self.major_pass(observation, params);
        }
        if self.ticks % self.config.minor_interval == 0 {
            self.minor_pass(params, rng);
        }

        let respawn: Vec<Species> = Species::ALL
            .into_iter()
            .filter(|s| observation.count(*s) == 0)
            .collect();
        for species in &respawn {
            info!(species = species.label(), "species extinct, forcing a respawn");
        }

        BalanceOutcome {
            health: self.scores.overall,
            respawn,
        }
    }

    fn record(&mut self, observation: &Observation) {
        for species in Species::ALL {
            let i = species.index();
            self.populations[i].push(observation.count(species) as f64);
            self.births[i].push(f64::from(self.pending_births[i]));
            self.deaths[i].push(f64::from(self.pending_deaths[i]));
        }
        self.pending_births = [0; 3];
        self.pending_deaths = [0; 3];
        if let Some(hunger) = observation.avg_predator_hunger {
            self.predator_hunger.push(hunger);
        }
        self.latest = *observation;
    }

    fn species_score(&self, species: Species, count: usize) -> f64 {
        let history = &self.populations[species.index()];
        if history.len() < self.config.stability_window {
            return 0.5;
        }
        if count == 0 {
            return 0.0;
        }
        let target = self.target(species) as f64;
        let deviation = (count as f64 - target).abs() / target;
        let stability = 1.0 - (history.recent_std(self.config.stability_window) / target).min(1.0);
        (0.6 * (1.0 - deviation) + 0.4 * stability).clamp(0.0, 1.0)
    }

    fn score(&self, observation: &Observation) -> Scores {
        let small_fish = self.species_score(Species::SmallFish, observation.small_fish);
        let mid_fish = self.species_score(Species::MidFish, observation.mid_fish);
        let predators = self.species_score(Species::Predators, observation.predators);

        let predator_hunger = match observation.avg_predator_hunger {
            Some(avg) if observation.max_predator_hunger > 0.0 => {
                let max = observation.max_predator_hunger;
                (1.0 - (avg - max * 0.5).abs() / max).clamp(0.0, 1.0)
            }
            _ => 0.5,
        };
        let food = if observation.food_target > 0.0 {
            1.0 - (observation.food as f64 / observation.food_target - 1.0).abs().min(1.0)
        } else {
            0.5
        };

        let overall = 0.3 * small_fish + 0.25 * mid_fish + 0.2 * predators + 0.15 * predator_hunger + 0.1 * food;
        Scores {
            small_fish,
            mid_fish,
            predators,
            predator_hunger,
            food,
            overall,
        }
    }

    /// Move `tunable` by `fraction` of its range.
    fn shift(params: &mut SimParameters, tunable: Tunable, fraction: f64) {
        let before = params.get(tunable);
        let after = params.nudge(tunable, params.range(tunable).span() * fraction);
        if before != after {
            debug!(tunable = tunable.name(), before, after, "balancer adjusted tunable");
        }
    }

    fn major_pass(&mut self, observation: &Observation, params: &mut SimParameters) {
        self.major_passes += 1;
        self.last_strategies.clear();
        let pid_step = self.config.pid_step * self.aggression;

        // population error drives each species' growth levers
        for species in Species::ALL {
            let target = self.target(species) as f64;
            let error = (target - observation.count(species) as f64) / target;
            let output = self.pids[species.index()].update(error, 1.0);
            let step = output * pid_step;
            match species {
                Species::SmallFish => {
                    Self::shift(params, Tunable::FishNaturalBreedChance, step);
                    Self::shift(params, Tunable::FishBreedCooldown, -step);
                }
                Species::MidFish => {
                    Self::shift(params, Tunable::MidFishBreedChance, step);
                    Self::shift(params, Tunable::MidFishBreedCooldown, -step);
                }
                Species::Predators => {
                    Self::shift(params, Tunable::PredatorFeedRestore, step);
                    Self::shift(params, Tunable::PredatorHungerDecay, -step);
                }
            }
        }

        let scores = self.scores;
        let strategy = |score: f64| self.config.strategy_step * (1.0 - score) * self.aggression;
        let small = observation.small_fish as f64;
        let mid = observation.mid_fish as f64;
        let small_target = self.config.target_small_fish as f64;
        let mid_target = self.config.target_mid_fish as f64;
        let mut fired = Vec::new();

        if small < small_target * 0.8 {
            let step = strategy(scores.small_fish);
            for t in [Tunable::FishSpeed, Tunable::FishForce, Tunable::EscapeWeight] {
                Self::shift(params, t, step);
            }
            fired.push("small_fish_survival");
        }
        if small < small_target * 0.9 {
            let step = strategy(scores.small_fish);
            Self::shift(params, Tunable::FishBreedCooldown, -step);
            Self::shift(params, Tunable::FishNaturalBreedChance, step);
            fired.push("small_fish_reproduction");
        }
        if mid < mid_target * 0.8 {
            let step = strategy(scores.mid_fish);
            for t in [Tunable::MidFishSpeed, Tunable::MidFishForce, Tunable::MidFishEscapeWeight] {
                Self::shift(params, t, step);
            }
            fired.push("mid_fish_survival");
        }
        if mid < mid_target * 0.9 {
            let step = strategy(scores.mid_fish);
            Self::shift(params, Tunable::MidFishBreedCooldown, -step);
            Self::shift(params, Tunable::MidFishBreedChance, step);
            fired.push("mid_fish_reproduction");
        }
        let starving = observation.max_predator_hunger * 0.3;
        if observation.avg_predator_hunger.is_some_and(|h| h < starving) {
            let step = strategy(scores.predator_hunger);
            Self::shift(params, Tunable::PredatorFeedRestore, step);
            Self::shift(params, Tunable::PredatorHungerDecay, -step);
            fired.push("predator_hunger");
        }
        if small > small_target * 1.3 || mid > mid_target * 1.3 {
            let step = strategy(scores.overall);
            Self::shift(params, Tunable::FishBreedCooldown, step);
            Self::shift(params, Tunable::MidFishBreedCooldown, step);
            Self::shift(params, Tunable::FishNaturalBreedChance, -step);
            Self::shift(params, Tunable::MidFishBreedChance, -step);
            fired.push("overpopulation");
        }
        if observation.predators as f64 > self.config.target_predators as f64 * 1.5 {
            let step = strategy(scores.predators);
            Self::shift(params, Tunable::PredatorHungerDecay, step);
            fired.push("predator_overpopulation");
        }
        self.last_strategies = fired;

        // sustained poor health makes the next corrections bolder
        if scores.overall < self.config.poor_health {
            self.aggression *= 1.1;
        } else if scores.overall > self.config.good_health {
            self.aggression *= 0.9;
        }
        self.aggression = self
            .aggression
            .clamp(self.config.min_aggression, self.config.max_aggression);

        debug!(
            health = scores.overall,
            aggression = self.aggression,
            strategies = ?self.last_strategies,
            "major balance pass"
        );
    }

    fn minor_pass(&mut self, params: &mut SimParameters, rng: &mut impl Rng) {
        self.minor_passes += 1;
        let unhealthy = (1.0 - self.scores.overall).clamp(0.0, 1.0);
        let chance = self.config.minor_tweak_probability * unhealthy;
        let amplitude = self.config.minor_step * unhealthy;
        if chance <= 0.0 || amplitude <= 0.0 {
            return;
        }
        for tunable in Tunable::ALL {
            if rng.random::<f64>() < chance {
                let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                Self::shift(params, tunable, sign * amplitude);
            }
        }
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn status(&self, params: &SimParameters) -> BalanceStatus {
        BalanceStatus {
            enabled: self.enabled,
            health: self.scores.overall,
            scores: self.scores,
            populations: Species::ALL.map(|s| self.latest.count(s)),
            targets: Species::ALL.map(|s| self.target(s)),
            aggression: self.aggression,
            minor_passes: self.minor_passes,
            major_passes: self.major_passes,
            last_strategies: self.last_strategies.clone(),
            parameters: params.snapshot(),
        }
    }

    /// Forget all history and controller state, and restore base tunables.
    pub fn reset(&mut self, params: &mut SimParameters) {
        for buffer in self
            .populations
            .iter_mut()
            .chain(self.births.iter_mut())
            .chain(self.deaths.iter_mut())
        {
            buffer.clear();
        }
        self.predator_hunger.clear();
        for pid in &mut self.pids {
            pid.reset();
        }
        self.pending_births = [0; 3];
        self.pending_deaths = [0; 3];
        self.latest = Observation::default();
        self.scores = Scores::default();
        self.aggression = 1.0;
        self.ticks = 0;
        self.minor_passes = 0;
        self.major_passes = 0;
        self.last_strategies.clear();
        params.reset_to_base();
    }
}
