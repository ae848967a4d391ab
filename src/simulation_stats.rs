use std::collections::VecDeque;

use serde::Serialize;

use crate::fish::{Fish, FishKind};
use crate::food::Food;

/// Samples kept for the population and speed charts.
pub const HISTORY_LEN: usize = 1000;

/// Aggregate view of the swarm, refreshed at the end of every tick.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStats {
    pub small_fish: usize,
    pub mid_fish: usize,
    pub predators: usize,
    pub food_on_map: usize,
    /// Summed nutritional value of the food on the map.
    pub food_energy: f64,
    /// Items eaten by fish since the last reset.
    pub food_consumed: usize,
    pub average_speed: f64,
    /// 0 for a scattered swarm, 100 when every fish sits on the centroid.
    pub cohesion: f64,
    pub total_births: usize,
    pub total_deaths: usize,
    pub max_population: usize,
    pub population_history: VecDeque<usize>,
    pub speed_history: VecDeque<f64>,
}

impl SimulationStats {
    pub fn new() -> Self {
        SimulationStats {
            population_history: VecDeque::with_capacity(HISTORY_LEN),
            speed_history: VecDeque::with_capacity(HISTORY_LEN),
            ..Default::default()
        }
    }

    pub fn fish_count(&self, kind: FishKind) -> usize {
        match kind {
            FishKind::Small => self.small_fish,
            FishKind::Mid => self.mid_fish,
        }
    }

    pub fn population(&self) -> usize {
        self.small_fish + self.mid_fish + self.predators
    }

    /// Recount everything from the live collections.
    pub fn refresh<'a>(&mut self, fishes: impl IntoIterator<Item = &'a Fish>, predators: usize, food: &[Food]) {
        let mut small_fish = 0;
        let mut mid_fish = 0;
        let mut total_speed = 0.0;
        let mut positions = Vec::new();
        for fish in fishes.into_iter().filter(|f| f.alive) {
            match fish.kind {
                FishKind::Small => small_fish += 1,
                FishKind::Mid => mid_fish += 1,
            }
            total_speed += fish.velocity.length();
            positions.push(fish.position);
        }

        self.small_fish = small_fish;
        self.mid_fish = mid_fish;
        self.predators = predators;

        let live_food = food.iter().filter(|f| !f.consumed);
        self.food_on_map = live_food.clone().count();
        self.food_energy = live_food.map(|f| f.kind.energy()).sum();

        if positions.is_empty() {
            self.average_speed = 0.0;
            self.cohesion = 0.0;
        } else {
            let count = positions.len() as f64;
            self.average_speed = total_speed / count;
            let centroid = positions.iter().copied().sum::<glam::DVec2>() / count;
            let avg_distance = positions.iter().map(|p| p.distance(centroid)).sum::<f64>() / count;
            self.cohesion = (100.0 - avg_distance / 3.0).max(0.0);
        }

        let population = self.population();
        self.max_population = self.max_population.max(population);
        push_bounded(&mut self.population_history, population);
        push_bounded(&mut self.speed_history, self.average_speed);
    }
}

fn push_bounded<T>(history: &mut VecDeque<T>, sample: T) {
    if history.len() == HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(sample);
}
