//! Plain-shape drawing of the swarm state. Reads the swarm, never changes it.

use piston_window::math::Matrix2d;
use piston_window::{G2d, ellipse, line, rectangle};

use reef_swarm::Swarm;
use reef_swarm::fish::FishKind;
use reef_swarm::food::FoodKind;
use reef_swarm::predator::GrowthStage;

const DAY_WATER: [f32; 4] = [0.05, 0.35, 0.55, 1.0];
const NIGHT_WATER: [f32; 4] = [0.01, 0.04, 0.12, 1.0];
const KELP: [f32; 4] = [0.1, 0.45, 0.15, 1.0];

pub fn water_color(day_night: f64) -> [f32; 4] {
    let t = day_night.clamp(0.0, 1.0) as f32;
    let mut color = [0.0; 4];
    for (i, channel) in color.iter_mut().enumerate() {
        *channel = NIGHT_WATER[i] + (DAY_WATER[i] - NIGHT_WATER[i]) * t;
    }
    color
}

fn food_color(kind: FoodKind) -> [f32; 4] {
    match kind {
        FoodKind::Plankton => [0.4, 0.9, 0.4, 1.0],
        FoodKind::SmallFishCorpse => [0.7, 0.6, 0.4, 1.0],
        FoodKind::LargeCorpse => [0.5, 0.35, 0.25, 1.0],
    }
}

fn fish_color(kind: FishKind, fear: f64) -> [f32; 4] {
    let fear = fear.clamp(0.0, 1.0) as f32;
    match kind {
        FishKind::Small => [0.9, 0.8 - 0.4 * fear, 0.2, 1.0],
        FishKind::Mid => [0.3 + 0.5 * fear, 0.7, 0.9, 1.0],
    }
}

fn predator_color(stage: GrowthStage, dashing: bool) -> [f32; 4] {
    if dashing {
        return [1.0, 0.3, 0.1, 1.0];
    }
    match stage {
        GrowthStage::Juvenile => [0.9, 0.4, 0.5, 1.0],
        GrowthStage::Adult => [0.8, 0.1, 0.2, 1.0],
        GrowthStage::Senior => [0.55, 0.1, 0.15, 1.0],
    }
}

pub fn draw_world(swarm: &Swarm, transform: Matrix2d, g: &mut G2d) {
    let params = swarm.params();

    for kelp in swarm.environment().kelp() {
        for pair in kelp.segments.windows(2) {
            line(KELP, 2.0, [pair[0].x, pair[0].y, pair[1].x, pair[1].y], transform, g);
        }
    }

    for food in swarm.food().iter().filter(|f| !f.consumed) {
        let size = food.size * 2.0;
        rectangle(
            food_color(food.kind),
            [food.position.x - food.size, food.position.y - food.size, size, size],
            transform,
            g,
        );
    }

    for fish in swarm.fishes().values().filter(|f| f.alive) {
        let size = fish.size(params);
        rectangle(
            fish_color(fish.kind, fish.fear),
            [fish.position.x - size, fish.position.y - size * 0.5, size * 2.0, size],
            transform,
            g,
        );
    }

    for predator in swarm.predators().values().filter(|p| p.alive) {
        let size = predator.size(params);
        ellipse(
            predator_color(predator.stage, predator.dash.active),
            [predator.position.x - size, predator.position.y - size, size * 2.0, size * 2.0],
            transform,
            g,
        );
    }
}

/// Two lines for the stats bar: populations, then the balancer.
pub fn stats_lines(swarm: &Swarm) -> [String; 2] {
    let stats = swarm.stats();
    let status = swarm.balance_status();
    [
        format!(
            "Fish: {} | Mid: {} | Predators: {} | Food: {} | Eaten: {} | Cohesion: {:.0} | Threads: {}",
            stats.small_fish,
            stats.mid_fish,
            stats.predators,
            stats.food_on_map,
            stats.food_consumed,
            stats.cohesion,
            rayon::current_num_threads()
        ),
        format!(
            "Balancer [B]: {} | Health: {:.2} | Aggression: {:.2} | Births: {} | Deaths: {}",
            if status.enabled { "on" } else { "off" },
            status.health,
            status.aggression,
            stats.total_births,
            stats.total_deaths
        ),
    ]
}
