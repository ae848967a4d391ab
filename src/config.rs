//! Static configuration for a reef world.
//!
//! Everything here is fixed for the lifetime of a [`crate::swarm::Swarm`];
//! the values the balancer is allowed to move live in
//! [`crate::params::SimParameters`] instead. The `tunables` map lets a
//! config file shift the base of those parameters by name.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level simulation configuration. Every section falls back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default = "FishSpeciesConfig::small")]
    pub small_fish: FishSpeciesConfig,
    #[serde(default = "FishSpeciesConfig::mid")]
    pub mid_fish: FishSpeciesConfig,
    #[serde(default)]
    pub predator: PredatorConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub balancer: BalancerConfig,
    #[serde(default)]
    pub environment: EnvironmentConfig,
    /// Base overrides for shared tunables, keyed like `FISH_SPEED`.
    #[serde(default)]
    pub tunables: BTreeMap<String, f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            population: PopulationConfig::default(),
            small_fish: FishSpeciesConfig::small(),
            mid_fish: FishSpeciesConfig::mid(),
            predator: PredatorConfig::default(),
            behavior: BehaviorConfig::default(),
            food: FoodConfig::default(),
            balancer: BalancerConfig::default(),
            environment: EnvironmentConfig::default(),
            tunables: BTreeMap::new(),
        }
    }
}

/// Map geometry and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Width of the playable map; the map wraps horizontally.
    pub width: f64,
    pub height: f64,
    /// Edge length of one spatial grid cell.
    pub grid_cell_size: f64,
    /// Depth of the vertical push-back band.
    pub boundary_margin: f64,
    /// Ticks per simulated second.
    pub fps: f64,
    pub day_night_cycle_secs: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 1400.0,
            height: 1000.0,
            grid_cell_size: 50.0,
            boundary_margin: 50.0,
            fps: 60.0,
            day_night_cycle_secs: 30.0,
        }
    }
}

/// Initial counts and hard caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub fish: usize,
    pub mid_fish: usize,
    pub predators: usize,
    pub max_fish: usize,
    pub max_mid_fish: usize,
    pub max_predators: usize,
    /// Half-width of the square around the map centre where schools start.
    pub spawn_spread: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            fish: 150,
            mid_fish: 50,
            predators: 3,
            max_fish: 600,
            max_mid_fish: 200,
            max_predators: 12,
            spawn_spread: 100.0,
        }
    }
}

/// Lifecycle constants for one fish species.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FishSpeciesConfig {
    /// Age (ticks) after which the fish is mature.
    pub reproduction_age: u64,
    pub max_age: u64,
    /// Per-individual spread applied around `max_age` at birth.
    pub max_age_variation: u64,
    pub initial_hunger: f64,
    pub hunger_jitter: f64,
    pub max_hunger: f64,
    pub hunger_decay: f64,
    pub feed_restore: f64,
    /// Minimum hunger a parent needs before it may reproduce.
    pub breed_hunger_min: f64,
    pub breed_hunger_cost: f64,
    /// Ticks after feeding during which the fed breeding bonus applies.
    pub fed_window: u64,
    /// Offspring appear within this many units of the parent on each axis.
    pub spawn_offset: f64,
    pub escape_radius: f64,
    /// Predators closer than this count as danger for experience growth.
    pub danger_radius: f64,
    pub food_detection_radius: f64,
    /// Fed breeding chance used when the shared table has none for the species.
    pub food_breed_chance: f64,
}

impl FishSpeciesConfig {
    pub fn small() -> Self {
        Self {
            reproduction_age: 600,
            max_age: 7200,
            max_age_variation: 1800,
            initial_hunger: 80.0,
            hunger_jitter: 20.0,
            max_hunger: 120.0,
            hunger_decay: 0.02,
            feed_restore: 25.0,
            breed_hunger_min: 50.0,
            breed_hunger_cost: 20.0,
            fed_window: 300,
            spawn_offset: 30.0,
            escape_radius: 30.0,
            danger_radius: 100.0,
            food_detection_radius: 100.0,
            food_breed_chance: 0.004,
        }
    }

    pub fn mid() -> Self {
        Self {
            reproduction_age: 900,
            max_age: 10800,
            max_age_variation: 1800,
            initial_hunger: 100.0,
            hunger_jitter: 20.0,
            max_hunger: 150.0,
            hunger_decay: 0.025,
            feed_restore: 25.0,
            breed_hunger_min: 60.0,
            breed_hunger_cost: 25.0,
            fed_window: 300,
            spawn_offset: 30.0,
            escape_radius: 40.0,
            danger_radius: 120.0,
            food_detection_radius: 150.0,
            food_breed_chance: 0.003,
        }
    }
}

impl Default for FishSpeciesConfig {
    fn default() -> Self {
        Self::small()
    }
}

/// Hunting, dashing, growth and mating constants for predators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredatorConfig {
    pub dash_speed: f64,
    pub dash_duration: u32,
    pub dash_cooldown_base: u32,
    pub dash_cooldown_max: u32,
    pub dash_hunger_cost: f64,
    pub dash_min_distance: f64,
    pub dash_max_distance: f64,
    /// Ticks of prey velocity added to the dash aim point.
    pub dash_lookahead: f64,
    pub pursuit_lookahead: f64,
    pub hunter_range_max: f64,
    /// Hunger ratio at or above which the predator cruises and stops eating.
    pub satiation_ratio: f64,
    pub juvenile_until: u64,
    pub adult_until: u64,
    pub max_age: u64,
    pub max_age_variation: u64,
    pub feed_history_len: usize,
    pub recent_kill_window: u64,
    pub distance_weight: f64,
    pub speed_weight: f64,
    pub type_weight: f64,
    pub cruise_turn_chance: f64,
    pub cruise_speed_ratio: f64,
    pub mating_distance: f64,
    pub mating_hunger_ratio: f64,
    pub mating_hunger_cost: f64,
    pub mating_cooldown: u64,
    pub boundary_margin: f64,
}

impl Default for PredatorConfig {
    fn default() -> Self {
        Self {
            dash_speed: 6.0,
            dash_duration: 30,
            dash_cooldown_base: 120,
            dash_cooldown_max: 600,
            dash_hunger_cost: 30.0,
            dash_min_distance: 40.0,
            dash_max_distance: 120.0,
            dash_lookahead: 10.0,
            pursuit_lookahead: 15.0,
            hunter_range_max: 500.0,
            satiation_ratio: 0.8,
            juvenile_until: 3600,
            adult_until: 20000,
            max_age: 36000,
            max_age_variation: 3600,
            feed_history_len: 10,
            recent_kill_window: 3600,
            distance_weight: 0.4,
            speed_weight: 0.3,
            type_weight: 0.3,
            cruise_turn_chance: 0.03,
            cruise_speed_ratio: 0.7,
            mating_distance: 100.0,
            mating_hunger_ratio: 0.6,
            mating_hunger_cost: 3000.0,
            mating_cooldown: 3000,
            boundary_margin: 30.0,
        }
    }
}

/// Steering weights and ambient modifiers shared by the fish species.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub wander_weight: f64,
    pub wander_chance: f64,
    pub boundary_force: f64,
    /// Weight applied to the ambient current handed to each tick.
    pub current_strength: f64,
    /// Scale applied to the position-dependent current on top of the ambient one.
    pub local_current_scale: f64,
    pub night_cohesion_bonus: f64,
    pub night_speed_reduction: f64,
    pub experience_cap: f64,
    pub danger_experience: f64,
    pub calm_experience: f64,
    pub flee_gain: f64,
    /// Flee force may exceed `max_force` by this factor.
    pub flee_force_multiple: f64,
    pub dash_fear: f64,
    pub fear_recovery: f64,
    pub wrap_jitter: f64,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            wander_weight: 0.5,
            wander_chance: 0.2,
            boundary_force: 0.5,
            current_strength: 0.5,
            local_current_scale: 0.1,
            night_cohesion_bonus: 1.0,
            night_speed_reduction: 0.8,
            experience_cap: 5.0,
            danger_experience: 0.1,
            calm_experience: 0.01,
            flee_gain: 2.5,
            flee_force_multiple: 3.0,
            dash_fear: 0.2,
            fear_recovery: 0.02,
            wrap_jitter: 0.1,
        }
    }
}

/// Food field seeding, respawn and drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoodConfig {
    pub plankton_size: f64,
    pub small_corpse_size: f64,
    pub large_corpse_size: f64,
    /// Share of the food-count tunable kept topped up as plankton.
    pub plankton_share: f64,
    pub corpse_share: f64,
    pub small_cluster: usize,
    pub large_cluster: usize,
    pub small_cluster_chance: f64,
    pub large_cluster_chance: f64,
    pub initial_large_cluster_chance: f64,
    pub plankton_drift: f64,
    pub small_corpse_sink: f64,
    pub large_corpse_sink: f64,
    pub current_drift: f64,
    /// How far below the map a sinking corpse may fall before it expires.
    pub bottom_overshoot: f64,
    /// User-placed food is refused beyond this multiple of the food count.
    pub user_spawn_factor: f64,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            plankton_size: 0.75,
            small_corpse_size: 1.2,
            large_corpse_size: 1.5,
            plankton_share: 0.6,
            corpse_share: 0.15,
            small_cluster: 5,
            large_cluster: 20,
            small_cluster_chance: 0.01,
            large_cluster_chance: 0.002,
            initial_large_cluster_chance: 0.05,
            plankton_drift: 0.1,
            small_corpse_sink: 0.2,
            large_corpse_sink: 0.1,
            current_drift: 0.05,
            bottom_overshoot: 50.0,
            user_spawn_factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Targets, cadences and gains for the ecosystem balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    pub enabled: bool,
    pub target_small_fish: usize,
    pub target_mid_fish: usize,
    pub target_predators: usize,
    pub minor_interval: u64,
    pub major_interval: u64,
    pub history_len: usize,
    pub stability_window: usize,
    pub small_fish_gains: PidGains,
    pub mid_fish_gains: PidGains,
    pub predator_gains: PidGains,
    pub pid_output_limit: f64,
    pub pid_integral_limit: f64,
    pub minor_tweak_probability: f64,
    pub minor_step: f64,
    pub strategy_step: f64,
    pub pid_step: f64,
    pub poor_health: f64,
    pub good_health: f64,
    pub min_aggression: f64,
    pub max_aggression: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_small_fish: 150,
            target_mid_fish: 50,
            target_predators: 5,
            minor_interval: 300,
            major_interval: 900,
            history_len: 300,
            stability_window: 10,
            small_fish_gains: PidGains {
                kp: 0.3,
                ki: 0.05,
                kd: 0.02,
            },
            mid_fish_gains: PidGains {
                kp: 0.25,
                ki: 0.04,
                kd: 0.015,
            },
            predator_gains: PidGains {
                kp: 0.4,
                ki: 0.06,
                kd: 0.03,
            },
            pid_output_limit: 1.0,
            pid_integral_limit: 10.0,
            minor_tweak_probability: 0.3,
            minor_step: 0.05,
            strategy_step: 0.1,
            pid_step: 0.05,
            poor_health: 0.4,
            good_health: 0.7,
            min_aggression: 0.5,
            max_aggression: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KelpSpec {
    pub x: f64,
    pub height: f64,
}

/// Currents and kelp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub current_count: usize,
    pub current_strength: f64,
    pub kelp: Vec<KelpSpec>,
    pub kelp_radius: f64,
    pub kelp_drag: f64,
    /// Predators feel kelp at this fraction of the fish response.
    pub predator_kelp_scale: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            current_count: 3,
            current_strength: 0.5,
            kelp: vec![
                KelpSpec { x: 100.0, height: 150.0 },
                KelpSpec { x: 250.0, height: 120.0 },
                KelpSpec { x: 400.0, height: 180.0 },
                KelpSpec { x: 600.0, height: 140.0 },
                KelpSpec { x: 750.0, height: 160.0 },
            ],
            kelp_radius: 15.0,
            kelp_drag: 0.05,
            predator_kelp_scale: 0.1,
        }
    }
}

impl SimConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigError::InvalidConfig("world dimensions must be positive"));
        }
        if world.grid_cell_size <= 0.0 {
            return Err(ConfigError::InvalidConfig("grid_cell_size must be positive"));
        }
        if world.width < world.grid_cell_size {
            return Err(ConfigError::InvalidConfig("world width must be at least one grid cell"));
        }
        if world.boundary_margin < 0.0 || world.boundary_margin * 2.0 >= world.height {
            return Err(ConfigError::InvalidConfig(
                "boundary_margin must be non-negative and leave room inside the map",
            ));
        }
        if world.fps <= 0.0 || world.day_night_cycle_secs <= 0.0 {
            return Err(ConfigError::InvalidConfig(
                "fps and day_night_cycle_secs must be positive",
            ));
        }
        for species in [&self.small_fish, &self.mid_fish] {
            if species.max_hunger <= 0.0 || species.initial_hunger <= 0.0 {
                return Err(ConfigError::InvalidConfig("fish hunger levels must be positive"));
            }
            if species.max_age <= species.max_age_variation {
                return Err(ConfigError::InvalidConfig(
                    "fish max_age must exceed max_age_variation",
                ));
            }
        }
        let predator = &self.predator;
        if predator.dash_min_distance >= predator.dash_max_distance {
            return Err(ConfigError::InvalidConfig(
                "dash_min_distance must be below dash_max_distance",
            ));
        }
        if predator.juvenile_until >= predator.adult_until {
            return Err(ConfigError::InvalidConfig(
                "juvenile_until must be below adult_until",
            ));
        }
        if predator.max_age <= predator.max_age_variation {
            return Err(ConfigError::InvalidConfig(
                "predator max_age must exceed max_age_variation",
            ));
        }
        if predator.feed_history_len == 0 {
            return Err(ConfigError::InvalidConfig("feed_history_len must be positive"));
        }
        let balancer = &self.balancer;
        if balancer.history_len == 0 || balancer.stability_window == 0 {
            return Err(ConfigError::InvalidConfig(
                "balancer history_len and stability_window must be positive",
            ));
        }
        if balancer.minor_interval == 0 || balancer.major_interval == 0 {
            return Err(ConfigError::InvalidConfig("balancer intervals must be positive"));
        }
        if balancer.target_small_fish == 0
            || balancer.target_mid_fish == 0
            || balancer.target_predators == 0
        {
            return Err(ConfigError::InvalidConfig("population targets must be positive"));
        }
        if balancer.min_aggression > balancer.max_aggression {
            return Err(ConfigError::InvalidConfig(
                "min_aggression must not exceed max_aggression",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config = SimConfig::from_json_str(
            r#"{ "world": { "width": 800.0 }, "tunables": { "FISH_SPEED": 3.0 } }"#,
        )
        .expect("config should parse");
        assert_eq!(config.world.width, 800.0);
        assert_eq!(config.world.height, 1000.0);
        assert_eq!(config.mid_fish.reproduction_age, 900);
        assert_eq!(config.tunables.get("FISH_SPEED"), Some(&3.0));
    }

    #[test]
    fn rejects_bad_geometry() {
        let err = SimConfig::from_json_str(r#"{ "world": { "grid_cell_size": 0.0 } }"#)
            .expect_err("zero cell size must fail");
        assert!(matches!(err, ConfigError::InvalidConfig(_)));

        // narrower than a cell, the grid would wrap on a different width
        let err = SimConfig::from_json_str(r#"{ "world": { "width": 30.0, "grid_cell_size": 50.0 } }"#)
            .expect_err("map narrower than a cell must fail");
        assert!(matches!(err, ConfigError::InvalidConfig(_)));
        let mut config = SimConfig::default();
        config.world.width = config.world.grid_cell_size;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = SimConfig::from_json_str("{ not json").expect_err("must fail");
        assert!(matches!(err, ConfigError::Json { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::from_file(Path::new("/definitely/not/here.json"))
            .expect_err("must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
