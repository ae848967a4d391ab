use glam::DVec2;

use reef_swarm::fish::FishKind;
use reef_swarm::food::FoodKind;
use reef_swarm::params::{SimParameters, Tunable};
use reef_swarm::vector::wrapped_delta;
use reef_swarm::{SimConfig, Swarm};

fn empty_world() -> SimConfig {
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

fn lone_predator_with_prey(params: SimParameters, prey: FishKind) -> Swarm {
    let mut config = empty_world();
    config.population.predators = 1;
    let mut swarm = Swarm::with_parameters(config, params, 11).expect("valid config");
    let position = swarm
        .predators()
        .values()
        .next()
        .expect("one predator")
        .position;
    assert!(swarm.spawn_fish_at(prey, position.x, position.y));
    swarm
}

#[test]
fn hungry_predator_eats_prey_in_contact() {
    let params = SimParameters::default().with_range(Tunable::PredatorHungerDecay, 10_000.0, 10_000.0);
    let mut swarm = lone_predator_with_prey(params, FishKind::Small);

    swarm.advance(DVec2::ZERO, 1.0);

    let predator = swarm.predators().values().next().expect("predator survives");
    // 30000 - 10000 decay, then one small fish worth the full feed restore
    assert!((predator.hunger - 21_000.0).abs() < 1e-6);
    assert_eq!(predator.feed_history.len(), 1);
    assert_eq!(swarm.stats().small_fish, 0);
    assert_eq!(swarm.stats().total_deaths, 1);
    // eaten prey leaves no corpse
    assert!(swarm.food().iter().all(|f| f.kind == FoodKind::Plankton));
}

#[test]
fn satiated_predator_leaves_prey_alone() {
    let mut swarm = lone_predator_with_prey(SimParameters::default(), FishKind::Small);

    swarm.advance(DVec2::ZERO, 1.0);

    let predator = swarm.predators().values().next().expect("predator survives");
    assert!(predator.feed_history.is_empty());
    assert!((predator.hunger - (30_000.0 - 20.0)).abs() < 1e-6);
    assert_eq!(swarm.stats().small_fish, 1);
}

#[test]
fn feeding_on_a_mid_fish_clamps_at_max_hunger() {
    let params = SimParameters::default()
        .with_range(Tunable::PredatorHungerDecay, 4000.0, 4000.0)
        .with_range(Tunable::PredatorFeedRestore, 3000.0, 3000.0)
        .with_range(Tunable::PredatorMaxHunger, 15_000.0, 15_000.0);
    let mut swarm = lone_predator_with_prey(params, FishKind::Mid);

    swarm.advance(DVec2::ZERO, 1.0);

    // 11000 + 3000 * 1.6 would overshoot the cap
    let predator = swarm.predators().values().next().expect("predator survives");
    assert_eq!(predator.feed_history.len(), 1);
    assert_eq!(predator.hunger, 15_000.0);
    assert_eq!(swarm.stats().mid_fish, 0);
}

#[test]
fn extinct_species_come_back_after_one_pass() {
    let mut config = empty_world();
    config.balancer.enabled = true;
    let mut swarm = Swarm::with_rng(config, 12).expect("valid config");
    assert_eq!(swarm.stats().population(), 0);

    swarm.advance(DVec2::ZERO, 1.0);

    let stats = swarm.stats();
    assert_eq!(stats.small_fish, 1);
    assert_eq!(stats.mid_fish, 1);
    assert_eq!(stats.predators, 1);
}

#[test]
fn extinction_stays_when_balancer_is_off() {
    let mut swarm = Swarm::with_rng(empty_world(), 13).expect("valid config");
    swarm.advance(DVec2::ZERO, 1.0);
    assert_eq!(swarm.stats().population(), 0);
}

#[test]
fn two_mature_fish_each_have_one_offspring_nearby() {
    let mut config = empty_world();
    config.population.fish = 2;
    config.small_fish.reproduction_age = 5;
    let spawn_offset = config.small_fish.spawn_offset;
    let width = config.world.width;
    let params = SimParameters::default().with_range(Tunable::FishNaturalBreedChance, 1.0, 1.0);
    let mut swarm = Swarm::with_parameters(config, params, 14).expect("valid config");

    let mut birth_tick = None;
    for _ in 0..10 {
        swarm.advance(DVec2::ZERO, 1.0);
        if swarm.stats().total_births > 0 {
            birth_tick = Some(swarm.tick());
            break;
        }
    }
    let birth_tick = birth_tick.expect("mature fish with a certain chance must breed");
    assert_eq!(swarm.stats().total_births, 2);
    assert_eq!(swarm.stats().small_fish, 4);

    let parents: Vec<DVec2> = swarm
        .fishes()
        .values()
        .filter(|f| f.last_breed_tick == Some(birth_tick))
        .map(|f| f.position)
        .collect();
    let children: Vec<DVec2> = swarm
        .fishes()
        .values()
        .filter(|f| f.age == 0)
        .map(|f| f.position)
        .collect();
    assert_eq!(parents.len(), 2);
    assert_eq!(children.len(), 2);
    for child in children {
        let near_a_parent = parents.iter().any(|parent| {
            let delta = wrapped_delta(*parent, child, width);
            delta.x.abs() <= spawn_offset + 1e-9 && delta.y.abs() <= spawn_offset + 1e-9
        });
        assert!(near_a_parent, "offspring spawned outside the offset box");
    }

    // parents are on cooldown and the young are not mature yet
    for _ in 0..3 {
        swarm.advance(DVec2::ZERO, 1.0);
    }
    assert_eq!(swarm.stats().total_births, 2);
}

#[test]
fn fish_eat_food_they_touch() {
    let mut config = empty_world();
    config.population.fish = 1;
    let params = SimParameters::default().with_range(Tunable::FishSpeed, 1.0, 1.0);
    let mut swarm = Swarm::with_parameters(config, params, 15).expect("valid config");
    let position = swarm.fishes().values().next().expect("one fish").position;
    assert!(swarm.spawn_food_at(position.x, position.y));

    swarm.advance(DVec2::ZERO, 1.0);

    let fish = swarm.fishes().values().next().expect("fish survives");
    assert_eq!(fish.last_feed_tick, Some(1));
    assert!(swarm.stats().food_consumed >= 1);
}

#[test]
fn invariants_hold_over_many_ticks() {
    let mut config = SimConfig::default();
    config.population.fish = 60;
    config.population.mid_fish = 20;
    config.population.predators = 3;
    let mut swarm = Swarm::with_rng(config, 16).expect("valid config");
    let (width, height) = (swarm.config().world.width, swarm.config().world.height);
    let margin = swarm.config().predator.boundary_margin;
    let dash_speed = swarm.config().predator.dash_speed;

    for _ in 0..400 {
        swarm.step();
        let params = swarm.params();
        assert!(params.all_within_range());

        for fish in swarm.fishes().values() {
            assert!(fish.alive);
            assert!(fish.hunger > 0.0);
            assert!(fish.age <= fish.genetics.max_age);
            assert!(fish.velocity.length() <= fish.max_speed(params) + 1e-9);
            assert!((0.0..width).contains(&fish.position.x));
            assert!((0.0..=height).contains(&fish.position.y));
        }
        for predator in swarm.predators().values() {
            assert!(predator.alive);
            assert!(predator.hunger > 0.0);
            assert!(predator.age <= predator.max_age);
            let cap = predator.max_speed(params).max(dash_speed);
            assert!(predator.velocity.length() <= cap + 1e-9);
            assert!((margin..=height - margin).contains(&predator.position.y));
        }
        assert!(swarm.food().iter().all(|f| !f.consumed));
    }
    let stats = swarm.stats();
    assert!(stats.max_population >= stats.population());
    assert!((0.0..=100.0).contains(&stats.cohesion));
}

#[test]
fn user_spawns_are_capped() {
    let mut config = empty_world();
    config.population.predators = 2;
    let mut swarm = Swarm::with_rng(config, 17).expect("valid config");

    let mut placed = 0;
    while swarm.spawn_food_at(400.0, 300.0) {
        placed += 1;
        assert!(placed < 1000, "food spawning never capped");
    }
    assert_eq!(swarm.food().len(), 200);

    assert!(swarm.spawn_predator_at(100.0, 100.0));
    assert!(swarm.spawn_predator_at(200.0, 100.0));
    assert!(!swarm.spawn_predator_at(300.0, 100.0));
    assert_eq!(swarm.predators().len(), 4);
}

#[test]
fn resize_rebuilds_inside_new_bounds() {
    let mut config = SimConfig::default();
    config.population.fish = 30;
    config.population.mid_fish = 10;
    config.population.predators = 2;
    let mut swarm = Swarm::with_rng(config, 18).expect("valid config");
    for _ in 0..20 {
        swarm.step();
    }

    swarm.resize(800.0, 600.0).expect("valid size");
    assert_eq!(swarm.config().world.width, 800.0);
    assert_eq!(swarm.stats().small_fish, 30);
    assert_eq!(swarm.stats().predators, 2);
    for fish in swarm.fishes().values() {
        assert!(fish.position.x < 800.0 && fish.position.y <= 600.0);
    }
    assert!(swarm.environment().kelp().iter().all(|k| k.segments[0].x < 800.0));

    assert!(swarm.resize(0.0, 0.0).is_err());
    assert_eq!(swarm.config().world.height, 600.0);

    for _ in 0..5 {
        swarm.step();
    }
}

#[test]
fn balancer_toggle_and_status() {
    let mut swarm = Swarm::with_rng(SimConfig::default(), 19).expect("valid config");
    swarm.step();
    let status = swarm.balance_status();
    assert!(status.enabled);
    assert!((0.0..=1.0).contains(&status.health));
    assert_eq!(status.parameters.len(), Tunable::COUNT);

    swarm.set_balancer_enabled(false);
    assert!(!swarm.balancer_enabled());
    assert!(swarm.params().is_at_base());
    let json = serde_json::to_string(&swarm.balance_status()).expect("status serializes");
    assert!(json.contains("FISH_SPEED"));
}
