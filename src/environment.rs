//! Ambient forces: water currents, swaying kelp and the day/night cycle.

use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;

use crate::config::EnvironmentConfig;
use crate::vector::wrapped_delta;

/// Brightness in `[0, 1]` for a point `elapsed_secs` into the cycle; 1 is noon.
pub fn day_night_factor(elapsed_secs: f64, cycle_secs: f64) -> f64 {
    if cycle_secs <= 0.0 {
        return 1.0;
    }
    let phase = (elapsed_secs / cycle_secs).rem_euclid(1.0);
    0.5 * (1.0 + (TAU * phase).cos())
}

#[derive(Debug, Clone)]
pub struct WaterCurrent {
    direction: DVec2,
    strength: f64,
    offset: f64,
}

impl WaterCurrent {
    fn new(strength: f64, rng: &mut impl Rng) -> Self {
        WaterCurrent {
            direction: DVec2::new(1.0, rng.random_range(-0.5..0.5)).normalize(),
            strength,
            offset: rng.random_range(0.0..100.0),
        }
    }

    fn force_at(&self, position: DVec2, time: f64) -> DVec2 {
        let t = time + self.offset;
        let along = (t + position.x * 0.01).sin();
        let across = (t * 0.7 + position.y * 0.008).cos();
        DVec2::new(
            self.direction.x * along * self.strength,
            self.direction.y * across * self.strength * 0.3,
        )
    }
}

/// A kelp stalk anchored at the sea floor, made of swaying segments.
#[derive(Debug, Clone)]
pub struct Kelp {
    base: DVec2,
    height: f64,
    sway_offset: f64,
    pub segments: Vec<DVec2>,
}

impl Kelp {
    fn new(x: f64, floor: f64, height: f64, rng: &mut impl Rng) -> Self {
        let count = ((height / 20.0).floor() as usize).max(3);
        let mut kelp = Kelp {
            base: DVec2::new(x, floor),
            height,
            sway_offset: rng.random_range(0.0..TAU),
            segments: vec![DVec2::ZERO; count],
        };
        kelp.sway(0.0);
        kelp
    }

    fn sway(&mut self, time: f64) {
        let t = time * 2.0 + self.sway_offset;
        let count = self.segments.len() as f64;
        for (i, segment) in self.segments.iter_mut().enumerate() {
            let i = i as f64;
            let intensity = i / count * 15.0;
            segment.x = self.base.x + (t + i * 0.5).sin() * intensity;
            segment.y = self.base.y - i * self.height / count;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Environment {
    currents: Vec<WaterCurrent>,
    kelp: Vec<Kelp>,
    kelp_radius: f64,
    kelp_drag: f64,
    width: f64,
    height: f64,
    time: f64,
}

impl Environment {
    pub fn new(config: &EnvironmentConfig, width: f64, height: f64, rng: &mut impl Rng) -> Self {
        let currents = (0..config.current_count)
            .map(|_| WaterCurrent::new(config.current_strength, rng))
            .collect();
        let kelp = config
            .kelp
            .iter()
            .filter(|spec| spec.x >= 0.0 && spec.x < width)
            .map(|spec| Kelp::new(spec.x, height, spec.height.min(height), rng))
            .collect();

        Environment {
            currents,
            kelp,
            kelp_radius: config.kelp_radius,
            kelp_drag: config.kelp_drag,
            width,
            height,
            time: 0.0,
        }
    }

    /// Seconds of simulated time elapsed.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn kelp(&self) -> &[Kelp] {
        &self.kelp
    }

    pub fn advance(&mut self, dt: f64) {
        self.time += dt;
        for kelp in &mut self.kelp {
            kelp.sway(self.time);
        }
    }

    /// Sum of all currents at `position`.
    pub fn current_at(&self, position: DVec2) -> DVec2 {
        self.currents
            .iter()
            .map(|c| c.force_at(position, self.time))
            .fold(DVec2::ZERO, |acc, f| acc + f)
    }

    /// The current at the middle of the map, handed to each tick as the ambient force.
    pub fn global_current(&self) -> DVec2 {
        self.current_at(DVec2::new(self.width * 0.5, self.height * 0.5))
    }

    /// Push out of any kelp segment the agent is inside, plus drag on its velocity.
    pub fn kelp_force(&self, position: DVec2, velocity: DVec2) -> DVec2 {
        if self.kelp_radius <= 0.0 {
            return DVec2::ZERO;
        }
        let mut push = DVec2::ZERO;
        let mut tangled = false;
        for segment in self.kelp.iter().flat_map(|k| k.segments.iter()) {
            let away = -wrapped_delta(position, *segment, self.width);
            let distance = away.length();
            if distance < self.kelp_radius {
                tangled = true;
                if distance > 0.0 {
                    push += away / distance * (self.kelp_radius - distance) / self.kelp_radius;
                }
            }
        }
        if !tangled {
            return DVec2::ZERO;
        }
        push * self.kelp_drag - velocity * self.kelp_drag
    }
}
