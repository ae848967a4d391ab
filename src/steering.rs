//! Reynolds-style steering behaviours shared by both fish species.
//!
//! Every function returns a force already capped at the caller's limit and
//! returns [`DVec2::ZERO`] when it has nothing to react to.

use std::f64::consts::TAU;

use glam::DVec2;
use rand::Rng;

use crate::vector::{limit, rotate, with_magnitude};

/// The parts of an agent's motion a steering rule needs.
#[derive(Debug, Clone, Copy)]
pub struct Motion {
    pub velocity: DVec2,
    pub max_speed: f64,
    pub max_force: f64,
}

impl Motion {
    /// Force that turns `velocity` toward `heading` at full speed.
    pub fn steer(&self, heading: DVec2) -> DVec2 {
        if heading.length_squared() == 0.0 {
            return DVec2::ZERO;
        }
        limit(with_magnitude(heading, self.max_speed) - self.velocity, self.max_force)
    }
}

/// Another agent as seen from the one being steered.
#[derive(Debug, Clone, Copy)]
pub struct Neighbour {
    /// Shortest displacement from the steered agent to this one.
    pub delta: DVec2,
    pub velocity: DVec2,
}

/// A predator as seen from a fish.
#[derive(Debug, Clone, Copy)]
pub struct Threat {
    pub delta: DVec2,
    pub dashing: bool,
}

pub fn separation(motion: &Motion, neighbours: &[Neighbour], radius: f64) -> DVec2 {
    let mut sum = DVec2::ZERO;
    let mut count = 0usize;
    for n in neighbours {
        let distance = n.delta.length();
        if distance > 0.0 && distance < radius {
            // closer neighbours push harder
            sum -= n.delta / (distance * distance);
            count += 1;
        }
    }
    if count == 0 {
        return DVec2::ZERO;
    }
    motion.steer(sum / count as f64)
}

pub fn alignment(motion: &Motion, neighbours: &[Neighbour], radius: f64) -> DVec2 {
    let mut sum = DVec2::ZERO;
    let mut count = 0usize;
    for n in neighbours {
        let distance = n.delta.length();
        if distance > 0.0 && distance < radius {
            sum += n.velocity;
            count += 1;
        }
    }
    if count == 0 {
        return DVec2::ZERO;
    }
    motion.steer(sum / count as f64)
}

pub fn cohesion(motion: &Motion, neighbours: &[Neighbour], radius: f64) -> DVec2 {
    let mut sum = DVec2::ZERO;
    let mut count = 0usize;
    for n in neighbours {
        let distance = n.delta.length();
        if distance > 0.0 && distance < radius {
            sum += n.delta;
            count += 1;
        }
    }
    if count == 0 {
        return DVec2::ZERO;
    }
    motion.steer(sum / count as f64)
}

/// Steer toward a point given as a displacement from the agent.
pub fn seek(motion: &Motion, delta: DVec2) -> DVec2 {
    motion.steer(delta)
}

/// Occasional heading kick, capped at a fraction of `max_force`.
pub fn wander(motion: &Motion, chance: f64, rng: &mut impl Rng) -> DVec2 {
    if !rng.random_bool(chance.clamp(0.0, 1.0)) {
        return DVec2::ZERO;
    }
    let heading = if motion.velocity.length_squared() > 0.0 {
        rotate(motion.velocity, rng.random_range(-0.3..0.3))
    } else {
        DVec2::from_angle(rng.random_range(0.0..TAU))
    };
    let desired = with_magnitude(heading, motion.max_speed * 0.5);
    limit(desired - motion.velocity, motion.max_force * 0.3)
}

/// Result of scanning the predators around a fish.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Escape {
    pub force: DVec2,
    /// A dashing predator was inside the detection range.
    pub dash_seen: bool,
}

/// Weighted push away from every threat closer than `range`.
///
/// Dashing threats count double. The result may exceed `max_force` by
/// `force_multiple`; fleeing overrides cruising.
pub fn flee(motion: &Motion, threats: &[Threat], range: f64, gain: f64, force_multiple: f64) -> Escape {
    let mut escape = Escape::default();
    if range <= 0.0 {
        return escape;
    }
    for threat in threats {
        let distance = threat.delta.length();
        if distance <= 0.0 || distance >= range {
            continue;
        }
        let mut weight = (range - distance) / range;
        if threat.dashing {
            weight *= 2.0;
            escape.dash_seen = true;
        }
        escape.force -= threat.delta / distance * weight * gain;
    }
    escape.force = limit(escape.force, motion.max_force * force_multiple);
    escape
}

/// Push back from the top and bottom margins, proportional to penetration.
pub fn vertical_boundary(y: f64, height: f64, margin: f64, strength: f64) -> DVec2 {
    if margin <= 0.0 {
        return DVec2::ZERO;
    }
    if y < margin {
        DVec2::new(0.0, strength * (margin - y) / margin)
    } else if y > height - margin {
        DVec2::new(0.0, -strength * (y - (height - margin)) / margin)
    } else {
        DVec2::ZERO
    }
}
