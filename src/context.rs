use crate::config::SimConfig;
use crate::params::SimParameters;

/// Read-only view of the world handed to agents for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    pub config: &'a SimConfig,
    pub params: &'a SimParameters,
    pub tick: u64,
    /// 1.0 at noon, 0.0 at midnight.
    pub day_night: f64,
}

impl<'a> TickContext<'a> {
    pub fn new(config: &'a SimConfig, params: &'a SimParameters, tick: u64, day_night: f64) -> Self {
        TickContext {
            config,
            params,
            tick,
            day_night: if day_night.is_finite() {
                day_night.clamp(0.0, 1.0)
            } else {
                1.0
            },
        }
    }

    pub fn width(&self) -> f64 {
        self.config.world.width
    }

    pub fn height(&self) -> f64 {
        self.config.world.height
    }

    /// Schools tighten up in the dark.
    pub fn cohesion_multiplier(&self) -> f64 {
        1.0 + (1.0 - self.day_night) * self.config.behavior.night_cohesion_bonus
    }

    /// Fraction of top speed available at this time of day.
    pub fn speed_multiplier(&self) -> f64 {
        let reduction = self.config.behavior.night_speed_reduction.clamp(0.0, 1.0);
        self.day_night * reduction + (1.0 - reduction)
    }
}
