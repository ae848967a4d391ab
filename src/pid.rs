use crate::config::PidGains;

/// PID loop with a clamped integral and a clamped output.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    output_limit: f64,
    integral_limit: f64,
    integral: f64,
    previous_error: Option<f64>,
}

impl PidController {
    pub fn new(gains: PidGains, output_limit: f64, integral_limit: f64) -> Self {
        PidController {
            gains,
            output_limit: output_limit.abs(),
            integral_limit: integral_limit.abs(),
            integral: 0.0,
            previous_error: None,
        }
    }

    /// Feed one error sample and get the control output in `[-limit, limit]`.
    ///
    /// The derivative term is zero on the first sample after a reset.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        if !error.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        self.integral = (self.integral + error * dt).clamp(-self.integral_limit, self.integral_limit);
        let derivative = self.previous_error.map_or(0.0, |previous| (error - previous) / dt);
        self.previous_error = Some(error);

        let output = self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        output.clamp(-self.output_limit, self.output_limit)
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains() -> PidGains {
        PidGains {
            kp: 0.3,
            ki: 0.05,
            kd: 0.02,
        }
    }

    #[test]
    fn proportional_response_on_first_sample() {
        let mut pid = PidController::new(gains(), 1.0, 10.0);
        let out = pid.update(0.5, 1.0);
        // kp * e + ki * e, no derivative yet
        assert!((out - (0.3 * 0.5 + 0.05 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn integral_and_output_saturate() {
        let mut pid = PidController::new(gains(), 1.0, 10.0);
        for _ in 0..1000 {
            let out = pid.update(1.0, 1.0);
            assert!(out <= 1.0);
        }
        assert_eq!(pid.integral(), 10.0);
        for _ in 0..1000 {
            assert!(pid.update(-1.0, 1.0) >= -1.0);
        }
        assert_eq!(pid.integral(), -10.0);
    }

    #[test]
    fn derivative_reacts_to_change() {
        let mut pid = PidController::new(
            PidGains {
                kp: 0.0,
                ki: 0.0,
                kd: 1.0,
            },
            5.0,
            10.0,
        );
        assert_eq!(pid.update(0.2, 1.0), 0.0);
        assert!((pid.update(0.5, 1.0) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn reset_clears_state_and_bad_input_is_ignored() {
        let mut pid = PidController::new(gains(), 1.0, 10.0);
        pid.update(1.0, 1.0);
        pid.reset();
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.update(f64::NAN, 1.0), 0.0);
        assert_eq!(pid.update(1.0, 0.0), 0.0);
        assert_eq!(pid.integral(), 0.0);
    }
}
