//! Simulated differential drivetrain.
//!
//! A first-order motor model per wheel: commanded duty sets a target speed
//! proportional to `duty / max_duty`, and the wheel speed approaches it with
//! time constant `time_constant_ms`. Braking drives the target to zero with a
//! quarter of that time constant. Position integrates speed, so the encoder
//! side of the simulation behaves like a real counter.
//!
//! Time comes from the injected [`Clock`]; with a `ManualClock` the plant is
//! fully deterministic.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use drive_traits::{Actuator, BoxError, Channel, Clock, PositionSource};

use crate::error::HwError;

/// Plant parameters.
#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    /// Steady-state speed at full duty, ticks per second.
    pub max_speed_tps: f64,
    /// Mechanical time constant.
    pub time_constant_ms: f64,
    /// Duty magnitude that means "full power".
    pub max_duty: i32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            max_speed_tps: 3000.0,
            time_constant_ms: 80.0,
            max_duty: 255,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Wheel {
    duty: i32,
    braking: bool,
    speed_tps: f64,
    position: f64,
}

struct Plant {
    clock: Arc<dyn Clock + Send + Sync>,
    last: Instant,
    params: SimParams,
    wheels: [Wheel; 2],
    encoder_fault: bool,
}

impl Plant {
    /// Integrate both wheels up to the current clock time.
    fn advance(&mut self) {
        let now = self.clock.now();
        let dt_s = now.saturating_duration_since(self.last).as_secs_f64();
        self.last = now;
        if dt_s <= 0.0 {
            return;
        }
        let tau_s = (self.params.time_constant_ms / 1000.0).max(1e-6);
        let max_duty = f64::from(self.params.max_duty.max(1));
        for w in &mut self.wheels {
            let (target, tau) = if w.braking {
                (0.0, tau_s / 4.0)
            } else {
                let frac = (f64::from(w.duty) / max_duty).clamp(-1.0, 1.0);
                (frac * self.params.max_speed_tps, tau_s)
            };
            let v0 = w.speed_tps;
            let decay = (-dt_s / tau).exp();
            let v1 = target + (v0 - target) * decay;
            // Exact integral of the exponential approach over dt.
            w.position += target * dt_s + (v0 - target) * tau * (1.0 - decay);
            w.speed_tps = v1;
        }
    }
}

/// Owner of a simulated drivetrain; hands out actuator and encoder views.
#[derive(Clone)]
pub struct SimulatedDrive {
    plant: Rc<RefCell<Plant>>,
}

impl SimulatedDrive {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, params: SimParams) -> Self {
        let last = clock.now();
        Self {
            plant: Rc::new(RefCell::new(Plant {
                clock,
                last,
                params,
                wheels: [Wheel::default(); 2],
                encoder_fault: false,
            })),
        }
    }

    /// Actuator view sharing this plant.
    pub fn actuator(&self) -> SimulatedActuator {
        SimulatedActuator {
            plant: Rc::clone(&self.plant),
        }
    }

    /// Encoder view sharing this plant.
    pub fn encoders(&self) -> SimulatedEncoders {
        SimulatedEncoders {
            plant: Rc::clone(&self.plant),
        }
    }

    /// Make every subsequent encoder read fail with a timeout.
    pub fn set_encoder_fault(&self, on: bool) {
        self.plant.borrow_mut().encoder_fault = on;
    }

    /// Current simulated wheel speed, ticks per second.
    pub fn speed(&self, channel: Channel) -> f64 {
        let mut p = self.plant.borrow_mut();
        p.advance();
        p.wheels[channel.index()].speed_tps
    }

    /// Last duty applied to a wheel (0 while braking).
    pub fn duty(&self, channel: Channel) -> i32 {
        let p = self.plant.borrow();
        let w = p.wheels[channel.index()];
        if w.braking { 0 } else { w.duty }
    }

    pub fn is_braking(&self, channel: Channel) -> bool {
        self.plant.borrow().wheels[channel.index()].braking
    }
}

/// Simulated H-bridge.
pub struct SimulatedActuator {
    plant: Rc<RefCell<Plant>>,
}

impl Actuator for SimulatedActuator {
    fn drive(&mut self, channel: Channel, duty: i32) -> Result<(), BoxError> {
        let mut p = self.plant.borrow_mut();
        p.advance();
        let w = &mut p.wheels[channel.index()];
        w.duty = duty;
        w.braking = false;
        tracing::trace!(%channel, duty, "sim drive");
        Ok(())
    }

    fn halt(&mut self, channel: Channel) -> Result<(), BoxError> {
        let mut p = self.plant.borrow_mut();
        p.advance();
        let w = &mut p.wheels[channel.index()];
        w.duty = 0;
        w.braking = true;
        tracing::debug!(%channel, "sim brake");
        Ok(())
    }
}

/// Simulated quadrature encoders.
pub struct SimulatedEncoders {
    plant: Rc<RefCell<Plant>>,
}

impl PositionSource for SimulatedEncoders {
    fn read(&mut self, channel: Channel) -> Result<i64, BoxError> {
        let mut p = self.plant.borrow_mut();
        if p.encoder_fault {
            return Err(Box::new(HwError::Timeout));
        }
        p.advance();
        // Whole ticks only, like a hardware counter.
        Ok(p.wheels[channel.index()].position.trunc() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drive_traits::ManualClock;
    use std::time::Duration;

    fn drive_with_clock() -> (SimulatedDrive, ManualClock) {
        let clock = ManualClock::new();
        let sim = SimulatedDrive::new(Arc::new(clock.clone()), SimParams::default());
        (sim, clock)
    }

    #[test]
    fn idle_plant_does_not_move() {
        let (sim, clock) = drive_with_clock();
        let mut enc = sim.encoders();
        clock.advance(Duration::from_secs(1));
        assert_eq!(enc.read(Channel::Left).unwrap(), 0);
        assert_eq!(enc.read(Channel::Right).unwrap(), 0);
    }

    #[test]
    fn full_duty_approaches_max_speed() {
        let (sim, clock) = drive_with_clock();
        let mut act = sim.actuator();
        act.drive(Channel::Left, 255).unwrap();
        clock.advance(Duration::from_secs(2));
        let v = sim.speed(Channel::Left);
        assert!((v - 3000.0).abs() < 1.0, "speed {v}");
        assert!(sim.speed(Channel::Right).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_duty_runs_backwards() {
        let (sim, clock) = drive_with_clock();
        let mut act = sim.actuator();
        let mut enc = sim.encoders();
        act.drive(Channel::Right, -128).unwrap();
        clock.advance(Duration::from_millis(500));
        assert!(enc.read(Channel::Right).unwrap() < 0);
    }

    #[test]
    fn brake_stops_quickly() {
        let (sim, clock) = drive_with_clock();
        let mut act = sim.actuator();
        act.drive(Channel::Left, 255).unwrap();
        clock.advance(Duration::from_secs(1));
        act.halt(Channel::Left).unwrap();
        assert!(sim.is_braking(Channel::Left));
        assert_eq!(sim.duty(Channel::Left), 0);
        clock.advance(Duration::from_millis(200));
        assert!(sim.speed(Channel::Left).abs() < 1.0);
    }

    #[test]
    fn encoder_fault_reports_timeout() {
        let (sim, _clock) = drive_with_clock();
        let mut enc = sim.encoders();
        sim.set_encoder_fault(true);
        let err = enc.read(Channel::Left).unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
