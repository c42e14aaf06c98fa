//! Test and helper mocks for drive_core.
//!
//! Each mock keeps its observable state behind an `Rc<RefCell<..>>` so a test
//! can hand the mock to a controller and keep a handle for inspection.

use std::cell::RefCell;
use std::rc::Rc;

use drive_traits::{Actuator, BoxError, Channel, ControlSample, PositionSource, Reporter};

/// One recorded actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Drive(Channel, i32),
    Halt(Channel),
}

/// Actuator that records every call and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    calls: Rc<RefCell<Vec<ActuatorCall>>>,
    fail: Rc<RefCell<bool>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.calls.borrow().clone()
    }

    /// Duties written to one channel, in order.
    pub fn drives(&self, channel: Channel) -> Vec<i32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match *c {
                ActuatorCall::Drive(ch, d) if ch == channel => Some(d),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Make subsequent calls fail (the call is still recorded).
    pub fn set_fail(&self, on: bool) {
        *self.fail.borrow_mut() = on;
    }

    fn record(&self, call: ActuatorCall) -> Result<(), BoxError> {
        self.calls.borrow_mut().push(call);
        if *self.fail.borrow() {
            return Err(Box::new(std::io::Error::other("actuator fault")));
        }
        Ok(())
    }
}

impl Actuator for RecordingActuator {
    fn drive(&mut self, channel: Channel, duty: i32) -> Result<(), BoxError> {
        self.record(ActuatorCall::Drive(channel, duty))
    }

    fn halt(&mut self, channel: Channel) -> Result<(), BoxError> {
        self.record(ActuatorCall::Halt(channel))
    }
}

/// Position source whose counts are set by the test.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPositions {
    ticks: Rc<RefCell<[i64; 2]>>,
    fail: Rc<RefCell<bool>>,
    reads: Rc<RefCell<u64>>,
}

impl ScriptedPositions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, channel: Channel, ticks: i64) {
        self.ticks.borrow_mut()[channel.index()] = ticks;
    }

    pub fn set_both(&self, ticks: i64) {
        *self.ticks.borrow_mut() = [ticks; 2];
    }

    pub fn set_fail(&self, on: bool) {
        *self.fail.borrow_mut() = on;
    }

    /// Number of `read` calls seen, failed ones included.
    pub fn reads(&self) -> u64 {
        *self.reads.borrow()
    }
}

impl PositionSource for ScriptedPositions {
    fn read(&mut self, channel: Channel) -> Result<i64, BoxError> {
        *self.reads.borrow_mut() += 1;
        if *self.fail.borrow() {
            return Err(Box::new(std::io::Error::other("encoder timeout")));
        }
        Ok(self.ticks.borrow()[channel.index()])
    }
}

/// Reporter that keeps every sample.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    samples: Rc<RefCell<Vec<ControlSample>>>,
    fail: Rc<RefCell<bool>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<ControlSample> {
        self.samples.borrow().clone()
    }

    pub fn set_fail(&self, on: bool) {
        *self.fail.borrow_mut() = on;
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, sample: &ControlSample) -> Result<(), BoxError> {
        if *self.fail.borrow() {
            return Err(Box::new(std::io::Error::other("sink closed")));
        }
        self.samples.borrow_mut().push(*sample);
        Ok(())
    }
}
