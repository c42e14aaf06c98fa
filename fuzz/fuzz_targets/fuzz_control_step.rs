#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use drive_core::mocks::{RecordingActuator, ScriptedPositions};
use drive_core::{Channel, NullReporter, PidGains, build_control_loop};

#[derive(Debug, Arbitrary)]
struct Step {
    advance_ms: u16,
    ticks: [i64; 2],
    targets: [i64; 2],
    halt_left: bool,
}

#[derive(Debug, Arbitrary)]
struct Input {
    kp: f32,
    ki: f32,
    kd: f32,
    max_output: i32,
    steps: Vec<Step>,
}

fuzz_target!(|input: Input| {
    let gains = PidGains {
        kp: input.kp,
        ki: input.ki,
        kd: input.kd,
        max_output: input.max_output,
        ..PidGains::default()
    };
    let act = RecordingActuator::new();
    let pos = ScriptedPositions::new();
    // Invalid gains are rejected at build time; that is fine.
    let Ok(mut ctl) = build_control_loop(act.clone(), pos.clone(), NullReporter, gains, None) else {
        return;
    };
    let bound = ctl.max_error_integral();
    let max_output = input.max_output;

    let mut now = 0i64;
    for s in input.steps {
        now += i64::from(s.advance_ms);
        pos.set(Channel::Left, s.ticks[0]);
        pos.set(Channel::Right, s.ticks[1]);
        if s.halt_left {
            let _ = ctl.halt(Channel::Left);
        }
        let _ = ctl.update_at(s.targets[0], s.targets[1], false, now);
        for ch in Channel::ALL {
            assert!(ctl.channel_state(ch).error_integral.abs() <= bound);
        }
    }
    for ch in Channel::ALL {
        assert!(act.drives(ch).iter().all(|d| d.abs() <= max_output));
    }
});
