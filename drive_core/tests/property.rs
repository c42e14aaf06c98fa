use drive_core::mocks::{CollectingReporter, RecordingActuator, ScriptedPositions};
use drive_core::{Channel, PidGains, PidChannelState, StepStatus, build_control_loop};
use proptest::prelude::*;

prop_compose! {
    fn gains_strategy()(
        kp in 0.0f32..2.0,
        ki in 0.0001f32..0.05,
        kd in 0.0f32..2.0,
        max_output in 1i32..1024,
        explicit in proptest::option::of(0i64..500_000),
        control_interval_ms in 1u64..50,
    ) -> PidGains {
        PidGains {
            kp,
            ki,
            kd,
            max_output,
            max_error_integral: explicit,
            control_interval_ms,
            report_interval_ms: 250,
        }
    }
}

/// (tick delta, extra ms beyond the interval, target) per step.
fn steps_strategy() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((-2_000i64..2_000, 0i64..40, -50_000i64..50_000), 1..120)
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn integral_and_output_stay_bounded(gains in gains_strategy(), steps in steps_strategy()) {
        let act = RecordingActuator::new();
        let pos = ScriptedPositions::new();
        let interval = gains.control_interval_ms as i64;
        let max_output = gains.max_output;
        let mut ctl = build_control_loop(
            act.clone(),
            pos.clone(),
            CollectingReporter::new(),
            gains,
            None,
        )
        .unwrap();
        let bound = ctl.max_error_integral();

        let (mut now, mut ticks) = (0i64, 0i64);
        for (delta, extra, target) in steps {
            now += interval + extra;
            ticks += delta;
            pos.set(Channel::Left, ticks);
            pos.set(Channel::Right, -ticks);
            let status = ctl.update_at(target, -target, true, now).unwrap();
            prop_assert!(status.stepped().is_some());
            for ch in Channel::ALL {
                prop_assert!(ctl.channel_state(ch).error_integral.abs() <= bound);
            }
        }
        for ch in Channel::ALL {
            for d in act.drives(ch) {
                prop_assert!(d.abs() <= max_output, "duty {} beyond {}", d, max_output);
            }
        }
    }

    #[test]
    fn calls_inside_the_interval_are_inert(
        gains in gains_strategy(),
        offsets in prop::collection::vec(0i64..1_000, 1..50),
        ticks in -10_000i64..10_000,
    ) {
        let act = RecordingActuator::new();
        let pos = ScriptedPositions::new();
        let rep = CollectingReporter::new();
        let interval = gains.control_interval_ms as i64;
        let mut ctl = build_control_loop(act.clone(), pos.clone(), rep.clone(), gains, None).unwrap();

        pos.set_both(ticks);
        for off in offsets {
            let now = off % interval;
            let status = ctl.update_at(500, -500, true, now).unwrap();
            prop_assert!(matches!(status, StepStatus::Skipped(_)));
        }
        prop_assert!(act.calls().is_empty());
        prop_assert!(rep.samples().is_empty());
        prop_assert_eq!(*ctl.channel_state(Channel::Left), PidChannelState::default());
        prop_assert_eq!(*ctl.channel_state(Channel::Right), PidChannelState::default());
    }

    #[test]
    fn halt_never_changes_integral_or_speed(steps in steps_strategy()) {
        let act = RecordingActuator::new();
        let pos = ScriptedPositions::new();
        let mut ctl = build_control_loop(
            act.clone(),
            pos.clone(),
            CollectingReporter::new(),
            PidGains::default(),
            None,
        )
        .unwrap();
        let (mut now, mut ticks) = (0i64, 0i64);
        for (delta, extra, target) in steps {
            now += 20 + extra;
            ticks += delta;
            pos.set_both(ticks);
            ctl.update_at(target, target, false, now).unwrap();
        }
        let before = *ctl.channel_state(Channel::Left);
        ctl.halt(Channel::Left).unwrap();
        let after = *ctl.channel_state(Channel::Left);
        prop_assert_eq!(after.error_integral, before.error_integral);
        prop_assert_eq!(after.last_measured_speed, before.last_measured_speed);
        prop_assert_eq!(after.last_position, before.last_position);
    }
}
