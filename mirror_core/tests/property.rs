use std::sync::Arc;

use mirror_core::mocks::RecordingLight;
use mirror_core::{
    DistanceBand, Edge, LightController, LightMode, MAX_DUTY, PresenceCfg, PresenceDetector,
    classify,
};
use mirror_traits::clock::test_clock::TestClock;
use mirror_traits::{ReadFailure, Reading};
use proptest::prelude::*;

proptest! {
    #[test]
    fn classify_matches_band(min in 0.0f32..100.0, width in 0.1f32..200.0, d in -10.0f32..400.0) {
        let band = DistanceBand { min_cm: min, max_cm: min + width };
        let r = Reading::from_cm(d);
        let expected = d >= band.min_cm && d < band.max_cm;
        prop_assert_eq!(classify(r, &band), expected);
        prop_assert!(!classify(Reading::Failed(ReadFailure::Bus), &band));
    }

    #[test]
    fn fade_on_is_monotone_and_exact(steps in 1u32..400, duration_ms in 0u64..2000) {
        let light = RecordingLight::new();
        let mode = LightMode::Fade { duration_ms, steps };
        let mut c = LightController::new(light.clone(), mode, Arc::new(TestClock::new())).unwrap();
        c.on().unwrap();
        let ramp = &light.duties()[1..];
        prop_assert_eq!(ramp.len(), steps as usize);
        prop_assert!(ramp.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(*ramp.last().unwrap(), MAX_DUTY);
    }

    #[test]
    fn fade_off_from_any_level_is_monotone_and_exact(steps in 1u32..400, pct in 1u8..=100) {
        let light = RecordingLight::new();
        let mode = LightMode::Fade { duration_ms: 0, steps };
        let mut c = LightController::new(light.clone(), mode, Arc::new(TestClock::new())).unwrap();
        c.set_brightness(pct).unwrap();
        let skip = light.duties().len();
        c.off().unwrap();
        let ramp = &light.duties()[skip..];
        prop_assert_eq!(ramp.len(), steps as usize);
        prop_assert!(ramp.windows(2).all(|w| w[0] >= w[1]));
        prop_assert_eq!(*ramp.last().unwrap(), 0);
        prop_assert!(!c.is_on());
    }

    #[test]
    fn edges_alternate(samples in proptest::collection::vec((any::<bool>(), 0u64..500), 1..300),
                       activation_ms in 0u64..1000, timeout_ms in 0u64..1000) {
        let mut d = PresenceDetector::new(PresenceCfg { activation_ms, timeout_ms });
        let mut now = 0u64;
        let mut on = false;
        for (p, dt) in samples {
            now += dt;
            match d.update(p, now) {
                Edge::ActivatedNow => { prop_assert!(!on); on = true; }
                Edge::DeactivatedNow => { prop_assert!(on); on = false; }
                Edge::NoChange => {}
            }
        }
    }
}
