use courtside::backoff::{jitter_between, JitterMode, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;

fn policy(base_ms: u64, max_ms: u64, multiplier: f64) -> RetryPolicy {
    RetryPolicy::new(
        8,
        Duration::from_millis(base_ms),
        Duration::from_millis(max_ms),
        multiplier,
    )
}

proptest! {
    #[test]
    fn delay_never_exceeds_cap(
        base_ms in 1u64..10_000,
        max_ms in 1u64..300_000,
        multiplier in 1.1f64..10.0,
        attempt in 0u32..128,
    ) {
        let policy = policy(base_ms, max_ms, multiplier);
        prop_assert!(policy.delay_for(attempt) <= policy.max_delay);
    }

    #[test]
    fn delay_is_non_decreasing(
        base_ms in 1u64..10_000,
        max_ms in 1u64..300_000,
        multiplier in 1.1f64..10.0,
        attempt in 0u32..127,
    ) {
        let policy = policy(base_ms, max_ms, multiplier);
        prop_assert!(policy.delay_for(attempt + 1) >= policy.delay_for(attempt));
    }

    #[test]
    fn first_delay_is_base_or_cap(
        base_ms in 1u64..10_000,
        max_ms in 1u64..300_000,
        multiplier in 1.1f64..10.0,
    ) {
        let policy = policy(base_ms, max_ms, multiplier);
        let expected = policy.base_delay.min(policy.max_delay);
        prop_assert_eq!(policy.delay_for(0), expected);
    }

    #[test]
    fn linear_ramp_is_bounded_and_non_decreasing(
        base_ms in 1u64..10_000,
        max_ms in 1u64..300_000,
        attempt in 1u32..64,
    ) {
        let policy = policy(base_ms, max_ms, 2.0);
        let current = policy.linear_delay(attempt);
        let next = policy.linear_delay(attempt + 1);
        prop_assert!(current <= policy.max_delay);
        prop_assert!(next >= current);
    }

    #[test]
    fn equal_jitter_keeps_at_least_half(delay_ms in 2u64..60_000) {
        let delay = Duration::from_millis(delay_ms);
        let sampled = JitterMode::Equal.apply(delay);
        prop_assert!(sampled >= delay.mul_f64(0.5));
        prop_assert!(sampled <= delay);
    }

    #[test]
    fn full_jitter_stays_below_delay(delay_ms in 1u64..60_000) {
        let delay = Duration::from_millis(delay_ms);
        let sampled = JitterMode::Full.apply(delay);
        prop_assert!(sampled <= delay);
    }
}

#[test]
fn degenerate_jitter_bounds_collapse() {
    let delay = Duration::from_millis(25);
    assert_eq!(jitter_between(delay, delay), delay);
    assert_eq!(
        jitter_between(delay, Duration::from_millis(10)),
        delay,
        "inverted bounds fall back to the lower bound"
    );
}
