use super::entity::Actor;

/// Advances one actor by one fixed step.
///
/// Position moves with the velocity of the previous tick before any new force is applied; the
/// one-tick lag is part of the movement feel and the resulting trajectories depend on it.
pub fn integrate(actor: &mut Actor, dt: f64) {
    actor.y = (actor.y + dt * actor.dy).floor();
    actor.x = (actor.x + dt * actor.dx).floor();

    let was_left = actor.dx < 0.0;
    let was_right = actor.dx > 0.0;
    let params = actor.params;

    actor.ddx = 0.0;
    actor.ddy = params.gravity;

    if actor.intents.left {
        actor.ddx -= params.accel;
    } else if was_left {
        actor.ddx += params.friction;
    }

    if actor.intents.right {
        actor.ddx += params.accel;
    } else if was_right {
        actor.ddx -= params.friction;
    }

    if actor.intents.jump && !actor.jumping && !actor.falling {
        actor.ddy -= params.jump;
        actor.jumping = true;
    }

    actor.dx = limit(actor.dx + dt * actor.ddx, -params.max_dx, params.max_dx);
    actor.dy = limit(actor.dy + dt * actor.ddy, -params.max_dy, params.max_dy);

    // Friction overshoot would otherwise flip the direction every other tick.
    if (was_left && actor.dx > 0.0) || (was_right && actor.dx < 0.0) {
        actor.dx = 0.0;
    }
}

fn limit(value: f64, min: f64, max: f64) -> f64 {
    value.min(max).max(min)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::sim::entity::Intents;
    use crate::sim::FIXED_STEP_SECONDS;

    const DT: f64 = FIXED_STEP_SECONDS;

    #[test]
    fn position_uses_previous_velocity_then_floors() {
        let mut actor = Actor::at(10.0, 10.0).with_velocity(-30.0, 90.0);
        integrate(&mut actor, DT);

        // 10 - 0.5 floors to 9, 10 + 1.5 floors to 11.
        assert_eq!(actor.x, 9.0);
        assert_eq!(actor.y, 11.0);
    }

    #[test]
    fn gravity_is_always_applied() {
        let mut actor = Actor::at(0.0, 0.0);
        integrate(&mut actor, DT);

        assert_eq!(actor.ddy, actor.params.gravity);
        assert!((actor.dy - actor.params.gravity * DT).abs() < 1e-9);
    }

    #[test]
    fn held_direction_accelerates() {
        let mut actor = Actor::at(0.0, 0.0).with_intents(Intents::new(false, true, false));
        integrate(&mut actor, DT);

        assert_eq!(actor.ddx, actor.params.accel);
        assert!((actor.dx - actor.params.accel * DT).abs() < 1e-9);
    }

    #[test]
    fn opposing_intents_cancel() {
        let mut actor = Actor::at(0.0, 0.0).with_intents(Intents::new(true, true, false));
        integrate(&mut actor, DT);

        assert_eq!(actor.ddx, 0.0);
        assert_eq!(actor.dx, 0.0);
    }

    #[test]
    fn friction_decays_without_reversing() {
        let mut actor = Actor::at(0.0, 0.0).with_velocity(100.0, 0.0);
        integrate(&mut actor, DT);
        assert!((actor.dx - (100.0 - actor.params.friction * DT)).abs() < 1e-9);

        // 68 -> 36 -> 4 -> would be -28, snapped to 0.
        for _ in 0..3 {
            integrate(&mut actor, DT);
            assert!(actor.dx >= 0.0);
        }
        assert_eq!(actor.dx, 0.0);
    }

    #[test]
    fn small_leftward_velocity_snaps_to_zero() {
        let mut actor = Actor::at(0.0, 0.0).with_velocity(-5.0, 0.0);
        integrate(&mut actor, DT);
        assert_eq!(actor.dx, 0.0);
    }

    #[test]
    fn speed_is_clamped() {
        let mut actor = Actor::at(0.0, 0.0).with_velocity(630.0, 1915.0);
        actor.intents = Intents::new(false, true, false);
        integrate(&mut actor, DT);

        assert_eq!(actor.dx, actor.params.max_dx);
        assert_eq!(actor.dy, actor.params.max_dy);
    }

    #[test]
    fn jump_requires_support() {
        let mut grounded = Actor::at(0.0, 0.0).with_intents(Intents::new(false, false, true));
        integrate(&mut grounded, DT);
        assert!(grounded.jumping);
        assert!(grounded.dy < 0.0);

        let mut airborne = Actor::at(0.0, 0.0).with_intents(Intents::new(false, false, true));
        airborne.falling = true;
        integrate(&mut airborne, DT);
        assert!(!airborne.jumping);
        assert!(airborne.dy > 0.0);
    }

    #[test]
    fn held_jump_does_not_retrigger_mid_air() {
        let mut actor = Actor::at(96.0, 96.0).with_intents(Intents::new(false, false, true));
        integrate(&mut actor, DT);
        let first_dy = actor.dy;

        integrate(&mut actor, DT);

        assert!(actor.jumping);
        assert!(actor.dy > first_dy);
        assert!((actor.dy - (first_dy + actor.params.gravity * DT)).abs() < 1e-9);
    }

    fn intents_strategy() -> impl Strategy<Value = Intents> {
        (any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(left, right, jump)| Intents::new(left, right, jump))
    }

    proptest! {
        #[test]
        fn velocity_never_exceeds_limits(
            script in prop::collection::vec((intents_strategy(), any::<bool>()), 1..200),
        ) {
            let mut actor = Actor::at(500.0, 500.0);
            for (intents, falling) in script {
                actor.intents = intents;
                actor.falling = falling;
                integrate(&mut actor, DT);
                prop_assert!(actor.dx.abs() <= actor.params.max_dx);
                prop_assert!(actor.dy.abs() <= actor.params.max_dy);
            }
        }

        #[test]
        fn friction_alone_never_flips_direction(dx in -640.0f64..640.0) {
            let mut actor = Actor::at(0.0, 0.0).with_velocity(dx, 0.0);
            integrate(&mut actor, DT);
            prop_assert!(actor.dx * dx >= 0.0);
            prop_assert!(actor.dx.abs() <= dx.abs());
        }
    }
}
