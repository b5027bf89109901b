use chrono::{DateTime, Utc};
use crate::model::policy::Policy;
use crate::model::user::User;

///
/// The outcome of recording one failed login against an account.
///
/// The counter always increments - the audit trail keeps growing even while the
/// account is locked. The lock timestamp is stamped exactly once, on the
/// failure that takes the counter to the policy's maximum; later failures never
/// extend an existing lock.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Transition {
    /// The account stays (or remains) un-stamped; any pre-existing lock is carried through.
    Counted { failed_attempts: u32, locked_until: Option<DateTime<Utc>> },
    /// This failure is the one that locks the account.
    Locked { failed_attempts: u32, locked_until: DateTime<Utc> },
}

impl Transition {
    pub fn failed_attempts(&self) -> u32 {
        match self {
            Transition::Counted { failed_attempts, .. } => *failed_attempts,
            Transition::Locked { failed_attempts, .. } => *failed_attempts,
        }
    }

    pub fn locked_until(&self) -> Option<DateTime<Utc>> {
        match self {
            Transition::Counted { locked_until, .. } => *locked_until,
            Transition::Locked { locked_until, .. } => Some(*locked_until),
        }
    }
}

///
/// Compute the state transition for one failed login. Pure - the caller applies
/// the result to the store inside its transaction.
///
/// A policy with max_failed_attempts = 0 never locks anyone out.
///
pub fn register_failure(user: &User, policy: &Policy, now: DateTime<Utc>) -> Transition {
    // The counter grows for as long as failures arrive - saturate rather than wrap.
    let failed_attempts = user.failed_login_attempts.saturating_add(1);

    if failed_attempts == policy.max_failed_attempts {
        return Transition::Locked { failed_attempts, locked_until: now + policy.lockout_duration() }
    }

    Transition::Counted { failed_attempts, locked_until: user.locked_until() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy(max_failed_attempts: u32, lockout_duration_minutes: u32) -> Policy {
        Policy {
            max_failed_attempts,
            lockout_duration_minutes,
            ..Policy::default()
        }
    }

    fn user(failed_attempts: u32, locked_until: Option<DateTime<Utc>>) -> User {
        User {
            user_id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            active: true,
            password_hash: "$2b$04$abcdefghijklmnopqrstuv".to_string(),
            password_history: vec![],
            password_changed_at: bson::DateTime::from_chrono(Utc::now()),
            password_expires_at: None,
            failed_login_attempts: failed_attempts,
            account_locked_until: locked_until.map(bson::DateTime::from_chrono),
            password_reset_token: None,
            password_reset_expires_at: None,
            last_login: None,
        }
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_the_account_stays_active_below_the_threshold() {
        // maxFailedAttempts = 3: the first two failures only count.
        let policy = policy(3, 15);

        let first = register_failure(&user(0, None), &policy, now());
        assert_eq!(first, Transition::Counted { failed_attempts: 1, locked_until: None });

        let second = register_failure(&user(1, None), &policy, now());
        assert_eq!(second, Transition::Counted { failed_attempts: 2, locked_until: None });
    }

    #[test]
    fn test_reaching_the_threshold_locks_for_the_policy_duration() {
        let policy = policy(3, 15);

        let third = register_failure(&user(2, None), &policy, now());
        assert_eq!(third, Transition::Locked { failed_attempts: 3, locked_until: now() + Duration::minutes(15) });
    }

    #[test]
    fn test_failures_during_a_lock_never_extend_it() {
        let policy = policy(3, 15);
        let locked_until = now() + Duration::minutes(10);

        // Already past the threshold and still locked - the counter grows, the
        // original timestamp is carried through unchanged.
        let fourth = register_failure(&user(3, Some(locked_until)), &policy, now());
        assert_eq!(fourth, Transition::Counted { failed_attempts: 4, locked_until: Some(locked_until) });
    }

    #[test]
    fn test_failures_after_an_expired_lock_do_not_restamp_it() {
        let policy = policy(3, 15);
        let stale_lock = now() - Duration::minutes(60);

        // The lock has lapsed but wasn't cleared (no successful login yet).
        // Another failure keeps counting without starting a new lock window.
        let next = register_failure(&user(5, Some(stale_lock)), &policy, now());
        assert_eq!(next, Transition::Counted { failed_attempts: 6, locked_until: Some(stale_lock) });
    }

    #[test]
    fn test_the_counter_saturates_at_its_ceiling() {
        let policy = policy(3, 15);

        let next = register_failure(&user(u32::MAX, None), &policy, now());
        assert_eq!(next.failed_attempts(), u32::MAX);
    }

    #[test]
    fn test_a_zero_threshold_disables_lockout() {
        let policy = policy(0, 15);

        for prior in 0..10 {
            match register_failure(&user(prior, None), &policy, now()) {
                Transition::Counted { locked_until, .. } => assert_eq!(locked_until, None),
                Transition::Locked { .. } => panic!("a zero threshold must never lock"),
            }
        }
    }
}
