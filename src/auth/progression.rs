use time::{Duration, OffsetDateTime};

use crate::auth::repo_types::User;

pub const CHECKIN_REWARD: i64 = 10;
pub const CHECKIN_COOLDOWN: Duration = Duration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgressionError {
    #[error("already checked in within the last 24 hours")]
    AlreadyCheckedIn,
    #[error("not enough points")]
    InsufficientPoints,
    #[error("upgrade cost must not be negative")]
    NegativeCost,
    #[error("level cannot go any higher")]
    MaxLevel,
}

/// A check-in is allowed only when strictly more than 24h have passed.
pub fn can_check_in(last_checkin: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match last_checkin {
        None => true,
        Some(last) => last < now - CHECKIN_COOLDOWN,
    }
}

/// Grants the daily reward. Leaves `user` untouched on error.
pub fn check_in(user: &mut User, now: OffsetDateTime) -> Result<(), ProgressionError> {
    if !can_check_in(user.last_checkin, now) {
        return Err(ProgressionError::AlreadyCheckedIn);
    }
    user.points += CHECKIN_REWARD;
    user.last_checkin = Some(now);
    Ok(())
}

/// Spends `cost` points for one level. Leaves `user` untouched on error.
pub fn upgrade(user: &mut User, cost: i64) -> Result<(), ProgressionError> {
    if cost < 0 {
        return Err(ProgressionError::NegativeCost);
    }
    if user.points < cost {
        return Err(ProgressionError::InsufficientPoints);
    }
    let level = user.level.checked_add(1).ok_or(ProgressionError::MaxLevel)?;
    user.points -= cost;
    user.level = level;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::sample_user;
    use time::macros::datetime;

    const T: OffsetDateTime = datetime!(2024-03-01 12:00:00 UTC);

    #[test]
    fn first_check_in_is_always_allowed() {
        let mut user = sample_user("a");
        check_in(&mut user, T).unwrap();
        assert_eq!(user.points, 10);
        assert_eq!(user.last_checkin, Some(T));
    }

    #[test]
    fn check_in_cadence_boundaries() {
        let mut user = sample_user("a");
        check_in(&mut user, T).unwrap();

        let early = T + Duration::hours(23) + Duration::minutes(59);
        assert_eq!(check_in(&mut user, early), Err(ProgressionError::AlreadyCheckedIn));
        assert_eq!(user.points, 10);
        assert_eq!(user.last_checkin, Some(T));

        let exactly = T + Duration::hours(24);
        assert_eq!(check_in(&mut user, exactly), Err(ProgressionError::AlreadyCheckedIn));

        let later = T + Duration::hours(24) + Duration::seconds(1);
        check_in(&mut user, later).unwrap();
        assert_eq!(user.points, 20);
        assert_eq!(user.last_checkin, Some(later));
    }

    #[test]
    fn upgrade_with_too_few_points_changes_nothing() {
        let mut user = sample_user("a");
        user.points = 40;
        assert_eq!(upgrade(&mut user, 50), Err(ProgressionError::InsufficientPoints));
        assert_eq!(user.points, 40);
        assert_eq!(user.level, 1);
    }

    #[test]
    fn upgrade_spending_everything() {
        let mut user = sample_user("a");
        user.points = 40;
        upgrade(&mut user, 40).unwrap();
        assert_eq!(user.points, 0);
        assert_eq!(user.level, 2);
    }

    #[test]
    fn zero_cost_upgrade_is_allowed() {
        let mut user = sample_user("a");
        upgrade(&mut user, 0).unwrap();
        assert_eq!(user.level, 2);
        assert_eq!(user.points, 0);
    }

    #[test]
    fn level_never_wraps() {
        let mut user = sample_user("a");
        user.points = 5;
        user.level = i32::MAX;
        assert_eq!(upgrade(&mut user, 1), Err(ProgressionError::MaxLevel));
        assert_eq!(user.points, 5);
        assert_eq!(user.level, i32::MAX);
    }

    #[test]
    fn negative_cost_is_rejected() {
        let mut user = sample_user("a");
        user.points = 5;
        assert_eq!(upgrade(&mut user, -10), Err(ProgressionError::NegativeCost));
        assert_eq!(user.points, 5);
        assert_eq!(user.level, 1);
    }
}
