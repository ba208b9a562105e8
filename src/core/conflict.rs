//! Conflict checking for reservation date ranges.
//!
//! Ranges are closed on both ends: two bookings that share a single boundary
//! day overlap. Which existing reservations take part is decided by
//! [`ConflictPolicy`].

use crate::{
    config::settings::ConflictPolicy,
    entities::{Reservation, ReservationStatus, reservation},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, prelude::*};

/// True when the inclusive ranges `[a_start, a_end]` and `[b_start, b_end]` share a day.
#[must_use]
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    !(a_end < b_start || a_start > b_end)
}

/// Reservations for `car_id` whose range overlaps `[start, end]`.
///
/// Under [`ConflictPolicy::ActiveOnly`] rejected and cancelled reservations are
/// ignored.
pub async fn get_conflicting_reservations<C>(
    db: &C,
    policy: ConflictPolicy,
    car_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<reservation::Model>>
where
    C: ConnectionTrait,
{
    // Negation of "ends before start or starts after end"
    let mut query = Reservation::find()
        .filter(reservation::Column::CarId.eq(car_id))
        .filter(reservation::Column::StartDate.lte(end))
        .filter(reservation::Column::EndDate.gte(start));

    if policy == ConflictPolicy::ActiveOnly {
        query = query.filter(
            reservation::Column::Status
                .is_not_in([ReservationStatus::Rejected, ReservationStatus::Cancelled]),
        );
    }

    query
        .order_by_asc(reservation::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Whether booking `car_id` for `[start, end]` would collide with an existing reservation.
pub async fn has_conflict<C>(
    db: &C,
    policy: ConflictPolicy,
    car_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(!get_conflicting_reservations(db, policy, car_id, start, end)
        .await?
        .is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_ranges_overlap_boundaries() {
        let s = date(2024, 1, 10);
        let e = date(2024, 1, 15);

        // Sharing a boundary day counts
        assert!(ranges_overlap(s, e, date(2024, 1, 15), date(2024, 1, 20)));
        assert!(ranges_overlap(s, e, date(2024, 1, 5), date(2024, 1, 10)));
        // Containment either way
        assert!(ranges_overlap(s, e, date(2024, 1, 11), date(2024, 1, 12)));
        assert!(ranges_overlap(s, e, date(2024, 1, 1), date(2024, 1, 31)));
        // Adjacent but disjoint
        assert!(!ranges_overlap(s, e, date(2024, 1, 16), date(2024, 1, 20)));
        assert!(!ranges_overlap(s, e, date(2024, 1, 1), date(2024, 1, 9)));
    }

    #[test]
    fn test_ranges_overlap_matches_endpoint_formulation() {
        // Any endpoint of one range inside the other is the same relation for closed ranges
        let within = |d: NaiveDate, lo: NaiveDate, hi: NaiveDate| lo <= d && d <= hi;
        let base = date(2024, 3, 1);
        let day = |n: u64| base + chrono::Days::new(n);
        for a in 0..6 {
            for b in a..6 {
                for c in 0..6 {
                    for d in c..6 {
                        let (s1, e1, s2, e2) = (day(a), day(b), day(c), day(d));
                        let endpoints = within(s1, s2, e2)
                            || within(e1, s2, e2)
                            || within(s2, s1, e1)
                            || within(e2, s1, e1);
                        assert_eq!(ranges_overlap(s1, e1, s2, e2), endpoints);
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_has_conflict_against_stored_reservations() -> Result<()> {
        let (db, car, renter) = setup_with_car_and_renter().await?;
        create_test_reservation(&db, &car.id, &renter.id, date(2030, 5, 10), date(2030, 5, 15))
            .await?;

        let policy = ConflictPolicy::AllStatuses;
        assert!(has_conflict(&db, policy, &car.id, date(2030, 5, 15), date(2030, 5, 18)).await?);
        assert!(has_conflict(&db, policy, &car.id, date(2030, 5, 1), date(2030, 5, 31)).await?);
        assert!(!has_conflict(&db, policy, &car.id, date(2030, 5, 16), date(2030, 5, 18)).await?);
        let (start, end) = (date(2030, 5, 10), date(2030, 5, 15));
        assert!(!has_conflict(&db, policy, "other-car", start, end).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_policy_decides_whether_rejected_blocks() -> Result<()> {
        let (db, car, renter) = setup_with_car_and_renter().await?;
        let booking =
            create_test_reservation(&db, &car.id, &renter.id, date(2030, 5, 10), date(2030, 5, 15))
                .await?;
        assert!(crate::core::reservation::respond_to_reservation(&db, &booking.id, false).await?);

        let (s, e) = (date(2030, 5, 12), date(2030, 5, 13));
        assert!(has_conflict(&db, ConflictPolicy::AllStatuses, &car.id, s, e).await?);
        assert!(!has_conflict(&db, ConflictPolicy::ActiveOnly, &car.id, s, e).await?);

        Ok(())
    }
}
