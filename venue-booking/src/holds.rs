//! Time-bounded exclusive seat locks. The only component allowed to mutate
//! lock-store state.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use venue_core::models::{
    AuthoritativeMark, AuthoritativeStatus, BookingIndex, HoldRecord, SeatRef,
};
use venue_core::ports::{BoxError, LockStore};

const HOLD_KEY_PREFIX: &str = "hold:seat:";
const BOOKING_KEY_PREFIX: &str = "booking:";
const STATUS_KEY_PREFIX: &str = "seat:status:";

/// Result of a batch acquisition attempt. Contention carries the seat that
/// lost the race so callers can name it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiHoldOutcome {
    Acquired,
    Contended { seat_id: String },
}

/// A live hold resolved from the reverse index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldSeat {
    pub seat_id: String,
    pub section_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingHolds {
    pub booking_id: Uuid,
    pub user_id: String,
    pub seats: Vec<HeldSeat>,
}

pub struct HoldManager {
    locks: Arc<dyn LockStore>,
    ttl_seconds: u64,
}

impl HoldManager {
    pub fn new(locks: Arc<dyn LockStore>, ttl_seconds: u64) -> Self {
        Self { locks, ttl_seconds }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Epoch-millisecond deadline a hold created now would carry.
    pub fn hold_until_ms(&self) -> i64 {
        Utc::now().timestamp_millis() + (self.ttl_seconds as i64) * 1000
    }

    fn hold_key(seat_id: &str) -> String {
        format!("{}{}", HOLD_KEY_PREFIX, seat_id)
    }

    fn booking_key(booking_id: Uuid) -> String {
        format!("{}{}", BOOKING_KEY_PREFIX, booking_id)
    }

    fn status_key(seat_id: &str) -> String {
        format!("{}{}", STATUS_KEY_PREFIX, seat_id)
    }

    /// Attempt an atomic set-if-absent hold on one seat. Returns false on
    /// contention; contention is not an error.
    pub async fn create_hold(
        &self,
        seat_id: &str,
        user_id: &str,
        booking_id: Uuid,
        section_id: &str,
    ) -> Result<bool, BoxError> {
        let record = HoldRecord {
            user_id: user_id.to_string(),
            booking_id,
            section_id: section_id.to_string(),
            expires_at_ms: self.hold_until_ms(),
        };
        let value = serde_json::to_string(&record)?;

        let acquired = self
            .locks
            .set_if_absent(&Self::hold_key(seat_id), &value, self.ttl_seconds)
            .await?;
        if !acquired {
            return Ok(false);
        }

        let index = BookingIndex {
            seat_ids: vec![seat_id.to_string()],
        };
        self.locks
            .set(
                &Self::booking_key(booking_id),
                &serde_json::to_string(&index)?,
                Some(self.ttl_seconds),
            )
            .await?;
        Ok(true)
    }

    /// Acquire every seat in the batch under one booking id, or none of them.
    /// Optimistic sequential acquisition with compensating rollback, not a
    /// two-phase commit: a concurrent reader may transiently see some seats
    /// of a losing batch as held before the rollback lands. Reads only gate
    /// display, so the window is acceptable.
    pub async fn create_multiple_holds(
        &self,
        seats: &[SeatRef],
        user_id: &str,
        booking_id: Uuid,
    ) -> Result<MultiHoldOutcome, BoxError> {
        let expires_at_ms = self.hold_until_ms();
        let mut acquired: Vec<String> = Vec::with_capacity(seats.len());

        for seat in seats {
            let record = HoldRecord {
                user_id: user_id.to_string(),
                booking_id,
                section_id: seat.section_id.clone(),
                expires_at_ms,
            };
            let value = serde_json::to_string(&record)?;

            let result = self
                .locks
                .set_if_absent(&Self::hold_key(&seat.seat_id), &value, self.ttl_seconds)
                .await;

            match result {
                Ok(true) => acquired.push(seat.seat_id.clone()),
                Ok(false) => {
                    self.rollback_holds(&acquired, booking_id).await;
                    return Ok(MultiHoldOutcome::Contended {
                        seat_id: seat.seat_id.clone(),
                    });
                }
                Err(e) => {
                    self.rollback_holds(&acquired, booking_id).await;
                    return Err(e);
                }
            }
        }

        let index = BookingIndex {
            seat_ids: acquired,
        };
        self.locks
            .set(
                &Self::booking_key(booking_id),
                &serde_json::to_string(&index)?,
                Some(self.ttl_seconds),
            )
            .await?;
        Ok(MultiHoldOutcome::Acquired)
    }

    /// Compensating rollback for a failed batch. Every delete is attempted;
    /// deletes that fail are logged and left to the store TTL, which bounds
    /// how long a leaked lock can live.
    async fn rollback_holds(&self, seat_ids: &[String], booking_id: Uuid) {
        let mut failed = 0usize;
        for seat_id in seat_ids {
            if let Err(e) = self.locks.delete(&Self::hold_key(seat_id)).await {
                failed += 1;
                warn!(seat_id = %seat_id, error = %e, "rollback delete failed");
            }
        }
        if let Err(e) = self.locks.delete(&Self::booking_key(booking_id)).await {
            failed += 1;
            warn!(booking_id = %booking_id, error = %e, "rollback index delete failed");
        }
        if failed > 0 {
            warn!(
                booking_id = %booking_id,
                failed, "hold rollback left entries behind; TTL will clear them"
            );
        }
    }

    /// Read one hold, validating the structured record and re-checking its
    /// wall-clock expiry. Expired or malformed records read as absent.
    pub async fn get_hold(&self, seat_id: &str) -> Result<Option<HoldRecord>, BoxError> {
        let key = Self::hold_key(seat_id);
        let raw = match self.locks.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let record: HoldRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(seat_id = %seat_id, error = %e, "discarding malformed hold record");
                self.locks.delete(&key).await?;
                return Ok(None);
            }
        };

        if record.is_expired(Utc::now().timestamp_millis()) {
            self.locks.delete(&key).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Resolve a booking id back to its live held seats via the reverse
    /// index. Returns None when the index is gone or no hold is still live.
    pub async fn get_hold_by_booking_id(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<BookingHolds>, BoxError> {
        let key = Self::booking_key(booking_id);
        let raw = match self.locks.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let index: BookingIndex = match serde_json::from_str(&raw) {
            Ok(index) => index,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "discarding malformed booking index");
                self.locks.delete(&key).await?;
                return Ok(None);
            }
        };

        let mut user_id = None;
        let mut seats = Vec::new();
        for seat_id in &index.seat_ids {
            if let Some(hold) = self.get_hold(seat_id).await? {
                user_id.get_or_insert(hold.user_id);
                seats.push(HeldSeat {
                    seat_id: seat_id.clone(),
                    section_id: hold.section_id,
                });
            }
        }

        match user_id {
            Some(user_id) if !seats.is_empty() => Ok(Some(BookingHolds {
                booking_id,
                user_id,
                seats,
            })),
            _ => Ok(None),
        }
    }

    /// Owner-checked release. A caller that does not own the hold gets a
    /// no-op and false, so a late duplicate release can never clear another
    /// booking's in-flight lock.
    pub async fn release_hold(&self, seat_id: &str, user_id: &str) -> Result<bool, BoxError> {
        let hold = match self.get_hold(seat_id).await? {
            Some(hold) => hold,
            None => return Ok(false),
        };
        if hold.user_id != user_id {
            debug!(seat_id = %seat_id, "release refused: caller does not own the hold");
            return Ok(false);
        }

        self.locks.delete(&Self::hold_key(seat_id)).await?;
        self.locks
            .delete(&Self::booking_key(hold.booking_id))
            .await?;
        Ok(true)
    }

    pub async fn is_held(&self, seat_id: &str) -> Result<bool, BoxError> {
        Ok(self.get_hold(seat_id).await?.is_some())
    }

    /// Mark a seat as booked ahead of durable persistence. Idempotent, no
    /// expiry; the mark keeps the booking linkage so it stays resolvable
    /// after the hold's TTL-bound index disappears.
    pub async fn set_authoritatively_booked(
        &self,
        seat_id: &str,
        booking_id: Uuid,
        user_id: &str,
    ) -> Result<(), BoxError> {
        let mark = AuthoritativeMark {
            booking_id,
            user_id: user_id.to_string(),
        };
        self.locks
            .set(
                &Self::status_key(seat_id),
                &serde_json::to_string(&mark)?,
                None,
            )
            .await
    }

    /// Ephemeral view of a seat: mark beats hold beats nothing. None means
    /// "fall back to the durable status".
    pub async fn authoritative_status(
        &self,
        seat_id: &str,
    ) -> Result<Option<AuthoritativeStatus>, BoxError> {
        if let Some(raw) = self.locks.get(&Self::status_key(seat_id)).await? {
            match serde_json::from_str::<AuthoritativeMark>(&raw) {
                Ok(_) => return Ok(Some(AuthoritativeStatus::Booked)),
                Err(e) => {
                    warn!(seat_id = %seat_id, error = %e, "discarding malformed booked mark");
                    self.locks.delete(&Self::status_key(seat_id)).await?;
                }
            }
        }
        if self.is_held(seat_id).await? {
            return Ok(Some(AuthoritativeStatus::Held));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::join_all;
    use venue_core::memory::InMemoryLockStore;

    fn manager(ttl: u64) -> Arc<HoldManager> {
        Arc::new(HoldManager::new(Arc::new(InMemoryLockStore::new()), ttl))
    }

    fn seat(seat_id: &str, section_id: &str) -> SeatRef {
        SeatRef {
            seat_id: seat_id.to_string(),
            section_id: section_id.to_string(),
        }
    }

    #[tokio::test]
    async fn concurrent_acquisition_has_one_winner() {
        let manager = manager(120);
        let attempts = (0..16).map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .create_hold("A1", &format!("user-{}", i), Uuid::new_v4(), "A")
                    .await
                    .unwrap()
            })
        });

        let wins = join_all(attempts)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();
        assert_eq!(wins, 1);
        assert!(manager.is_held("A1").await.unwrap());
    }

    #[tokio::test]
    async fn multi_hold_shares_booking_id() {
        let manager = manager(120);
        let booking_id = Uuid::new_v4();
        let seats = vec![seat("B1", "B"), seat("B2", "B"), seat("B3", "B")];

        let outcome = manager
            .create_multiple_holds(&seats, "u3", booking_id)
            .await
            .unwrap();
        assert_eq!(outcome, MultiHoldOutcome::Acquired);

        for s in &seats {
            let hold = manager.get_hold(&s.seat_id).await.unwrap().unwrap();
            assert_eq!(hold.booking_id, booking_id);
            assert_eq!(hold.user_id, "u3");
        }

        let resolved = manager
            .get_hold_by_booking_id(booking_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.seats.len(), 3);
        assert_eq!(resolved.user_id, "u3");
    }

    #[tokio::test]
    async fn multi_hold_rolls_back_on_contention() {
        let manager = manager(120);

        // B2 already belongs to someone else.
        assert!(manager
            .create_hold("B2", "other", Uuid::new_v4(), "B")
            .await
            .unwrap());

        let booking_id = Uuid::new_v4();
        let seats = vec![seat("B1", "B"), seat("B2", "B"), seat("B3", "B")];
        let outcome = manager
            .create_multiple_holds(&seats, "u3", booking_id)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            MultiHoldOutcome::Contended {
                seat_id: "B2".to_string()
            }
        );

        // Nothing of the losing batch remains.
        assert!(!manager.is_held("B1").await.unwrap());
        assert!(!manager.is_held("B3").await.unwrap());
        assert!(manager
            .get_hold_by_booking_id(booking_id)
            .await
            .unwrap()
            .is_none());

        // The pre-existing hold is untouched.
        let survivor = manager.get_hold("B2").await.unwrap().unwrap();
        assert_eq!(survivor.user_id, "other");
    }

    #[tokio::test]
    async fn expired_hold_reads_as_absent() {
        let manager = manager(0);
        let booking_id = Uuid::new_v4();
        assert!(manager
            .create_hold("A1", "u1", booking_id, "A")
            .await
            .unwrap());

        assert!(manager.get_hold("A1").await.unwrap().is_none());
        assert!(!manager.is_held("A1").await.unwrap());
        assert!(manager
            .get_hold_by_booking_id(booking_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn release_is_owner_checked() {
        let manager = manager(120);
        let booking_id = Uuid::new_v4();
        assert!(manager
            .create_hold("A1", "u1", booking_id, "A")
            .await
            .unwrap());

        assert!(!manager.release_hold("A1", "intruder").await.unwrap());
        assert!(manager.is_held("A1").await.unwrap());

        assert!(manager.release_hold("A1", "u1").await.unwrap());
        assert!(!manager.is_held("A1").await.unwrap());
        assert!(manager
            .get_hold_by_booking_id(booking_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn malformed_hold_record_is_discarded() {
        let locks = Arc::new(InMemoryLockStore::new());
        let manager = HoldManager::new(locks.clone(), 120);

        locks
            .set("hold:seat:A1", "not-json", Some(120))
            .await
            .unwrap();
        assert!(manager.get_hold("A1").await.unwrap().is_none());

        // The slot is reclaimable after the discard.
        assert!(manager
            .create_hold("A1", "u1", Uuid::new_v4(), "A")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn mark_takes_precedence_over_hold() {
        let manager = manager(120);
        let booking_id = Uuid::new_v4();
        assert!(manager
            .create_hold("A1", "u1", booking_id, "A")
            .await
            .unwrap());
        assert_eq!(
            manager.authoritative_status("A1").await.unwrap(),
            Some(AuthoritativeStatus::Held)
        );

        manager
            .set_authoritatively_booked("A1", booking_id, "u1")
            .await
            .unwrap();
        assert_eq!(
            manager.authoritative_status("A1").await.unwrap(),
            Some(AuthoritativeStatus::Booked)
        );

        // Mark survives the hold's release.
        manager.release_hold("A1", "u1").await.unwrap();
        assert_eq!(
            manager.authoritative_status("A1").await.unwrap(),
            Some(AuthoritativeStatus::Booked)
        );
    }

    #[tokio::test]
    async fn no_hold_no_mark_means_fall_back_to_durable() {
        let manager = manager(120);
        assert_eq!(manager.authoritative_status("Z9").await.unwrap(), None);
    }
}
