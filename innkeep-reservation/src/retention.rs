use chrono::{Days, NaiveDate, Utc};
use innkeep_core::{BookingRepository, CoreError, CoreResult};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

/// Deletes bookings created more than `window_days` ago, whatever their status.
pub struct RetentionSweeper {
    bookings: Arc<dyn BookingRepository>,
    window_days: u32,
    every: Duration,
}

impl RetentionSweeper {
    pub fn new(bookings: Arc<dyn BookingRepository>, window_days: u32, every: Duration) -> CoreResult<Self> {
        if every.is_zero() {
            return Err(CoreError::ValidationFailed("Sweep interval must be greater than zero".to_string()));
        }
        Ok(Self {
            bookings,
            window_days,
            every,
        })
    }

    /// Oldest creation date that survives a sweep on `today`.
    pub fn cutoff(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_sub_days(Days::new(u64::from(self.window_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub async fn run_once(&self, today: NaiveDate) -> CoreResult<u64> {
        let cutoff = self.cutoff(today);
        let purged = self.bookings.purge_created_before(cutoff).await?;
        info!(%cutoff, purged, "retention sweep finished");
        Ok(purged)
    }

    /// Sweeps immediately, then on every tick until the handle is shut down.
    pub fn spawn(self: Arc<Self>) -> SweeperHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(window_days = self.window_days, every_secs = self.every.as_secs(), "retention sweeper started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.run_once(Utc::now().date_naive()).await {
                            error!(error = %e, "retention sweep failed");
                        }
                    }
                }
            }
            info!("retention sweeper stopped");
        });

        SweeperHandle { stop: Some(stop_tx), task }
    }
}

pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "retention sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use innkeep_core::{BookingStatus, CustomerDetails, NewBooking, RoomType, StayDates};
    use innkeep_store::MemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seed(store: &MemoryStore, created_on: NaiveDate, room: u32) -> String {
        let branch = innkeep_core::BranchId(1);
        let room = store.add_room(branch, &room.to_string(), RoomType::Standard).await;
        let booking = store
            .insert_if_room_free(NewBooking {
                booking_ref: format!("ref-{}", created_on),
                customer: CustomerDetails::new("Asha Rao", "9876543210", "asha@example.com").unwrap(),
                branch_id: branch,
                room_id: room.id,
                stay: StayDates::new(date(2024, 6, 1), date(2024, 6, 2)).unwrap(),
                price_minor: 200_000,
                discount_minor: 0,
                created_on,
                booking_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                payment_session_id: None,
            })
            .await
            .unwrap();
        booking.booking_ref
    }

    #[test]
    fn test_cutoff_is_window_days_back() {
        let sweeper = RetentionSweeper::new(Arc::new(MemoryStore::new()), 30, Duration::from_secs(60)).unwrap();
        assert_eq!(sweeper.cutoff(date(2024, 3, 31)), date(2024, 3, 1));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = RetentionSweeper::new(Arc::new(MemoryStore::new()), 30, Duration::ZERO);
        assert!(matches!(result, Err(CoreError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_purges_only_older_than_window_regardless_of_status() {
        let store = Arc::new(MemoryStore::new());
        let today = date(2024, 7, 31);
        let old = seed(&store, date(2024, 6, 30), 101).await;
        let recent = seed(&store, date(2024, 7, 2), 102).await;
        store.cancel_active(&old).await.unwrap();

        let sweeper = RetentionSweeper::new(store.clone(), 30, Duration::from_secs(60)).unwrap();
        assert_eq!(sweeper.run_once(today).await.unwrap(), 1);

        let left = store.bookings().await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].booking_ref, recent);
        assert_eq!(left[0].status, BookingStatus::Active);

        assert_eq!(sweeper.run_once(today).await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs_and_stops() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, date(2000, 1, 1), 101).await;

        let handle = Arc::new(RetentionSweeper::new(store.clone(), 30, Duration::from_secs(3600)).unwrap()).spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.bookings().await.is_empty());

        handle.shutdown().await;
    }
}
