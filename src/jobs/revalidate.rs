//! Background session revalidation.
//!
//! A uniquely-scheduled periodic task that asks the backend whether the
//! current session token is still valid and raises a status notification
//! either way. The job is advisory: it never mutates session state itself.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::catalog::CatalogClient;

/// Minimum scheduling period, matching the platform minimum the original
/// background scheduler enforced.
pub const MIN_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Sink for user-visible status notifications.
pub trait Notifier: Send + Sync + 'static {
  fn notify(&self, valid: bool, message: &str);
}

/// Notifier that reports through the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, valid: bool, message: &str) {
    if valid {
      info!("{}", message);
    } else {
      warn!("{}", message);
    }
  }
}

/// Clamp a requested period to the scheduler minimum.
pub fn effective_period(requested: Duration) -> Duration {
  requested.max(MIN_PERIOD)
}

/// Handle for the uniquely-named revalidation job.
///
/// Scheduling again replaces the running instance. The first check fires
/// immediately, then once per period.
pub struct RevalidateJob {
  handle: Option<JoinHandle<()>>,
}

impl RevalidateJob {
  pub fn new() -> Self {
    Self { handle: None }
  }

  pub fn schedule_unique(
    &mut self,
    client: CatalogClient,
    notifier: Arc<dyn Notifier>,
    period: Duration,
  ) {
    self.cancel();

    let period = effective_period(period);
    self.handle = Some(tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

      loop {
        ticker.tick().await;

        if client.validate_session().await {
          notifier.notify(true, "Your session token is still valid");
        } else {
          notifier.notify(false, "Your session token is no longer valid");
        }
      }
    }));
  }

  pub fn cancel(&mut self) {
    if let Some(handle) = self.handle.take() {
      handle.abort();
    }
  }
}

impl Drop for RevalidateJob {
  fn drop(&mut self) {
    self.cancel();
  }
}
