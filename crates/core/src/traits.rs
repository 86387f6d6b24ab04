use crate::{CalibrationProcedure, FetchError};
use chrono::{DateTime, Utc};

/// Time source for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Remote provider of calibration procedures. Implementations must bound
/// their own latency; a failure sends the caller to the offline knowledge base.
pub trait ProcedureSource: Send + Sync {
    fn fetch(
        &self,
        brand: &str,
        model: Option<&str>,
        year: Option<i32>,
    ) -> Result<CalibrationProcedure, FetchError>;
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub(crate) struct ManualClock {
    now: std::sync::Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: std::sync::Mutex::new(Utc::now()),
        }
    }
}

#[cfg(test)]
impl ManualClock {
    pub(crate) fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
