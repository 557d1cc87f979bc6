//! Monotonic clock adapter.
//!
//! Implements [`Clock`] for the controller's tick pacing and waits.
//!
//! - **`feature = "espidf"`**: `esp_timer_get_time()` (microsecond,
//!   monotonic) and a FreeRTOS task delay, so waiting yields the CPU.
//! - **host**: `std::time::Instant` and `std::thread::sleep`.

use crate::app::ports::Clock;

pub struct SystemClock {
    #[cfg(not(feature = "espidf"))]
    start: std::time::Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(feature = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(feature = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since the clock was created (monotonic).
    #[cfg(not(feature = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.uptime_us() / 1000
    }

    #[cfg(feature = "espidf")]
    fn sleep_ms(&self, ms: u64) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms.min(u64::from(u32::MAX)) as u32);
    }

    #[cfg(not(feature = "espidf"))]
    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}
