//! Detection scheduling: periodic poll plus deferred interrupt work.
//!
//! The host wires the charger's interrupt line to [`ChargerMonitor::on_interrupt`]
//! (falling edge) and spawns [`ChargerMonitor::run`] as a task. Both the poll
//! timer and the interrupt end up in the same [`Bq2429x::detect`] call, so
//! they are serialised by the charger lock.
//!
//! # Example
//!
//! ```ignore
//! static MONITOR: ChargerMonitor<CriticalSectionRawMutex> =
//!     ChargerMonitor::new(MonitorConfig { poll_period: POLL_PERIOD, resume_delay: RESUME_DELAY });
//!
//! #[embassy_executor::task]
//! async fn charger_task(charger: &'static Charger) {
//!     let _ = MONITOR.run(charger, &mut ()).await;
//! }
//!
//! // EXTI handler
//! MONITOR.on_interrupt();
//! ```

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use platform::{RegisterBus, SupplyEventSink};

use crate::config::MonitorConfig;
use crate::device::{Bq2429x, Result};

/// Requests from the power-management side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    /// Stop polling and park until resumed
    Suspend,
    /// Restart polling after the resume delay
    Resume,
    /// Turn OTG off and stop the loop
    Shutdown,
}

/// Scheduler for [`Bq2429x::detect`].
pub struct ChargerMonitor<M: RawMutex> {
    interrupt: Signal<M, ()>,
    control: Signal<M, Control>,
    ack: Signal<M, ()>,
    running: AtomicBool,
    config: MonitorConfig,
}

impl<M: RawMutex> ChargerMonitor<M> {
    /// Create a monitor; nothing runs until [`Self::run`] is polled.
    pub const fn new(config: MonitorConfig) -> Self {
        Self {
            interrupt: Signal::new(),
            control: Signal::new(),
            ack: Signal::new(),
            running: AtomicBool::new(false),
            config,
        }
    }

    /// Timings in use
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Whether [`Self::run`] is currently being polled
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Interrupt hook. Only flags the loop; safe to call from an ISR when
    /// `M` is `CriticalSectionRawMutex`.
    pub fn on_interrupt(&self) {
        self.interrupt.signal(());
    }

    /// Cancel the poll timer and wait until the loop is parked.
    ///
    /// On return no detection pass is in flight and none starts until
    /// [`Self::resume`]. Returns at once when [`Self::run`] is not active.
    pub async fn suspend(&self) {
        self.request(Control::Suspend).await;
    }

    /// Restart polling; the first pass runs after
    /// [`MonitorConfig::resume_delay`].
    pub fn resume(&self) {
        self.control.signal(Control::Resume);
    }

    /// Switch OTG off and stop the loop; returns once [`Self::run`] has
    /// finished its shutdown step, or at once when it is not active.
    pub async fn shutdown(&self) {
        self.request(Control::Shutdown).await;
    }

    async fn request(&self, control: Control) {
        self.ack.reset();
        if !self.is_running() {
            return;
        }
        self.control.signal(control);
        self.ack.wait().await;
    }

    /// Detection loop. Runs the first pass immediately, then every
    /// [`MonitorConfig::poll_period`] and on every interrupt.
    ///
    /// Detection failures are logged and retried on the next tick. Supply
    /// transitions go to `sink` after the charger lock is released. Returns
    /// the outcome of the OTG shutdown once [`Self::shutdown`] is requested.
    pub async fn run<B, RM, S>(&self, charger: &Bq2429x<B, RM>, sink: &mut S) -> Result<(), B>
    where
        B: RegisterBus,
        RM: RawMutex,
        S: SupplyEventSink,
    {
        self.running.store(true, Ordering::Release);
        let _guard = RunGuard { monitor: self };
        let mut deadline = Instant::now();

        loop {
            match select3(
                Timer::at(deadline),
                self.interrupt.wait(),
                self.control.wait(),
            )
            .await
            {
                Either3::First(()) => {
                    Self::pass(charger, sink).await;
                    deadline = after(self.config.poll_period);
                }
                Either3::Second(()) => Self::pass(charger, sink).await,
                Either3::Third(Control::Resume) => {}
                Either3::Third(Control::Suspend) => {
                    #[cfg(feature = "defmt")]
                    defmt::debug!("bq2429x: monitor suspended");
                    self.ack.signal(());
                    if !self.park().await {
                        return self.finish(charger).await;
                    }
                    self.interrupt.reset();
                    deadline = after(self.config.resume_delay);
                }
                Either3::Third(Control::Shutdown) => return self.finish(charger).await,
            }
        }
    }

    /// Wait for resume (true) or shutdown (false).
    async fn park(&self) -> bool {
        loop {
            match self.control.wait().await {
                Control::Resume => return true,
                Control::Shutdown => return false,
                Control::Suspend => self.ack.signal(()),
            }
        }
    }

    async fn finish<B: RegisterBus, RM: RawMutex>(&self, charger: &Bq2429x<B, RM>) -> Result<(), B> {
        let result = charger.shutdown().await;
        #[cfg(feature = "defmt")]
        if let Err(e) = &result {
            defmt::error!("bq2429x: shutdown failed: {}", defmt::Debug2Format(e));
        }
        self.ack.signal(());
        result
    }

    async fn pass<B: RegisterBus, RM: RawMutex, S: SupplyEventSink>(
        charger: &Bq2429x<B, RM>,
        sink: &mut S,
    ) {
        match charger.detect().await {
            Ok(report) => {
                for transition in report.transitions {
                    sink.supply_changed(transition);
                }
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("bq2429x: detection failed: {}", defmt::Debug2Format(&_e));
            }
        }
    }
}

/// Marks the loop stopped and releases any waiting requester, on every exit
/// from [`ChargerMonitor::run`] including cancellation.
struct RunGuard<'a, M: RawMutex> {
    monitor: &'a ChargerMonitor<M>,
}

impl<M: RawMutex> Drop for RunGuard<'_, M> {
    fn drop(&mut self) {
        self.monitor.running.store(false, Ordering::Release);
        self.monitor.ack.signal(());
    }
}

fn after(delay: Duration) -> Instant {
    Instant::now().checked_add(delay).unwrap_or(Instant::MAX)
}
