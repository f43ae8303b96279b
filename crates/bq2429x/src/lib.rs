//! BQ24296 / BQ24297 / MP2624 battery charger core
//!
//! Register codec, charger state tracking, the VSYS and OTG regulators and
//! the detection scheduler for the TI BQ2429x family of single-cell
//! switch-mode chargers with USB OTG boost.
//!
//! # Architecture
//!
//! ```text
//! ChargerMonitor (poll timer + interrupt)      Regulator / PowerSupply callers
//!         ↓                                               ↓
//!      Bq2429x::detect ──────── one async Mutex ──── VsysRegulator / OtgRegulator
//!         ↓                                               ↓
//!   ChargerTracker (plan → execute → commit)        register codec
//!         ↓                                               ↓
//!                      platform::RegisterBus (I2C, address 0x6B)
//! ```
//!
//! - [`registers`] - register map, bit fields, decoded status
//! - [`codec`] - physical units to register bits and back
//! - [`tracker`] - VBUS / battery state machine
//! - [`Bq2429x`] - attach, detection pass, charger controls
//! - [`VsysRegulator`], [`OtgRegulator`] - [`platform::Regulator`] outputs
//! - [`supply`] - [`platform::PowerSupply`] properties
//! - [`ChargerMonitor`] - periodic / interrupt scheduling, suspend and
//!   shutdown
//!
//! # Features
//!
//! - `defmt`: defmt logging and `defmt::Format` derives
//!
//! # Example
//!
//! ```no_run
//! use bq2429x::{Bq2429x, ChargerConfig};
//! use embassy_sync::blocking_mutex::raw::NoopRawMutex;
//! use platform::{I2cRegisterBus, Regulator};
//!
//! async fn bring_up<I: embedded_hal_async::i2c::I2c>(i2c: I) {
//!     let bus = I2cRegisterBus::new(i2c, bq2429x::I2C_ADDRESS);
//!     let Ok(charger) = Bq2429x::<_, NoopRawMutex>::attach(bus, ChargerConfig::default()).await
//!     else {
//!         return;
//!     };
//!     let _ = charger.detect().await;
//!     let _ = charger.otg().enable().await;
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod codec;
pub mod config;
mod device;
mod error;
mod monitor;
pub mod registers;
mod regulator;
pub mod supply;
pub mod tracker;

pub use config::{ChargerConfig, ChipVariant, ConfigError, MonitorConfig, I2C_ADDRESS};
pub use device::{Bq2429x, DetectionReport, InputSource, Result};
pub use error::{Error, Precondition};
pub use monitor::{ChargerMonitor, Control};
pub use registers::{ChargeMode, RegisterSnapshot};
pub use regulator::{OtgRegulator, VsysRegulator, OTG_DESCRIPTOR, VSYS_DESCRIPTOR};
