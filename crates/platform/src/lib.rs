//! Hardware Abstraction Layer (HAL) for charger and power-path drivers
//!
//! This crate provides the trait-based seams a charger driver is written
//! against, so the driver can be developed and tested without hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Host frameworks (regulator / power-supply adapters, scheduler)
//!         ↓
//! Driver crates (bq2429x)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Bus Layer (embedded-hal-async I2C)
//! ```
//!
//! # Abstractions
//!
//! - [`peripheral`] - 8-bit register transport ([`RegisterBus`]) and its
//!   I2C binding ([`I2cRegisterBus`])
//! - [`power`] - regulator and power-supply capability sets, supply events
//! - `mocks` - in-memory register file and event sink (`std` feature / tests)
//!
//! # Features
//!
//! - `std`: Enable standard library support and the mocks (for testing)
//! - `defmt`: Enable defmt logging derives
//!
//! # Example
//!
//! ```no_run
//! use platform::{I2cRegisterBus, RegisterBus};
//!
//! async fn status<I: embedded_hal_async::i2c::I2c>(i2c: I) -> Option<u8> {
//!     let mut bus = I2cRegisterBus::new(i2c, 0x6B);
//!     bus.read_register(0x08).await.ok()
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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod mocks;
pub mod peripheral;
pub mod power;

// Re-export register transport types
pub use peripheral::{BusError, I2cRegisterBus, RegisterBus};

// Re-export power framework types
pub use power::{
    ChargeType, ChargingStatus, PowerSupply, Regulator, RegulatorDescriptor, RegulatorState,
    SupplyEvent, SupplyEventSink, SupplyProperty, SupplyValue,
};
