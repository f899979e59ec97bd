//! Generic Ethernet MAC/DMA engine for microcontroller Ethernet peripherals
//!
//! This crate manages the rings of transmit and receive descriptors shared between software and an
//! Ethernet DMA engine, enforces the ownership handshake between the CPU and the hardware, and turns
//! interrupt events into frame-transmitted / frame-received notifications for the network stack
//! sitting above it.
//!
//! Everything chip specific (descriptor layout, register writes, MDIO bus, interrupt status) is
//! supplied by a backend implementing the traits in [`ethernet::backend`]. A backend for the GMAC
//! found in the ATSAM4E family is included when one of the `atsam4e*` chip features is enabled.
//!
//! # Usage
//!
//! Clocks and pins for the peripheral must be configured before the backend is constructed. The
//! backend parts are then composed into an [`ethernet::CompositeEmac`], usually through an
//! [`ethernet::Builder`]:
//!
//! 1. `init()` resets the peripheral and primes the receive ring.
//! 2. `enable()` (or [`ethernet::CompositeEmac::poll_link`]) turns on the MAC once the PHY reports
//!    a link.
//! 3. The interrupt handler calls [`ethernet::CompositeEmac::on_interrupt`].

#![cfg_attr(not(test), no_std)]

#[cfg(feature = "atsam4e8c")]
pub use atsam4e8c_pac as pac;
#[cfg(feature = "atsam4e8e")]
pub use atsam4e8e_pac as pac;
#[cfg(feature = "atsam4e16c")]
pub use atsam4e16c_pac as pac;
#[cfg(feature = "atsam4e16e")]
pub use atsam4e16e_pac as pac;

pub mod ethernet;
