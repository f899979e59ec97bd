//! Capability contract implemented once per chip
//!
//! The rings and the engine only ever talk to hardware through these traits. Descriptor memory
//! belongs to the backend; the rings decide which slot is touched when and keep track of the
//! buffers referenced by each slot. `N` is the ring depth and is shared between a ring and its
//! backend so a mismatch does not compile.
//!
//! Ownership flags live in memory the DMA engine writes to, so implementations must access them
//! with volatile reads and writes.

use super::{Duplex, Error, InterruptEvents, LinkSpeed, MacAddress, Result};

/// Transmit half of a DMA engine.
pub trait TxDma<const N: usize> {
    /// Descriptors that must always stay owned by software, for engines that cannot tell a full
    /// ring from an empty one.
    const EXTRA_DESCRIPTORS_TO_LEAVE: usize = 0;

    /// Whether one frame may be spread over several consecutive descriptors.
    const SUPPORTS_MULTIPLE_DESCRIPTORS: bool;

    /// Longest buffer a single descriptor can describe.
    const MAX_BUFFER_LEN: usize = usize::MAX;

    /// Point the engine at the (software owned) descriptor table.
    fn start_dma(&mut self);

    /// Stop the engine. Must not return before the engine has stopped touching memory.
    fn stop_dma(&mut self);

    /// Kick an idle engine after descriptors have been handed over.
    fn resume_dma(&mut self) {}

    /// Called while the MAC gates are closed. The engine must continue at descriptor `index`
    /// once they open again, even if closing them rewound its queue pointer.
    fn resync(&mut self, _index: usize) {}

    fn is_owned_by_dma(&self, index: usize) -> bool;

    /// Whether the engine can read `len` bytes at `buffer` (some engines cannot reach every
    /// memory region).
    fn is_dma_readable(&self, _buffer: *const u8, _len: usize) -> bool {
        true
    }

    /// Populate descriptor `index` and flip it to DMA ownership.
    fn give_to_dma(&mut self, index: usize, buffer: *const u8, len: usize, first: bool, last: bool);
}

/// Receive half of a DMA engine.
pub trait RxDma<const N: usize> {
    /// Point the engine at the descriptor table. Called once the ring has been primed.
    fn start_dma(&mut self);

    /// Stop the engine. Must not return before the engine has stopped touching memory.
    fn stop_dma(&mut self);

    /// Restart an engine that stalled because it ran out of descriptors.
    fn resume_dma(&mut self) {}

    /// Called while the MAC gates are closed. The engine must continue at descriptor `index`
    /// once they open again.
    fn resync(&mut self, _index: usize) {}

    /// Whether the engine can write a frame into `len` bytes at `buffer`.
    fn is_dma_writable(&self, _buffer: *mut u8, _len: usize) -> bool {
        true
    }

    fn is_owned_by_dma(&self, index: usize) -> bool;

    /// Whether descriptor `index` holds the start of a frame. Always true on hardware that
    /// stores one frame per descriptor.
    fn is_first(&self, index: usize) -> bool;

    /// Whether descriptor `index` holds the end of a frame. Always true on hardware that stores
    /// one frame per descriptor.
    fn is_last(&self, index: usize) -> bool;

    /// Whether the hardware flagged descriptor `index` as part of a bad frame.
    fn is_error(&self, index: usize) -> bool;

    /// Hand an empty buffer of `len` bytes to descriptor `index` and flip it to DMA ownership.
    fn give_to_dma(&mut self, index: usize, buffer: *mut u8, len: usize);

    /// Length of the frame stored in descriptors `first..=last` (wrapping).
    fn total_len(&self, first: usize, last: usize) -> usize;
}

/// One MDIO (clause 22) bus transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum MdioTransaction {
    Read { phy: u8, register: u8 },
    Write { phy: u8, register: u8, value: u16 },
}

/// Receive filter bits as they should appear in hardware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct FilterMode {
    pub pass_all_multicast: bool,
    pub pass_all_unicast: bool,
}

/// MAC level operations: reset, link gates, address filter, MDIO and interrupt status.
pub trait MacDriver {
    /// Multicast entries available in the address table, not counting the unicast slot 0.
    const MULTICAST_CAPACITY: usize;

    /// Reset the peripheral and program the static configuration. Leaves interrupts off.
    fn init(&mut self) -> Result<()>;

    fn deinit(&mut self) -> Result<()>;

    fn enable_interrupts(&mut self);

    fn disable_interrupts(&mut self);

    /// Whether the hardware can run `speed` at `duplex`.
    fn supports_link(&self, speed: LinkSpeed, _duplex: Duplex) -> bool {
        matches!(speed, LinkSpeed::Speed10Mbps | LinkSpeed::Speed100Mbps)
    }

    /// Apply speed and duplex, then open the Rx and Tx gates.
    fn enable(&mut self, speed: LinkSpeed, duplex: Duplex) -> Result<()>;

    /// Close the Rx and Tx gates. Must be harmless when already disabled.
    fn disable(&mut self) -> Result<()>;

    /// Write an entry of the address table. Slot 0 is the unicast address, slots
    /// `1..=MULTICAST_CAPACITY` the multicast subscriptions.
    fn write_address(&mut self, slot: usize, address: &MacAddress);

    /// Invalidate every address table entry except slot 0.
    fn clear_multicast_addresses(&mut self);

    fn write_filter_mode(&mut self, mode: FilterMode);

    /// Start an MDIO transaction. Only one may be in flight.
    fn mdio_start(&mut self, transaction: MdioTransaction);

    /// Poll the transaction started by `mdio_start`. Returns the register value for reads.
    fn mdio_poll(&mut self) -> nb::Result<u16, Error>;

    /// Read and acknowledge the pending interrupt sources that are part of `mask`.
    fn take_interrupt_events(&mut self, mask: InterruptEvents) -> InterruptEvents;
}
