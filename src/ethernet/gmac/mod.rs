//! Backend for the GMAC found in the ATSAM4E family
//!
//! ```ignore
//! static mut TX_DESCRIPTORS: TxDescriptorTable<4> = TxDescriptorTable::new();
//! static mut RX_DESCRIPTORS: RxDescriptorTable<8> = RxDescriptorTable::new();
//!
//! let (tx, rx, mac) = gmac::split(
//!     peripherals.GMAC,
//!     clocks.get_master_clock_frequency(),
//!     unsafe { &mut TX_DESCRIPTORS },
//!     unsafe { &mut RX_DESCRIPTORS },
//!     1536,
//! );
//! let emac = Builder::new().set_ethernet_address(address).freeze(tx, rx, mac);
//! ```
//!
//! Descriptor tables and the buffers they point at must live in SRAM. The GMAC clock and the MII
//! pins have to be configured before `init()`.

mod descriptor;
mod dma;
mod mac;

pub use descriptor::{RxDescriptorTable, TxDescriptorTable};
pub use dma::{GmacRxDma, GmacTxDma};
pub use mac::GmacMac;

use crate::pac::{gmac::RegisterBlock, GMAC};
use core::ops::Range;
use fugit::HertzU32;

// The only memory the GMAC's DMA master can reach
const SRAM: Range<usize> = 0x2000_0000..0x2002_0000;

/// Split the peripheral into the parts the engine is composed from.
///
/// `rx_buffer_size` is the number of bytes the GMAC writes into each receive buffer before moving
/// on to the next descriptor. It is rounded down to a multiple of 64.
pub fn split<'a, const TXN: usize, const RXN: usize>(
    gmac: GMAC,
    master_clock: HertzU32,
    tx_descriptors: &'a mut TxDescriptorTable<TXN>,
    rx_descriptors: &'a mut RxDescriptorTable<RXN>,
    rx_buffer_size: usize,
) -> (GmacTxDma<'a, TXN>, GmacRxDma<'a, RXN>, GmacMac) {
    let rx_buffer_size = rx_buffer_size - rx_buffer_size % 64;
    if rx_buffer_size == 0 || rx_buffer_size > 255 * 64 {
        panic!("Invalid receive buffer size {}", rx_buffer_size);
    }

    (
        GmacTxDma::new(tx_descriptors),
        GmacRxDma::new(rx_descriptors, rx_buffer_size),
        GmacMac::new(gmac, master_clock),
    )
}

// The DMA halves share the register block with `GmacMac`, which owns the peripheral. All three
// only ever live inside one engine, so they are never used concurrently.
fn registers() -> &'static RegisterBlock {
    unsafe { &*GMAC::ptr() }
}
