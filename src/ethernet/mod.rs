//! Descriptor-ring Ethernet engine
//!
//! The pieces, leaves first:
//!
//! * [`TxRing`] / [`RxRing`]: software bookkeeping for the hardware descriptor rings.
//! * [`Mac`]: address filter, link configuration and MDIO access on top of a [`MacDriver`].
//! * [`CompositeEmac`]: one of each, plus startup/shutdown ordering and interrupt dispatch.
//!
//! The chip specific parts live behind the traits in [`backend`].

pub mod backend;
mod builder;
mod controller;
mod error;
mod interrupt;
mod mac;
pub mod phy;
mod rx;
mod stack;
mod statistics;
mod tx;

#[cfg(feature = "atsam4e")]
pub mod gmac;

#[cfg(test)]
mod test_support;

pub use backend::{FilterMode, MacDriver, MdioTransaction, RxDma, TxDma};
pub use builder::Builder;
pub use controller::{CompositeEmac, State, MULTICAST_GROUP_CAPACITY};
pub use error::{Error, FatalError, LinkFault, Rejected, Result};
pub use interrupt::{InterruptContext, InterruptEvents};
pub use mac::Mac;
pub use rx::{RxBufferPool, RxFragment, RxFrame, RxPollSummary, RxRing};
pub use stack::Stack;
pub use statistics::Statistics;
pub use tx::TxRing;

/// Largest frame the engine expects to move, including the 14 byte header and the 4 byte FCS.
pub const MAX_FRAME_SIZE: usize = 1518;

/// Payload size advertised to the network stack.
pub const MTU: usize = 1500;

/// A 48-bit IEEE 802 MAC address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The all-ones broadcast address.
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// The I/G bit: set for group (multicast and broadcast) addresses.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Line rate of the link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum LinkSpeed {
    Speed10Mbps,
    Speed100Mbps,
    Speed1000Mbps,
}

impl LinkSpeed {
    pub fn megabits_per_second(&self) -> u32 {
        match self {
            LinkSpeed::Speed10Mbps => 10,
            LinkSpeed::Speed100Mbps => 100,
            LinkSpeed::Speed1000Mbps => 1000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Duplex {
    Half,
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_bit_marks_multicast() {
        assert!(MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0xFB]).is_multicast());
        assert!(MacAddress::BROADCAST.is_multicast());
        assert!(!MacAddress::new([0x02, 0x00, 0x00, 0x12, 0x34, 0x56]).is_multicast());
    }

    #[test]
    fn broadcast_is_all_ones() {
        assert!(MacAddress::from([0xFF; 6]).is_broadcast());
        assert!(!MacAddress::default().is_broadcast());
    }
}
