use super::{
    backend::{MacDriver, RxDma, TxDma},
    CompositeEmac, MacAddress, Stack, MULTICAST_GROUP_CAPACITY,
};
use heapless::Vec;

/// Collects the interface configuration before the engine is built.
///
/// ```ignore
/// let emac = Builder::new()
///     .set_ethernet_address(MacAddress::new([0x02, 0x00, 0x00, 0x12, 0x34, 0x56]))
///     .add_multicast_group(MacAddress::new([0x01, 0x00, 0x5E, 0x00, 0x00, 0xFB]))
///     .freeze(tx_dma, rx_dma, mac);
/// ```
pub struct Builder {
    ethernet_address: Option<MacAddress>,
    multicast_groups: Vec<MacAddress, MULTICAST_GROUP_CAPACITY>,
    promiscuous: bool,
    all_multicast: bool,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            ethernet_address: None,
            multicast_groups: Vec::new(),
            promiscuous: false,
            all_multicast: false,
        }
    }

    pub fn set_ethernet_address(mut self, ethernet_address: MacAddress) -> Self {
        self.ethernet_address = Some(ethernet_address);
        self
    }

    pub fn ethernet_address(&self) -> Option<MacAddress> {
        self.ethernet_address
    }

    pub fn add_multicast_group(mut self, group: MacAddress) -> Self {
        if self.multicast_groups.push(group).is_err() {
            panic!(
                "Attempted to add more than {} multicast groups",
                MULTICAST_GROUP_CAPACITY
            );
        }
        self
    }

    pub fn multicast_groups(&self) -> &[MacAddress] {
        &self.multicast_groups
    }

    pub fn promiscuous(mut self) -> Self {
        self.promiscuous = true;
        self
    }

    pub fn has_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn all_multicast(mut self) -> Self {
        self.all_multicast = true;
        self
    }

    pub fn has_all_multicast(&self) -> bool {
        self.all_multicast
    }

    /// Build the engine. Nothing touches the rings until [`CompositeEmac::init`].
    pub fn freeze<TX, RX, M, S, const TXN: usize, const RXN: usize>(
        self,
        tx: TX,
        rx: RX,
        mac: M,
    ) -> CompositeEmac<TX, RX, M, S, TXN, RXN>
    where
        TX: TxDma<TXN>,
        RX: RxDma<RXN>,
        M: MacDriver,
        S: Stack,
    {
        let mut emac = CompositeEmac::new(tx, rx, mac);

        if let Some(address) = self.ethernet_address {
            emac.set_own_address(address);
        }
        for group in self.multicast_groups.iter() {
            if let Err(error) = emac.join_multicast_group(*group) {
                defmt::warn!("multicast group {} not joined: {:?}", group, error);
            }
        }
        emac.set_promiscuous(self.promiscuous);
        emac.set_all_multicast(self.all_multicast);

        emac
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
