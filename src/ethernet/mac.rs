use super::{
    backend::{FilterMode, MacDriver, MdioTransaction},
    phy::{Mdio, Register},
    Duplex, Error, LinkSpeed, MacAddress, Result,
};

/// Address filter, link gates and MDIO on top of a [`MacDriver`].
///
/// Keeps the software copy of everything it programs so it can be replayed after a reset and
/// so the filter flags stay independent of each other.
pub struct Mac<M: MacDriver> {
    driver: M,
    own_address: Option<MacAddress>,
    multicast_count: usize,
    pass_all_multicast: bool,
    promiscuous: bool,
    link: Option<(LinkSpeed, Duplex)>,
}

impl<M: MacDriver> Mac<M> {
    pub fn new(driver: M) -> Self {
        Mac {
            driver,
            own_address: None,
            multicast_count: 0,
            pass_all_multicast: false,
            promiscuous: false,
            link: None,
        }
    }

    pub fn driver(&self) -> &M {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut M {
        &mut self.driver
    }

    /// Reset the peripheral. The multicast table and both filter flags start out cleared; a
    /// previously set own address is written again.
    pub fn init(&mut self) -> Result<()> {
        self.driver.init()?;

        self.link = None;
        self.multicast_count = 0;
        self.pass_all_multicast = false;
        self.promiscuous = false;
        self.driver.clear_multicast_addresses();
        self.driver.write_filter_mode(FilterMode::default());

        if let Some(address) = self.own_address {
            self.driver.write_address(0, &address);
        }

        defmt::trace!("Mac::init()");
        Ok(())
    }

    pub fn deinit(&mut self) -> Result<()> {
        self.disable()?;
        self.driver.deinit()
    }

    pub fn set_own_address(&mut self, address: MacAddress) {
        defmt::info!("MAC address: {:?}", address);
        self.own_address = Some(address);
        self.driver.write_address(0, &address);
    }

    pub fn own_address(&self) -> Option<MacAddress> {
        self.own_address
    }

    /// Add `address` to the next free multicast slot.
    pub fn add_multicast_subscription(&mut self, address: MacAddress) -> Result<()> {
        if self.multicast_count >= M::MULTICAST_CAPACITY {
            defmt::warn!("multicast table full, {:?} not added", address);
            return Err(Error::OutOfMemory);
        }

        self.multicast_count += 1;
        self.driver.write_address(self.multicast_count, &address);
        Ok(())
    }

    /// Invalidate every multicast slot. The unicast slot is left alone.
    pub fn clear_multicast_filter(&mut self) {
        self.driver.clear_multicast_addresses();
        self.multicast_count = 0;
    }

    pub fn multicast_subscriptions(&self) -> usize {
        self.multicast_count
    }

    pub fn set_pass_all_multicast(&mut self, enable: bool) {
        self.pass_all_multicast = enable;
        self.write_filter_mode();
    }

    pub fn pass_all_multicast(&self) -> bool {
        self.pass_all_multicast
    }

    pub fn set_promiscuous(&mut self, enable: bool) {
        self.promiscuous = enable;
        self.write_filter_mode();
    }

    pub fn promiscuous(&self) -> bool {
        self.promiscuous
    }

    /// Filter bits as currently programmed. Promiscuous mode implies pass-all multicast in
    /// hardware without touching the pass-all flag itself.
    pub fn filter_mode(&self) -> FilterMode {
        FilterMode {
            pass_all_multicast: self.pass_all_multicast || self.promiscuous,
            pass_all_unicast: self.promiscuous,
        }
    }

    /// Check a link configuration without touching the hardware.
    pub fn check_link(&self, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        // Gigabit is full duplex only
        let gigabit_half = speed == LinkSpeed::Speed1000Mbps && duplex == Duplex::Half;
        if gigabit_half || !self.driver.supports_link(speed, duplex) {
            return Err(Error::InvalidLinkConfig);
        }
        Ok(())
    }

    /// Apply `speed` and `duplex` and open the gates.
    pub fn enable(&mut self, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        self.check_link(speed, duplex)?;

        if self.own_address.is_none() {
            return Err(Error::InvalidState);
        }

        self.driver.enable(speed, duplex)?;
        self.link = Some((speed, duplex));
        defmt::info!("link up {} Mbps {:?}", speed.megabits_per_second(), duplex);
        Ok(())
    }

    /// Close the gates. Does nothing when already disabled.
    pub fn disable(&mut self) -> Result<()> {
        if self.link.is_some() {
            self.driver.disable()?;
            self.link = None;
            defmt::info!("link down");
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<(LinkSpeed, Duplex)> {
        self.link
    }

    pub fn mdio_read(&mut self, phy: u8, register: u8) -> Result<u16> {
        self.driver.mdio_start(MdioTransaction::Read { phy, register });
        nb::block!(self.driver.mdio_poll())
    }

    pub fn mdio_write(&mut self, phy: u8, register: u8, value: u16) -> Result<()> {
        self.driver
            .mdio_start(MdioTransaction::Write { phy, register, value });
        nb::block!(self.driver.mdio_poll()).map(|_| ())
    }

    fn write_filter_mode(&mut self) {
        let mode = self.filter_mode();
        self.driver.write_filter_mode(mode);
    }
}

impl<M: MacDriver> Mdio for Mac<M> {
    fn read(&mut self, phy: u8, register: Register) -> Result<u16> {
        self.mdio_read(phy, register as u8)
    }

    fn write(&mut self, phy: u8, register: Register, value: u16) -> Result<()> {
        self.mdio_write(phy, register as u8, value)
    }
}
