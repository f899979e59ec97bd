use crate::{
    ethernet::{
        backend::{FilterMode, MacDriver, MdioTransaction},
        Duplex, Error, InterruptEvents, LinkSpeed, MacAddress, Result,
    },
    pac::GMAC,
};
use fugit::HertzU32;
use paste::paste;

macro_rules! define_ethernet_address_function {
    (
        $address_number:expr
    ) => {
        paste! {
            fn [<set_ethernet_address $address_number>](&mut self, ethernet_address: &MacAddress) {
                let bytes = ethernet_address.as_bytes();
                self.gmac.[<sab $address_number>].write(|w| unsafe {
                    w.bits(
                        (bytes[0] as u32) |
                        (bytes[1] as u32) << 8 |
                        (bytes[2] as u32) << 16 |
                        (bytes[3] as u32) << 24
                    )
                });

                // NOTE: Writing the top bits (e.g. satX) enables the address in the hardware.
                self.gmac.[<sat $address_number>].write(|w| unsafe {
                    w.bits(
                        (bytes[4] as u32) |
                        (bytes[5] as u32) << 8
                    )
                });
            }

            // NOTE: Writing only the bottom bits disables the address until satX is written again.
            fn [<disable_ethernet_address $address_number>](&mut self) {
                self.gmac.[<sab $address_number>].write(|w| unsafe { w.bits(0) });
            }
        }
    };
}

/// MAC half of the GMAC: configuration, address filter, MDIO and interrupt status.
pub struct GmacMac {
    gmac: GMAC,
    master_clock: HertzU32,
    // Status read from the clear-on-read ISR that the caller did not ask for yet
    pending: InterruptEvents,
}

impl GmacMac {
    pub(super) fn new(gmac: GMAC, master_clock: HertzU32) -> Self {
        if master_clock > HertzU32::MHz(240) {
            panic!("Invalid master clock frequency")
        }

        GmacMac {
            gmac,
            master_clock,
            pending: InterruptEvents::empty(),
        }
    }

    /// Give the peripheral back. The caller is responsible for calling `deinit` first.
    pub fn free(self) -> GMAC {
        self.gmac
    }

    fn reset(&mut self) {
        self.gmac.ncr.reset();
        self.disable_all_interrupts();
        self.clear_statistics();

        // Clear all bits in the receive status register
        self.gmac.rsr.reset();

        // Clear all bits in the transmit status register
        self.gmac.tsr.reset();

        // Read the interrupt status register to ensure all interrupts are clear
        self.gmac.isr.read();

        // Reset the configuration register
        self.gmac.ncfgr.reset();
    }

    fn disable_all_interrupts(&mut self) {
        self.gmac.idr.write_with_zero(|w| {
            w.mfs()
                .set_bit()
                .rcomp()
                .set_bit()
                .rxubr()
                .set_bit()
                .txubr()
                .set_bit()
                .tur()
                .set_bit()
                .rlex()
                .set_bit()
                .tfc()
                .set_bit()
                .tcomp()
                .set_bit()
                .rovr()
                .set_bit()
                .hresp()
                .set_bit()
                .pfnz()
                .set_bit()
                .ptz()
                .set_bit()
                .pftr()
                .set_bit()
                .exint()
                .set_bit()
                .drqfr()
                .set_bit()
                .sfr()
                .set_bit()
                .drqft()
                .set_bit()
                .sft()
                .set_bit()
                .pdrqfr()
                .set_bit()
                .pdrsfr()
                .set_bit()
                .pdrqft()
                .set_bit()
                .pdrsft()
                .set_bit()
                .sri()
                .set_bit()
                .wol()
                .set_bit()
        });
    }

    fn clear_statistics(&mut self) {
        self.gmac.ncr.modify(|_, w| w.clrstat().set_bit())
    }

    fn wait_for_phy_idle(&self) {
        while !self.gmac.nsr.read().idle().bit() {}
    }

    // Hardware/MAC address manipulation
    define_ethernet_address_function!(1);
    define_ethernet_address_function!(2);
    define_ethernet_address_function!(3);
    define_ethernet_address_function!(4);
}

impl MacDriver for GmacMac {
    // Specific address registers 2 to 4
    const MULTICAST_CAPACITY: usize = 3;

    fn init(&mut self) -> Result<()> {
        self.reset();

        self.gmac.ncfgr.modify(|_, w| {
            w.
                // Don't write frame checksum bytes on received frames to memory.
                rfcs().set_bit().
                // Pause transmission when a non-zero 802.3 pause frame is received.
                pen().set_bit();
            w
        });

        // Management Data Clock must stay below 2.5 MHz
        let mck = self.master_clock;
        self.gmac.ncfgr.modify(|_, w| {
            if mck > HertzU32::MHz(160) {
                w.clk().mck_96()
            } else if mck > HertzU32::MHz(120) {
                w.clk().mck_64()
            } else if mck > HertzU32::MHz(80) {
                w.clk().mck_48()
            } else if mck > HertzU32::MHz(40) {
                w.clk().mck_32()
            } else if mck > HertzU32::MHz(20) {
                w.clk().mck_16()
            } else {
                w.clk().mck_8()
            }
        });

        // Ensure MII mode is set (NOTE: it's clear by default)
        self.gmac.ur.modify(|_, w| w.mii().set_bit());

        self.gmac.ncr.modify(|_, w| w.mpe().set_bit());

        defmt::debug!("GMAC initialized, master clock {} Hz", mck.raw());
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        self.disable_all_interrupts();
        self.gmac.ncr.modify(|_, w| {
            w.rxen().clear_bit().txen().clear_bit().mpe().clear_bit()
        });
        self.pending = InterruptEvents::empty();
        Ok(())
    }

    fn enable_interrupts(&mut self) {
        self.gmac.ier.write_with_zero(|w| {
            w.rcomp()
                .set_bit()
                .rxubr()
                .set_bit()
                .tur()
                .set_bit()
                .rlex()
                .set_bit()
                .tfc()
                .set_bit()
                .tcomp()
                .set_bit()
                .rovr()
                .set_bit()
                .hresp()
                .set_bit()
        });
    }

    fn disable_interrupts(&mut self) {
        self.disable_all_interrupts();
    }

    fn enable(&mut self, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        let fast = match speed {
            LinkSpeed::Speed10Mbps => false,
            LinkSpeed::Speed100Mbps => true,
            LinkSpeed::Speed1000Mbps => return Err(Error::InvalidLinkConfig),
        };
        let full = duplex == Duplex::Full;

        self.gmac.ncfgr.modify(|_, w| w.spd().bit(fast).fd().bit(full));

        // Enable receive and transmit circuits
        self.gmac.ncr.modify(|_, w| w.rxen().set_bit().txen().set_bit());
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.gmac.ncr.modify(|_, w| w.rxen().clear_bit().txen().clear_bit());
        Ok(())
    }

    fn write_address(&mut self, slot: usize, address: &MacAddress) {
        match slot {
            0 => self.set_ethernet_address1(address),
            1 => self.set_ethernet_address2(address),
            2 => self.set_ethernet_address3(address),
            3 => self.set_ethernet_address4(address),
            _ => defmt::warn!("GMAC has no specific address register {}", slot),
        }
    }

    fn clear_multicast_addresses(&mut self) {
        self.disable_ethernet_address2();
        self.disable_ethernet_address3();
        self.disable_ethernet_address4();
    }

    fn write_filter_mode(&mut self, mode: FilterMode) {
        if mode.pass_all_multicast {
            // Every hash bucket set, so any multicast frame matches
            self.gmac.hrb.write(|w| unsafe { w.bits(0xFFFF_FFFF) });
            self.gmac.hrt.write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        }
        self.gmac.ncfgr.modify(|_, w| {
            w.caf()
                .bit(mode.pass_all_unicast)
                .mtihen()
                .bit(mode.pass_all_multicast)
        });
    }

    fn mdio_start(&mut self, transaction: MdioTransaction) {
        self.wait_for_phy_idle();
        match transaction {
            MdioTransaction::Read { phy, register } => {
                self.gmac.man.write(|w| unsafe {
                    w.
                    wtn().bits(0b10).                   // must always be binary 10 (0x02)
                    rega().bits(register).              // phy register to read
                    phya().bits(phy).                   // phy address
                    op().bits(0b01).                    // read = 0b01, write = 0b10
                    cltto().set_bit().
                    wzo().clear_bit() // must be set to zero
                });
            }
            MdioTransaction::Write {
                phy,
                register,
                value,
            } => {
                self.gmac.man.write(|w| unsafe {
                    w.
                    data().bits(value).
                    wtn().bits(0b10).
                    rega().bits(register).
                    phya().bits(phy).
                    op().bits(0b10).
                    cltto().set_bit().
                    wzo().clear_bit()
                });
            }
        }
    }

    fn mdio_poll(&mut self) -> nb::Result<u16, Error> {
        if !self.gmac.nsr.read().idle().bit() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.gmac.man.read().data().bits())
    }

    fn take_interrupt_events(&mut self, mask: InterruptEvents) -> InterruptEvents {
        // Reading the ISR clears it
        let isr = self.gmac.isr.read();
        let mut events = self.pending;

        if isr.tcomp().bit_is_set() {
            events = events.set_tx_complete();
        }
        if isr.rcomp().bit_is_set() {
            events = events.set_rx_frame();
        }
        if isr.rovr().bit_is_set() {
            events = events.set_rx_overrun();
        }
        if isr.rxubr().bit_is_set() {
            events = events.set_rx_buffer_unavailable();
        }
        if isr.tur().bit_is_set() {
            events = events.set_tx_underrun();
        }
        if isr.rlex().bit_is_set() {
            events = events.set_late_collision();
        }
        if isr.tfc().bit_is_set() {
            events = events.set_tx_bus_error();
        }
        if isr.hresp().bit_is_set() {
            let tsr = self.gmac.tsr.read();
            let rsr = self.gmac.rsr.read();
            if rsr.hno().bit_is_set() {
                events = events.set_rx_bus_error();
            }
            if tsr.hresp().bit_is_set() || !rsr.hno().bit_is_set() {
                events = events.set_tx_bus_error();
            }
        }

        // Acknowledge the sticky status bits behind the interrupt
        self.gmac.tsr.write(|w| {
            w.ubr()
                .set_bit()
                .col()
                .set_bit()
                .rle()
                .set_bit()
                .tfc()
                .set_bit()
                .txcomp()
                .set_bit()
                .und()
                .set_bit()
                .hresp()
                .set_bit()
        });
        self.gmac.rsr.write(|w| {
            w.rec()
                .set_bit()
                .rxovr()
                .set_bit()
                .hno()
                .set_bit()
        });

        self.pending = events.difference(mask);
        events.intersection(mask)
    }
}
