//! IEEE 802.3 clause 22 PHY access over MDIO

use super::{Duplex, Error, LinkSpeed, Result};
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;

mod anar; // Auto-Negotiation Advertisement / Link Partner Ability
pub use anar::Anar;

mod bmcr; // Basic Mode Control Register
pub use bmcr::Bmcr;

mod bmsr; // Basic Mode Status Register
pub use bmsr::Bmsr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Register {
    Bmcr = 0x00,
    Bmsr = 0x01,
    PhyId1 = 0x02,
    PhyId2 = 0x03,
    Anar = 0x04,
    Anlpar = 0x05,
}

/// Register level access to the management bus.
pub trait Mdio {
    fn read(&mut self, phy: u8, register: Register) -> Result<u16>;
    fn write(&mut self, phy: u8, register: Register, value: u16) -> Result<()>;
}

/// What the PHY reports about the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct LinkStatus {
    /// Resolved speed and duplex, `None` while the link is down or still negotiating.
    pub link: Option<(LinkSpeed, Duplex)>,
    pub remote_fault: bool,
    pub jabber: bool,
}

pub trait Phy {
    fn link_status<M: Mdio>(&mut self, mdio: &mut M) -> Result<LinkStatus>;
}

// BMCR reset self-clears within 0.5 s on compliant parts
const RESET_POLL_LIMIT: usize = 10_000;
const RESET_PULSE_MS: u32 = 10;
const RESET_SETTLE_MS: u32 = 50;

/// Any clause 22 PHY at bus address `ADDRESS`, driven through the standard registers only.
#[derive(Clone, Copy, Debug, Default)]
pub struct GenericPhy<const ADDRESS: u8>;

impl<const ADDRESS: u8> GenericPhy<ADDRESS> {
    pub const fn new() -> Self {
        GenericPhy
    }

    pub fn address(&self) -> u8 {
        ADDRESS
    }

    /// The 32 bit OUI / model / revision identifier.
    pub fn identifier<M: Mdio>(&mut self, mdio: &mut M) -> Result<u32> {
        let high = mdio.read(ADDRESS, Register::PhyId1)?;
        let low = mdio.read(ADDRESS, Register::PhyId2)?;
        Ok(((high as u32) << 16) | low as u32)
    }

    pub fn read_control<M: Mdio>(&mut self, mdio: &mut M) -> Result<Bmcr> {
        mdio.read(ADDRESS, Register::Bmcr).map(Bmcr::new)
    }

    pub fn modify<M: Mdio, F: FnOnce(Bmcr) -> Bmcr>(&mut self, mdio: &mut M, f: F) -> Result<()> {
        let w = self.read_control(mdio)?;
        let new_value = f(w);
        mdio.write(ADDRESS, Register::Bmcr, new_value.0)
    }

    /// Soft reset through BMCR, waiting for the PHY to clear the reset bit.
    pub fn reset<M: Mdio>(&mut self, mdio: &mut M) -> Result<()> {
        mdio.write(ADDRESS, Register::Bmcr, Bmcr::new(0).set_reset().bits())?;

        for _ in 0..RESET_POLL_LIMIT {
            if !self.read_control(mdio)?.is_reset() {
                defmt::debug!("PHY {} reset", ADDRESS);
                return Ok(());
            }
        }

        defmt::warn!("PHY {} stuck in reset", ADDRESS);
        Err(Error::Mdio)
    }

    /// Pulse an active low reset line.
    pub fn hardware_reset<P: OutputPin, D: DelayMs<u32>>(
        &mut self,
        pin: &mut P,
        delay: &mut D,
    ) -> core::result::Result<(), P::Error> {
        pin.set_low()?;
        delay.delay_ms(RESET_PULSE_MS);
        pin.set_high()?;
        delay.delay_ms(RESET_SETTLE_MS);
        Ok(())
    }

    /// Advertise every 10/100 ability and (re)start auto-negotiation.
    pub fn start_auto_negotiation<M: Mdio>(&mut self, mdio: &mut M) -> Result<()> {
        let advertised = Anar::new(0)
            .set_802_3_supported()
            .set_10mbps_half_duplex_supported()
            .set_10mbps_full_duplex_supported()
            .set_100mbps_half_duplex_supported()
            .set_100mbps_full_duplex_supported();
        mdio.write(ADDRESS, Register::Anar, advertised.bits())?;

        self.modify(mdio, |w| {
            w.clear_isolate()
                .clear_power_down()
                .set_enable_auto_negotiation()
                .set_auto_negotiation_restart()
        })
    }

    /// Turn auto-negotiation off and force `speed` / `duplex`.
    pub fn force_link<M: Mdio>(&mut self, mdio: &mut M, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        let mut w = Bmcr::new(0);
        w = match speed {
            LinkSpeed::Speed10Mbps => w,
            LinkSpeed::Speed100Mbps => w.set_speed_100(),
            LinkSpeed::Speed1000Mbps => w.set_speed_1000(),
        };
        if duplex == Duplex::Full {
            w = w.set_full_duplex();
        }
        mdio.write(ADDRESS, Register::Bmcr, w.bits())
    }
}

impl<const ADDRESS: u8> Phy for GenericPhy<ADDRESS> {
    fn link_status<M: Mdio>(&mut self, mdio: &mut M) -> Result<LinkStatus> {
        // The first read flushes the latched bits
        mdio.read(ADDRESS, Register::Bmsr)?;
        let bmsr = Bmsr::new(mdio.read(ADDRESS, Register::Bmsr)?);

        let mut status = LinkStatus {
            link: None,
            remote_fault: bmsr.remote_fault_detected(),
            jabber: bmsr.jabber_detected(),
        };
        if !bmsr.link_detected() {
            return Ok(status);
        }

        let bmcr = self.read_control(mdio)?;
        if !bmcr.is_auto_negotiation_enabled() {
            status.link = Some(bmcr.forced_link());
            return Ok(status);
        }

        if bmsr.auto_negotiation_complete() {
            let advertised = Anar::new(mdio.read(ADDRESS, Register::Anar)?);
            let partner = Anar::new(mdio.read(ADDRESS, Register::Anlpar)?);
            status.link = advertised.resolve(partner);
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_UP: u16 = 1 << 2;
    const AUTO_NEGOTIATION_DONE: u16 = 1 << 5;
    const REMOTE_FAULT: u16 = 1 << 4;

    #[derive(Default)]
    struct Registers {
        values: [u16; 32],
        reset_polls: usize,
    }

    impl Mdio for Registers {
        fn read(&mut self, phy: u8, register: Register) -> Result<u16> {
            assert_eq!(phy, 3);
            let value = self.values[register as usize];
            if register == Register::Bmcr && Bmcr::new(value).is_reset() {
                self.reset_polls += 1;
                if self.reset_polls == 3 {
                    self.values[0] &= !(1 << 15);
                }
            }
            Ok(value)
        }

        fn write(&mut self, phy: u8, register: Register, value: u16) -> Result<()> {
            assert_eq!(phy, 3);
            self.values[register as usize] = value;
            Ok(())
        }
    }

    #[test]
    fn reset_waits_for_bit_to_clear() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        assert!(phy.reset(&mut bus).is_ok());
        assert_eq!(bus.reset_polls, 3);
        assert!(!Bmcr::new(bus.values[0]).is_reset());
    }

    #[test]
    fn auto_negotiation_advertises_all_10_100_modes() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        bus.values[0] = Bmcr::new(0).set_isolate().bits();

        phy.start_auto_negotiation(&mut bus).unwrap();
        assert_eq!(bus.values[Register::Anar as usize], 0x01E1);
        let bmcr = Bmcr::new(bus.values[0]);
        assert!(bmcr.is_auto_negotiation_enabled());
        assert!(!bmcr.is_isolated());
    }

    #[test]
    fn link_down_reports_no_speed() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        bus.values[Register::Bmsr as usize] = REMOTE_FAULT;

        let status = phy.link_status(&mut bus).unwrap();
        assert_eq!(status.link, None);
        assert!(status.remote_fault);
        assert!(!status.jabber);
    }

    #[test]
    fn negotiated_link_uses_common_abilities() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        phy.start_auto_negotiation(&mut bus).unwrap();
        bus.values[Register::Bmsr as usize] = LINK_UP | AUTO_NEGOTIATION_DONE;
        bus.values[Register::Anlpar as usize] = Anar::new(0)
            .set_10mbps_full_duplex_supported()
            .set_10mbps_half_duplex_supported()
            .bits();

        let status = phy.link_status(&mut bus).unwrap();
        assert_eq!(status.link, Some((LinkSpeed::Speed10Mbps, Duplex::Full)));
    }

    #[test]
    fn negotiation_in_progress_is_not_a_link() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        phy.start_auto_negotiation(&mut bus).unwrap();
        bus.values[Register::Bmsr as usize] = LINK_UP;

        assert_eq!(phy.link_status(&mut bus).unwrap().link, None);
    }

    #[test]
    fn forced_link_is_read_back_from_control_register() {
        let mut bus = Registers::default();
        let mut phy = GenericPhy::<3>::new();
        phy.force_link(&mut bus, LinkSpeed::Speed100Mbps, Duplex::Half)
            .unwrap();
        bus.values[Register::Bmsr as usize] = LINK_UP;

        let status = phy.link_status(&mut bus).unwrap();
        assert_eq!(status.link, Some((LinkSpeed::Speed100Mbps, Duplex::Half)));
    }

    #[test]
    fn identifier_joins_both_id_registers() {
        let mut bus = Registers::default();
        bus.values[Register::PhyId1 as usize] = 0x0007;
        bus.values[Register::PhyId2 as usize] = 0xC0F1;
        let mut phy = GenericPhy::<3>::new();
        assert_eq!(phy.identifier(&mut bus), Ok(0x0007_C0F1));
    }
}
