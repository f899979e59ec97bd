use crate::ethernet::{Duplex, LinkSpeed};

#[derive(Clone, Copy)]
enum BitNumber {
    Supports802Dot3 = 0,
    Speed10MbpsHalfDuplex = 5,  // 10BASE-T Half Duplex Support
    Speed10MbpsFullDuplex = 6,  // 10BASE-T Full Duplex Support
    Speed100MbpsHalfDuplex = 7, // 100BASE-TX Half Duplex Support
    Speed100MbpsFullDuplex = 8, // 100BASE-TX Full Duplex Support
    RemoteFault = 13,
}

// Best first
const ABILITIES: [(BitNumber, LinkSpeed, Duplex); 4] = [
    (BitNumber::Speed100MbpsFullDuplex, LinkSpeed::Speed100Mbps, Duplex::Full),
    (BitNumber::Speed100MbpsHalfDuplex, LinkSpeed::Speed100Mbps, Duplex::Half),
    (BitNumber::Speed10MbpsFullDuplex, LinkSpeed::Speed10Mbps, Duplex::Full),
    (BitNumber::Speed10MbpsHalfDuplex, LinkSpeed::Speed10Mbps, Duplex::Half),
];

/// Auto-Negotiation Advertisement Register.
///
/// The link partner ability register (ANLPAR) uses the same layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Anar(pub(super) u16);
impl Anar {
    pub fn new(initial_value: u16) -> Self {
        Anar(initial_value)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn set_802_3_supported(self) -> Self {
        Self(self.0 | (1 << BitNumber::Supports802Dot3 as u16))
    }

    pub fn set_10mbps_half_duplex_supported(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed10MbpsHalfDuplex as u16))
    }

    pub fn set_10mbps_full_duplex_supported(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed10MbpsFullDuplex as u16))
    }

    pub fn set_100mbps_half_duplex_supported(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed100MbpsHalfDuplex as u16))
    }

    pub fn set_100mbps_full_duplex_supported(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed100MbpsFullDuplex as u16))
    }

    pub fn remote_fault(&self) -> bool {
        self.0 & (1 << BitNumber::RemoteFault as u16) != 0
    }

    /// Best speed and duplex both sides advertise.
    pub fn resolve(&self, partner: Anar) -> Option<(LinkSpeed, Duplex)> {
        let common = self.0 & partner.0;
        ABILITIES
            .iter()
            .find(|(bit, _, _)| common & (1 << *bit as u16) != 0)
            .map(|&(_, speed, duplex)| (speed, duplex))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_highest_common_ability() {
        let local = Anar::new(0)
            .set_802_3_supported()
            .set_10mbps_half_duplex_supported()
            .set_10mbps_full_duplex_supported()
            .set_100mbps_half_duplex_supported()
            .set_100mbps_full_duplex_supported();

        let partner = Anar::new(0)
            .set_802_3_supported()
            .set_10mbps_full_duplex_supported()
            .set_100mbps_half_duplex_supported();
        assert_eq!(
            local.resolve(partner),
            Some((LinkSpeed::Speed100Mbps, Duplex::Half))
        );

        let legacy = Anar::new(0).set_10mbps_half_duplex_supported();
        assert_eq!(
            local.resolve(legacy),
            Some((LinkSpeed::Speed10Mbps, Duplex::Half))
        );

        assert_eq!(local.resolve(Anar::new(0x0001)), None);
    }
}
