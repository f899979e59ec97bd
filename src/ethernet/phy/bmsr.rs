enum BitNumbers {
    ExtendedCapability = 0,
    JabberDetected = 1,
    LinkDetected = 2,
    AutoNegotiationCapable = 3,
    RemoteFaultDetected = 4,
    AutoNegotiationComplete = 5,
    PreambleSuppressionCapable = 6,
    HalfDuplex10BaseTCapable = 11,
    FullDuplex10BaseTCapable = 12,
    HalfDuplex100BaseTXCapable = 13,
    FullDuplex100BaseTXCapable = 14,
}

/// Basic Mode Status Register
///
/// Link status and jabber latch until read, so a fresh reading needs two reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Bmsr(u16);
impl Bmsr {
    pub fn new(initial_value: u16) -> Self {
        Bmsr(initial_value)
    }

    fn is_set(&self, bit: BitNumbers) -> bool {
        self.0 & (1 << bit as u16) != 0
    }

    pub fn has_extended_capability(&self) -> bool {
        self.is_set(BitNumbers::ExtendedCapability)
    }

    pub fn jabber_detected(&self) -> bool {
        self.is_set(BitNumbers::JabberDetected)
    }

    pub fn link_detected(&self) -> bool {
        self.is_set(BitNumbers::LinkDetected)
    }

    pub fn auto_negotiation_capable(&self) -> bool {
        self.is_set(BitNumbers::AutoNegotiationCapable)
    }

    pub fn remote_fault_detected(&self) -> bool {
        self.is_set(BitNumbers::RemoteFaultDetected)
    }

    pub fn auto_negotiation_complete(&self) -> bool {
        self.is_set(BitNumbers::AutoNegotiationComplete)
    }

    pub fn preamble_suppression_capable(&self) -> bool {
        self.is_set(BitNumbers::PreambleSuppressionCapable)
    }

    pub fn half_duplex_10base_t_capable(&self) -> bool {
        self.is_set(BitNumbers::HalfDuplex10BaseTCapable)
    }

    pub fn full_duplex_10base_t_capable(&self) -> bool {
        self.is_set(BitNumbers::FullDuplex10BaseTCapable)
    }

    pub fn half_duplex_100base_tx_capable(&self) -> bool {
        self.is_set(BitNumbers::HalfDuplex100BaseTXCapable)
    }

    pub fn full_duplex_100base_tx_capable(&self) -> bool {
        self.is_set(BitNumbers::FullDuplex100BaseTXCapable)
    }
}
