use crate::ethernet::{Duplex, LinkSpeed};

enum BitNumber {
    Speed1Gbps = 6,
    CollisionTest = 7,
    FullDuplex = 8,
    RestartAutoNegotiation = 9,
    Isolate = 10,
    PowerDown = 11,
    EnableAutoNegotiation = 12,
    Speed100Mbps = 13,
    LoopBack = 14,
    Reset = 15,
}

/// Basic Mode Control Register
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct Bmcr(pub(super) u16);
impl Bmcr {
    pub fn new(initial_value: u16) -> Self {
        Bmcr(initial_value)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    fn is_set(&self, bit: BitNumber) -> bool {
        self.0 & (1 << bit as u16) != 0
    }

    pub fn is_reset(&self) -> bool {
        self.is_set(BitNumber::Reset)
    }

    pub fn is_loop_back(&self) -> bool {
        self.is_set(BitNumber::LoopBack)
    }

    pub fn is_auto_negotiation_enabled(&self) -> bool {
        self.is_set(BitNumber::EnableAutoNegotiation)
    }

    pub fn is_powered_down(&self) -> bool {
        self.is_set(BitNumber::PowerDown)
    }

    pub fn is_isolated(&self) -> bool {
        self.is_set(BitNumber::Isolate)
    }

    /// Speed and duplex forced by this register when auto-negotiation is off.
    pub fn forced_link(&self) -> (LinkSpeed, Duplex) {
        let speed = match (
            self.is_set(BitNumber::Speed1Gbps),
            self.is_set(BitNumber::Speed100Mbps),
        ) {
            (true, false) => LinkSpeed::Speed1000Mbps,
            (false, true) => LinkSpeed::Speed100Mbps,
            _ => LinkSpeed::Speed10Mbps,
        };

        let duplex = if self.is_set(BitNumber::FullDuplex) {
            Duplex::Full
        } else {
            Duplex::Half
        };

        (speed, duplex)
    }

    pub fn set_speed_1000(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed1Gbps as u16))
    }

    pub fn set_collision_test(self) -> Self {
        Self(self.0 | (1 << BitNumber::CollisionTest as u16))
    }

    pub fn set_full_duplex(self) -> Self {
        Self(self.0 | (1 << BitNumber::FullDuplex as u16))
    }

    pub fn set_auto_negotiation_restart(self) -> Self {
        Self(self.0 | (1 << BitNumber::RestartAutoNegotiation as u16))
    }

    pub fn set_isolate(self) -> Self {
        Self(self.0 | (1 << BitNumber::Isolate as u16))
    }

    pub fn clear_isolate(self) -> Self {
        Self(self.0 & !(1 << BitNumber::Isolate as u16))
    }

    pub fn set_power_down(self) -> Self {
        Self(self.0 | (1 << BitNumber::PowerDown as u16))
    }

    pub fn clear_power_down(self) -> Self {
        Self(self.0 & !(1 << BitNumber::PowerDown as u16))
    }

    pub fn set_enable_auto_negotiation(self) -> Self {
        Self(self.0 | (1 << BitNumber::EnableAutoNegotiation as u16))
    }

    pub fn set_speed_100(self) -> Self {
        Self(self.0 | (1 << BitNumber::Speed100Mbps as u16))
    }

    pub fn set_loop_back(self) -> Self {
        Self(self.0 | (1 << BitNumber::LoopBack as u16))
    }

    pub fn set_reset(self) -> Self {
        Self(self.0 | (1 << BitNumber::Reset as u16))
    }
}
