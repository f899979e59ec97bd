use super::{
    backend::{MacDriver, RxDma, TxDma},
    interrupt::InterruptEvents,
    mac::Mac,
    phy::Phy,
    rx::{RxBufferPool, RxRing},
    stack::Stack,
    statistics::Statistics,
    tx::TxRing,
    Duplex, Error, FatalError, LinkFault, LinkSpeed, MacAddress, Rejected, Result,
};
use heapless::Vec;

/// Multicast groups the engine can track, independent of the hardware table size. Groups beyond
/// the hardware table are received through pass-all multicast.
pub const MULTICAST_GROUP_CAPACITY: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum State {
    Uninitialized,
    Initialized,
    Enabled,
    Disabled,
    Deinitialized,
}

// Lends the stack's buffer pool to the receive ring.
struct StackPool<'a, S>(&'a mut S);

impl<'a, S: Stack> RxBufferPool<S::RxBuffer> for StackPool<'a, S> {
    fn alloc(&mut self) -> Option<S::RxBuffer> {
        self.0.alloc_rx_buffer()
    }

    fn free(&mut self, buffer: S::RxBuffer) {
        self.0.free_rx_buffer(buffer)
    }
}

/// One Tx ring, one Rx ring and one MAC, driven as a single Ethernet interface.
pub struct CompositeEmac<TX, RX, M, S, const TXN: usize, const RXN: usize>
where
    TX: TxDma<TXN>,
    RX: RxDma<RXN>,
    M: MacDriver,
    S: Stack,
{
    tx: TxRing<TX, S::TxBuffer, TXN>,
    rx: RxRing<RX, S::RxBuffer, RXN>,
    mac: Mac<M>,
    state: State,
    multicast_groups: Vec<MacAddress, MULTICAST_GROUP_CAPACITY>,
    all_multicast: bool,
    promiscuous: bool,
    statistics: Statistics,
}

impl<TX, RX, M, S, const TXN: usize, const RXN: usize> CompositeEmac<TX, RX, M, S, TXN, RXN>
where
    TX: TxDma<TXN>,
    RX: RxDma<RXN>,
    M: MacDriver,
    S: Stack,
{
    pub fn new(tx: TX, rx: RX, mac: M) -> Self {
        CompositeEmac {
            tx: TxRing::new(tx),
            rx: RxRing::new(rx),
            mac: Mac::new(mac),
            state: State::Uninitialized,
            multicast_groups: Vec::new(),
            all_multicast: false,
            promiscuous: false,
            statistics: Statistics::default(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn mac(&self) -> &Mac<M> {
        &self.mac
    }

    pub fn mac_mut(&mut self) -> &mut Mac<M> {
        &mut self.mac
    }

    pub fn tx_ring(&self) -> &TxRing<TX, S::TxBuffer, TXN> {
        &self.tx
    }

    pub fn rx_ring(&self) -> &RxRing<RX, S::RxBuffer, RXN> {
        &self.rx
    }

    pub fn statistics(&self) -> Statistics {
        Statistics {
            frames_transmitted: self.tx.completed_frames(),
            rx_dropped_frames: self.rx.dropped_frames(),
            ..self.statistics
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            State::Initialized | State::Enabled | State::Disabled
        )
    }

    pub fn set_own_address(&mut self, address: MacAddress) {
        self.mac.set_own_address(address);
    }

    pub fn set_promiscuous(&mut self, enable: bool) {
        self.promiscuous = enable;
        if self.is_active() {
            self.mac.set_promiscuous(enable);
        }
    }

    /// Reset the peripheral, prime the receive ring from `stack` and enable interrupts.
    ///
    /// Fails with [`Error::OutOfMemory`] if the stack cannot supply a buffer for every receive
    /// descriptor, in which case everything is rolled back.
    pub fn init(&mut self, stack: &mut S) -> Result<()> {
        if self.is_active() {
            return Err(Error::InvalidState);
        }

        self.mac.init()?;
        self.mac.set_promiscuous(self.promiscuous);
        self.program_multicast();

        self.tx.start();
        self.rx.rebuild(&mut StackPool(stack));
        if self.rx.is_starved() {
            defmt::warn!(
                "EMAC init: {} of {} Rx descriptors without buffer",
                self.rx.unprimed(),
                RXN
            );
            self.rx.stop(|buffer| stack.free_rx_buffer(buffer));
            self.tx.stop(|buffer| stack.tx_buffer_discarded(buffer));
            if let Err(error) = self.mac.deinit() {
                defmt::warn!("EMAC init rollback: {:?}", error);
            }
            return Err(Error::OutOfMemory);
        }
        self.rx.start();

        // Nothing may fire before both rings are set up
        self.mac.driver_mut().enable_interrupts();
        self.state = State::Initialized;
        defmt::info!("EMAC initialized, {} Tx / {} Rx descriptors", TXN, RXN);
        Ok(())
    }

    /// Open the MAC at `speed` / `duplex`. Reconfigures an already enabled MAC.
    pub fn enable(&mut self, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        if !self.is_active() {
            return Err(Error::InvalidState);
        }

        self.mac.check_link(speed, duplex)?;

        // Speed and duplex may only change while the gates are closed
        self.mac.disable()?;

        // Closing the gates may have rewound the engines to their base descriptor
        self.tx.resync();
        self.rx.resync();

        self.mac.enable(speed, duplex)?;
        self.tx.resume();
        self.state = State::Enabled;
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        if self.state == State::Enabled {
            self.mac.disable()?;
            self.state = State::Disabled;
        }
        Ok(())
    }

    /// Shut everything down and hand every buffer back to `stack`.
    pub fn deinit(&mut self, stack: &mut S) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }

        self.mac.driver_mut().disable_interrupts();
        self.mac.disable()?;
        self.tx.stop(|buffer| stack.tx_buffer_discarded(buffer));
        self.rx.stop(|buffer| stack.free_rx_buffer(buffer));
        self.mac.deinit()?;

        self.state = State::Deinitialized;
        defmt::info!("EMAC deinitialized");
        Ok(())
    }

    pub fn transmit(&mut self, buffer: S::TxBuffer) -> core::result::Result<(), Rejected<S::TxBuffer>> {
        if self.state != State::Enabled {
            return Err(Rejected::new(Error::InvalidState, buffer));
        }
        self.tx.enqueue(buffer, true, true)
    }

    /// Send one frame spread over several buffers.
    pub fn transmit_fragments<const F: usize>(
        &mut self,
        fragments: Vec<S::TxBuffer, F>,
    ) -> core::result::Result<(), Rejected<Vec<S::TxBuffer, F>>> {
        if self.state != State::Enabled {
            return Err(Rejected::new(Error::InvalidState, fragments));
        }
        self.tx.enqueue_frame(fragments)
    }

    /// Handler for a single interrupt line shared by both directions.
    pub fn on_interrupt(&mut self, stack: &mut S) {
        self.service(stack, InterruptEvents::ALL);
    }

    pub fn on_tx_interrupt(&mut self, stack: &mut S) {
        self.service(stack, InterruptEvents::TX);
    }

    pub fn on_rx_interrupt(&mut self, stack: &mut S) {
        self.service(stack, InterruptEvents::RX);
    }

    fn service(&mut self, stack: &mut S, mask: InterruptEvents) {
        let events = self.mac.driver_mut().take_interrupt_events(mask);
        if events.is_empty() {
            return;
        }

        if events.tx_bus_error() {
            defmt::error!("EMAC Tx bus error");
            stack.fatal_error(FatalError::TxBusError);
        }
        if events.rx_bus_error() {
            defmt::error!("EMAC Rx bus error");
            stack.fatal_error(FatalError::RxBusError);
        }

        self.statistics.record(events);

        if !events.intersection(InterruptEvents::TX).is_empty() {
            self.reclaim_tx(stack);
        }
        if !events.intersection(InterruptEvents::RX).is_empty() {
            self.receive(stack);
        }
    }

    /// Return completed transmit buffers to `stack`. Returns how many were reclaimed.
    pub fn reclaim_tx(&mut self, stack: &mut S) -> usize {
        self.tx.reclaim(|buffer| stack.frame_transmitted(buffer))
    }

    fn receive(&mut self, stack: &mut S) {
        loop {
            let next = self.rx.next_frame(&mut StackPool(stack));
            match next {
                Some(frame) => {
                    self.statistics.frames_received = self.statistics.frames_received.wrapping_add(1);
                    stack.frame_received(frame);
                }
                None => break,
            }
        }

        if self.rx.is_starved() {
            defmt::debug!("Rx ring starved, {} descriptors without buffer", self.rx.unprimed());
        }
    }

    /// Prime receive descriptors left empty because the stack ran out of buffers.
    pub fn refill_rx(&mut self, stack: &mut S) -> usize {
        if !self.is_active() {
            return 0;
        }
        self.rx.rebuild(&mut StackPool(stack))
    }

    pub fn multicast_groups(&self) -> &[MacAddress] {
        &self.multicast_groups
    }

    /// Start receiving frames sent to `address`.
    pub fn join_multicast_group(&mut self, address: MacAddress) -> Result<()> {
        if self.multicast_groups.contains(&address) {
            return Ok(());
        }

        self.multicast_groups
            .push(address)
            .map_err(|_| Error::OutOfMemory)?;

        if self.is_active() && self.mac.add_multicast_subscription(address).is_err() {
            defmt::info!("multicast table full, passing all multicast");
            self.mac.set_pass_all_multicast(true);
        }
        Ok(())
    }

    /// Stop receiving frames sent to `address`. Returns whether the group had been joined.
    pub fn leave_multicast_group(&mut self, address: MacAddress) -> bool {
        match self.multicast_groups.iter().position(|group| *group == address) {
            Some(position) => {
                self.multicast_groups.remove(position);
                if self.is_active() {
                    self.program_multicast();
                }
                true
            }
            None => false,
        }
    }

    /// Receive every multicast frame regardless of the joined groups.
    pub fn set_all_multicast(&mut self, enable: bool) {
        self.all_multicast = enable;
        if self.is_active() {
            self.program_multicast();
        }
    }

    fn program_multicast(&mut self) {
        self.mac.clear_multicast_filter();

        let mut overflow = false;
        for group in self.multicast_groups.iter() {
            if self.mac.add_multicast_subscription(*group).is_err() {
                overflow = true;
                break;
            }
        }

        self.mac.set_pass_all_multicast(self.all_multicast || overflow);
    }

    /// Query `phy` and follow its link state: enable the MAC with the negotiated speed and duplex
    /// when the link comes up, disable it when the link goes away.
    pub fn poll_link<P: Phy>(&mut self, phy: &mut P, stack: &mut S) -> Result<()> {
        if !self.is_active() {
            return Err(Error::InvalidState);
        }

        let status = phy.link_status(&mut self.mac)?;
        if status.remote_fault {
            stack.link_fault(LinkFault::RemoteFault);
        }
        if status.jabber {
            stack.link_fault(LinkFault::Jabber);
        }

        match (status.link, self.state) {
            (Some(link), State::Enabled) => {
                if self.mac.link() != Some(link) {
                    defmt::info!("link renegotiated");
                    self.enable(link.0, link.1)?;
                }
            }
            (Some((speed, duplex)), _) => {
                self.enable(speed, duplex)?;
                stack.link_state_changed(true);
            }
            (None, State::Enabled) => {
                self.disable()?;
                stack.link_state_changed(false);
            }
            (None, _) => {}
        }
        Ok(())
    }
}
