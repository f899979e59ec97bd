//! In-memory backend and stack for the unit tests

use super::{
    backend::{FilterMode, MacDriver, MdioTransaction, RxDma, TxDma},
    rx::RxBufferPool,
    Duplex, Error, InterruptEvents, LinkFault, LinkSpeed, MacAddress, Result, RxFrame, Stack,
    MAX_FRAME_SIZE,
};

pub type RxBuffer = &'static mut [u8; 2048];

pub fn tx_buffer(len: usize, tag: u8) -> &'static [u8] {
    Box::leak(vec![tag; len].into_boxed_slice())
}

pub fn rx_buffer() -> RxBuffer {
    Box::leak(Box::new([0u8; 2048]))
}

pub struct MockTxDma<const N: usize, const MULTI: bool, const EXTRA: usize = 0> {
    owned: [bool; N],
    // (length, first, last)
    descriptors: [(usize, bool, bool); N],
    handoffs: usize,
    resumes: usize,
    started: bool,
    stopped: bool,
    readable: bool,
    // Descriptor the hardware fetches next
    hardware_index: usize,
}

impl<const N: usize, const MULTI: bool, const EXTRA: usize> MockTxDma<N, MULTI, EXTRA> {
    pub fn new() -> Self {
        MockTxDma {
            owned: [false; N],
            descriptors: [(0, false, false); N],
            handoffs: 0,
            resumes: 0,
            started: false,
            stopped: false,
            readable: true,
            hardware_index: 0,
        }
    }

    /// What closing the gates does to hardware that resets its queue pointer.
    pub fn rewind(&mut self) {
        self.hardware_index = 0;
    }

    pub fn hardware_index(&self) -> usize {
        self.hardware_index
    }

    /// The hardware finished sending descriptor `index`.
    pub fn complete(&mut self, index: usize) {
        assert!(self.owned[index], "completing a descriptor the DMA does not own");
        self.owned[index] = false;
    }

    pub fn force_owned(&mut self, index: usize) {
        self.owned[index] = true;
    }

    pub fn set_readable(&mut self, readable: bool) {
        self.readable = readable;
    }

    pub fn descriptor(&self, index: usize) -> (usize, bool, bool) {
        self.descriptors[index]
    }

    pub fn handoffs(&self) -> usize {
        self.handoffs
    }

    pub fn resumes(&self) -> usize {
        self.resumes
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl<const N: usize, const MULTI: bool, const EXTRA: usize> TxDma<N> for MockTxDma<N, MULTI, EXTRA> {
    const EXTRA_DESCRIPTORS_TO_LEAVE: usize = EXTRA;
    const SUPPORTS_MULTIPLE_DESCRIPTORS: bool = MULTI;
    const MAX_BUFFER_LEN: usize = MAX_FRAME_SIZE;

    fn start_dma(&mut self) {
        self.started = true;
        self.stopped = false;
        self.hardware_index = 0;
    }

    fn stop_dma(&mut self) {
        self.started = false;
        self.stopped = true;
        self.owned = [false; N];
    }

    fn resume_dma(&mut self) {
        self.resumes += 1;
    }

    fn resync(&mut self, index: usize) {
        self.hardware_index = index;
    }

    fn is_owned_by_dma(&self, index: usize) -> bool {
        self.owned[index]
    }

    fn is_dma_readable(&self, _buffer: *const u8, _len: usize) -> bool {
        self.readable
    }

    fn give_to_dma(&mut self, index: usize, _buffer: *const u8, len: usize, first: bool, last: bool) {
        assert!(!self.owned[index], "descriptor {} handed to the DMA twice", index);
        self.owned[index] = true;
        self.descriptors[index] = (len, first, last);
        self.handoffs += 1;
    }
}

#[derive(Clone, Copy, Default)]
struct RxDescriptor {
    owned: bool,
    first: bool,
    last: bool,
    error: bool,
    length: usize,
    address: usize,
}

pub struct MockRxDma<const N: usize> {
    descriptors: [RxDescriptor; N],
    started: bool,
    stopped: bool,
    resumes: usize,
    min_buffer_len: usize,
    hardware_index: usize,
}

impl<const N: usize> MockRxDma<N> {
    pub fn new() -> Self {
        MockRxDma {
            descriptors: [RxDescriptor::default(); N],
            started: false,
            stopped: false,
            resumes: 0,
            min_buffer_len: 1,
            hardware_index: 0,
        }
    }

    pub fn set_min_buffer_len(&mut self, len: usize) {
        self.min_buffer_len = len;
    }

    pub fn rewind(&mut self) {
        self.hardware_index = 0;
    }

    pub fn hardware_index(&self) -> usize {
        self.hardware_index
    }

    /// Flag descriptor `index` of a received frame as bad.
    pub fn set_error(&mut self, index: usize) {
        self.descriptors[index].error = true;
    }

    /// The hardware wrote one descriptor of a frame. `len` is the whole frame length on the
    /// last descriptor.
    pub fn receive_fragment(&mut self, index: usize, first: bool, last: bool, len: usize) {
        let descriptor = &mut self.descriptors[index];
        assert!(descriptor.owned, "receiving into descriptor {} the DMA does not own", index);
        descriptor.owned = false;
        descriptor.first = first;
        descriptor.last = last;
        descriptor.length = len;
    }

    pub fn receive(&mut self, index: usize, len: usize) {
        self.receive_fragment(index, true, true, len);
    }

    pub fn receive_bad(&mut self, index: usize, len: usize) {
        self.receive(index, len);
        self.descriptors[index].error = true;
    }

    pub fn receive_chained(&mut self, start: usize, count: usize, total: usize) {
        for offset in 0..count {
            let last = offset == count - 1;
            self.receive_fragment((start + offset) % N, offset == 0, last, if last { total } else { 0 });
        }
    }

    pub fn buffer_address(&self, index: usize) -> usize {
        self.descriptors[index].address
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn resumes(&self) -> usize {
        self.resumes
    }
}

impl<const N: usize> RxDma<N> for MockRxDma<N> {
    fn start_dma(&mut self) {
        self.started = true;
        self.stopped = false;
        self.hardware_index = 0;
    }

    fn stop_dma(&mut self) {
        self.started = false;
        self.stopped = true;
        for descriptor in self.descriptors.iter_mut() {
            descriptor.owned = false;
        }
    }

    fn resume_dma(&mut self) {
        self.resumes += 1;
    }

    fn resync(&mut self, index: usize) {
        self.hardware_index = index;
    }

    fn is_dma_writable(&self, _buffer: *mut u8, len: usize) -> bool {
        len >= self.min_buffer_len
    }

    fn is_owned_by_dma(&self, index: usize) -> bool {
        self.descriptors[index].owned
    }

    fn is_first(&self, index: usize) -> bool {
        self.descriptors[index].first
    }

    fn is_last(&self, index: usize) -> bool {
        self.descriptors[index].last
    }

    fn is_error(&self, index: usize) -> bool {
        self.descriptors[index].error
    }

    fn give_to_dma(&mut self, index: usize, buffer: *mut u8, _len: usize) {
        let descriptor = &mut self.descriptors[index];
        assert!(!descriptor.owned, "descriptor {} handed to the DMA twice", index);
        *descriptor = RxDescriptor {
            owned: true,
            address: buffer as usize,
            ..RxDescriptor::default()
        };
    }

    fn total_len(&self, _first: usize, last: usize) -> usize {
        self.descriptors[last].length
    }
}

pub struct VecPool {
    buffers: Vec<RxBuffer>,
}

impl VecPool {
    pub fn with_buffers(count: usize) -> Self {
        VecPool {
            buffers: (0..count).map(|_| rx_buffer()).collect(),
        }
    }

    pub fn available(&self) -> usize {
        self.buffers.len()
    }
}

impl RxBufferPool<RxBuffer> for VecPool {
    fn alloc(&mut self) -> Option<RxBuffer> {
        self.buffers.pop()
    }

    fn free(&mut self, buffer: RxBuffer) {
        self.buffers.push(buffer);
    }
}

pub const MOCK_MULTICAST_CAPACITY: usize = 4;

pub struct MockMac {
    addresses: [Option<MacAddress>; 1 + MOCK_MULTICAST_CAPACITY],
    filter: FilterMode,
    link: Option<(LinkSpeed, Duplex)>,
    interrupts_enabled: bool,
    pending: InterruptEvents,
    phy_registers: [[u16; 32]; 32],
    mdio: Option<MdioTransaction>,
    mdio_wait: u8,
    disable_calls: usize,
    fail_disable: bool,
    log: Vec<&'static str>,
}

impl MockMac {
    pub fn new() -> Self {
        MockMac {
            addresses: [None; 1 + MOCK_MULTICAST_CAPACITY],
            filter: FilterMode::default(),
            link: None,
            interrupts_enabled: false,
            pending: InterruptEvents::empty(),
            phy_registers: [[0; 32]; 32],
            mdio: None,
            mdio_wait: 0,
            disable_calls: 0,
            fail_disable: false,
            log: Vec::new(),
        }
    }

    pub fn address(&self, slot: usize) -> Option<MacAddress> {
        self.addresses[slot]
    }

    pub fn filter_mode(&self) -> FilterMode {
        self.filter
    }

    pub fn is_enabled(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<(LinkSpeed, Duplex)> {
        self.link
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts_enabled
    }

    pub fn raise(&mut self, events: InterruptEvents) {
        self.pending = self.pending.union(events);
    }

    pub fn pending(&self) -> InterruptEvents {
        self.pending
    }

    pub fn disable_calls(&self) -> usize {
        self.disable_calls
    }

    /// Make the next `disable` fail with the gates left open.
    pub fn fail_next_disable(&mut self) {
        self.fail_disable = true;
    }

    pub fn set_phy_register(&mut self, phy: u8, register: u8, value: u16) {
        self.phy_registers[phy as usize][register as usize] = value;
    }

    pub fn phy_register(&self, phy: u8, register: u8) -> u16 {
        self.phy_registers[phy as usize][register as usize]
    }

    /// Driver calls in order.
    pub fn log(&self) -> &[&'static str] {
        &self.log
    }
}

impl MacDriver for MockMac {
    const MULTICAST_CAPACITY: usize = MOCK_MULTICAST_CAPACITY;

    fn init(&mut self) -> Result<()> {
        self.log.push("init");
        self.addresses = [None; 1 + MOCK_MULTICAST_CAPACITY];
        self.filter = FilterMode::default();
        self.link = None;
        Ok(())
    }

    fn deinit(&mut self) -> Result<()> {
        self.log.push("deinit");
        Ok(())
    }

    fn enable_interrupts(&mut self) {
        self.log.push("enable_interrupts");
        self.interrupts_enabled = true;
    }

    fn disable_interrupts(&mut self) {
        self.log.push("disable_interrupts");
        self.interrupts_enabled = false;
    }

    fn enable(&mut self, speed: LinkSpeed, duplex: Duplex) -> Result<()> {
        self.log.push("enable");
        self.link = Some((speed, duplex));
        Ok(())
    }

    fn disable(&mut self) -> Result<()> {
        self.log.push("disable");
        self.disable_calls += 1;
        if self.fail_disable {
            self.fail_disable = false;
            return Err(Error::InvalidState);
        }
        self.link = None;
        Ok(())
    }

    fn write_address(&mut self, slot: usize, address: &MacAddress) {
        self.addresses[slot] = Some(*address);
    }

    fn clear_multicast_addresses(&mut self) {
        for slot in self.addresses.iter_mut().skip(1) {
            *slot = None;
        }
    }

    fn write_filter_mode(&mut self, mode: FilterMode) {
        self.filter = mode;
    }

    fn mdio_start(&mut self, transaction: MdioTransaction) {
        assert!(self.mdio.is_none(), "MDIO transaction already in flight");
        self.mdio = Some(transaction);
        self.mdio_wait = 2;
    }

    fn mdio_poll(&mut self) -> nb::Result<u16, Error> {
        if self.mdio_wait > 0 {
            self.mdio_wait -= 1;
            return Err(nb::Error::WouldBlock);
        }

        match self.mdio.take() {
            Some(MdioTransaction::Read { phy, register }) => Ok(self.phy_register(phy, register)),
            Some(MdioTransaction::Write {
                phy,
                register,
                value,
            }) => {
                self.set_phy_register(phy, register, value);
                Ok(0)
            }
            None => Err(nb::Error::Other(Error::Mdio)),
        }
    }

    fn take_interrupt_events(&mut self, mask: InterruptEvents) -> InterruptEvents {
        let events = self.pending.intersection(mask);
        self.pending = self.pending.difference(mask);
        events
    }
}

/// Network stack double that records every callback.
pub struct MockStack {
    pub pool: VecPool,
    pub received: Vec<usize>,
    /// Keep received buffers instead of returning them to the pool.
    pub hold_frames: bool,
    pub held: Vec<RxBuffer>,
    pub transmitted: Vec<&'static [u8]>,
    pub discarded: Vec<&'static [u8]>,
    pub freed: usize,
    pub link_events: Vec<bool>,
    pub faults: Vec<LinkFault>,
}

impl MockStack {
    pub fn with_buffers(count: usize) -> Self {
        MockStack {
            pool: VecPool::with_buffers(count),
            received: Vec::new(),
            hold_frames: false,
            held: Vec::new(),
            transmitted: Vec::new(),
            discarded: Vec::new(),
            freed: 0,
            link_events: Vec::new(),
            faults: Vec::new(),
        }
    }
}

impl Stack for MockStack {
    type TxBuffer = &'static [u8];
    type RxBuffer = RxBuffer;

    fn alloc_rx_buffer(&mut self) -> Option<RxBuffer> {
        self.pool.alloc()
    }

    fn free_rx_buffer(&mut self, buffer: RxBuffer) {
        self.freed += 1;
        self.pool.free(buffer);
    }

    fn frame_received<const N: usize>(&mut self, frame: RxFrame<RxBuffer, N>) {
        self.received.push(frame.len());
        for fragment in frame.into_fragments() {
            if self.hold_frames {
                self.held.push(fragment.buffer);
            } else {
                self.pool.free(fragment.buffer);
            }
        }
    }

    fn frame_transmitted(&mut self, buffer: &'static [u8]) {
        self.transmitted.push(buffer);
    }

    fn tx_buffer_discarded(&mut self, buffer: &'static [u8]) {
        self.discarded.push(buffer);
    }

    fn link_state_changed(&mut self, up: bool) {
        self.link_events.push(up);
    }

    fn link_fault(&mut self, fault: LinkFault) {
        self.faults.push(fault);
    }
}
