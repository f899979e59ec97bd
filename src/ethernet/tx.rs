use super::{backend::TxDma, Error, Rejected};
use embedded_dma::ReadBuffer;
use heapless::Vec;

struct TxSlot<B> {
    buffer: B,
    last: bool,
}

/// Software side of the transmit descriptor ring.
///
/// Slots are filled at `send_index` and reclaimed at `reclaim_index`, strictly in ring order. The
/// hardware is required to complete descriptors in the order they were handed over, so the two
/// cursors are all the bookkeeping needed. While a slot is owned by the DMA engine the ring holds
/// on to the buffer it references.
pub struct TxRing<D, B, const N: usize> {
    dma: D,
    slots: [Option<TxSlot<B>>; N],
    send_index: usize,
    reclaim_index: usize,
    // Descriptors currently owned by software
    free: usize,
    // A first fragment has been queued but not its last
    frame_open: bool,
    completed_frames: u32,
}

impl<D, B, const N: usize> TxRing<D, B, N>
where
    D: TxDma<N>,
    B: ReadBuffer<Word = u8>,
{
    pub fn new(dma: D) -> Self {
        TxRing {
            dma,
            slots: core::array::from_fn(|_| None),
            send_index: 0,
            reclaim_index: 0,
            free: N,
            frame_open: false,
            completed_frames: 0,
        }
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// Descriptors that can still be filled before the ring is full.
    pub fn free_slots(&self) -> usize {
        self.free.saturating_sub(D::EXTRA_DESCRIPTORS_TO_LEAVE)
    }

    /// Descriptors handed to the DMA engine and not yet reclaimed.
    pub fn in_flight(&self) -> usize {
        N - self.free
    }

    /// Frames whose last descriptor has been reclaimed.
    pub fn completed_frames(&self) -> u32 {
        self.completed_frames
    }

    pub(crate) fn start(&mut self) {
        defmt::trace!("TxRing::start() depth:{}", N);
        self.dma.start_dma();
    }

    /// Queue one fragment of a frame.
    ///
    /// A frame that fits in one buffer is queued with `first` and `last` both set. On failure
    /// the buffer is handed back untouched.
    pub fn enqueue(&mut self, buffer: B, first: bool, last: bool) -> Result<(), Rejected<B>> {
        if !(first && last) && !D::SUPPORTS_MULTIPLE_DESCRIPTORS {
            return Err(Rejected::new(Error::FragmentedFrameUnsupported, buffer));
        }

        // Fragments of one frame have to be queued back to back.
        if first == self.frame_open {
            return Err(Rejected::new(Error::InvalidState, buffer));
        }

        let (address, length) = unsafe { buffer.read_buffer() };
        if let Err(error) = self.check_fragment(address, length) {
            return Err(Rejected::new(error, buffer));
        }

        if self.free_slots() == 0 || self.dma.is_owned_by_dma(self.send_index) {
            return Err(Rejected::new(Error::OutOfMemory, buffer));
        }

        self.commit(buffer, address, length, first, last);
        Ok(())
    }

    /// Queue a whole frame, one descriptor per fragment.
    ///
    /// Either every fragment is handed to the DMA engine or none is.
    pub fn enqueue_frame<const F: usize>(&mut self, fragments: Vec<B, F>) -> Result<(), Rejected<Vec<B, F>>> {
        if fragments.is_empty() {
            return Err(Rejected::new(Error::EmptyBuffer, fragments));
        }

        if fragments.len() > 1 && !D::SUPPORTS_MULTIPLE_DESCRIPTORS {
            return Err(Rejected::new(Error::FragmentedFrameUnsupported, fragments));
        }

        if self.frame_open {
            return Err(Rejected::new(Error::InvalidState, fragments));
        }

        if fragments.len() > self.free_slots() {
            return Err(Rejected::new(Error::OutOfMemory, fragments));
        }

        let invalid = fragments.iter().enumerate().find_map(|(offset, fragment)| {
            let (address, length) = unsafe { fragment.read_buffer() };
            if let Err(error) = self.check_fragment(address, length) {
                return Some(error);
            }

            if self.dma.is_owned_by_dma((self.send_index + offset) % N) {
                return Some(Error::OutOfMemory);
            }
            None
        });

        if let Some(error) = invalid {
            return Err(Rejected::new(error, fragments));
        }

        let count = fragments.len();
        for (offset, fragment) in fragments.into_iter().enumerate() {
            let (address, length) = unsafe { fragment.read_buffer() };
            self.commit(fragment, address, length, offset == 0, offset == count - 1);
        }

        Ok(())
    }

    /// Walk completed descriptors from the reclaim cursor, handing each buffer to `on_complete`.
    ///
    /// Returns how many descriptors were reclaimed.
    pub fn reclaim<F: FnMut(B)>(&mut self, mut on_complete: F) -> usize {
        let mut reclaimed = 0;
        while self.free < N {
            let index = self.reclaim_index;
            if self.dma.is_owned_by_dma(index) {
                break;
            }

            if let Some(slot) = self.slots[index].take() {
                if slot.last {
                    self.completed_frames = self.completed_frames.wrapping_add(1);
                }
                on_complete(slot.buffer);
            }

            self.reclaim_index = (index + 1) % N;
            self.free += 1;
            reclaimed += 1;
        }

        if reclaimed > 0 {
            defmt::trace!("TxRing::reclaim() -> {} free:{}", reclaimed, self.free);
        }
        reclaimed
    }

    /// Point the engine at the oldest descriptor it still owns, or at the send cursor when it
    /// owns none. Only valid while the MAC gates are closed.
    pub(crate) fn resync(&mut self) {
        let pending = (0..self.in_flight())
            .map(|offset| (self.reclaim_index + offset) % N)
            .find(|&index| self.dma.is_owned_by_dma(index));
        let index = pending.unwrap_or(self.send_index);

        defmt::trace!("TxRing::resync() -> {}", index);
        self.dma.resync(index);
    }

    /// Restart transmission of descriptors queued before the gates were closed.
    pub(crate) fn resume(&mut self) {
        let pending = (0..self.in_flight())
            .any(|offset| self.dma.is_owned_by_dma((self.reclaim_index + offset) % N));
        if pending {
            self.dma.resume_dma();
        }
    }

    /// Stop the DMA engine and hand back every buffer still queued, oldest first.
    pub(crate) fn stop<F: FnMut(B)>(&mut self, mut on_release: F) {
        self.dma.stop_dma();

        for offset in 0..N {
            let index = (self.reclaim_index + offset) % N;
            if let Some(slot) = self.slots[index].take() {
                on_release(slot.buffer);
            }
        }

        self.send_index = 0;
        self.reclaim_index = 0;
        self.free = N;
        self.frame_open = false;
        defmt::trace!("TxRing::stop()");
    }

    fn check_fragment(&self, address: *const u8, length: usize) -> Result<(), Error> {
        if length == 0 {
            return Err(Error::EmptyBuffer);
        }

        if length > D::MAX_BUFFER_LEN {
            return Err(Error::BufferTooLarge);
        }

        if !self.dma.is_dma_readable(address, length) {
            return Err(Error::BufferNotDmaReadable);
        }

        Ok(())
    }

    fn commit(&mut self, buffer: B, address: *const u8, length: usize, first: bool, last: bool) {
        let index = self.send_index;

        // Record the buffer before the descriptor changes hands.
        self.slots[index] = Some(TxSlot { buffer, last });
        self.dma.give_to_dma(index, address, length, first, last);

        self.send_index = (index + 1) % N;
        self.free -= 1;
        self.frame_open = !last;

        if last {
            self.dma.resume_dma();
        }
    }
}
