mod frame;

pub use frame::{RxFragment, RxFrame};

use super::{backend::RxDma, Error, Rejected};
use embedded_dma::WriteBuffer;
use heapless::Vec;

/// Source of empty receive buffers.
pub trait RxBufferPool<B> {
    fn alloc(&mut self) -> Option<B>;

    fn free(&mut self, buffer: B);
}

/// What one call to [`RxRing::poll`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct RxPollSummary {
    pub delivered: usize,
    pub dropped: usize,
}

struct RxSlot<B> {
    buffer: B,
    capacity: usize,
}

enum Scan {
    // The frame at the read cursor is still being written
    Pending,
    // Descriptors at the read cursor that can never form a frame
    Discard(usize),
    Frame { count: usize, last: usize },
}

/// Software side of the receive descriptor ring.
///
/// Primed descriptors always form one contiguous run starting at `next_index`; the descriptors
/// from `build_index` up to `next_index` have no buffer attached. A frame is only taken off the
/// ring once every descriptor it spans has been handed back by the DMA engine.
pub struct RxRing<D, B, const N: usize> {
    dma: D,
    slots: [Option<RxSlot<B>>; N],
    next_index: usize,
    build_index: usize,
    unprimed: usize,
    dropped_frames: u32,
}

impl<D, B, const N: usize> RxRing<D, B, N>
where
    D: RxDma<N>,
    B: WriteBuffer<Word = u8>,
{
    pub fn new(dma: D) -> Self {
        RxRing {
            dma,
            slots: core::array::from_fn(|_| None),
            next_index: 0,
            build_index: 0,
            unprimed: N,
            dropped_frames: 0,
        }
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }

    /// Descriptors that currently have no buffer attached.
    pub fn unprimed(&self) -> usize {
        self.unprimed
    }

    /// True when some descriptors are left without a buffer because the pool ran dry.
    pub fn is_starved(&self) -> bool {
        self.unprimed > 0
    }

    /// Frames dropped so far, either flagged bad by the hardware or left incomplete.
    pub fn dropped_frames(&self) -> u32 {
        self.dropped_frames
    }

    pub(crate) fn start(&mut self) {
        defmt::trace!("RxRing::start() depth:{} primed:{}", N, N - self.unprimed);
        self.dma.start_dma();
    }

    /// Attach `buffer` to the next unprimed descriptor and give it to the DMA engine.
    pub fn prime(&mut self, mut buffer: B) -> Result<(), Rejected<B>> {
        if self.unprimed == 0 {
            return Err(Rejected::new(Error::OutOfMemory, buffer));
        }

        // The buffer is stable in memory and stays parked in its slot until the hardware hands
        // the descriptor back.
        let (address, capacity) = unsafe { buffer.write_buffer() };
        if capacity == 0 {
            return Err(Rejected::new(Error::EmptyBuffer, buffer));
        }

        if !self.dma.is_dma_writable(address, capacity) {
            return Err(Rejected::new(Error::BufferNotDmaWritable, buffer));
        }

        let index = self.build_index;
        self.slots[index] = Some(RxSlot { buffer, capacity });
        self.dma.give_to_dma(index, address, capacity);

        self.build_index = (index + 1) % N;
        self.unprimed -= 1;
        self.dma.resume_dma();
        Ok(())
    }

    /// Prime as many descriptors as `pool` has buffers for. Returns how many were primed.
    pub fn rebuild<P: RxBufferPool<B>>(&mut self, pool: &mut P) -> usize {
        let mut primed = 0;
        while self.unprimed > 0 {
            let buffer = match pool.alloc() {
                Some(buffer) => buffer,
                None => {
                    defmt::debug!("RxRing::rebuild() pool empty, {} unprimed", self.unprimed);
                    break;
                }
            };

            match self.prime(buffer) {
                Ok(()) => primed += 1,
                Err(rejected) => {
                    pool.free(rejected.into_buffer());
                    break;
                }
            }
        }
        primed
    }

    /// Take the next complete, error free frame off the ring.
    ///
    /// Bad and truncated frames met on the way are dropped and their buffers primed again.
    /// The descriptors of a delivered frame are refilled from `pool`.
    pub fn next_frame<P: RxBufferPool<B>>(&mut self, pool: &mut P) -> Option<RxFrame<B, N>> {
        loop {
            match self.scan() {
                Scan::Pending => return None,
                Scan::Discard(count) => {
                    defmt::debug!("RxRing: discarding {} descriptors of an incomplete frame", count);
                    self.recycle(count, pool);
                }
                Scan::Frame { count, last } => {
                    let first = self.next_index;
                    if (0..count).any(|offset| self.dma.is_error((first + offset) % N)) {
                        defmt::debug!("RxRing: dropping bad frame at {}", first);
                        self.recycle(count, pool);
                        continue;
                    }

                    let len = self.dma.total_len(first, last);
                    let frame = self.take_frame(count, len);
                    self.rebuild(pool);
                    return Some(frame);
                }
            }
        }
    }

    /// Deliver every complete frame to `deliver`, oldest first.
    pub fn poll<P, F>(&mut self, pool: &mut P, mut deliver: F) -> RxPollSummary
    where
        P: RxBufferPool<B>,
        F: FnMut(RxFrame<B, N>),
    {
        let dropped_before = self.dropped_frames;
        let mut delivered = 0;
        while let Some(frame) = self.next_frame(pool) {
            deliver(frame);
            delivered += 1;
        }

        RxPollSummary {
            delivered,
            dropped: self.dropped_frames.wrapping_sub(dropped_before) as usize,
        }
    }

    /// Point the engine at the first primed descriptor it still owns, or at the first unprimed
    /// one when it owns none. Only valid while the MAC gates are closed.
    pub(crate) fn resync(&mut self) {
        let primed = N - self.unprimed;
        let index = (0..primed)
            .map(|offset| (self.next_index + offset) % N)
            .find(|&index| self.dma.is_owned_by_dma(index))
            .unwrap_or(self.build_index);

        defmt::trace!("RxRing::resync() -> {}", index);
        self.dma.resync(index);
    }

    /// Stop the DMA engine and hand back every attached buffer.
    pub(crate) fn stop<F: FnMut(B)>(&mut self, mut on_release: F) {
        self.dma.stop_dma();

        for slot in self.slots.iter_mut() {
            if let Some(slot) = slot.take() {
                on_release(slot.buffer);
            }
        }

        self.next_index = 0;
        self.build_index = 0;
        self.unprimed = N;
        defmt::trace!("RxRing::stop()");
    }

    fn scan(&self) -> Scan {
        let primed = N - self.unprimed;
        for offset in 0..primed {
            let index = (self.next_index + offset) % N;
            if self.dma.is_owned_by_dma(index) {
                return Scan::Pending;
            }

            let first = self.dma.is_first(index);
            if offset == 0 && !first {
                // Tail of a frame whose head was already dropped
                return Scan::Discard(1);
            }
            if offset > 0 && first {
                // A new frame started before the previous one ended
                return Scan::Discard(offset);
            }

            if self.dma.is_last(index) {
                return Scan::Frame {
                    count: offset + 1,
                    last: index,
                };
            }
        }

        if primed == 0 {
            Scan::Pending
        } else {
            // Every primed descriptor is taken by one unfinished frame
            Scan::Discard(primed)
        }
    }

    // Drop `count` descriptors at the read cursor and put their buffers straight back.
    fn recycle<P: RxBufferPool<B>>(&mut self, count: usize, pool: &mut P) {
        self.dropped_frames = self.dropped_frames.wrapping_add(1);

        for _ in 0..count {
            let index = self.next_index;
            self.next_index = (index + 1) % N;
            self.unprimed += 1;

            if let Some(slot) = self.slots[index].take() {
                if let Err(rejected) = self.prime(slot.buffer) {
                    pool.free(rejected.into_buffer());
                }
            }
        }
    }

    fn take_frame(&mut self, count: usize, len: usize) -> RxFrame<B, N> {
        let mut fragments = Vec::new();
        let mut remaining = len;

        for _ in 0..count {
            let index = self.next_index;
            self.next_index = (index + 1) % N;
            self.unprimed += 1;

            if let Some(slot) = self.slots[index].take() {
                let fragment_len = remaining.min(slot.capacity);
                remaining -= fragment_len;
                // count never exceeds N
                let _ = fragments.push(RxFragment {
                    buffer: slot.buffer,
                    len: fragment_len,
                });
            }
        }

        RxFrame::new(fragments, len)
    }
}
