use super::{
    descriptor::{RxDescriptorTable, TxDescriptorTable},
    registers, SRAM,
};
use crate::ethernet::{
    backend::{RxDma, TxDma},
    MAX_FRAME_SIZE,
};

/// Transmit half of the GMAC DMA engine.
pub struct GmacTxDma<'a, const N: usize> {
    descriptors: &'a mut TxDescriptorTable<N>,
}

impl<'a, const N: usize> GmacTxDma<'a, N> {
    pub(super) fn new(descriptors: &'a mut TxDescriptorTable<N>) -> Self {
        GmacTxDma { descriptors }
    }

    fn reset_descriptors(&mut self) {
        for (index, descriptor) in self.descriptors.0.iter_mut().enumerate() {
            descriptor.write(|w| {
                let w = w.set_used();
                if index == N - 1 {
                    w.set_wrap()
                } else {
                    w
                }
            });
        }
    }
}

impl<'a, const N: usize> TxDma<N> for GmacTxDma<'a, N> {
    // The GMAC only writes the used bit back to the first descriptor of a frame.
    const SUPPORTS_MULTIPLE_DESCRIPTORS: bool = false;
    const MAX_BUFFER_LEN: usize = MAX_FRAME_SIZE;

    fn start_dma(&mut self) {
        self.reset_descriptors();
        let base = self.descriptors.base_address();
        registers().tbqb.write(|w| unsafe { w.bits(base) });
    }

    fn stop_dma(&mut self) {
        let gmac = registers();
        gmac.ncr.modify(|_, w| w.thalt().set_bit());
        while gmac.tsr.read().txgo().bit_is_set() {}
        self.reset_descriptors();
    }

    fn resume_dma(&mut self) {
        registers().ncr.modify(|_, w| w.tstart().set_bit());
    }

    // TBQB can only be written with TXEN clear. Clearing TXEN resets the queue pointer to it.
    fn resync(&mut self, index: usize) {
        let address = self.descriptors.address_of(index);
        registers().tbqb.write(|w| unsafe { w.bits(address) });
    }

    fn is_owned_by_dma(&self, index: usize) -> bool {
        !self.descriptors.0[index].read().is_used()
    }

    fn is_dma_readable(&self, buffer: *const u8, len: usize) -> bool {
        let start = buffer as usize;
        SRAM.contains(&start) && start + len <= SRAM.end
    }

    fn give_to_dma(&mut self, index: usize, buffer: *const u8, len: usize, _first: bool, last: bool) {
        self.descriptors.0[index].write(|w| {
            let mut w = w.set_address(buffer).set_buffer_size(len);
            if last {
                w = w.set_last_buffer();
            }
            if index == N - 1 {
                w = w.set_wrap();
            }
            w.clear_used()
        });
    }
}

/// Receive half of the GMAC DMA engine.
///
/// The GMAC fills every receive buffer up to one fixed size, so every buffer handed to this
/// engine must be at least `buffer_size` bytes long.
pub struct GmacRxDma<'a, const N: usize> {
    descriptors: &'a mut RxDescriptorTable<N>,
    buffer_size: usize,
}

impl<'a, const N: usize> GmacRxDma<'a, N> {
    pub(super) fn new(descriptors: &'a mut RxDescriptorTable<N>, buffer_size: usize) -> Self {
        GmacRxDma {
            descriptors,
            buffer_size,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn reset_descriptors(&mut self) {
        for (index, descriptor) in self.descriptors.0.iter_mut().enumerate() {
            descriptor.modify(|w| {
                let w = w.set_owned().clear_status();
                if index == N - 1 {
                    w.set_wrap()
                } else {
                    w.clear_wrap()
                }
            });
        }
    }
}

impl<'a, const N: usize> RxDma<N> for GmacRxDma<'a, N> {
    fn start_dma(&mut self) {
        let gmac = registers();
        let base = self.descriptors.base_address();
        let blocks = (self.buffer_size / 64) as u8;
        gmac.dcfgr.modify(|_, w| unsafe { w.drbs().bits(blocks) });
        gmac.rbqb.write(|w| unsafe { w.bits(base) });
    }

    fn stop_dma(&mut self) {
        registers().ncr.modify(|_, w| w.rxen().clear_bit());
        self.reset_descriptors();
    }

    fn resume_dma(&mut self) {
        // The engine re-reads the descriptor on the next frame, only the status needs clearing.
        registers().rsr.write(|w| w.bna().set_bit());
    }

    // RBQB can only be written with RXEN clear. Clearing RXEN resets the queue pointer to it.
    fn resync(&mut self, index: usize) {
        let address = self.descriptors.address_of(index);
        registers().rbqb.write(|w| unsafe { w.bits(address) });
    }

    fn is_dma_writable(&self, buffer: *mut u8, len: usize) -> bool {
        let start = buffer as usize;
        start & 0x03 == 0
            && len >= self.buffer_size
            && SRAM.contains(&start)
            && start + len <= SRAM.end
    }

    fn is_owned_by_dma(&self, index: usize) -> bool {
        !self.descriptors.0[index].read().is_owned()
    }

    fn is_first(&self, index: usize) -> bool {
        self.descriptors.0[index].read().is_start_of_frame()
    }

    fn is_last(&self, index: usize) -> bool {
        self.descriptors.0[index].read().is_end_of_frame()
    }

    // Frames failing the FCS check are dropped by the GMAC before they reach a descriptor.
    fn is_error(&self, _index: usize) -> bool {
        false
    }

    fn give_to_dma(&mut self, index: usize, buffer: *mut u8, len: usize) {
        debug_assert!(len >= self.buffer_size);
        self.descriptors.0[index].modify(|w| {
            let w = w.set_address(buffer).clear_status();
            let w = if index == N - 1 {
                w.set_wrap()
            } else {
                w.clear_wrap()
            };
            w.clear_owned()
        });
    }

    fn total_len(&self, _first: usize, last: usize) -> usize {
        // The last descriptor carries the length of the whole frame.
        self.descriptors.0[last].read().frame_length()
    }
}
