use super::{FatalError, LinkFault, RxFrame};
use embedded_dma::{ReadBuffer, WriteBuffer};

/// The network stack sitting on top of the engine.
///
/// Supplies empty receive buffers and takes received frames, completed transmit buffers and
/// link events. Called from interrupt context, so implementations must not block.
pub trait Stack {
    type TxBuffer: ReadBuffer<Word = u8>;
    type RxBuffer: WriteBuffer<Word = u8>;

    /// Hand out an empty receive buffer, or `None` when the pool is exhausted.
    fn alloc_rx_buffer(&mut self) -> Option<Self::RxBuffer>;

    /// Take back a receive buffer that was never filled.
    fn free_rx_buffer(&mut self, buffer: Self::RxBuffer) {
        drop(buffer);
    }

    fn frame_received<const N: usize>(&mut self, frame: RxFrame<Self::RxBuffer, N>);

    /// The hardware is done with `buffer`.
    fn frame_transmitted(&mut self, buffer: Self::TxBuffer);

    /// `buffer` was queued but never sent because the engine shut down.
    fn tx_buffer_discarded(&mut self, buffer: Self::TxBuffer) {
        drop(buffer);
    }

    fn link_state_changed(&mut self, _up: bool) {}

    fn link_fault(&mut self, fault: LinkFault) {
        defmt::warn!("PHY reports {:?}", fault);
    }

    /// The DMA engine hit a fault it cannot recover from.
    fn fatal_error(&mut self, error: FatalError) -> ! {
        defmt::error!("fatal EMAC error: {:?}", error);
        panic!("fatal EMAC error: {:?}", error);
    }
}
