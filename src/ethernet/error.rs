/// Recoverable errors reported by the engine.
///
/// Fatal DMA faults are not part of this enum; they are routed to [`Stack::fatal_error`].
///
/// [`Stack::fatal_error`]: super::Stack::fatal_error
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Error {
    /// No free descriptor, Rx buffer pool empty, or multicast table full.
    OutOfMemory,
    /// The operation is not allowed in the engine's current state.
    InvalidState,
    /// The backend cannot run the requested speed/duplex combination.
    InvalidLinkConfig,
    /// A frame was split over several buffers but the hardware takes one descriptor per frame.
    FragmentedFrameUnsupported,
    /// The buffer lives in memory the DMA engine cannot read.
    BufferNotDmaReadable,
    /// The buffer lives in memory the DMA engine cannot write, or does not fit its layout rules.
    BufferNotDmaWritable,
    /// The buffer is longer than one descriptor can describe.
    BufferTooLarge,
    /// A zero length buffer was handed to the ring.
    EmptyBuffer,
    /// The MDIO transaction failed.
    Mdio,
}

pub type Result<T> = core::result::Result<T, Error>;

/// A buffer the ring refused to take, handed back to the caller with the reason.
#[derive(Debug)]
pub struct Rejected<B> {
    pub error: Error,
    pub buffer: B,
}

impl<B> Rejected<B> {
    pub(crate) fn new(error: Error, buffer: B) -> Self {
        Rejected { error, buffer }
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }
}

/// Faults after which the descriptor rings can no longer be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum FatalError {
    /// The DMA engine hit a bus error while reading Tx descriptors or buffers.
    TxBusError,
    /// The DMA engine hit a bus error while writing Rx descriptors or buffers.
    RxBusError,
}

/// Link level problems reported by the PHY.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum LinkFault {
    RemoteFault,
    Jabber,
}
