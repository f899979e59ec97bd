use crate::ethernet::MAX_FRAME_SIZE;

pub(super) trait VolatileReadWrite {
    fn read_volatile(&self) -> u32;
    fn write_volatile(&mut self, new_value: u32);
}

impl VolatileReadWrite for u32 {
    fn read_volatile(&self) -> u32 {
        unsafe { core::ptr::read_volatile(self) }
    }

    fn write_volatile(&mut self, new_value: u32) {
        unsafe {
            core::ptr::write_volatile(self, new_value);
        }
    }
}

enum TxWord1BitNumbers {
    LastBuffer = 15,
    Wrap = 30,
    Used = 31,
}

const TX_LENGTH_MASK: u32 = 0x0000_3FFF;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct TxDescriptor {
    // NOTE: Only read or write these fields using volatile operations
    word0: u32,
    word1: u32,
}

impl TxDescriptor {
    /// A descriptor the DMA engine will skip over.
    pub const fn const_default() -> Self {
        TxDescriptor {
            word0: 0,
            word1: 1 << TxWord1BitNumbers::Used as u32,
        }
    }

    pub fn read(&self) -> TxDescriptorReader {
        TxDescriptorReader(self.word0.read_volatile(), self.word1.read_volatile())
    }

    pub fn modify<F: FnOnce(TxDescriptorWriter) -> TxDescriptorWriter>(&mut self, f: F) {
        let w = TxDescriptorWriter(self.word0.read_volatile(), self.word1.read_volatile());
        let result = f(w);
        // The used bit lives in word 1, so it is written last
        self.word0.write_volatile(result.0);
        self.word1.write_volatile(result.1);
    }

    pub fn write<F: FnOnce(TxDescriptorWriter) -> TxDescriptorWriter>(&mut self, f: F) {
        let result = f(TxDescriptorWriter(0, 0));
        self.word0.write_volatile(result.0);
        self.word1.write_volatile(result.1);
    }
}

pub struct TxDescriptorReader(u32, u32);
impl TxDescriptorReader {
    pub fn address(&self) -> u32 {
        self.0
    }

    pub fn buffer_size(&self) -> u16 {
        (self.1 & TX_LENGTH_MASK) as u16
    }

    pub fn is_last_buffer(&self) -> bool {
        self.1 & (1 << TxWord1BitNumbers::LastBuffer as u32) != 0
    }

    pub fn is_wrap(&self) -> bool {
        self.1 & (1 << TxWord1BitNumbers::Wrap as u32) != 0
    }

    pub fn is_used(&self) -> bool {
        self.1 & (1 << TxWord1BitNumbers::Used as u32) != 0
    }
}

pub struct TxDescriptorWriter(u32, u32);
impl TxDescriptorWriter {
    pub fn set_address(self, address: *const u8) -> Self {
        TxDescriptorWriter(address as u32, self.1)
    }

    pub fn set_buffer_size(self, byte_length: usize) -> Self {
        debug_assert!(byte_length <= MAX_FRAME_SIZE);
        TxDescriptorWriter(self.0, (self.1 & !TX_LENGTH_MASK) | byte_length as u32)
    }

    pub fn set_last_buffer(self) -> Self {
        TxDescriptorWriter(self.0, self.1 | (1 << TxWord1BitNumbers::LastBuffer as u32))
    }

    pub fn set_wrap(self) -> Self {
        TxDescriptorWriter(self.0, self.1 | (1 << TxWord1BitNumbers::Wrap as u32))
    }

    pub fn set_used(self) -> Self {
        TxDescriptorWriter(self.0, self.1 | (1 << TxWord1BitNumbers::Used as u32))
    }

    pub fn clear_used(self) -> Self {
        TxDescriptorWriter(self.0, self.1 & !(1 << TxWord1BitNumbers::Used as u32))
    }
}

enum RxWord0BitNumbers {
    Owned = 0,
    Wrap = 1,
}

enum RxWord1BitNumbers {
    StartOfFrame = 14,
    EndOfFrame = 15,
}

// Frame length, jumbo frames are never enabled
const RX_LENGTH_MASK: u32 = 0x0000_0FFF;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct RxDescriptor {
    // NOTE: Only read or write these fields using volatile operations
    word0: u32,
    word1: u32,
}

impl RxDescriptor {
    /// A descriptor owned by software, so the DMA engine stops on it.
    pub const fn const_default() -> Self {
        RxDescriptor {
            word0: 1 << RxWord0BitNumbers::Owned as u32,
            word1: 0,
        }
    }

    pub fn read(&self) -> RxDescriptorReader {
        RxDescriptorReader(self.word0.read_volatile(), self.word1.read_volatile())
    }

    pub fn modify<F: FnOnce(RxDescriptorWriter) -> RxDescriptorWriter>(&mut self, f: F) {
        let w = RxDescriptorWriter(self.word0.read_volatile(), self.word1.read_volatile());
        let result = f(w);
        // The ownership bit lives in word 0, so it is written last
        self.word1.write_volatile(result.1);
        self.word0.write_volatile(result.0);
    }
}

pub struct RxDescriptorReader(u32, u32);
impl RxDescriptorReader {
    pub fn address(&self) -> u32 {
        self.0 & !0x03
    }

    pub fn is_owned(&self) -> bool {
        self.0 & (1 << RxWord0BitNumbers::Owned as u32) != 0
    }

    pub fn is_wrap(&self) -> bool {
        self.0 & (1 << RxWord0BitNumbers::Wrap as u32) != 0
    }

    pub fn frame_length(&self) -> usize {
        (self.1 & RX_LENGTH_MASK) as usize
    }

    pub fn is_start_of_frame(&self) -> bool {
        self.1 & (1 << RxWord1BitNumbers::StartOfFrame as u32) != 0
    }

    pub fn is_end_of_frame(&self) -> bool {
        self.1 & (1 << RxWord1BitNumbers::EndOfFrame as u32) != 0
    }
}

pub struct RxDescriptorWriter(u32, u32);
impl RxDescriptorWriter {
    pub fn set_address(self, address: *mut u8) -> Self {
        debug_assert!((address as u32) & 0x0000_0003 == 0, "Specified address is not 32 bit aligned");
        RxDescriptorWriter((self.0 & 0x03) | (address as u32), self.1)
    }

    pub fn clear_status(self) -> Self {
        RxDescriptorWriter(self.0, 0)
    }

    pub fn set_owned(self) -> Self {
        RxDescriptorWriter(self.0 | (1 << RxWord0BitNumbers::Owned as u32), self.1)
    }

    pub fn clear_owned(self) -> Self {
        RxDescriptorWriter(self.0 & !(1 << RxWord0BitNumbers::Owned as u32), self.1)
    }

    pub fn set_wrap(self) -> Self {
        RxDescriptorWriter(self.0 | (1 << RxWord0BitNumbers::Wrap as u32), self.1)
    }

    pub fn clear_wrap(self) -> Self {
        RxDescriptorWriter(self.0 & !(1 << RxWord0BitNumbers::Wrap as u32), self.1)
    }
}

/// Transmit descriptor list. The GMAC requires it to be 8-byte aligned.
#[repr(C, align(8))]
pub struct TxDescriptorTable<const N: usize>(pub(super) [TxDescriptor; N]);

impl<const N: usize> TxDescriptorTable<N> {
    pub const fn new() -> Self {
        TxDescriptorTable([TxDescriptor::const_default(); N])
    }

    pub(super) fn base_address(&self) -> u32 {
        self.0.as_ptr() as u32
    }

    pub(super) fn address_of(&self, index: usize) -> u32 {
        &self.0[index] as *const TxDescriptor as u32
    }
}

impl<const N: usize> Default for TxDescriptorTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receive descriptor list. The GMAC requires it to be 8-byte aligned.
#[repr(C, align(8))]
pub struct RxDescriptorTable<const N: usize>(pub(super) [RxDescriptor; N]);

impl<const N: usize> RxDescriptorTable<N> {
    pub const fn new() -> Self {
        RxDescriptorTable([RxDescriptor::const_default(); N])
    }

    pub(super) fn base_address(&self) -> u32 {
        self.0.as_ptr() as u32
    }

    pub(super) fn address_of(&self, index: usize) -> u32 {
        &self.0[index] as *const RxDescriptor as u32
    }
}

impl<const N: usize> Default for RxDescriptorTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tables_are_software_owned() {
        let tx = TxDescriptorTable::<2>::new();
        assert!(tx.0.iter().all(|d| d.read().is_used()));

        let rx = RxDescriptorTable::<2>::new();
        assert!(rx.0.iter().all(|d| d.read().is_owned()));
    }

    #[test]
    fn tx_writer_packs_word1() {
        let mut descriptor = TxDescriptor::const_default();
        descriptor.write(|w| {
            w.set_address(0x2000_0400 as *const u8)
                .set_buffer_size(60)
                .set_last_buffer()
                .set_wrap()
        });

        let r = descriptor.read();
        assert_eq!(r.address(), 0x2000_0400);
        assert_eq!(r.buffer_size(), 60);
        assert!(r.is_last_buffer());
        assert!(r.is_wrap());
        assert!(!r.is_used());

        descriptor.modify(|w| w.set_used());
        assert!(descriptor.read().is_used());
        assert_eq!(descriptor.read().buffer_size(), 60);
    }

    #[test]
    fn rx_ownership_and_wrap_bits() {
        let mut descriptor = RxDescriptor::const_default();
        descriptor.modify(|w| {
            w.set_address(0x2000_0800 as *mut u8)
                .set_wrap()
                .clear_owned()
                .clear_status()
        });

        let r = descriptor.read();
        assert_eq!(r.address(), 0x2000_0800);
        assert!(r.is_wrap());
        assert!(!r.is_owned());
    }

    #[test]
    fn descriptor_addresses_step_by_eight_bytes() {
        let tx = TxDescriptorTable::<4>::new();
        assert_eq!(tx.address_of(0), tx.base_address());
        assert_eq!(tx.address_of(3).wrapping_sub(tx.base_address()), 24);

        let rx = RxDescriptorTable::<4>::new();
        assert_eq!(rx.address_of(2).wrapping_sub(rx.base_address()), 16);
    }
}
