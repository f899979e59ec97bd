use heapless::Vec;

/// One buffer of a received frame and how many of its bytes belong to the frame.
#[derive(Debug)]
pub struct RxFragment<B> {
    pub buffer: B,
    pub len: usize,
}

/// A frame taken off the receive ring, in descriptor order.
///
/// Ownership of every buffer passes to whoever holds the frame. A frame never spans more
/// descriptors than the ring has, so `N` bounds the fragment count.
#[derive(Debug)]
pub struct RxFrame<B, const N: usize> {
    fragments: Vec<RxFragment<B>, N>,
    len: usize,
}

impl<B, const N: usize> RxFrame<B, N> {
    pub(crate) fn new(fragments: Vec<RxFragment<B>, N>, len: usize) -> Self {
        RxFrame { fragments, len }
    }

    /// Frame length as reported by the hardware.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn fragments(&self) -> &[RxFragment<B>] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<RxFragment<B>, N> {
        self.fragments
    }

    /// Copy the frame into `out`, returning the number of bytes written.
    ///
    /// Stops early when `out` is too short.
    pub fn copy_to(&self, out: &mut [u8]) -> usize
    where
        B: AsRef<[u8]>,
    {
        let mut written = 0;
        for fragment in self.fragments.iter() {
            let data = &fragment.buffer.as_ref()[..fragment.len];
            let count = data.len().min(out.len() - written);
            out[written..written + count].copy_from_slice(&data[..count]);
            written += count;
            if written == out.len() {
                break;
            }
        }
        written
    }
}
