use core::cell::RefCell;
use critical_section::Mutex;
use paste::paste;

enum BitNumber {
    TxComplete = 0,
    RxFrame = 1,
    TxBusError = 2,
    RxBusError = 3,
    RxOverrun = 4,
    CrcError = 5,
    FrameTooLong = 6,
    AlignmentError = 7,
    TxUnderrun = 8,
    LateCollision = 9,
    RxBufferUnavailable = 10,
}

macro_rules! define_event {
    (
        $name:ident, $bit:ident
    ) => {
        paste! {
            pub fn $name(&self) -> bool {
                self.0 & (1 << BitNumber::$bit as u16) != 0
            }

            pub fn [<set_ $name>](self) -> Self {
                Self(self.0 | (1 << BitNumber::$bit as u16))
            }
        }
    };
}

/// Chip independent view of the interrupt status, as decoded by a backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct InterruptEvents(u16);

impl InterruptEvents {
    /// Sources serviced by the transmit interrupt.
    pub const TX: InterruptEvents = InterruptEvents(
        (1 << BitNumber::TxComplete as u16)
            | (1 << BitNumber::TxBusError as u16)
            | (1 << BitNumber::TxUnderrun as u16)
            | (1 << BitNumber::LateCollision as u16),
    );

    /// Sources serviced by the receive interrupt.
    pub const RX: InterruptEvents = InterruptEvents(
        (1 << BitNumber::RxFrame as u16)
            | (1 << BitNumber::RxBusError as u16)
            | (1 << BitNumber::RxOverrun as u16)
            | (1 << BitNumber::CrcError as u16)
            | (1 << BitNumber::FrameTooLong as u16)
            | (1 << BitNumber::AlignmentError as u16)
            | (1 << BitNumber::RxBufferUnavailable as u16),
    );

    pub const ALL: InterruptEvents = InterruptEvents(Self::TX.0 | Self::RX.0);

    pub const fn empty() -> Self {
        InterruptEvents(0)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersection(self, other: InterruptEvents) -> Self {
        Self(self.0 & other.0)
    }

    pub fn union(self, other: InterruptEvents) -> Self {
        Self(self.0 | other.0)
    }

    pub fn difference(self, other: InterruptEvents) -> Self {
        Self(self.0 & !other.0)
    }

    define_event!(tx_complete, TxComplete);
    define_event!(rx_frame, RxFrame);
    define_event!(tx_bus_error, TxBusError);
    define_event!(rx_bus_error, RxBusError);
    define_event!(rx_overrun, RxOverrun);
    define_event!(crc_error, CrcError);
    define_event!(frame_too_long, FrameTooLong);
    define_event!(alignment_error, AlignmentError);
    define_event!(tx_underrun, TxUnderrun);
    define_event!(late_collision, LateCollision);
    define_event!(rx_buffer_unavailable, RxBufferUnavailable);
}

/// Handle through which an interrupt handler reaches the engine.
///
/// The application places one of these in a `static` next to its interrupt handler and registers
/// the engine (usually together with its network stack) after `init()`. The handler then calls
/// [`with`](InterruptContext::with) to dispatch. Only one engine can be registered at a time.
///
/// ```ignore
/// static ETH: InterruptContext<(Emac, Stack)> = InterruptContext::new();
///
/// #[interrupt]
/// fn GMAC() {
///     ETH.with(|(emac, stack)| emac.on_interrupt(stack));
/// }
/// ```
pub struct InterruptContext<E> {
    inner: Mutex<RefCell<Option<E>>>,
}

impl<E> InterruptContext<E> {
    pub const fn new() -> Self {
        InterruptContext {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Register `context`. Hands it back if another one is already registered.
    pub fn register(&self, context: E) -> core::result::Result<(), E> {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow_ref_mut(cs);
            if slot.is_some() {
                return Err(context);
            }
            *slot = Some(context);
            Ok(())
        })
    }

    /// Take the registered context back out, e.g. to deinit the engine.
    pub fn unregister(&self) -> Option<E> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).take())
    }

    /// Run `f` on the registered context inside a critical section.
    pub fn with<R, F: FnOnce(&mut E) -> R>(&self, f: F) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<E> Default for InterruptContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_split_by_direction() {
        let events = InterruptEvents::empty()
            .set_tx_complete()
            .set_rx_frame()
            .set_crc_error();

        let tx = events.intersection(InterruptEvents::TX);
        assert!(tx.tx_complete());
        assert!(!tx.rx_frame());

        let rx = events.intersection(InterruptEvents::RX);
        assert!(rx.rx_frame());
        assert!(rx.crc_error());
        assert!(!rx.tx_complete());
    }

    #[test]
    fn second_registration_is_handed_back() {
        let context: InterruptContext<u32> = InterruptContext::new();
        assert_eq!(context.register(1), Ok(()));
        assert_eq!(context.register(2), Err(2));
        assert_eq!(context.with(|value| *value), Some(1));
    }

    #[test]
    fn with_runs_on_the_registered_context() {
        let context: InterruptContext<u32> = InterruptContext::default();
        assert_eq!(context.with(|value| *value), None);

        context.register(10).unwrap();
        assert_eq!(context.with(|value| {
            *value += 5;
            *value
        }), Some(15));
        assert_eq!(context.with(|value| *value), Some(15));
    }

    #[test]
    fn unregister_frees_the_slot() {
        let context: InterruptContext<u32> = InterruptContext::new();
        assert_eq!(context.unregister(), None);

        context.register(7).unwrap();
        assert_eq!(context.unregister(), Some(7));
        assert_eq!(context.with(|value| *value), None);
        assert!(context.register(8).is_ok());
    }

    #[test]
    fn directions_do_not_overlap() {
        assert!(InterruptEvents::TX.intersection(InterruptEvents::RX).is_empty());
        assert_eq!(InterruptEvents::TX.union(InterruptEvents::RX), InterruptEvents::ALL);
    }
}
