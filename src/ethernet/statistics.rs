use super::InterruptEvents;

/// Running counters kept by the engine. All counters wrap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, defmt::Format)]
pub struct Statistics {
    pub frames_received: u32,
    pub frames_transmitted: u32,
    pub rx_dropped_frames: u32,
    pub rx_overruns: u32,
    pub rx_buffer_unavailable: u32,
    pub crc_errors: u32,
    pub frame_too_long: u32,
    pub alignment_errors: u32,
    pub tx_underruns: u32,
    pub late_collisions: u32,
}

impl Statistics {
    pub(crate) fn record(&mut self, events: InterruptEvents) {
        let bump = |counter: &mut u32, hit: bool| {
            if hit {
                *counter = counter.wrapping_add(1);
            }
        };

        bump(&mut self.rx_overruns, events.rx_overrun());
        bump(&mut self.rx_buffer_unavailable, events.rx_buffer_unavailable());
        bump(&mut self.crc_errors, events.crc_error());
        bump(&mut self.frame_too_long, events.frame_too_long());
        bump(&mut self.alignment_errors, events.alignment_error());
        bump(&mut self.tx_underruns, events.tx_underrun());
        bump(&mut self.late_collisions, events.late_collision());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_flagged_events_are_counted() {
        let mut statistics = Statistics::default();
        statistics.record(InterruptEvents::empty().set_crc_error().set_rx_frame());
        statistics.record(InterruptEvents::empty().set_crc_error().set_tx_underrun());

        assert_eq!(statistics.crc_errors, 2);
        assert_eq!(statistics.tx_underruns, 1);
        assert_eq!(statistics.rx_overruns, 0);
        assert_eq!(statistics.frames_received, 0);
    }
}
