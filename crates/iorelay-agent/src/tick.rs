use crate::channel::{ChannelMode, CHANNEL_COUNT};
use crate::core::IoCore;
use crate::hal::Gpio;

/// Tick period of the background scheduler, in the same millisecond units
/// as pulse and counter durations.
pub const TICK_MS: u32 = 5;

impl<G: Gpio> IoCore<G> {
    /// Advance timed channel behavior by one tick.
    ///
    /// Runs independently of the poll cadence; only Pulse, Counter,
    /// Accumulate and Trigger channels are touched.
    pub fn tick(&mut self) {
        for id in 0..CHANNEL_COUNT {
            match self.bank.channel(id).mode {
                ChannelMode::Pulse => self.tick_pulse(id),
                ChannelMode::Counter => self.tick_counter(id),
                ChannelMode::Accumulate => self.tick_accumulate(id),
                ChannelMode::Trigger => self.tick_trigger(id),
                _ => {}
            }
        }
    }

    fn tick_pulse(&mut self, id: usize) {
        let remaining = self.bank.channel(id).set_value;
        if remaining < TICK_MS {
            self.gpio.digital_write(id, 0);
            let ch = self.bank.channel_mut(id);
            ch.set_value = 0;
            ch.value = 0;
            ch.mode = ChannelMode::Done;
        } else {
            self.bank.channel_mut(id).set_value = remaining - TICK_MS;
        }
    }

    fn tick_counter(&mut self, id: usize) {
        let level = self.gpio.digital_read(id);
        let ch = self.bank.channel_mut(id);
        if ch.last_level == 1 && level == 0 {
            ch.pulse_counter += 1;
        }
        ch.last_level = level;

        ch.value = ch.value.saturating_sub(TICK_MS);
        if ch.value < TICK_MS {
            // Count frozen for the next GET; the dispatcher re-arms.
            ch.mode = ChannelMode::Done;
        }
    }

    fn tick_accumulate(&mut self, id: usize) {
        let level = self.gpio.digital_read(id);
        let ch = self.bank.channel_mut(id);
        if ch.last_level == 1 && level == 0 {
            ch.pulse_counter += 1;
        }
        ch.last_level = level;
    }

    fn tick_trigger(&mut self, id: usize) {
        let level = self.gpio.digital_read(id);
        let ch = self.bank.channel_mut(id);
        let armed = u8::from(ch.set_value != 0);
        if level == armed && ch.last_level == 1 - armed {
            ch.value = 1;
        }
        ch.last_level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::SimGpio;

    const POST: u32 = 0x0200_0000;
    const GET: u32 = 0x0100_0000;

    fn core() -> IoCore<SimGpio> {
        IoCore::new(SimGpio::new())
    }

    #[test]
    fn pulse_retires_after_three_ticks() {
        let mut core = core();
        core.execute(POST | 0x40, 12);
        assert_eq!(core.gpio_mut().digital_read(0), 1);

        core.tick();
        assert_eq!(core.bank().channel(0).mode, ChannelMode::Pulse);
        assert_eq!(core.bank().channel(0).set_value, 5);

        core.tick();
        assert_eq!(core.bank().channel(0).mode, ChannelMode::Pulse);
        assert_eq!(core.bank().channel(0).set_value, 0);

        core.tick();
        assert_eq!(core.bank().channel(0).mode, ChannelMode::Done);
        assert_eq!(core.gpio_mut().digital_read(0), 0);
        assert_eq!(core.bank().channel(0).value, 0);
    }

    #[test]
    fn counter_counts_falling_edges() {
        let mut core = core();
        core.execute(POST | 0x80, 50);

        for level in [1, 1, 0, 1, 0] {
            core.gpio_mut().set_level(0, level);
            core.tick();
        }

        assert_eq!(core.bank().channel(0).pulse_counter, 2);
        assert_eq!(core.bank().channel(0).mode, ChannelMode::Counter);
    }

    #[test]
    fn counter_freezes_count_when_window_expires() {
        let mut core = core();
        core.execute(POST | 0x80, 10);
        core.gpio_mut().set_level(0, 1);
        core.tick();
        core.gpio_mut().set_level(0, 0);
        core.tick();

        assert_eq!(core.bank().channel(0).mode, ChannelMode::Done);
        assert_eq!(core.bank().channel(0).pulse_counter, 1);

        assert_eq!(core.execute(GET | 0x80, 0), 1);
    }

    #[test]
    fn counter_with_sub_tick_window_expires_immediately() {
        let mut core = core();
        core.execute(POST | 0x80, 3);
        core.tick();
        assert_eq!(core.bank().channel(0).mode, ChannelMode::Done);
    }

    #[test]
    fn accumulator_never_expires() {
        let mut core = core();
        core.execute(POST | 0xC0, 0);

        for level in [1, 0, 1, 0, 1, 0] {
            core.gpio_mut().set_level(0, level);
            core.tick();
        }
        for _ in 0..100 {
            core.tick();
        }

        assert_eq!(core.bank().channel(0).mode, ChannelMode::Accumulate);
        assert_eq!(core.execute(GET | 0xC0, 0), 3);
    }

    #[test]
    fn trigger_detects_rising_edge_only_when_armed_rising() {
        let mut core = core();
        core.execute(POST | 0x50, 1);

        core.gpio_mut().set_level(0, 0);
        core.tick();
        assert_eq!(core.bank().channel(0).value, 0);

        core.gpio_mut().set_level(0, 1);
        core.tick();
        assert_eq!(core.bank().channel(0).value, 1);

        // Pending flag latches until a GET drains it.
        core.gpio_mut().set_level(0, 0);
        core.tick();
        assert_eq!(core.execute(GET | 0x50, 0), 1);
        assert_eq!(core.execute(GET | 0x50, 0), 0);
    }

    #[test]
    fn trigger_detects_falling_edge_when_armed_falling() {
        let mut core = core();
        core.execute(POST | 0x50, 0);

        core.gpio_mut().set_level(0, 1);
        core.tick();
        assert_eq!(core.bank().channel(0).value, 0);

        core.gpio_mut().set_level(0, 0);
        core.tick();
        assert_eq!(core.bank().channel(0).value, 1);
    }

    #[test]
    fn idle_modes_are_untouched() {
        let mut core = core();
        core.execute(POST | 0x60, 1500);
        let before = *core.bank().channel(0);
        core.tick();
        let after = *core.bank().channel(0);
        assert_eq!(before.mode, after.mode);
        assert_eq!(before.value, after.value);
        assert_eq!(before.set_value, after.set_value);
    }
}
