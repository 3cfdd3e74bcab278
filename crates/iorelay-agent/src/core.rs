use crate::channel::{pin_config_for, Channel, ChannelBank, ChannelMode};
use crate::hal::{Gpio, PinConfig};

/// The channel bank plus the hardware it drives.
///
/// This is the state shared between the poll orchestrator and the tick
/// scheduler; both reach it through one mutex so compound updates (countdown
/// plus mode flip, edge sample plus counter bump) are seen atomically by the
/// other flow.
#[derive(Debug)]
pub struct IoCore<G> {
    pub(crate) bank: ChannelBank,
    pub(crate) gpio: G,
}

impl<G: Gpio> IoCore<G> {
    pub fn new(gpio: G) -> Self {
        Self {
            bank: ChannelBank::new(),
            gpio,
        }
    }

    pub fn bank(&self) -> &ChannelBank {
        &self.bank
    }

    pub fn gpio(&self) -> &G {
        &self.gpio
    }

    pub fn gpio_mut(&mut self) -> &mut G {
        &mut self.gpio
    }

    /// Switch a channel into `mode` if it is not there already.
    ///
    /// Applies the pin configuration the mode needs and zeroes every field
    /// the previous mode may have left behind; handlers restore the fields
    /// their mode reuses afterwards.
    pub(crate) fn ensure_mode(&mut self, id: usize, mode: ChannelMode) {
        if self.bank.channel(id).mode == mode {
            return;
        }
        if let Some(config) = pin_config_for(mode) {
            self.gpio.configure(id, config);
        }
        *self.bank.channel_mut(id) = Channel {
            mode,
            ..Channel::default()
        };
    }

    /// Force a channel back to its neutral state, fields zeroed.
    pub(crate) fn reset_channel(&mut self, id: usize) {
        self.gpio.configure(id, PinConfig::Input);
        *self.bank.channel_mut(id) = Channel::default();
    }
}
