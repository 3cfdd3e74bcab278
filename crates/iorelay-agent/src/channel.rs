use crate::hal::PinConfig;

/// Fixed size of the channel bank.
pub const CHANNEL_COUNT: usize = 4;

/// Behavior a channel is configured into.
///
/// The interpretation of [`Channel::value`], [`Channel::set_value`] and
/// [`Channel::pulse_counter`] depends on the mode; switching modes resets
/// whatever the new mode does not reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelMode {
    /// Neutral state; all fields zero, pin high-impedance.
    #[default]
    Reset,
    /// Digital output; `value` holds the last written level.
    Output,
    /// Digital input.
    Input,
    /// Servo output; `value`/`set_value` hold the applied pulse width.
    Pwm,
    /// Timed pulse; `set_value` counts down the remaining duration.
    Pulse,
    /// Raw analog input.
    Adc,
    /// Full-range PWM output; `value`/`set_value` hold the applied duty.
    FullPwm,
    /// Timed edge counter; `value` counts down, `pulse_counter` counts edges.
    Counter,
    /// RMS measurement; `set_value` holds the reference voltage in mV.
    Rms,
    /// Edge detector; `set_value` holds the armed polarity, `value` the
    /// pending flag.
    Trigger,
    /// A timed mode ran out; results are frozen until the next GET.
    Done,
    /// Free-running edge counter.
    Accumulate,
}

/// One virtual I/O channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Channel {
    pub mode: ChannelMode,
    pub value: u32,
    pub set_value: u32,
    pub pulse_counter: u32,
    pub last_level: u8,
}

/// The bank of virtual channels, owned by one controller and mutated only
/// by command dispatch and the tick scheduler.
#[derive(Debug, Default)]
pub struct ChannelBank {
    channels: [Channel; CHANNEL_COUNT],
}

impl ChannelBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, id: usize) -> &Channel {
        &self.channels[id]
    }

    pub fn channel_mut(&mut self, id: usize) -> &mut Channel {
        &mut self.channels[id]
    }
}

/// Pin configuration a mode requires, if it touches the pin at all.
///
/// `Done` is entered by the tick scheduler without reconfiguring hardware.
pub fn pin_config_for(mode: ChannelMode) -> Option<PinConfig> {
    match mode {
        ChannelMode::Reset
        | ChannelMode::Input
        | ChannelMode::Trigger
        | ChannelMode::Adc
        | ChannelMode::Rms => Some(PinConfig::Input),
        ChannelMode::Counter | ChannelMode::Accumulate => Some(PinConfig::InputPullup),
        ChannelMode::Output | ChannelMode::Pulse => Some(PinConfig::Output),
        ChannelMode::Pwm => Some(PinConfig::Servo),
        ChannelMode::FullPwm => Some(PinConfig::Pwm),
        ChannelMode::Done => None,
    }
}
