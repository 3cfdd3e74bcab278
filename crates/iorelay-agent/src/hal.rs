use crate::channel::CHANNEL_COUNT;

/// Electrical configuration applied to a channel's pin.
///
/// Reconfiguring a channel that was servo-attached detaches the servo; the
/// implementation owns that bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinConfig {
    /// High-impedance input.
    #[default]
    Input,
    /// Input with the internal pull-up resistor engaged.
    InputPullup,
    /// Push-pull digital output.
    Output,
    /// Servo-attached output (pulse-width in microseconds).
    Servo,
    /// Hardware PWM output (8-bit duty).
    Pwm,
}

/// ADC reference voltage selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalogReference {
    /// Board default (5000 mV or 3300 mV full scale).
    #[default]
    Default,
    /// Internal 1100 mV reference.
    Internal1V1,
}

/// Hardware seam the channel bank drives.
///
/// One implementation per board; channel ids are the bank's 0-based indices,
/// the implementation maps them onto physical pins.
pub trait Gpio {
    fn configure(&mut self, channel: usize, config: PinConfig);
    fn digital_read(&mut self, channel: usize) -> u8;
    fn digital_write(&mut self, channel: usize, level: u8);
    fn analog_read(&mut self, channel: usize) -> u32;
    fn set_analog_reference(&mut self, reference: AnalogReference);
    fn servo_write_us(&mut self, channel: usize, value: u32);
    fn pwm_write_duty(&mut self, channel: usize, value: u8);
}

/// In-memory GPIO used by demos and tests.
///
/// Digital writes loop back to reads; analog samples replay whatever the
/// harness loaded via [`SimGpio::set_analog_sequence`].
#[derive(Debug, Default)]
pub struct SimGpio {
    pins: [SimPin; CHANNEL_COUNT],
    reference: AnalogReference,
}

#[derive(Debug, Default)]
struct SimPin {
    config: PinConfig,
    level: u8,
    analog: Vec<u32>,
    analog_pos: usize,
    servo_us: u32,
    duty: u8,
}

impl SimGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the sampled digital level of a channel.
    pub fn set_level(&mut self, channel: usize, level: u8) {
        self.pins[channel].level = level;
    }

    /// Load the analog samples a channel will replay. The last sample
    /// repeats once the sequence is exhausted.
    pub fn set_analog_sequence(&mut self, channel: usize, samples: Vec<u32>) {
        self.pins[channel].analog = samples;
        self.pins[channel].analog_pos = 0;
    }

    pub fn pin_config(&self, channel: usize) -> PinConfig {
        self.pins[channel].config
    }

    pub fn analog_reference(&self) -> AnalogReference {
        self.reference
    }

    pub fn servo_us(&self, channel: usize) -> u32 {
        self.pins[channel].servo_us
    }

    pub fn pwm_duty(&self, channel: usize) -> u8 {
        self.pins[channel].duty
    }
}

impl Gpio for SimGpio {
    fn configure(&mut self, channel: usize, config: PinConfig) {
        self.pins[channel].config = config;
    }

    fn digital_read(&mut self, channel: usize) -> u8 {
        self.pins[channel].level
    }

    fn digital_write(&mut self, channel: usize, level: u8) {
        self.pins[channel].level = if level == 0 { 0 } else { 1 };
    }

    fn analog_read(&mut self, channel: usize) -> u32 {
        let pin = &mut self.pins[channel];
        match pin.analog.get(pin.analog_pos) {
            Some(&sample) => {
                if pin.analog_pos + 1 < pin.analog.len() {
                    pin.analog_pos += 1;
                }
                sample
            }
            None => 0,
        }
    }

    fn set_analog_reference(&mut self, reference: AnalogReference) {
        self.reference = reference;
    }

    fn servo_write_us(&mut self, channel: usize, value: u32) {
        self.pins[channel].servo_us = value;
    }

    fn pwm_write_duty(&mut self, channel: usize, value: u8) {
        self.pins[channel].duty = value;
    }
}
