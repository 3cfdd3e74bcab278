use tracing::trace;

use crate::channel::ChannelMode;
use crate::command::{Command, Method, ServiceGroup, SERVICE_AGENT_RESET};
use crate::core::IoCore;
use crate::hal::{AnalogReference, Gpio};
use crate::tick::TICK_MS;

/// Servo pulse width clamp, microseconds.
const SERVO_MIN_US: u32 = 800;
const SERVO_MAX_US: u32 = 2200;

/// Full-range PWM duty clamp.
const DUTY_MAX: u32 = 255;

/// Reference selector argument for the internal 1.1 V reference.
const REFERENCE_INTERNAL_MV: u32 = 1100;

/// Default RMS full-scale reference, millivolts.
const REFERENCE_DEFAULT_MV: u32 = 5000;

impl<G: Gpio> IoCore<G> {
    /// Execute one register-pair command and return the reply value.
    ///
    /// Commands that do not decode (unknown method, unknown group, index
    /// outside the bank) are accepted and answered with 0 without touching
    /// any channel; remote callers rely on being ignored, not rejected.
    pub fn execute(&mut self, word: u32, argument: u32) -> u32 {
        if (word & 0x00FF_FFFF) == SERVICE_AGENT_RESET {
            // Whole-agent reset slot; the hub does not issue it today.
            trace!("agent reset service ignored");
            return 0;
        }

        let Some(cmd) = Command::decode(word, argument) else {
            trace!(word = format_args!("{word:#010x}"), "command dropped");
            return 0;
        };

        match cmd.group {
            ServiceGroup::DigitalInput => self.digital_input(cmd),
            ServiceGroup::DigitalOutput => self.digital_output(cmd),
            ServiceGroup::AnalogInput => self.analog_input(cmd),
            ServiceGroup::PulseOutput => self.pulse_output(cmd),
            ServiceGroup::TriggerInput => self.trigger_input(cmd),
            ServiceGroup::ServoOutput => self.servo_output(cmd),
            ServiceGroup::FullPwmOutput => self.full_pwm_output(cmd),
            ServiceGroup::DigitalCounter => self.digital_counter(cmd),
            ServiceGroup::RmsInput => self.rms_input(cmd),
            ServiceGroup::Accumulator => self.accumulator(cmd),
            ServiceGroup::ResetChannel => self.reset_service(cmd),
        }
    }

    fn digital_input(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Input);
        match cmd.method {
            Method::Get => u32::from(self.gpio.digital_read(cmd.channel)),
            Method::Post => 0,
        }
    }

    fn digital_output(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Output);
        match cmd.method {
            Method::Get => self.bank.channel(cmd.channel).value,
            Method::Post => {
                let level = u8::from(cmd.argument != 0);
                self.gpio.digital_write(cmd.channel, level);
                self.bank.channel_mut(cmd.channel).value = u32::from(level);
                u32::from(level)
            }
        }
    }

    fn analog_input(&mut self, cmd: Command) -> u32 {
        if self.bank.channel(cmd.channel).mode != ChannelMode::Adc {
            self.ensure_mode(cmd.channel, ChannelMode::Adc);
            self.gpio.set_analog_reference(AnalogReference::Default);
        }
        match cmd.method {
            Method::Get => self.gpio.analog_read(cmd.channel),
            Method::Post => {
                self.gpio.set_analog_reference(reference_for(cmd.argument));
                0
            }
        }
    }

    fn pulse_output(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Pulse);
        match cmd.method {
            Method::Get => self.bank.channel(cmd.channel).value,
            Method::Post => {
                let duration = (cmd.argument / TICK_MS) * TICK_MS;
                let level = u8::from(cmd.argument != 0);
                self.gpio.digital_write(cmd.channel, level);
                let ch = self.bank.channel_mut(cmd.channel);
                ch.set_value = duration;
                ch.value = u32::from(level);
                duration
            }
        }
    }

    fn trigger_input(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Trigger);
        let ch = self.bank.channel_mut(cmd.channel);
        match cmd.method {
            Method::Get => {
                let pending = ch.value;
                ch.value = 0;
                pending
            }
            Method::Post => {
                ch.value = 0;
                ch.last_level = 0;
                ch.set_value = cmd.argument;
                0
            }
        }
    }

    fn servo_output(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Pwm);
        match cmd.method {
            Method::Get => self.bank.channel(cmd.channel).value,
            Method::Post => {
                let width = cmd.argument.clamp(SERVO_MIN_US, SERVO_MAX_US);
                self.gpio.servo_write_us(cmd.channel, width);
                let ch = self.bank.channel_mut(cmd.channel);
                ch.set_value = width;
                ch.value = width;
                width
            }
        }
    }

    fn full_pwm_output(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::FullPwm);
        match cmd.method {
            Method::Get => self.bank.channel(cmd.channel).value,
            Method::Post => {
                let duty = cmd.argument.min(DUTY_MAX);
                self.gpio.pwm_write_duty(cmd.channel, duty as u8);
                let ch = self.bank.channel_mut(cmd.channel);
                ch.set_value = duty;
                ch.value = duty;
                duty
            }
        }
    }

    fn digital_counter(&mut self, cmd: Command) -> u32 {
        match cmd.method {
            Method::Get => {
                if self.bank.channel(cmd.channel).mode != ChannelMode::Done {
                    return 0;
                }
                // The tick scheduler froze the count when the window ran
                // out; hand it over and re-arm for the rounded remainder.
                let ch = *self.bank.channel(cmd.channel);
                let count = ch.pulse_counter;
                self.ensure_mode(cmd.channel, ChannelMode::Counter);
                let rearmed = self.bank.channel_mut(cmd.channel);
                rearmed.set_value = ch.set_value;
                rearmed.value = (ch.set_value / TICK_MS) * TICK_MS;
                count
            }
            Method::Post => {
                self.ensure_mode(cmd.channel, ChannelMode::Counter);
                let window = (cmd.argument / TICK_MS) * TICK_MS;
                let ch = self.bank.channel_mut(cmd.channel);
                ch.set_value = cmd.argument;
                ch.pulse_counter = 0;
                ch.value = window;
                window
            }
        }
    }

    fn rms_input(&mut self, cmd: Command) -> u32 {
        if self.bank.channel(cmd.channel).mode != ChannelMode::Rms {
            self.ensure_mode(cmd.channel, ChannelMode::Rms);
            self.gpio.set_analog_reference(AnalogReference::Default);
            self.bank.channel_mut(cmd.channel).set_value = REFERENCE_DEFAULT_MV;
        }
        match cmd.method {
            Method::Get => self.measure_rms(cmd.channel),
            Method::Post => {
                let reference = reference_for(cmd.argument);
                self.gpio.set_analog_reference(reference);
                self.bank.channel_mut(cmd.channel).set_value = match reference {
                    AnalogReference::Internal1V1 => REFERENCE_INTERNAL_MV,
                    AnalogReference::Default => REFERENCE_DEFAULT_MV,
                };
                0
            }
        }
    }

    fn accumulator(&mut self, cmd: Command) -> u32 {
        self.ensure_mode(cmd.channel, ChannelMode::Accumulate);
        let ch = self.bank.channel_mut(cmd.channel);
        match cmd.method {
            Method::Get => ch.pulse_counter,
            Method::Post => {
                ch.value = 0;
                ch.pulse_counter = 0;
                ch.set_value = 0;
                0
            }
        }
    }

    fn reset_service(&mut self, cmd: Command) -> u32 {
        if cmd.method == Method::Post {
            self.reset_channel(cmd.channel);
        }
        0
    }
}

fn reference_for(argument: u32) -> AnalogReference {
    if argument == REFERENCE_INTERNAL_MV {
        AnalogReference::Internal1V1
    } else {
        AnalogReference::Default
    }
}
