use crate::channel::CHANNEL_COUNT;

/// Service code for the no-op command.
pub const SERVICE_NOP: u32 = 0x0000;

/// Service code reserved for a whole-agent reset.
pub const SERVICE_AGENT_RESET: u32 = 0x000F;

/// Request method carried in the top byte of a command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Method::Get),
            2 => Some(Method::Post),
            _ => None,
        }
    }
}

/// Channel handler family, selected by the high nibble block of the
/// service code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceGroup {
    DigitalInput,
    DigitalOutput,
    AnalogInput,
    PulseOutput,
    TriggerInput,
    ServoOutput,
    FullPwmOutput,
    DigitalCounter,
    RmsInput,
    Accumulator,
    ResetChannel,
}

impl ServiceGroup {
    fn from_code(code: u32) -> Option<Self> {
        match code {
            0x0010 => Some(ServiceGroup::DigitalInput),
            0x0020 => Some(ServiceGroup::DigitalOutput),
            0x0030 => Some(ServiceGroup::AnalogInput),
            0x0040 => Some(ServiceGroup::PulseOutput),
            0x0050 => Some(ServiceGroup::TriggerInput),
            0x0060 => Some(ServiceGroup::ServoOutput),
            0x0070 => Some(ServiceGroup::FullPwmOutput),
            0x0080 => Some(ServiceGroup::DigitalCounter),
            0x0090 => Some(ServiceGroup::RmsInput),
            0x00C0 => Some(ServiceGroup::Accumulator),
            0x00F0 => Some(ServiceGroup::ResetChannel),
            _ => None,
        }
    }
}

/// One decoded register-pair command.
///
/// The command word packs method (top byte) and service code (low 24 bits);
/// the service code splits into handler group and channel index. Anything
/// that does not decode — unknown method, unknown group, index outside the
/// bank — is dropped by returning `None`; the dispatcher treats that as a
/// silent no-op rather than an error.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub method: Method,
    pub group: ServiceGroup,
    pub channel: usize,
    pub argument: u32,
}

impl Command {
    pub fn decode(word: u32, argument: u32) -> Option<Self> {
        let method = Method::from_code(word >> 24)?;
        let service = word & 0x00FF_FFFF;
        let group = ServiceGroup::from_code(service & 0xFFF0)?;
        let channel = (service & 0x000F) as usize;
        if channel >= CHANNEL_COUNT {
            return None;
        }
        Some(Self {
            method,
            group,
            channel,
            argument,
        })
    }
}
