
error_chain! {
    errors {
        #[doc = "A motion range bound is out of order or outside the hardware limits."]
        RangeInvalid(bound: &'static str, min: f64, center: f64, max: f64) {
            description("invalid motion range")
            display("{} in range ({}, {}, {}) is not valid", bound, min, center, max)
        }
        #[doc = "The configured control device kind is not supported."]
        UnsupportedDeviceKind(kind: String) {
            description("unsupported device kind")
            display("device {} is unsupported", kind)
        }
        #[doc = "The PWM capability was never initialized, or the device channel is outside it."]
        ActuatorUnavailable {
            description("PWM capability unavailable")
            display("PWM capability is not initialized")
        }
        #[doc = "The PWM driver does not support the configured channel count."]
        UnsupportedChannelCount(count: u8) {
            description("unsupported PWM channel count")
            display("{} is not a supported PWM channel count", count)
        }
        #[doc = "A commanded position falls outside the device envelope."]
        PositionOutOfRange(position: f64, min: f64, max: f64) {
            description("position out of range")
            display("position {} is not included between {} and {}", position, min, max)
        }
        #[doc = "An inbound message could not be decoded."]
        MalformedMessage(detail: String) {
            description("malformed message")
            display("malformed message: {}", detail)
        }
        #[doc = "An inbound message addressed another vehicle."]
        ForeignUnit(expected: String, received: String) {
            description("message for a foreign unit")
            display("message for unit {} ignored, expected {}", received, expected)
        }
        #[doc = "A physical pulse write failed."]
        ActuatorWrite(channel: u8, detail: String) {
            description("PWM write failed")
            display("PWM write on channel {} failed: {}", channel, detail)
        }
        #[doc = "A transport operation failed."]
        Link(detail: String) {
            description("link error")
            display("link error: {}", detail)
        }
    }
}

impl ErrorKind {
    /// Severity split for dispatch callers: command validation failures are
    /// logged and the offending command dropped; transport errors wait out
    /// the transport's own reconnect. Everything else aborts the current
    /// control cycle.
    pub fn is_fatal(&self) -> bool {
        match *self {
            ErrorKind::PositionOutOfRange(..)
            | ErrorKind::MalformedMessage(..)
            | ErrorKind::ForeignUnit(..)
            | ErrorKind::Link(..) => false,
            _ => true,
        }
    }
}
