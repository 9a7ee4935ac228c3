/// Message kind carried in field `m`
///
/// The integer assignment is fixed for every peer of a deployment.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub enum MessageKind {
    /// Ask for the talker's description
    Talk = 0,
    /// Read or change the talker's channel
    Channel = 1,
    /// Liveness probe, replied verbatim
    Ping = 2,
    /// Invoke an action without argument
    Run = 3,
    /// Invoke an action with a `u32` argument
    Set = 4,
    /// Invoke an action returning a `u32`
    Get = 5,
    /// Enumerate the manifesto
    List = 6,
    /// Read-only introspection (plus mute)
    Sys = 7,
    /// Reply to a previous request
    Echo = 8,
    /// Error report
    Error = 9,
    /// Invalid or absent kind
    #[default]
    Noise = 10,
}

impl MessageKind {
    pub const fn from_u32(value: u32) -> Self {
        match value {
            0 => MessageKind::Talk,
            1 => MessageKind::Channel,
            2 => MessageKind::Ping,
            3 => MessageKind::Run,
            4 => MessageKind::Set,
            5 => MessageKind::Get,
            6 => MessageKind::List,
            7 => MessageKind::Sys,
            8 => MessageKind::Echo,
            9 => MessageKind::Error,
            _ => MessageKind::Noise,
        }
    }

    /// CALL-kind messages invoke a manifesto action and expect an acknowledged reply
    pub const fn is_call(self) -> bool {
        matches!(self, MessageKind::Run | MessageKind::Set | MessageKind::Get)
    }

    /// Kinds that may be delivered without an explicit `t` target
    pub const fn is_broadcastable(self) -> bool {
        matches!(
            self,
            MessageKind::Talk | MessageKind::Channel | MessageKind::Ping
        )
    }

    pub const fn name(self) -> &'static str {
        match self {
            MessageKind::Talk => "talk",
            MessageKind::Channel => "channel",
            MessageKind::Ping => "ping",
            MessageKind::Run => "run",
            MessageKind::Set => "set",
            MessageKind::Get => "get",
            MessageKind::List => "list",
            MessageKind::Sys => "sys",
            MessageKind::Echo => "echo",
            MessageKind::Error => "error",
            MessageKind::Noise => "noise",
        }
    }
}

impl core::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Acknowledgement code carried in field `r`
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Ack {
    Roger = 0,
    Negative = 1,
    SayAgain = 2,
    Nil = 3,
}

impl Ack {
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Ack::Roger),
            1 => Some(Ack::Negative),
            2 => Some(Ack::SayAgain),
            3 => Some(Ack::Nil),
            _ => None,
        }
    }

    pub const fn from_outcome(success: bool) -> Self {
        if success {
            Ack::Roger
        } else {
            Ack::Negative
        }
    }
}

/// SYS sub-code carried in field `s`
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SysCode {
    Board = 0,
    Mute = 1,
    Drops = 2,
    Delay = 3,
    Socket = 4,
    Talker = 5,
    Manifesto = 6,
}

impl SysCode {
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(SysCode::Board),
            1 => Some(SysCode::Mute),
            2 => Some(SysCode::Drops),
            3 => Some(SysCode::Delay),
            4 => Some(SysCode::Socket),
            5 => Some(SysCode::Talker),
            6 => Some(SysCode::Manifesto),
            _ => None,
        }
    }
}

/// ERROR sub-code carried in field `s`
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request carried no identity and one was synthesized
    Identity = 0,
}

/// Type of the value stored under a key
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValueType {
    String,
    Integer,
    Other,
    /// Absent, or the scan ran off the end of the buffer
    Void,
}
