//! Frame identifiers
//!
//! The ID/control byte carries the application identifier in its low six
//! bits. Bit 7 marks a transport frame (which is followed by a sequence
//! byte on the wire). Two values with bit 6 set are reserved for the
//! transport layer's own control frames.

/// Highest identifier available to applications
pub const MAX_APP_ID: u8 = 0x3F;

/// Set on the ID/control byte of every frame that carries a sequence number
pub const TRANSPORT_BIT: u8 = 0x80;

// Wire format values
const ID_MASK: u8 = 0x3F;
const RESERVED_BIT: u8 = 0x40;
const ID_ACK: u8 = 0xFF;
const ID_RESET: u8 = 0xFE;

/// Decoded ID/control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameId {
    /// Unreliable application frame, delivered at most once with no retry
    App(u8),
    /// Reliable application frame, sequenced and acknowledged
    Transport(u8),
    /// Cumulative acknowledgement
    Ack,
    /// Transport resynchronization request
    Reset,
}

impl FrameId {
    /// Parse an identifier from its wire format byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            ID_ACK => Some(FrameId::Ack),
            ID_RESET => Some(FrameId::Reset),
            b if b & RESERVED_BIT != 0 => None,
            b if b & TRANSPORT_BIT != 0 => Some(FrameId::Transport(b & ID_MASK)),
            b => Some(FrameId::App(b)),
        }
    }

    /// Convert to wire format byte
    pub fn to_byte(self) -> u8 {
        match self {
            FrameId::App(id) => id & ID_MASK,
            FrameId::Transport(id) => TRANSPORT_BIT | (id & ID_MASK),
            FrameId::Ack => ID_ACK,
            FrameId::Reset => ID_RESET,
        }
    }

    /// Returns true if a sequence byte follows the ID/control byte
    pub fn has_seq(&self) -> bool {
        !matches!(self, FrameId::App(_))
    }

    /// Application identifier, if this frame carries application data
    pub fn app_id(&self) -> Option<u8> {
        match self {
            FrameId::App(id) | FrameId::Transport(id) => Some(*id),
            FrameId::Ack | FrameId::Reset => None,
        }
    }

    /// Returns true if the application identifier fits in the ID/control byte
    pub fn is_valid(&self) -> bool {
        self.app_id().map_or(true, |id| id <= MAX_APP_ID)
    }
}
