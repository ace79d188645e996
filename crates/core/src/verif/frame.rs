//! SPI frame codec.
//!
//! Both directions use 32-bit frames shifted MSB first.
//!
//! Request (host to target, on MOSI):
//!
//! | Bits    | Field        |
//! |---------|--------------|
//! | 31..29  | chip address |
//! | 28      | WRn          |
//! | 27      | broadcast    |
//! | 26..19  | reg address  |
//! | 18..3   | reg data     |
//! | 2..1    | reserved     |
//! | 0       | stop (1)     |
//!
//! Response (target to host, on MISO, in the frame after a read request):
//!
//! | Bits    | Field                   |
//! |---------|-------------------------|
//! | 31..26  | zero                    |
//! | 25      | marker (1)              |
//! | 24..22  | chip address            |
//! | 21      | WRn                     |
//! | 20      | broadcast               |
//! | 19..4   | data                    |
//! | 3       | status (0 Ok, 1 Error)  |
//! | 2..0    | zero                    |

use std::fmt;

use thiserror::Error;

/// Bits per frame.
pub const FRAME_BITS: u32 = 32;

/// Frame decode failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Request stop bit was 0.
    #[error("stop bit is 0 in request frame {0:#010x}")]
    MissingStop(u32),
    /// Response marker bit was 0.
    #[error("marker bit is 0 in response frame {0:#010x}")]
    MissingMarker(u32),
    /// Response padding contained ones.
    #[error("non-zero padding in response frame {0:#010x}")]
    Padding(u32),
}

/// Transfer direction, encoded in the WRn bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    /// WRn = 0.
    Read,
    /// WRn = 1.
    Write,
}

impl Op {
    /// WRn bit value.
    pub const fn wrn(self) -> bool {
        matches!(self, Self::Write)
    }

    /// Decodes the WRn bit.
    pub const fn from_wrn(wrn: bool) -> Self {
        if wrn { Self::Write } else { Self::Read }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "Read",
            Self::Write => "Write",
        })
    }
}

/// Response status bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Access accepted.
    Ok,
    /// Unsupported or unknown register.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "Ok",
            Self::Error => "Error",
        })
    }
}

const fn field(word: u32, lsb: u32, width: u32) -> u32 {
    (word >> lsb) & ((1 << width) - 1)
}

const fn bit(word: u32, pos: u32) -> bool {
    (word >> pos) & 1 == 1
}

/// Host request frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiRequest {
    /// Target chip address (3 bits).
    pub chip_addr: u8,
    /// Read or write.
    pub op: Op,
    /// Address every chip on the bus.
    pub broadcast: bool,
    /// Register address.
    pub reg_addr: u8,
    /// Write data; ignored for reads.
    pub reg_data: u16,
    /// Reserved bits (2 bits), normally 0.
    pub reserved: u8,
    /// Stop bit, always 1 in a well-formed frame.
    pub stop: bool,
}

impl SpiRequest {
    /// Read request for `reg_addr`.
    pub const fn read(chip_addr: u8, reg_addr: u8) -> Self {
        Self {
            chip_addr,
            op: Op::Read,
            broadcast: false,
            reg_addr,
            reg_data: 0,
            reserved: 0,
            stop: true,
        }
    }

    /// Write request of `reg_data` to `reg_addr`.
    pub const fn write(chip_addr: u8, reg_addr: u8, reg_data: u16) -> Self {
        Self {
            op: Op::Write,
            reg_data,
            ..Self::read(chip_addr, reg_addr)
        }
    }

    /// Packs the frame.
    pub const fn encode(&self) -> u32 {
        ((self.chip_addr as u32 & 0x7) << 29)
            | ((self.op.wrn() as u32) << 28)
            | ((self.broadcast as u32) << 27)
            | ((self.reg_addr as u32) << 19)
            | ((self.reg_data as u32) << 3)
            | ((self.reserved as u32 & 0x3) << 1)
            | self.stop as u32
    }

    /// Unpacks a frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::MissingStop`] if bit 0 is clear.
    pub const fn decode(word: u32) -> Result<Self, FrameError> {
        if !bit(word, 0) {
            return Err(FrameError::MissingStop(word));
        }
        Ok(Self {
            chip_addr: field(word, 29, 3) as u8,
            op: Op::from_wrn(bit(word, 28)),
            broadcast: bit(word, 27),
            reg_addr: field(word, 19, 8) as u8,
            reg_data: field(word, 3, 16) as u16,
            reserved: field(word, 1, 2) as u8,
            stop: true,
        })
    }

    /// Field carried by bit `pos` (31 is sent first).
    pub const fn label(pos: u32) -> &'static str {
        match pos {
            29..=31 => "Chip addr",
            28 => "WRn",
            27 => "Br",
            19..=26 => "Reg addr",
            3..=18 => "Reg data",
            1..=2 => "Rsv",
            0 => "Stp",
            _ => "X",
        }
    }
}

/// Target response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiResponse {
    /// Chip address of the responder.
    pub chip_addr: u8,
    /// Echoed WRn of the request.
    pub op: Op,
    /// Echoed broadcast flag.
    pub broadcast: bool,
    /// Register data.
    pub data: u16,
    /// Access status.
    pub status: Status,
}

impl SpiResponse {
    /// Packs the frame.
    pub const fn encode(&self) -> u32 {
        (1 << 25)
            | ((self.chip_addr as u32 & 0x7) << 22)
            | ((self.op.wrn() as u32) << 21)
            | ((self.broadcast as u32) << 20)
            | ((self.data as u32) << 4)
            | ((matches!(self.status, Status::Error) as u32) << 3)
    }

    /// Unpacks a frame.
    ///
    /// # Errors
    ///
    /// [`FrameError::MissingMarker`] if bit 25 is clear, [`FrameError::Padding`] if any of
    /// bits 31..26 or 2..0 is set.
    pub const fn decode(word: u32) -> Result<Self, FrameError> {
        if field(word, 26, 6) != 0 || field(word, 0, 3) != 0 {
            return Err(FrameError::Padding(word));
        }
        if !bit(word, 25) {
            return Err(FrameError::MissingMarker(word));
        }
        Ok(Self {
            chip_addr: field(word, 22, 3) as u8,
            op: Op::from_wrn(bit(word, 21)),
            broadcast: bit(word, 20),
            data: field(word, 4, 16) as u16,
            status: if bit(word, 3) { Status::Error } else { Status::Ok },
        })
    }

    /// Field carried by bit `pos` (31 is sent first).
    pub const fn label(pos: u32) -> &'static str {
        match pos {
            26..=31 | 0..=2 => "Zero bits",
            25 => "One bit",
            22..=24 => "Chip addr",
            21 => "WRn",
            20 => "Br",
            4..=19 => "Reg data",
            3 => "Status",
            _ => "X",
        }
    }
}

impl fmt::Display for SpiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chip addr={} : Data={:#06x} : Status={}",
            self.chip_addr, self.data, self.status
        )
    }
}

/// Bits of the low `n` bits of `word`, MSB first.
pub fn bits_msb_first(word: u64, n: u32) -> impl Iterator<Item = bool> {
    (0..n).rev().map(move |i| (word >> i) & 1 == 1)
}
