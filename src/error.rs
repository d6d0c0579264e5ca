use thiserror::Error;

/// Crate-level error type. Fatal emulation failures surface here instead of panicking,
/// so a host's `step_frame` loop can report them rather than aborting the process.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid ROM: {reason}")]
    InvalidRom { reason: String },
    #[error("invalid opcode 0x{byte:02X} at pc 0x{pc:04X}")]
    InvalidOpcode { pc: u16, byte: u8 },
    #[error("save state does not match this cartridge: {reason}")]
    SaveMismatch { reason: String },
    #[error("unsupported memory bank controller")]
    UnsupportedMbc,
}
