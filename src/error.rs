use thiserror::Error;

/// Every fatal condition the core can raise. All of them terminate execution;
/// none are caught or retried (spec §7 — there is no exception model here).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("address {addr} out of range [0, {limit})")]
    AddressOutOfRange { addr: i64, limit: i64 },

    #[error("user-mode memory violation at address {addr}")]
    ProtectionFault { addr: i64 },

    #[error("PC {pc} out of bounds [0, {program_len})")]
    PcOutOfBounds { pc: i64, program_len: usize },

    #[error("bad syscall vector {handler} in mem[40], expected [0, {program_len})")]
    BadSyscallVector { handler: i64, program_len: usize },

    #[error("unimplemented opcode encountered at execute time")]
    UnimplementedOpcode,

    #[error("{path}:{line}: {reason}")]
    Loader {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("i/o error reading {path}: {message}")]
    Io { path: String, message: String },
}
