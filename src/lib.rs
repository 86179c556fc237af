//! Core of the GTU-C312 virtual machine: a deterministic, two-privilege-level
//! instruction-set interpreter with a trapping syscall mechanism and a
//! memory-protected flat address space, driven by the textual program/data
//! file format that is the instruction encoding (there is no binary form).

pub mod error;
pub mod instruction;
pub mod loader;
pub mod machine;
pub mod memory;
pub mod opcode;

pub use error::CoreError;
pub use instruction::{Instruction, Program};
pub use loader::Loader;
pub use machine::Machine;
pub use memory::{Memory, Mode, KERNEL_REG_LIMIT, MEM_SIZE, USER_MEM_START};
pub use opcode::{Op, SyscallVariant};
