use crate::error::CoreError;

/// Total number of addressable words (spec §3).
pub const MEM_SIZE: i64 = 11_000;

/// Upper bound (exclusive) of the always-accessible kernel register block.
pub const KERNEL_REG_LIMIT: i64 = 20;

/// First address of the user-accessible region.
pub const USER_MEM_START: i64 = 1_000;

/// Privilege level the machine is currently executing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Kernel,
    User,
}

/// The flat, protected address space. Every read and write in the
/// interpreter routes through [`Memory::read`] / [`Memory::write`] — the
/// single gate spec §4.1 describes, so instructions like `CPYI2` that touch
/// several dynamically-computed addresses in one tick are checked
/// independently, once per access.
#[derive(Debug, Clone)]
pub struct Memory {
    cells: Vec<i64>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEM_SIZE as usize],
        }
    }

    fn check_address(mode: Mode, addr: i64) -> Result<(), CoreError> {
        if !(0..MEM_SIZE).contains(&addr) {
            return Err(CoreError::AddressOutOfRange {
                addr,
                limit: MEM_SIZE,
            });
        }
        if mode == Mode::User && (KERNEL_REG_LIMIT..USER_MEM_START).contains(&addr) {
            return Err(CoreError::ProtectionFault { addr });
        }
        Ok(())
    }

    pub fn read(&self, mode: Mode, addr: i64) -> Result<i64, CoreError> {
        Self::check_address(mode, addr)?;
        Ok(self.cells[addr as usize])
    }

    pub fn write(&mut self, mode: Mode, addr: i64, value: i64) -> Result<(), CoreError> {
        Self::check_address(mode, addr)?;
        self.cells[addr as usize] = value;
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_mode_reaches_every_cell() {
        let mut mem = Memory::new();
        mem.write(Mode::Kernel, MEM_SIZE - 1, 42).unwrap();
        assert_eq!(mem.read(Mode::Kernel, MEM_SIZE - 1).unwrap(), 42);
    }

    #[test]
    fn out_of_range_is_fatal() {
        let mem = Memory::new();
        assert!(mem.read(Mode::Kernel, MEM_SIZE).is_err());
        assert!(mem.read(Mode::Kernel, -1).is_err());
    }

    #[test]
    fn user_mode_register_block_is_always_reachable() {
        let mut mem = Memory::new();
        mem.write(Mode::User, 19, 7).unwrap();
        assert_eq!(mem.read(Mode::User, 19).unwrap(), 7);
    }

    #[test]
    fn user_mode_kernel_region_faults() {
        let mem = Memory::new();
        assert!(mem.read(Mode::User, 20).is_err());
        assert!(mem.read(Mode::User, 999).is_err());
    }

    #[test]
    fn user_mode_user_region_is_reachable() {
        let mut mem = Memory::new();
        mem.write(Mode::User, 1000, 5).unwrap();
        assert_eq!(mem.read(Mode::User, 1000).unwrap(), 5);
    }
}
