// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! MIPS R3000A register file and program counter.
//!
//! The instruction decoder, pipeline, and exception handling that would
//! normally live here are out of scope for this crate: the CPU is a
//! named collaborator that the scheduler, DMA engine, and MMIO dispatch
//! call into, not something this crate implements. What remains is the
//! architectural state (GPRs, PC, HI/LO) and the icache hook points the
//! memory bus expects to call when code is written to RAM, so the rest
//! of the system can be built and tested against a real register file
//! without a full decoder.

use super::error::Result;
use super::memory::Bus;
use super::timing::TimingEventManager;

/// BIOS reset vector. Every PSX CPU begins execution here.
pub const RESET_VECTOR: u32 = 0xBFC00000;

/// MIPS R3000A architectural state: general-purpose registers, PC, and
/// the HI/LO multiply/divide result pair.
pub struct CPU {
    pc: u32,
    next_pc: u32,
    regs: [u32; 32],
    hi: u32,
    lo: u32,
}

impl CPU {
    pub fn new() -> Self {
        Self {
            pc: RESET_VECTOR,
            next_pc: RESET_VECTOR.wrapping_add(4),
            regs: [0; 32],
            hi: 0,
            lo: 0,
        }
    }

    /// Reset to the BIOS entry point. $zero stays wired to 0; every
    /// other register is cleared, matching a hardware power-on reset.
    pub fn reset(&mut self) {
        self.pc = RESET_VECTOR;
        self.next_pc = RESET_VECTOR.wrapping_add(4);
        self.regs = [0; 32];
        self.hi = 0;
        self.lo = 0;
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Read general-purpose register `index`. $zero (register 0) always
    /// reads as 0, regardless of what was last written to it.
    pub fn reg(&self, index: u8) -> u32 {
        if index == 0 {
            0
        } else {
            self.regs[index as usize]
        }
    }

    /// Write general-purpose register `index`. Writes to $zero are
    /// silently discarded.
    pub fn set_reg(&mut self, index: u8, value: u32) {
        if index != 0 {
            self.regs[index as usize] = value;
        }
    }

    /// Write a register with a one-instruction load delay. The real
    /// pipeline defers load results by a slot; without a decoder to
    /// drive that slot there's nothing to delay, so this writes through
    /// immediately. Kept as a distinct method so callers that model load
    /// delays externally have a stable entry point to target.
    pub fn set_reg_delayed(&mut self, index: u8, value: u32) {
        self.set_reg(index, value);
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn set_hi_lo(&mut self, hi: u32, lo: u32) {
        self.hi = hi;
        self.lo = lo;
    }

    /// Stand-in for one pipeline cycle: advances the program counter by
    /// one instruction word and reports its cycle cost. No instruction
    /// is actually fetched or decoded from `bus`; the reference is kept
    /// so the call site shape matches a real decoder's.
    pub fn step(&mut self, _bus: &mut Bus) -> Result<u32> {
        self.pc = self.next_pc;
        self.next_pc = self.next_pc.wrapping_add(4);
        Ok(1)
    }

    /// Run `step` until the timing system's frame target is reached,
    /// feeding consumed cycles back into the scheduler after each step.
    pub fn execute(&mut self, bus: &mut Bus, timing: &mut TimingEventManager) -> Result<()> {
        while !timing.should_exit_loop() {
            let cycles = self.step(bus)?;
            timing.pending_ticks += cycles as i32;
            timing.run_events();
        }
        Ok(())
    }

    /// Instruction cache hooks kept for the memory bus's write-coherency
    /// queue (see `Bus::drain_icache_invalidate_queue` and friends).
    /// There is no icache to invalidate without a decoder driving
    /// fetches, so these are no-ops that exist purely so the bus's
    /// queues have somewhere to drain to.
    pub fn invalidate_icache(&mut self, _addr: u32) {}

    pub fn invalidate_icache_range(&mut self, _start: u32, _end: u32) {}

    pub fn prefill_icache(&mut self, _addr: u32, _instruction: u32) {}

    pub fn dump_registers(&self) {
        log::info!(
            "PC=0x{:08X} HI=0x{:08X} LO=0x{:08X}",
            self.pc,
            self.hi,
            self.lo
        );
        for (i, r) in self.regs.iter().enumerate() {
            log::info!("  r{:<2} = 0x{:08X}", i, r);
        }
    }
}

impl Default for CPU {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resets_to_bios_vector() {
        let mut cpu = CPU::new();
        cpu.set_reg(1, 0xDEAD);
        cpu.reset();
        assert_eq!(cpu.pc(), RESET_VECTOR);
        assert_eq!(cpu.reg(1), 0);
    }

    #[test]
    fn zero_register_is_hardwired() {
        let mut cpu = CPU::new();
        cpu.set_reg(0, 0x1234);
        assert_eq!(cpu.reg(0), 0);
    }

    #[test]
    fn set_reg_delayed_writes_through() {
        let mut cpu = CPU::new();
        cpu.set_reg_delayed(8, 42);
        assert_eq!(cpu.reg(8), 42);
    }

    #[test]
    fn step_advances_pc_by_one_instruction() {
        let mut cpu = CPU::new();
        let mut bus = Bus::new();
        let pc0 = cpu.pc();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.pc(), pc0 + 4);
    }
}
