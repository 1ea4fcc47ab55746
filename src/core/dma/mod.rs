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

//! DMA (Direct Memory Access) Controller
//!
//! This module implements the PlayStation's DMA controller, which provides high-speed
//! data transfers between memory and peripherals without CPU intervention.
//!
//! # DMA Channels
//!
//! The PSX has 7 DMA channels, each dedicated to a specific peripheral:
//!
//! | Channel | Device      | Base Address | Cycles/word |
//! |---------|-------------|--------------|-------------|
//! | 0       | MDEC In     | 0x1F801080   | 1           |
//! | 1       | MDEC Out    | 0x1F801090   | 1           |
//! | 2       | GPU         | 0x1F8010A0   | 1           |
//! | 3       | CD-ROM      | 0x1F8010B0   | 24          |
//! | 4       | SPU         | 0x1F8010C0   | 4           |
//! | 5       | PIO         | 0x1F8010D0   | 1           |
//! | 6       | OTC         | 0x1F8010E0   | 1           |
//!
//! # Channel Registers
//!
//! Each channel has three 32-bit registers:
//! - **MADR** (+0x00): Memory address register
//! - **BCR** (+0x04): Block control register
//! - **CHCR** (+0x08): Channel control register
//!
//! # Global Registers
//!
//! - **DPCR** (0x1F8010F0): DMA control register (per-channel priority + enable)
//! - **DICR** (0x1F8010F4): DMA interrupt register
//!
//! # Transfer Modes
//!
//! - **Mode 0** (burst): transfer the whole block, optionally chopped into
//!   bursts of `2^chop_ws` words separated by `2^chop_cc` bus-release cycles.
//! - **Mode 1** (block/sync): transfer `nblocks` blocks of `bsize` words,
//!   calling the device's `sync` hook before each block; a `false` reply
//!   parks the channel until the device calls [`DMA::activate_channel`].
//! - **Mode 2** (linked-list): GPU only. Follows a singly-linked list of
//!   command buffers terminated by a `0x00FFFFFF` next-node pointer.
//!
//! Channels are serviced in priority order: the priority queue is a max-heap
//! keyed by (effective priority, channel id), so a lower DPCR priority
//! nibble wins, and ties prefer the higher channel id.
//!
//! # References
//!
//! - [PSX-SPX: DMA Controller](http://problemkaputt.de/psx-spx.htm#dmacontroller)

use crate::core::cdrom::CDROM;
use crate::core::gpu::GPU;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::mdec::MDEC;
use crate::core::spu::SPU;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[cfg(test)]
mod tests;

/// Synchronization mode, CHCR bits 9-10.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SyncMode {
    Burst,
    Block,
    LinkedList,
    Reserved,
}

impl SyncMode {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => SyncMode::Burst,
            1 => SyncMode::Block,
            2 => SyncMode::LinkedList,
            _ => SyncMode::Reserved,
        }
    }
}

/// Single DMA channel
///
/// Each channel manages transfers for one specific peripheral device.
#[derive(Clone)]
pub struct DMAChannel {
    /// Memory Address Register (MADR)
    base_address: u32,

    /// Block Control Register (BCR)
    ///
    /// Bits 0-15: block size (words). Bits 16-31: block count (mode 1) or
    /// unused (mode 0, where bits 0-15 hold the burst word count instead).
    block_control: u32,

    /// Channel Control Register (CHCR)
    ///
    /// - Bit 0: direction (0=to RAM, 1=from RAM)
    /// - Bit 1: address step (0=forward, 1=backward)
    /// - Bit 8: chopping enable
    /// - Bits 9-10: sync mode
    /// - Bits 16-18: chopping DMA window size (2^n words)
    /// - Bits 20-22: chopping CPU window size (2^n cycles)
    /// - Bit 24: start/busy flag
    /// - Bit 28: manual trigger (mode 0 only)
    channel_control: u32,

    /// Channel ID (0-6)
    channel_id: u8,

    /// Set when a block-mode transfer blocked on the device's `sync` hook;
    /// cleared by [`DMA::activate_channel`].
    parked: bool,
}

impl DMAChannel {
    /// Direction: Device to RAM
    const TRANSFER_TO_RAM: u32 = 0;

    /// Direction: RAM to Device
    const TRANSFER_FROM_RAM: u32 = 1;

    fn new(channel_id: u8) -> Self {
        Self {
            base_address: 0,
            block_control: 0,
            channel_control: 0,
            channel_id,
            parked: false,
        }
    }

    /// Check if channel is active (bit 24 of CHCR)
    #[inline(always)]
    pub fn is_active(&self) -> bool {
        (self.channel_control & 0x0100_0000) != 0
    }

    /// Get transfer direction (bit 0 of CHCR)
    #[inline(always)]
    pub fn direction(&self) -> u32 {
        self.channel_control & 1
    }

    #[inline(always)]
    fn backward(&self) -> bool {
        (self.channel_control & 2) != 0
    }

    fn sync_mode(&self) -> SyncMode {
        SyncMode::from_bits(self.channel_control >> 9)
    }

    /// Check if manual trigger is enabled (bit 28 of CHCR, mode 0 only)
    #[inline(always)]
    pub fn trigger(&self) -> bool {
        (self.channel_control & 0x1000_0000) != 0
    }

    fn chopping_enabled(&self) -> bool {
        (self.channel_control & 0x0100) != 0
    }

    fn chop_dma_window(&self) -> u32 {
        (self.channel_control >> 16) & 7
    }

    fn chop_cpu_window(&self) -> u32 {
        (self.channel_control >> 20) & 7
    }

    /// Whether this channel is ready to run: active, and either mode 0 with
    /// the trigger bit set, or any other mode (which starts immediately).
    fn ready(&self) -> bool {
        if self.parked || !self.is_active() {
            return false;
        }
        match self.sync_mode() {
            SyncMode::Burst => self.trigger(),
            _ => true,
        }
    }

    fn deactivate(&mut self) {
        log::trace!("DMA channel {} deactivated", self.channel_id);
        self.channel_control &= !0x0100_0000;
        self.channel_control &= !0x1000_0000;
    }
}

/// A candidate channel in the scheduling queue.
///
/// `Ord` compares `effective_priority` first (0 = highest real-hardware
/// priority is mapped to the largest key here, so [`BinaryHeap`]'s max-heap
/// serves it first) and `channel_id` second, so ties prefer the higher id.
#[derive(PartialEq, Eq)]
struct QueueEntry {
    effective_priority: u8,
    channel_id: u8,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.effective_priority, self.channel_id).cmp(&(other.effective_priority, other.channel_id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// External peripherals a running transfer may need to reach.
pub struct DmaPeripherals<'a> {
    pub ram: &'a mut [u8],
    pub gpu: &'a mut GPU,
    pub cdrom: &'a mut CDROM,
    pub spu: &'a mut SPU,
    pub mdec: &'a mut MDEC,
    pub irq: &'a mut InterruptController,
}

/// DMA Controller with 7 channels
///
/// # Examples
///
/// ```
/// use psrx::core::dma::DMA;
///
/// let mut dma = DMA::new();
/// assert_eq!(dma.read_control(), 0x07654321);
/// ```
pub struct DMA {
    /// 7 DMA channels (MDEC In/Out, GPU, CD-ROM, SPU, PIO, OTC)
    channels: [DMAChannel; 7],

    /// DMA Control Register (DPCR) at 0x1F8010F0
    control: u32,

    /// DMA Interrupt Register (DICR) at 0x1F8010F4
    interrupt: u32,
}

impl DMA {
    /// Channel 0: MDEC In (compression input)
    pub const CH_MDEC_IN: usize = 0;

    /// Channel 1: MDEC Out (decompression output)
    pub const CH_MDEC_OUT: usize = 1;

    /// Channel 2: GPU (graphics)
    pub const CH_GPU: usize = 2;

    /// Channel 3: CD-ROM (disc drive)
    pub const CH_CDROM: usize = 3;

    /// Channel 4: SPU (sound)
    pub const CH_SPU: usize = 4;

    /// Channel 5: PIO (expansion port)
    pub const CH_PIO: usize = 5;

    /// Channel 6: OTC (ordering table clear)
    pub const CH_OTC: usize = 6;

    /// Cycles consumed transferring one word on each channel.
    const CCPERWORD: [i64; 7] = [1, 1, 1, 24, 4, 1, 1];

    /// Create a new DMA controller
    ///
    /// All channels start inactive with default priority ordering.
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(|i| DMAChannel::new(i as u8)),
            control: 0x0765_4321,
            interrupt: 0,
        }
    }

    /// Channel priority, DPCR bits `4n..4n+2` (0 = highest real-hardware
    /// priority).
    fn priority(&self, ch: usize) -> u8 {
        ((self.control >> (ch * 4)) & 7) as u8
    }

    /// Channel master-enable bit, DPCR bit `4n+3`.
    fn master_enabled(&self, ch: usize) -> bool {
        (self.control & (8 << (ch * 4))) != 0
    }

    /// Called by a device once it can accept the rest of a parked block
    /// transfer (e.g. the CD-ROM buffering another sector, or MDEC
    /// finishing a macroblock).
    pub fn activate_channel(&mut self, ch: usize) {
        self.channels[ch].parked = false;
    }

    /// Runs every ready channel once, in priority order, to completion or
    /// until it parks. Returns the total CPU cycles the bus was occupied,
    /// for the scheduler to charge against the CPU.
    pub fn tick(&mut self, p: &mut DmaPeripherals) -> i64 {
        let mut queue = BinaryHeap::new();
        for ch in 0..7 {
            if self.master_enabled(ch) && self.channels[ch].ready() {
                queue.push(QueueEntry {
                    effective_priority: 7 - self.priority(ch),
                    channel_id: ch as u8,
                });
            }
        }

        let mut total_cycles = 0i64;
        while let Some(entry) = queue.pop() {
            let ch = entry.channel_id as usize;
            if !self.channels[ch].ready() {
                continue;
            }
            total_cycles += self.run_channel(ch, p);
        }
        total_cycles
    }

    fn run_channel(&mut self, ch: usize, p: &mut DmaPeripherals) -> i64 {
        match ch {
            Self::CH_GPU => self.run_gpu(p),
            Self::CH_CDROM => self.run_cdrom(p),
            Self::CH_SPU => self.run_spu(p),
            Self::CH_MDEC_IN => self.run_mdec_in(p),
            Self::CH_MDEC_OUT => self.run_mdec_out(p),
            Self::CH_OTC => self.run_otc(p),
            Self::CH_PIO => {
                log::warn!("DMA5 (PIO) is not connected to any device, halting");
                self.channels[ch].deactivate();
                0
            }
            _ => unreachable!("DMA channel ids are 0..=6"),
        }
    }

    fn finish(&mut self, ch: usize, irq: &mut InterruptController) {
        self.channels[ch].deactivate();
        self.request_channel_irq(ch, irq);
    }

    fn request_channel_irq(&mut self, ch: usize, irq: &mut InterruptController) {
        let enable_bit = 1 << (16 + ch);
        if self.interrupt & enable_bit != 0 {
            self.interrupt |= 1 << (24 + ch);
        }
        if self.master_irq_pending() {
            irq.request(interrupts::DMA);
        }
    }

    /// Master DMA interrupt flag (DICR bit 31): forced (bit 15), or
    /// master-enabled (bit 23) with at least one enabled channel flagged.
    fn master_irq_pending(&self) -> bool {
        let forced = self.interrupt & 0x8000 != 0;
        let master_enabled = self.interrupt & 0x0080_0000 != 0;
        let any_flagged = (self.interrupt >> 24) & (self.interrupt >> 16) & 0x7F != 0;
        forced || (master_enabled && any_flagged)
    }

    fn run_gpu(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_GPU;
        match self.channels[ch].sync_mode() {
            SyncMode::LinkedList => self.run_gpu_linked_list(p),
            SyncMode::Burst | SyncMode::Block => self.run_gpu_block(p),
            SyncMode::Reserved => {
                log::warn!("DMA2 (GPU) sync mode 3 is reserved, halting");
                self.channels[ch].deactivate();
                0
            }
        }
    }

    fn run_gpu_linked_list(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_GPU;
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let mut words = 0i64;

        loop {
            let header = read_ram_u32(p.ram, addr);
            let count = (header >> 24) as u32;

            for i in 0..count {
                let word = read_ram_u32(p.ram, addr + 4 + i * 4);
                p.gpu.write_gp0(word);
                words += 1;
            }

            if (header & 0x00FF_FFFF) == 0x00FF_FFFF {
                break;
            }
            addr = header & 0x001F_FFFC;
        }

        self.finish(ch, p.irq);
        log::debug!("GPU DMA linked-list transfer complete ({} words)", words);
        words * Self::CCPERWORD[ch]
    }

    fn run_gpu_block(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_GPU;
        let direction = self.channels[ch].direction();
        let backward = self.channels[ch].backward();
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let total_words = self.burst_or_block_words(ch);

        for _ in 0..total_words {
            if direction == DMAChannel::TRANSFER_FROM_RAM {
                let word = read_ram_u32(p.ram, addr);
                p.gpu.write_gp0(word);
            } else {
                let word = p.gpu.read_gpuread();
                write_ram_u32(p.ram, addr, word);
            }
            addr = step_addr(addr, backward);
        }

        self.finish(ch, p.irq);
        log::debug!("GPU DMA block transfer complete ({} words)", total_words);
        total_words as i64 * Self::CCPERWORD[ch] + self.chop_overhead_cycles(ch, total_words)
    }

    fn run_cdrom(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_CDROM;
        let backward = self.channels[ch].backward();
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let bsize = (self.channels[ch].block_control & 0xFFFF) as usize;
        let bsize = if bsize == 0 { 0x1_0000 } else { bsize };
        let nblocks = ((self.channels[ch].block_control >> 16) & 0xFFFF).max(1) as usize;

        let mut words_done = 0usize;
        for _ in 0..nblocks {
            if p.cdrom.dma_words_available() < bsize {
                self.channels[ch].parked = true;
                return words_done as i64 * Self::CCPERWORD[ch];
            }
            for _ in 0..bsize {
                let b0 = p.cdrom.get_data_byte();
                let b1 = p.cdrom.get_data_byte();
                let b2 = p.cdrom.get_data_byte();
                let b3 = p.cdrom.get_data_byte();
                write_ram_u32(p.ram, addr, u32::from_le_bytes([b0, b1, b2, b3]));
                addr = step_addr(addr, backward);
                words_done += 1;
            }
        }

        self.finish(ch, p.irq);
        log::debug!("CD-ROM DMA transfer complete ({} words)", words_done);
        words_done as i64 * Self::CCPERWORD[ch]
    }

    /// (block size, block count) for the current transfer: a single block
    /// covering the whole burst in mode 0, or the BCR-defined blocks in
    /// mode 1.
    fn block_plan(&self, ch: usize) -> (u32, u32) {
        match self.channels[ch].sync_mode() {
            SyncMode::Burst => (self.burst_or_block_words(ch), 1),
            _ => {
                let bcr = self.channels[ch].block_control;
                let bsize = bcr & 0xFFFF;
                let bsize = if bsize == 0 { 0x1_0000 } else { bsize };
                let nblocks = ((bcr >> 16) & 0xFFFF).max(1);
                (bsize, nblocks)
            }
        }
    }

    fn run_spu(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_SPU;
        let direction = self.channels[ch].direction();
        let backward = self.channels[ch].backward();
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let (bsize, nblocks) = self.block_plan(ch);

        let mut words_done = 0u32;
        for _ in 0..nblocks {
            for _ in 0..bsize {
                if direction == DMAChannel::TRANSFER_FROM_RAM {
                    let word = read_ram_u32(p.ram, addr);
                    p.spu.dma_write_word(word as u16);
                    p.spu.dma_write_word((word >> 16) as u16);
                } else {
                    let lo = p.spu.dma_read_word() as u32;
                    let hi = p.spu.dma_read_word() as u32;
                    write_ram_u32(p.ram, addr, lo | (hi << 16));
                }
                addr = step_addr(addr, backward);
                words_done += 1;
            }
        }

        self.finish(ch, p.irq);
        log::debug!("SPU DMA transfer complete ({} words)", words_done);
        words_done as i64 * Self::CCPERWORD[ch] + self.chop_overhead_cycles(ch, words_done)
    }

    fn run_mdec_in(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_MDEC_IN;
        let backward = self.channels[ch].backward();
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let (bsize, nblocks) = self.block_plan(ch);

        let mut words_done = 0u32;
        for _ in 0..nblocks {
            if !p.mdec.dma_in_sync(bsize.saturating_sub(1)) {
                self.channels[ch].parked = true;
                return words_done as i64 * Self::CCPERWORD[ch];
            }
            for _ in 0..bsize {
                let word = read_ram_u32(p.ram, addr);
                p.mdec.dma_in_write(word);
                addr = step_addr(addr, backward);
                words_done += 1;
            }
        }

        self.finish(ch, p.irq);
        log::debug!("MDEC-in DMA transfer complete ({} words)", words_done);
        words_done as i64 * Self::CCPERWORD[ch]
    }

    fn run_mdec_out(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_MDEC_OUT;
        let backward = self.channels[ch].backward();
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;
        let (bsize, nblocks) = self.block_plan(ch);

        let mut words_done = 0u32;
        for _ in 0..nblocks {
            if !p.mdec.dma_out_sync(bsize.saturating_sub(1)) {
                self.channels[ch].parked = true;
                return words_done as i64 * Self::CCPERWORD[ch];
            }
            for _ in 0..bsize {
                let word = p.mdec.dma_out_read();
                write_ram_u32(p.ram, addr, word);
                addr = step_addr(addr, backward);
                words_done += 1;
            }
        }

        self.finish(ch, p.irq);
        log::debug!("MDEC-out DMA transfer complete ({} words)", words_done);
        words_done as i64 * Self::CCPERWORD[ch]
    }

    /// OTC (Ordering Table Clear): synthesizes a reverse-linked list
    /// terminating in `0x00FFFFFF`, used to seed GPU command-list order
    /// tables. The source is synthetic; no external device is consulted.
    fn run_otc(&mut self, p: &mut DmaPeripherals) -> i64 {
        let ch = Self::CH_OTC;
        let count = {
            let bcr = self.channels[ch].block_control & 0xFFFF;
            if bcr == 0 {
                0x1_0000
            } else {
                bcr
            }
        };
        let mut addr = self.channels[ch].base_address & 0x001F_FFFC;

        for i in 0..count {
            if i == count - 1 {
                write_ram_u32(p.ram, addr, 0x00FF_FFFF);
            } else {
                write_ram_u32(p.ram, addr, addr.wrapping_sub(4) & 0x001F_FFFC);
            }
            addr = addr.wrapping_sub(4) & 0x001F_FFFC;
        }

        self.finish(ch, p.irq);
        log::debug!("OTC DMA transfer complete ({} entries)", count);
        count as i64 * Self::CCPERWORD[ch]
    }

    /// Extra bus-release cycles a chopped burst transfer incurs: the gaps
    /// between `2^chop_dma_window`-word bursts, each `2^chop_cpu_window`
    /// cycles long. Only meaningful in burst (mode 0) transfers.
    fn chop_overhead_cycles(&self, ch: usize, total_words: u32) -> i64 {
        let channel = &self.channels[ch];
        if channel.sync_mode() != SyncMode::Burst || !channel.chopping_enabled() {
            return 0;
        }
        let window = 1u32 << channel.chop_dma_window();
        let bursts = total_words.div_ceil(window).max(1);
        let release = 1i64 << channel.chop_cpu_window();
        (bursts as i64 - 1) * release
    }

    /// Total words for the current transfer: the chop-adjusted burst count
    /// in mode 0, or `bsize * nblocks` in mode 1.
    fn burst_or_block_words(&self, ch: usize) -> u32 {
        let bcr = self.channels[ch].block_control;
        match self.channels[ch].sync_mode() {
            SyncMode::Burst => {
                let n = bcr & 0xFFFF;
                if n == 0 {
                    0x1_0000
                } else {
                    n
                }
            }
            _ => {
                let bsize = bcr & 0xFFFF;
                let bsize = if bsize == 0 { 0x1_0000 } else { bsize };
                let nblocks = (bcr >> 16) & 0xFFFF;
                bsize * nblocks.max(1)
            }
        }
    }

    // ---- Register access -------------------------------------------------

    pub fn read_madr(&self, channel: usize) -> u32 {
        self.channels[channel].base_address
    }

    pub fn write_madr(&mut self, channel: usize, value: u32) {
        self.channels[channel].base_address = value & 0x00FF_FFFF;
        log::trace!("DMA{} MADR = 0x{:08X}", channel, value);
    }

    pub fn read_bcr(&self, channel: usize) -> u32 {
        self.channels[channel].block_control
    }

    pub fn write_bcr(&mut self, channel: usize, value: u32) {
        self.channels[channel].block_control = value;
        log::trace!("DMA{} BCR = 0x{:08X}", channel, value);
    }

    pub fn read_chcr(&self, channel: usize) -> u32 {
        self.channels[channel].channel_control
    }

    pub fn write_chcr(&mut self, channel: usize, value: u32) {
        self.channels[channel].channel_control = value;
        self.channels[channel].parked = false;
        log::trace!("DMA{} CHCR = 0x{:08X}", channel, value);

        if (value & 0x0100_0000) != 0 {
            log::debug!(
                "DMA{} started: addr=0x{:08X} bcr=0x{:08X} mode={:?}",
                channel,
                self.channels[channel].base_address,
                self.channels[channel].block_control,
                self.channels[channel].sync_mode()
            );
        }
    }

    pub fn read_control(&self) -> u32 {
        self.control
    }

    pub fn write_control(&mut self, value: u32) {
        self.control = value;
        log::trace!("DPCR = 0x{:08X}", value);
    }

    pub fn read_interrupt(&self) -> u32 {
        self.interrupt
    }

    /// Write DMA Interrupt Register (DICR)
    ///
    /// Bits 0-5 are reserved and unwritable; bits 6-23 (force/enable
    /// configuration) are replaced outright; bits 24-30 (per-channel flags)
    /// are write-1-to-clear.
    pub fn write_interrupt(&mut self, value: u32) {
        self.interrupt = (self.interrupt & 0x003F) | (value & 0x00FF_FFC0);
        let clear_mask = (value >> 24) & 0x7F;
        self.interrupt &= !(clear_mask << 24);
        log::trace!("DICR = 0x{:08X}", self.interrupt);
    }
}

impl Default for DMA {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
fn step_addr(addr: u32, backward: bool) -> u32 {
    if backward {
        addr.wrapping_sub(4) & 0x001F_FFFC
    } else {
        (addr + 4) & 0x001F_FFFC
    }
}

#[inline(always)]
fn read_ram_u32(ram: &[u8], addr: u32) -> u32 {
    let addr = (addr & 0x001F_FFFC) as usize;
    if addr + 4 > ram.len() {
        log::error!("DMA read out of bounds: 0x{:08X}", addr);
        return 0;
    }
    u32::from_le_bytes([ram[addr], ram[addr + 1], ram[addr + 2], ram[addr + 3]])
}

#[inline(always)]
fn write_ram_u32(ram: &mut [u8], addr: u32, value: u32) {
    let addr = (addr & 0x001F_FFFC) as usize;
    if addr + 4 > ram.len() {
        log::error!("DMA write out of bounds: 0x{:08X}", addr);
        return;
    }
    ram[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
}
