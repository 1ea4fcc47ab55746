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

//! MDEC (Motion Decoder)
//!
//! Decodes run-length/Huffman-coded macroblocks (as produced by the CD-ROM's
//! STR video streams) into 16x16 luma / 8x8 chroma blocks, runs them through
//! an inverse DCT, and converts the result to RGB or monochrome output words.
//!
//! The decoder is throttled: each macroblock takes a fixed number of cycles
//! to materialize even if its input words all arrive at once, matching the
//! unit's documented throughput of roughly 9000 macroblocks/second.
//!
//! # References
//!
//! - [PSX-SPX: Macroblock Decoder (MDEC)](http://problemkaputt.de/psx-spx.htm#motiondecodermdec)

#[cfg(test)]
mod tests;

use std::collections::VecDeque;

/// Cycles required to materialize one macroblock (33,868,800 Hz / 9000 blocks/s).
const CC_MACROBLOCK: i64 = 3763;
/// Cap on how far the clock is allowed to free-run before an event is due.
const CC_MAX: i64 = 100_000;

/// Input/output FIFO depth, sized to hold one full macroblock stream comfortably.
const FIFO_CAPACITY: usize = 0x40000;

const DEFAULT_ST: [i16; 64] = [
    0x5A82u16 as i16, 0x5A82u16 as i16, 0x5A82u16 as i16, 0x5A82u16 as i16,
    0x5A82u16 as i16, 0x5A82u16 as i16, 0x5A82u16 as i16, 0x5A82u16 as i16,
    0x7D8Au16 as i16, 0x6A6Du16 as i16, 0x471Cu16 as i16, 0x18F8u16 as i16,
    0xE707u16 as i16, 0xB8E3u16 as i16, 0x9592u16 as i16, 0x8275u16 as i16,
    0x7641u16 as i16, 0x30FBu16 as i16, 0xCF04u16 as i16, 0x89BEu16 as i16,
    0x89BEu16 as i16, 0xCF04u16 as i16, 0x30FBu16 as i16, 0x7641u16 as i16,
    0x6A6Du16 as i16, 0xE707u16 as i16, 0x8275u16 as i16, 0xB8E3u16 as i16,
    0x471Cu16 as i16, 0x7D8Au16 as i16, 0x18F8u16 as i16, 0x9592u16 as i16,
    0x5A82u16 as i16, 0xA57Du16 as i16, 0xA57Du16 as i16, 0x5A82u16 as i16,
    0x5A82u16 as i16, 0xA57Du16 as i16, 0xA57Du16 as i16, 0x5A82u16 as i16,
    0x471Cu16 as i16, 0x8275u16 as i16, 0x18F8u16 as i16, 0x6A6Du16 as i16,
    0x9592u16 as i16, 0xE707u16 as i16, 0x7D8Au16 as i16, 0xB8E3u16 as i16,
    0x30FBu16 as i16, 0x89BEu16 as i16, 0x7641u16 as i16, 0xCF04u16 as i16,
    0xCF04u16 as i16, 0x7641u16 as i16, 0x89BEu16 as i16, 0x30FBu16 as i16,
    0x18F8u16 as i16, 0xB8E3u16 as i16, 0x6A6Du16 as i16, 0x8275u16 as i16,
    0x7D8Au16 as i16, 0x9592u16 as i16, 0x471Cu16 as i16, 0xE707u16 as i16,
];

const ZIGZAG: [usize; 64] = [
    0, 1, 5, 6, 14, 15, 27, 28,
    2, 4, 7, 13, 16, 26, 29, 42,
    3, 8, 12, 17, 25, 30, 41, 43,
    9, 11, 18, 24, 31, 40, 44, 53,
    10, 19, 23, 32, 39, 45, 52, 54,
    20, 22, 33, 38, 46, 51, 55, 60,
    21, 34, 37, 47, 50, 56, 59, 61,
    35, 36, 48, 49, 57, 58, 62, 63,
];

/// Current-block codes, matching the STAT register's bits 16-18.
mod block_id {
    pub const Y1: u32 = 0;
    pub const Y2: u32 = 1;
    pub const Y3: u32 = 2;
    pub const Y4: u32 = 3;
    pub const CR: u32 = 4;
    pub const CB: u32 = 5;
    pub const Y_MONO: u32 = 4;
}

fn signed10(val: i32) -> i32 {
    let v = val & 0x3FF;
    if v & 0x200 != 0 {
        v - 1024
    } else {
        v
    }
}

/// The 6-step macroblock sequence for colour output: chroma first, then the
/// four luma quadrants, each immediately composited into the framebuffer.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ColourStep {
    Cr,
    Cb,
    Y1,
    Y2,
    Y3,
    Y4,
}

impl ColourStep {
    fn next(self) -> Option<Self> {
        match self {
            ColourStep::Cr => Some(ColourStep::Cb),
            ColourStep::Cb => Some(ColourStep::Y1),
            ColourStep::Y1 => Some(ColourStep::Y2),
            ColourStep::Y2 => Some(ColourStep::Y3),
            ColourStep::Y3 => Some(ColourStep::Y4),
            ColourStep::Y4 => None,
        }
    }

    fn block_id(self) -> u32 {
        match self {
            ColourStep::Cr => block_id::CR,
            ColourStep::Cb => block_id::CB,
            ColourStep::Y1 => block_id::Y1,
            ColourStep::Y2 => block_id::Y2,
            ColourStep::Y3 => block_id::Y3,
            ColourStep::Y4 => block_id::Y4,
        }
    }

    /// Top-left corner of this quadrant within the 16x16 luma plane. Only
    /// meaningful for the Y steps.
    fn origin(self) -> (usize, usize) {
        match self {
            ColourStep::Y1 => (0, 0),
            ColourStep::Y2 => (8, 0),
            ColourStep::Y3 => (0, 8),
            ColourStep::Y4 => (8, 8),
            _ => (0, 0),
        }
    }
}

/// Resumable run-length block decoder. Mirrors the reference's
/// switch-on-line-number coroutine as an explicit state machine: each call
/// to `step` either completes the block (running the IDCT) or returns
/// `false` when the input bin buffer has run dry, preserving enough state
/// to resume exactly where it left off.
struct BlockDecoder {
    phase: BlockPhase,
    k: i32,
    q_scale: i32,
    n: i32,
    val: f64,
}

#[derive(PartialEq, Eq)]
enum BlockPhase {
    ReadFirst,
    StoreAndReadNext,
}

impl BlockDecoder {
    fn new() -> Self {
        Self {
            phase: BlockPhase::ReadFirst,
            k: 0,
            q_scale: 0,
            n: 0,
            val: 0.0,
        }
    }

    /// Attempts to drive the block to completion using whatever lies in
    /// `bin`. Returns `true` once `blk` holds the fully decoded,
    /// IDCT-transformed 8x8 block.
    fn step(&mut self, bin: &mut VecDeque<u16>, qt: &[u8; 64], blk: &mut [f64; 64]) -> bool {
        loop {
            match self.phase {
                BlockPhase::ReadFirst => {
                    let word = match bin.pop_front() {
                        Some(w) => w as i32,
                        None => return false,
                    };
                    if word == 0xFE00 {
                        continue;
                    }
                    self.n = word;
                    self.q_scale = (word >> 10) & 0x3F;
                    let qt_aux = qt[self.k as usize] as i32;
                    self.val = (signed10(word) * qt_aux) as f64;
                    self.phase = BlockPhase::StoreAndReadNext;
                }
                BlockPhase::StoreAndReadNext => {
                    let mut val = self.val;
                    if self.q_scale == 0 {
                        val = (signed10(self.n) * 2) as f64;
                    }
                    val = val.clamp(-1024.0, 1023.0);
                    if self.q_scale == 0 {
                        blk[self.k as usize] = val;
                    } else {
                        blk[ZIGZAG[self.k as usize]] = val;
                    }

                    let word = match bin.pop_front() {
                        Some(w) => w as i32,
                        None => return false,
                    };
                    self.n = word;
                    self.k += ((word >> 10) & 0x3F) + 1;
                    if self.k > 63 {
                        return true;
                    }
                    let qt_aux = qt[self.k as usize] as i32;
                    self.val =
                        ((signed10(self.n) * qt_aux * self.q_scale + 4) as f64) / 8.0;
                }
            }
        }
    }

    fn reset(&mut self) {
        self.phase = BlockPhase::ReadFirst;
        self.k = 0;
        self.q_scale = 0;
        self.n = 0;
        self.val = 0.0;
    }
}

/// Separable real IDCT: two passes of an 8-point transform against the
/// (possibly custom) scale table, rounding to the nearest integer after
/// each pass exactly as the reference does.
fn real_idct_core(blk: &mut [f64; 64], st: &[f64; 64]) {
    let mut src = *blk;
    let mut dst = [0.0f64; 64];
    for _ in 0..2 {
        for x in 0..8 {
            for y in 0..8 {
                let mut sum = 0.0;
                for z in 0..8 {
                    sum += src[y + z * 8] * st[x + z * 8];
                }
                dst[x + y * 8] = (sum + 0.5).floor();
            }
        }
        src = dst;
    }
    *blk = src;
}

/// Output colour depth selector, STAT bits 25-26.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OutDepth {
    Mono4,
    Mono8,
    Rgb24,
    Rgb15,
}

impl OutDepth {
    fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => OutDepth::Mono4,
            1 => OutDepth::Mono8,
            2 => OutDepth::Rgb24,
            _ => OutDepth::Rgb15,
        }
    }

    fn bits(self) -> u32 {
        match self {
            OutDepth::Mono4 => 0,
            OutDepth::Mono8 => 1,
            OutDepth::Rgb24 => 2,
            OutDepth::Rgb15 => 3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Command {
    None,
    Decode,
    SetQt,
    SetSt,
}

struct SetQtProgress {
    pos: usize,
}

struct SetStProgress {
    pos: usize,
}

enum DecodeKind {
    Colour(ColourStep),
    Mono,
}

struct DecodeProgress {
    kind: DecodeKind,
    decoder: BlockDecoder,
}

/// Macroblock Decoder.
pub struct MDEC {
    qt: [[u8; 64]; 2],
    st: [f64; 64],

    fifo_in: VecDeque<u32>,
    fifo_out: VecDeque<u32>,

    cmd: Command,
    data_out_depth: OutDepth,
    data_out_signed: bool,
    data_out_bit15_set: bool,
    remaining_words: u16,
    current_block: u32,
    waiting_write_macroblock: bool,

    decode: Option<DecodeProgress>,
    set_qt: Option<SetQtProgress>,
    set_st: Option<SetStProgress>,

    bin: VecDeque<u16>,
    crblk: [f64; 64],
    cbblk: [f64; 64],
    yblk: [f64; 64],
    fb: [u8; 16 * 16 * 3],
    fb_words: usize,

    cc_current_macroblock: i64,
    cc_to_write_macroblock: i64,
    cc_to_event: i64,

    dma_in_enabled: bool,
    dma_out_enabled: bool,
    dma_out_waiting: bool,
    dma_out_waiting_nwords: u32,
}

impl Default for MDEC {
    fn default() -> Self {
        Self::new()
    }
}

impl MDEC {
    pub fn new() -> Self {
        let mut st = [0.0f64; 64];
        for (i, v) in st.iter_mut().enumerate() {
            *v = DEFAULT_ST[i] as f64 / (8192.0 * 8.0);
        }

        let mut mdec = Self {
            qt: [[0; 64]; 2],
            st,
            fifo_in: VecDeque::new(),
            fifo_out: VecDeque::new(),
            cmd: Command::None,
            data_out_depth: OutDepth::Mono4,
            data_out_signed: false,
            data_out_bit15_set: false,
            remaining_words: 0xFFFF,
            current_block: 0,
            waiting_write_macroblock: false,
            decode: None,
            set_qt: None,
            set_st: None,
            bin: VecDeque::with_capacity(4),
            crblk: [0.0; 64],
            cbblk: [0.0; 64],
            yblk: [0.0; 64],
            fb: [0; 16 * 16 * 3],
            fb_words: 0,
            cc_current_macroblock: 0,
            cc_to_write_macroblock: 0,
            cc_to_event: CC_MAX,
            dma_in_enabled: false,
            dma_out_enabled: false,
            dma_out_waiting: false,
            dma_out_waiting_nwords: 0,
        };
        mdec.reset_state();
        mdec
    }

    fn reset_state(&mut self) {
        self.cmd = Command::None;
        self.data_out_depth = OutDepth::Mono4;
        self.data_out_signed = false;
        self.data_out_bit15_set = false;
        self.remaining_words = 0xFFFF;
        self.current_block = 0;
        self.waiting_write_macroblock = false;
        self.decode = None;
        self.set_qt = None;
        self.set_st = None;
        self.bin.clear();
        self.fifo_in.clear();
        self.fifo_out.clear();
        self.cc_to_event = CC_MAX;
    }

    /// Full reset (`PSX_mdec_reset`), also clearing pending DMA handshakes.
    pub fn reset(&mut self) {
        self.cc_current_macroblock = 0;
        self.cc_to_write_macroblock = 0;
        self.dma_in_enabled = false;
        self.dma_out_enabled = false;
        self.dma_out_waiting = false;
        self.reset_state();
    }

    // ---- MMIO surface -------------------------------------------------

    /// Data port read (0x1F801820). Advances the clock first, matching the
    /// reference's lazy-clock-on-access pattern.
    pub fn data_read(&mut self) -> u32 {
        match self.fifo_out.pop_front() {
            Some(word) => word,
            None => {
                log::warn!("MDEC: data_read with an empty output FIFO");
                0
            }
        }
    }

    /// Data port write (0x1F801820).
    pub fn data_write(&mut self, data: u32) {
        if self.fifo_in.len() >= FIFO_CAPACITY {
            log::warn!("MDEC: data_write dropped, input FIFO is full");
            return;
        }
        self.fifo_in.push_back(data);
        self.process_fifo_in();
    }

    /// Status port read (0x1F801824).
    pub fn status(&self) -> u32 {
        let fifo_in_full_or_done =
            self.fifo_in.len() >= FIFO_CAPACITY || self.remaining_words == 0xFFFF;
        ((self.fifo_out.is_empty() as u32) << 31)
            | ((fifo_in_full_or_done as u32) << 30)
            | (((self.cmd != Command::None) as u32) << 29)
            | ((self.dma_in_enabled as u32) << 28)
            | ((self.dma_out_enabled as u32) << 27)
            | (self.data_out_depth.bits() << 25)
            | ((self.data_out_signed as u32) << 24)
            | ((self.data_out_bit15_set as u32) << 23)
            | (self.current_block << 16)
            | (self.remaining_words as u32)
    }

    /// Control port write (0x1F801820, the data-port address doubling as a
    /// control register when STAT's command-in-progress framing applies).
    pub fn control(&mut self, data: u32) {
        if data & 0x8000_0000 != 0 {
            self.reset_state();
        }
        self.dma_in_enabled = data & 0x4000_0000 != 0;
        let out_enabled = data & 0x2000_0000 != 0;
        if out_enabled != self.dma_out_enabled {
            self.dma_out_waiting = false;
        }
        self.dma_out_enabled = out_enabled;
    }

    // ---- DMA channel 0 (MDEC in, write-only) --------------------------

    pub fn dma_in_sync(&mut self, _nwords_m1: u32) -> bool {
        if !self.dma_in_enabled {
            log::warn!("MDEC: DMA0 sync with the channel disabled, ignoring");
        }
        true
    }

    pub fn dma_in_write(&mut self, data: u32) {
        if !self.dma_in_enabled {
            log::warn!("MDEC: DMA0 write with the channel disabled");
            return;
        }
        if self.fifo_in.len() >= FIFO_CAPACITY {
            log::warn!("MDEC: DMA0 write dropped, input FIFO is full");
            return;
        }
        self.fifo_in.push_back(data);
        self.process_fifo_in();
    }

    pub fn dma_in_read(&self) -> u32 {
        log::warn!("MDEC: DMA0 is write-only");
        0xFF00_FF00
    }

    // ---- DMA channel 1 (MDEC out, read-only) --------------------------

    pub fn dma_out_sync(&mut self, nwords_m1: u32) -> bool {
        if !self.dma_out_enabled {
            log::warn!("MDEC: DMA1 sync with the channel disabled, ignoring");
            return true;
        }
        if self.dma_out_waiting {
            log::warn!("MDEC: DMA1 sync with an already-pending sync");
            return false;
        }
        if nwords_m1 as usize > self.fifo_out.len() {
            self.dma_out_waiting = true;
            self.dma_out_waiting_nwords = nwords_m1;
            return false;
        }
        true
    }

    pub fn dma_out_write(&mut self, _data: u32) {
        log::warn!("MDEC: DMA1 is read-only");
    }

    pub fn dma_out_read(&mut self) -> u32 {
        if !self.dma_out_enabled {
            log::warn!("MDEC: DMA1 read with the channel disabled");
            return 0xFF00_FF00;
        }
        match self.fifo_out.pop_front() {
            Some(word) => word,
            None => {
                log::warn!("MDEC: DMA1 read with an empty output FIFO");
                0
            }
        }
    }

    // ---- Scheduler integration -----------------------------------------

    /// Cycles until this device next needs attention, for the global
    /// scheduler's horizon computation.
    pub fn next_event_cc(&self) -> i64 {
        self.cc_to_event
    }

    /// Advances the device's internal clock by `cc` elapsed cycles.
    pub fn tick(&mut self, cc: i64) {
        if cc <= 0 {
            return;
        }
        if self.waiting_write_macroblock {
            self.cc_to_write_macroblock -= cc;
            if self.cc_to_write_macroblock <= 0 {
                self.cc_current_macroblock = -self.cc_to_write_macroblock;
                self.cc_to_write_macroblock = 0;
                self.waiting_write_macroblock = false;
                self.write_macroblock();
                self.process_fifo_in();
            }
        } else if self.cmd == Command::Decode {
            self.cc_current_macroblock += cc;
        }
        self.update_timing_event();
    }

    fn update_timing_event(&mut self) {
        self.cc_to_event = if self.waiting_write_macroblock {
            self.cc_to_write_macroblock
        } else {
            CC_MAX
        };
    }

    // ---- Command processing --------------------------------------------

    fn process_fifo_in(&mut self) {
        while !self.fifo_in.is_empty() && !self.waiting_write_macroblock {
            let word = self.fifo_in.pop_front().unwrap();
            match self.cmd {
                Command::None => self.new_command(word),
                Command::Decode => self.run_decode(word),
                Command::SetQt => self.write_qt(word),
                Command::SetSt => self.write_st(word),
            }
        }
    }

    fn new_command(&mut self, data: u32) {
        self.data_out_depth = OutDepth::from_bits(data >> 27);
        self.data_out_signed = data & 0x0400_0000 != 0;
        self.data_out_bit15_set = data & 0x0200_0000 != 0;

        match data >> 29 {
            1 => {
                self.cmd = Command::Decode;
                let kind = match self.data_out_depth {
                    OutDepth::Rgb24 | OutDepth::Rgb15 => DecodeKind::Colour(ColourStep::Cr),
                    OutDepth::Mono4 | OutDepth::Mono8 => DecodeKind::Mono,
                };
                self.decode = Some(DecodeProgress {
                    kind,
                    decoder: BlockDecoder::new(),
                });
                self.remaining_words = ((data & 0xFFFF) as u16).wrapping_sub(1);
                self.bin.clear();
                self.cc_current_macroblock = 0;
            }
            2 => {
                let total = if data & 1 != 0 { 128 } else { 64 };
                self.cmd = Command::SetQt;
                self.set_qt = Some(SetQtProgress { pos: 0 });
                self.remaining_words = ((total >> 2) as u16).wrapping_sub(1);
            }
            3 => {
                self.cmd = Command::SetSt;
                self.set_st = Some(SetStProgress { pos: 0 });
                self.remaining_words = (64u16 >> 1).wrapping_sub(1);
            }
            other => {
                log::warn!("MDEC: unknown command class 0x{:X}", other);
                self.cmd = Command::None;
                self.remaining_words = (data & 0xFFFF) as u16;
            }
        }
    }

    fn write_qt(&mut self, word: u32) {
        let progress = self.set_qt.as_mut().expect("SetQt command without progress state");
        let table = if progress.pos < 64 { 0 } else { 1 };
        let base = progress.pos % 64;
        for i in 0..4 {
            self.qt[table][base + i] = ((word >> (8 * i)) & 0xFF) as u8;
        }
        progress.pos += 4;
        self.remaining_words = self.remaining_words.wrapping_sub(1);
        if self.remaining_words == 0xFFFF {
            self.cmd = Command::None;
            self.set_qt = None;
        }
    }

    fn write_st(&mut self, word: u32) {
        let progress = self.set_st.as_mut().expect("SetSt command without progress state");
        for half in 0..2 {
            let val = ((word >> (16 * half)) & 0xFFFF) as u16 as i16;
            self.st[progress.pos] = val as f64 / (8192.0 * 8.0);
            progress.pos += 1;
        }
        self.remaining_words = self.remaining_words.wrapping_sub(1);
        if self.remaining_words == 0xFFFF {
            self.cmd = Command::None;
            self.set_st = None;
        }
    }

    fn run_decode(&mut self, data: u32) {
        self.bin.push_back((data & 0xFFFF) as u16);
        self.bin.push_back(((data >> 16) & 0xFFFF) as u16);
        self.remaining_words = self.remaining_words.wrapping_sub(1);

        loop {
            let finished = self.decode_step();
            if finished {
                if self.cc_current_macroblock >= CC_MACROBLOCK {
                    self.cc_current_macroblock -= CC_MACROBLOCK;
                    self.write_macroblock();
                } else {
                    self.cc_to_write_macroblock = CC_MACROBLOCK - self.cc_current_macroblock;
                    self.waiting_write_macroblock = true;
                    self.update_timing_event();
                }
            }
            if !(finished && !self.waiting_write_macroblock && self.cmd == Command::Decode) {
                break;
            }
        }

        if !self.waiting_write_macroblock && self.remaining_words == 0xFFFF {
            self.cmd = Command::None;
        }
    }

    /// Drives the current macroblock's in-progress block decode, and any
    /// subsequent blocks it unlocks, as far as the available `bin` data
    /// allows. Returns `true` once an entire macroblock has been produced.
    fn decode_step(&mut self) -> bool {
        loop {
            let progress = match self.decode.as_mut() {
                Some(p) => p,
                None => return false,
            };

            match progress.kind {
                DecodeKind::Mono => {
                    self.current_block = block_id::Y_MONO;
                    let qt = self.qt[0];
                    let mut blk = self.yblk;
                    let done = progress.decoder.step(&mut self.bin, &qt, &mut blk);
                    if done {
                        self.real_idct(&mut blk);
                    }
                    self.yblk = blk;
                    if !done {
                        return false;
                    }
                    match self.data_out_depth {
                        OutDepth::Mono8 => self.yuv_to_mono_8b(),
                        _ => self.yuv_to_mono_4b(),
                    }
                    self.decode = None;
                    return true;
                }
                DecodeKind::Colour(step) => {
                    self.current_block = step.block_id();
                    let qt = if matches!(step, ColourStep::Cr | ColourStep::Cb) {
                        self.qt[1]
                    } else {
                        self.qt[0]
                    };
                    let dst = match step {
                        ColourStep::Cr => &mut self.crblk,
                        ColourStep::Cb => &mut self.cbblk,
                        _ => &mut self.yblk,
                    };
                    let mut blk = *dst;
                    let done = progress.decoder.step(&mut self.bin, &qt, &mut blk);
                    if done {
                        self.real_idct(&mut blk);
                    }
                    *match step {
                        ColourStep::Cr => &mut self.crblk,
                        ColourStep::Cb => &mut self.cbblk,
                        _ => &mut self.yblk,
                    } = blk;
                    if !done {
                        return false;
                    }

                    if matches!(
                        step,
                        ColourStep::Y1 | ColourStep::Y2 | ColourStep::Y3 | ColourStep::Y4
                    ) {
                        let (xx, yy) = step.origin();
                        match self.data_out_depth {
                            OutDepth::Rgb24 => self.yuv_to_rgb_24b(xx, yy),
                            _ => self.yuv_to_rgb_15b(xx, yy),
                        }
                    }

                    match step.next() {
                        Some(next_step) => {
                            let progress = self.decode.as_mut().unwrap();
                            progress.kind = DecodeKind::Colour(next_step);
                            progress.decoder.reset();
                        }
                        None => {
                            self.fb_words = match self.data_out_depth {
                                OutDepth::Rgb24 => (16 * 16 * 3) / 4,
                                _ => (16 * 16 * 2) / 4,
                            };
                            self.decode = None;
                            return true;
                        }
                    }
                }
            }
        }
    }

    fn write_macroblock(&mut self) {
        if self.data_out_depth == OutDepth::Mono4 {
            self.fb_words = (8 * 8) / (2 * 4);
        } else if self.data_out_depth == OutDepth::Mono8 {
            self.fb_words = (8 * 8) / 4;
        }

        if self.fb_words + self.fifo_out.len() > FIFO_CAPACITY {
            log::warn!(
                "MDEC: output FIFO is full, dropping {} words",
                self.fb_words + self.fifo_out.len() - FIFO_CAPACITY
            );
            self.fb_words = FIFO_CAPACITY.saturating_sub(self.fifo_out.len());
        }
        for n in 0..self.fb_words {
            let base = n * 4;
            let word = u32::from_le_bytes([
                self.fb[base],
                self.fb[base + 1],
                self.fb[base + 2],
                self.fb[base + 3],
            ]);
            self.fifo_out.push_back(word);
        }

        if self.remaining_words == 0xFFFF {
            self.cmd = Command::None;
        }

        if self.dma_out_waiting && self.dma_out_waiting_nwords as usize <= self.fifo_out.len() {
            self.dma_out_waiting = false;
        }
    }

    fn real_idct(&self, blk: &mut [f64; 64]) {
        real_idct_core(blk, &self.st);
    }

    fn yuv_to_rgb_24b(&mut self, xx: usize, yy: usize) {
        let mut y_idx = 0usize;
        for row in 0..8 {
            for col in 0..8 {
                let cx = (xx + col) / 2 + ((yy + row) / 2) * 8;
                let r0 = self.crblk[cx];
                let b0 = self.cbblk[cx];
                let g0 = -0.3437 * b0 + -0.7143 * r0;
                let r0 = 1.402 * r0;
                let b0 = 1.772 * b0;
                let y = self.yblk[y_idx];
                y_idx += 1;
                let r = (r0 + y).clamp(-128.0, 127.0);
                let g = (g0 + y).clamp(-128.0, 127.0);
                let b = (b0 + y).clamp(-128.0, 127.0);
                let base = ((xx + col) + (yy + row) * 16) * 3;
                let (rb, gb, bb) = (r as i8 as u8, g as i8 as u8, b as i8 as u8);
                if !self.data_out_signed {
                    self.fb[base] = rb ^ 0x80;
                    self.fb[base + 1] = gb ^ 0x80;
                    self.fb[base + 2] = bb ^ 0x80;
                } else {
                    self.fb[base] = rb;
                    self.fb[base + 1] = gb;
                    self.fb[base + 2] = bb;
                }
            }
        }
    }

    fn yuv_to_rgb_15b(&mut self, xx: usize, yy: usize) {
        const FACTOR: f64 = 31.0 / 255.0;
        let bit15: u16 = if self.data_out_bit15_set { 0x8000 } else { 0 };
        let mut y_idx = 0usize;
        for row in 0..8 {
            for col in 0..8 {
                let cx = (xx + col) / 2 + ((yy + row) / 2) * 8;
                let r0 = self.crblk[cx];
                let b0 = self.cbblk[cx];
                let g0 = -0.3437 * b0 + -0.7143 * r0;
                let r0 = 1.402 * r0;
                let b0 = 1.772 * b0;
                let y = self.yblk[y_idx];
                y_idx += 1;
                let r = (r0 + y + 128.0).clamp(0.0, 255.0);
                let g = (g0 + y + 128.0).clamp(0.0, 255.0);
                let b = (b0 + y + 128.0).clamp(0.0, 255.0);
                let mut val = bit15
                    | (((b * FACTOR + 0.5) as u16) << 10)
                    | (((g * FACTOR + 0.5) as u16) << 5)
                    | ((r * FACTOR + 0.5) as u16);
                if self.data_out_signed {
                    val ^= 0x4210;
                }
                let pixel_idx = (xx + col) + (yy + row) * 16;
                let bytes = val.to_le_bytes();
                self.fb[pixel_idx * 2] = bytes[0];
                self.fb[pixel_idx * 2 + 1] = bytes[1];
            }
        }
    }

    fn yuv_to_mono_8b(&mut self) {
        for (i, &y) in self.yblk.iter().enumerate() {
            let val = y.clamp(-128.0, 127.0);
            self.fb[i] = if self.data_out_signed {
                (val + 0.5) as i8 as u8
            } else {
                (val + 128.0 + 0.5) as u8
            };
        }
    }

    fn yuv_to_mono_4b(&mut self) {
        const FACTOR: f64 = 15.0 / 255.0;
        let mut aux = 0u8;
        for (i, &y) in self.yblk.iter().enumerate() {
            let val = (y + 128.0).clamp(0.0, 255.0);
            if i % 2 == 1 {
                aux |= ((val * FACTOR + 0.5) as u8) << 4;
                self.fb[i / 2] = aux;
            } else {
                aux = (val * FACTOR + 0.5) as u8;
                if self.data_out_signed {
                    aux ^= 0x88;
                }
            }
        }
    }
}
