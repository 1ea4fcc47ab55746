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

//! CD-ROM drive emulation for PlayStation 1
//!
//! Emulates the Sony CXD2510Q CD-ROM controller: the 23-command protocol,
//! first/second response timing, seek timing, the two-level sector read
//! buffer, and XA-ADPCM decode for streamed audio.
//!
//! # Interrupt Levels
//!
//! - INT1: Data ready (sector read complete)
//! - INT2: Command complete (second response)
//! - INT3: Command acknowledge (first response)
//! - INT4: Command error (second response error)
//! - INT5: Command error (first response error)

use std::collections::VecDeque;

mod adpcm;
mod cd_audio;
mod commands;
mod disc;
#[cfg(test)]
mod tests;

pub use adpcm::XaAdpcmDecoder;
pub use cd_audio::CDAudio;
pub use disc::{DiscImage, Track, TrackType};

/// Cycles for one sector at 1x speed: `PSX_CYCLES_PER_SEC / 75`.
pub const CYCLES_PER_SECTOR_1X: i32 = 451_584;

/// Minimum gap (in CPU cycles) enforced between two successive CD-ROM
/// IRQs; a second IRQ that would land sooner is deferred.
pub const CC2IRQ_EXPIRED: i32 = 4_000;

/// Baseline for the second-response delay: `PSX_CYCLES_PER_SEC / 10`.
const CC2_SECOND_RESPONSE_BASE: i32 = 4_515_840 / 10;

/// Drive mode flags set by the `SetMode` command.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Mode {
    /// Report interrupts for every CD-DA sector (bit 0).
    pub cdda_report: bool,
    /// Auto-pause at the end of a CD-DA track (bit 1).
    pub auto_pause: bool,
    /// Report all sectors including non-ADPCM ones (bit 2).
    pub report_all: bool,
    /// Use the channel/filter set by `SetFilter` (bit 3).
    pub xa_filter: bool,
    /// Ignore the sector-size bit, always use the data size in effect (bit 4).
    pub ignore_bit: bool,
    /// Sector size: true = 2340 (whole sector), false = 2048 (data only).
    pub size_2340: bool,
    /// Decode XA-ADPCM sectors instead of passing them to the data FIFO.
    pub xa_adpcm: bool,
    /// Double speed (2x, 150 sectors/sec) vs single speed (1x, 75 sectors/sec).
    pub double_speed: bool,
}

/// What happens once a seek completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PostSeekAction {
    /// Just report status (plain SeekL/SeekP).
    Stat,
    /// Start reading data sectors.
    Read,
    /// Start CD-DA playback.
    Play,
}

/// Seek target and what to do once the drive arrives there.
#[derive(Debug, Clone, Copy)]
pub(super) struct SeekTarget {
    pub position: CDPosition,
    /// True once the seek has been acted on (position applied); guards
    /// against re-processing the same target on repeated ticks.
    pub processed: bool,
    pub action: PostSeekAction,
}

/// Waiting/in-flight state for the command-response pipeline. Real
/// hardware processes at most one command at a time and the driver is
/// expected to poll status between commands; these flags track what this
/// emulated controller still owes the CPU.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct CommandWait {
    pub first_response: bool,
    pub second_response: bool,
    pub read: bool,
    pub reset: bool,
    pub seek: bool,
    pub irq_expired: bool,
}

/// A response queued to fire once its countdown reaches zero.
#[derive(Debug, Clone)]
pub(super) struct PendingResponse {
    pub cycles_left: i32,
    pub interrupt: u8,
    pub bytes: Vec<u8>,
}

/// Per-sector read buffer, modeling the drive's own ring buffer: a "raw"
/// level holding up to 2 whole 0x930-byte sectors straight off the disc,
/// and a "cooked" level holding up to 6 sectors trimmed/reordered for
/// hand-off to the Data FIFO. Only the oldest cooked sector is ever
/// exposed; anything beyond the 6-sector cooked capacity is dropped,
/// matching the real controller's behaviour when the CPU falls behind.
#[derive(Debug, Default)]
pub(super) struct ReadBuffer {
    raw: VecDeque<Vec<u8>>,
    cooked: VecDeque<Vec<u8>>,
}

impl ReadBuffer {
    const RAW_CAPACITY: usize = 2;
    const COOKED_CAPACITY: usize = 6;

    fn push_raw(&mut self, sector: Vec<u8>) {
        if self.raw.len() >= Self::RAW_CAPACITY {
            self.raw.pop_front();
            log::warn!("CD-ROM: raw read buffer overflow, dropping oldest sector");
        }
        self.raw.push_back(sector);
    }

    fn push_cooked(&mut self, sector: Vec<u8>) {
        if self.cooked.len() >= Self::COOKED_CAPACITY {
            self.cooked.pop_front();
            log::warn!("CD-ROM: cooked read buffer overflow, dropping oldest sector");
        }
        self.cooked.push_back(sector);
    }

    fn pop_cooked(&mut self) -> Option<Vec<u8>> {
        self.cooked.pop_front()
    }
}

/// CD-ROM drive controller
pub struct CDROM {
    pub(super) param_fifo: VecDeque<u8>,
    pub(super) response_fifo: VecDeque<u8>,
    pub(super) data_buffer: Vec<u8>,
    pub(super) data_index: usize,

    pub(super) mode: Mode,
    pub(super) command_wait: CommandWait,
    pending_first: Option<PendingResponse>,
    pending_second: Option<PendingResponse>,
    irq_cooldown: i32,

    pub(super) read_ticks: i32,
    pub(super) seek_ticks: i32,
    shell_open_ticks: i32,
    pub(super) state: CDState,
    pub(super) position: CDPosition,
    pub(super) seek_target: Option<SeekTarget>,

    pub(super) read_buffer: ReadBuffer,
    pub(super) adpcm: XaAdpcmDecoder,
    adpcm_queue: VecDeque<(i16, i16)>,

    pub(super) interrupt_flag: u8,
    interrupt_enable: u8,
    pub(super) status: CDStatus,
    pub(super) disc: Option<DiscImage>,
    index: u8,

    /// CD-DA (plain audio track) playback, kept separate from the
    /// XA-ADPCM decoder which only applies to Mode 2 Form 2 sectors.
    pub cd_audio: CDAudio,
    pub(super) volume: VolumeMatrix,
}

/// Stereo crossfeed matrix applied to both CD-DA and XA-ADPCM output
/// before it reaches the SPU mixing input.
#[derive(Debug, Clone, Copy)]
pub(super) struct VolumeMatrix {
    pub l2l: u8,
    pub l2r: u8,
    pub r2l: u8,
    pub r2r: u8,
}

impl Default for VolumeMatrix {
    fn default() -> Self {
        Self {
            l2l: 0x80,
            l2r: 0x00,
            r2l: 0x00,
            r2r: 0x80,
        }
    }
}

/// CD-ROM drive state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CDState {
    Idle,
    Reading,
    Seeking,
    Playing,
}

/// CD-ROM position in MSF (Minute:Second:Frame) format, stored decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CDPosition {
    pub minute: u8,
    pub second: u8,
    pub sector: u8,
}

impl CDPosition {
    pub fn new(minute: u8, second: u8, sector: u8) -> Self {
        Self {
            minute,
            second,
            sector,
        }
    }

    /// Convert MSF to logical block address (LBA).
    /// LBA = (minute * 60 + second) * 75 + sector - 150
    pub fn to_lba(&self) -> i32 {
        ((self.minute as i32 * 60 + self.second as i32) * 75 + self.sector as i32) - 150
    }

    pub fn from_lba(lba: i32) -> Self {
        let total_sectors = lba + 150;
        let minute = (total_sectors / 75 / 60) as u8;
        let second = ((total_sectors / 75) % 60) as u8;
        let sector = (total_sectors % 75) as u8;
        Self::new(minute, second, sector)
    }
}

/// CD-ROM status register
#[derive(Debug, Clone, Default)]
pub(super) struct CDStatus {
    pub(super) error: bool,
    pub(super) motor_on: bool,
    pub(super) seek_error: bool,
    pub(super) id_error: bool,
    pub(super) shell_open: bool,
    pub(super) reading: bool,
    pub(super) seeking: bool,
    pub(super) playing: bool,
}

impl CDROM {
    pub const REG_INDEX: u32 = 0x1F801800;
    pub const REG_DATA: u32 = 0x1F801801;
    pub const REG_INT_FLAG: u32 = 0x1F801802;
    pub const REG_INT_ENABLE: u32 = 0x1F801803;

    const FIFO_SIZE: usize = 16;

    pub fn new() -> Self {
        Self {
            param_fifo: VecDeque::new(),
            response_fifo: VecDeque::new(),
            data_buffer: Vec::new(),
            data_index: 0,
            mode: Mode::default(),
            command_wait: CommandWait::default(),
            pending_first: None,
            pending_second: None,
            irq_cooldown: 0,
            read_ticks: 0,
            seek_ticks: 0,
            shell_open_ticks: 0,
            state: CDState::Idle,
            position: CDPosition::new(0, 2, 0),
            seek_target: None,
            read_buffer: ReadBuffer::default(),
            adpcm: XaAdpcmDecoder::new(),
            adpcm_queue: VecDeque::new(),
            interrupt_flag: 0,
            interrupt_enable: 0,
            status: CDStatus::default(),
            disc: None,
            index: 0,
            cd_audio: CDAudio::new(),
            volume: VolumeMatrix::default(),
        }
    }

    /// Register this drive's periodic housekeeping with the global
    /// scheduler. The drive's own `tick` advances its state machine
    /// directly from CPU-cycle deltas, so this only registers a named
    /// event for tracing/debugging purposes.
    pub fn register_events(&mut self, timing: &mut crate::core::timing::TimingEventManager) {
        timing.register_event("CD-ROM");
    }

    pub fn push_param(&mut self, value: u8) {
        if self.param_fifo.len() < Self::FIFO_SIZE {
            self.param_fifo.push_back(value);
            log::trace!("CD-ROM: Pushed parameter 0x{:02X}", value);
        } else {
            log::warn!("CD-ROM: Parameter FIFO overflow");
        }
    }

    pub fn pop_response(&mut self) -> Option<u8> {
        let value = self.response_fifo.pop_front();
        if let Some(v) = value {
            log::trace!("CD-ROM: Popped response 0x{:02X}", v);
        }
        value
    }

    pub fn response_empty(&self) -> bool {
        self.response_fifo.is_empty()
    }

    #[cfg(test)]
    pub fn response_fifo(&self) -> &VecDeque<u8> {
        &self.response_fifo
    }

    #[cfg(test)]
    pub fn param_fifo_mut(&mut self) -> &mut VecDeque<u8> {
        &mut self.param_fifo
    }

    pub fn interrupt_flag(&self) -> u8 {
        self.interrupt_flag
    }

    /// Clears the specified interrupt bits. Acknowledging INT5 also
    /// clears latched error status flags, matching real firmware
    /// behaviour where an error is "consumed" on acknowledge.
    pub fn acknowledge_interrupt(&mut self, value: u8) {
        self.interrupt_flag &= !value;
        if value & 0x10 != 0 {
            self.status.error = false;
            self.status.seek_error = false;
            self.status.id_error = false;
        }
        log::trace!("CD-ROM: Acknowledged interrupts 0x{:02X}", value);
    }

    pub fn set_interrupt_enable(&mut self, value: u8) {
        self.interrupt_enable = value & 0x1F;
    }

    pub fn interrupt_enable(&self) -> u8 {
        self.interrupt_enable
    }

    /// Bits 0-1: register select. Bit 2: clear parameter FIFO. Bit 3:
    /// clear response FIFO.
    pub fn set_index(&mut self, value: u8) {
        if value & 0x04 != 0 {
            self.param_fifo.clear();
        }
        if value & 0x08 != 0 {
            self.response_fifo.clear();
        }
        self.index = value & 0x3;
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn read_status(&self) -> u8 {
        let mut status = self.index & 0x3;
        if self.status.playing && self.mode.xa_adpcm {
            status |= 1 << 2; // ADPBUSY
        }
        if self.param_fifo.is_empty() {
            status |= 1 << 3;
        }
        if self.param_fifo.len() < Self::FIFO_SIZE {
            status |= 1 << 4;
        }
        if !self.response_fifo.is_empty() {
            status |= 1 << 5;
        }
        if self.data_index < self.data_buffer.len() {
            status |= 1 << 6;
        }
        if self.command_wait.first_response
            || self.command_wait.second_response
            || self.state == CDState::Seeking
        {
            status |= 1 << 7;
        }
        status
    }

    /// Combined drive status exposed through `port1_read`-style access.
    pub fn status(&self) -> u8 {
        self.read_status()
    }

    /// Generate the status byte the second response of most commands
    /// carries.
    pub(super) fn get_status_byte(&self) -> u8 {
        let mut status = 0u8;
        if self.status.error {
            status |= 1 << 0;
        }
        if self.status.motor_on {
            status |= 1 << 1;
        }
        if self.status.seek_error {
            status |= 1 << 2;
        }
        if self.status.id_error {
            status |= 1 << 3;
        }
        if self.status.shell_open {
            status |= 1 << 4;
        }
        if self.status.reading {
            status |= 1 << 5;
        }
        if self.status.seeking {
            status |= 1 << 6;
        }
        if self.status.playing {
            status |= 1 << 7;
        }
        status
    }

    pub(super) fn trigger_interrupt(&mut self, level: u8) {
        if level == 0 || level > 5 {
            log::warn!("CD-ROM: Invalid interrupt level {}", level);
            return;
        }
        self.interrupt_flag |= 1 << (level - 1);
        log::trace!("CD-ROM: Triggered INT{}", level);
    }

    /// Queue a first response (INT3 on success, INT5 on error) to fire
    /// after `cc_to_first_response` cycles. `nparams` is the number of
    /// parameter bytes the command consumed, feeding the per-parameter
    /// term of the delay formula.
    pub(super) fn queue_first_response(&mut self, interrupt: u8, bytes: Vec<u8>, nparams: usize) {
        let cycles = commands::cc_to_first_response(nparams);
        self.pending_first = Some(PendingResponse {
            cycles_left: cycles,
            interrupt,
            bytes,
        });
        self.command_wait.first_response = true;
    }

    /// Queue a second response (typically INT2, or INT5 for errors)
    /// after a command-specific delay measured from when the first
    /// response fires.
    pub(super) fn queue_second_response(&mut self, interrupt: u8, bytes: Vec<u8>, delay: i32) {
        self.pending_second = Some(PendingResponse {
            cycles_left: delay,
            interrupt,
            bytes,
        });
        self.command_wait.second_response = true;
    }

    pub(super) fn default_second_response_delay() -> i32 {
        CC2_SECOND_RESPONSE_BASE
    }

    fn fire_response(&mut self, resp: PendingResponse) {
        // The IRQ-coincidence gate: two CD-ROM IRQs cannot be raised
        // back-to-back inside CC2IRQ_EXPIRED cycles of each other. If the
        // cooldown hasn't elapsed, push the response back with the
        // remaining cooldown instead of firing immediately.
        if self.irq_cooldown > 0 {
            self.pending_second = Some(PendingResponse {
                cycles_left: self.irq_cooldown,
                ..resp
            });
            self.command_wait.irq_expired = true;
            return;
        }
        self.command_wait.irq_expired = false;
        for b in resp.bytes {
            if self.response_fifo.len() < Self::FIFO_SIZE {
                self.response_fifo.push_back(b);
            }
        }
        self.trigger_interrupt(resp.interrupt);
        self.irq_cooldown = CC2IRQ_EXPIRED;
    }

    pub fn error_response(&mut self) {
        let bytes = vec![self.get_status_byte() | 0x01, 0x40];
        self.status.error = true;
        self.queue_first_response(5, bytes, 0);
    }

    pub fn load_disc(&mut self, cue_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let disc = DiscImage::load(cue_path)?;
        self.disc = Some(disc);
        self.status.shell_open = false;
        log::info!("Disc loaded successfully");
        Ok(())
    }

    /// Swap the loaded disc image, simulating a media-change: the shell
    /// stays reported open for roughly 3 seconds before the status byte
    /// reports the new disc as present.
    pub fn set_disc(&mut self, disc: Option<DiscImage>) {
        self.disc = disc;
        self.status.shell_open = true;
        self.status.motor_on = false;
        self.state = CDState::Idle;
        self.shell_open_ticks = CYCLES_PER_SECTOR_1X as i32 * 75 * 3;
    }

    pub fn read_current_sector(&mut self) -> Option<Vec<u8>> {
        if let Some(ref disc) = self.disc {
            disc.read_sector(&self.position).map(|data| data.to_vec())
        } else {
            None
        }
    }

    pub fn has_disc(&self) -> bool {
        self.disc.is_some()
    }

    pub fn position(&self) -> &CDPosition {
        &self.position
    }

    pub fn set_position(&mut self, position: CDPosition) {
        self.position = position;
    }

    /// Number of cycles one sector takes to arrive at the drive's current
    /// speed setting.
    fn cycles_per_sector(&self) -> i32 {
        if self.mode.double_speed {
            CYCLES_PER_SECTOR_1X / 2
        } else {
            CYCLES_PER_SECTOR_1X
        }
    }

    /// Advance the controller's internal state machine by `cycles` CPU
    /// cycles: response-timing countdowns, sector-read cadence, seek
    /// timing, and shell-open recovery.
    pub fn tick(&mut self, cycles: u32) {
        let cycles = cycles as i32;

        if self.irq_cooldown > 0 {
            self.irq_cooldown = (self.irq_cooldown - cycles).max(0);
        }

        if self.shell_open_ticks > 0 {
            self.shell_open_ticks = (self.shell_open_ticks - cycles).max(0);
            if self.shell_open_ticks == 0 {
                self.status.shell_open = false;
            }
        }

        if let Some(mut resp) = self.pending_first.take() {
            resp.cycles_left -= cycles;
            if resp.cycles_left <= 0 {
                self.command_wait.first_response = false;
                self.fire_response(resp);
            } else {
                self.pending_first = Some(resp);
            }
        }

        if let Some(mut resp) = self.pending_second.take() {
            resp.cycles_left -= cycles;
            if resp.cycles_left <= 0 {
                self.command_wait.second_response = false;
                self.fire_response(resp);
            } else {
                self.pending_second = Some(resp);
            }
        }

        if self.state == CDState::Reading || self.state == CDState::Playing {
            self.read_ticks += cycles;
            let period = self.cycles_per_sector();

            if self.read_ticks >= period {
                self.read_ticks -= period;
                self.service_sector_arrival();
            }
        }

        if self.state == CDState::Seeking {
            self.seek_ticks += cycles;
            let seek_time = self.calculate_seek_time();
            if self.seek_ticks >= seek_time {
                self.seek_ticks = 0;
                self.complete_seek();
            }
        }
    }

    /// Called once per sector period while reading/playing: pulls the
    /// next sector off the disc, routes it to the data FIFO, the XA-ADPCM
    /// decoder, or CD-DA playback depending on the current mode and
    /// sector type, then advances the read position.
    fn service_sector_arrival(&mut self) {
        let Some(raw) = self.read_current_sector() else {
            return;
        };
        self.read_buffer.push_raw(raw.clone());

        if self.state == CDState::Playing {
            // CD-DA: raw 2352-byte sector is already 588 stereo PCM samples.
            self.cd_audio.feed_sector(&raw);
            if self.mode.cdda_report {
                self.trigger_interrupt(1);
            }
        } else {
            let is_xa_form2 = raw.len() >= 18 && (raw[18] & 0x20) != 0;
            if self.mode.xa_adpcm && is_xa_form2 {
                let stereo = (raw[19] & 0x01) != 0;
                let double_rate = (raw[19] & 0x04) != 0;
                if raw.len() >= 24 + 0x914 {
                    let samples = self
                        .adpcm
                        .decode_sector(&raw[24..24 + 0x914], stereo, double_rate);
                    self.adpcm_queue.extend(samples);
                }
                if self.mode.report_all {
                    self.trigger_interrupt(1);
                }
            } else {
                let cooked = self.cook_sector(&raw);
                self.read_buffer.push_cooked(cooked.clone());
                self.data_buffer = cooked;
                self.data_index = 0;
                self.trigger_interrupt(1);
            }
        }

        self.advance_position();
    }

    /// Trim a raw 2352-byte sector down to the size the current mode
    /// expects: 2048 (data payload only), 2340 (whole sector minus sync),
    /// or the raw 2352 when `ignore_bit` forces the full size.
    fn cook_sector(&self, raw: &[u8]) -> Vec<u8> {
        if self.mode.ignore_bit {
            return raw.to_vec();
        }
        if self.mode.size_2340 {
            raw.get(12..).map(|s| s.to_vec()).unwrap_or_default()
        } else {
            raw.get(24..24 + 2048).map(|s| s.to_vec()).unwrap_or_default()
        }
    }

    fn advance_position(&mut self) {
        self.position.sector += 1;
        if self.position.sector >= 75 {
            self.position.sector = 0;
            self.position.second += 1;
            if self.position.second >= 60 {
                self.position.second = 0;
                self.position.minute += 1;
            }
        }
    }

    fn complete_seek(&mut self) {
        self.status.seeking = false;
        if let Some(mut target) = self.seek_target.take() {
            self.position = target.position;
            target.processed = true;

            log::debug!(
                "CD-ROM: Seek complete to {:02}:{:02}:{:02}",
                self.position.minute,
                self.position.second,
                self.position.sector
            );

            match target.action {
                PostSeekAction::Stat => {
                    self.state = CDState::Idle;
                    self.queue_second_response(2, vec![self.get_status_byte()], 0);
                }
                PostSeekAction::Read => {
                    self.state = CDState::Reading;
                    self.status.reading = true;
                    self.read_ticks = 0;
                    self.queue_second_response(2, vec![self.get_status_byte()], 0);
                }
                PostSeekAction::Play => {
                    self.state = CDState::Playing;
                    self.status.playing = true;
                    self.read_ticks = 0;
                }
            }
        } else {
            self.state = CDState::Idle;
        }
        self.command_wait.seek = false;
    }

    /// Seek-time formula matching the original controller: a fixed
    /// motor-spin-up penalty when the motor was off, a distance-scaled
    /// base cost floored at 20000 cycles, an extra long-seek penalty past
    /// 2250-sector jumps (or a paused-track settle penalty for shorter
    /// jumps), and uniform jitter.
    fn calculate_seek_time(&self) -> i32 {
        let mut ret = 0i32;
        let init;
        if !self.status.motor_on {
            ret += CYCLES_PER_SECTOR_1X * 75; // ~1 second motor spin-up
            init = 0;
        } else {
            init = self.position.to_lba() + 150;
        }

        let target = self
            .seek_target
            .map(|t| t.position.to_lba() + 150)
            .unwrap_or(init);
        let dist = (init - target).unsigned_abs() as i64;

        let tmp = (dist * CYCLES_PER_SECTOR_1X as i64 * 75 / (72 * 60 * 75)).max(20_000);
        ret += tmp as i32;

        if dist >= 2250 {
            ret += (CYCLES_PER_SECTOR_1X as f64 * 75.0 * 0.3) as i32;
        } else if self.status.playing {
            ret += 1_237_952 * if self.mode.double_speed { 1 } else { 2 };
        }

        ret += simple_jitter(dist as u32) % 25_000;
        ret.max(1)
    }

    pub fn get_data_byte(&mut self) -> u8 {
        if self.data_index < self.data_buffer.len() {
            let byte = self.data_buffer[self.data_index];
            self.data_index += 1;
            byte
        } else {
            0
        }
    }

    /// Number of whole words left in the current sector's data buffer.
    pub fn dma_words_available(&self) -> usize {
        (self.data_buffer.len().saturating_sub(self.data_index)) / 4
    }

    #[cfg(test)]
    pub fn push_data_byte(&mut self, byte: u8) {
        self.data_buffer.push(byte);
    }

    /// Pull the next cooked sector out of the two-level read buffer into
    /// the byte-addressable data FIFO the CPU drains via `get_data_byte`.
    pub fn load_next_cooked_sector(&mut self) -> bool {
        if let Some(sector) = self.read_buffer.pop_cooked() {
            self.data_buffer = sector;
            self.data_index = 0;
            true
        } else {
            false
        }
    }

    /// Next decoded audio sample pair at 44.1kHz, mixing CD-DA playback
    /// and any pending XA-ADPCM stream output through the volume matrix.
    /// Called by the (external) SPU mixer once per output sample.
    pub fn next_sound_sample(&mut self) -> (i16, i16) {
        let (da_l, da_r) = self.cd_audio.get_sample();
        let (xa_l, xa_r) = self.adpcm_queue.pop_front().unwrap_or((0, 0));

        let mix = |a: i16, b: i16| (a as i32 + b as i32).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        let l = mix(da_l, xa_l);
        let r = mix(da_r, xa_r);

        let apply = |l: i16, r: i16| -> (i16, i16) {
            let out_l = ((l as i32 * self.volume.l2l as i32) >> 7)
                + ((r as i32 * self.volume.r2l as i32) >> 7);
            let out_r = ((l as i32 * self.volume.l2r as i32) >> 7)
                + ((r as i32 * self.volume.r2r as i32) >> 7);
            (
                out_l.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
                out_r.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            )
        };
        apply(l, r)
    }

    pub fn read_register(&mut self, addr: u32) -> u8 {
        match (addr, self.index) {
            (Self::REG_INDEX, _) => self.read_status(),
            (Self::REG_DATA, 0) | (Self::REG_DATA, 1) => {
                self.response_fifo.pop_front().unwrap_or(0)
            }
            (Self::REG_DATA, 2) | (Self::REG_DATA, 3) => self.get_data_byte(),
            (Self::REG_INT_FLAG, 0) | (Self::REG_INT_FLAG, 1) => 0,
            (Self::REG_INT_FLAG, 2) | (Self::REG_INT_FLAG, 3) => self.interrupt_enable,
            (Self::REG_INT_ENABLE, 0) => self.interrupt_enable,
            (Self::REG_INT_ENABLE, 1..=3) => 0xE0 | self.interrupt_flag,
            _ => {
                log::warn!("CD-ROM: Invalid register read at 0x{:08X}", addr);
                0
            }
        }
    }

    pub fn write_register(&mut self, addr: u32, value: u8) {
        match (addr, self.index) {
            (Self::REG_INDEX, _) => self.set_index(value),
            (Self::REG_DATA, 0) => self.execute_command(value),
            (Self::REG_DATA, 1) => self.volume.l2l = value,
            (Self::REG_DATA, 2) => self.volume.l2r = value,
            (Self::REG_DATA, 3) => self.volume.r2l = value,
            (Self::REG_INT_FLAG, 0) => self.push_param(value),
            (Self::REG_INT_FLAG, 1) => self.set_interrupt_enable(value),
            (Self::REG_INT_FLAG, 2) => self.volume.r2r = value,
            (Self::REG_INT_FLAG, 3) => {
                log::trace!("CD-ROM: ADPCM control write: 0x{:02X}", value);
            }
            (Self::REG_INT_ENABLE, 0) => {
                log::trace!("CD-ROM: Request Register write: 0x{:02X}", value);
            }
            (Self::REG_INT_ENABLE, 1) => self.acknowledge_interrupt(value),
            (Self::REG_INT_ENABLE, 2) | (Self::REG_INT_ENABLE, 3) => {
                log::trace!("CD-ROM: Audio Volume write: 0x{:02X}", value);
            }
            _ => {
                log::warn!(
                    "CD-ROM: Invalid register write at 0x{:08X} = 0x{:02X}",
                    addr,
                    value
                );
            }
        }
    }
}

/// Lightweight, non-cryptographic scrambler used only for the seek-timing
/// jitter term; matches the bounded, deterministic-but-varied feel of the
/// original's `rand() % 25000` without pulling in a `rand` dependency for
/// one call site.
pub(super) fn simple_jitter(seed: u32) -> i32 {
    let x = seed.wrapping_mul(2654435761).wrapping_add(0x9E3779B9);
    (x ^ (x >> 15)) as i32 & 0x7FFF_FFFF
}

impl Default for CDROM {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert BCD (Binary-Coded Decimal) to decimal.
#[inline]
pub fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

/// Convert decimal to BCD (Binary-Coded Decimal).
#[inline]
pub fn dec_to_bcd(dec: u8) -> u8 {
    ((dec / 10) << 4) | (dec % 10)
}
