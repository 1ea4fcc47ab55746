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

//! Command dispatch: the full 23-command protocol (some commands share a
//! handler, e.g. `ReadN`/`ReadS`), first/second response timing, and
//! per-command parameter validation.

use super::{bcd_to_dec, dec_to_bcd, CDPosition, CDROM, CDState, PostSeekAction, SeekTarget};

/// First-response delay: a fixed base, a small random-ish jitter term,
/// 1815 cycles per parameter byte consumed (plus one for the command
/// byte itself), and a fixed controller-latch cost.
pub(super) fn cc_to_first_response(nparams: usize) -> i32 {
    let jitter = super::simple_jitter(nparams as u32) % 3_000;
    10_500 + jitter + 1815 * (1 + nparams as i32) + 8_500
}

impl CDROM {
    pub fn execute_command(&mut self, cmd: u8) {
        let params: Vec<u8> = self.param_fifo.drain(..).collect();
        let n = params.len();

        match cmd {
            0x00 => self.cmd_sync(),
            0x01 => self.cmd_getstat(n),
            0x02 => self.cmd_setloc(&params, n),
            0x03 => self.cmd_play(&params, n),
            0x04 => self.cmd_forward(n),
            0x05 => self.cmd_backward(n),
            0x06 => self.cmd_readn(n),
            0x07 => self.cmd_motor_on(n),
            0x08 => self.cmd_stop(n),
            0x09 => self.cmd_pause(n),
            0x0A => self.cmd_init(n),
            0x0B => self.cmd_mute(n),
            0x0C => self.cmd_demute(n),
            0x0D => self.cmd_set_filter(&params, n),
            0x0E => self.cmd_setmode(&params, n),
            0x0F => self.cmd_get_param(n),
            0x10 => self.cmd_get_loc_l(n),
            0x11 => self.cmd_get_loc_p(n),
            0x12 => self.cmd_set_session(&params, n),
            0x13 => self.cmd_get_tn(n),
            0x14 => self.cmd_get_td(&params, n),
            0x15 => self.cmd_seekl(n),
            0x16 => self.cmd_seekp(n),
            0x19 => self.cmd_test(&params, n),
            0x1A => self.cmd_getid(n),
            0x1B => self.cmd_reads(n),
            0x1C => self.cmd_reset(n),
            0x1D => self.cmd_get_q(n),
            0x1E => self.cmd_readtoc(n),
            _ => {
                log::warn!("CD-ROM: Unknown command 0x{:02X}", cmd);
                self.error_response();
            }
        }
    }

    /// `Sync` (0x00): undocumented/unused on real firmware, always errors.
    fn cmd_sync(&mut self) {
        self.error_response();
    }

    fn cmd_getstat(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    /// `SetLoc` (0x02): latches a 3-byte BCD MSF target for the next
    /// `SeekL`/`SeekP`/`ReadN`/`Play`.
    fn cmd_setloc(&mut self, params: &[u8], n: usize) {
        if params.len() != 3 {
            self.error_response();
            return;
        }
        let pos = CDPosition::new(
            bcd_to_dec(params[0]),
            bcd_to_dec(params[1]),
            bcd_to_dec(params[2]),
        );
        self.seek_target = Some(SeekTarget {
            position: pos,
            processed: false,
            action: PostSeekAction::Stat,
        });
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_play(&mut self, params: &[u8], n: usize) {
        if let Some(&track) = params.first() {
            let _ = track; // track-number variant of Play; position already via SetLoc
        }
        self.status.playing = true;
        self.cd_audio.play(self.mode.auto_pause);
        self.begin_seek_then(PostSeekAction::Play);
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_forward(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_backward(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_readn(&mut self, n: usize) {
        self.begin_seek_then(PostSeekAction::Read);
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_reads(&mut self, n: usize) {
        self.cmd_readn(n);
    }

    fn cmd_motor_on(&mut self, n: usize) {
        self.status.motor_on = true;
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        self.queue_second_response(2, vec![status], Self::default_second_response_delay());
    }

    fn cmd_stop(&mut self, n: usize) {
        self.status.motor_on = false;
        self.status.reading = false;
        self.status.seeking = false;
        self.status.playing = false;
        self.state = CDState::Idle;
        self.cd_audio.stop();
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        self.queue_second_response(2, vec![status], Self::default_second_response_delay());
    }

    fn cmd_pause(&mut self, n: usize) {
        let first_status = self.get_status_byte();
        self.state = CDState::Idle;
        self.status.reading = false;
        self.status.seeking = false;
        self.status.playing = false;
        self.cd_audio.stop();
        self.queue_first_response(3, vec![first_status], n);
        let second_status = self.get_status_byte();
        self.queue_second_response(2, vec![second_status], Self::default_second_response_delay());
    }

    fn cmd_init(&mut self, n: usize) {
        self.mode = super::Mode::default();
        self.status.motor_on = true;
        self.status.reading = false;
        self.status.seeking = false;
        self.status.playing = false;
        self.state = CDState::Idle;
        self.cd_audio.stop();
        self.position = CDPosition::new(0, 2, 0);
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        self.command_wait.reset = true;
        self.queue_second_response(2, vec![status], Self::default_second_response_delay());
    }

    fn cmd_mute(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_demute(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    /// `SetFilter` (0x0D): selects the XA file/channel pair used when
    /// `xa_filter` mode is active. Tracking which specific stream is
    /// filtered is left to `xa_filter` itself; this only acks.
    fn cmd_set_filter(&mut self, params: &[u8], n: usize) {
        let _ = params;
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_setmode(&mut self, params: &[u8], n: usize) {
        if let Some(&mode_byte) = params.first() {
            self.mode.cdda_report = (mode_byte & 0x01) != 0;
            self.mode.auto_pause = (mode_byte & 0x02) != 0;
            self.mode.report_all = (mode_byte & 0x04) != 0;
            self.mode.xa_filter = (mode_byte & 0x08) != 0;
            self.mode.ignore_bit = (mode_byte & 0x10) != 0;
            self.mode.size_2340 = (mode_byte & 0x20) != 0;
            self.mode.xa_adpcm = (mode_byte & 0x40) != 0;
            self.mode.double_speed = (mode_byte & 0x80) != 0;
        }
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_get_param(&mut self, n: usize) {
        let mode_byte = (self.mode.cdda_report as u8)
            | (self.mode.auto_pause as u8) << 1
            | (self.mode.report_all as u8) << 2
            | (self.mode.xa_filter as u8) << 3
            | (self.mode.ignore_bit as u8) << 4
            | (self.mode.size_2340 as u8) << 5
            | (self.mode.xa_adpcm as u8) << 6
            | (self.mode.double_speed as u8) << 7;
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status, mode_byte, 0, 0, 0], n);
    }

    fn cmd_get_loc_l(&mut self, n: usize) {
        let pos = self.position;
        let bytes = vec![
            dec_to_bcd(pos.minute),
            dec_to_bcd(pos.second),
            dec_to_bcd(pos.sector),
            0, // mode
            0, // file
            0, // channel
            0, // sub-mode
            0, // coding info
        ];
        self.queue_first_response(3, bytes, n);
    }

    fn cmd_get_loc_p(&mut self, n: usize) {
        let pos = self.position;
        let bytes = vec![
            1, // track number (BCD)
            1, // index (BCD)
            dec_to_bcd(pos.minute),
            dec_to_bcd(pos.second),
            dec_to_bcd(pos.sector),
            dec_to_bcd(pos.minute),
            dec_to_bcd(pos.second),
            dec_to_bcd(pos.sector),
        ];
        self.queue_first_response(3, bytes, n);
    }

    fn cmd_set_session(&mut self, params: &[u8], n: usize) {
        let _ = params;
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        self.queue_second_response(2, vec![status], Self::default_second_response_delay());
    }

    fn cmd_get_tn(&mut self, n: usize) {
        let (first, last) = self
            .disc
            .as_ref()
            .map(|d| (1u8, d.track_count().max(1) as u8))
            .unwrap_or((1, 1));
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status, dec_to_bcd(first), dec_to_bcd(last)], n);
    }

    fn cmd_get_td(&mut self, params: &[u8], n: usize) {
        let track_num = params.first().map(|&b| bcd_to_dec(b)).unwrap_or(0);
        let status = self.get_status_byte();
        let (m, s) = self
            .disc
            .as_ref()
            .and_then(|d| d.get_track(track_num.max(1)))
            .map(|t| (t.start_position.minute, t.start_position.second))
            .unwrap_or((0, 0));
        self.queue_first_response(3, vec![status, dec_to_bcd(m), dec_to_bcd(s)], n);
    }

    fn cmd_seekl(&mut self, n: usize) {
        self.begin_seek_then(PostSeekAction::Stat);
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
    }

    fn cmd_seekp(&mut self, n: usize) {
        self.cmd_seekl(n);
    }

    /// `Test` (0x19): real firmware multiplexes this on a sub-function
    /// byte; only the version-string sub-function (0x20) is modeled,
    /// everything else acks with the status byte.
    fn cmd_test(&mut self, params: &[u8], n: usize) {
        if params.first() == Some(&0x20) {
            self.queue_first_response(3, b"PSX-CDROM 1.0".to_vec(), n);
        } else {
            let status = self.get_status_byte();
            self.queue_first_response(3, vec![status], n);
        }
    }

    fn cmd_getid(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        let id_bytes = if self.has_disc() {
            vec![0x02, 0x00, 0x20, 0x00, b'S', b'C', b'E', b'A']
        } else {
            vec![0x08, 0x40, 0x00, 0x00, 0, 0, 0, 0]
        };
        self.queue_second_response(2, id_bytes, Self::default_second_response_delay());
    }

    fn cmd_reset(&mut self, n: usize) {
        self.cmd_init(n);
    }

    /// `GetQ` (0x1D): subchannel Q data; not decoded from real subcode in
    /// this disc-image model, reports a zeroed Q packet alongside status.
    fn cmd_get_q(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], n);
    }

    fn cmd_readtoc(&mut self, n: usize) {
        let status = self.get_status_byte();
        self.queue_first_response(3, vec![status], n);
        self.queue_second_response(2, vec![status], Self::default_second_response_delay());
    }

    /// Common seek dispatch for ReadN/ReadS/Play/SeekL/SeekP: if a seek
    /// target was latched via SetLoc, start a real seek; otherwise act
    /// immediately from the current position.
    fn begin_seek_then(&mut self, action: PostSeekAction) {
        if let Some(target) = self.seek_target.as_mut() {
            if !target.processed {
                target.action = action;
                self.state = CDState::Seeking;
                self.status.seeking = true;
                self.seek_ticks = 0;
                self.command_wait.seek = true;
                return;
            }
        }
        match action {
            PostSeekAction::Stat => self.state = CDState::Idle,
            PostSeekAction::Read => {
                self.state = CDState::Reading;
                self.status.reading = true;
                self.read_ticks = 0;
            }
            PostSeekAction::Play => {
                self.state = CDState::Playing;
                self.status.playing = true;
                self.read_ticks = 0;
            }
        }
    }
}
