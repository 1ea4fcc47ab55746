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

//! CD-DA (Compact Disc Digital Audio) playback.
//!
//! CD-DA sectors carry raw 44.1kHz 16-bit stereo PCM directly (588
//! stereo samples per 2352-byte sector, no ADPCM involved — that only
//! applies to XA Mode 2 Form 2 sectors, handled separately by
//! [`super::adpcm::XaAdpcmDecoder`]). The drive hands sectors to this
//! player as they arrive off disc; it just unpacks and queues samples.

use std::collections::VecDeque;

/// CD-DA playback queue and volume state.
pub struct CDAudio {
    playing: bool,
    looping: bool,

    pub(crate) volume_left: i16,
    pub(crate) volume_right: i16,

    queue: VecDeque<(i16, i16)>,
}

impl CDAudio {
    pub fn new() -> Self {
        Self {
            playing: false,
            looping: false,
            volume_left: 0x80,
            volume_right: 0x80,
            queue: VecDeque::new(),
        }
    }

    pub fn play(&mut self, looping: bool) {
        self.looping = looping;
        self.playing = true;
        self.queue.clear();
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.queue.clear();
    }

    pub fn set_volume(&mut self, left: u8, right: u8) {
        self.volume_left = left as i16;
        self.volume_right = right as i16;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Unpack one raw 2352-byte CD-DA sector (588 interleaved 16-bit LE
    /// stereo samples) into the playback queue.
    pub fn feed_sector(&mut self, raw: &[u8]) {
        if !self.playing {
            return;
        }
        for chunk in raw.chunks_exact(4) {
            let left = i16::from_le_bytes([chunk[0], chunk[1]]);
            let right = i16::from_le_bytes([chunk[2], chunk[3]]);
            self.queue.push_back((left, right));
        }
    }

    /// Pop the next stereo sample, with volume applied, or silence if the
    /// queue has run dry (drive hasn't kept up, or playback is stopped).
    #[inline(always)]
    pub fn get_sample(&mut self) -> (i16, i16) {
        if !self.playing {
            return (0, 0);
        }
        let (left, right) = self.queue.pop_front().unwrap_or((0, 0));

        let left = (left as i32 * self.volume_left as i32) >> 7;
        let right = (right as i32 * self.volume_right as i32) >> 7;
        (
            left.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
            right.clamp(i16::MIN as i32, i16::MAX as i32) as i16,
        )
    }
}

impl Default for CDAudio {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_until_playing() {
        let mut a = CDAudio::new();
        assert_eq!(a.get_sample(), (0, 0));
    }

    #[test]
    fn feeds_and_drains_samples() {
        let mut a = CDAudio::new();
        a.play(false);
        let mut raw = vec![0u8; 2352];
        raw[0..2].copy_from_slice(&1000i16.to_le_bytes());
        raw[2..4].copy_from_slice(&(-1000i16).to_le_bytes());
        a.feed_sector(&raw);
        let (l, r) = a.get_sample();
        assert!(l > 0);
        assert!(r < 0);
    }

    #[test]
    fn volume_scales_output() {
        let mut a = CDAudio::new();
        a.play(false);
        a.set_volume(0x40, 0x40);
        let mut raw = vec![0u8; 2352];
        raw[0..2].copy_from_slice(&1000i16.to_le_bytes());
        a.feed_sector(&raw);
        let (l, _) = a.get_sample();
        assert_eq!(l, (1000 * 0x40) >> 7);
    }
}
