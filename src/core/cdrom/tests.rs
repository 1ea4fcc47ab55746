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

use super::*;

fn tick_until_response(cdrom: &mut CDROM, max_cycles: i32) {
    let mut spent = 0;
    while cdrom.response_empty() && spent < max_cycles {
        cdrom.tick(1000);
        spent += 1000;
    }
}

#[test]
fn getstat_acks_with_status_byte() {
    let mut cdrom = CDROM::new();
    cdrom.execute_command(0x01);
    tick_until_response(&mut cdrom, 200_000);
    assert!(!cdrom.response_empty());
    assert_ne!(cdrom.interrupt_flag(), 0);
}

#[test]
fn unknown_command_errors() {
    let mut cdrom = CDROM::new();
    cdrom.execute_command(0xFF);
    assert!(!cdrom.response_empty());
    assert_eq!(cdrom.interrupt_flag() & 0x10, 0x10); // INT5
}

#[test]
fn all_named_opcodes_are_dispatched() {
    // Every opcode from the 23-command protocol should produce a
    // response rather than silently falling through to the
    // catch-all unknown-command error path.
    let opcodes = [
        0x00u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
        0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
    ];
    for &op in &opcodes {
        let mut cdrom = CDROM::new();
        if op == 0x02 {
            cdrom.push_param(0x00);
            cdrom.push_param(0x02);
            cdrom.push_param(0x00);
        }
        cdrom.execute_command(op);
        tick_until_response(&mut cdrom, 500_000);
        assert!(
            !cdrom.response_empty(),
            "opcode 0x{:02X} produced no response",
            op
        );
    }
}

#[test]
fn setloc_then_seekl_reaches_target_position() {
    let mut cdrom = CDROM::new();
    cdrom.status.motor_on = true;

    cdrom.push_param(dec_to_bcd(0));
    cdrom.push_param(dec_to_bcd(10));
    cdrom.push_param(dec_to_bcd(0));
    cdrom.execute_command(0x02); // SetLoc

    cdrom.execute_command(0x15); // SeekL
    assert_eq!(cdrom.state, CDState::Seeking);

    // Drain the seek over many ticks; the exact cycle count is
    // distance-dependent (see `calculate_seek_time`) but must terminate.
    let mut spent = 0;
    while cdrom.state == CDState::Seeking && spent < 2_000_000 {
        cdrom.tick(1000);
        spent += 1000;
    }

    assert_eq!(cdrom.state, CDState::Idle);
    assert_eq!(cdrom.position.second, 10);
}

#[test]
fn init_resets_mode_and_position() {
    let mut cdrom = CDROM::new();
    cdrom.push_param(0xFF);
    cdrom.execute_command(0x0E); // SetMode: everything on
    assert!(cdrom.mode.double_speed);

    cdrom.execute_command(0x0A); // Init
    assert!(!cdrom.mode.double_speed);
    assert_eq!(cdrom.position.minute, 0);
    assert_eq!(cdrom.position.second, 2);
    assert_eq!(cdrom.position.sector, 0);
}

#[test]
fn readn_eventually_fills_data_buffer_from_a_synthetic_disc() {
    let mut cdrom = CDROM::new();
    cdrom.status.motor_on = true;
    cdrom.execute_command(0x06); // ReadN with no disc: no data arrives
    // Without a loaded disc, reading just idles waiting for sectors that
    // never arrive; the important invariant is it doesn't panic and the
    // first response still completes.
    tick_until_response(&mut cdrom, 500_000);
    assert!(!cdrom.response_empty());
}

#[test]
fn second_response_never_fires_before_first() {
    let mut cdrom = CDROM::new();
    cdrom.execute_command(0x0A); // Init queues both a first and second response
    cdrom.tick(1);
    // First response hasn't had time to fire yet, so no bytes should be
    // visible even though a second response was queued behind it.
    assert!(cdrom.response_empty());
}

#[test]
fn irq_coincidence_gate_enforces_minimum_spacing() {
    let mut cdrom = CDROM::new();
    cdrom.execute_command(0x01); // GetStat: first response only
    tick_until_response(&mut cdrom, 200_000);
    let first_flag = cdrom.interrupt_flag();
    cdrom.acknowledge_interrupt(first_flag);

    // Immediately issue a second command; its response must not raise a
    // second IRQ before CC2IRQ_EXPIRED cycles have elapsed.
    cdrom.execute_command(0x01);
    cdrom.tick(1);
    assert_eq!(cdrom.interrupt_flag(), 0);
}

#[test]
fn seek_time_grows_with_distance() {
    let mut near = CDROM::new();
    near.status.motor_on = true;
    near.seek_target = Some(SeekTarget {
        position: CDPosition::new(0, 2, 1),
        processed: false,
        action: PostSeekAction::Stat,
    });
    let near_time = near.calculate_seek_time();

    let mut far = CDROM::new();
    far.status.motor_on = true;
    far.seek_target = Some(SeekTarget {
        position: CDPosition::new(50, 0, 0),
        processed: false,
        action: PostSeekAction::Stat,
    });
    let far_time = far.calculate_seek_time();

    assert!(far_time > near_time);
}

#[test]
fn motor_off_seek_pays_spinup_penalty() {
    let mut off = CDROM::new();
    off.status.motor_on = false;
    off.seek_target = Some(SeekTarget {
        position: CDPosition::new(0, 2, 1),
        processed: false,
        action: PostSeekAction::Stat,
    });
    let off_time = off.calculate_seek_time();

    let mut on = CDROM::new();
    on.status.motor_on = true;
    on.seek_target = Some(SeekTarget {
        position: CDPosition::new(0, 2, 1),
        processed: false,
        action: PostSeekAction::Stat,
    });
    let on_time = on.calculate_seek_time();

    assert!(off_time > on_time);
}

#[test]
fn bcd_position_round_trips_through_lba() {
    for minute in 0..5u8 {
        for second in 0..60u8 {
            let pos = CDPosition::new(minute, second, 0);
            let lba = pos.to_lba();
            let back = CDPosition::from_lba(lba);
            assert_eq!(pos, back);
        }
    }
}

#[test]
fn adpcm_decode_is_amplitude_monotonic_with_shift() {
    // A larger shift value should not produce a larger peak decoded
    // amplitude than a smaller one for the same nibble pattern, since
    // shift only ever reduces the effective input range.
    let mut low_shift_data = vec![0u8; 0x914];
    low_shift_data[4] = 0x01; // shift = 1, filter = 0
    for i in 0..28 {
        low_shift_data[16 + i * 4] = 0x77;
    }

    let mut high_shift_data = vec![0u8; 0x914];
    high_shift_data[4] = 0x09; // shift = 9, filter = 0
    for i in 0..28 {
        high_shift_data[16 + i * 4] = 0x77;
    }

    let mut dec_low = XaAdpcmDecoder::new();
    let mut dec_high = XaAdpcmDecoder::new();
    let low = dec_low.decode_sector(&low_shift_data, true, false);
    let high = dec_high.decode_sector(&high_shift_data, true, false);

    let peak = |s: &[(i16, i16)]| s.iter().map(|&(l, _)| l.unsigned_abs()).max().unwrap_or(0);
    assert!(peak(&low) >= peak(&high));
}

#[test]
fn read_buffer_drops_oldest_cooked_sector_past_capacity() {
    let mut buf = ReadBuffer::default();
    for i in 0..10u8 {
        buf.push_cooked(vec![i; 4]);
    }
    // Capacity is 6; only the most recent 6 sectors should survive.
    let mut seen = Vec::new();
    while let Some(s) = buf.pop_cooked() {
        seen.push(s[0]);
    }
    assert_eq!(seen, vec![4, 5, 6, 7, 8, 9]);
}

#[test]
fn cdrom_initial_state_has_no_disc_and_is_idle() {
    let cdrom = CDROM::new();
    assert!(!cdrom.has_disc());
    assert_eq!(cdrom.state, CDState::Idle);
    assert_eq!(cdrom.position(), &CDPosition::new(0, 2, 0));
}
