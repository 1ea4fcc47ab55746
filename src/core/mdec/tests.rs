// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Unit tests for the macroblock decoder

use super::*;

fn push_word(mdec: &mut MDEC, word: u32) {
    mdec.data_write(word);
}

#[test]
fn test_initial_status() {
    let mdec = MDEC::new();
    let status = mdec.status();
    assert_ne!(status & 0x8000_0000, 0, "output FIFO should start empty");
    assert_eq!(status & 0xFFFF, 0xFFFF, "remaining_words starts as the done sentinel");
    assert_eq!(status & 0x2000_0000, 0, "no command should be in progress");
}

#[test]
fn test_reset_clears_command_state() {
    let mut mdec = MDEC::new();
    push_word(&mut mdec, 0x4000_0004);
    assert_eq!(mdec.cmd, Command::SetQt);
    mdec.reset();
    assert_eq!(mdec.cmd, Command::None);
    assert!(mdec.fifo_in.is_empty());
    assert!(mdec.fifo_out.is_empty());
}

#[test]
fn test_set_quant_table_single() {
    let mut mdec = MDEC::new();
    // class 2, bit0 clear -> luma-only table, 16 words follow
    push_word(&mut mdec, 0x4000_0000);
    assert_eq!(mdec.cmd, Command::SetQt);
    for i in 0..16u32 {
        let word = (i * 4 + 1) | ((i * 4 + 2) << 8) | ((i * 4 + 3) << 16) | ((i * 4 + 4) << 24);
        push_word(&mut mdec, word);
    }
    assert_eq!(mdec.cmd, Command::None);
    assert_eq!(mdec.qt[0][0], 1);
    assert_eq!(mdec.qt[0][63], 64);
}

#[test]
fn test_set_scale_table_round_trip() {
    let mut mdec = MDEC::new();
    push_word(&mut mdec, 0x6000_0000);
    assert_eq!(mdec.cmd, Command::SetSt);
    for i in 0..32u32 {
        let lo = (2 * i) as u16;
        let hi = (2 * i + 1) as u16;
        let word = (lo as u32) | ((hi as u32) << 16);
        push_word(&mut mdec, word);
    }
    assert_eq!(mdec.cmd, Command::None);
    assert_eq!(mdec.st[0], 0.0);
    assert_eq!(mdec.st[1], 1.0 / (8192.0 * 8.0));
}

#[test]
fn test_control_dma_enable_bits() {
    let mut mdec = MDEC::new();
    mdec.control(0x6000_0000);
    assert!(mdec.dma_in_enabled);
    assert!(mdec.dma_out_enabled);
    mdec.control(0x0000_0000);
    assert!(!mdec.dma_in_enabled);
    assert!(!mdec.dma_out_enabled);
}

#[test]
fn test_control_reset_bit_clears_pending_command() {
    let mut mdec = MDEC::new();
    push_word(&mut mdec, 0x4000_0004);
    assert_eq!(mdec.cmd, Command::SetQt);
    mdec.control(0x8000_0000);
    assert_eq!(mdec.cmd, Command::None);
}

#[test]
fn test_block_decoder_resumes_across_partial_input() {
    let mut decoder = BlockDecoder::new();
    let qt = [1u8; 64];
    let mut blk = [0.0f64; 64];
    let mut bin = VecDeque::new();

    // Only the first word is available; decode must report "not done" and
    // must not have advanced past reading it.
    bin.push_back(0u16);
    assert!(!decoder.step(&mut bin, &qt, &mut blk));
    assert!(bin.is_empty());

    // Feed the terminating run (k jumps straight past 63) and confirm the
    // decoder completes using only the newly available word.
    bin.push_back(0x3F << 10);
    assert!(decoder.step(&mut bin, &qt, &mut blk));
}

#[test]
fn test_dma_out_sync_defers_when_fifo_short() {
    let mut mdec = MDEC::new();
    mdec.control(0x2000_0000);
    assert!(!mdec.dma_out_sync(3));
    assert!(mdec.dma_out_waiting);
}

#[test]
fn test_dma_out_sync_ready_when_fifo_has_enough_words() {
    let mut mdec = MDEC::new();
    mdec.control(0x2000_0000);
    mdec.fifo_out.push_back(0);
    mdec.fifo_out.push_back(0);
    assert!(mdec.dma_out_sync(1));
}

#[test]
fn test_dma_in_read_warns_and_returns_garbage() {
    let mdec = MDEC::new();
    assert_eq!(mdec.dma_in_read(), 0xFF00_FF00);
}

#[test]
fn test_yuv_to_mono_8b_round_trips_midgray() {
    let mut mdec = MDEC::new();
    mdec.data_out_signed = false;
    mdec.yblk = [0.0; 64];
    mdec.yuv_to_mono_8b();
    assert_eq!(mdec.fb[0], 128);
}

#[test]
fn test_next_event_cc_reflects_pending_macroblock() {
    let mut mdec = MDEC::new();
    mdec.waiting_write_macroblock = true;
    mdec.cc_to_write_macroblock = 42;
    mdec.update_timing_event();
    assert_eq!(mdec.next_event_cc(), 42);
}
