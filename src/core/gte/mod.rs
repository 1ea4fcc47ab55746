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

//! Geometry Transformation Engine (COP2)
//!
//! The GTE is the fixed-point 3D coprocessor used for perspective
//! transforms, lighting, and colour calculation. It exposes 32 data
//! registers and 32 control registers addressed 0..63 (data first,
//! control following at +32, matching the hardware's COP2 register
//! numbering), a 24-opcode command set, and a FLAG register whose bit 31
//! is the logical OR of a fixed group of saturation/error bits.
//!
//! All arithmetic below mirrors the reference's 64-bit intermediate
//! values and saturation classes bit-for-bit; nothing here is an
//! approximation.

#[cfg(test)]
mod tests;

const INT43_MAX: i64 = 1i64 << 43;
const INT43_MIN: i64 = -(1i64 << 43);
const INT31_MAX: i64 = (1i64 << 31) - 1;
const INT31_MIN: i64 = -(1i64 << 31);

/// 8-bit reciprocal approximation table used by the perspective-divide
/// algorithm (`unr_divide`). 257 entries, indexed by `(d - 0x7FC0) >> 7`
/// after `d` has been normalised into `0x8000..0xFFFF`.
const UNR_TABLE: [u8; 0x101] = [
    0xFF, 0xFD, 0xFB, 0xF9, 0xF7, 0xF5, 0xF3, 0xF1, 0xEF, 0xEE, 0xEC, 0xEA, 0xE8, 0xE6, 0xE4, 0xE3,
    0xE1, 0xDF, 0xDD, 0xDC, 0xDA, 0xD8, 0xD6, 0xD5, 0xD3, 0xD1, 0xD0, 0xCE, 0xCD, 0xCB, 0xC9, 0xC8,
    0xC6, 0xC5, 0xC3, 0xC1, 0xC0, 0xBE, 0xBD, 0xBB, 0xBA, 0xB8, 0xB7, 0xB5, 0xB4, 0xB2, 0xB1, 0xB0,
    0xAE, 0xAD, 0xAB, 0xAA, 0xA9, 0xA7, 0xA6, 0xA4, 0xA3, 0xA2, 0xA0, 0x9F, 0x9E, 0x9C, 0x9B, 0x9A,
    0x99, 0x97, 0x96, 0x95, 0x94, 0x92, 0x91, 0x90, 0x8F, 0x8D, 0x8C, 0x8B, 0x8A, 0x89, 0x87, 0x86,
    0x85, 0x84, 0x83, 0x82, 0x81, 0x7F, 0x7E, 0x7D, 0x7C, 0x7B, 0x7A, 0x79, 0x78, 0x77, 0x75, 0x74,
    0x73, 0x72, 0x71, 0x70, 0x6F, 0x6E, 0x6D, 0x6C, 0x6B, 0x6A, 0x69, 0x68, 0x67, 0x66, 0x65, 0x64,
    0x63, 0x62, 0x61, 0x60, 0x5F, 0x5E, 0x5D, 0x5D, 0x5C, 0x5B, 0x5A, 0x59, 0x58, 0x57, 0x56, 0x55,
    0x54, 0x53, 0x53, 0x52, 0x51, 0x50, 0x4F, 0x4E, 0x4D, 0x4D, 0x4C, 0x4B, 0x4A, 0x49, 0x48, 0x48,
    0x47, 0x46, 0x45, 0x44, 0x43, 0x43, 0x42, 0x41, 0x40, 0x3F, 0x3F, 0x3E, 0x3D, 0x3C, 0x3C, 0x3B,
    0x3A, 0x39, 0x39, 0x38, 0x37, 0x36, 0x36, 0x35, 0x34, 0x33, 0x33, 0x32, 0x31, 0x31, 0x30, 0x2F,
    0x2E, 0x2E, 0x2D, 0x2C, 0x2C, 0x2B, 0x2A, 0x2A, 0x29, 0x28, 0x28, 0x27, 0x26, 0x26, 0x25, 0x24,
    0x24, 0x23, 0x22, 0x22, 0x21, 0x20, 0x20, 0x1F, 0x1E, 0x1E, 0x1D, 0x1D, 0x1C, 0x1B, 0x1B, 0x1A,
    0x19, 0x19, 0x18, 0x18, 0x17, 0x16, 0x16, 0x15, 0x15, 0x14, 0x14, 0x13, 0x12, 0x12, 0x11, 0x11,
    0x10, 0x0F, 0x0F, 0x0E, 0x0E, 0x0D, 0x0D, 0x0C, 0x0C, 0x0B, 0x0A, 0x0A, 0x09, 0x09, 0x08, 0x08,
    0x07, 0x07, 0x06, 0x06, 0x05, 0x05, 0x04, 0x04, 0x03, 0x03, 0x02, 0x02, 0x01, 0x01, 0x00, 0x00,
    0x00,
];

// FLAG bit masks. Each constant already bakes in bit 31 (the error
// summary bit) when the corresponding saturation class participates in
// the summary; a handful (B3, C1-C3, H) intentionally do not.
const F_A1_POS: u32 = 0xC000_0000;
const F_A2_POS: u32 = 0xA000_0000;
const F_A3_POS: u32 = 0x9000_0000;
const F_A1_NEG: u32 = 0x8800_0000;
const F_A2_NEG: u32 = 0x8400_0000;
const F_A3_NEG: u32 = 0x8200_0000;
const F_B1: u32 = 0x8100_0000;
const F_B2: u32 = 0x8080_0000;
const F_B3: u32 = 0x0040_0000;
const F_C1: u32 = 0x0020_0000;
const F_C2: u32 = 0x0010_0000;
const F_C3: u32 = 0x0008_0000;
const F_D: u32 = 0x8004_0000;
const F_E: u32 = 0x8002_0000;
const F_F_POS: u32 = 0x8001_0000;
const F_F_NEG: u32 = 0x8000_8000;
const F_G1: u32 = 0x8000_4000;
const F_G2: u32 = 0x8000_2000;
const F_H: u32 = 0x0000_1000;

/// Geometry Transformation Engine state and opcode implementations.
pub struct GTE {
    vx0: i16,
    vy0: i16,
    vz0: i16,
    vx1: i16,
    vy1: i16,
    vz1: i16,
    vx2: i16,
    vy2: i16,
    vz2: i16,

    ir0: i16,
    ir1: i16,
    ir2: i16,
    ir3: i16,

    rt11: i16,
    rt12: i16,
    rt13: i16,
    rt21: i16,
    rt22: i16,
    rt23: i16,
    rt31: i16,
    rt32: i16,
    rt33: i16,

    l11: i16,
    l12: i16,
    l13: i16,
    l21: i16,
    l22: i16,
    l23: i16,
    l31: i16,
    l32: i16,
    l33: i16,

    lr1: i16,
    lr2: i16,
    lr3: i16,
    lg1: i16,
    lg2: i16,
    lg3: i16,
    lb1: i16,
    lb2: i16,
    lb3: i16,

    trx: i32,
    try_: i32,
    trz: i32,

    rbk: i32,
    gbk: i32,
    bbk: i32,

    rfc: i32,
    gfc: i32,
    bfc: i32,

    ofx: i32,
    ofy: i32,
    h: u16,
    dqa: i16,
    dqb: i32,

    sx0: i16,
    sy0: i16,
    sx1: i16,
    sy1: i16,
    sx2: i16,
    sy2: i16,
    sz0: u16,
    sz1: u16,
    sz2: u16,
    sz3: u16,

    mac0: i32,
    mac1: i32,
    mac2: i32,
    mac3: i32,

    zsf3: i16,
    zsf4: i16,
    otz: u16,

    lzcs: i32,
    lzcr: u32,

    rgbc: u32,
    rgb0: u32,
    rgb1: u32,
    rgb2: u32,
    res1: u32,

    /// FLAG register. Public for test/debug inspection, matching the
    /// teacher's existing test suite which reads it directly.
    pub flags: u32,

    /// Cycles the most recently executed opcode declared as its cost.
    /// The CPU (an external collaborator) is expected to stall for this
    /// many cycles before issuing another GTE command or register access.
    pub cycles: i32,
}

impl Default for GTE {
    fn default() -> Self {
        Self::new()
    }
}

impl GTE {
    // Data register indices (0..31), matching COP2 data register numbers.
    pub const VXY0: usize = 0;
    pub const VZ0: usize = 1;
    pub const VXY1: usize = 2;
    pub const VZ1: usize = 3;
    pub const VXY2: usize = 4;
    pub const VZ2: usize = 5;
    pub const RGBC: usize = 6;
    pub const OTZ: usize = 7;
    pub const IR0: usize = 8;
    pub const IR1: usize = 9;
    pub const IR2: usize = 10;
    pub const IR3: usize = 11;
    pub const SXY0: usize = 12;
    pub const SXY1: usize = 13;
    pub const SXY2: usize = 14;
    pub const SXYP: usize = 15;
    pub const SZ0: usize = 16;
    pub const SZ1: usize = 17;
    pub const SZ2: usize = 18;
    pub const SZ3: usize = 19;
    pub const RGB0: usize = 20;
    pub const RGB1: usize = 21;
    pub const RGB2: usize = 22;
    pub const RES1: usize = 23;
    pub const MAC0: usize = 24;
    pub const MAC1: usize = 25;
    pub const MAC2: usize = 26;
    pub const MAC3: usize = 27;
    pub const IRGB: usize = 28;
    pub const ORGB: usize = 29;
    pub const LZCS: usize = 30;
    pub const LZCR: usize = 31;

    // Control register indices (0..31), matching COP2 control register numbers.
    pub const RT11_RT12: usize = 0;
    pub const RT13_RT21: usize = 1;
    pub const RT22_RT23: usize = 2;
    pub const RT31_RT32: usize = 3;
    pub const RT33: usize = 4;
    pub const TRX: usize = 5;
    pub const TRY: usize = 6;
    pub const TRZ: usize = 7;
    pub const L11_L12: usize = 8;
    pub const L13_L21: usize = 9;
    pub const L22_L23: usize = 10;
    pub const L31_L32: usize = 11;
    pub const L33: usize = 12;
    pub const RBK: usize = 13;
    pub const GBK: usize = 14;
    pub const BBK: usize = 15;
    pub const LR1_LR2: usize = 16;
    pub const LR3_LG1: usize = 17;
    pub const LG2_LG3: usize = 18;
    pub const LB1_LB2: usize = 19;
    pub const LB3: usize = 20;
    pub const RFC: usize = 21;
    pub const GFC: usize = 22;
    pub const BFC: usize = 23;
    pub const OFX: usize = 24;
    pub const OFY: usize = 25;
    pub const H: usize = 26;
    pub const DQA: usize = 27;
    pub const DQB: usize = 28;
    pub const ZSF3: usize = 29;
    pub const ZSF4: usize = 30;
    pub const FLAG: usize = 31;

    pub fn new() -> Self {
        Self {
            vx0: 0,
            vy0: 0,
            vz0: 0,
            vx1: 0,
            vy1: 0,
            vz1: 0,
            vx2: 0,
            vy2: 0,
            vz2: 0,
            ir0: 0,
            ir1: 0,
            ir2: 0,
            ir3: 0,
            rt11: 0,
            rt12: 0,
            rt13: 0,
            rt21: 0,
            rt22: 0,
            rt23: 0,
            rt31: 0,
            rt32: 0,
            rt33: 0,
            l11: 0,
            l12: 0,
            l13: 0,
            l21: 0,
            l22: 0,
            l23: 0,
            l31: 0,
            l32: 0,
            l33: 0,
            lr1: 0,
            lr2: 0,
            lr3: 0,
            lg1: 0,
            lg2: 0,
            lg3: 0,
            lb1: 0,
            lb2: 0,
            lb3: 0,
            trx: 0,
            try_: 0,
            trz: 0,
            rbk: 0,
            gbk: 0,
            bbk: 0,
            rfc: 0,
            gfc: 0,
            bfc: 0,
            ofx: 0,
            ofy: 0,
            h: 0,
            dqa: 0,
            dqb: 0,
            sx0: 0,
            sy0: 0,
            sx1: 0,
            sy1: 0,
            sx2: 0,
            sy2: 0,
            sz0: 0,
            sz1: 0,
            sz2: 0,
            sz3: 0,
            mac0: 0,
            mac1: 0,
            mac2: 0,
            mac3: 0,
            zsf3: 0,
            zsf4: 0,
            otz: 0,
            lzcs: 0,
            lzcr: 0,
            rgbc: 0,
            rgb0: 0,
            rgb1: 0,
            rgb2: 0,
            res1: 0,
            flags: 0,
            cycles: 0,
        }
    }

    /// Read a data register (0..31).
    pub fn read_data(&self, n: usize) -> i32 {
        self.read(n)
    }

    /// Write a data register (0..31).
    pub fn write_data(&mut self, n: usize, v: i32) {
        self.write(n, v as u32);
    }

    /// Read a control register (0..31).
    pub fn read_control(&self, n: usize) -> i32 {
        self.read(n + 32)
    }

    /// Write a control register (0..31).
    pub fn write_control(&mut self, n: usize, v: i32) {
        self.write(n + 32, v as u32);
    }

    fn read(&self, nreg: usize) -> i32 {
        let pack16 = |hi: i16, lo: i16| ((lo as u16 as u32) | ((hi as u16 as u32) << 16)) as i32;
        match nreg {
            0 => pack16(self.vy0, self.vx0),
            1 => self.vz0 as i32,
            2 => pack16(self.vy1, self.vx1),
            3 => self.vz1 as i32,
            4 => pack16(self.vy2, self.vx2),
            5 => self.vz2 as i32,
            6 => self.rgbc as i32,
            7 => (self.otz & 0x7FFF) as i32,
            8 => self.ir0 as i32,
            9 => self.ir1 as i32,
            10 => self.ir2 as i32,
            11 => self.ir3 as i32,
            12 => pack16(self.sy0, self.sx0),
            13 => pack16(self.sy1, self.sx1),
            14 | 15 => pack16(self.sy2, self.sx2),
            16 => self.sz0 as i32,
            17 => self.sz1 as i32,
            18 => self.sz2 as i32,
            19 => self.sz3 as i32,
            20 => self.rgb0 as i32,
            21 => self.rgb1 as i32,
            22 => self.rgb2 as i32,
            23 => self.res1 as i32,
            24 => self.mac0,
            25 => self.mac1,
            26 => self.mac2,
            27 => self.mac3,
            28 | 29 => self.irgb() as i32,
            30 => self.lzcs,
            31 => self.lzcr as i32,
            32 => pack16(self.rt12, self.rt11),
            33 => pack16(self.rt21, self.rt13),
            34 => pack16(self.rt23, self.rt22),
            35 => pack16(self.rt32, self.rt31),
            36 => self.rt33 as i32,
            37 => self.trx,
            38 => self.try_,
            39 => self.trz,
            40 => pack16(self.l12, self.l11),
            41 => pack16(self.l21, self.l13),
            42 => pack16(self.l23, self.l22),
            43 => pack16(self.l32, self.l31),
            44 => self.l33 as i32,
            45 => self.rbk,
            46 => self.gbk,
            47 => self.bbk,
            48 => pack16(self.lr2, self.lr1),
            49 => pack16(self.lg1, self.lr3),
            50 => pack16(self.lg3, self.lg2),
            51 => pack16(self.lb2, self.lb1),
            52 => self.lb3 as i32,
            53 => self.rfc,
            54 => self.gfc,
            55 => self.bfc,
            56 => self.ofx,
            57 => self.ofy,
            58 => self.h as i16 as i32,
            59 => self.dqa as u16 as i32,
            60 => self.dqb,
            61 => self.zsf3 as i32,
            62 => self.zsf4 as i32,
            63 => (self.flags & 0xFFFF_F000) as i32,
            _ => 0,
        }
    }

    fn irgb(&self) -> u32 {
        let mut val = 0u32;
        let c = |ir: i16, shift: u32, mask: u32| -> u32 {
            let t = ir >> 7;
            if t >= 0x1F {
                mask
            } else if t > 0 {
                (t as u32) << shift
            } else {
                0
            }
        };
        val |= c(self.ir1, 0, 0x0000_001F);
        val |= c(self.ir2, 5, 0x0000_03E0);
        val |= c(self.ir3, 10, 0x0000_7C00);
        val
    }

    fn write(&mut self, nreg: usize, data: u32) {
        let lo16 = |d: u32| (d & 0xFFFF) as i16;
        let hi16 = |d: u32| (d >> 16) as i16;
        match nreg {
            0 => {
                self.vx0 = lo16(data);
                self.vy0 = hi16(data);
            }
            1 => self.vz0 = lo16(data),
            2 => {
                self.vx1 = lo16(data);
                self.vy1 = hi16(data);
            }
            3 => self.vz1 = lo16(data),
            4 => {
                self.vx2 = lo16(data);
                self.vy2 = hi16(data);
            }
            5 => self.vz2 = lo16(data),
            6 => self.rgbc = data,
            7 => {}
            8 => self.ir0 = lo16(data),
            9 => self.ir1 = lo16(data),
            10 => self.ir2 = lo16(data),
            11 => self.ir3 = lo16(data),
            12 => {
                self.sx0 = lo16(data);
                self.sy0 = hi16(data);
            }
            13 => {
                self.sx1 = lo16(data);
                self.sy1 = hi16(data);
            }
            14 => {
                self.sx2 = lo16(data);
                self.sy2 = hi16(data);
            }
            15 => {
                self.sx0 = self.sx1;
                self.sy0 = self.sy1;
                self.sx1 = self.sx2;
                self.sy1 = self.sy2;
                self.sx2 = lo16(data);
                self.sy2 = hi16(data);
            }
            16 => self.sz0 = (data & 0xFFFF) as u16,
            17 => self.sz1 = (data & 0xFFFF) as u16,
            18 => self.sz2 = (data & 0xFFFF) as u16,
            19 => self.sz3 = (data & 0xFFFF) as u16,
            20 => self.rgb0 = data,
            21 => self.rgb1 = data,
            22 => self.rgb2 = data,
            23 => self.res1 = data,
            24 => self.mac0 = data as i32,
            25 => self.mac1 = data as i32,
            26 => self.mac2 = data as i32,
            27 => self.mac3 = data as i32,
            28 => {
                self.ir1 = ((data & 0x1F) << 7) as i16;
                self.ir2 = (((data >> 5) & 0x1F) << 7) as i16;
                self.ir3 = (((data >> 10) & 0x1F) << 7) as i16;
            }
            29 => {}
            30 => {
                self.lzcs = data as i32;
                self.lzcr = if self.lzcs >= 0 {
                    data.leading_zeros()
                } else {
                    (!data).leading_zeros()
                };
            }
            31 => {}
            32 => {
                self.rt11 = lo16(data);
                self.rt12 = hi16(data);
            }
            33 => {
                self.rt13 = lo16(data);
                self.rt21 = hi16(data);
            }
            34 => {
                self.rt22 = lo16(data);
                self.rt23 = hi16(data);
            }
            35 => {
                self.rt31 = lo16(data);
                self.rt32 = hi16(data);
            }
            36 => self.rt33 = lo16(data),
            37 => self.trx = data as i32,
            38 => self.try_ = data as i32,
            39 => self.trz = data as i32,
            40 => {
                self.l11 = lo16(data);
                self.l12 = hi16(data);
            }
            41 => {
                self.l13 = lo16(data);
                self.l21 = hi16(data);
            }
            42 => {
                self.l22 = lo16(data);
                self.l23 = hi16(data);
            }
            43 => {
                self.l31 = lo16(data);
                self.l32 = hi16(data);
            }
            44 => self.l33 = lo16(data),
            45 => self.rbk = data as i32,
            46 => self.gbk = data as i32,
            47 => self.bbk = data as i32,
            48 => {
                self.lr1 = lo16(data);
                self.lr2 = hi16(data);
            }
            49 => {
                self.lr3 = lo16(data);
                self.lg1 = hi16(data);
            }
            50 => {
                self.lg2 = lo16(data);
                self.lg3 = hi16(data);
            }
            51 => {
                self.lb1 = lo16(data);
                self.lb2 = hi16(data);
            }
            52 => self.lb3 = lo16(data),
            53 => self.rfc = data as i32,
            54 => self.gfc = data as i32,
            55 => self.bfc = data as i32,
            56 => self.ofx = data as i32,
            57 => self.ofy = data as i32,
            58 => self.h = (data & 0xFFFF) as u16,
            59 => self.dqa = lo16(data),
            60 => self.dqb = data as i32,
            61 => self.zsf3 = lo16(data),
            62 => self.zsf4 = lo16(data),
            63 => self.flags = data & 0x7FFF_F000,
            _ => {}
        }
    }

    fn set_mac1(&mut self, tmp: i64) {
        if tmp > INT43_MAX {
            self.flags |= F_A1_POS;
        } else if tmp < INT43_MIN {
            self.flags |= F_A1_NEG;
        }
        self.mac1 = tmp as i32;
    }

    fn set_mac2(&mut self, tmp: i64) {
        if tmp > INT43_MAX {
            self.flags |= F_A2_POS;
        } else if tmp < INT43_MIN {
            self.flags |= F_A2_NEG;
        }
        self.mac2 = tmp as i32;
    }

    fn set_mac3(&mut self, tmp: i64) {
        if tmp > INT43_MAX {
            self.flags |= F_A3_POS;
        } else if tmp < INT43_MIN {
            self.flags |= F_A3_NEG;
        }
        self.mac3 = tmp as i32;
    }

    fn set_mac0(&mut self, tmp: i64) {
        if tmp > INT31_MAX {
            self.flags |= F_F_POS;
        } else if tmp < INT31_MIN {
            self.flags |= F_F_NEG;
        }
        self.mac0 = tmp as i32;
    }

    fn set_mac0_shift(&mut self, tmp: i64) {
        if tmp > INT31_MAX {
            self.flags |= F_F_POS;
        } else if tmp < INT31_MIN {
            self.flags |= F_F_NEG;
        }
        self.mac0 = (tmp >> 16) as i32;
    }

    fn set_ir1(&mut self, tmp: i64, lm: bool) {
        self.ir1 = Self::saturate_ir(tmp, lm, &mut self.flags, F_B1);
    }
    fn set_ir2(&mut self, tmp: i64, lm: bool) {
        self.ir2 = Self::saturate_ir(tmp, lm, &mut self.flags, F_B2);
    }
    fn set_ir3(&mut self, tmp: i64, lm: bool) {
        self.ir3 = Self::saturate_ir(tmp, lm, &mut self.flags, F_B3);
    }

    fn saturate_ir(tmp: i64, lm: bool, flags: &mut u32, bit: u32) -> i16 {
        let lo = if lm { 0 } else { -0x8000 };
        if tmp > 0x7FFF {
            *flags |= bit;
            0x7FFF
        } else if tmp < lo {
            *flags |= bit;
            lo as i16
        } else {
            tmp as i16
        }
    }

    fn set_sz3(&mut self, tmp: i32) {
        if tmp > 0xFFFF {
            self.flags |= F_D;
            self.sz3 = 0xFFFF;
        } else if tmp < 0 {
            self.flags |= F_D;
            self.sz3 = 0;
        } else {
            self.sz3 = tmp as u16;
        }
    }

    fn set_otz(&mut self, tmp: i32) {
        if tmp > 0xFFFF {
            self.flags |= F_D;
            self.otz = 0xFFFF;
        } else if tmp < 0 {
            self.flags |= F_D;
            self.otz = 0;
        } else {
            self.otz = tmp as u16;
        }
    }

    /// UNR-table perspective divide: `n / d` scaled to a 17-bit quotient,
    /// bit-exact with the hardware's Newton-Raphson-refined approximation.
    fn unr_divide(&mut self, num: i64, den: i64) -> i64 {
        if num < den * 2 {
            let z = count_leading_zeroes_16(den);
            let n = num << z;
            let d = den << z;
            let u = UNR_TABLE[((d - 0x7FC0) >> 7) as usize] as i64 + 0x101;
            let d = (0x0200_0080 - d * u) >> 8;
            let d = (0x0000_0080 + d * u) >> 8;
            let ret = (n * d + 0x8000) >> 16;
            ret.min(0x1FFFF)
        } else {
            self.flags |= F_E;
            0x1FFFF
        }
    }

    fn get_sf(cmd: u32) -> i64 {
        if cmd & 0x0008_0000 != 0 {
            12
        } else {
            0
        }
    }
    fn get_mx(cmd: u32) -> u32 {
        (cmd >> 17) & 3
    }
    fn get_vx(cmd: u32) -> u32 {
        (cmd >> 15) & 3
    }
    fn get_tx(cmd: u32) -> u32 {
        (cmd >> 13) & 3
    }
    fn check_lm(cmd: u32) -> bool {
        cmd & 0x0000_0400 == 0
    }

    /// Dispatch a 25-bit COP2 command word to the matching opcode.
    pub fn execute(&mut self, cmd: u32) {
        match cmd & 0x3F {
            0x01 => self.rtps(Self::get_sf(cmd) != 0),
            0x06 => self.nclip(),
            0x0C => self.op(cmd),
            0x10 => self.dpcs(cmd),
            0x11 => self.intpl(cmd),
            0x12 => self.mvmva(cmd),
            0x13 => self.ncds(cmd),
            0x14 => self.cdp(cmd),
            0x16 => self.ncdt(cmd),
            0x1B => self.nccs(cmd),
            0x1C => self.cc(cmd),
            0x1E => self.ncs(cmd),
            0x20 => self.nct(cmd),
            0x28 => self.sqr(cmd),
            0x29 => self.dcpl(cmd),
            0x2A => self.dpct(cmd),
            0x2D => self.avsz3(),
            0x2E => self.avsz4(),
            0x30 => self.rtpt(Self::get_sf(cmd) != 0),
            0x3D => self.gpf(cmd),
            0x3E => self.gpl(cmd),
            0x3F => self.ncct(cmd),
            other => {
                log::warn!("GTE: unknown opcode 0x{:02X}", other);
                self.flags |= 0x8000_0000;
            }
        }
    }

    fn rtp_body(&mut self, vx: i16, vy: i16, vz: i16, sf: i64, calc_ir0: bool) {
        // RTP always saturates IR1..3 against the signed range regardless
        // of the lm bit in the command word (hardware peculiarity).
        let lm0 = true;

        let tmp = ((self.trx as i64) << 12)
            + (self.rt11 as i64) * (vx as i64)
            + (self.rt12 as i64) * (vy as i64)
            + (self.rt13 as i64) * (vz as i64);
        self.set_mac1(tmp >> sf);

        let tmp = (((self.try_ as i64) << 12)
            + (self.rt21 as i64) * (vx as i64)
            + (self.rt22 as i64) * (vy as i64)
            + (self.rt23 as i64) * (vz as i64))
            >> sf;
        self.set_mac2(tmp);

        let tmp = (((self.trz as i64) << 12)
            + (self.rt31 as i64) * (vx as i64)
            + (self.rt32 as i64) * (vy as i64)
            + (self.rt33 as i64) * (vz as i64))
            >> sf;
        self.set_mac3(tmp);

        self.set_ir1(self.mac1 as i64, lm0);
        self.set_ir2(self.mac2 as i64, lm0);

        // RTP's documented peculiarity: with sf==0 the IR3 saturation
        // flag (B3) is set only when MAC3>>12 overflows, but IR3 itself
        // still saturates against MAC3 directly.
        let tmp_mac3: i64;
        if sf == 0 {
            if self.mac3 > 0x7FFF {
                self.ir3 = 0x7FFF;
            } else if self.mac3 < -0x8000 {
                self.ir3 = -0x8000;
            } else {
                self.ir3 = self.mac3 as i16;
            }
            tmp_mac3 = (self.mac3 >> 12) as i64;
            if !(0..=0x7FFF).contains(&tmp_mac3) {
                self.flags |= F_B3;
            }
        } else {
            self.set_ir3(self.mac3 as i64, lm0);
            tmp_mac3 = self.mac3 as i64;
        }

        self.sz0 = self.sz1;
        self.sz1 = self.sz2;
        self.sz2 = self.sz3;
        self.set_sz3(tmp_mac3 as i32);

        self.sx0 = self.sx1;
        self.sx1 = self.sx2;
        self.sy0 = self.sy1;
        self.sy1 = self.sy2;

        let div = self.unr_divide(self.h as i64, self.sz3 as i64);

        let tmp = div * (self.ir1 as i64) + (self.ofx as i64);
        self.set_mac0_shift(tmp);
        if self.mac0 < -0x400 {
            self.flags |= F_G1;
            self.sx2 = -0x400;
        } else if self.mac0 > 0x3FF {
            self.flags |= F_G1;
            self.sx2 = 0x3FF;
        } else {
            self.sx2 = self.mac0 as i16;
        }

        let tmp = div * (self.ir2 as i64) + (self.ofy as i64);
        self.set_mac0_shift(tmp);
        if self.mac0 < -0x400 {
            self.flags |= F_G2;
            self.sy2 = -0x400;
        } else if self.mac0 > 0x3FF {
            self.flags |= F_G2;
            self.sy2 = 0x3FF;
        } else {
            self.sy2 = self.mac0 as i16;
        }

        if calc_ir0 {
            let tmp = div * (self.dqa as i64) + (self.dqb as i64);
            self.set_mac0(tmp);
            let tmp_mac0 = tmp >> 12;
            if tmp_mac0 < 0 {
                self.flags |= F_H;
                self.ir0 = 0;
            } else if tmp_mac0 > 0x1000 {
                self.flags |= F_H;
                self.ir0 = 0x1000;
            } else {
                self.ir0 = tmp_mac0 as i16;
            }
        }
    }

    /// Perspective Transformation, single vertex.
    pub fn rtps(&mut self, sf: bool) {
        self.flags = 0;
        self.cycles = 15;
        let sf = if sf { 12 } else { 0 };
        self.rtp_body(self.vx0, self.vy0, self.vz0, sf, true);
    }

    /// Perspective Transformation, three vertices.
    pub fn rtpt(&mut self, sf: bool) {
        self.flags = 0;
        self.cycles = 23;
        let sf = if sf { 12 } else { 0 };
        self.rtp_body(self.vx0, self.vy0, self.vz0, sf, false);
        self.rtp_body(self.vx1, self.vy1, self.vz1, sf, false);
        self.rtp_body(self.vx2, self.vy2, self.vz2, sf, true);
    }

    /// Normal clipping: the signed area of the screen-space triangle.
    pub fn nclip(&mut self) {
        self.flags = 0;
        self.cycles = 8;
        let (sx0, sy0) = (self.sx0 as i64, self.sy0 as i64);
        let (sx1, sy1) = (self.sx1 as i64, self.sy1 as i64);
        let (sx2, sy2) = (self.sx2 as i64, self.sy2 as i64);
        let tmp = sx0 * sy1 + sx1 * sy2 + sx2 * sy0 - sx0 * sy2 - sx1 * sy0 - sx2 * sy1;
        self.set_mac0(tmp);
    }

    /// Average of three Z values (triangle depth).
    pub fn avsz3(&mut self) {
        self.flags = 0;
        self.cycles = 5;
        let tmp = (self.zsf3 as i64) * (self.sz1 as i64)
            + (self.zsf3 as i64) * (self.sz2 as i64)
            + (self.zsf3 as i64) * (self.sz3 as i64);
        self.set_mac0(tmp);
        let tmp2 = self.mac0 >> 12;
        self.set_otz(tmp2);
    }

    /// Average of four Z values (quad depth).
    pub fn avsz4(&mut self) {
        self.flags = 0;
        self.cycles = 5;
        let tmp = (self.zsf4 as i64) * (self.sz0 as i64)
            + (self.zsf4 as i64) * (self.sz1 as i64)
            + (self.zsf4 as i64) * (self.sz2 as i64)
            + (self.zsf4 as i64) * (self.sz3 as i64);
        self.set_mac0(tmp);
        let tmp2 = self.mac0 >> 12;
        self.set_otz(tmp2);
    }

    /// Multiply a vector by one of four matrices and add one of four
    /// translation vectors.
    pub fn mvmva(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 8;

        let (mx11, mx12, mx13, mx21, mx22, mx23, mx31, mx32, mx33): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = match Self::get_mx(cmd) {
            0 => (
                self.rt11 as i64,
                self.rt12 as i64,
                self.rt13 as i64,
                self.rt21 as i64,
                self.rt22 as i64,
                self.rt23 as i64,
                self.rt31 as i64,
                self.rt32 as i64,
                self.rt33 as i64,
            ),
            1 => (
                self.l11 as i64,
                self.l12 as i64,
                self.l13 as i64,
                self.l21 as i64,
                self.l22 as i64,
                self.l23 as i64,
                self.l31 as i64,
                self.l32 as i64,
                self.l33 as i64,
            ),
            2 => (
                self.lr1 as i64,
                self.lr2 as i64,
                self.lr3 as i64,
                self.lg1 as i64,
                self.lg2 as i64,
                self.lg3 as i64,
                self.lb1 as i64,
                self.lb2 as i64,
                self.lb3 as i64,
            ),
            _ => (
                -0x60,
                0x60,
                self.ir0 as i64,
                self.rt13 as i64,
                self.rt13 as i64,
                self.rt13 as i64,
                self.rt22 as i64,
                self.rt22 as i64,
                self.rt22 as i64,
            ),
        };

        let (vx1, vx2, vx3): (i64, i64, i64) = match Self::get_vx(cmd) {
            0 => (self.vx0 as i64, self.vy0 as i64, self.vz0 as i64),
            1 => (self.vx1 as i64, self.vy1 as i64, self.vz1 as i64),
            2 => (self.vx2 as i64, self.vy2 as i64, self.vz2 as i64),
            _ => (self.ir1 as i64, self.ir2 as i64, self.ir3 as i64),
        };

        let (tx1, tx2, tx3, bugged): (i64, i64, i64, bool) = match Self::get_tx(cmd) {
            0 => (self.trx as i64, self.try_ as i64, self.trz as i64, false),
            1 => (self.rbk as i64, self.gbk as i64, self.bbk as i64, false),
            2 => (self.rfc as i64, self.gfc as i64, self.bfc as i64, true),
            _ => (0, 0, 0, false),
        };

        let sf = Self::get_sf(cmd);

        if bugged {
            // Hardware bug: with Tx=FC the partial sums for Mx*V1 and
            // Mx*V2 are discarded; only the Mx13/23/33 * V3 term survives.
            self.set_mac1(((tx1 << 12) + mx13 * vx3) >> sf);
            self.set_mac2(((tx2 << 12) + mx23 * vx3) >> sf);
            self.set_mac3(((tx3 << 12) + mx33 * vx3) >> sf);
        } else {
            self.set_mac1(((tx1 << 12) + mx11 * vx1 + mx12 * vx2 + mx13 * vx3) >> sf);
            self.set_mac2(((tx2 << 12) + mx21 * vx1 + mx22 * vx2 + mx23 * vx3) >> sf);
            self.set_mac3(((tx3 << 12) + mx31 * vx1 + mx32 * vx2 + mx33 * vx3) >> sf);
        }

        let lm = Self::check_lm(cmd);
        self.set_ir1(self.mac1 as i64, lm);
        self.set_ir2(self.mac2 as i64, lm);
        self.set_ir3(self.mac3 as i64, lm);
    }

    /// Square the IR vector.
    pub fn sqr(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 5;
        let sf = Self::get_sf(cmd);
        self.set_mac1(((self.ir1 as i64) * (self.ir1 as i64)) >> sf);
        self.set_mac2(((self.ir2 as i64) * (self.ir2 as i64)) >> sf);
        self.set_mac3(((self.ir3 as i64) * (self.ir3 as i64)) >> sf);
        self.set_ir1(self.mac1 as i64, false);
        self.set_ir2(self.mac2 as i64, false);
        self.set_ir3(self.mac3 as i64, false);
    }

    /// Outer product of the RT diagonal (misused as a vector) and IR.
    pub fn op(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 6;
        let sf = Self::get_sf(cmd);
        let (d1, d2, d3) = (self.rt11 as i64, self.rt22 as i64, self.rt33 as i64);
        let (ir1, ir2, ir3) = (self.ir1 as i64, self.ir2 as i64, self.ir3 as i64);
        self.set_mac1((d2 * ir3 - d3 * ir2) >> sf);
        self.set_mac2((d3 * ir1 - d1 * ir3) >> sf);
        self.set_mac3((d1 * ir2 - d2 * ir1) >> sf);
        let lm = Self::check_lm(cmd);
        self.set_ir1(self.mac1 as i64, lm);
        self.set_ir2(self.mac2 as i64, lm);
        self.set_ir3(self.mac3 as i64, lm);
    }

    fn color_llm_mult_v0(&mut self, vx: i16, vy: i16, vz: i16, sf: i64) {
        let (vx, vy, vz) = (vx as i64, vy as i64, vz as i64);
        self.set_mac1(((self.l11 as i64) * vx + (self.l12 as i64) * vy + (self.l13 as i64) * vz) >> sf);
        self.set_mac2(((self.l21 as i64) * vx + (self.l22 as i64) * vy + (self.l23 as i64) * vz) >> sf);
        self.set_mac3(((self.l31 as i64) * vx + (self.l32 as i64) * vy + (self.l33 as i64) * vz) >> sf);
        self.set_ir1(self.mac1 as i64, false);
        self.set_ir2(self.mac2 as i64, false);
        self.set_ir3(self.mac3 as i64, false);
    }

    fn color_bk_plus_lcm_mult_ir(&mut self, sf: i64) {
        let (ir1, ir2, ir3) = (self.ir1 as i64, self.ir2 as i64, self.ir3 as i64);
        let tmp = ((self.rbk as i64) << 12)
            + (self.lr1 as i64) * ir1
            + (self.lr2 as i64) * ir2
            + (self.lr3 as i64) * ir3;
        self.set_mac1(tmp >> sf);
        let tmp = ((self.gbk as i64) << 12)
            + (self.lg1 as i64) * ir1
            + (self.lg2 as i64) * ir2
            + (self.lg3 as i64) * ir3;
        self.set_mac2(tmp >> sf);
        let tmp = ((self.bbk as i64) << 12)
            + (self.lb1 as i64) * ir1
            + (self.lb2 as i64) * ir2
            + (self.lb3 as i64) * ir3;
        self.set_mac3(tmp >> sf);
        self.set_ir1(self.mac1 as i64, false);
        self.set_ir2(self.mac2 as i64, false);
        self.set_ir3(self.mac3 as i64, false);
    }

    fn color_fifo(&mut self) {
        self.rgb0 = self.rgb1;
        self.rgb1 = self.rgb2;
        self.rgb2 = self.rgbc & 0xFF00_0000;

        let tmp = self.mac3 >> 4;
        if tmp > 0xFF {
            self.flags |= F_C3;
            self.rgb2 |= 0x00FF_0000;
        } else if tmp < 0 {
            self.flags |= F_C3;
        } else {
            self.rgb2 |= (tmp as u32) << 16;
        }

        let tmp = self.mac2 >> 4;
        if tmp > 0xFF {
            self.flags |= F_C2;
            self.rgb2 |= 0x0000_FF00;
        } else if tmp < 0 {
            self.flags |= F_C2;
        } else {
            self.rgb2 |= (tmp as u32) << 8;
        }

        let tmp = self.mac1 >> 4;
        if tmp > 0xFF {
            self.flags |= F_C1;
            self.rgb2 |= 0x0000_00FF;
        } else if tmp < 0 {
            self.flags |= F_C1;
        } else {
            self.rgb2 |= tmp as u32;
        }
    }

    fn nc_body(&mut self, vx: i16, vy: i16, vz: i16, sf: i64) {
        self.color_llm_mult_v0(vx, vy, vz, sf);
        self.color_bk_plus_lcm_mult_ir(sf);
        self.color_fifo();
    }

    /// Normal Colour, single vector.
    pub fn ncs(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 14;
        let sf = Self::get_sf(cmd);
        self.nc_body(self.vx0, self.vy0, self.vz0, sf);
    }

    /// Normal Colour, three vectors.
    pub fn nct(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 30;
        let sf = Self::get_sf(cmd);
        self.nc_body(self.vx0, self.vy0, self.vz0, sf);
        self.nc_body(self.vx1, self.vy1, self.vz1, sf);
        self.nc_body(self.vx2, self.vy2, self.vz2, sf);
    }

    fn ncc_ncd_common_begin(&mut self) {
        let r = (self.rgbc & 0xFF) as i64;
        let g = ((self.rgbc >> 8) & 0xFF) as i64;
        let b = ((self.rgbc >> 16) & 0xFF) as i64;
        self.set_mac1((r * (self.ir1 as i64)) << 4);
        self.set_mac2((g * (self.ir2 as i64)) << 4);
        self.set_mac3((b * (self.ir3 as i64)) << 4);
    }

    fn ncc_ncd_common_end(&mut self, sf: i64, lm: bool) {
        let tmp1 = (self.mac1 as i64) >> sf;
        self.set_mac1(tmp1);
        let tmp2 = (self.mac2 as i64) >> sf;
        self.set_mac2(tmp2);
        let tmp3 = (self.mac3 as i64) >> sf;
        self.set_mac3(tmp3);
        self.set_ir1(self.mac1 as i64, lm);
        self.set_ir2(self.mac2 as i64, lm);
        self.set_ir3(self.mac3 as i64, lm);
    }

    fn ncc_body(&mut self, vx: i16, vy: i16, vz: i16, sf: i64, lm: bool) {
        self.color_llm_mult_v0(vx, vy, vz, sf);
        self.color_bk_plus_lcm_mult_ir(sf);
        self.ncc_ncd_common_begin();
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    /// Normal Colour Colour, single vector.
    pub fn nccs(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 17;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.ncc_body(self.vx0, self.vy0, self.vz0, sf, lm);
    }

    /// Normal Colour Colour, three vectors.
    pub fn ncct(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 39;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.ncc_body(self.vx0, self.vy0, self.vz0, sf, lm);
        self.ncc_body(self.vx1, self.vy1, self.vz1, sf, lm);
        self.ncc_body(self.vx2, self.vy2, self.vz2, sf, lm);
    }

    fn depth_que_calc(&mut self, sf: i64) {
        let tmp1 = (((self.rfc as i64) << 12) - (self.mac1 as i64)) >> sf;
        self.set_ir1(tmp1, true);
        let tmp2 = (((self.gfc as i64) << 12) - (self.mac2 as i64)) >> sf;
        self.set_ir2(tmp2, true);
        let tmp3 = (((self.bfc as i64) << 12) - (self.mac3 as i64)) >> sf;
        self.set_ir3(tmp3, true);

        let tmp = (self.ir1 as i64) * (self.ir0 as i64) + (self.mac1 as i64);
        self.set_mac1(tmp);
        let tmp = (self.ir2 as i64) * (self.ir0 as i64) + (self.mac2 as i64);
        self.set_mac2(tmp);
        let tmp = (self.ir3 as i64) * (self.ir0 as i64) + (self.mac3 as i64);
        self.set_mac3(tmp);
    }

    fn ncd_body(&mut self, vx: i16, vy: i16, vz: i16, sf: i64, lm: bool) {
        self.color_llm_mult_v0(vx, vy, vz, sf);
        self.color_bk_plus_lcm_mult_ir(sf);
        self.ncc_ncd_common_begin();
        self.depth_que_calc(sf);
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    /// Normal Colour Depth cue, single vector.
    pub fn ncds(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 19;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.ncd_body(self.vx0, self.vy0, self.vz0, sf, lm);
    }

    /// Normal Colour Depth cue, three vectors.
    pub fn ncdt(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 44;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.ncd_body(self.vx0, self.vy0, self.vz0, sf, lm);
        self.ncd_body(self.vx1, self.vy1, self.vz1, sf, lm);
        self.ncd_body(self.vx2, self.vy2, self.vz2, sf, lm);
    }

    /// Colour Colour.
    pub fn cc(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 11;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.color_bk_plus_lcm_mult_ir(sf);
        self.ncc_ncd_common_begin();
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }
    /// Colour Depth cue.
    pub fn cdp(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 13;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.color_bk_plus_lcm_mult_ir(sf);
        self.ncc_ncd_common_begin();
        self.depth_que_calc(sf);
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    /// Depth Cue Colour light.
    pub fn dcpl(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 8;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.ncc_ncd_common_begin();
        self.depth_que_calc(sf);
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    fn dpc_body(&mut self, sf: i64, lm: bool, reg: u32) {
        let r = (reg & 0xFF) as i64;
        let g = ((reg >> 8) & 0xFF) as i64;
        let b = ((reg >> 16) & 0xFF) as i64;
        self.set_mac1(r << 16);
        self.set_mac2(g << 16);
        self.set_mac3(b << 16);
        self.depth_que_calc(sf);
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    /// Depth Cueing, single colour.
    pub fn dpcs(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 8;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        let rgbc = self.rgbc;
        self.dpc_body(sf, lm, rgbc);
    }

    /// Depth Cueing, triple (colour FIFO reused three times, matching the
    /// reference's own repeated-RGB0 implementation).
    pub fn dpct(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 17;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        let rgb0 = self.rgb0;
        self.dpc_body(sf, lm, rgb0);
        self.dpc_body(sf, lm, rgb0);
        self.dpc_body(sf, lm, rgb0);
    }

    /// Interpolate the IR vector towards the far colour.
    pub fn intpl(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 8;
        let sf = Self::get_sf(cmd);
        let lm = Self::check_lm(cmd);
        self.set_mac1((self.ir1 as i64) << 12);
        self.set_mac2((self.ir2 as i64) << 12);
        self.set_mac3((self.ir3 as i64) << 12);
        self.depth_que_calc(sf);
        self.ncc_ncd_common_end(sf, lm);
        self.color_fifo();
    }

    /// General purpose interpolation.
    pub fn gpf(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 5;
        let sf = Self::get_sf(cmd);
        let (ir0, ir1, ir2, ir3) = (
            self.ir0 as i64,
            self.ir1 as i64,
            self.ir2 as i64,
            self.ir3 as i64,
        );
        self.set_mac1((ir1 * ir0) >> sf);
        self.set_mac2((ir2 * ir0) >> sf);
        self.set_mac3((ir3 * ir0) >> sf);
        self.set_ir1(self.mac1 as i64, false);
        self.set_ir2(self.mac2 as i64, false);
        self.set_ir3(self.mac3 as i64, false);
        self.color_fifo();
    }

    /// General purpose interpolation with the existing MAC as a base.
    pub fn gpl(&mut self, cmd: u32) {
        self.flags = 0;
        self.cycles = 5;
        let sf = Self::get_sf(cmd);
        let tmp1 = (self.mac1 as i64) << sf;
        self.set_mac1(tmp1);
        let tmp2 = (self.mac2 as i64) << sf;
        self.set_mac2(tmp2);
        let tmp3 = (self.mac3 as i64) << sf;
        self.set_mac3(tmp3);

        let (ir0, ir1, ir2, ir3) = (
            self.ir0 as i64,
            self.ir1 as i64,
            self.ir2 as i64,
            self.ir3 as i64,
        );
        let tmp = (ir1 * ir0 + self.mac1 as i64) >> sf;
        self.set_mac1(tmp);
        let tmp = (ir2 * ir0 + self.mac2 as i64) >> sf;
        self.set_mac2(tmp);
        let tmp = (ir3 * ir0 + self.mac3 as i64) >> sf;
        self.set_mac3(tmp);

        self.set_ir1(self.mac1 as i64, false);
        self.set_ir2(self.mac2 as i64, false);
        self.set_ir3(self.mac3 as i64, false);
        self.color_fifo();
    }
}

fn count_leading_zeroes_16(val: i64) -> i64 {
    if val == 0 {
        return 15;
    }
    let mut v = val;
    let mut i = 0;
    while i < 16 {
        if v & 0x8000 != 0 {
            break;
        }
        v <<= 1;
        i += 1;
    }
    i
}
