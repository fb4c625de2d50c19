//! Builds small, valid H.264 annex-B streams in memory.
//!
//! Every picture is a baseline-profile IDR whose macroblocks are all I_PCM,
//! so decoded samples equal the bytes written here and no encoder is needed.
//! SPS and PPS precede every picture.

const START_CODE: [u8; 4] = [0, 0, 0, 1];

const NAL_SPS: u8 = 0x67;
const NAL_PPS: u8 = 0x68;
const NAL_IDR: u8 = 0x65;

/// `mb_type` value for I_PCM in an I slice.
const MB_I_PCM: u32 = 25;
/// First `mb_type` value past the I-slice table.
const MB_INVALID: u32 = 40;

/// One picture of the generated stream.
#[derive(Copy, Clone, Debug)]
pub struct PictureSpec {
    pub width: u32,
    pub height: u32,
    /// Selects the sample pattern.
    pub seed: u8,
    /// Replace the macroblock data with an out-of-range `mb_type`.
    pub corrupt: bool,
}

impl PictureSpec {
    pub fn new(width: u32, height: u32, seed: u8) -> Self {
        Self {
            width,
            height,
            seed,
            corrupt: false,
        }
    }

    pub fn corrupted(self) -> Self {
        Self {
            corrupt: true,
            ..self
        }
    }
}

/// Annex-B stream for `pictures`, in order.
pub fn stream(pictures: &[PictureSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, picture) in pictures.iter().enumerate() {
        let (mbs_wide, mbs_high) = (picture.width / 16, picture.height / 16);
        assert!(mbs_wide > 0 && mbs_high > 0, "dimensions must be multiples of 16");
        nal(&mut out, NAL_SPS, &sps(mbs_wide, mbs_high));
        nal(&mut out, NAL_PPS, &pps());
        nal(&mut out, NAL_IDR, &idr_slice(picture, index as u32, mbs_wide * mbs_high));
    }
    out
}

/// Luma sample at `(x, y)` of a picture seeded with `seed`. Never zero.
pub fn luma(seed: u8, x: u32, y: u32) -> u8 {
    16 + ((u32::from(seed) * 37 + x * 3 + y * 5) % 200) as u8
}

fn sps(mbs_wide: u32, mbs_high: u32) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.bits(66, 8); // profile_idc: baseline
    w.bits(0, 8); // constraint flags
    w.bits(30, 8); // level_idc
    w.ue(0); // seq_parameter_set_id
    w.ue(0); // log2_max_frame_num_minus4
    w.ue(2); // pic_order_cnt_type
    w.ue(1); // max_num_ref_frames
    w.bit(false); // gaps_in_frame_num_value_allowed_flag
    w.ue(mbs_wide - 1);
    w.ue(mbs_high - 1);
    w.bit(true); // frame_mbs_only_flag
    w.bit(true); // direct_8x8_inference_flag
    w.bit(false); // frame_cropping_flag
    w.bit(true); // vui_parameters_present_flag

    // VUI: nothing but bitstream restrictions, declaring no reordering.
    for _ in 0..8 {
        w.bit(false);
    }
    w.bit(true); // bitstream_restriction_flag
    w.bit(true); // motion_vectors_over_pic_boundaries_flag
    w.ue(0); // max_bytes_per_pic_denom
    w.ue(0); // max_bits_per_mb_denom
    w.ue(16); // log2_max_mv_length_horizontal
    w.ue(16); // log2_max_mv_length_vertical
    w.ue(0); // max_num_reorder_frames
    w.ue(1); // max_dec_frame_buffering
    w.finish()
}

fn pps() -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // pic_parameter_set_id
    w.ue(0); // seq_parameter_set_id
    w.bit(false); // entropy_coding_mode_flag: CAVLC
    w.bit(false); // bottom_field_pic_order_in_frame_present_flag
    w.ue(0); // num_slice_groups_minus1
    w.ue(0); // num_ref_idx_l0_default_active_minus1
    w.ue(0); // num_ref_idx_l1_default_active_minus1
    w.bit(false); // weighted_pred_flag
    w.bits(0, 2); // weighted_bipred_idc
    w.se(0); // pic_init_qp_minus26
    w.se(0); // pic_init_qs_minus26
    w.se(0); // chroma_qp_index_offset
    w.bit(true); // deblocking_filter_control_present_flag
    w.bit(false); // constrained_intra_pred_flag
    w.bit(false); // redundant_pic_cnt_present_flag
    w.finish()
}

fn idr_slice(picture: &PictureSpec, index: u32, macroblocks: u32) -> Vec<u8> {
    let mut w = BitWriter::default();
    w.ue(0); // first_mb_in_slice
    w.ue(7); // slice_type: I, whole picture
    w.ue(0); // pic_parameter_set_id
    w.bits(0, 4); // frame_num
    w.ue(index % 2); // idr_pic_id, differs between neighbours
    w.bit(false); // no_output_of_prior_pics_flag
    w.bit(false); // long_term_reference_flag
    w.se(0); // slice_qp_delta
    w.ue(1); // disable_deblocking_filter_idc

    if picture.corrupt {
        w.ue(MB_INVALID);
        return w.finish();
    }

    let mbs_wide = picture.width / 16;
    for mb in 0..macroblocks {
        let (mb_x, mb_y) = ((mb % mbs_wide) * 16, (mb / mbs_wide) * 16);
        w.ue(MB_I_PCM);
        w.align();
        for y in 0..16 {
            for x in 0..16 {
                w.bits(luma(picture.seed, mb_x + x, mb_y + y).into(), 8);
            }
        }
        for plane in [96u32, 160] {
            for i in 0..64 {
                w.bits(plane + (u32::from(picture.seed) + i) % 16, 8);
            }
        }
    }
    w.finish()
}

/// Start code, header byte and the RBSP with emulation prevention applied.
fn nal(out: &mut Vec<u8>, header: u8, rbsp: &[u8]) {
    out.extend_from_slice(&START_CODE);
    out.push(header);

    let mut zeros = 0;
    for &byte in rbsp {
        if zeros >= 2 && byte <= 3 {
            out.push(3);
            zeros = 0;
        }
        out.push(byte);
        zeros = if byte == 0 { zeros + 1 } else { 0 };
    }
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u32,
}

impl BitWriter {
    fn bit(&mut self, set: bool) {
        self.current = (self.current << 1) | u8::from(set);
        self.used += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    fn bits(&mut self, value: u32, count: u32) {
        for shift in (0..count).rev() {
            self.bit((value >> shift) & 1 == 1);
        }
    }

    /// Unsigned Exp-Golomb.
    fn ue(&mut self, value: u32) {
        let coded = value + 1;
        let len = 32 - coded.leading_zeros();
        self.bits(0, len - 1);
        self.bits(coded, len);
    }

    /// Signed Exp-Golomb.
    fn se(&mut self, value: i32) {
        let mapped = if value > 0 {
            2 * value - 1
        } else {
            -2 * value
        };
        self.ue(mapped as u32);
    }

    fn align(&mut self) {
        while self.used != 0 {
            self.bit(false);
        }
    }

    /// Append rbsp_trailing_bits and return the bytes.
    fn finish(mut self) -> Vec<u8> {
        self.bit(true);
        self.align();
        self.bytes
    }
}
