use super::{Attr, CUData};
use crate::def::*;
use crate::frame::FrameData;
use crate::tbl::*;
use crate::util::*;

use super::neighbor::Neighbour;

impl CUData {
    /* z-index mask selecting the first unit of a quantization group */
    #[inline]
    fn qg_part_idx_mask(frame: &FrameData) -> usize {
        let max_cu_dqp_depth = frame.slice().pps.max_cu_dqp_depth as usize;
        0xFF << ((MAX_FULL_DEPTH - max_cu_dqp_depth) * 2)
    }

    /// The unit left of the quantization group holding `cur_abs_idx_in_ctu`,
    /// if it lies inside the same CTU.
    pub fn get_qp_min_cu_left<'a>(&'a self, frame: &'a FrameData, cur_abs_idx_in_ctu: usize) -> Neighbour<'a> {
        let abs_zorder_qp_min_cu_idx = cur_abs_idx_in_ctu & Self::qg_part_idx_mask(frame);
        let abs_rorder_qp_min_cu_idx = zscan_to_raster[abs_zorder_qp_min_cu_idx];

        if is_zero_col(abs_rorder_qp_min_cu_idx, NUM_PART_IN_CU_SIZE) {
            return None;
        }

        Some((frame.get_pic_ctu(self.cu_addr), raster_to_zscan[abs_rorder_qp_min_cu_idx - 1]))
    }

    /// The unit above the quantization group holding `cur_abs_idx_in_ctu`,
    /// if it lies inside the same CTU.
    pub fn get_qp_min_cu_above<'a>(&'a self, frame: &'a FrameData, cur_abs_idx_in_ctu: usize) -> Neighbour<'a> {
        let abs_zorder_qp_min_cu_idx = cur_abs_idx_in_ctu & Self::qg_part_idx_mask(frame);
        let abs_rorder_qp_min_cu_idx = zscan_to_raster[abs_zorder_qp_min_cu_idx];

        if is_zero_row(abs_rorder_qp_min_cu_idx, NUM_PART_IN_CU_SIZE) {
            return None;
        }

        Some((
            frame.get_pic_ctu(self.cu_addr),
            raster_to_zscan[abs_rorder_qp_min_cu_idx - NUM_PART_IN_CU_SIZE],
        ))
    }

    /// QP predictor of the quantization group holding the local unit
    /// `cur_abs_idx_in_ctu`: the rounded mean of the left and above group
    /// QPs, each falling back to the last coded QP.
    pub fn get_ref_qp(&self, frame: &FrameData, cur_abs_idx_in_ctu: usize) -> i8 {
        let abs = self.abs_idx_in_ctu + cur_abs_idx_in_ctu;
        let left = match self.get_qp_min_cu_left(frame, abs) {
            Some((cu, idx)) => cu.qp(idx),
            None => self.get_last_coded_qp(frame, cur_abs_idx_in_ctu),
        };
        let above = match self.get_qp_min_cu_above(frame, abs) {
            Some((cu, idx)) => cu.qp(idx),
            None => self.get_last_coded_qp(frame, cur_abs_idx_in_ctu),
        };

        ((left as i32 + above as i32 + 1) >> 1) as i8
    }

    /// The last unit before `abs_part_idx` that has been coded, walking back
    /// one CU at a time over units still marked `MODE_NONE`.
    pub fn get_last_valid_part_idx(&self, abs_part_idx: usize) -> Option<usize> {
        let pred_modes = self.attr(Attr::PredMode);
        let mut last_valid_part_idx = abs_part_idx as isize - 1;

        while last_valid_part_idx >= 0 && pred_modes[last_valid_part_idx as usize] == PredMode::MODE_NONE as u8 {
            let depth = self.depth(last_valid_part_idx as usize);
            let step = std::cmp::max(self.num_partitions >> (depth << 1), 1);
            last_valid_part_idx -= step as isize;
        }

        if last_valid_part_idx >= 0 {
            Some(last_valid_part_idx as usize)
        } else {
            None
        }
    }

    /// QP of the last coded unit preceding the quantization group of
    /// `abs_part_idx`, searching back through the CTU and the previous CTUs
    /// of the row and falling back to the slice QP.
    pub fn get_last_coded_qp(&self, frame: &FrameData, abs_part_idx: usize) -> i8 {
        let qu_part_idx_mask = Self::qg_part_idx_mask(frame);

        if let Some(last_valid_part_idx) = self.get_last_valid_part_idx(abs_part_idx & qu_part_idx_mask) {
            return self.qp(last_valid_part_idx);
        }

        let slice = frame.slice();
        if self.abs_idx_in_ctu != 0 {
            frame.get_pic_ctu(self.cu_addr).get_last_coded_qp(frame, self.abs_idx_in_ctu)
        } else if self.cu_addr > 0
            && !(slice.pps.entropy_coding_sync_enabled && self.cu_addr % frame.num_cu_in_width() == 0)
        {
            frame.get_pic_ctu(self.cu_addr - 1).get_last_coded_qp(frame, NUM_CU_PARTITIONS)
        } else {
            slice.slice_qp as i8
        }
    }
}
