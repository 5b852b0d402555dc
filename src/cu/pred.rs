use super::CUData;
use crate::api::ChromaSampling;
use crate::def::*;
use crate::frame::FrameData;
use crate::tbl::*;

/// Scan layout and first significance-map context of one transform block.
#[derive(Debug, Clone, Copy)]
pub struct TUEntropyCodingParameters {
    pub scan: &'static [u16],
    pub scan_cg: &'static [u16],
    pub scan_type: ScanType,
    pub log2_tr_size_cg: usize,
    pub first_significance_map_context: u32,
}

impl CUData {
    /// Most probable luma modes for the local unit `abs_part_idx`, plus how
    /// many of the left/above predictors were distinct (1 or 2).
    pub fn get_intra_dir_luma_predictor(&self, frame: &FrameData, abs_part_idx: usize) -> ([u32; 3], usize) {
        let abs = self.abs_idx_in_ctu + abs_part_idx;

        let left_intra_dir = match self.get_pu_left(frame, abs) {
            Some((cu, idx)) if cu.is_intra(idx) => cu.luma_intra_dir(idx),
            _ => DC_IDX,
        };
        // above comes from the current CTU only
        let above_intra_dir = match self.get_pu_above(frame, abs, true) {
            Some((cu, idx)) if cu.is_intra(idx) => cu.luma_intra_dir(idx),
            _ => DC_IDX,
        };

        if left_intra_dir == above_intra_dir {
            let preds = if left_intra_dir >= 2 {
                [
                    left_intra_dir,
                    ((left_intra_dir - 2 + 31) & 31) + 2,
                    ((left_intra_dir - 2 + 1) & 31) + 2,
                ]
            } else {
                [PLANAR_IDX, DC_IDX, VER_IDX]
            };
            (preds, 1)
        } else {
            let third = if left_intra_dir != 0 && above_intra_dir != 0 {
                PLANAR_IDX
            } else if left_intra_dir + above_intra_dir < 2 {
                VER_IDX
            } else {
                DC_IDX
            };
            ([left_intra_dir, above_intra_dir, third], 2)
        }
    }

    /// Number (0..=2) of left/above neighbours coded deeper than `depth`.
    pub fn get_ctx_split_flag(&self, frame: &FrameData, abs_part_idx: usize, depth: usize) -> u32 {
        let abs = self.abs_idx_in_ctu + abs_part_idx;
        let deeper = |n: Option<(&CUData, usize)>| n.map_or(0, |(cu, idx)| (cu.depth(idx) > depth) as u32);

        deeper(self.get_pu_left(frame, abs)) + deeper(self.get_pu_above(frame, abs, false))
    }

    /// Number (0..=2) of left/above neighbours coded as skip.
    pub fn get_ctx_skip_flag(&self, frame: &FrameData, abs_part_idx: usize) -> u32 {
        let abs = self.abs_idx_in_ctu + abs_part_idx;
        let skipped = |n: Option<(&CUData, usize)>| n.map_or(0, |(cu, idx)| cu.is_skipped(idx) as u32);

        skipped(self.get_pu_left(frame, abs)) + skipped(self.get_pu_above(frame, abs, false))
    }

    /// Chroma intra candidates: planar, vertical, horizontal, DC and the
    /// luma-derived mode, with the entry equal to the luma mode replaced by
    /// mode 34.
    pub fn get_allowed_chroma_dir(&self, abs_part_idx: usize) -> [u32; NUM_CHROMA_MODE] {
        let mut mode_list = [PLANAR_IDX, VER_IDX, HOR_IDX, DC_IDX, DM_CHROMA_IDX];
        let luma_mode = self.luma_intra_dir(abs_part_idx);

        if let Some(m) = mode_list[..NUM_CHROMA_MODE - 1].iter_mut().find(|m| **m == luma_mode) {
            *m = 34;
        }
        mode_list
    }

    /// Allowed transform size range `[log2 min, log2 max]` inside the CU at
    /// `abs_part_idx`.
    pub fn get_quadtree_tu_log2_min_size_in_cu(&self, frame: &FrameData, abs_part_idx: usize) -> [u32; 2] {
        let sps = &frame.slice().sps;
        let log2_cu_size = self.log2_cu_size(abs_part_idx) as i32;
        let part_size = self.part_size(abs_part_idx);
        let pred_mode = self.pred_mode(abs_part_idx);

        let quadtree_tu_max_depth = if pred_mode == PredMode::MODE_INTRA {
            sps.quadtree_tu_max_depth_intra
        } else {
            sps.quadtree_tu_max_depth_inter
        } as i32;
        let intra_split_flag = (pred_mode == PredMode::MODE_INTRA && part_size == PartSize::SIZE_NxN) as i32;
        let inter_split_flag = (quadtree_tu_max_depth == 1
            && pred_mode == PredMode::MODE_INTER
            && part_size != PartSize::SIZE_2Nx2N) as i32;

        let log2_min = sps.quadtree_tu_log2_min_size as i32;
        let log2_max = sps.quadtree_tu_log2_max_size as i32;
        let min_in_cu = std::cmp::min(
            log2_cu_size - (quadtree_tu_max_depth - 1 + inter_split_flag + intra_split_flag),
            log2_max,
        );

        [std::cmp::max(log2_min, min_in_cu) as u32, log2_max as u32]
    }

    /// Coefficient scan of a transform block. Small intra blocks whose
    /// prediction is close to vertical scan horizontally and vice versa.
    pub fn get_coef_scan_idx(&self, abs_part_idx: usize, log2_tr_size: usize, is_luma: bool, is_intra: bool) -> ScanType {
        if !is_intra {
            return ScanType::SCAN_DIAG;
        }

        let dir_mode = if is_luma {
            if log2_tr_size > MDCS_LOG2_MAX_SIZE {
                return ScanType::SCAN_DIAG;
            }
            self.luma_intra_dir(abs_part_idx)
        } else {
            if log2_tr_size > MDCS_LOG2_MAX_SIZE - self.h_chroma_shift {
                return ScanType::SCAN_DIAG;
            }
            let mut dir_mode = self.chroma_intra_dir(abs_part_idx);
            if dir_mode == DM_CHROMA_IDX {
                let luma_idx = if self.chroma_format == ChromaSampling::Cs444 {
                    abs_part_idx
                } else {
                    abs_part_idx & 0xFC
                };
                dir_mode = self.luma_intra_dir(luma_idx);
                if self.chroma_format == ChromaSampling::Cs422 {
                    dir_mode = chroma_422_intra_angle_mapping[dir_mode as usize] as u32;
                }
            }
            dir_mode
        };

        if (dir_mode as i32 - VER_IDX as i32).abs() <= MDCS_ANGLE_LIMIT {
            ScanType::SCAN_HOR
        } else if (dir_mode as i32 - HOR_IDX as i32).abs() <= MDCS_ANGLE_LIMIT {
            ScanType::SCAN_VER
        } else {
            ScanType::SCAN_DIAG
        }
    }

    pub fn get_tu_entropy_coding_parameters(
        &self,
        abs_part_idx: usize,
        log2_tr_size: usize,
        is_luma: bool,
    ) -> TUEntropyCodingParameters {
        let log2_tr_size_cg = log2_tr_size - 2;
        let scan_type = self.get_coef_scan_idx(abs_part_idx, log2_tr_size, is_luma, self.is_intra(abs_part_idx));

        let first_significance_map_context = match log2_tr_size {
            2 => 0,
            3 if scan_type != ScanType::SCAN_DIAG && is_luma => 15,
            3 => 9,
            _ if is_luma => 21,
            _ => 12,
        };

        TUEntropyCodingParameters {
            scan: &scan_order[scan_type as usize][log2_tr_size - 2],
            scan_cg: &scan_order_cg[scan_type as usize][log2_tr_size_cg],
            scan_type,
            log2_tr_size_cg,
            first_significance_map_context,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::*;
    use crate::frame::fixture;
    use crate::geom::calc_ctu_geoms;
    use interpolate_name::interpolate_test;

    fn z(x: usize, y: usize) -> usize {
        raster_to_zscan[y * NUM_PART_IN_CU_SIZE + x]
    }

    fn intra_frame(width: usize, csp: ChromaSampling) -> FrameData {
        let mut cfg = fixture::config(width, 128);
        cfg.chroma_sampling = csp;
        let mut frame = fixture::frame(&cfg, SliceType::I_SLICE, 0, &[], &[]);
        for addr in 0..frame.num_cus() {
            frame.init_pic_ctu(addr, 32);
        }
        frame
    }

    fn set_intra(ctu: &mut CUData, abs: usize, depth: usize, dir: u32) {
        let n = NUM_CU_PARTITIONS >> (depth << 1);
        for b in &mut ctu.attr_mut(super::super::Attr::PredMode)[abs..abs + n] {
            *b = PredMode::MODE_INTRA as u8;
        }
        ctu.set_luma_intra_dir_sub_parts(dir, abs, depth);
        ctu.set_depth_sub_parts(depth, abs);
    }

    #[test]
    fn mpm_equal_angular_neighbours() {
        let mut frame = intra_frame(128, ChromaSampling::Cs420);
        {
            let ctu = frame.get_pic_ctu_mut(1);
            set_intra(ctu, z(0, 0), 2, 10);
            set_intra(ctu, z(4, 0), 2, 2);
            set_intra(ctu, z(0, 4), 2, 2);
        }
        let ctu = frame.get_pic_ctu(1);
        // left and above both carry mode 2, whose angular neighbours wrap
        assert_eq!(ctu.get_intra_dir_luma_predictor(&frame, z(4, 4)), ([2, 33, 3], 1));
    }

    #[test]
    fn mpm_distinct_neighbours() {
        let mut frame = intra_frame(128, ChromaSampling::Cs420);
        {
            let ctu = frame.get_pic_ctu_mut(0);
            set_intra(ctu, z(4, 0), 2, PLANAR_IDX);
            set_intra(ctu, z(0, 4), 2, 18);
        }
        let ctu = frame.get_pic_ctu(0);
        assert_eq!(
            ctu.get_intra_dir_luma_predictor(&frame, z(4, 4)),
            ([18, PLANAR_IDX, DC_IDX], 2)
        );
        // nothing coded around the first unit
        assert_eq!(
            ctu.get_intra_dir_luma_predictor(&frame, 0),
            ([PLANAR_IDX, DC_IDX, VER_IDX], 1)
        );
    }

    #[test]
    fn mpm_ignores_the_ctu_row_above() {
        let mut frame = intra_frame(64, ChromaSampling::Cs420);
        {
            let above = frame.get_pic_ctu_mut(0);
            set_intra(above, 0, 0, 26);
            above.set_depth_sub_parts(1, 128);
        }
        let ctu = frame.get_pic_ctu(1);
        // the above CTU is intra with mode 26 but the MPM lookup never
        // crosses the CTU row
        assert_eq!(ctu.get_intra_dir_luma_predictor(&frame, 0).0[..2], [DC_IDX, DC_IDX][..]);
        // the split context does look across
        assert_eq!(ctu.get_ctx_split_flag(&frame, 0, 0), 1);
    }

    #[test]
    fn split_and_skip_contexts() {
        let mut frame = intra_frame(128, ChromaSampling::Cs420);
        {
            let ctu = frame.get_pic_ctu_mut(0);
            ctu.set_depth_sub_parts(2, z(0, 4));
            ctu.set_depth_sub_parts(1, z(8, 0));
            for b in &mut ctu.attr_mut(super::super::Attr::SkipFlag)[z(0, 4)..z(0, 4) + 16] {
                *b = 1;
            }
        }
        let geoms = calc_ctu_geoms(128, 128, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);
        let ctu = frame.get_pic_ctu(0);
        let mut cu = CUData::default();
        cu.initialize(16, 16, ChromaSampling::Cs420);
        // the 16x16 at (4, 4) units
        cu.init_sub_cu(ctu, &geoms[5 + 3]);
        assert_eq!(cu.abs_idx_in_ctu(), z(4, 4));

        // left is at depth 2, above still at depth 0
        assert_eq!(cu.get_ctx_split_flag(&frame, 0, 1), 1);
        assert_eq!(cu.get_ctx_split_flag(&frame, 0, 2), 0);
        assert_eq!(cu.get_ctx_skip_flag(&frame, 0), 1);
    }

    #[test]
    fn allowed_chroma_dirs() {
        let mut cu = CUData::default();
        cu.initialize(4, 8, ChromaSampling::Cs420);
        cu.set_luma_intra_dir_sub_parts(HOR_IDX, 0, 3);
        assert_eq!(cu.get_allowed_chroma_dir(0), [PLANAR_IDX, VER_IDX, 34, DC_IDX, DM_CHROMA_IDX]);
        cu.set_luma_intra_dir_sub_parts(7, 0, 3);
        assert_eq!(cu.get_allowed_chroma_dir(0), [PLANAR_IDX, VER_IDX, HOR_IDX, DC_IDX, DM_CHROMA_IDX]);
    }

    #[test]
    fn tu_size_range_in_cu() {
        let mut cfg = fixture::config(64, 64);
        cfg.tu_max_depth_inter = 1;
        cfg.tu_max_depth_intra = 1;
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 1, &[], &[]);
        frame.init_pic_ctu(0, 32);

        let ctu = frame.get_pic_ctu_mut(0);
        ctu.set_log2_cu_size_sub_parts(5, 0, 1);
        ctu.set_pred_mode_sub_parts(PredMode::MODE_INTER);
        ctu.set_part_size_sub_parts(PartSize::SIZE_2NxN);
        let ctu = frame.get_pic_ctu(0);
        // inter split forces one level below the CU
        assert_eq!(ctu.get_quadtree_tu_log2_min_size_in_cu(&frame, 0), [4, 5]);

        let ctu = frame.get_pic_ctu_mut(0);
        ctu.set_pred_mode_sub_parts(PredMode::MODE_INTRA);
        ctu.set_part_size_sub_parts(PartSize::SIZE_NxN);
        let ctu = frame.get_pic_ctu(0);
        assert_eq!(ctu.get_quadtree_tu_log2_min_size_in_cu(&frame, 0), [4, 5]);

        let ctu = frame.get_pic_ctu_mut(0);
        ctu.set_part_size_sub_parts(PartSize::SIZE_2Nx2N);
        let ctu = frame.get_pic_ctu(0);
        assert_eq!(ctu.get_quadtree_tu_log2_min_size_in_cu(&frame, 0), [5, 5]);
    }

    fn chroma_cu(csp: ChromaSampling, luma: u32, chroma: u32) -> CUData {
        let mut cu = CUData::default();
        cu.initialize(4, 8, csp);
        cu.set_pred_mode_sub_parts(PredMode::MODE_INTRA);
        cu.set_luma_intra_dir_sub_parts(luma, 0, 3);
        cu.set_chroma_intra_dir_sub_parts(chroma, 0, 3);
        cu
    }

    #[test]
    fn mode_dependent_scans() {
        let cu = chroma_cu(ChromaSampling::Cs420, 24, DM_CHROMA_IDX);
        assert_eq!(cu.get_coef_scan_idx(0, 2, true, true), ScanType::SCAN_HOR);
        assert_eq!(cu.get_coef_scan_idx(0, 3, true, true), ScanType::SCAN_HOR);
        assert_eq!(cu.get_coef_scan_idx(0, 4, true, true), ScanType::SCAN_DIAG);
        assert_eq!(cu.get_coef_scan_idx(0, 2, true, false), ScanType::SCAN_DIAG);
        // DM chroma follows luma; 8x8 chroma is too large under 4:2:0
        assert_eq!(cu.get_coef_scan_idx(0, 2, false, true), ScanType::SCAN_HOR);
        assert_eq!(cu.get_coef_scan_idx(0, 3, false, true), ScanType::SCAN_DIAG);

        let cu = chroma_cu(ChromaSampling::Cs420, 24, 7);
        assert_eq!(cu.get_coef_scan_idx(0, 2, false, true), ScanType::SCAN_VER);

        // 4:2:2 maps luma mode 14 to 16, out of the horizontal range
        let cu = chroma_cu(ChromaSampling::Cs420, 14, DM_CHROMA_IDX);
        assert_eq!(cu.get_coef_scan_idx(0, 2, false, true), ScanType::SCAN_VER);
        let cu = chroma_cu(ChromaSampling::Cs422, 14, DM_CHROMA_IDX);
        assert_eq!(cu.get_coef_scan_idx(0, 2, false, true), ScanType::SCAN_DIAG);

        let cu = chroma_cu(ChromaSampling::Cs444, 10, DM_CHROMA_IDX);
        assert_eq!(cu.get_coef_scan_idx(0, 3, false, true), ScanType::SCAN_VER);
    }

    #[interpolate_test(tu_4x4, 2, ScanType::SCAN_HOR, 0)]
    #[interpolate_test(tu_8x8, 3, ScanType::SCAN_HOR, 15)]
    #[interpolate_test(tu_16x16, 4, ScanType::SCAN_DIAG, 21)]
    #[interpolate_test(tu_32x32, 5, ScanType::SCAN_DIAG, 21)]
    fn tu_entropy_parameters(log2_tr_size: usize, scan_type: ScanType, ctx: u32) {
        let cu = chroma_cu(ChromaSampling::Cs420, VER_IDX, DM_CHROMA_IDX);
        let p = cu.get_tu_entropy_coding_parameters(0, log2_tr_size, true);
        assert_eq!(p.scan_type, scan_type);
        assert_eq!(p.first_significance_map_context, ctx);
        assert_eq!(p.log2_tr_size_cg, log2_tr_size - 2);
        assert_eq!(p.scan.len(), 1 << (2 * log2_tr_size));
        assert_eq!(p.scan_cg.len(), 1 << (2 * (log2_tr_size - 2)));
    }

    #[test]
    fn chroma_8x8_context() {
        let cu = chroma_cu(ChromaSampling::Cs444, VER_IDX, DM_CHROMA_IDX);
        let p = cu.get_tu_entropy_coding_parameters(0, 3, false);
        assert_eq!(p.scan_type, ScanType::SCAN_HOR);
        assert_eq!(p.first_significance_map_context, 9);
    }
}
