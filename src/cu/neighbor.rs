use super::CUData;
use crate::def::*;
use crate::frame::FrameData;
use crate::tbl::*;
use crate::util::*;

/// A neighbouring coding unit and the z-index of the unit of interest in
/// it. The index is local when the neighbour is the querying CU itself and
/// CTU relative otherwise.
pub type Neighbour<'a> = Option<(&'a CUData, usize)>;

/* started CTUs only */
fn started_ctu(frame: &FrameData, addr: Option<usize>, idx: usize) -> Neighbour<'_> {
    addr.map(|a| frame.get_pic_ctu(a))
        .filter(|ctu| ctu.is_initialized())
        .map(|ctu| (ctu, idx))
}

fn ctu(frame: &FrameData, addr: Option<usize>, idx: usize) -> Neighbour<'_> {
    addr.map(|a| (frame.get_pic_ctu(a), idx))
}

impl CUData {
    #[inline]
    pub(super) fn ctu_pel_x(&self, frame: &FrameData) -> usize {
        (self.cu_addr % frame.num_cu_in_width()) << MAX_LOG2_CU_SIZE
    }

    #[inline]
    pub(super) fn ctu_pel_y(&self, frame: &FrameData) -> usize {
        (self.cu_addr / frame.num_cu_in_width()) << MAX_LOG2_CU_SIZE
    }

    /* resolve a unit known to be coded before the current one: inside this
     * CU when `in_ctu` is false, else in the already coded part of the CTU */
    #[inline]
    fn same_ctu<'a>(&'a self, frame: &'a FrameData, in_ctu: bool, idx: usize) -> Neighbour<'a> {
        if in_ctu {
            Some((frame.get_pic_ctu(self.cu_addr), idx))
        } else {
            Some((self, idx - self.abs_idx_in_ctu))
        }
    }

    /// The unit left of `cur_part_unit_idx`.
    pub fn get_pu_left<'a>(&'a self, frame: &'a FrameData, cur_part_unit_idx: usize) -> Neighbour<'a> {
        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx = zscan_to_raster[cur_part_unit_idx];

        if !is_zero_col(abs_part_idx, n) {
            let abs_zorder_cu_idx = zscan_to_raster[self.abs_idx_in_ctu];
            let l_part_unit_idx = raster_to_zscan[abs_part_idx - 1];
            return self.same_ctu(frame, is_equal_col(abs_part_idx, abs_zorder_cu_idx, n), l_part_unit_idx);
        }

        ctu(frame, self.cu_left, raster_to_zscan[abs_part_idx + n - 1])
    }

    /// The unit above `cur_part_unit_idx`. With `planar_at_ctu_boundary`
    /// the CTU row above is treated as unavailable.
    pub fn get_pu_above<'a>(
        &'a self,
        frame: &'a FrameData,
        cur_part_unit_idx: usize,
        planar_at_ctu_boundary: bool,
    ) -> Neighbour<'a> {
        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx = zscan_to_raster[cur_part_unit_idx];

        if !is_zero_row(abs_part_idx, n) {
            let abs_zorder_cu_idx = zscan_to_raster[self.abs_idx_in_ctu];
            let a_part_unit_idx = raster_to_zscan[abs_part_idx - n];
            return self.same_ctu(frame, is_equal_row(abs_part_idx, abs_zorder_cu_idx, n), a_part_unit_idx);
        }

        if planar_at_ctu_boundary {
            return None;
        }

        ctu(frame, self.cu_above, raster_to_zscan[abs_part_idx + NUM_CU_PARTITIONS - n])
    }

    /// The unit diagonally above-left of `cur_part_unit_idx`.
    pub fn get_pu_above_left<'a>(&'a self, frame: &'a FrameData, cur_part_unit_idx: usize) -> Neighbour<'a> {
        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx = zscan_to_raster[cur_part_unit_idx];

        if !is_zero_col(abs_part_idx, n) {
            if !is_zero_row(abs_part_idx, n) {
                let abs_zorder_cu_idx = zscan_to_raster[self.abs_idx_in_ctu];
                let al_part_unit_idx = raster_to_zscan[abs_part_idx - n - 1];
                return self.same_ctu(
                    frame,
                    is_equal_row_or_col(abs_part_idx, abs_zorder_cu_idx, n),
                    al_part_unit_idx,
                );
            }
            return ctu(frame, self.cu_above, raster_to_zscan[abs_part_idx + NUM_CU_PARTITIONS - n - 1]);
        }

        if !is_zero_row(abs_part_idx, n) {
            return ctu(frame, self.cu_left, raster_to_zscan[abs_part_idx - 1]);
        }

        ctu(frame, self.cu_above_left, raster_to_zscan[NUM_CU_PARTITIONS - 1])
    }

    /// The unit diagonally above-right of `cur_part_unit_idx`, if it lies in
    /// the picture and is coded before the current unit.
    pub fn get_pu_above_right<'a>(&'a self, frame: &'a FrameData, cur_part_unit_idx: usize) -> Neighbour<'a> {
        let sps = &frame.slice().sps;
        if self.ctu_pel_x(frame) + zscan_to_pel_x[cur_part_unit_idx] + UNIT_SIZE >= sps.pic_width_in_luma_samples {
            return None;
        }

        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx_rt = zscan_to_raster[cur_part_unit_idx];

        if less_than_col(abs_part_idx_rt, n - 1, n) {
            if !is_zero_row(abs_part_idx_rt, n) {
                let ar_part_unit_idx = raster_to_zscan[abs_part_idx_rt - n + 1];
                if cur_part_unit_idx > ar_part_unit_idx {
                    let abs_zorder_cu_idx = zscan_to_raster[self.abs_idx_in_ctu]
                        + (1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE))
                        - 1;
                    return self.same_ctu(
                        frame,
                        is_equal_row_or_col(abs_part_idx_rt, abs_zorder_cu_idx, n),
                        ar_part_unit_idx,
                    );
                }
                return None;
            }
            return ctu(frame, self.cu_above, raster_to_zscan[abs_part_idx_rt + NUM_CU_PARTITIONS - n + 1]);
        }

        if !is_zero_row(abs_part_idx_rt, n) {
            return None;
        }

        ctu(frame, self.cu_above_right, raster_to_zscan[NUM_CU_PARTITIONS - n])
    }

    /// The unit diagonally below-left of `cur_part_unit_idx`, if it lies in
    /// the picture and is coded before the current unit.
    pub fn get_pu_below_left<'a>(&'a self, frame: &'a FrameData, cur_part_unit_idx: usize) -> Neighbour<'a> {
        let sps = &frame.slice().sps;
        if self.ctu_pel_y(frame) + zscan_to_pel_y[cur_part_unit_idx] + UNIT_SIZE >= sps.pic_height_in_luma_samples {
            return None;
        }

        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx_lb = zscan_to_raster[cur_part_unit_idx];

        if less_than_row(abs_part_idx_lb, n - 1, n) {
            if !is_zero_col(abs_part_idx_lb, n) {
                let bl_part_unit_idx = raster_to_zscan[abs_part_idx_lb + n - 1];
                if cur_part_unit_idx > bl_part_unit_idx {
                    let abs_zorder_cu_idx_lb = zscan_to_raster[self.abs_idx_in_ctu]
                        + ((1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE)) - 1) * n;
                    return self.same_ctu(
                        frame,
                        is_equal_row_or_col(abs_part_idx_lb, abs_zorder_cu_idx_lb, n),
                        bl_part_unit_idx,
                    );
                }
                return None;
            }
            return ctu(frame, self.cu_left, raster_to_zscan[abs_part_idx_lb + n * 2 - 1]);
        }

        None
    }

    /// Below-left lookup for intra reference sample availability,
    /// `part_unit_offset` units below the bottom-left corner.
    pub fn get_pu_below_left_adi<'a>(
        &'a self,
        frame: &'a FrameData,
        cur_part_unit_idx: usize,
        part_unit_offset: usize,
    ) -> Neighbour<'a> {
        let sps = &frame.slice().sps;
        if self.ctu_pel_y(frame) + zscan_to_pel_y[cur_part_unit_idx] + (part_unit_offset << LOG2_UNIT_SIZE)
            >= sps.pic_height_in_luma_samples
        {
            return None;
        }

        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx_lb = zscan_to_raster[cur_part_unit_idx];

        if less_than_row(abs_part_idx_lb, n - part_unit_offset, n) {
            if !is_zero_col(abs_part_idx_lb, n) {
                let bl_part_unit_idx = raster_to_zscan[abs_part_idx_lb + part_unit_offset * n - 1];
                if cur_part_unit_idx > bl_part_unit_idx {
                    let abs_zorder_cu_idx_lb = zscan_to_raster[self.abs_idx_in_ctu]
                        + ((1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE)) - 1) * n;
                    return self.same_ctu(
                        frame,
                        is_equal_row_or_col(abs_part_idx_lb, abs_zorder_cu_idx_lb, n),
                        bl_part_unit_idx,
                    );
                }
                return None;
            }
            return started_ctu(
                frame,
                self.cu_left,
                raster_to_zscan[abs_part_idx_lb + (1 + part_unit_offset) * n - 1],
            );
        }

        None
    }

    /// Above-right lookup for intra reference sample availability,
    /// `part_unit_offset` units right of the top-right corner.
    pub fn get_pu_above_right_adi<'a>(
        &'a self,
        frame: &'a FrameData,
        cur_part_unit_idx: usize,
        part_unit_offset: usize,
    ) -> Neighbour<'a> {
        let sps = &frame.slice().sps;
        if self.ctu_pel_x(frame) + zscan_to_pel_x[cur_part_unit_idx] + (part_unit_offset << LOG2_UNIT_SIZE)
            >= sps.pic_width_in_luma_samples
        {
            return None;
        }

        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx_rt = zscan_to_raster[cur_part_unit_idx];

        if less_than_col(abs_part_idx_rt, n - part_unit_offset, n) {
            if !is_zero_row(abs_part_idx_rt, n) {
                let ar_part_unit_idx = raster_to_zscan[abs_part_idx_rt - n + part_unit_offset];
                if cur_part_unit_idx > ar_part_unit_idx {
                    let abs_zorder_cu_idx = zscan_to_raster[self.abs_idx_in_ctu]
                        + (1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE))
                        - 1;
                    return self.same_ctu(
                        frame,
                        is_equal_row_or_col(abs_part_idx_rt, abs_zorder_cu_idx, n),
                        ar_part_unit_idx,
                    );
                }
                return None;
            }
            return started_ctu(
                frame,
                self.cu_above,
                raster_to_zscan[abs_part_idx_rt + NUM_CU_PARTITIONS - n + part_unit_offset],
            );
        }

        if !is_zero_row(abs_part_idx_rt, n) {
            return None;
        }

        let ar_part_unit_idx = raster_to_zscan[NUM_CU_PARTITIONS - n + part_unit_offset - 1];
        started_ctu(frame, self.cu_above_right, ar_part_unit_idx).filter(|(ar, _)| ar.cu_addr <= self.cu_addr)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::*;
    use crate::frame::fixture;
    use crate::geom::calc_ctu_geoms;

    /* z-index of the unit at (x, y), in units from the CTU origin */
    fn z(x: usize, y: usize) -> usize {
        raster_to_zscan[y * NUM_PART_IN_CU_SIZE + x]
    }

    fn frame_2x2() -> FrameData {
        let cfg = fixture::config(128, 128);
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 1, &[], &[]);
        for addr in 0..4 {
            frame.init_pic_ctu(addr, 32);
        }
        frame
    }

    #[test]
    fn picture_corner_has_no_neighbours() {
        let frame = frame_2x2();
        let ctu = frame.get_pic_ctu(0);
        assert!(ctu.get_pu_left(&frame, 0).is_none());
        assert!(ctu.get_pu_above(&frame, 0, false).is_none());
        assert!(ctu.get_pu_above_left(&frame, 0).is_none());
        assert!(ctu.get_pu_above_right(&frame, z(15, 0)).is_none());
        assert!(ctu.get_pu_below_left(&frame, z(0, 15)).is_none());
    }

    #[test]
    fn neighbours_across_ctu_edges() {
        let frame = frame_2x2();
        let ctu = frame.get_pic_ctu(3);

        let (cu, idx) = ctu.get_pu_left(&frame, z(0, 5)).unwrap();
        assert_eq!((cu.cu_addr(), idx), (2, z(15, 5)));

        let (cu, idx) = ctu.get_pu_above(&frame, z(7, 0), false).unwrap();
        assert_eq!((cu.cu_addr(), idx), (1, z(7, 15)));
        assert!(ctu.get_pu_above(&frame, z(7, 0), true).is_none());

        let (cu, idx) = ctu.get_pu_above_left(&frame, 0).unwrap();
        assert_eq!((cu.cu_addr(), idx), (0, NUM_CU_PARTITIONS - 1));

        let (cu, idx) = ctu.get_pu_above_left(&frame, z(4, 0)).unwrap();
        assert_eq!((cu.cu_addr(), idx), (1, z(3, 15)));

        // CTU 1 is the last column of the picture
        let top_right = frame.get_pic_ctu(1);
        assert!(top_right.get_pu_above_right(&frame, z(15, 4)).is_none());
        // the CTU row below is never coded yet
        let first = frame.get_pic_ctu(0);
        assert!(first.get_pu_below_left(&frame, z(0, 15)).is_none());
    }

    #[test]
    fn neighbours_inside_the_ctu() {
        let frame = frame_2x2();
        let ctu = frame.get_pic_ctu(0);
        let geoms = calc_ctu_geoms(128, 128, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);

        // bottom-right 32x32 of the CTU as a working CU
        let mut cu = CUData::default();
        cu.initialize(64, 32, ChromaSampling::Cs420);
        cu.init_sub_cu(ctu, &geoms[4]);
        assert_eq!(cu.abs_idx_in_ctu(), 192);

        // left of the CU edge resolves to the CTU
        let (n, idx) = cu.get_pu_left(&frame, z(8, 9)).unwrap();
        assert_eq!(n.cu_addr(), 0);
        assert_eq!(idx, z(7, 9));
        assert_eq!(n.num_partitions(), NUM_CU_PARTITIONS);

        // strictly inside it resolves to the CU itself with a local index
        let (n, idx) = cu.get_pu_left(&frame, z(9, 9)).unwrap();
        assert_eq!(n.num_partitions(), 64);
        assert_eq!(idx, z(8, 9) - 192);

        // above-right across the top edge lies in an already coded CU
        let (n, idx) = cu.get_pu_above_right(&frame, z(11, 8)).unwrap();
        assert_eq!((n.num_partitions(), idx), (NUM_CU_PARTITIONS, z(12, 7)));
        // but not when it would come later in z-order
        assert!(cu.get_pu_above_right(&frame, z(11, 11)).is_none());
        // nor right of the CTU, which is coded later
        assert!(cu.get_pu_above_right(&frame, z(15, 8)).is_none());

        // below-left of a CTU-internal edge is coded only if earlier in z-order
        assert!(cu.get_pu_below_left(&frame, z(8, 11)).is_some());
        assert!(cu.get_pu_below_left(&frame, z(8, 15)).is_none());
    }

    #[test]
    fn adi_lookups_require_started_ctus() {
        let cfg = fixture::config(192, 128);
        let mut frame = fixture::frame(&cfg, SliceType::I_SLICE, 0, &[], &[]);
        for &addr in &[0, 3, 4] {
            frame.init_pic_ctu(addr, 32);
        }

        // CTUs 1 and 2 above were never started
        let ctu = frame.get_pic_ctu(4);
        assert!(ctu.get_pu_above_right_adi(&frame, z(3, 0), 4).is_none());
        assert!(ctu.get_pu_above_right_adi(&frame, z(15, 0), 1).is_none());

        let (n, idx) = ctu.get_pu_below_left_adi(&frame, z(0, 3), 4).unwrap();
        assert_eq!((n.cu_addr(), idx), (3, z(15, 7)));
        assert!(frame.get_pic_ctu(0).get_pu_below_left_adi(&frame, z(0, 3), 4).is_none());

        frame.init_pic_ctu(1, 32);
        frame.init_pic_ctu(2, 32);
        let ctu = frame.get_pic_ctu(4);
        let (n, idx) = ctu.get_pu_above_right_adi(&frame, z(3, 0), 4).unwrap();
        assert_eq!((n.cu_addr(), idx), (1, z(7, 15)));
        let (n, idx) = ctu.get_pu_above_right_adi(&frame, z(15, 0), 1).unwrap();
        assert_eq!((n.cu_addr(), idx), (2, z(0, 15)));
    }
}
