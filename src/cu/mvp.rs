use super::neighbor::Neighbour;
use super::CUData;
use crate::def::PartSize::*;
use crate::def::*;
use crate::frame::FrameData;
use crate::mv::*;
use crate::tbl::*;
use crate::util::*;

/// Temporal scale factor in 1/256 units from the POC distances of the
/// current and the collocated motion. Equal distances give exactly 4096,
/// which callers treat as identity.
pub fn get_dist_scale_factor(cur_poc: i32, cur_ref_poc: i32, col_poc: i32, col_ref_poc: i32) -> i32 {
    let diff_poc_d = col_poc - col_ref_poc;
    let diff_poc_b = cur_poc - cur_ref_poc;

    if diff_poc_d == diff_poc_b {
        return 4096;
    }

    let tdb = clip3(-128, 127, diff_poc_b);
    let tdd = clip3(-128, 127, diff_poc_d);
    let x = (0x4000 + (tdd / 2).abs()) / tdd;
    clip3(-4096, 4095, (tdb * x + 32) >> 6)
}

/// Whether the neighbour sample `(xn, yn)` lies in a different merge
/// estimation region than the PU origin `(xp, yp)`.
#[inline]
pub fn is_diff_mer(xn: i32, yn: i32, xp: i32, yp: i32) -> bool {
    const PLEVEL: i32 = 2;
    (xn >> PLEVEL) != (xp >> PLEVEL) || (yn >> PLEVEL) != (yp >> PLEVEL)
}

#[inline]
fn scaled(mv: MV, scale: i32) -> MV {
    if scale == 4096 {
        mv
    } else {
        scale_mv(mv, scale)
    }
}

/* a spatial merge neighbour outside the merge estimation region of the PU
 * at (xp, yp) that is not intra coded */
fn merge_usable(n: Neighbour<'_>, xn: i32, yn: i32, xp: i32, yp: i32) -> Neighbour<'_> {
    n.filter(|&(cu, idx)| is_diff_mer(xn, yn, xp, yp) && !cu.is_intra(idx))
}

fn motion_differs(prev: Neighbour<'_>, cu: &CUData, idx: usize) -> bool {
    prev.map_or(true, |(prev_cu, prev_idx)| !prev_cu.has_equal_motion(prev_idx, cu, idx))
}

/* pairs of (L0 candidate, L1 candidate) tried for combined bi-prediction */
const PRIORITY_LIST0: [usize; 12] = [0, 1, 0, 2, 1, 2, 0, 3, 1, 3, 2, 3];
const PRIORITY_LIST1: [usize; 12] = [1, 0, 2, 0, 2, 1, 3, 0, 3, 1, 3, 2];

impl CUData {
    pub fn get_mv_field(&self, abs_part_idx: usize, list: usize) -> MVField {
        self.cu_mv_field[list].get_mv_field(abs_part_idx)
    }

    /// Whether unit `abs_part_idx` and unit `cand_abs_part_idx` of `cand`
    /// predict from the same references with the same vectors.
    pub fn has_equal_motion(&self, abs_part_idx: usize, cand: &CUData, cand_abs_part_idx: usize) -> bool {
        let inter_dir = self.inter_dir(abs_part_idx);
        if inter_dir != cand.inter_dir(cand_abs_part_idx) {
            return false;
        }

        (0..2).all(|list| {
            inter_dir & (1 << list) == 0
                || self.get_mv_field(abs_part_idx, list) == cand.get_mv_field(cand_abs_part_idx, list)
        })
    }

    /// Clamps `mv` so the referenced block stays within a margin of the
    /// picture.
    pub fn clip_mv(&self, frame: &FrameData, mv: MV) -> MV {
        const MV_SHIFT: i32 = 2;
        const OFFSET: i32 = 8;

        let sps = &frame.slice().sps;
        let (pel_x, pel_y) = (self.cu_pel_x as i32, self.cu_pel_y as i32);
        let max_cu = MAX_CU_SIZE as i32;

        let xmax = (sps.pic_width_in_luma_samples as i32 + OFFSET - pel_x - 1) << MV_SHIFT;
        let xmin = (-max_cu - OFFSET - pel_x + 1) << MV_SHIFT;
        let ymax = (sps.pic_height_in_luma_samples as i32 + OFFSET - pel_y - 1) << MV_SHIFT;
        let ymin = (-max_cu - OFFSET - pel_y + 1) << MV_SHIFT;

        MV::new(
            clip3(xmin, xmax, mv.x as i32) as i16,
            clip3(ymin, ymax, mv.y as i32) as i16,
        )
    }

    /* the bottom-right temporal position of PU `pu_idx` as (CTU, unit),
     * None when it falls outside the picture or in the CTU row below */
    fn col_bottom_right(&self, frame: &FrameData, pu_idx: usize) -> Option<(usize, usize)> {
        let part_idx_rb = self.derive_right_bottom_idx(pu_idx);
        let sps = &frame.slice().sps;

        if self.ctu_pel_x(frame) + zscan_to_pel_x[part_idx_rb] + UNIT_SIZE >= sps.pic_width_in_luma_samples
            || self.ctu_pel_y(frame) + zscan_to_pel_y[part_idx_rb] + UNIT_SIZE >= sps.pic_height_in_luma_samples
        {
            return None;
        }

        let n = NUM_PART_IN_CU_SIZE;
        let abs_part_idx_rb = zscan_to_raster[part_idx_rb];
        let not_last_col = less_than_col(abs_part_idx_rb, n - 1, n);
        let not_last_row = less_than_row(abs_part_idx_rb, n - 1, n);

        match (not_last_col, not_last_row) {
            (true, true) => Some((self.cu_addr, raster_to_zscan[abs_part_idx_rb + n + 1])),
            (false, true) => Some((self.cu_addr + 1, raster_to_zscan[abs_part_idx_rb + 1])),
            _ => None,
        }
    }

    /* temporal candidate of PU `pu_idx`: bottom-right first, then centre */
    fn temporal_mvp(&self, frame: &FrameData, pu_idx: usize, pic_list: usize, ref_idx: i8) -> Option<MV> {
        self.col_bottom_right(frame, pu_idx)
            .and_then(|(ctu_idx, abs)| self.get_col_mvp(frame, pic_list, ctu_idx, abs, ref_idx))
            .or_else(|| {
                let part_idx_center = self.derive_center_idx(pu_idx);
                self.get_col_mvp(frame, pic_list, self.cu_addr, part_idx_center, ref_idx)
            })
    }

    /// Builds the merge candidate list of PU `pu_idx` whose first unit is
    /// the local z-index `abs_part_idx`. Returns the number of candidates,
    /// which is always the slice's maximum.
    pub fn get_inter_merge_candidates(
        &self,
        frame: &FrameData,
        abs_part_idx: usize,
        pu_idx: usize,
        mv_field_neighbours: &mut [[MVField; 2]; MRG_MAX_NUM_CANDS],
        inter_dir_neighbours: &mut [u8; MRG_MAX_NUM_CANDS],
    ) -> usize {
        let slice = frame.slice();
        let abs_part_addr = self.abs_idx_in_ctu + abs_part_idx;
        let is_inter_b = slice.is_inter_b();
        let max_num_merge_cand = slice.max_num_merge_cand;

        for cand in mv_field_neighbours[..max_num_merge_cand].iter_mut() {
            cand[0].ref_idx = NOT_VALID;
            cand[1].ref_idx = NOT_VALID;
        }

        let (xp, yp, n_psw, n_psh) = self.get_part_position(pu_idx);
        let cur_ps = self.part_size(abs_part_idx);

        let mut count = 0;
        let mut push = |count: &mut usize, cu: &CUData, idx: usize| -> bool {
            inter_dir_neighbours[*count] = cu.inter_dir(idx);
            mv_field_neighbours[*count][0] = cu.get_mv_field(idx, REF_PIC_LIST_0);
            if is_inter_b {
                mv_field_neighbours[*count][1] = cu.get_mv_field(idx, REF_PIC_LIST_1);
            }
            *count += 1;
            *count == max_num_merge_cand
        };

        let part_idx_lb = self.derive_left_bottom_idx(pu_idx);
        let (_, part_idx_rt) = self.derive_left_right_top_idx(pu_idx);

        // A1
        let left = merge_usable(self.get_pu_left(frame, part_idx_lb), xp - 1, yp + n_psh - 1, xp, yp)
            .filter(|_| !(pu_idx == 1 && matches!(cur_ps, SIZE_Nx2N | SIZE_nLx2N | SIZE_nRx2N)));
        if let Some((cu, idx)) = left {
            if push(&mut count, cu, idx) {
                return max_num_merge_cand;
            }
        }

        // B1
        let above = merge_usable(self.get_pu_above(frame, part_idx_rt, false), xp + n_psw - 1, yp - 1, xp, yp)
            .filter(|_| !(pu_idx == 1 && matches!(cur_ps, SIZE_2NxN | SIZE_2NxnU | SIZE_2NxnD)));
        if let Some((cu, idx)) = above {
            if motion_differs(left, cu, idx) && push(&mut count, cu, idx) {
                return max_num_merge_cand;
            }
        }

        // B0
        let above_right = merge_usable(self.get_pu_above_right(frame, part_idx_rt), xp + n_psw, yp - 1, xp, yp);
        if let Some((cu, idx)) = above_right {
            if motion_differs(above, cu, idx) && push(&mut count, cu, idx) {
                return max_num_merge_cand;
            }
        }

        // A0
        let below_left = merge_usable(self.get_pu_below_left(frame, part_idx_lb), xp - 1, yp + n_psh, xp, yp);
        if let Some((cu, idx)) = below_left {
            if motion_differs(left, cu, idx) && push(&mut count, cu, idx) {
                return max_num_merge_cand;
            }
        }

        // B2, only while fewer than four spatial candidates were found
        if count < 4 {
            let above_left = merge_usable(self.get_pu_above_left(frame, abs_part_addr), xp - 1, yp - 1, xp, yp);
            if let Some((cu, idx)) = above_left {
                if motion_differs(left, cu, idx) && motion_differs(above, cu, idx) && push(&mut count, cu, idx) {
                    return max_num_merge_cand;
                }
            }
        }

        // temporal, always with reference index 0
        let mut dir = 0;
        if let Some(col_mv) = self.temporal_mvp(frame, pu_idx, REF_PIC_LIST_0, 0) {
            dir |= 1;
            mv_field_neighbours[count][0].set_mv_field(col_mv, 0);
        }
        if is_inter_b {
            if let Some(col_mv) = self.temporal_mvp(frame, pu_idx, REF_PIC_LIST_1, 0) {
                dir |= 2;
                mv_field_neighbours[count][1].set_mv_field(col_mv, 0);
            }
        }
        if dir != 0 {
            inter_dir_neighbours[count] = dir;
            count += 1;
            if count == max_num_merge_cand {
                return max_num_merge_cand;
            }
        }

        // combined bi-predictive
        if is_inter_b {
            let cutoff = count * count.saturating_sub(1);
            for (&i, &j) in PRIORITY_LIST0.iter().zip(PRIORITY_LIST1.iter()).take(cutoff) {
                if inter_dir_neighbours[i] & 1 == 0 || inter_dir_neighbours[j] & 2 == 0 {
                    continue;
                }

                let l0 = mv_field_neighbours[i][0];
                let l1 = mv_field_neighbours[j][1];
                let ref_poc_l0 = slice.ref_poc_list[0][l0.ref_idx as usize];
                let ref_poc_l1 = slice.ref_poc_list[1][l1.ref_idx as usize];
                if ref_poc_l0 == ref_poc_l1 && l0.mv == l1.mv {
                    continue;
                }

                mv_field_neighbours[count][0] = l0;
                mv_field_neighbours[count][1] = l1;
                inter_dir_neighbours[count] = 3;
                count += 1;
                if count == max_num_merge_cand {
                    return max_num_merge_cand;
                }
            }
        }

        // zero motion, cycling through the reference indices
        let num_ref_idx = if is_inter_b {
            std::cmp::min(slice.num_ref_idx[0], slice.num_ref_idx[1])
        } else {
            slice.num_ref_idx[0]
        } as i32;
        let mut r = 0;
        let mut refcnt = 0;
        while count < max_num_merge_cand {
            inter_dir_neighbours[count] = 1;
            mv_field_neighbours[count][0].set_mv_field(MV::default(), r as i8);
            if is_inter_b {
                inter_dir_neighbours[count] = 3;
                mv_field_neighbours[count][1].set_mv_field(MV::default(), r as i8);
            }
            count += 1;

            if refcnt == num_ref_idx - 1 {
                r = 0;
            } else {
                r += 1;
                refcnt += 1;
            }
        }

        count
    }

    /// Fills the two AMVP predictors of PU `part_idx` for `ref_idx` in
    /// `pic_list`, and collects every distinct non-zero motion seen on the
    /// way into `mvc` as motion search seeds. Returns the number of seeds.
    pub fn fill_mvp_cand(
        &self,
        frame: &FrameData,
        part_idx: usize,
        pic_list: usize,
        ref_idx: i8,
        amvp_cand: &mut [MV; AMVP_NUM_CANDS],
        mvc: &mut [MV; MAX_NUM_MVC],
    ) -> usize {
        use crate::def::MvpDir::*;

        let (part_idx_lt, part_idx_rt) = self.derive_left_right_top_idx(part_idx);
        let part_idx_lb = self.derive_left_bottom_idx(part_idx);

        let corner = |dir: MvpDir| match dir {
            MD_LEFT | MD_BELOW_LEFT => part_idx_lb,
            MD_ABOVE | MD_ABOVE_RIGHT => part_idx_rt,
            MD_ABOVE_LEFT => part_idx_lt,
        };
        let dirs = [MD_LEFT, MD_ABOVE, MD_ABOVE_RIGHT, MD_BELOW_LEFT, MD_ABOVE_LEFT];

        let mut mv = [None; NUM_MVP_DIR];
        let mut mv_order = [None; NUM_MVP_DIR];
        for &dir in &dirs {
            mv[dir as usize] = self.add_mvp_cand(frame, pic_list, ref_idx, corner(dir), dir);
            mv_order[dir as usize] = self.add_mvp_cand_order(frame, pic_list, ref_idx, corner(dir), dir);
        }

        let mut num = 0;

        // left predictor
        let left = mv[MD_BELOW_LEFT as usize]
            .or(mv[MD_LEFT as usize])
            .or(mv_order[MD_BELOW_LEFT as usize])
            .or(mv_order[MD_LEFT as usize]);
        if let Some(m) = left {
            amvp_cand[num] = m;
            num += 1;
        }
        let added_smvp = num > 0;

        // above predictor, scaled only without a left one
        let mut above = mv[MD_ABOVE_RIGHT as usize]
            .or(mv[MD_ABOVE as usize])
            .or(mv[MD_ABOVE_LEFT as usize]);
        if above.is_none() && !added_smvp {
            above = mv_order[MD_ABOVE_RIGHT as usize]
                .or(mv_order[MD_ABOVE as usize])
                .or(mv_order[MD_ABOVE_LEFT as usize]);
        }
        if let Some(m) = above {
            amvp_cand[num] = m;
            num += 1;
        }

        let mut num_mvc = 0;
        for dir in 0..NUM_MVP_DIR {
            for m in [mv[dir], mv_order[dir]].iter().flatten() {
                if m.not_zero() {
                    mvc[num_mvc] = *m;
                    num_mvc += 1;
                }
            }
        }

        if num == AMVP_NUM_CANDS {
            if amvp_cand[0] != amvp_cand[1] {
                return num_mvc;
            }
            num = 1;
        }

        if let Some(col_mv) = self.temporal_mvp(frame, part_idx, pic_list, ref_idx) {
            amvp_cand[num] = col_mv;
            num += 1;
            mvc[num_mvc] = col_mv;
            num_mvc += 1;
        }

        for cand in amvp_cand[num..].iter_mut() {
            *cand = MV::default();
        }

        num_mvc
    }

    fn mvp_neighbour<'a>(&'a self, frame: &'a FrameData, part_unit_idx: usize, dir: MvpDir) -> Neighbour<'a> {
        use crate::def::MvpDir::*;
        match dir {
            MD_LEFT => self.get_pu_left(frame, part_unit_idx),
            MD_ABOVE => self.get_pu_above(frame, part_unit_idx, false),
            MD_ABOVE_RIGHT => self.get_pu_above_right(frame, part_unit_idx),
            MD_BELOW_LEFT => self.get_pu_below_left(frame, part_unit_idx),
            MD_ABOVE_LEFT => self.get_pu_above_left(frame, part_unit_idx),
        }
    }

    /// Unscaled spatial predictor from the neighbour in `dir` of
    /// `part_unit_idx`: its motion in either list that points at the same
    /// reference picture as `ref_idx` of `pic_list`.
    pub fn add_mvp_cand(
        &self,
        frame: &FrameData,
        pic_list: usize,
        ref_idx: i8,
        part_unit_idx: usize,
        dir: MvpDir,
    ) -> Option<MV> {
        let (cu, idx) = self.mvp_neighbour(frame, part_unit_idx, dir)?;
        let slice = frame.slice();
        let cur_ref_poc = slice.ref_poc_list[pic_list][ref_idx as usize];

        [pic_list, 1 - pic_list].iter().find_map(|&list| {
            let field = cu.get_mv_field(idx, list);
            if field.ref_idx >= 0 && slice.ref_poc_list[list][field.ref_idx as usize] == cur_ref_poc {
                Some(field.mv)
            } else {
                None
            }
        })
    }

    /// Scaled spatial predictor from the neighbour in `dir`: its first valid
    /// motion, preferring `pic_list`, scaled by POC distance.
    pub fn add_mvp_cand_order(
        &self,
        frame: &FrameData,
        pic_list: usize,
        ref_idx: i8,
        part_unit_idx: usize,
        dir: MvpDir,
    ) -> Option<MV> {
        let (cu, idx) = self.mvp_neighbour(frame, part_unit_idx, dir)?;
        let slice = frame.slice();
        let cur_poc = slice.poc;
        let cur_ref_poc = slice.ref_poc_list[pic_list][ref_idx as usize];

        [pic_list, 1 - pic_list].iter().find_map(|&list| {
            let field = cu.get_mv_field(idx, list);
            if field.ref_idx < 0 {
                return None;
            }
            let neib_ref_poc = slice.ref_poc_list[list][field.ref_idx as usize];
            let scale = get_dist_scale_factor(cur_poc, cur_ref_poc, cur_poc, neib_ref_poc);
            Some(scaled(field.mv, scale))
        })
    }

    /// Temporal predictor read from CTU `cu_addr` of the collocated picture
    /// at `part_unit_idx`, rounded down to its 16x16 motion grid, scaled to
    /// `ref_idx` of `pic_list`.
    pub fn get_col_mvp(
        &self,
        frame: &FrameData,
        pic_list: usize,
        cu_addr: usize,
        part_unit_idx: usize,
        ref_idx: i8,
    ) -> Option<MV> {
        let slice = frame.slice();
        let abs_part_addr = part_unit_idx & TMVP_UNIT_MASK;

        let col_pic = slice.col_pic()?;
        let col_cu = col_pic.get_pic_ctu(cu_addr);
        let col_slice = col_cu.slice()?;
        if col_cu.part_size(part_unit_idx) == SIZE_NONE || col_cu.is_intra(abs_part_addr) {
            return None;
        }

        let first_list = if slice.check_ldc {
            pic_list
        } else {
            slice.col_from_l0 as usize
        };
        let (col_ref_list, col_field) = [first_list, 1 - first_list]
            .iter()
            .map(|&list| (list, col_cu.get_mv_field(abs_part_addr, list)))
            .find(|(_, field)| field.ref_idx >= 0)?;

        let col_ref_poc = col_slice.ref_poc_list[col_ref_list][col_field.ref_idx as usize];
        let cur_ref_poc = slice.ref_poc_list[pic_list][ref_idx as usize];
        let scale = get_dist_scale_factor(slice.poc, cur_ref_poc, col_slice.poc, col_ref_poc);

        Some(scaled(col_field.mv, scale))
    }
}
