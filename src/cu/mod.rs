use std::sync::Arc;

use log::*;

use crate::api::*;
use crate::def::*;
use crate::frame::FrameData;
use crate::geom::CUGeom;
use crate::mem::AlignedBoxedSlice;
use crate::mv::*;
use crate::tbl::*;

mod mvp;
mod neighbor;
mod part;
mod pred;
mod qp;

pub use mvp::{get_dist_scale_factor, is_diff_mer};
pub use neighbor::Neighbour;
pub use pred::TUEntropyCodingParameters;

/// Attribute planes of the packed slab, in storage order. Each plane holds
/// one byte per 4x4 unit. Initialisation zero-fills everything from `Depth`
/// (CTU) or from `SkipFlag` (sub-CU) onwards, so planes that must start at
/// zero stay after those two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Qp = 0,
    Log2CUSize,
    PartSize,
    PredMode,
    LumaIntraDir,
    TransquantBypass,
    Depth,
    SkipFlag,
    MergeFlag,
    InterDir,
    MvpIdx0,
    MvpIdx1,
    TrIdx,
    TransformSkipY,
    TransformSkipU,
    TransformSkipV,
    CbfY,
    CbfU,
    CbfV,
    ChromaIntraDir,
}

#[rustfmt::skip]
const ALL_ATTRS: [Attr; BYTES_PER_PARTITION] = [
    Attr::Qp, Attr::Log2CUSize, Attr::PartSize, Attr::PredMode, Attr::LumaIntraDir,
    Attr::TransquantBypass, Attr::Depth, Attr::SkipFlag, Attr::MergeFlag, Attr::InterDir,
    Attr::MvpIdx0, Attr::MvpIdx1, Attr::TrIdx,
    Attr::TransformSkipY, Attr::TransformSkipU, Attr::TransformSkipV,
    Attr::CbfY, Attr::CbfU, Attr::CbfV, Attr::ChromaIntraDir,
];

/* attributes a finished sub-CU writes back into an already coded CTU */
#[rustfmt::skip]
const UPDATE_ATTRS: [Attr; 10] = [
    Attr::Qp, Attr::TransformSkipY, Attr::TransformSkipU, Attr::TransformSkipV,
    Attr::SkipFlag, Attr::TrIdx, Attr::CbfY, Attr::CbfU, Attr::CbfV, Attr::ChromaIntraDir,
];

/* attributes a re-encode pulls out of the CTU */
#[rustfmt::skip]
const FROM_PIC_ATTRS: [Attr; 7] = [
    Attr::Qp, Attr::Log2CUSize, Attr::PartSize, Attr::PredMode,
    Attr::LumaIntraDir, Attr::SkipFlag, Attr::Depth,
];

#[inline]
fn transform_skip_attr(ttype: TextType) -> Attr {
    [Attr::TransformSkipY, Attr::TransformSkipU, Attr::TransformSkipV][ttype as usize]
}

#[inline]
fn cbf_attr(ttype: TextType) -> Attr {
    [Attr::CbfY, Attr::CbfU, Attr::CbfV][ttype as usize]
}

#[inline]
fn mvp_idx_attr(list: usize) -> Attr {
    [Attr::MvpIdx0, Attr::MvpIdx1][list]
}

/*****************************************************************************
 * size specialised plane copy / broadcast
 *****************************************************************************/
pub(crate) type PartCopyFn = fn(&mut [u8], &[u8]);
pub(crate) type PartSetFn = fn(&mut [u8], u8);

fn copy_n<const N: usize>(dst: &mut [u8], src: &[u8]) {
    dst[..N].copy_from_slice(&src[..N]);
}

fn bcast_n<const N: usize>(dst: &mut [u8], val: u8) {
    dst[..N].fill(val);
}

/* (plane copy, plane broadcast, quarter copy) for a node of `num_partitions` */
fn part_fns(num_partitions: usize) -> (PartCopyFn, PartSetFn, Option<PartCopyFn>) {
    match num_partitions {
        256 => (copy_n::<256>, bcast_n::<256>, Some(copy_n::<64>)),
        64 => (copy_n::<64>, bcast_n::<64>, Some(copy_n::<16>)),
        16 => (copy_n::<16>, bcast_n::<16>, Some(copy_n::<4>)),
        4 => (copy_n::<4>, bcast_n::<4>, None),
        _ => {
            debug_assert!(false, "unexpected CU partition count {}", num_partitions);
            (copy_n::<4>, bcast_n::<4>, None)
        }
    }
}

/*****************************************************************************
 * CU data
 *****************************************************************************/

/// Mode decision and coding data of one square node of the coding quadtree,
/// from a whole CTU down to an 8x8 CU. Per-unit attributes live in a private
/// packed slab of `BYTES_PER_PARTITION` planes, each `num_partitions` long.
pub struct CUData {
    pub(crate) slice: Option<Arc<Slice>>,

    pub(crate) cu_addr: usize,
    pub(crate) abs_idx_in_ctu: usize,
    pub(crate) cu_pel_x: usize,
    pub(crate) cu_pel_y: usize,
    pub(crate) num_partitions: usize,
    /* plane length, fixed by initialize() */
    stride: usize,

    pub(crate) chroma_format: ChromaSampling,
    pub(crate) h_chroma_shift: usize,
    pub(crate) v_chroma_shift: usize,
    lossless: bool,

    data: AlignedBoxedSlice<u8>,
    pub(crate) cu_mv_field: [CUMvField; 2],

    tr_coeff: AlignedBoxedSlice<Coeff>,
    tr_coeff_offset: [usize; 3],

    /* CTU addresses of the spatial neighbours, None outside the picture */
    pub(crate) cu_left: Option<usize>,
    pub(crate) cu_above: Option<usize>,
    pub(crate) cu_above_left: Option<usize>,
    pub(crate) cu_above_right: Option<usize>,

    part_copy: PartCopyFn,
    part_set: PartSetFn,
    sub_part_copy: Option<PartCopyFn>,
}

impl Default for CUData {
    fn default() -> Self {
        let (part_copy, part_set, sub_part_copy) = (copy_n::<4>, bcast_n::<4>, None);
        CUData {
            slice: None,
            cu_addr: 0,
            abs_idx_in_ctu: 0,
            cu_pel_x: 0,
            cu_pel_y: 0,
            num_partitions: 0,
            stride: 0,
            chroma_format: ChromaSampling::default(),
            h_chroma_shift: 0,
            v_chroma_shift: 0,
            lossless: false,
            data: AlignedBoxedSlice::default(),
            cu_mv_field: [CUMvField::default(), CUMvField::default()],
            tr_coeff: AlignedBoxedSlice::default(),
            tr_coeff_offset: [0; 3],
            cu_left: None,
            cu_above: None,
            cu_above_left: None,
            cu_above_right: None,
            part_copy,
            part_set,
            sub_part_copy,
        }
    }
}

impl CUData {
    /// Binds this instance to a node size: allocates the attribute slab,
    /// the motion fields and the coefficient buffers, and selects the copy
    /// and broadcast routines matching `num_partitions`.
    ///
    /// Every instance owns its slabs. A `CUDataMemPool` is a set of such
    /// instances, not one shared slab sliced by instance index.
    pub fn initialize(&mut self, num_partitions: usize, cu_size: usize, csp: ChromaSampling) {
        debug_assert_eq!(cu_size * cu_size, num_partitions << (LOG2_UNIT_SIZE * 2));

        let (h_shift, v_shift) = csp.chroma_shift();
        self.chroma_format = csp;
        self.h_chroma_shift = h_shift;
        self.v_chroma_shift = v_shift;
        self.num_partitions = num_partitions;
        self.stride = num_partitions;

        let (part_copy, part_set, sub_part_copy) = part_fns(num_partitions);
        self.part_copy = part_copy;
        self.part_set = part_set;
        self.sub_part_copy = sub_part_copy;

        self.data = AlignedBoxedSlice::zeroed(BYTES_PER_PARTITION * num_partitions);
        debug_assert_eq!(self.data.len(), ALL_ATTRS.len() * self.stride, "CU data layout is broken");

        self.cu_mv_field[0].initialize(num_partitions);
        self.cu_mv_field[1].initialize(num_partitions);

        let size_l = cu_size * cu_size;
        let size_c = size_l >> (h_shift + v_shift);
        self.tr_coeff = AlignedBoxedSlice::zeroed(size_l + size_c * 2);
        self.tr_coeff_offset = [0, size_l, size_l + size_c];
    }

    /// Prepares the picture-resident instance of CTU `cu_addr` for a new
    /// encode: every unit gets `qp`, the 64x64 size and the "not coded"
    /// markers, and the spatial neighbour CTUs are resolved.
    pub fn init_ctu(&mut self, frame: &FrameData, cu_addr: usize, qp: i32) {
        let slice = frame.slice_arc().clone();
        debug_assert!(
            !(frame.lossless() && !slice.pps.transquant_bypass_enabled),
            "lossless enabled without TQbypass in PPS"
        );
        debug_assert_eq!(self.stride, NUM_CU_PARTITIONS);

        let width_in_cu = frame.num_cu_in_width();
        self.cu_addr = cu_addr;
        self.cu_pel_x = (cu_addr % width_in_cu) << MAX_LOG2_CU_SIZE;
        self.cu_pel_y = (cu_addr / width_in_cu) << MAX_LOG2_CU_SIZE;
        self.abs_idx_in_ctu = 0;
        self.num_partitions = NUM_CU_PARTITIONS;
        self.lossless = frame.lossless();

        self.set_all(Attr::Qp, qp as i8 as u8);
        self.set_all(Attr::Log2CUSize, MAX_LOG2_CU_SIZE as u8);
        self.set_all(Attr::PartSize, PartSize::SIZE_NONE as u8);
        self.set_all(Attr::PredMode, PredMode::MODE_NONE as u8);
        self.set_all(Attr::LumaIntraDir, DC_IDX as u8);
        self.set_all(Attr::TransquantBypass, self.lossless as u8);
        self.zero_from(Attr::Depth);

        self.cu_mv_field[0].clear_mv_field();
        self.cu_mv_field[1].clear_mv_field();

        let col = cu_addr % width_in_cu;
        let has_left = col > 0;
        let has_above = cu_addr >= width_in_cu;
        self.cu_left = if has_left { Some(cu_addr - 1) } else { None };
        self.cu_above = if has_above { Some(cu_addr - width_in_cu) } else { None };
        self.cu_above_left = if has_left && has_above {
            Some(cu_addr - width_in_cu - 1)
        } else {
            None
        };
        self.cu_above_right = if has_above && col + 1 < width_in_cu {
            Some(cu_addr - width_in_cu + 1)
        } else {
            None
        };

        self.slice = Some(slice);

        trace!(
            "init CTU {} at ({}, {}) qp {}",
            cu_addr,
            self.cu_pel_x,
            self.cu_pel_y,
            qp
        );
    }

    /// Prepares a working instance for the candidate CU `cu_geom` of `ctu`.
    pub fn init_sub_cu(&mut self, ctu: &CUData, cu_geom: &CUGeom) {
        debug_assert_eq!(self.stride, cu_geom.num_partitions);

        self.slice = ctu.slice.clone();
        self.cu_addr = ctu.cu_addr;
        self.abs_idx_in_ctu = cu_geom.encode_idx;
        self.num_partitions = cu_geom.num_partitions;
        self.cu_pel_x = ctu.cu_pel_x + zscan_to_pel_x[cu_geom.encode_idx];
        self.cu_pel_y = ctu.cu_pel_y + zscan_to_pel_y[cu_geom.encode_idx];
        self.lossless = ctu.lossless;
        self.copy_neighbours(ctu);

        self.set_all(Attr::Qp, ctu.attr(Attr::Qp)[0]);
        self.set_all(Attr::Log2CUSize, cu_geom.log2_cu_size as u8);
        self.set_all(Attr::PartSize, PartSize::SIZE_NONE as u8);
        self.set_all(Attr::PredMode, PredMode::MODE_NONE as u8);
        self.set_all(Attr::LumaIntraDir, DC_IDX as u8);
        self.set_all(Attr::TransquantBypass, self.lossless as u8);
        self.set_all(Attr::Depth, cu_geom.depth as u8);
        self.zero_from(Attr::SkipFlag);

        if self.slice.as_ref().map_or(false, |s| !s.is_intra()) {
            self.cu_mv_field[0].clear_mv_field();
            self.cu_mv_field[1].clear_mv_field();
        }
    }

    /// Copies the attributes of the best lossy coding of a CU and turns it
    /// into a lossless candidate with the residual state cleared.
    pub fn init_lossless_cu(&mut self, cu: &CUData, cu_geom: &CUGeom) {
        debug_assert_eq!(self.stride, cu.stride);

        self.slice = cu.slice.clone();
        self.cu_addr = cu.cu_addr;
        self.cu_pel_x = cu.cu_pel_x;
        self.cu_pel_y = cu.cu_pel_y;
        self.abs_idx_in_ctu = cu_geom.encode_idx;
        self.num_partitions = cu_geom.num_partitions;
        self.lossless = cu.lossless;
        self.copy_neighbours(cu);

        let n = BYTES_PER_PARTITION * self.stride;
        self.data[..n].copy_from_slice(&cu.data[..n]);
        for list in 0..2 {
            self.cu_mv_field[list].copy_from(&cu.cu_mv_field[list], self.num_partitions, 0);
        }

        self.set_all(Attr::TransquantBypass, 1);
        for &a in &[
            Attr::SkipFlag,
            Attr::TrIdx,
            Attr::TransformSkipY,
            Attr::TransformSkipU,
            Attr::TransformSkipV,
            Attr::CbfY,
            Attr::CbfU,
            Attr::CbfV,
        ] {
            self.set_all(a, 0);
        }
    }

    /// Loads the already coded decision of CU `cu_geom` out of the CTU, as
    /// the starting point of a re-encode.
    pub fn copy_from_pic(&mut self, ctu: &CUData, cu_geom: &CUGeom) {
        self.slice = ctu.slice.clone();
        self.cu_addr = ctu.cu_addr;
        self.abs_idx_in_ctu = cu_geom.encode_idx;
        self.num_partitions = cu_geom.num_partitions;
        self.cu_pel_x = ctu.cu_pel_x + zscan_to_pel_x[cu_geom.encode_idx];
        self.cu_pel_y = ctu.cu_pel_y + zscan_to_pel_y[cu_geom.encode_idx];
        self.lossless = ctu.lossless;
        self.copy_neighbours(ctu);

        let copy = self.part_copy;
        let abs = cu_geom.encode_idx;
        for &a in FROM_PIC_ATTRS.iter() {
            copy(self.attr_mut(a), &ctu.attr(a)[abs..]);
        }
    }

    /// Merges the best coding of one quadrant child into quadrant
    /// `part_unit_idx` of this node. `num_partitions` is the child's unit
    /// count and `depth` its quadtree depth.
    pub fn copy_part_from(&mut self, cu: &CUData, num_partitions: usize, part_unit_idx: usize, depth: usize) {
        debug_assert!(part_unit_idx < 4, "part unit should be less than 4");
        debug_assert_eq!(num_partitions, self.num_partitions >> 2);

        let copy = match self.sub_part_copy {
            Some(copy) => copy,
            None => {
                debug_assert!(false, "a 4 unit CU has no quadrants");
                return;
            }
        };

        let offset = num_partitions * part_unit_idx;
        for &a in ALL_ATTRS.iter() {
            copy(&mut self.attr_mut(a)[offset..], cu.attr(a));
        }
        for list in 0..2 {
            self.cu_mv_field[list].copy_from(&cu.cu_mv_field[list], num_partitions, offset);
        }

        let tmp_y = 1 << ((MAX_LOG2_CU_SIZE - depth) * 2);
        let tmp_y2 = part_unit_idx * tmp_y;
        self.tr_coeff_mut(0)[tmp_y2..tmp_y2 + tmp_y].copy_from_slice(&cu.tr_coeff(0)[..tmp_y]);

        let shift = self.h_chroma_shift + self.v_chroma_shift;
        let (tmp_c, tmp_c2) = (tmp_y >> shift, tmp_y2 >> shift);
        for plane in 1..3 {
            self.tr_coeff_mut(plane)[tmp_c2..tmp_c2 + tmp_c].copy_from_slice(&cu.tr_coeff(plane)[..tmp_c]);
        }
    }

    /// Writes the final decision of this CU into its CTU in the picture.
    pub fn copy_to_pic(&self, frame: &mut FrameData, depth: usize) {
        let abs = self.abs_idx_in_ctu;
        let copy = self.part_copy;
        let ctu = frame.get_pic_ctu_mut(self.cu_addr);

        for &a in ALL_ATTRS.iter() {
            copy(&mut ctu.attr_mut(a)[abs..], self.attr(a));
        }
        for list in 0..2 {
            self.cu_mv_field[list].copy_to(&mut ctu.cu_mv_field[list], abs);
        }

        self.copy_coeffs_to(ctu, depth);
    }

    /// Writes the residual-coding state of a re-encoded CU back into the CTU,
    /// leaving its prediction decision untouched.
    pub fn update_pic(&self, frame: &mut FrameData, depth: usize) {
        let abs = self.abs_idx_in_ctu;
        let copy = self.part_copy;
        let ctu = frame.get_pic_ctu_mut(self.cu_addr);

        for &a in UPDATE_ATTRS.iter() {
            copy(&mut ctu.attr_mut(a)[abs..], self.attr(a));
        }

        self.copy_coeffs_to(ctu, depth);
    }

    fn copy_coeffs_to(&self, ctu: &mut CUData, depth: usize) {
        let tmp_y = 1 << ((MAX_LOG2_CU_SIZE - depth) * 2);
        let tmp_y2 = self.abs_idx_in_ctu << (LOG2_UNIT_SIZE * 2);
        ctu.tr_coeff_mut(0)[tmp_y2..tmp_y2 + tmp_y].copy_from_slice(&self.tr_coeff(0)[..tmp_y]);

        let shift = self.h_chroma_shift + self.v_chroma_shift;
        let (tmp_c, tmp_c2) = (tmp_y >> shift, tmp_y2 >> shift);
        for plane in 1..3 {
            ctu.tr_coeff_mut(plane)[tmp_c2..tmp_c2 + tmp_c].copy_from_slice(&self.tr_coeff(plane)[..tmp_c]);
        }
    }

    fn copy_neighbours(&mut self, cu: &CUData) {
        self.cu_left = cu.cu_left;
        self.cu_above = cu.cu_above;
        self.cu_above_left = cu.cu_above_left;
        self.cu_above_right = cu.cu_above_right;
    }

    /***** raw plane access *****/

    #[inline]
    pub fn attr(&self, a: Attr) -> &[u8] {
        let start = a as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    #[inline]
    pub(crate) fn attr_mut(&mut self, a: Attr) -> &mut [u8] {
        let start = a as usize * self.stride;
        &mut self.data[start..start + self.stride]
    }

    #[inline]
    fn set_all(&mut self, a: Attr, val: u8) {
        let set = self.part_set;
        set(self.attr_mut(a), val);
    }

    /* zero every plane from `a` to the end of the slab */
    fn zero_from(&mut self, a: Attr) {
        let start = a as usize * self.stride;
        self.data[start..].fill(0);
    }

    #[inline]
    fn fill(&mut self, a: Attr, start: usize, len: usize, val: u8) {
        self.attr_mut(a)[start..start + len].fill(val);
    }

    pub fn tr_coeff(&self, plane: usize) -> &[Coeff] {
        let start = self.tr_coeff_offset[plane];
        let end = if plane < 2 { self.tr_coeff_offset[plane + 1] } else { self.tr_coeff.len() };
        &self.tr_coeff[start..end]
    }

    pub fn tr_coeff_mut(&mut self, plane: usize) -> &mut [Coeff] {
        let start = self.tr_coeff_offset[plane];
        let end = if plane < 2 { self.tr_coeff_offset[plane + 1] } else { self.tr_coeff.len() };
        &mut self.tr_coeff[start..end]
    }

    pub fn cu_mv_field(&self, list: usize) -> &CUMvField {
        &self.cu_mv_field[list]
    }

    pub fn cu_mv_field_mut(&mut self, list: usize) -> &mut CUMvField {
        &mut self.cu_mv_field[list]
    }

    /***** identity *****/

    pub fn slice(&self) -> Option<&Slice> {
        self.slice.as_deref()
    }

    /* a CTU becomes visible to neighbour and TMVP lookups once started */
    pub fn is_initialized(&self) -> bool {
        self.slice.is_some()
    }

    pub fn cu_addr(&self) -> usize {
        self.cu_addr
    }

    pub fn abs_idx_in_ctu(&self) -> usize {
        self.abs_idx_in_ctu
    }

    pub fn cu_pel_x(&self) -> usize {
        self.cu_pel_x
    }

    pub fn cu_pel_y(&self) -> usize {
        self.cu_pel_y
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    pub fn chroma_format(&self) -> ChromaSampling {
        self.chroma_format
    }

    /***** per unit getters *****/

    #[inline]
    pub fn qp(&self, idx: usize) -> i8 {
        self.attr(Attr::Qp)[idx] as i8
    }

    #[inline]
    pub fn log2_cu_size(&self, idx: usize) -> usize {
        self.attr(Attr::Log2CUSize)[idx] as usize
    }

    #[inline]
    pub fn part_size(&self, idx: usize) -> PartSize {
        PartSize::from(self.attr(Attr::PartSize)[idx])
    }

    #[inline]
    pub fn pred_mode(&self, idx: usize) -> PredMode {
        PredMode::from(self.attr(Attr::PredMode)[idx])
    }

    #[inline]
    pub fn luma_intra_dir(&self, idx: usize) -> u32 {
        self.attr(Attr::LumaIntraDir)[idx] as u32
    }

    #[inline]
    pub fn chroma_intra_dir(&self, idx: usize) -> u32 {
        self.attr(Attr::ChromaIntraDir)[idx] as u32
    }

    #[inline]
    pub fn cu_transquant_bypass(&self, idx: usize) -> bool {
        self.attr(Attr::TransquantBypass)[idx] != 0
    }

    #[inline]
    pub fn depth(&self, idx: usize) -> usize {
        self.attr(Attr::Depth)[idx] as usize
    }

    #[inline]
    pub fn merge_flag(&self, idx: usize) -> bool {
        self.attr(Attr::MergeFlag)[idx] != 0
    }

    #[inline]
    pub fn inter_dir(&self, idx: usize) -> u8 {
        self.attr(Attr::InterDir)[idx]
    }

    #[inline]
    pub fn mvp_idx(&self, list: usize, idx: usize) -> u8 {
        self.attr(mvp_idx_attr(list))[idx]
    }

    #[inline]
    pub fn tr_idx(&self, idx: usize) -> u32 {
        self.attr(Attr::TrIdx)[idx] as u32
    }

    #[inline]
    pub fn transform_skip(&self, ttype: TextType, idx: usize) -> u8 {
        self.attr(transform_skip_attr(ttype))[idx]
    }

    #[inline]
    pub fn cbf(&self, ttype: TextType, idx: usize) -> u8 {
        self.attr(cbf_attr(ttype))[idx]
    }

    #[inline]
    pub fn get_cbf(&self, idx: usize, ttype: TextType, tr_depth: u32) -> u8 {
        (self.cbf(ttype, idx) >> tr_depth) & 1
    }

    pub fn get_qt_root_cbf(&self, idx: usize) -> bool {
        self.get_cbf(idx, TextType::TEXT_LUMA, 0) != 0
            || self.get_cbf(idx, TextType::TEXT_CHROMA_U, 0) != 0
            || self.get_cbf(idx, TextType::TEXT_CHROMA_V, 0) != 0
    }

    /* MODE_SKIP carries the inter bit, so both tests are bit tests */
    #[inline]
    pub fn is_intra(&self, idx: usize) -> bool {
        self.attr(Attr::PredMode)[idx] & PredMode::MODE_INTRA as u8 != 0
    }

    #[inline]
    pub fn is_inter(&self, idx: usize) -> bool {
        self.attr(Attr::PredMode)[idx] & PredMode::MODE_INTER as u8 != 0
    }

    #[inline]
    pub fn is_skipped(&self, idx: usize) -> bool {
        self.attr(Attr::SkipFlag)[idx] != 0
    }

    #[inline]
    pub fn is_lossless_coded(&self, idx: usize) -> bool {
        self.cu_transquant_bypass(idx)
    }

    /*****************************************************************************
     * setters
     *****************************************************************************/

    /* whole node broadcasts */

    pub fn set_part_size_sub_parts(&mut self, size: PartSize) {
        self.set_all(Attr::PartSize, size as u8);
    }

    pub fn set_pred_mode_sub_parts(&mut self, mode: PredMode) {
        self.set_all(Attr::PredMode, mode as u8);
    }

    pub fn set_skip_flag_sub_parts(&mut self, skip_flag: bool) {
        self.set_all(Attr::SkipFlag, skip_flag as u8);
    }

    pub fn set_merge_flag(&mut self, idx: usize, merge: bool) {
        self.attr_mut(Attr::MergeFlag)[idx] = merge as u8;
    }

    pub fn set_mvp_idx(&mut self, list: usize, idx: usize, mvp_idx: u8) {
        self.attr_mut(mvp_idx_attr(list))[idx] = mvp_idx;
    }

    /* `abs_part_idx` is local, counts follow the CU depth */

    pub fn set_qp_sub_parts(&mut self, qp: i32, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::Qp, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), qp as i8 as u8);
    }

    pub fn set_depth_sub_parts(&mut self, depth: usize, abs_part_idx: usize) {
        self.fill(Attr::Depth, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), depth as u8);
    }

    pub fn set_log2_cu_size_sub_parts(&mut self, log2_cu_size: usize, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::Log2CUSize, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), log2_cu_size as u8);
    }

    pub fn set_tr_idx_sub_parts(&mut self, tr_idx: u32, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::TrIdx, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), tr_idx as u8);
    }

    pub fn set_luma_intra_dir_sub_parts(&mut self, dir: u32, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::LumaIntraDir, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), dir as u8);
    }

    pub fn set_chroma_intra_dir_sub_parts(&mut self, dir: u32, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::ChromaIntraDir, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), dir as u8);
    }

    pub fn set_cu_transquant_bypass_sub_parts(&mut self, flag: bool, abs_part_idx: usize, depth: usize) {
        self.fill(Attr::TransquantBypass, abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), flag as u8);
    }

    pub fn set_transform_skip_sub_parts(&mut self, ts: u8, ttype: TextType, abs_part_idx: usize, depth: usize) {
        self.fill(transform_skip_attr(ttype), abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), ts);
    }

    pub fn set_transform_skip_part_range(&mut self, ts: u8, ttype: TextType, abs_part_idx: usize, covered: usize) {
        self.fill(transform_skip_attr(ttype), abs_part_idx, covered, ts);
    }

    pub fn set_cbf_sub_parts(&mut self, cbf: u8, ttype: TextType, abs_part_idx: usize, depth: usize) {
        self.fill(cbf_attr(ttype), abs_part_idx, NUM_CU_PARTITIONS >> (depth << 1), cbf);
    }

    pub fn set_cbf_part_range(&mut self, cbf: u8, ttype: TextType, abs_part_idx: usize, covered: usize) {
        self.fill(cbf_attr(ttype), abs_part_idx, covered, cbf);
    }

    pub fn clear_cbf(&mut self, abs_part_idx: usize, depth: usize) {
        let n = NUM_CU_PARTITIONS >> (depth << 1);
        for &a in &[Attr::CbfY, Attr::CbfU, Attr::CbfV] {
            self.fill(a, abs_part_idx, n, 0);
        }
    }

    /// Sets the inter direction over the units of PU `pu_idx`, whose first
    /// unit is `abs_part_idx`.
    pub fn set_inter_dir_sub_parts(&mut self, dir: u8, abs_part_idx: usize, pu_idx: usize) {
        let part_size = self.part_size(abs_part_idx);
        let q = self.num_partitions >> 2;
        let plane = self.attr_mut(Attr::InterDir);
        crate::util::for_each_pu_range(part_size, abs_part_idx, q, pu_idx, |start, len| {
            plane[start..start + len].fill(dir);
        });
    }

    /// Sets the motion of one list over the units of PU `pu_idx`.
    pub fn set_all_mv_field(&mut self, list: usize, mv_field: MVField, abs_part_idx: usize, pu_idx: usize) {
        let part_size = self.part_size(abs_part_idx);
        self.cu_mv_field[list].set_all_mv_field(mv_field, part_size, abs_part_idx, 0, pu_idx);
    }

    /// Applies `qp` to every coded leaf below `abs_part_idx` up to and
    /// including the first leaf carrying residual. Returns whether such a
    /// leaf was found.
    pub fn set_qp_sub_cus(&mut self, qp: i32, abs_part_idx: usize, depth: usize) -> bool {
        let cur_part_num_q = (NUM_CU_PARTITIONS >> (depth << 1)) >> 2;

        if self.depth(abs_part_idx) > depth {
            for part_unit_idx in 0..4 {
                if self.set_qp_sub_cus(qp, abs_part_idx + part_unit_idx * cur_part_num_q, depth + 1) {
                    return true;
                }
            }
            false
        } else if self.get_qt_root_cbf(abs_part_idx) {
            true
        } else {
            self.set_qp_sub_parts(qp, abs_part_idx, depth);
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frame::fixture;
    use crate::geom::calc_ctu_geoms;

    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaChaRng;

    fn instance(depth: usize) -> CUData {
        let mut cu = CUData::default();
        cu.initialize(NUM_CU_PARTITIONS >> (depth * 2), MAX_CU_SIZE >> depth, ChromaSampling::Cs420);
        cu
    }

    fn randomize(cu: &mut CUData, rng: &mut ChaChaRng) {
        let n = cu.data.len();
        for b in &mut cu.data[..n] {
            *b = rng.gen_range(0, 16);
        }
        for plane in 0..3 {
            for c in cu.tr_coeff_mut(plane).iter_mut() {
                *c = rng.gen();
            }
        }
        for list in 0..2 {
            for i in 0..cu.num_partitions {
                let mv = MV::new(rng.gen(), rng.gen());
                let mvf = MVField::new(mv, rng.gen_range(-1, 4));
                cu.cu_mv_field[list].set_mv_field(i, mvf);
            }
        }
    }

    #[test]
    fn init_ctu_broadcasts_markers() {
        let cfg = fixture::config(192, 128);
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 4, &[], &[]);
        frame.init_pic_ctu(4, 30);

        let ctu = frame.get_pic_ctu(4);
        assert_eq!((ctu.cu_pel_x(), ctu.cu_pel_y()), (64, 64));
        for i in 0..NUM_CU_PARTITIONS {
            assert_eq!(ctu.qp(i), 30);
            assert_eq!(ctu.log2_cu_size(i), MAX_LOG2_CU_SIZE);
            assert_eq!(ctu.part_size(i), PartSize::SIZE_NONE);
            assert_eq!(ctu.pred_mode(i), PredMode::MODE_NONE);
            assert_eq!(ctu.luma_intra_dir(i), DC_IDX);
            assert_eq!(ctu.depth(i), 0);
            assert_eq!(ctu.cbf(TextType::TEXT_CHROMA_V, i), 0);
            assert_eq!(ctu.chroma_intra_dir(i), 0);
            assert_eq!(ctu.cu_mv_field(1).get_ref_idx(i), NOT_VALID);
        }
        assert_eq!(ctu.cu_left, Some(3));
        assert_eq!(ctu.cu_above, Some(1));
        assert_eq!(ctu.cu_above_left, Some(0));
        assert_eq!(ctu.cu_above_right, Some(2));

        frame.init_pic_ctu(5, 30);
        assert_eq!(frame.get_pic_ctu(5).cu_above_right, None);
        frame.init_pic_ctu(0, 30);
        let first = frame.get_pic_ctu(0);
        assert_eq!((first.cu_left, first.cu_above), (None, None));
    }

    #[test]
    fn init_sub_cu_inherits_from_ctu() {
        let cfg = fixture::config(128, 128);
        let mut frame = fixture::frame(&cfg, SliceType::I_SLICE, 0, &[], &[]);
        frame.init_pic_ctu(3, 27);

        let ctu = frame.get_pic_ctu(3);
        let geoms = calc_ctu_geoms(128, 128, 64, 64, MAX_CU_SIZE, MIN_CU_SIZE);
        // third 16x16 of the first 32x32 quadrant
        let geom = &geoms[1 + geoms[1].child_offset + 2];
        assert_eq!((geom.depth, geom.log2_cu_size), (2, 4));

        let mut cu = instance(2);
        cu.init_sub_cu(ctu, geom);
        assert_eq!(cu.abs_idx_in_ctu(), 32);
        assert_eq!((cu.cu_pel_x(), cu.cu_pel_y()), (64, 64 + 16));
        for i in 0..cu.num_partitions() {
            assert_eq!(cu.qp(i), 27);
            assert_eq!(cu.depth(i), 2);
            assert_eq!(cu.log2_cu_size(i), 4);
            assert!(!cu.is_skipped(i));
        }
        assert_eq!(cu.cu_above, ctu.cu_above);
    }

    #[test]
    fn broadcast_then_copy_part_from_reproduces_values() {
        let cfg = fixture::config(64, 64);
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 2, &[], &[]);
        frame.init_pic_ctu(0, 22);
        let ctu = frame.get_pic_ctu(0);
        let geoms = calc_ctu_geoms(64, 64, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);

        let mut parent = instance(0);
        parent.init_sub_cu(ctu, &geoms[0]);

        for q in 0..4 {
            let child_geom = &geoms[geoms[0].child_offset + q];
            let mut child = instance(1);
            child.init_sub_cu(ctu, child_geom);
            child.set_part_size_sub_parts(PartSize::SIZE_2Nx2N);
            child.set_pred_mode_sub_parts(PredMode::MODE_INTRA);
            child.set_luma_intra_dir_sub_parts(q as u32 + 2, 0, 1);
            for c in child.tr_coeff_mut(0).iter_mut() {
                *c = q as Coeff + 1;
            }
            parent.copy_part_from(&child, child.num_partitions(), q, 1);
        }

        for i in 0..NUM_CU_PARTITIONS {
            assert_eq!(parent.luma_intra_dir(i), (i / 64) as u32 + 2);
            assert!(parent.is_intra(i));
            assert_eq!(parent.depth(i), 1);
        }
        let coeffs = parent.tr_coeff(0);
        for q in 0..4 {
            assert!(coeffs[q * 1024..(q + 1) * 1024].iter().all(|&c| c == q as Coeff + 1));
        }
    }

    #[test]
    fn quadrant_merge_equals_direct_copy_to_pic() {
        let mut rng = ChaChaRng::from_seed([7; 32]);
        let cfg = fixture::config(64, 64);
        let mut frame = fixture::frame(&cfg, SliceType::B_SLICE, 8, &[], &[]);
        frame.init_pic_ctu(0, 32);
        let geoms = calc_ctu_geoms(64, 64, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);

        let mut children = Vec::new();
        for q in 0..4 {
            let mut child = instance(2);
            child.init_sub_cu(frame.get_pic_ctu(0), &geoms[1 + geoms[1].child_offset + q]);
            randomize(&mut child, &mut rng);
            children.push(child);
        }

        // merge bottom-up into the first 32x32 and write that to the CTU
        let mut parent = instance(1);
        parent.init_sub_cu(frame.get_pic_ctu(0), &geoms[1]);
        for (q, child) in children.iter().enumerate() {
            parent.copy_part_from(child, child.num_partitions(), q, 2);
        }
        let mut merged = fixture::frame(&cfg, SliceType::B_SLICE, 8, &[], &[]);
        merged.init_pic_ctu(0, 32);
        parent.copy_to_pic(&mut merged, 1);

        // write every child straight to the CTU
        for child in &children {
            child.copy_to_pic(&mut frame, 2);
        }

        let (a, b) = (merged.get_pic_ctu(0), frame.get_pic_ctu(0));
        for &attr in ALL_ATTRS.iter() {
            assert_eq!(a.attr(attr), b.attr(attr), "{:?}", attr);
        }
        for list in 0..2 {
            for i in 0..NUM_CU_PARTITIONS {
                assert_eq!(a.cu_mv_field(list).get_mv_field(i), b.cu_mv_field(list).get_mv_field(i));
            }
        }
        for plane in 0..3 {
            assert_eq!(a.tr_coeff(plane), b.tr_coeff(plane));
        }
    }

    #[test]
    fn update_pic_keeps_prediction_decision() {
        let cfg = fixture::config(64, 64);
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 1, &[], &[]);
        frame.init_pic_ctu(0, 30);
        let geoms = calc_ctu_geoms(64, 64, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);
        let geom = &geoms[2];

        let mut cu = instance(1);
        cu.init_sub_cu(frame.get_pic_ctu(0), geom);
        cu.set_pred_mode_sub_parts(PredMode::MODE_INTER);
        cu.set_part_size_sub_parts(PartSize::SIZE_2NxN);
        cu.copy_to_pic(&mut frame, 1);

        let mut redo = instance(1);
        redo.copy_from_pic(frame.get_pic_ctu(0), geom);
        assert_eq!(redo.part_size(0), PartSize::SIZE_2NxN);
        redo.set_pred_mode_sub_parts(PredMode::MODE_INTRA);
        redo.set_qp_sub_parts(40, 0, 1);
        redo.set_cbf_sub_parts(1, TextType::TEXT_LUMA, 0, 1);
        redo.update_pic(&mut frame, 1);

        let ctu = frame.get_pic_ctu(0);
        let abs = geom.encode_idx;
        assert_eq!(ctu.qp(abs), 40);
        assert_eq!(ctu.cbf(TextType::TEXT_LUMA, abs + 63), 1);
        assert!(ctu.is_inter(abs));
        assert_eq!(ctu.qp(abs - 1), 30);
    }

    #[test]
    fn lossless_cu_clears_residual_state() {
        let mut rng = ChaChaRng::from_seed([3; 32]);
        let cfg = fixture::config(64, 64);
        let mut frame = fixture::frame(&cfg, SliceType::P_SLICE, 1, &[], &[]);
        frame.init_pic_ctu(0, 30);
        let geoms = calc_ctu_geoms(64, 64, 0, 0, MAX_CU_SIZE, MIN_CU_SIZE);

        let mut best = instance(1);
        best.init_sub_cu(frame.get_pic_ctu(0), &geoms[3]);
        randomize(&mut best, &mut rng);

        let mut lossless = instance(1);
        lossless.init_lossless_cu(&best, &geoms[3]);
        for i in 0..lossless.num_partitions() {
            assert!(lossless.is_lossless_coded(i));
            assert!(!lossless.is_skipped(i));
            assert!(!lossless.get_qt_root_cbf(i));
            assert_eq!(lossless.tr_idx(i), 0);
            assert_eq!(lossless.transform_skip(TextType::TEXT_CHROMA_U, i), 0);
            assert_eq!(lossless.pred_mode(i), best.pred_mode(i));
            assert_eq!(lossless.qp(i), best.qp(i));
            assert_eq!(lossless.cu_mv_field(0).get_mv_field(i), best.cu_mv_field(0).get_mv_field(i));
        }
    }

    #[test]
    fn qp_sub_cus_stop_at_first_coded_leaf() {
        let mut cu = instance(0);
        cu.set_qp_sub_parts(30, 0, 0);
        // four 32x32 leaves, the third one carries chroma residual
        for q in 0..4 {
            cu.set_depth_sub_parts(1, q * 64);
        }
        cu.set_cbf_sub_parts(1, TextType::TEXT_CHROMA_U, 128, 1);

        assert!(cu.set_qp_sub_cus(25, 0, 0));
        assert_eq!(cu.qp(0), 25);
        assert_eq!(cu.qp(64), 25);
        assert_eq!(cu.qp(128), 30);
        assert_eq!(cu.qp(192), 30);

        cu.clear_cbf(128, 1);
        assert!(!cu.set_qp_sub_cus(20, 0, 0));
        assert!((0..NUM_CU_PARTITIONS).all(|i| cu.qp(i) == 20));
    }

    #[test]
    fn plane_routines_cover_one_node() {
        for &n in &[256, 64, 16, 4] {
            let (copy, set, sub_copy) = part_fns(n);
            let mut plane = [0xAAu8; 257];
            set(&mut plane, 7);
            assert!(plane[..n].iter().all(|&b| b == 7));
            assert!(plane[n..].iter().all(|&b| b == 0xAA));

            let src: Vec<u8> = (0..=255).collect();
            copy(&mut plane, &src);
            assert_eq!(plane[..n], src[..n]);
            assert_eq!(plane[n], 0xAA);

            if let Some(sub_copy) = sub_copy {
                let mut plane = [0u8; 256];
                sub_copy(&mut plane, &src);
                assert_eq!(plane[..n / 4], src[..n / 4]);
                assert!(plane[n / 4..].iter().all(|&b| b == 0));
            }
        }
        assert!(part_fns(4).2.is_none());
    }

    #[test]
    fn inter_dir_covers_one_pu() {
        let mut cu = instance(1);
        cu.set_part_size_sub_parts(PartSize::SIZE_Nx2N);
        cu.set_inter_dir_sub_parts(2, 16, 1);
        let set: Vec<usize> = (0..64).filter(|&i| cu.inter_dir(i) == 2).collect();
        let expect: Vec<usize> = (16..32).chain(48..64).collect();
        assert_eq!(set, expect);
    }
}
