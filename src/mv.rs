use crate::def::*;
use crate::util::*;

/// Motion vector in quarter-sample units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MV {
    pub x: i16,
    pub y: i16,
}

impl MV {
    pub const fn new(x: i16, y: i16) -> Self {
        MV { x, y }
    }

    #[inline]
    pub fn not_zero(self) -> bool {
        self.x != 0 || self.y != 0
    }
}

/// A motion vector together with the reference index it points through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MVField {
    pub mv: MV,
    pub ref_idx: i8,
}

impl Default for MVField {
    fn default() -> Self {
        MVField {
            mv: MV::default(),
            ref_idx: NOT_VALID,
        }
    }
}

impl MVField {
    pub fn new(mv: MV, ref_idx: i8) -> Self {
        MVField { mv, ref_idx }
    }

    pub fn set_mv_field(&mut self, mv: MV, ref_idx: i8) {
        self.mv = mv;
        self.ref_idx = ref_idx;
    }
}

/// Per-unit motion of one reference list, laid out in z-scan order.
#[derive(Default)]
pub struct CUMvField {
    mv: Box<[MV]>,
    ref_idx: Box<[i8]>,
    num_partitions: usize,
}

impl CUMvField {
    pub fn initialize(&mut self, num_partitions: usize) {
        self.mv = vec![MV::default(); num_partitions].into_boxed_slice();
        self.ref_idx = vec![NOT_VALID; num_partitions].into_boxed_slice();
        self.num_partitions = num_partitions;
    }

    pub fn clear_mv_field(&mut self) {
        for mv in self.mv.iter_mut() {
            *mv = MV::default();
        }
        for r in self.ref_idx.iter_mut() {
            *r = NOT_VALID;
        }
    }

    #[inline]
    pub fn get_mv(&self, idx: usize) -> MV {
        self.mv[idx]
    }

    #[inline]
    pub fn get_ref_idx(&self, idx: usize) -> i8 {
        self.ref_idx[idx]
    }

    #[inline]
    pub fn get_mv_field(&self, idx: usize) -> MVField {
        MVField::new(self.mv[idx], self.ref_idx[idx])
    }

    #[inline]
    pub fn set_mv_field(&mut self, idx: usize, mv_field: MVField) {
        self.mv[idx] = mv_field.mv;
        self.ref_idx[idx] = mv_field.ref_idx;
    }

    pub fn num_partitions(&self) -> usize {
        self.num_partitions
    }

    /* copy `num_part_src` units of `src` to `part_addr_dst` */
    pub fn copy_from(&mut self, src: &CUMvField, num_part_src: usize, part_addr_dst: usize) {
        let dst = part_addr_dst..part_addr_dst + num_part_src;
        self.mv[dst.clone()].copy_from_slice(&src.mv[..num_part_src]);
        self.ref_idx[dst].copy_from_slice(&src.ref_idx[..num_part_src]);
    }

    /* copy all of this field into `dst` starting at `part_addr_dst` */
    pub fn copy_to(&self, dst: &mut CUMvField, part_addr_dst: usize) {
        let n = self.num_partitions;
        dst.mv[part_addr_dst..part_addr_dst + n].copy_from_slice(&self.mv[..n]);
        dst.ref_idx[part_addr_dst..part_addr_dst + n].copy_from_slice(&self.ref_idx[..n]);
    }

    pub fn set_all_mv(
        &mut self,
        mv: MV,
        part_size: PartSize,
        abs_part_idx: usize,
        depth: usize,
        part_idx: usize,
    ) {
        let q = (self.num_partitions >> (2 * depth)) >> 2;
        let mvs = &mut self.mv;
        for_each_pu_range(part_size, abs_part_idx, q, part_idx, |start, len| {
            mvs[start..start + len].fill(mv);
        });
    }

    pub fn set_all_ref_idx(
        &mut self,
        ref_idx: i8,
        part_size: PartSize,
        abs_part_idx: usize,
        depth: usize,
        part_idx: usize,
    ) {
        let q = (self.num_partitions >> (2 * depth)) >> 2;
        let refs = &mut self.ref_idx;
        for_each_pu_range(part_size, abs_part_idx, q, part_idx, |start, len| {
            refs[start..start + len].fill(ref_idx);
        });
    }

    pub fn set_all_mv_field(
        &mut self,
        mv_field: MVField,
        part_size: PartSize,
        abs_part_idx: usize,
        depth: usize,
        part_idx: usize,
    ) {
        self.set_all_mv(mv_field.mv, part_size, abs_part_idx, depth, part_idx);
        self.set_all_ref_idx(mv_field.ref_idx, part_size, abs_part_idx, depth, part_idx);
    }
}
