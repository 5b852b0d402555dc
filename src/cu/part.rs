use super::{Attr, CUData};
use crate::def::*;
use crate::tbl::*;

impl CUData {
    /// First unit, width and height of PU `part_idx` of this CU.
    pub fn get_part_index_and_size(&self, part_idx: usize) -> (usize, i32, i32) {
        let cu_size = 1 << self.log2_cu_size(0);
        let part_type = self.attr(Attr::PartSize)[0] as usize;

        let tmp = part_table[part_type][part_idx][0] as i32;
        let width = ((tmp >> 4) * cu_size) >> 2;
        let height = ((tmp & 0xF) * cu_size) >> 2;
        let part_addr = (part_addr_table[part_type][part_idx] as usize * self.num_partitions) >> 4;

        (part_addr, width, height)
    }

    /// Picture position and size of PU `part_idx`, as (x, y, width, height).
    pub fn get_part_position(&self, part_idx: usize) -> (i32, i32, i32, i32) {
        let cu_size = 1 << self.log2_cu_size(0);
        let part_type = self.attr(Attr::PartSize)[0] as usize;

        let tmp = part_table[part_type][part_idx][0] as i32;
        let width = ((tmp >> 4) * cu_size) >> 2;
        let height = ((tmp & 0xF) * cu_size) >> 2;

        let tmp = part_table[part_type][part_idx][1] as i32;
        let x = self.cu_pel_x as i32 + (((tmp >> 4) * cu_size) >> 2);
        let y = self.cu_pel_y as i32 + (((tmp & 0xF) * cu_size) >> 2);

        (x, y, width, height)
    }

    /// CTU z-indices of the top-left and top-right units of PU `part_idx`.
    pub fn derive_left_right_top_idx(&self, part_idx: usize) -> (usize, usize) {
        use crate::def::PartSize::*;

        let n = self.num_partitions as isize;
        let p = part_idx as isize;
        let lt = self.abs_idx_in_ctu as isize;
        let rt = raster_to_zscan
            [zscan_to_raster[self.abs_idx_in_ctu] + (1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE)) - 1]
            as isize;

        let (dlt, drt) = match self.part_size(0) {
            SIZE_2Nx2N => (0, 0),
            SIZE_2NxN => {
                let d = if p == 0 { 0 } else { n >> 1 };
                (d, d)
            }
            SIZE_Nx2N => (
                if p == 0 { 0 } else { n >> 2 },
                if p == 1 { 0 } else { -(n >> 2) },
            ),
            SIZE_NxN => ((n >> 2) * p, (n >> 2) * (p - 1)),
            SIZE_2NxnU => {
                let d = if p == 0 { 0 } else { n >> 3 };
                (d, d)
            }
            SIZE_2NxnD => {
                let d = if p == 0 { 0 } else { (n >> 1) + (n >> 3) };
                (d, d)
            }
            SIZE_nLx2N => (
                if p == 0 { 0 } else { n >> 4 },
                if p == 1 { 0 } else { -((n >> 2) + (n >> 4)) },
            ),
            SIZE_nRx2N => (
                if p == 0 { 0 } else { (n >> 2) + (n >> 4) },
                if p == 1 { 0 } else { -(n >> 4) },
            ),
            SIZE_NONE => {
                debug_assert!(false, "unexpected part index");
                (0, 0)
            }
        };

        ((lt + dlt) as usize, (rt + drt) as usize)
    }

    /// CTU z-index of the bottom-left unit of PU `part_idx`.
    pub fn derive_left_bottom_idx(&self, part_idx: usize) -> usize {
        use crate::def::PartSize::*;

        let n = self.num_partitions as isize;
        let p = part_idx as isize;
        let lb = raster_to_zscan[zscan_to_raster[self.abs_idx_in_ctu]
            + ((1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE - 1)) - 1) * NUM_PART_IN_CU_SIZE]
            as isize;

        let d = match self.part_size(0) {
            SIZE_2Nx2N => n >> 1,
            SIZE_2NxN => {
                if p == 0 {
                    0
                } else {
                    n >> 1
                }
            }
            SIZE_Nx2N => {
                if p == 0 {
                    n >> 1
                } else {
                    (n >> 2) * 3
                }
            }
            SIZE_NxN => (n >> 2) * p,
            SIZE_2NxnU => {
                if p == 0 {
                    -(n >> 3)
                } else {
                    n >> 1
                }
            }
            SIZE_2NxnD => {
                if p == 0 {
                    (n >> 2) + (n >> 3)
                } else {
                    n >> 1
                }
            }
            SIZE_nLx2N => {
                if p == 0 {
                    n >> 1
                } else {
                    (n >> 1) + (n >> 4)
                }
            }
            SIZE_nRx2N => {
                if p == 0 {
                    n >> 1
                } else {
                    (n >> 1) + (n >> 2) + (n >> 4)
                }
            }
            SIZE_NONE => {
                debug_assert!(false, "unexpected part index");
                0
            }
        };

        (lb + d) as usize
    }

    /// CTU z-index of the unit at the bottom-right corner of PU `part_idx`.
    pub fn derive_right_bottom_idx(&self, part_idx: usize) -> usize {
        use crate::def::PartSize::*;

        let n = self.num_partitions as isize;
        let p = part_idx as isize;
        let log2_units = self.log2_cu_size(0) - LOG2_UNIT_SIZE;
        let rb = raster_to_zscan[zscan_to_raster[self.abs_idx_in_ctu]
            + ((1 << (log2_units - 1)) - 1) * NUM_PART_IN_CU_SIZE
            + (1 << log2_units)
            - 1] as isize;

        let d = match self.part_size(0) {
            SIZE_2Nx2N => n >> 1,
            SIZE_2NxN => {
                if p == 0 {
                    0
                } else {
                    n >> 1
                }
            }
            SIZE_Nx2N => {
                if p == 0 {
                    n >> 2
                } else {
                    n >> 1
                }
            }
            SIZE_NxN => (n >> 2) * (p - 1),
            SIZE_2NxnU => {
                if p == 0 {
                    -(n >> 3)
                } else {
                    n >> 1
                }
            }
            SIZE_2NxnD => {
                if p == 0 {
                    (n >> 2) + (n >> 3)
                } else {
                    n >> 1
                }
            }
            SIZE_nLx2N => {
                if p == 0 {
                    (n >> 3) + (n >> 4)
                } else {
                    n >> 1
                }
            }
            SIZE_nRx2N => {
                if p == 0 {
                    (n >> 2) + (n >> 3) + (n >> 4)
                } else {
                    n >> 1
                }
            }
            SIZE_NONE => {
                debug_assert!(false, "unexpected part index");
                0
            }
        };

        (rb + d) as usize
    }

    /// Top-left and top-right units of a sub-block at `part_offset` within
    /// this CU, `part_depth` levels below it, for intra reference lookups.
    pub fn derive_left_right_top_idx_adi(&self, part_offset: usize, part_depth: usize) -> (usize, usize) {
        let num_part_in_width = 1 << (self.log2_cu_size(0) - LOG2_UNIT_SIZE - part_depth);
        let lt = self.abs_idx_in_ctu + part_offset;
        let rt = raster_to_zscan[zscan_to_raster[lt] + num_part_in_width - 1];
        (lt, rt)
    }

    /// CTU z-index of the unit just below-right of the centre of PU
    /// `part_idx`, where the temporal fallback candidate is read.
    pub fn derive_center_idx(&self, part_idx: usize) -> usize {
        let (part_addr, width, height) = self.get_part_index_and_size(part_idx);
        let cur = self.abs_idx_in_ctu + part_addr;
        raster_to_zscan[zscan_to_raster[cur]
            + ((height as usize) >> (LOG2_UNIT_SIZE + 1)) * NUM_PART_IN_CU_SIZE
            + ((width as usize) >> (LOG2_UNIT_SIZE + 1))]
    }
}
