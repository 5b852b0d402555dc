use log::*;

use crate::cu::CUData;
use crate::def::*;
use crate::frame::FrameData;
use crate::tbl::depth_scan_idx;

/// Static description of one candidate CU of a CTU. Descriptors are stored
/// depth by depth: the CTU at index 0, its four 32x32 children at 1..5, the
/// 16x16 CUs at 5..21 and the 8x8 CUs at 21..85, each depth in z-order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CUGeom {
    /// Index of the first child minus the index of this CU.
    pub child_offset: usize,
    /// z-index of the first unit of this CU within the CTU.
    pub encode_idx: usize,
    pub num_partitions: usize,
    pub log2_cu_size: usize,
    pub depth: usize,
    pub flags: u32,
}

impl CUGeom {
    pub const PRESENT: u32 = 1 << 0;
    pub const SPLIT_MANDATORY: u32 = 1 << 1;
    pub const SPLIT: u32 = 1 << 2;
    pub const LEAF: u32 = 1 << 3;

    pub const MAX_GEOMS: usize = 85;

    /// At least one sample of the CU lies inside the picture.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.flags & Self::PRESENT != 0
    }

    /// The CU straddles the picture edge and has to be split.
    #[inline]
    pub fn is_split_mandatory(&self) -> bool {
        self.flags & Self::SPLIT_MANDATORY != 0
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.flags & Self::LEAF != 0
    }

    /// Index of child `q` (0..4) in the descriptor array, given this CU's
    /// own index.
    #[inline]
    pub fn child_idx(&self, cu_idx: usize, q: usize) -> usize {
        debug_assert!(!self.is_leaf());
        cu_idx + self.child_offset + q
    }
}

/// Describes every candidate CU of the CTU whose top-left sample is at
/// (`ctu_pel_x`, `ctu_pel_y`), from `max_cu_size` down to `min_cu_size`.
pub fn calc_ctu_geoms(
    pic_width: usize,
    pic_height: usize,
    ctu_pel_x: usize,
    ctu_pel_y: usize,
    max_cu_size: usize,
    min_cu_size: usize,
) -> Vec<CUGeom> {
    let log2_max = max_cu_size.trailing_zeros() as usize;
    let log2_min = min_cu_size.trailing_zeros() as usize;
    debug_assert!(log2_max <= MAX_LOG2_CU_SIZE && log2_min >= MIN_LOG2_CU_SIZE && log2_min <= log2_max);

    let mut geoms = Vec::with_capacity(CUGeom::MAX_GEOMS);
    let mut range_cu_idx = 0;

    for log2_cu_size in (log2_min..=log2_max).rev() {
        let block_size = 1 << log2_cu_size;
        let sb_width = 1 << (log2_max - log2_cu_size);
        let last_level = log2_cu_size == log2_min;

        geoms.resize(range_cu_idx + sb_width * sb_width, CUGeom::default());

        for sb_y in 0..sb_width {
            for sb_x in 0..sb_width {
                let depth_idx = depth_scan_idx[sb_y][sb_x] as usize;
                let cu_idx = range_cu_idx + depth_idx;
                let child_idx = range_cu_idx + sb_width * sb_width + (depth_idx << 2);
                let px = ctu_pel_x + sb_x * block_size;
                let py = ctu_pel_y + sb_y * block_size;

                let present = px < pic_width && py < pic_height;
                let split_mandatory =
                    present && !last_level && (px + block_size > pic_width || py + block_size > pic_height);

                /* offset of the CU from the CTU origin, in 8x8 blocks */
                let x_offset = (sb_x * block_size) >> 3;
                let y_offset = (sb_y * block_size) >> 3;

                let mut flags = 0;
                if present {
                    flags |= CUGeom::PRESENT;
                }
                if split_mandatory {
                    flags |= CUGeom::SPLIT_MANDATORY | CUGeom::SPLIT;
                }
                if last_level {
                    flags |= CUGeom::LEAF;
                }

                geoms[cu_idx] = CUGeom {
                    child_offset: child_idx - cu_idx,
                    encode_idx: depth_scan_idx[y_offset][x_offset] as usize * 4,
                    num_partitions: NUM_CU_PARTITIONS >> ((MAX_LOG2_CU_SIZE - log2_cu_size) * 2),
                    log2_cu_size,
                    depth: log2_max - log2_cu_size,
                    flags,
                };
            }
        }

        range_cu_idx += sb_width * sb_width;
    }

    geoms
}

impl CUData {
    /// Candidate CU descriptors of this CTU, clipped against the picture
    /// edges of `frame`.
    pub fn calc_ctu_geoms(&self, frame: &FrameData, max_cu_size: usize, min_cu_size: usize) -> Vec<CUGeom> {
        let sps = &frame.slice().sps;
        calc_ctu_geoms(
            sps.pic_width_in_luma_samples,
            sps.pic_height_in_luma_samples,
            self.cu_pel_x,
            self.cu_pel_y,
            max_cu_size,
            min_cu_size,
        )
    }
}

/// Descriptor arrays for the distinct CTU shapes of a picture. Only the
/// last CTU column and row can be clipped, so there are at most four:
/// interior, right edge, bottom edge and bottom-right corner.
pub struct CTUGeomMap {
    geoms: Vec<Vec<CUGeom>>,
    ctu_class: Box<[u8]>,
}

impl CTUGeomMap {
    pub fn new(sps: &Sps, max_cu_size: usize, min_cu_size: usize) -> Self {
        let width = sps.pic_width_in_luma_samples;
        let height = sps.pic_height_in_luma_samples;

        /* CTU extent inside the picture, which fixes its descriptors */
        let extent = |addr: usize| {
            let pel_x = (addr % sps.num_cu_in_width) * max_cu_size;
            let pel_y = (addr / sps.num_cu_in_width) * max_cu_size;
            (
                std::cmp::min(width - pel_x, max_cu_size),
                std::cmp::min(height - pel_y, max_cu_size),
            )
        };

        let mut classes: Vec<(usize, usize)> = Vec::with_capacity(4);
        let mut geoms = Vec::with_capacity(4);
        let mut ctu_class = vec![0u8; sps.num_cus_in_frame].into_boxed_slice();

        for addr in 0..sps.num_cus_in_frame {
            let key = extent(addr);
            let class = match classes.iter().position(|&k| k == key) {
                Some(class) => class,
                None => {
                    let (w, h) = key;
                    geoms.push(calc_ctu_geoms(w, h, 0, 0, max_cu_size, min_cu_size));
                    classes.push(key);
                    classes.len() - 1
                }
            };
            ctu_class[addr] = class as u8;
        }

        debug!(
            "CTU geometry for {}x{}: {} shape(s) over {} CTUs",
            width,
            height,
            geoms.len(),
            sps.num_cus_in_frame
        );

        CTUGeomMap { geoms, ctu_class }
    }

    pub fn num_classes(&self) -> usize {
        self.geoms.len()
    }

    /// Descriptors of CTU `cu_addr`.
    pub fn get(&self, cu_addr: usize) -> &[CUGeom] {
        &self.geoms[self.ctu_class[cu_addr] as usize]
    }
}
