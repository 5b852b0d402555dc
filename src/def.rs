use std::sync::{Arc, Weak};

use log::*;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::api::*;
use crate::frame::FrameData;

/*****************************************************************************
 * types
 *****************************************************************************/
pub type Coeff = i16;

/*****************************************************************************
 * coding tree geometry
 *****************************************************************************/
/* minimum partition unit: 4x4 luma samples */
pub const LOG2_UNIT_SIZE: usize = 2;
pub const UNIT_SIZE: usize = (1 << LOG2_UNIT_SIZE);

pub const MAX_LOG2_CU_SIZE: usize = 6;
pub const MAX_CU_SIZE: usize = (1 << MAX_LOG2_CU_SIZE);
pub const MIN_LOG2_CU_SIZE: usize = 3;
pub const MIN_CU_SIZE: usize = (1 << MIN_LOG2_CU_SIZE);

/* quadtree depth from the CTU down to the 4x4 unit */
pub const MAX_FULL_DEPTH: usize = MAX_LOG2_CU_SIZE - LOG2_UNIT_SIZE;
pub const NUM_CU_PARTITIONS: usize = (1 << (MAX_FULL_DEPTH << 1));
/* units along one CTU edge */
pub const NUM_PART_IN_CU_SIZE: usize = (1 << MAX_FULL_DEPTH);

/* bytes of attribute data stored per 4x4 unit */
pub const BYTES_PER_PARTITION: usize = 20;

/*****************************************************************************
 * prediction
 *****************************************************************************/
pub const REF_PIC_LIST_0: usize = 0;
pub const REF_PIC_LIST_1: usize = 1;
pub const MAX_NUM_REF: usize = 16;
pub const NOT_VALID: i8 = -1;

pub const AMVP_NUM_CANDS: usize = 2;
pub const MRG_MAX_NUM_CANDS: usize = 5;
/* spatial candidates in both orders plus the temporal one */
pub const MAX_NUM_MVC: usize = (MvpDir::MD_ABOVE_LEFT as usize + 1) * 2 + 1;

/* temporal MVs are stored at 16x16 granularity */
pub const TMVP_UNIT_MASK: usize = 0xF0;

pub const PLANAR_IDX: u32 = 0;
pub const DC_IDX: u32 = 1;
pub const HOR_IDX: u32 = 10;
pub const VER_IDX: u32 = 26;
pub const DM_CHROMA_IDX: u32 = 36;
pub const NUM_CHROMA_MODE: usize = 5;

/* mode dependent coefficient scan */
pub const MDCS_LOG2_MAX_SIZE: usize = 3;
pub const MDCS_ANGLE_LIMIT: i32 = 4;

/* spatial MVP neighbour directions */
#[allow(non_camel_case_types)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MvpDir {
    MD_LEFT = 0,
    MD_ABOVE = 1,
    MD_ABOVE_RIGHT = 2,
    MD_BELOW_LEFT = 3,
    MD_ABOVE_LEFT = 4,
}

pub const NUM_MVP_DIR: usize = 5;

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum PartSize {
    SIZE_2Nx2N = 0,
    SIZE_2NxN = 1,
    SIZE_Nx2N = 2,
    SIZE_NxN = 3,
    SIZE_2NxnU = 4,
    SIZE_2NxnD = 5,
    SIZE_nLx2N = 6,
    SIZE_nRx2N = 7,
    SIZE_NONE = 15,
}

impl From<u8> for PartSize {
    fn from(val: u8) -> Self {
        PartSize::from_u8(val).unwrap_or(PartSize::SIZE_NONE)
    }
}

impl Default for PartSize {
    fn default() -> Self {
        PartSize::SIZE_NONE
    }
}

impl PartSize {
    pub fn num_parts(self) -> usize {
        use self::PartSize::*;
        match self {
            SIZE_2Nx2N => 1,
            SIZE_NxN => 4,
            SIZE_NONE => 0,
            _ => 2,
        }
    }
}

/* skip implies inter, so MODE_SKIP carries the MODE_INTER bit */
#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum PredMode {
    MODE_NONE = 0,
    MODE_INTER = 1,
    MODE_INTRA = 2,
    MODE_SKIP = 5,
}

impl From<u8> for PredMode {
    fn from(val: u8) -> Self {
        PredMode::from_u8(val).unwrap_or(PredMode::MODE_NONE)
    }
}

impl Default for PredMode {
    fn default() -> Self {
        PredMode::MODE_NONE
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ScanType {
    SCAN_DIAG = 0,
    SCAN_HOR = 1,
    SCAN_VER = 2,
}

pub const NUM_SCAN_TYPE: usize = 3;
/* 4x4, 8x8, 16x16, 32x32 */
pub const NUM_SCAN_SIZE: usize = 4;

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum TextType {
    TEXT_LUMA = 0,
    TEXT_CHROMA_U = 1,
    TEXT_CHROMA_V = 2,
}

/*****************************************************************************
 * parameter sets
 *****************************************************************************/
#[derive(Debug, Clone)]
pub struct Sps {
    pub chroma_format: ChromaSampling,
    pub pic_width_in_luma_samples: usize,
    pub pic_height_in_luma_samples: usize,
    pub num_cu_in_width: usize,
    pub num_cu_in_height: usize,
    pub num_cus_in_frame: usize,

    pub max_cu_size: usize,
    pub min_cu_size: usize,

    pub quadtree_tu_log2_max_size: u32,
    pub quadtree_tu_log2_min_size: u32,
    pub quadtree_tu_max_depth_inter: u32,
    pub quadtree_tu_max_depth_intra: u32,
}

impl Sps {
    pub fn new(cfg: &EncoderConfig) -> Result<Self, Error> {
        cfg.validate()?;

        let num_cu_in_width = (cfg.width + cfg.max_cu_size - 1) / cfg.max_cu_size;
        let num_cu_in_height = (cfg.height + cfg.max_cu_size - 1) / cfg.max_cu_size;

        Ok(Sps {
            chroma_format: cfg.chroma_sampling,
            pic_width_in_luma_samples: cfg.width,
            pic_height_in_luma_samples: cfg.height,
            num_cu_in_width,
            num_cu_in_height,
            num_cus_in_frame: num_cu_in_width * num_cu_in_height,
            max_cu_size: cfg.max_cu_size,
            min_cu_size: cfg.min_cu_size,
            quadtree_tu_log2_max_size: cfg.tu_log2_max_size as u32,
            quadtree_tu_log2_min_size: cfg.tu_log2_min_size as u32,
            quadtree_tu_max_depth_inter: cfg.tu_max_depth_inter as u32,
            quadtree_tu_max_depth_intra: cfg.tu_max_depth_intra as u32,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pps {
    pub max_cu_dqp_depth: u32,
    pub transquant_bypass_enabled: bool,
    pub entropy_coding_sync_enabled: bool,
}

impl Pps {
    pub fn new(cfg: &EncoderConfig) -> Result<Self, Error> {
        cfg.check_ranges()?;

        Ok(Pps {
            max_cu_dqp_depth: cfg.max_cu_dqp_depth as u32,
            transquant_bypass_enabled: cfg.lossless || cfg.cu_lossless,
            entropy_coding_sync_enabled: cfg.entropy_coding_sync,
        })
    }
}

/*****************************************************************************
 * slice header
 *****************************************************************************/
pub struct Slice {
    pub sps: Arc<Sps>,
    pub pps: Arc<Pps>,

    pub slice_type: SliceType,
    pub poc: i32,
    pub slice_qp: i32,
    pub max_num_merge_cand: usize,

    pub num_ref_idx: [usize; 2],
    pub ref_poc_list: [[i32; MAX_NUM_REF + 1]; 2],
    /* non-owning, the reference picture buffer keeps frames alive */
    pub ref_pic_list: [Vec<Weak<FrameData>>; 2],

    /* collocated picture selection for TMVP */
    pub col_from_l0: bool,
    pub col_ref_idx: usize,
    /* all references precede the current picture in output order */
    pub check_ldc: bool,
}

impl Slice {
    pub fn new(
        cfg: &EncoderConfig,
        sps: Arc<Sps>,
        pps: Arc<Pps>,
        slice_type: SliceType,
        poc: i32,
    ) -> Result<Self, Error> {
        cfg.check_ranges()?;

        Ok(Slice {
            sps,
            pps,
            slice_type,
            poc,
            slice_qp: cfg.qp as i32,
            max_num_merge_cand: cfg.max_num_merge_cand,
            num_ref_idx: [0; 2],
            ref_poc_list: [[0; MAX_NUM_REF + 1]; 2],
            ref_pic_list: [Vec::new(), Vec::new()],
            col_from_l0: false,
            col_ref_idx: 0,
            check_ldc: false,
        })
    }

    pub fn set_ref_pic_list(&mut self, list: usize, refs: &[Arc<FrameData>]) {
        debug_assert!(refs.len() <= MAX_NUM_REF);

        self.num_ref_idx[list] = refs.len();
        self.ref_pic_list[list] = refs.iter().map(Arc::downgrade).collect();
        for (i, r) in refs.iter().enumerate() {
            self.ref_poc_list[list][i] = r.poc();
        }

        let poc = self.poc;
        self.check_ldc = (0..2).all(|l| {
            self.ref_poc_list[l][..self.num_ref_idx[l]]
                .iter()
                .all(|&ref_poc| ref_poc <= poc)
        });

        trace!(
            "POC {} L{} refs {:?}",
            poc,
            list,
            &self.ref_poc_list[list][..self.num_ref_idx[list]]
        );
    }

    #[inline]
    pub fn is_intra(&self) -> bool {
        self.slice_type == SliceType::I_SLICE
    }

    #[inline]
    pub fn is_inter_p(&self) -> bool {
        self.slice_type == SliceType::P_SLICE
    }

    #[inline]
    pub fn is_inter_b(&self) -> bool {
        self.slice_type == SliceType::B_SLICE
    }

    pub(crate) fn col_pic(&self) -> Option<Arc<FrameData>> {
        let list = if self.is_inter_b() {
            1 - self.col_from_l0 as usize
        } else {
            0
        };
        self.ref_pic_list[list]
            .get(self.col_ref_idx)
            .and_then(Weak::upgrade)
    }
}
