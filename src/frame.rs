use std::mem;
use std::sync::Arc;

use log::*;

use crate::api::*;
use crate::cu::CUData;
use crate::def::*;

/*****************************************************************************
 * per picture coding data
 *****************************************************************************/

/// Coding data of one picture: its slice header and one resident CTU
/// instance per CTU address. Reference pictures are shared read-only
/// through `Arc` once encoded.
pub struct FrameData {
    slice: Arc<Slice>,
    /* every CU of the picture is coded with transquant bypass */
    lossless: bool,
    pic_ctus: Vec<CUData>,
}

impl FrameData {
    pub fn new(cfg: &EncoderConfig, slice: Slice) -> Self {
        let num_cus = slice.sps.num_cus_in_frame;
        let pic_ctus = (0..num_cus)
            .map(|_| {
                let mut ctu = CUData::default();
                ctu.initialize(NUM_CU_PARTITIONS, MAX_CU_SIZE, cfg.chroma_sampling);
                ctu
            })
            .collect();

        debug!(
            "frame POC {} ({}): {} CTUs of {} bytes",
            slice.poc,
            slice.slice_type,
            num_cus,
            NUM_CU_PARTITIONS * BYTES_PER_PARTITION
        );

        FrameData {
            slice: Arc::new(slice),
            lossless: cfg.lossless,
            pic_ctus,
        }
    }

    #[inline]
    pub fn slice(&self) -> &Slice {
        &self.slice
    }

    #[inline]
    pub fn slice_arc(&self) -> &Arc<Slice> {
        &self.slice
    }

    #[inline]
    pub fn poc(&self) -> i32 {
        self.slice.poc
    }

    #[inline]
    pub fn lossless(&self) -> bool {
        self.lossless
    }

    #[inline]
    pub fn num_cu_in_width(&self) -> usize {
        self.slice.sps.num_cu_in_width
    }

    #[inline]
    pub fn num_cus(&self) -> usize {
        self.pic_ctus.len()
    }

    #[inline]
    pub fn get_pic_ctu(&self, cu_addr: usize) -> &CUData {
        &self.pic_ctus[cu_addr]
    }

    #[inline]
    pub fn get_pic_ctu_mut(&mut self, cu_addr: usize) -> &mut CUData {
        &mut self.pic_ctus[cu_addr]
    }

    /// Starts the encode of CTU `cu_addr` with `qp`. From here on the CTU
    /// is visible to neighbour and collocated lookups.
    pub fn init_pic_ctu(&mut self, cu_addr: usize, qp: i32) {
        let mut ctu = mem::take(&mut self.pic_ctus[cu_addr]);
        ctu.init_ctu(self, cu_addr, qp);
        self.pic_ctus[cu_addr] = ctu;
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::*;

    pub(crate) fn config(width: usize, height: usize) -> EncoderConfig {
        EncoderConfig::new(width, height)
    }

    /// A frame of `cfg` whose slice predicts from `l0` and `l1`.
    pub(crate) fn frame(
        cfg: &EncoderConfig,
        slice_type: SliceType,
        poc: i32,
        l0: &[Arc<FrameData>],
        l1: &[Arc<FrameData>],
    ) -> FrameData {
        let sps = Arc::new(Sps::new(cfg).unwrap());
        let pps = Arc::new(Pps::new(cfg).unwrap());
        let mut slice = Slice::new(cfg, sps, pps, slice_type, poc).unwrap();
        slice.set_ref_pic_list(REF_PIC_LIST_0, l0);
        slice.set_ref_pic_list(REF_PIC_LIST_1, l1);
        FrameData::new(cfg, slice)
    }
}
