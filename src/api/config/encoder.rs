use log::*;

use crate::api::*;
use crate::def::*;

// Encoder settings which shape the CU data layout and the neighbour rules.
#[derive(Clone, Copy, Debug)]
pub struct EncoderConfig {
    // output size
    // Width of the frames in pixels.
    pub width: usize,
    // Height of the frames in pixels.
    pub height: usize,
    // Chroma subsampling.
    pub chroma_sampling: ChromaSampling,

    // coding tree
    // CTU size in pixels, fixed at 64.
    pub max_cu_size: usize,
    // Smallest CU the quadtree may reach.
    pub min_cu_size: usize,
    // Quantization group depth below the CTU.
    pub max_cu_dqp_depth: usize,

    // transform tree (log2 sizes)
    pub tu_log2_min_size: usize,
    pub tu_log2_max_size: usize,
    pub tu_max_depth_inter: usize,
    pub tu_max_depth_intra: usize,

    // The base quantizer to use.
    pub qp: u8,
    // Code every CU with transquant bypass.
    pub lossless: bool,
    // Evaluate transquant bypass per CU.
    pub cu_lossless: bool,

    pub max_num_merge_cand: usize,
    pub num_ref_frames: usize,
    // wavefront parallel processing
    pub entropy_coding_sync: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        EncoderConfig {
            width: 0,
            height: 0,
            chroma_sampling: ChromaSampling::Cs420,
            max_cu_size: MAX_CU_SIZE,
            min_cu_size: 8,
            max_cu_dqp_depth: 0,
            tu_log2_min_size: 2,
            tu_log2_max_size: 5,
            tu_max_depth_inter: 1,
            tu_max_depth_intra: 1,
            qp: 32,
            lossless: false,
            cu_lossless: false,
            max_num_merge_cand: MRG_MAX_NUM_CANDS,
            num_ref_frames: 3,
            entropy_coding_sync: false,
        }
    }
}

impl EncoderConfig {
    pub fn new(width: usize, height: usize) -> Self {
        EncoderConfig {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn log2_max_cu_size(&self) -> usize {
        self.max_cu_size.trailing_zeros() as usize
    }

    pub fn log2_min_cu_size(&self) -> usize {
        self.min_cu_size.trailing_zeros() as usize
    }

    /// Checks every setting against the supported ranges and warns about
    /// settings that have no effect.
    pub fn validate(&self) -> Result<(), Error> {
        self.check_ranges()?;

        if self.lossless && self.cu_lossless {
            warn!("cu-lossless has no effect when every CU is lossless");
        }
        if self.entropy_coding_sync && self.height <= self.max_cu_size {
            warn!("wavefront sync enabled for a single CTU row");
        }

        Ok(())
    }

    pub(crate) fn check_ranges(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.max_cu_size != MAX_CU_SIZE {
            return Err(Error::UnsupportedCtuSize(self.max_cu_size));
        }
        if !self.min_cu_size.is_power_of_two()
            || self.min_cu_size < (1 << MIN_LOG2_CU_SIZE)
            || self.min_cu_size > self.max_cu_size
        {
            return Err(Error::InvalidMinCuSize {
                min_cu_size: self.min_cu_size,
                max_cu_size: self.max_cu_size,
            });
        }
        if self.max_num_merge_cand == 0 || self.max_num_merge_cand > MRG_MAX_NUM_CANDS {
            return Err(Error::InvalidMergeCandidates(self.max_num_merge_cand));
        }
        if self.max_cu_dqp_depth > self.log2_max_cu_size() - self.log2_min_cu_size() {
            return Err(Error::InvalidDqpDepth(self.max_cu_dqp_depth));
        }
        if self.tu_log2_min_size < 2
            || self.tu_log2_max_size > 5
            || self.tu_log2_min_size > self.tu_log2_max_size
        {
            return Err(Error::InvalidTuSizeRange {
                min: self.tu_log2_min_size,
                max: self.tu_log2_max_size,
            });
        }
        for &depth in &[self.tu_max_depth_inter, self.tu_max_depth_intra] {
            if depth == 0 || depth > 4 {
                return Err(Error::InvalidTuDepth(depth));
            }
        }
        if self.num_ref_frames > MAX_NUM_REF {
            return Err(Error::TooManyReferences(self.num_ref_frames));
        }
        if self.qp > 51 {
            return Err(Error::InvalidQp(self.qp));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_is_valid_once_sized() {
        assert_eq!(
            EncoderConfig::default().validate(),
            Err(Error::InvalidDimensions {
                width: 0,
                height: 0
            })
        );
        assert_eq!(EncoderConfig::new(416, 240).validate(), Ok(()));
    }

    #[test]
    fn rejects_out_of_range_settings() {
        let mut cfg = EncoderConfig::new(416, 240);
        cfg.max_cu_size = 32;
        assert_eq!(cfg.validate(), Err(Error::UnsupportedCtuSize(32)));

        let mut cfg = EncoderConfig::new(416, 240);
        cfg.min_cu_size = 4;
        assert!(matches!(
            cfg.validate(),
            Err(Error::InvalidMinCuSize { .. })
        ));

        let mut cfg = EncoderConfig::new(416, 240);
        cfg.max_num_merge_cand = 6;
        assert_eq!(cfg.validate(), Err(Error::InvalidMergeCandidates(6)));

        let mut cfg = EncoderConfig::new(416, 240);
        cfg.min_cu_size = 16;
        cfg.max_cu_dqp_depth = 3;
        assert_eq!(cfg.validate(), Err(Error::InvalidDqpDepth(3)));

        let mut cfg = EncoderConfig::new(416, 240);
        cfg.tu_log2_min_size = 4;
        cfg.tu_log2_max_size = 3;
        assert_eq!(
            cfg.validate(),
            Err(Error::InvalidTuSizeRange { min: 4, max: 3 })
        );

        let mut cfg = EncoderConfig::new(416, 240);
        cfg.num_ref_frames = 17;
        assert_eq!(cfg.validate(), Err(Error::TooManyReferences(17)));
    }
}
