use std::fmt;

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use thiserror::Error;

pub mod config;

pub use config::*;

/*****************************************************************************
 * error codes
 *****************************************************************************/
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid picture dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("unsupported CTU size {0}, only 64 is supported")]
    UnsupportedCtuSize(usize),

    #[error("invalid minimum CU size {min_cu_size} for CTU size {max_cu_size}")]
    InvalidMinCuSize {
        min_cu_size: usize,
        max_cu_size: usize,
    },

    #[error("maximum merge candidate count {0} outside 1..=5")]
    InvalidMergeCandidates(usize),

    #[error("quantization group depth {0} exceeds the CU depth range")]
    InvalidDqpDepth(usize),

    #[error("invalid transform size range log2 {min}..={max}")]
    InvalidTuSizeRange { min: usize, max: usize },

    #[error("invalid transform tree depth {0}")]
    InvalidTuDepth(usize),

    #[error("reference count {0} exceeds 16")]
    TooManyReferences(usize),

    #[error("QP {0} outside 0..=51")]
    InvalidQp(u8),
}

#[allow(non_camel_case_types)]
#[derive(Debug, FromPrimitive, ToPrimitive, PartialEq, PartialOrd, Clone, Copy)]
#[repr(C)]
pub enum SliceType {
    B_SLICE = 0,
    P_SLICE = 1,
    I_SLICE = 2,
}

impl fmt::Display for SliceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::SliceType::*;
        match self {
            B_SLICE => write!(f, "B"),
            P_SLICE => write!(f, "P"),
            I_SLICE => write!(f, "I"),
        }
    }
}

impl From<u8> for SliceType {
    fn from(val: u8) -> Self {
        SliceType::from_u8(val).unwrap_or(SliceType::I_SLICE)
    }
}

impl Default for SliceType {
    fn default() -> Self {
        SliceType::I_SLICE
    }
}

#[derive(Copy, Clone, Debug, PartialEq, FromPrimitive)]
#[repr(C)]
pub enum ChromaSampling {
    Cs400,
    Cs420,
    Cs422,
    Cs444,
}

impl Default for ChromaSampling {
    fn default() -> Self {
        ChromaSampling::Cs420
    }
}

impl From<u8> for ChromaSampling {
    fn from(val: u8) -> Self {
        use self::ChromaSampling::*;
        match val {
            0 => Cs400,
            1 => Cs420,
            2 => Cs422,
            _ => Cs444,
        }
    }
}

impl ChromaSampling {
    // Provides the subsampling shifts in the horizontal and vertical axes.
    pub fn chroma_shift(self) -> (usize, usize) {
        use self::ChromaSampling::*;
        match self {
            Cs420 => (1, 1),
            Cs422 => (1, 0),
            Cs444 => (0, 0),
            Cs400 => (0, 0),
        }
    }
}
