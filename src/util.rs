use crate::def::*;
use crate::mv::MV;

#[inline]
pub(crate) fn clip3<T: PartialOrd>(min_x: T, max_x: T, value: T) -> T {
    if value < min_x {
        min_x
    } else if value > max_x {
        max_x
    } else {
        value
    }
}

/* Raster address predicates. `num_units_per_row` is a power of two. */

#[inline]
pub(crate) fn is_equal_col(addr_a: usize, addr_b: usize, num_units_per_row: usize) -> bool {
    ((addr_a ^ addr_b) & (num_units_per_row - 1)) == 0
}

#[inline]
pub(crate) fn is_equal_row(addr_a: usize, addr_b: usize, num_units_per_row: usize) -> bool {
    ((addr_a ^ addr_b) & !(num_units_per_row - 1)) == 0
}

#[inline]
pub(crate) fn is_equal_row_or_col(addr_a: usize, addr_b: usize, num_units_per_row: usize) -> bool {
    is_equal_col(addr_a, addr_b, num_units_per_row) || is_equal_row(addr_a, addr_b, num_units_per_row)
}

#[inline]
pub(crate) fn is_zero_col(addr: usize, num_units_per_row: usize) -> bool {
    (addr & (num_units_per_row - 1)) == 0
}

#[inline]
pub(crate) fn is_zero_row(addr: usize, num_units_per_row: usize) -> bool {
    (addr & !(num_units_per_row - 1)) == 0
}

#[inline]
pub(crate) fn less_than_col(addr: usize, val: usize, num_units_per_row: usize) -> bool {
    (addr & (num_units_per_row - 1)) < val
}

#[inline]
pub(crate) fn less_than_row(addr: usize, val: usize, num_units_per_row: usize) -> bool {
    addr < val * num_units_per_row
}

/* scale by a 1/256 fixed point factor, rounding half away from zero */
pub(crate) fn scale_mv(mv: MV, scale: i32) -> MV {
    let scale_comp = |c: i16| {
        let p = scale * c as i32;
        clip3(-32768, 32767, (p + 127 + (p < 0) as i32) >> 8) as i16
    };
    MV::new(scale_comp(mv.x), scale_comp(mv.y))
}

/* Calls `f(start, len)` for each z-scan run covered by PU `pu_idx` of a CU
 * whose quarter holds `q` units and whose first unit is `abs`. */
pub(crate) fn for_each_pu_range<F: FnMut(usize, usize)>(
    part_size: PartSize,
    abs: usize,
    q: usize,
    pu_idx: usize,
    mut f: F,
) {
    use crate::def::PartSize::*;
    match part_size {
        SIZE_2Nx2N => f(abs, 4 * q),
        SIZE_2NxN => f(abs, 2 * q),
        SIZE_Nx2N => {
            f(abs, q);
            f(abs + 2 * q, q);
        }
        SIZE_NxN => f(abs, q),
        SIZE_2NxnU => {
            if pu_idx == 0 {
                f(abs, q >> 1);
                f(abs + q, q >> 1);
            } else {
                f(abs, q >> 1);
                f(abs + q, (q >> 1) + (q << 1));
            }
        }
        SIZE_2NxnD => {
            if pu_idx == 0 {
                f(abs, (q << 1) + (q >> 1));
                f(abs + (q << 1) + q, q >> 1);
            } else {
                f(abs, q >> 1);
                f(abs + q, q >> 1);
            }
        }
        SIZE_nLx2N => {
            if pu_idx == 0 {
                f(abs, q >> 2);
                f(abs + (q >> 1), q >> 2);
                f(abs + (q << 1), q >> 2);
                f(abs + (q << 1) + (q >> 1), q >> 2);
            } else {
                f(abs, q >> 2);
                f(abs + (q >> 1), q + (q >> 2));
                f(abs + (q << 1), q >> 2);
                f(abs + (q << 1) + (q >> 1), q + (q >> 2));
            }
        }
        SIZE_nRx2N => {
            if pu_idx == 0 {
                f(abs, q + (q >> 2));
                f(abs + q + (q >> 1), q >> 2);
                f(abs + (q << 1), q + (q >> 2));
                f(abs + (q << 1) + q + (q >> 1), q >> 2);
            } else {
                f(abs, q >> 2);
                f(abs + (q >> 1), q >> 2);
                f(abs + (q << 1), q >> 2);
                f(abs + (q << 1) + (q >> 1), q >> 2);
            }
        }
        SIZE_NONE => debug_assert!(false, "unexpected part type"),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn raster_predicates() {
        let n = NUM_PART_IN_CU_SIZE;
        assert!(is_zero_col(0, n));
        assert!(is_zero_col(2 * n, n));
        assert!(!is_zero_col(2 * n + 1, n));
        assert!(is_zero_row(n - 1, n));
        assert!(!is_zero_row(n, n));
        assert!(is_equal_col(3, 5 * n + 3, n));
        assert!(is_equal_row(5 * n, 5 * n + 7, n));
        assert!(!is_equal_row_or_col(n + 1, 2 * n + 2, n));
        assert!(less_than_col(n + 3, 4, n));
        assert!(!less_than_row(4 * n, 4, n));
    }

    #[test]
    fn scale_mv_rounds_and_clips() {
        assert_eq!(scale_mv(MV::new(4, -4), 128), MV::new(2, -2));
        assert_eq!(scale_mv(MV::new(1, -1), 256), MV::new(1, -1));
        assert_eq!(scale_mv(MV::new(32767, -32768), 4095), MV::new(32767, -32768));
    }

    #[test]
    fn pu_ranges_cover_the_cu_once() {
        use crate::def::PartSize::*;
        let q = 16;
        for &ps in &[
            SIZE_2Nx2N, SIZE_2NxN, SIZE_Nx2N, SIZE_NxN, SIZE_2NxnU, SIZE_2NxnD, SIZE_nLx2N,
            SIZE_nRx2N,
        ] {
            let mut covered = [0u8; 64];
            let pus = ps.num_parts();
            for pu in 0..pus {
                let base = pu_base(ps, pu, 4 * q);
                for_each_pu_range(ps, base, q, pu, |start, len| {
                    for c in &mut covered[start..start + len] {
                        *c += 1;
                    }
                });
            }
            assert!(covered.iter().all(|&c| c == 1), "{:?}", ps);
        }
    }

    fn pu_base(ps: PartSize, pu: usize, n: usize) -> usize {
        (crate::tbl::part_addr_table[ps as usize][pu] as usize * n) >> 4
    }
}
