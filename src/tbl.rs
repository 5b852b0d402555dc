use crate::def::*;

/* Partition table, indexed by partition mode and partition index.
 * Entry 0 holds the size, entry 1 the offset, each packed as two 4-bit
 * (X, Y) values counted in quarters of the CU size. */
#[rustfmt::skip]
pub(crate) static part_table: [[[u8; 2]; 4]; 8] =
[
    //  XY
    [ [ 0x44, 0x00 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_2Nx2N
    [ [ 0x42, 0x00 ], [ 0x42, 0x02 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_2NxN
    [ [ 0x24, 0x00 ], [ 0x24, 0x20 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_Nx2N
    [ [ 0x22, 0x00 ], [ 0x22, 0x20 ], [ 0x22, 0x02 ], [ 0x22, 0x22 ] ], // SIZE_NxN
    [ [ 0x41, 0x00 ], [ 0x43, 0x01 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_2NxnU
    [ [ 0x43, 0x00 ], [ 0x41, 0x03 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_2NxnD
    [ [ 0x14, 0x00 ], [ 0x34, 0x10 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_nLx2N
    [ [ 0x34, 0x00 ], [ 0x14, 0x30 ], [ 0x00, 0x00 ], [ 0x00, 0x00 ] ], // SIZE_nRx2N
];

/* First z-scan unit of each partition, in sixteenths of the CU */
#[rustfmt::skip]
pub(crate) static part_addr_table: [[u8; 4]; 8] =
[
    [ 0x00, 0x00, 0x00, 0x00 ], // SIZE_2Nx2N
    [ 0x00, 0x08, 0x08, 0x08 ], // SIZE_2NxN
    [ 0x00, 0x04, 0x04, 0x04 ], // SIZE_Nx2N
    [ 0x00, 0x04, 0x08, 0x0C ], // SIZE_NxN
    [ 0x00, 0x02, 0x02, 0x02 ], // SIZE_2NxnU
    [ 0x00, 0x0A, 0x0A, 0x0A ], // SIZE_2NxnD
    [ 0x00, 0x01, 0x01, 0x01 ], // SIZE_nLx2N
    [ 0x00, 0x05, 0x05, 0x05 ], // SIZE_nRx2N
];

/* z-order index of each 8x8 block of a 64x64 CTU, [y][x] */
#[rustfmt::skip]
pub static depth_scan_idx: [[u32; 8]; 8] =
[
    [  0,  1,  4,  5, 16, 17, 20, 21 ],
    [  2,  3,  6,  7, 18, 19, 22, 23 ],
    [  8,  9, 12, 13, 24, 25, 28, 29 ],
    [ 10, 11, 14, 15, 26, 27, 30, 31 ],
    [ 32, 33, 36, 37, 48, 49, 52, 53 ],
    [ 34, 35, 38, 39, 50, 51, 54, 55 ],
    [ 40, 41, 44, 45, 56, 57, 60, 61 ],
    [ 42, 43, 46, 47, 58, 59, 62, 63 ],
];

/* luma to chroma intra angle for 4:2:2 */
#[rustfmt::skip]
pub static chroma_422_intra_angle_mapping: [u8; 36] =
[
    0, 1, 2, 2, 2, 2, 3, 5, 7, 8, 10, 11, 13, 15, 16, 18, 19, 20,
    21, 22, 23, 23, 24, 24, 25, 25, 26, 27, 27, 28, 28, 29, 29, 30, 31,
    DM_CHROMA_IDX as u8,
];

lazy_static! {
    pub static ref zscan_to_raster: Box<[usize]> = {
        let mut tbl = vec![0; NUM_CU_PARTITIONS].into_boxed_slice();
        for z in 0..NUM_CU_PARTITIONS {
            let (x, y) = morton_decode(z);
            tbl[z] = y * NUM_PART_IN_CU_SIZE + x;
        }
        tbl
    };

    pub static ref raster_to_zscan: Box<[usize]> = {
        let mut tbl = vec![0; NUM_CU_PARTITIONS].into_boxed_slice();
        for z in 0..NUM_CU_PARTITIONS {
            tbl[zscan_to_raster[z]] = z;
        }
        tbl
    };

    pub static ref zscan_to_pel_x: Box<[usize]> = {
        let mut tbl = vec![0; NUM_CU_PARTITIONS].into_boxed_slice();
        for z in 0..NUM_CU_PARTITIONS {
            tbl[z] = (zscan_to_raster[z] % NUM_PART_IN_CU_SIZE) << LOG2_UNIT_SIZE;
        }
        tbl
    };

    pub static ref zscan_to_pel_y: Box<[usize]> = {
        let mut tbl = vec![0; NUM_CU_PARTITIONS].into_boxed_slice();
        for z in 0..NUM_CU_PARTITIONS {
            tbl[z] = (zscan_to_raster[z] / NUM_PART_IN_CU_SIZE) << LOG2_UNIT_SIZE;
        }
        tbl
    };

    /* coefficient scans for 4x4 up to 32x32 TUs, organised in 4x4 groups */
    pub static ref scan_order: [[Box<[u16]>; NUM_SCAN_SIZE]; NUM_SCAN_TYPE] = {
        let types = [ScanType::SCAN_DIAG, ScanType::SCAN_HOR, ScanType::SCAN_VER];
        let mk = |t: ScanType| [
            coef_group_scan(t, 2),
            coef_group_scan(t, 3),
            coef_group_scan(ScanType::SCAN_DIAG, 4),
            coef_group_scan(ScanType::SCAN_DIAG, 5),
        ];
        [mk(types[0]), mk(types[1]), mk(types[2])]
    };

    /* scans over the coefficient groups themselves */
    pub static ref scan_order_cg: [[Box<[u16]>; NUM_SCAN_SIZE]; NUM_SCAN_TYPE] = {
        let types = [ScanType::SCAN_DIAG, ScanType::SCAN_HOR, ScanType::SCAN_VER];
        let mk = |t: ScanType| [
            block_scan(t, 1),
            block_scan(t, 2),
            block_scan(ScanType::SCAN_DIAG, 4),
            block_scan(ScanType::SCAN_DIAG, 8),
        ];
        [mk(types[0]), mk(types[1]), mk(types[2])]
    };
}

/* even bits carry x, odd bits carry y */
fn morton_decode(z: usize) -> (usize, usize) {
    let (mut x, mut y) = (0, 0);
    for bit in 0..MAX_FULL_DEPTH {
        x |= ((z >> (2 * bit)) & 1) << bit;
        y |= ((z >> (2 * bit + 1)) & 1) << bit;
    }
    (x, y)
}

/* raster positions of a size x size block in the given scan */
pub(crate) fn block_scan(scan_type: ScanType, size: usize) -> Box<[u16]> {
    let mut scan = vec![0u16; size * size].into_boxed_slice();
    let mut pos = 0;

    match scan_type {
        ScanType::SCAN_DIAG => {
            /* up-right diagonals, each walked from its bottom-left end */
            for line in 0..(2 * size - 1) {
                let mut y = std::cmp::min(line, size - 1) as isize;
                let mut x = line as isize - y;
                while y >= 0 && (x as usize) < size {
                    scan[pos] = (y as usize * size + x as usize) as u16;
                    pos += 1;
                    x += 1;
                    y -= 1;
                }
            }
        }
        ScanType::SCAN_HOR => {
            for y in 0..size {
                for x in 0..size {
                    scan[pos] = (y * size + x) as u16;
                    pos += 1;
                }
            }
        }
        ScanType::SCAN_VER => {
            for x in 0..size {
                for y in 0..size {
                    scan[pos] = (y * size + x) as u16;
                    pos += 1;
                }
            }
        }
    }

    scan
}

fn coef_group_scan(scan_type: ScanType, log2_size: usize) -> Box<[u16]> {
    let size = 1 << log2_size;
    let num_cg = size >> 2;
    let cg_scan = block_scan(scan_type, num_cg);
    let sub_scan = block_scan(scan_type, 4);

    let mut scan = vec![0u16; size * size].into_boxed_slice();
    let mut pos = 0;
    for &cg in cg_scan.iter() {
        let cg_x = (cg as usize % num_cg) << 2;
        let cg_y = (cg as usize / num_cg) << 2;
        for &p in sub_scan.iter() {
            let x = cg_x + (p as usize & 3);
            let y = cg_y + (p as usize >> 2);
            scan[pos] = (y * size + x) as u16;
            pos += 1;
        }
    }

    scan
}
