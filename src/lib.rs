#![allow(non_upper_case_globals)]
#![allow(clippy::too_many_arguments)]

#[macro_use]
extern crate num_derive;

#[macro_use]
extern crate lazy_static;

pub mod api;
pub mod cu;
pub mod def;
pub mod frame;
pub mod geom;
pub mod mem;
pub mod mv;
pub mod tbl;

mod util;
