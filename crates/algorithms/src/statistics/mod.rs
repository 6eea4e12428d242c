//! Statistical reductions over regions

mod zonal;

pub use zonal::{region_mean, region_statistics, RegionStatistics};
