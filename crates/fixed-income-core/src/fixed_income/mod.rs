pub mod bonds;
pub mod cashflows;
pub mod curves;
pub mod duration;
pub mod instruments;
pub mod spreads;
pub mod yields;

pub use instruments::{
    Bond, CallableBond, ExerciseDate, FixedRateBond, FloatingRateNote, PutableBond,
    ZeroCouponBond,
};
