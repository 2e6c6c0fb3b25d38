//! Finite-difference layer: index layout, meshers and linear operators.

pub mod layout;
pub mod meshers;
pub mod operators;

pub use layout::{FdmLinearOpIterator, FdmLinearOpLayout};
pub use meshers::{ConcentrationPoint, Fdm1dMesher, FdmMesherComposite, Mesher1d};
pub use operators::{FdmLinearOp, FdmLinearOpComposite};
