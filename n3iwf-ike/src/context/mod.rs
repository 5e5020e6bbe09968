//! Per-UE security association state: the IKE SA, the child SAs under it and
//! the stores that own them

pub mod child_sa;
pub mod ike_sa;
pub mod store;
pub mod ue;

pub use child_sa::{ChildKeys, ChildSa};
pub use ike_sa::{IkeSa, IkeState};
pub use ue::IkeUe;
