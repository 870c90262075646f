//! Protocol message models
//!
//! Model paket nyata yang didefinisikan dengan `#[derive(TlvModel)]`:
//! - dv: advertisement distance-vector routing + prefix operations
//! - svs: state vector untuk State Vector Sync

pub mod dv;
pub mod svs;

pub use dv::{
    Advertisement, AdvEntry, Destination, DvPacket, PrefixOpAdd, PrefixOpList, PrefixOpRemove,
};
pub use svs::{StateVector, StateVectorAppParam, StateVectorEntry};
