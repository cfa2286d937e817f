//! Frame encoding pipeline: serpentine addressing, photometric correction and
//! wire frame assembly.

pub mod correction;
pub mod encoder;
pub mod hex;
pub mod mapping;

pub use correction::correct;
pub use encoder::{encode, PixelEncoder};
pub use hex::to_hex_string;
pub use mapping::{map_index, AddressTable};
