//! Typed cache objects: scalar, list and map views over a cache cell.

mod list;
mod map;
mod scalar;

pub use list::ListCacheObject;
pub use map::MapCacheObject;
pub use scalar::ScalarCacheObject;
