mod message;
mod product;
mod profile;

pub use message::*;
pub use product::*;
pub use profile::*;
