mod player;
mod season;

pub use player::*;
pub use season::*;
