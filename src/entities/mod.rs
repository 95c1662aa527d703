pub mod prelude;

pub mod episodes;
pub mod shows;
