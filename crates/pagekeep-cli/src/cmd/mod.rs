pub mod organise;
pub mod retention;
