pub mod pack;
pub mod resolver;
