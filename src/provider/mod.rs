pub mod adapter;
pub mod image;
pub mod postprocess;
pub mod text;
