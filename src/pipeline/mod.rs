pub mod chunk;
pub mod keys;
pub mod normalize;
pub mod stages;
pub mod validate;
