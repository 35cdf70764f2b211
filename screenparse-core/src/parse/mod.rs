pub mod caption;
pub mod engine;
pub mod fusion;
pub mod normalize;
pub mod overlay;
