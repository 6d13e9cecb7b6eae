pub mod decode;
pub mod stim;
pub mod validate;
