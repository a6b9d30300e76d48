pub mod network;
pub mod tensor;
pub mod validation;
