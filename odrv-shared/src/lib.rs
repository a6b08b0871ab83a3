pub mod device;
pub mod enums;
