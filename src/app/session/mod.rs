pub mod device;
pub mod files;
pub mod mirror;
pub mod packages;
pub mod pairing;
pub mod tools;
