pub mod apps;
pub mod bridge;
pub mod locator;
pub mod mdns;
pub mod parse;
pub mod paths;
pub mod runner;
pub mod scrcpy;
