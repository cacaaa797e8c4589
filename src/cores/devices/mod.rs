pub mod device_controller;
pub mod remote;
