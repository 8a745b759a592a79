//! Device registration for out-of-band push delivery.

pub mod client;
pub mod device;

pub use client::RegistrationClient;
pub use device::{DeviceRegistrar, load_or_create_device_id};
