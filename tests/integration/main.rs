//! Integration tests for the NotiHub client.

mod helpers;

mod connection_test;
mod dispatch_test;
mod session_test;
mod store_test;
