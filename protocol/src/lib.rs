pub mod gpio;
pub mod topics;
pub mod transport;
