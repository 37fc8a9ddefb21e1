//! Pin identities, channel capabilities and the reservation registry.

pub mod arbiter;
pub mod pin;

pub use arbiter::{PinArbiter, ReservationError, ReservationToken};
pub use pin::{
    ChannelCapabilities, ChannelConfigurationType, ChannelInfo, I2cChannelFunction, Pin,
    PinDefinitions, SpiChannelFunction, UartChannelFunction,
};
