#![no_std]

pub mod device;
pub mod driver;
pub mod mutex;

use embedded_hal::digital::Error as HalError;

/// A trait for multiplexers that route one of several channels onto a
/// shared common line, handing out a handle per selectable channel.
pub trait Multiplexer {
    type Error: HalError;

    type Channel<'a>
    where
        Self: 'a;

    /// Returns a handle for channel `index`, or `None` if the chip has no
    /// such channel.
    fn mux_channel(&self, index: u8) -> Option<Self::Channel<'_>>;
}
