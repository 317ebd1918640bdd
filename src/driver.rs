//! Low-level driver that directly owns the address and inhibit pins and
//! tracks which channel, if any, is routed to the common line.

use embedded_hal::digital::{Error as HalError, ErrorKind, ErrorType, OutputPin};

/// Widest supported address bus (CD4067-class parts).
pub const MAX_ADDRESS_BITS: usize = 4;

/// Possible errors from the multiplexer driver.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MuxError {
    /// The requested channel does not exist at this address width.
    InvalidChannel,
    /// Attempted to route a different channel while one is already routed.
    AlreadySelected,
    /// Underlying pin error from the HAL pin.
    PinError,
}

impl HalError for MuxError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Stand-in for an unwired inhibit line.
///
/// CD405x parts are commonly wired with INH strapped to ground; pass
/// `None::<NoInhibit>` when the line is not under software control.
pub struct NoInhibit;

impl ErrorType for NoInhibit {
    type Error = core::convert::Infallible;
}

impl OutputPin for NoInhibit {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// The low-level driver that manages the address pins and the optional
/// inhibit pin directly.
///
/// `N` is the number of address lines: 3 for CD4051-class chips (8
/// channels) or 4 for CD4067-class chips (16 channels). Address bit `i`
/// of the selected channel is driven on `addr[i]`, least-significant
/// bit first.
pub struct MuxDriver<A, I, const N: usize>
where
    A: OutputPin,
    I: OutputPin,
{
    pub(crate) addr: [A; N],
    pub(crate) inhibit: Option<I>,
    pub(crate) routed: Option<u8>,
}

/// 8-channel multiplexer with 3 address lines, e.g. CD4051.
pub type Cd4051Driver<A, I> = MuxDriver<A, I, 3>;

/// 16-channel multiplexer with 4 address lines, e.g. CD4067.
pub type Cd4067Driver<A, I> = MuxDriver<A, I, 4>;

impl<A, I, const N: usize> MuxDriver<A, I, N>
where
    A: OutputPin,
    I: OutputPin,
{
    /// Number of selectable channels at this address width.
    pub const CHANNEL_COUNT: u8 = 1 << N;

    /// Create a new driver: assert inhibit (if wired) and park the address
    /// lines at channel 0.
    ///
    /// Inhibit is asserted before the address lines move, so a half-settled
    /// address never reaches the common line before the first explicit
    /// [`select`](Self::select).
    pub fn new(addr: [A; N], inhibit: Option<I>) -> Result<Self, MuxError> {
        const {
            assert!(
                N >= 3 && N <= MAX_ADDRESS_BITS,
                "supported address widths are 3 (CD4051) and 4 (CD4067)"
            )
        };

        let mut drv = Self {
            addr,
            inhibit,
            routed: None,
        };
        drv.inhibit(true)?;
        drv.select(0)?;
        Ok(drv)
    }

    /// Drive the address lines to the binary code of `channel`,
    /// least-significant bit first.
    ///
    /// An out-of-range channel is rejected before any pin is touched, so a
    /// failed call never leaves a partial address on the wire.
    pub fn select(&mut self, channel: u8) -> Result<(), MuxError> {
        if channel >= Self::CHANNEL_COUNT {
            return Err(MuxError::InvalidChannel);
        }

        for (i, pin) in self.addr.iter_mut().enumerate() {
            if channel & (1 << i) != 0 {
                pin.set_high().map_err(|_| MuxError::PinError)?;
            } else {
                pin.set_low().map_err(|_| MuxError::PinError)?;
            }
        }

        Ok(())
    }

    /// Drive the inhibit line: `true` disconnects every channel from the
    /// common line, `false` re-enables the chip.
    ///
    /// A driver built without an inhibit pin treats this as a no-op.
    pub fn inhibit(&mut self, inhibit: bool) -> Result<(), MuxError> {
        let Some(pin) = self.inhibit.as_mut() else {
            return Ok(());
        };

        if inhibit {
            pin.set_high().map_err(|_| MuxError::PinError)
        } else {
            pin.set_low().map_err(|_| MuxError::PinError)
        }
    }

    /// Route `channel` through to the common line: write its address, then
    /// release inhibit.
    ///
    /// Fails with [`MuxError::AlreadySelected`] while a different channel
    /// holds the line. Routing the channel that already holds it is a
    /// no-op.
    pub fn route(&mut self, channel: u8) -> Result<(), MuxError> {
        if let Some(current) = self.routed {
            if current != channel {
                return Err(MuxError::AlreadySelected);
            }
            // same channel => already routed, no-op
            return Ok(());
        }

        self.select(channel)?;
        self.inhibit(false)?;
        self.routed = Some(channel);
        Ok(())
    }

    /// Cut `channel` off from the common line if it was the routed one.
    pub fn unroute(&mut self, channel: u8) -> Result<(), MuxError> {
        if self.routed == Some(channel) {
            self.inhibit(true)?;
            self.routed = None;
        }
        Ok(())
    }

    #[cfg(test)]
    /// For testing only: release the pins so we can call `.done()` on mocks.
    pub fn release(self) -> ([A; N], Option<I>) {
        (self.addr, self.inhibit)
    }
}
