use crate::Multiplexer;
use crate::driver::{MuxDriver, MuxError};
use crate::mutex::PortMutex;
use embedded_hal::digital::OutputPin;

/// High-level wrapper: a CD405x-family mux plus a PortMutex around its
/// driver, handing out one [`Channel`] handle per selectable input.
pub struct MuxDevice<M, A, I, const N: usize>
where
    M: PortMutex<Port = MuxDriver<A, I, N>>,
    A: OutputPin,
    I: OutputPin,
{
    driver: M,
}

impl<M, A, I, const N: usize> MuxDevice<M, A, I, N>
where
    M: PortMutex<Port = MuxDriver<A, I, N>>,
    A: OutputPin,
    I: OutputPin,
{
    /// Create a new device, wrapping the driver in a PortMutex (e.g. RefCell).
    pub fn new(addr: [A; N], inhibit: Option<I>) -> Self {
        let driver = MuxDriver::new(addr, inhibit).expect("Failed to init multiplexer pins");
        Self {
            driver: M::create(driver),
        }
    }

    /// Returns a handle for channel `index`, or `None` if `index` is beyond
    /// what the address width can encode.
    ///
    /// Handles may coexist; the PortMutex serializes their access to the
    /// shared address and inhibit lines.
    pub fn channel(&self, index: u8) -> Option<Channel<'_, M, A, I, N>> {
        if index < MuxDriver::<A, I, N>::CHANNEL_COUNT {
            Some(Channel::new(&self.driver, index))
        } else {
            None
        }
    }
}

impl<M, A, I, const N: usize> Multiplexer for MuxDevice<M, A, I, N>
where
    M: PortMutex<Port = MuxDriver<A, I, N>>,
    A: OutputPin,
    I: OutputPin,
{
    type Error = MuxError;

    type Channel<'a>
        = Channel<'a, M, A, I, N>
    where
        Self: 'a;

    fn mux_channel(&self, index: u8) -> Option<Self::Channel<'_>> {
        self.channel(index)
    }
}

/// A handle for one multiplexer channel.
pub struct Channel<'a, M, A, I, const N: usize>
where
    M: PortMutex<Port = MuxDriver<A, I, N>> + 'a,
    A: OutputPin + 'a,
    I: OutputPin + 'a,
{
    driver: &'a M,
    index: u8,
}

impl<'a, M, A, I, const N: usize> Channel<'a, M, A, I, N>
where
    M: PortMutex<Port = MuxDriver<A, I, N>>,
    A: OutputPin,
    I: OutputPin,
{
    pub(crate) fn new(driver: &'a M, index: u8) -> Self {
        Self { driver, index }
    }

    /// The channel number this handle routes.
    pub fn index(&self) -> u8 {
        self.index
    }

    /// Route this channel through to the common line.
    ///
    /// Fails with [`MuxError::AlreadySelected`] while another channel holds
    /// the line; connecting an already-connected channel is a no-op.
    pub fn connect(&mut self) -> Result<(), MuxError> {
        self.driver.lock(|drv| drv.route(self.index))
    }

    /// Release the common line if this channel was the routed one.
    pub fn disconnect(&mut self) -> Result<(), MuxError> {
        self.driver.lock(|drv| drv.unroute(self.index))
    }
}

#[cfg(test)]
impl<A, I, const N: usize> MuxDevice<core::cell::RefCell<MuxDriver<A, I, N>>, A, I, N>
where
    A: OutputPin,
    I: OutputPin,
{
    /// Consumes self and returns the underlying mock pins so that `.done()` can be called. Only available in tests.
    pub fn test_release(self) -> ([A; N], Option<I>) {
        self.driver.into_inner().release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use embedded_hal_mock::eh1::digital::{Mock, State, Transaction};

    #[test]
    fn test_exclusive_routing() {
        let expectations_a0 = [
            Transaction::set(State::Low),  // new() init
            Transaction::set(State::Low),  // connect ch0 => bit0=0
            Transaction::set(State::High), // connect ch1 => bit0=1
        ];
        let mock_a0 = Mock::new(&expectations_a0);

        let expectations_a1 = [
            Transaction::set(State::Low),
            Transaction::set(State::Low),
            Transaction::set(State::Low),
        ];
        let mock_a1 = Mock::new(&expectations_a1);

        let expectations_a2 = [
            Transaction::set(State::Low),
            Transaction::set(State::Low),
            Transaction::set(State::Low),
        ];
        let mock_a2 = Mock::new(&expectations_a2);

        let expectations_inh = [
            Transaction::set(State::High),
            Transaction::set(State::Low), // connect ch0
            // ch1 attempt => AlreadySelected => no calls
            Transaction::set(State::High), // disconnect ch0
            Transaction::set(State::Low),  // connect ch1
        ];
        let mock_inh = Mock::new(&expectations_inh);

        let dev = MuxDevice::<RefCell<_>, _, _, 3>::new([mock_a0, mock_a1, mock_a2], Some(mock_inh));

        let mut ch0 = dev.channel(0).unwrap();
        let mut ch1 = dev.channel(1).unwrap();

        ch0.connect().unwrap();

        // Attempt to route channel 1 => AlreadySelected => no pin calls
        let err = ch1.connect();
        assert_eq!(err, Err(MuxError::AlreadySelected));

        ch0.disconnect().unwrap();

        // no error this time
        ch1.connect().unwrap();

        let ([mut a0, mut a1, mut a2], inh) = dev.test_release();
        a0.done();
        a1.done();
        a2.done();
        inh.unwrap().done();
    }

    #[test]
    fn test_channel_bounds() {
        let init = [Transaction::set(State::Low)];
        let mock_a0 = Mock::new(&init);
        let mock_a1 = Mock::new(&init);
        let mock_a2 = Mock::new(&init);
        let mock_inh = Mock::new(&[Transaction::set(State::High)]);

        let dev = MuxDevice::<RefCell<_>, _, _, 3>::new([mock_a0, mock_a1, mock_a2], Some(mock_inh));

        assert_eq!(dev.channel(7).map(|ch| ch.index()), Some(7));
        assert!(dev.channel(8).is_none());
        assert!(dev.mux_channel(8).is_none());

        let ([mut a0, mut a1, mut a2], inh) = dev.test_release();
        a0.done();
        a1.done();
        a2.done();
        inh.unwrap().done();
    }
}
