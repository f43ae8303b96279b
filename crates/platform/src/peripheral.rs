//! Register-bus abstraction layer
//!
//! Charger, gauge and PMIC drivers address their chips as a flat file of
//! 8-bit registers. [`RegisterBus`] is that view; [`I2cRegisterBus`] binds it
//! to an `embedded_hal_async::i2c::I2c` bus and a 7-bit device address.

use embassy_time::{with_timeout, Duration};

/// Longest payload accepted by a single [`RegisterBus::write_registers`] call.
pub const MAX_WRITE_LEN: usize = 16;

/// Register address byte plus payload.
const FRAME_CAPACITY: usize = MAX_WRITE_LEN + 1;

/// Default time allowed for one bus transaction before it is abandoned.
pub const DEFAULT_BUS_TIMEOUT: Duration = Duration::from_millis(30);

/// 8-bit register transport to a single device.
///
/// Implementations are borrowed by the driver for one operation at a time;
/// they must return promptly or fail.
pub trait RegisterBus {
    /// Error type
    type Error: core::fmt::Debug;

    /// Read `buf.len()` consecutive registers starting at `register`.
    fn read_registers(
        &mut self,
        register: u8,
        buf: &mut [u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Write `data` to consecutive registers starting at `register`.
    fn write_registers(
        &mut self,
        register: u8,
        data: &[u8],
    ) -> impl core::future::Future<Output = Result<(), Self::Error>>;

    /// Read a single register
    fn read_register(
        &mut self,
        register: u8,
    ) -> impl core::future::Future<Output = Result<u8, Self::Error>> {
        async move {
            let mut buf = [0u8];
            self.read_registers(register, &mut buf).await?;
            let [value] = buf;
            Ok(value)
        }
    }

    /// Write a single register
    fn write_register(
        &mut self,
        register: u8,
        value: u8,
    ) -> impl core::future::Future<Output = Result<(), Self::Error>> {
        async move { self.write_registers(register, &[value]).await }
    }
}

/// Errors raised by [`I2cRegisterBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<E> {
    /// Underlying I2C transaction failed
    I2c(E),
    /// Transaction did not complete within the bus timeout
    Timeout,
    /// Payload longer than [`MAX_WRITE_LEN`]
    FrameTooLong,
}

#[cfg(feature = "std")]
impl<E: core::fmt::Debug> std::error::Error for BusError<E> {}

impl<E: core::fmt::Debug> core::fmt::Display for BusError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2c(e) => write!(f, "I2C transaction failed: {e:?}"),
            Self::Timeout => write!(f, "I2C transaction timed out"),
            Self::FrameTooLong => write!(f, "register write longer than {MAX_WRITE_LEN} bytes"),
        }
    }
}

/// [`RegisterBus`] over an async I2C bus.
///
/// Reads are a write-read with repeated start (register pointer, then data);
/// writes send the register pointer followed by the payload in one frame.
pub struct I2cRegisterBus<I> {
    i2c: I,
    address: u8,
    timeout: Duration,
}

impl<I> I2cRegisterBus<I> {
    /// Bind `i2c` to the device at 7-bit `address`.
    pub fn new(i2c: I, address: u8) -> Self {
        Self {
            i2c,
            address,
            timeout: DEFAULT_BUS_TIMEOUT,
        }
    }

    /// Override the per-transaction timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 7-bit device address
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Consume the adapter and return the owned bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I> RegisterBus for I2cRegisterBus<I>
where
    I: embedded_hal_async::i2c::I2c,
{
    type Error = BusError<I::Error>;

    async fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        let address = self.address;
        match with_timeout(self.timeout, self.i2c.write_read(address, &[register], buf)).await {
            Ok(result) => result.map_err(BusError::I2c),
            Err(_) => Err(BusError::Timeout),
        }
    }

    async fn write_registers(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        let mut frame: heapless::Vec<u8, FRAME_CAPACITY> = heapless::Vec::new();
        frame.push(register).map_err(|_| BusError::FrameTooLong)?;
        frame
            .extend_from_slice(data)
            .map_err(|_| BusError::FrameTooLong)?;

        let address = self.address;
        match with_timeout(self.timeout, self.i2c.write(address, &frame)).await {
            Ok(result) => result.map_err(BusError::I2c),
            Err(_) => Err(BusError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction};

    const ADDR: u8 = 0x6B;

    #[tokio::test]
    async fn read_register_issues_write_read_with_pointer() {
        let expectations = [Transaction::write_read(ADDR, vec![0x08], vec![0xA4])];
        let mut i2c = I2cMock::new(&expectations);
        let mut bus = I2cRegisterBus::new(i2c.clone(), ADDR);

        assert_eq!(bus.read_register(0x08).await, Ok(0xA4));
        i2c.done();
    }

    #[tokio::test]
    async fn read_registers_reads_consecutive_bytes() {
        let expectations = [Transaction::write_read(ADDR, vec![0x08], vec![0xA4, 0x00])];
        let mut i2c = I2cMock::new(&expectations);
        let mut bus = I2cRegisterBus::new(i2c.clone(), ADDR);

        let mut buf = [0u8; 2];
        bus.read_registers(0x08, &mut buf).await.unwrap();
        assert_eq!(buf, [0xA4, 0x00]);
        i2c.done();
    }

    #[tokio::test]
    async fn write_register_prefixes_register_address() {
        let expectations = [Transaction::write(ADDR, vec![0x01, 0x1B])];
        let mut i2c = I2cMock::new(&expectations);
        let mut bus = I2cRegisterBus::new(i2c.clone(), ADDR);

        bus.write_register(0x01, 0x1B).await.unwrap();
        i2c.done();
    }

    #[tokio::test]
    async fn oversized_write_is_rejected_without_bus_traffic() {
        let mut i2c = I2cMock::new(&[]);
        let mut bus = I2cRegisterBus::new(i2c.clone(), ADDR);

        let payload = [0u8; MAX_WRITE_LEN + 1];
        assert_eq!(
            bus.write_registers(0x00, &payload).await,
            Err(BusError::FrameTooLong)
        );
        i2c.done();
    }

    #[test]
    fn bus_error_display_names_the_failure() {
        let e: BusError<()> = BusError::Timeout;
        assert_eq!(std::format!("{e}"), "I2C transaction timed out");
    }
}
