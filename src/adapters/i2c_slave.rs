//! I²C slave transport for the host link.
//!
//! Implements [`BusTransport`] over the ESP-IDF I²C slave driver.  The
//! driver has no notion of frames; a host write lands in the RX ring as
//! one burst, so one short read is treated as one frame.  The status reply
//! is re-staged in the TX ring on every pump so a host read always sees
//! the latest published snapshot.
//!
//! Only built for `target_os = "espidf"`.  Host builds use the scripted
//! transports in the tests.

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{InputPin, OutputPin};
use esp_idf_hal::i2c::{I2c, I2cSlaveConfig, I2cSlaveDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_sys::{ESP_ERR_TIMEOUT, EspError, esp, i2c_port_t, i2c_reset_tx_fifo};
use log::info;

use crate::pins::{I2C_RX_BUFFER_LEN, I2C_SLAVE_ADDRESS, I2C_TX_BUFFER_LEN};
use crate::protocol::BusTransport;

/// How long one receive waits for the rest of a burst.
const RX_WAIT_MS: u64 = 5;
const TX_WAIT_MS: u64 = 5;

/// I²C controller the slave runs on.
const I2C_PORT: i2c_port_t = 0;

pub struct I2cSlaveBus<'d> {
    driver: I2cSlaveDriver<'d>,
}

impl<'d> I2cSlaveBus<'d> {
    pub fn new<I2C: I2c>(
        i2c: impl Peripheral<P = I2C> + 'd,
        sda: impl Peripheral<P = impl InputPin + OutputPin> + 'd,
        scl: impl Peripheral<P = impl InputPin + OutputPin> + 'd,
    ) -> Result<Self, EspError> {
        let config = I2cSlaveConfig::new()
            .rx_buffer_length(I2C_RX_BUFFER_LEN)
            .tx_buffer_length(I2C_TX_BUFFER_LEN);
        let driver = I2cSlaveDriver::new(i2c, sda, scl, I2C_SLAVE_ADDRESS, &config)?;
        info!("I2C: slave listening at 0x{:02X}", I2C_SLAVE_ADDRESS);
        Ok(Self { driver })
    }
}

impl BusTransport for I2cSlaveBus<'_> {
    type Error = EspError;

    fn receive_frame(&mut self, buf: &mut [u8]) -> Result<Option<usize>, EspError> {
        let n = self
            .driver
            .read(buf, TickType::new_millis(RX_WAIT_MS).ticks())
            .or_else(|e| {
                // Timeout is the normal "no frame" outcome.
                if e.code() == ESP_ERR_TIMEOUT {
                    Ok(0)
                } else {
                    Err(e)
                }
            })?;
        Ok((n > 0).then_some(n))
    }

    fn send_frame(&mut self, frame: &[u8]) -> Result<(), EspError> {
        // SAFETY: the slave driver for I2C_PORT is installed by `new` and
        // only this task touches its rings.
        esp!(unsafe { i2c_reset_tx_fifo(I2C_PORT) })?;
        self.driver
            .write(frame, TickType::new_millis(TX_WAIT_MS).ticks())?;
        Ok(())
    }
}
