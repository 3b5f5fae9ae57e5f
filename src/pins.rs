//! Peripheral pin assignments for the sync module board.
//!
//! Single source of truth: the bus adapter references these rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I²C slave link to the clock controller
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 8;
pub const I2C_SCL_GPIO: i32 = 9;

/// 7-bit slave address the host controller talks to.
pub const I2C_SLAVE_ADDRESS: u8 = 40;

/// Driver-side RX/TX ring sizes.  A command frame is at most 6 bytes.
pub const I2C_RX_BUFFER_LEN: usize = 32;
pub const I2C_TX_BUFFER_LEN: usize = 32;
