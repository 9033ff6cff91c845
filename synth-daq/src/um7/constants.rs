//! UM7 protocol constants: framing, packet type bits, register map
//!
//! Register addresses follow the UM7 datasheet (firmware rev. UM2C).

// ===== Framing =====

/// Start-of-packet marker
pub const MARKER: [u8; 3] = *b"snp";
/// Smallest complete frame: marker(3) + type(1) + address(1) + checksum(2)
pub const MIN_FRAME_LEN: usize = 7;
/// Largest data section carried by one packet
pub const MAX_DATA_LEN: usize = 64;
/// Largest complete frame
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + MAX_DATA_LEN;
/// Line terminator appended to transmitted frames
pub const TERMINATOR: u8 = b'\n';
/// Bytes per UM7 register
pub const REGISTER_SIZE: usize = 4;

// ===== Packet type bits =====

/// Packet carries at least one register
pub const PT_HAS_DATA: u8 = 0x80;
/// Packet carries `batch_length` consecutive registers
pub const PT_IS_BATCH: u8 = 0x40;
/// Batch length nibble (bits 2..5)
pub const PT_BATCH_LENGTH_MASK: u8 = 0x3C;
/// Batch length nibble shift
pub const PT_BATCH_LENGTH_SHIFT: u8 = 2;
/// Set by the sensor when a command could not be executed
pub const PT_COMMAND_FAILED: u8 = 0x01;

// ===== Configuration registers =====

/// Raw accel/gyro/mag broadcast rates
pub const CREG_COM_RATES1: u8 = 0x01;
/// Temperature and all-raw broadcast rates
pub const CREG_COM_RATES2: u8 = 0x02;
/// Processed accel/gyro/mag broadcast rates
pub const CREG_COM_RATES3: u8 = 0x03;
/// All-processed broadcast rate (byte 3)
pub const CREG_COM_RATES4: u8 = 0x04;
/// Quaternion/euler/position/velocity broadcast rates
pub const CREG_COM_RATES5: u8 = 0x05;
/// Pose and health broadcast rates (health code in bits 16..19)
pub const CREG_COM_RATES6: u8 = 0x06;
/// NMEA broadcast rates
pub const CREG_COM_RATES7: u8 = 0x07;

// ===== Data registers =====

/// Health word
pub const DREG_HEALTH: u8 = 0x55;
/// First register of the all-processed batch (gyro, accel, mag + timestamps)
pub const DREG_ALL_PROC: u8 = 0x61;
/// Registers in one all-processed batch
pub const ALL_PROC_REGISTERS: usize = 12;

// ===== Commands =====

/// Report firmware revision as four ASCII bytes
pub const GET_FW_REVISION: u8 = 0xAA;
/// Write configuration to flash
pub const FLASH_COMMIT: u8 = 0xAB;
/// Restore factory configuration
pub const RESET_TO_FACTORY: u8 = 0xAC;
/// Measure and store gyro biases
pub const ZERO_GYROS: u8 = 0xAD;
/// Set GPS home position to the current position
pub const SET_HOME_POSITION: u8 = 0xAE;
/// Set magnetometer reference vector
pub const SET_MAG_REFERENCE: u8 = 0xB0;
/// Reset the EKF
pub const RESET_EKF: u8 = 0xB3;

// ===== Health word bits =====

/// No GPS data for two seconds
pub const HEALTH_GPS: u32 = 1 << 0;
/// Magnetometer failed to initialize
pub const HEALTH_MAG: u32 = 1 << 1;
/// Gyro failed to initialize
pub const HEALTH_GYRO: u32 = 1 << 2;
/// Accelerometer failed to initialize
pub const HEALTH_ACC: u32 = 1 << 3;
/// Accelerometer norm exceeded
pub const HEALTH_ACC_N: u32 = 1 << 4;
/// Magnetometer norm exceeded
pub const HEALTH_MG_N: u32 = 1 << 5;
/// UART transmit overflow
pub const HEALTH_OVF: u32 = 1 << 8;
/// Satellites in view (6 bits)
pub const HEALTH_SATS_IN_VIEW_SHIFT: u32 = 10;
/// Satellites used in the position solution (6 bits)
pub const HEALTH_SATS_USED_SHIFT: u32 = 26;
/// Width mask of the satellite counts
pub const HEALTH_SATS_MASK: u32 = 0x3F;
