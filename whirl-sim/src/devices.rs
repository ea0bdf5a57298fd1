//! Register models of the two environmental sensors

use whirl_drivers::sensor::{bmp280, si7021};

use crate::bus::SimDevice;

/// Si7021 command-level model
///
/// Measurement commands load a two-byte result (plus checksum byte, which
/// the firmware never reads). The first `nacks_per_measurement` read
/// addresses after a measurement command are NACKed, as the real part does
/// while converting.
#[derive(Debug, Clone)]
pub struct SimSi7021 {
    pub humidity_raw: u16,
    pub temperature_raw: u16,
    pub user_register: u8,
    pub nacks_per_measurement: u32,
    command: u8,
    nacks_left: u32,
    out: [u8; 3],
    cursor: usize,
    measurements: u32,
}

impl SimSi7021 {
    pub fn new(humidity_raw: u16, temperature_raw: u16) -> Self {
        Self {
            humidity_raw,
            temperature_raw,
            user_register: si7021::Resolution::Rh12Temp14 as u8,
            nacks_per_measurement: 0,
            command: 0,
            nacks_left: 0,
            out: [0; 3],
            cursor: 0,
            measurements: 0,
        }
    }

    /// Measurement commands received
    pub fn measurements(&self) -> u32 {
        self.measurements
    }

    fn load(&mut self, value: u16) {
        let [msb, lsb] = value.to_be_bytes();
        self.out = [msb, lsb, 0];
        self.nacks_left = self.nacks_per_measurement;
        self.measurements += 1;
    }
}

impl Default for SimSi7021 {
    fn default() -> Self {
        Self::new(32768, 32768)
    }
}

impl SimDevice for SimSi7021 {
    fn address(&self) -> u8 {
        si7021::ADDRESS
    }

    fn select(&mut self, register: u8) {
        self.command = register;
        self.cursor = 0;
        match register {
            si7021::CMD_MEASURE_HUMIDITY => self.load(self.humidity_raw),
            si7021::CMD_MEASURE_TEMPERATURE => self.load(self.temperature_raw),
            si7021::CMD_READ_USER_REG => self.out = [self.user_register, 0, 0],
            _ => {}
        }
    }

    fn write_byte(&mut self, value: u8) {
        if self.command == si7021::CMD_WRITE_USER_REG {
            self.user_register = value;
        }
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.out.get(self.cursor).copied().unwrap_or(0xFF);
        self.cursor += 1;
        byte
    }

    fn nack_read(&mut self) -> bool {
        if self.nacks_left > 0 {
            self.nacks_left -= 1;
            true
        } else {
            false
        }
    }
}

/// Worked-example calibration from the BMP280 datasheet
pub const DATASHEET_CALIBRATION: [u16; bmp280::CALIB_WORDS] = [
    27504,
    26435,
    -1000i16 as u16,
    36477,
    -10685i16 as u16,
    3024,
    2855,
    140,
    -7i16 as u16,
    15500,
    -14600i16 as u16,
    6000,
];

/// Raw temperature of the datasheet example (25.08 °C)
pub const DATASHEET_ADC_T: u32 = 519_888;
/// Raw pressure of the datasheet example (100653 Pa)
pub const DATASHEET_ADC_P: u32 = 415_148;

/// BMP280 register-file model with an auto-incrementing pointer
#[derive(Debug, Clone)]
pub struct SimBmp280 {
    registers: [u8; 256],
    pointer: u8,
    pub nacks_per_read: u32,
    nacks_left: u32,
}

impl SimBmp280 {
    pub fn new(calibration: &[u16; bmp280::CALIB_WORDS], adc_t: u32, adc_p: u32) -> Self {
        let mut sim = Self {
            registers: [0; 256],
            pointer: 0,
            nacks_per_read: 0,
            nacks_left: 0,
        };
        sim.registers[usize::from(bmp280::REG_CHIP_ID)] = bmp280::CHIP_ID;
        for (i, word) in calibration.iter().enumerate() {
            let at = usize::from(bmp280::REG_CALIB_START) + i * 2;
            sim.registers[at..at + 2].copy_from_slice(&word.to_le_bytes());
        }
        sim.set_raw(adc_t, adc_p);
        sim
    }

    /// Load 20-bit raw temperature and pressure into the data registers
    pub fn set_raw(&mut self, adc_t: u32, adc_p: u32) {
        Self::put_20bit(&mut self.registers, bmp280::REG_TEMP_MSB, adc_t);
        Self::put_20bit(&mut self.registers, bmp280::REG_PRESS_MSB, adc_p);
    }

    fn put_20bit(registers: &mut [u8; 256], at: u8, value: u32) {
        let [_, msb, lsb, xlsb] = (value << 4).to_be_bytes();
        let at = usize::from(at);
        registers[at..at + 3].copy_from_slice(&[msb, lsb, xlsb]);
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[usize::from(address)]
    }

    pub fn set_register(&mut self, address: u8, value: u8) {
        self.registers[usize::from(address)] = value;
    }
}

impl Default for SimBmp280 {
    fn default() -> Self {
        Self::new(&DATASHEET_CALIBRATION, DATASHEET_ADC_T, DATASHEET_ADC_P)
    }
}

impl SimDevice for SimBmp280 {
    fn address(&self) -> u8 {
        bmp280::ADDRESS
    }

    fn select(&mut self, register: u8) {
        self.pointer = register;
        self.nacks_left = self.nacks_per_read;
    }

    fn write_byte(&mut self, value: u8) {
        self.registers[usize::from(self.pointer)] = value;
        self.pointer = self.pointer.wrapping_add(1);
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.registers[usize::from(self.pointer)];
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }

    fn nack_read(&mut self) -> bool {
        if self.nacks_left > 0 {
            self.nacks_left -= 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bmp280_calibration_is_little_endian() {
        let sim = SimBmp280::default();
        assert_eq!(sim.register(0x88), 0x70); // 27504 = 0x6B70
        assert_eq!(sim.register(0x89), 0x6B);
        assert_eq!(sim.register(bmp280::REG_CHIP_ID), 0x58);
    }

    #[test]
    fn test_bmp280_raw_is_shifted_into_data_registers() {
        let mut sim = SimBmp280::default();
        sim.set_raw(0xABCDE, 0x12345);
        assert_eq!(sim.register(0xFA), 0xAB);
        assert_eq!(sim.register(0xFB), 0xCD);
        assert_eq!(sim.register(0xFC), 0xE0);
        assert_eq!(sim.register(0xF7), 0x12);
        assert_eq!(sim.register(0xF9), 0x50);
    }

    #[test]
    fn test_si7021_nacks_after_measurement_command() {
        let mut sim = SimSi7021::default();
        sim.nacks_per_measurement = 2;
        sim.select(si7021::CMD_MEASURE_HUMIDITY);
        assert!(sim.nack_read());
        assert!(sim.nack_read());
        assert!(!sim.nack_read());
        assert_eq!(sim.read_byte(), 0x80);
        assert_eq!(sim.read_byte(), 0x00);
    }

    #[test]
    fn test_si7021_user_register_write() {
        let mut sim = SimSi7021::default();
        sim.select(si7021::CMD_WRITE_USER_REG);
        sim.write_byte(0x3B);
        sim.select(si7021::CMD_READ_USER_REG);
        assert_eq!(sim.read_byte(), 0x3B);
    }
}
