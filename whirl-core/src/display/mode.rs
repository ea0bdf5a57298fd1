//! Display mode selection

/// What the display shows while spinning
///
/// Modes form a closed ring; stepping past either end wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayMode {
    /// Greeting with a slowly cycling rainbow
    #[default]
    HelloWorld,
    /// Relative humidity and temperature
    TempHumidity,
    /// Author credits
    Credits,
    /// Battery charge estimate
    BatteryLevel,
    /// Barometric pressure and altitude estimate
    PressureAltitude,
    Filler6,
    Filler7,
    Filler8,
    Filler9,
    Filler10,
    Filler11,
    Filler12,
}

/// Sensor a mode needs refreshed before each sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSource {
    /// Humidity/temperature sensor
    Humidity,
    /// Pressure/temperature sensor
    Pressure,
}

impl DisplayMode {
    /// Number of modes
    pub const COUNT: usize = 12;

    /// Every mode in ring order
    pub const ALL: [DisplayMode; Self::COUNT] = [
        DisplayMode::HelloWorld,
        DisplayMode::TempHumidity,
        DisplayMode::Credits,
        DisplayMode::BatteryLevel,
        DisplayMode::PressureAltitude,
        DisplayMode::Filler6,
        DisplayMode::Filler7,
        DisplayMode::Filler8,
        DisplayMode::Filler9,
        DisplayMode::Filler10,
        DisplayMode::Filler11,
        DisplayMode::Filler12,
    ];

    /// Position in the ring
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    /// Mode at a ring position, wrapping
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::COUNT]
    }

    /// Following mode; the last wraps to the first
    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Preceding mode; the first wraps to the last
    pub fn previous(self) -> Self {
        Self::from_index(self.index() + Self::COUNT - 1)
    }

    /// Sensor data this mode shows
    pub fn data_source(self) -> Option<DataSource> {
        match self {
            DisplayMode::TempHumidity => Some(DataSource::Humidity),
            DisplayMode::PressureAltitude => Some(DataSource::Pressure),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_wraps_from_last() {
        assert_eq!(DisplayMode::Filler12.next(), DisplayMode::HelloWorld);
    }

    #[test]
    fn test_previous_wraps_from_first() {
        assert_eq!(DisplayMode::HelloWorld.previous(), DisplayMode::Filler12);
    }

    #[test]
    fn test_full_cycle_returns_home() {
        let mut mode = DisplayMode::Credits;
        for _ in 0..DisplayMode::COUNT {
            mode = mode.next();
        }
        assert_eq!(mode, DisplayMode::Credits);

        for _ in 0..DisplayMode::COUNT {
            mode = mode.previous();
        }
        assert_eq!(mode, DisplayMode::Credits);
    }

    #[test]
    fn test_index_round_trip() {
        for (i, mode) in DisplayMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
            assert_eq!(DisplayMode::from_index(i), *mode);
        }
    }

    #[test]
    fn test_data_sources() {
        assert_eq!(DisplayMode::TempHumidity.data_source(), Some(DataSource::Humidity));
        assert_eq!(DisplayMode::PressureAltitude.data_source(), Some(DataSource::Pressure));
        assert_eq!(DisplayMode::HelloWorld.data_source(), None);
    }
}
