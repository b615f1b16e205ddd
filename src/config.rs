use crate::Priority;

/// One of the TWI units present on the SAM parts this driver targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Instance {
    pub number: u8,
    /// TWIHS on SAM E70/S70/V70/V71, plain TWI on SAM3X.
    pub high_speed: bool,
}

impl Instance {
    /// Fastest bus clock the unit can drive: high-speed mode for TWIHS,
    /// fast mode for plain TWI.
    pub const fn max_frequency(&self) -> u32 {
        if self.high_speed {
            3_400_000
        } else {
            400_000
        }
    }

    pub const TWI0: Instance = Instance {
        number: 0,
        high_speed: false,
    };
    pub const TWI1: Instance = Instance {
        number: 1,
        high_speed: false,
    };
    pub const TWIHS0: Instance = Instance {
        number: 0,
        high_speed: true,
    };
    pub const TWIHS1: Instance = Instance {
        number: 1,
        high_speed: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub instance: Instance,
    /// Bus clock in Hz.
    pub frequency: u32,
    pub priority: Priority,
}

impl Config {
    pub const fn new(instance: Instance) -> Self {
        Self {
            instance,
            frequency: 400_000,
            priority: Priority::Low,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Instance::TWIHS0)
    }
}
