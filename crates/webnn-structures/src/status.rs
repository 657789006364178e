use serde::{Deserialize, Serialize};

use crate::define_wire_enum;

define_wire_enum! {
    /// Outcome reported by the native library for error scopes and compute calls.
    pub enum ErrorType {
        NoError = 0,
        Validation = 1,
        OutOfMemory = 2,
        Unknown = 3,
        DeviceLost = 4,
    }
}

define_wire_enum! {
    /// Which class of errors an error scope captures.
    #[derive(Default)]
    pub enum ErrorFilter {
        #[default]
        None = 0,
        Validation = 1,
        OutOfMemory = 2,
    }
}

define_wire_enum! {
    #[derive(Default)]
    pub enum DevicePreference {
        #[default]
        Default = 0,
        Gpu = 1,
        Cpu = 2,
    }
}

define_wire_enum! {
    #[derive(Default)]
    pub enum PowerPreference {
        #[default]
        Default = 0,
        HighPerformance = 1,
        LowPower = 2,
    }
}

/// Options passed when an instance creates a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextOptions {
    pub device_preference: DevicePreference,
    pub power_preference: PowerPreference,
}

impl ContextOptions {
    pub const NUMBER_BYTES: usize = 8;
}
