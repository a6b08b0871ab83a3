//! Enum constants exposed by the ODrive firmware.
//!
//! Declared as one flat static table so the shell can inject every constant
//! as a global without introspecting anything at runtime. Error groups are
//! bit flags; everything else is a plain enumeration.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EnumConstant {
    /// Firmware type the constant belongs to, e.g. `AxisState`.
    pub group: &'static str,
    pub name: &'static str,
    pub value: i64,
}

macro_rules! constants {
    ($($group:literal => { $($name:ident = $value:expr),* $(,)? })*) => {
        &[$($(EnumConstant { group: $group, name: stringify!($name), value: $value },)*)*]
    };
}

/// Groups whose members are bit flags rather than discrete states.
pub const FLAG_GROUPS: &[&str] = &[
    "ODriveError",
    "AxisError",
    "MotorError",
    "EncoderError",
    "ControllerError",
    "SensorlessEstimatorError",
    "CanError",
];

pub const ENUM_CONSTANTS: &[EnumConstant] = constants! {
    "AxisState" => {
        AXIS_STATE_UNDEFINED = 0,
        AXIS_STATE_IDLE = 1,
        AXIS_STATE_STARTUP_SEQUENCE = 2,
        AXIS_STATE_FULL_CALIBRATION_SEQUENCE = 3,
        AXIS_STATE_MOTOR_CALIBRATION = 4,
        AXIS_STATE_ENCODER_INDEX_SEARCH = 6,
        AXIS_STATE_ENCODER_OFFSET_CALIBRATION = 7,
        AXIS_STATE_CLOSED_LOOP_CONTROL = 8,
        AXIS_STATE_LOCKIN_SPIN = 9,
        AXIS_STATE_ENCODER_DIR_FIND = 10,
        AXIS_STATE_HOMING = 11,
        AXIS_STATE_ENCODER_HALL_POLARITY_CALIBRATION = 12,
        AXIS_STATE_ENCODER_HALL_PHASE_CALIBRATION = 13,
    }
    "MotorType" => {
        MOTOR_TYPE_HIGH_CURRENT = 0,
        MOTOR_TYPE_GIMBAL = 2,
        MOTOR_TYPE_ACIM = 3,
    }
    "ControlMode" => {
        CONTROL_MODE_VOLTAGE_CONTROL = 0,
        CONTROL_MODE_TORQUE_CONTROL = 1,
        CONTROL_MODE_VELOCITY_CONTROL = 2,
        CONTROL_MODE_POSITION_CONTROL = 3,
    }
    "InputMode" => {
        INPUT_MODE_INACTIVE = 0,
        INPUT_MODE_PASSTHROUGH = 1,
        INPUT_MODE_VEL_RAMP = 2,
        INPUT_MODE_POS_FILTER = 3,
        INPUT_MODE_MIX_CHANNELS = 4,
        INPUT_MODE_TRAP_TRAJ = 5,
        INPUT_MODE_TORQUE_RAMP = 6,
        INPUT_MODE_MIRROR = 7,
        INPUT_MODE_TUNING = 8,
    }
    "EncoderMode" => {
        ENCODER_MODE_INCREMENTAL = 0,
        ENCODER_MODE_HALL = 1,
        ENCODER_MODE_SINCOS = 2,
        ENCODER_MODE_SPI_ABS_CUI = 256,
        ENCODER_MODE_SPI_ABS_AMS = 257,
        ENCODER_MODE_SPI_ABS_AEAT = 258,
        ENCODER_MODE_SPI_ABS_RLS = 259,
        ENCODER_MODE_SPI_ABS_MA732 = 260,
    }
    "GpioMode" => {
        GPIO_MODE_DIGITAL = 0,
        GPIO_MODE_DIGITAL_PULL_UP = 1,
        GPIO_MODE_DIGITAL_PULL_DOWN = 2,
        GPIO_MODE_ANALOG_IN = 3,
        GPIO_MODE_UART_A = 4,
        GPIO_MODE_UART_B = 5,
        GPIO_MODE_UART_C = 6,
        GPIO_MODE_CAN_A = 7,
        GPIO_MODE_I2C_A = 8,
        GPIO_MODE_SPI_A = 9,
        GPIO_MODE_PWM = 10,
        GPIO_MODE_ENC0 = 11,
        GPIO_MODE_ENC1 = 12,
        GPIO_MODE_ENC2 = 13,
        GPIO_MODE_MECH_BRAKE = 14,
        GPIO_MODE_STATUS = 15,
    }
    "StreamProtocolType" => {
        STREAM_PROTOCOL_TYPE_FIBRE = 0,
        STREAM_PROTOCOL_TYPE_ASCII = 1,
        STREAM_PROTOCOL_TYPE_STDOUT = 2,
        STREAM_PROTOCOL_TYPE_ASCII_AND_STDOUT = 3,
    }
    "CanProtocol" => {
        CAN_PROTOCOL_SIMPLE = 1,
    }
    "ODriveError" => {
        ODRIVE_ERROR_NONE = 0,
        ODRIVE_ERROR_CONTROL_ITERATION_MISSED = 0x1,
        ODRIVE_ERROR_DC_BUS_UNDER_VOLTAGE = 0x2,
        ODRIVE_ERROR_DC_BUS_OVER_VOLTAGE = 0x4,
        ODRIVE_ERROR_DC_BUS_OVER_REGEN_CURRENT = 0x8,
        ODRIVE_ERROR_DC_BUS_OVER_CURRENT = 0x10,
        ODRIVE_ERROR_BRAKE_DEADTIME_VIOLATION = 0x20,
        ODRIVE_ERROR_BRAKE_DUTY_CYCLE_NAN = 0x40,
        ODRIVE_ERROR_INVALID_BRAKE_RESISTANCE = 0x80,
    }
    "AxisError" => {
        AXIS_ERROR_NONE = 0,
        AXIS_ERROR_INVALID_STATE = 0x1,
        AXIS_ERROR_MOTOR_FAILED = 0x40,
        AXIS_ERROR_SENSORLESS_ESTIMATOR_FAILED = 0x80,
        AXIS_ERROR_ENCODER_FAILED = 0x100,
        AXIS_ERROR_CONTROLLER_FAILED = 0x200,
        AXIS_ERROR_WATCHDOG_TIMER_EXPIRED = 0x800,
        AXIS_ERROR_MIN_ENDSTOP_PRESSED = 0x1000,
        AXIS_ERROR_MAX_ENDSTOP_PRESSED = 0x2000,
        AXIS_ERROR_ESTOP_REQUESTED = 0x4000,
        AXIS_ERROR_HOMING_WITHOUT_ENDSTOP = 0x20000,
        AXIS_ERROR_OVER_TEMP = 0x40000,
        AXIS_ERROR_UNKNOWN_POSITION = 0x80000,
    }
    "MotorError" => {
        MOTOR_ERROR_NONE = 0,
        MOTOR_ERROR_PHASE_RESISTANCE_OUT_OF_RANGE = 0x1,
        MOTOR_ERROR_PHASE_INDUCTANCE_OUT_OF_RANGE = 0x2,
        MOTOR_ERROR_DRV_FAULT = 0x8,
        MOTOR_ERROR_CONTROL_DEADLINE_MISSED = 0x10,
        MOTOR_ERROR_MODULATION_MAGNITUDE = 0x80,
        MOTOR_ERROR_CURRENT_SENSE_SATURATION = 0x400,
        MOTOR_ERROR_CURRENT_LIMIT_VIOLATION = 0x1000,
        MOTOR_ERROR_MODULATION_IS_NAN = 0x10000,
        MOTOR_ERROR_MOTOR_THERMISTOR_OVER_TEMP = 0x20000,
        MOTOR_ERROR_FET_THERMISTOR_OVER_TEMP = 0x40000,
        MOTOR_ERROR_TIMER_UPDATE_MISSED = 0x80000,
        MOTOR_ERROR_CURRENT_MEASUREMENT_UNAVAILABLE = 0x100000,
        MOTOR_ERROR_CONTROLLER_FAILED = 0x200000,
        MOTOR_ERROR_I_BUS_OUT_OF_RANGE = 0x400000,
        MOTOR_ERROR_BRAKE_RESISTOR_DISARMED = 0x800000,
        MOTOR_ERROR_SYSTEM_LEVEL = 0x1000000,
        MOTOR_ERROR_BAD_TIMING = 0x2000000,
        MOTOR_ERROR_UNKNOWN_PHASE_ESTIMATE = 0x4000000,
        MOTOR_ERROR_UNKNOWN_PHASE_VEL = 0x8000000,
        MOTOR_ERROR_UNKNOWN_TORQUE = 0x10000000,
        MOTOR_ERROR_UNKNOWN_CURRENT_COMMAND = 0x20000000,
        MOTOR_ERROR_UNKNOWN_CURRENT_MEASUREMENT = 0x40000000,
        MOTOR_ERROR_UNKNOWN_VBUS_VOLTAGE = 0x80000000,
        MOTOR_ERROR_UNKNOWN_VOLTAGE_COMMAND = 0x100000000,
        MOTOR_ERROR_UNKNOWN_GAINS = 0x200000000,
        MOTOR_ERROR_CONTROLLER_INITIALIZING = 0x400000000,
        MOTOR_ERROR_UNBALANCED_PHASES = 0x800000000,
    }
    "EncoderError" => {
        ENCODER_ERROR_NONE = 0,
        ENCODER_ERROR_UNSTABLE_GAIN = 0x1,
        ENCODER_ERROR_CPR_POLEPAIRS_MISMATCH = 0x2,
        ENCODER_ERROR_NO_RESPONSE = 0x4,
        ENCODER_ERROR_UNSUPPORTED_ENCODER_MODE = 0x8,
        ENCODER_ERROR_ILLEGAL_HALL_STATE = 0x10,
        ENCODER_ERROR_INDEX_NOT_FOUND_YET = 0x20,
        ENCODER_ERROR_ABS_SPI_TIMEOUT = 0x40,
        ENCODER_ERROR_ABS_SPI_COM_FAIL = 0x80,
        ENCODER_ERROR_ABS_SPI_NOT_READY = 0x100,
        ENCODER_ERROR_HALL_NOT_CALIBRATED_YET = 0x200,
    }
    "ControllerError" => {
        CONTROLLER_ERROR_NONE = 0,
        CONTROLLER_ERROR_OVERSPEED = 0x1,
        CONTROLLER_ERROR_INVALID_INPUT_MODE = 0x2,
        CONTROLLER_ERROR_UNSTABLE_GAIN = 0x4,
        CONTROLLER_ERROR_INVALID_MIRROR_AXIS = 0x8,
        CONTROLLER_ERROR_INVALID_LOAD_ENCODER = 0x10,
        CONTROLLER_ERROR_INVALID_ESTIMATE = 0x20,
        CONTROLLER_ERROR_INVALID_CIRCULAR_RANGE = 0x40,
        CONTROLLER_ERROR_SPINOUT_DETECTED = 0x80,
    }
    "SensorlessEstimatorError" => {
        SENSORLESS_ESTIMATOR_ERROR_NONE = 0,
        SENSORLESS_ESTIMATOR_ERROR_UNSTABLE_GAIN = 0x1,
        SENSORLESS_ESTIMATOR_ERROR_UNKNOWN_CURRENT_MEASUREMENT = 0x2,
    }
    "CanError" => {
        CAN_ERROR_NONE = 0,
        CAN_ERROR_DUPLICATE_CAN_IDS = 0x1,
    }
};

/// All constants of one group, in declaration order.
pub fn group(group: &str) -> impl Iterator<Item = &'static EnumConstant> + '_ {
    ENUM_CONSTANTS.iter().filter(move |c| c.group == group)
}

/// Distinct group names in declaration order.
pub fn groups() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for c in ENUM_CONSTANTS {
        if !out.contains(&c.group) {
            out.push(c.group);
        }
    }
    out
}

pub fn is_flag_group(group: &str) -> bool {
    FLAG_GROUPS.contains(&group)
}

/// Split an error bit mask of `group` into the names of the set flags.
///
/// Bits with no matching constant are reported as hex literals. A zero mask
/// yields the group's `*_NONE` member when it has one.
pub fn decode_flags(group_name: &str, mask: i64) -> Vec<String> {
    let members: Vec<&EnumConstant> = group(group_name).collect();
    if mask == 0 {
        return members
            .iter()
            .find(|c| c.value == 0)
            .map(|c| vec![c.name.to_string()])
            .unwrap_or_default();
    }

    let mut out = Vec::new();
    let mut remaining = mask;
    for c in members.iter().filter(|c| c.value != 0) {
        if mask & c.value == c.value {
            out.push(c.name.to_string());
            remaining &= !c.value;
        }
    }
    if remaining != 0 {
        out.push(format!("{remaining:#x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let mut seen = HashSet::new();
        for c in ENUM_CONSTANTS {
            assert!(seen.insert(c.name), "duplicate constant {}", c.name);
        }
    }

    #[test]
    fn test_no_private_names() {
        assert!(ENUM_CONSTANTS.iter().all(|c| !c.name.starts_with('_')));
    }

    fn lookup(name: &str) -> Option<&'static EnumConstant> {
        ENUM_CONSTANTS.iter().find(|c| c.name == name)
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("AXIS_STATE_CLOSED_LOOP_CONTROL").unwrap().value, 8);
        assert_eq!(lookup("ENCODER_MODE_SPI_ABS_AMS").unwrap().value, 257);
        assert!(lookup("axis_state_idle").is_none());
    }

    #[test]
    fn test_groups_cover_flag_groups() {
        let groups = groups();
        for flag in FLAG_GROUPS {
            assert!(groups.contains(flag), "missing group {flag}");
        }
        assert_eq!(groups[0], "AxisState");
    }

    #[test]
    fn test_flag_values_are_single_bits() {
        for c in ENUM_CONSTANTS.iter().filter(|c| is_flag_group(c.group)) {
            assert!(
                c.value == 0 || c.value.count_ones() == 1,
                "{} is not a single bit",
                c.name
            );
        }
    }

    #[test]
    fn test_decode_flags() {
        let names = decode_flags("AxisError", 0x40 | 0x100);
        assert_eq!(
            names,
            vec!["AXIS_ERROR_MOTOR_FAILED", "AXIS_ERROR_ENCODER_FAILED"]
        );
    }

    #[test]
    fn test_decode_flags_zero_and_unknown_bits() {
        assert_eq!(decode_flags("CanError", 0), vec!["CAN_ERROR_NONE"]);
        assert_eq!(
            decode_flags("CanError", 0x1 | 0x8),
            vec!["CAN_ERROR_DUPLICATE_CAN_IDS".to_string(), "0x8".to_string()]
        );
    }
}
