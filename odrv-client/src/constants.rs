use anyhow::{Context, Result, bail};
use odrv_shared::enums::{self, EnumConstant};

use crate::util::format::{bold, dim, pad_cell};

fn format_value(constant: &EnumConstant) -> String {
    if enums::is_flag_group(constant.group) {
        format!("{:#x}", constant.value)
    } else {
        constant.value.to_string()
    }
}

/// Lines listing the enum constants, optionally of one group only.
pub fn format_constants(group: Option<&str>) -> Result<Vec<String>> {
    let groups: Vec<&str> = match group {
        Some(wanted) => match enums::groups().into_iter().find(|g| g.eq_ignore_ascii_case(wanted)) {
            Some(g) => vec![g],
            None => bail!(
                "Unknown enum group '{wanted}', expected one of: {}",
                enums::groups().join(", ")
            ),
        },
        None => enums::groups(),
    };

    let mut lines = Vec::new();
    for g in groups {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        let kind = if enums::is_flag_group(g) { " (flags)" } else { "" };
        lines.push(format!("{}{}", bold(g), dim(kind)));
        for constant in enums::group(g) {
            lines.push(format!("  {} {}", pad_cell(constant.name, 56), format_value(constant)));
        }
    }
    Ok(lines)
}

/// Names of the flags set in `mask`, for one of the error groups.
pub fn decode_mask(group: &str, mask: &str) -> Result<Vec<String>> {
    let Some(g) = enums::groups().into_iter().find(|g| g.eq_ignore_ascii_case(group)) else {
        bail!("Unknown enum group '{group}'");
    };
    if !enums::is_flag_group(g) {
        bail!("{g} is not an error flag group");
    }
    let mask = mask.trim();
    let value = match mask.strip_prefix("0x").or_else(|| mask.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => mask.parse::<i64>(),
    }
    .with_context(|| format!("Invalid error mask '{mask}'"))?;
    Ok(enums::decode_flags(g, value))
}

pub fn print_constants(group: Option<&str>) -> Result<()> {
    for line in format_constants(group)? {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group_case_insensitive() {
        let lines = format_constants(Some("motortype")).unwrap();
        assert!(lines[0].contains("MotorType"));
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("MOTOR_TYPE_GIMBAL"));
        assert!(lines[2].trim_end().ends_with('2'));
    }

    #[test]
    fn test_flag_groups_show_hex() {
        let lines = format_constants(Some("AxisError")).unwrap();
        assert!(lines[0].contains("(flags)"));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("AXIS_ERROR_ENCODER_FAILED") && l.ends_with("0x100"))
        );
    }

    #[test]
    fn test_unknown_group() {
        let err = format_constants(Some("Nope")).unwrap_err();
        assert!(err.to_string().contains("Unknown enum group 'Nope'"));
    }

    #[test]
    fn test_decode_mask() {
        assert_eq!(
            decode_mask("axiserror", "0x140").unwrap(),
            vec!["AXIS_ERROR_MOTOR_FAILED", "AXIS_ERROR_ENCODER_FAILED"]
        );
        assert_eq!(decode_mask("CanError", "0").unwrap(), vec!["CAN_ERROR_NONE"]);
        assert!(decode_mask("AxisState", "1").is_err());
        let err = decode_mask("AxisError", "0xzz").unwrap_err();
        assert!(err.to_string().contains("Invalid error mask"));
    }

    #[test]
    fn test_all_groups_listed() {
        let lines = format_constants(None).unwrap();
        let total = lines.iter().filter(|l| l.starts_with("  ")).count();
        assert_eq!(total, enums::ENUM_CONSTANTS.len());
    }
}
