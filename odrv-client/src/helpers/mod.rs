//! Helper functions injected into every shell session.
//!
//! The table is fixed. Helpers that only compute something run here; the
//! ones that drive a device need remote object access and refuse to run in
//! this shell after checking their arguments.

pub mod thermistor;

use crate::shell::error::ShellError;
use crate::shell::value::Value;

pub type HelperFn = fn(&[Value]) -> Result<Value, ShellError>;

#[derive(Debug)]
pub struct Helper {
    pub name: &'static str,
    /// Argument list as shown to the user, e.g. `(odrv, clear=False)`.
    pub signature: &'static str,
    pub summary: &'static str,
    call: HelperFn,
}

impl Helper {
    pub fn call(&self, args: &[Value]) -> Result<Value, ShellError> {
        (self.call)(args)
    }
}

pub static HELPERS: [Helper; 8] = [
    Helper {
        name: "start_liveplotter",
        signature: "(get_var_callback)",
        summary: "plot device properties live",
        call: start_liveplotter,
    },
    Helper {
        name: "dump_errors",
        signature: "(odrv, clear=False)",
        summary: "print and optionally clear all error flags of a device",
        call: dump_errors,
    },
    Helper {
        name: "benchmark",
        signature: "(odrv)",
        summary: "property read benchmark (not functional)",
        call: benchmark,
    },
    Helper {
        name: "oscilloscope_dump",
        signature: "(odrv, num_vals, filename='oscilloscope.csv')",
        summary: "download the on-device oscilloscope buffer to a CSV file",
        call: oscilloscope_dump,
    },
    Helper {
        name: "BulkCapture",
        signature: "(data_getter, data_rate=500.0, duration=2.0)",
        summary: "capture a burst of property samples",
        call: bulk_capture,
    },
    Helper {
        name: "step_and_plot",
        signature: "(axis, step_size=100.0, settle_time=0.5)",
        summary: "apply a position step and plot the response",
        call: step_and_plot,
    },
    Helper {
        name: "calculate_thermistor_coeffs",
        signature: "(degree, Rload, R_25, Beta, Tmin, Tmax, thermistor_bottom=False)",
        summary: "fit polynomial coefficients mapping divider voltage ratio to temperature",
        call: thermistor::calculate_thermistor_coeffs,
    },
    Helper {
        name: "set_motor_thermistor_coeffs",
        signature: "(axis, Rload, R_25, Beta, Tmin, Tmax, thermistor_bottom=False)",
        summary: "compute and write motor thermistor coefficients to an axis",
        call: set_motor_thermistor_coeffs,
    },
];

#[cfg(test)]
pub fn find(name: &str) -> Option<&'static Helper> {
    HELPERS.iter().find(|h| h.name == name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    HELPERS.iter().map(|h| h.name)
}

/// Fail with an arity error unless `args.len()` is within `min..=max`.
pub(crate) fn check_arity(
    helper: &'static str,
    args: &[Value],
    min: usize,
    max: usize,
    expected: &'static str,
) -> Result<(), ShellError> {
    if args.len() < min || args.len() > max {
        return Err(ShellError::Arity {
            helper,
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn require_device(helper: &'static str, args: &[Value]) -> Result<(), ShellError> {
    match args.first() {
        Some(Value::Device(_)) => Ok(()),
        Some(other) => Err(ShellError::ArgumentType {
            helper,
            index: 1,
            expected: "a device",
            found: other.type_name(),
        }),
        None => Err(ShellError::Arity {
            helper,
            expected: "at least 1",
            got: 0,
        }),
    }
}

fn start_liveplotter(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("start_liveplotter", args, 1, 3, "1 to 3")?;
    Err(ShellError::RemoteObjectsUnavailable("start_liveplotter"))
}

fn dump_errors(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("dump_errors", args, 1, 2, "1 or 2")?;
    require_device("dump_errors", args)?;
    Err(ShellError::RemoteObjectsUnavailable("dump_errors"))
}

/// Left non-functional: the result collection it would need was never
/// specified.
fn benchmark(_args: &[Value]) -> Result<Value, ShellError> {
    Err(ShellError::NotImplemented("benchmark"))
}

fn oscilloscope_dump(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("oscilloscope_dump", args, 2, 3, "2 or 3")?;
    require_device("oscilloscope_dump", args)?;
    Err(ShellError::RemoteObjectsUnavailable("oscilloscope_dump"))
}

fn bulk_capture(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("BulkCapture", args, 1, 3, "1 to 3")?;
    Err(ShellError::RemoteObjectsUnavailable("BulkCapture"))
}

fn step_and_plot(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("step_and_plot", args, 1, 3, "1 to 3")?;
    require_device("step_and_plot", args)?;
    Err(ShellError::RemoteObjectsUnavailable("step_and_plot"))
}

fn set_motor_thermistor_coeffs(args: &[Value]) -> Result<Value, ShellError> {
    check_arity("set_motor_thermistor_coeffs", args, 6, 7, "6 or 7")?;
    require_device("set_motor_thermistor_coeffs", args)?;
    // validate the fit parameters before reporting that the axis is unreachable
    let mut fit_args = vec![Value::Int(3)];
    fit_args.extend_from_slice(&args[1..]);
    thermistor::parse_params("set_motor_thermistor_coeffs", &fit_args)?;
    Err(ShellError::RemoteObjectsUnavailable("set_motor_thermistor_coeffs"))
}
