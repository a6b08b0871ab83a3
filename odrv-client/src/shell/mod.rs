//! Interactive shell launcher.
//!
//! Builds the names injected into the session (helpers and firmware enum
//! constants), supplies the banner and help text, and hands everything to a
//! [`ShellHost`]. The launcher itself does no device work and no error
//! handling: whatever the host returns is returned unchanged.

pub mod completion;
pub mod error;
pub mod eval;
pub mod host;
pub mod repl;
pub mod value;

use std::collections::BTreeMap;

use anyhow::Result;
use odrv_shared::enums::{ENUM_CONSTANTS, EnumConstant};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug};

use crate::helpers;
pub use host::{BannerFn, HelpFn, ShellHost, ShellSession};
use value::Value;

pub const BRANDING_SHORT: &str = "odrv";
pub const BRANDING_LONG: &str = "ODrive";

pub const BANNER: &str = "\
Website: https://odriverobotics.com/
Docs: https://docs.odriverobotics.com/
Forums: https://discourse.odriverobotics.com/
Discord: https://discord.gg/k3ZZ3mS
Github: https://github.com/madcowswe/ODrive/

Please connect your ODrive.
You can also type help() or quit().";

/// Options the shell was started with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellArgs {
    /// Where to look for devices, see [`crate::discovery::path_spec`].
    pub path: String,
    /// Only accept the device with this serial number.
    pub serial_number: Option<String>,
}

impl ShellArgs {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            serial_number: None,
        }
    }
}

/// Names injected into the interactive session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractiveVariables(BTreeMap<String, Value>);

impl InteractiveVariables {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn print_banner() {
    println!("{BANNER}");
}

pub fn help_text(args: &ShellArgs, have_devices: bool) -> String {
    let mut lines: Vec<String> = vec![String::new()];
    if have_devices {
        lines.push("Type \"odrv0.\" and press <tab>".to_string());
    } else {
        lines.push(format!(
            "Connect your ODrive to {} and power it up.",
            args.path
        ));
        lines.push("After that, the following message should appear:".to_string());
        lines.push("  \"Connected to ODrive [serial number] as odrv0\"".to_string());
        lines.push(String::new());
        lines.push("Once the ODrive is connected, type \"odrv0.\" and press <tab>".to_string());
    }
    lines.extend(
        [
            "This will present you with all the properties that you can reference",
            "",
            "For example: \"odrv0.axis0.encoder.pos_estimate\"",
            "will print the current encoder position on axis 0",
            "and \"odrv0.axis0.controller.input_pos = 0.5\"",
            "will send axis 0 to 0.5 turns",
            "",
        ]
        .map(str::to_string),
    );
    lines.join("\n")
}

pub fn print_help(args: &ShellArgs, have_devices: bool) {
    println!("{}", help_text(args, have_devices));
}

/// Helpers plus every firmware enum constant.
pub fn build_interactive_variables() -> InteractiveVariables {
    build_interactive_variables_from(ENUM_CONSTANTS)
}

/// Helpers plus every constant of `constants` not starting with `_`.
pub fn build_interactive_variables_from(constants: &[EnumConstant]) -> InteractiveVariables {
    let mut vars = BTreeMap::new();
    for helper in helpers::HELPERS.iter() {
        vars.insert(helper.name.to_string(), Value::Helper(helper));
    }
    for constant in constants.iter().filter(|c| !c.name.starts_with('_')) {
        vars.insert(constant.name.to_string(), Value::Int(constant.value));
    }
    InteractiveVariables(vars)
}

/// Start an interactive session on `host`.
///
/// As devices are found they become available as `odrv0`, `odrv1`, ...
pub async fn launch_shell<H: ShellHost + ?Sized>(
    host: &H,
    args: ShellArgs,
    logger: Span,
    app_shutdown_token: CancellationToken,
) -> Result<()> {
    let variables = build_interactive_variables();
    debug!(variables = variables.len(), path = %args.path, "launching shell");

    host.launch(ShellSession {
        args,
        variables,
        print_banner,
        print_help,
        logger,
        shutdown: app_shutdown_token,
        branding_short: BRANDING_SHORT,
        branding_long: BRANDING_LONG,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHost {
        seen: Mutex<Option<(ShellArgs, InteractiveVariables, &'static str, &'static str)>>,
    }

    #[async_trait]
    impl ShellHost for RecordingHost {
        async fn launch(&self, session: ShellSession) -> Result<()> {
            *self.seen.lock().unwrap() = Some((
                session.args,
                session.variables,
                session.branding_short,
                session.branding_long,
            ));
            Ok(())
        }
    }

    struct FailingHost;

    #[async_trait]
    impl ShellHost for FailingHost {
        async fn launch(&self, _session: ShellSession) -> Result<()> {
            anyhow::bail!("no terminal")
        }
    }

    #[test]
    fn test_banner_is_constant_text() {
        assert!(!BANNER.trim().is_empty());
        assert!(!BANNER.contains('{'));
        assert!(BANNER.contains("help()"));
        assert!(BANNER.contains("quit()"));
    }

    #[test]
    fn test_help_branches_differ() {
        let args = ShellArgs::new("usb");
        let with_devices = help_text(&args, true);
        let without_devices = help_text(&args, false);

        assert_ne!(with_devices, without_devices);
        assert!(without_devices.contains("Connect your ODrive to usb"));
        assert!(!with_devices.contains("Connect your ODrive"));
        for text in [&with_devices, &without_devices] {
            assert!(text.contains("odrv0.axis0.encoder.pos_estimate"));
        }
    }

    #[test]
    fn test_help_mentions_configured_path() {
        let args = ShellArgs::new("serial:/dev/ttyUSB0");
        assert!(help_text(&args, false).contains("serial:/dev/ttyUSB0"));
    }

    #[test]
    fn test_variables_are_helpers_plus_public_constants() {
        let vars = build_interactive_variables();

        let mut expected: HashSet<&str> = helpers::names().collect();
        expected.extend(ENUM_CONSTANTS.iter().map(|c| c.name));

        let actual: HashSet<&str> = vars.names().collect();
        assert_eq!(actual, expected);
        assert_eq!(vars.len(), expected.len());
        assert!(vars.names().all(|n| !n.starts_with('_')));
        assert_eq!(vars.get("MOTOR_TYPE_GIMBAL"), Some(&Value::Int(2)));
        assert!(matches!(vars.get("dump_errors"), Some(Value::Helper(_))));
    }

    #[test]
    fn test_underscore_constants_are_skipped() {
        let constants = [
            EnumConstant {
                group: "Test",
                name: "_PRIVATE",
                value: 1,
            },
            EnumConstant {
                group: "Test",
                name: "PUBLIC",
                value: 2,
            },
        ];
        let vars = build_interactive_variables_from(&constants);
        assert!(vars.contains("PUBLIC"));
        assert!(!vars.contains("_PRIVATE"));
        assert_eq!(vars.len(), helpers::HELPERS.len() + 1);
    }

    #[test]
    fn test_empty_constant_source_leaves_only_helpers() {
        let vars = build_interactive_variables_from(&[]);
        let names: HashSet<&str> = vars.names().collect();
        let expected: HashSet<&str> = helpers::names().collect();
        assert_eq!(names, expected);
    }

    #[tokio::test]
    async fn test_launch_forwards_mapping_to_host() {
        let host = RecordingHost::default();
        launch_shell(
            &host,
            ShellArgs::new("usb"),
            Span::none(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        let (args, vars, short, long) = host.seen.lock().unwrap().take().unwrap();
        assert_eq!(args.path, "usb");
        assert_eq!(vars, build_interactive_variables());
        assert_eq!(short, "odrv");
        assert_eq!(long, "ODrive");
    }

    #[tokio::test]
    async fn test_launch_propagates_host_error() {
        let err = launch_shell(
            &FailingHost,
            ShellArgs::new("usb"),
            Span::none(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "no terminal");
    }
}
