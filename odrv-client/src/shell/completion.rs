use std::sync::Arc;

use odrv_shared::device::DeviceInfo;
use rustyline::completion::{Completer, Pair};
use rustyline::{Context, Helper, Highlighter, Hinter, Validator};

use super::eval::BUILTINS;
use crate::discovery::registry::DeviceRegistry;

/// Tab completion for names, device names and device attributes.
#[derive(Helper, Hinter, Highlighter, Validator)]
pub struct ShellHelper {
    names: Vec<String>,
    registry: Arc<DeviceRegistry>,
}

impl ShellHelper {
    pub fn new(names: Vec<String>, registry: Arc<DeviceRegistry>) -> Self {
        Self { names, registry }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let devices = self.registry.names();
        let (start, candidates) = complete_word(&line[..pos], &self.names, &devices);
        Ok((
            start,
            candidates
                .into_iter()
                .map(|c| Pair {
                    display: c.clone(),
                    replacement: c,
                })
                .collect(),
        ))
    }
}

/// Candidates for the word ending at the end of `before`.
///
/// Returns the byte offset the candidates replace from, and the candidates
/// sorted. After `<device>.` the device's attributes are offered.
pub fn complete_word(before: &str, names: &[String], devices: &[String]) -> (usize, Vec<String>) {
    let start = before
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
        .map(|i| i + before[i..].chars().next().map_or(1, char::len_utf8))
        .unwrap_or(0);
    let word = &before[start..];

    if let Some((base, partial)) = word.rsplit_once('.') {
        if !devices.iter().any(|d| d == base) {
            return (start, Vec::new());
        }
        let candidates = DeviceInfo::ATTRIBUTES
            .iter()
            .filter(|a| a.starts_with(partial))
            .map(|a| a.to_string())
            .collect();
        return (start + base.len() + 1, candidates);
    }

    let mut candidates: Vec<String> = BUILTINS
        .iter()
        .map(|b| format!("{b}()"))
        .chain(devices.iter().cloned())
        .chain(names.iter().cloned())
        .filter(|c| c.starts_with(word))
        .collect();
    candidates.sort();
    candidates.dedup();
    (start, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        ["AXIS_STATE_IDLE", "AXIS_STATE_HOMING", "dump_errors", "dir_helper"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_completes_names_and_builtins() {
        let (start, candidates) = complete_word("AXIS_STATE_", &names(), &[]);
        assert_eq!(start, 0);
        assert_eq!(candidates, vec!["AXIS_STATE_HOMING", "AXIS_STATE_IDLE"]);

        let (_, candidates) = complete_word("d", &names(), &[]);
        assert_eq!(
            candidates,
            vec!["devices()", "dir()", "dir_helper", "dump_errors"]
        );
    }

    #[test]
    fn test_completes_inside_call_arguments() {
        let devices = vec!["odrv0".to_string()];
        let (start, candidates) = complete_word("dump_errors(od", &names(), &devices);
        assert_eq!(start, "dump_errors(".len());
        assert_eq!(candidates, vec!["odrv0"]);
    }

    #[test]
    fn test_completes_device_attributes() {
        let devices = vec!["odrv0".to_string()];
        let (start, candidates) = complete_word("odrv0.", &names(), &devices);
        assert_eq!(start, "odrv0.".len());
        assert_eq!(candidates.len(), DeviceInfo::ATTRIBUTES.len());

        let (_, candidates) = complete_word("odrv0.ser", &names(), &devices);
        assert_eq!(candidates, vec!["serial_number"]);
    }

    #[test]
    fn test_unknown_base_offers_nothing() {
        let (_, candidates) = complete_word("odrv1.", &names(), &["odrv0".to_string()]);
        assert!(candidates.is_empty());
    }
}
