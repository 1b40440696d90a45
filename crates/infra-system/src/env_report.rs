// Diagnostic environment report (read-only, printed at run start)

use std::collections::BTreeMap;

/// Render `name=value` lines sorted by name
pub fn render_env_report<I, K, V>(vars: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let sorted: BTreeMap<String, String> = vars
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();

    let mut report = String::new();
    for (name, value) in sorted {
        report.push_str(&name);
        report.push('=');
        report.push_str(&value);
        report.push('\n');
    }
    report
}

/// Report for the current process environment (non-UTF-8 values are lossily converted)
pub fn current_env_report() -> String {
    render_env_report(std::env::vars_os().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_name() {
        let report = render_env_report([("PATH", "/bin"), ("HOME", "/root"), ("A_B", "x=y")]);
        assert_eq!(report, "A_B=x=y\nHOME=/root\nPATH=/bin\n");
    }

    #[test]
    fn test_empty_environment() {
        assert_eq!(render_env_report(Vec::<(String, String)>::new()), "");
    }
}
