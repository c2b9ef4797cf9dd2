use std::borrow::Cow;

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-' | '_')
}

/// Quote a single argument for a POSIX shell. Arguments made only of
/// unambiguous characters are returned unchanged.
pub fn shell_escape(arg: &str) -> Cow<'_, str> {
    if arg.is_empty() {
        return Cow::Borrowed("''");
    }
    if arg.chars().all(is_shell_safe) {
        return Cow::Borrowed(arg);
    }
    let escaped = arg.replace('\'', "'\\''");
    Cow::Owned(format!("'{}'", escaped))
}

/// Quote every argument and join them with single spaces.
pub fn shell_join<S: AsRef<str>>(args: &[S]) -> String {
    let mut out = String::new();
    let mut first = true;
    for a in args {
        if !first {
            out.push(' ');
        }
        first = false;
        out.push_str(&shell_escape(a.as_ref()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_arguments_stay_unquoted() {
        assert_eq!(
            shell_join(&["bet", "/styx_input/0/t1.nii.gz", "out.nii.gz"]),
            "bet /styx_input/0/t1.nii.gz out.nii.gz"
        );
    }

    #[test]
    fn empty_argument_becomes_empty_quotes() {
        assert_eq!(shell_escape(""), "''");
    }

    #[test]
    fn whitespace_and_metacharacters_are_quoted() {
        assert_eq!(shell_escape("echo hi"), "'echo hi'");
        assert_eq!(shell_escape("$HOME"), "'$HOME'");
        assert_eq!(shell_escape("a;b"), "'a;b'");
        assert_eq!(shell_escape("*.nii"), "'*.nii'");
    }

    #[test]
    fn single_quotes_are_closed_and_reopened() {
        assert_eq!(shell_escape("it's"), "'it'\\''s'");
    }

    #[test]
    fn join_preserves_argument_order() {
        let args = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        assert_eq!(shell_join(&args), "sh -c 'exit 3'");
    }
}
