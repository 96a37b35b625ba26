//! Script parsing: one filesystem command per line.
//!
//! ```text
//! # comment
//! mkdir /docs 0755
//! touch /docs/a.txt
//! write /docs/a.txt "hello\0"
//! ln /docs/a.txt /b.txt
//! cat /b.txt
//! ```

use anyhow::{Context, Result, bail};
use memfs_core::{FileMode, file_modes};

/// A parsed script command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mkdir { path: String, mode: FileMode },
    Touch { path: String, mode: FileMode },
    Write { path: String, data: Vec<u8>, offset: u64 },
    Cat { path: String, size: Option<usize>, offset: u64 },
    Ls { path: String },
    Stat { path: String },
    Ln { from: String, to: String },
    Rm { path: String },
    Rmdir { path: String },
    Truncate { path: String, size: u64 },
    Utime { path: String, atime: i64, mtime: i64 },
    Tree { path: String },
    Fsck,
}

/// Parse one script line. Blank lines and comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(None);
    };

    let command = match (name.as_str(), args) {
        ("mkdir", [path]) => Command::Mkdir {
            path: path.clone(),
            mode: file_modes::DIRECTORY,
        },
        ("mkdir", [path, mode]) => Command::Mkdir {
            path: path.clone(),
            mode: parse_mode(mode)?,
        },
        ("touch", [path]) => Command::Touch {
            path: path.clone(),
            mode: file_modes::REGULAR,
        },
        ("touch", [path, mode]) => Command::Touch {
            path: path.clone(),
            mode: parse_mode(mode)?,
        },
        ("write", [path, text]) => Command::Write {
            path: path.clone(),
            data: text.clone().into_bytes(),
            offset: 0,
        },
        ("write", [path, text, offset]) => Command::Write {
            path: path.clone(),
            data: text.clone().into_bytes(),
            offset: parse_num(offset, "offset")?,
        },
        ("cat", [path]) => Command::Cat {
            path: path.clone(),
            size: None,
            offset: 0,
        },
        ("cat", [path, size]) => Command::Cat {
            path: path.clone(),
            size: Some(parse_num(size, "size")?),
            offset: 0,
        },
        ("cat", [path, size, offset]) => Command::Cat {
            path: path.clone(),
            size: Some(parse_num(size, "size")?),
            offset: parse_num(offset, "offset")?,
        },
        ("ls", [path]) => Command::Ls { path: path.clone() },
        ("stat", [path]) => Command::Stat { path: path.clone() },
        ("ln", [from, to]) => Command::Ln {
            from: from.clone(),
            to: to.clone(),
        },
        ("rm", [path]) => Command::Rm { path: path.clone() },
        ("rmdir", [path]) => Command::Rmdir { path: path.clone() },
        ("truncate", [path, size]) => Command::Truncate {
            path: path.clone(),
            size: parse_num(size, "size")?,
        },
        ("utime", [path, atime, mtime]) => Command::Utime {
            path: path.clone(),
            atime: parse_num(atime, "atime")?,
            mtime: parse_num(mtime, "mtime")?,
        },
        ("tree", []) => Command::Tree {
            path: "/".to_string(),
        },
        ("tree", [path]) => Command::Tree { path: path.clone() },
        ("fsck", []) => Command::Fsck,
        (
            "mkdir" | "touch" | "write" | "cat" | "ls" | "stat" | "ln" | "rm" | "rmdir"
            | "truncate" | "utime" | "tree" | "fsck",
            _,
        ) => bail!("Wrong number of arguments for '{}'", name),
        _ => bail!("Unknown command: {}", name),
    };

    Ok(Some(command))
}

/// Split a line into whitespace-separated tokens.
///
/// Double-quoted tokens may contain whitespace and the escapes `\n`, `\t`,
/// `\0`, `\\` and `\"`. A `#` at the start of a token begins a comment.
fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}

        let Some(&first) = chars.peek() else {
            break;
        };
        if first == '#' {
            break;
        }

        let mut token = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    None => bail!("Unterminated quoted string"),
                    Some('"') => break,
                    Some('\\') => token.push(unescape(chars.next())?),
                    Some(c) => token.push(c),
                }
            }
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                token.push(c);
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

fn unescape(c: Option<char>) -> Result<char> {
    match c {
        Some('n') => Ok('\n'),
        Some('t') => Ok('\t'),
        Some('0') => Ok('\0'),
        Some('\\') => Ok('\\'),
        Some('"') => Ok('"'),
        Some(other) => bail!("Unknown escape: \\{}", other),
        None => bail!("Unterminated escape"),
    }
}

fn parse_mode(value: &str) -> Result<FileMode> {
    let digits = value.strip_prefix("0o").unwrap_or(value);
    FileMode::from_str_radix(digits, 8).with_context(|| format!("Invalid mode: {}", value))
}

fn parse_num<T: std::str::FromStr>(value: &str, what: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("Invalid {}: {}", what, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_plain() {
        assert_eq!(
            tokenize("  ln /a   /b ").unwrap(),
            vec!["ln", "/a", "/b"]
        );
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("   ").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_quotes_and_escapes() {
        assert_eq!(
            tokenize(r#"write /a "hello world\0""#).unwrap(),
            vec!["write", "/a", "hello world\0"]
        );
        assert_eq!(
            tokenize(r#"write /a "say \"hi\"\n""#).unwrap(),
            vec!["write", "/a", "say \"hi\"\n"]
        );
        assert_eq!(tokenize(r#"write /a """#).unwrap(), vec!["write", "/a", ""]);
    }

    #[test]
    fn test_tokenize_errors() {
        assert!(tokenize(r#"write /a "oops"#).is_err());
        assert!(tokenize(r#"write /a "bad \q""#).is_err());
    }

    #[test]
    fn test_comments() {
        assert_eq!(parse_line("# just a comment").unwrap(), None);
        assert_eq!(
            parse_line("ls / # trailing").unwrap(),
            Some(Command::Ls {
                path: "/".to_string()
            })
        );
        assert_eq!(
            tokenize(r##"write /a "# not a comment""##).unwrap(),
            vec!["write", "/a", "# not a comment"]
        );
    }

    #[test]
    fn test_parse_defaults() {
        assert_eq!(
            parse_line("mkdir /d").unwrap(),
            Some(Command::Mkdir {
                path: "/d".to_string(),
                mode: 0o755
            })
        );
        assert_eq!(
            parse_line("touch /f").unwrap(),
            Some(Command::Touch {
                path: "/f".to_string(),
                mode: 0o644
            })
        );
        assert_eq!(
            parse_line("tree").unwrap(),
            Some(Command::Tree {
                path: "/".to_string()
            })
        );
    }

    #[test]
    fn test_parse_with_arguments() {
        assert_eq!(
            parse_line("touch /f 0600").unwrap(),
            Some(Command::Touch {
                path: "/f".to_string(),
                mode: 0o600
            })
        );
        assert_eq!(
            parse_line(r#"write /f "abc" 10"#).unwrap(),
            Some(Command::Write {
                path: "/f".to_string(),
                data: b"abc".to_vec(),
                offset: 10
            })
        );
        assert_eq!(
            parse_line("cat /f 4 2").unwrap(),
            Some(Command::Cat {
                path: "/f".to_string(),
                size: Some(4),
                offset: 2
            })
        );
        assert_eq!(
            parse_line("utime /f 100 200").unwrap(),
            Some(Command::Utime {
                path: "/f".to_string(),
                atime: 100,
                mtime: 200
            })
        );
        assert_eq!(parse_line("fsck").unwrap(), Some(Command::Fsck));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_line("frobnicate /x").is_err());
        assert!(parse_line("ln /a").is_err());
        assert!(parse_line("touch /f 0999").is_err());
        assert!(parse_line("truncate /f -1").is_err());
        assert!(parse_line("cat /f many").is_err());
    }
}
