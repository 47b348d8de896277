use crate::console::{Console, Key};
use crate::drive::{DriveLetter, DriveProbe};
use crate::error::{Error, Result};
use crate::opener::Opener;
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Input {
    Line(String),
    Key(Key),
}

/// A console that replays scripted input and records everything written.
///
/// Running out of input behaves like the user closing the window.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConsole {
    input: VecDeque<Input>,
    output: String,
    pub(crate) cleared: usize,
    pub(crate) title: Option<String>,
}

impl ScriptedConsole {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn line(mut self, line: &str) -> Self {
        self.input.push_back(Input::Line(line.to_string()));
        self
    }

    pub(crate) fn key(mut self, key: Key) -> Self {
        self.input.push_back(Input::Key(key));
        self
    }

    /// Queue one key press per character
    pub(crate) fn keys(mut self, chars: &str) -> Self {
        self.input.extend(chars.chars().map(|c| Input::Key(Key::Char(c))));
        self
    }

    pub(crate) fn output(&self) -> &str {
        &self.output
    }
}

impl Console for ScriptedConsole {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.output.push_str(s);
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        match self.input.pop_front() {
            Some(Input::Line(line)) => {
                self.output.push_str(&line);
                self.output.push('\n');
                Ok(line)
            }
            Some(other) => panic!("expected a line read, script has {:?}", other),
            None => Err(Error::Interrupted),
        }
    }

    fn read_key(&mut self) -> Result<Key> {
        match self.input.pop_front() {
            Some(Input::Key(key)) => Ok(key),
            Some(other) => panic!("expected a key read, script has {:?}", other),
            None => Err(Error::Interrupted),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.cleared += 1;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        self.title = Some(title.to_string());
        Ok(())
    }
}

/// Fixed table of occupied drive letters
#[derive(Debug, Default)]
pub(crate) struct FakeDrives(HashSet<char>);

impl FakeDrives {
    pub(crate) fn with(letters: &str) -> Self {
        FakeDrives(letters.chars().collect())
    }
}

impl DriveProbe for FakeDrives {
    fn is_in_use(&self, letter: DriveLetter) -> bool {
        self.0.contains(&letter.as_char())
    }
}

/// Drives backed by marker files, one per mounted letter
#[derive(Debug)]
pub(crate) struct MarkerDrives {
    dir: PathBuf,
}

impl DriveProbe for MarkerDrives {
    fn is_in_use(&self, letter: DriveLetter) -> bool {
        self.dir.join(letter.as_char().to_string()).exists()
    }
}

/// Records every path it is asked to open
#[derive(Debug, Default)]
pub(crate) struct RecordingOpener {
    pub(crate) opened: RefCell<Vec<PathBuf>>,
}

impl Opener for RecordingOpener {
    fn open(&self, path: &Path) -> Result<()> {
        self.opened.borrow_mut().push(path.to_path_buf());
        Ok(())
    }
}

/// A shell script standing in for VeraCrypt.
///
/// It records its arguments, creates a marker for the drive letter on
/// `/v` and removes it on `/d`, then exits with the configured code. Each
/// instance links to one shared script and keeps its state next to the
/// link, since the script looks for it beside `$0`.
#[cfg(unix)]
pub(crate) struct FakeVeraCrypt {
    _dir: tempfile::TempDir,
    pub(crate) script: PathBuf,
    log: PathBuf,
    drives: PathBuf,
}

#[cfg(unix)]
const FAKE_VERACRYPT_SCRIPT: &str = r#"#!/bin/sh
dir=$(dirname "$0")
code=$(cat "$dir/exit_code" 2>/dev/null || echo 0)
printf '%s\n' "$@" > "$dir/args.txt"
case "$1" in
  /v) [ "$code" -eq 0 ] && touch "$dir/drives/$4" ;;
  /d) [ "$code" -eq 0 ] && rm -f "$dir/drives/$2" ;;
esac
echo 'failure detail' >&2
exit "$code"
"#;

/// The script every [`FakeVeraCrypt`] links to, written once per test run.
///
/// A child forked by another test thread while the file is open for
/// writing inherits that descriptor until it execs, and executing the
/// script meanwhile fails with `ETXTBSY`. The script is run here until
/// that stops, after which no writable descriptor is left anywhere.
#[cfg(unix)]
fn shared_fake_script() -> &'static Path {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;

    const ETXTBSY: i32 = 26;
    static SCRIPT: OnceLock<(tempfile::TempDir, PathBuf)> = OnceLock::new();

    let (_, script) = SCRIPT.get_or_init(|| {
        let dir = tempdir();
        let script = dir.path().join("veracrypt.sh");
        {
            let mut file = std::fs::File::create(&script).unwrap();
            file.write_all(FAKE_VERACRYPT_SCRIPT.as_bytes()).unwrap();
            file.set_permissions(std::fs::Permissions::from_mode(0o755)).unwrap();
            file.sync_all().unwrap();
        }

        for _ in 0..100 {
            match std::process::Command::new(&script).output() {
                Err(e) if e.raw_os_error() == Some(ETXTBSY) => {
                    std::thread::sleep(std::time::Duration::from_millis(10))
                }
                result => {
                    result.unwrap();
                    break;
                }
            }
        }
        (dir, script)
    });
    script
}

#[cfg(unix)]
impl FakeVeraCrypt {
    pub(crate) fn new(exit_code: i32) -> Self {
        let dir = tempdir();
        let script = dir.path().join("veracrypt");
        let log = dir.path().join("args.txt");
        let drives = dir.path().join("drives");
        std::fs::create_dir(&drives).unwrap();
        std::fs::write(dir.path().join("exit_code"), exit_code.to_string()).unwrap();
        std::os::unix::fs::symlink(shared_fake_script(), &script).unwrap();

        FakeVeraCrypt {
            _dir: dir,
            script,
            log,
            drives,
        }
    }

    pub(crate) fn drives(&self) -> MarkerDrives {
        MarkerDrives {
            dir: self.drives.clone(),
        }
    }

    /// Arguments of the most recent invocation, one per line
    pub(crate) fn recorded_args(&self) -> String {
        std::fs::read_to_string(&self.log).unwrap()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_fake_veracrypt_instances_share_script() {
        let first = FakeVeraCrypt::new(0);
        let second = FakeVeraCrypt::new(2);

        let target = std::fs::read_link(&first.script).unwrap();
        assert_eq!(target, std::fs::read_link(&second.script).unwrap());
        assert_eq!(target, shared_fake_script());
    }

    #[test]
    fn test_fake_veracrypt_state_is_per_instance() {
        let ok = FakeVeraCrypt::new(0);
        let failing = FakeVeraCrypt::new(2);

        let status = std::process::Command::new(&failing.script)
            .args(["/d", "M", "/q", "/s"])
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(2));
        assert_eq!(failing.recorded_args(), "/d\nM\n/q\n/s\n");
        assert!(!ok.log.exists());
    }
}

pub(crate) fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}
