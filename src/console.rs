//! Console interaction
//!
//! Prompts go through the [`Console`] trait so the interactive session can
//! be driven by a script in tests. [`Terminal`] is the real implementation
//! built on crossterm.

use crate::error::{Error, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{self, ClearType};
use crossterm::tty::IsTty;
use crossterm::{cursor, execute};
use std::io::{self, BufRead, Write};
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// A single key press, reduced to what the prompts care about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
    Other,
}

/// Source of user input and sink for prompts
pub trait Console {
    /// Write text without a trailing newline
    fn write_str(&mut self, s: &str) -> Result<()>;

    /// Read one line, without its line terminator
    fn read_line(&mut self) -> Result<String>;

    /// Read one key press without echoing it
    fn read_key(&mut self) -> Result<Key>;

    /// Read a password, echoing `*` for each character
    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        read_masked(self)
    }

    fn clear(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_title(&mut self, _title: &str) -> Result<()> {
        Ok(())
    }

    fn write_line(&mut self, s: &str) -> Result<()> {
        self.write_str(s)?;
        self.write_str("\n")
    }
}

/// Collect a password key by key, echoing a mask character.
///
/// Backspace on an empty buffer is ignored and echoes nothing.
pub fn read_masked<C: Console + ?Sized>(console: &mut C) -> Result<Zeroizing<String>> {
    let mut password = Zeroizing::new(String::new());
    loop {
        match console.read_key()? {
            Key::Enter => break,
            Key::Backspace => {
                if password.pop().is_some() {
                    console.write_str("\u{8} \u{8}")?;
                }
            }
            Key::Char(c) => {
                password.push(c);
                console.write_str("*")?;
            }
            Key::Other => {}
        }
    }
    console.write_str("\n")?;
    Ok(password)
}

/// Restores cooked mode when dropped
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Map a terminal key event, or `None` for events the prompts ignore.
///
/// Ctrl+C interrupts. Other Ctrl or Alt chords are not text and come back
/// as [`Key::Other`]; Ctrl+Alt together is AltGr and yields its character.
/// Tab is kept as a character, like any other printable key.
fn key_from_event(key: KeyEvent) -> Option<Result<Key>> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    let mapped = match key.code {
        KeyCode::Char('c' | 'C') if control && !alt => return Some(Err(Error::Interrupted)),
        KeyCode::Enter => Key::Enter,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Char('\t'),
        KeyCode::Char(_) if control != alt => Key::Other,
        KeyCode::Char(c) => Key::Char(c),
        _ => Key::Other,
    };
    Some(Ok(mapped))
}

/// Raw mode disables output post-processing, so line feeds need a carriage return
fn raw_newlines(s: &str) -> String {
    s.replace('\n', "\r\n")
}

/// The process's own terminal
#[derive(Debug)]
pub struct Terminal {
    interactive: bool,
}

impl Terminal {
    pub fn new() -> Self {
        let interactive = io::stdin().is_tty();
        debug!("Interactive terminal: {}", interactive);
        Terminal { interactive }
    }

    /// Next key press; the caller must have raw mode enabled
    fn next_key(&mut self) -> Result<Key> {
        loop {
            let event = event::read().map_err(|e| Error::Terminal(e.to_string()))?;
            if let Event::Key(key) = event {
                if let Some(key) = key_from_event(key) {
                    return key;
                }
            }
        }
    }

    fn read_raw_key(&mut self) -> Result<Key> {
        let _guard = RawModeGuard::enable().map_err(|e| Error::Terminal(e.to_string()))?;
        self.next_key()
    }
}

/// The terminal held in raw mode for a whole masked read, so no keystroke
/// can reach the line discipline's echo between two reads
struct RawTerminal<'a> {
    terminal: &'a mut Terminal,
    _guard: RawModeGuard,
}

impl Console for RawTerminal<'_> {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.terminal.write_str(&raw_newlines(s))
    }

    fn read_line(&mut self) -> Result<String> {
        Err(Error::Terminal("line input is unavailable in raw mode".to_string()))
    }

    fn read_key(&mut self) -> Result<Key> {
        self.terminal.next_key()
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for Terminal {
    fn write_str(&mut self, s: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(s.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(Error::Interrupted);
        }
        let len = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(len);
        Ok(line)
    }

    /// Without a TTY a whole line stands in for a key press
    fn read_key(&mut self) -> Result<Key> {
        if self.interactive {
            return self.read_raw_key();
        }
        let line = self.read_line()?;
        Ok(line.chars().next().map_or(Key::Enter, Key::Char))
    }

    fn read_password(&mut self) -> Result<Zeroizing<String>> {
        if !self.interactive {
            return self.read_line().map(Zeroizing::new);
        }
        match RawModeGuard::enable() {
            Ok(guard) => read_masked(&mut RawTerminal {
                terminal: self,
                _guard: guard,
            }),
            Err(e) => {
                warn!("Masked input unavailable ({}), reading password without echo", e);
                rpassword::read_password()
                    .map(Zeroizing::new)
                    .map_err(|e| Error::Terminal(e.to_string()))
            }
        }
    }

    fn clear(&mut self) -> Result<()> {
        if self.interactive {
            execute!(io::stdout(), terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        if self.interactive {
            execute!(io::stdout(), terminal::SetTitle(title))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedConsole;

    #[test]
    fn test_masked_echo() {
        let mut console = ScriptedConsole::new().keys("abc").key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert_eq!(password.as_str(), "abc");
        assert_eq!(console.output(), "***\n");
    }

    #[test]
    fn test_masked_backspace() {
        let mut console = ScriptedConsole::new()
            .keys("abx")
            .key(Key::Backspace)
            .keys("c")
            .key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert_eq!(password.as_str(), "abc");
        assert_eq!(console.output(), "***\u{8} \u{8}*\n");
    }

    #[test]
    fn test_masked_backspace_on_empty() {
        let mut console = ScriptedConsole::new()
            .key(Key::Backspace)
            .key(Key::Backspace)
            .keys("a")
            .key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert_eq!(password.as_str(), "a");
        assert_eq!(console.output(), "*\n");
    }

    #[test]
    fn test_masked_ignores_other_keys() {
        let mut console = ScriptedConsole::new()
            .key(Key::Other)
            .keys("p w")
            .key(Key::Other)
            .key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert_eq!(password.as_str(), "p w");
    }

    #[test]
    fn test_masked_empty_password() {
        let mut console = ScriptedConsole::new().key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert!(password.is_empty());
        assert_eq!(console.output(), "\n");
    }

    fn event(code: KeyCode, modifiers: KeyModifiers) -> Option<Key> {
        key_from_event(KeyEvent::new(code, modifiers)).map(|key| key.unwrap())
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(event(KeyCode::Enter, KeyModifiers::NONE), Some(Key::Enter));
        assert_eq!(event(KeyCode::Backspace, KeyModifiers::NONE), Some(Key::Backspace));
        assert_eq!(event(KeyCode::Char('A'), KeyModifiers::SHIFT), Some(Key::Char('A')));
        assert_eq!(event(KeyCode::Tab, KeyModifiers::NONE), Some(Key::Char('\t')));
        assert_eq!(event(KeyCode::Left, KeyModifiers::NONE), Some(Key::Other));
    }

    #[test]
    fn test_key_mapping_chords() {
        assert_eq!(event(KeyCode::Char('a'), KeyModifiers::CONTROL), Some(Key::Other));
        assert_eq!(event(KeyCode::Char('x'), KeyModifiers::ALT), Some(Key::Other));
        // AltGr
        assert_eq!(
            event(KeyCode::Char('@'), KeyModifiers::CONTROL | KeyModifiers::ALT),
            Some(Key::Char('@'))
        );
        assert!(matches!(
            key_from_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Err(Error::Interrupted))
        ));
    }

    #[test]
    fn test_key_release_ignored() {
        let release = KeyEvent::new_with_kind(KeyCode::Char('a'), KeyModifiers::NONE, KeyEventKind::Release);
        assert!(key_from_event(release).is_none());
    }

    #[test]
    fn test_raw_newlines() {
        assert_eq!(raw_newlines("***\n"), "***\r\n");
        assert_eq!(raw_newlines("\u{8} \u{8}"), "\u{8} \u{8}");
    }

    #[test]
    fn test_masked_tab_is_kept() {
        let mut console = ScriptedConsole::new()
            .keys("a\tb")
            .key(Key::Enter);
        let password = read_masked(&mut console).unwrap();

        assert_eq!(password.as_str(), "a\tb");
        assert_eq!(console.output(), "***\n");
    }

    #[test]
    fn test_masked_input_exhausted() {
        let mut console = ScriptedConsole::new().keys("ab");
        assert!(matches!(read_masked(&mut console), Err(Error::Interrupted)));
    }
}
