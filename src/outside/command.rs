use std::{
    io::{BufRead, BufReader, Read},
    process::{Child, Command, ExitStatus, Output, Stdio},
    thread::JoinHandle,
};

use bitflags::bitflags;
use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, trace, Level};

use crate::result::{Error, Result};

pub const YT_DL: &str = "youtube-dl";
pub const YT_DLP: &str = "yt-dlp";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capture: u8 {
        const STDIN = 0b0000001;
        const STDOUT = 0b0000010;
        const STDERR = 0b0000100;
    }
}

/// One line written by a streamed program, tagged with the stream it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Stdout(String),
    Stderr(String),
}

impl Line {
    pub fn text(&self) -> &str {
        match self {
            Line::Stdout(text) | Line::Stderr(text) => text,
        }
    }
}

/// What is left of a streamed program once it exited
#[derive(Debug)]
pub struct StreamedExit {
    pub status: ExitStatus,
    /// Everything the program wrote on stderr, one line per entry
    pub stderr: Vec<String>,
}

fn launch_error(program: &str, err: std::io::Error) -> Error {
    Error::ProcessFailed {
        program: program.to_owned(),
        diagnostic: format!("could not be started ({err})"),
    }
}

/// Run a command, returning its raw output handle.
///
/// IO handles will be captured only if the caller required it or if the log level is Debug.
/// In that last case, `stdout` and `stderr` will be logged.
///
/// The function returns an error only if the command failed to execute.
/// If the program runs but returns a non-0 status code, it will not trigger an error.
pub fn run_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
    capture: Capture,
) -> Result<Output> {
    let is_debug = tracing::enabled!(Level::DEBUG);
    let get_io = |capture| {
        if capture {
            Stdio::piped()
        } else {
            Stdio::null()
        }
    };

    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(get_io(capture.contains(Capture::STDIN)))
        .stdout(get_io(is_debug || capture.contains(Capture::STDOUT)))
        .stderr(get_io(is_debug || capture.contains(Capture::STDERR)));

    debug!("Executing command: {cmd:?}");
    let res = cmd.output().map_err(|err| launch_error(program, err))?;

    if is_debug {
        debug!("status: {}", res.status);
        debug!("stdout: {} bytes long", res.stdout.len());
        trace!("stdout: {:?}", String::from_utf8_lossy(&res.stdout));
        debug!("stderr: {} bytes long", res.stderr.len());
        trace!("stderr: {:?}", String::from_utf8_lossy(&res.stderr));
    }

    Ok(res)
}

/// Run the command and verify that it has returned a success status code.
pub fn assert_success_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<()> {
    run_stdout_command(program, f).map(|_| ())
}

/// Run the command and return its standard output.
///
/// A non-0 status code is an error carrying the program's stderr.
pub fn run_stdout_command<F: FnOnce(&mut Command) -> &mut Command>(
    program: &str,
    f: F,
) -> Result<String> {
    let res = run_command(program, f, Capture::STDOUT | Capture::STDERR)?;

    if res.status.success() {
        Ok(String::from_utf8_lossy(&res.stdout).into_owned())
    } else {
        Err(Error::ProcessFailed {
            program: program.to_owned(),
            diagnostic: String::from_utf8_lossy(&res.stderr).into_owned(),
        })
    }
}

/// Run a long-lived command, handing every line it prints to `on_line`
/// as soon as it is available.
///
/// Both output streams are read on their own thread and merged into a channel,
/// so that neither pipe can fill up and block the program.
/// The call returns once the program exited and both streams are drained.
pub fn stream_command<F, L>(program: &str, f: F, mut on_line: L) -> Result<StreamedExit>
where
    F: FnOnce(&mut Command) -> &mut Command,
    L: FnMut(&Line),
{
    let mut cmd = Command::new(program);
    let cmd = f(&mut cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("Streaming command: {cmd:?}");
    let mut child = cmd.spawn().map_err(|err| launch_error(program, err))?;

    let (send, receive) = unbounded();
    // The loop below ends when every reader has dropped its sender
    let readers = match spawn_readers(&mut child, send) {
        Ok(readers) => readers,
        Err(err) => {
            abandon(&mut child);
            return Err(err);
        }
    };

    let mut stderr = Vec::new();
    for line in receive {
        trace!("{line:?}");
        on_line(&line);
        if let Line::Stderr(text) = line {
            stderr.push(text);
        }
    }

    let status = child.wait()?;
    for reader in readers {
        if reader.join().is_err() {
            debug!("An output reader thread panicked");
        }
    }
    debug!("status: {status}");

    Ok(StreamedExit { status, stderr })
}

fn spawn_readers(child: &mut Child, send: Sender<Line>) -> Result<Vec<JoinHandle<()>>> {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader("stdout-reader", stdout, send.clone(), Line::Stdout)?);
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader("stderr-reader", stderr, send, Line::Stderr)?);
    }
    Ok(readers)
}

/// Kill a program nobody listens to anymore and reap it
fn abandon(child: &mut Child) {
    if let Err(err) = child.kill() {
        debug!("Could not kill process {}: {err}", child.id());
    }
    if let Err(err) = child.wait() {
        debug!("Could not wait for process {}: {err}", child.id());
    }
}

fn spawn_reader<R: Read + Send + 'static>(
    name: &str,
    reader: R,
    send: Sender<Line>,
    wrap: fn(String) -> Line,
) -> Result<JoinHandle<()>> {
    let handle = std::thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&buf);
                        let text = text.trim_end_matches(['\n', '\r']).to_owned();
                        if send.send(wrap(text)).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;

    Ok(handle)
}
