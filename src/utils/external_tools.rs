use crate::api::{EngineError, EngineResult};
use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// An external program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<std::ffi::OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        for arg in args {
            self = self.arg(arg);
        }
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Each tool leads its own process group so a timeout can take down
    /// everything it started.
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    fn failure(&self, exit_code: Option<i32>, stderr: String) -> EngineError {
        EngineError::ExternalTool {
            command: self.to_string(),
            exit_code,
            stderr,
            stage: None,
        }
    }

    fn launch_failure(&self, err: io::Error) -> EngineError {
        self.failure(None, format!("failed to launch {}: {}", self.program, err))
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Where a tool's standard output goes.
pub enum StdoutTarget<'a> {
    Capture,
    File(&'a Path),
}

#[derive(Debug, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

/// Check that a tool can be launched at all. The exit code is ignored since
/// several aligners exit nonzero when printing usage. A tool still running
/// at the deadline is killed and reported as `timeout`.
pub fn check_tool(tool: &ToolCommand, timeout: Option<Duration>) -> EngineResult<()> {
    let mut child = tool
        .command()
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| tool.launch_failure(e))?;
    match wait_all(&mut [&mut child], timeout)? {
        Some(_) => Ok(()),
        None => Err(timeout_error(tool.to_string(), timeout)),
    }
}

/// Run one tool to completion. Stderr (and stdout when captured) is drained
/// on background threads while waiting so a chatty tool cannot fill its pipe
/// and stall. A nonzero exit is an `ExternalTool` error carrying stderr.
pub fn run_tool(
    tool: &ToolCommand,
    stdout: StdoutTarget<'_>,
    timeout: Option<Duration>,
) -> EngineResult<ToolOutput> {
    debug!("Running: {}", tool);

    let mut cmd = tool.command();
    cmd.stdin(Stdio::null()).stderr(Stdio::piped());
    match stdout {
        StdoutTarget::Capture => {
            cmd.stdout(Stdio::piped());
        }
        StdoutTarget::File(path) => {
            cmd.stdout(Stdio::from(File::create(path)?));
        }
    }

    let mut child = cmd.spawn().map_err(|e| tool.launch_failure(e))?;
    drop(cmd);

    let stdout_drain = child.stdout.take().map(drain);
    let stderr_drain = child.stderr.take().map(drain);

    // On timeout the drain threads are left detached: a process that moved
    // itself out of the group may still hold the pipes open.
    let status = match wait_all(&mut [&mut child], timeout)? {
        Some(statuses) => statuses[0],
        None => return Err(timeout_error(tool.to_string(), timeout)),
    };
    let stdout = collect(stdout_drain);
    let stderr = String::from_utf8_lossy(&collect(stderr_drain)).into_owned();

    if status.success() {
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(tool.failure(status.code(), stderr))
    }
}

/// `producer | consumer > output`, two processes running concurrently.
pub struct ProcessPipeline {
    producer: ToolCommand,
    consumer: ToolCommand,
}

impl ProcessPipeline {
    pub fn new(producer: ToolCommand, consumer: ToolCommand) -> Self {
        Self { producer, consumer }
    }

    pub fn command_line(&self) -> String {
        format!("{} | {}", self.producer, self.consumer)
    }

    /// Wire, run and check both processes.
    ///
    /// The parent's copy of the producer's stdout is closed as soon as the
    /// consumer is spawned, otherwise the consumer never sees EOF. Both
    /// stderr streams are drained while waiting, and both exit codes are
    /// checked; either failing aborts with both stderr texts attached. The
    /// reported exit code is the first real nonzero code, producer first, so
    /// a consumer failure is not masked by the producer dying of SIGPIPE.
    pub fn run(&self, output: &Path, timeout: Option<Duration>) -> EngineResult<()> {
        debug!("Running: {} > {}", self.command_line(), output.display());

        let mut producer = self
            .producer
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.producer.launch_failure(e))?;

        let producer_stdout = match producer.stdout.take() {
            Some(out) => out,
            None => {
                kill_and_reap(&mut producer);
                return Err(EngineError::internal("producer stdout was not captured"));
            }
        };

        let spawned = {
            let out_file = match File::create(output) {
                Ok(file) => file,
                Err(e) => {
                    kill_and_reap(&mut producer);
                    return Err(e.into());
                }
            };
            let mut consumer_cmd = self.consumer.command();
            consumer_cmd
                .stdin(Stdio::from(producer_stdout))
                .stdout(Stdio::from(out_file))
                .stderr(Stdio::piped());
            // consumer_cmd, and with it our handle on the pipe, drops here
            consumer_cmd.spawn()
        };

        let mut consumer = match spawned {
            Ok(child) => child,
            Err(e) => {
                kill_and_reap(&mut producer);
                return Err(self.consumer.launch_failure(e));
            }
        };

        let producer_err = producer.stderr.take().map(drain);
        let consumer_err = consumer.stderr.take().map(drain);

        let statuses = match wait_all(&mut [&mut producer, &mut consumer], timeout)? {
            Some(statuses) => statuses,
            None => return Err(timeout_error(self.command_line(), timeout)),
        };
        let producer_stderr = String::from_utf8_lossy(&collect(producer_err)).into_owned();
        let consumer_stderr = String::from_utf8_lossy(&collect(consumer_err)).into_owned();

        if statuses.iter().any(|status| !status.success()) {
            let exit_code = statuses
                .iter()
                .find_map(|status| status.code().filter(|&code| code != 0));
            return Err(EngineError::ExternalTool {
                command: self.command_line(),
                exit_code,
                stderr: format!(
                    "{} (exit {}):\n{}\n{} (exit {}):\n{}",
                    self.producer.program(),
                    describe_status(&statuses[0]),
                    producer_stderr.trim_end(),
                    self.consumer.program(),
                    describe_status(&statuses[1]),
                    consumer_stderr.trim_end()
                ),
                stage: None,
            });
        }

        if !producer_stderr.is_empty() {
            debug!("{} stderr:\n{}", self.producer.program(), producer_stderr.trim_end());
        }
        if !consumer_stderr.is_empty() {
            debug!("{} stderr:\n{}", self.consumer.program(), consumer_stderr.trim_end());
        }
        Ok(())
    }
}

fn drain<R: Read + Send + 'static>(mut stream: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Wait for every child. Returns `None` when the deadline passed, in which
/// case every child's process group has been killed and the children reaped.
fn wait_all(children: &mut [&mut Child], timeout: Option<Duration>) -> io::Result<Option<Vec<ExitStatus>>> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut statuses: Vec<Option<ExitStatus>> = vec![None; children.len()];

    loop {
        for (child, status) in children.iter_mut().zip(statuses.iter_mut()) {
            if status.is_none() {
                *status = child.try_wait()?;
            }
        }
        if statuses.iter().all(Option::is_some) {
            return Ok(Some(statuses.into_iter().flatten().collect()));
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                for (child, status) in children.iter_mut().zip(statuses.iter()) {
                    if status.is_none() {
                        kill_and_reap(child);
                    } else {
                        // an exited leader's group can still hold its descendants
                        kill_group(child);
                    }
                }
                return Ok(None);
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}

/// SIGKILL the process group led by `child`.
#[cfg(unix)]
fn kill_group(child: &Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg takes no pointers; a vanished group yields ESRCH.
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            debug!("killpg({}) failed: {}", pgid, io::Error::last_os_error());
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn timeout_error(command: String, timeout: Option<Duration>) -> EngineError {
    EngineError::Timeout {
        command,
        seconds: timeout.map(|t| t.as_secs()).unwrap_or_default(),
    }
}

fn describe_status(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}
