//! Platform search facilities reached through their command-line front ends.

use super::host_provider::HostSearch;
use super::{SearchHit, SourceTag};
use crate::cancel::CancellationToken;
use crate::config::SearchConfig;
use crate::metadata::parse_timestamp;
use crate::query::HostQuery;
use crate::{PartSearchError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// The backend for the current platform, if it has one.
pub fn default_backend() -> Option<Arc<dyn HostSearch>> {
    #[cfg(windows)]
    {
        Some(Arc::new(WindowsSearch::new()) as Arc<dyn HostSearch>)
    }
    #[cfg(target_os = "macos")]
    {
        Some(Arc::new(SpotlightSearch::new()) as Arc<dyn HostSearch>)
    }
    #[cfg(not(any(windows, target_os = "macos")))]
    {
        LocateSearch::detect().map(|backend| Arc::new(backend) as Arc<dyn HostSearch>)
    }
}

/// Windows Search, queried with SYSTEMINDEX SQL through an ADODB connection
/// in PowerShell.
#[derive(Debug, Clone)]
pub struct WindowsSearch {
    timeout: Duration,
}

impl WindowsSearch {
    pub fn new() -> Self {
        Self {
            timeout: SearchConfig::HOST_SEARCH_TIMEOUT,
        }
    }

    fn script(sql: &str) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'; \
             $c = New-Object -ComObject ADODB.Connection; \
             $r = New-Object -ComObject ADODB.Recordset; \
             $c.Open(\"Provider=Search.CollatorDSO;Extended Properties='Application=Windows';\"); \
             $r.Open('{}', $c); \
             while (-not $r.EOF) {{ \
               $d = $r.Fields.Item('System.DateModified').Value; \
               $t = if ($d) {{ ([datetime]$d).ToUniversalTime().ToString('o') }} else {{ '' }}; \
               [Console]::Out.WriteLine(($r.Fields.Item('System.ItemPathDisplay').Value, \
                 $r.Fields.Item('System.ItemTypeText').Value, \
                 $r.Fields.Item('System.Size').Value, $t) -join \"`t\"); \
               $r.MoveNext() }}; \
             $r.Close(); $c.Close()",
            sql.replace('\'', "''")
        )
    }
}

impl Default for WindowsSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSearch for WindowsSearch {
    fn name(&self) -> &str {
        "Windows Search"
    }

    fn search(
        &self,
        query: &HostQuery,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        let sql = query.to_windows_sql(limit);
        debug!(%sql, "Querying Windows Search");
        let mut command = Command::new("powershell");
        command.args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            &Self::script(&sql),
        ]);
        let output = run_with_timeout(command, self.timeout, cancel, &[])?;
        Ok(output.lines().filter_map(parse_windows_row).collect())
    }
}

/// One tab-separated row: path, type text, size, modified (ISO 8601).
fn parse_windows_row(line: &str) -> Option<SearchHit> {
    let mut fields = line.trim_end_matches('\r').split('\t');
    let path = fields.next().filter(|p| !p.is_empty())?;
    let type_text = fields.next().unwrap_or_default();
    let size = fields.next().and_then(|s| s.trim().parse::<u64>().ok());
    let modified = fields
        .next()
        .and_then(parse_timestamp)
        .map(|at| at.timestamp_millis() as f64 / 1000.0);
    let is_dir = type_text.eq_ignore_ascii_case("file folder");
    Some(SearchHit::new(path, is_dir, size, modified, SourceTag::Host))
}

/// macOS Spotlight through `mdfind`.
#[derive(Debug, Clone)]
pub struct SpotlightSearch {
    timeout: Duration,
}

impl SpotlightSearch {
    pub fn new() -> Self {
        Self {
            timeout: SearchConfig::HOST_SEARCH_TIMEOUT,
        }
    }
}

impl Default for SpotlightSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSearch for SpotlightSearch {
    fn name(&self) -> &str {
        "Spotlight"
    }

    fn search(
        &self,
        query: &HostQuery,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        let mut command = Command::new("mdfind");
        command.args(query.to_mdfind_args());
        let output = run_with_timeout(command, self.timeout, cancel, &[])?;
        Ok(stat_paths(&output, limit))
    }
}

/// `plocate` or `mlocate`, whichever is on `PATH`.
#[derive(Debug, Clone)]
pub struct LocateSearch {
    program: PathBuf,
    timeout: Duration,
}

impl LocateSearch {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: SearchConfig::HOST_SEARCH_TIMEOUT,
        }
    }

    /// Find a locate binary on `PATH`.
    pub fn detect() -> Option<Self> {
        let path = std::env::var_os("PATH")?;
        ["plocate", "locate"].iter().find_map(|name| {
            std::env::split_paths(&path)
                .map(|dir| dir.join(name))
                .find(|candidate| candidate.is_file())
                .map(Self::new)
        })
    }
}

impl HostSearch for LocateSearch {
    fn name(&self) -> &str {
        "locate"
    }

    fn search(
        &self,
        query: &HostQuery,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchHit>> {
        // locate cannot scope, so over-fetch and let the provider filter
        let fetch = if query.scope.is_empty() {
            limit
        } else {
            limit.saturating_mul(10)
        };
        let mut command = Command::new(&self.program);
        command.args(query.to_locate_args(fetch));
        // exit status 1 with no output is locate's "nothing matched"
        let output = run_with_timeout(command, self.timeout, cancel, &[1])?;
        Ok(stat_paths(&output, fetch))
    }
}

/// Turn one path per line into hits, skipping entries that no longer exist.
fn stat_paths(output: &str, limit: usize) -> Vec<SearchHit> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| SearchHit::from_path(Path::new(line), SourceTag::Host))
        .take(limit)
        .collect()
}

/// Read a child pipe to the end on its own thread so neither pipe can fill
/// and stall the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run a command to completion, killing it after `timeout` or once `cancel`
/// is set. Spawn failures are reported as unavailable and other non-zero
/// exits as failed, except a silent exit whose code is in `no_match`, which
/// yields empty output.
fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    cancel: &CancellationToken,
    no_match: &[i32],
) -> Result<String> {
    let program = command.get_program().to_string_lossy().to_string();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| PartSearchError::HostSearchUnavailable(format!("{}: {}", program, e)))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            debug!(program = %program, "Host search cancelled");
            return Err(PartSearchError::Cancelled);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PartSearchError::HostSearchFailed {
                message: format!("{} timed out after {:?}", program, timeout),
            });
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    let stdout = stdout.join().unwrap_or_default();
    if status.success() {
        return Ok(String::from_utf8_lossy(&stdout).to_string());
    }

    let stderr = stderr.join().unwrap_or_default();
    let silent = stdout.iter().all(u8::is_ascii_whitespace)
        && stderr.iter().all(u8::is_ascii_whitespace);
    if silent && status.code().is_some_and(|code| no_match.contains(&code)) {
        debug!(program = %program, %status, "No matches");
        return Ok(String::new());
    }
    Err(PartSearchError::HostSearchFailed {
        message: format!(
            "{} exited with {}: {}",
            program,
            status,
            String::from_utf8_lossy(&stderr).trim()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_windows_row() {
        let hit = parse_windows_row("C:\\Parts\\Bracket.SLDPRT\tSOLIDWORKS Part\t20480\t2025-03-01T10:00:00.0000000Z\r")
            .unwrap();
        assert_eq!(hit.name, "Bracket.SLDPRT");
        assert_eq!(hit.size, Some(20480));
        assert!(hit.modified.is_some());
        assert!(!hit.is_dir);

        let dir = parse_windows_row("C:\\Parts\\Assy\tFile folder\t\t").unwrap();
        assert!(dir.is_dir);
        assert!(parse_windows_row("").is_none());
    }

    #[test]
    fn test_windows_script_escapes_quotes() {
        let script = WindowsSearch::script("SELECT 'x'");
        assert!(script.contains("$r.Open('SELECT ''x''', $c)"));
    }

    #[test]
    fn test_stat_paths_skips_missing() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("a.pdf");
        std::fs::write(&file, b"x").unwrap();
        let output = format!("{}\n{}\n\n", file.display(), temp.path().join("gone.pdf").display());

        let hits = stat_paths(&output, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source, SourceTag::Host);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let command = Command::new("partsearch-no-such-program");
        let err = run_with_timeout(command, Duration::from_secs(1), &CancellationToken::new(), &[])
            .unwrap_err();
        assert!(matches!(err, PartSearchError::HostSearchUnavailable(_)));
    }

    #[cfg(unix)]
    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_locate_exit_one_is_no_match() {
        let temp = tempfile::TempDir::new().unwrap();
        let locate = LocateSearch::new(script(temp.path(), "locate", "exit 1"));
        let query = crate::query::ParsedQuery::parse("nosuchpart", false).to_host(&[]);

        let hits = locate.search(&query, 10, &CancellationToken::new()).unwrap();
        assert!(hits.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_exit_with_message_is_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let locate = LocateSearch::new(script(
            temp.path(),
            "locate",
            "echo 'database missing' >&2; exit 1",
        ));
        let query = crate::query::ParsedQuery::parse("bracket", false).to_host(&[]);

        let err = locate.search(&query, 10, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, PartSearchError::HostSearchFailed { .. }));
        assert!(err.to_string().contains("database missing"));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_running_backend() {
        let mut slow = Command::new("sh");
        slow.args(["-c", "exec sleep 30"]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run_with_timeout(slow, Duration::from_secs(30), &cancel, &[])
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, PartSearchError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
